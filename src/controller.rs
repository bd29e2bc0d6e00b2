//! Owns one session's [`ApplicationState`] and sequences requests against it.
//!
//! Every `submit` and `reset` advances a generation counter. An analysis
//! settles only if its token still matches the current generation, so a
//! slow response can never overwrite a newer submission or a reset.

use crate::analysis::{AnalysisError, Analyzer};
use crate::models::{AnalysisResult, ApplicationState};
use crate::view::input::Pitch;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const FALLBACK_ERROR: &str = "Something went wrong during analysis. Please try again.";

/// Identifies one submission. Only the latest token may settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: ApplicationState,
    pub loading_since: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

struct Inner {
    state: ApplicationState,
    generation: u64,
    loading_since: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl Inner {
    fn transition(&mut self, state: ApplicationState) {
        let now = Utc::now();
        self.loading_since = state.is_loading().then_some(now);
        self.state = state;
        self.updated_at = now;
    }
}

pub struct AnalysisController {
    analyzer: Arc<dyn Analyzer>,
    inner: Mutex<Inner>,
}

impl AnalysisController {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            inner: Mutex::new(Inner {
                state: ApplicationState::idle(),
                generation: 0,
                loading_since: None,
                updated_at: Utc::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guard is never held across an await or a panic-prone call, so a
        // poisoned lock still holds a consistent state.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> ApplicationState {
        self.lock().state.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            state: inner.state.clone(),
            loading_since: inner.loading_since,
            updated_at: inner.updated_at,
        }
    }

    /// Enters the loading state and supersedes whatever was in flight.
    pub fn begin(&self) -> RequestToken {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.transition(ApplicationState::loading());
        debug!(generation = inner.generation, "Analysis started");
        RequestToken(inner.generation)
    }

    /// Applies the outcome of the request identified by `token`. Returns
    /// false, leaving the state untouched, when that request has been
    /// superseded.
    pub fn settle(&self, token: RequestToken, outcome: Result<AnalysisResult, AnalysisError>) -> bool {
        let mut inner = self.lock();
        if inner.generation != token.0 {
            debug!(
                stale = token.0,
                current = inner.generation,
                "Discarding superseded analysis outcome"
            );
            return false;
        }
        let next = match outcome {
            Ok(result) => {
                info!("Analysis succeeded");
                ApplicationState::success(result)
            }
            Err(e) => {
                warn!("Analysis failed: {}", e);
                ApplicationState::failure(failure_message(&e))
            }
        };
        inner.transition(next);
        true
    }

    /// Runs one analysis to completion and returns the state afterwards.
    pub async fn submit(&self, pitch: &Pitch) -> ApplicationState {
        let token = self.begin();
        let outcome = self.analyzer.analyze(pitch.as_str()).await;
        self.settle(token, outcome);
        self.state()
    }

    /// Enters the loading state now and finishes the analysis on a
    /// background task. The request is not cancelled if superseded; its
    /// outcome is just dropped.
    pub fn spawn_submit(self: &Arc<Self>, pitch: Pitch) -> RequestToken {
        let token = self.begin();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = controller.analyzer.analyze(pitch.as_str()).await;
            controller.settle(token, outcome);
        });
        token
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.transition(ApplicationState::idle());
    }
}

/// User-facing text for a failed analysis.
pub fn failure_message(error: &AnalysisError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        FALLBACK_ERROR.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Phase;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::{oneshot, Mutex as AsyncMutex};

    type Outcome = Result<AnalysisResult, AnalysisError>;

    /// Answers each call with the next queued outcome, optionally waiting on
    /// a gate first so tests can interleave resets and resubmissions.
    struct ScriptedAnalyzer {
        script: AsyncMutex<VecDeque<(Option<oneshot::Receiver<()>>, Outcome)>>,
    }

    impl ScriptedAnalyzer {
        fn new(script: Vec<(Option<oneshot::Receiver<()>>, Outcome)>) -> Arc<Self> {
            Arc::new(Self {
                script: AsyncMutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl Analyzer for ScriptedAnalyzer {
        async fn analyze(&self, _pitch: &str) -> Outcome {
            let (gate, outcome) = self
                .script
                .lock()
                .await
                .pop_front()
                .expect("unexpected analyze call");
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            outcome
        }
    }

    fn scored(score: u8) -> AnalysisResult {
        AnalysisResult {
            market_realism_score: Some(score),
            ..AnalysisResult::default()
        }
    }

    fn pitch() -> Pitch {
        Pitch::parse("Uber for dog walking").unwrap()
    }

    async fn settled(controller: &AnalysisController) {
        for _ in 0..100 {
            if !controller.state().is_loading() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("analysis never settled");
    }

    #[tokio::test]
    async fn success_stores_result() {
        let controller = AnalysisController::new(ScriptedAnalyzer::new(vec![(None, Ok(scored(64)))]));
        let state = controller.submit(&pitch()).await;

        assert_eq!(state.phase(), Phase::Success);
        assert!(!state.is_loading());
        assert!(state.error().is_none());
        assert_eq!(state.result().unwrap().market_realism_score, Some(64));
    }

    #[tokio::test]
    async fn invalid_format_becomes_failure_message() {
        let err = AnalysisError::InvalidFormat {
            raw: "not json".to_string(),
            reason: "expected value".to_string(),
        };
        let controller = AnalysisController::new(ScriptedAnalyzer::new(vec![(None, Err(err))]));
        let state = controller.submit(&pitch()).await;

        assert_eq!(state.phase(), Phase::Failure);
        assert!(!state.error().unwrap().is_empty());
        assert!(state.result().is_none());
    }

    #[tokio::test]
    async fn blank_error_message_uses_fallback() {
        let err = AnalysisError::Service {
            status: Some(500),
            message: String::new(),
        };
        let controller = AnalysisController::new(ScriptedAnalyzer::new(vec![(None, Err(err))]));
        let state = controller.submit(&pitch()).await;

        assert_eq!(state.error(), Some(FALLBACK_ERROR));
    }

    #[tokio::test]
    async fn begin_clears_previous_outcome() {
        let controller = AnalysisController::new(ScriptedAnalyzer::new(vec![]));
        let token = controller.begin();
        assert!(controller.settle(token, Ok(scored(10))));

        controller.begin();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, ApplicationState::loading());
        assert!(snapshot.loading_since.is_some());
    }

    #[tokio::test]
    async fn reset_is_idempotent_from_any_state() {
        let controller = AnalysisController::new(ScriptedAnalyzer::new(vec![
            (None, Ok(scored(70))),
            (None, Err(AnalysisError::EmptyResponse)),
        ]));

        controller.reset();
        controller.reset();
        assert_eq!(controller.state(), ApplicationState::idle());

        controller.submit(&pitch()).await;
        controller.reset();
        controller.reset();
        assert_eq!(controller.state(), ApplicationState::idle());

        controller.submit(&pitch()).await;
        controller.reset();
        assert_eq!(controller.state(), ApplicationState::idle());
        assert!(controller.snapshot().loading_since.is_none());
    }

    #[tokio::test]
    async fn late_resolution_after_reset_is_discarded() {
        let (release, gate) = oneshot::channel();
        let controller = Arc::new(AnalysisController::new(ScriptedAnalyzer::new(vec![(
            Some(gate),
            Ok(scored(90)),
        )])));

        controller.spawn_submit(pitch());
        assert!(controller.state().is_loading());

        controller.reset();
        release.send(()).unwrap();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.state(), ApplicationState::idle());
    }

    #[tokio::test]
    async fn newer_submission_supersedes_older_one() {
        let (release_first, first_gate) = oneshot::channel();
        let controller = Arc::new(AnalysisController::new(ScriptedAnalyzer::new(vec![
            (Some(first_gate), Ok(scored(11))),
            (None, Ok(scored(99))),
        ])));

        let first = controller.spawn_submit(pitch());
        tokio::task::yield_now().await;
        let second = controller.spawn_submit(pitch());
        assert_ne!(first, second);
        settled(&controller).await;

        release_first.send(()).unwrap();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let state = controller.state();
        assert_eq!(state.result().unwrap().market_realism_score, Some(99));
    }

    #[test]
    fn stale_token_does_not_settle() {
        let controller = AnalysisController::new(ScriptedAnalyzer::new(vec![]));
        let stale = controller.begin();
        let current = controller.begin();

        assert!(!controller.settle(stale, Ok(scored(1))));
        assert!(controller.state().is_loading());
        assert!(controller.settle(current, Err(AnalysisError::EmptyResponse)));
        assert_eq!(controller.state().phase(), Phase::Failure);
    }
}
