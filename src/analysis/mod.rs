pub mod error;
pub mod prompt;
pub mod sanitize;

pub use error::{AnalysisError, SchemaDeviation};

use crate::models::AnalysisResult;
use crate::tools::gemini::GeminiClient;
use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

/// Anything that can turn a pitch into a verdict.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, pitch: &str) -> error::Result<AnalysisResult>;
}

/// The venture-analyst client backed by Gemini with search grounding.
pub struct AnalysisClient {
    gemini: GeminiClient,
}

impl AnalysisClient {
    pub fn new(gemini: GeminiClient) -> Self {
        Self { gemini }
    }
}

#[async_trait]
impl Analyzer for AnalysisClient {
    #[instrument(skip(self, pitch), fields(model = self.gemini.model(), pitch_len = pitch.len()))]
    async fn analyze(&self, pitch: &str) -> error::Result<AnalysisResult> {
        let start_time = std::time::Instant::now();
        info!("Starting pitch analysis");

        let request = self.gemini.build_request(prompt::SYSTEM_INSTRUCTION, pitch);
        let outcome = match self.gemini.generate(&request).await {
            Ok(response) => sanitize::interpret(&response),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(interpreted) => {
                if let Some(deviation) = &interpreted.deviation {
                    warn!(issues = deviation.issues.len(), "UpstreamSchemaDeviation: {}", deviation);
                }
                info!(
                    "Analysis completed in {:?} with {} sources",
                    start_time.elapsed(),
                    interpreted.result.sources.len()
                );
                Ok(interpreted.result)
            }
            Err(e) => {
                if let AnalysisError::InvalidFormat { raw, reason } = &e {
                    error!("Failed to parse JSON ({}): {}", reason, raw);
                }
                error!(upstream = e.is_upstream(), "Analysis failed: {}", e);
                Err(e)
            }
        }
    }
}
