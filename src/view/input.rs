use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Pitch text that is known to contain something other than whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pitch(String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Pitch must not be empty")]
pub struct BlankPitch;

impl Pitch {
    /// Keeps the text exactly as typed; only the emptiness check trims.
    pub fn parse(text: impl Into<String>) -> Result<Self, BlankPitch> {
        let text = text.into();
        if text.trim().is_empty() {
            Err(BlankPitch)
        } else {
            Ok(Self(text))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub const LOADING_PHRASES: [&str; 6] = [
    "Crunching the numbers...",
    "Scanning competitor landscape...",
    "Consulting the virtual board...",
    "Measuring market depth...",
    "Checking recent patent filings...",
    "Identifying fatal flaws...",
];

pub const PHRASE_INTERVAL: Duration = Duration::from_secs(2);

/// Status phrase to show after `elapsed` time in the loading state.
pub fn loading_phrase(elapsed: Duration) -> &'static str {
    let ticks = elapsed.as_millis() / PHRASE_INTERVAL.as_millis();
    LOADING_PHRASES[(ticks % LOADING_PHRASES.len() as u128) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SamplePitch {
    pub label: &'static str,
    pub pitch: &'static str,
}

pub const SAMPLE_PITCHES: [SamplePitch; 3] = [
    SamplePitch {
        label: "Hamster Social",
        pitch: "A social network for hamsters.",
    },
    SamplePitch {
        label: "High-Growth SaaS",
        pitch: "A B2B AI platform automating medical coding for hospitals. We have $50k MRR, 3 signed hospital networks, and 15% MoM growth. Our tech reduces claim denials by 40% verified by pilot data.",
    },
    SamplePitch {
        label: "Deep Tech",
        pitch: "Proprietary solid-state battery electrolyte that increases EV range by 40% and charges in 10 minutes. We have 3 signed LOIs from major auto OEMs worth $20M. 3 patents granted. Team includes ex-Tesla battery leads and Stanford PhDs.",
    },
];
