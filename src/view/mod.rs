pub mod input;
pub mod report;

pub use input::{loading_phrase, BlankPitch, Pitch, SAMPLE_PITCHES};
pub use report::render_markdown;
