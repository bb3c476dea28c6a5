//! chordspace: rest, syllable and chord-width placement for engraved music.
//!
//! Takes a score whose notes have been given vertical positions and works
//! out where rests sit, how wide every chord must be, how groups in the same
//! chord shift sideways to avoid each other, and where lyric extenders run.
//!
//! # Example
//! ```no_run
//! use chordspace::builder::{GroupSpec, LyricSpec, ScoreBuilder, StaffSpec};
//! use chordspace::{place_score, Bar, BarType, FixedMetrics, RatTime, ScoreParams};
//!
//! let metrics = FixedMetrics::new();
//! let mut b = ScoreBuilder::new(ScoreParams::default());
//! b.measure(vec![StaffSpec::new(1)
//!     .voice(1, vec![GroupSpec::notes(1, &[0])])
//!     .lyrics(LyricSpec::below(1).syl("Ah_", RatTime::from_integer(1)))])
//!     .bar(Bar::new(BarType::End));
//! let mut score = b.build(&metrics).unwrap();
//! place_score(&mut score, &metrics);
//! println!("{}", chordspace::layout_to_json(&score).unwrap());
//! ```

pub mod abspos;
pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod extender;
pub mod metrics;
pub mod model;
pub mod params;
pub mod placement;

pub use abspos::pack_absolute;
pub use diagnostics::{Diagnostic, Diagnostics, Severity, SourceLoc};
pub use error::ModelError;
pub use extender::{draw_extenders, plan_extenders};
pub use metrics::{FixedMetrics, Font, TaggedString, TextMetrics};
pub use model::*;
pub use params::{ParamState, ScoreParams, SsvUpdate};
pub use placement::restsyl;

/// Run the whole horizontal placement phase: rests and syllables, chord
/// widths, provisional absolute positions, then lyric extenders.
///
/// Positions are packed twice because carrying an extender onto a new line
/// can add a syllable there.
pub fn place_score(score: &mut Score, metrics: &dyn TextMetrics) {
    log::info!("placing {} chords", score.chords.len());
    restsyl(score, metrics);
    pack_absolute(score);
    plan_extenders(score, metrics);
    pack_absolute(score);
    draw_extenders(score, metrics);
    log::info!(
        "placement done: {} extender marks, {} diagnostics",
        score.extenders.len(),
        score.diagnostics.len()
    );
}

/// Serialize a placed score to JSON for downstream tools.
pub fn layout_to_json(score: &Score) -> Result<String, String> {
    serde_json::to_string_pretty(score).map_err(|e| format!("JSON serialization error: {e}"))
}
