//! Chord-relative placement.
//!
//! [`restsyl`] takes a built timeline and gives every group, syllable and
//! chord its horizontal extent. The passes run in a fixed order: rests and
//! spaces, group finalization, syllables, staffscale, subbar room, chord
//! relaxation (groups, then syllables east and west), pedal room, and the
//! uncollapsible marking.

pub mod collision;
pub mod constants;
pub mod fixspace;
pub mod groups;
pub mod pedal;
pub mod relax;
pub mod rests;
pub mod staffscale;
pub mod subbars;
pub mod syllables;
pub mod v3pack;

use crate::metrics::TextMetrics;
use crate::model::Score;

pub use constants::STEPSIZE;

/// Run every placement pass over the score.
pub fn restsyl(score: &mut Score, metrics: &dyn TextMetrics) {
    log::debug!(
        "restsyl: {} chords, {} groups/syllables",
        score.chords.len(),
        score.grpsyls.len()
    );
    rests::procrests(score, metrics);
    let fixed = groups::finalgroupproc_all(score, metrics);
    log::debug!("finalgroupproc: {} staff-chords", fixed);
    syllables::procsyls(score, metrics);
    staffscale::apply_staffscale(score);
    subbars::room4subbars(score);
    relax::relxchord(score, metrics);
    pedal::pedal_spacing(score, metrics);
    fixspace::fixspace(score);
    relax::finish(score);
}
