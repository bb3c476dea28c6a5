//! Shared constants for the placement engine (all in points unless noted).
//!
//! The rest nudges and clearances are tuned by eye against engraved
//! examples. They are not derived from anything and must not be changed
//! without rechecking output.

// ── Staff geometry ──────────────────────────────────────────────────
/// Distance between a staff line and the adjacent space.
pub const STEPSIZE: f64 = 4.0;
/// Standard horizontal padding around a group.
pub const STDPAD: f64 = 1.0;
/// Default stem length, in steps.
pub const STEMLEN: f64 = 7.0;

// ── Rests (steps) ───────────────────────────────────────────────────
/// Minimum distance between a rest and the opposing voice's extreme note.
pub const REST_CLEARANCE: i32 = 4;
/// Whole, half and double-whole rests are pulled this far back toward the
/// middle line; they are short enough vertically to fit.
pub const REST_NUDGE_LONG: i32 = -2;
/// 16th and 32nd rests have tall flags that need extra room.
pub const REST_NUDGE_16: i32 = 2;
pub const REST_NUDGE_128: i32 = 4;
pub const REST_NUDGE_256: i32 = 6;
/// A whole rest on a one-line staff hangs below the line.
pub const ONE_LINE_WHOLE_REST: i32 = -2;
/// Cue whole and double-whole rests are shifted away from the other voice
/// so they still touch a staff line.
pub const CUE_REST_NUDGE: f64 = 1.0;

// ── Measure repeat ──────────────────────────────────────────────────
/// Provisional half width of a measure repeat, until the symbol's real
/// size is known. Recognized by value, so never scaled.
pub const TEMP_MRPT_HALFWIDTH: f64 = 7.5;

// ── Chord relaxation ────────────────────────────────────────────────
/// Groups closer to the chord center than this (in steps) are never
/// allowed to overlap a neighbor.
pub const EFF_TOLERANCE: f64 = 1.5;
/// Slack when matching float beat positions to chord times.
pub const FUDGE: f64 = 0.001;
/// Size of a mid-measure clef relative to a normal one.
pub const MIDMEAS_CLEF_FACTOR: f64 = 0.75;
/// Room reserved in front of a group for a subbar.
pub const SUBBAR_SPACE: f64 = 6.0;

// ── Cross-staff stems ───────────────────────────────────────────────
/// Step offset marking a note as drawn on the neighboring staff.
pub const CSS_STEPS: i32 = 100;

// ── Lyric extenders ─────────────────────────────────────────────────
/// Gaps narrower than this many dash widths get a single centered dash.
pub const DASH_SINGLE_LIMIT: f64 = 15.0;
/// Target spacing between dashes, in dash widths.
pub const DASH_SPACING: f64 = 8.0;
/// How many measures back to look for a held-over lyric above the staff.
pub const MAX_ABOVE_LYR_LOOKBACK: usize = 20;

// ── Provisional absolute packing ────────────────────────────────────
pub const BAR_PAD: f64 = 8.0;
pub const CLEFSIG_WIDTH: f64 = 30.0;
pub const LEFT_MARGIN: f64 = 0.0;

// ── Accidentals ─────────────────────────────────────────────────────
/// Accidentals closer than this many steps cannot share a column.
pub const ACC_COLUMN_STEPS: i32 = 6;
