//! Score parameters and the per-pass parameter state.
//!
//! Parameter snapshots (SSVs) sit in the timeline and change values from
//! that point on. Every pass replays them in order through a [`ParamState`]
//! that it creates fresh, so no pass ever sees values left over from a
//! previous one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ModelError;
use crate::metrics::Font;
use crate::model::RatTime;

/// How many voices a staff carries and how their stems are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceScheme {
    One,
    TwoOpposingStems,
    TwoFreeStems,
    ThreeOpposingStems,
    ThreeFreeStems,
}

impl VoiceScheme {
    pub fn is_single(self) -> bool {
        self == VoiceScheme::One
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PedalStyle {
    /// Continuous bracket line under the staff.
    Line,
    /// "Ped." and "*" glyphs.
    PedStar,
    /// Like `PedStar`, but a pedal change prints only "Ped.".
    AltPedStar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSig {
    pub num: i32,
    pub den: i32,
}

impl TimeSig {
    pub fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Length of one full measure, in whole notes.
    pub fn measure_duration(&self) -> RatTime {
        RatTime::new(self.num, self.den)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubbarLine {
    Single,
    Dashed,
    Dotted,
}

/// Inclusive range of staff numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRange {
    pub top: usize,
    pub bottom: usize,
}

impl StaffRange {
    pub fn contains(&self, staff: usize) -> bool {
        staff >= self.top && staff <= self.bottom
    }
}

/// A user-defined subbar: a thin barline drawn at given beat counts
/// inside every measure while the definition is in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubbarDef {
    pub line: SubbarLine,
    /// 1-based beat counts (in time-signature denominator units).
    pub counts: Vec<f64>,
    /// Staffs the subbar is drawn on. Empty means every staff.
    pub staffs: Vec<StaffRange>,
}

impl SubbarDef {
    pub fn applies_to(&self, staff: usize) -> bool {
        self.staffs.is_empty() || self.staffs.iter().any(|r| r.contains(staff))
    }
}

/// Score-wide starting values. Also the configuration surface of the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreParams {
    pub staffscale: f64,
    pub stafflines: u8,
    pub vscheme: VoiceScheme,
    /// Fraction of a syllable's core text that sits left of the chord center.
    pub lyricsalign: f64,
    /// Fixed anchor (in points, relative to the chord center) for the start
    /// of syllable core text. Overrides `lyricsalign` when set.
    pub sylposition: Option<f64>,
    pub pedstyle: PedalStyle,
    pub lyrics_font: Font,
    pub lyrics_size: u8,
    pub visible: bool,
    pub time: TimeSig,
    pub subbars: Vec<SubbarDef>,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            staffscale: 1.0,
            stafflines: 5,
            vscheme: VoiceScheme::One,
            lyricsalign: 0.25,
            sylposition: None,
            pedstyle: PedalStyle::Line,
            lyrics_font: Font::Roman,
            lyrics_size: 12,
            visible: true,
            time: TimeSig::new(4, 4),
            subbars: Vec::new(),
        }
    }
}

impl ScoreParams {
    /// Read defaults from JSON. Missing fields keep their default values.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Values a parameter snapshot may set. `None` leaves a value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet {
    pub staffscale: Option<f64>,
    pub stafflines: Option<u8>,
    pub vscheme: Option<VoiceScheme>,
    pub lyricsalign: Option<f64>,
    pub sylposition: Option<f64>,
    pub pedstyle: Option<PedalStyle>,
    pub lyrics_font: Option<Font>,
    pub lyrics_size: Option<u8>,
    pub visible: Option<bool>,
    /// Score context only.
    pub time: Option<TimeSig>,
    /// Score context only.
    pub subbars: Option<Vec<SubbarDef>>,
}

impl ParamSet {
    fn overlay(&mut self, other: &ParamSet) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            staffscale, stafflines, vscheme, lyricsalign, sylposition, pedstyle, lyrics_font,
            lyrics_size, visible, time, subbars
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SsvContext {
    Score,
    Staff(usize),
}

/// A parameter snapshot as it appears in the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsvUpdate {
    pub context: SsvContext,
    pub params: ParamSet,
}

impl SsvUpdate {
    pub fn score(params: ParamSet) -> Self {
        Self { context: SsvContext::Score, params }
    }

    pub fn staff(staff: usize, params: ParamSet) -> Self {
        Self { context: SsvContext::Staff(staff), params }
    }
}

/// Live parameter values while walking the timeline.
#[derive(Debug, Clone)]
pub struct ParamState {
    initial: ScoreParams,
    score: ParamSet,
    staffs: BTreeMap<usize, ParamSet>,
}

impl ParamState {
    pub fn new(initial: &ScoreParams) -> Self {
        Self {
            initial: initial.clone(),
            score: ParamSet::default(),
            staffs: BTreeMap::new(),
        }
    }

    /// Forget every snapshot seen so far.
    pub fn reset(&mut self) {
        self.score = ParamSet::default();
        self.staffs.clear();
    }

    pub fn apply(&mut self, update: &SsvUpdate) {
        match update.context {
            SsvContext::Score => self.score.overlay(&update.params),
            SsvContext::Staff(s) => self.staffs.entry(s).or_default().overlay(&update.params),
        }
    }

    fn lookup<T: Clone>(&self, staff: usize, get: impl Fn(&ParamSet) -> Option<T>) -> Option<T> {
        self.staffs
            .get(&staff)
            .and_then(&get)
            .or_else(|| get(&self.score))
    }

    pub fn staffscale(&self, staff: usize) -> f64 {
        self.lookup(staff, |p| p.staffscale).unwrap_or(self.initial.staffscale)
    }

    pub fn stafflines(&self, staff: usize) -> u8 {
        self.lookup(staff, |p| p.stafflines).unwrap_or(self.initial.stafflines)
    }

    pub fn vscheme(&self, staff: usize) -> VoiceScheme {
        self.lookup(staff, |p| p.vscheme).unwrap_or(self.initial.vscheme)
    }

    pub fn lyricsalign(&self, staff: usize) -> f64 {
        self.lookup(staff, |p| p.lyricsalign).unwrap_or(self.initial.lyricsalign)
    }

    pub fn sylposition(&self, staff: usize) -> Option<f64> {
        self.lookup(staff, |p| p.sylposition).or(self.initial.sylposition)
    }

    pub fn pedstyle(&self, staff: usize) -> PedalStyle {
        self.lookup(staff, |p| p.pedstyle).unwrap_or(self.initial.pedstyle)
    }

    pub fn lyrics_font(&self, staff: usize) -> (Font, u8) {
        (
            self.lookup(staff, |p| p.lyrics_font).unwrap_or(self.initial.lyrics_font),
            self.lookup(staff, |p| p.lyrics_size).unwrap_or(self.initial.lyrics_size),
        )
    }

    pub fn visible(&self, staff: usize) -> bool {
        self.lookup(staff, |p| p.visible).unwrap_or(self.initial.visible)
    }

    pub fn time(&self) -> TimeSig {
        self.score.time.unwrap_or(self.initial.time)
    }

    pub fn subbars(&self) -> &[SubbarDef] {
        self.score.subbars.as_deref().unwrap_or(&self.initial.subbars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_values_override_score_values() {
        let mut state = ParamState::new(&ScoreParams::default());
        state.apply(&SsvUpdate::score(ParamSet {
            staffscale: Some(0.8),
            ..Default::default()
        }));
        state.apply(&SsvUpdate::staff(2, ParamSet {
            staffscale: Some(0.5),
            ..Default::default()
        }));
        assert_eq!(state.staffscale(1), 0.8);
        assert_eq!(state.staffscale(2), 0.5);

        state.reset();
        assert_eq!(state.staffscale(2), 1.0);
    }

    #[test]
    fn params_from_partial_json() {
        let params = ScoreParams::from_json(r#"{ "lyricsalign": 0.5, "time": { "num": 3, "den": 4 } }"#)
            .unwrap();
        assert_eq!(params.lyricsalign, 0.5);
        assert_eq!(params.time.measure_duration(), RatTime::new(3, 4));
        assert_eq!(params.stafflines, 5);
    }

    #[test]
    fn bad_json_is_a_model_error() {
        assert!(matches!(
            ScoreParams::from_json("{ \"stafflines\": \"five\" }"),
            Err(ModelError::Params(_))
        ));
    }
}
