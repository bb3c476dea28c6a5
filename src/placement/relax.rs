//! Chord relaxation.
//!
//! Each chord gets a west/east extent around its center line. Chords are
//! laid edge to edge in a provisional ("phantom") coordinate so that later
//! passes can ask how far apart two chords currently are.
//!
//! Pass A lets groups overhang into neighboring chords when nothing there
//! could collide with them. Passes B and C then widen chords whose
//! syllables would otherwise run into the next or previous syllable.

use crate::metrics::{Font, TextMetrics, DFLT_SIZE};
use crate::model::*;
use crate::params::ParamState;

use super::collision::collision_danger;
use super::constants::{EFF_TOLERANCE, MIDMEAS_CLEF_FACTOR, STDPAD, STEPSIZE};

/// Lay the chords of a measure edge to edge, the first one's west edge at 0.
pub fn set_phantom_x(score: &mut Score, chords: &[ChordId]) {
    let mut edge = 0.0;
    for &c in chords {
        let chord = score.chord_mut(c);
        chord.phantom_x = edge - chord.west;
        edge = chord.phantom_x + chord.east;
    }
}

fn groups_on(score: &Score, chord: ChordId, staffno: usize) -> Vec<GsId> {
    score
        .chord_members_on(chord, staffno)
        .into_iter()
        .filter(|g| score.gs(*g).is_group())
        .collect()
}

fn has_cross_staff_stem(group: &Group) -> bool {
    group.beamto.is_some() || group.notes.iter().any(|n| n.stemto.is_some())
}

/// Shared inputs of the effective-width computations for one measure.
struct Measure<'a> {
    chords: &'a [ChordId],
    state: &'a ParamState,
    metrics: &'a dyn TextMetrics,
}

impl Measure<'_> {
    fn scale(&self, score: &Score, g: GsId) -> f64 {
        self.state.staffscale(score.gs(g).staffno)
    }

    fn collides_with(&self, score: &Score, chord: ChordId, g: GsId, g_is_left: bool) -> Vec<GsId> {
        let scale = self.scale(score, g);
        groups_on(score, chord, score.gs(g).staffno)
            .into_iter()
            .filter(|&h| {
                if g_is_left {
                    collision_danger(score, g, h, scale, self.metrics)
                } else {
                    collision_danger(score, h, g, scale, self.metrics)
                }
            })
            .collect()
    }

    /// How far west of chord `i`'s center group `g` must reach, given that it
    /// may overhang into earlier chords where nothing could collide with it.
    fn effwest(&self, score: &Score, i: usize, g: GsId) -> f64 {
        let true_w = score.west_with_graces(g);
        if i == 0 {
            return true_w;
        }
        let tol = -EFF_TOLERANCE * STEPSIZE * self.scale(score, g);
        let prev = score.chord(self.chords[i - 1]);
        // with chord west `w`, g's west edge lands at phantom `base - w`
        let base = prev.phantom_x + prev.east + true_w;

        // the measure starts at phantom 0; then the nearest earlier chord
        // holding something g could hit
        let mut bound = base;
        for k in (0..i.saturating_sub(1)).rev() {
            let hits = self.collides_with(score, self.chords[k], g, false);
            if !hits.is_empty() {
                let x = score.chord(self.chords[k]).phantom_x;
                for h in hits {
                    bound = bound.min(base - (x + score.gs(h).c.east));
                }
                break;
            }
        }

        let prev_hits = !self.collides_with(score, self.chords[i - 1], g, false).is_empty();
        let preferred = if prev_hits || true_w >= tol || has_cross_staff_stem(score.gs(g).expect_group()) {
            true_w
        } else {
            true_w.max(bound.min(tol))
        };
        preferred.min(bound)
    }

    /// How far east of chord `i`'s center group `g` must reach.
    fn effeast(&self, score: &Score, i: usize, g: GsId) -> f64 {
        let true_e = score.gs(g).c.east;
        if i + 1 == self.chords.len() {
            return true_e;
        }
        let tol = EFF_TOLERANCE * STEPSIZE * self.scale(score, g);
        if true_e <= tol
            || has_cross_staff_stem(score.gs(g).expect_group())
            || !self.collides_with(score, self.chords[i + 1], g, true).is_empty()
        {
            true_e
        } else {
            tol
        }
    }

    /// Width of a mid-measure clef drawn in front of `g`, or zero.
    fn clef_width(&self, score: &Score, g: GsId) -> f64 {
        let target = score.first_grace_before(g);
        match score.gs(target).group().and_then(|gr| gr.clef) {
            Some(clef) => {
                let size = (DFLT_SIZE as f64 * MIDMEAS_CLEF_FACTOR).round() as u8;
                let w = self.metrics.char_width(Font::Music, size, clef.glyph()) + STDPAD;
                w * self.scale(score, g)
            }
            None => 0.0,
        }
    }
}

/// Pass A: chord extents from their groups.
fn relax_groups(score: &mut Score, m: &Measure) {
    for i in 0..m.chords.len() {
        let members: Vec<GsId> = score
            .chord_members(m.chords[i])
            .into_iter()
            .filter(|g| {
                let gs = score.gs(*g);
                gs.is_group() && m.state.visible(gs.staffno)
            })
            .collect();

        let (mut west, mut east, mut clef) = (0.0f64, 0.0f64, 0.0f64);
        for &g in &members {
            west = west.min(m.effwest(score, i, g));
            east = east.max(m.effeast(score, i, g));
            clef = clef.max(m.clef_width(score, g));
        }

        // a clef in front of a chord is drawn in the previous chord's space
        if clef > 0.0 && i > 0 {
            let prev = score.chord_mut(m.chords[i - 1]);
            prev.east = prev.east.max(clef);
        } else if clef > 0.0 {
            west -= clef;
        }

        let chord = score.chord_mut(m.chords[i]);
        chord.west = west;
        chord.east = east;
        if i == 0 {
            chord.phantom_x = -west;
        } else {
            let prev = score.chord(m.chords[i - 1]);
            let x = prev.phantom_x + prev.east - west;
            score.chord_mut(m.chords[i]).phantom_x = x;
        }
    }
}

fn syllables_of(score: &Score, chord: ChordId, state: &ParamState) -> Vec<GsId> {
    score
        .chord_members(chord)
        .into_iter()
        .filter(|g| {
            let gs = score.gs(*g);
            !gs.is_group() && state.visible(gs.staffno)
        })
        .collect()
}

/// Farthest east, relative to chord `i`'s center, that syllable `s` may
/// reach without running into the next printed syllable of its verse.
fn get_east_limit(score: &Score, chords: &[ChordId], i: usize, s: GsId) -> f64 {
    let next = score.next_printed(s);
    let mut edge = score.chord(chords[i]).east;
    for &c in &chords[i + 1..] {
        let chord = score.chord(c);
        if let Some(n) = next.filter(|n| score.gs(*n).chord == Some(c)) {
            return edge - chord.west + score.gs(n).c.west;
        }
        edge += chord.east - chord.west;
    }
    edge
}

/// Farthest west, relative to chord `i`'s center, that syllable `s` may
/// reach without running into the previous printed syllable of its verse.
fn get_west_limit(score: &Score, chords: &[ChordId], i: usize, s: GsId) -> f64 {
    let prev = score.prev_printed(s);
    let mut edge = score.chord(chords[i]).west;
    for &c in chords[..i].iter().rev() {
        let chord = score.chord(c);
        if let Some(p) = prev.filter(|p| score.gs(*p).chord == Some(c)) {
            return edge - chord.east + score.gs(p).c.east;
        }
        edge -= chord.east - chord.west;
    }
    edge
}

/// Pass B: right to left, make room for syllables reaching east.
fn relax_syllables_east(score: &mut Score, chords: &[ChordId], state: &ParamState) {
    let n = chords.len();
    for i in (0..n).rev() {
        for s in syllables_of(score, chords[i], state) {
            let east = score.gs(s).c.east;
            if east <= score.chord(chords[i]).east {
                continue;
            }
            if i + 1 == n {
                score.chord_mut(chords[i]).east = east;
                continue;
            }
            let limit = get_east_limit(score, chords, i, s);
            if east > limit {
                score.chord_mut(chords[i]).east += east - limit;
            }
        }
    }
    set_phantom_x(score, chords);
}

/// Pass C: left to right, make room for syllables reaching west.
fn relax_syllables_west(score: &mut Score, chords: &[ChordId], state: &ParamState) {
    for i in 0..chords.len() {
        for s in syllables_of(score, chords[i], state) {
            let west = score.gs(s).c.west;
            if west >= score.chord(chords[i]).west {
                continue;
            }
            if i == 0 {
                score.chord_mut(chords[i]).west = west;
                continue;
            }
            let limit = get_west_limit(score, chords, i, s);
            if west < limit {
                score.chord_mut(chords[i]).west -= limit - west;
            }
        }
    }
    set_phantom_x(score, chords);
}

/// Passes A to C over every measure.
pub fn relxchord(score: &mut Score, metrics: &dyn TextMetrics) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut measures = 0;
    for id in score.main_ids() {
        match &score.node(id).item {
            MainItem::Ssv(u) => {
                state.apply(u);
                continue;
            }
            MainItem::ChHead(_) => {}
            _ => continue,
        }
        let chords = score.measure_chords(id);
        if chords.is_empty() {
            continue;
        }
        let m = Measure {
            chords: &chords,
            state: &state,
            metrics,
        };
        relax_groups(score, &m);
        relax_syllables_east(score, &chords, &state);
        relax_syllables_west(score, &chords, &state);
        measures += 1;
    }
    log::debug!("relxchord: relaxed {} measures", measures);
    measures
}

/// Final chord widths and phantom positions.
pub fn finish(score: &mut Score) {
    for id in score.main_ids() {
        if !matches!(score.node(id).item, MainItem::ChHead(_)) {
            continue;
        }
        let chords = score.measure_chords(id);
        for &c in &chords {
            let chord = score.chord_mut(c);
            chord.width = chord.east - chord.west;
        }
        set_phantom_x(score, &chords);
    }
}
