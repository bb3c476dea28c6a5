//! Lyric extenders: the dashes after a hyphenated syllable and the line
//! drawn under a held one.
//!
//! Extenders are placed in absolute coordinates, so both entry points run
//! after [`crate::abspos::pack_absolute`]. [`plan_extenders`] is a dry run
//! that finds extenders continuing past a line break and gives the next line
//! a syllable to draw the continuation from. [`draw_extenders`] then records
//! every mark and strips the extender characters from the syllable text.

mod boundary;
mod carry;
mod dashes;
mod underscore;

pub use boundary::{bar_ends_extender, pseudo_bar_ends_extender, LyricLine};
pub use carry::cont_extender;
pub use dashes::end_dashes;
pub use underscore::{end_underscore, has_above_lyr};

use crate::metrics::TextMetrics;
use crate::model::*;
use crate::params::ParamState;
use crate::placement::constants::{DASH_SINGLE_LIMIT, DASH_SPACING, STEPSIZE};

/// Where an extender stops, and whether it goes on at the start of the
/// next score line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtEnd {
    pub x: f64,
    pub carry: bool,
}

impl ExtEnd {
    pub fn stop(x: f64) -> Self {
        Self { x, carry: false }
    }
}

/// Outcome of spreading one extender.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spread {
    pub carry: bool,
    /// Only filled in when actually printing.
    pub mark: Option<ExtenderMark>,
}

fn line_of(score: &Score, syl: GsId) -> LyricLine {
    let gs = score.gs(syl);
    (gs.staffno, gs.vno, gs.expect_syllable().place)
}

/// `first` itself if it prints, otherwise the next syllable that does.
fn first_printed(score: &Score, first: GsId) -> Option<GsId> {
    if score.gs(first).expect_syllable().is_space() {
        score.next_printed(first)
    } else {
        Some(first)
    }
}

/// Absolute X of a syllable's west edge.
fn west_ax(score: &Score, syl: GsId) -> f64 {
    score.owner_ax(syl) + score.gs(syl).c.west
}

/// End time of the measure a STAFF node belongs to.
fn measure_end(score: &Score, staff_node: MainId) -> RatTime {
    score
        .measure_chords(score.chhead_of(staff_node))
        .last()
        .map(|c| score.chord(*c).endtime())
        .unwrap_or_else(rat_zero)
}

/// Centers of the dashes filling `[start, end]`. A short gap gets one dash
/// in the middle; a longer one gets dashes spread evenly across it.
pub fn dash_positions(start: f64, end: f64, dash_width: f64) -> Option<Vec<f64>> {
    let gap = end - start;
    if gap <= 0.0 {
        return None;
    }
    if dash_width <= 0.0 || gap < DASH_SINGLE_LIMIT * dash_width {
        return Some(vec![start + gap / 2.0]);
    }
    let n = (gap / (DASH_SPACING * dash_width)).floor() as usize;
    Some((1..=n).map(|k| start + k as f64 * gap / (n + 1) as f64).collect())
}

/// Work out the extender of syllable `syl`, which lives in STAFF node
/// `staff_node`. `stepsize` is the staff's scaled step; an underscore
/// shorter than that is not drawn.
pub fn spread_extender(
    score: &Score,
    metrics: &dyn TextMetrics,
    syl: GsId,
    staff_node: MainId,
    stepsize: f64,
    really_print: bool,
) -> Spread {
    let gs = score.gs(syl);
    let s = gs.expect_syllable();
    let Some(ext) = s.extender() else {
        return Spread::default();
    };
    let mut text = s.text.clone();
    text.pop_char();
    let start = west_ax(score, syl) + metrics.str_width(&text);

    let (end, kind) = if ext == '-' {
        let end = end_dashes(score, syl, staff_node);
        let (font, size) = s.text.final_font();
        let dash = metrics.char_width(font, size, '-');
        let kind = dash_positions(start, end.x, dash).map(|xs| ExtenderKind::Dashes { xs });
        (end, kind)
    } else {
        let end = end_underscore(score, syl, staff_node, start);
        let kind = (end.x - start > stepsize).then_some(ExtenderKind::Underscore { x0: start, x1: end.x });
        (end, kind)
    };

    let mark = if really_print {
        let (staffno, verse, place) = line_of(score, syl);
        kind.map(|kind| ExtenderMark {
            staffno,
            verse,
            place,
            syllable: syl,
            kind,
        })
    } else {
        None
    };
    Spread { carry: end.carry, mark }
}

fn syllables_in(score: &Score, staff_node: MainId) -> Vec<GsId> {
    let Some(content) = score.staff_content(staff_node) else {
        return Vec::new();
    };
    content
        .syls
        .iter()
        .flat_map(|l| score.timed_list(Some(l.first)))
        .map(|(s, _)| s)
        .filter(|s| score.gs(*s).expect_syllable().extender().is_some())
        .collect()
}

/// Dry run: continue every extender that runs past a line break onto the
/// next line. Returns how many were carried.
pub fn plan_extenders(score: &mut Score, metrics: &dyn TextMetrics) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut carried = 0;
    for id in score.main_ids() {
        match &score.node(id).item {
            MainItem::Ssv(u) => {
                state.apply(u);
                continue;
            }
            MainItem::Staff(_) => {}
            _ => continue,
        }
        for syl in syllables_in(score, id) {
            let staffno = score.gs(syl).staffno;
            if !state.visible(staffno) {
                continue;
            }
            let step = STEPSIZE * state.staffscale(staffno);
            if spread_extender(score, metrics, syl, id, step, false).carry {
                cont_extender(score, syl, id);
                carried += 1;
            }
        }
    }
    log::debug!("plan_extenders: {} extenders carried to the next line", carried);
    carried
}

/// Record every extender mark, then drop the extender characters from the
/// syllables. All marks are computed before any text changes, since a held
/// syllable above the staff steers where lines below it end.
pub fn draw_extenders(score: &mut Score, metrics: &dyn TextMetrics) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut marks = Vec::new();
    let mut done = Vec::new();
    for id in score.main_ids() {
        match &score.node(id).item {
            MainItem::Ssv(u) => {
                state.apply(u);
                continue;
            }
            MainItem::Staff(_) => {}
            _ => continue,
        }
        for syl in syllables_in(score, id) {
            let staffno = score.gs(syl).staffno;
            if state.visible(staffno) {
                let step = STEPSIZE * state.staffscale(staffno);
                marks.extend(spread_extender(score, metrics, syl, id, step, true).mark);
            }
            done.push(syl);
        }
    }
    for syl in done {
        if let Some(s) = score.gs_mut(syl).syllable_mut() {
            s.text.pop_char();
        }
    }
    let n = marks.len();
    score.extenders.extend(marks);
    log::debug!("draw_extenders: {} marks", n);
    n
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_gap_gets_one_centered_dash() {
        assert_eq!(dash_positions(10.0, 40.0, 4.0), Some(vec![25.0]));
    }

    #[test]
    fn long_gap_spreads_dashes_evenly() {
        // 96 / (8 * 4) = 3 dashes, at quarters of the gap
        assert_eq!(dash_positions(0.0, 96.0, 4.0), Some(vec![24.0, 48.0, 72.0]));
    }

    #[test]
    fn no_room_no_dash() {
        assert_eq!(dash_positions(40.0, 40.0, 4.0), None);
        assert_eq!(dash_positions(40.0, 30.0, 4.0), None);
    }
}
