//! Vertical placement and boxes of rests, and zero boxes for spaces.

use crate::metrics::{glyph, Font, TextMetrics, DFLT_SIZE, SMALLSIZE};
use crate::model::*;
use crate::params::ParamState;

use super::constants::*;

/// Groups in the given voice list, plus voice-3 groups standing in for
/// `stand_for`, that overlap `[start, end)`. Graces never count.
fn overlapping<'a>(
    score: &'a Score,
    first: Option<GsId>,
    v3: Option<GsId>,
    stand_for: u8,
    start: RatTime,
    end: RatTime,
) -> impl Iterator<Item = &'a GrpSyl> + 'a {
    let own = score.timed_list(first);
    let stand_ins = score
        .timed_list(v3)
        .into_iter()
        .filter(move |(g, _)| score.gs(*g).expect_group().pvno == stand_for);
    own.into_iter()
        .chain(stand_ins)
        .filter(move |(g, t)| {
            let gs = score.gs(*g);
            !gs.is_grace() && *t < end && start < *t + gs.fulltime
        })
        .map(move |(g, _)| score.gs(g))
}

/// Extreme of the other voice over a time span, in steps snapped outward to
/// a staff line. `Some(0)` when it only has rests there, `None` when it only
/// has spaces (or nothing).
fn extreme(
    groups: impl Iterator<Item = (f64, GrpCont, bool)>,
    pick_max: bool,
) -> Option<i32> {
    let mut best: Option<f64> = None;
    let mut rest = false;
    for (edge, cont, mrpt) in groups {
        match cont {
            GrpCont::Notes if !mrpt => {
                best = Some(match best {
                    Some(b) if pick_max => b.max(edge),
                    Some(b) => b.min(edge),
                    None => edge,
                });
            }
            GrpCont::Notes | GrpCont::Rest => rest = true,
            GrpCont::Space => {}
        }
    }
    match best {
        Some(edge) => {
            let steps = edge / STEPSIZE;
            let steps = (if pick_max { steps.ceil() } else { steps.floor() }) as i32;
            // snap to a line, away from the middle of the other voice
            Some(if steps % 2 == 0 {
                steps
            } else if pick_max {
                steps + 1
            } else {
                steps - 1
            })
        }
        None if rest => Some(0),
        None => None,
    }
}

/// Top of the other (lower) voice over a time span.
pub fn highcoord(
    score: &Score,
    first: Option<GsId>,
    v3: Option<GsId>,
    stand_for: u8,
    start: RatTime,
    end: RatTime,
) -> Option<i32> {
    let groups = overlapping(score, first, v3, stand_for, start, end).map(|gs| {
        let g = gs.expect_group();
        (gs.c.north, g.cont, g.is_mrpt())
    });
    extreme(groups, true)
}

/// Bottom of the other (upper) voice over a time span.
pub fn lowcoord(
    score: &Score,
    first: Option<GsId>,
    v3: Option<GsId>,
    stand_for: u8,
    start: RatTime,
    end: RatTime,
) -> Option<i32> {
    let groups = overlapping(score, first, v3, stand_for, start, end).map(|gs| {
        let g = gs.expect_group();
        (gs.c.south, g.cont, g.is_mrpt())
    });
    extreme(groups, false)
}

/// Extra distance (in steps) a rest of this basic time needs from the
/// other voice. Negative values pull the rest toward the middle line.
pub fn rest_nudge(basictime: i32) -> i32 {
    match basictime {
        b if b <= BT_QUAD => 0,
        b if b <= 2 => REST_NUDGE_LONG,
        b if b >= 256 => REST_NUDGE_256,
        b if b >= 128 => REST_NUDGE_128,
        b if b >= 16 => REST_NUDGE_16,
        _ => 0,
    }
}

/// Vertical position of a rest, in steps above the middle line.
fn rest_steps(score: &Score, state: &ParamState, content: &StaffContent, id: GsId, start: RatTime) -> f64 {
    let gs = score.gs(id);
    let group = gs.expect_group();
    let bt = if group.is_meas { 1 } else { gs.basictime };
    if let Some(dist) = group.restdist {
        return dist as f64;
    }
    let centered = || {
        if state.stafflines(gs.staffno) == 1 && bt == 1 {
            ONE_LINE_WHOLE_REST as f64
        } else {
            0.0
        }
    };
    if state.vscheme(gs.staffno).is_single() {
        return centered();
    }
    let voice = if gs.vno == 3 { group.pvno } else { gs.vno };
    let end = start + gs.fulltime;
    let nudge = rest_nudge(bt);
    let cue = if group.size == GrpSize::Cue && bt <= 1 {
        CUE_REST_NUDGE
    } else {
        0.0
    };
    match voice {
        1 => match highcoord(score, content.groups[1], content.groups[2], 2, start, end) {
            None => centered(),
            Some(hi) => {
                let base = hi + REST_CLEARANCE;
                let steps = (base + nudge).max(0i32.min(base));
                steps as f64 + cue
            }
        },
        2 => match lowcoord(score, content.groups[0], content.groups[2], 1, start, end) {
            None => centered(),
            Some(lo) => {
                let base = lo - REST_CLEARANCE;
                let steps = (base - nudge).min(0i32.max(base));
                steps as f64 - cue
            }
        },
        _ => centered(),
    }
}

/// Box of a rest drawn at `steps` above the middle line.
fn rest_box(gs: &mut GrpSyl, steps: f64, metrics: &dyn TextMetrics) {
    let padding = gs.padding;
    let dots = gs.dots;
    let basictime = gs.basictime;
    let group = gs.expect_group_mut();
    let bt = if group.is_meas { 1 } else { basictime };
    let size = if group.is_grace() || group.size == GrpSize::Cue {
        SMALLSIZE
    } else {
        DFLT_SIZE
    };
    let ch = glyph::rest(bt);
    let half = metrics.char_width(Font::Music, size, ch) / 2.0;
    let y = steps * STEPSIZE;

    let mut east = half;
    if dots > 0 {
        let dotw = metrics.char_width(Font::Music, size, glyph::AUGMENTATION_DOT);
        group.xdotr = half + STDPAD + dotw / 2.0;
        east += dots as f64 * (STDPAD + dotw);
    }
    let c = Rect {
        x: 0.0,
        y: 0.0,
        west: -half - padding,
        east,
        north: y + metrics.char_ascent(Font::Music, size, ch),
        south: y - metrics.char_descent(Font::Music, size, ch),
    };
    group.restc = Some(Rect { y, ..c });
    gs.c = c;
}

/// Place every rest vertically and give it a box; give every space an
/// empty box.
pub fn procrests(score: &mut Score, metrics: &dyn TextMetrics) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut count = 0;
    for id in score.main_ids() {
        match &score.node(id).item {
            MainItem::Ssv(u) => {
                state.apply(u);
                continue;
            }
            MainItem::Staff(_) => {}
            _ => continue,
        }
        let Some(content) = score.staff_content(id).cloned() else {
            continue;
        };
        for first in content.groups {
            for (g, t) in score.timed_list(first) {
                match score.gs(g).expect_group().cont {
                    GrpCont::Rest => {
                        let steps = rest_steps(score, &state, &content, g, t);
                        rest_box(score.gs_mut(g), steps, metrics);
                        count += 1;
                    }
                    GrpCont::Space => score.gs_mut(g).c = Rect::default(),
                    GrpCont::Notes => {}
                }
            }
        }
    }
    log::debug!("procrests: placed {} rests", count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::{ScoreParams, VoiceScheme};
    use pretty_assertions::assert_eq;

    fn placed(params: ScoreParams, staff: StaffSpec) -> Score {
        let mut b = ScoreBuilder::new(params);
        b.measure(vec![staff]).bar(Bar::new(BarType::Single));
        let mut score = b.build(&FixedMetrics::new()).unwrap();
        procrests(&mut score, &FixedMetrics::new());
        score
    }

    fn rest_y(score: &Score, id: usize) -> f64 {
        score.grpsyls[id].expect_group().restc.unwrap().y
    }

    #[test]
    fn nudges_by_basic_time() {
        assert_eq!(rest_nudge(BT_QUAD), 0);
        assert_eq!(rest_nudge(1), -2);
        assert_eq!(rest_nudge(4), 0);
        assert_eq!(rest_nudge(16), 2);
        assert_eq!(rest_nudge(128), 4);
        assert_eq!(rest_nudge(256), 6);
    }

    #[test]
    fn single_voice_rest_is_centered() {
        let score = placed(
            ScoreParams::default(),
            StaffSpec::new(1).voice(
                1,
                vec![
                    GroupSpec::rest(4),
                    GroupSpec::notes(2, &[0]),
                    GroupSpec::rest(8).dots(1),
                    GroupSpec::rest(16),
                ],
            ),
        );
        assert_eq!(rest_y(&score, 0), 0.0);
        let r = &score.grpsyls[0];
        assert_eq!(r.c.y, 0.0);
        assert_eq!(r.c.west, -3.0 - STDPAD);
        // dotted eighth rest: head 6, then one dot of 6 with padding
        let r = &score.grpsyls[2];
        assert_eq!(r.c.east, 3.0 + STDPAD + 6.0);
    }

    #[test]
    fn whole_rest_on_one_line_staff_hangs_below() {
        let params = ScoreParams {
            stafflines: 1,
            ..Default::default()
        };
        let score = placed(params, StaffSpec::new(1).voice(1, vec![GroupSpec::measure_rest()]));
        assert_eq!(rest_y(&score, 0), -2.0 * STEPSIZE);
    }

    #[test]
    fn opposing_rests_mirror_each_other() {
        let params = ScoreParams {
            vscheme: VoiceScheme::TwoOpposingStems,
            ..Default::default()
        };
        let score = placed(
            params,
            StaffSpec::new(1)
                .voice(1, vec![GroupSpec::rest(1)])
                .voice(2, vec![GroupSpec::rest(1)]),
        );
        let (hi, lo) = (rest_y(&score, 0), rest_y(&score, 1));
        assert_eq!(hi, -lo);
        // 4 steps clear of the other rest, pulled 2 back for a whole rest
        assert_eq!(hi, 2.0 * STEPSIZE);
    }

    #[test]
    fn rest_clears_the_other_voice() {
        let params = ScoreParams {
            vscheme: VoiceScheme::TwoOpposingStems,
            ..Default::default()
        };
        let score = placed(
            params,
            StaffSpec::new(1)
                .voice(1, vec![GroupSpec::rest(2), GroupSpec::notes(2, &[4])])
                .voice(2, vec![GroupSpec::notes(1, &[2])]),
        );
        // whole note at step 2 reaches step 3, snapped up to the line at 4
        assert_eq!(rest_y(&score, 0), (4 + REST_CLEARANCE + REST_NUDGE_LONG) as f64 * STEPSIZE);
    }

    #[test]
    fn spaces_get_empty_boxes() {
        let score = placed(
            ScoreParams::default(),
            StaffSpec::new(1).voice(1, vec![GroupSpec::space(2), GroupSpec::notes(2, &[0])]),
        );
        assert_eq!(score.grpsyls[0].c, Rect::default());
    }
}
