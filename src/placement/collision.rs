//! Conservative vertical overlap test between groups in neighboring chords.

use crate::metrics::TextMetrics;
use crate::model::*;

use super::constants::STEPSIZE;
use super::groups::{accdimen, group_size};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Notes drawn on this staff: cross-staff notes are out of range.
fn staff_notes(group: &Group) -> Vec<&Note> {
    let own: Vec<&Note> = group.notes.iter().filter(|n| n.stemto.is_none()).collect();
    if own.is_empty() {
        group.notes.iter().collect()
    } else {
        own
    }
}

/// North and south reach of a group, treating a stem as unbounded.
fn vertical_extent(gs: &GrpSyl, side: Side, scale: f64, metrics: &dyn TextMetrics) -> (f64, f64) {
    let group = gs.expect_group();
    if group.cont == GrpCont::Rest {
        return (gs.c.north, gs.c.south);
    }
    let step = STEPSIZE * scale;
    let notes = staff_notes(group);
    let (Some(top), Some(bottom)) = (notes.first(), notes.last()) else {
        return (gs.c.north, gs.c.south);
    };
    let mut north = top.c.y + step;
    let mut south = bottom.c.y - step;

    if top.note_paren {
        north += step / 2.0;
    }
    if bottom.note_paren {
        south -= step / 2.0;
    }
    match side {
        // dots trail to the right, into the next chord
        Side::Left if gs.dots > 0 => {
            north = north.max(top.c.y + top.ydotr + step / 2.0);
        }
        // accidentals lead to the left, into the previous chord
        Side::Right => {
            let size = group_size(group);
            for note in &notes {
                if let Some(acc) = accdimen(metrics, note, size, scale) {
                    north = north.max(acc.north);
                    south = south.min(acc.south);
                }
            }
        }
        Side::Left => {}
    }
    if gs.basictime >= 2 {
        match group.stemdir {
            Some(StemDir::Up) => north = f64::INFINITY,
            Some(StemDir::Down) => south = f64::NEG_INFINITY,
            None => {}
        }
    }
    (north, south)
}

/// Whether `left` (earlier chord) and `right` (later chord) could touch if
/// allowed to overlap horizontally. Errs toward `true`.
pub fn collision_danger(
    score: &Score,
    left: GsId,
    right: GsId,
    scale: f64,
    metrics: &dyn TextMetrics,
) -> bool {
    let (l, r) = (score.gs(left), score.gs(right));
    if l.vno == r.vno {
        return true;
    }
    let (lg, rg) = (l.expect_group(), r.expect_group());
    if lg.cont == GrpCont::Space || rg.cont == GrpCont::Space || lg.is_mrpt() || rg.is_mrpt() {
        return false;
    }
    let (l_north, l_south) = vertical_extent(l, Side::Left, scale, metrics);
    let (r_north, r_south) = vertical_extent(r, Side::Right, scale, metrics);
    l_south < r_north && r_south < l_north
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::{ScoreParams, VoiceScheme};

    fn two_voices(v1: Vec<GroupSpec>, v2: Vec<GroupSpec>) -> Score {
        let params = ScoreParams {
            vscheme: VoiceScheme::TwoOpposingStems,
            ..Default::default()
        };
        let mut b = ScoreBuilder::new(params);
        b.measure(vec![StaffSpec::new(1).voice(1, v1).voice(2, v2)])
            .bar(Bar::new(BarType::Single));
        b.build(&FixedMetrics::new()).unwrap()
    }

    #[test]
    fn stem_up_note_above_low_rest_is_clear() {
        let mut score = two_voices(
            vec![GroupSpec::notes(2, &[4]), GroupSpec::notes(2, &[4])],
            vec![GroupSpec::rest(2), GroupSpec::notes(2, &[-4])],
        );
        let (note, rest) = (GsId(0), GsId(2));
        let r = &mut score.gs_mut(rest).c;
        r.north = 4.0;
        r.south = -8.0;
        // the note's unstemmed side reaches one step below step 4, i.e. 12
        assert!(!collision_danger(&score, note, rest, 1.0, &FixedMetrics::new()));
    }

    #[test]
    fn same_voice_always_collides() {
        let score = two_voices(
            vec![GroupSpec::notes(2, &[4]), GroupSpec::notes(2, &[-8])],
            vec![GroupSpec::measure_space()],
        );
        assert!(collision_danger(&score, GsId(0), GsId(1), 1.0, &FixedMetrics::new()));
    }

    #[test]
    fn spaces_never_collide() {
        let score = two_voices(
            vec![GroupSpec::notes(1, &[0])],
            vec![GroupSpec::measure_space()],
        );
        assert!(!collision_danger(&score, GsId(0), GsId(1), 1.0, &FixedMetrics::new()));
    }

    #[test]
    fn stems_reach_forever() {
        let score = two_voices(
            vec![GroupSpec::notes(2, &[8]), GroupSpec::notes(2, &[-12])],
            vec![GroupSpec::notes(2, &[-8]), GroupSpec::notes(2, &[-2])],
        );
        // stems point away from each other, so only the heads can meet
        assert!(!collision_danger(&score, GsId(0), GsId(3), 1.0, &FixedMetrics::new()));
        // voice 2's stem reaches down past voice 1's low note
        assert!(collision_danger(&score, GsId(2), GsId(1), 1.0, &FixedMetrics::new()));
    }
}
