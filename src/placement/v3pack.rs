//! Whether voice 3 can tuck in tightly beside voices 1 and 2.

use crate::metrics::TextMetrics;
use crate::model::*;

use super::groups::{accdimen, group_size};

/// Where voice 3 may be packed relative to the other voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pack {
    /// No tight packing; voice 3 goes beside everything else.
    None,
    /// Immediately left of voice 1's noteheads.
    Left,
    /// Immediately right of voice 2's noteheads.
    Right,
    /// In line with the other voices.
    Center,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Against {
    /// The other voice sits above voice 3.
    Upper,
    /// The other voice sits below voice 3.
    Lower,
}

/// Decide how voice 3 packs against the others at one chord on one staff.
/// `groups` are that staff's non-space groups in voice order.
pub fn v3pack(score: &Score, groups: &[GsId], metrics: &dyn TextMetrics) -> Pack {
    if groups
        .iter()
        .any(|g| score.gs(*g).expect_group().horz != HorzOffset::None)
    {
        return Pack::None;
    }
    let find = |v: u8| groups.iter().copied().find(|g| score.gs(*g).vno == v);
    let Some(v3) = find(3) else {
        return Pack::None;
    };
    let gs3 = score.gs(v3);
    let g3 = gs3.expect_group();
    if g3.pvno != 3
        || gs3.basictime <= BT_QUAD
        || g3.slash_alt != 0
        || !g3.withlist.is_empty()
        || g3.roll
        || g3.cont != GrpCont::Notes
        || g3.is_mrpt()
        || g3.notes.is_empty()
    {
        return Pack::None;
    }

    let side = match g3.stemdir {
        Some(StemDir::Up) => Pack::Right,
        Some(StemDir::Down) => Pack::Left,
        None => Pack::Center,
    };
    let (v1, v2) = (find(1), find(2));
    let fits = match side {
        Pack::Left => v1.is_some_and(|g| packs_against(score, metrics, v3, g, Against::Upper, side)),
        Pack::Right => v2.is_some_and(|g| packs_against(score, metrics, v3, g, Against::Lower, side)),
        _ => {
            (v1.is_some() || v2.is_some())
                && v1.map_or(true, |g| packs_against(score, metrics, v3, g, Against::Upper, side))
                && v2.map_or(true, |g| packs_against(score, metrics, v3, g, Against::Lower, side))
        }
    };
    if fits {
        side
    } else {
        Pack::None
    }
}

fn packs_against(
    score: &Score,
    metrics: &dyn TextMetrics,
    v3: GsId,
    other: GsId,
    against: Against,
    side: Pack,
) -> bool {
    let (gs3, gso) = (score.gs(v3), score.gs(other));
    let (g3, go) = (gs3.expect_group(), gso.expect_group());
    if go.cont != GrpCont::Notes || go.is_mrpt() || go.notes.is_empty() {
        return false;
    }
    let expected = match against {
        Against::Upper => StemDir::Up,
        Against::Lower => StemDir::Down,
    };
    if go.stemdir != Some(expected) {
        return false;
    }

    let (upper, lower) = match against {
        Against::Upper => (go.bottom_note(), g3.top_note()),
        Against::Lower => (g3.bottom_note(), go.top_note()),
    };
    let (Some(upper), Some(lower)) = (upper, lower) else {
        return false;
    };
    let dist = upper.stepsup - lower.stepsup;
    if dist != 2 {
        return dist > 2;
    }

    // Two steps apart: the heads clear each other only if nothing hangs off
    // the side where they meet.
    let (v3_note, other_note) = match against {
        Against::Upper => (lower, upper),
        Against::Lower => (upper, lower),
    };
    if v3_note.note_paren || other_note.note_paren {
        return false;
    }
    let ((left_gs, left_note), (right_gs, right_note)) = match side {
        Pack::Left => ((gs3, v3_note), (gso, other_note)),
        Pack::Right => ((gso, other_note), (gs3, v3_note)),
        _ => {
            // in line: any dot or accidental on either note collides
            return gs3.dots == 0
                && gso.dots == 0
                && v3_note.accidental.is_none()
                && other_note.accidental.is_none();
        }
    };
    if left_gs.dots > 0 {
        return false;
    }
    let size = group_size(right_gs.expect_group());
    match accdimen(metrics, right_note, size, 1.0) {
        Some(acc) => !(acc.south < left_note.c.north && left_note.c.south < acc.north),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::{ScoreParams, VoiceScheme};
    use pretty_assertions::assert_eq;

    fn chord_groups(v1: Vec<GroupSpec>, v2: Vec<GroupSpec>, v3: Vec<GroupSpec>) -> (Score, Vec<GsId>) {
        let params = ScoreParams {
            vscheme: VoiceScheme::ThreeOpposingStems,
            ..Default::default()
        };
        let mut b = ScoreBuilder::new(params);
        b.measure(vec![StaffSpec::new(1)
            .voice(1, v1)
            .voice(2, v2)
            .voice(3, v3)])
            .bar(Bar::new(BarType::Single));
        let score = b.build(&FixedMetrics::new()).unwrap();
        let groups = score.chord_members_on(ChordId(0), 1);
        (score, groups)
    }

    fn halves(steps: i32) -> Vec<GroupSpec> {
        vec![GroupSpec::notes(2, &[steps]), GroupSpec::notes(2, &[steps])]
    }

    #[test]
    fn stem_down_voice_three_packs_left() {
        let (score, groups) = chord_groups(
            halves(4),
            halves(-6),
            vec![GroupSpec::notes(2, &[0]).stem(StemDir::Down), GroupSpec::notes(2, &[0])],
        );
        assert_eq!(v3pack(&score, &groups, &FixedMetrics::new()), Pack::Left);
    }

    #[test]
    fn two_steps_with_dots_on_the_left_does_not_pack() {
        let (score, groups) = chord_groups(
            halves(2),
            halves(-6),
            vec![GroupSpec::notes(2, &[0]).stem(StemDir::Down).dots(1), GroupSpec::notes(4, &[0])],
        );
        assert_eq!(v3pack(&score, &groups, &FixedMetrics::new()), Pack::None);
    }

    #[test]
    fn stem_up_voice_three_packs_right_of_voice_two() {
        let (score, groups) = chord_groups(
            halves(6),
            halves(0),
            vec![GroupSpec::notes(2, &[-4]).stem(StemDir::Up), GroupSpec::notes(2, &[-4])],
        );
        assert_eq!(v3pack(&score, &groups, &FixedMetrics::new()), Pack::Right);
    }

    #[test]
    fn horizontal_request_disables_packing() {
        let (score, groups) = chord_groups(
            vec![GroupSpec::notes(1, &[4])],
            vec![GroupSpec::notes(1, &[-4])],
            vec![GroupSpec::notes(1, &[0]).horz(HorzOffset::Right)],
        );
        assert_eq!(v3pack(&score, &groups, &FixedMetrics::new()), Pack::None);
        // same input, same answer
        assert_eq!(v3pack(&score, &groups, &FixedMetrics::new()), Pack::None);
    }
}
