//! Room in front of chords that a subbar will be drawn through.

use crate::model::*;
use crate::params::{ParamState, SubbarDef};

use super::constants::{FUDGE, SUBBAR_SPACE};

fn subbar_allowed(def: &SubbarDef, state: &ParamState, staff: usize) -> bool {
    def.applies_to(staff) && state.visible(staff)
}

fn reserve(score: &mut Score, state: &ParamState, chhead: MainId) -> usize {
    let defs = state.subbars().to_vec();
    if defs.is_empty() {
        return 0;
    }
    let den = state.time().den as f64;
    let chords = score.measure_chords(chhead);
    let mut count = 0;

    for def in &defs {
        for &beat in &def.counts {
            let start = (beat - 1.0) / den;
            // a subbar on the downbeat would sit on the bar line
            if start <= FUDGE {
                continue;
            }
            let Some(&chord) = chords
                .iter()
                .find(|c| (rat_to_f64(score.chord(**c).starttime) - start).abs() < FUDGE)
            else {
                continue;
            };

            let targets: Vec<(GsId, f64)> = score
                .chord_members(chord)
                .into_iter()
                .filter(|g| {
                    let gs = score.gs(*g);
                    gs.is_group() && subbar_allowed(def, state, gs.staffno)
                })
                .map(|g| (score.first_grace_before(g), state.staffscale(score.gs(g).staffno)))
                .collect();
            if targets.is_empty() {
                continue;
            }
            let mut west = f64::INFINITY;
            for &(g, scale) in &targets {
                let c = &mut score.gs_mut(g).c;
                c.west -= SUBBAR_SPACE * scale;
                west = west.min(c.west);
            }
            for &(g, _) in &targets {
                score.gs_mut(g).c.west = west;
            }
            count += 1;
        }
    }
    count
}

/// Widen the leading group on each staff at every subbar position.
pub fn room4subbars(score: &mut Score) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut chhead = None;
    let mut count = 0;
    for id in score.main_ids() {
        match &score.node(id).item {
            MainItem::Ssv(u) => state.apply(u),
            MainItem::ChHead(_) => chhead = Some(id),
            MainItem::Bar(_) => {
                if let Some(h) = chhead.take() {
                    count += reserve(score, &state, h);
                }
            }
            _ => {}
        }
    }
    log::debug!("room4subbars: reserved room at {} positions", count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::{ScoreParams, StaffRange, SubbarLine};
    use pretty_assertions::assert_eq;

    #[test]
    fn room_reserved_on_matching_staffs_only() {
        let params = ScoreParams {
            subbars: vec![SubbarDef {
                line: SubbarLine::Dashed,
                counts: vec![1.0, 3.0],
                staffs: vec![StaffRange { top: 1, bottom: 1 }],
            }],
            ..Default::default()
        };
        let mut b = ScoreBuilder::new(params);
        b.measure(vec![
            StaffSpec::new(1).voice(1, vec![GroupSpec::notes(2, &[0]), GroupSpec::notes(2, &[0])]),
            StaffSpec::new(2).voice(1, vec![GroupSpec::notes(2, &[0]), GroupSpec::notes(2, &[0])]),
        ])
        .bar(Bar::new(BarType::Single));
        let mut score = b.build(&FixedMetrics::new()).unwrap();
        let before: Vec<f64> = score.grpsyls.iter().map(|g| g.c.west).collect();

        // beat 1 is skipped, beat 3 matches the second chord
        assert_eq!(room4subbars(&mut score), 1);
        assert_eq!(score.grpsyls[0].c.west, before[0]);
        assert_eq!(score.grpsyls[1].c.west, before[1] - SUBBAR_SPACE);
        assert_eq!(score.grpsyls[3].c.west, before[3]);
    }

    #[test]
    fn qualifying_staffs_share_one_west_edge() {
        let params = ScoreParams {
            subbars: vec![SubbarDef {
                line: SubbarLine::Dashed,
                counts: vec![3.0],
                staffs: vec![StaffRange { top: 1, bottom: 2 }],
            }],
            ..Default::default()
        };
        let halves = || vec![GroupSpec::notes(2, &[0]), GroupSpec::notes(2, &[0])];
        let mut b = ScoreBuilder::new(params);
        b.measure(vec![StaffSpec::new(1).voice(1, halves()), StaffSpec::new(2).voice(1, halves())])
            .bar(Bar::new(BarType::Single));
        let mut score = b.build(&FixedMetrics::new()).unwrap();
        // staff 2's group already reaches further west
        score.gs_mut(GsId(3)).c.west -= 5.0;
        let wider = score.gs(GsId(3)).c.west;

        assert_eq!(room4subbars(&mut score), 1);
        assert_eq!(score.gs(GsId(1)).c.west, wider - SUBBAR_SPACE);
        assert_eq!(score.gs(GsId(3)).c.west, wider - SUBBAR_SPACE);
    }
}
