//! Pass E: mark chords the spacing phase must not squeeze out.

use crate::model::*;

/// A chord stays if anything that sounds or prints overlaps it in time:
/// notes, rests, uncompressible spaces, or a syllable with text.
pub fn fixspace(score: &mut Score) -> usize {
    let mut count = 0;
    for id in score.main_ids() {
        if !matches!(score.node(id).item, MainItem::ChHead(_)) {
            continue;
        }
        // (start, end) of everything that pins a chord in place
        let mut pins: Vec<(RatTime, RatTime)> = Vec::new();
        for staff in score.measure_staffs(id) {
            let Some(content) = score.staff_content(staff) else {
                continue;
            };
            let firsts = content
                .groups
                .iter()
                .flatten()
                .copied()
                .chain(content.syls.iter().map(|l| l.first));
            for first in firsts {
                for (g, t) in score.timed_list(Some(first)) {
                    let gs = score.gs(g);
                    let pins_chord = match &gs.body {
                        GrpSylBody::Group(grp) => !grp.is_grace() && !grp.is_compressible_space(),
                        GrpSylBody::Syllable(s) => !s.is_space(),
                    };
                    if pins_chord {
                        pins.push((t, t + gs.fulltime));
                    }
                }
            }
        }

        for c in score.measure_chords(id) {
            let chord = score.chord_mut(c);
            let (start, end) = (chord.starttime, chord.endtime());
            chord.uncollapsible = pins.iter().any(|&(s, e)| s < end && start < e);
            if chord.uncollapsible {
                count += 1;
            }
        }
    }
    log::debug!("fixspace: {} uncollapsible chords", count);
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, LyricSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::ScoreParams;
    use pretty_assertions::assert_eq;

    #[test]
    fn spaces_collapse_unless_pinned() {
        let h = RatTime::new(1, 2);
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![
            StaffSpec::new(1).voice(
                1,
                vec![GroupSpec::space(2), GroupSpec::space(4), GroupSpec::space(4).uncompressible()],
            ),
            StaffSpec::new(2)
                .voice(1, vec![GroupSpec::measure_space()])
                .lyrics(LyricSpec::below(1).syl("", h).syl("la", h)),
        ])
        .bar(Bar::new(BarType::Single));
        let mut score = b.build(&FixedMetrics::new()).unwrap();
        fixspace(&mut score);

        let chords = score.measure_chords(score.main_ids()[0]);
        let flags: Vec<bool> = chords.iter().map(|c| score.chord(*c).uncollapsible).collect();
        // chords at 0, 1/2 and 3/4; "la" covers the second half
        assert_eq!(flags, vec![false, true, true]);
    }
}
