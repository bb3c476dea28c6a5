//! Provisional absolute horizontal positions.
//!
//! Full justification belongs to the later spacing phase. Extender drawing
//! only needs chords, bars and score edges at some consistent absolute X, so
//! measures are packed left to right at their relaxed widths.

use crate::model::*;
use crate::placement::constants::{BAR_PAD, CLEFSIG_WIDTH, LEFT_MARGIN};

/// Give every chord, bar and feed an absolute X. Returns the widest score
/// line seen.
pub fn pack_absolute(score: &mut Score) -> f64 {
    let mut x = LEFT_MARGIN;
    let mut widest = 0.0f64;
    for id in score.main_ids() {
        let mut is_head = false;
        match &mut score.node_mut(id).item {
            MainItem::ChHead(_) => is_head = true,
            MainItem::Bar(bar) => {
                bar.ax = Some(x + BAR_PAD / 2.0);
                x += BAR_PAD;
            }
            MainItem::Feed(feed) => {
                feed.east_edge = Some(x);
                widest = widest.max(x);
                x = LEFT_MARGIN;
            }
            MainItem::ClefSig(clefsig) => {
                x += CLEFSIG_WIDTH;
                if let Some(bar) = clefsig.pseudo_bar.as_mut() {
                    bar.ax = Some(x);
                }
            }
            _ => {}
        }
        if is_head {
            for c in score.measure_chords(id) {
                let chord = score.chord_mut(c);
                let ax = x - chord.west;
                chord.ax = Some(ax);
                x = ax + chord.east;
            }
        }
    }
    widest.max(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::ScoreParams;
    use pretty_assertions::assert_eq;

    #[test]
    fn measures_pack_edge_to_edge() {
        let metrics = FixedMetrics::new();
        let halves = || StaffSpec::new(1).voice(1, vec![GroupSpec::notes(2, &[0]), GroupSpec::notes(2, &[0])]);
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![halves()])
            .bar(Bar::new(BarType::Single))
            .feed()
            .clefsig(None)
            .measure(vec![halves()])
            .bar(Bar::new(BarType::End));
        let mut score = b.build(&metrics).unwrap();
        crate::placement::restsyl(&mut score, &metrics);
        pack_absolute(&mut score);

        let ids = score.main_ids();
        let first = score.measure_chords(ids[0]);
        let (a, b2) = (score.chord(first[0]), score.chord(first[1]));
        assert_eq!(a.ax, Some(LEFT_MARGIN - a.west));
        assert_eq!(b2.ax.unwrap() + b2.west, a.ax.unwrap() + a.east);

        let bar = ids.iter().find_map(|id| score.bar(*id)).unwrap();
        assert_eq!(bar.ax, Some(b2.ax.unwrap() + b2.east + BAR_PAD / 2.0));

        let second_head = ids
            .iter()
            .copied()
            .filter(|id| matches!(score.node(*id).item, MainItem::ChHead(_)))
            .nth(1)
            .unwrap();
        let c = score.chord(score.measure_chords(second_head)[0]);
        assert_eq!(c.ax.unwrap() + c.west, LEFT_MARGIN + CLEFSIG_WIDTH);
    }
}
