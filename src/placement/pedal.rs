//! Room between consecutive pedal marks drawn as glyphs.

use crate::metrics::{glyph, Font, TextMetrics, DFLT_SIZE};
use crate::model::*;
use crate::params::{ParamState, PedalStyle};

use super::relax::set_phantom_x;

/// Chord whose start time is nearest `t`. Ties go to the earlier chord.
pub fn closestchord(score: &Score, chords: &[ChordId], t: RatTime) -> Option<usize> {
    let mut best: Option<(usize, RatTime)> = None;
    for (i, &c) in chords.iter().enumerate() {
        let diff = score.chord(c).starttime - t;
        let d = if diff < rat_zero() { -diff } else { diff };
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Half widths (left, right) a pedal mark needs around its chord.
pub fn pedal_halfwidths(mark: PedalMark, style: PedalStyle, scale: f64, metrics: &dyn TextMetrics) -> (f64, f64) {
    let ped = metrics.char_width(Font::Music, DFLT_SIZE, glyph::PEDAL_PED) * scale;
    let up = metrics.char_width(Font::Music, DFLT_SIZE, glyph::PEDAL_UP) * scale;
    match (mark, style) {
        (PedalMark::Begin, _) => (ped / 2.0, ped / 2.0),
        (PedalMark::End, _) => (up / 2.0, up / 2.0),
        (PedalMark::Change, PedalStyle::AltPedStar) => (ped / 2.0, ped / 2.0),
        // "*" then "Ped." side by side
        (PedalMark::Change, _) => (up + ped / 2.0, ped / 2.0),
    }
}

fn widen_for_pedals(
    score: &mut Score,
    chords: &[ChordId],
    marks: &[(RatTime, PedalMark)],
    style: PedalStyle,
    scale: f64,
    metrics: &dyn TextMetrics,
) -> usize {
    let mut widened = 0;
    for pair in marks.windows(2) {
        let (Some(a), Some(b)) = (
            closestchord(score, chords, pair[0].0),
            closestchord(score, chords, pair[1].0),
        ) else {
            continue;
        };
        if b <= a {
            continue;
        }
        let (_, right) = pedal_halfwidths(pair[0].1, style, scale, metrics);
        let (left, _) = pedal_halfwidths(pair[1].1, style, scale, metrics);
        let need = right + left;

        let mut gap = score.chord(chords[a]).east - score.chord(chords[b]).west;
        for &c in &chords[a + 1..b] {
            gap += score.chord(c).east - score.chord(c).west;
        }
        if gap < need {
            score.chord_mut(chords[a]).east += need - gap;
            widened += 1;
        }
    }
    widened
}

/// Pass D: space chords so pedal glyphs on the same staff don't overlap.
pub fn pedal_spacing(score: &mut Score, metrics: &dyn TextMetrics) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut widened = 0;
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
        let mut touched = false;
        for staff in score.measure_staffs(id) {
            let Some(content) = score.staff_content(staff) else {
                continue;
            };
            let style = state.pedstyle(content.staffno);
            if style == PedalStyle::Line || !state.visible(content.staffno) {
                continue;
            }
            let marks: Vec<(RatTime, PedalMark)> = content
                .stuff
                .iter()
                .filter_map(|s| match s.kind {
                    StuffKind::Pedal(p) => Some((s.start, p)),
                    StuffKind::Text(_) => None,
                })
                .collect();
            let scale = state.staffscale(content.staffno);
            let n = widen_for_pedals(score, &chords, &marks, style, scale, metrics);
            touched |= n > 0;
            widened += n;
        }
        if touched {
            set_phantom_x(score, &chords);
        }
    }
    log::debug!("pedal_spacing: widened {} chords", widened);
    widened
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::ScoreParams;
    use pretty_assertions::assert_eq;

    #[test]
    fn ties_go_to_the_earlier_chord() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![StaffSpec::new(1).voice(1, vec![GroupSpec::notes(2, &[0]), GroupSpec::notes(2, &[0])])])
            .bar(Bar::new(BarType::Single));
        let score = b.build(&FixedMetrics::new()).unwrap();
        let chords = score.measure_chords(score.main_ids()[0]);
        assert_eq!(closestchord(&score, &chords, RatTime::new(1, 4)), Some(0));
        assert_eq!(closestchord(&score, &chords, RatTime::new(3, 8)), Some(1));
    }

    #[test]
    fn change_mark_widths_depend_on_style() {
        let m = FixedMetrics::new().with_glyph(glyph::PEDAL_PED, 1.0).with_glyph(glyph::PEDAL_UP, 0.5);
        assert_eq!(
            pedal_halfwidths(PedalMark::Change, PedalStyle::PedStar, 1.0, &m),
            (6.0 + 6.0, 6.0)
        );
        assert_eq!(
            pedal_halfwidths(PedalMark::Change, PedalStyle::AltPedStar, 1.0, &m),
            (6.0, 6.0)
        );
        assert_eq!(pedal_halfwidths(PedalMark::End, PedalStyle::PedStar, 0.5, &m), (1.5, 1.5));
    }
}
