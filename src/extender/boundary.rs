//! Bars that stop an extender from running on.

use crate::model::*;
use crate::pfatal;

/// Staff, verse and place of the lyric line an extender belongs to.
pub type LyricLine = (usize, u8, Place);

fn ends_at(bartype: BarType) -> bool {
    matches!(bartype, BarType::Restart | BarType::RepeatEnd | BarType::RepeatBoth)
}

fn previous_bar(score: &Score, id: MainId) -> Option<&Bar> {
    let mut cur = score.node(id).prev;
    while let Some(p) = cur {
        if let Some(bar) = score.bar(p) {
            return Some(bar);
        }
        cur = score.node(p).prev;
    }
    None
}

/// First syllable of `line` in the first measure after a repeat start,
/// searching back from a repeat-end bar.
fn repeat_target(score: &Score, bar: MainId, line: LyricLine) -> Option<GsId> {
    let (staffno, verse, place) = line;
    let mut start = score.head;
    let mut cur = score.node(bar).prev;
    while let Some(p) = cur {
        if let Some(b) = score.bar(p) {
            if matches!(b.bartype, BarType::RepeatStart | BarType::RepeatBoth) {
                start = score.node(p).next;
                break;
            }
        }
        cur = score.node(p).prev;
    }

    let mut cur = start;
    while let Some(id) = cur {
        match &score.node(id).item {
            MainItem::Staff(content) if content.staffno == staffno => {
                return content.syl_list(verse, place);
            }
            MainItem::Bar(_) => return None,
            _ => {}
        }
        cur = score.node(id).next;
    }
    None
}

/// Whether the bar at `id` terminates an extender, and for a repeat end,
/// the syllable sung next on `line`.
///
/// Restart bars and repeat ends always terminate. So does the bar that
/// begins a second (or later) ending.
pub fn bar_ends_extender(score: &Score, id: MainId, line: Option<LyricLine>) -> (bool, Option<GsId>) {
    let Some(bar) = score.bar(id) else {
        pfatal!(loc = &score.node(id).origin; "expected a bar")
    };
    match bar.bartype {
        BarType::Restart => return (true, None),
        BarType::RepeatEnd | BarType::RepeatBoth => {
            return (true, line.and_then(|l| repeat_target(score, id, l)));
        }
        _ => {}
    }
    if bar.endingloc == EndingLoc::StartItem {
        if let Some(prev) = previous_bar(score, id) {
            if matches!(prev.endingloc, EndingLoc::StartItem | EndingLoc::InItem) {
                return (true, None);
            }
        }
    }
    (false, None)
}

/// Whether the pseudo-bar drawn at the start of the score after `feed`
/// terminates an extender carried over the line break.
pub fn pseudo_bar_ends_extender(score: &Score, feed: MainId) -> bool {
    let mut cur = score.node(feed).next;
    while let Some(id) = cur {
        match &score.node(id).item {
            MainItem::ClefSig(clefsig) => {
                return clefsig.pseudo_bar.as_ref().is_some_and(|b| ends_at(b.bartype));
            }
            MainItem::ChHead(_) | MainItem::Staff(_) | MainItem::Bar(_) => return false,
            _ => {}
        }
        cur = score.node(id).next;
    }
    false
}

/// Absolute X of a placed bar.
pub fn bar_ax(score: &Score, id: MainId) -> f64 {
    match score.bar(id).and_then(|b| b.ax) {
        Some(ax) => ax,
        None => pfatal!(loc = &score.node(id).origin; "bar has not been placed absolutely"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, LyricSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::ScoreParams;
    use pretty_assertions::assert_eq;

    fn whole(lyric: &str) -> StaffSpec {
        StaffSpec::new(1)
            .voice(1, vec![GroupSpec::notes(1, &[0])])
            .lyrics(LyricSpec::below(1).syl(lyric, RatTime::from_integer(1)))
    }

    fn bars(score: &Score) -> Vec<MainId> {
        score.main_ids().into_iter().filter(|id| score.bar(*id).is_some()).collect()
    }

    #[test]
    fn repeat_end_points_back_to_repeat_start() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![whole("one")])
            .bar(Bar::new(BarType::RepeatStart))
            .measure(vec![whole("two_")])
            .bar(Bar::new(BarType::RepeatEnd))
            .measure(vec![whole("three")])
            .bar(Bar::new(BarType::End));
        let score = b.build(&FixedMetrics::new()).unwrap();
        let bars = bars(&score);

        assert_eq!(bar_ends_extender(&score, bars[0], None), (false, None));
        let (ends, next) = bar_ends_extender(&score, bars[1], Some((1, 1, Place::Below)));
        assert!(ends);
        let next = next.unwrap();
        assert_eq!(score.gs(next).expect_syllable().text.text(), "two_");
        // no lyric line on staff 2
        assert_eq!(bar_ends_extender(&score, bars[1], Some((2, 1, Place::Below))), (true, None));
    }

    #[test]
    fn second_ending_terminates() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![whole("a")])
            .bar(Bar::new(BarType::Single).ending(EndingLoc::StartItem))
            .measure(vec![whole("b")])
            .bar(Bar::new(BarType::Single).ending(EndingLoc::StartItem))
            .measure(vec![whole("c")])
            .bar(Bar::new(BarType::End).ending(EndingLoc::EndItem));
        let score = b.build(&FixedMetrics::new()).unwrap();
        let bars = bars(&score);
        assert!(!bar_ends_extender(&score, bars[0], None).0);
        assert!(bar_ends_extender(&score, bars[1], None).0);
        assert!(!bar_ends_extender(&score, bars[2], None).0);
    }

    #[test]
    fn pseudo_bar_after_feed() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![whole("a")])
            .bar(Bar::new(BarType::Single))
            .feed()
            .clefsig(Some(Bar::new(BarType::Restart)))
            .measure(vec![whole("b")])
            .bar(Bar::new(BarType::End));
        let score = b.build(&FixedMetrics::new()).unwrap();
        let feed = score
            .main_ids()
            .into_iter()
            .find(|id| matches!(score.node(*id).item, MainItem::Feed(_)))
            .unwrap();
        assert!(pseudo_bar_ends_extender(&score, feed));
    }
}
