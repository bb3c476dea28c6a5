//! How far the line under a held syllable runs.
//!
//! The line follows the notes of a reference voice, picked again wherever
//! any voice moves to a new group, and stops at the last note the syllable
//! is held over. A lower voice that keeps sounding further right without resting
//! can stretch it.

use crate::model::*;
use crate::placement::constants::MAX_ABOVE_LYR_LOOKBACK;
use crate::placement::groups::notes_east;
use crate::pfatal;

use super::boundary::{bar_ax, bar_ends_extender, pseudo_bar_ends_extender, LyricLine};
use super::{first_printed, line_of, ExtEnd};

/// Voices from top to bottom, as zero-based indexes.
const VOICE_ORDER: [usize; MAXVOICES] = [0, 2, 1];

type Voices = [Vec<(GsId, RatTime)>; MAXVOICES];

fn voices_of(score: &Score, content: &StaffContent) -> Voices {
    [0, 1, 2].map(|v| score.timed_list(content.groups[v]))
}

fn covers(score: &Score, g: GsId, gt: RatTime, t: RatTime) -> bool {
    gt <= t && t < gt + score.gs(g).fulltime
}

/// Whether a voice has notes or a rest (anything but space) at time `t`.
fn sounding(score: &Score, voice: &[(GsId, RatTime)], t: RatTime) -> bool {
    voice.iter().any(|&(g, gt)| {
        let gs = score.gs(g);
        !gs.is_grace() && covers(score, g, gt, t) && gs.expect_group().cont != GrpCont::Space
    })
}

fn prev_staff(score: &Score, staff_node: MainId, staffno: usize) -> Option<MainId> {
    let mut cur = score.node(staff_node).prev;
    while let Some(id) = cur {
        if score.staff_content(id).is_some_and(|c| c.staffno == staffno) {
            return Some(id);
        }
        cur = score.node(id).prev;
    }
    None
}

/// Whether a lyric above the staff is being sung at time `t` of the measure
/// in `staff_node`, counting one held over from an earlier measure by an
/// extender.
pub fn has_above_lyr(score: &Score, staff_node: MainId, t: RatTime) -> bool {
    let Some(content) = score.staff_content(staff_node) else {
        return false;
    };
    let staffno = content.staffno;

    // most recent printed syllable, per verse, starting no later than t
    let mut latest = Vec::new();
    for list in content.syls.iter().filter(|l| l.place == Place::Above) {
        let mut last = None;
        for (s, st) in score.timed_list(Some(list.first)) {
            if st > t {
                break;
            }
            if score.gs(s).expect_syllable().is_space() {
                continue;
            }
            if covers(score, s, st, t) {
                return true;
            }
            last = Some(s);
        }
        latest.extend(last);
    }
    if !latest.is_empty() {
        return latest.iter().any(|s| score.gs(*s).expect_syllable().extender().is_some());
    }

    let mut node = staff_node;
    for _ in 0..MAX_ABOVE_LYR_LOOKBACK {
        let Some(prev) = prev_staff(score, node, staffno) else {
            return false;
        };
        node = prev;
        let Some(content) = score.staff_content(node) else {
            return false;
        };
        let held: Vec<GsId> = content
            .syls
            .iter()
            .filter(|l| l.place == Place::Above)
            .filter_map(|l| {
                score
                    .timed_list(Some(l.first))
                    .into_iter()
                    .map(|(s, _)| s)
                    .filter(|s| !score.gs(*s).expect_syllable().is_space())
                    .last()
            })
            .collect();
        if !held.is_empty() {
            return held.iter().any(|s| score.gs(*s).expect_syllable().extender().is_some());
        }
    }
    false
}

/// The voice whose notes the line follows at time `t`.
///
/// A lyric below the staff follows voice 2 or 3 while a lyric above is
/// being sung. Otherwise every lyric follows the highest voice that is not
/// a space there.
fn ref_voice(score: &Score, staff_node: MainId, voices: &Voices, place: Place, t: RatTime) -> usize {
    let live = |v: usize| sounding(score, &voices[v], t);
    let top_live = || VOICE_ORDER.into_iter().find(|&v| live(v));
    match place {
        Place::Above => top_live().unwrap_or(0),
        Place::Below | Place::Between => {
            if has_above_lyr(score, staff_node, t) {
                [1, 2].into_iter().find(|&v| live(v)).or_else(top_live).unwrap_or(0)
            } else {
                top_live().unwrap_or(0)
            }
        }
    }
}

/// The non-grace group of `voice` sounding at `t`, with its index and start.
fn group_at(score: &Score, voice: &[(GsId, RatTime)], t: RatTime) -> Option<(usize, GsId, RatTime)> {
    voice
        .iter()
        .enumerate()
        .find(|(_, (g, gt))| !score.gs(*g).is_grace() && covers(score, *g, *gt, t))
        .map(|(i, &(g, gt))| (i, g, gt))
}

fn notes_ax_east(score: &Score, g: GsId) -> f64 {
    score.owner_ax(g) + notes_east(score.gs(g).expect_group())
}

/// Where the line would end if nothing stopped it first: the start of the
/// next printed syllable, when one comes before any line break or
/// terminating bar.
fn default_end(score: &Score, syl: GsId, staff_node: MainId) -> Option<(MainId, RatTime)> {
    if let Some(next) = score.next_printed(syl) {
        return Some((staff_node, score.start_time(next)));
    }
    let (staffno, verse, place) = line_of(score, syl);
    let mut cur = score.node(staff_node).next;
    while let Some(id) = cur {
        match &score.node(id).item {
            MainItem::Staff(content) if content.staffno == staffno => {
                if let Some(next) = content.syl_list(verse, place).and_then(|f| first_printed(score, f)) {
                    return Some((id, score.start_time(next)));
                }
            }
            MainItem::Bar(_) if bar_ends_extender(score, id, None).0 => return None,
            MainItem::Feed(_) => return None,
            _ => {}
        }
        cur = score.node(id).next;
    }
    None
}

/// Cursor over the measures a held syllable's line passes through.
struct Walk<'a> {
    score: &'a Score,
    target: Option<(MainId, RatTime)>,
    best: f64,
    had_rest: [bool; MAXVOICES],
}

impl Walk<'_> {
    /// Step through one measure from time `from`, one group boundary (in
    /// any voice) at a time. Returns the end of the line if it stops inside
    /// this measure.
    fn measure(&mut self, staff_node: MainId, place: Place, from: RatTime) -> Option<f64> {
        let score = self.score;
        let content = score.staff_content(staff_node)?;
        let voices = voices_of(score, content);
        let end_here = self.target.filter(|(n, _)| *n == staff_node).map(|(_, t)| t);

        let mut t = from;
        loop {
            // no voice left sounding means the measure is used up
            let step_end = VOICE_ORDER
                .iter()
                .filter_map(|&v| group_at(score, &voices[v], t))
                .map(|(_, g, gt)| gt + score.gs(g).fulltime)
                .min()?;
            let rv = ref_voice(score, staff_node, &voices, place, t);
            if let Some((i, g, gt)) = group_at(score, &voices[rv], t) {
                if let Some(x) = self.check(&voices, rv, i, g, gt, end_here) {
                    return Some(x);
                }
            }
            t = step_end;
        }
    }

    /// Apply the stopping rules to group `g` (index `i`, starting at `gt`)
    /// of reference voice `rv`.
    fn check(
        &mut self,
        voices: &Voices,
        rv: usize,
        i: usize,
        g: GsId,
        gt: RatTime,
        end_here: Option<RatTime>,
    ) -> Option<f64> {
        let score = self.score;
        let gs = score.gs(g);
        let ft = gs.fulltime;
        let group = gs.expect_group();
        if end_here.is_some_and(|t| t > gt && t <= gt + ft) {
            return Some(match group.cont {
                GrpCont::Notes => notes_ax_east(score, g),
                _ => self.best,
            });
        }
        if group.cont == GrpCont::Rest {
            return Some(score.owner_ax(g) + gs.c.west);
        }
        let grace_next = voices[rv].get(i + 1).is_some_and(|(n, _)| score.gs(*n).is_grace());
        if grace_next && end_here.is_some_and(|t| gt + ft >= t) && group.cont == GrpCont::Notes {
            return Some(notes_ax_east(score, g));
        }
        if group.cont == GrpCont::Notes {
            self.best = self.best.max(notes_ax_east(score, g));
            self.stretch(voices, rv, gt, gt + ft);
        }
        None
    }

    /// Let voices below the reference one push the line further east while
    /// they keep sounding without a rest.
    fn stretch(&mut self, voices: &Voices, rv: usize, from: RatTime, to: RatTime) {
        let score = self.score;
        let below = VOICE_ORDER.iter().skip_while(|v| **v != rv).skip(1);
        for &v in below {
            for &(h, ht) in &voices[v] {
                let gs = score.gs(h);
                if gs.is_grace() || ht >= to || ht + gs.fulltime <= from {
                    continue;
                }
                match gs.expect_group().cont {
                    GrpCont::Rest => self.had_rest[v] = true,
                    GrpCont::Notes if !self.had_rest[v] => {
                        self.best = self.best.max(notes_ax_east(score, h));
                    }
                    _ => {}
                }
            }
        }
    }
}

enum Next {
    Staff(MainId),
    HardBar(MainId, Option<GsId>),
    Feed(MainId),
    End,
}

fn next_measure(score: &Score, staff_node: MainId, line: LyricLine) -> Next {
    let mut cur = score.node(staff_node).next;
    while let Some(id) = cur {
        match &score.node(id).item {
            MainItem::Staff(content) if content.staffno == line.0 => return Next::Staff(id),
            MainItem::Bar(_) => {
                let (ends, next) = bar_ends_extender(score, id, Some(line));
                if ends {
                    return Next::HardBar(id, next);
                }
            }
            MainItem::Feed(_) => return Next::Feed(id),
            _ => {}
        }
        cur = score.node(id).next;
    }
    Next::End
}

/// Whether the first measure on the line after `feed` starts with a rest in
/// the voice the line would follow there.
fn next_line_starts_with_rest(score: &Score, feed: MainId, line: LyricLine) -> bool {
    let mut cur = score.node(feed).next;
    while let Some(id) = cur {
        if let Some(content) = score.staff_content(id).filter(|c| c.staffno == line.0) {
            let voices = voices_of(score, content);
            let rv = ref_voice(score, id, &voices, line.2, rat_zero());
            return voices[rv]
                .iter()
                .find(|(g, _)| !score.gs(*g).is_grace())
                .is_some_and(|(g, _)| score.gs(*g).expect_group().cont == GrpCont::Rest);
        }
        cur = score.node(id).next;
    }
    false
}

/// End of the line under held syllable `syl`, whose text ends at absolute
/// X `start`.
pub fn end_underscore(score: &Score, syl: GsId, staff_node: MainId, start: f64) -> ExtEnd {
    let line = line_of(score, syl);
    let mut walk = Walk {
        score,
        target: default_end(score, syl, staff_node),
        best: start,
        had_rest: [false; MAXVOICES],
    };
    let mut node = staff_node;
    let mut from = score.start_time(syl);
    loop {
        if let Some(x) = walk.measure(node, line.2, from) {
            return ExtEnd::stop(x);
        }
        match next_measure(score, node, line) {
            Next::Staff(id) => {
                if walk.target == Some((id, rat_zero())) {
                    return ExtEnd::stop(walk.best);
                }
                node = id;
                from = rat_zero();
            }
            Next::HardBar(bar, next) => {
                let blank = next.is_some_and(|n| score.gs(n).expect_syllable().is_space());
                return ExtEnd::stop(if blank { bar_ax(score, bar) } else { walk.best });
            }
            Next::Feed(feed) => {
                if next_line_starts_with_rest(score, feed, line) || pseudo_bar_ends_extender(score, feed) {
                    return ExtEnd::stop(walk.best);
                }
                let edge = match &score.node(feed).item {
                    MainItem::Feed(f) => f.east_edge,
                    _ => None,
                };
                let Some(edge) = edge else {
                    pfatal!(loc = &score.node(feed).origin; "feed has not been placed absolutely")
                };
                return ExtEnd { x: edge, carry: true };
            }
            Next::End => return ExtEnd::stop(walk.best),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, LyricSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::ScoreParams;

    fn q() -> RatTime {
        RatTime::new(1, 4)
    }

    fn quarters() -> Vec<GroupSpec> {
        (0..4).map(|_| GroupSpec::notes(4, &[0])).collect()
    }

    fn staff_nodes(score: &Score) -> Vec<MainId> {
        score.main_ids().into_iter().filter(|id| score.staff_content(*id).is_some()).collect()
    }

    #[test]
    fn above_lyric_in_the_same_measure() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![StaffSpec::new(1)
            .voice(1, quarters())
            .lyrics(LyricSpec::above(1).syl("la", q()).space(q() * 3))])
        .bar(Bar::new(BarType::Single));
        let score = b.build(&FixedMetrics::new()).unwrap();
        let node = staff_nodes(&score)[0];
        assert!(has_above_lyr(&score, node, rat_zero()));
        // "la" has no extender and is over by beat 2
        assert!(!has_above_lyr(&score, node, q()));
    }

    #[test]
    fn held_above_lyric_reaches_later_measures() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![StaffSpec::new(1)
            .voice(1, quarters())
            .lyrics(LyricSpec::above(1).space(q() * 3).syl("ah_", q()))])
        .bar(Bar::new(BarType::Single))
        .measure(vec![StaffSpec::new(1).voice(1, quarters())])
        .bar(Bar::new(BarType::Single));
        let score = b.build(&FixedMetrics::new()).unwrap();
        assert!(has_above_lyr(&score, staff_nodes(&score)[1], q()));
    }

    #[test]
    fn no_above_lyric_at_all() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![StaffSpec::new(1)
            .voice(1, quarters())
            .lyrics(LyricSpec::below(1).syl("ah_", RatTime::from_integer(1)))])
        .bar(Bar::new(BarType::Single));
        let score = b.build(&FixedMetrics::new()).unwrap();
        assert!(!has_above_lyr(&score, staff_nodes(&score)[0], q()));
    }
}
