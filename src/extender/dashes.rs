//! How far the dashes after a hyphenated syllable run.

use crate::model::*;
use crate::pfatal;

use super::boundary::{bar_ax, bar_ends_extender, pseudo_bar_ends_extender};
use super::{first_printed, line_of, west_ax, ExtEnd};

/// End of the dashes after `syl`: the next printed syllable of the verse,
/// a terminating bar, or the east edge of the score line.
pub fn end_dashes(score: &Score, syl: GsId, staff_node: MainId) -> ExtEnd {
    if let Some(next) = score.next_printed(syl) {
        return ExtEnd::stop(west_ax(score, next));
    }
    let (staffno, verse, place) = line_of(score, syl);
    let mut last_bar = None;
    let mut cur = score.node(staff_node).next;
    while let Some(id) = cur {
        match &score.node(id).item {
            MainItem::Staff(content) if content.staffno == staffno => {
                if let Some(next) = content.syl_list(verse, place).and_then(|f| first_printed(score, f)) {
                    return ExtEnd::stop(west_ax(score, next));
                }
            }
            MainItem::Bar(_) => {
                let ax = bar_ax(score, id);
                if bar_ends_extender(score, id, None).0 {
                    return ExtEnd::stop(ax);
                }
                last_bar = Some(ax);
            }
            MainItem::Feed(feed) => {
                let Some(edge) = feed.east_edge else {
                    pfatal!(loc = &score.node(id).origin; "feed has not been placed absolutely")
                };
                return ExtEnd {
                    x: edge,
                    carry: !pseudo_bar_ends_extender(score, id),
                };
            }
            _ => {}
        }
        cur = score.node(id).next;
    }
    match last_bar {
        Some(ax) => ExtEnd::stop(ax),
        None => pfatal!(loc = &score.gs(syl).origin; "song ends without a bar"),
    }
}
