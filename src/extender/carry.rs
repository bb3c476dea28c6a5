//! Continuing an extender on the next score line.

use crate::diagnostics::SourceLoc;
use crate::metrics::TaggedString;
use crate::model::*;

use super::{line_of, measure_end};

/// First STAFF node for `staffno` after the next line break.
fn next_line_staff(score: &Score, staff_node: MainId, staffno: usize) -> Option<MainId> {
    let mut after_feed = false;
    let mut cur = score.node(staff_node).next;
    while let Some(id) = cur {
        match &score.node(id).item {
            MainItem::Feed(_) => after_feed = true,
            MainItem::Staff(content) if after_feed && content.staffno == staffno => return Some(id),
            _ => {}
        }
        cur = score.node(id).next;
    }
    None
}

/// Link `id` into `chord`'s member list at its place in chord order.
fn stitch_into_chord(score: &mut Score, chord: ChordId, id: GsId) {
    let key = score.gs(id).chord_order_key();
    let members = score.chord_members(chord);
    let pos = members
        .iter()
        .position(|m| score.gs(*m).chord_order_key() > key)
        .unwrap_or(members.len());
    score.gs_mut(id).gs_next = members.get(pos).copied();
    match pos.checked_sub(1) {
        Some(p) => score.gs_mut(members[p]).gs_next = Some(id),
        None => score.chord_mut(chord).first = Some(id),
    }
}

/// Give the first measure on the next line something to draw the
/// continuation of `syl`'s extender from.
///
/// A blank first syllable in that measure takes the extender character. If
/// the verse has no syllables there at all, a measure-long syllable holding
/// only the extender character is made for it. A printed first syllable
/// needs nothing.
pub fn cont_extender(score: &mut Score, syl: GsId, staff_node: MainId) {
    let s = score.gs(syl).expect_syllable();
    let Some(ext) = s.extender() else {
        return;
    };
    let (font, size) = s.text.final_font();
    let (staffno, verse, place) = line_of(score, syl);
    let Some(target) = next_line_staff(score, staff_node, staffno) else {
        return;
    };
    let text = TaggedString::plain(font, size, &ext.to_string());

    let existing = score.staff_content(target).and_then(|c| c.syl_list(verse, place));
    if let Some(first) = existing {
        if let Some(s) = score.gs_mut(first).syllable_mut().filter(|s| s.is_space()) {
            s.text = text;
        }
        return;
    }

    let Some(&chord) = score.measure_chords(score.chhead_of(target)).first() else {
        return;
    };
    let fulltime = measure_end(score, target);
    let id = score.add_grpsyl(GrpSyl {
        staffno,
        vno: verse,
        basictime: 1,
        dots: 0,
        fulltime,
        c: Rect::default(),
        padding: 0.0,
        next: None,
        prev: None,
        gs_next: None,
        chord: Some(chord),
        origin: SourceLoc::synthetic(),
        body: GrpSylBody::Syllable(Syllable {
            text,
            place,
            sylposition: None,
        }),
    });
    if let Some(content) = score.staff_content_mut(target) {
        content.insert_syl_list(SylList { verse, place, first: id });
    }
    stitch_into_chord(score, chord, id);
    log::debug!("continued extender of staff {} verse {} on the next line", staffno, verse);
}
