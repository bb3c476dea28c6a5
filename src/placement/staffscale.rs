//! Staffscale: everything so far was laid out at full size; from here on,
//! coordinates on a scaled staff are in scaled points.

use crate::model::*;
use crate::params::ParamState;
use crate::pfatal;

use super::constants::{CSS_STEPS, STEPSIZE, TEMP_MRPT_HALFWIDTH};

fn scale_grpsyl(gs: &mut GrpSyl, factor: f64) {
    // the provisional measure-repeat width is recognized by its exact value
    let mrpt_east = gs.c.east == TEMP_MRPT_HALFWIDTH;
    gs.c.scale(factor);
    if mrpt_east {
        gs.c.east = TEMP_MRPT_HALFWIDTH;
    }
    gs.padding *= factor;
    match &mut gs.body {
        GrpSylBody::Group(g) => {
            g.xdotr *= factor;
            if let Some(r) = &mut g.restc {
                r.scale(factor);
            }
            for note in &mut g.notes {
                note.c.scale(factor);
                note.acc_x *= factor;
                note.ydotr *= factor;
            }
            for w in &mut g.withlist {
                w.resize(factor);
            }
        }
        GrpSylBody::Syllable(s) => {
            s.text.resize(factor);
            if let Some(p) = &mut s.sylposition {
                *p *= factor;
            }
        }
    }
}

/// Every group and syllable reachable from a staff's voice and verse lists,
/// graces included.
fn staff_members(score: &Score, content: &StaffContent) -> Vec<GsId> {
    let firsts = content
        .groups
        .iter()
        .flatten()
        .copied()
        .chain(content.syls.iter().map(|l| l.first));
    let mut out = Vec::new();
    for first in firsts {
        out.extend(score.timed_list(Some(first)).into_iter().map(|(g, _)| g));
    }
    out
}

/// Multiply every coordinate on each staff by `factor(state, staffno)`.
/// Returns how many staffs were scaled.
pub fn scale_staffs(score: &mut Score, factor: impl Fn(&ParamState, usize) -> f64) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut scaled = 0;
    for id in score.main_ids() {
        match &score.node(id).item {
            MainItem::Ssv(u) => {
                state.apply(u);
                continue;
            }
            MainItem::Staff(_) => {}
            _ => continue,
        }
        let Some(content) = score.staff_content(id) else {
            continue;
        };
        let f = factor(&state, content.staffno);
        if f == 1.0 {
            continue;
        }
        for g in staff_members(score, content) {
            scale_grpsyl(score.gs_mut(g), f);
        }
        if let Some(content) = score.staff_content_mut(id) {
            for stuff in &mut content.stuff {
                if let StuffKind::Text(t) = &mut stuff.kind {
                    t.resize(f);
                }
            }
        }
        scaled += 1;
    }
    scaled
}

/// Move notes whose stem reaches a neighboring staff far out of this staff's
/// range, so that vertical checks on this staff ignore them.
fn fold_cross_staff_stems(score: &mut Score) {
    for gs in &mut score.grpsyls {
        let Some(group) = gs.group_mut() else {
            continue;
        };
        for note in &mut group.notes {
            let steps = match note.stemto {
                Some(CrossStaff::Above) => CSS_STEPS,
                Some(CrossStaff::Below) => -CSS_STEPS,
                None => continue,
            };
            let dy = steps as f64 * STEPSIZE;
            note.stepsup += steps;
            note.c.y += dy;
            note.c.north += dy;
            note.c.south += dy;
        }
    }
}

/// Whether any staff in the score has a staffscale other than 1.
fn any_staff_scaled(score: &Score) -> bool {
    let mut state = ParamState::new(&score.params);
    for id in score.main_ids() {
        match &score.node(id).item {
            MainItem::Ssv(u) => state.apply(u),
            MainItem::Staff(content) if state.staffscale(content.staffno) != 1.0 => return true,
            _ => {}
        }
    }
    false
}

/// Apply each staff's staffscale. Runs once per score; running it again is
/// only allowed when every staff is at full size, and then does nothing.
pub fn apply_staffscale(score: &mut Score) {
    if score.staffscale_applied {
        if !any_staff_scaled(score) {
            log::warn!("staffscale already applied; every staff is at full size, nothing to do");
            return;
        }
        pfatal!("staffscale applied twice");
    }
    fold_cross_staff_stems(score);
    let scaled = scale_staffs(score, |state, staff| state.staffscale(staff));
    score.staffscale_applied = true;
    log::debug!("apply_staffscale: scaled {} staffs", scaled);
}
