//! Group finalization: accidentals, grace placement, horizontal offsets
//! between voices, and mid-measure clef markers.

use crate::metrics::{glyph, Font, TextMetrics, DFLT_SIZE, SMALLSIZE};
use crate::model::*;

use super::constants::ACC_COLUMN_STEPS;
use super::v3pack::{v3pack, Pack};

/// Point size a group's glyphs are drawn at (before staffscale).
pub fn group_size(group: &Group) -> u8 {
    if group.is_grace() || group.size == GrpSize::Cue {
        SMALLSIZE
    } else {
        DFLT_SIZE
    }
}

fn acc_width(metrics: &dyn TextMetrics, note: &Note, size: u8) -> f64 {
    let Some(acc) = note.accidental else {
        return 0.0;
    };
    let mut width = metrics.char_width(Font::Music, size, acc.glyph());
    if note.acc_paren {
        width += metrics.char_width(Font::Music, size, glyph::ACC_PAREN_LEFT)
            + metrics.char_width(Font::Music, size, glyph::ACC_PAREN_RIGHT);
    }
    width
}

/// Box of a note's accidental, parentheses included, relative to the chord.
/// `scale` is the staffscale already folded into the note's coordinates.
pub fn accdimen(metrics: &dyn TextMetrics, note: &Note, size: u8, scale: f64) -> Option<Rect> {
    let acc = note.accidental?;
    let ch = acc.glyph();
    let width = acc_width(metrics, note, size) * scale;
    Some(Rect {
        x: note.acc_x,
        y: note.c.y,
        west: note.acc_x,
        east: note.acc_x + width,
        north: note.c.y + metrics.char_ascent(Font::Music, size, ch) * scale,
        south: note.c.y - metrics.char_descent(Font::Music, size, ch) * scale,
    })
}

/// West edge of the noteheads themselves.
pub fn notes_west(group: &Group) -> f64 {
    group.notes.iter().map(|n| n.c.west).fold(f64::INFINITY, f64::min)
}

/// East edge of the noteheads themselves, ignoring dots and padding.
pub fn notes_east(group: &Group) -> f64 {
    group.notes.iter().map(|n| n.c.east).fold(f64::NEG_INFINITY, f64::max)
}

// ═══════════════════════════════════════════════════════════════════════
// Shifting
// ═══════════════════════════════════════════════════════════════════════

fn shift_one(gs: &mut GrpSyl, dx: f64) {
    gs.c.shift_x(dx);
    if let Some(group) = gs.group_mut() {
        group.xdotr += dx;
        if let Some(r) = &mut group.restc {
            r.shift_x(dx);
        }
        for note in &mut group.notes {
            note.c.shift_x(dx);
            note.acc_x += dx;
        }
    }
}

/// Grace groups immediately before `id`, nearest first.
pub fn graces_before(score: &Score, id: GsId) -> Vec<GsId> {
    let mut out = Vec::new();
    let mut cur = score.gs(id).prev;
    while let Some(p) = cur {
        if !score.gs(p).is_grace() {
            break;
        }
        out.push(p);
        cur = score.gs(p).prev;
    }
    out
}

/// Move a group, with its grace groups, sideways.
pub fn shiftgs(score: &mut Score, id: GsId, dx: f64) {
    if dx == 0.0 {
        return;
    }
    shift_one(score.gs_mut(id), dx);
    for g in graces_before(score, id) {
        shift_one(score.gs_mut(g), dx);
    }
}

/// Line up the grace groups before `main` right to left, each one ending
/// where the next begins.
pub fn place_graces(score: &mut Score, main: GsId) {
    let mut cursor = score.gs(main).c.west;
    for g in graces_before(score, main) {
        let dx = cursor - score.gs(g).c.east;
        shift_one(score.gs_mut(g), dx);
        cursor = score.gs(g).c.west;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Accidentals
// ═══════════════════════════════════════════════════════════════════════

/// Stack a group's accidentals in columns to the left of its noteheads and
/// widen the group to hold them. Columns fill right to left; an accidental
/// goes into the first column with nothing within six steps of it.
pub fn applyaccstrs(score: &mut Score, id: GsId, metrics: &dyn TextMetrics) {
    let gs = score.gs_mut(id);
    let padding = gs.padding;
    let Some(group) = gs.group_mut() else {
        return;
    };
    if group.cont != GrpCont::Notes || group.notes.iter().all(|n| n.accidental.is_none()) {
        return;
    }
    let size = group_size(group);
    let paren = metrics.char_width(Font::Music, size, glyph::ACC_PAREN_LEFT);

    let edge = group
        .notes
        .iter()
        .map(|n| n.c.west - if n.note_paren { paren } else { 0.0 })
        .fold(f64::INFINITY, f64::min);

    let mut columns: Vec<(Vec<i32>, f64)> = Vec::new();
    let mut placed: Vec<(usize, usize, f64)> = Vec::new();
    for (i, note) in group.notes.iter().enumerate() {
        if note.accidental.is_none() {
            continue;
        }
        let width = acc_width(metrics, note, size);
        let col = match columns
            .iter()
            .position(|(steps, _)| steps.iter().all(|s| (s - note.stepsup).abs() >= ACC_COLUMN_STEPS))
        {
            Some(c) => c,
            None => {
                columns.push((Vec::new(), 0.0));
                columns.len() - 1
            }
        };
        columns[col].0.push(note.stepsup);
        columns[col].1 = columns[col].1.max(width);
        placed.push((i, col, width));
    }

    let mut rights = Vec::with_capacity(columns.len());
    let mut x = edge;
    for (_, width) in &columns {
        rights.push(x);
        x -= width;
    }
    for (i, col, width) in placed {
        group.notes[i].acc_x = rights[col] - width;
    }
    gs.c.west = gs.c.west.min(x - padding);
}

// ═══════════════════════════════════════════════════════════════════════
// Final group processing
// ═══════════════════════════════════════════════════════════════════════

fn side_request(score: &Score, id: GsId) -> Option<HorzOffset> {
    match score.gs(id).expect_group().horz {
        h @ (HorzOffset::Left | HorzOffset::Right) => Some(h),
        _ => None,
    }
}

/// Move `mover` so it sits immediately left or right of `other`.
fn snap(score: &mut Score, mover: GsId, other: GsId, side: HorzOffset) {
    let dx = match side {
        HorzOffset::Left => score.west_with_graces(other) - score.gs(mover).c.east,
        HorzOffset::Right => score.gs(other).c.east - score.west_with_graces(mover),
        _ => return,
    };
    shiftgs(score, mover, dx);
}

fn resolve_v1_v2(score: &mut Score, active: &[GsId]) {
    let find = |v: u8| active.iter().copied().find(|g| score.gs(*g).vno == v);
    let (v1, v2) = (find(1), find(2));
    match (v1, v2) {
        (Some(a), Some(b)) => match (side_request(score, a), side_request(score, b)) {
            (Some(HorzOffset::Left), Some(HorzOffset::Right)) => {
                let need = score.gs(a).c.east - score.west_with_graces(b);
                shiftgs(score, a, -need / 2.0);
                shiftgs(score, b, need / 2.0);
            }
            (Some(HorzOffset::Right), Some(HorzOffset::Left)) => {
                let need = score.gs(b).c.east - score.west_with_graces(a);
                shiftgs(score, a, need / 2.0);
                shiftgs(score, b, -need / 2.0);
            }
            (Some(ra), Some(_)) => {
                let loc = score.gs(b).origin.clone();
                score.diagnostics.warn(
                    &loc,
                    "voices 1 and 2 both ask to move the same way; voice 2's request is ignored",
                );
                snap(score, a, b, ra);
            }
            (Some(ra), None) => snap(score, a, b, ra),
            (None, Some(rb)) => snap(score, b, a, rb),
            (None, None) => {}
        },
        (Some(g), None) | (None, Some(g)) => {
            if side_request(score, g).is_some() {
                let loc = score.gs(g).origin.clone();
                score
                    .diagnostics
                    .warn(&loc, "'+' or '-' offset needs another voice to move against; ignored");
            }
        }
        (None, None) => {}
    }
}

fn place_v3(score: &mut Score, active: &[GsId], metrics: &dyn TextMetrics) {
    let Some(v3) = active.iter().copied().find(|g| score.gs(*g).vno == 3) else {
        return;
    };
    let horz = score.gs(v3).expect_group().horz;
    if matches!(horz, HorzOffset::Value(_)) {
        return;
    }
    let others: Vec<GsId> = active
        .iter()
        .copied()
        .filter(|g| score.gs(*g).vno != 3)
        .collect();
    if others.is_empty() {
        return;
    }
    let find = |v: u8| others.iter().copied().find(|g| score.gs(*g).vno == v);

    let dx = match v3pack(score, active, metrics) {
        Pack::Left => match find(1) {
            Some(v1) => notes_west(score.gs(v1).expect_group()) - notes_east(score.gs(v3).expect_group()),
            None => 0.0,
        },
        Pack::Right => match find(2) {
            Some(v2) => notes_east(score.gs(v2).expect_group()) - notes_west(score.gs(v3).expect_group()),
            None => 0.0,
        },
        Pack::Center => 0.0,
        Pack::None if horz == HorzOffset::Left => {
            let west = others
                .iter()
                .map(|g| score.west_with_graces(*g))
                .fold(f64::INFINITY, f64::min);
            west - score.gs(v3).c.east
        }
        Pack::None => {
            let east = others
                .iter()
                .map(|g| score.gs(*g).c.east)
                .fold(f64::NEG_INFINITY, f64::max);
            east - score.west_with_graces(v3)
        }
    };
    shiftgs(score, v3, dx);
}

/// Move each clef marker to the earliest grace group in front of its
/// group. Only the lowest-numbered voice keeps a marker.
fn propagate_clefs(score: &mut Score, members: &[GsId]) {
    let mut kept: Option<Clef> = None;
    for &g in members {
        let Some(clef) = score.gs(g).expect_group().clef else {
            continue;
        };
        score.gs_mut(g).expect_group_mut().clef = None;
        match kept {
            None => {
                kept = Some(clef);
                let target = score.first_grace_before(g);
                score.gs_mut(target).expect_group_mut().clef = Some(clef);
            }
            Some(k) if k != clef => {
                let loc = score.gs(g).origin.clone();
                score.diagnostics.warn(
                    &loc,
                    format!("conflicting clef changes at the same time; keeping {:?}", k),
                );
            }
            Some(_) => {}
        }
    }
}

/// Finish the groups of one staff at one chord.
pub fn finalgroupproc(score: &mut Score, chord: ChordId, staffno: usize, metrics: &dyn TextMetrics) {
    let members: Vec<GsId> = score
        .chord_members_on(chord, staffno)
        .into_iter()
        .filter(|g| score.gs(*g).is_group())
        .collect();

    for &g in &members {
        for grace in graces_before(score, g) {
            applyaccstrs(score, grace, metrics);
        }
        applyaccstrs(score, g, metrics);
        place_graces(score, g);
    }

    let active: Vec<GsId> = members
        .iter()
        .copied()
        .filter(|g| score.gs(*g).expect_group().cont != GrpCont::Space)
        .collect();
    if !active.is_empty() {
        for &g in &active {
            if let HorzOffset::Value(steps) = score.gs(g).expect_group().horz {
                shiftgs(score, g, steps * super::constants::STEPSIZE);
            }
        }
        resolve_v1_v2(score, &active);
        place_v3(score, &active, metrics);
    }

    propagate_clefs(score, &members);
}

/// Run [`finalgroupproc`] for every staff of every chord.
pub fn finalgroupproc_all(score: &mut Score, metrics: &dyn TextMetrics) -> usize {
    let mut count = 0;
    for id in score.main_ids() {
        if !matches!(score.node(id).item, MainItem::ChHead(_)) {
            continue;
        }
        let staffs: Vec<usize> = score
            .measure_staffs(id)
            .into_iter()
            .filter_map(|s| score.staff_content(s).map(|c| c.staffno))
            .collect();
        for chord in score.measure_chords(id) {
            for &staffno in &staffs {
                finalgroupproc(score, chord, staffno, metrics);
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GroupSpec, ScoreBuilder, StaffSpec};
    use crate::metrics::FixedMetrics;
    use crate::params::{ScoreParams, VoiceScheme};
    use crate::placement::constants::STDPAD;
    use pretty_assertions::assert_eq;

    fn two_voice(v1: GroupSpec, v2: GroupSpec) -> Score {
        let params = ScoreParams {
            vscheme: VoiceScheme::TwoOpposingStems,
            ..Default::default()
        };
        let mut b = ScoreBuilder::new(params);
        b.measure(vec![StaffSpec::new(1).voice(1, vec![v1]).voice(2, vec![v2])])
            .bar(Bar::new(BarType::Single));
        b.build(&FixedMetrics::new()).unwrap()
    }

    #[test]
    fn accidentals_stack_in_columns() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![StaffSpec::new(1).voice(
            1,
            vec![GroupSpec::notes(1, &[4, 2, -4])
                .acc(0, Accidental::Sharp)
                .acc(1, Accidental::Flat)
                .acc(2, Accidental::Natural)],
        )])
        .bar(Bar::new(BarType::Single));
        let mut score = b.build(&FixedMetrics::new()).unwrap();
        applyaccstrs(&mut score, GsId(0), &FixedMetrics::new());

        let g = score.gs(GsId(0)).expect_group();
        // 4 and -4 share the first column; 2 clashes with 4 and opens a second
        assert_eq!(g.notes[0].acc_x, -3.0 - 6.0);
        assert_eq!(g.notes[2].acc_x, -3.0 - 6.0);
        assert_eq!(g.notes[1].acc_x, -3.0 - 12.0);
        assert_eq!(score.gs(GsId(0)).c.west, -15.0 - STDPAD);
    }

    #[test]
    fn opposing_requests_split_the_difference() {
        let mut score = two_voice(
            GroupSpec::notes(1, &[0]).horz(HorzOffset::Left),
            GroupSpec::notes(1, &[0]).horz(HorzOffset::Right),
        );
        let chord = ChordId(0);
        finalgroupproc(&mut score, chord, 1, &FixedMetrics::new());
        let (a, b) = (score.gs(GsId(0)), score.gs(GsId(1)));
        assert_eq!(a.c.east, b.c.west);
        assert_eq!(a.c.x, -b.c.x);
        assert!(score.diagnostics.is_empty());
    }

    #[test]
    fn same_direction_requests_warn() {
        let mut score = two_voice(
            GroupSpec::notes(1, &[0]).horz(HorzOffset::Right),
            GroupSpec::notes(1, &[0]).horz(HorzOffset::Right),
        );
        finalgroupproc(&mut score, ChordId(0), 1, &FixedMetrics::new());
        assert_eq!(score.diagnostics.warnings().count(), 1);
        // voice 1 snapped right of voice 2, voice 2 stayed put
        assert_eq!(score.gs(GsId(1)).c.x, 0.0);
        assert_eq!(score.gs(GsId(0)).c.west, score.gs(GsId(1)).c.east);
    }

    #[test]
    fn clef_marker_moves_to_first_grace() {
        let mut b = ScoreBuilder::new(ScoreParams::default());
        b.measure(vec![StaffSpec::new(1).voice(
            1,
            vec![
                GroupSpec::notes(2, &[0]),
                GroupSpec::notes(8, &[1]).grace(),
                GroupSpec::notes(8, &[2]).grace(),
                GroupSpec::notes(2, &[0]).clef(Clef::Bass),
            ],
        )])
        .bar(Bar::new(BarType::Single));
        let mut score = b.build(&FixedMetrics::new()).unwrap();
        finalgroupproc(&mut score, ChordId(1), 1, &FixedMetrics::new());
        assert_eq!(score.gs(GsId(1)).expect_group().clef, Some(Clef::Bass));
        assert_eq!(score.gs(GsId(3)).expect_group().clef, None);
        // graces sit left of their main group, nearest last
        assert!(score.gs(GsId(2)).c.east <= score.gs(GsId(3)).c.west);
        assert!(score.gs(GsId(1)).c.east <= score.gs(GsId(2)).c.west);
    }
}
