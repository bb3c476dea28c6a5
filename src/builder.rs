//! Timeline construction.
//!
//! The placement engine expects a fully linked timeline whose note groups
//! already carry their boxes. [`ScoreBuilder`] produces one from plain
//! measure descriptions, the way a parser front end would, and rejects
//! structurally broken input with a [`ModelError`].

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::SourceLoc;
use crate::error::ModelError;
use crate::metrics::{glyph, Font, TaggedString, TextMetrics, DFLT_SIZE, SMALLSIZE};
use crate::model::*;
use crate::params::{ParamState, ScoreParams, SsvUpdate, VoiceScheme};
use crate::placement::constants::{STDPAD, STEMLEN, STEPSIZE, TEMP_MRPT_HALFWIDTH};
use crate::placement::groups::place_graces;

// ═══════════════════════════════════════════════════════════════════════
// Specs
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
enum NoteMark {
    Acc(Accidental),
    AccParen,
    Paren,
    StemTo(CrossStaff),
}

/// One voice's event: notes, a rest, or a space.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    cont: GrpCont,
    basictime: i32,
    dots: u8,
    steps: Vec<i32>,
    marks: Vec<(usize, NoteMark)>,
    grace: bool,
    cue: bool,
    stemdir: Option<StemDir>,
    pvno: Option<u8>,
    is_meas: bool,
    uncompressible: bool,
    horz: HorzOffset,
    restdist: Option<i32>,
    clef: Option<Clef>,
    slash_alt: i32,
    withlist: Vec<String>,
    roll: bool,
    beamto: Option<CrossStaff>,
    line: Option<u32>,
}

impl GroupSpec {
    fn new(cont: GrpCont, basictime: i32) -> Self {
        Self {
            cont,
            basictime,
            dots: 0,
            steps: Vec::new(),
            marks: Vec::new(),
            grace: false,
            cue: false,
            stemdir: None,
            pvno: None,
            is_meas: false,
            uncompressible: false,
            horz: HorzOffset::None,
            restdist: None,
            clef: None,
            slash_alt: 0,
            withlist: Vec::new(),
            roll: false,
            beamto: None,
            line: None,
        }
    }

    /// Notes at the given steps above the middle line.
    pub fn notes(basictime: i32, steps: &[i32]) -> Self {
        let mut spec = Self::new(GrpCont::Notes, basictime);
        spec.steps = steps.to_vec();
        spec
    }

    pub fn rest(basictime: i32) -> Self {
        Self::new(GrpCont::Rest, basictime)
    }

    pub fn space(basictime: i32) -> Self {
        Self::new(GrpCont::Space, basictime)
    }

    pub fn measure_rest() -> Self {
        let mut spec = Self::new(GrpCont::Rest, 1);
        spec.is_meas = true;
        spec
    }

    pub fn measure_space() -> Self {
        let mut spec = Self::new(GrpCont::Space, 1);
        spec.is_meas = true;
        spec
    }

    pub fn measure_repeat() -> Self {
        let mut spec = Self::new(GrpCont::Notes, 1);
        spec.is_meas = true;
        spec
    }

    pub fn dots(mut self, dots: u8) -> Self {
        self.dots = dots;
        self
    }

    pub fn grace(mut self) -> Self {
        self.grace = true;
        self
    }

    pub fn cue(mut self) -> Self {
        self.cue = true;
        self
    }

    pub fn stem(mut self, dir: StemDir) -> Self {
        self.stemdir = Some(dir);
        self
    }

    /// Voice 3 standing in for voice 1 or 2.
    pub fn stand_in(mut self, pvno: u8) -> Self {
        self.pvno = Some(pvno);
        self
    }

    pub fn uncompressible(mut self) -> Self {
        self.uncompressible = true;
        self
    }

    pub fn horz(mut self, horz: HorzOffset) -> Self {
        self.horz = horz;
        self
    }

    pub fn restdist(mut self, steps: i32) -> Self {
        self.restdist = Some(steps);
        self
    }

    pub fn clef(mut self, clef: Clef) -> Self {
        self.clef = Some(clef);
        self
    }

    /// Accidental on the note at `index` (in the order the steps were given).
    pub fn acc(mut self, index: usize, acc: Accidental) -> Self {
        self.marks.push((index, NoteMark::Acc(acc)));
        self
    }

    pub fn acc_paren(mut self, index: usize) -> Self {
        self.marks.push((index, NoteMark::AccParen));
        self
    }

    pub fn paren(mut self, index: usize) -> Self {
        self.marks.push((index, NoteMark::Paren));
        self
    }

    pub fn stem_to(mut self, index: usize, to: CrossStaff) -> Self {
        self.marks.push((index, NoteMark::StemTo(to)));
        self
    }

    pub fn beam_to(mut self, to: CrossStaff) -> Self {
        self.beamto = Some(to);
        self
    }

    pub fn slash(mut self, count: i32) -> Self {
        self.slash_alt = count;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.withlist.push(text.to_string());
        self
    }

    pub fn roll(mut self) -> Self {
        self.roll = true;
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

#[derive(Debug, Clone)]
enum SylText {
    Plain(String),
    Tagged(TaggedString),
}

#[derive(Debug, Clone)]
struct SylSpec {
    text: SylText,
    dur: RatTime,
    line: Option<u32>,
}

/// One verse of lyrics on one staff for one measure.
#[derive(Debug, Clone)]
pub struct LyricSpec {
    verse: u8,
    place: Place,
    sylposition: Option<f64>,
    syls: Vec<SylSpec>,
}

impl LyricSpec {
    pub fn new(verse: u8, place: Place) -> Self {
        Self {
            verse,
            place,
            sylposition: None,
            syls: Vec::new(),
        }
    }

    pub fn above(verse: u8) -> Self {
        Self::new(verse, Place::Above)
    }

    pub fn below(verse: u8) -> Self {
        Self::new(verse, Place::Below)
    }

    pub fn between(verse: u8) -> Self {
        Self::new(verse, Place::Between)
    }

    pub fn syl(mut self, text: &str, dur: RatTime) -> Self {
        self.syls.push(SylSpec {
            text: SylText::Plain(text.to_string()),
            dur,
            line: None,
        });
        self
    }

    pub fn tagged(mut self, text: TaggedString, dur: RatTime) -> Self {
        self.syls.push(SylSpec {
            text: SylText::Tagged(text),
            dur,
            line: None,
        });
        self
    }

    /// A stretch with no lyric.
    pub fn space(self, dur: RatTime) -> Self {
        self.syl("", dur)
    }

    pub fn sylposition(mut self, points: f64) -> Self {
        self.sylposition = Some(points);
        self
    }

    /// Input line of the most recently added syllable.
    pub fn line(mut self, line: u32) -> Self {
        if let Some(last) = self.syls.last_mut() {
            last.line = Some(line);
        }
        self
    }
}

#[derive(Debug, Clone)]
enum StuffSpec {
    Pedal(RatTime, PedalMark),
    Text(RatTime, Place, String),
}

/// One staff's content for one measure.
#[derive(Debug, Clone)]
pub struct StaffSpec {
    staffno: usize,
    voices: Vec<(u8, Vec<GroupSpec>)>,
    lyrics: Vec<LyricSpec>,
    stuff: Vec<StuffSpec>,
}

impl StaffSpec {
    pub fn new(staffno: usize) -> Self {
        Self {
            staffno,
            voices: Vec::new(),
            lyrics: Vec::new(),
            stuff: Vec::new(),
        }
    }

    pub fn voice(mut self, vno: u8, groups: Vec<GroupSpec>) -> Self {
        self.voices.push((vno, groups));
        self
    }

    pub fn lyrics(mut self, lyrics: LyricSpec) -> Self {
        self.lyrics.push(lyrics);
        self
    }

    pub fn pedal(mut self, start: RatTime, mark: PedalMark) -> Self {
        self.stuff.push(StuffSpec::Pedal(start, mark));
        self
    }

    pub fn text(mut self, start: RatTime, place: Place, text: &str) -> Self {
        self.stuff.push(StuffSpec::Text(start, place, text.to_string()));
        self
    }
}

#[derive(Debug, Clone)]
enum Pending {
    Ssv(SsvUpdate),
    Measure(Vec<StaffSpec>),
    Bar(Bar),
    Feed(bool),
    ClefSig(Option<Bar>),
    Block(Vec<String>),
    Line(usize, usize),
    Curve(usize),
}

// ═══════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════

/// Assembles a [`Score`] timeline item by item. Each item is tagged with an
/// input line equal to its position in the builder (starting at 1), unless a
/// group or syllable names its own line.
#[derive(Debug, Clone)]
pub struct ScoreBuilder {
    params: ScoreParams,
    file: String,
    items: Vec<Pending>,
}

impl ScoreBuilder {
    pub fn new(params: ScoreParams) -> Self {
        Self {
            params,
            file: String::new(),
            items: Vec::new(),
        }
    }

    /// Input file name used in diagnostics.
    pub fn file(mut self, name: &str) -> Self {
        self.file = name.to_string();
        self
    }

    pub fn ssv(&mut self, update: SsvUpdate) -> &mut Self {
        self.items.push(Pending::Ssv(update));
        self
    }

    pub fn measure(&mut self, staffs: Vec<StaffSpec>) -> &mut Self {
        self.items.push(Pending::Measure(staffs));
        self
    }

    pub fn bar(&mut self, bar: Bar) -> &mut Self {
        self.items.push(Pending::Bar(bar));
        self
    }

    pub fn feed(&mut self) -> &mut Self {
        self.items.push(Pending::Feed(false));
        self
    }

    pub fn page_feed(&mut self) -> &mut Self {
        self.items.push(Pending::Feed(true));
        self
    }

    pub fn clefsig(&mut self, pseudo_bar: Option<Bar>) -> &mut Self {
        self.items.push(Pending::ClefSig(pseudo_bar));
        self
    }

    pub fn block(&mut self, lines: &[&str]) -> &mut Self {
        self.items
            .push(Pending::Block(lines.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn line_item(&mut self, from_staff: usize, to_staff: usize) -> &mut Self {
        self.items.push(Pending::Line(from_staff, to_staff));
        self
    }

    pub fn curve(&mut self, staff: usize) -> &mut Self {
        self.items.push(Pending::Curve(staff));
        self
    }

    /// Link everything into a timeline ready for placement.
    pub fn build(&self, metrics: &dyn TextMetrics) -> Result<Score, ModelError> {
        let mut score = Score::new(self.params.clone());
        let mut state = ParamState::new(&self.params);
        let mut in_measure = false;

        for (i, item) in self.items.iter().enumerate() {
            let loc = SourceLoc::new(self.file.clone(), i as u32 + 1);
            if in_measure && !matches!(item, Pending::Bar(_)) {
                return Err(ModelError::UnterminatedMeasure);
            }
            match item {
                Pending::Ssv(update) => {
                    state.apply(update);
                    score.push_main(MainItem::Ssv(update.clone()), loc);
                }
                Pending::Measure(staffs) => {
                    self.build_measure(&mut score, &state, staffs, &loc, metrics)?;
                    in_measure = true;
                }
                Pending::Bar(bar) => {
                    if !in_measure {
                        return Err(ModelError::NoMeasure);
                    }
                    score.push_main(MainItem::Bar(bar.clone()), loc);
                    in_measure = false;
                }
                Pending::Feed(pagefeed) => {
                    score.push_main(
                        MainItem::Feed(Feed {
                            pagefeed: *pagefeed,
                            east_edge: None,
                        }),
                        loc,
                    );
                }
                Pending::ClefSig(pseudo_bar) => {
                    score.push_main(
                        MainItem::ClefSig(ClefSig {
                            pseudo_bar: pseudo_bar.clone(),
                        }),
                        loc,
                    );
                }
                Pending::Block(lines) => {
                    let text = lines
                        .iter()
                        .map(|l| TaggedString::plain(Font::Roman, DFLT_SIZE, l))
                        .collect();
                    score.push_main(MainItem::Block(TextBlock { text }), loc);
                }
                Pending::Line(from_staff, to_staff) => {
                    score.push_main(
                        MainItem::Line(LineItem {
                            from_staff: *from_staff,
                            to_staff: *to_staff,
                        }),
                        loc,
                    );
                }
                Pending::Curve(staff) => {
                    score.push_main(MainItem::Curve(CurveItem { staff: *staff }), loc);
                }
            }
        }
        if in_measure {
            return Err(ModelError::UnterminatedMeasure);
        }

        log::debug!(
            "built timeline: {} nodes, {} chords, {} groups/syllables",
            score.main.len(),
            score.chords.len(),
            score.grpsyls.len()
        );
        Ok(score)
    }

    fn origin(&self, line: Option<u32>, loc: &SourceLoc) -> SourceLoc {
        match line {
            Some(l) => SourceLoc::new(self.file.clone(), l),
            None => loc.clone(),
        }
    }

    fn build_measure(
        &self,
        score: &mut Score,
        state: &ParamState,
        staffs: &[StaffSpec],
        loc: &SourceLoc,
        metrics: &dyn TextMetrics,
    ) -> Result<(), ModelError> {
        let chhead = score.push_main(MainItem::ChHead(ChordHead::default()), loc.clone());
        let mdur = state.time().measure_duration();

        let mut seen = BTreeSet::new();
        let mut starts: BTreeSet<RatTime> = BTreeSet::new();
        let mut members: Vec<(GsId, RatTime)> = Vec::new();
        let mut graces: Vec<(GsId, GsId)> = Vec::new();
        let mut mains: Vec<GsId> = Vec::new();

        for spec in staffs {
            let staffno = spec.staffno;
            if staffno == 0 {
                return Err(ModelError::BadStaff { loc: loc.clone() });
            }
            if !seen.insert(staffno) {
                return Err(ModelError::DuplicateStaff {
                    loc: loc.clone(),
                    staff: staffno,
                });
            }
            let mut content = StaffContent::new(staffno);
            let vscheme = state.vscheme(staffno);

            // ── Voices ──
            for (vno, groups) in &spec.voices {
                let vno = *vno;
                if vno == 0 || vno as usize > MAXVOICES {
                    return Err(ModelError::BadVoice {
                        loc: loc.clone(),
                        staff: staffno,
                        voice: vno,
                    });
                }
                let mut ids = Vec::with_capacity(groups.len());
                for g in groups {
                    ids.push(self.make_group(score, g, staffno, vno, mdur, vscheme, loc, metrics)?);
                }
                link_list(score, &ids);
                content.groups[vno as usize - 1] = ids.first().copied();

                let mut t = rat_zero();
                let mut pending: Vec<GsId> = Vec::new();
                for &id in &ids {
                    if score.gs(id).is_grace() {
                        pending.push(id);
                        continue;
                    }
                    starts.insert(t);
                    members.push((id, t));
                    mains.push(id);
                    graces.extend(pending.drain(..).map(|g| (g, id)));
                    t += score.gs(id).fulltime;
                }
                if !pending.is_empty() {
                    return Err(ModelError::DanglingGrace {
                        loc: loc.clone(),
                        staff: staffno,
                        voice: vno,
                    });
                }
                if t != mdur {
                    return Err(ModelError::MeasureLength {
                        loc: loc.clone(),
                        staff: staffno,
                        voice: vno,
                        expected: mdur,
                        actual: t,
                    });
                }
            }

            // ── Lyrics ──
            let (font, size) = state.lyrics_font(staffno);
            for lyr in &spec.lyrics {
                let mut ids = Vec::with_capacity(lyr.syls.len());
                let mut t = rat_zero();
                for syl in &lyr.syls {
                    let text = match &syl.text {
                        SylText::Plain(s) => TaggedString::plain(font, size, s),
                        SylText::Tagged(ts) => ts.clone(),
                    };
                    let id = score.add_grpsyl(GrpSyl {
                        staffno,
                        vno: lyr.verse,
                        basictime: 1,
                        dots: 0,
                        fulltime: syl.dur,
                        c: Rect::default(),
                        padding: 0.0,
                        next: None,
                        prev: None,
                        gs_next: None,
                        chord: None,
                        origin: self.origin(syl.line, loc),
                        body: GrpSylBody::Syllable(Syllable {
                            text,
                            place: lyr.place,
                            sylposition: lyr.sylposition,
                        }),
                    });
                    starts.insert(t);
                    members.push((id, t));
                    t += syl.dur;
                    ids.push(id);
                }
                if t != mdur {
                    return Err(ModelError::LyricLength {
                        loc: loc.clone(),
                        staff: staffno,
                        verse: lyr.verse,
                        expected: mdur,
                        actual: t,
                    });
                }
                link_list(score, &ids);
                if let Some(&first) = ids.first() {
                    content.insert_syl_list(SylList {
                        verse: lyr.verse,
                        place: lyr.place,
                        first,
                    });
                }
            }

            // ── Stuff ──
            let mut last_pedal: Option<RatTime> = None;
            for stuff in &spec.stuff {
                match stuff {
                    StuffSpec::Pedal(start, mark) => {
                        if last_pedal.is_some_and(|prev| *start <= prev) {
                            score
                                .diagnostics
                                .warn(loc, format!("pedal on staff {} must be in ascending order", staffno));
                        }
                        last_pedal = Some(*start);
                        content.stuff.push(Stuff {
                            kind: StuffKind::Pedal(*mark),
                            start: *start,
                            place: Place::Below,
                            origin: loc.clone(),
                        });
                    }
                    StuffSpec::Text(start, place, text) => {
                        content.stuff.push(Stuff {
                            kind: StuffKind::Text(TaggedString::plain(Font::Roman, DFLT_SIZE, text)),
                            start: *start,
                            place: *place,
                            origin: loc.clone(),
                        });
                    }
                }
            }

            score.push_main(MainItem::Staff(content), loc.clone());
        }

        // ── Chords ──
        let times: Vec<RatTime> = starts.into_iter().collect();
        let mut by_time: BTreeMap<RatTime, ChordId> = BTreeMap::new();
        let mut prev: Option<ChordId> = None;
        for (i, &t) in times.iter().enumerate() {
            let end = times.get(i + 1).copied().unwrap_or(mdur);
            let id = score.add_chord(Chord::new(t, end - t));
            score.chord_mut(id).prev = prev;
            match prev {
                Some(p) => score.chord_mut(p).next = Some(id),
                None => {
                    if let MainItem::ChHead(h) = &mut score.node_mut(chhead).item {
                        h.first = Some(id);
                    }
                }
            }
            by_time.insert(t, id);
            prev = Some(id);
        }

        let mut per_chord: BTreeMap<ChordId, Vec<GsId>> = BTreeMap::new();
        for (gs, t) in members {
            if let Some(&cid) = by_time.get(&t) {
                score.gs_mut(gs).chord = Some(cid);
                per_chord.entry(cid).or_default().push(gs);
            }
        }
        for (cid, mut list) in per_chord {
            list.sort_by_key(|g| score.gs(*g).chord_order_key());
            for pair in list.windows(2) {
                score.gs_mut(pair[0]).gs_next = Some(pair[1]);
            }
            score.chord_mut(cid).first = list.first().copied();
        }
        for (grace, main) in graces {
            let chord = score.gs(main).chord;
            score.gs_mut(grace).chord = chord;
        }
        for main in mains {
            place_graces(score, main);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn make_group(
        &self,
        score: &mut Score,
        spec: &GroupSpec,
        staffno: usize,
        vno: u8,
        mdur: RatTime,
        vscheme: VoiceScheme,
        loc: &SourceLoc,
        metrics: &dyn TextMetrics,
    ) -> Result<GsId, ModelError> {
        let origin = self.origin(spec.line, loc);

        let mut notes: Vec<Note> = spec.steps.iter().map(|&s| Note::new(s)).collect();
        for &(index, mark) in &spec.marks {
            let note = notes.get_mut(index).ok_or_else(|| ModelError::BadNoteIndex {
                loc: origin.clone(),
                index,
            })?;
            match mark {
                NoteMark::Acc(acc) => note.accidental = Some(acc),
                NoteMark::AccParen => note.acc_paren = true,
                NoteMark::Paren => note.note_paren = true,
                NoteMark::StemTo(to) => note.stemto = Some(to),
            }
        }
        notes.sort_by(|a, b| b.stepsup.cmp(&a.stepsup));

        let mut group = Group::new(spec.cont);
        group.pvno = spec.pvno.unwrap_or(vno);
        group.value = if spec.grace { GrpValue::Grace } else { GrpValue::Normal };
        group.size = if spec.cue { GrpSize::Cue } else { GrpSize::Normal };
        group.is_meas = spec.is_meas;
        group.uncompressible = spec.uncompressible;
        group.horz = spec.horz;
        group.restdist = spec.restdist;
        group.clef = spec.clef;
        group.slash_alt = spec.slash_alt;
        group.roll = spec.roll;
        group.beamto = spec.beamto;
        group.withlist = spec
            .withlist
            .iter()
            .map(|w| TaggedString::plain(Font::Roman, DFLT_SIZE, w))
            .collect();
        group.stemdir = spec
            .stemdir
            .or_else(|| default_stem(vscheme, vno, spec, &notes));
        group.notes = notes;

        let fulltime = if spec.grace {
            rat_zero()
        } else if spec.is_meas {
            mdur
        } else {
            duration(spec.basictime, spec.dots)
        };
        let padding = match spec.cont {
            GrpCont::Space => 0.0,
            _ if spec.grace => 0.0,
            _ => STDPAD,
        };

        let mut gs = GrpSyl {
            staffno,
            vno,
            basictime: spec.basictime,
            dots: spec.dots,
            fulltime,
            c: Rect::default(),
            padding,
            next: None,
            prev: None,
            gs_next: None,
            chord: None,
            origin,
            body: GrpSylBody::Group(group),
        };
        fill_note_box(&mut gs, metrics);
        Ok(score.add_grpsyl(gs))
    }
}

fn link_list(score: &mut Score, ids: &[GsId]) {
    for pair in ids.windows(2) {
        score.gs_mut(pair[0]).next = Some(pair[1]);
        score.gs_mut(pair[1]).prev = Some(pair[0]);
    }
}

/// Length of a note value with dots, in whole notes.
pub fn duration(basictime: i32, dots: u8) -> RatTime {
    let base = match basictime {
        BT_QUAD => RatTime::from_integer(4),
        BT_DBL => RatTime::from_integer(2),
        b => RatTime::new(1, b),
    };
    let pow = 1i32 << dots;
    base * RatTime::new(2 * pow - 1, pow)
}

fn has_stem(spec: &GroupSpec) -> bool {
    spec.cont == GrpCont::Notes && !spec.is_meas && spec.basictime >= 2
}

fn default_stem(vscheme: VoiceScheme, vno: u8, spec: &GroupSpec, notes: &[Note]) -> Option<StemDir> {
    if !has_stem(spec) || notes.is_empty() {
        return None;
    }
    let opposing = matches!(
        vscheme,
        VoiceScheme::TwoOpposingStems | VoiceScheme::ThreeOpposingStems
    );
    match (opposing, vno) {
        (true, 1) => Some(StemDir::Up),
        (true, 2) => Some(StemDir::Down),
        (true, _) => None,
        (false, _) => {
            let top = notes.first().map_or(0, |n| n.stepsup);
            let bottom = notes.last().map_or(0, |n| n.stepsup);
            if top + bottom < 0 {
                Some(StemDir::Up)
            } else {
                Some(StemDir::Down)
            }
        }
    }
}

/// Fill the box of a NOTES group from its noteheads, parentheses, dots and
/// stem. Rests and spaces are left empty for the rest/space pass.
fn fill_note_box(gs: &mut GrpSyl, metrics: &dyn TextMetrics) {
    let padding = gs.padding;
    let basictime = gs.basictime;
    let dots = gs.dots;
    let group = gs.expect_group_mut();
    if group.cont != GrpCont::Notes {
        return;
    }
    if group.is_meas {
        gs.c = Rect {
            x: 0.0,
            y: 0.0,
            west: -TEMP_MRPT_HALFWIDTH,
            east: TEMP_MRPT_HALFWIDTH,
            north: 2.0 * STEPSIZE,
            south: -2.0 * STEPSIZE,
        };
        return;
    }

    let size = if group.is_grace() || group.size == GrpSize::Cue {
        SMALLSIZE
    } else {
        DFLT_SIZE
    };
    let sizefactor = size as f64 / DFLT_SIZE as f64;
    let half = metrics.char_width(Font::Music, size, glyph::notehead(basictime)) / 2.0;
    let paren = metrics.char_width(Font::Music, size, glyph::ACC_PAREN_LEFT);

    let mut west = 0.0f64;
    let mut east = 0.0f64;
    for note in &mut group.notes {
        let y = note.stepsup as f64 * STEPSIZE;
        note.c = Rect {
            x: 0.0,
            y,
            west: -half,
            east: half,
            north: y + STEPSIZE,
            south: y - STEPSIZE,
        };
        // dots on a line move up into the space
        note.ydotr = if note.stepsup % 2 == 0 { STEPSIZE } else { 0.0 };
        let pw = if note.note_paren { paren } else { 0.0 };
        west = west.min(-half - pw);
        east = east.max(half + pw);
    }

    let (mut north, mut south) = match (group.notes.first(), group.notes.last()) {
        (Some(top), Some(bottom)) => (top.c.north, bottom.c.south),
        _ => (0.0, 0.0),
    };
    if basictime >= 2 {
        let stem = STEMLEN * STEPSIZE * sizefactor;
        match (group.stemdir, group.notes.first(), group.notes.last()) {
            (Some(StemDir::Up), Some(top), _) => north = north.max(top.c.y + stem),
            (Some(StemDir::Down), _, Some(bottom)) => south = south.min(bottom.c.y - stem),
            _ => {}
        }
    }

    if dots > 0 {
        let dotw = metrics.char_width(Font::Music, size, glyph::AUGMENTATION_DOT);
        group.xdotr = east + STDPAD + dotw / 2.0;
        east += dots as f64 * (STDPAD + dotw);
    }

    gs.c = Rect {
        x: 0.0,
        y: 0.0,
        west: west - padding,
        east,
        north,
        south,
    };
}
