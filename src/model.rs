//! Data model for a score being placed.
//!
//! Everything lives in arenas owned by [`Score`] and is linked by index:
//! - the timeline (`main`), a doubly-linked list of [`MainNode`]s,
//! - per-measure chord lists ([`Chord`]), singly reachable from a
//!   [`ChordHead`] and linked both ways,
//! - groups and syllables ([`GrpSyl`]), linked per voice or verse
//!   (`next`/`prev`) and across staffs per chord (`gs_next`).
//!
//! Chord membership and the `chord` back-reference are non-owning indexes
//! into the same arena. All relative coordinates are in points, measured
//! from the owning chord's center line (x) and the staff's middle line (y).

use num_rational::Rational32;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, SourceLoc};
use crate::metrics::{glyph, TaggedString};
use crate::params::{ScoreParams, SsvUpdate};
use crate::pfatal;

/// Exact musical time, in whole notes.
pub type RatTime = Rational32;

pub const MAXVOICES: usize = 3;

/// Basic time of a quadruple whole note (longa).
pub const BT_QUAD: i32 = -1;
/// Basic time of a double whole note (breve).
pub const BT_DBL: i32 = 0;

pub fn rat_zero() -> RatTime {
    RatTime::from_integer(0)
}

pub fn rat_to_f64(r: RatTime) -> f64 {
    *r.numer() as f64 / *r.denom() as f64
}

// ═══════════════════════════════════════════════════════════════════════
// Arena indexes
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MainId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChordId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GsId(pub usize);

// ═══════════════════════════════════════════════════════════════════════
// Geometry
// ═══════════════════════════════════════════════════════════════════════

/// Relative bounding box with its origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub west: f64,
    pub east: f64,
    pub north: f64,
    pub south: f64,
}

impl Rect {
    pub fn shift_x(&mut self, dx: f64) {
        self.x += dx;
        self.west += dx;
        self.east += dx;
    }

    pub fn scale(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
        self.west *= factor;
        self.east *= factor;
        self.north *= factor;
        self.south *= factor;
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Timeline
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainNode {
    pub prev: Option<MainId>,
    pub next: Option<MainId>,
    pub item: MainItem,
    pub origin: SourceLoc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MainItem {
    Ssv(SsvUpdate),
    ChHead(ChordHead),
    Staff(StaffContent),
    Bar(Bar),
    ClefSig(ClefSig),
    Feed(Feed),
    Block(TextBlock),
    Line(LineItem),
    Curve(CurveItem),
}

/// Start of a measure's chord list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChordHead {
    pub first: Option<ChordId>,
}

/// One staff's content for one measure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffContent {
    pub staffno: usize,
    /// First group of each voice, indexed by voice number minus one.
    pub groups: [Option<GsId>; MAXVOICES],
    /// Syllable lists, sorted by verse number then placement.
    pub syls: Vec<SylList>,
    /// Pedal marks and other annotations, in input order.
    pub stuff: Vec<Stuff>,
}

impl StaffContent {
    pub fn new(staffno: usize) -> Self {
        Self {
            staffno,
            groups: [None; MAXVOICES],
            syls: Vec::new(),
            stuff: Vec::new(),
        }
    }

    pub fn syl_list(&self, verse: u8, place: Place) -> Option<GsId> {
        self.syls
            .iter()
            .find(|l| l.verse == verse && l.place == place)
            .map(|l| l.first)
    }

    /// Insert a list keeping `syls` sorted by verse number, then placement.
    pub fn insert_syl_list(&mut self, list: SylList) {
        let pos = self
            .syls
            .iter()
            .position(|l| (l.verse, l.place.rank()) > (list.verse, list.place.rank()))
            .unwrap_or(self.syls.len());
        self.syls.insert(pos, list);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SylList {
    pub verse: u8,
    pub place: Place,
    pub first: GsId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Place {
    Above,
    Below,
    Between,
}

impl Place {
    fn rank(self) -> u8 {
        match self {
            Place::Above => 0,
            Place::Below => 1,
            Place::Between => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarType {
    Single,
    Double,
    End,
    Invisible,
    Dashed,
    RepeatStart,
    RepeatEnd,
    RepeatBoth,
    Restart,
}

/// Where a bar sits relative to numbered endings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndingLoc {
    NoItem,
    StartItem,
    InItem,
    EndItem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub bartype: BarType,
    pub endingloc: EndingLoc,
    /// Absolute X, once some layout phase has placed the bar.
    pub ax: Option<f64>,
}

impl Bar {
    pub fn new(bartype: BarType) -> Self {
        Self {
            bartype,
            endingloc: EndingLoc::NoItem,
            ax: None,
        }
    }

    pub fn ending(mut self, endingloc: EndingLoc) -> Self {
        self.endingloc = endingloc;
        self
    }
}

/// Clef/key/time block printed at the start of a score. May carry a
/// pseudo-bar repeating the bar that ended the previous score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClefSig {
    pub pseudo_bar: Option<Bar>,
}

/// A score (line) or page break.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    pub pagefeed: bool,
    /// East edge of the score that this feed ends.
    pub east_edge: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: Vec<TaggedString>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItem {
    pub from_staff: usize,
    pub to_staff: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurveItem {
    pub staff: usize,
}

// ═══════════════════════════════════════════════════════════════════════
// Stuff
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PedalMark {
    Begin,
    Change,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StuffKind {
    Pedal(PedalMark),
    Text(TaggedString),
}

/// An annotation attached to a staff at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stuff {
    pub kind: StuffKind,
    /// Offset from the start of the measure, in whole notes.
    pub start: RatTime,
    pub place: Place,
    pub origin: SourceLoc,
}

// ═══════════════════════════════════════════════════════════════════════
// Chords
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chord {
    pub starttime: RatTime,
    pub duration: RatTime,
    /// First member of the cross-staff group/syllable list.
    pub first: Option<GsId>,
    pub next: Option<ChordId>,
    pub prev: Option<ChordId>,
    /// Relative west/east around the chord's center line.
    pub west: f64,
    pub east: f64,
    /// Provisional X within the measure (chords packed edge to edge).
    pub phantom_x: f64,
    /// Absolute X, once some layout phase has placed the chord.
    pub ax: Option<f64>,
    pub width: f64,
    pub uncollapsible: bool,
}

impl Chord {
    pub fn new(starttime: RatTime, duration: RatTime) -> Self {
        Self {
            starttime,
            duration,
            first: None,
            next: None,
            prev: None,
            west: 0.0,
            east: 0.0,
            phantom_x: 0.0,
            ax: None,
            width: 0.0,
            uncollapsible: false,
        }
    }

    pub fn endtime(&self) -> RatTime {
        self.starttime + self.duration
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Groups and syllables
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrpCont {
    Notes,
    Rest,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrpValue {
    Normal,
    Grace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrpSize {
    Normal,
    Cue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemDir {
    Up,
    Down,
}

/// User request for horizontal placement relative to the other voices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HorzOffset {
    None,
    /// `-`: sit immediately left of the other voice.
    Left,
    /// `+`: sit immediately right of the other voice.
    Right,
    /// Explicit offset in stepsizes.
    Value(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Accidental {
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
}

impl Accidental {
    pub fn glyph(self) -> char {
        match self {
            Accidental::Sharp => glyph::SHARP,
            Accidental::Flat => glyph::FLAT,
            Accidental::Natural => glyph::NATURAL,
            Accidental::DoubleSharp => glyph::DOUBLE_SHARP,
            Accidental::DoubleFlat => glyph::DOUBLE_FLAT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Clef {
    Treble,
    Treble8Vb,
    Bass,
    Alto,
    Tenor,
    Percussion,
}

impl Clef {
    pub fn glyph(self) -> char {
        match self {
            Clef::Treble | Clef::Treble8Vb => glyph::G_CLEF,
            Clef::Bass => glyph::F_CLEF,
            Clef::Alto | Clef::Tenor => glyph::C_CLEF,
            Clef::Percussion => glyph::PERCUSSION_CLEF,
        }
    }
}

/// Which neighboring staff a cross-staff stem or beam reaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossStaff {
    Above,
    Below,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Steps above the middle staff line.
    pub stepsup: i32,
    pub c: Rect,
    pub accidental: Option<Accidental>,
    pub acc_paren: bool,
    pub note_paren: bool,
    /// West edge of the accidental, once stacked.
    pub acc_x: f64,
    /// Vertical offset of the augmentation dot from the note.
    pub ydotr: f64,
    /// Set when the note's stem is drawn to a neighboring staff.
    pub stemto: Option<CrossStaff>,
}

impl Note {
    pub fn new(stepsup: i32) -> Self {
        Self {
            stepsup,
            c: Rect::default(),
            accidental: None,
            acc_paren: false,
            note_paren: false,
            acc_x: 0.0,
            ydotr: 0.0,
            stemto: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub cont: GrpCont,
    /// Effective voice, when voice 3 stands in for voice 1 or 2.
    pub pvno: u8,
    pub value: GrpValue,
    pub size: GrpSize,
    pub stemdir: Option<StemDir>,
    /// Measure rest, measure space, or (with `Notes`) measure repeat.
    pub is_meas: bool,
    /// A space that must not be squeezed out.
    pub uncompressible: bool,
    /// Sorted top to bottom.
    pub notes: Vec<Note>,
    pub horz: HorzOffset,
    /// Box of a rest at its real height (the group box keeps y at 0).
    pub restc: Option<Rect>,
    /// User rest distance, in stepsizes from the middle line.
    pub restdist: Option<i32>,
    /// X offset of the first augmentation dot from the group's east notes.
    pub xdotr: f64,
    pub clef: Option<Clef>,
    pub slash_alt: i32,
    pub withlist: Vec<TaggedString>,
    pub roll: bool,
    /// Part of a beam that crosses to another staff.
    pub beamto: Option<CrossStaff>,
}

impl Group {
    pub fn new(cont: GrpCont) -> Self {
        Self {
            cont,
            pvno: 0,
            value: GrpValue::Normal,
            size: GrpSize::Normal,
            stemdir: None,
            is_meas: false,
            uncompressible: false,
            notes: Vec::new(),
            horz: HorzOffset::None,
            restc: None,
            restdist: None,
            xdotr: 0.0,
            clef: None,
            slash_alt: 0,
            withlist: Vec::new(),
            roll: false,
            beamto: None,
        }
    }

    pub fn is_grace(&self) -> bool {
        self.value == GrpValue::Grace
    }

    /// Measure repeat placeholder.
    pub fn is_mrpt(&self) -> bool {
        self.is_meas && self.cont == GrpCont::Notes
    }

    /// A space that the downstream spacing phase may collapse.
    pub fn is_compressible_space(&self) -> bool {
        self.cont == GrpCont::Space && !self.uncompressible
    }

    pub fn top_note(&self) -> Option<&Note> {
        self.notes.first()
    }

    pub fn bottom_note(&self) -> Option<&Note> {
        self.notes.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Syllable {
    pub text: TaggedString,
    pub place: Place,
    /// Explicit anchor overriding lyrics alignment, in points.
    pub sylposition: Option<f64>,
}

impl Syllable {
    /// Trailing `-` or `_`, if the syllable ends in one.
    pub fn extender(&self) -> Option<char> {
        match self.text.last_char() {
            Some(c @ ('-' | '_')) => Some(c),
            _ => None,
        }
    }

    pub fn is_space(&self) -> bool {
        self.text.is_blank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GrpSylBody {
    Group(Group),
    Syllable(Syllable),
}

/// A group (one voice's event) or a syllable (one verse's lyric fragment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrpSyl {
    pub staffno: usize,
    /// Voice number for groups, verse number for syllables.
    pub vno: u8,
    pub basictime: i32,
    pub dots: u8,
    pub fulltime: RatTime,
    pub c: Rect,
    pub padding: f64,
    pub next: Option<GsId>,
    pub prev: Option<GsId>,
    /// Next member of the same chord.
    pub gs_next: Option<GsId>,
    /// Owning chord. Grace groups point at their main group's chord.
    pub chord: Option<ChordId>,
    pub origin: SourceLoc,
    pub body: GrpSylBody,
}

impl GrpSyl {
    pub fn group(&self) -> Option<&Group> {
        match &self.body {
            GrpSylBody::Group(g) => Some(g),
            GrpSylBody::Syllable(_) => None,
        }
    }

    pub fn group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.body {
            GrpSylBody::Group(g) => Some(g),
            GrpSylBody::Syllable(_) => None,
        }
    }

    pub fn syllable(&self) -> Option<&Syllable> {
        match &self.body {
            GrpSylBody::Syllable(s) => Some(s),
            GrpSylBody::Group(_) => None,
        }
    }

    pub fn syllable_mut(&mut self) -> Option<&mut Syllable> {
        match &mut self.body {
            GrpSylBody::Syllable(s) => Some(s),
            GrpSylBody::Group(_) => None,
        }
    }

    /// The group, or an internal fault if this is a syllable.
    pub fn expect_group(&self) -> &Group {
        match &self.body {
            GrpSylBody::Group(g) => g,
            GrpSylBody::Syllable(_) => pfatal!(loc = &self.origin; "expected a group, found a syllable"),
        }
    }

    pub fn expect_group_mut(&mut self) -> &mut Group {
        let origin = self.origin.clone();
        match &mut self.body {
            GrpSylBody::Group(g) => g,
            GrpSylBody::Syllable(_) => pfatal!(loc = &origin; "expected a group, found a syllable"),
        }
    }

    pub fn expect_syllable(&self) -> &Syllable {
        match &self.body {
            GrpSylBody::Syllable(s) => s,
            GrpSylBody::Group(_) => pfatal!(loc = &self.origin; "expected a syllable, found a group"),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.body, GrpSylBody::Group(_))
    }

    pub fn is_grace(&self) -> bool {
        self.group().is_some_and(Group::is_grace)
    }

    /// Sort key inside a chord: staff, then above syllables, groups, below
    /// syllables, between syllables, then voice or verse number.
    pub fn chord_order_key(&self) -> (usize, u8, u8) {
        let rank = match &self.body {
            GrpSylBody::Syllable(s) => match s.place {
                Place::Above => 0,
                Place::Below => 2,
                Place::Between => 3,
            },
            GrpSylBody::Group(_) => 1,
        };
        (self.staffno, rank, self.vno)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Extender output
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExtenderKind {
    /// Centers of each dash.
    Dashes { xs: Vec<f64> },
    Underscore { x0: f64, x1: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtenderMark {
    pub staffno: usize,
    pub verse: u8,
    pub place: Place,
    pub syllable: GsId,
    pub kind: ExtenderKind,
}

// ═══════════════════════════════════════════════════════════════════════
// Score
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub params: ScoreParams,
    pub main: Vec<MainNode>,
    pub head: Option<MainId>,
    pub tail: Option<MainId>,
    pub chords: Vec<Chord>,
    pub grpsyls: Vec<GrpSyl>,
    pub extenders: Vec<ExtenderMark>,
    pub diagnostics: Diagnostics,
    /// Flipped once, by the staffscale pass. Coordinates before the flip are
    /// unscaled; after it, every coordinate has its staff's scale applied.
    pub staffscale_applied: bool,
}

impl Score {
    pub fn new(params: ScoreParams) -> Self {
        Self {
            params,
            main: Vec::new(),
            head: None,
            tail: None,
            chords: Vec::new(),
            grpsyls: Vec::new(),
            extenders: Vec::new(),
            diagnostics: Diagnostics::new(),
            staffscale_applied: false,
        }
    }

    // ── Arena access ────────────────────────────────────────────────

    pub fn node(&self, id: MainId) -> &MainNode {
        &self.main[id.0]
    }

    pub fn node_mut(&mut self, id: MainId) -> &mut MainNode {
        &mut self.main[id.0]
    }

    pub fn chord(&self, id: ChordId) -> &Chord {
        &self.chords[id.0]
    }

    pub fn chord_mut(&mut self, id: ChordId) -> &mut Chord {
        &mut self.chords[id.0]
    }

    pub fn gs(&self, id: GsId) -> &GrpSyl {
        &self.grpsyls[id.0]
    }

    pub fn gs_mut(&mut self, id: GsId) -> &mut GrpSyl {
        &mut self.grpsyls[id.0]
    }

    /// Append a node to the end of the timeline.
    pub fn push_main(&mut self, item: MainItem, origin: SourceLoc) -> MainId {
        let id = MainId(self.main.len());
        self.main.push(MainNode {
            prev: self.tail,
            next: None,
            item,
            origin,
        });
        match self.tail {
            Some(t) => self.main[t.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    pub fn add_chord(&mut self, chord: Chord) -> ChordId {
        self.chords.push(chord);
        ChordId(self.chords.len() - 1)
    }

    pub fn add_grpsyl(&mut self, gs: GrpSyl) -> GsId {
        self.grpsyls.push(gs);
        GsId(self.grpsyls.len() - 1)
    }

    // ── Traversal ───────────────────────────────────────────────────

    /// Timeline nodes in order, head to tail.
    pub fn main_ids(&self) -> Vec<MainId> {
        let mut ids = Vec::with_capacity(self.main.len());
        let mut cur = self.head;
        while let Some(id) = cur {
            ids.push(id);
            cur = self.main[id.0].next;
        }
        ids
    }

    pub fn staff_content(&self, id: MainId) -> Option<&StaffContent> {
        match &self.main[id.0].item {
            MainItem::Staff(s) => Some(s),
            _ => None,
        }
    }

    pub fn staff_content_mut(&mut self, id: MainId) -> Option<&mut StaffContent> {
        match &mut self.main[id.0].item {
            MainItem::Staff(s) => Some(s),
            _ => None,
        }
    }

    pub fn bar(&self, id: MainId) -> Option<&Bar> {
        match &self.main[id.0].item {
            MainItem::Bar(b) => Some(b),
            _ => None,
        }
    }

    /// Chords of the measure headed by `chhead`, in time order.
    pub fn measure_chords(&self, chhead: MainId) -> Vec<ChordId> {
        let first = match &self.main[chhead.0].item {
            MainItem::ChHead(h) => h.first,
            _ => pfatal!(loc = &self.main[chhead.0].origin; "expected a chord header"),
        };
        let mut out = Vec::new();
        let mut cur = first;
        while let Some(c) = cur {
            out.push(c);
            cur = self.chords[c.0].next;
        }
        out
    }

    /// STAFF nodes following a chord header, up to the measure's bar.
    pub fn measure_staffs(&self, chhead: MainId) -> Vec<MainId> {
        let mut out = Vec::new();
        let mut cur = self.main[chhead.0].next;
        while let Some(id) = cur {
            match &self.main[id.0].item {
                MainItem::Staff(_) => out.push(id),
                MainItem::Bar(_) => break,
                _ => {}
            }
            cur = self.main[id.0].next;
        }
        out
    }

    /// The chord header that owns a STAFF node.
    pub fn chhead_of(&self, staff: MainId) -> MainId {
        let mut cur = self.main[staff.0].prev;
        while let Some(id) = cur {
            match &self.main[id.0].item {
                MainItem::ChHead(_) => return id,
                MainItem::Bar(_) => break,
                _ => {}
            }
            cur = self.main[id.0].prev;
        }
        pfatal!(loc = &self.main[staff.0].origin; "staff content has no chord header")
    }

    /// Members of a chord, across all staffs, in chord order.
    pub fn chord_members(&self, chord: ChordId) -> Vec<GsId> {
        let mut out = Vec::new();
        let mut cur = self.chords[chord.0].first;
        while let Some(g) = cur {
            out.push(g);
            cur = self.grpsyls[g.0].gs_next;
        }
        out
    }

    /// Members of a chord on one staff.
    pub fn chord_members_on(&self, chord: ChordId, staffno: usize) -> Vec<GsId> {
        self.chord_members(chord)
            .into_iter()
            .filter(|&g| self.grpsyls[g.0].staffno == staffno)
            .collect()
    }

    /// A voice or verse list with each member's start time.
    pub fn timed_list(&self, first: Option<GsId>) -> Vec<(GsId, RatTime)> {
        let mut out = Vec::new();
        let mut t = rat_zero();
        let mut cur = first;
        while let Some(g) = cur {
            out.push((g, t));
            t += self.grpsyls[g.0].fulltime;
            cur = self.grpsyls[g.0].next;
        }
        out
    }

    /// Start time of a group or syllable within its measure.
    pub fn start_time(&self, id: GsId) -> RatTime {
        let mut t = rat_zero();
        let mut cur = self.grpsyls[id.0].prev;
        while let Some(g) = cur {
            t += self.grpsyls[g.0].fulltime;
            cur = self.grpsyls[g.0].prev;
        }
        t
    }

    /// The earliest of the grace groups immediately before `id`, or `id`
    /// itself when it has none.
    pub fn first_grace_before(&self, id: GsId) -> GsId {
        let mut first = id;
        while let Some(p) = self.grpsyls[first.0].prev {
            if self.grpsyls[p.0].is_grace() {
                first = p;
            } else {
                break;
            }
        }
        first
    }

    /// Westmost extent of a group together with its leading grace groups.
    pub fn west_with_graces(&self, id: GsId) -> f64 {
        let mut west = self.grpsyls[id.0].c.west;
        let mut cur = self.grpsyls[id.0].prev;
        while let Some(p) = cur {
            if !self.grpsyls[p.0].is_grace() {
                break;
            }
            west = west.min(self.grpsyls[p.0].c.west);
            cur = self.grpsyls[p.0].prev;
        }
        west
    }

    /// Next syllable after `s` in its verse list that prints something.
    pub fn next_printed(&self, s: GsId) -> Option<GsId> {
        let mut cur = self.grpsyls[s.0].next;
        while let Some(n) = cur {
            if !self.grpsyls[n.0].expect_syllable().is_space() {
                return Some(n);
            }
            cur = self.grpsyls[n.0].next;
        }
        None
    }

    pub fn prev_printed(&self, s: GsId) -> Option<GsId> {
        let mut cur = self.grpsyls[s.0].prev;
        while let Some(p) = cur {
            if !self.grpsyls[p.0].expect_syllable().is_space() {
                return Some(p);
            }
            cur = self.grpsyls[p.0].prev;
        }
        None
    }

    /// Absolute X of the chord that owns a group or syllable.
    pub fn owner_ax(&self, id: GsId) -> f64 {
        let gs = &self.grpsyls[id.0];
        match gs.chord.and_then(|c| self.chords[c.0].ax) {
            Some(ax) => ax,
            None => pfatal!(loc = &gs.origin; "group or syllable has not been placed absolutely"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Font;

    #[test]
    fn timeline_links_both_ways() {
        let mut score = Score::new(ScoreParams::default());
        let a = score.push_main(MainItem::ChHead(ChordHead::default()), SourceLoc::new("t", 1));
        let b = score.push_main(MainItem::Bar(Bar::new(BarType::Single)), SourceLoc::new("t", 2));
        assert_eq!(score.head, Some(a));
        assert_eq!(score.node(a).next, Some(b));
        assert_eq!(score.node(b).prev, Some(a));
        assert_eq!(score.main_ids(), vec![a, b]);
    }

    #[test]
    fn syllable_lists_stay_sorted() {
        let mut staff = StaffContent::new(1);
        staff.insert_syl_list(SylList { verse: 2, place: Place::Below, first: GsId(0) });
        staff.insert_syl_list(SylList { verse: 1, place: Place::Below, first: GsId(1) });
        staff.insert_syl_list(SylList { verse: 2, place: Place::Above, first: GsId(2) });
        let order: Vec<(u8, Place)> = staff.syls.iter().map(|l| (l.verse, l.place)).collect();
        assert_eq!(order, vec![(1, Place::Below), (2, Place::Above), (2, Place::Below)]);
    }

    #[test]
    fn extender_detection() {
        let syl = Syllable {
            text: TaggedString::plain(Font::Roman, 12, "Ho-"),
            place: Place::Above,
            sylposition: None,
        };
        assert_eq!(syl.extender(), Some('-'));
        assert!(!syl.is_space());
    }
}
