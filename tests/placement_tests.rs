//! Placement tests: chord widths, spacing and pedal room over whole scores.

use chordspace::builder::{GroupSpec, LyricSpec, ScoreBuilder, StaffSpec};
use chordspace::metrics::glyph;
use chordspace::params::{PedalStyle, VoiceScheme};
use chordspace::placement::v3pack::{v3pack, Pack};
use chordspace::{
    layout_to_json, place_score, restsyl, Bar, BarType, ChordId, FixedMetrics, MainItem, PedalMark, RatTime, Score,
    ScoreParams,
};
use pretty_assertions::assert_eq;

fn q() -> RatTime {
    RatTime::new(1, 4)
}

fn two_staff_song() -> ScoreBuilder {
    let params = ScoreParams {
        vscheme: VoiceScheme::TwoOpposingStems,
        ..Default::default()
    };
    let mut b = ScoreBuilder::new(params);
    b.measure(vec![
        StaffSpec::new(1)
            .voice(
                1,
                vec![
                    GroupSpec::notes(4, &[4]),
                    GroupSpec::notes(8, &[5]),
                    GroupSpec::notes(8, &[6]),
                    GroupSpec::rest(4),
                    GroupSpec::notes(4, &[3]),
                ],
            )
            .voice(2, vec![GroupSpec::notes(2, &[-4, -2]), GroupSpec::rest(2)])
            .lyrics(
                LyricSpec::below(1)
                    .syl("Ev-", q())
                    .syl("er-", RatTime::new(1, 8))
                    .syl("more_", RatTime::new(3, 8))
                    .space(q()),
            ),
        StaffSpec::new(2).voice(1, vec![GroupSpec::measure_rest()]),
    ])
    .bar(Bar::new(BarType::Single))
    .measure(vec![
        StaffSpec::new(1)
            .voice(1, vec![GroupSpec::notes(1, &[0])])
            .voice(2, vec![GroupSpec::measure_space()]),
        StaffSpec::new(2).voice(1, vec![GroupSpec::notes(2, &[-2]), GroupSpec::notes(2, &[-3])]),
    ])
    .bar(Bar::new(BarType::End));
    b
}

fn chords_of(score: &Score) -> Vec<Vec<ChordId>> {
    score
        .main_ids()
        .into_iter()
        .filter(|id| matches!(score.node(*id).item, MainItem::ChHead(_)))
        .map(|id| score.measure_chords(id))
        .collect()
}

#[test]
fn chord_widths_are_consistent() {
    let metrics = FixedMetrics::new();
    let mut score = two_staff_song().build(&metrics).unwrap();
    restsyl(&mut score, &metrics);

    for measure in chords_of(&score) {
        assert!(!measure.is_empty());
        for &c in &measure {
            let chord = score.chord(c);
            assert!(chord.west <= 0.0, "chord {:?} west {} should not be east of center", c, chord.west);
            assert!(chord.east >= 0.0, "chord {:?} east {} should not be west of center", c, chord.east);
            assert_eq!(chord.width, chord.east - chord.west);
        }
        for pair in measure.windows(2) {
            let (a, b) = (score.chord(pair[0]), score.chord(pair[1]));
            assert!((a.phantom_x + a.east - (b.phantom_x + b.west)).abs() < 1e-9);
        }
    }
}

#[test]
fn same_voice_groups_never_overlap() {
    let metrics = FixedMetrics::new();
    let mut score = two_staff_song().build(&metrics).unwrap();
    restsyl(&mut score, &metrics);

    for gs in &score.grpsyls {
        let (Some(next), Some(chord)) = (gs.next, gs.chord) else {
            continue;
        };
        let other = score.gs(next);
        if !gs.is_group() || gs.is_grace() || other.is_grace() {
            continue;
        }
        let Some(next_chord) = other.chord else {
            continue;
        };
        let east = score.chord(chord).phantom_x + gs.c.east;
        let west = score.chord(next_chord).phantom_x + other.c.west;
        assert!(east <= west + 1e-9, "voice {} on staff {} overlaps itself", gs.vno, gs.staffno);
    }
}

#[test]
fn pedal_marks_get_room() {
    let metrics = FixedMetrics::new()
        .with_glyph(glyph::PEDAL_PED, 1.0)
        .with_glyph(glyph::PEDAL_UP, 1.0);
    let params = ScoreParams {
        pedstyle: PedalStyle::PedStar,
        ..Default::default()
    };
    let quarters = (0..4).map(|_| GroupSpec::notes(4, &[0])).collect();
    let mut b = ScoreBuilder::new(params);
    b.measure(vec![StaffSpec::new(1)
        .voice(1, quarters)
        .pedal(RatTime::from_integer(0), PedalMark::Begin)
        .pedal(q(), PedalMark::End)])
        .bar(Bar::new(BarType::Single));
    let mut score = b.build(&metrics).unwrap();
    restsyl(&mut score, &metrics);

    let chords = &chords_of(&score)[0];
    let (a, b) = (score.chord(chords[0]), score.chord(chords[1]));
    // half of "Ped." plus half of "*", both 12 wide
    assert!((a.east - b.west - 12.0).abs() < 1e-9, "gap was {}", a.east - b.west);
    assert!(score.diagnostics.is_empty());
}

#[test]
fn pedal_line_style_needs_no_room() {
    let metrics = FixedMetrics::new()
        .with_glyph(glyph::PEDAL_PED, 1.0)
        .with_glyph(glyph::PEDAL_UP, 1.0);
    let quarters = (0..4).map(|_| GroupSpec::notes(4, &[0])).collect();
    let mut b = ScoreBuilder::new(ScoreParams::default());
    b.measure(vec![StaffSpec::new(1)
        .voice(1, quarters)
        .pedal(RatTime::from_integer(0), PedalMark::Begin)
        .pedal(q(), PedalMark::End)])
        .bar(Bar::new(BarType::Single));
    let mut score = b.build(&metrics).unwrap();
    restsyl(&mut score, &metrics);

    let chords = &chords_of(&score)[0];
    let (a, b) = (score.chord(chords[0]), score.chord(chords[1]));
    assert!(a.east - b.west < 12.0);
}

#[test]
fn voice_three_packing_is_stable() {
    let params = ScoreParams {
        vscheme: VoiceScheme::ThreeOpposingStems,
        ..Default::default()
    };
    let halves = |steps: i32| vec![GroupSpec::notes(2, &[steps]), GroupSpec::notes(2, &[steps])];
    let mut b = ScoreBuilder::new(params);
    b.measure(vec![StaffSpec::new(1)
        .voice(1, halves(4))
        .voice(2, halves(-6))
        .voice(3, halves(0).into_iter().map(|g| g.horz(chordspace::HorzOffset::Left)).collect())])
        .bar(Bar::new(BarType::Single));
    let metrics = FixedMetrics::new();
    let score = b.build(&metrics).unwrap();
    let groups = score.chord_members_on(ChordId(0), 1);

    // an explicit offset on voice 3 keeps it out of the notes
    let first = v3pack(&score, &groups, &metrics);
    assert_eq!(first, Pack::None);
    assert_eq!(v3pack(&score, &groups, &metrics), first);
}

#[test]
fn placed_score_serializes() {
    let metrics = FixedMetrics::new();
    let mut score = two_staff_song().build(&metrics).unwrap();
    place_score(&mut score, &metrics);

    let json = layout_to_json(&score).unwrap();
    let back: Score = serde_json::from_str(&json).unwrap();
    assert_eq!(back.chords.len(), score.chords.len());
    assert_eq!(back.extenders, score.extenders);
    assert!(score.chords.iter().all(|c| c.ax.is_some()), "every chord is placed");
}

#[test]
fn params_from_json_keep_defaults() {
    let params = ScoreParams::from_json(r#"{ "staffscale": 0.5, "pedstyle": "AltPedStar" }"#).unwrap();
    assert_eq!(params.staffscale, 0.5);
    assert_eq!(params.pedstyle, PedalStyle::AltPedStar);
    assert_eq!(params.stafflines, 5);
    assert!(ScoreParams::from_json("{ not json").is_err());
}
