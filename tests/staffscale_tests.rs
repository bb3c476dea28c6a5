//! Staffscale tests: scaling is applied once, composes, and spares the
//! provisional measure-repeat width.

use chordspace::builder::{GroupSpec, LyricSpec, ScoreBuilder, StaffSpec};
use chordspace::params::{ParamSet, SsvUpdate};
use chordspace::placement::constants::TEMP_MRPT_HALFWIDTH;
use chordspace::placement::staffscale::{apply_staffscale, scale_staffs};
use chordspace::{Bar, BarType, FixedMetrics, RatTime, Rect, Score, ScoreParams};
use pretty_assertions::assert_eq;

fn song(params: ScoreParams) -> Score {
    let mut b = ScoreBuilder::new(params);
    b.measure(vec![
        StaffSpec::new(1)
            .voice(1, vec![GroupSpec::notes(2, &[3]).dots(1), GroupSpec::notes(4, &[-1])])
            .lyrics(LyricSpec::below(1).syl("Glo-", RatTime::new(3, 4)).syl("ry", RatTime::new(1, 4))),
        StaffSpec::new(2).voice(1, vec![GroupSpec::measure_repeat()]),
    ])
    .bar(Bar::new(BarType::Single));
    b.build(&FixedMetrics::new()).unwrap()
}

fn boxes(score: &Score) -> Vec<Rect> {
    score.grpsyls.iter().map(|g| g.c).collect()
}

fn lyric_sizes(score: &Score) -> Vec<u8> {
    score
        .grpsyls
        .iter()
        .filter_map(|g| g.syllable())
        .map(|s| s.text.final_font().1)
        .collect()
}

#[test]
fn halving_twice_is_quartering() {
    let mut twice = song(ScoreParams::default());
    let mut once = song(ScoreParams::default());
    scale_staffs(&mut twice, |_, _| 0.5);
    scale_staffs(&mut twice, |_, _| 0.5);
    scale_staffs(&mut once, |_, _| 0.25);
    assert_eq!(boxes(&twice), boxes(&once));
    assert_eq!(lyric_sizes(&twice), lyric_sizes(&once));
}

#[test]
fn odd_text_size_rounds_once() {
    let params = ScoreParams {
        lyrics_size: 9,
        ..Default::default()
    };
    let mut twice = song(params.clone());
    let mut once = song(params);
    scale_staffs(&mut twice, |_, _| 0.5);
    scale_staffs(&mut twice, |_, _| 0.5);
    scale_staffs(&mut once, |_, _| 0.25);
    assert_eq!(lyric_sizes(&twice), vec![2, 2]);
    assert_eq!(lyric_sizes(&twice), lyric_sizes(&once));
}

#[test]
fn measure_repeat_width_is_not_scaled() {
    let mut score = song(ScoreParams::default());
    assert_eq!(scale_staffs(&mut score, |_, staff| if staff == 2 { 0.5 } else { 1.0 }), 1);

    let mrpt = score.grpsyls.iter().find(|g| g.staffno == 2).unwrap();
    assert_eq!(mrpt.c.east, TEMP_MRPT_HALFWIDTH);
    assert_eq!(mrpt.c.west, -TEMP_MRPT_HALFWIDTH * 0.5);
}

#[test]
fn unit_scale_leaves_everything_alone() {
    let mut score = song(ScoreParams::default());
    let before = boxes(&score);
    apply_staffscale(&mut score);
    assert_eq!(boxes(&score), before);
    assert!(score.staffscale_applied);

    // a second pass at full size is harmless
    apply_staffscale(&mut score);
    assert_eq!(boxes(&score), before);
    assert_eq!(scale_staffs(&mut score, |_, _| 1.0), 0);
    assert_eq!(boxes(&score), before);
}

#[test]
fn staff_parameter_scales_only_that_staff() {
    let params = ScoreParams::default();
    let mut b = ScoreBuilder::new(params);
    b.ssv(SsvUpdate::staff(
        1,
        ParamSet {
            staffscale: Some(0.5),
            ..Default::default()
        },
    ))
    .measure(vec![
        StaffSpec::new(1).voice(1, vec![GroupSpec::notes(1, &[0])]),
        StaffSpec::new(2).voice(1, vec![GroupSpec::notes(1, &[0])]),
    ])
    .bar(Bar::new(BarType::Single));
    let mut score = b.build(&FixedMetrics::new()).unwrap();
    let before = boxes(&score);
    apply_staffscale(&mut score);

    assert_eq!(score.grpsyls[0].c.east, before[0].east * 0.5);
    assert_eq!(score.grpsyls[1].c, before[1]);
}

#[test]
#[should_panic(expected = "staffscale applied twice")]
fn second_application_is_fatal() {
    let mut score = song(ScoreParams {
        staffscale: 0.5,
        ..Default::default()
    });
    apply_staffscale(&mut score);
    apply_staffscale(&mut score);
}
