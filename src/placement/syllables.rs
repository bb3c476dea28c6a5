//! Syllable boxes.
//!
//! A syllable's text is `<pre>core<post>`: the angle-bracketed parts are
//! printed but hang outside the core, which is what gets aligned to the
//! chord. The brackets themselves are removed here.

use crate::metrics::{TaggedString, TextMetrics, TextRun};
use crate::model::*;
use crate::params::ParamState;

/// Char counts of the leading decoration and the core of a syllable whose
/// markers have already been stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Split {
    pre: usize,
    core: usize,
}

/// Strip `<...>` markers from the start and end of a syllable and return
/// the cleaned text with its split. A trailing extender counts as trailing
/// decoration.
fn split_syllable(text: &TaggedString) -> (TaggedString, Split) {
    let chars: Vec<char> = text.text().chars().collect();
    let len = chars.len();
    let mut drop: Vec<usize> = Vec::new();

    let mut core_start = 0;
    let mut pre = 0;
    if chars.first() == Some(&'<') {
        if let Some(close) = chars.iter().skip(1).position(|c| *c == '>').map(|p| p + 1) {
            drop.extend([0, close]);
            pre = close - 1;
            core_start = close + 1;
        }
    }

    let mut core_end = len;
    if chars.last() == Some(&'>') && len > core_start + 1 {
        if let Some(open) = chars[core_start..len - 1].iter().rposition(|c| *c == '<') {
            let open = open + core_start;
            drop.extend([open, len - 1]);
            core_end = open;
        }
    }
    if core_end == len && core_end > core_start && matches!(chars[len - 1], '-' | '_') {
        core_end -= 1;
    }

    let stripped = if drop.is_empty() {
        text.clone()
    } else {
        remove_chars(text, &drop)
    };
    (
        stripped,
        Split {
            pre,
            core: core_end - core_start,
        },
    )
}

/// Copy of `text` without the visible characters at the given offsets.
fn remove_chars(text: &TaggedString, drop: &[usize]) -> TaggedString {
    let mut out = TaggedString {
        font: text.font,
        size: text.size,
        runs: Vec::with_capacity(text.runs.len()),
        scale: text.scale,
    };
    let mut pos = 0usize;
    for run in &text.runs {
        match run {
            TextRun::Text(t) => {
                let kept: String = t
                    .chars()
                    .filter(|_| {
                        let keep = !drop.contains(&pos);
                        pos += 1;
                        keep
                    })
                    .collect();
                out.runs.push(TextRun::Text(kept));
            }
            other => out.runs.push(other.clone()),
        }
    }
    out
}

/// Horizontal box of a syllable relative to its chord.
pub fn syllable_box(
    syl: &Syllable,
    last_in_measure: bool,
    lyricsalign: f64,
    sylposition: Option<f64>,
    metrics: &dyn TextMetrics,
) -> (TaggedString, Rect) {
    if syl.is_space() {
        return (syl.text.clone(), Rect::default());
    }
    let (text, split) = split_syllable(&syl.text);
    let (pre, core, post) = text.split_at_chars(split.pre, split.pre + split.core);
    let (pre_w, core_w, post_w) = (
        metrics.str_width(&pre),
        metrics.str_width(&core),
        metrics.str_width(&post),
    );

    let (west, mut east) = match syl.sylposition.or(sylposition) {
        Some(pos) => (pos - pre_w, pos + core_w + post_w),
        None => (
            -lyricsalign * core_w - pre_w,
            (1.0 - lyricsalign) * core_w + post_w,
        ),
    };

    let (font, size) = text.final_font();
    let space = metrics.char_width(font, size, ' ');
    let hyphen = syl.extender() == Some('-');
    if !last_in_measure && !hyphen {
        east += space;
    } else if last_in_measure && hyphen {
        east -= space;
    }

    (
        text,
        Rect {
            west,
            east,
            ..Rect::default()
        },
    )
}

/// Size every syllable in the score.
pub fn procsyls(score: &mut Score, metrics: &dyn TextMetrics) -> usize {
    let mut state = ParamState::new(&score.params);
    let mut count = 0;
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
        let staffno = content.staffno;
        let firsts: Vec<GsId> = content.syls.iter().map(|l| l.first).collect();
        let align = state.lyricsalign(staffno);
        let sylposition = state.sylposition(staffno);

        for first in firsts {
            let mut cur = Some(first);
            while let Some(s) = cur {
                let gs = score.gs(s);
                let last = gs.next.is_none();
                let (text, rect) = syllable_box(gs.expect_syllable(), last, align, sylposition, metrics);
                cur = gs.next;

                let gs = score.gs_mut(s);
                gs.c = rect;
                if let Some(syl) = gs.syllable_mut() {
                    syl.text = text;
                }
                count += 1;
            }
        }
    }
    log::debug!("procsyls: sized {} syllables", count);
    count
}
