//! Text-measurement service and the font/size-tagged strings it measures.
//!
//! The placement engine never looks at real font files. It asks a
//! [`TextMetrics`] implementation for glyph widths and heights, so the same
//! algorithms run against production font tables or the deterministic
//! [`FixedMetrics`] used in tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default point size for music glyphs.
pub const DFLT_SIZE: u8 = 12;
/// Point size used for cue and grace glyphs.
pub const SMALLSIZE: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Font {
    Roman,
    Italic,
    Bold,
    BoldItalic,
    Music,
}

/// Music glyphs, as SMuFL code points.
pub mod glyph {
    pub const NOTEHEAD_BLACK: char = '\u{E0A4}';
    pub const NOTEHEAD_HALF: char = '\u{E0A3}';
    pub const NOTEHEAD_WHOLE: char = '\u{E0A2}';
    pub const NOTEHEAD_DOUBLE_WHOLE: char = '\u{E0A0}';

    pub const REST_LONGA: char = '\u{E4E1}';
    pub const REST_DOUBLE_WHOLE: char = '\u{E4E2}';
    pub const REST_WHOLE: char = '\u{E4E3}';
    pub const REST_HALF: char = '\u{E4E4}';
    pub const REST_QUARTER: char = '\u{E4E5}';
    pub const REST_8TH: char = '\u{E4E6}';
    pub const REST_16TH: char = '\u{E4E7}';
    pub const REST_32ND: char = '\u{E4E8}';
    pub const REST_64TH: char = '\u{E4E9}';
    pub const REST_128TH: char = '\u{E4EA}';
    pub const REST_256TH: char = '\u{E4EB}';

    pub const FLAT: char = '\u{E260}';
    pub const NATURAL: char = '\u{E261}';
    pub const SHARP: char = '\u{E262}';
    pub const DOUBLE_SHARP: char = '\u{E263}';
    pub const DOUBLE_FLAT: char = '\u{E264}';
    pub const ACC_PAREN_LEFT: char = '\u{E26A}';
    pub const ACC_PAREN_RIGHT: char = '\u{E26B}';

    pub const AUGMENTATION_DOT: char = '\u{E1E7}';

    pub const G_CLEF: char = '\u{E050}';
    pub const C_CLEF: char = '\u{E05C}';
    pub const F_CLEF: char = '\u{E062}';
    pub const PERCUSSION_CLEF: char = '\u{E069}';

    pub const PEDAL_PED: char = '\u{E650}';
    pub const PEDAL_UP: char = '\u{E655}';

    pub const MEASURE_REPEAT: char = '\u{E500}';

    /// Notehead for a basic time (1 = whole, 2 = half, ...; 0 and below
    /// are double whole and longer).
    pub fn notehead(basictime: i32) -> char {
        match basictime {
            i32::MIN..=0 => NOTEHEAD_DOUBLE_WHOLE,
            1 => NOTEHEAD_WHOLE,
            2 => NOTEHEAD_HALF,
            _ => NOTEHEAD_BLACK,
        }
    }

    pub fn rest(basictime: i32) -> char {
        match basictime {
            i32::MIN..=-1 => REST_LONGA,
            0 => REST_DOUBLE_WHOLE,
            1 => REST_WHOLE,
            2 => REST_HALF,
            3..=4 => REST_QUARTER,
            5..=8 => REST_8TH,
            9..=16 => REST_16TH,
            17..=32 => REST_32ND,
            33..=64 => REST_64TH,
            65..=128 => REST_128TH,
            _ => REST_256TH,
        }
    }
}

/// One piece of a [`TaggedString`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextRun {
    Text(String),
    Font(Font),
    Size(u8),
}

fn unit_scale() -> f64 {
    1.0
}

/// A string carrying its starting font and size plus any in-line changes.
///
/// Sizes stay as written; `scale` accumulates every rescale so that
/// repeated rescaling rounds only once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedString {
    pub font: Font,
    pub size: u8,
    pub runs: Vec<TextRun>,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

impl TaggedString {
    pub fn plain(font: Font, size: u8, text: &str) -> Self {
        Self {
            font,
            size,
            runs: vec![TextRun::Text(text.to_string())],
            scale: 1.0,
        }
    }

    /// Point size a written size prints at.
    pub fn scaled(&self, size: u8) -> u8 {
        scale_size(size, self.scale)
    }

    /// All visible characters, with font/size changes dropped.
    pub fn text(&self) -> String {
        self.runs
            .iter()
            .filter_map(|r| match r {
                TextRun::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Last visible character, ignoring any trailing font/size changes.
    pub fn last_char(&self) -> Option<char> {
        self.runs.iter().rev().find_map(|r| match r {
            TextRun::Text(t) => t.chars().last(),
            _ => None,
        })
    }

    /// True when the string prints nothing but blanks.
    pub fn is_blank(&self) -> bool {
        self.text().chars().all(char::is_whitespace)
    }

    /// Font and size in effect at the end of the string.
    pub fn final_font(&self) -> (Font, u8) {
        let mut font = self.font;
        let mut size = self.size;
        for run in &self.runs {
            match run {
                TextRun::Font(f) => font = *f,
                TextRun::Size(s) => size = *s,
                TextRun::Text(_) => {}
            }
        }
        (font, self.scaled(size))
    }

    /// Drop the last visible character. Returns it, or `None` if there was
    /// nothing to remove.
    pub fn pop_char(&mut self) -> Option<char> {
        for run in self.runs.iter_mut().rev() {
            if let TextRun::Text(t) = run {
                if let Some(c) = t.pop() {
                    return Some(c);
                }
            }
        }
        None
    }

    /// Rescale every point size embedded in the string.
    pub fn resize(&mut self, factor: f64) {
        self.scale *= factor;
    }

    /// Split into the text runs before, inside, and after a slice of visible
    /// characters given by `[start, end)` char offsets. Font and size changes
    /// are carried into each piece so each can be measured on its own.
    pub fn split_at_chars(&self, start: usize, end: usize) -> (TaggedString, TaggedString, TaggedString) {
        let mut pieces = [
            TaggedString { font: self.font, size: self.size, runs: Vec::new(), scale: self.scale },
            TaggedString { font: self.font, size: self.size, runs: Vec::new(), scale: self.scale },
            TaggedString { font: self.font, size: self.size, runs: Vec::new(), scale: self.scale },
        ];
        let mut pos = 0usize;
        for run in &self.runs {
            match run {
                TextRun::Font(f) => {
                    for p in pieces.iter_mut() {
                        p.runs.push(TextRun::Font(*f));
                    }
                }
                TextRun::Size(s) => {
                    for p in pieces.iter_mut() {
                        p.runs.push(TextRun::Size(*s));
                    }
                }
                TextRun::Text(t) => {
                    for c in t.chars() {
                        let which = if pos < start {
                            0
                        } else if pos < end {
                            1
                        } else {
                            2
                        };
                        match pieces[which].runs.last_mut() {
                            Some(TextRun::Text(s)) => s.push(c),
                            _ => pieces[which].runs.push(TextRun::Text(c.to_string())),
                        }
                        pos += 1;
                    }
                }
            }
        }
        let [a, b, c] = pieces;
        (a, b, c)
    }
}

fn scale_size(size: u8, factor: f64) -> u8 {
    (size as f64 * factor).round().clamp(1.0, 255.0) as u8
}

/// Opaque font measurement service. Implementations must be pure.
pub trait TextMetrics {
    fn char_width(&self, font: Font, size: u8, ch: char) -> f64;
    fn char_ascent(&self, font: Font, size: u8, ch: char) -> f64;
    fn char_descent(&self, font: Font, size: u8, ch: char) -> f64;

    /// Width of a whole tagged string, honoring in-line font/size changes.
    fn str_width(&self, s: &TaggedString) -> f64 {
        let mut font = s.font;
        let mut size = s.size;
        let mut width = 0.0;
        for run in &s.runs {
            match run {
                TextRun::Font(f) => font = *f,
                TextRun::Size(sz) => size = *sz,
                TextRun::Text(t) => {
                    let size = s.scaled(size);
                    width += t.chars().map(|c| self.char_width(font, size, c)).sum::<f64>();
                }
            }
        }
        width
    }
}

/// Deterministic metrics: every glyph is `size * em` wide unless overridden.
#[derive(Debug, Clone)]
pub struct FixedMetrics {
    /// Advance of a text character, as a fraction of the point size.
    pub text_em: f64,
    /// Advance of a music glyph, as a fraction of the point size.
    pub music_em: f64,
    pub ascent_em: f64,
    pub descent_em: f64,
    overrides: HashMap<char, f64>,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self {
            text_em: 0.5,
            music_em: 0.5,
            ascent_em: 0.75,
            descent_em: 0.25,
            overrides: HashMap::new(),
        }
    }
}

impl FixedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give one glyph its own width, as a fraction of the point size.
    pub fn with_glyph(mut self, ch: char, em: f64) -> Self {
        self.overrides.insert(ch, em);
        self
    }
}

impl TextMetrics for FixedMetrics {
    fn char_width(&self, font: Font, size: u8, ch: char) -> f64 {
        let em = match self.overrides.get(&ch) {
            Some(em) => *em,
            None if font == Font::Music => self.music_em,
            None => self.text_em,
        };
        em * size as f64
    }

    fn char_ascent(&self, _font: Font, size: u8, _ch: char) -> f64 {
        self.ascent_em * size as f64
    }

    fn char_descent(&self, _font: Font, size: u8, _ch: char) -> f64 {
        self.descent_em * size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn last_char_skips_trailing_codes() {
        let s = TaggedString {
            font: Font::Roman,
            size: 12,
            runs: vec![
                TextRun::Text("ri_".into()),
                TextRun::Font(Font::Italic),
                TextRun::Size(10),
            ],
            scale: 1.0,
        };
        assert_eq!(s.last_char(), Some('_'));
        assert_eq!(s.final_font(), (Font::Italic, 10));
    }

    #[test]
    fn str_width_follows_size_changes() {
        let m = FixedMetrics::new();
        let s = TaggedString {
            font: Font::Roman,
            size: 10,
            runs: vec![
                TextRun::Text("ab".into()),
                TextRun::Size(20),
                TextRun::Text("c".into()),
            ],
            scale: 1.0,
        };
        assert_eq!(m.str_width(&s), 5.0 + 5.0 + 10.0);
    }

    #[test]
    fn split_keeps_codes_in_every_piece() {
        let s = TaggedString {
            font: Font::Roman,
            size: 12,
            runs: vec![TextRun::Text("1.".into()), TextRun::Size(14), TextRun::Text("Lord".into())],
            scale: 1.0,
        };
        let (pre, core, post) = s.split_at_chars(0, 2);
        assert_eq!(pre.text(), "");
        assert_eq!(core.text(), "1.");
        assert_eq!(post.text(), "Lord");
        assert_eq!(post.final_font(), (Font::Roman, 14));
    }

    #[test]
    fn resize_scales_embedded_sizes() {
        let mut s = TaggedString {
            font: Font::Roman,
            size: 12,
            runs: vec![TextRun::Size(10), TextRun::Text("x".into())],
            scale: 1.0,
        };
        s.resize(0.5);
        assert_eq!(s.final_font(), (Font::Roman, 5));
        assert_eq!(FixedMetrics::new().str_width(&s), 2.5);
    }

    #[test]
    fn repeated_resize_rounds_once() {
        let mut twice = TaggedString::plain(Font::Roman, 9, "x");
        let mut once = twice.clone();
        twice.resize(0.5);
        twice.resize(0.5);
        once.resize(0.25);
        assert_eq!(twice.final_font(), once.final_font());
        assert_eq!(twice.final_font(), (Font::Roman, 2));
    }
}
