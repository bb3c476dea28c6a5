//! Recoverable errors raised while a timeline is being assembled.

use thiserror::Error;

use crate::diagnostics::SourceLoc;
use crate::model::RatTime;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{loc}: staff number must be at least 1")]
    BadStaff { loc: SourceLoc },
    #[error("{loc}: voice {voice} on staff {staff} is out of range (1..=3)")]
    BadVoice { loc: SourceLoc, staff: usize, voice: u8 },
    #[error("{loc}: staff {staff} appears twice in one measure")]
    DuplicateStaff { loc: SourceLoc, staff: usize },
    #[error("{loc}: voice {voice} on staff {staff} adds up to {actual}, but the measure is {expected}")]
    MeasureLength {
        loc: SourceLoc,
        staff: usize,
        voice: u8,
        expected: RatTime,
        actual: RatTime,
    },
    #[error("{loc}: verse {verse} on staff {staff} adds up to {actual}, but the measure is {expected}")]
    LyricLength {
        loc: SourceLoc,
        staff: usize,
        verse: u8,
        expected: RatTime,
        actual: RatTime,
    },
    #[error("{loc}: grace group in voice {voice} on staff {staff} is not followed by a main group")]
    DanglingGrace { loc: SourceLoc, staff: usize, voice: u8 },
    #[error("{loc}: note index {index} is out of range for this group")]
    BadNoteIndex { loc: SourceLoc, index: usize },
    #[error("measure content before any measure was started")]
    NoMeasure,
    #[error("the last measure is not terminated by a bar line")]
    UnterminatedMeasure,
    #[error("invalid score parameters: {0}")]
    Params(#[from] serde_json::Error),
}
