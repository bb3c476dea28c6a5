//! User-facing diagnostics and the internal-fault macro.
//!
//! Two tiers, never mixed:
//! - [`pfatal!`] for violated structural invariants. It logs and panics.
//! - [`Diagnostics`] for anomalies in the user's input. The engine records a
//!   warning against the originating input line, applies its fallback, and
//!   keeps going.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a node came from in the user's input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLoc {
    pub file: String,
    /// `None` for nodes synthesized by the engine itself.
    pub line: Option<u32>,
}

impl SourceLoc {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line: Some(line) }
    }

    /// Location for something the engine created rather than parsed.
    pub fn synthetic() -> Self {
        Self { file: String::new(), line: None }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file.is_empty(), self.line) {
            (false, Some(line)) => write!(f, "{}:{}", self.file, line),
            (true, Some(line)) => write!(f, "line {}", line),
            (false, None) => write!(f, "{}", self.file),
            (true, None) => write!(f, "<generated>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub loc: SourceLoc,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", self.loc, tag, self.message)
    }
}

/// Accumulated tier-two diagnostics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning against `loc` and forward it to the log.
    pub fn warn(&mut self, loc: &SourceLoc, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", loc, message);
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            loc: loc.clone(),
            message,
        });
    }

    /// Record a user error. The run still completes.
    pub fn error(&mut self, loc: &SourceLoc, message: impl Into<String>) {
        let message = message.into();
        log::error!("{}: {}", loc, message);
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            loc: loc.clone(),
            message,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Abort the run on a violated structural invariant.
///
/// Accepts an optional leading `loc = <&SourceLoc>;` so the panic names the
/// input line that produced the broken node.
#[macro_export]
macro_rules! pfatal {
    (loc = $loc:expr; $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::error!("internal error at {}: {}", $loc, msg);
        panic!("internal error at {}: {}", $loc, msg)
    }};
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::error!("internal error: {}", msg);
        panic!("internal error: {}", msg)
    }};
}
