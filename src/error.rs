use std::fmt;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Input image too large: {0} bytes (max 65536)")]
    ImageTooLarge(usize),

    #[error("Offset {offset:#06x} out of bounds (image size {size:#06x})")]
    OutOfBounds { offset: usize, size: usize },

    #[error("Unknown driver type: ch9:{ch9:04x} [{:02x} {:02x} {:02x} {:02x}]", .bytes[0], .bytes[1], .bytes[2], .bytes[3])]
    UnknownDriver { ch9: usize, bytes: [u8; 4] },

    #[error("Unknown file format: '{0}'")]
    UnknownFormat(String),

    #[error("{0}; exit with warning, try -w option to apply workaround")]
    Diagnostic(Diagnostic),

    #[error("Convert error: {0}")]
    Basic(String),

    #[error("Format error")]
    Fmt(#[from] fmt::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Known broken-data patterns found while emitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// OPM key code at or above 0x60
    TooHighTone { value: u8 },
    /// '/' whose forward target lands at or past the end of the track
    WrongBreak { target: usize, end: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Reported, corrected and conversion continued
    Warning,
    /// Conversion aborted
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Offset of the offending command
    pub offset: usize,
    pub severity: Severity,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DiagnosticKind::TooHighTone { value } => {
                write!(f, "Detect too high tone {:02x} @ {:04x}", value, self.offset)
            }
            DiagnosticKind::WrongBreak { .. } => {
                write!(f, "Detect wrong '/' command @ {:04x}", self.offset)
            }
        }
    }
}

/// Collects diagnostics for one conversion run and applies the workaround policy
#[derive(Debug, Default)]
pub struct Diagnostics {
    workaround: bool,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(workaround: bool) -> Self {
        Self {
            workaround,
            entries: Vec::new(),
        }
    }

    /// Record a diagnostic. Fails unless workaround mode is enabled.
    pub fn report(&mut self, kind: DiagnosticKind, offset: usize) -> Result<()> {
        let severity = if self.workaround {
            Severity::Warning
        } else {
            Severity::Fatal
        };
        let diagnostic = Diagnostic {
            kind,
            offset,
            severity,
        };
        tracing::warn!("{}", diagnostic);
        self.entries.push(diagnostic);

        match severity {
            Severity::Warning => Ok(()),
            Severity::Fatal => Err(Error::Diagnostic(diagnostic)),
        }
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_without_workaround() {
        let mut diags = Diagnostics::new(false);
        let err = diags
            .report(DiagnosticKind::TooHighTone { value: 0x65 }, 0x0123)
            .unwrap_err();
        match err {
            Error::Diagnostic(d) => {
                assert_eq!(d.severity, Severity::Fatal);
                assert_eq!(d.offset, 0x0123);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(diags.entries().len(), 1);
    }

    #[test]
    fn test_warning_with_workaround() {
        let mut diags = Diagnostics::new(true);
        diags
            .report(DiagnosticKind::WrongBreak { target: 0x40, end: 0x30 }, 0x20)
            .unwrap();
        assert_eq!(diags.entries()[0].severity, Severity::Warning);
    }

    #[test]
    fn test_diagnostic_message() {
        let d = Diagnostic {
            kind: DiagnosticKind::TooHighTone { value: 0x65 },
            offset: 0x1a,
            severity: Severity::Fatal,
        };
        assert_eq!(d.to_string(), "Detect too high tone 65 @ 001a");
    }

    #[test]
    fn test_fatal_error_message() {
        let mut diags = Diagnostics::new(false);
        let err = diags
            .report(DiagnosticKind::WrongBreak { target: 0x40, end: 0x30 }, 0x0120)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Detect wrong '/' command @ 0120; exit with warning, try -w option to apply workaround"
        );
    }
}
