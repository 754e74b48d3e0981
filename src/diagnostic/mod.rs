//! Diagnostics surfaced to the host while generating types.

mod format;
mod info;

pub use format::{format_diagnostic, DiagnosticOptions, DisplayStyle};
pub use info::{
    Diagnostic, DiagnosticSink, DiagnosticSummary, Diagnostics, DiagnosticsDisplay,
    IgnoreDiagnostics, Position, Severity,
};
pub(crate) use info::line_text;
