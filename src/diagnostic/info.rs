//! Diagnostics reported while generating types.

use std::fmt;

use super::format::{format_diagnostic, DiagnosticOptions};

// ============================================================================
// Severity & Position
// ============================================================================

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Generation of the type failed.
    Error,
    /// Generation proceeded, but something looks wrong.
    Warning,
}

impl Severity {
    /// Lower-case label used in rendered output.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// A location inside a resource's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Byte offset from the start of the text.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column (in characters).
    pub column: usize,
}

impl Position {
    /// Resolve a byte offset against `text`. Offsets past the end clamp.
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = text[line_start..offset].chars().count() + 1;
        Self {
            offset,
            line,
            column,
        }
    }

    /// Resolve a 1-based line and column against `text`.
    pub fn from_line_column(text: &str, line: usize, column: usize) -> Self {
        let line_start: usize = text
            .split_inclusive('\n')
            .take(line.saturating_sub(1))
            .map(str::len)
            .sum();
        let within: usize = text[line_start..]
            .chars()
            .take(column.saturating_sub(1))
            .map(char::len_utf8)
            .sum();
        Self {
            offset: line_start + within,
            line: line.max(1),
            column: column.max(1),
        }
    }
}

/// The text of `line` (1-based) without its terminator.
pub(crate) fn line_text(text: &str, line: usize) -> Option<&str> {
    text.lines().nth(line.checked_sub(1)?)
}

// ============================================================================
// Diagnostic
// ============================================================================

/// A single diagnostic, attributed to the type it was raised for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Error or warning.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Type the diagnostic belongs to.
    pub fqn: String,
    /// Resource path, when one is known.
    pub path: Option<String>,
    /// Byte offset inside the resource.
    pub offset: Option<usize>,
    /// 1-based line.
    pub line: Option<usize>,
    /// 1-based column.
    pub column: Option<usize>,
    /// Text of the offending line, for snippets.
    pub source_line: Option<String>,
    /// Help messages.
    pub hints: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, fqn: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            fqn: fqn.into(),
            path: None,
            offset: None,
            line: None,
            column: None,
            source_line: None,
            hints: Vec::new(),
        }
    }

    /// An error for `fqn`.
    pub fn error(fqn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, fqn, message)
    }

    /// A warning for `fqn`.
    pub fn warning(fqn: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, fqn, message)
    }

    /// Attach the resource path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach a resolved position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.offset = Some(position.offset);
        self.line = Some(position.line);
        self.column = Some(position.column);
        self
    }

    /// Attach the offending source line.
    pub fn with_source_line(mut self, line: impl Into<String>) -> Self {
        self.source_line = Some(line.into());
        self
    }

    /// Add a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Whether this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render with `options`.
    pub fn display(&self, options: DiagnosticOptions) -> String {
        let mut out = String::new();
        format_diagnostic(&mut out, self, options);
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display(DiagnosticOptions::plain()).trim_end())
    }
}

// ============================================================================
// Sink
// ============================================================================

/// Receiver of diagnostics supplied by the caller of a generation request.
pub trait DiagnosticSink {
    /// Record one diagnostic.
    fn report(&mut self, diagnostic: Diagnostic);
}

impl<F: FnMut(Diagnostic)> DiagnosticSink for F {
    fn report(&mut self, diagnostic: Diagnostic) {
        self(diagnostic)
    }
}

/// A sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreDiagnostics;

impl DiagnosticSink for IgnoreDiagnostics {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

// ============================================================================
// DiagnosticSummary
// ============================================================================

/// Summary of diagnostic counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticSummary {
    /// Number of errors.
    pub errors: usize,
    /// Number of warnings.
    pub warnings: usize,
}

impl DiagnosticSummary {
    /// Total number of diagnostics.
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }

    /// Whether there are any errors.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Whether there are any diagnostics at all.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match (self.errors, self.warnings) {
            (0, 0) => write!(f, "no diagnostics"),
            (e, 0) => write!(f, "{e} error{}", plural(e)),
            (0, w) => write!(f, "{w} warning{}", plural(w)),
            (e, w) => write!(f, "{e} error{}, {w} warning{}", plural(e), plural(w)),
        }
    }
}

// ============================================================================
// Diagnostics (Collection)
// ============================================================================

/// A collecting sink.
///
/// ```
/// use typeforge::diagnostic::{Diagnostic, DiagnosticSink, Diagnostics};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.report(Diagnostic::warning("ns.Foo", "two files back ns.Foo"));
/// assert_eq!(diagnostics.summary().to_string(), "1 warning");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether any error was reported.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Count errors and warnings.
    pub fn summary(&self) -> DiagnosticSummary {
        let errors = self.errors().count();
        DiagnosticSummary {
            errors,
            warnings: self.items.len() - errors,
        }
    }

    /// Iterate over all diagnostics.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Iterate over errors only.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Iterate over warnings only.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics raised for `fqn`.
    pub fn for_type<'a>(&'a self, fqn: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.items.iter().filter(move |d| d.fqn == fqn)
    }

    /// Move everything from `other` into `self`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Format with custom options.
    pub fn with_options<'a>(&'a self, options: &'a DiagnosticOptions) -> DiagnosticsDisplay<'a> {
        DiagnosticsDisplay {
            diagnostics: self,
            options,
        }
    }

    /// Get a slice of all diagnostics.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        DiagnosticsDisplay {
            diagnostics: self,
            options: &DiagnosticOptions::default(),
        }
        .fmt(f)
    }
}

/// Display wrapper for formatting diagnostics with custom options.
pub struct DiagnosticsDisplay<'a> {
    diagnostics: &'a Diagnostics,
    options: &'a DiagnosticOptions,
}

impl fmt::Display for DiagnosticsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            format_diagnostic(&mut out, diagnostic, *self.options);
        }
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_from_offset() {
        let text = "a=1\nbad line\nc=3";
        let pos = Position::from_offset(text, 6);
        assert_eq!((pos.line, pos.column), (2, 3));
        assert_eq!(line_text(text, pos.line), Some("bad line"));

        let end = Position::from_offset(text, 999);
        assert_eq!(end.offset, text.len());
        assert_eq!(end.line, 3);
    }

    #[test]
    fn test_position_from_line_column() {
        let text = "{\n  \"a\": ,\n}";
        let pos = Position::from_line_column(text, 2, 8);
        assert_eq!(pos.offset, 9);
        assert_eq!(&text[pos.offset..pos.offset + 1], ",");
        assert_eq!(Position::from_offset(text, pos.offset), pos);
    }

    #[test]
    fn test_summary_display() {
        let mut diags = Diagnostics::new();
        assert_eq!(diags.summary().to_string(), "no diagnostics");
        diags.report(Diagnostic::error("a.B", "boom"));
        diags.report(Diagnostic::warning("a.B", "hmm"));
        diags.report(Diagnostic::warning("a.C", "hmm"));
        assert_eq!(diags.summary().to_string(), "1 error, 2 warnings");
        assert!(diags.has_errors());
        assert_eq!(diags.for_type("a.B").count(), 2);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        let mut sink = |d: Diagnostic| seen.push(d.message);
        sink.report(Diagnostic::warning("x", "one"));
        assert_eq!(seen, ["one"]);
    }
}
