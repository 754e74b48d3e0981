//! Diagnostic rendering.

use std::fmt::Write;

use super::info::{Diagnostic, Severity};

// ============================================================================
// Options
// ============================================================================

/// Display style for diagnostic output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayStyle {
    /// Header, location, source snippet and hints.
    #[default]
    Rich,
    /// One line: `path:line:col: severity: message`.
    Short,
}

/// Options for controlling diagnostic formatting.
///
/// ```
/// use typeforge::diagnostic::{DiagnosticOptions, DisplayStyle};
///
/// let opts = DiagnosticOptions::plain().with_style(DisplayStyle::Short);
/// assert!(!opts.colored);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    /// Whether to use ANSI colors in output.
    pub colored: bool,
    /// Display style.
    pub style: DisplayStyle,
    /// Whether to include the offending source line.
    pub snippets: bool,
    /// Whether to include hints.
    pub hints: bool,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            colored: true,
            style: DisplayStyle::Rich,
            snippets: true,
            hints: true,
        }
    }
}

impl DiagnosticOptions {
    /// Colored terminal output.
    pub fn colored() -> Self {
        Self::default()
    }

    /// Plain text output (no ANSI colors).
    pub fn plain() -> Self {
        Self {
            colored: false,
            ..Self::default()
        }
    }

    /// Short format (file:line:col: message).
    pub fn short() -> Self {
        Self {
            style: DisplayStyle::Short,
            snippets: false,
            ..Self::default()
        }
    }

    /// Set whether to use colors.
    pub fn with_colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Set display style.
    pub fn with_style(mut self, style: DisplayStyle) -> Self {
        self.style = style;
        self
    }

    /// Set whether to include source snippets.
    pub fn with_snippets(mut self, snippets: bool) -> Self {
        self.snippets = snippets;
        self
    }

    /// Set whether to include hints.
    pub fn with_hints(mut self, hints: bool) -> Self {
        self.hints = hints;
        self
    }
}

// ============================================================================
// Coloring
// ============================================================================

#[cfg(feature = "colored-diagnostics")]
fn colorize(text: &str, severity: Severity) -> String {
    use owo_colors::OwoColorize;
    match severity {
        Severity::Error => text.red().to_string(),
        Severity::Warning => text.yellow().to_string(),
    }
}

#[cfg(feature = "colored-diagnostics")]
fn colorize_help(text: &str) -> String {
    use owo_colors::OwoColorize;
    text.cyan().to_string()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize(text: &str, _severity: Severity) -> String {
    text.to_owned()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize_help(text: &str) -> String {
    text.to_owned()
}

fn paint(options: &DiagnosticOptions, severity: Severity, text: &str) -> String {
    if options.colored {
        colorize(text, severity)
    } else {
        text.to_owned()
    }
}

fn paint_help(options: &DiagnosticOptions, text: &str) -> String {
    if options.colored {
        colorize_help(text)
    } else {
        text.to_owned()
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Append `diagnostic` to `output`.
///
/// ```text
/// error: expected value (ns.Config)
///   ┌─ /res/ns/Config.json:2:8
///   │
/// 2 │   "a": ,
///   │        ^
///   = hint: ...
/// ```
pub fn format_diagnostic(output: &mut String, diagnostic: &Diagnostic, options: DiagnosticOptions) {
    let label = paint(&options, diagnostic.severity, diagnostic.severity.label());
    let location = match (&diagnostic.path, diagnostic.line, diagnostic.column) {
        (Some(path), Some(line), Some(col)) => Some(format!("{path}:{line}:{col}")),
        (Some(path), _, _) => Some(path.clone()),
        _ => None,
    };

    if options.style == DisplayStyle::Short {
        match location {
            Some(loc) => {
                _ = writeln!(output, "{loc}: {label}: {}", diagnostic.message);
            }
            None => {
                _ = writeln!(output, "{}: {label}: {}", diagnostic.fqn, diagnostic.message);
            }
        }
        return;
    }

    _ = writeln!(output, "{label}: {} ({})", diagnostic.message, diagnostic.fqn);
    let gutter = diagnostic.line.map_or(1, |l| l.to_string().len());
    if let Some(loc) = &location {
        _ = writeln!(output, "{:gutter$} ┌─ {loc}", "");
    }
    if options.snippets
        && let (Some(text), Some(line), Some(col)) =
            (&diagnostic.source_line, diagnostic.line, diagnostic.column)
    {
        _ = writeln!(output, "{:gutter$} │", "");
        _ = writeln!(output, "{line:>gutter$} │ {text}");
        let marker = paint(&options, diagnostic.severity, "^");
        _ = writeln!(output, "{:gutter$} │ {:pad$}{marker}", "", "", pad = col.saturating_sub(1));
    }
    if options.hints {
        for hint in &diagnostic.hints {
            _ = writeln!(output, "{:gutter$} {} hint: {hint}", "", paint_help(&options, "="));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Position;

    fn sample() -> Diagnostic {
        let text = "{\n  \"a\": ,\n}";
        Diagnostic::error("ns.Config", "expected value")
            .with_path("/res/ns/Config.json")
            .with_position(Position::from_offset(text, 9))
            .with_source_line("  \"a\": ,")
            .with_hint("remove the trailing comma")
    }

    #[test]
    fn test_short_format() {
        let mut out = String::new();
        format_diagnostic(&mut out, &sample(), DiagnosticOptions::short().with_colored(false));
        assert_eq!(out, "/res/ns/Config.json:2:8: error: expected value\n");

        let mut bare = String::new();
        let warning = Diagnostic::warning("ns.Foo", "ambiguous");
        format_diagnostic(&mut bare, &warning, DiagnosticOptions::short().with_colored(false));
        assert_eq!(bare, "ns.Foo: warning: ambiguous\n");
    }

    #[test]
    fn test_rich_format() {
        let mut out = String::new();
        format_diagnostic(&mut out, &sample(), DiagnosticOptions::plain());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "error: expected value (ns.Config)");
        assert_eq!(lines[1], "  ┌─ /res/ns/Config.json:2:8");
        assert_eq!(lines[3], "2 │   \"a\": ,");
        assert_eq!(lines[4], "  │        ^");
        assert_eq!(lines[5], "  = hint: remove the trailing comma");
    }

    #[test]
    fn test_snippets_can_be_disabled() {
        let mut out = String::new();
        format_diagnostic(&mut out, &sample(), DiagnosticOptions::plain().with_snippets(false).with_hints(false));
        assert_eq!(out.lines().count(), 2);
    }
}
