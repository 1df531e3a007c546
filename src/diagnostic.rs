use std::fmt;
use std::io::{self, Write};
use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};

use crate::span::Span;

/// A compiler diagnostic (error or warning).
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Diagnostic {
    pub fn error(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn warning(message: String, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            span,
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_note(mut self, note: String) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_help(mut self, help: String) -> Self {
        self.help = Some(help);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    fn report<'a>(
        &self,
        filename: &'a str,
        source: &str,
        color: bool,
    ) -> Report<'a, (&'a str, Range<usize>)> {
        let kind = match self.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };
        let label_color = match self.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };

        let mut report = Report::build(kind, filename, 0)
            .with_config(Config::default().with_color(color))
            .with_message(&self.message);

        if !self.span.is_dummy() {
            // Spans from a stale AST file may point past the end of the source.
            let len = source.len();
            let start = (self.span.start as usize).min(len);
            let end = (self.span.end as usize).clamp(start, len);
            report = report.with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(label_color),
            );
        }

        for note in &self.notes {
            report = report.with_note(note);
        }

        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        report.finish()
    }

    /// Render the diagnostic to stderr using ariadne.
    pub fn render(&self, filename: &str, source: &str) {
        let report = self.report(filename, source, true);
        if report.eprint((filename, Source::from(source))).is_err() {
            eprintln!("{}", self);
        }
    }

    /// Render without color into `out`.
    pub fn write_report<W: Write>(&self, filename: &str, source: &str, out: W) -> io::Result<()> {
        self.report(filename, source, false)
            .write((filename, Source::from(source)), out)
    }
}

/// Plain one-line form, used when no source text is available.
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", kind, self.message)?;
        if !self.span.is_dummy() {
            write!(f, " (at {}..{})", self.span.start, self.span.end)?;
        }
        for note in &self.notes {
            write!(f, "\n  note: {}", note)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}

/// Render a list of diagnostics.
pub fn render_diagnostics(diagnostics: &[Diagnostic], filename: &str, source: &str) {
    for diag in diagnostics {
        diag.render(filename, source);
    }
}

/// Print diagnostics as plain text to stderr.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        eprintln!("{}", diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let d = Diagnostic::error("undeclared variable `x`".to_string(), Span::new(10, 15));
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "undeclared variable `x`");
        assert_eq!(d.span.start, 10);
        assert_eq!(d.span.end, 15);
        assert!(d.notes.is_empty());
        assert!(d.help.is_none());
        assert!(d.is_error());
    }

    #[test]
    fn test_warning_construction() {
        let d = Diagnostic::warning("unreachable statement".to_string(), Span::dummy());
        assert_eq!(d.severity, Severity::Warning);
        assert!(!d.is_error());
    }

    #[test]
    fn test_chained_builders() {
        let d = Diagnostic::error("type mismatch".to_string(), Span::new(0, 5))
            .with_note("expected Int".to_string())
            .with_help("declare it as Double".to_string())
            .with_note("found Double".to_string());
        assert_eq!(d.notes, vec!["expected Int", "found Double"]);
        assert_eq!(d.help.as_deref(), Some("declare it as Double"));
    }

    #[test]
    fn test_plain_display() {
        let d = Diagnostic::error("undefined function `f`".to_string(), Span::new(3, 4))
            .with_help("declare `f` before calling it".to_string());
        assert_eq!(
            d.to_string(),
            "error: undefined function `f` (at 3..4)\n  help: declare `f` before calling it"
        );
        let w = Diagnostic::warning("unreachable statement".to_string(), Span::dummy());
        assert_eq!(w.to_string(), "warning: unreachable statement");
    }

    #[test]
    fn test_write_report_labels_source() {
        let source = "Int x = 1;\ny = 2;\n";
        let d = Diagnostic::error("undeclared variable `y`".to_string(), Span::new(11, 12));
        let mut out = Vec::new();
        d.write_report("prog.sb", source, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("undeclared variable `y`"));
        assert!(text.contains("prog.sb"));
        assert!(text.contains("y = 2;"));
    }

    #[test]
    fn test_write_report_clamps_out_of_range_span() {
        let d = Diagnostic::error("oops".to_string(), Span::new(100, 200));
        let mut out = Vec::new();
        d.write_report("short.sb", "x", &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("oops"));
    }

    #[test]
    fn test_span_at_file_start_is_shown() {
        let d = Diagnostic::error("empty program".to_string(), Span::new(0, 0));
        assert_eq!(d.to_string(), "error: empty program (at 0..0)");
    }

    #[test]
    fn test_write_report_without_location() {
        let d = Diagnostic::error("malformed IR".to_string(), Span::dummy());
        let mut out = Vec::new();
        d.write_report("prog.sb", "Int x = 1;\n", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("malformed IR"));
        assert!(!text.contains("Int x = 1;"));
    }

    #[test]
    fn test_render_diagnostics_does_not_panic() {
        let source = "Int x = 1;\nInt y = 2;\n";
        let diagnostics = vec![
            Diagnostic::warning("unreachable statement".to_string(), Span::new(11, 21)),
            Diagnostic::error("type mismatch".to_string(), Span::new(4, 5)),
        ];
        render_diagnostics(&diagnostics, "test.sb", source);
    }
}
