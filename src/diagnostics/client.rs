//! Text rendering of diagnostics, with optional ANSI color and JSON output.

use serde::Serialize;

use super::{Diagnostic, Severity};
use crate::source::SourceManager;

/// Accumulates rendered diagnostics for the driver to flush to stderr.
///
/// Display toggles default to on; the driver lowers them from the
/// `--diag-*` options.
pub struct TextDiagnosticClient {
    show_colors: bool,
    json: bool,
    show_column: bool,
    show_location: bool,
    show_source_line: bool,
    show_option_name: bool,
    show_include_stack: bool,
    show_macro_expansion: bool,
    show_hierarchy: bool,
    buffer: String,
}

impl Default for TextDiagnosticClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDiagnosticClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            show_colors: false,
            json: false,
            show_column: true,
            show_location: true,
            show_source_line: true,
            show_option_name: true,
            show_include_stack: true,
            show_macro_expansion: true,
            show_hierarchy: true,
            buffer: String::new(),
        }
    }

    pub fn show_colors(&mut self, value: bool) {
        self.show_colors = value;
    }

    pub fn set_json(&mut self, value: bool) {
        self.json = value;
    }

    pub fn show_column(&mut self, value: bool) {
        self.show_column = value;
    }

    pub fn show_location(&mut self, value: bool) {
        self.show_location = value;
    }

    pub fn show_source_line(&mut self, value: bool) {
        self.show_source_line = value;
    }

    pub fn show_option_name(&mut self, value: bool) {
        self.show_option_name = value;
    }

    pub fn show_include_stack(&mut self, value: bool) {
        self.show_include_stack = value;
    }

    pub fn show_macro_expansion(&mut self, value: bool) {
        self.show_macro_expansion = value;
    }

    pub fn show_hierarchy(&mut self, value: bool) {
        self.show_hierarchy = value;
    }

    #[must_use]
    pub fn colors_enabled(&self) -> bool {
        self.show_colors
    }

    /// Drain the rendered text accumulated so far.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.buffer
    }

    /// Render one diagnostic at its resolved severity.
    pub fn report(&mut self, severity: Severity, diag: &Diagnostic, sm: &SourceManager) {
        if self.json {
            self.report_json(severity, diag, sm);
            return;
        }

        let resolved = diag.location.and_then(|loc| {
            let buffer = sm.get(loc.buffer)?;
            let (line, column) = buffer.line_col(loc.offset);
            let line_text = buffer.line_text(line).map(str::to_owned);
            Some((buffer.path.display().to_string(), line, column, line_text))
        });

        if self.show_include_stack {
            for entry in &diag.include_stack {
                if let Some(buffer) = sm.get(entry.buffer) {
                    let (line, _) = buffer.line_col(entry.offset);
                    self.buffer.push_str(&format!(
                        "In file included from {}:{}:\n",
                        buffer.path.display(),
                        line
                    ));
                }
            }
        }

        if self.show_hierarchy {
            if let Some(hierarchy) = &diag.hierarchy {
                self.buffer
                    .push_str(&format!("  in instance: {hierarchy}\n"));
            }
        }

        if self.show_location {
            if let Some((path, line, column, _)) = &resolved {
                self.buffer.push_str(path);
                self.buffer.push_str(&format!(":{line}"));
                if self.show_column {
                    self.buffer.push_str(&format!(":{column}"));
                }
                self.buffer.push_str(": ");
            }
        }

        let label = severity.as_str();
        if self.show_colors {
            self.buffer
                .push_str(&colorize(label, severity_color(severity)));
        } else {
            self.buffer.push_str(label);
        }
        self.buffer.push_str(": ");
        self.buffer.push_str(&diag.message());

        if self.show_option_name {
            if let Some(option) = diag.code.option_name() {
                self.buffer.push_str(&format!(" [-W{option}]"));
            }
        }
        self.buffer.push('\n');

        if self.show_source_line {
            if let Some((_, _, column, Some(line_text))) = &resolved {
                self.buffer.push_str(line_text);
                self.buffer.push('\n');
                let caret_pad = " ".repeat(column.saturating_sub(1));
                if self.show_colors {
                    self.buffer.push_str(&format!(
                        "{caret_pad}{}\n",
                        colorize("^", severity_color(severity))
                    ));
                } else {
                    self.buffer.push_str(&format!("{caret_pad}^\n"));
                }
            }
        }

        if self.show_macro_expansion {
            if let Some(name) = &diag.macro_name {
                self.buffer
                    .push_str(&format!("note: expanded from macro '{name}'\n"));
            }
        }
    }

    fn report_json(&mut self, severity: Severity, diag: &Diagnostic, sm: &SourceManager) {
        let mut payload = JsonDiagnostic {
            severity: severity.as_str(),
            message: diag.message(),
            file: None,
            line: None,
            column: None,
            option: diag.code.option_name(),
        };
        if let Some(loc) = diag.location {
            if let Some(buffer) = sm.get(loc.buffer) {
                let (line, column) = buffer.line_col(loc.offset);
                payload.file = Some(buffer.path.display().to_string());
                payload.line = Some(line);
                payload.column = Some(column);
            }
        }
        if let Ok(rendered) = serde_json::to_string(&payload) {
            self.buffer.push_str(&rendered);
            self.buffer.push('\n');
        }
    }
}

#[derive(Serialize)]
struct JsonDiagnostic {
    severity: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    option: Option<&'static str>,
}

fn colorize(value: &str, code: &str) -> String {
    format!("\u{1b}[{code}m{value}\u{1b}[0m")
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error | Severity::Fatal => "1;31",
        Severity::Warning => "1;33",
        Severity::Note | Severity::Ignored => "1;34",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagCode;
    use crate::source::SourceLocation;

    fn sample() -> (SourceManager, Diagnostic) {
        let sm = SourceManager::new();
        let id = sm.assign_text("src.v", "module m;\nwire w = other;\nendmodule\n", None);
        let offset = 19; // points at `other`
        let diag = Diagnostic::new(DiagCode::ImplicitConvert, Some(SourceLocation::new(id, offset)))
            .arg("color_t");
        (sm, diag)
    }

    #[test]
    fn text_output_includes_location_message_and_caret() {
        let (sm, diag) = sample();
        let mut client = TextDiagnosticClient::new();
        client.report(Severity::Warning, &diag, &sm);
        let output = client.take_output();
        assert!(output.contains("src.v:2:10: warning:"), "{output}");
        assert!(output.contains("[-Wimplicit-convert]"), "{output}");
        assert!(output.contains("wire w = other;"), "{output}");
        assert!(output.contains("         ^"), "{output}");
    }

    #[test]
    fn display_toggles_remove_their_sections() {
        let (sm, diag) = sample();
        let mut client = TextDiagnosticClient::new();
        client.show_column(false);
        client.show_source_line(false);
        client.show_option_name(false);
        client.report(Severity::Warning, &diag, &sm);
        let output = client.take_output();
        assert!(output.contains("src.v:2: warning:"), "{output}");
        assert!(!output.contains("[-W"), "{output}");
        assert!(!output.contains('^'), "{output}");
    }

    #[test]
    fn colors_wrap_the_severity_label() {
        let (sm, diag) = sample();
        let mut client = TextDiagnosticClient::new();
        client.show_colors(true);
        client.report(Severity::Error, &diag, &sm);
        let output = client.take_output();
        assert!(output.contains("\u{1b}[1;31merror\u{1b}[0m:"), "{output}");
    }

    #[test]
    fn include_stack_renders_before_the_location() {
        let sm = SourceManager::new();
        let top = sm.assign_text("top.v", "`include \"x.vh\"\n", None);
        let inc = sm.assign_text("x.vh", "bad line\n", None);
        let mut diag = Diagnostic::new(
            DiagCode::ExpectedMember,
            Some(SourceLocation::new(inc, 0)),
        );
        diag.include_stack.push(SourceLocation::new(top, 0));

        let mut client = TextDiagnosticClient::new();
        client.report(Severity::Error, &diag, &sm);
        let output = client.take_output();
        let stack_pos = output.find("In file included from top.v:1:").unwrap();
        let loc_pos = output.find("x.vh:1:1:").unwrap();
        assert!(stack_pos < loc_pos, "{output}");
    }

    #[test]
    fn json_mode_emits_one_object_per_diagnostic() {
        let (sm, diag) = sample();
        let mut client = TextDiagnosticClient::new();
        client.set_json(true);
        client.report(Severity::Warning, &diag, &sm);
        let output = client.take_output();
        let value: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["file"], "src.v");
        assert_eq!(value["line"], 2);
        assert_eq!(value["option"], "implicit-convert");
    }
}
