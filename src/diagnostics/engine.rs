//! Severity resolution and routing of diagnostics to the text client.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::client::TextDiagnosticClient;
use super::{DiagCode, Diagnostic, Severity};
use crate::source::{SourceLocation, SourceManager};

/// Default cap on rendered errors; zero disables the cap.
pub const DEFAULT_ERROR_LIMIT: usize = 20;

/// An in-source severity directive collected by the preprocessor.
#[derive(Clone, Debug)]
pub struct SeverityPragma {
    pub location: SourceLocation,
    pub severity: String,
    pub option: String,
}

/// Holds the severity table and decides what reaches the client.
///
/// Only the driver thread issues diagnostics; parse workers buffer into
/// per-task sinks that the driver drains in input order.
pub struct DiagnosticEngine {
    overrides: HashMap<DiagCode, Severity>,
    warnings_as_errors: bool,
    error_limit: usize,
    num_errors: usize,
    num_warnings: usize,
    hit_error_limit: bool,
    ignore_paths: Vec<PathBuf>,
    ignore_macro_paths: Vec<PathBuf>,
    pragma_overrides: Vec<(SourceLocation, DiagCode, Severity)>,
    client: TextDiagnosticClient,
}

impl Default for DiagnosticEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
            warnings_as_errors: false,
            error_limit: DEFAULT_ERROR_LIMIT,
            num_errors: 0,
            num_warnings: 0,
            hit_error_limit: false,
            ignore_paths: Vec::new(),
            ignore_macro_paths: Vec::new(),
            pragma_overrides: Vec::new(),
            client: TextDiagnosticClient::new(),
        }
    }

    pub fn client(&self) -> &TextDiagnosticClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut TextDiagnosticClient {
        &mut self.client
    }

    /// Number of errors rendered so far (includes fatal diagnostics).
    #[must_use]
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    #[must_use]
    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    pub fn set_error_limit(&mut self, limit: usize) {
        self.error_limit = limit;
    }

    /// Reset every severity decision back to the compiled defaults.
    pub fn set_default_warnings(&mut self) {
        self.overrides.clear();
        self.warnings_as_errors = false;
    }

    pub fn set_severity(&mut self, code: DiagCode, severity: Severity) {
        self.overrides.insert(code, severity);
    }

    /// Severity a diagnostic would resolve to right now, ignoring pragmas.
    #[must_use]
    pub fn severity(&self, code: DiagCode) -> Severity {
        let base = self
            .overrides
            .get(&code)
            .copied()
            .unwrap_or_else(|| code.default_severity());
        if base == Severity::Warning && self.warnings_as_errors {
            Severity::Error
        } else {
            base
        }
    }

    /// Register a canonical path below which warnings are suppressed.
    pub fn add_ignore_path(&mut self, path: PathBuf) {
        self.ignore_paths.push(path);
    }

    /// Register a canonical path below which macro-expansion warnings are
    /// suppressed.
    pub fn add_ignore_macro_path(&mut self, path: PathBuf) {
        self.ignore_macro_paths.push(path);
    }

    /// Apply user `-W` directives. Returns diagnostics for unknown names;
    /// the caller issues them.
    pub fn set_warning_options(&mut self, options: &[String]) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for option in options {
            match option.as_str() {
                "error" => self.warnings_as_errors = true,
                "no-error" => self.warnings_as_errors = false,
                "none" => {
                    for code in DiagCode::all_warnings() {
                        self.overrides.insert(code, Severity::Ignored);
                    }
                }
                "everything" => {
                    for code in DiagCode::all_warnings() {
                        self.overrides.insert(code, Severity::Warning);
                    }
                }
                _ => {
                    let (name, severity) = if let Some(name) = option.strip_prefix("error=") {
                        (name, Severity::Error)
                    } else if let Some(name) = option.strip_prefix("no-error=") {
                        (name, Severity::Warning)
                    } else if let Some(name) = option.strip_prefix("no-") {
                        (name, Severity::Ignored)
                    } else {
                        (option.as_str(), Severity::Warning)
                    };
                    match DiagCode::from_option_name(name) {
                        Some(code) => {
                            self.overrides.insert(code, severity);
                        }
                        None => diags.push(
                            Diagnostic::new(DiagCode::UnknownWarningOption, None)
                                .arg(option.clone()),
                        ),
                    }
                }
            }
        }
        diags
    }

    /// Install severity regions collected from in-source pragmas. A region
    /// runs from the pragma to the end of its buffer. Returns diagnostics for
    /// malformed directives.
    pub fn set_mappings_from_pragmas(&mut self, pragmas: &[SeverityPragma]) -> Vec<Diagnostic> {
        let mut diags = Vec::new();
        for pragma in pragmas {
            let severity = match pragma.severity.as_str() {
                "ignore" => Some(Severity::Ignored),
                "warn" => Some(Severity::Warning),
                "error" => Some(Severity::Error),
                _ => None,
            };
            let code = DiagCode::from_option_name(&pragma.option);
            match (severity, code) {
                (Some(severity), Some(code)) => {
                    self.pragma_overrides.push((pragma.location, code, severity));
                }
                _ => diags.push(Diagnostic::new(
                    DiagCode::InvalidPragmaDiagnostic,
                    Some(pragma.location),
                )),
            }
        }
        diags
    }

    /// Resolve the final severity of a diagnostic, including pragma regions.
    #[must_use]
    pub fn final_severity(&self, diag: &Diagnostic) -> Severity {
        let mut severity = self
            .overrides
            .get(&diag.code)
            .copied()
            .unwrap_or_else(|| diag.code.default_severity());

        if let Some(location) = diag.location {
            let mut best: Option<(usize, Severity)> = None;
            for (pragma_loc, code, pragma_sev) in &self.pragma_overrides {
                if *code == diag.code
                    && pragma_loc.buffer == location.buffer
                    && pragma_loc.offset <= location.offset
                    && best.map_or(true, |(offset, _)| pragma_loc.offset >= offset)
                {
                    best = Some((pragma_loc.offset, *pragma_sev));
                }
            }
            if let Some((_, pragma_sev)) = best {
                severity = pragma_sev;
            }
        }

        if severity == Severity::Warning && self.warnings_as_errors {
            Severity::Error
        } else {
            severity
        }
    }

    /// Route one diagnostic through suppression, counting, and rendering.
    pub fn issue(&mut self, diag: &Diagnostic, sm: &SourceManager) {
        let severity = self.final_severity(diag);
        if severity == Severity::Ignored {
            return;
        }

        if severity <= Severity::Warning && self.is_suppressed(diag, sm) {
            return;
        }

        if severity.counts_as_error() {
            self.num_errors += 1;
            if self.error_limit > 0 && self.num_errors > self.error_limit {
                if !self.hit_error_limit {
                    self.hit_error_limit = true;
                    let stop = Diagnostic::new(DiagCode::TooManyErrors, None);
                    self.client.report(Severity::Fatal, &stop, sm);
                }
                return;
            }
        } else if severity == Severity::Warning {
            self.num_warnings += 1;
        }

        self.client.report(severity, diag, sm);
    }

    fn is_suppressed(&self, diag: &Diagnostic, sm: &SourceManager) -> bool {
        let Some(location) = diag.location else {
            return false;
        };
        let Some(path) = sm.path(location.buffer) else {
            return false;
        };
        let canonical = std::fs::canonicalize(&path).unwrap_or(path);

        if path_matches(&self.ignore_paths, &canonical) {
            return true;
        }
        diag.macro_name.is_some() && path_matches(&self.ignore_macro_paths, &canonical)
    }
}

fn path_matches(prefixes: &[PathBuf], path: &Path) -> bool {
    prefixes.iter().any(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BufferId;

    fn warning_diag(code: DiagCode) -> Diagnostic {
        Diagnostic::new(code, None)
    }

    #[test]
    fn defaults_come_from_the_code_table() {
        let engine = DiagnosticEngine::new();
        assert_eq!(
            engine.severity(DiagCode::DuplicateDefinition),
            Severity::Warning
        );
        assert_eq!(engine.severity(DiagCode::UnknownModule), Severity::Error);
    }

    #[test]
    fn set_default_warnings_clears_overrides() {
        let mut engine = DiagnosticEngine::new();
        engine.set_severity(DiagCode::ImplicitConvert, Severity::Ignored);
        engine.set_default_warnings();
        assert_eq!(engine.severity(DiagCode::ImplicitConvert), Severity::Warning);
    }

    #[test]
    fn warning_options_follow_the_documented_grammar() {
        let mut engine = DiagnosticEngine::new();
        let diags = engine.set_warning_options(&[
            "no-implicit-convert".into(),
            "error=index-oob".into(),
            "no-error=range-oob".into(),
        ]);
        assert!(diags.is_empty());
        assert_eq!(engine.severity(DiagCode::ImplicitConvert), Severity::Ignored);
        assert_eq!(engine.severity(DiagCode::IndexOOB), Severity::Error);
        assert_eq!(engine.severity(DiagCode::RangeOOB), Severity::Warning);
    }

    #[test]
    fn unknown_warning_names_are_reported_not_applied() {
        let mut engine = DiagnosticEngine::new();
        let diags = engine.set_warning_options(&["definitely-not-a-warning".into()]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagCode::UnknownWarningOption);
    }

    #[test]
    fn blanket_error_promotes_warnings_only() {
        let mut engine = DiagnosticEngine::new();
        let _ = engine.set_warning_options(&["error".into()]);
        assert_eq!(engine.severity(DiagCode::ImplicitConvert), Severity::Error);
        // Explicitly ignored codes stay ignored.
        engine.set_severity(DiagCode::ImplicitConvert, Severity::Ignored);
        assert_eq!(engine.severity(DiagCode::ImplicitConvert), Severity::Ignored);
    }

    #[test]
    fn empty_warning_options_change_nothing() {
        let mut engine = DiagnosticEngine::new();
        engine.set_severity(DiagCode::ImplicitConvert, Severity::Ignored);
        let diags = engine.set_warning_options(&[]);
        assert!(diags.is_empty());
        assert_eq!(engine.severity(DiagCode::ImplicitConvert), Severity::Ignored);
    }

    #[test]
    fn user_options_take_final_precedence_over_promotions() {
        // Mirror the driver's order: defaults, mandatory overrides,
        // promotions, then the user downgrade.
        let mut engine = DiagnosticEngine::new();
        engine.set_default_warnings();
        engine.set_severity(DiagCode::DuplicateDefinition, Severity::Error);
        engine.set_severity(DiagCode::IndexOOB, Severity::Error);
        let _ = engine.set_warning_options(&["index-oob".into()]);
        assert_eq!(engine.severity(DiagCode::IndexOOB), Severity::Warning);
        assert_eq!(engine.severity(DiagCode::DuplicateDefinition), Severity::Error);
    }

    #[test]
    fn pragma_regions_override_the_table_from_their_offset() {
        let sm = SourceManager::new();
        let id = sm.assign_text("a.v", "line one\nline two\n", None);

        let mut engine = DiagnosticEngine::new();
        let diags = engine.set_mappings_from_pragmas(&[SeverityPragma {
            location: SourceLocation::new(id, 9),
            severity: "ignore".into(),
            option: "implicit-convert".into(),
        }]);
        assert!(diags.is_empty());

        let before = Diagnostic::new(DiagCode::ImplicitConvert, Some(SourceLocation::new(id, 0)));
        let after = Diagnostic::new(DiagCode::ImplicitConvert, Some(SourceLocation::new(id, 12)));
        assert_eq!(engine.final_severity(&before), Severity::Warning);
        assert_eq!(engine.final_severity(&after), Severity::Ignored);
    }

    #[test]
    fn malformed_pragmas_come_back_as_diagnostics() {
        let mut engine = DiagnosticEngine::new();
        let diags = engine.set_mappings_from_pragmas(&[SeverityPragma {
            location: SourceLocation::new(BufferId(0), 0),
            severity: "quiet".into(),
            option: "implicit-convert".into(),
        }]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagCode::InvalidPragmaDiagnostic);
    }

    #[test]
    fn error_limit_reports_once_then_suppresses() {
        let sm = SourceManager::new();
        let mut engine = DiagnosticEngine::new();
        engine.set_error_limit(2);
        for _ in 0..5 {
            engine.issue(&warning_diag(DiagCode::UnknownModule), &sm);
        }
        assert_eq!(engine.num_errors(), 5);
        let output = engine.client_mut().take_output();
        assert_eq!(output.matches("unknown module").count(), 2);
        assert_eq!(output.matches("too many errors").count(), 1);
    }

    #[test]
    fn zero_error_limit_disables_the_cap() {
        let sm = SourceManager::new();
        let mut engine = DiagnosticEngine::new();
        engine.set_error_limit(0);
        for _ in 0..50 {
            engine.issue(&warning_diag(DiagCode::UnknownModule), &sm);
        }
        assert_eq!(engine.num_errors(), 50);
        let output = engine.client_mut().take_output();
        assert_eq!(output.matches("unknown module").count(), 50);
    }

    #[test]
    fn ignore_paths_suppress_warnings_but_not_errors() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("third_party.v");
        std::fs::write(&file, "module m; endmodule\n").unwrap();

        let sm = SourceManager::new();
        let id = sm.read_file(&file, None).unwrap();

        let mut engine = DiagnosticEngine::new();
        engine.add_ignore_path(std::fs::canonicalize(dir.path()).unwrap());

        let warn = Diagnostic::new(
            DiagCode::ImplicitConvert,
            Some(SourceLocation::new(id, 0)),
        );
        let err = Diagnostic::new(DiagCode::UnknownModule, Some(SourceLocation::new(id, 0)));
        engine.issue(&warn, &sm);
        engine.issue(&err, &sm);
        assert_eq!(engine.num_warnings(), 0);
        assert_eq!(engine.num_errors(), 1);
    }

    #[test]
    fn macro_ignore_paths_require_macro_origin() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("macros.svh");
        std::fs::write(&file, "`define BAD 1\n").unwrap();

        let sm = SourceManager::new();
        let id = sm.read_file(&file, None).unwrap();

        let mut engine = DiagnosticEngine::new();
        engine.add_ignore_macro_path(std::fs::canonicalize(dir.path()).unwrap());

        let plain = Diagnostic::new(
            DiagCode::ImplicitConvert,
            Some(SourceLocation::new(id, 0)),
        );
        let from_macro = plain.clone().in_macro("BAD");
        engine.issue(&plain, &sm);
        engine.issue(&from_macro, &sm);
        assert_eq!(engine.num_warnings(), 1);
    }
}
