//! Diagnostic model: codes, severities, and the diagnostic record that flows
//! from the front-end services into the engine.

pub mod client;
pub mod engine;

pub use client::TextDiagnosticClient;
pub use engine::DiagnosticEngine;

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::source::SourceLocation;

/// Severity of a diagnostic after all overrides are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Ignored => "ignored",
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }

    #[must_use]
    pub fn counts_as_error(self) -> bool {
        matches!(self, Severity::Error | Severity::Fatal)
    }
}

/// Every diagnostic kind the front-end can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagCode {
    // Lexing
    UnexpectedChar,
    UnterminatedString,
    TooManyLexerErrors,
    // Preprocessing
    UnknownDirective,
    CouldNotOpenIncludeFile,
    ExceededMaxIncludeDepth,
    ExpectedMacroName,
    MacroArgCountMismatch,
    MacroRecursionLimit,
    UnexpectedConditionalDirective,
    InvalidPragmaDiagnostic,
    // Parsing
    ExpectedMember,
    UnclosedDesignElement,
    MaxParseDepthExceeded,
    // Elaboration
    DuplicateDefinition,
    UnknownModule,
    InvalidTopModule,
    NoTopModules,
    UnknownParamOverride,
    MaxHierarchyDepthExceeded,
    UnusedDefinition,
    ImplicitConvert,
    IndexOOB,
    RangeOOB,
    RangeWidthOOB,
    BadFinishNum,
    NonstandardSysFunc,
    NonstandardForeach,
    NonstandardDist,
    SplitDistWeightOp,
    ImplicitNamedPortTypeMismatch,
    StaticInitializerMustBeExplicit,
    BadProceduralForce,
    // Engine
    UnknownWarningOption,
    TooManyErrors,
}

struct CodeInfo {
    code: DiagCode,
    /// Name accepted by `-W` and shown as `[-Wname]`; `None` for hard errors.
    option: Option<&'static str>,
    default_severity: Severity,
    message: &'static str,
}

const CODE_TABLE: &[CodeInfo] = &[
    CodeInfo {
        code: DiagCode::UnexpectedChar,
        option: None,
        default_severity: Severity::Error,
        message: "unexpected character '{}'",
    },
    CodeInfo {
        code: DiagCode::UnterminatedString,
        option: None,
        default_severity: Severity::Error,
        message: "unterminated string literal",
    },
    CodeInfo {
        code: DiagCode::TooManyLexerErrors,
        option: None,
        default_severity: Severity::Fatal,
        message: "too many lexer errors, giving up on the rest of the file",
    },
    CodeInfo {
        code: DiagCode::UnknownDirective,
        option: None,
        default_severity: Severity::Error,
        message: "unknown macro or compiler directive '{}'",
    },
    CodeInfo {
        code: DiagCode::CouldNotOpenIncludeFile,
        option: None,
        default_severity: Severity::Error,
        message: "could not find or open include file '{}'",
    },
    CodeInfo {
        code: DiagCode::ExceededMaxIncludeDepth,
        option: None,
        default_severity: Severity::Fatal,
        message: "exceeded maximum include depth",
    },
    CodeInfo {
        code: DiagCode::ExpectedMacroName,
        option: None,
        default_severity: Severity::Error,
        message: "expected macro name",
    },
    CodeInfo {
        code: DiagCode::MacroArgCountMismatch,
        option: None,
        default_severity: Severity::Error,
        message: "wrong number of arguments provided to macro '{}'",
    },
    CodeInfo {
        code: DiagCode::MacroRecursionLimit,
        option: None,
        default_severity: Severity::Fatal,
        message: "macro expansion recursed too deeply",
    },
    CodeInfo {
        code: DiagCode::UnexpectedConditionalDirective,
        option: None,
        default_severity: Severity::Error,
        message: "unexpected conditional directive",
    },
    CodeInfo {
        code: DiagCode::InvalidPragmaDiagnostic,
        option: Some("invalid-pragma"),
        default_severity: Severity::Warning,
        message: "invalid pragma diagnostic directive",
    },
    CodeInfo {
        code: DiagCode::ExpectedMember,
        option: None,
        default_severity: Severity::Error,
        message: "invalid statement or declaration",
    },
    CodeInfo {
        code: DiagCode::UnclosedDesignElement,
        option: None,
        default_severity: Severity::Error,
        message: "unterminated design element '{}'",
    },
    CodeInfo {
        code: DiagCode::MaxParseDepthExceeded,
        option: None,
        default_severity: Severity::Fatal,
        message: "maximum parse depth exceeded",
    },
    CodeInfo {
        code: DiagCode::DuplicateDefinition,
        option: Some("duplicate-definition"),
        default_severity: Severity::Warning,
        message: "duplicate definition of '{}'",
    },
    CodeInfo {
        code: DiagCode::UnknownModule,
        option: None,
        default_severity: Severity::Error,
        message: "unknown module '{}'",
    },
    CodeInfo {
        code: DiagCode::InvalidTopModule,
        option: Some("invalid-top"),
        default_severity: Severity::Warning,
        message: "invalid top module name '{}'",
    },
    CodeInfo {
        code: DiagCode::NoTopModules,
        option: Some("missing-top"),
        default_severity: Severity::Warning,
        message: "no top-level modules found in design",
    },
    CodeInfo {
        code: DiagCode::UnknownParamOverride,
        option: Some("unknown-param-override"),
        default_severity: Severity::Warning,
        message: "unknown parameter '{}' in override",
    },
    CodeInfo {
        code: DiagCode::MaxHierarchyDepthExceeded,
        option: None,
        default_severity: Severity::Error,
        message: "maximum hierarchy depth exceeded at instance '{}'",
    },
    CodeInfo {
        code: DiagCode::UnusedDefinition,
        option: Some("unused-definition"),
        default_severity: Severity::Warning,
        message: "module '{}' is declared but never instantiated",
    },
    CodeInfo {
        code: DiagCode::ImplicitConvert,
        option: Some("implicit-convert"),
        default_severity: Severity::Warning,
        message: "implicit conversion of integral value to enum type '{}'",
    },
    CodeInfo {
        code: DiagCode::IndexOOB,
        option: Some("index-oob"),
        default_severity: Severity::Warning,
        message: "index {} is out of bounds for '{}'",
    },
    CodeInfo {
        code: DiagCode::RangeOOB,
        option: Some("range-oob"),
        default_severity: Severity::Warning,
        message: "part-select of '{}' is out of bounds",
    },
    CodeInfo {
        code: DiagCode::RangeWidthOOB,
        option: Some("range-width-oob"),
        default_severity: Severity::Warning,
        message: "part-select width is wider than '{}'",
    },
    CodeInfo {
        code: DiagCode::BadFinishNum,
        option: Some("finish-num"),
        default_severity: Severity::Warning,
        message: "invalid $finish argument, expected 0, 1, or 2",
    },
    CodeInfo {
        code: DiagCode::NonstandardSysFunc,
        option: Some("nonstandard-system-func"),
        default_severity: Severity::Warning,
        message: "nonstandard system function '{}'",
    },
    CodeInfo {
        code: DiagCode::NonstandardForeach,
        option: Some("nonstandard-foreach"),
        default_severity: Severity::Warning,
        message: "nonstandard foreach loop variable syntax",
    },
    CodeInfo {
        code: DiagCode::NonstandardDist,
        option: Some("nonstandard-dist"),
        default_severity: Severity::Warning,
        message: "nonstandard dist expression",
    },
    CodeInfo {
        code: DiagCode::SplitDistWeightOp,
        option: Some("split-dist-weight-op"),
        default_severity: Severity::Warning,
        message: "dist weight operator is split by whitespace",
    },
    CodeInfo {
        code: DiagCode::ImplicitNamedPortTypeMismatch,
        option: Some("implicit-port-type-mismatch"),
        default_severity: Severity::Warning,
        message: "implicit named port '{}' has a mismatched type",
    },
    CodeInfo {
        code: DiagCode::StaticInitializerMustBeExplicit,
        option: Some("static-init-value"),
        default_severity: Severity::Warning,
        message: "static variable initializer requires an explicit 'static' keyword",
    },
    CodeInfo {
        code: DiagCode::BadProceduralForce,
        option: Some("bad-procedural-force"),
        default_severity: Severity::Warning,
        message: "cannot force a part-select of a variable",
    },
    CodeInfo {
        code: DiagCode::UnknownWarningOption,
        option: Some("unknown-warning-option"),
        default_severity: Severity::Warning,
        message: "unknown warning option '-W{}'",
    },
    CodeInfo {
        code: DiagCode::TooManyErrors,
        option: None,
        default_severity: Severity::Fatal,
        message: "too many errors emitted, stopping now",
    },
];

impl DiagCode {
    fn info(self) -> &'static CodeInfo {
        // The table is closed; every variant has exactly one row.
        CODE_TABLE
            .iter()
            .find(|info| info.code == self)
            .unwrap_or(&CODE_TABLE[0])
    }

    /// Compiled-in severity before any overrides.
    #[must_use]
    pub fn default_severity(self) -> Severity {
        self.info().default_severity
    }

    /// The `-W` option name controlling this code, if it has one.
    #[must_use]
    pub fn option_name(self) -> Option<&'static str> {
        self.info().option
    }

    /// Look a code up by its `-W` option name.
    #[must_use]
    pub fn from_option_name(name: &str) -> Option<Self> {
        static LOOKUP: Lazy<HashMap<&'static str, DiagCode>> = Lazy::new(|| {
            CODE_TABLE
                .iter()
                .filter_map(|info| info.option.map(|option| (option, info.code)))
                .collect()
        });
        LOOKUP.get(name).copied()
    }

    /// All codes whose default severity is `Warning`.
    pub fn all_warnings() -> impl Iterator<Item = DiagCode> {
        CODE_TABLE
            .iter()
            .filter(|info| info.default_severity == Severity::Warning)
            .map(|info| info.code)
    }
}

/// A single diagnostic produced by a front-end service.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub code: DiagCode,
    pub location: Option<SourceLocation>,
    pub args: Vec<String>,
    /// Set when the diagnostic arose inside a macro expansion.
    pub macro_name: Option<String>,
    /// Stack of include points leading to the diagnostic's buffer.
    pub include_stack: Vec<SourceLocation>,
    /// Instance path for elaboration diagnostics.
    pub hierarchy: Option<String>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(code: DiagCode, location: Option<SourceLocation>) -> Self {
        Self {
            code,
            location,
            args: Vec::new(),
            macro_name: None,
            include_stack: Vec::new(),
            hierarchy: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    #[must_use]
    pub fn in_macro(mut self, name: impl Into<String>) -> Self {
        self.macro_name = Some(name.into());
        self
    }

    /// Message text with `{}` placeholders filled from the argument list.
    #[must_use]
    pub fn message(&self) -> String {
        let template = self.code.info().message;
        let mut out = String::with_capacity(template.len());
        let mut args = self.args.iter();
        let mut rest = template;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            if let Some(arg) = args.next() {
                out.push_str(arg);
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.default_severity().as_str(),
            self.message()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_has_a_table_row() {
        // A missing row would alias to the table's first entry; catch that by
        // checking a few codes from each section resolve to themselves.
        for code in [
            DiagCode::UnexpectedChar,
            DiagCode::InvalidPragmaDiagnostic,
            DiagCode::MaxParseDepthExceeded,
            DiagCode::SplitDistWeightOp,
            DiagCode::TooManyErrors,
        ] {
            assert_eq!(code.info().code, code);
        }
        assert_eq!(CODE_TABLE.len(), 35);
    }

    #[test]
    fn option_names_round_trip() {
        for code in DiagCode::all_warnings() {
            let name = code.option_name().expect("warnings carry option names");
            assert_eq!(DiagCode::from_option_name(name), Some(code));
        }
        assert_eq!(DiagCode::from_option_name("no-such-option"), None);
    }

    #[test]
    fn message_substitutes_placeholders_in_order() {
        let diag = Diagnostic::new(DiagCode::IndexOOB, None)
            .arg("5")
            .arg("x");
        assert_eq!(diag.message(), "index 5 is out of bounds for 'x'");
    }

    #[test]
    fn spec_promoted_codes_default_to_warning() {
        for code in [
            DiagCode::DuplicateDefinition,
            DiagCode::BadProceduralForce,
            DiagCode::IndexOOB,
            DiagCode::RangeOOB,
            DiagCode::RangeWidthOOB,
            DiagCode::ImplicitNamedPortTypeMismatch,
            DiagCode::SplitDistWeightOp,
            DiagCode::ImplicitConvert,
        ] {
            assert_eq!(code.default_severity(), Severity::Warning);
        }
    }
}
