//! Raw option storage and the immutable option bag handed to downstream
//! services.

use std::collections::HashSet;

use crate::ast::{CompilationOptions, MinTypMax, TimeScale};
use crate::cli::CommandLine;
use crate::syntax::lexer::LexerOptions;
use crate::syntax::parser::ParserOptions;
use crate::syntax::preprocessor::PreprocessorOptions;

/// Options governing source loading and unit layout.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    pub num_threads: Option<usize>,
    pub single_unit: bool,
    pub only_lint: bool,
    pub libraries_inherit_macros: bool,
}

/// The composite, read-only configuration consumed by the preprocessor,
/// parser, and compilation. Built once by [`RawOptions::create_option_bag`].
#[derive(Debug, Clone, Default)]
pub struct OptionBag {
    pub source: SourceOptions,
    pub preprocessor: PreprocessorOptions,
    pub lexer: LexerOptions,
    pub parser: ParserOptions,
    pub compilation: CompilationOptions,
}

/// Option values as bound from the command line, before validation. The
/// driver's validation pass may fill in profile-dependent defaults; after
/// that the values are only read.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    pub include_dirs: Vec<String>,
    pub include_system_dirs: Vec<String>,
    pub lib_dirs: Vec<String>,
    pub lib_exts: Vec<String>,
    pub exclude_exts: HashSet<String>,

    pub defines: Vec<String>,
    pub undefines: Vec<String>,
    pub max_include_depth: Option<u64>,
    pub libraries_inherit_macros: Option<bool>,
    pub ignore_directives: Vec<String>,

    pub max_parse_depth: Option<u64>,
    pub max_lexer_errors: Option<u64>,
    pub num_threads: Option<u64>,

    pub max_instance_depth: Option<u64>,
    pub max_generate_steps: Option<u64>,
    pub max_constexpr_depth: Option<u64>,
    pub max_constexpr_steps: Option<u64>,
    pub max_constexpr_backtrace: Option<u64>,
    pub max_instance_array: Option<u64>,

    pub compat: Option<String>,
    pub min_typ_max: Option<String>,
    pub time_scale: Option<String>,
    pub allow_use_before_declare: Option<bool>,
    pub ignore_unknown_modules: Option<bool>,
    pub relax_enum_conversions: Option<bool>,
    pub allow_hierarchical_const: Option<bool>,
    pub allow_dup_initial_drivers: Option<bool>,
    pub strict_driver_checking: Option<bool>,
    pub only_lint: Option<bool>,
    pub top_modules: Vec<String>,
    pub param_overrides: Vec<String>,

    pub warning_options: Vec<String>,
    pub color_diags: Option<bool>,
    pub diag_json: Option<bool>,
    pub diag_column: Option<bool>,
    pub diag_location: Option<bool>,
    pub diag_source_line: Option<bool>,
    pub diag_option_name: Option<bool>,
    pub diag_include_stack: Option<bool>,
    pub diag_macro_expansion: Option<bool>,
    pub diag_hierarchy: Option<bool>,
    pub error_limit: Option<u64>,
    pub suppress_warnings_paths: Vec<String>,
    pub suppress_macro_warnings_paths: Vec<String>,

    pub single_unit: Option<bool>,
    pub library_files: Vec<String>,
    pub file_patterns: Vec<String>,
}

impl RawOptions {
    /// Read every bound value out of a parsed command line.
    #[must_use]
    pub fn from_command_line(cmd: &CommandLine) -> Self {
        Self {
            include_dirs: cmd.list("-I").to_vec(),
            include_system_dirs: cmd.list("--isystem").to_vec(),
            lib_dirs: cmd.list("-y").to_vec(),
            lib_exts: cmd.list("-Y").to_vec(),
            exclude_exts: cmd.list("--exclude-ext").iter().cloned().collect(),

            defines: cmd.list("-D").to_vec(),
            undefines: cmd.list("-U").to_vec(),
            max_include_depth: cmd.uint("--max-include-depth"),
            libraries_inherit_macros: cmd.flag("--libraries-inherit-macros"),
            ignore_directives: cmd.list("--ignore-directive").to_vec(),

            max_parse_depth: cmd.uint("--max-parse-depth"),
            max_lexer_errors: cmd.uint("--max-lexer-errors"),
            num_threads: cmd.uint("-j"),

            max_instance_depth: cmd.uint("--max-hierarchy-depth"),
            max_generate_steps: cmd.uint("--max-generate-steps"),
            max_constexpr_depth: cmd.uint("--max-constexpr-depth"),
            max_constexpr_steps: cmd.uint("--max-constexpr-steps"),
            max_constexpr_backtrace: cmd.uint("--constexpr-backtrace-limit"),
            max_instance_array: cmd.uint("--max-instance-array"),

            compat: cmd.scalar("--compat").map(str::to_owned),
            min_typ_max: cmd.scalar("-T").map(str::to_owned),
            time_scale: cmd.scalar("--timescale").map(str::to_owned),
            allow_use_before_declare: cmd.flag("--allow-use-before-declare"),
            ignore_unknown_modules: cmd.flag("--ignore-unknown-modules"),
            relax_enum_conversions: cmd.flag("--relax-enum-conversions"),
            allow_hierarchical_const: cmd.flag("--allow-hierarchical-const"),
            allow_dup_initial_drivers: cmd.flag("--allow-dup-initial-drivers"),
            strict_driver_checking: cmd.flag("--strict-driver-checking"),
            only_lint: cmd.flag("--lint-only"),
            top_modules: cmd.list("--top").to_vec(),
            param_overrides: cmd.list("-G").to_vec(),

            warning_options: cmd.list("-W").to_vec(),
            color_diags: cmd.flag("--color-diagnostics"),
            diag_json: cmd.flag("--diag-json"),
            diag_column: cmd.flag("--diag-column"),
            diag_location: cmd.flag("--diag-location"),
            diag_source_line: cmd.flag("--diag-source"),
            diag_option_name: cmd.flag("--diag-option"),
            diag_include_stack: cmd.flag("--diag-include-stack"),
            diag_macro_expansion: cmd.flag("--diag-macro-expansion"),
            diag_hierarchy: cmd.flag("--diag-hierarchy"),
            error_limit: cmd.uint("--error-limit"),
            suppress_warnings_paths: cmd.list("--suppress-warnings").to_vec(),
            suppress_macro_warnings_paths: cmd.list("--suppress-macro-warnings").to_vec(),

            single_unit: cmd.flag("--single-unit"),
            library_files: cmd.list("-v").to_vec(),
            file_patterns: cmd.positionals().to_vec(),
        }
    }

    /// Compose the immutable option bag. Pure: reads only the stored values,
    /// touching neither the filesystem nor any other state.
    #[must_use]
    pub fn create_option_bag(&self) -> OptionBag {
        let source = SourceOptions {
            num_threads: self.num_threads.map(|value| value as usize),
            single_unit: self.single_unit == Some(true),
            only_lint: self.only_lint == Some(true),
            libraries_inherit_macros: self.libraries_inherit_macros == Some(true),
        };

        let mut preprocessor = PreprocessorOptions {
            predefines: self.defines.clone(),
            undefines: self.undefines.clone(),
            ..Default::default()
        };
        if let Some(depth) = self.max_include_depth {
            preprocessor.max_include_depth = depth as usize;
        }
        for directive in &self.ignore_directives {
            preprocessor.ignore_directives.insert(directive.clone());
        }

        let mut lexer = LexerOptions::default();
        if let Some(max) = self.max_lexer_errors {
            lexer.max_errors = max as usize;
        }

        let mut parser = ParserOptions::default();
        if let Some(depth) = self.max_parse_depth {
            parser.max_recursion_depth = depth as usize;
        }

        let mut compilation = CompilationOptions {
            suppress_unused: false,
            script_mode: false,
            ..Default::default()
        };
        if let Some(depth) = self.max_instance_depth {
            compilation.max_instance_depth = depth as usize;
        }
        if let Some(steps) = self.max_generate_steps {
            compilation.max_generate_steps = steps as usize;
        }
        if let Some(depth) = self.max_constexpr_depth {
            compilation.max_constexpr_depth = depth as usize;
        }
        if let Some(steps) = self.max_constexpr_steps {
            compilation.max_constexpr_steps = steps as usize;
        }
        if let Some(frames) = self.max_constexpr_backtrace {
            compilation.max_constexpr_backtrace = frames as usize;
        }
        if let Some(size) = self.max_instance_array {
            compilation.max_instance_array = size as usize;
        }
        // A fatal error can surface from both the parse and elaboration
        // sides, so the compilation gets twice the user-facing limit.
        if let Some(limit) = self.error_limit {
            compilation.error_limit = (limit as usize) * 2;
        }
        if self.only_lint == Some(true) {
            compilation.suppress_unused = true;
            compilation.lint_mode = true;
        }
        if self.allow_hierarchical_const == Some(true) {
            compilation.allow_hierarchical_const = true;
        }
        if self.allow_dup_initial_drivers == Some(true) {
            compilation.allow_dup_initial_drivers = true;
        }
        if self.relax_enum_conversions == Some(true) {
            compilation.relax_enum_conversions = true;
        }
        if self.strict_driver_checking == Some(true) {
            compilation.strict_driver_checking = true;
        }
        if self.ignore_unknown_modules == Some(true) {
            compilation.ignore_unknown_modules = true;
        }
        if self.allow_use_before_declare == Some(true) {
            compilation.allow_use_before_declare = true;
        }
        compilation.top_modules = self.top_modules.clone();
        compilation.param_overrides = self.param_overrides.clone();

        compilation.min_typ_max = match self.min_typ_max.as_deref() {
            Some("min") => MinTypMax::Min,
            Some("max") => MinTypMax::Max,
            _ => MinTypMax::Typ,
        };
        compilation.default_time_scale = self
            .time_scale
            .as_deref()
            .and_then(|spec| spec.parse::<TimeScale>().ok());

        OptionBag {
            source,
            preprocessor,
            lexer,
            parser,
            compilation,
        }
    }
}
