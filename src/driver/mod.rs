//! Top-level handler for processing arguments and constructing a compilation.
//!
//! The driver wires the command line, source loading, preprocessing, and
//! diagnostics together; the individual services stay independent of each
//! other and of the CLI.

pub mod obfuscate;
pub mod options;

use std::collections::HashSet;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::{Compilation, TimeScale};
use crate::cli::{CommandLine, OptionKind, ParseOptions, ValueKind};
use crate::diagnostics::{DiagCode, DiagnosticEngine, Severity};
use crate::source::loader::SourceLoader;
use crate::source::SourceManager;
use crate::syntax::parser::SyntaxTree;
use crate::syntax::preprocessor::Preprocessor;
use crate::syntax::{is_possible_vector_digit, SyntaxPrinter, TokenKind};

use self::obfuscate::IdentifierObfuscator;
use self::options::{OptionBag, RawOptions};

/// Orchestrates one invocation of the tool: argument assembly, option
/// validation, source acquisition, and one of the processing modes.
pub struct Driver {
    pub cmd_line: CommandLine,
    pub options: RawOptions,
    pub source_manager: SourceManager,
    pub source_loader: SourceLoader,
    pub diag_engine: DiagnosticEngine,
    syntax_trees: Vec<SyntaxTree>,
    any_failed_loads: bool,
    stderr_colors: bool,
    stdout_colors: bool,
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cmd_line: CommandLine::new(),
            options: RawOptions::default(),
            source_manager: SourceManager::new(),
            source_loader: SourceLoader::new(),
            diag_engine: DiagnosticEngine::new(),
            syntax_trees: Vec::new(),
            any_failed_loads: false,
            stderr_colors: false,
            stdout_colors: false,
        }
    }

    /// Install the full option schema.
    pub fn add_standard_args(&mut self) {
        let cmd = &mut self.cmd_line;

        // Include paths
        cmd.add(
            "-I,--include-directory,+incdir",
            OptionKind::List(ValueKind::Text),
            "Additional include search paths",
            Some("<dir>"),
            true,
        );
        cmd.add(
            "--isystem",
            OptionKind::List(ValueKind::Text),
            "Additional system include search paths",
            Some("<dir>"),
            true,
        );
        cmd.add(
            "-y,--libdir",
            OptionKind::List(ValueKind::Text),
            "Library search paths, which will be searched for missing modules",
            Some("<dir>"),
            true,
        );
        cmd.add(
            "-Y,--libext",
            OptionKind::List(ValueKind::Text),
            "Additional library file extensions to search",
            Some("<ext>"),
            false,
        );
        cmd.add(
            "--exclude-ext",
            OptionKind::List(ValueKind::Text),
            "Exclude provided source files with these extensions",
            Some("<ext>"),
            false,
        );

        // Preprocessor
        cmd.add(
            "-D,--define-macro,+define",
            OptionKind::List(ValueKind::Text),
            "Define <macro> to <value> (or 1 if <value> omitted) in all source files",
            Some("<macro>=<value>"),
            false,
        );
        cmd.add(
            "-U,--undefine-macro",
            OptionKind::List(ValueKind::Text),
            "Undefine macro name at the start of all source files",
            Some("<macro>"),
            false,
        );
        cmd.add(
            "--max-include-depth",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum depth of nested include files allowed",
            Some("<depth>"),
            false,
        );
        cmd.add(
            "--libraries-inherit-macros",
            OptionKind::Flag,
            "If true, library files will inherit macro definitions from the primary source files.\n--single-unit must also be passed when this option is used.",
            None,
            false,
        );

        // Legacy vendor commands support
        cmd.add_ignore_option(
            "--cmd-ignore",
            "Define rule to ignore vendor command <vendor_cmd> with its following <N> parameters.\nA command of the form +xyz will also match any vendor command of the form +xyz+abc,\nas +abc is the command's argument, and doesn't need to be matched.",
            "<vendor_cmd>,<N>",
        );
        cmd.add_rename_option(
            "--cmd-rename",
            "Define rule to rename vendor command <vendor_cmd> into existing <svfront_cmd>",
            "<vendor_cmd>,<svfront_cmd>",
        );
        cmd.add(
            "--ignore-directive",
            OptionKind::List(ValueKind::Text),
            "Ignore preprocessor directive and all its arguments until EOL",
            Some("<directive>"),
            false,
        );

        // Parsing
        cmd.add(
            "--max-parse-depth",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum depth of nested language constructs allowed",
            Some("<depth>"),
            false,
        );
        cmd.add(
            "--max-lexer-errors",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum number of errors that can occur during lexing before the rest of the file is skipped",
            Some("<count>"),
            false,
        );
        cmd.add(
            "-j,--threads",
            OptionKind::Scalar(ValueKind::UInt),
            "The number of threads to use to parallelize parsing",
            Some("<count>"),
            false,
        );

        // Compilation
        cmd.add(
            "--max-hierarchy-depth",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum depth of the design hierarchy",
            Some("<depth>"),
            false,
        );
        cmd.add(
            "--max-generate-steps",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum number of steps that can occur during generate block evaluation before giving up",
            Some("<steps>"),
            false,
        );
        cmd.add(
            "--max-constexpr-depth",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum depth of a constant evaluation call stack",
            Some("<depth>"),
            false,
        );
        cmd.add(
            "--max-constexpr-steps",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum number of steps that can occur during constant evaluation before giving up",
            Some("<steps>"),
            false,
        );
        cmd.add(
            "--constexpr-backtrace-limit",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum number of frames to show when printing a constant evaluation backtrace; the rest will be abbreviated",
            Some("<limit>"),
            false,
        );
        cmd.add(
            "--max-instance-array",
            OptionKind::Scalar(ValueKind::UInt),
            "Maximum number of instances allowed in a single instance array",
            Some("<limit>"),
            false,
        );
        cmd.add(
            "--compat",
            OptionKind::Scalar(ValueKind::Text),
            "Attempt to increase compatibility with the specified tool",
            Some("vcs"),
            false,
        );
        cmd.add(
            "-T,--timing",
            OptionKind::Scalar(ValueKind::Text),
            "Select which value to consider in min:typ:max expressions",
            Some("min|typ|max"),
            false,
        );
        cmd.add(
            "--timescale",
            OptionKind::Scalar(ValueKind::Text),
            "Default time scale to use for design elements that don't specify one explicitly",
            Some("<base>/<precision>"),
            false,
        );
        cmd.add(
            "--allow-use-before-declare",
            OptionKind::Flag,
            "Don't issue an error for use of names before their declarations.",
            None,
            false,
        );
        cmd.add(
            "--ignore-unknown-modules",
            OptionKind::Flag,
            "Don't issue an error for instantiations of unknown modules, interfaces, and programs.",
            None,
            false,
        );
        cmd.add(
            "--relax-enum-conversions",
            OptionKind::Flag,
            "Allow all integral types to convert implicitly to enum types.",
            None,
            false,
        );
        cmd.add(
            "--allow-hierarchical-const",
            OptionKind::Flag,
            "Allow hierarchical references in constant expressions.",
            None,
            false,
        );
        cmd.add(
            "--allow-dup-initial-drivers",
            OptionKind::Flag,
            "Allow signals driven in an always_comb or always_ff block to also be driven by initial blocks.",
            None,
            false,
        );
        cmd.add(
            "--strict-driver-checking",
            OptionKind::Flag,
            "Perform strict driver checking, which currently means disabling procedural 'for' loop unrolling.",
            None,
            false,
        );
        cmd.add(
            "--lint-only",
            OptionKind::Flag,
            "Only perform linting of code, don't try to elaborate a full hierarchy",
            None,
            false,
        );
        cmd.add(
            "--top",
            OptionKind::List(ValueKind::Text),
            "One or more top-level modules to instantiate (instead of figuring it out automatically)",
            Some("<name>"),
            false,
        );
        cmd.add(
            "-G",
            OptionKind::List(ValueKind::Text),
            "One or more parameter overrides to apply when instantiating top-level modules",
            Some("<name>=<value>"),
            false,
        );

        // Diagnostics control
        cmd.add(
            "-W",
            OptionKind::List(ValueKind::Text),
            "Control the specified warning",
            Some("<warning>"),
            false,
        );
        cmd.add(
            "--color-diagnostics",
            OptionKind::Flag,
            "Always print diagnostics in color. If this option is unset, colors will be enabled\nif a color-capable terminal is detected.",
            None,
            false,
        );
        cmd.add(
            "--diag-json",
            OptionKind::Flag,
            "Print diagnostics as JSON objects, one per line.",
            None,
            false,
        );
        cmd.add(
            "--diag-column",
            OptionKind::Flag,
            "Show column numbers in diagnostic output.",
            None,
            false,
        );
        cmd.add(
            "--diag-location",
            OptionKind::Flag,
            "Show location information in diagnostic output.",
            None,
            false,
        );
        cmd.add(
            "--diag-source",
            OptionKind::Flag,
            "Show source line or caret info in diagnostic output.",
            None,
            false,
        );
        cmd.add(
            "--diag-option",
            OptionKind::Flag,
            "Show option names in diagnostic output.",
            None,
            false,
        );
        cmd.add(
            "--diag-include-stack",
            OptionKind::Flag,
            "Show include stacks in diagnostic output.",
            None,
            false,
        );
        cmd.add(
            "--diag-macro-expansion",
            OptionKind::Flag,
            "Show macro expansion backtraces in diagnostic output.",
            None,
            false,
        );
        cmd.add(
            "--diag-hierarchy",
            OptionKind::Flag,
            "Show hierarchy locations in diagnostic output.",
            None,
            false,
        );
        cmd.add(
            "--error-limit",
            OptionKind::Scalar(ValueKind::UInt),
            "Limit on the number of errors that will be printed. Setting this to zero will disable the limit.",
            Some("<limit>"),
            false,
        );
        cmd.add(
            "--suppress-warnings",
            OptionKind::List(ValueKind::Text),
            "One or more paths in which to suppress warnings",
            Some("<filename>"),
            true,
        );
        cmd.add(
            "--suppress-macro-warnings",
            OptionKind::List(ValueKind::Text),
            "One or more paths in which to suppress warnings that originate in macro expansions",
            Some("<filename>"),
            true,
        );

        // File lists
        cmd.add(
            "--single-unit",
            OptionKind::Flag,
            "Treat all input files as a single compilation unit",
            None,
            false,
        );
        cmd.add(
            "-v",
            OptionKind::List(ValueKind::Text),
            "One or more library files, which are separate compilation units where modules are not automatically instantiated.",
            Some("<filename>"),
            true,
        );
        cmd.add_command_file_option(
            "-f",
            "One or more command files containing additional program options.\nPaths in the file are considered relative to the current directory.",
        );
        cmd.add_command_file_option(
            "-F",
            "One or more command files containing additional program options.\nPaths in the file are considered relative to the file itself.",
        );
        cmd.set_positional("files");
    }

    /// Parse the full argument string (program name included). Errors print
    /// to stderr; command-file load failures also fail the parse.
    pub fn parse_command_line(&mut self, arg_list: &str) -> bool {
        let ok = self.cmd_line.parse(arg_list, ParseOptions::default());
        if !ok {
            for error in self.cmd_line.errors() {
                eprintln!("{error}");
            }
        }
        if self.cmd_line.any_failed_files() {
            self.any_failed_loads = true;
        }
        self.options = RawOptions::from_command_line(&self.cmd_line);
        ok && !self.any_failed_loads
    }

    /// Validate options, apply compatibility profiles and severity rules,
    /// and register search paths. Runs after every argument source parsed.
    pub fn process_options(&mut self) -> bool {
        let stderr_tty = std::io::stderr().is_terminal();
        let show_colors = self.options.color_diags.unwrap_or(stderr_tty);
        if show_colors {
            self.stderr_colors = true;
            if std::io::stdout().is_terminal() {
                self.stdout_colors = true;
            }
        }

        if let Some(compat) = self.options.compat.clone() {
            if compat == "vcs" {
                if self.options.allow_hierarchical_const.is_none() {
                    self.options.allow_hierarchical_const = Some(true);
                }
                if self.options.allow_use_before_declare.is_none() {
                    self.options.allow_use_before_declare = Some(true);
                }
                if self.options.relax_enum_conversions.is_none() {
                    self.options.relax_enum_conversions = Some(true);
                }
            } else {
                self.print_error(&format!("invalid value for compat option: '{compat}'"));
                return false;
            }
        }

        if let Some(timing) = &self.options.min_typ_max {
            if !matches!(timing.as_str(), "min" | "typ" | "max") {
                self.print_error(&format!("invalid value for timing option: '{timing}'"));
                return false;
            }
        }

        if self.options.libraries_inherit_macros == Some(true)
            && self.options.single_unit != Some(true)
        {
            self.print_error("--single-unit must be set when --libraries-inherit-macros is used");
            return false;
        }

        if let Some(scale) = &self.options.time_scale {
            if scale.parse::<TimeScale>().is_err() {
                self.print_error(&format!("invalid value for time scale option: '{scale}'"));
                return false;
            }
        }

        if self.options.only_lint == Some(true) && self.options.ignore_unknown_modules.is_none() {
            self.options.ignore_unknown_modules = Some(true);
        }

        let mut missing_dirs = Vec::new();
        for dir in &self.options.include_dirs {
            if !self.source_manager.add_user_directory(Path::new(dir)) {
                missing_dirs.push(dir.clone());
            }
        }
        for dir in &self.options.include_system_dirs {
            if !self.source_manager.add_system_directory(Path::new(dir)) {
                missing_dirs.push(dir.clone());
            }
        }
        for dir in missing_dirs {
            self.print_warning(&format!("include directory '{dir}' does not exist"));
        }

        for file in &self.options.library_files {
            self.source_loader.add_library_files("", file);
        }
        self.source_loader
            .add_search_directories(self.options.lib_dirs.iter().map(PathBuf::from));
        self.source_loader
            .add_search_extensions(self.options.lib_exts.iter().cloned());
        self.source_loader
            .set_exclude_extensions(self.options.exclude_exts.clone());
        for pattern in &self.options.file_patterns {
            self.source_loader.add_files(pattern);
        }

        if self.any_failed_loads {
            return false;
        }
        if !self.source_loader.has_files() {
            self.print_error("no input files");
            return false;
        }

        let client = self.diag_engine.client_mut();
        client.show_colors(show_colors);
        client.set_json(self.options.diag_json.unwrap_or(false));
        client.show_column(self.options.diag_column.unwrap_or(true));
        client.show_location(self.options.diag_location.unwrap_or(true));
        client.show_source_line(self.options.diag_source_line.unwrap_or(true));
        client.show_option_name(self.options.diag_option_name.unwrap_or(true));
        client.show_include_stack(self.options.diag_include_stack.unwrap_or(true));
        client.show_macro_expansion(self.options.diag_macro_expansion.unwrap_or(true));
        client.show_hierarchy(self.options.diag_hierarchy.unwrap_or(true));

        self.diag_engine
            .set_error_limit(self.options.error_limit.unwrap_or(20) as usize);
        self.diag_engine.set_default_warnings();

        // Some tools accept these constructs outright. The default here is a
        // suppressible error so the user can downgrade it back to a warning
        // or turn it off entirely.
        self.diag_engine
            .set_severity(DiagCode::DuplicateDefinition, Severity::Error);
        self.diag_engine
            .set_severity(DiagCode::BadProceduralForce, Severity::Error);

        if self.options.compat.as_deref() == Some("vcs") {
            for code in [
                DiagCode::StaticInitializerMustBeExplicit,
                DiagCode::ImplicitConvert,
                DiagCode::BadFinishNum,
                DiagCode::NonstandardSysFunc,
                DiagCode::NonstandardForeach,
                DiagCode::NonstandardDist,
            ] {
                self.diag_engine.set_severity(code, Severity::Ignored);
            }
        } else {
            // Error severity by default outside vcs compat mode; warning
            // options run afterwards so the user can always downgrade.
            for code in [
                DiagCode::IndexOOB,
                DiagCode::RangeOOB,
                DiagCode::RangeWidthOOB,
                DiagCode::ImplicitNamedPortTypeMismatch,
                DiagCode::SplitDistWeightOp,
            ] {
                self.diag_engine.set_severity(code, Severity::Error);
            }
        }

        for path in &self.options.suppress_warnings_paths {
            if let Ok(canonical) = std::fs::canonicalize(path) {
                self.diag_engine.add_ignore_path(canonical);
            }
        }
        for path in &self.options.suppress_macro_warnings_paths {
            if let Ok(canonical) = std::fs::canonicalize(path) {
                self.diag_engine.add_ignore_macro_path(canonical);
            }
        }

        let option_diags = self
            .diag_engine
            .set_warning_options(&self.options.warning_options);
        for diag in option_diags {
            self.diag_engine.issue(&diag, &self.source_manager);
        }

        debug!(
            files = self.options.file_patterns.len(),
            compat = self.options.compat.as_deref().unwrap_or("none"),
            "options processed"
        );
        true
    }

    /// Compose the immutable option bag for downstream services.
    #[must_use]
    pub fn create_option_bag(&self) -> OptionBag {
        self.options.create_option_bag()
    }

    /// Preprocess-only mode: write the expanded token stream to stdout.
    /// Buffered diagnostics print instead if any error occurred, and nothing
    /// is emitted.
    pub fn run_preprocessor(
        &mut self,
        include_comments: bool,
        include_directives: bool,
        obfuscate_ids: bool,
        use_fixed_obfuscation_seed: bool,
    ) -> bool {
        let bag = self.create_option_bag();
        let mut pp = Preprocessor::new(&self.source_manager, bag.lexer, bag.preprocessor);

        let buffers = self.source_loader.load_sources(&self.source_manager);
        let load_errors = self.source_loader.take_errors();
        for error in &load_errors {
            self.print_error(&error.to_string());
        }
        if !load_errors.is_empty() {
            self.any_failed_loads = true;
            return false;
        }
        for &id in buffers.iter().rev() {
            pp.push_source(id);
        }

        let mut output = SyntaxPrinter::new();
        output
            .set_include_comments(include_comments)
            .set_include_directives(include_directives);

        let mut obfuscator = obfuscate_ids.then(|| {
            if use_fixed_obfuscation_seed {
                IdentifierObfuscator::with_fixed_seed()
            } else {
                IdentifierObfuscator::with_random_seed()
            }
        });

        loop {
            let mut token = pp.next();
            if token.kind == TokenKind::IntegerBase {
                // The digits of a vector literal may lex as an identifier;
                // there is no parser here to fix that up, so pass everything
                // through until a clear non-digit token.
                loop {
                    output.print(&token);
                    token = pp.next();
                    if !is_possible_vector_digit(&token) {
                        break;
                    }
                }
            }

            if let Some(obfuscator) = obfuscator.as_mut() {
                if token.kind == TokenKind::Identifier {
                    token.text = obfuscator.rename(&token.text);
                }
            }

            output.print(&token);
            if token.is_eof() {
                break;
            }
        }

        let diagnostics = pp.take_diagnostics();
        let has_errors = diagnostics
            .iter()
            .any(|diag| self.diag_engine.final_severity(diag).counts_as_error());
        if has_errors {
            for diag in &diagnostics {
                self.diag_engine.issue(diag, &self.source_manager);
            }
            eprint!("{}", self.diag_engine.client_mut().take_output());
            return false;
        }

        println!("{}", output.text());
        true
    }

    /// Run the preprocessor to end-of-file and dump every defined macro.
    pub fn report_macros(&mut self) {
        let bag = self.create_option_bag();
        let mut pp = Preprocessor::new(&self.source_manager, bag.lexer, bag.preprocessor);

        let buffers = self.source_loader.load_sources(&self.source_manager);
        for error in self.source_loader.take_errors() {
            self.print_error(&error.to_string());
            self.any_failed_loads = true;
        }
        for &id in buffers.iter().rev() {
            pp.push_source(id);
        }

        loop {
            if pp.next().is_eof() {
                break;
            }
        }

        for def in pp.defined_macros() {
            let mut printer = SyntaxPrinter::new();
            printer.set_include_comments(false).set_include_trivia(false);
            printer.print(&def.name_token);

            printer.set_include_trivia(true);
            printer.print_all(&def.formal_tokens);

            if def
                .body
                .first()
                .map_or(false, |token| token.trivia.is_empty())
            {
                printer.append(" ");
            }
            printer.print_all(&def.body);

            println!("{}", printer.text());
        }
    }

    /// Load and parse every input, then apply in-source severity pragmas.
    pub fn parse_all_sources(&mut self) -> bool {
        let bag = self.create_option_bag();
        self.syntax_trees = self
            .source_loader
            .load_and_parse_sources(&self.source_manager, &bag);
        for error in self.source_loader.take_errors() {
            self.print_error(&error.to_string());
            self.any_failed_loads = true;
        }
        if self.any_failed_loads {
            return false;
        }

        self.resolve_missing_modules(&bag);

        let pragmas: Vec<_> = self
            .syntax_trees
            .iter()
            .flat_map(|tree| tree.pragmas.iter().cloned())
            .collect();
        let pragma_diags = self.diag_engine.set_mappings_from_pragmas(&pragmas);
        for diag in pragma_diags {
            self.diag_engine.issue(&diag, &self.source_manager);
        }

        debug!(trees = self.syntax_trees.len(), "sources parsed");
        true
    }

    /// Pull definitions for instantiated-but-undefined modules out of the
    /// library search path, repeating until the design closes.
    fn resolve_missing_modules(&mut self, bag: &OptionBag) {
        loop {
            let defined: HashSet<String> = self
                .syntax_trees
                .iter()
                .flat_map(|tree| tree.elements.iter().map(|el| el.name.clone()))
                .collect();
            let mut missing: Vec<String> = Vec::new();
            for tree in &self.syntax_trees {
                for element in &tree.elements {
                    for instance in &element.instances {
                        if !defined.contains(&instance.module_name)
                            && !missing.contains(&instance.module_name)
                        {
                            missing.push(instance.module_name.clone());
                        }
                    }
                }
            }

            let mut found_any = false;
            for name in missing {
                let Some(path) = self.source_loader.find_module_file(&name) else {
                    continue;
                };
                let Ok(id) = self.source_manager.read_file(&path, Some(String::new())) else {
                    continue;
                };
                let mut pp =
                    Preprocessor::new(&self.source_manager, bag.lexer.clone(), bag.preprocessor.clone());
                pp.push_source(id);
                let mut tree = crate::syntax::parser::parse(pp, &bag.parser, vec![id]);
                tree.library = Some(String::new());
                self.syntax_trees.push(tree);
                found_any = true;
                debug!(module = name.as_str(), path = %path.display(), "resolved missing module");
            }
            if !found_any {
                return;
            }
        }
    }

    /// Bind all parsed trees into a compilation.
    #[must_use]
    pub fn create_compilation(&self) -> Compilation {
        let bag = self.create_option_bag();
        let mut compilation = Compilation::new(bag.compilation);
        for tree in &self.syntax_trees {
            compilation.add_syntax_tree(tree.clone());
        }
        compilation
    }

    /// Parse-and-report mode: issue only parse-stage diagnostics.
    pub fn report_parse_diags(&mut self) -> bool {
        let compilation = self.create_compilation();
        for diag in compilation.parse_diagnostics() {
            self.diag_engine.issue(&diag, &self.source_manager);
        }
        eprint!("{}", self.diag_engine.client_mut().take_output());
        self.diag_engine.num_errors() == 0
    }

    /// Report top-level units, drain every compilation diagnostic, and print
    /// the build summary.
    pub fn report_compilation(&mut self, compilation: &mut Compilation, quiet: bool) -> bool {
        if !quiet {
            let tops = compilation.top_instances();
            if !tops.is_empty() {
                self.print_stdout_colored("Top level design units:\n", "1;33");
                for name in &tops {
                    println!("    {name}");
                }
                println!();
            }
        }

        for diag in compilation.all_diagnostics() {
            self.diag_engine.issue(&diag, &self.source_manager);
        }

        let succeeded = self.diag_engine.num_errors() == 0;
        let diag_str = self.diag_engine.client_mut().take_output();
        eprint!("{diag_str}");

        if !quiet {
            if diag_str.len() > 1 {
                println!();
            }
            if succeeded {
                self.print_stdout_colored("Build succeeded: ", "1;32");
            } else {
                self.print_stdout_colored("Build failed: ", "1;31");
            }
            let errors = self.diag_engine.num_errors();
            let warnings = self.diag_engine.num_warnings();
            println!(
                "{} error{}, {} warning{}",
                errors,
                if errors == 1 { "" } else { "s" },
                warnings,
                if warnings == 1 { "" } else { "s" },
            );
        }

        succeeded
    }

    /// True when any argument file or source file failed to load.
    #[must_use]
    pub fn any_failed_loads(&self) -> bool {
        self.any_failed_loads
    }

    pub fn print_error(&self, message: &str) {
        if self.stderr_colors {
            eprintln!("\u{1b}[1;31merror\u{1b}[0m: {message}");
        } else {
            eprintln!("error: {message}");
        }
    }

    pub fn print_warning(&self, message: &str) {
        if self.stderr_colors {
            eprintln!("\u{1b}[1;33mwarning\u{1b}[0m: {message}");
        } else {
            eprintln!("warning: {message}");
        }
    }

    fn print_stdout_colored(&self, text: &str, color: &str) {
        if self.stdout_colors {
            print!("\u{1b}[{color}m{text}\u{1b}[0m");
        } else {
            print!("{text}");
        }
    }
}

#[cfg(test)]
mod tests;
