//! Schema-driven command-line parsing for the driver.
//!
//! Options are registered up front in a declarative table; parsing binds
//! tokens against that table, expands command files in place, and accumulates
//! errors instead of aborting on the first bad argument.

mod tokenize;

pub use tokenize::{expand_env_vars, tokenize, TokenizeOptions};

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Nesting cut for `-f`/`-F` files, mirroring the default include depth.
pub const MAX_COMMAND_FILE_DEPTH: usize = 1024;

/// Error emitted while assembling the command line at the top level.
#[derive(Debug, Clone)]
pub struct CliError {
    message: String,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CliError {}

/// Per-invocation parse behavior.
///
/// The defaults describe a process invocation: the first token is the program
/// name, duplicates are errors, and no comment or variable expansion happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Substitute `$NAME` / `${NAME}` in tokens.
    pub expand_env_vars: bool,
    /// Treat the first token as a regular argument instead of the program name.
    pub ignore_program_name: bool,
    /// Recognize `#` and `/* */` comments.
    pub support_comments: bool,
    /// Silently drop repeated scalar options instead of erroring.
    pub ignore_duplicates: bool,
}

impl ParseOptions {
    /// The option set used when re-entering the parser for a command file.
    #[must_use]
    pub fn command_file() -> Self {
        Self {
            expand_env_vars: true,
            ignore_program_name: true,
            support_comments: true,
            ignore_duplicates: true,
        }
    }
}

/// Kind of value an option's destination accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    UInt,
}

/// Multiplicity and shape of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Boolean flag; an attached `=true`/`=false` is accepted.
    Flag,
    /// Single value; repeats obey the duplicate policy.
    Scalar(ValueKind),
    /// Accumulating value list.
    List(ValueKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Store,
    IgnoreRule,
    RenameRule,
    /// Consumed during command-file expansion; kept in the table for help.
    CommandFile,
}

struct OptionEntry {
    names: Vec<String>,
    kind: OptionKind,
    action: Action,
    is_file_name: bool,
    placeholder: Option<String>,
    help: String,
}

impl OptionEntry {
    fn display_names(&self) -> String {
        self.names.join(",")
    }
}

struct IgnoreRule {
    pattern: String,
    arg_count: usize,
}

/// An argument token carrying its origin for path resolution and duplicate
/// policy decisions.
struct Arg {
    text: String,
    base: Option<Arc<PathBuf>>,
    from_file: bool,
}

/// Declarative option table plus the parser that binds tokens against it.
#[derive(Default)]
pub struct CommandLine {
    entries: Vec<OptionEntry>,
    lookup: HashMap<String, usize>,
    values: Vec<Vec<String>>,
    positionals: Vec<String>,
    positional_placeholder: Option<String>,
    ignore_rules: Vec<IgnoreRule>,
    rename_rules: HashMap<String, String>,
    errors: Vec<String>,
    any_failed_files: bool,
    program_name: String,
}

impl CommandLine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an option. `names` is a comma-separated list of accepted
    /// spellings (long `--name`, short `-n`, vendor `+name`); the first is
    /// canonical.
    pub fn add(
        &mut self,
        names: &str,
        kind: OptionKind,
        help: &str,
        placeholder: Option<&str>,
        is_file_name: bool,
    ) {
        self.add_entry(names, kind, Action::Store, help, placeholder, is_file_name);
    }

    /// Register the `--cmd-ignore` style rule installer.
    pub fn add_ignore_option(&mut self, names: &str, help: &str, placeholder: &str) {
        self.add_entry(
            names,
            OptionKind::List(ValueKind::Text),
            Action::IgnoreRule,
            help,
            Some(placeholder),
            false,
        );
    }

    /// Register the `--cmd-rename` style rule installer.
    pub fn add_rename_option(&mut self, names: &str, help: &str, placeholder: &str) {
        self.add_entry(
            names,
            OptionKind::List(ValueKind::Text),
            Action::RenameRule,
            help,
            Some(placeholder),
            false,
        );
    }

    /// Register a command-file option (`-f` / `-F`). The actual file handling
    /// happens during expansion; the entry exists for lookup and help output.
    pub fn add_command_file_option(&mut self, names: &str, help: &str) {
        self.add_entry(
            names,
            OptionKind::List(ValueKind::Text),
            Action::CommandFile,
            help,
            Some("<filename>"),
            true,
        );
    }

    fn add_entry(
        &mut self,
        names: &str,
        kind: OptionKind,
        action: Action,
        help: &str,
        placeholder: Option<&str>,
        is_file_name: bool,
    ) {
        let index = self.entries.len();
        let names: Vec<String> = names.split(',').map(str::to_owned).collect();
        for name in &names {
            self.lookup.insert(name.clone(), index);
        }
        self.entries.push(OptionEntry {
            names,
            kind,
            action,
            is_file_name,
            placeholder: placeholder.map(str::to_owned),
            help: help.to_owned(),
        });
        self.values.push(Vec::new());
    }

    /// Declare that bare tokens are accepted and how they appear in help.
    pub fn set_positional(&mut self, placeholder: &str) {
        self.positional_placeholder = Some(placeholder.to_owned());
    }

    /// Install a vendor-command ignore rule from a `<vendor_cmd>,<N>` spec.
    pub fn add_ignore_command(&mut self, spec: &str) -> Result<(), String> {
        let Some((pattern, count)) = spec.rsplit_once(',') else {
            return Err(format!(
                "invalid format for ignored command rule: '{spec}', expected '<vendor_cmd>,<N>'"
            ));
        };
        let Ok(arg_count) = count.trim().parse::<usize>() else {
            return Err(format!(
                "expected an integer parameter count in ignored command rule: '{spec}'"
            ));
        };
        self.ignore_rules.push(IgnoreRule {
            pattern: pattern.to_owned(),
            arg_count,
        });
        Ok(())
    }

    /// Install a vendor-command rename rule from a `<vendor_cmd>,<canonical>`
    /// spec. The canonical side must be a registered option.
    pub fn add_rename_command(&mut self, spec: &str) -> Result<(), String> {
        let Some((vendor, canonical)) = spec.split_once(',') else {
            return Err(format!(
                "invalid format for renamed command rule: '{spec}', expected '<vendor_cmd>,<canonical_cmd>'"
            ));
        };
        if !self.lookup.contains_key(canonical) {
            return Err(format!(
                "unknown target option '{canonical}' in renamed command rule"
            ));
        }
        self.rename_rules
            .insert(vendor.to_owned(), canonical.to_owned());
        Ok(())
    }

    /// Parse an argument string. Returns false when any error accumulated;
    /// the individual messages are available through [`CommandLine::errors`].
    pub fn parse(&mut self, arg_list: &str, options: ParseOptions) -> bool {
        let before = self.errors.len();
        let tokens = tokenize(
            arg_list,
            TokenizeOptions {
                expand_env_vars: options.expand_env_vars,
                support_comments: options.support_comments,
            },
        );

        let mut tokens = tokens;
        if !options.ignore_program_name && !tokens.is_empty() {
            self.program_name = tokens.remove(0);
        }

        let mut args = Vec::new();
        self.expand(tokens, None, false, 0, &mut args);
        self.bind_all(&args, options);
        self.errors.len() == before
    }

    /// Messages accumulated by every parse invocation so far.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// True when any command file could not be loaded.
    #[must_use]
    pub fn any_failed_files(&self) -> bool {
        self.any_failed_files
    }

    #[must_use]
    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    #[must_use]
    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    /// Last value bound to a flag option.
    #[must_use]
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.last_value(name).map(|value| value == "true")
    }

    /// Last value bound to a scalar option.
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.last_value(name)
    }

    /// Last value bound to a numeric scalar option.
    #[must_use]
    pub fn uint(&self, name: &str) -> Option<u64> {
        self.last_value(name).and_then(|value| value.parse().ok())
    }

    /// All values accumulated for a list option, in binding order.
    #[must_use]
    pub fn list(&self, name: &str) -> &[String] {
        match self.lookup.get(name) {
            Some(&index) => &self.values[index],
            None => &[],
        }
    }

    fn last_value(&self, name: &str) -> Option<&str> {
        let index = *self.lookup.get(name)?;
        self.values[index].last().map(String::as_str)
    }

    // ---- command-file expansion ----

    fn expand(
        &mut self,
        tokens: Vec<String>,
        base: Option<Arc<PathBuf>>,
        from_file: bool,
        depth: usize,
        out: &mut Vec<Arg>,
    ) {
        let mut iter = tokens.into_iter().peekable();
        while let Some(token) = iter.next() {
            let (name, inline) = match token.split_once('=') {
                Some((name, value)) if name == "-f" || name == "-F" => {
                    (name.to_owned(), Some(value.to_owned()))
                }
                _ => (token.clone(), None),
            };
            if name == "-f" || name == "-F" {
                let file = match inline {
                    Some(value) => Some(value),
                    None => iter.next(),
                };
                let Some(file) = file else {
                    self.errors
                        .push(format!("error: expected value for argument '{name}'"));
                    continue;
                };
                self.process_command_file(&file, name == "-F", base.clone(), depth, out);
                continue;
            }
            out.push(Arg {
                text: token,
                base: base.clone(),
                from_file,
            });
        }
    }

    fn process_command_file(
        &mut self,
        file_name: &str,
        relative_to_file: bool,
        base: Option<Arc<PathBuf>>,
        depth: usize,
        out: &mut Vec<Arg>,
    ) {
        if depth >= MAX_COMMAND_FILE_DEPTH {
            self.errors.push(format!(
                "error: command file nesting is too deep: '{file_name}'"
            ));
            self.any_failed_files = true;
            return;
        }

        let expanded = expand_env_vars(file_name);
        let joined = join_base(base.as_deref(), &expanded);
        let canonical = match fs::canonicalize(&joined) {
            Ok(path) => path,
            Err(_) => {
                self.errors.push(format!(
                    "error: unable to find or open file: '{file_name}'"
                ));
                self.any_failed_files = true;
                return;
            }
        };
        let text = match fs::read_to_string(&canonical) {
            Ok(text) => text,
            Err(_) => {
                self.errors.push(format!(
                    "error: unable to find or open file: '{file_name}'"
                ));
                self.any_failed_files = true;
                return;
            }
        };

        let file_base = if relative_to_file {
            canonical.parent().map(|dir| Arc::new(dir.to_path_buf()))
        } else {
            base
        };

        let file_opts = ParseOptions::command_file();
        let tokens = tokenize(
            &text,
            TokenizeOptions {
                expand_env_vars: file_opts.expand_env_vars,
                support_comments: file_opts.support_comments,
            },
        );
        self.expand(tokens, file_base, true, depth + 1, out);
    }

    // ---- binding ----

    fn bind_all(&mut self, args: &[Arg], options: ParseOptions) {
        let mut index = 0;
        while index < args.len() {
            let arg = &args[index];
            index += 1;
            let text = arg.text.as_str();
            if text.is_empty() {
                continue;
            }

            if let Some(skip) = self.match_ignore_rule(text) {
                index += skip;
                continue;
            }

            if !text.starts_with('-') && !text.starts_with('+') {
                let value = self.process_value_text(text, arg, true);
                self.positionals.push(value);
                continue;
            }

            let ignore_dup = options.ignore_duplicates || arg.from_file;
            if let Some(rest) = text.strip_prefix('+') {
                self.bind_plus(rest, text, ignore_dup, arg);
                continue;
            }

            let (mut name, inline) = match text.split_once('=') {
                Some((name, value)) => (name.to_owned(), Some(value.to_owned())),
                None => (text.to_owned(), None),
            };
            if let Some(renamed) = self.rename_rules.get(&name) {
                name = renamed.clone();
            }
            let Some(&entry) = self.lookup.get(&name) else {
                self.errors
                    .push(format!("error: unknown command line argument '{text}'"));
                continue;
            };
            self.bind_entry(entry, &name, inline, args, &mut index, ignore_dup);
        }
    }

    fn bind_plus(&mut self, rest: &str, full: &str, ignore_dup: bool, arg: &Arg) {
        let mut segments = rest.split('+');
        let Some(first) = segments.next() else {
            self.errors
                .push(format!("error: unknown command line argument '{full}'"));
            return;
        };
        let mut name = format!("+{first}");
        if let Some(renamed) = self.rename_rules.get(&name) {
            name = renamed.clone();
        }
        let Some(&entry) = self.lookup.get(&name) else {
            self.errors
                .push(format!("error: unknown command line argument '{full}'"));
            return;
        };

        let values: Vec<&str> = segments.collect();
        if values.is_empty() {
            match self.entries[entry].kind {
                OptionKind::Flag => self.store(entry, &name, "true".into(), ignore_dup),
                _ => self
                    .errors
                    .push(format!("error: expected value for argument '{name}'")),
            }
            return;
        }
        for value in values {
            let value = self.process_entry_value(entry, value, arg);
            self.store_checked(entry, &name, value, ignore_dup);
        }
    }

    fn bind_entry(
        &mut self,
        entry: usize,
        name: &str,
        inline: Option<String>,
        args: &[Arg],
        index: &mut usize,
        ignore_dup: bool,
    ) {
        match self.entries[entry].kind {
            OptionKind::Flag => {
                let value = match inline {
                    Some(raw) => match raw.as_str() {
                        "true" | "false" => raw,
                        _ => {
                            self.errors.push(format!(
                                "error: invalid value '{raw}' for argument '{name}', expected 'true' or 'false'"
                            ));
                            return;
                        }
                    },
                    None => "true".into(),
                };
                self.store(entry, name, value, ignore_dup);
            }
            OptionKind::Scalar(_) | OptionKind::List(_) => {
                let raw = match inline {
                    Some(raw) => raw,
                    None => {
                        if *index >= args.len() {
                            self.errors
                                .push(format!("error: expected value for argument '{name}'"));
                            return;
                        }
                        let value = args[*index].text.clone();
                        *index += 1;
                        value
                    }
                };
                let source = if *index > 0 && *index <= args.len() {
                    &args[*index - 1]
                } else {
                    return;
                };
                let value = self.process_entry_value(entry, &raw, source);
                self.store_checked(entry, name, value, ignore_dup);
            }
        }
    }

    /// Expand and base-join a value bound to a file-name destination.
    fn process_entry_value(&self, entry: usize, value: &str, arg: &Arg) -> String {
        if self.entries[entry].is_file_name {
            self.process_value_text(value, arg, true)
        } else {
            value.to_owned()
        }
    }

    fn process_value_text(&self, value: &str, arg: &Arg, is_file_name: bool) -> String {
        if !is_file_name {
            return value.to_owned();
        }
        let expanded = expand_env_vars(value);
        join_base(arg.base.as_deref(), &expanded)
    }

    fn store_checked(&mut self, entry: usize, name: &str, value: String, ignore_dup: bool) {
        match self.entries[entry].action {
            Action::IgnoreRule => {
                if let Err(message) = self.add_ignore_command(&value) {
                    self.errors.push(format!("error: {message}"));
                }
            }
            Action::RenameRule => {
                if let Err(message) = self.add_rename_command(&value) {
                    self.errors.push(format!("error: {message}"));
                }
            }
            Action::CommandFile => {
                // Normally consumed during expansion; reaching here means the
                // spelling was not recognized there, so treat it as stored.
                self.values[entry].push(value);
            }
            Action::Store => {
                if let OptionKind::Scalar(kind) = self.entries[entry].kind {
                    if !self.validate_value(kind, name, &value) {
                        return;
                    }
                    if !self.values[entry].is_empty() {
                        if !ignore_dup {
                            self.errors.push(format!(
                                "error: more than one value provided for argument '{name}'"
                            ));
                        }
                        return;
                    }
                } else if let OptionKind::List(kind) = self.entries[entry].kind {
                    if !self.validate_value(kind, name, &value) {
                        return;
                    }
                }
                self.values[entry].push(value);
            }
        }
    }

    fn store(&mut self, entry: usize, name: &str, value: String, ignore_dup: bool) {
        if !self.values[entry].is_empty() {
            if !ignore_dup {
                self.errors.push(format!(
                    "error: more than one value provided for argument '{name}'"
                ));
            }
            return;
        }
        self.values[entry].push(value);
    }

    fn validate_value(&mut self, kind: ValueKind, name: &str, value: &str) -> bool {
        match kind {
            ValueKind::Text => true,
            ValueKind::UInt => {
                if value.parse::<u64>().is_ok() {
                    true
                } else {
                    self.errors.push(format!(
                        "error: invalid value '{value}' for argument '{name}', expected an integer"
                    ));
                    false
                }
            }
        }
    }

    fn match_ignore_rule(&self, text: &str) -> Option<usize> {
        for rule in &self.ignore_rules {
            if text == rule.pattern {
                return Some(rule.arg_count);
            }
            // A +xyz rule also matches +xyz+abc; the +abc part is the
            // command's argument, so nothing further is consumed.
            if rule.pattern.starts_with('+') {
                let with_sep = format!("{}+", rule.pattern);
                if text.starts_with(&with_sep) {
                    return Some(0);
                }
            }
        }
        None
    }

    // ---- help ----

    /// Render usage and the option table.
    #[must_use]
    pub fn help_text(&self, overview: &str) -> String {
        let mut out = String::new();
        let program = if self.program_name.is_empty() {
            "svfront"
        } else {
            &self.program_name
        };
        out.push_str(overview);
        out.push_str("\n\nUSAGE: ");
        out.push_str(program);
        out.push_str(" [options]");
        if let Some(placeholder) = &self.positional_placeholder {
            out.push(' ');
            out.push_str(placeholder);
        }
        out.push_str("\n\nOPTIONS:\n");

        for entry in &self.entries {
            let mut left = format!("  {}", entry.display_names());
            if let Some(placeholder) = &entry.placeholder {
                left.push(' ');
                left.push_str(placeholder);
            }
            if left.len() < 40 {
                left.push_str(&" ".repeat(40 - left.len()));
            } else {
                left.push('\n');
                left.push_str(&" ".repeat(40));
            }
            out.push_str(&left);
            out.push_str(&entry.help.replace('\n', &format!("\n{}", " ".repeat(40))));
            out.push('\n');
        }
        out
    }
}

fn join_base(base: Option<&PathBuf>, value: &str) -> String {
    match base {
        Some(base) if Path::new(value).is_relative() && !value.is_empty() => {
            base.join(value).to_string_lossy().into_owned()
        }
        _ => value.to_owned(),
    }
}

#[cfg(test)]
mod tests;
