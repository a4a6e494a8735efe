//! Directive engine: includes, macros, conditionals, and pragma collection
//! over a stack of pushed source buffers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use crate::diagnostics::engine::SeverityPragma;
use crate::diagnostics::{DiagCode, Diagnostic};
use crate::source::{BufferId, SourceLocation, SourceManager};

use super::lexer::{lex_buffer, LexerOptions};
use super::{SyntaxPrinter, Token, TokenKind, Trivia, TriviaKind};

/// Hard stop for runaway macro expansion.
const MAX_EXPANSION_STEPS: usize = 1024;

/// Configuration consumed by the preprocessor.
#[derive(Debug, Clone)]
pub struct PreprocessorOptions {
    /// `NAME=VALUE` macros applied before any source text (value defaults
    /// to `1`).
    pub predefines: Vec<String>,
    /// Macro names removed after the predefines are applied.
    pub undefines: Vec<String>,
    /// Label used as the origin of predefined macros.
    pub predefine_source: String,
    pub max_include_depth: usize,
    /// Directive names skipped wholesale, arguments included.
    pub ignore_directives: HashSet<String>,
}

impl Default for PreprocessorOptions {
    fn default() -> Self {
        Self {
            predefines: Vec::new(),
            undefines: Vec::new(),
            predefine_source: "<command-line>".into(),
            max_include_depth: 1024,
            ignore_directives: HashSet::new(),
        }
    }
}

/// One macro formal argument with its optional default tokens.
#[derive(Debug, Clone)]
pub struct MacroFormal {
    pub name: String,
    pub default: Vec<Token>,
}

/// A defined macro, retaining enough tokens to print its signature.
#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    pub name_token: Token,
    /// Formal list tokens including parentheses and commas; empty for
    /// object-like macros.
    pub formal_tokens: Vec<Token>,
    pub formals: Option<Vec<MacroFormal>>,
    pub body: Vec<Token>,
    /// Origin label for macros that did not come from source text.
    pub source_label: Option<String>,
}

struct Frame {
    tokens: Vec<Token>,
    pos: usize,
    include_depth: usize,
    include_chain: Vec<SourceLocation>,
    path: PathBuf,
}

struct Conditional {
    parent_active: bool,
    any_taken: bool,
    active: bool,
    has_else: bool,
}

/// Pull-based preprocessor producing a single token stream that ends in an
/// end-of-file sentinel.
pub struct Preprocessor<'a> {
    sm: &'a SourceManager,
    lexer_options: LexerOptions,
    options: PreprocessorOptions,
    frames: Vec<Frame>,
    pending: VecDeque<Token>,
    macros: HashMap<String, MacroDef>,
    macro_order: Vec<String>,
    conditionals: Vec<Conditional>,
    diagnostics: Vec<Diagnostic>,
    pragmas: Vec<SeverityPragma>,
    expansion_steps: usize,
    directive_trivia: Vec<Trivia>,
    last_location: SourceLocation,
}

impl<'a> Preprocessor<'a> {
    pub fn new(
        sm: &'a SourceManager,
        lexer_options: LexerOptions,
        options: PreprocessorOptions,
    ) -> Self {
        let mut pp = Self {
            sm,
            lexer_options,
            options,
            frames: Vec::new(),
            pending: VecDeque::new(),
            macros: HashMap::new(),
            macro_order: Vec::new(),
            conditionals: Vec::new(),
            diagnostics: Vec::new(),
            pragmas: Vec::new(),
            expansion_steps: 0,
            directive_trivia: Vec::new(),
            last_location: SourceLocation::new(BufferId::UNKNOWN, 0),
        };
        pp.apply_predefines();
        pp
    }

    /// Seed the macro table, for library units that inherit macros from the
    /// primary unit.
    pub fn inherit_macros(&mut self, macros: HashMap<String, MacroDef>, order: Vec<String>) {
        self.macros = macros;
        self.macro_order = order;
    }

    /// Snapshot the macro table for [`Preprocessor::inherit_macros`].
    #[must_use]
    pub fn macro_snapshot(&self) -> (HashMap<String, MacroDef>, Vec<String>) {
        (self.macros.clone(), self.macro_order.clone())
    }

    /// Push a source buffer. The last pushed buffer is drained first, so
    /// callers push in reverse of the order they want tokens emitted in.
    pub fn push_source(&mut self, id: BufferId) {
        let Some(buffer) = self.sm.get(id) else {
            return;
        };
        let (tokens, diags) = lex_buffer(&buffer, &self.lexer_options);
        self.diagnostics.extend(diags);
        self.frames.push(Frame {
            tokens,
            pos: 0,
            include_depth: 0,
            include_chain: Vec::new(),
            path: buffer.path.clone(),
        });
    }

    /// Macros currently defined, in definition order.
    #[must_use]
    pub fn defined_macros(&self) -> Vec<&MacroDef> {
        self.macro_order
            .iter()
            .filter_map(|name| self.macros.get(name))
            .collect()
    }

    /// Severity pragmas collected so far.
    #[must_use]
    pub fn pragmas(&self) -> &[SeverityPragma] {
        &self.pragmas
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Produce the next token, or the end-of-file sentinel once every pushed
    /// source is exhausted.
    pub fn next(&mut self) -> Token {
        loop {
            if let Some(token) = self.pending.pop_front() {
                if token.kind == TokenKind::Directive {
                    self.handle_directive(token);
                    continue;
                }
                return self.emit(token);
            }

            let Some(frame) = self.frames.last_mut() else {
                return Token::new(TokenKind::EndOfFile, "", self.last_location);
            };
            if frame.pos >= frame.tokens.len() {
                self.frames.pop();
                continue;
            }
            let token = frame.tokens[frame.pos].clone();
            frame.pos += 1;
            self.last_location = token.location;

            if token.is_eof() {
                self.frames.pop();
                if self.frames.is_empty() {
                    return self.emit(token);
                }
                continue;
            }

            if !self.region_active() {
                if token.kind == TokenKind::Directive
                    && is_conditional_directive(token.directive_name().unwrap_or(""))
                {
                    self.handle_directive(token);
                }
                continue;
            }

            if token.kind == TokenKind::Directive {
                self.handle_directive(token);
                continue;
            }
            return self.emit(token);
        }
    }

    fn emit(&mut self, mut token: Token) -> Token {
        self.expansion_steps = 0;
        if !self.directive_trivia.is_empty() {
            let mut trivia = std::mem::take(&mut self.directive_trivia);
            trivia.append(&mut token.trivia);
            token.trivia = trivia;
        }
        token
    }

    fn region_active(&self) -> bool {
        self.conditionals.iter().all(|cond| cond.active)
    }

    // ---- raw stream helpers ----

    fn peek_raw(&self) -> Option<&Token> {
        if let Some(token) = self.pending.front() {
            return Some(token);
        }
        let frame = self.frames.last()?;
        frame.tokens.get(frame.pos)
    }

    fn bump_raw(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.pop_front() {
            return Some(token);
        }
        let frame = self.frames.last_mut()?;
        let token = frame.tokens.get(frame.pos)?.clone();
        frame.pos += 1;
        Some(token)
    }

    /// Consume the next token only if it stays on the current line.
    fn next_on_line(&mut self) -> Option<Token> {
        let peek = self.peek_raw()?;
        if peek.is_eof() || peek.starts_line() {
            return None;
        }
        self.bump_raw()
    }

    fn rest_of_line(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_on_line() {
            tokens.push(token);
        }
        tokens
    }

    fn record_directive_trivia(&mut self, directive: &Token, consumed: &[Token]) {
        let mut printer = SyntaxPrinter::new();
        printer.set_include_directives(true);
        printer.print(directive).print_all(consumed);
        self.directive_trivia
            .push(Trivia::new(TriviaKind::Directive, printer.text()));
    }

    // ---- directive handling ----

    fn handle_directive(&mut self, token: Token) {
        let name = token.directive_name().unwrap_or("").to_owned();

        if is_conditional_directive(&name) {
            self.handle_conditional(&token, &name);
            return;
        }

        if self.options.ignore_directives.contains(&name) {
            let rest = self.rest_of_line();
            self.record_directive_trivia(&token, &rest);
            return;
        }

        match name.as_str() {
            "define" => self.handle_define(&token, None),
            "undef" => {
                let rest = self.rest_of_line();
                if let Some(name_token) = rest.first() {
                    self.macros.remove(&name_token.text);
                } else {
                    self.report(DiagCode::ExpectedMacroName, token.location);
                }
                self.record_directive_trivia(&token, &rest);
            }
            "include" => self.handle_include(&token),
            "pragma" => self.handle_pragma(&token),
            "resetall" => {
                self.macros.clear();
                self.macro_order.clear();
                self.apply_predefines();
                self.record_directive_trivia(&token, &[]);
            }
            "timescale" | "default_nettype" | "line" | "celldefine" | "endcelldefine" => {
                let rest = self.rest_of_line();
                self.record_directive_trivia(&token, &rest);
            }
            _ => {
                if self.macros.contains_key(&name) {
                    self.expand_macro(&token, &name);
                } else {
                    self.diagnostics.push(
                        Diagnostic::new(DiagCode::UnknownDirective, Some(token.location))
                            .arg(token.text.clone()),
                    );
                }
            }
        }
    }

    fn handle_define(&mut self, directive: &Token, source_label: Option<String>) {
        let mut consumed = Vec::new();
        let Some(name_token) = self.next_on_line() else {
            self.report(DiagCode::ExpectedMacroName, directive.location);
            return;
        };
        if !matches!(
            name_token.kind,
            TokenKind::Identifier | TokenKind::Keyword(_)
        ) {
            self.report(DiagCode::ExpectedMacroName, name_token.location);
            let rest = self.rest_of_line();
            self.record_directive_trivia(directive, &rest);
            return;
        }
        consumed.push(name_token.clone());

        // A formal list only exists when '(' hugs the macro name.
        let mut formal_tokens = Vec::new();
        let mut formals = None;
        let has_formals = matches!(
            self.peek_raw(),
            Some(peek)
                if peek.kind == TokenKind::OpenParen
                    && peek.trivia.is_empty()
                    && !peek.starts_line()
        );
        if has_formals {
            let (tokens, parsed) = self.parse_formal_list();
            formal_tokens = tokens;
            formals = Some(parsed);
            consumed.extend(formal_tokens.iter().cloned());
        }

        let mut body = Vec::new();
        while let Some(token) = self.next_on_line() {
            body.push(token);
        }
        consumed.extend(body.iter().cloned());
        self.record_directive_trivia(directive, &consumed);

        let name = name_token.text.clone();
        if !self.macros.contains_key(&name) {
            self.macro_order.push(name.clone());
        }
        self.macros.insert(
            name.clone(),
            MacroDef {
                name,
                name_token,
                formal_tokens,
                formals,
                body,
                source_label,
            },
        );
    }

    fn parse_formal_list(&mut self) -> (Vec<Token>, Vec<MacroFormal>) {
        let mut tokens = Vec::new();
        let mut formals = Vec::new();

        let Some(open) = self.next_on_line() else {
            return (tokens, formals);
        };
        tokens.push(open);

        let mut current_name: Option<String> = None;
        let mut current_default = Vec::new();
        let mut in_default = false;
        let mut depth = 0usize;

        while let Some(token) = self.next_on_line() {
            match token.kind {
                TokenKind::CloseParen if depth == 0 => {
                    tokens.push(token);
                    if let Some(name) = current_name.take() {
                        formals.push(MacroFormal {
                            name,
                            default: std::mem::take(&mut current_default),
                        });
                    }
                    return (tokens, formals);
                }
                TokenKind::Comma if depth == 0 => {
                    tokens.push(token);
                    if let Some(name) = current_name.take() {
                        formals.push(MacroFormal {
                            name,
                            default: std::mem::take(&mut current_default),
                        });
                    }
                    in_default = false;
                }
                TokenKind::Equals if depth == 0 && !in_default => {
                    tokens.push(token);
                    in_default = true;
                }
                _ => {
                    if matches!(
                        token.kind,
                        TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace
                    ) {
                        depth += 1;
                    } else if matches!(
                        token.kind,
                        TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace
                    ) {
                        depth = depth.saturating_sub(1);
                    }
                    if in_default {
                        current_default.push(token.clone());
                    } else if token.kind == TokenKind::Identifier && current_name.is_none() {
                        current_name = Some(token.text.clone());
                    }
                    tokens.push(token);
                }
            }
        }
        (tokens, formals)
    }

    fn handle_include(&mut self, directive: &Token) {
        let rest = self.rest_of_line();
        self.record_directive_trivia(directive, &rest);

        let (name, is_system) = match rest.first() {
            Some(token) if token.kind == TokenKind::StringLiteral => {
                (token.text.trim_matches('"').to_owned(), false)
            }
            Some(token) if token.kind == TokenKind::Operator && token.text == "<" => {
                let mut name = String::new();
                for part in rest.iter().skip(1) {
                    if part.kind == TokenKind::Operator && part.text == ">" {
                        break;
                    }
                    name.push_str(&part.text);
                }
                (name, true)
            }
            _ => {
                self.diagnostics.push(
                    Diagnostic::new(DiagCode::CouldNotOpenIncludeFile, Some(directive.location))
                        .arg(""),
                );
                return;
            }
        };

        let (depth, chain, includer) = match self.frames.last() {
            Some(frame) => (
                frame.include_depth + 1,
                frame.include_chain.clone(),
                frame.path.clone(),
            ),
            None => (1, Vec::new(), PathBuf::new()),
        };

        if depth > self.options.max_include_depth {
            self.report(DiagCode::ExceededMaxIncludeDepth, directive.location);
            return;
        }

        let resolved = self.sm.resolve_include(&name, Some(&includer), is_system);
        let Some(path) = resolved else {
            self.diagnostics.push(
                Diagnostic::new(DiagCode::CouldNotOpenIncludeFile, Some(directive.location))
                    .arg(name),
            );
            return;
        };

        let id = match self.sm.read_file(&path, None) {
            Ok(id) => id,
            Err(_) => {
                self.diagnostics.push(
                    Diagnostic::new(DiagCode::CouldNotOpenIncludeFile, Some(directive.location))
                        .arg(name),
                );
                return;
            }
        };

        let Some(buffer) = self.sm.get(id) else {
            return;
        };
        let (tokens, mut diags) = lex_buffer(&buffer, &self.lexer_options);
        let mut include_chain = chain;
        include_chain.push(directive.location);
        for diag in &mut diags {
            diag.include_stack = include_chain.clone();
        }
        self.diagnostics.extend(diags);
        self.frames.push(Frame {
            tokens,
            pos: 0,
            include_depth: depth,
            include_chain,
            path: buffer.path.clone(),
        });
    }

    fn handle_pragma(&mut self, directive: &Token) {
        let rest = self.rest_of_line();
        self.record_directive_trivia(directive, &rest);

        let Some(first) = rest.first() else {
            return;
        };
        if first.text != "diagnostic" {
            return;
        }
        if rest.len() < 3 {
            self.report(DiagCode::InvalidPragmaDiagnostic, directive.location);
            return;
        }
        let severity = rest[1].text.clone();
        let option = if rest[2].kind == TokenKind::StringLiteral {
            rest[2].text.trim_matches('"').to_owned()
        } else {
            rest[2..].iter().map(|token| token.text.as_str()).collect()
        };
        self.pragmas.push(SeverityPragma {
            location: directive.location,
            severity,
            option,
        });
    }

    fn handle_conditional(&mut self, token: &Token, name: &str) {
        match name {
            "ifdef" | "ifndef" => {
                let arg = self.next_on_line();
                let defined = arg
                    .as_ref()
                    .map_or(false, |tok| self.macros.contains_key(&tok.text));
                let taken = defined == (name == "ifdef");
                let parent_active = self.region_active();
                self.conditionals.push(Conditional {
                    parent_active,
                    any_taken: taken,
                    active: parent_active && taken,
                    has_else: false,
                });
            }
            "elsif" => {
                let arg = self.next_on_line();
                let defined = arg
                    .as_ref()
                    .map_or(false, |tok| self.macros.contains_key(&tok.text));
                match self.conditionals.last_mut() {
                    Some(cond) if !cond.has_else => {
                        let taken = defined && !cond.any_taken;
                        cond.active = cond.parent_active && taken;
                        cond.any_taken |= taken;
                    }
                    _ => self.report(DiagCode::UnexpectedConditionalDirective, token.location),
                }
            }
            "else" => match self.conditionals.last_mut() {
                Some(cond) if !cond.has_else => {
                    cond.has_else = true;
                    cond.active = cond.parent_active && !cond.any_taken;
                    cond.any_taken = true;
                }
                _ => self.report(DiagCode::UnexpectedConditionalDirective, token.location),
            },
            "endif" => {
                if self.conditionals.pop().is_none() {
                    self.report(DiagCode::UnexpectedConditionalDirective, token.location);
                }
            }
            _ => {}
        }
    }

    // ---- macro expansion ----

    fn expand_macro(&mut self, usage: &Token, name: &str) {
        self.expansion_steps += 1;
        if self.expansion_steps > MAX_EXPANSION_STEPS {
            self.report(DiagCode::MacroRecursionLimit, usage.location);
            self.pending.clear();
            return;
        }

        let def = match self.macros.get(name) {
            Some(def) => def.clone(),
            None => return,
        };

        let mut output: Vec<Token> = Vec::new();
        if let Some(formals) = &def.formals {
            let actuals = match self.parse_macro_actuals(usage, name, formals.len()) {
                Some(actuals) => actuals,
                None => return,
            };

            let mut bindings: HashMap<&str, Vec<Token>> = HashMap::new();
            for (position, formal) in formals.iter().enumerate() {
                let tokens = match actuals.get(position) {
                    Some(tokens) if !tokens.is_empty() => tokens.clone(),
                    _ if !formal.default.is_empty() => formal.default.clone(),
                    Some(tokens) => tokens.clone(),
                    None => {
                        self.diagnostics.push(
                            Diagnostic::new(DiagCode::MacroArgCountMismatch, Some(usage.location))
                                .arg(name),
                        );
                        return;
                    }
                };
                bindings.insert(formal.name.as_str(), tokens);
            }

            for token in &def.body {
                if token.kind == TokenKind::Identifier {
                    if let Some(actual) = bindings.get(token.text.as_str()) {
                        for (position, spliced) in actual.iter().enumerate() {
                            let mut copy = spliced.clone();
                            copy.from_macro = Some(name.to_owned());
                            if position == 0 {
                                copy.trivia = token.trivia.clone();
                            }
                            output.push(copy);
                        }
                        continue;
                    }
                }
                let mut copy = token.clone();
                copy.from_macro = Some(name.to_owned());
                output.push(copy);
            }
        } else {
            for token in &def.body {
                let mut copy = token.clone();
                copy.from_macro = Some(name.to_owned());
                output.push(copy);
            }
        }

        if let Some(first) = output.first_mut() {
            first.trivia = usage.trivia.clone();
        }
        for token in output.into_iter().rev() {
            self.pending.push_front(token);
        }
    }

    /// Parse `(a, b, ...)` after a function-like macro usage. Returns one
    /// token list per actual, or None after reporting a mismatch.
    fn parse_macro_actuals(
        &mut self,
        usage: &Token,
        name: &str,
        formal_count: usize,
    ) -> Option<Vec<Vec<Token>>> {
        let has_open = matches!(
            self.peek_raw(),
            Some(token) if token.kind == TokenKind::OpenParen
        );
        if !has_open {
            self.diagnostics.push(
                Diagnostic::new(DiagCode::MacroArgCountMismatch, Some(usage.location)).arg(name),
            );
            return None;
        }
        self.bump_raw();

        let mut actuals: Vec<Vec<Token>> = vec![Vec::new()];
        let mut depth = 0usize;
        loop {
            let Some(token) = self.bump_raw() else {
                self.diagnostics.push(
                    Diagnostic::new(DiagCode::MacroArgCountMismatch, Some(usage.location))
                        .arg(name),
                );
                return None;
            };
            match token.kind {
                TokenKind::EndOfFile => {
                    self.diagnostics.push(
                        Diagnostic::new(DiagCode::MacroArgCountMismatch, Some(usage.location))
                            .arg(name),
                    );
                    return None;
                }
                TokenKind::CloseParen if depth == 0 => break,
                TokenKind::Comma if depth == 0 => actuals.push(Vec::new()),
                _ => {
                    if matches!(
                        token.kind,
                        TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace
                    ) {
                        depth += 1;
                    } else if matches!(
                        token.kind,
                        TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace
                    ) {
                        depth = depth.saturating_sub(1);
                    }
                    if let Some(actual) = actuals.last_mut() {
                        actual.push(token);
                    }
                }
            }
        }

        if actuals.len() == 1 && actuals[0].is_empty() && formal_count == 0 {
            actuals.clear();
        }
        if actuals.len() > formal_count {
            self.diagnostics.push(
                Diagnostic::new(DiagCode::MacroArgCountMismatch, Some(usage.location)).arg(name),
            );
            return None;
        }
        Some(actuals)
    }

    // ---- predefines ----

    fn apply_predefines(&mut self) {
        // Keep queued expansion tokens out of the definition parser.
        let saved_pending = std::mem::take(&mut self.pending);
        let label = self.options.predefine_source.clone();
        for spec in self.options.predefines.clone() {
            let (name, value) = match spec.split_once('=') {
                Some((name, value)) => (name.to_owned(), value.to_owned()),
                None => (spec.clone(), "1".to_owned()),
            };
            let text = format!("{name} {value}\n");
            let id = self.sm.assign_text(label.clone(), text, None);
            let Some(buffer) = self.sm.get(id) else {
                continue;
            };
            let (tokens, _) = lex_buffer(&buffer, &self.lexer_options);
            self.frames.push(Frame {
                tokens,
                pos: 0,
                include_depth: 0,
                include_chain: Vec::new(),
                path: PathBuf::from(&label),
            });
            let directive = Token::new(
                TokenKind::Directive,
                "`define",
                SourceLocation::new(id, 0),
            );
            self.handle_define(&directive, Some(label.clone()));
            self.frames.pop();
            self.directive_trivia.clear();
        }
        for name in &self.options.undefines {
            self.macros.remove(name);
        }
        self.pending = saved_pending;
    }

    fn report(&mut self, code: DiagCode, location: SourceLocation) {
        let mut diag = Diagnostic::new(code, Some(location));
        if let Some(frame) = self.frames.last() {
            diag.include_stack = frame.include_chain.clone();
        }
        self.diagnostics.push(diag);
    }
}

fn is_conditional_directive(name: &str) -> bool {
    matches!(name, "ifdef" | "ifndef" | "elsif" | "else" | "endif")
}
