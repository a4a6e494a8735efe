//! Shallow module-level parser. It recognises design-element declarations,
//! parameters, child instantiations, and a small set of expression facts the
//! elaborator checks later; everything else is consumed with per-statement
//! error recovery.

use crate::diagnostics::engine::SeverityPragma;
use crate::diagnostics::{DiagCode, Diagnostic};
use crate::source::{BufferId, SourceLocation};

use super::preprocessor::Preprocessor;
use super::{Keyword, Token, TokenKind};

/// Limits applied while parsing.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Maximum nesting of block constructs before the parser gives up.
    pub max_recursion_depth: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_recursion_depth: 1024,
        }
    }
}

/// Kind of design element a declaration introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Module,
    Interface,
    Program,
    Package,
}

impl ElementKind {
    fn end_keyword(self) -> Keyword {
        match self {
            ElementKind::Module => Keyword::Endmodule,
            ElementKind::Interface => Keyword::Endinterface,
            ElementKind::Program => Keyword::Endprogram,
            ElementKind::Package => Keyword::Endpackage,
        }
    }

    #[must_use]
    pub fn display(self) -> &'static str {
        match self {
            ElementKind::Module => "module",
            ElementKind::Interface => "interface",
            ElementKind::Program => "program",
            ElementKind::Package => "package",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub default: Option<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct Instance {
    pub module_name: String,
    pub instance_name: String,
    pub location: SourceLocation,
    pub macro_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RangedVar {
    pub name: String,
    pub msb: i64,
    pub lsb: i64,
}

/// A constant bit- or part-select observed in an expression.
#[derive(Debug, Clone)]
pub struct SelectUse {
    pub target: String,
    pub high: i64,
    pub low: Option<i64>,
    pub location: SourceLocation,
}

/// A variable declared with a user-defined type, possibly an enum.
#[derive(Debug, Clone)]
pub struct TypedVar {
    pub type_name: String,
    pub name: String,
}

/// An assignment whose right-hand side starts with an integral literal.
#[derive(Debug, Clone)]
pub struct LiteralAssignment {
    pub target: String,
    pub location: SourceLocation,
    pub macro_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SysCall {
    pub name: String,
    pub first_arg: Option<String>,
    pub location: SourceLocation,
}

/// One parsed design element and the facts collected from its body.
#[derive(Debug, Clone)]
pub struct DesignElement {
    pub kind: ElementKind,
    pub name: String,
    pub location: SourceLocation,
    pub parameters: Vec<Parameter>,
    pub instances: Vec<Instance>,
    pub enums: Vec<EnumType>,
    pub ranged_vars: Vec<RangedVar>,
    pub typed_vars: Vec<TypedVar>,
    pub selects: Vec<SelectUse>,
    pub literal_assignments: Vec<LiteralAssignment>,
    pub sys_calls: Vec<SysCall>,
}

impl DesignElement {
    fn new(kind: ElementKind, name: String, location: SourceLocation) -> Self {
        Self {
            kind,
            name,
            location,
            parameters: Vec::new(),
            instances: Vec::new(),
            enums: Vec::new(),
            ranged_vars: Vec::new(),
            typed_vars: Vec::new(),
            selects: Vec::new(),
            literal_assignments: Vec::new(),
            sys_calls: Vec::new(),
        }
    }
}

/// Result of parsing one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    pub elements: Vec<DesignElement>,
    pub diagnostics: Vec<Diagnostic>,
    pub pragmas: Vec<SeverityPragma>,
    pub buffers: Vec<BufferId>,
    pub library: Option<String>,
}

impl SyntaxTree {
    #[must_use]
    pub fn is_library(&self) -> bool {
        self.library.is_some()
    }
}

/// Run a preprocessor to its end-of-file sentinel, returning the emitted
/// tokens and everything it accumulated along the way.
pub fn drain(
    pp: &mut Preprocessor<'_>,
) -> (Vec<Token>, Vec<Diagnostic>, Vec<SeverityPragma>) {
    let mut tokens = Vec::new();
    loop {
        let token = pp.next();
        let done = token.is_eof();
        tokens.push(token);
        if done {
            break;
        }
    }
    let pragmas = pp.pragmas().to_vec();
    let diagnostics = pp.take_diagnostics();
    (tokens, diagnostics, pragmas)
}

/// Parse an already-preprocessed token stream.
pub fn parse_tokens(
    mut tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    pragmas: Vec<SeverityPragma>,
    options: &ParserOptions,
    buffers: Vec<BufferId>,
) -> SyntaxTree {
    if tokens.is_empty() {
        tokens.push(Token::new(
            TokenKind::EndOfFile,
            "",
            SourceLocation::new(BufferId::UNKNOWN, 0),
        ));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        options,
        diagnostics,
        depth_reported: false,
    };
    let elements = parser.parse_unit();

    SyntaxTree {
        elements,
        diagnostics: parser.diagnostics,
        pragmas,
        buffers,
        library: None,
    }
}

/// Drain a preprocessor and parse the resulting token stream.
pub fn parse(
    mut pp: Preprocessor<'_>,
    options: &ParserOptions,
    buffers: Vec<BufferId>,
) -> SyntaxTree {
    let (tokens, diagnostics, pragmas) = drain(&mut pp);
    parse_tokens(tokens, diagnostics, pragmas, options, buffers)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    options: &'a ParserOptions,
    diagnostics: Vec<Diagnostic>,
    depth_reported: bool,
}

impl Parser<'_> {
    fn parse_unit(&mut self) -> Vec<DesignElement> {
        let mut elements = Vec::new();
        while !self.at_eof() {
            let token = self.peek().clone();
            match element_kind(&token) {
                Some(kind) => {
                    self.bump();
                    if let Some(element) = self.parse_element(kind, &token) {
                        elements.push(element);
                    }
                }
                None => {
                    self.report_member_error(&token);
                    // Recovery stops at element boundaries, so a stray end
                    // keyword must be consumed here to make progress.
                    self.bump();
                    self.recover_to_semicolon();
                }
            }
        }
        elements
    }

    fn parse_element(&mut self, kind: ElementKind, start: &Token) -> Option<DesignElement> {
        let name_token = self.peek().clone();
        if name_token.kind != TokenKind::Identifier {
            self.report_member_error(&name_token);
            self.recover_to_semicolon();
            return None;
        }
        self.bump();

        let mut element = DesignElement::new(kind, name_token.text.clone(), name_token.location);

        // Header parameter list.
        if self.peek().kind == TokenKind::Hash {
            self.bump();
            if self.peek().kind == TokenKind::OpenParen {
                let region = self.take_balanced_parens();
                parse_parameter_entries(&region, &mut element.parameters);
            }
        }

        // Port list.
        if self.peek().kind == TokenKind::OpenParen {
            let _ = self.take_balanced_parens();
        }
        if self.peek().kind == TokenKind::Semicolon {
            self.bump();
        }

        self.parse_element_body(&mut element, start);
        Some(element)
    }

    fn parse_element_body(&mut self, element: &mut DesignElement, start: &Token) {
        let end_keyword = element.kind.end_keyword();
        let mut depth = 0usize;

        loop {
            let token = self.peek().clone();
            if token.is_eof() {
                self.diagnostics.push(
                    Diagnostic::new(DiagCode::UnclosedDesignElement, Some(start.location))
                        .arg(element.name.clone()),
                );
                return;
            }

            match token.kind {
                TokenKind::Keyword(keyword) if keyword == end_keyword => {
                    self.bump();
                    // Optional end label: `endmodule : name`.
                    if self.peek().kind == TokenKind::Colon {
                        self.bump();
                        if self.peek().kind == TokenKind::Identifier {
                            self.bump();
                        }
                    }
                    return;
                }
                TokenKind::Keyword(
                    Keyword::Begin
                    | Keyword::Generate
                    | Keyword::Case
                    | Keyword::Function
                    | Keyword::Task,
                ) => {
                    depth += 1;
                    if depth > self.options.max_recursion_depth && !self.depth_reported {
                        self.depth_reported = true;
                        self.diagnostics.push(Diagnostic::new(
                            DiagCode::MaxParseDepthExceeded,
                            Some(token.location),
                        ));
                    }
                    self.bump();
                    // Optional block label.
                    if self.peek().kind == TokenKind::Colon {
                        self.bump();
                        if self.peek().kind == TokenKind::Identifier {
                            self.bump();
                        }
                    }
                }
                TokenKind::Keyword(
                    Keyword::End
                    | Keyword::Endgenerate
                    | Keyword::Endcase
                    | Keyword::Endfunction
                    | Keyword::Endtask,
                ) => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                TokenKind::Keyword(Keyword::Parameter) => {
                    self.bump();
                    self.parse_parameter_statement(element);
                }
                TokenKind::Keyword(Keyword::Localparam) => {
                    self.bump();
                    self.recover_to_semicolon();
                }
                TokenKind::Keyword(Keyword::Typedef) => {
                    self.bump();
                    self.parse_typedef(element);
                }
                TokenKind::Keyword(
                    Keyword::Wire
                    | Keyword::Logic
                    | Keyword::Reg
                    | Keyword::Bit
                    | Keyword::Int
                    | Keyword::Integer,
                ) => {
                    self.bump();
                    self.parse_net_declaration(element);
                }
                TokenKind::Keyword(Keyword::Assign) => {
                    self.bump();
                    self.scan_statement(element);
                }
                TokenKind::Identifier => self.parse_identifier_statement(element),
                TokenKind::SystemIdentifier => {
                    self.scan_statement(element);
                }
                TokenKind::Semicolon => {
                    self.bump();
                }
                TokenKind::OpenParen => {
                    let _ = self.take_balanced_parens();
                }
                TokenKind::Hash => {
                    // Delay control: `#10` or `#(expr)`.
                    self.bump();
                    match self.peek().kind {
                        TokenKind::IntegerLiteral | TokenKind::RealLiteral => self.bump(),
                        TokenKind::OpenParen => {
                            let _ = self.take_balanced_parens();
                        }
                        _ => {}
                    }
                }
                TokenKind::Keyword(_) | TokenKind::At => {
                    // Procedural headers and event controls carry no facts of
                    // their own; keep walking.
                    self.bump();
                }
                _ => {
                    self.report_member_error(&token);
                    self.recover_to_semicolon();
                }
            }
        }
    }

    /// Statements starting with an identifier: instantiations, user-typed
    /// variable declarations, or assignments.
    fn parse_identifier_statement(&mut self, element: &mut DesignElement) {
        let first = self.peek().clone();
        let second = self.peek_at(1).kind;
        let third = self.peek_at(2).kind;

        match second {
            TokenKind::Hash => {
                self.bump();
                self.bump();
                if self.peek().kind == TokenKind::OpenParen {
                    let _ = self.take_balanced_parens();
                }
                self.finish_instantiation(element, &first);
            }
            TokenKind::Identifier if third == TokenKind::OpenParen => {
                self.bump();
                self.finish_instantiation(element, &first);
            }
            TokenKind::Identifier
                if matches!(
                    third,
                    TokenKind::Semicolon | TokenKind::Equals | TokenKind::Comma
                ) =>
            {
                self.bump();
                loop {
                    let name = self.peek().clone();
                    if name.kind != TokenKind::Identifier {
                        break;
                    }
                    self.bump();
                    element.typed_vars.push(TypedVar {
                        type_name: first.text.clone(),
                        name: name.text.clone(),
                    });
                    if self.peek().kind == TokenKind::Equals {
                        self.record_assignment_rhs(element, &name);
                    }
                    if self.peek().kind != TokenKind::Comma {
                        break;
                    }
                    self.bump();
                }
                self.scan_statement(element);
            }
            TokenKind::Equals | TokenKind::OpenBracket | TokenKind::Dot | TokenKind::DoubleColon => {
                self.scan_statement(element);
            }
            TokenKind::Operator if self.peek_at(1).text == "<=" => {
                self.scan_statement(element);
            }
            _ => {
                self.report_member_error(&first);
                self.recover_to_semicolon();
            }
        }
    }

    /// Parse `name (...)` after the module type (and any parameter value
    /// assignment) of an instantiation, handling `a (...), b (...)` lists.
    fn finish_instantiation(&mut self, element: &mut DesignElement, module: &Token) {
        loop {
            let name = self.peek().clone();
            if name.kind != TokenKind::Identifier {
                break;
            }
            self.bump();
            if self.peek().kind == TokenKind::OpenBracket {
                let _ = self.take_balanced_brackets();
            }
            if self.peek().kind == TokenKind::OpenParen {
                let _ = self.take_balanced_parens();
            }
            element.instances.push(Instance {
                module_name: module.text.clone(),
                instance_name: name.text.clone(),
                location: module.location,
                macro_name: module.from_macro.clone(),
            });
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.bump();
        }
        if self.peek().kind == TokenKind::Semicolon {
            self.bump();
        }
    }

    fn parse_parameter_statement(&mut self, element: &mut DesignElement) {
        let mut region = Vec::new();
        while !self.at_eof() {
            let token = self.peek().clone();
            if token.kind == TokenKind::Semicolon {
                self.bump();
                break;
            }
            if is_element_boundary(&token) {
                break;
            }
            region.push(token);
            self.bump();
        }
        parse_parameter_entries(&region, &mut element.parameters);
    }

    fn parse_typedef(&mut self, element: &mut DesignElement) {
        if self.peek().keyword() != Some(Keyword::Enum) {
            self.recover_to_semicolon();
            return;
        }
        self.bump();

        // Skip the optional base type up to the member list.
        while !self.at_eof() && self.peek().kind != TokenKind::OpenBrace {
            if self.peek().kind == TokenKind::Semicolon {
                self.bump();
                return;
            }
            self.bump();
        }

        let mut members = Vec::new();
        if self.peek().kind == TokenKind::OpenBrace {
            self.bump();
            let mut expect_member = true;
            while !self.at_eof() {
                let token = self.peek().clone();
                self.bump();
                match token.kind {
                    TokenKind::CloseBrace => break,
                    TokenKind::Comma => expect_member = true,
                    TokenKind::Identifier if expect_member => {
                        members.push(token.text.clone());
                        expect_member = false;
                    }
                    _ => {}
                }
            }
        }

        let name = self.peek().clone();
        if name.kind == TokenKind::Identifier {
            self.bump();
            element.enums.push(EnumType {
                name: name.text.clone(),
                members,
            });
        }
        self.recover_to_semicolon();
    }

    fn parse_net_declaration(&mut self, element: &mut DesignElement) {
        let range = if self.peek().kind == TokenKind::OpenBracket {
            let region = self.take_balanced_brackets();
            parse_constant_range(&region)
        } else {
            None
        };

        loop {
            let name = self.peek().clone();
            if name.kind != TokenKind::Identifier {
                break;
            }
            self.bump();
            if let Some((msb, lsb)) = range {
                element.ranged_vars.push(RangedVar {
                    name: name.text.clone(),
                    msb,
                    lsb,
                });
            }
            if self.peek().kind == TokenKind::Equals {
                self.record_assignment_rhs(element, &name);
            }
            if self.peek().kind != TokenKind::Comma {
                break;
            }
            self.bump();
        }
        self.scan_statement(element);
    }

    /// Consume `= <first-rhs-token>` and note literal right-hand sides.
    fn record_assignment_rhs(&mut self, element: &mut DesignElement, target: &Token) {
        self.bump();
        let rhs = self.peek().clone();
        if matches!(rhs.kind, TokenKind::IntegerLiteral | TokenKind::IntegerBase) {
            element.literal_assignments.push(LiteralAssignment {
                target: target.text.clone(),
                location: rhs.location,
                macro_name: rhs.from_macro.clone().or_else(|| target.from_macro.clone()),
            });
        }
    }

    /// Consume tokens up to the next statement boundary, recording selects,
    /// assignments, and system calls seen along the way.
    fn scan_statement(&mut self, element: &mut DesignElement) {
        let mut prev_ident: Option<Token> = None;
        while !self.at_eof() {
            let token = self.peek().clone();
            if token.kind == TokenKind::Semicolon {
                self.bump();
                return;
            }
            if is_element_boundary(&token)
                || matches!(
                    token.kind,
                    TokenKind::Keyword(
                        Keyword::Begin
                            | Keyword::End
                            | Keyword::Endgenerate
                            | Keyword::Endcase
                            | Keyword::Endfunction
                            | Keyword::Endtask
                    )
                )
            {
                return;
            }
            self.bump();

            match token.kind {
                TokenKind::Identifier => {
                    if self.peek().kind == TokenKind::Equals {
                        self.record_assignment_rhs(element, &token);
                        prev_ident = None;
                        continue;
                    }
                    prev_ident = Some(token);
                }
                TokenKind::OpenBracket => {
                    if let Some(target) = prev_ident.take() {
                        let region = self.take_bracket_rest();
                        if let Some((high, low)) = parse_constant_select(&region) {
                            element.selects.push(SelectUse {
                                target: target.text.clone(),
                                high,
                                low,
                                location: target.location,
                            });
                        }
                    }
                }
                TokenKind::SystemIdentifier => {
                    let first_arg = if self.peek().kind == TokenKind::OpenParen {
                        let region = self.take_balanced_parens();
                        region
                            .iter()
                            .find(|tok| {
                                !matches!(
                                    tok.kind,
                                    TokenKind::OpenParen | TokenKind::CloseParen
                                )
                            })
                            .map(|tok| tok.text.clone())
                    } else {
                        None
                    };
                    element.sys_calls.push(SysCall {
                        name: token.text.clone(),
                        first_arg,
                        location: token.location,
                    });
                    prev_ident = None;
                }
                _ => prev_ident = None,
            }
        }
    }

    // ---- low-level helpers ----

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + ahead).min(last)]
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Consume a balanced `( ... )` region, returning it without the outer
    /// parentheses.
    fn take_balanced_parens(&mut self) -> Vec<Token> {
        self.take_balanced(TokenKind::OpenParen, TokenKind::CloseParen)
    }

    fn take_balanced_brackets(&mut self) -> Vec<Token> {
        self.take_balanced(TokenKind::OpenBracket, TokenKind::CloseBracket)
    }

    fn take_balanced(&mut self, open: TokenKind, close: TokenKind) -> Vec<Token> {
        let mut region = Vec::new();
        if self.peek().kind != open {
            return region;
        }
        self.bump();
        let mut depth = 0usize;
        while !self.at_eof() {
            let token = self.peek().clone();
            if token.kind == close && depth == 0 {
                self.bump();
                break;
            }
            if token.kind == open {
                depth += 1;
            } else if token.kind == close {
                depth = depth.saturating_sub(1);
            }
            region.push(token);
            self.bump();
        }
        region
    }

    /// Consume the rest of a bracket region whose opener is already consumed.
    fn take_bracket_rest(&mut self) -> Vec<Token> {
        let mut region = Vec::new();
        let mut depth = 0usize;
        while !self.at_eof() {
            let token = self.peek().clone();
            if token.kind == TokenKind::CloseBracket && depth == 0 {
                self.bump();
                break;
            }
            if token.kind == TokenKind::OpenBracket {
                depth += 1;
            } else if token.kind == TokenKind::CloseBracket {
                depth = depth.saturating_sub(1);
            }
            region.push(token);
            self.bump();
        }
        region
    }

    fn recover_to_semicolon(&mut self) {
        while !self.at_eof() {
            let token = self.peek().clone();
            if token.kind == TokenKind::Semicolon {
                self.bump();
                return;
            }
            if is_element_boundary(&token) {
                return;
            }
            self.bump();
        }
    }

    fn report_member_error(&mut self, token: &Token) {
        let mut diag = Diagnostic::new(DiagCode::ExpectedMember, Some(token.location));
        if let Some(name) = &token.from_macro {
            diag = diag.in_macro(name.clone());
        }
        self.diagnostics.push(diag);
    }
}

fn element_kind(token: &Token) -> Option<ElementKind> {
    match token.keyword()? {
        Keyword::Module => Some(ElementKind::Module),
        Keyword::Interface => Some(ElementKind::Interface),
        Keyword::Program => Some(ElementKind::Program),
        Keyword::Package => Some(ElementKind::Package),
        _ => None,
    }
}

fn is_element_boundary(token: &Token) -> bool {
    matches!(
        token.keyword(),
        Some(
            Keyword::Module
                | Keyword::Endmodule
                | Keyword::Interface
                | Keyword::Endinterface
                | Keyword::Program
                | Keyword::Endprogram
                | Keyword::Package
                | Keyword::Endpackage
        )
    )
}

/// Split a parameter region on top-level commas and pull `name = default`
/// pairs out of each entry.
fn parse_parameter_entries(region: &[Token], parameters: &mut Vec<Parameter>) {
    let mut depth = 0usize;
    let mut entry: Vec<&Token> = Vec::new();
    let mut entries: Vec<Vec<&Token>> = Vec::new();
    for token in region {
        match token.kind {
            TokenKind::Comma if depth == 0 => entries.push(std::mem::take(&mut entry)),
            TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace => {
                depth += 1;
                entry.push(token);
            }
            TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace => {
                depth = depth.saturating_sub(1);
                entry.push(token);
            }
            _ => entry.push(token),
        }
    }
    if !entry.is_empty() {
        entries.push(entry);
    }

    for entry in entries {
        let equals = entry
            .iter()
            .position(|token| token.kind == TokenKind::Equals);
        let name_range = &entry[..equals.unwrap_or(entry.len())];
        let Some(name) = name_range
            .iter()
            .rev()
            .find(|token| token.kind == TokenKind::Identifier)
        else {
            continue;
        };
        let default = equals.map(|pos| {
            entry[pos + 1..]
                .iter()
                .map(|token| token.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });
        parameters.push(Parameter {
            name: name.text.clone(),
            default,
            location: name.location,
        });
    }
}

/// Parse `[msb:lsb]` contents where both bounds are integer literals.
fn parse_constant_range(region: &[Token]) -> Option<(i64, i64)> {
    let colon = region
        .iter()
        .position(|token| token.kind == TokenKind::Colon)?;
    let msb = parse_int(&region[..colon])?;
    let lsb = parse_int(&region[colon + 1..])?;
    Some((msb, lsb))
}

/// Parse a select region: `[idx]` or `[high:low]` with constant bounds.
fn parse_constant_select(region: &[Token]) -> Option<(i64, Option<i64>)> {
    match region
        .iter()
        .position(|token| token.kind == TokenKind::Colon)
    {
        Some(colon) => {
            let high = parse_int(&region[..colon])?;
            let low = parse_int(&region[colon + 1..])?;
            Some((high, Some(low)))
        }
        None => parse_int(region).map(|value| (value, None)),
    }
}

fn parse_int(tokens: &[Token]) -> Option<i64> {
    match tokens {
        [single] if single.kind == TokenKind::IntegerLiteral => {
            single.text.replace('_', "").parse().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests;
