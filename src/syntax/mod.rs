//! Token model shared by the lexer, preprocessor, and parser, plus the
//! printer used to reconstruct source text from a token stream.

pub mod lexer;
pub mod parser;
pub mod preprocessor;

use crate::source::SourceLocation;

/// Reserved words recognised by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Module,
    Endmodule,
    Interface,
    Endinterface,
    Program,
    Endprogram,
    Package,
    Endpackage,
    Begin,
    End,
    Generate,
    Endgenerate,
    Typedef,
    Enum,
    Wire,
    Logic,
    Reg,
    Bit,
    Int,
    Integer,
    Parameter,
    Localparam,
    Assign,
    Initial,
    Always,
    AlwaysComb,
    AlwaysFf,
    AlwaysLatch,
    Static,
    Automatic,
    Task,
    Endtask,
    Function,
    Endfunction,
    Input,
    Output,
    Inout,
    If,
    Else,
    For,
    Foreach,
    Case,
    Endcase,
    Force,
    Release,
    Dist,
    Posedge,
    Negedge,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("always", Keyword::Always),
    ("always_comb", Keyword::AlwaysComb),
    ("always_ff", Keyword::AlwaysFf),
    ("always_latch", Keyword::AlwaysLatch),
    ("assign", Keyword::Assign),
    ("automatic", Keyword::Automatic),
    ("begin", Keyword::Begin),
    ("bit", Keyword::Bit),
    ("case", Keyword::Case),
    ("dist", Keyword::Dist),
    ("else", Keyword::Else),
    ("end", Keyword::End),
    ("endcase", Keyword::Endcase),
    ("endfunction", Keyword::Endfunction),
    ("endgenerate", Keyword::Endgenerate),
    ("endinterface", Keyword::Endinterface),
    ("endmodule", Keyword::Endmodule),
    ("endpackage", Keyword::Endpackage),
    ("endprogram", Keyword::Endprogram),
    ("endtask", Keyword::Endtask),
    ("enum", Keyword::Enum),
    ("for", Keyword::For),
    ("force", Keyword::Force),
    ("foreach", Keyword::Foreach),
    ("function", Keyword::Function),
    ("generate", Keyword::Generate),
    ("if", Keyword::If),
    ("initial", Keyword::Initial),
    ("inout", Keyword::Inout),
    ("input", Keyword::Input),
    ("int", Keyword::Int),
    ("integer", Keyword::Integer),
    ("interface", Keyword::Interface),
    ("localparam", Keyword::Localparam),
    ("logic", Keyword::Logic),
    ("module", Keyword::Module),
    ("negedge", Keyword::Negedge),
    ("output", Keyword::Output),
    ("package", Keyword::Package),
    ("parameter", Keyword::Parameter),
    ("posedge", Keyword::Posedge),
    ("program", Keyword::Program),
    ("reg", Keyword::Reg),
    ("release", Keyword::Release),
    ("static", Keyword::Static),
    ("task", Keyword::Task),
    ("typedef", Keyword::Typedef),
    ("wire", Keyword::Wire),
];

impl Keyword {
    #[must_use]
    pub fn from_ident(ident: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find_map(|(name, keyword)| (*name == ident).then_some(*keyword))
    }
}

/// Lexical classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EndOfFile,
    Identifier,
    SystemIdentifier,
    IntegerLiteral,
    RealLiteral,
    /// The `'b` / `'sd` style base specifier of a vector literal.
    IntegerBase,
    StringLiteral,
    Keyword(Keyword),
    /// A backtick directive or macro usage, e.g. `` `define `` or `` `FOO ``.
    Directive,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Semicolon,
    Comma,
    Dot,
    Colon,
    DoubleColon,
    Hash,
    At,
    Equals,
    Question,
    /// Any other operator; the raw text carries the spelling.
    Operator,
    Unknown,
}

/// Non-token source text attached to the following token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    Whitespace,
    EndOfLine,
    LineContinuation,
    LineComment,
    BlockComment,
    /// A consumed preprocessor directive, re-attached so the printer can
    /// reproduce it on request.
    Directive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub text: String,
}

impl Trivia {
    #[must_use]
    pub fn new(kind: TriviaKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn is_end_of_line(&self) -> bool {
        self.kind == TriviaKind::EndOfLine
    }
}

/// A lexed token with its leading trivia.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub trivia: Vec<Trivia>,
    pub location: SourceLocation,
    /// Name of the macro whose expansion produced this token, if any.
    pub from_macro: Option<String>,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            kind,
            text: text.into(),
            trivia: Vec::new(),
            location,
            from_macro: None,
        }
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EndOfFile
    }

    #[must_use]
    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            _ => None,
        }
    }

    /// True when any leading trivia breaks onto a new line.
    #[must_use]
    pub fn starts_line(&self) -> bool {
        self.trivia.iter().any(Trivia::is_end_of_line)
    }

    /// Directive name without the backtick, for directive tokens.
    #[must_use]
    pub fn directive_name(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Directive => self.text.strip_prefix('`'),
            _ => None,
        }
    }
}

/// True for tokens that could be the digits of a vector literal. The digits
/// of e.g. `4'hbeef` lex as an identifier, so anything after an integer base
/// has to be passed through untouched until a clear non-digit appears.
#[must_use]
pub fn is_possible_vector_digit(token: &Token) -> bool {
    match token.kind {
        TokenKind::IntegerLiteral | TokenKind::Question => true,
        TokenKind::Identifier => token
            .text
            .chars()
            .all(|ch| ch.is_ascii_hexdigit() || matches!(ch, '_' | 'x' | 'X' | 'z' | 'Z')),
        _ => false,
    }
}

/// Reassembles source text from tokens, with switches for which trivia
/// classes survive.
pub struct SyntaxPrinter {
    include_comments: bool,
    include_directives: bool,
    include_trivia: bool,
    out: String,
}

impl Default for SyntaxPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxPrinter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_comments: true,
            include_directives: false,
            include_trivia: true,
            out: String::new(),
        }
    }

    pub fn set_include_comments(&mut self, value: bool) -> &mut Self {
        self.include_comments = value;
        self
    }

    pub fn set_include_directives(&mut self, value: bool) -> &mut Self {
        self.include_directives = value;
        self
    }

    pub fn set_include_trivia(&mut self, value: bool) -> &mut Self {
        self.include_trivia = value;
        self
    }

    pub fn print(&mut self, token: &Token) -> &mut Self {
        for trivia in &token.trivia {
            if !self.include_trivia {
                continue;
            }
            match trivia.kind {
                TriviaKind::LineComment | TriviaKind::BlockComment => {
                    if self.include_comments {
                        self.out.push_str(&trivia.text);
                    }
                }
                TriviaKind::Directive => {
                    if self.include_directives {
                        self.out.push_str(&trivia.text);
                    }
                }
                _ => self.out.push_str(&trivia.text),
            }
        }
        if token.kind != TokenKind::EndOfFile {
            self.out.push_str(&token.text);
        }
        self
    }

    pub fn print_all(&mut self, tokens: &[Token]) -> &mut Self {
        for token in tokens {
            self.print(token);
        }
        self
    }

    pub fn append(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.out
    }

    #[must_use]
    pub fn into_text(self) -> String {
        self.out
    }
}
