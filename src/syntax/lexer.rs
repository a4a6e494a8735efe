//! Compact SystemVerilog lexer. Produces tokens with leading trivia; the
//! preprocessor interprets directive tokens before anything reaches the
//! parser.

use crate::diagnostics::{DiagCode, Diagnostic};
use crate::source::{SourceBuffer, SourceLocation};

use super::{Keyword, Token, TokenKind, Trivia, TriviaKind};

/// Limits applied while lexing.
#[derive(Debug, Clone)]
pub struct LexerOptions {
    /// Errors tolerated before the rest of the file is skipped.
    pub max_errors: usize,
}

impl Default for LexerOptions {
    fn default() -> Self {
        Self { max_errors: 16 }
    }
}

/// Lex a whole buffer. The returned stream always ends with an end-of-file
/// token.
pub fn lex_buffer(buffer: &SourceBuffer, options: &LexerOptions) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer {
        text: &buffer.text,
        bytes: buffer.text.as_bytes(),
        pos: 0,
        buffer_id: buffer.id,
        options,
        tokens: Vec::new(),
        trivia: Vec::new(),
        diagnostics: Vec::new(),
        error_count: 0,
    };
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    buffer_id: crate::source::BufferId,
    options: &'a LexerOptions,
    tokens: Vec<Token>,
    trivia: Vec<Trivia>,
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) {
        while self.pos < self.bytes.len() {
            if !self.scan_one() {
                break;
            }
        }
        let location = SourceLocation::new(self.buffer_id, self.text.len());
        let mut eof = Token::new(TokenKind::EndOfFile, "", location);
        eof.trivia = std::mem::take(&mut self.trivia);
        self.tokens.push(eof);
    }

    /// Scan one trivia run or token. Returns false to abandon the file.
    fn scan_one(&mut self) -> bool {
        let start = self.pos;
        let ch = self.peek_char();
        match ch {
            ' ' | '\t' => {
                while matches!(self.peek_char(), ' ' | '\t') {
                    self.pos += 1;
                }
                self.push_trivia(TriviaKind::Whitespace, start);
            }
            '\r' | '\n' => {
                self.pos += 1;
                if ch == '\r' && self.peek_char() == '\n' {
                    self.pos += 1;
                }
                self.push_trivia(TriviaKind::EndOfLine, start);
            }
            '\\' if matches!(self.peek_char_at(1), '\r' | '\n') => {
                self.pos += 2;
                if self.bytes.get(start + 1) == Some(&b'\r') && self.peek_char() == '\n' {
                    self.pos += 1;
                }
                self.push_trivia(TriviaKind::LineContinuation, start);
            }
            '/' if self.peek_char_at(1) == '/' => {
                while self.pos < self.bytes.len() && !matches!(self.peek_char(), '\r' | '\n') {
                    self.pos += 1;
                }
                self.push_trivia(TriviaKind::LineComment, start);
            }
            '/' if self.peek_char_at(1) == '*' => {
                self.pos += 2;
                while self.pos < self.bytes.len() {
                    if self.peek_char() == '*' && self.peek_char_at(1) == '/' {
                        self.pos += 2;
                        break;
                    }
                    self.pos += 1;
                }
                self.push_trivia(TriviaKind::BlockComment, start);
            }
            '`' => {
                self.pos += 1;
                self.consume_ident_chars();
                self.push_token(TokenKind::Directive, start);
            }
            '\\' => {
                // Escaped identifier: backslash through the next whitespace.
                self.pos += 1;
                while self.pos < self.bytes.len() && !self.peek_char().is_ascii_whitespace() {
                    self.pos += 1;
                }
                self.push_token(TokenKind::Identifier, start);
            }
            '$' => {
                self.pos += 1;
                if is_ident_start(self.peek_char()) {
                    self.consume_ident_chars();
                    self.push_token(TokenKind::SystemIdentifier, start);
                } else {
                    self.push_token(TokenKind::Operator, start);
                }
            }
            '"' => return self.scan_string(start),
            '\'' => self.scan_apostrophe(start),
            c if c.is_ascii_digit() => self.scan_number(start),
            c if is_ident_start(c) => {
                self.consume_ident_chars();
                let text = &self.text[start..self.pos];
                let kind = match Keyword::from_ident(text) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Identifier,
                };
                self.push_token(kind, start);
            }
            _ => return self.scan_punct(start),
        }
        true
    }

    fn scan_string(&mut self, start: usize) -> bool {
        self.pos += 1;
        loop {
            match self.peek_char() {
                '\0' | '\r' | '\n' => {
                    self.push_token(TokenKind::StringLiteral, start);
                    return self.report(DiagCode::UnterminatedString, start);
                }
                '"' => {
                    self.pos += 1;
                    self.push_token(TokenKind::StringLiteral, start);
                    return true;
                }
                '\\' => {
                    self.pos += 1;
                    if self.pos < self.bytes.len() {
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    fn scan_apostrophe(&mut self, start: usize) {
        self.pos += 1;
        let mut lookahead = self.pos;
        if matches!(self.peek_char(), 's' | 'S') {
            lookahead += 1;
        }
        if matches!(
            char::from(*self.bytes.get(lookahead).unwrap_or(&0)),
            'b' | 'B' | 'o' | 'O' | 'd' | 'D' | 'h' | 'H'
        ) {
            self.pos = lookahead + 1;
            self.push_token(TokenKind::IntegerBase, start);
            return;
        }
        if matches!(self.peek_char(), '0' | '1' | 'x' | 'X' | 'z' | 'Z') {
            // Unbased unsized literal like '0 or 'z.
            self.pos += 1;
            self.push_token(TokenKind::IntegerLiteral, start);
            return;
        }
        self.push_token(TokenKind::Operator, start);
    }

    fn scan_number(&mut self, start: usize) {
        while self.peek_char().is_ascii_digit() || self.peek_char() == '_' {
            self.pos += 1;
        }
        let mut kind = TokenKind::IntegerLiteral;
        if self.peek_char() == '.' && self.peek_char_at(1).is_ascii_digit() {
            kind = TokenKind::RealLiteral;
            self.pos += 1;
            while self.peek_char().is_ascii_digit() || self.peek_char() == '_' {
                self.pos += 1;
            }
        }
        if matches!(self.peek_char(), 'e' | 'E')
            && (self.peek_char_at(1).is_ascii_digit()
                || (matches!(self.peek_char_at(1), '+' | '-') && self.peek_char_at(2).is_ascii_digit()))
        {
            kind = TokenKind::RealLiteral;
            self.pos += 1;
            if matches!(self.peek_char(), '+' | '-') {
                self.pos += 1;
            }
            while self.peek_char().is_ascii_digit() {
                self.pos += 1;
            }
        }
        self.push_token(kind, start);
    }

    fn scan_punct(&mut self, start: usize) -> bool {
        const MULTI: &[&str] = &[
            "<<<=", ">>>=", "===", "!==", "<<<", ">>>", "<<=", ">>=", "->>", "**", "<<", ">>",
            "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
            "|=", "^=", "->", "::", ":=", ":/",
        ];
        let rest = &self.text[self.pos..];
        for op in MULTI {
            if rest.starts_with(op) {
                self.pos += op.len();
                let kind = if *op == "::" {
                    TokenKind::DoubleColon
                } else {
                    TokenKind::Operator
                };
                self.push_token(kind, start);
                return true;
            }
        }

        let ch = self.peek_char();
        let kind = match ch {
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            '[' => TokenKind::OpenBracket,
            ']' => TokenKind::CloseBracket,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            '#' => TokenKind::Hash,
            '@' => TokenKind::At,
            '=' => TokenKind::Equals,
            '?' => TokenKind::Question,
            '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '~' | '!' | '<' | '>' => {
                TokenKind::Operator
            }
            _ => {
                let len = char_len(ch);
                self.pos += len;
                self.push_token(TokenKind::Unknown, start);
                return self.report_arg(DiagCode::UnexpectedChar, start, &ch.to_string());
            }
        };
        self.pos += 1;
        self.push_token(kind, start);
        true
    }

    fn report(&mut self, code: DiagCode, offset: usize) -> bool {
        self.report_arg(code, offset, "")
    }

    fn report_arg(&mut self, code: DiagCode, offset: usize, arg: &str) -> bool {
        self.error_count += 1;
        let mut diag = Diagnostic::new(code, Some(SourceLocation::new(self.buffer_id, offset)));
        if !arg.is_empty() {
            diag = diag.arg(arg);
        }
        self.diagnostics.push(diag);

        if self.options.max_errors > 0 && self.error_count > self.options.max_errors {
            self.diagnostics.push(Diagnostic::new(
                DiagCode::TooManyLexerErrors,
                Some(SourceLocation::new(self.buffer_id, offset)),
            ));
            return false;
        }
        true
    }

    fn consume_ident_chars(&mut self) {
        while is_ident_char(self.peek_char()) {
            self.pos += 1;
        }
    }

    fn push_trivia(&mut self, kind: TriviaKind, start: usize) {
        self.trivia
            .push(Trivia::new(kind, &self.text[start..self.pos]));
    }

    fn push_token(&mut self, kind: TokenKind, start: usize) {
        let mut token = Token::new(
            kind,
            &self.text[start..self.pos],
            SourceLocation::new(self.buffer_id, start),
        );
        token.trivia = std::mem::take(&mut self.trivia);
        self.tokens.push(token);
    }

    fn peek_char(&self) -> char {
        self.peek_char_at(0)
    }

    fn peek_char_at(&self, ahead: usize) -> char {
        self.text[self.pos..]
            .chars()
            .nth(ahead)
            .unwrap_or('\0')
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '$'
}

fn char_len(ch: char) -> usize {
    if ch == '\0' {
        1
    } else {
        ch.len_utf8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceManager;

    fn lex(text: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let sm = SourceManager::new();
        let id = sm.assign_text("test.v", text, None);
        let buffer = sm.get(id).unwrap();
        lex_buffer(&buffer, &LexerOptions::default())
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|token| token.kind).collect()
    }

    #[test]
    fn lexes_a_simple_module() {
        let (tokens, diags) = lex("module m; endmodule\n");
        assert!(diags.is_empty());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Keyword(Keyword::Module),
                TokenKind::Identifier,
                TokenKind::Semicolon,
                TokenKind::Keyword(Keyword::Endmodule),
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn vector_literals_split_into_size_base_digits() {
        let (tokens, _) = lex("4'b1010 8'hbeef 'd42");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::IntegerBase,
                TokenKind::IntegerLiteral,
                TokenKind::IntegerLiteral,
                TokenKind::IntegerBase,
                TokenKind::Identifier, // hex digits lex as an identifier
                TokenKind::IntegerBase,
                TokenKind::IntegerLiteral,
                TokenKind::EndOfFile,
            ]
        );
        assert_eq!(tokens[1].text, "'b");
        assert_eq!(tokens[5].text, "beef");
    }

    #[test]
    fn signed_bases_and_unbased_literals() {
        let (tokens, _) = lex("4'sb11 'z");
        assert_eq!(tokens[1].kind, TokenKind::IntegerBase);
        assert_eq!(tokens[1].text, "'sb");
        assert_eq!(tokens[3].kind, TokenKind::IntegerLiteral);
        assert_eq!(tokens[3].text, "'z");
    }

    #[test]
    fn trivia_attaches_to_the_following_token() {
        let (tokens, _) = lex("// header\nmodule m;\n");
        let module = &tokens[0];
        assert_eq!(module.kind, TokenKind::Keyword(Keyword::Module));
        assert_eq!(module.trivia.len(), 2);
        assert_eq!(module.trivia[0].kind, TriviaKind::LineComment);
        assert_eq!(module.trivia[0].text, "// header");
        assert_eq!(module.trivia[1].kind, TriviaKind::EndOfLine);
        assert!(module.starts_line());
    }

    #[test]
    fn line_continuations_are_distinct_from_newlines() {
        let (tokens, _) = lex("a \\\nb\n");
        assert!(tokens[1]
            .trivia
            .iter()
            .any(|trivia| trivia.kind == TriviaKind::LineContinuation));
        assert!(!tokens[1].starts_line());
    }

    #[test]
    fn directives_and_system_identifiers() {
        let (tokens, _) = lex("`define FOO $display");
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].directive_name(), Some("define"));
        assert_eq!(tokens[2].kind, TokenKind::SystemIdentifier);
        assert_eq!(tokens[2].text, "$display");
    }

    #[test]
    fn unterminated_strings_are_reported() {
        let (_, diags) = lex("\"no closing quote\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagCode::UnterminatedString);
    }

    #[test]
    fn error_limit_abandons_the_file() {
        let text = "\u{7f}".repeat(40);
        let sm = SourceManager::new();
        let id = sm.assign_text("bad.v", text, None);
        let buffer = sm.get(id).unwrap();
        let (_, diags) = lex_buffer(&buffer, &LexerOptions { max_errors: 4 });
        assert_eq!(
            diags.last().map(|diag| diag.code),
            Some(DiagCode::TooManyLexerErrors)
        );
        assert_eq!(diags.len(), 6);
    }

    #[test]
    fn multi_char_operators_lex_greedily() {
        let (tokens, _) = lex("a <= b === c :/ d :: e");
        let texts: Vec<&str> = tokens
            .iter()
            .filter(|token| matches!(token.kind, TokenKind::Operator | TokenKind::DoubleColon))
            .map(|token| token.text.as_str())
            .collect();
        assert_eq!(texts, vec!["<=", "===", ":/", "::"]);
    }
}
