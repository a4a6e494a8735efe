//! Shell-style tokenization for argument strings and command files.

use std::env;

/// Controls recognized while splitting an argument string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenizeOptions {
    /// Substitute `$NAME` and `${NAME}` with environment values.
    pub expand_env_vars: bool,
    /// Recognize `#` line comments and `/* */` block comments.
    pub support_comments: bool,
}

/// Split `input` into argument tokens.
///
/// Double quotes group text and still expand environment variables; single
/// quotes group text verbatim. A backslash escapes the next character outside
/// single quotes.
pub fn tokenize(input: &str, options: TokenizeOptions) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            c if c.is_whitespace() => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            '#' if options.support_comments && !has_token => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if options.support_comments && !has_token && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            '\\' => {
                has_token = true;
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '\'' => {
                has_token = true;
                for next in chars.by_ref() {
                    if next == '\'' {
                        break;
                    }
                    current.push(next);
                }
            }
            '"' => {
                has_token = true;
                let mut quoted = String::new();
                while let Some(next) = chars.next() {
                    match next {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                quoted.push(escaped);
                            }
                        }
                        _ => quoted.push(next),
                    }
                }
                if options.expand_env_vars {
                    current.push_str(&expand_env_vars(&quoted));
                } else {
                    current.push_str(&quoted);
                }
            }
            '$' if options.expand_env_vars => {
                let expanded = read_env_reference(&mut chars);
                // An unset variable on its own contributes no token at all.
                if !expanded.is_empty() {
                    has_token = true;
                    current.push_str(&expanded);
                }
            }
            _ => {
                has_token = true;
                current.push(ch);
            }
        }
    }

    if has_token {
        tokens.push(current);
    }
    tokens
}

/// Substitute every `$NAME` / `${NAME}` reference in `text`.
///
/// Unknown variables expand to the empty string.
pub fn expand_env_vars(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '$' {
            result.push_str(&read_env_reference(&mut chars));
        } else {
            result.push(ch);
        }
    }
    result
}

fn read_env_reference(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut name = String::new();
    if chars.peek() == Some(&'{') {
        chars.next();
        while let Some(&next) = chars.peek() {
            chars.next();
            if next == '}' {
                break;
            }
            name.push(next);
        }
    } else {
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
    }

    if name.is_empty() {
        return "$".into();
    }
    env::var(&name).unwrap_or_default()
}
