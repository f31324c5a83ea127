//! Tokenizer for the function language

use super::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// A line terminator separates this token from the previous one
    pub(crate) newline_before: bool,
}

// Longest first so that `===` wins over `==` and `=`
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "(", ")", "{", "}", "[", "]",
    ",", ";", ":", "?", ".", "+", "-", "*", "/", "%", "<", ">", "!", "=",
];

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    Lexer {
        source,
        chars: source.char_indices().collect(),
        pos: 0,
    }
    .run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let newline_before = self.skip_trivia()?;
            let start = self.offset();
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    start,
                    end: start,
                    newline_before,
                });
                return Ok(tokens);
            };

            let kind = if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.number()?
            } else if c == '"' || c == '\'' {
                self.string(c)?
            } else if c == '`' {
                return Err(CompileError::new("template literals are not supported", start));
            } else if is_ident_start(c) {
                self.identifier()
            } else {
                self.punctuator()?
            };

            tokens.push(Token {
                kind,
                start,
                end: self.offset(),
                newline_before,
            });
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map_or(self.source.len(), |(i, _)| *i)
    }

    /// Skip whitespace and comments, reporting whether a newline was crossed
    fn skip_trivia(&mut self) -> Result<bool, CompileError> {
        let mut newline = false;
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some('\n' | '\r' | '\u{2028}' | '\u{2029}'), _) => {
                    newline = true;
                    self.bump();
                }
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.offset();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some('\n' | '\r') => newline = true,
                            Some(_) => {}
                            None => return Err(CompileError::new("unterminated comment", start)),
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn number(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.offset();
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.bump();
            self.bump();
            let digits_start = self.offset();
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.source[digits_start..self.offset()];
            #[allow(clippy::cast_precision_loss)]
            let parsed = u64::from_str_radix(digits, 16).map(|v| v as f64);
            return parsed
                .map(TokenKind::Number)
                .map_err(|_| CompileError::new("invalid hexadecimal literal", start));
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let has_digits = match self.peek_at(1) {
                Some('+' | '-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if !has_digits {
                return Err(CompileError::new("malformed exponent", self.offset()));
            }
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if self.peek().is_some_and(is_ident_start) {
            return Err(CompileError::new("identifier directly after number", self.offset()));
        }
        self.source[start..self.offset()]
            .parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| CompileError::new("invalid number literal", start))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, CompileError> {
        let start = self.offset();
        self.bump();
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(CompileError::new("unterminated string literal", start));
            };
            match c {
                c if c == quote => return Ok(TokenKind::Str(out)),
                '\n' | '\r' => return Err(CompileError::new("unterminated string literal", start)),
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), CompileError> {
        let at = self.offset();
        let Some(c) = self.bump() else {
            return Err(CompileError::new("unterminated escape sequence", at));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|n| n.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.hex_digits(2, at)?;
                out.push(char::from_u32(code).ok_or_else(|| CompileError::new("invalid escape", at))?);
            }
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.bump();
                    let digits_start = self.offset();
                    while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                        self.bump();
                    }
                    let digits = &self.source[digits_start..self.offset()];
                    if self.bump() != Some('}') {
                        return Err(CompileError::new("invalid unicode escape", at));
                    }
                    u32::from_str_radix(digits, 16)
                        .map_err(|_| CompileError::new("invalid unicode escape", at))?
                } else {
                    self.hex_digits(4, at)?
                };
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            // Line continuation
            '\n' => {}
            '\r' => {
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize, at: usize) -> Result<u32, CompileError> {
        let mut code = 0;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| CompileError::new("invalid escape sequence", at))?;
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.offset();
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        TokenKind::Ident(self.source[start..self.offset()].to_string())
    }

    fn punctuator(&mut self) -> Result<TokenKind, CompileError> {
        let start = self.offset();
        let rest = &self.source[start..];
        let Some(punct) = PUNCTUATORS.iter().find(|p| rest.starts_with(**p)) else {
            let c = self.peek().unwrap_or('?');
            return Err(CompileError::new(format!("unexpected character '{c}'"), start));
        };
        // Punctuators are ASCII, one char per byte
        for _ in 0..punct.len() {
            self.bump();
        }
        Ok(TokenKind::Punct(*punct))
    }
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn longest_punctuator_wins() {
        assert_eq!(
            kinds("a===b"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct("==="),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            kinds(r#"1.5e3 .5 0x1F 'a\'b' "A\n""#),
            vec![
                TokenKind::Number(1500.0),
                TokenKind::Number(0.5),
                TokenKind::Number(31.0),
                TokenKind::Str("a'b".into()),
                TokenKind::Str("A\n".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_newlines_are_tracked() {
        let tokens = tokenize("a // note\n/* block */ b").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("a".into()));
        assert!(tokens[1].newline_before);
        assert_eq!(tokens[1].kind, TokenKind::Ident("b".into()));
    }

    #[test]
    fn errors_carry_offsets() {
        let err = tokenize("a + `x`").unwrap_err();
        assert_eq!(err.offset(), 4);
        assert!(tokenize("'open").is_err());
        assert!(tokenize("1x").is_err());
        assert!(tokenize("a # b").is_err());
    }
}
