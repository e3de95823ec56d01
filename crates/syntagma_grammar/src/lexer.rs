//! Scanner for grammar files.
//!
//! A hand-written byte-walking lexer. Produces one [`Token`] per call,
//! with `Eof` repeated once the input is exhausted. `//` line comments
//! and `/* */` block comments are skipped like whitespace.
//!
//! String literals understand the escapes `\r`, `\n`, `\t`, `\"`,
//! `\'` and `\\`. A `'`-delimited literal must contain exactly one
//! character and is scanned into the same token kind as a string.

use crate::token::{Token, TokenKind, TokenValue};
use syntagma_base::{FilePos, Interner, Result, Symbol, SynError};

pub struct Lexer<'src, 'i> {
    bytes: &'src [u8],
    interner: &'i mut Interner,
    file: Symbol,
    pos: usize,
    line: u32,
    column: u32,
    buffer: String,
}

impl<'src, 'i> Lexer<'src, 'i> {
    pub fn new(source: &'src str, file_name: &str, interner: &'i mut Interner) -> Self {
        let file = interner.intern(file_name);
        Lexer {
            bytes: source.as_bytes(),
            interner,
            file,
            pos: 0,
            line: 1,
            column: 1,
            buffer: String::new(),
        }
    }

    fn here(&self) -> FilePos {
        FilePos::new(self.file, self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<u8> {
        self.bytes.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn skip_blank(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek2() == Some(b'/') => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some(b'/') if self.peek2() == Some(b'*') => {
                    let start = self.here();
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            Some(b'*') if self.peek2() == Some(b'/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                            None => {
                                return Err(SynError::new("Unterminated comment", start));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Scans the next token.
    pub fn scan_token(&mut self) -> Result<Token> {
        self.skip_blank()?;
        let pos = self.here();

        let byte = match self.peek() {
            Some(byte) => byte,
            None => {
                return Ok(Token {
                    kind: TokenKind::Eof,
                    pos,
                    value: TokenValue::None,
                })
            }
        };

        if is_name_start(byte) {
            return Ok(self.scan_name(pos));
        }
        if byte.is_ascii_digit() {
            return self.scan_number(pos);
        }
        if byte == b'"' {
            return self.scan_string(pos);
        }
        if byte == b'\'' {
            return self.scan_char_literal(pos);
        }
        self.scan_operator(pos)
    }

    fn scan_name(&mut self, pos: FilePos) -> Token {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if !is_name_part(byte) {
                break;
            }
            self.advance();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).expect("ascii identifier");

        let kind = match text {
            "type" => TokenKind::KwType,
            "token" => TokenKind::KwToken,
            "this" => TokenKind::KwThis,
            "true" => TokenKind::KwTrue,
            "false" => TokenKind::KwFalse,
            _ => TokenKind::Name,
        };
        let value = if kind == TokenKind::Name {
            TokenValue::Text(self.interner.intern(text))
        } else {
            TokenValue::None
        };
        Token { kind, pos, value }
    }

    fn scan_number(&mut self, pos: FilePos) -> Result<Token> {
        let mut value: i64 = 0;
        while let Some(byte) = self.peek() {
            if !byte.is_ascii_digit() {
                break;
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add((byte - b'0') as i64))
                .ok_or_else(|| SynError::new("Number literal is too large", pos))?;
            self.advance();
        }
        Ok(Token {
            kind: TokenKind::Number,
            pos,
            value: TokenValue::Number(value),
        })
    }

    fn scan_escape(&mut self, pos: FilePos) -> Result<char> {
        self.advance(); // the backslash
        match self.advance() {
            Some(b'r') => Ok('\r'),
            Some(b'n') => Ok('\n'),
            Some(b't') => Ok('\t'),
            Some(b'"') => Ok('"'),
            Some(b'\'') => Ok('\''),
            Some(b'\\') => Ok('\\'),
            _ => Err(SynError::new("Invalid escape sequence", pos)),
        }
    }

    fn scan_string(&mut self, pos: FilePos) -> Result<Token> {
        self.advance(); // opening quote
        self.buffer.clear();
        loop {
            match self.peek() {
                None | Some(b'\n') | Some(b'\r') => {
                    return Err(SynError::new("Unterminated string literal", pos));
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    let ch = self.scan_escape(pos)?;
                    self.buffer.push(ch);
                }
                Some(byte) => {
                    self.advance();
                    self.buffer.push(byte as char);
                }
            }
        }
        let sym = self.interner.intern(&self.buffer);
        Ok(Token {
            kind: TokenKind::Str,
            pos,
            value: TokenValue::Text(sym),
        })
    }

    fn scan_char_literal(&mut self, pos: FilePos) -> Result<Token> {
        self.advance(); // opening quote
        let ch = match self.peek() {
            None | Some(b'\n') | Some(b'\r') => {
                return Err(SynError::new("Unterminated character literal", pos));
            }
            Some(b'\'') => {
                return Err(SynError::new("Empty character literal", pos));
            }
            Some(b'\\') => self.scan_escape(pos)?,
            Some(byte) => {
                self.advance();
                byte as char
            }
        };
        if self.peek() != Some(b'\'') {
            return Err(SynError::new("Unterminated character literal", pos));
        }
        self.advance();

        self.buffer.clear();
        self.buffer.push(ch);
        let sym = self.interner.intern(&self.buffer);
        Ok(Token {
            kind: TokenKind::Str,
            pos,
            value: TokenValue::Text(sym),
        })
    }

    fn scan_operator(&mut self, pos: FilePos) -> Result<Token> {
        let byte = self.advance().expect("operator byte");
        let kind = match byte {
            b';' => TokenKind::Semicolon,
            b'@' => TokenKind::At,
            b':' => {
                if self.peek() == Some(b':') {
                    self.advance();
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                }
            }
            b'{' => TokenKind::OpenBrace,
            b'}' => TokenKind::CloseBrace,
            b'|' => TokenKind::Pipe,
            b'=' => TokenKind::Assign,
            b'(' => TokenKind::OpenParen,
            b')' => TokenKind::CloseParen,
            b'?' => TokenKind::Question,
            b'*' => TokenKind::Asterisk,
            b'+' => TokenKind::Plus,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b'-' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    return Err(SynError::new("Unexpected character '-'", pos));
                }
            }
            other => {
                return Err(SynError::new(
                    format!("Unexpected character '{}'", other as char),
                    pos,
                ));
            }
        };
        Ok(Token {
            kind,
            pos,
            value: TokenValue::None,
        })
    }
}

fn is_name_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_name_part(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(source: &str) -> Vec<TokenKind> {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(source, "test.syn", &mut interner);
        let mut kinds = Vec::new();
        loop {
            let token = lexer.scan_token().expect("lexes");
            let kind = token.kind;
            kinds.push(kind);
            if kind == TokenKind::Eof {
                return kinds;
            }
        }
    }

    #[test]
    fn scans_a_terminal_declaration() {
        assert_eq!(
            scan_all("token NUMBER {int};"),
            vec![
                TokenKind::KwToken,
                TokenKind::Name,
                TokenKind::OpenBrace,
                TokenKind::Name,
                TokenKind::CloseBrace,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_colon_from_double_colon() {
        assert_eq!(
            scan_all("a : b::c"),
            vec![
                TokenKind::Name,
                TokenKind::Colon,
                TokenKind::Name,
                TokenKind::ColonColon,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_not_names() {
        assert_eq!(
            scan_all("this type token true false thisx"),
            vec![
                TokenKind::KwThis,
                TokenKind::KwType,
                TokenKind::KwToken,
                TokenKind::KwTrue,
                TokenKind::KwFalse,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escapes_are_decoded() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new(r#""a\t\"b\\""#, "t.syn", &mut interner);
        let token = lexer.scan_token().unwrap();
        assert_eq!(token.kind, TokenKind::Str);
        assert_eq!(interner.resolve(token.text()), "a\t\"b\\");
    }

    #[test]
    fn char_literal_is_a_one_character_string() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("'+'", "t.syn", &mut interner);
        let token = lexer.scan_token().unwrap();
        assert_eq!(token.kind, TokenKind::Str);
        assert_eq!(interner.resolve(token.text()), "+");
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            scan_all("a // rest of line\n/* block\nspanning */ b"),
            vec![TokenKind::Name, TokenKind::Name, TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("\"abc", "t.syn", &mut interner);
        let err = lexer.scan_token().unwrap_err();
        assert!(err.message.contains("Unterminated"));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("a\n  bc", "t.syn", &mut interner);
        let a = lexer.scan_token().unwrap();
        assert_eq!((a.pos.line, a.pos.column), (1, 1));
        let bc = lexer.scan_token().unwrap();
        assert_eq!((bc.pos.line, bc.pos.column), (2, 3));
    }

    #[test]
    fn lone_minus_is_rejected() {
        let mut interner = Interner::new();
        let mut lexer = Lexer::new("a - b", "t.syn", &mut interner);
        lexer.scan_token().unwrap();
        assert!(lexer.scan_token().is_err());
    }
}
