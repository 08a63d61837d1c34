/// Tokenizer for kernel source text.

use crate::core::parser::SyntaxError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Equals,
    Plus,
    Slash,
    /// A line break outside any brackets: separates statements.
    Newline,
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            Self::Ident(name) => format!("identifier '{}'", name),
            Self::Number(n) => format!("number {}", n),
            Self::Str(_) => "string literal".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
            Self::LBracket => "'['".to_string(),
            Self::RBracket => "']'".to_string(),
            Self::Comma => "','".to_string(),
            Self::Equals => "'='".to_string(),
            Self::Plus => "'+'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::Newline => "end of line".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Split `input` into tokens. Newlines inside `()` or `[]` are treated as
/// whitespace, and runs of statement-separating newlines are collapsed.
pub fn tokenize(input: &str) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0;
    let mut line = 1;
    let mut col = 1;
    let mut depth: usize = 0;

    while i < len {
        let c = chars[i];
        let (tok_line, tok_col) = (line, col);

        if c == '\n' {
            if depth == 0
                && !matches!(tokens.last().map(|t| &t.kind), None | Some(TokenKind::Newline))
            {
                tokens.push(Token {
                    kind: TokenKind::Newline,
                    line: tok_line,
                    column: tok_col,
                });
            }
            i += 1;
            line += 1;
            col = 1;
            continue;
        }

        if c.is_whitespace() {
            i += 1;
            col += 1;
            continue;
        }

        // Comment to end of line
        if c == '#' {
            while i < len && chars[i] != '\n' {
                i += 1;
                col += 1;
            }
            continue;
        }

        let simple = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            ',' => Some(TokenKind::Comma),
            '=' => Some(TokenKind::Equals),
            '+' => Some(TokenKind::Plus),
            '/' => Some(TokenKind::Slash),
            _ => None,
        };
        if let Some(kind) = simple {
            match kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth = depth.saturating_sub(1),
                _ => {}
            }
            tokens.push(Token {
                kind,
                line: tok_line,
                column: tok_col,
            });
            i += 1;
            col += 1;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < len && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            col += i - start;
            tokens.push(Token {
                kind: TokenKind::Ident(ident),
                line: tok_line,
                column: tok_col,
            });
            continue;
        }

        let negative_number = c == '-' && i + 1 < len && chars[i + 1].is_ascii_digit();
        if c.is_ascii_digit() || negative_number {
            let start = i;
            i += 1;
            while i < len && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < len && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                i += 1;
                while i < len && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            col += i - start;
            let value: f64 = text.parse().map_err(|_| {
                SyntaxError::new(tok_line, tok_col, format!("invalid number '{}'", text))
            })?;
            tokens.push(Token {
                kind: TokenKind::Number(value),
                line: tok_line,
                column: tok_col,
            });
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let mut buf = String::new();
            i += 1;
            col += 1;
            loop {
                if i >= len || chars[i] == '\n' {
                    return Err(SyntaxError::new(tok_line, tok_col, "unterminated string"));
                }
                let ch = chars[i];
                if ch == quote {
                    i += 1;
                    col += 1;
                    break;
                }
                if ch == '\\' {
                    if i + 1 >= len {
                        return Err(SyntaxError::new(tok_line, tok_col, "unterminated string"));
                    }
                    let escaped = match chars[i + 1] {
                        'n' => '\n',
                        't' => '\t',
                        '\\' => '\\',
                        '"' => '"',
                        '\'' => '\'',
                        other => {
                            return Err(SyntaxError::new(
                                line,
                                col,
                                format!("unknown escape '\\{}'", other),
                            ));
                        }
                    };
                    buf.push(escaped);
                    i += 2;
                    col += 2;
                    continue;
                }
                buf.push(ch);
                i += 1;
                col += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Str(buf),
                line: tok_line,
                column: tok_col,
            });
            continue;
        }

        return Err(SyntaxError::new(
            tok_line,
            tok_col,
            format!("unexpected character '{}'", c),
        ));
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
        column: col,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenize_call() {
        assert_eq!(
            kinds("Fear(Tim, 2.5)"),
            vec![
                TokenKind::Ident("Fear".into()),
                TokenKind::LParen,
                TokenKind::Ident("Tim".into()),
                TokenKind::Comma,
                TokenKind::Number(2.5),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_whitespace() {
        let k = kinds("A(x,\n  y)\n\n\nB");
        assert_eq!(
            k.iter().filter(|t| **t == TokenKind::Newline).count(),
            1,
            "only the statement break survives: {:?}",
            k
        );
    }

    #[test]
    fn leading_newlines_are_dropped() {
        assert_eq!(kinds("\n\nA"), vec![TokenKind::Ident("A".into()), TokenKind::Eof]);
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\"b\n""#),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("a\"b\n".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn negative_number() {
        assert_eq!(
            kinds("X / -1"),
            vec![
                TokenKind::Ident("X".into()),
                TokenKind::Slash,
                TokenKind::Number(-1.0),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("A # the hero\n"),
            vec![TokenKind::Ident("A".into()), TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn positions_are_tracked() {
        let toks = tokenize("A\n  B").unwrap();
        assert_eq!((toks[2].line, toks[2].column), (2, 3));
    }

    #[test]
    fn unterminated_string_error() {
        let err = tokenize("Say(\"hello").unwrap_err();
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn unexpected_character_error() {
        assert!(tokenize("A * B").is_err());
        assert!(tokenize("A; B").is_err());
    }
}
