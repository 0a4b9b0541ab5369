use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::LexError;

pub const KEYWORDS: &[&str] = &[
    "var", "function", "if", "else", "while", "for", "do", "copy", "animate", "to", "Cursor",
    "return",
];

// Alternation is leftmost-first, so the order below is the matching priority.
static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        \A(?:
            (?P<newline>\n)
          | (?P<whitespace>[\x20\t\r]+)
          | (?P<block_comment>/\*[\s\S]*?\*/)
          | (?P<comment>//[^\n]*)
          | (?P<number>\d+(?:\.\d+)?|\.\d+)
          | (?P<string>"[^"\n]*")
          | (?P<boolean>\b(?:true|false)\b)
          | (?P<identifier>[A-Za-z_]\w*)
          | (?P<access>\.)
          | (?P<operator>==|!=|<=|>=|&&|\|\||[-+*/%<>!])
          | (?P<delimiter>[(){};,:])
          | (?P<assign>=)
          | (?P<mismatch>.)
        )"#,
    )
    .expect("token pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Boolean,
    Identifier,
    Keyword,
    Operator,
    /// `.`
    AccessOperator,
    Delimiter,
    /// `=`
    Assign,
    Unknown,
}

/// Numeric literal value. Integral values are kept as `Int` so they print back without a fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Number::Int(value as i64)
        } else {
            Number::Float(value)
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Number::Int(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            // Keep a fraction or exponent so the value still reads back as a float.
            Number::Float(x) => {
                let text = x.to_string();
                if text.contains(['.', 'e', 'E']) || !x.is_finite() {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(Number),
    /// String contents, quotes stripped
    Str(String),
    Bool(bool),
    /// Raw source text: identifiers, keywords, operators, delimiters, unknown characters
    Lexeme(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: Literal,
    pub line: usize,
}

impl Token {
    fn lexeme(kind: TokenKind, text: &str, line: usize) -> Self {
        Self {
            kind,
            value: Literal::Lexeme(text.to_string()),
            line,
        }
    }

    /// True when the token has the given kind and raw text.
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && matches!(&self.value, Literal::Lexeme(s) if s == text)
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Literal::Lexeme(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Str(s) => write!(f, "\"{}\"", s),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Lexeme(s) => write!(f, "{}", s),
        }
    }
}

/// Scans the whole source. Never stops early: every character that is not
/// whitespace or comment ends up in some token, unrecognized ones as `Unknown`
/// with a matching entry in the error list.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut line = 1;
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];
        let Some(caps) = TOKEN_PATTERN.captures(rest) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        if whole.end() == 0 {
            break;
        }
        let text = whole.as_str();

        if caps.name("newline").is_some() {
            line += 1;
        } else if caps.name("whitespace").is_some() || caps.name("comment").is_some() {
            // skipped
        } else if caps.name("block_comment").is_some() {
            line += text.matches('\n').count();
        } else if caps.name("number").is_some() {
            match text.parse::<f64>() {
                Ok(value) => tokens.push(Token {
                    kind: TokenKind::Number,
                    value: Literal::Number(Number::from_f64(value)),
                    line,
                }),
                Err(_) => push_unknown(&mut tokens, &mut errors, text, line),
            }
        } else if caps.name("string").is_some() {
            tokens.push(Token {
                kind: TokenKind::String,
                value: Literal::Str(text[1..text.len() - 1].to_string()),
                line,
            });
        } else if caps.name("boolean").is_some() {
            tokens.push(Token {
                kind: TokenKind::Boolean,
                value: Literal::Bool(text == "true"),
                line,
            });
        } else if caps.name("identifier").is_some() {
            let kind = if KEYWORDS.contains(&text) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            };
            tokens.push(Token::lexeme(kind, text, line));
        } else if caps.name("access").is_some() {
            tokens.push(Token::lexeme(TokenKind::AccessOperator, text, line));
        } else if caps.name("operator").is_some() {
            tokens.push(Token::lexeme(TokenKind::Operator, text, line));
        } else if caps.name("delimiter").is_some() {
            tokens.push(Token::lexeme(TokenKind::Delimiter, text, line));
        } else if caps.name("assign").is_some() {
            tokens.push(Token::lexeme(TokenKind::Assign, text, line));
        } else {
            push_unknown(&mut tokens, &mut errors, text, line);
        }

        pos += whole.end();
    }

    // Whatever the patterns could not consume is reported character by character.
    for ch in source[pos..].chars() {
        if ch == '\n' {
            line += 1;
            continue;
        }
        push_unknown(&mut tokens, &mut errors, &ch.to_string(), line);
    }

    (tokens, errors)
}

fn push_unknown(tokens: &mut Vec<Token>, errors: &mut Vec<LexError>, text: &str, line: usize) {
    tokens.push(Token::lexeme(TokenKind::Unknown, text, line));
    errors.push(LexError {
        line,
        lexeme: text.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).0.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_are_single_tokens() {
        let (tokens, errors) = tokenize("42 3.5 .25 7.0");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 4);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Number));
        assert_eq!(tokens[0].value, Literal::Number(Number::Int(42)));
        assert_eq!(tokens[1].value, Literal::Number(Number::Float(3.5)));
        assert_eq!(tokens[2].value, Literal::Number(Number::Float(0.25)));
        assert_eq!(tokens[3].value, Literal::Number(Number::Int(7)));
    }

    #[test]
    fn out_of_range_integers_print_as_floats() {
        let (tokens, errors) = tokenize("100000000000000000000 2.5");
        assert!(errors.is_empty());
        assert!(matches!(tokens[0].value, Literal::Number(Number::Float(_))));
        assert_eq!(tokens[0].to_string(), "100000000000000000000.0");
        assert_eq!(tokens[1].to_string(), "2.5");
        assert_eq!(Number::Int(7).to_string(), "7");
    }

    #[test]
    fn minus_is_never_part_of_a_number() {
        assert_eq!(
            kinds("i-1"),
            vec![TokenKind::Identifier, TokenKind::Operator, TokenKind::Number]
        );
    }

    #[test]
    fn keywords_booleans_and_identifiers() {
        let (tokens, _) = tokenize("var truex = true; Cursor c");
        assert!(tokens[0].is(TokenKind::Keyword, "var"));
        assert!(tokens[1].is(TokenKind::Identifier, "truex"));
        assert_eq!(tokens[3].value, Literal::Bool(true));
        assert!(tokens[5].is(TokenKind::Keyword, "Cursor"));
        assert!(tokens[6].is(TokenKind::Identifier, "c"));
    }

    #[test]
    fn two_character_operators_win() {
        let (tokens, _) = tokenize("a <= b == c != d && e || !f = g");
        let texts: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(
            texts,
            vec!["a", "<=", "b", "==", "c", "!=", "d", "&&", "e", "||", "!", "f", "=", "g"]
        );
        assert_eq!(tokens[12].kind, TokenKind::Assign);
    }

    #[test]
    fn strings_lose_their_quotes() {
        let (tokens, errors) = tokenize("\"hello world\"");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].value, Literal::Str("hello world".to_string()));
    }

    #[test]
    fn comments_advance_line_numbers() {
        let source = "// one\n/* two\nthree\nfour */ x\ny";
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].line, 4);
        assert_eq!(tokens[1].line, 5);
    }

    #[test]
    fn unknown_characters_are_reported_and_skipped() {
        let (tokens, errors) = tokenize("a @ b\n#");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].kind, TokenKind::Unknown);
        assert_eq!(
            errors,
            vec![
                LexError { line: 1, lexeme: "@".to_string() },
                LexError { line: 2, lexeme: "#".to_string() },
            ]
        );
        assert!(tokens[2].is(TokenKind::Identifier, "b"));
    }

    #[test]
    fn unterminated_string_still_makes_progress() {
        let (tokens, errors) = tokenize("\"abc\nvar x");
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Unknown);
        assert!(tokens[1].is(TokenKind::Identifier, "abc"));
        assert!(tokens[2].is(TokenKind::Keyword, "var"));
        assert_eq!(tokens[2].line, 2);
    }

    #[test]
    fn access_operator_and_crlf() {
        assert_eq!(
            kinds("c.move(1, 2);\r\n"),
            vec![
                TokenKind::Identifier,
                TokenKind::AccessOperator,
                TokenKind::Identifier,
                TokenKind::Delimiter,
                TokenKind::Number,
                TokenKind::Delimiter,
                TokenKind::Number,
                TokenKind::Delimiter,
                TokenKind::Delimiter,
            ]
        );
    }
}
