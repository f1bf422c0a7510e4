use logos::{Logos, SpannedIter};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Failure raised by the logos callbacks; turned into a [`LexError`] once the span is known.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum LexicalError {
    #[default]
    InvalidToken,
    Number,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },
    #[error("invalid number '{literal}' at offset {offset}")]
    InvalidNumber { literal: String, offset: usize },
}

impl LexError {
    #[inline]
    pub fn offset(&self) -> usize {
        match self {
            Self::UnexpectedCharacter { offset, .. } | Self::InvalidNumber { offset, .. } => *offset,
        }
    }
}

#[derive(Clone, Debug, Logos, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+", error = LexicalError)]
pub enum Token<'source> {
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanEqual,
    #[token("==")]
    #[token("=")]
    Equal,
    #[token("!=")]
    NotEqual,
    #[token("AND")]
    And,
    #[token("OR")]
    Or,
    #[token("(")]
    LeftParenthesis,
    #[token(")")]
    RightParenthesis,
    #[regex(r"-?[0-9]+(\.[0-9]*)?", |lex| Decimal::from_str(lex.slice()).map_err(|_| LexicalError::Number))]
    NumberLiteral(Decimal),
    #[regex(r#"(\"(\\.|[^"\\])*\"|\'(\\.|[^'\\])*\')"#, |lex| { let slice = lex.slice(); &slice[1..slice.len() - 1] })]
    StringLiteral(&'source str),
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    BooleanLiteral(bool),
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Identifier(&'source str),
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LessThan => write!(f, "<"),
            Self::LessThanEqual => write!(f, "<="),
            Self::GreaterThan => write!(f, ">"),
            Self::GreaterThanEqual => write!(f, ">="),
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::LeftParenthesis => write!(f, "("),
            Self::RightParenthesis => write!(f, ")"),
            Self::NumberLiteral(value) => write!(f, "{value}"),
            Self::StringLiteral(value) => write!(f, "\"{value}\""),
            Self::BooleanLiteral(value) => write!(f, "{value}"),
            Self::Identifier(name) => write!(f, "{name}"),
        }
    }
}

pub type Spanned<Tok, Location, Error> = Result<(Location, Tok, Location), Error>;

pub struct Lexer<'input> {
    input: &'input str,
    token_stream: SpannedIter<'input, Token<'input>>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            token_stream: Token::lexer(input).spanned(),
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Spanned<Token<'input>, usize, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.token_stream.next().map(|(token, span)| match token {
            Ok(token) => Ok((span.start, token, span.end)),
            Err(LexicalError::Number) => Err(LexError::InvalidNumber {
                literal: self.input[span.clone()].to_owned(),
                offset: span.start,
            }),
            Err(LexicalError::InvalidToken) => Err(LexError::UnexpectedCharacter {
                // An empty span only happens at the end of the input.
                character: self.input[span.start..].chars().next().unwrap_or('\0'),
                offset: span.start,
            }),
        })
    }
}

/// Split a rule into its tokens along with their byte offsets.
///
/// ```rust
/// use rule_tree::{tokenize, Token};
///
/// let tokens = tokenize("age >= 18").unwrap();
/// let tokens: Vec<_> = tokens.into_iter().map(|(_, token, _)| token).collect();
/// assert_eq!(3, tokens.len());
/// assert_eq!(Token::Identifier("age"), tokens[0]);
/// ```
pub fn tokenize(input: &str) -> Result<Vec<(usize, Token<'_>, usize)>, LexError> {
    Lexer::new(input).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(input: &str) -> Result<Vec<Token<'_>>, LexError> {
        Lexer::new(input)
            .map(|value| match value {
                Ok((_, token, _)) => Ok(token),
                Err(error) => Err(error),
            })
            .collect()
    }

    #[test]
    fn can_lex_less_than() {
        let actual = lex_tokens("<").unwrap();
        assert_eq!(vec![Token::LessThan], actual);
    }

    #[test]
    fn can_lex_less_than_equal() {
        let actual = lex_tokens("<=").unwrap();
        assert_eq!(vec![Token::LessThanEqual], actual);
    }

    #[test]
    fn can_lex_greater_than() {
        let actual = lex_tokens(">").unwrap();
        assert_eq!(vec![Token::GreaterThan], actual);
    }

    #[test]
    fn can_lex_greater_than_equal() {
        let actual = lex_tokens(">=").unwrap();
        assert_eq!(vec![Token::GreaterThanEqual], actual);
    }

    #[test]
    fn can_lex_equal() {
        let actual = lex_tokens("==").unwrap();
        let other = lex_tokens("=").unwrap();
        assert_eq!(vec![Token::Equal], actual);
        assert_eq!(vec![Token::Equal], other);
    }

    #[test]
    fn can_lex_not_equal() {
        let actual = lex_tokens("!=").unwrap();
        assert_eq!(vec![Token::NotEqual], actual);
    }

    #[test]
    fn match_two_character_comparators_before_their_prefix() {
        let actual = lex_tokens("a>=1").unwrap();
        assert_eq!(
            vec![
                Token::Identifier("a"),
                Token::GreaterThanEqual,
                Token::NumberLiteral(Decimal::new(1, 0))
            ],
            actual
        );
    }

    #[test]
    fn can_lex_connectives() {
        let actual = lex_tokens("AND OR").unwrap();
        assert_eq!(vec![Token::And, Token::Or], actual);
    }

    #[test]
    fn lex_lowercase_connectives_as_identifiers() {
        let actual = lex_tokens("and ANDROID").unwrap();
        assert_eq!(
            vec![Token::Identifier("and"), Token::Identifier("ANDROID")],
            actual
        );
    }

    #[test]
    fn can_lex_parenthesis() {
        let actual = lex_tokens("(").unwrap();
        let other = lex_tokens(")").unwrap();
        assert_eq!(vec![Token::LeftParenthesis], actual);
        assert_eq!(vec![Token::RightParenthesis], other);
    }

    #[test]
    fn can_lex_integer() {
        let actual = lex_tokens("123").unwrap();
        assert_eq!(vec![Token::NumberLiteral(Decimal::new(123, 0))], actual);
    }

    #[test]
    fn can_lex_negative_integer() {
        let actual = lex_tokens("-123").unwrap();
        assert_eq!(vec![Token::NumberLiteral(Decimal::new(-123, 0))], actual);
    }

    #[test]
    fn can_lex_decimal() {
        let actual = lex_tokens("123.123").unwrap();
        let other = lex_tokens("123.").unwrap();
        assert_eq!(vec![Token::NumberLiteral(Decimal::new(123123, 3))], actual);
        assert_eq!(vec![Token::NumberLiteral(Decimal::new(123, 0))], other);
    }

    #[test]
    fn return_an_error_on_a_number_too_large_for_a_decimal() {
        let actual = lex_tokens("a > 99999999999999999999999999999999999");
        assert_eq!(
            Err(LexError::InvalidNumber {
                literal: "99999999999999999999999999999999999".to_owned(),
                offset: 4
            }),
            actual
        );
    }

    #[test]
    fn can_lex_boolean() {
        let actual = lex_tokens("true").unwrap();
        let other = lex_tokens("false").unwrap();
        assert_eq!(vec![Token::BooleanLiteral(true)], actual);
        assert_eq!(vec![Token::BooleanLiteral(false)], other);
    }

    #[test]
    fn can_lex_identifier() {
        let actual = lex_tokens("user_age2").unwrap();
        assert_eq!(vec![Token::Identifier("user_age2")], actual);
    }

    #[test]
    fn can_lex_empty_string() {
        let actual = lex_tokens("\"\"").unwrap();
        assert_eq!(vec![Token::StringLiteral("")], actual);
        let actual = lex_tokens("''").unwrap();
        assert_eq!(vec![Token::StringLiteral("")], actual);
    }

    #[test]
    fn can_lex_string() {
        let actual = lex_tokens("\"Sales\"").unwrap();
        assert_eq!(vec![Token::StringLiteral("Sales")], actual);
        let actual = lex_tokens("'Sales'").unwrap();
        assert_eq!(vec![Token::StringLiteral("Sales")], actual);
    }

    #[test]
    fn keep_escapes_raw_inside_string_literals() {
        let actual = lex_tokens(r#""say \"hi\"""#).unwrap();
        assert_eq!(vec![Token::StringLiteral(r#"say \"hi\""#)], actual);
    }

    #[test]
    fn return_an_error_with_the_offset_of_an_unknown_character() {
        let actual = lex_tokens("age > 3 # 4");
        assert_eq!(
            Err(LexError::UnexpectedCharacter {
                character: '#',
                offset: 8
            }),
            actual
        );
    }

    #[test]
    fn return_an_error_on_a_lone_bang() {
        let actual = lex_tokens("a ! 3");
        assert_eq!(
            Err(LexError::UnexpectedCharacter {
                character: '!',
                offset: 2
            }),
            actual
        );
    }

    #[test]
    fn return_an_error_on_an_unterminated_string() {
        let actual = lex_tokens("name == 'bob");
        assert!(matches!(
            actual,
            Err(LexError::UnexpectedCharacter {
                character: '\'',
                offset: 8
            })
        ));
    }

    #[test]
    fn tokenize_keeps_the_spans() {
        let actual = tokenize("(age > 30)").unwrap();
        assert_eq!(
            vec![
                (0, Token::LeftParenthesis, 1),
                (1, Token::Identifier("age"), 4),
                (5, Token::GreaterThan, 6),
                (7, Token::NumberLiteral(Decimal::new(30, 0)), 9),
                (9, Token::RightParenthesis, 10),
            ],
            actual
        );
    }

    #[test]
    fn can_lex_a_complete_rule() {
        let actual = lex_tokens(
            r#"((age > 30 AND department = 'Sales') OR (age < 25 AND department == "Marketing")) AND salary >= 50000.5 AND active != false"#,
        );

        assert_eq!(
            Ok(vec![
                Token::LeftParenthesis,
                Token::LeftParenthesis,
                Token::Identifier("age"),
                Token::GreaterThan,
                Token::NumberLiteral(Decimal::new(30, 0)),
                Token::And,
                Token::Identifier("department"),
                Token::Equal,
                Token::StringLiteral("Sales"),
                Token::RightParenthesis,
                Token::Or,
                Token::LeftParenthesis,
                Token::Identifier("age"),
                Token::LessThan,
                Token::NumberLiteral(Decimal::new(25, 0)),
                Token::And,
                Token::Identifier("department"),
                Token::Equal,
                Token::StringLiteral("Marketing"),
                Token::RightParenthesis,
                Token::RightParenthesis,
                Token::And,
                Token::Identifier("salary"),
                Token::GreaterThanEqual,
                Token::NumberLiteral(Decimal::new(500005, 1)),
                Token::And,
                Token::Identifier("active"),
                Token::NotEqual,
                Token::BooleanLiteral(false),
            ]),
            actual
        );
    }
}
