use crate::{
    ast::{Connective, Node, MAX_DEPTH},
    lexer::{LexError, Lexer, Token},
};
use itertools::Itertools;
use lalrpop_util::{lalrpop_mod, ParseError as GrammarError};
use std::str::FromStr;
use thiserror::Error;

lalrpop_mod!(grammar);

use self::grammar::TreeParser;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0}")]
    Lexical(#[from] LexError),
    #[error("invalid token at offset {position}")]
    InvalidToken { position: usize },
    #[error(
        "unexpected token '{token}' at offset {position}, expected one of: {}",
        .expected.iter().join(", ")
    )]
    UnexpectedToken {
        token: String,
        position: usize,
        expected: Vec<String>,
    },
    #[error(
        "unexpected end of rule at offset {position}, expected one of: {}",
        .expected.iter().join(", ")
    )]
    UnexpectedEnd {
        position: usize,
        expected: Vec<String>,
    },
    #[error("unexpected token '{token}' at offset {position} after a complete rule")]
    ExtraToken { token: String, position: usize },
    #[error("rule nests deeper than {limit} levels at offset {position}")]
    TooDeep { position: usize, limit: usize },
}

impl ParseError {
    /// Byte offset of the token that made the rule invalid.
    pub fn position(&self) -> usize {
        match self {
            Self::Lexical(error) => error.offset(),
            Self::InvalidToken { position }
            | Self::UnexpectedToken { position, .. }
            | Self::UnexpectedEnd { position, .. }
            | Self::ExtraToken { position, .. }
            | Self::TooDeep { position, .. } => *position,
        }
    }
}

impl<'input> From<GrammarError<usize, Token<'input>, ParseError>> for ParseError {
    fn from(error: GrammarError<usize, Token<'input>, ParseError>) -> Self {
        match error {
            GrammarError::InvalidToken { location } => Self::InvalidToken { position: location },
            GrammarError::UnrecognizedEof { location, expected } => Self::UnexpectedEnd {
                position: location,
                expected: terminal_names(expected),
            },
            GrammarError::UnrecognizedToken {
                token: (start, token, _),
                expected,
            } => Self::UnexpectedToken {
                token: token.to_string(),
                position: start,
                expected: terminal_names(expected),
            },
            GrammarError::ExtraToken {
                token: (start, token, _),
            } => Self::ExtraToken {
                token: token.to_string(),
                position: start,
            },
            GrammarError::User { error } => error,
        }
    }
}

fn terminal_names(expected: Vec<String>) -> Vec<String> {
    expected
        .into_iter()
        .map(|name| name.trim_matches('"').to_owned())
        .collect()
}

/// Join two subtrees, refusing to grow the tree past [`MAX_DEPTH`].
pub(crate) fn nest<T>(
    connective: Connective,
    left: Node,
    right: Node,
    position: usize,
) -> Result<Node, GrammarError<usize, T, ParseError>> {
    if 1 + std::cmp::max(left.depth(), right.depth()) > MAX_DEPTH {
        return Err(GrammarError::User {
            error: ParseError::TooDeep {
                position,
                limit: MAX_DEPTH,
            },
        });
    }
    Ok(Node::operator(connective, left, right))
}

/// Parse a rule into its tree.
///
/// `AND` binds tighter than `OR`, both are left associative and parentheses group. Rules nesting
/// deeper than [`MAX_DEPTH`] are rejected.
///
/// ```rust
/// use rule_tree::{parse, Connective, Node};
///
/// let tree = parse("a > 1 OR b > 2 AND c > 3").unwrap();
/// assert!(matches!(tree, Node::Operator { connective: Connective::Or, .. }));
/// ```
#[inline]
pub fn parse(input: &str) -> Result<Node, ParseError> {
    let tokens = Lexer::new(input).map(|token| token.map_err(ParseError::from));
    let tree = TreeParser::new().parse(tokens)?;
    Ok(tree)
}

impl FromStr for Node {
    type Err = ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        parse(input)
    }
}
