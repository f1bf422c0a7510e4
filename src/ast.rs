use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type TreeNode = Box<Node>;

/// The deepest tree that can be parsed, combined or read back from JSON.
///
/// A tree of this depth still nests well below the 128 levels `serde_json` accepts by default,
/// even once wrapped in a request or a snapshot.
pub const MAX_DEPTH: usize = 100;

/// A boolean rule.
///
/// Leaves are always [`Node::Operand`]s and every [`Node::Operator`] owns exactly two children.
/// On the wire, the node is tagged by its `type`:
///
/// ```json
/// { "type": "operator", "value": "AND", "left": { ... }, "right": { ... } }
/// { "type": "operand", "value": ["age", ">", 30] }
/// ```
///
/// Trees deeper than [`MAX_DEPTH`] are rejected on input.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", try_from = "WireNode")]
pub enum Node {
    Operator {
        #[serde(rename = "value")]
        connective: Connective,
        left: TreeNode,
        right: TreeNode,
    },
    Operand {
        #[serde(rename = "value")]
        operand: Operand,
    },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireNode {
    Operator {
        value: Connective,
        left: TreeNode,
        right: TreeNode,
    },
    Operand {
        value: Operand,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("tree is {depth} levels deep, the limit is {limit}")]
pub(crate) struct TooDeep {
    depth: usize,
    limit: usize,
}

impl TryFrom<WireNode> for Node {
    type Error = TooDeep;

    fn try_from(node: WireNode) -> Result<Self, Self::Error> {
        match node {
            WireNode::Operator { value, left, right } => {
                let depth = 1 + std::cmp::max(left.depth(), right.depth());
                if depth > MAX_DEPTH {
                    return Err(TooDeep {
                        depth,
                        limit: MAX_DEPTH,
                    });
                }
                Ok(Self::Operator {
                    connective: value,
                    left,
                    right,
                })
            }
            WireNode::Operand { value } => Ok(Self::Operand { operand: value }),
        }
    }
}

#[derive(Debug, Hash, Clone, Copy, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connective {
    #[default]
    And,
    Or,
}

#[derive(Debug, Hash, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterThanEqual,
    #[serde(rename = "<=")]
    LessThanEqual,
    #[serde(rename = "==", alias = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
}

impl Comparator {
    #[inline]
    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::Equal | Self::NotEqual)
    }
}

/// A single `field comparator literal` condition.
#[derive(PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(
    from = "(String, Comparator, Value)",
    into = "(String, Comparator, Value)"
)]
pub struct Operand {
    pub field: String,
    pub comparator: Comparator,
    pub literal: Value,
}

impl Operand {
    pub fn new(field: impl Into<String>, comparator: Comparator, literal: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            comparator,
            literal: literal.into(),
        }
    }
}

impl From<(String, Comparator, Value)> for Operand {
    fn from((field, comparator, literal): (String, Comparator, Value)) -> Self {
        Self {
            field,
            comparator,
            literal,
        }
    }
}

impl From<Operand> for (String, Comparator, Value) {
    fn from(operand: Operand) -> Self {
        (operand.field, operand.comparator, operand.literal)
    }
}

impl Node {
    #[inline]
    pub fn operator(connective: Connective, left: Node, right: Node) -> Self {
        Self::Operator {
            connective,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[inline]
    pub fn and(left: Node, right: Node) -> Self {
        Self::operator(Connective::And, left, right)
    }

    #[inline]
    pub fn or(left: Node, right: Node) -> Self {
        Self::operator(Connective::Or, left, right)
    }

    #[inline]
    pub fn operand(
        field: impl Into<String>,
        comparator: Comparator,
        literal: impl Into<Value>,
    ) -> Self {
        Self::Operand {
            operand: Operand::new(field, comparator, literal),
        }
    }

    /// The operands of the tree, left to right.
    pub fn operands(&self) -> Vec<&Operand> {
        let mut operands = Vec::new();
        self.collect_operands(&mut operands);
        operands
    }

    fn collect_operands<'a>(&'a self, operands: &mut Vec<&'a Operand>) {
        match self {
            Self::Operator { left, right, .. } => {
                left.collect_operands(operands);
                right.collect_operands(operands);
            }
            Self::Operand { operand } => operands.push(operand),
        }
    }

    /// The number of levels in the tree; a lone operand has a depth of 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Operator { left, right, .. } => 1 + std::cmp::max(left.depth(), right.depth()),
            Self::Operand { .. } => 1,
        }
    }

    fn binding(&self) -> Option<Connective> {
        match self {
            Self::Operator { connective, .. } => Some(*connective),
            Self::Operand { .. } => None,
        }
    }
}

impl Display for Connective {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::And => write!(formatter, "AND"),
            Self::Or => write!(formatter, "OR"),
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        let symbol = match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanEqual => ">=",
            Self::LessThanEqual => "<=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
        };
        write!(formatter, "{symbol}")
    }
}

impl Display for Operand {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        write!(
            formatter,
            "{} {} {}",
            self.field, self.comparator, self.literal
        )
    }
}

/// Render the tree back to rule text that parses to the same tree.
///
/// Parentheses are only added where precedence or left associativity would otherwise regroup the
/// children.
impl Display for Node {
    fn fmt(&self, formatter: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Operand { operand } => write!(formatter, "{operand}"),
            Self::Operator {
                connective,
                left,
                right,
            } => {
                let wrap_left = matches!(
                    (connective, left.binding()),
                    (Connective::And, Some(Connective::Or))
                );
                let wrap_right = match (connective, right.binding()) {
                    (_, None) => false,
                    (Connective::Or, Some(Connective::And)) => false,
                    _ => true,
                };
                write_child(formatter, left, wrap_left)?;
                write!(formatter, " {connective} ")?;
                write_child(formatter, right, wrap_right)
            }
        }
    }
}

fn write_child(formatter: &mut Formatter, child: &Node, wrap: bool) -> std::fmt::Result {
    if wrap {
        write!(formatter, "({child})")
    } else {
        write!(formatter, "{child}")
    }
}
