use crate::{
    ast::{Comparator, Connective, Node, Operand, MAX_DEPTH},
    value::Value,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModifyError {
    #[error("no condition on field '{0}' exists in the rule")]
    FieldNotFound(String),
    #[error("removing the last condition would leave the rule empty")]
    WouldEmptyTree,
    #[error("no comparator or value was given to replace the condition on field '{0}'")]
    NothingToReplace(String),
    #[error("the rule root is a single condition and has no operator to change")]
    NotAnOperator,
    #[error("at least two rules are required for combination, found {found}")]
    NotEnoughRules { found: usize },
    #[error("the combined rule would be {depth} levels deep, the limit is {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// A structural change applied to a tree by [`modify`].
#[derive(Clone, Debug, PartialEq)]
pub enum Edit {
    /// Join the current tree (left) and `node` (right) under a new root.
    Combine { connective: Connective, node: Node },
    /// Change the comparator and/or the literal of the first condition on `field`.
    ReplaceOperand {
        field: String,
        comparator: Option<Comparator>,
        literal: Option<Value>,
    },
    /// Remove the first condition on `field`; its sibling takes its parent's place.
    RemoveOperand { field: String },
    /// Change the connective of the root operator.
    ChangeConnective { connective: Connective },
}

/// Apply an edit, returning a new tree. The input tree is left untouched.
///
/// When several conditions use the same field, the first one in pre-order (depth-first, left to
/// right) is the one replaced or removed.
///
/// ```rust
/// use rule_tree::{modify, parse, Edit};
///
/// let tree = parse("a > 1 AND b > 2").unwrap();
/// let edited = modify(&tree, &Edit::RemoveOperand { field: "a".to_string() }).unwrap();
/// assert_eq!(parse("b > 2").unwrap(), edited);
/// ```
pub fn modify(tree: &Node, edit: &Edit) -> Result<Node, ModifyError> {
    match edit {
        Edit::Combine { connective, node } => {
            let depth = 1 + std::cmp::max(tree.depth(), node.depth());
            check_depth(depth)?;
            Ok(Node::operator(*connective, tree.clone(), node.clone()))
        }
        Edit::ReplaceOperand {
            field,
            comparator,
            literal,
        } => {
            if comparator.is_none() && literal.is_none() {
                return Err(ModifyError::NothingToReplace(field.clone()));
            }
            replace(tree, field, *comparator, literal.as_ref())
                .ok_or_else(|| ModifyError::FieldNotFound(field.clone()))
        }
        Edit::RemoveOperand { field } => match remove(tree, field) {
            Removal::NotFound => Err(ModifyError::FieldNotFound(field.clone())),
            Removal::Removed(None) => Err(ModifyError::WouldEmptyTree),
            Removal::Removed(Some(node)) => Ok(node),
        },
        Edit::ChangeConnective { connective } => match tree {
            Node::Operator { left, right, .. } => Ok(Node::Operator {
                connective: *connective,
                left: left.clone(),
                right: right.clone(),
            }),
            Node::Operand { .. } => Err(ModifyError::NotAnOperator),
        },
    }
}

/// Fold several trees, left to right, under the same connective.
///
/// Every tree after the first adds a level, so at most [`MAX_DEPTH`] - 1 trees can be combined.
pub fn combine_all<I>(trees: I, connective: Connective) -> Result<Node, ModifyError>
where
    I: IntoIterator<Item = Node>,
{
    let mut trees = trees.into_iter();
    let Some(first) = trees.next() else {
        return Err(ModifyError::NotEnoughRules { found: 0 });
    };
    let Some(second) = trees.next() else {
        return Err(ModifyError::NotEnoughRules { found: 1 });
    };
    let depth = 1 + std::cmp::max(first.depth(), second.depth());
    check_depth(depth)?;
    let combined = (Node::operator(connective, first, second), depth);
    let (combined, _) = trees.try_fold(combined, |(combined, depth), tree| {
        let depth = 1 + std::cmp::max(depth, tree.depth());
        check_depth(depth)?;
        Ok::<_, ModifyError>((Node::operator(connective, combined, tree), depth))
    })?;
    Ok(combined)
}

fn check_depth(depth: usize) -> Result<(), ModifyError> {
    if depth > MAX_DEPTH {
        return Err(ModifyError::TooDeep {
            depth,
            limit: MAX_DEPTH,
        });
    }
    Ok(())
}

impl Node {
    #[inline]
    pub fn modify(&self, edit: &Edit) -> Result<Node, ModifyError> {
        modify(self, edit)
    }
}

fn replace(
    node: &Node,
    field: &str,
    comparator: Option<Comparator>,
    literal: Option<&Value>,
) -> Option<Node> {
    match node {
        Node::Operand { operand } if operand.field == field => Some(Node::Operand {
            operand: Operand {
                field: operand.field.clone(),
                comparator: comparator.unwrap_or(operand.comparator),
                literal: literal.cloned().unwrap_or_else(|| operand.literal.clone()),
            },
        }),
        Node::Operand { .. } => None,
        Node::Operator {
            connective,
            left,
            right,
        } => {
            if let Some(left) = replace(left, field, comparator, literal) {
                return Some(Node::Operator {
                    connective: *connective,
                    left: Box::new(left),
                    right: right.clone(),
                });
            }
            replace(right, field, comparator, literal).map(|right| Node::Operator {
                connective: *connective,
                left: left.clone(),
                right: Box::new(right),
            })
        }
    }
}

enum Removal {
    NotFound,
    /// The matching operand was removed; `None` when nothing is left of the visited subtree.
    Removed(Option<Node>),
}

fn remove(node: &Node, field: &str) -> Removal {
    match node {
        Node::Operand { operand } if operand.field == field => Removal::Removed(None),
        Node::Operand { .. } => Removal::NotFound,
        Node::Operator {
            connective,
            left,
            right,
        } => match remove(left, field) {
            Removal::Removed(None) => Removal::Removed(Some(right.as_ref().clone())),
            Removal::Removed(Some(left)) => Removal::Removed(Some(Node::Operator {
                connective: *connective,
                left: Box::new(left),
                right: right.clone(),
            })),
            Removal::NotFound => match remove(right, field) {
                Removal::Removed(None) => Removal::Removed(Some(left.as_ref().clone())),
                Removal::Removed(Some(right)) => Removal::Removed(Some(Node::Operator {
                    connective: *connective,
                    left: left.clone(),
                    right: Box::new(right),
                })),
                Removal::NotFound => Removal::NotFound,
            },
        },
    }
}
