//! Boolean rules over flat records.
//!
//! A rule is written as text, parsed into a binary tree of `AND`/`OR` operators whose leaves are
//! single conditions, evaluated against a record, edited structurally and stored under numeric
//! identifiers.
//!
//! # Examples
//!
//! ```
//! use rule_tree::{evaluate, modify, parse, Edit, Record, RuleStore, Value};
//!
//! let rule = "(age > 30 AND department = 'Sales') OR (age < 25 AND department = 'Marketing')";
//! let tree = parse(rule).unwrap();
//!
//! let mut record = Record::new();
//! record.insert("age".to_string(), Value::from(35));
//! record.insert("department".to_string(), Value::from("Sales"));
//! assert_eq!(Ok(true), evaluate(&tree, &record));
//!
//! // Edits return a new tree
//! let narrowed = modify(&tree, &Edit::RemoveOperand { field: "age".to_string() }).unwrap();
//! assert_eq!(
//!     parse("department = 'Sales' OR (age < 25 AND department = 'Marketing')").unwrap(),
//!     narrowed
//! );
//!
//! let store = RuleStore::new();
//! let id = store.put(rule, tree).unwrap();
//! assert_eq!(rule, store.get(id).unwrap().rule_string);
//! ```
//!
//! # Rule language
//!
//! * Conditions: `field comparator literal`, where `field` is an identifier
//!   (`[a-zA-Z_][a-zA-Z0-9_]*`);
//! * Comparators: `>`, `<`, `>=`, `<=`, `==` (or `=`) and `!=`;
//! * Literals: numbers (`30`, `-4.5`), strings in single or double quotes with backslash escapes
//!   and the booleans `true` and `false`;
//! * Connectives: `AND` binds tighter than `OR`, both are left associative and parentheses group.
//!
//! Numbers compare numerically, strings lexicographically and booleans only for (in)equality. A
//! condition on a field the record does not have, or whose value is of another kind than the
//! literal, is an error rather than `false`.
//!
//! # Wire format
//!
//! Trees serialize (with `serde`) as nested objects tagged by `type`:
//!
//! ```text
//! {"type": "operator", "value": "AND", "left": {...}, "right": {...}}
//! {"type": "operand", "value": ["age", ">", 30]}
//! ```
//!
//! Trees are at most [`MAX_DEPTH`] levels deep; parsing, combining and reading deeper ones fail.
//!
//! [`RuleService`] exposes every operation behind JSON requests and responses.
mod ast;
pub mod config;
mod error;
mod evaluation;
mod lexer;
mod modifier;
mod parser;
mod service;
mod store;
#[cfg(test)]
mod test_utils;
mod value;

pub use crate::{
    ast::{Comparator, Connective, Node, Operand, TreeNode, MAX_DEPTH},
    config::EngineConfig,
    error::Error,
    evaluation::{evaluate, EvalError},
    lexer::{tokenize, LexError, Token},
    modifier::{combine_all, modify, Edit, ModifyError},
    parser::{parse, ParseError},
    service::{EditDescriptor, Response, RuleService},
    store::{RuleId, RuleRecord, RuleStore, StoreError},
    value::{Record, Value, ValueKind},
};
