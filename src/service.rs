//! JSON request handlers.
//!
//! Each handler takes the request body as JSON and answers with an HTTP-style status and a JSON
//! body. Missing or empty fields are client errors (400); anything failing after that, including
//! a request whose fields have the wrong shape, is reported as a 500 with the operation's prefix.

use crate::{
    ast::{Comparator, Connective, Node, Operand},
    error::Error,
    evaluation::evaluate,
    modifier::{combine_all, modify, Edit},
    parser::parse,
    store::{RuleId, RuleStore, StoreError},
    value::{Record, Value},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::fmt::Display;
use tracing::{debug, instrument, warn};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    pub status: u16,
    pub body: Json,
}

impl Response {
    #[inline]
    pub fn ok(body: Json) -> Self {
        Self { status: 200, body }
    }

    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    fn failure(context: &str, error: impl Display) -> Self {
        warn!(error = %error, "{context}");
        Self::with_message(500, format!("{context}: {error}"))
    }

    /// The `message` of the body, when it has one.
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Json::as_str)
    }
}

/// Modification descriptor of a `modify_rule` request, tagged by its `action`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditDescriptor {
    AddCondition {
        field: String,
        #[serde(rename = "operator")]
        comparator: Comparator,
        value: Value,
        #[serde(default)]
        connective: Connective,
    },
    Combine {
        #[serde(default)]
        connective: Connective,
        node: Node,
    },
    ReplaceCondition {
        field: String,
        #[serde(default, rename = "operator")]
        comparator: Option<Comparator>,
        #[serde(default)]
        value: Option<Value>,
    },
    RemoveCondition {
        field: String,
    },
    ChangeOperator {
        new_operator: Connective,
    },
}

impl From<EditDescriptor> for Edit {
    fn from(descriptor: EditDescriptor) -> Self {
        match descriptor {
            EditDescriptor::AddCondition {
                field,
                comparator,
                value,
                connective,
            } => Edit::Combine {
                connective,
                node: Node::Operand {
                    operand: Operand::new(field, comparator, value),
                },
            },
            EditDescriptor::Combine { connective, node } => Edit::Combine { connective, node },
            EditDescriptor::ReplaceCondition {
                field,
                comparator,
                value,
            } => Edit::ReplaceOperand {
                field,
                comparator,
                literal: value,
            },
            EditDescriptor::RemoveCondition { field } => Edit::RemoveOperand { field },
            EditDescriptor::ChangeOperator { new_operator } => Edit::ChangeConnective {
                connective: new_operator,
            },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RuleService {
    store: RuleStore,
}

impl RuleService {
    pub fn new(store: RuleStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// Answer one line of JSON-lines input.
    ///
    /// Every tree the engine produces, wrapped in any request, nests within the limits of the
    /// JSON reader.
    pub fn handle_line(&self, line: &str) -> Response {
        match serde_json::from_str(line) {
            Ok(request) => self.dispatch(&request),
            Err(error) => {
                warn!(%error, "malformed request");
                Response::with_message(400, format!("Invalid JSON request: {error}"))
            }
        }
    }

    /// Route a request carrying its handler name under `operation`.
    ///
    /// `get_rule` reads the identifier from `rule_id`.
    pub fn dispatch(&self, request: &Json) -> Response {
        match request.get("operation").and_then(Json::as_str) {
            Some("create_rule") => self.create_rule(request),
            Some("evaluate_rule") => self.evaluate_rule(request),
            Some("combine_rules") => self.combine_rules(request),
            Some("modify_rule") => self.modify_rule(request),
            Some("store_rule") => self.store_rule(request),
            Some("get_rule") => match request.get("rule_id").and_then(Json::as_u64) {
                Some(id) => self.get_rule(RuleId::from(id)),
                None => Response::with_message(400, "Missing rule_id"),
            },
            Some("list_rules") => self.list_rules(),
            Some(operation) => Response::with_message(404, format!("Unknown operation: {operation}")),
            None => Response::with_message(400, "No operation provided"),
        }
    }

    #[instrument(skip_all)]
    pub fn create_rule(&self, request: &Json) -> Response {
        let Some(rule) = field(request, "rule") else {
            return Response::with_message(400, "No rule string provided");
        };

        match parse_rule(rule) {
            Ok(tree) => {
                debug!(conditions = tree.operands().len(), "rule created");
                Response::ok(json!({ "message": "Rule created successfully", "AST": tree }))
            }
            Err(error) => Response::failure("Error creating rule", error),
        }
    }

    #[instrument(skip_all)]
    pub fn evaluate_rule(&self, request: &Json) -> Response {
        let (Some(tree), Some(record)) = (field(request, "AST"), field(request, "user_data"))
        else {
            return Response::with_message(400, "Missing AST or user data");
        };

        match evaluate_request(tree, record) {
            Ok(result) => {
                debug!(result, "rule evaluated");
                Response::ok(json!({ "message": "Rule evaluated", "result": result }))
            }
            Err(error) => Response::failure("Error evaluating rule", error),
        }
    }

    /// Combine two or more rule strings, `AND` unless the request names a `connective`.
    #[instrument(skip_all)]
    pub fn combine_rules(&self, request: &Json) -> Response {
        let Some(rules) = field(request, "rules").filter(|rules| has_two_items(rules)) else {
            return Response::with_message(400, "At least two rules are required for combination");
        };

        match combine_request(rules, request.get("connective")) {
            Ok(tree) => {
                debug!(depth = tree.depth(), "rules combined");
                Response::ok(json!({ "message": "Rules combined successfully", "AST": tree }))
            }
            Err(error) => Response::failure("Error combining rules", error),
        }
    }

    #[instrument(skip_all)]
    pub fn modify_rule(&self, request: &Json) -> Response {
        let (Some(tree), Some(modification)) =
            (field(request, "AST"), field(request, "modification"))
        else {
            return Response::with_message(400, "Missing AST or modification details");
        };

        match modify_request(tree, modification) {
            Ok(tree) => {
                debug!(conditions = tree.operands().len(), "rule modified");
                Response::ok(json!({ "message": "Rule modified successfully", "AST": tree }))
            }
            Err(error) => Response::failure("Error modifying rule", error),
        }
    }

    #[instrument(skip_all)]
    pub fn store_rule(&self, request: &Json) -> Response {
        let (Some(rule_string), Some(tree)) = (field(request, "rule_string"), field(request, "AST"))
        else {
            return Response::with_message(400, "Missing rule_string or AST");
        };

        match self.store_request(rule_string, tree) {
            Ok(id) => Response::ok(json!({ "message": "Rule stored successfully", "rule_id": id })),
            Err(error) => Response::failure("Error storing rule", error),
        }
    }

    #[instrument(skip(self))]
    pub fn get_rule(&self, id: RuleId) -> Response {
        match self.store.get(id) {
            Ok(record) => Response::ok(json!({
                "rule_string": record.rule_string,
                "AST": record.tree,
            })),
            Err(StoreError::NotFound(_)) => {
                debug!("rule not found");
                Response::with_message(404, "Rule not found")
            }
            Err(error) => Response::failure("Error retrieving rule", error),
        }
    }

    #[instrument(skip_all)]
    pub fn list_rules(&self) -> Response {
        match serde_json::to_value(self.store.list()) {
            Ok(rules) => Response::ok(json!({ "rules": rules })),
            Err(error) => Response::failure("Error listing rules", error),
        }
    }

    fn store_request(&self, rule_string: &Json, tree: &Json) -> Result<RuleId, Error> {
        let rule_string = String::deserialize(rule_string)?;
        let tree = Node::deserialize(tree)?;
        Ok(self.store.put(rule_string, tree)?)
    }
}

fn parse_rule(rule: &Json) -> Result<Node, Error> {
    let rule = String::deserialize(rule)?;
    Ok(parse(&rule)?)
}

fn evaluate_request(tree: &Json, record: &Json) -> Result<bool, Error> {
    let tree = Node::deserialize(tree)?;
    let record = Record::deserialize(record)?;
    Ok(evaluate(&tree, &record)?)
}

fn combine_request(rules: &Json, connective: Option<&Json>) -> Result<Node, Error> {
    let connective = match connective {
        None | Some(Json::Null) => Connective::default(),
        Some(connective) => Connective::deserialize(connective)?,
    };
    let trees = Vec::<String>::deserialize(rules)?
        .iter()
        .map(|rule| parse(rule))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(combine_all(trees, connective)?)
}

fn modify_request(tree: &Json, modification: &Json) -> Result<Node, Error> {
    let tree = Node::deserialize(tree)?;
    let edit = Edit::from(EditDescriptor::deserialize(modification)?);
    Ok(modify(&tree, &edit)?)
}

/// The field of the request, unless it is absent or empty.
fn field<'a>(request: &'a Json, name: &str) -> Option<&'a Json> {
    request.get(name).filter(|value| !is_blank(value))
}

/// Whether `rules` holds at least two entries. Scalars are let through to fail on their shape.
fn has_two_items(rules: &Json) -> bool {
    match rules {
        Json::Array(items) => items.len() >= 2,
        Json::String(text) => text.chars().count() >= 2,
        Json::Object(fields) => fields.len() >= 2,
        Json::Null | Json::Bool(_) | Json::Number(_) => true,
    }
}

fn is_blank(value: &Json) -> bool {
    match value {
        Json::Null => true,
        Json::Bool(flag) => !flag,
        Json::Number(number) => number.as_f64() == Some(0.0),
        Json::String(text) => text.is_empty(),
        Json::Array(items) => items.is_empty(),
        Json::Object(fields) => fields.is_empty(),
    }
}
