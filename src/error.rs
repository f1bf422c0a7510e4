use crate::{
    evaluation::EvalError, lexer::LexError, modifier::ModifyError, parser::ParseError,
    store::StoreError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Evaluation(#[from] EvalError),
    #[error(transparent)]
    Modification(#[from] ModifyError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid request => {0}")]
    Request(#[from] serde_json::Error),
}
