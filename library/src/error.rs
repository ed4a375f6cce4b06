use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ClipError {
    #[error("unknown node: {0}")]
    UnknownNode(Uuid),
    #[error("node {node} has no input named '{input}'")]
    UnknownInput { node: Uuid, input: String },
    #[error("node {node} is not a {expected} node")]
    KindMismatch { node: Uuid, expected: &'static str },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
