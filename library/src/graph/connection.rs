//! Connection model for the node graph.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a specific input slot on a specific node.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InputId {
    pub node: Uuid,
    pub input: String,
}

impl InputId {
    pub fn new(node: Uuid, input: &str) -> InputId {
        InputId {
            node,
            input: input.to_string(),
        }
    }
}

/// An edge from a node's output into another node's input slot. Inputs are
/// single-slot: connecting over an existing edge replaces it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Connection {
    pub id: Uuid,
    /// Source node (its single output).
    pub from: Uuid,
    /// Destination input slot.
    pub to: InputId,
}

impl Connection {
    pub fn new(from: Uuid, to: InputId) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            from,
            to,
        }
    }
}
