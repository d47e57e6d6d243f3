/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

/// Operations a caller can be authorized for.
/// Used by both the route table and the authorizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    ViewEntity,
    EditProfile,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ViewEntity => "view_entity",
            Operation::EditProfile => "edit_profile",
        }
    }
}
