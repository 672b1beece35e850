use serde::{Deserialize, Serialize};

use super::ids::FieldId;

/// An `extend Foo { ... }` block. The fields are stored in the file arena
/// with their `extendee` set to the same name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtendBlock {
    pub extendee: String,
    pub fields: Vec<FieldId>,
}

impl ExtendBlock {
    pub fn new(extendee: impl Into<String>) -> Self {
        Self {
            extendee: extendee.into(),
            fields: Vec::new(),
        }
    }
}
