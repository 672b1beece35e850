use serde::{Deserialize, Serialize};

use super::ids::{EnumId, ExtendId, FieldId, MessageId, OneofId, OptionId};
use crate::error::DescriptorError;

/// Largest field number a message field may use.
pub const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Checks that `number` is usable as a message field number.
pub fn validate_field_number(number: i64) -> Result<i32, DescriptorError> {
    if (1..=i64::from(MAX_FIELD_NUMBER)).contains(&number) {
        Ok(number as i32)
    } else {
        Err(DescriptorError::FieldNumberOutOfRange(number))
    }
}

/// A half-open range of field numbers, `[start, end)`.
///
/// Both `extensions` and `reserved` clauses write ranges inclusively
/// (`100 to 199`); the parser converts them to this form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservedRange {
    pub start: i32,
    pub end: i32,
}

impl ReservedRange {
    /// Creates a half-open range, rejecting empty or inverted ones.
    pub fn new(start: i32, end: i32) -> Result<Self, DescriptorError> {
        if start >= end {
            return Err(DescriptorError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds `[start, last + 1)` from an inclusive pair as written in source.
    pub fn from_inclusive(start: i32, last: i32) -> Result<Self, DescriptorError> {
        let end = last
            .checked_add(1)
            .ok_or(DescriptorError::EmptyRange { start, end: last })?;
        Self::new(start, end)
    }

    pub fn contains(&self, number: i32) -> bool {
        self.start <= number && number < self.end
    }

    /// The inclusive upper bound, as it would be written in source.
    pub fn last(&self) -> i32 {
        self.end - 1
    }
}

/// An `extensions` range plus the options written after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRange {
    pub start: i32,
    pub end: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionId>,
}

impl ExtensionRange {
    pub fn new(range: ReservedRange) -> Self {
        Self {
            start: range.start,
            end: range.end,
            options: Vec::new(),
        }
    }

    pub fn contains(&self, number: i32) -> bool {
        self.start <= number && number < self.end
    }
}

/// A `oneof` group. Member fields live in the owning message's field list
/// and point back here through [`FieldDef::oneof`](super::FieldDef::oneof).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneofDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionId>,
}

impl OneofDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }
}

/// A `message` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageType {
    pub name: String,
    pub fields: Vec<FieldId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_messages: Vec<MessageId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_enums: Vec<EnumId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub oneofs: Vec<OneofId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extension_ranges: Vec<ExtensionRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ranges: Vec<ReservedRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
    /// Extension fields declared in `extend` blocks nested in this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<FieldId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extend_blocks: Vec<ExtendId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionId>,
}

impl MessageType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// True if `number` falls in a reserved range of this message.
    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges.iter().any(|r| r.contains(number))
    }

    pub fn is_reserved_name(&self, name: &str) -> bool {
        self.reserved_names.iter().any(|n| n == name)
    }

    pub fn is_extension_number(&self, number: i32) -> bool {
        self.extension_ranges.iter().any(|r| r.contains(number))
    }
}
