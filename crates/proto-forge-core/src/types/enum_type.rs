use serde::{Deserialize, Serialize};

use super::ids::{EnumValueId, OptionId};
use crate::error::DescriptorError;

/// An enum reserved range. Unlike message ranges these are inclusive on
/// both ends, matching how the IDL writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumReservedRange {
    pub start: i32,
    pub end: i32,
}

impl EnumReservedRange {
    pub fn new(start: i32, end: i32) -> Result<Self, DescriptorError> {
        if start > end {
            return Err(DescriptorError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, number: i32) -> bool {
        self.start <= number && number <= self.end
    }
}

/// One `NAME = number;` entry of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionId>,
}

impl EnumValue {
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Self {
            name: name.into(),
            number,
            options: Vec::new(),
        }
    }
}

/// An `enum` declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<EnumValueId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_ranges: Vec<EnumReservedRange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionId>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges.iter().any(|r| r.contains(number))
    }
}
