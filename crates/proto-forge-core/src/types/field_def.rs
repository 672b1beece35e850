use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{OneofId, OptionId};

/// Field cardinality keyword, recorded exactly as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Optional,
    Required,
    Repeated,
}

impl Label {
    /// Maps a keyword to its label, if it is one.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "optional" => Some(Self::Optional),
            "required" => Some(Self::Required),
            "repeated" => Some(Self::Repeated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optional => "optional",
            Self::Required => "required",
            Self::Repeated => "repeated",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Built-in scalar types of the IDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Every scalar type, in declaration order.
    pub const ALL: [ScalarType; 15] = [
        Self::Double,
        Self::Float,
        Self::Int32,
        Self::Int64,
        Self::Uint32,
        Self::Uint64,
        Self::Sint32,
        Self::Sint64,
        Self::Fixed32,
        Self::Fixed64,
        Self::Sfixed32,
        Self::Sfixed64,
        Self::Bool,
        Self::String,
        Self::Bytes,
    ];

    /// Maps a type keyword to its scalar type.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.keyword() == keyword)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
        }
    }

    /// True for the integer types that cannot hold a negative value.
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            Self::Uint32 | Self::Uint64 | Self::Fixed32 | Self::Fixed64
        )
    }

    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            Self::Double | Self::Float | Self::Bool | Self::String | Self::Bytes
        )
    }

    pub fn is_floating_point(self) -> bool {
        matches!(self, Self::Double | Self::Float)
    }

    /// Scalar types allowed as map keys.
    pub fn is_valid_map_key(self) -> bool {
        !matches!(self, Self::Double | Self::Float | Self::Bytes)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The declared type of a field. Named types are left unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Scalar(ScalarType),
    /// A possibly qualified type name such as `Foo`, `pkg.Foo` or `.pkg.Foo`.
    Named(String),
}

impl FieldType {
    pub fn as_scalar(&self) -> Option<ScalarType> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Named(_) => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// A field declaration, either inside a message or an `extend` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub number: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oneof: Option<OneofId>,
    /// Set for extension fields declared inside `extend Foo { ... }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extendee: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionId>,
}

impl FieldDef {
    /// Creates a field with no label, default, oneof or options.
    pub fn new(name: impl Into<String>, number: i32, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            number,
            label: None,
            field_type,
            default_value: None,
            json_name: None,
            oneof: None,
            extendee: None,
            options: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn is_repeated(&self) -> bool {
        self.label == Some(Label::Repeated)
    }

    pub fn is_extension(&self) -> bool {
        self.extendee.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_keywords_roundtrip() {
        for scalar in ScalarType::ALL {
            assert_eq!(ScalarType::from_keyword(scalar.keyword()), Some(scalar));
        }
        assert_eq!(ScalarType::from_keyword("Int32"), None);
        assert_eq!(ScalarType::from_keyword("message"), None);
    }

    #[test]
    fn scalar_classification() {
        assert!(ScalarType::Uint64.is_unsigned());
        assert!(!ScalarType::Sint64.is_unsigned());
        assert!(ScalarType::Sfixed32.is_integer());
        assert!(!ScalarType::Bool.is_integer());
        assert!(ScalarType::Float.is_floating_point());
        assert!(!ScalarType::Bytes.is_valid_map_key());
        assert!(ScalarType::String.is_valid_map_key());
    }

    #[test]
    fn label_keywords() {
        assert_eq!(Label::from_keyword("repeated"), Some(Label::Repeated));
        assert_eq!(Label::from_keyword("optional"), Some(Label::Optional));
        assert_eq!(Label::from_keyword("Required"), None);
        assert_eq!(Label::Required.to_string(), "required");
    }

    #[test]
    fn field_builder() {
        let field = FieldDef::new("ids", 4, FieldType::Scalar(ScalarType::Int64))
            .with_label(Label::Repeated);
        assert!(field.is_repeated());
        assert!(!field.is_extension());
        assert_eq!(field.field_type.as_scalar(), Some(ScalarType::Int64));
    }

    #[test]
    fn field_type_display() {
        assert_eq!(FieldType::Scalar(ScalarType::Bytes).to_string(), "bytes");
        assert_eq!(FieldType::Named(".pkg.Foo".into()).to_string(), ".pkg.Foo");
    }

    #[test]
    fn serde_skips_absent_parts() {
        let field = FieldDef::new("name", 1, FieldType::Scalar(ScalarType::String));
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["name"], "name");
        assert_eq!(json["field_type"]["scalar"], "string");
        assert!(json.get("label").is_none());
        assert!(json.get("options").is_none());
    }
}
