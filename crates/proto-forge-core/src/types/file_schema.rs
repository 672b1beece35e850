use std::fmt;

use serde::{Deserialize, Serialize};

use super::enum_type::{EnumType, EnumValue};
use super::extend_block::ExtendBlock;
use super::field_def::FieldDef;
use super::ids::{
    EnumId, EnumValueId, ExtendId, FieldId, MessageId, MethodId, OneofId, OptionId, ServiceId,
};
use super::message_type::{MessageType, OneofDef};
use super::option_def::OptionDef;
use super::service_type::{MethodDef, ServiceType};
use crate::error::DescriptorError;

/// Grammar mode selected by the `syntax` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Syntax {
    /// The legacy grammar: every field needs a label. Assumed when a file
    /// has no `syntax` statement.
    #[default]
    Proto2,
    Proto3,
}

impl Syntax {
    pub fn parse(s: &str) -> Result<Self, DescriptorError> {
        match s {
            "proto2" => Ok(Self::Proto2),
            "proto3" => Ok(Self::Proto3),
            other => Err(DescriptorError::UnknownSyntax(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Proto2 => "proto2",
            Self::Proto3 => "proto3",
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! arena_access {
    ($arena:ident, $id:ty, $node:ty, $get:ident, $get_mut:ident, $add:ident, $iter:ident) => {
        pub fn $get(&self, id: $id) -> &$node {
            &self.$arena[id.index()]
        }

        pub fn $get_mut(&mut self, id: $id) -> &mut $node {
            &mut self.$arena[id.index()]
        }

        /// Stores a node in the arena and returns its id. The node is not
        /// linked into any parent; the caller pushes the id where it belongs.
        pub fn $add(&mut self, node: $node) -> $id {
            self.$arena.push(node);
            <$id>::from_index(self.$arena.len() - 1)
        }

        pub fn $iter(&self) -> impl Iterator<Item = ($id, &$node)> {
            self.$arena
                .iter()
                .enumerate()
                .map(|(i, node)| (<$id>::from_index(i), node))
        }
    };
}

/// The root of an unlinked descriptor tree: one parsed schema file.
///
/// Every node lives in a per-kind arena owned by the file; parents refer to
/// children by id and no node refers to its parent. Type references inside
/// fields, methods and extend blocks are plain names resolved later by a
/// linker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax: Option<Syntax>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Indices into `dependencies` of `import public` entries.
    #[serde(default)]
    pub public_dependencies: Vec<usize>,
    /// Indices into `dependencies` of `import weak` entries.
    #[serde(default)]
    pub weak_dependencies: Vec<usize>,
    #[serde(default)]
    pub options: Vec<OptionId>,
    #[serde(default)]
    pub message_types: Vec<MessageId>,
    #[serde(default)]
    pub enum_types: Vec<EnumId>,
    /// Top-level extension fields, in declaration order.
    #[serde(default)]
    pub extensions: Vec<FieldId>,
    #[serde(default)]
    pub extend_blocks: Vec<ExtendId>,
    #[serde(default)]
    pub services: Vec<ServiceId>,

    messages: Vec<MessageType>,
    fields: Vec<FieldDef>,
    oneof_defs: Vec<OneofDef>,
    enums: Vec<EnumType>,
    enum_values: Vec<EnumValue>,
    service_defs: Vec<ServiceType>,
    methods: Vec<MethodDef>,
    extends: Vec<ExtendBlock>,
    option_defs: Vec<OptionDef>,
}

impl FileSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The grammar mode in effect, defaulting to the legacy one.
    pub fn effective_syntax(&self) -> Syntax {
        self.syntax.unwrap_or_default()
    }

    arena_access!(messages, MessageId, MessageType, message, message_mut, add_message, all_messages);
    arena_access!(fields, FieldId, FieldDef, field, field_mut, add_field, all_fields);
    arena_access!(oneof_defs, OneofId, OneofDef, oneof, oneof_mut, add_oneof, all_oneofs);
    arena_access!(enums, EnumId, EnumType, enum_type, enum_type_mut, add_enum, all_enums);
    arena_access!(enum_values, EnumValueId, EnumValue, enum_value, enum_value_mut, add_enum_value, all_enum_values);
    arena_access!(service_defs, ServiceId, ServiceType, service, service_mut, add_service, all_services);
    arena_access!(methods, MethodId, MethodDef, method, method_mut, add_method, all_methods);
    arena_access!(extends, ExtendId, ExtendBlock, extend_block, extend_block_mut, add_extend_block, all_extend_blocks);
    arena_access!(option_defs, OptionId, OptionDef, option, option_mut, add_option, all_options);

    /// Appends a dependency, returning its index in `dependencies`.
    pub fn add_dependency(&mut self, name: impl Into<String>) -> usize {
        self.dependencies.push(name.into());
        self.dependencies.len() - 1
    }

    pub fn is_public_dependency(&self, index: usize) -> bool {
        self.public_dependencies.contains(&index)
    }

    pub fn is_weak_dependency(&self, index: usize) -> bool {
        self.weak_dependencies.contains(&index)
    }

    /// Looks up a top-level message by its simple name.
    pub fn find_message(&self, name: &str) -> Option<MessageId> {
        self.message_types
            .iter()
            .copied()
            .find(|id| self.message(*id).name == name)
    }

    /// Looks up a message nested directly inside `parent`.
    pub fn find_nested_message(&self, parent: MessageId, name: &str) -> Option<MessageId> {
        self.message(parent)
            .nested_messages
            .iter()
            .copied()
            .find(|id| self.message(*id).name == name)
    }

    pub fn find_enum(&self, name: &str) -> Option<EnumId> {
        self.enum_types
            .iter()
            .copied()
            .find(|id| self.enum_type(*id).name == name)
    }

    pub fn find_service(&self, name: &str) -> Option<ServiceId> {
        self.services
            .iter()
            .copied()
            .find(|id| self.service(*id).name == name)
    }

    /// Looks up a field of `message` by name.
    pub fn find_field(&self, message: MessageId, name: &str) -> Option<FieldId> {
        self.message(message)
            .fields
            .iter()
            .copied()
            .find(|id| self.field(*id).name == name)
    }

    /// The fields of a message, in declaration order.
    pub fn message_fields(&self, message: MessageId) -> impl Iterator<Item = &FieldDef> {
        self.message(message).fields.iter().map(|id| self.field(*id))
    }

    pub fn enum_values_of(&self, enum_id: EnumId) -> impl Iterator<Item = &EnumValue> {
        self.enum_type(enum_id)
            .values
            .iter()
            .map(|id| self.enum_value(*id))
    }

    pub fn service_methods(&self, service: ServiceId) -> impl Iterator<Item = &MethodDef> {
        self.service(service).methods.iter().map(|id| self.method(*id))
    }

    pub fn options_of<'a>(&'a self, ids: &'a [OptionId]) -> impl Iterator<Item = &'a OptionDef> {
        ids.iter().map(|id| self.option(*id))
    }

    /// Finds a plain (non-extension) option by name among `ids`.
    pub fn find_option<'a>(&'a self, ids: &'a [OptionId], name: &str) -> Option<&'a OptionDef> {
        self.options_of(ids).find(|o| o.is_named(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::field_def::{FieldType, Label, ScalarType};
    use crate::types::option_def::{OptionNamePart, OptionValue};

    fn sample() -> FileSchema {
        let mut file = FileSchema::new();
        let field = file.add_field(
            FieldDef::new("id", 1, FieldType::Scalar(ScalarType::Int64))
                .with_label(Label::Optional),
        );
        let mut message = MessageType::new("User");
        message.fields.push(field);
        let nested = file.add_message(MessageType::new("Address"));
        message.nested_messages.push(nested);
        let id = file.add_message(message);
        file.message_types.push(id);
        file
    }

    #[test]
    fn syntax_parsing() {
        assert_eq!(Syntax::parse("proto3").unwrap(), Syntax::Proto3);
        assert!(matches!(
            Syntax::parse("proto4"),
            Err(DescriptorError::UnknownSyntax(s)) if s == "proto4"
        ));
        assert_eq!(FileSchema::new().effective_syntax(), Syntax::Proto2);
    }

    #[test]
    fn arena_ids_are_sequential() {
        let file = sample();
        let user = file.find_message("User").unwrap();
        assert_eq!(user.index(), 1);
        let address = file.find_nested_message(user, "Address").unwrap();
        assert_eq!(address.index(), 0);
        assert!(file.find_message("Address").is_none());
    }

    #[test]
    fn field_lookup() {
        let file = sample();
        let user = file.find_message("User").unwrap();
        let names: Vec<_> = file.message_fields(user).map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id"]);
        let id = file.find_field(user, "id").unwrap();
        assert_eq!(file.field(id).number, 1);
    }

    #[test]
    fn dependency_indices() {
        let mut file = FileSchema::new();
        let first = file.add_dependency("a.proto");
        let second = file.add_dependency("b.proto");
        file.public_dependencies.push(first);
        file.weak_dependencies.push(second);
        assert!(file.is_public_dependency(0));
        assert!(!file.is_public_dependency(1));
        assert!(file.is_weak_dependency(1));
    }

    #[test]
    fn option_lookup() {
        let mut file = FileSchema::new();
        let id = file.add_option(OptionDef::new(
            vec![OptionNamePart::simple("java_package")],
            OptionValue::String("com.example".into()),
        ));
        file.options.push(id);
        let found = file.find_option(&file.options, "java_package").unwrap();
        assert_eq!(found.value, OptionValue::String("com.example".into()));
        assert!(file.find_option(&file.options, "go_package").is_none());
    }

    #[test]
    fn option_lookup_over_detached_id_list() {
        let mut file = FileSchema::new();
        let ids = vec![file.add_option(OptionDef::new(
            vec![OptionNamePart::simple("deprecated")],
            OptionValue::Identifier("true".into()),
        ))];
        let found = file.find_option(&ids, "deprecated").map(|o| o.value.clone());
        assert_eq!(found, Some(OptionValue::Identifier("true".into())));
    }

    #[test]
    fn serde_roundtrip() {
        let file = sample();
        let json = serde_json::to_string(&file).unwrap();
        let back: FileSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(file, back);
    }
}
