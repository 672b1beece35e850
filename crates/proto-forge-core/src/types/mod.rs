//! Descriptor tree node types.

mod enum_type;
mod extend_block;
mod field_def;
mod file_schema;
mod ids;
mod message_type;
mod option_def;
mod service_type;

pub use enum_type::{EnumReservedRange, EnumType, EnumValue};
pub use extend_block::ExtendBlock;
pub use field_def::{FieldDef, FieldType, Label, ScalarType};
pub use file_schema::{FileSchema, Syntax};
pub use ids::{
    EnumId, EnumValueId, ExtendId, FieldId, MessageId, MethodId, OneofId, OptionId, ServiceId,
};
pub use message_type::{
    validate_field_number, ExtensionRange, MessageType, OneofDef, ReservedRange,
    MAX_FIELD_NUMBER,
};
pub use option_def::{escape_string, OptionDef, OptionNamePart, OptionValue};
pub use service_type::{MethodDef, ServiceType};
