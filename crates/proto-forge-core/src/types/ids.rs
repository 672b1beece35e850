use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw arena index.
            pub fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            /// Returns the arena index this id refers to.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }
    };
}

arena_id!(
    /// Index of a [`MessageType`](super::MessageType) in its file's arena.
    MessageId,
    "message"
);
arena_id!(
    /// Index of a [`FieldDef`](super::FieldDef) in its file's arena.
    FieldId,
    "field"
);
arena_id!(
    /// Index of a [`OneofDef`](super::OneofDef) in its file's arena.
    OneofId,
    "oneof"
);
arena_id!(
    /// Index of an [`EnumType`](super::EnumType) in its file's arena.
    EnumId,
    "enum"
);
arena_id!(
    /// Index of an [`EnumValue`](super::EnumValue) in its file's arena.
    EnumValueId,
    "enum_value"
);
arena_id!(
    /// Index of a [`ServiceType`](super::ServiceType) in its file's arena.
    ServiceId,
    "service"
);
arena_id!(
    /// Index of a [`MethodDef`](super::MethodDef) in its file's arena.
    MethodId,
    "method"
);
arena_id!(
    /// Index of an [`ExtendBlock`](super::ExtendBlock) in its file's arena.
    ExtendId,
    "extend"
);
arena_id!(
    /// Index of an [`OptionDef`](super::OptionDef) in its file's arena.
    OptionId,
    "option"
);
