//! # proto-forge-core
//!
//! The unlinked descriptor tree produced by parsing one schema file, and
//! the source-location table that maps its elements back to the text.
//!
//! The tree is an arena: [`FileSchema`](types::FileSchema) owns one vector
//! per node kind and parents hold typed ids of their children. Type
//! references are unresolved names.
//!
//! ```
//! use proto_forge_core::types::{FieldDef, FieldType, FileSchema, MessageType, ScalarType};
//!
//! let mut file = FileSchema::new();
//! let field = file.add_field(FieldDef::new("id", 1, FieldType::Scalar(ScalarType::Int64)));
//! let mut message = MessageType::new("User");
//! message.fields.push(field);
//! let id = file.add_message(message);
//! file.message_types.push(id);
//!
//! assert_eq!(file.find_message("User"), Some(id));
//! ```

pub mod error;
pub mod location;
pub mod types;

pub use error::DescriptorError;
pub use location::{CommentSet, Location, LocationKind, NodeId, SourceLocationTable};
