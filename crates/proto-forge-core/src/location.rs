//! Side table mapping descriptor tree elements back to source positions.
//!
//! The parser records one entry per (node, kind) pair as it consumes the
//! tokens that define that part of the node. Entries are write-once: a
//! second record for the same key is ignored, so the first occurrence wins.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::types::{
    EnumId, EnumValueId, ExtendId, FieldId, MessageId, MethodId, OneofId, OptionId, ServiceId,
};

/// Identity of a descriptor tree element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "node", content = "id")]
pub enum NodeId {
    File,
    Syntax,
    Package,
    /// An import statement, by index into `FileSchema::dependencies`.
    Dependency(usize),
    Message(MessageId),
    Field(FieldId),
    Oneof(OneofId),
    Enum(EnumId),
    EnumValue(EnumValueId),
    Service(ServiceId),
    Method(MethodId),
    Extend(ExtendId),
    Option(OptionId),
    ExtensionRange(MessageId, usize),
    MessageReservedRange(MessageId, usize),
    MessageReservedName(MessageId, usize),
    EnumReservedRange(EnumId, usize),
    EnumReservedName(EnumId, usize),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Syntax => f.write_str("syntax"),
            Self::Package => f.write_str("package"),
            Self::Dependency(i) => write!(f, "dependency#{i}"),
            Self::Message(id) => write!(f, "{id}"),
            Self::Field(id) => write!(f, "{id}"),
            Self::Oneof(id) => write!(f, "{id}"),
            Self::Enum(id) => write!(f, "{id}"),
            Self::EnumValue(id) => write!(f, "{id}"),
            Self::Service(id) => write!(f, "{id}"),
            Self::Method(id) => write!(f, "{id}"),
            Self::Extend(id) => write!(f, "{id}"),
            Self::Option(id) => write!(f, "{id}"),
            Self::ExtensionRange(m, i) => write!(f, "{m}/extension_range#{i}"),
            Self::MessageReservedRange(m, i) => write!(f, "{m}/reserved_range#{i}"),
            Self::MessageReservedName(m, i) => write!(f, "{m}/reserved_name#{i}"),
            Self::EnumReservedRange(e, i) => write!(f, "{e}/reserved_range#{i}"),
            Self::EnumReservedName(e, i) => write!(f, "{e}/reserved_name#{i}"),
        }
    }
}

/// Which part of a node a location points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationKind {
    Name,
    Number,
    Type,
    Extendee,
    DefaultValue,
    OptionName,
    OptionValue,
    InputType,
    OutputType,
    Import,
    /// The start of the whole declaration.
    Other,
}

/// A 0-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Displays 1-based, the way editors number lines.
impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Comments attached to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detached: Vec<String>,
}

impl CommentSet {
    pub fn is_empty(&self) -> bool {
        self.leading.is_none() && self.trailing.is_none() && self.detached.is_empty()
    }
}

/// Append-only map from (node, kind) to source location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocationTable {
    locations: BTreeMap<(NodeId, LocationKind), Location>,
    comments: BTreeMap<NodeId, CommentSet>,
}

impl SourceLocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a location. Returns `false` and keeps the existing entry if
    /// the key was already recorded.
    pub fn add(&mut self, node: NodeId, kind: LocationKind, location: Location) -> bool {
        use std::collections::btree_map::Entry;

        match self.locations.entry((node, kind)) {
            Entry::Vacant(slot) => {
                slot.insert(location);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn find(&self, node: NodeId, kind: LocationKind) -> Option<Location> {
        self.locations.get(&(node, kind)).copied()
    }

    /// Attaches comments to a node. Empty sets are not stored, and the
    /// first non-empty set recorded for a node wins.
    pub fn add_comments(&mut self, node: NodeId, comments: CommentSet) {
        if comments.is_empty() {
            return;
        }
        self.comments.entry(node).or_insert(comments);
    }

    pub fn comments(&self, node: NodeId) -> Option<&CommentSet> {
        self.comments.get(&node)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// All recorded locations, ordered by node then kind.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, LocationKind, Location)> + '_ {
        self.locations
            .iter()
            .map(|((node, kind), loc)| (*node, *kind, *loc))
    }

    /// All recorded locations of one node.
    pub fn locations_of(&self, node: NodeId) -> impl Iterator<Item = (LocationKind, Location)> + '_ {
        self.iter()
            .filter(move |(n, _, _)| *n == node)
            .map(|(_, kind, loc)| (kind, loc))
    }
}

#[derive(Serialize)]
struct LocationEntry {
    #[serde(flatten)]
    node: NodeId,
    kind: LocationKind,
    line: usize,
    column: usize,
}

#[derive(Serialize)]
struct CommentEntry<'a> {
    #[serde(flatten)]
    node: NodeId,
    #[serde(flatten)]
    comments: &'a CommentSet,
}

impl Serialize for SourceLocationTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let locations: Vec<LocationEntry> = self
            .iter()
            .map(|(node, kind, loc)| LocationEntry {
                node,
                kind,
                line: loc.line,
                column: loc.column,
            })
            .collect();
        let comments: Vec<CommentEntry<'_>> = self
            .comments
            .iter()
            .map(|(node, comments)| CommentEntry {
                node: *node,
                comments,
            })
            .collect();

        let mut state = serializer.serialize_struct("SourceLocationTable", 2)?;
        state.serialize_field("locations", &locations)?;
        state.serialize_field("comments", &comments)?;
        state.end()
    }
}
