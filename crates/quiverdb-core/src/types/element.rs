//! Categories of stored elements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The category an element belongs to.
///
/// Every stored record is addressed by an `(ElementType, Id)` pair, so equal
/// ids in different categories never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// A property key definition.
    PropertyKey,
    /// A vertex label definition.
    VertexLabel,
    /// An edge label definition.
    EdgeLabel,
    /// An index label definition.
    IndexLabel,
    /// A graph vertex.
    Vertex,
    /// A graph edge.
    Edge,
}

impl ElementType {
    /// All element types, in code order.
    pub const ALL: [Self; 6] = [
        Self::PropertyKey,
        Self::VertexLabel,
        Self::EdgeLabel,
        Self::IndexLabel,
        Self::Vertex,
        Self::Edge,
    ];

    /// Returns the stable one-byte discriminator for this type.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::PropertyKey => 1,
            Self::VertexLabel => 2,
            Self::EdgeLabel => 3,
            Self::IndexLabel => 4,
            Self::Vertex => 101,
            Self::Edge => 120,
        }
    }

    /// Looks up an element type by its discriminator.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Returns true for schema metadata categories.
    #[must_use]
    pub const fn is_schema(self) -> bool {
        matches!(self, Self::PropertyKey | Self::VertexLabel | Self::EdgeLabel | Self::IndexLabel)
    }

    /// Returns true for graph data categories.
    #[must_use]
    pub const fn is_graph(self) -> bool {
        matches!(self, Self::Vertex | Self::Edge)
    }

    /// Returns the lowercase name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PropertyKey => "property_key",
            Self::VertexLabel => "vertex_label",
            Self::EdgeLabel => "edge_label",
            Self::IndexLabel => "index_label",
            Self::Vertex => "vertex",
            Self::Edge => "edge",
        }
    }

    /// Looks up an element type by its lowercase name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an edge relative to one of its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Edges leaving the vertex.
    Out,
    /// Edges arriving at the vertex.
    In,
    /// Edges in either direction.
    Both,
}

impl Direction {
    /// Returns the lowercase name of this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Out => "out",
            Self::In => "in",
            Self::Both => "both",
        }
    }

    /// Returns true if an edge seen in direction `other` is selected by `self`.
    #[must_use]
    pub const fn matches(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Both, _) | (_, Self::Both) | (Self::Out, Self::Out) | (Self::In, Self::In)
        )
    }
}
