//! Element identifiers.
//!
//! An [`Id`] is either numeric or textual. Exactly one representation is
//! active for a graph; that choice is carried explicitly as an [`IdKind`]
//! by the id generator rather than held in global state.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ElementType;
use crate::error::{CoreError, CoreResult};

/// Sign bit flipped when encoding numeric ids, so byte order matches integer order.
const SIGN_FLIP: u64 = 0x8000_0000_0000_0000;

/// Mask keeping the low 56 bits of a numeric id when a type code is prefixed.
const PREFIX_MASK: i64 = 0x00ff_ffff_ffff_ffff;

/// Identity of a stored element.
///
/// Numeric ids order as integers; text ids order lexicographically by their
/// UTF-8 bytes. [`Id::as_bytes`] preserves that order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Id {
    /// A 64-bit numeric id.
    Numeric(i64),
    /// A textual id.
    Text(String),
}

impl Id {
    /// Returns the representation of this id.
    #[must_use]
    pub const fn kind(&self) -> IdKind {
        match self {
            Self::Numeric(_) => IdKind::Numeric,
            Self::Text(_) => IdKind::Text,
        }
    }

    /// Returns true if this is a numeric id.
    #[inline]
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Encodes this id to its storage key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            #[allow(clippy::cast_sign_loss)]
            Self::Numeric(n) => ((*n as u64) ^ SIGN_FLIP).to_be_bytes().to_vec(),
            Self::Text(s) => s.as_bytes().to_vec(),
        }
    }

    /// Renders this id as a string.
    #[must_use]
    pub fn as_string(&self) -> String {
        match self {
            Self::Numeric(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Returns the text of a text id without copying.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Numeric(_) => None,
        }
    }

    /// Returns the numeric value of this id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if a text id does not parse as an integer.
    pub fn as_i64(&self) -> CoreResult<i64> {
        match self {
            Self::Numeric(n) => Ok(*n),
            Self::Text(s) => s
                .parse()
                .map_err(|_| CoreError::invalid(format!("id '{s}' is not numeric"))),
        }
    }

    /// Prefixes this id with the discriminator of `element_type`.
    ///
    /// Text ids get the lowercase hex type code in front; numeric ids carry
    /// the code in their top byte, which truncates the id to 56 bits.
    #[must_use]
    pub fn prefix_with(&self, element_type: ElementType) -> Self {
        let code = element_type.code();
        match self {
            Self::Numeric(n) => Self::Numeric((n & PREFIX_MASK) | (i64::from(code) << 56)),
            Self::Text(s) => Self::Text(format!("{code:x}{s}")),
        }
    }

    /// Returns this id in the `kind` representation.
    ///
    /// Text that is not an integer has no numeric form and is returned
    /// unchanged.
    #[must_use]
    pub fn to_kind(&self, kind: IdKind) -> Self {
        match (self, kind) {
            (Self::Numeric(n), IdKind::Text) => Self::Text(n.to_string()),
            (Self::Text(s), IdKind::Numeric) => s.parse().map_or_else(|_| self.clone(), Self::Numeric),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// The active id representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    /// 64-bit numeric ids.
    Numeric,
    /// Textual ids.
    #[default]
    Text,
}

impl IdKind {
    /// Builds an id of this kind from a string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the kind is numeric and the
    /// string is not an integer.
    pub fn from_str_id(self, s: &str) -> CoreResult<Id> {
        match self {
            Self::Text => Ok(Id::Text(s.to_owned())),
            Self::Numeric => s
                .parse()
                .map(Id::Numeric)
                .map_err(|_| CoreError::invalid(format!("'{s}' is not a numeric id"))),
        }
    }

    /// Builds an id of this kind from an integer.
    #[must_use]
    pub fn from_i64(self, n: i64) -> Id {
        match self {
            Self::Numeric => Id::Numeric(n),
            Self::Text => Id::Text(n.to_string()),
        }
    }

    /// Decodes an id of this kind from its storage key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the bytes are not a valid
    /// encoding for this kind.
    pub fn parse(self, bytes: &[u8]) -> CoreResult<Id> {
        match self {
            Self::Numeric => {
                let raw: [u8; 8] = bytes.try_into().map_err(|_| {
                    CoreError::invalid(format!("numeric id needs 8 bytes, got {}", bytes.len()))
                })?;
                #[allow(clippy::cast_possible_wrap)]
                Ok(Id::Numeric((u64::from_be_bytes(raw) ^ SIGN_FLIP) as i64))
            }
            Self::Text => std::str::from_utf8(bytes)
                .map(|s| Id::Text(s.to_owned()))
                .map_err(|e| CoreError::invalid(format!("text id is not utf-8: {e}"))),
        }
    }
}
