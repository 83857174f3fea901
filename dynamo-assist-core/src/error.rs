/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Error types for index configuration, key resolution and item mapping.

use std::fmt;

/// Errors raised while registering indexes or resolving key values.
///
/// Configuration variants (`DuplicateIndex`, `AttributeCollision`, `MissingName`,
/// `InvalidLocalIndex`) are returned when a [`Record`](crate::Record) is built, never later.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IndexError {
    /// An index with the same name (or a second primary) is already registered.
    #[error("the index '{name}' is already defined on this entity")]
    DuplicateIndex {
        /// Name of the index that was registered twice.
        name: String,
    },

    /// The attribute is already written by another index and would be overwritten.
    #[error("the attribute '{attribute}' is already used by index '{index}'")]
    AttributeCollision {
        /// The colliding attribute name.
        attribute: String,
        /// The index that already owns the attribute.
        index: String,
    },

    /// A secondary index was registered without a name.
    #[error("secondary indexes must be named")]
    MissingName,

    /// No index is registered under the requested name.
    #[error("index '{name}' not found")]
    IndexNotFound {
        /// The requested index name.
        name: String,
    },

    /// A key was used before its attribute name was set.
    #[error("the attribute name is not set")]
    MissingAttributeName,

    /// A key value is unset, or its computed value is currently unresolved.
    #[error("no value is available for attribute '{attribute}'")]
    MissingValue {
        /// Attribute whose value could not be resolved.
        attribute: String,
    },

    /// A `between` sort condition was requested without both bounds.
    #[error("index '{index}': `between` requires both a low and a high value")]
    MissingRangeBounds {
        /// The index being queried.
        index: String,
    },

    /// A local index does not share the table partition key.
    #[error("local index '{index}' must use the primary partition attribute, not '{attribute}'")]
    InvalidLocalIndex {
        /// The local index being registered.
        index: String,
        /// The partition attribute it declared.
        attribute: String,
    },
}

/// Error that occurs when mapping between typed entities and flat items.
#[derive(Debug)]
pub struct MappingError {
    kind: MappingErrorKind,
    model: Option<&'static str>,
}

/// The kind of mapping error that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum MappingErrorKind {
    /// The source was not an object-like value.
    NotAnObject {
        /// The JSON type that was found instead.
        found: &'static str,
    },
    /// A response envelope did not carry an `Item`.
    MissingItem,
    /// A source value did not fit the target field.
    Deserialize(serde_json::Error),
    /// The entity could not be converted to a value tree.
    Serialize(serde_json::Error),
    /// A value has no representation in the target encoding.
    UnsupportedValue {
        /// Description of the offending value.
        message: String,
    },
}

impl MappingError {
    /// Creates an error for a source that is not an object.
    pub fn not_an_object(found: &'static str) -> Self {
        Self {
            kind: MappingErrorKind::NotAnObject { found },
            model: None,
        }
    }

    /// Creates an error for an envelope without an item.
    pub fn missing_item() -> Self {
        Self {
            kind: MappingErrorKind::MissingItem,
            model: None,
        }
    }

    /// Creates an error for a value that does not fit its field.
    pub fn deserialize(source: serde_json::Error) -> Self {
        Self {
            kind: MappingErrorKind::Deserialize(source),
            model: None,
        }
    }

    /// Creates an error for an entity that failed to serialize.
    pub fn serialize(source: serde_json::Error) -> Self {
        Self {
            kind: MappingErrorKind::Serialize(source),
            model: None,
        }
    }

    /// Creates an error for a value with no representation in the target encoding.
    pub fn unsupported_value(message: impl Into<String>) -> Self {
        Self {
            kind: MappingErrorKind::UnsupportedValue {
                message: message.into(),
            },
            model: None,
        }
    }

    /// Attaches the name of the model being mapped.
    pub fn with_model(mut self, model: &'static str) -> Self {
        self.model = Some(model);
        self
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &MappingErrorKind {
        &self.kind
    }

    /// Returns the model type name if available.
    pub fn model(&self) -> Option<&'static str> {
        self.model
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(model) = self.model {
            write!(f, "failed to map {}: ", model)?;
        }
        match &self.kind {
            MappingErrorKind::NotAnObject { found } => {
                write!(f, "expected an item object, got {}", found)
            }
            MappingErrorKind::MissingItem => write!(f, "the response does not contain an item"),
            MappingErrorKind::Deserialize(e) => write!(f, "invalid attribute value: {}", e),
            MappingErrorKind::Serialize(e) => write!(f, "unable to serialize entity: {}", e),
            MappingErrorKind::UnsupportedValue { message } => {
                write!(f, "unsupported value: {}", message)
            }
        }
    }
}

impl std::error::Error for MappingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            MappingErrorKind::Deserialize(e) | MappingErrorKind::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

/// Error returned when a record is both configured and populated in one step.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum RecordError {
    /// The entity's index configuration is invalid.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// The source could not be mapped onto the entity.
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// An unknown sort-key condition name was parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "unknown sort key condition '{0}'; \
     expected one of eq, begins_with, gt, gte, lt, lte, between"
)]
pub struct ConditionParseError(pub(crate) String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_error_display_includes_model() {
        let err = MappingError::not_an_object("array").with_model("User");
        assert_eq!(
            err.to_string(),
            "failed to map User: expected an item object, got array"
        );
        assert_eq!(err.model(), Some("User"));
    }

    #[test]
    fn collision_display_names_owner() {
        let err = IndexError::AttributeCollision {
            attribute: "gsi0_pk".into(),
            index: "gsi0".into(),
        };
        assert_eq!(
            err.to_string(),
            "the attribute 'gsi0_pk' is already used by index 'gsi0'"
        );
    }
}
