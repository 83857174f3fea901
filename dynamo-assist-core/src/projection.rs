/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;

use crate::reserved::{is_plain_name, Placeholders};

/// Attributes to retrieve on reads, plus `#placeholder` aliases for names that cannot
/// appear in an expression directly.
///
/// The projection is only carried to the store client; nothing in this crate filters
/// items by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    expression: Option<String>,
    attribute_names: HashMap<String, String>,
}

impl Projection {
    /// Creates a projection from a ready-made expression and alias map.
    pub fn new(expression: impl Into<String>, attribute_names: HashMap<String, String>) -> Self {
        Self {
            expression: Some(expression.into()),
            attribute_names,
        }
    }

    /// Builds a projection from attribute names, aliasing reserved words and names with
    /// characters outside `[A-Za-z0-9_]`.
    ///
    /// `["id", "status"]` becomes the expression `id,#status` with `#status -> status`.
    pub fn from_attributes<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = HashMap::new();
        let mut tokens = Placeholders::new();
        let parts: Vec<String> = attributes
            .into_iter()
            .map(|attribute| {
                let attribute = attribute.as_ref();
                if !is_plain_name(attribute) {
                    let placeholder = format!("#{}", tokens.token(attribute));
                    names.insert(placeholder.clone(), attribute.to_string());
                    placeholder
                } else {
                    attribute.to_string()
                }
            })
            .collect();
        Self {
            expression: (!parts.is_empty()).then(|| parts.join(",")),
            attribute_names: names,
        }
    }

    /// Adds an alias for an attribute name.
    pub fn with_alias(
        mut self,
        placeholder: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        self.attribute_names
            .insert(placeholder.into(), attribute.into());
        self
    }

    /// The comma-separated projection expression, if any.
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// The `#placeholder -> attribute` alias map.
    pub fn attribute_names(&self) -> &HashMap<String, String> {
        &self.attribute_names
    }

    /// The alias map, or `None` when it is empty (the store rejects empty maps).
    pub fn attribute_names_opt(&self) -> Option<&HashMap<String, String>> {
        (!self.attribute_names.is_empty()).then_some(&self.attribute_names)
    }

    /// Resolves the attribute names the expression selects, expanding aliases.
    pub fn attributes(&self) -> Vec<String> {
        self.expression
            .iter()
            .flat_map(|e| e.split(','))
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                self.attribute_names
                    .get(part)
                    .cloned()
                    .unwrap_or_else(|| part.to_string())
            })
            .collect()
    }

    /// True when no expression is set.
    pub fn is_empty(&self) -> bool {
        self.expression.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_words_are_aliased() {
        let projection = Projection::from_attributes([
            "id",
            "first_name",
            "type",
            "status",
            "modified_datetime_utc",
        ]);
        assert_eq!(
            projection.expression(),
            Some("id,first_name,#type,#status,modified_datetime_utc")
        );
        assert_eq!(projection.attribute_names().len(), 2);
        assert_eq!(projection.attribute_names()["#status"], "status");
        assert_eq!(
            projection.attributes(),
            vec!["id", "first_name", "type", "status", "modified_datetime_utc"]
        );
    }

    #[test]
    fn punctuated_names_are_aliased() {
        let projection = Projection::from_attributes(["user-id", "user_id", "id"]);
        assert_eq!(projection.expression(), Some("#user_id,user_id,id"));
        assert_eq!(projection.attribute_names()["#user_id"], "user-id");
        assert_eq!(projection.attributes(), vec!["user-id", "user_id", "id"]);
    }

    #[test]
    fn empty_projection() {
        let projection = Projection::from_attributes(Vec::<String>::new());
        assert!(projection.is_empty());
        assert!(projection.attribute_names_opt().is_none());
        assert!(projection.attributes().is_empty());
    }

    #[test]
    fn explicit_expression_with_aliases() {
        let projection = Projection::new("id,#t", HashMap::new()).with_alias("#t", "type");
        assert_eq!(projection.attributes(), vec!["id", "type"]);
    }
}
