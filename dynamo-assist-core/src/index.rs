/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Partition/sort key pairs and the keys and conditions derived from them.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::condition::{KeyCondition, SortCondition, SortKeyCondition, SortKeyOperand};
use crate::encoding::Item;
use crate::error::IndexError;
use crate::key::{plain_text, Key};

/// Name reserved for the table's primary key index.
pub const PRIMARY_INDEX: &str = "primary";

/// How an index relates to the table's key schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    /// The table's own primary key.
    Primary,
    /// A global secondary index with its own partition key.
    Global,
    /// A local secondary index sharing the table partition key.
    Local,
}

/// A named partition key with an optional sort key.
pub struct Index<E> {
    name: Option<String>,
    kind: IndexKind,
    partition_key: Key<E>,
    sort_key: Option<Key<E>>,
    description: Option<String>,
}

impl<E> Index<E> {
    /// Creates a global secondary index. The name may be assigned later.
    pub fn new(partition_key: Key<E>) -> Self {
        Self {
            name: None,
            kind: IndexKind::Global,
            partition_key,
            sort_key: None,
            description: None,
        }
    }

    /// Creates the primary index from its partition and sort keys.
    pub fn primary(partition_key: Key<E>, sort_key: Option<Key<E>>) -> Self {
        Self {
            name: Some(PRIMARY_INDEX.to_string()),
            kind: IndexKind::Primary,
            partition_key,
            sort_key,
            description: None,
        }
    }

    /// Creates a named global secondary index.
    pub fn global(
        name: impl Into<String>,
        partition_key: Key<E>,
        sort_key: Option<Key<E>>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            kind: IndexKind::Global,
            partition_key,
            sort_key,
            description: None,
        }
    }

    /// Creates a named local secondary index. `partition_key` must name the table's
    /// partition attribute; registration rejects anything else.
    pub fn local(name: impl Into<String>, partition_key: Key<E>, sort_key: Key<E>) -> Self {
        Self {
            name: Some(name.into()),
            kind: IndexKind::Local,
            partition_key,
            sort_key: Some(sort_key),
            description: None,
        }
    }

    /// Sets the index name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the sort key.
    pub fn with_sort_key(mut self, sort_key: Key<E>) -> Self {
        self.sort_key = Some(sort_key);
        self
    }

    /// Attaches a human-readable description, used only for documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub(crate) fn mark_primary(&mut self) {
        self.name = Some(PRIMARY_INDEX.to_string());
        self.kind = IndexKind::Primary;
    }

    /// The index name, if assigned.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The index kind.
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// True for the table's primary key index.
    pub fn is_primary(&self) -> bool {
        self.kind == IndexKind::Primary
    }

    /// The partition key.
    pub fn partition_key(&self) -> &Key<E> {
        &self.partition_key
    }

    /// Mutable access to the partition key.
    pub fn partition_key_mut(&mut self) -> &mut Key<E> {
        &mut self.partition_key
    }

    /// The sort key, if the index has one.
    pub fn sort_key(&self) -> Option<&Key<E>> {
        self.sort_key.as_ref()
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Builds either a point-lookup key or a query condition for this index.
    ///
    /// A lookup is returned only for the primary index when `as_query` is false and the
    /// sort key is included. Everything else yields a [`KeyCondition`] whose sort half is
    /// dropped when the sort value cannot currently be resolved.
    pub fn key(&self, entity: &E, options: &KeyOptions) -> Result<IndexKey, IndexError> {
        if !options.as_query && self.is_primary() && options.include_sort_key {
            return self.lookup_key(entity).map(IndexKey::Lookup);
        }
        self.query_condition(entity, options).map(IndexKey::Query)
    }

    /// Builds the flat key used for a direct get/delete of the item.
    pub fn lookup_key(&self, entity: &E) -> Result<Item, IndexError> {
        let mut key = Item::new();
        let name = self.partition_key.attribute_name()?;
        key.insert(name.to_string(), self.partition_key.value(entity)?);
        if let Some((name, value)) = self.sort_key.as_ref().and_then(|sk| sk.try_pair(entity)) {
            key.insert(name.to_string(), value);
        }
        Ok(key)
    }

    /// Builds the query condition for this index.
    pub fn query_condition(
        &self,
        entity: &E,
        options: &KeyOptions,
    ) -> Result<KeyCondition, IndexError> {
        let partition_attribute = self.partition_key.attribute_name()?.to_string();
        let partition_value = self.partition_key.value(entity)?;
        let sort = if options.include_sort_key {
            self.sort_condition(entity, options)?
        } else {
            None
        };
        tracing::trace!(
            index = self.name.as_deref().unwrap_or_default(),
            has_sort = sort.is_some(),
            "built key condition"
        );
        Ok(KeyCondition {
            partition_attribute,
            partition_value,
            sort,
        })
    }

    fn sort_condition(
        &self,
        entity: &E,
        options: &KeyOptions,
    ) -> Result<Option<SortKeyCondition>, IndexError> {
        let Some(sort_key) = &self.sort_key else {
            return Ok(None);
        };
        let Some(attribute) = sort_key.try_attribute_name() else {
            return Ok(None);
        };
        let value = sort_key.try_value(entity);

        let operand = if options.condition == SortCondition::Between {
            let (Some(low), Some(high)) = (&options.low, &options.high) else {
                return Err(IndexError::MissingRangeBounds {
                    index: self.name.clone().unwrap_or_default(),
                });
            };
            match value {
                Some(prefix) => {
                    let (low, high) = range_bounds(&prefix, low, high);
                    SortKeyOperand::Range {
                        low: Value::String(low),
                        high: Value::String(high),
                    }
                }
                None => return Ok(None),
            }
        } else {
            match value {
                Some(v) if is_usable(&v) => SortKeyOperand::Value(v),
                _ => return Ok(None),
            }
        };

        Ok(Some(SortKeyCondition {
            attribute: attribute.to_string(),
            condition: options.condition,
            operand,
        }))
    }

    /// Returns the currently resolvable key pairs. Never fails; unresolved pairs are omitted.
    pub fn to_dict(&self, entity: &E, include_sort_key: bool) -> Item {
        let mut result = Item::new();
        if let Some((name, value)) = self.partition_key.try_pair(entity) {
            result.insert(name.to_string(), value);
        }
        if include_sort_key {
            if let Some((name, value)) = self.sort_key.as_ref().and_then(|sk| sk.try_pair(entity)) {
                result.insert(name.to_string(), value);
            }
        }
        result
    }

    /// Describes how this index would be queried right now. Intended for logs and tests.
    pub fn debug_info(&self, entity: &E, options: &KeyOptions) -> IndexDebugInfo {
        let partition_key = self
            .partition_key
            .try_attribute_name()
            .map(|attribute| KeyDebugInfo {
                attribute: attribute.to_string(),
                value: self.partition_key.try_value(entity),
            });

        let sort_key = if options.include_sort_key {
            self.sort_key
                .as_ref()
                .and_then(|sk| sk.try_attribute_name().map(|a| (sk, a)))
                .map(|(sk, attribute)| {
                    let value = sk.try_value(entity);
                    let bounds = (&value, options.condition, &options.low, &options.high);
                    let full_range = match bounds {
                        (Some(prefix), SortCondition::Between, Some(low), Some(high)) => {
                            let (low, high) = range_bounds(prefix, low, high);
                            Some(DebugRange { low, high })
                        }
                        _ => None,
                    };
                    let is_between = options.condition == SortCondition::Between;
                    SortKeyDebugInfo {
                        attribute: attribute.to_string(),
                        note: value.is_none().then(|| "Sort key value not set".to_string()),
                        value,
                        condition: options.condition,
                        low_value: options.low.clone().filter(|_| is_between),
                        high_value: options.high.clone().filter(|_| is_between),
                        full_range,
                    }
                })
        } else {
            None
        };

        IndexDebugInfo {
            index_name: self.name.clone(),
            query_type: if self.is_primary() {
                QueryType::Primary
            } else {
                QueryType::Secondary
            },
            partition_key,
            sort_key,
            keys: self.to_dict(entity, options.include_sort_key),
        }
    }
}

fn range_bounds(prefix: &Value, low: &Value, high: &Value) -> (String, String) {
    let prefix = plain_text(prefix);
    (
        format!("{}{}", prefix, plain_text(low)),
        format!("{}{}", prefix, plain_text(high)),
    )
}

// Empty strings and nulls carry nothing to compare against.
fn is_usable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

impl<E> Clone for Index<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind,
            partition_key: self.partition_key.clone(),
            sort_key: self.sort_key.clone(),
            description: self.description.clone(),
        }
    }
}

impl<E> fmt::Debug for Index<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("partition_key", &self.partition_key)
            .field("sort_key", &self.sort_key)
            .field("description", &self.description)
            .finish()
    }
}

/// Options for [`Index::key`] and [`Index::debug_info`].
#[derive(Debug, Clone, PartialEq)]
pub struct KeyOptions {
    /// Include the sort key (default `true`).
    pub include_sort_key: bool,
    /// The sort-key comparison (default `begins_with`).
    pub condition: SortCondition,
    /// Low suffix for `between`, appended to the current sort value.
    pub low: Option<Value>,
    /// High suffix for `between`, appended to the current sort value.
    pub high: Option<Value>,
    /// Always build a query condition, even for the primary index.
    pub as_query: bool,
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            include_sort_key: true,
            condition: SortCondition::BeginsWith,
            low: None,
            high: None,
            as_query: false,
        }
    }
}

impl KeyOptions {
    /// Options for a query condition using `condition` on the sort key.
    pub fn query(condition: SortCondition) -> Self {
        Self {
            condition,
            as_query: true,
            ..Self::default()
        }
    }

    /// Options for a `between` query whose bounds are `prefix+low ..= prefix+high`.
    pub fn between(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self {
            condition: SortCondition::Between,
            low: Some(low.into()),
            high: Some(high.into()),
            as_query: true,
            ..Self::default()
        }
    }

    /// Sets whether the sort key is included.
    pub fn include_sort_key(mut self, include: bool) -> Self {
        self.include_sort_key = include;
        self
    }

    /// Sets the sort-key comparison.
    pub fn condition(mut self, condition: SortCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Sets whether a query condition is always produced.
    pub fn as_query(mut self, as_query: bool) -> Self {
        self.as_query = as_query;
        self
    }
}

/// Options for [`Index::debug_info`]; the same knobs as a key request.
pub type DebugOptions = KeyOptions;

/// The result of [`Index::key`].
#[derive(Debug, Clone, PartialEq)]
pub enum IndexKey {
    /// A flat key for a direct point lookup.
    Lookup(Item),
    /// A condition for a query.
    Query(KeyCondition),
}

impl IndexKey {
    /// Returns the lookup key, if this is one.
    pub fn as_lookup(&self) -> Option<&Item> {
        match self {
            IndexKey::Lookup(item) => Some(item),
            IndexKey::Query(_) => None,
        }
    }

    /// Returns the query condition, if this is one.
    pub fn as_query(&self) -> Option<&KeyCondition> {
        match self {
            IndexKey::Query(condition) => Some(condition),
            IndexKey::Lookup(_) => None,
        }
    }
}

/// Whether a query goes to the table or to a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryType {
    /// Against the table's primary key.
    Primary,
    /// Against a global or local secondary index.
    #[serde(rename = "GSI/LSI")]
    Secondary,
}

/// Diagnostic view produced by [`Index::debug_info`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDebugInfo {
    /// The index name.
    pub index_name: Option<String>,
    /// Primary or secondary.
    pub query_type: QueryType,
    /// Partition attribute and its current value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<KeyDebugInfo>,
    /// Sort attribute, current value and condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<SortKeyDebugInfo>,
    /// Same as [`Index::to_dict`]. Serialized as `keys_dict`.
    #[serde(rename = "keys_dict")]
    pub keys: Item,
}

/// One key attribute in an [`IndexDebugInfo`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyDebugInfo {
    /// Attribute name.
    pub attribute: String,
    /// Current value, if resolvable.
    pub value: Option<Value>,
}

/// The sort key in an [`IndexDebugInfo`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SortKeyDebugInfo {
    /// Attribute name.
    pub attribute: String,
    /// Current value, if resolvable.
    pub value: Option<Value>,
    /// The condition a query would use.
    pub condition: SortCondition,
    /// `between` low suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_value: Option<Value>,
    /// `between` high suffix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_value: Option<Value>,
    /// Fully composed `between` bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_range: Option<DebugRange>,
    /// Set when the value is unresolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Composed `between` bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugRange {
    /// Lower bound.
    pub low: String,
    /// Upper bound.
    pub high: String,
}
