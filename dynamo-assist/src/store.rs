/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The store-client seam and the request and response types that cross it.

use dynamo_assist_core::{
    Entity, KeyCondition, MapSource, Projection, Record, RecordError, WireItem,
};
use std::collections::HashMap;
use std::future::Future;

use crate::error::StoreError;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

#[cfg(feature = "sdk")]
pub mod sdk;

/// Reads and writes of single items against one table.
///
/// Items and keys are always in the wire encoding. Batch operations default to
/// issuing the single-item calls one after another.
pub trait DynamoStore: Send + Sync {
    /// Reads one item by its primary key.
    fn get_item(
        &self,
        request: GetItemRequest,
    ) -> impl Future<Output = Result<GetItemOutput, StoreError>> + Send;

    /// Queries the table or one of its indexes.
    fn query(
        &self,
        request: QueryRequest,
    ) -> impl Future<Output = Result<QueryOutput, StoreError>> + Send;

    /// Writes a full item, replacing any item with the same primary key.
    fn put_item(
        &self,
        request: PutItemRequest,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Applies an update expression to the item with the given key.
    fn update_item(
        &self,
        request: UpdateItemRequest,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes the item with the given key. Deleting a missing item is not an error.
    fn delete_item(&self, key: WireItem) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Reads several items by key, skipping keys with no item.
    fn batch_get_items(
        &self,
        keys: Vec<WireItem>,
    ) -> impl Future<Output = Result<Vec<WireItem>, StoreError>> + Send {
        async move {
            let mut items = Vec::with_capacity(keys.len());
            for key in keys {
                if let Some(item) = self.get_item(GetItemRequest::new(key)).await?.item {
                    items.push(item);
                }
            }
            Ok(items)
        }
    }

    /// Writes several items, stopping at the first failure.
    fn batch_put_items(
        &self,
        items: Vec<WireItem>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        async move {
            for item in items {
                self.put_item(PutItemRequest::new(item)).await?;
            }
            Ok(())
        }
    }
}

/// Input to [`DynamoStore::get_item`].
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct GetItemRequest {
    /// The primary key.
    pub key: WireItem,
    /// Attributes to return. `None` returns every attribute.
    pub projection: Option<Projection>,
    /// Overrides the store's default read consistency.
    pub consistent_read: Option<bool>,
}

impl GetItemRequest {
    /// Creates a request for the item with `key`.
    pub fn new(key: WireItem) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    /// Restricts the returned attributes.
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Requests a strongly consistent read.
    pub fn consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }
}

/// Result of [`DynamoStore::get_item`].
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct GetItemOutput {
    /// The item, if one exists under the key.
    pub item: Option<WireItem>,
}

impl GetItemOutput {
    /// Creates an output carrying `item`.
    pub fn new(item: Option<WireItem>) -> Self {
        Self { item }
    }
}

impl From<GetItemOutput> for MapSource {
    fn from(output: GetItemOutput) -> Self {
        MapSource::WireEnvelope(output.item)
    }
}

/// Input to [`DynamoStore::query`].
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct QueryRequest {
    /// The key condition, usually from [`Record::key`].
    pub condition: KeyCondition,
    /// Secondary index to query. `None` queries the table.
    pub index_name: Option<String>,
    /// Sort ascending by sort key. Defaults to `false` (newest first for time-ordered keys).
    pub ascending: bool,
    /// Attributes to return.
    pub projection: Option<Projection>,
    /// Maximum number of items to evaluate.
    pub limit: Option<i32>,
    /// Continuation token from a previous page.
    pub exclusive_start_key: Option<WireItem>,
    /// Overrides the store's default read consistency.
    pub consistent_read: Option<bool>,
}

impl QueryRequest {
    /// Creates a descending query for `condition` against the table.
    pub fn new(condition: KeyCondition) -> Self {
        Self {
            condition,
            index_name: None,
            ascending: false,
            projection: None,
            limit: None,
            exclusive_start_key: None,
            consistent_read: None,
        }
    }

    /// Queries the named secondary index.
    pub fn index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = Some(index_name.into());
        self
    }

    /// Sets the sort direction.
    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = ascending;
        self
    }

    /// Restricts the returned attributes.
    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Limits the page size.
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continues after a previous page.
    pub fn exclusive_start_key(mut self, key: Option<WireItem>) -> Self {
        self.exclusive_start_key = key;
        self
    }

    /// Requests a strongly consistent read.
    pub fn consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = Some(consistent_read);
        self
    }
}

/// Result of [`DynamoStore::query`].
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct QueryOutput {
    /// Matching items in sort order.
    pub items: Vec<WireItem>,
    /// Number of items returned.
    pub count: usize,
    /// Pass as [`QueryRequest::exclusive_start_key`] to read the next page.
    pub next_token: Option<WireItem>,
}

impl QueryOutput {
    /// Creates an output from a page of items.
    pub fn new(items: Vec<WireItem>, next_token: Option<WireItem>) -> Self {
        Self {
            count: items.len(),
            items,
            next_token,
        }
    }

    /// Maps every item onto a fresh record.
    pub fn records<E: Entity + Default>(&self) -> Result<Vec<Record<E>>, RecordError> {
        self.items
            .iter()
            .map(|item| Record::from_source(item.clone()))
            .collect()
    }
}

/// A condition attached to a write, e.g. `attribute_not_exists(pk)`.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct ConditionExpression {
    /// The expression text.
    pub expression: String,
    /// `#placeholder -> attribute` aliases.
    pub names: HashMap<String, String>,
    /// `:placeholder -> value` bindings.
    pub values: WireItem,
}

impl ConditionExpression {
    /// Creates a condition without placeholders.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ..Default::default()
        }
    }

    /// Requires that no item exists under the written key.
    pub fn attribute_not_exists(attribute: &str) -> Self {
        Self::new(format!("attribute_not_exists(#{attribute})"))
            .name(format!("#{attribute}"), attribute)
    }

    /// Adds a `#placeholder` alias.
    pub fn name(mut self, placeholder: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), attribute.into());
        self
    }
}

/// Input to [`DynamoStore::put_item`].
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct PutItemRequest {
    /// The full item including key attributes.
    pub item: WireItem,
    /// Optional write condition.
    pub condition: Option<ConditionExpression>,
}

impl PutItemRequest {
    /// Creates an unconditional put.
    pub fn new(item: WireItem) -> Self {
        Self {
            item,
            condition: None,
        }
    }

    /// Attaches a write condition.
    pub fn condition(mut self, condition: ConditionExpression) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Input to [`DynamoStore::update_item`].
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct UpdateItemRequest {
    /// Primary key of the item to update.
    pub key: WireItem,
    /// e.g. `SET gsi0_pk = :gsi0_pk`
    pub update_expression: String,
    /// `#placeholder -> attribute` aliases used by the update expression.
    pub names: HashMap<String, String>,
    /// `:placeholder -> value` bindings used by the update expression.
    pub values: WireItem,
    /// Optional write condition.
    pub condition: Option<ConditionExpression>,
}

impl UpdateItemRequest {
    /// Creates an unconditional update.
    pub fn new(key: WireItem, update_expression: impl Into<String>, values: WireItem) -> Self {
        Self {
            key,
            update_expression: update_expression.into(),
            names: HashMap::new(),
            values,
            condition: None,
        }
    }

    /// Sets the `#placeholder` aliases.
    pub fn names(mut self, names: HashMap<String, String>) -> Self {
        self.names = names;
        self
    }

    /// Attaches a write condition.
    pub fn condition(mut self, condition: ConditionExpression) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;

    #[test]
    fn query_defaults_to_descending() {
        let request = QueryRequest::new(KeyCondition::partition("pk", "user#1"));
        assert!(!request.ascending);
        assert!(request.index_name.is_none());
    }

    #[test]
    fn get_output_converts_to_envelope() {
        let source = MapSource::from(GetItemOutput::default());
        assert!(source.into_item().unwrap().is_none());

        let mut item = WireItem::new();
        item.insert("id".into(), AttributeValue::S("1".into()));
        let source = MapSource::from(GetItemOutput::new(Some(item)));
        assert_eq!(source.into_item().unwrap().unwrap()["id"], "1");
    }

    #[test]
    fn attribute_not_exists_aliases_the_name() {
        let condition = ConditionExpression::attribute_not_exists("pk");
        assert_eq!(condition.expression, "attribute_not_exists(#pk)");
        assert_eq!(condition.names["#pk"], "pk");
    }
}
