/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! An in-process table for tests. DO NOT USE IN PRODUCTION.
//!
//! Items are held in the native encoding, so binary attributes come back as hex strings.
//! Condition expressions support `attribute_exists(..)` and `attribute_not_exists(..)`;
//! update expressions support `SET a = :a, ...`.

use dynamo_assist_core::encoding::{decode_wire_item, from_wire_value};
use dynamo_assist_core::naming::{PK, SK};
use dynamo_assist_core::{compare_key_values, to_wire_item, Item, Projection, WireItem};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;
use crate::store::{
    ConditionExpression, DynamoStore, GetItemOutput, GetItemRequest, PutItemRequest, QueryOutput,
    QueryRequest, UpdateItemRequest,
};

/// The store call recorded by [`MemoryStore::calls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Operation {
    /// [`DynamoStore::get_item`]
    GetItem,
    /// [`DynamoStore::query`]
    Query,
    /// [`DynamoStore::put_item`]
    PutItem,
    /// [`DynamoStore::update_item`]
    UpdateItem,
    /// [`DynamoStore::delete_item`]
    DeleteItem,
}

#[derive(Debug, Clone)]
struct IndexSchema {
    partition: String,
    sort: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    items: Vec<Item>,
    calls: Vec<Operation>,
    failures: HashMap<Operation, VecDeque<StoreError>>,
}

/// A [`DynamoStore`] that keeps items in memory.
#[derive(Debug)]
pub struct MemoryStore {
    table: IndexSchema,
    indexes: HashMap<String, IndexSchema>,
    state: Mutex<State>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(PK, Some(SK))
    }
}

impl MemoryStore {
    /// Creates an empty table keyed by `partition` and optionally `sort`.
    pub fn new(partition: impl Into<String>, sort: Option<&str>) -> Self {
        Self {
            table: IndexSchema {
                partition: partition.into(),
                sort: sort.map(str::to_string),
            },
            indexes: HashMap::new(),
            state: Mutex::new(State::default()),
        }
    }

    /// Declares a secondary index so queries against it sort and paginate by its keys.
    pub fn with_index(
        mut self,
        name: impl Into<String>,
        partition: impl Into<String>,
        sort: Option<&str>,
    ) -> Self {
        self.indexes.insert(
            name.into(),
            IndexSchema {
                partition: partition.into(),
                sort: sort.map(str::to_string),
            },
        );
        self
    }

    /// Makes the next call to `operation` fail with `error`. Queued errors are returned in
    /// order, one per call.
    pub fn fail_next(&self, operation: Operation, error: StoreError) {
        if let Ok(mut state) = self.state.lock() {
            state.failures.entry(operation).or_default().push_back(error);
        }
    }

    /// Every call made so far, in order. Failed calls are included.
    pub fn calls(&self) -> Vec<Operation> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    /// A snapshot of the stored items in insertion order.
    pub fn items(&self) -> Vec<Item> {
        self.state
            .lock()
            .map(|state| state.items.clone())
            .unwrap_or_default()
    }

    /// Inserts an item directly, bypassing call recording.
    pub fn seed(&self, item: Item) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        self.upsert(&mut state, item);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::backend("memory store lock poisoned"))
    }

    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, State>, StoreError> {
        let mut state = self.lock()?;
        state.calls.push(operation);
        tracing::debug!(?operation, "memory store call");
        if let Some(error) = state
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(state)
    }

    fn same_key(&self, a: &Item, b: &Item) -> bool {
        self.table_attributes()
            .all(|attribute| a.get(attribute) == b.get(attribute))
    }

    fn table_attributes(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.table.partition.as_str()).chain(self.table.sort.as_deref())
    }

    fn position(&self, state: &State, key: &Item) -> Option<usize> {
        state.items.iter().position(|item| self.same_key(item, key))
    }

    fn upsert(&self, state: &mut State, item: Item) {
        match self.position(state, &item) {
            Some(i) => state.items[i] = item,
            None => state.items.push(item),
        }
    }

    fn get(&self, request: GetItemRequest) -> Result<GetItemOutput, StoreError> {
        let state = self.begin(Operation::GetItem)?;
        let key = decode_wire_item(request.key)?;
        let item = self
            .position(&state, &key)
            .map(|i| project(state.items[i].clone(), request.projection.as_ref()));
        Ok(GetItemOutput::new(item.map(to_wire_item)))
    }

    fn run_query(&self, request: QueryRequest) -> Result<QueryOutput, StoreError> {
        let state = self.begin(Operation::Query)?;
        let schema = match &request.index_name {
            Some(name) => self.indexes.get(name).cloned().unwrap_or_else(|| IndexSchema {
                partition: request.condition.partition_attribute.clone(),
                sort: request.condition.sort.as_ref().map(|s| s.attribute.clone()),
            }),
            None => self.table.clone(),
        };

        let mut matches: Vec<&Item> = state
            .items
            .iter()
            .filter(|item| request.condition.matches(item))
            .collect();
        if let Some(sort) = &schema.sort {
            matches.sort_by(|a, b| match (a.get(sort), b.get(sort)) {
                (Some(a), Some(b)) => compare_key_values(a, b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            });
        }
        if !request.ascending {
            matches.reverse();
        }

        let key_attributes: Vec<&str> = self
            .table_attributes()
            .chain(std::iter::once(schema.partition.as_str()))
            .chain(schema.sort.as_deref())
            .collect();
        let page_key = |item: &Item| -> Item {
            key_attributes
                .iter()
                .filter_map(|a| item.get(*a).map(|v| (a.to_string(), v.clone())))
                .collect()
        };

        if let Some(start) = request.exclusive_start_key {
            let start = decode_wire_item(start)?;
            if let Some(i) = matches.iter().position(|item| page_key(*item) == start) {
                matches.drain(..=i);
            }
        }

        let limit = request
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .filter(|l| *l > 0)
            .unwrap_or(usize::MAX);
        let next_token =
            (matches.len() > limit).then(|| to_wire_item(page_key(matches[limit - 1])));
        let items = matches
            .into_iter()
            .take(limit)
            .map(|item| to_wire_item(project(item.clone(), request.projection.as_ref())))
            .collect();
        Ok(QueryOutput::new(items, next_token))
    }

    fn put(&self, request: PutItemRequest) -> Result<(), StoreError> {
        let mut state = self.begin(Operation::PutItem)?;
        let item = decode_wire_item(request.item)?;
        let existing = self.position(&state, &item).map(|i| &state.items[i]);
        check_condition(request.condition.as_ref(), existing)?;
        self.upsert(&mut state, item);
        Ok(())
    }

    fn update(&self, request: UpdateItemRequest) -> Result<(), StoreError> {
        let mut state = self.begin(Operation::UpdateItem)?;
        let key = decode_wire_item(request.key)?;
        let position = self.position(&state, &key);
        check_condition(request.condition.as_ref(), position.map(|i| &state.items[i]))?;

        let assignments = parse_set(&request.update_expression)?;
        let mut item = position.map(|i| state.items[i].clone()).unwrap_or(key);
        for (name, placeholder) in assignments {
            let attribute = resolve_name(name, &request.names)?;
            let value = request.values.get(placeholder).cloned().ok_or_else(|| {
                StoreError::backend(format!("no value bound to {placeholder}"))
            })?;
            item.insert(attribute, from_wire_value(value)?);
        }
        self.upsert(&mut state, item);
        Ok(())
    }

    fn delete(&self, key: WireItem) -> Result<(), StoreError> {
        let mut state = self.begin(Operation::DeleteItem)?;
        let key = decode_wire_item(key)?;
        if let Some(i) = self.position(&state, &key) {
            state.items.remove(i);
        }
        Ok(())
    }
}

impl DynamoStore for MemoryStore {
    async fn get_item(&self, request: GetItemRequest) -> Result<GetItemOutput, StoreError> {
        self.get(request)
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryOutput, StoreError> {
        self.run_query(request)
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), StoreError> {
        self.put(request)
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), StoreError> {
        self.update(request)
    }

    async fn delete_item(&self, key: WireItem) -> Result<(), StoreError> {
        self.delete(key)
    }
}

fn project(item: Item, projection: Option<&Projection>) -> Item {
    match projection {
        Some(p) if !p.is_empty() => {
            let keep = p.attributes();
            item.into_iter()
                .filter(|(name, _)| keep.iter().any(|k| k == name))
                .collect()
        }
        _ => item,
    }
}

fn resolve_name(name: &str, names: &HashMap<String, String>) -> Result<String, StoreError> {
    if name.starts_with('#') {
        names
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::backend(format!("no attribute name bound to {name}")))
    } else {
        Ok(name.to_string())
    }
}

fn check_condition(
    condition: Option<&ConditionExpression>,
    existing: Option<&Item>,
) -> Result<(), StoreError> {
    let Some(condition) = condition else {
        return Ok(());
    };
    let expression = condition.expression.trim();
    let (negate, inner) = if let Some(rest) = expression.strip_prefix("attribute_not_exists(") {
        (true, rest)
    } else if let Some(rest) = expression.strip_prefix("attribute_exists(") {
        (false, rest)
    } else {
        return Err(StoreError::backend(format!(
            "unsupported condition expression: {expression}"
        )));
    };
    let name = inner
        .strip_suffix(')')
        .map(str::trim)
        .ok_or_else(|| {
            StoreError::backend(format!("malformed condition expression: {expression}"))
        })?;
    let attribute = resolve_name(name, &condition.names)?;
    let exists = existing.is_some_and(|item| item.contains_key(&attribute));
    if exists == negate {
        return Err(StoreError::ConditionalCheckFailed);
    }
    Ok(())
}

fn parse_set(expression: &str) -> Result<Vec<(&str, &str)>, StoreError> {
    let unsupported =
        || StoreError::backend(format!("unsupported update expression: {expression}"));
    let assignments = expression
        .trim()
        .strip_prefix("SET ")
        .ok_or_else(unsupported)?;
    assignments
        .split(',')
        .map(|assignment| {
            let (name, placeholder) = assignment.split_once('=').ok_or_else(unsupported)?;
            let placeholder = placeholder.trim();
            if !placeholder.starts_with(':') {
                return Err(unsupported());
            }
            Ok((name.trim(), placeholder))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamo_assist_core::KeyCondition;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn parses_set_assignments() {
        let parsed = parse_set("SET gsi0_pk = :gsi0_pk, #status = :status").unwrap();
        assert_eq!(parsed, vec![("gsi0_pk", ":gsi0_pk"), ("#status", ":status")]);
        assert!(parse_set("REMOVE gsi0_pk").is_err());
    }

    #[test]
    fn attribute_not_exists_rejects_overwrites() {
        let existing = item(json!({"pk": "a", "sk": "a"}));
        let condition = ConditionExpression::attribute_not_exists("pk");
        assert!(check_condition(Some(&condition), None).is_ok());
        assert!(matches!(
            check_condition(Some(&condition), Some(&existing)),
            Err(StoreError::ConditionalCheckFailed)
        ));
    }

    #[tokio::test]
    async fn failures_are_injected_once() {
        let store = MemoryStore::default();
        store.fail_next(Operation::PutItem, StoreError::backend("boom"));

        let put = || PutItemRequest::new(to_wire_item(item(json!({"pk": "a", "sk": "b"}))));
        assert!(store.put_item(put()).await.is_err());
        store.put_item(put()).await.unwrap();
        assert_eq!(store.calls(), vec![Operation::PutItem, Operation::PutItem]);
        assert_eq!(store.items().len(), 1);
    }

    #[tokio::test]
    async fn query_sorts_and_paginates() {
        let store = MemoryStore::default();
        for n in [3, 1, 2] {
            store
                .seed(item(json!({"pk": "user#1", "sk": format!("order#{n}"), "n": n})))
                .unwrap();
        }
        store.seed(item(json!({"pk": "user#2", "sk": "order#9"}))).unwrap();

        let request = QueryRequest::new(KeyCondition::partition("pk", "user#1"))
            .ascending(true)
            .limit(2);
        let first = store.query(request.clone()).await.unwrap();
        assert_eq!(first.count, 2);
        assert!(first.next_token.is_some());
        let second = store
            .query(request.exclusive_start_key(first.next_token))
            .await
            .unwrap();
        assert_eq!(second.count, 1);
        assert!(second.next_token.is_none());
        assert_eq!(
            second.items[0]["sk"],
            aws_sdk_dynamodb::types::AttributeValue::S("order#3".into())
        );
    }
}
