/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Rewriting index attributes on stored items and moving items to a new primary key.

use dynamo_assist_core::encoding::to_wire_value;
use dynamo_assist_core::reserved::{is_plain_name, Placeholders};
use dynamo_assist_core::{Entity, IndexKind, Record, WireItem};
use std::collections::HashMap;

use crate::error::ReindexError;
use crate::store::{DynamoStore, PutItemRequest, UpdateItemRequest};

/// Fluent style builder for [ReindexConfig]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    table_name: Option<String>,
    dry_run: bool,
}

impl Builder {
    /// Name of the table being rewritten. Only used in log output.
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Log the writes that would be made instead of making them.
    ///
    /// Default is `false`.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Consumes the builder and constructs a [ReindexConfig]
    pub fn build(self) -> ReindexConfig {
        ReindexConfig {
            table_name: self.table_name,
            dry_run: self.dry_run,
        }
    }
}

/// Settings for a [`Reindexer`].
#[derive(Debug, Clone, Default)]
pub struct ReindexConfig {
    table_name: Option<String>,
    dry_run: bool,
}

impl ReindexConfig {
    /// Create a new [Builder]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The table name used in log output.
    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    /// True when writes are only logged.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }
}

/// An update that sets every resolvable secondary-index attribute of a record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReindexPatch {
    /// e.g. `SET gsi0_pk = :gsi0_pk, gsi0_sk = :gsi0_sk`
    pub update_expression: String,
    /// `#placeholder -> attribute` aliases for reserved or punctuated attribute names.
    pub names: HashMap<String, String>,
    /// `:placeholder -> value` bindings.
    pub values: WireItem,
    /// The attributes being set, in registration order.
    pub attributes: Vec<String>,
}

/// Rewrites stored items after their index definitions change.
#[derive(Debug)]
pub struct Reindexer<S> {
    store: S,
    config: ReindexConfig,
}

impl<S: DynamoStore> Reindexer<S> {
    /// Creates a reindexer writing through `store`.
    pub fn new(store: S, config: ReindexConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The reindexer settings.
    pub fn config(&self) -> &ReindexConfig {
        &self.config
    }

    /// Builds the update that sets every resolvable secondary-index attribute.
    ///
    /// Unresolved attributes are left out. Local indexes contribute only their sort
    /// attribute since their partition attribute is the table's. Returns `None` when
    /// nothing resolves.
    pub fn compute_patch<E: Entity>(&self, record: &Record<E>) -> Option<ReindexPatch> {
        compute_patch(record)
    }

    /// Applies the patch for `record` to the item stored under `original_key`.
    ///
    /// Returns the patch that was applied (or, in dry-run mode, logged), or `None` when
    /// the record has no resolvable secondary attributes.
    pub async fn reindex_item<E: Entity + Sync>(
        &self,
        original_key: WireItem,
        record: &Record<E>,
    ) -> Result<Option<ReindexPatch>, ReindexError> {
        let Some(patch) = compute_patch(record) else {
            tracing::debug!("no resolvable secondary index attributes; nothing to update");
            return Ok(None);
        };
        if self.config.dry_run {
            tracing::info!(
                table = self.config.table_name().unwrap_or_default(),
                key = ?original_key,
                expression = %patch.update_expression,
                values = ?patch.values,
                "dry run: would update item"
            );
            return Ok(Some(patch));
        }
        let request = UpdateItemRequest::new(
            original_key,
            patch.update_expression.clone(),
            patch.values.clone(),
        )
        .names(patch.names.clone());
        self.store.update_item(request).await?;
        Ok(Some(patch))
    }

    /// Writes `record` under its current primary key, then deletes the item under `old_key`.
    ///
    /// The delete is skipped when the put fails, when `keep_original` is set, or when the
    /// primary key did not change. The two writes are not atomic: a failure between
    /// them leaves both items in place.
    pub async fn migrate_primary_key<E: Entity + Sync>(
        &self,
        old_key: WireItem,
        record: &Record<E>,
        keep_original: bool,
    ) -> Result<(), ReindexError> {
        let item = record.to_wire_item(true)?;
        let new_key = record.wire_primary_key()?;
        if self.config.dry_run {
            tracing::info!(
                table = self.config.table_name().unwrap_or_default(),
                old_key = ?old_key,
                new_key = ?new_key,
                keep_original,
                "dry run: would migrate primary key"
            );
            return Ok(());
        }

        self.store.put_item(PutItemRequest::new(item)).await?;

        if keep_original {
            tracing::warn!(
                old_key = ?old_key,
                new_key = ?new_key,
                "keeping the original item; both items now exist"
            );
            return Ok(());
        }
        if new_key == old_key {
            tracing::debug!("primary key unchanged; not deleting");
            return Ok(());
        }
        self.store.delete_item(old_key).await?;
        Ok(())
    }
}

/// Builds the update that sets every resolvable secondary-index attribute of `record`.
pub fn compute_patch<E: Entity>(record: &Record<E>) -> Option<ReindexPatch> {
    let mut patch = ReindexPatch::default();
    let mut assignments = Vec::new();
    let mut tokens = Placeholders::new();

    for index in record.list_keys(true) {
        let partition = (index.kind() != IndexKind::Local)
            .then(|| index.partition_key().try_pair(record.entity()))
            .flatten();
        let sort = index
            .sort_key()
            .and_then(|sk| sk.try_pair(record.entity()));

        for (attribute, value) in partition.into_iter().chain(sort) {
            if patch.attributes.iter().any(|a| a == attribute) {
                continue;
            }
            let token = tokens.token(attribute);
            let placeholder = format!(":{token}");
            let target = if is_plain_name(attribute) {
                attribute.to_string()
            } else {
                let alias = format!("#{token}");
                patch.names.insert(alias.clone(), attribute.to_string());
                alias
            };
            assignments.push(format!("{target} = {placeholder}"));
            patch.values.insert(placeholder, to_wire_value(&value));
            patch.attributes.push(attribute.to_string());
        }
    }

    if assignments.is_empty() {
        return None;
    }
    patch.update_expression = format!("SET {}", assignments.join(", "));
    Some(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryStore, Operation};
    use crate::StoreError;
    use aws_sdk_dynamodb::types::AttributeValue;
    use dynamo_assist_core::{Index, IndexError, IndexRegistry, Key};
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use tracing_test::traced_test;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Ticket {
        id: String,
        queue: String,
        assignee: Option<String>,
    }

    impl Entity for Ticket {
        fn configure_indexes(indexes: &mut IndexRegistry<Self>) -> Result<(), IndexError> {
            indexes.add_primary(Index::primary(
                Key::computed("pk", |t: &Ticket| Some(json!(format!("ticket#{}", t.id)))),
                Some(Key::new("sk", "ticket")),
            ))?;
            indexes.add_secondary(Index::global(
                "gsi0",
                Key::computed("gsi0_pk", |t: &Ticket| Some(json!(format!("queue#{}", t.queue)))),
                None,
            ))?;
            indexes.add_secondary(Index::global(
                "gsi1",
                Key::new("gsi1_pk", "tickets#"),
                None,
            ))?;
            indexes.add_secondary(Index::global(
                "gsi2",
                Key::computed("gsi2_pk", |t: &Ticket| {
                    t.assignee.as_ref().map(|a| json!(format!("assignee#{a}")))
                }),
                None,
            ))?;
            Ok(())
        }
    }

    fn ticket(id: &str) -> Record<Ticket> {
        Record::new(Ticket {
            id: id.into(),
            queue: "billing".into(),
            assignee: None,
        })
        .unwrap()
    }

    fn reindexer(dry_run: bool) -> Reindexer<MemoryStore> {
        Reindexer::new(
            MemoryStore::default(),
            ReindexConfig::builder()
                .table_name("tickets")
                .dry_run(dry_run)
                .build(),
        )
    }

    #[test]
    fn patch_skips_unresolved_attributes() {
        let patch = compute_patch(&ticket("t1")).unwrap();
        assert_eq!(
            patch.update_expression,
            "SET gsi0_pk = :gsi0_pk, gsi1_pk = :gsi1_pk"
        );
        assert_eq!(patch.values.len(), 2);
        assert_eq!(
            patch.values[":gsi0_pk"],
            AttributeValue::S("queue#billing".into())
        );
        assert!(patch.values.contains_key(":gsi1_pk"));
        assert!(!patch.update_expression.contains("gsi2_pk"));
    }

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Legacy {
        id: String,
    }

    impl Entity for Legacy {
        fn configure_indexes(indexes: &mut IndexRegistry<Self>) -> Result<(), IndexError> {
            indexes.add_primary(Index::primary(
                Key::computed("pk", |l: &Legacy| Some(json!(l.id))),
                None,
            ))?;
            indexes.add_secondary(Index::global("by-dash", Key::new("queue-id", "a"), None))?;
            indexes.add_secondary(Index::global("by-underscore", Key::new("queue_id", "b"), None))?;
            indexes.add_secondary(Index::global("by-word", Key::new("status", "c"), None))?;
            Ok(())
        }
    }

    #[test]
    fn patch_aliases_names_and_keeps_placeholders_distinct() {
        let record = Record::new(Legacy { id: "l1".into() }).unwrap();
        let patch = compute_patch(&record).unwrap();
        assert_eq!(
            patch.update_expression,
            "SET #queue_id = :queue_id, queue_id = :queue_id_1, #status = :status"
        );
        assert_eq!(patch.names.len(), 2);
        assert_eq!(patch.names["#queue_id"], "queue-id");
        assert_eq!(patch.names["#status"], "status");
        assert_eq!(patch.values[":queue_id"], AttributeValue::S("a".into()));
        assert_eq!(patch.values[":queue_id_1"], AttributeValue::S("b".into()));
    }

    #[tokio::test]
    async fn reindex_updates_stored_item() {
        let reindexer = reindexer(false);
        let mut record = ticket("t1");
        // stored before any secondary index was declared
        let mut stored = record.primary_key().unwrap();
        stored.extend(record.serialize(false).unwrap());
        reindexer.store().seed(stored).unwrap();

        record.assignee = Some("ana".into());
        let patch = reindexer
            .reindex_item(record.wire_primary_key().unwrap(), &record)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patch.attributes, vec!["gsi0_pk", "gsi1_pk", "gsi2_pk"]);

        let stored = reindexer
            .store()
            .items()
            .into_iter()
            .find(|item| item.get("pk") == Some(&json!("ticket#t1")))
            .unwrap();
        assert_eq!(stored["gsi2_pk"], json!("assignee#ana"));
        assert_eq!(reindexer.store().calls(), vec![Operation::UpdateItem]);
    }

    #[traced_test]
    #[tokio::test]
    async fn dry_run_only_logs() {
        let reindexer = reindexer(true);
        let record = ticket("t1");
        let patch = reindexer
            .reindex_item(record.wire_primary_key().unwrap(), &record)
            .await
            .unwrap();
        assert!(patch.is_some());
        assert!(reindexer.store().calls().is_empty());
        assert!(logs_contain("dry run: would update item"));
        assert!(logs_contain("SET gsi0_pk = :gsi0_pk"));
    }

    #[tokio::test]
    async fn failed_put_never_deletes() {
        let reindexer = reindexer(false);
        reindexer
            .store()
            .fail_next(Operation::PutItem, StoreError::Backend("throttled".into()));
        let old = ticket("old");
        let new = ticket("new");

        let err = reindexer
            .migrate_primary_key(old.wire_primary_key().unwrap(), &new, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ReindexError::Store(StoreError::Backend(_))));
        assert_eq!(reindexer.store().calls(), vec![Operation::PutItem]);
    }

    #[tokio::test]
    async fn migration_moves_the_item() {
        let reindexer = reindexer(false);
        let old = ticket("old");
        reindexer.store().seed(old.serialize(true).unwrap()).unwrap();

        let new = ticket("new");
        reindexer
            .migrate_primary_key(old.wire_primary_key().unwrap(), &new, false)
            .await
            .unwrap();
        let items = reindexer.store().items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["pk"], json!("ticket#new"));
        assert_eq!(
            reindexer.store().calls(),
            vec![Operation::PutItem, Operation::DeleteItem]
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn keep_original_and_unchanged_keys_skip_delete() {
        let reindexer = reindexer(false);
        let record = ticket("t1");
        reindexer
            .migrate_primary_key(record.wire_primary_key().unwrap(), &record, false)
            .await
            .unwrap();
        assert_eq!(reindexer.store().items().len(), 1);

        let moved = ticket("t2");
        reindexer
            .migrate_primary_key(record.wire_primary_key().unwrap(), &moved, true)
            .await
            .unwrap();
        assert_eq!(reindexer.store().items().len(), 2);
        assert!(!reindexer.store().calls().contains(&Operation::DeleteItem));
        assert!(logs_contain("both items now exist"));
    }
}
