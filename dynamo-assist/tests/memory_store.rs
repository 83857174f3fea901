/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use dynamo_assist::naming::{gsi, lsi, PK, SK};
use dynamo_assist::{
    ConditionExpression, DynamoStore, Entity, GetItemRequest, Index, IndexError, IndexRegistry,
    Key, KeyOptions, MemoryStore, Operation, Projection, PutItemRequest, QueryRequest, Record,
    SortCondition, StoreError,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Message {
    channel: String,
    id: String,
    author: String,
    sent_at: i64,
    body: String,
}

impl Entity for Message {
    fn configure_indexes(indexes: &mut IndexRegistry<Self>) -> Result<(), IndexError> {
        indexes.add_primary(Index::primary(
            Key::computed(PK, |m: &Message| Some(json!(format!("channel#{}", m.channel)))),
            Some(Key::computed(SK, |m: &Message| Some(json!(format!("message#{}", m.id))))),
        ))?;
        let by_author = gsi(0);
        indexes.add_secondary(Index::global(
            by_author.index,
            Key::computed(by_author.partition, |m: &Message| {
                Some(json!(format!("author#{}", m.author)))
            }),
            Some(Key::computed(by_author.sort, |m: &Message| {
                Some(json!(format!("ts#{:010}", m.sent_at)))
            })),
        ))?;
        let by_time = lsi(0);
        indexes.add_secondary(Index::local(
            by_time.index,
            Key::computed(PK, |m: &Message| Some(json!(format!("channel#{}", m.channel)))),
            Key::computed(by_time.sort, |m: &Message| Some(json!(m.sent_at))),
        ))?;
        Ok(())
    }

    fn projection() -> Projection {
        Projection::from_attributes(["id", "author", "body"])
    }
}

fn message(id: &str, author: &str, sent_at: i64) -> Record<Message> {
    Record::new(Message {
        channel: "general".into(),
        id: id.into(),
        author: author.into(),
        sent_at,
        body: format!("hello from {author}"),
    })
    .unwrap()
}

fn store() -> MemoryStore {
    MemoryStore::default()
        .with_index("gsi0", "gsi0_pk", Some("gsi0_sk"))
        .with_index("lsi0", PK, Some("lsi0_sk"))
}

async fn put_all(store: &MemoryStore, records: &[Record<Message>]) {
    let items = records
        .iter()
        .map(|r| r.to_wire_item(true).unwrap())
        .collect();
    store.batch_put_items(items).await.unwrap();
}

#[tokio::test]
async fn get_item_maps_back_to_a_record() {
    let store = store();
    let original = message("m1", "ana", 100);
    put_all(&store, &[original.clone()]).await;

    let output = store
        .get_item(GetItemRequest::new(original.wire_primary_key().unwrap()))
        .await
        .unwrap();
    let mut restored = Record::<Message>::new(Message::default()).unwrap();
    restored.map(output).unwrap();
    assert_eq!(restored.entity(), original.entity());

    let missing = store
        .get_item(GetItemRequest::new(message("m9", "ana", 1).wire_primary_key().unwrap()))
        .await
        .unwrap();
    assert!(restored.map_envelope(missing).unwrap().is_none());
}

#[tokio::test]
async fn query_secondary_index_newest_first() {
    let store = store();
    put_all(
        &store,
        &[
            message("m1", "ana", 100),
            message("m2", "bo", 150),
            message("m3", "ana", 300),
            message("m4", "ana", 200),
        ],
    )
    .await;

    let probe = message("", "ana", 0);
    let condition = probe
        .key("gsi0", &KeyOptions::default().include_sort_key(false))
        .unwrap()
        .as_query()
        .cloned()
        .unwrap();
    let page = store
        .query(QueryRequest::new(condition).index_name("gsi0"))
        .await
        .unwrap();
    let ids: Vec<String> = page
        .records::<Message>()
        .unwrap()
        .into_iter()
        .map(|r| r.into_inner().id)
        .collect();
    assert_eq!(ids, vec!["m3", "m4", "m1"]);
}

#[tokio::test]
async fn range_query_on_local_index_with_projection() {
    let store = store();
    put_all(
        &store,
        &[
            message("m1", "ana", 100),
            message("m2", "bo", 150),
            message("m3", "cy", 300),
        ],
    )
    .await;

    let probe = message("", "", 0);
    let condition = probe
        .key("lsi0", &KeyOptions::query(SortCondition::Gte))
        .unwrap()
        .as_query()
        .cloned()
        .unwrap();
    let page = store
        .query(
            QueryRequest::new(condition)
                .index_name("lsi0")
                .ascending(true)
                .projection(Message::projection()),
        )
        .await
        .unwrap();
    assert_eq!(page.count, 3);
    assert!(page.items.iter().all(|item| !item.contains_key("pk")));
    assert!(page.items.iter().all(|item| item.contains_key("body")));
}

#[tokio::test]
async fn conditional_put_rejects_duplicates() {
    let store = store();
    let record = message("m1", "ana", 100);
    let put = || {
        PutItemRequest::new(record.to_wire_item(true).unwrap())
            .condition(ConditionExpression::attribute_not_exists(PK))
    };
    store.put_item(put()).await.unwrap();
    let err = store.put_item(put()).await.unwrap_err();
    assert!(matches!(err, StoreError::ConditionalCheckFailed));
    assert_eq!(store.calls(), vec![Operation::PutItem, Operation::PutItem]);
}

#[tokio::test]
async fn batch_get_skips_missing_keys() {
    let store = store();
    put_all(&store, &[message("m1", "ana", 1), message("m2", "bo", 2)]).await;

    let keys = ["m1", "m3", "m2"]
        .into_iter()
        .map(|id| message(id, "x", 0).wire_primary_key().unwrap())
        .collect();
    let items = store.batch_get_items(keys).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(
        store.calls(),
        vec![
            Operation::PutItem,
            Operation::PutItem,
            Operation::GetItem,
            Operation::GetItem,
            Operation::GetItem,
        ]
    );
}
