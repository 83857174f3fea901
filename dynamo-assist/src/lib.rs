/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Store access and index maintenance for `dynamo-assist-core` entities.
//!
//! This crate adds the I/O side of the index model:
//!
//! - [`DynamoStore`] - the async seam every store client implements
//! - `SdkStore` - a [`DynamoStore`] over `aws_sdk_dynamodb::Client` (feature `sdk`)
//! - `MemoryStore` - an in-process table for tests (feature `test-util`)
//! - [`Reindexer`] - rewrites index attributes and migrates primary keys
//!
//! Everything from `dynamo-assist-core` is re-exported.
//!
//! # Example
//!
//! ```no_run
//! use dynamo_assist::{
//!     DynamoStore, Entity, Index, IndexError, IndexRegistry, Key, KeyOptions, PutItemRequest,
//!     QueryRequest, Record, SdkStore,
//! };
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct User {
//!     id: String,
//!     email: String,
//! }
//!
//! impl Entity for User {
//!     fn configure_indexes(indexes: &mut IndexRegistry<Self>) -> Result<(), IndexError> {
//!         indexes.add_primary(Index::primary(
//!             Key::computed("pk", |u: &User| Some(json!(format!("user#{}", u.id)))),
//!             Some(Key::computed("sk", |u: &User| Some(json!(format!("user#{}", u.id))))),
//!         ))?;
//!         indexes.add_secondary(Index::global(
//!             "gsi0",
//!             Key::new("gsi0_pk", "users#"),
//!             Some(Key::computed("gsi0_sk", |u: &User| {
//!                 Some(json!(format!("email#{}", u.email)))
//!             })),
//!         ))?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn example(
//! #     client: aws_sdk_dynamodb::Client,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let store = SdkStore::builder().client(client).table_name("app").build()?;
//!
//! let record = Record::new(User { id: "u1".into(), email: "a@x.com".into() })?;
//! store.put_item(PutItemRequest::new(record.to_wire_item(true)?)).await?;
//!
//! let key = record.key("gsi0", &KeyOptions::default())?;
//! let condition = key.as_query().cloned().ok_or("not a query")?;
//! let page = store
//!     .query(QueryRequest::new(condition).index_name("gsi0"))
//!     .await?;
//! let users: Vec<Record<User>> = page.records()?;
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub mod error;
pub mod reindex;
pub mod store;

pub use dynamo_assist_core::*;

pub use error::{ReindexError, StoreError};
pub use reindex::{ReindexConfig, ReindexPatch, Reindexer};
#[cfg(any(test, feature = "test-util"))]
pub use store::memory::{MemoryStore, Operation};
#[cfg(feature = "sdk")]
pub use store::sdk::SdkStore;
pub use store::{
    ConditionExpression, DynamoStore, GetItemOutput, GetItemRequest, PutItemRequest,
    QueryOutput, QueryRequest, UpdateItemRequest,
};
