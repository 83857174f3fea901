/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Index model for single-table DynamoDB designs.
//!
//! An entity declares a primary key and any number of secondary indexes whose key
//! values are computed from its fields. A [`Record`] pairs the entity with those
//! indexes and produces:
//!
//! - [`Record::serialize`] / [`Record::to_wire_item`] - the flat item with every
//!   resolvable index attribute added
//! - [`Record::key`] - a point-lookup key or a query [`KeyCondition`] for an index
//! - [`Record::map`] - the entity populated from an item or a read response
//!
//! This crate performs no I/O.
//!
//! # Example
//!
//! ```
//! use dynamo_assist_core::{Entity, Index, IndexError, IndexRegistry, Key, KeyOptions, Record};
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
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let record = Record::new(User { id: "u1".into(), email: "a@x.com".into() })?;
//! let item = record.serialize(true)?;
//! assert_eq!(item["pk"], "user#u1");
//! assert_eq!(item["gsi0_sk"], "email#a@x.com");
//!
//! let by_email = record.key("gsi0", &KeyOptions::default())?;
//! let expression = by_email.as_query().ok_or("not a query")?.to_expression();
//! assert_eq!(
//!     expression.expression,
//!     "#gsi0_pk = :gsi0_pk AND begins_with(#gsi0_sk, :gsi0_sk)"
//! );
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub mod codec;
mod condition;
pub mod encoding;
mod entity;
pub mod error;
mod index;
mod key;
pub mod naming;
mod projection;
mod registry;
pub mod reserved;

pub use condition::{
    compare_key_values, KeyCondition, KeyConditionExpression, SortCondition, SortKeyCondition,
    SortKeyOperand,
};
pub use encoding::{decode_wire_item, to_wire_item, Item, WireItem};
pub use entity::{Entity, MapSource, Record};
pub use error::{ConditionParseError, IndexError, MappingError, MappingErrorKind, RecordError};
pub use index::{
    DebugOptions, DebugRange, Index, IndexDebugInfo, IndexKey, IndexKind, KeyDebugInfo,
    KeyOptions, QueryType, SortKeyDebugInfo, PRIMARY_INDEX,
};
pub use key::{ComputeFn, Key, KeyValue};
pub use projection::Projection;
pub use registry::IndexRegistry;
