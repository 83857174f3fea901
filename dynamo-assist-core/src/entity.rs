/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Entities, records, and mapping between records and flat items.

use aws_sdk_dynamodb::operation::get_item::GetItemOutput;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::encoding::{decode_wire_item, encode_item, Encoding, Item, Wire, WireItem};
use crate::error::{IndexError, MappingError, RecordError};
use crate::index::{Index, IndexDebugInfo, IndexKey, KeyOptions, PRIMARY_INDEX};
use crate::projection::Projection;
use crate::registry::IndexRegistry;

const RESPONSE_METADATA: &str = "ResponseMetadata";
const ITEM: &str = "Item";

/// A model type stored as a single item.
///
/// The serde derive is the field list: every serialized field is written and
/// `#[serde(skip)]` fields are never written or read. Skipped fields keep their
/// current values across [`Record::map`] once [`Entity::restore_excluded`] carries
/// them over.
///
/// # Example
///
/// ```
/// use dynamo_assist_core::{Entity, Index, IndexError, IndexRegistry, Key};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct User {
///     id: String,
///     email: String,
/// }
///
/// impl Entity for User {
///     fn configure_indexes(indexes: &mut IndexRegistry<Self>) -> Result<(), IndexError> {
///         indexes.add_primary(Index::primary(
///             Key::computed("pk", |u: &User| Some(format!("user#{}", u.id).into())),
///             Some(Key::computed("sk", |u: &User| Some(format!("user#{}", u.id).into()))),
///         ))?;
///         Ok(())
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Sized + 'static {
    /// Declares the indexes of this entity.
    fn configure_indexes(indexes: &mut IndexRegistry<Self>) -> Result<(), IndexError>;

    /// The attributes read back by default. Empty means every attribute.
    fn projection() -> Projection {
        Projection::default()
    }

    /// Moves `#[serde(skip)]` state from `previous` into a freshly mapped `self`.
    ///
    /// Called by [`Record::map`] after the merged item has been deserialized. The
    /// default does nothing, which suits entities without skipped fields.
    fn restore_excluded(&mut self, previous: Self) {
        let _ = previous;
    }
}

/// A source that can be mapped onto a record.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum MapSource {
    /// A flat item in the native encoding.
    Item(Item),
    /// Any JSON value. Objects carrying `ResponseMetadata` are treated as response
    /// envelopes with the item under `Item`.
    Value(Value),
    /// A flat item in the wire encoding.
    Wire(WireItem),
    /// A typed read response whose item may be absent.
    WireEnvelope(Option<WireItem>),
}

impl MapSource {
    /// Extracts the flat item. `Ok(None)` means an envelope without an item.
    pub fn into_item(self) -> Result<Option<Item>, MappingError> {
        match self {
            MapSource::Item(item) => Ok(Some(item)),
            MapSource::Value(Value::Object(mut object)) => {
                if !object.contains_key(RESPONSE_METADATA) {
                    return Ok(Some(object));
                }
                match object.remove(ITEM) {
                    None | Some(Value::Null) => Ok(None),
                    Some(Value::Object(item)) => Ok(Some(item)),
                    Some(other) => Err(MappingError::not_an_object(json_type(&other))),
                }
            }
            MapSource::Value(other) => Err(MappingError::not_an_object(json_type(&other))),
            MapSource::Wire(item) => decode_wire_item(item).map(Some),
            MapSource::WireEnvelope(item) => item.map(decode_wire_item).transpose(),
        }
    }
}

impl From<Item> for MapSource {
    fn from(item: Item) -> Self {
        MapSource::Item(item)
    }
}

impl From<Value> for MapSource {
    fn from(value: Value) -> Self {
        MapSource::Value(value)
    }
}

impl From<WireItem> for MapSource {
    fn from(item: WireItem) -> Self {
        MapSource::Wire(item)
    }
}

impl From<GetItemOutput> for MapSource {
    fn from(output: GetItemOutput) -> Self {
        MapSource::WireEnvelope(output.item)
    }
}

/// An entity together with its index registry.
///
/// Index values are computed from the entity on every access, so mutating the entity
/// through [`DerefMut`] is immediately reflected in [`Record::serialize`] and
/// [`Record::key`].
pub struct Record<E> {
    entity: E,
    indexes: IndexRegistry<E>,
}

impl<E: Entity> Record<E> {
    /// Wraps `entity`, registering its indexes. Configuration errors are returned here.
    pub fn new(entity: E) -> Result<Self, IndexError> {
        let mut indexes = IndexRegistry::new();
        E::configure_indexes(&mut indexes)?;
        Ok(Self { entity, indexes })
    }

    /// Builds a record from `E::default()` and maps `source` onto it.
    pub fn from_source(source: impl Into<MapSource>) -> Result<Self, RecordError>
    where
        E: Default,
    {
        let mut record = Self::new(E::default())?;
        record.map(source)?;
        Ok(record)
    }

    /// Merges `source` into the entity.
    ///
    /// Objects merge recursively into fields that already hold objects, lists and
    /// scalars replace the field, and attributes without a matching field are ignored.
    /// An envelope without an item is an error; see [`Record::map_envelope`].
    pub fn map(&mut self, source: impl Into<MapSource>) -> Result<&mut Self, MappingError> {
        let item = source
            .into()
            .into_item()
            .map_err(|e| e.with_model(model_name::<E>()))?
            .ok_or_else(|| MappingError::missing_item().with_model(model_name::<E>()))?;
        self.merge(item)?;
        Ok(self)
    }

    /// Like [`Record::map`], but an envelope without an item yields `Ok(None)`.
    pub fn map_envelope(
        &mut self,
        source: impl Into<MapSource>,
    ) -> Result<Option<&mut Self>, MappingError> {
        match source
            .into()
            .into_item()
            .map_err(|e| e.with_model(model_name::<E>()))?
        {
            Some(item) => {
                self.merge(item)?;
                Ok(Some(self))
            }
            None => Ok(None),
        }
    }

    fn merge(&mut self, item: Item) -> Result<(), MappingError> {
        let mut current = match self.fields_value()? {
            Value::Object(current) => current,
            other => {
                return Err(
                    MappingError::not_an_object(json_type(&other)).with_model(model_name::<E>())
                )
            }
        };
        merge_objects(&mut current, item);
        let mapped = serde_json::from_value(Value::Object(current))
            .map_err(|e| MappingError::deserialize(e).with_model(model_name::<E>()))?;
        let previous = std::mem::replace(&mut self.entity, mapped);
        self.entity.restore_excluded(previous);
        Ok(())
    }

    fn fields_value(&self) -> Result<Value, MappingError> {
        serde_json::to_value(&self.entity)
            .map_err(|e| MappingError::serialize(e).with_model(model_name::<E>()))
    }

    /// Returns the item in the native encoding.
    ///
    /// Null fields are omitted. With `include_indexes`, every resolvable index pair is
    /// added after the fields (primary first), overwriting same-named fields.
    pub fn serialize(&self, include_indexes: bool) -> Result<Item, MappingError> {
        let mut item: Item = match self.fields_value()? {
            Value::Object(fields) => fields.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            other => {
                return Err(
                    MappingError::not_an_object(json_type(&other)).with_model(model_name::<E>())
                )
            }
        };
        if include_indexes {
            for index in self.indexes.values() {
                item.extend(index.to_dict(&self.entity, true));
            }
        }
        Ok(item)
    }

    /// Returns the item built by `encoding`.
    pub fn encode<En: Encoding>(
        &self,
        include_indexes: bool,
        encoding: &En,
    ) -> Result<Vec<(String, En::Value)>, MappingError> {
        Ok(encode_item(self.serialize(include_indexes)?, encoding))
    }

    /// Returns the item in the wire encoding.
    pub fn to_wire_item(&self, include_indexes: bool) -> Result<WireItem, MappingError> {
        Ok(self.encode(include_indexes, &Wire)?.into_iter().collect())
    }

    /// The indexes declared for this entity.
    pub fn indexes(&self) -> &IndexRegistry<E> {
        &self.indexes
    }

    /// Looks up an index by name.
    pub fn index(&self, name: &str) -> Result<&Index<E>, IndexError> {
        self.indexes.get(name)
    }

    /// The registered indexes in order, optionally without the primary.
    pub fn list_keys(&self, exclude_primary: bool) -> Vec<&Index<E>> {
        self.indexes
            .values()
            .filter(|index| !(exclude_primary && index.is_primary()))
            .collect()
    }

    /// Builds a key or query condition for the named index.
    pub fn key(&self, index: &str, options: &KeyOptions) -> Result<IndexKey, IndexError> {
        self.indexes.get(index)?.key(&self.entity, options)
    }

    /// The primary lookup key in the native encoding.
    pub fn primary_key(&self) -> Result<Item, IndexError> {
        self.indexes
            .primary()
            .ok_or_else(|| IndexError::IndexNotFound {
                name: PRIMARY_INDEX.to_string(),
            })?
            .lookup_key(&self.entity)
    }

    /// The primary lookup key in the wire encoding.
    pub fn wire_primary_key(&self) -> Result<WireItem, IndexError> {
        Ok(encode_item(self.primary_key()?, &Wire).into_iter().collect())
    }

    /// Describes how the named index would be queried right now.
    pub fn debug_info(
        &self,
        index: &str,
        options: &KeyOptions,
    ) -> Result<IndexDebugInfo, IndexError> {
        Ok(self.indexes.get(index)?.debug_info(&self.entity, options))
    }

    /// The entity's default projection.
    pub fn projection(&self) -> Projection {
        E::projection()
    }
}

impl<E> Record<E> {
    /// Borrows the entity.
    pub fn entity(&self) -> &E {
        &self.entity
    }

    /// Unwraps the entity, dropping the registry.
    pub fn into_inner(self) -> E {
        self.entity
    }
}

impl<E> Deref for Record<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E> DerefMut for Record<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.entity
    }
}

impl<E: Clone> Clone for Record<E> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            indexes: self.indexes.clone(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for Record<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("entity", &self.entity)
            .field("indexes", &self.indexes)
            .finish()
    }
}

fn merge_objects(target: &mut Item, source: Item) {
    for (name, value) in source {
        match (target.get_mut(&name), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge_objects(existing, nested)
            }
            (_, value) => {
                target.insert(name, value);
            }
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn model_name<E>() -> &'static str {
    let name = std::any::type_name::<E>();
    name.rsplit("::").next().unwrap_or(name)
}
