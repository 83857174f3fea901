/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! A single named key attribute of an index.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::IndexError;

/// Callback deriving a key value from the current state of the owning entity.
///
/// Returning `None` means the value cannot be derived yet (for example, a field it
/// depends on is unset).
pub type ComputeFn<E> = Arc<dyn Fn(&E) -> Option<Value> + Send + Sync>;

/// The value of a [`Key`]: either fixed, or derived from the entity on every access.
pub enum KeyValue<E> {
    /// A constant value.
    Static(Value),
    /// A value computed from the owning entity. Never cached.
    Computed(ComputeFn<E>),
}

impl<E> KeyValue<E> {
    fn resolve(&self, entity: &E) -> Option<Value> {
        match self {
            KeyValue::Static(v) => Some(v.clone()),
            KeyValue::Computed(f) => f(entity),
        }
    }
}

impl<E> Clone for KeyValue<E> {
    fn clone(&self) -> Self {
        match self {
            KeyValue::Static(v) => KeyValue::Static(v.clone()),
            KeyValue::Computed(f) => KeyValue::Computed(Arc::clone(f)),
        }
    }
}

impl<E> fmt::Debug for KeyValue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Static(v) => f.debug_tuple("Static").field(v).finish(),
            KeyValue::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// A partition or sort key: an attribute name plus a static or computed value.
pub struct Key<E> {
    attribute_name: Option<String>,
    value: Option<KeyValue<E>>,
}

impl<E> Key<E> {
    /// Creates a key with a constant value.
    pub fn new(attribute_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attribute_name: Some(attribute_name.into()),
            value: Some(KeyValue::Static(value.into())),
        }
    }

    /// Creates a key whose value is derived from the entity each time it is read.
    pub fn computed<F>(attribute_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&E) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            attribute_name: Some(attribute_name.into()),
            value: Some(KeyValue::Computed(Arc::new(f))),
        }
    }

    /// Creates a key with neither an attribute name nor a value.
    pub fn unset() -> Self {
        Self {
            attribute_name: None,
            value: None,
        }
    }

    /// Returns the attribute name, or [`IndexError::MissingAttributeName`] when unset.
    pub fn attribute_name(&self) -> Result<&str, IndexError> {
        self.attribute_name
            .as_deref()
            .ok_or(IndexError::MissingAttributeName)
    }

    /// Returns the attribute name if one has been set.
    pub fn try_attribute_name(&self) -> Option<&str> {
        self.attribute_name.as_deref()
    }

    /// Sets the attribute name.
    pub fn set_attribute_name(&mut self, attribute_name: impl Into<String>) -> &mut Self {
        self.attribute_name = Some(attribute_name.into());
        self
    }

    /// Sets the key value. Accepts a [`KeyValue`] or anything convertible to one.
    pub fn set_value(&mut self, value: impl Into<KeyValue<E>>) -> &mut Self {
        self.value = Some(value.into());
        self
    }

    /// Returns true if a constant or computed value has been assigned.
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Resolves the value against `entity`.
    ///
    /// Fails with [`IndexError::MissingValue`] when no value was assigned or the
    /// computed value is currently unresolved.
    pub fn value(&self, entity: &E) -> Result<Value, IndexError> {
        self.try_value(entity).ok_or_else(|| IndexError::MissingValue {
            attribute: self.attribute_name.clone().unwrap_or_default(),
        })
    }

    /// Resolves the value against `entity`, returning `None` instead of an error.
    pub fn try_value(&self, entity: &E) -> Option<Value> {
        self.value.as_ref().and_then(|v| v.resolve(entity))
    }

    /// Resolves both the attribute name and the value, if both are available.
    pub fn try_pair(&self, entity: &E) -> Option<(&str, Value)> {
        let name = self.try_attribute_name()?;
        Some((name, self.try_value(entity)?))
    }
}

impl<E> Default for Key<E> {
    fn default() -> Self {
        Self::unset()
    }
}

impl<E> Clone for Key<E> {
    fn clone(&self) -> Self {
        Self {
            attribute_name: self.attribute_name.clone(),
            value: self.value.clone(),
        }
    }
}

impl<E> fmt::Debug for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("attribute_name", &self.attribute_name)
            .field("value", &self.value)
            .finish()
    }
}

impl<E> From<Value> for KeyValue<E> {
    fn from(value: Value) -> Self {
        KeyValue::Static(value)
    }
}

impl<E> From<&str> for KeyValue<E> {
    fn from(value: &str) -> Self {
        KeyValue::Static(Value::String(value.to_string()))
    }
}

impl<E> From<String> for KeyValue<E> {
    fn from(value: String) -> Self {
        KeyValue::Static(Value::String(value))
    }
}

/// Renders a key value as the plain text used when composing prefixes and ranges.
///
/// Strings are used as-is (no quotes); other scalars use their JSON text.
pub(crate) fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Account {
        id: Option<String>,
    }

    #[test]
    fn static_value_resolves() {
        let key: Key<Account> = Key::new("pk", "users#");
        let account = Account { id: None };
        assert_eq!(key.attribute_name().unwrap(), "pk");
        assert_eq!(key.value(&account).unwrap(), json!("users#"));
    }

    #[test]
    fn computed_value_reads_current_state() {
        let key: Key<Account> = Key::computed("pk", |a: &Account| {
            a.id.as_ref().map(|id| json!(format!("account#{id}")))
        });
        let mut account = Account { id: None };
        assert_eq!(
            key.value(&account).unwrap_err(),
            IndexError::MissingValue {
                attribute: "pk".into()
            }
        );
        account.id = Some("a1".into());
        assert_eq!(key.value(&account).unwrap(), json!("account#a1"));
        account.id = Some("a2".into());
        assert_eq!(key.value(&account).unwrap(), json!("account#a2"));
    }

    #[test]
    fn unset_key_reports_missing_pieces() {
        let mut key: Key<Account> = Key::unset();
        let account = Account { id: None };
        assert_eq!(
            key.attribute_name().unwrap_err(),
            IndexError::MissingAttributeName
        );
        assert!(key.try_value(&account).is_none());

        key.set_attribute_name("sk").set_value("fixed");
        assert_eq!(key.try_pair(&account), Some(("sk", json!("fixed"))));
    }

    #[test]
    fn plain_text_strips_quotes() {
        assert_eq!(plain_text(&json!("ts#")), "ts#");
        assert_eq!(plain_text(&json!(42)), "42");
        assert_eq!(plain_text(&Value::Null), "");
    }
}
