/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use crate::error::IndexError;
use crate::index::{Index, IndexKind, PRIMARY_INDEX};

/// The indexes declared by an entity.
///
/// All uniqueness checks run at registration so a misconfigured entity fails when it is
/// constructed rather than when it is first written.
pub struct IndexRegistry<E> {
    primary: Option<Index<E>>,
    secondaries: Vec<Index<E>>,
}

impl<E> IndexRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            primary: None,
            secondaries: Vec::new(),
        }
    }

    /// Registers the primary index, renaming it to `"primary"`.
    pub fn add_primary(&mut self, mut index: Index<E>) -> Result<&mut Self, IndexError> {
        index.mark_primary();
        if self.primary.is_some() {
            return Err(IndexError::DuplicateIndex {
                name: PRIMARY_INDEX.to_string(),
            });
        }
        index.partition_key().attribute_name()?;
        self.check_collisions(&index)?;
        tracing::trace!("registered primary index");
        self.primary = Some(index);
        Ok(self)
    }

    /// Registers a global or local secondary index.
    pub fn add_secondary(&mut self, index: Index<E>) -> Result<&mut Self, IndexError> {
        let name = index.name().ok_or(IndexError::MissingName)?.to_string();
        if name == PRIMARY_INDEX || index.is_primary() || self.contains(&name) {
            return Err(IndexError::DuplicateIndex { name });
        }
        index.partition_key().attribute_name()?;
        self.check_collisions(&index)?;
        tracing::trace!(index = %name, "registered secondary index");
        self.secondaries.push(index);
        Ok(self)
    }

    fn check_collisions(&self, candidate: &Index<E>) -> Result<(), IndexError> {
        let partition = candidate.partition_key().try_attribute_name();
        let sort = candidate
            .sort_key()
            .and_then(|sk| sk.try_attribute_name());

        if partition.is_some() && partition == sort {
            return Err(IndexError::AttributeCollision {
                attribute: partition.unwrap_or_default().to_string(),
                index: candidate.name().unwrap_or_default().to_string(),
            });
        }

        match candidate.kind() {
            IndexKind::Local => {
                if let Some(primary) = &self.primary {
                    check_local(candidate, primary.partition_key().try_attribute_name())?;
                }
            }
            IndexKind::Primary => {
                for local in self.secondaries.iter().filter(|i| i.kind() == IndexKind::Local) {
                    check_local(local, partition)?;
                }
            }
            IndexKind::Global => {}
        }

        for existing in self.values() {
            let owner = || existing.name().unwrap_or_default().to_string();
            let existing_partition = existing.partition_key().try_attribute_name();
            let shares_table_partition = matches!(
                (candidate.kind(), existing.kind()),
                (IndexKind::Local, IndexKind::Primary | IndexKind::Local)
                    | (IndexKind::Primary, IndexKind::Local)
            );

            if partition.is_some() && partition == existing_partition && !shares_table_partition {
                return Err(IndexError::AttributeCollision {
                    attribute: partition.unwrap_or_default().to_string(),
                    index: owner(),
                });
            }

            let existing_sort = existing.sort_key().and_then(|sk| sk.try_attribute_name());
            for attribute in [partition, sort].into_iter().flatten() {
                let reused = Some(attribute) == existing_sort
                    || (Some(attribute) != partition && Some(attribute) == existing_partition);
                if reused {
                    return Err(IndexError::AttributeCollision {
                        attribute: attribute.to_string(),
                        index: owner(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns true if an index with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.values().any(|index| index.name() == Some(name))
    }

    /// Looks up an index by name.
    pub fn get(&self, name: &str) -> Result<&Index<E>, IndexError> {
        self.values()
            .find(|index| index.name() == Some(name))
            .ok_or_else(|| IndexError::IndexNotFound {
                name: name.to_string(),
            })
    }

    /// The primary index, if one was registered.
    pub fn primary(&self) -> Option<&Index<E>> {
        self.primary.as_ref()
    }

    /// All secondary indexes in registration order.
    pub fn secondaries(&self) -> impl Iterator<Item = &Index<E>> {
        self.secondaries.iter()
    }

    /// Every index: the primary first, then secondaries in registration order.
    pub fn values(&self) -> impl Iterator<Item = &Index<E>> {
        self.primary.iter().chain(self.secondaries.iter())
    }

    /// Number of registered indexes.
    pub fn len(&self) -> usize {
        self.secondaries.len() + usize::from(self.primary.is_some())
    }

    /// True when nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes the primary index.
    pub fn remove_primary(&mut self) -> Option<Index<E>> {
        self.primary.take()
    }
}

// A local index must reuse the table's partition attribute.
fn check_local<E>(local: &Index<E>, table_partition: Option<&str>) -> Result<(), IndexError> {
    let attribute = local.partition_key().try_attribute_name();
    if table_partition.is_some() && attribute != table_partition {
        return Err(IndexError::InvalidLocalIndex {
            index: local.name().unwrap_or_default().to_string(),
            attribute: attribute.unwrap_or_default().to_string(),
        });
    }
    Ok(())
}

impl<E> Default for IndexRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for IndexRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            secondaries: self.secondaries.clone(),
        }
    }
}

impl<E> fmt::Debug for IndexRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values()).finish()
    }
}
