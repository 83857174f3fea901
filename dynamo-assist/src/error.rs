/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use dynamo_assist_core::{IndexError, MappingError};

/// Failure reported by a [`DynamoStore`](crate::DynamoStore).
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// A condition expression attached to the write was not satisfied.
    #[error("the conditional request failed")]
    ConditionalCheckFailed,

    /// The service call failed.
    #[error(transparent)]
    Sdk(Box<aws_sdk_dynamodb::Error>),

    /// A non-SDK backend failed.
    #[error("store backend error: {0}")]
    Backend(String),

    /// An item could not be encoded or decoded.
    #[error(transparent)]
    Encoding(#[from] MappingError),

    /// The store was built without a required setting.
    #[error("invalid store configuration: {0}")]
    InvalidConfiguration(String),
}

impl StoreError {
    pub(crate) fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }
}

// Conditional-check failures are surfaced as their own variant so callers can match on them.
pub(crate) fn sdk_error<E>(err: E) -> StoreError
where
    E: Into<aws_sdk_dynamodb::Error>,
{
    match err.into() {
        aws_sdk_dynamodb::Error::ConditionalCheckFailedException(_) => {
            StoreError::ConditionalCheckFailed
        }
        other => StoreError::Sdk(Box::new(other)),
    }
}

/// Failure while rewriting index attributes or migrating a primary key.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ReindexError {
    /// The store rejected a read or write.
    #[error("store operation failed")]
    Store(#[from] StoreError),

    /// The record could not be encoded.
    #[error("failed to encode record")]
    Mapping(#[from] MappingError),

    /// The record's primary key could not be resolved.
    #[error("failed to resolve record key")]
    Index(#[from] IndexError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn reindex_error_keeps_source() {
        let err = ReindexError::from(StoreError::ConditionalCheckFailed);
        assert_eq!(err.to_string(), "store operation failed");
        assert_eq!(
            err.source().map(|e| e.to_string()),
            Some("the conditional request failed".to_string())
        );
    }
}
