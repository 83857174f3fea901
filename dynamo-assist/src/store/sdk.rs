/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use aws_sdk_dynamodb::Client;
use dynamo_assist_core::WireItem;
use std::collections::HashMap;

use crate::error::{sdk_error, StoreError};
use crate::store::{
    ConditionExpression, DynamoStore, GetItemOutput, GetItemRequest, PutItemRequest, QueryOutput,
    QueryRequest, UpdateItemRequest,
};

/// Fluent style builder for [SdkStore]
#[derive(Debug, Clone, Default)]
pub struct Builder {
    client: Option<Client>,
    table_name: Option<String>,
    consistent_reads: bool,
}

impl Builder {
    /// Set the client used for every call
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the table all items live in
    pub fn table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Use strongly consistent reads unless a request says otherwise.
    ///
    /// Queries against global secondary indexes never request consistent reads.
    /// Default is `false`.
    pub fn consistent_reads(mut self, consistent_reads: bool) -> Self {
        self.consistent_reads = consistent_reads;
        self
    }

    /// Consumes the builder and constructs a [SdkStore]
    pub fn build(self) -> Result<SdkStore, StoreError> {
        let client = self
            .client
            .ok_or_else(|| StoreError::InvalidConfiguration("a client is required".into()))?;
        let table_name = self
            .table_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StoreError::InvalidConfiguration("a table name is required".into()))?;
        Ok(SdkStore {
            client,
            table_name,
            consistent_reads: self.consistent_reads,
        })
    }
}

/// A [`DynamoStore`] backed by the DynamoDB service client.
#[derive(Debug, Clone)]
pub struct SdkStore {
    client: Client,
    table_name: String,
    consistent_reads: bool,
}

impl SdkStore {
    /// Create a new [Builder]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The table this store reads and writes.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl DynamoStore for SdkStore {
    async fn get_item(&self, request: GetItemRequest) -> Result<GetItemOutput, StoreError> {
        tracing::debug!(table = %self.table_name, "get_item");
        let projection = request.projection.unwrap_or_default();
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(request.key))
            .consistent_read(request.consistent_read.unwrap_or(self.consistent_reads))
            .set_projection_expression(projection.expression().map(str::to_string))
            .set_expression_attribute_names(projection.attribute_names_opt().cloned())
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(GetItemOutput::new(output.item))
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryOutput, StoreError> {
        tracing::debug!(
            table = %self.table_name,
            index = request.index_name.as_deref().unwrap_or("primary"),
            "query"
        );
        let expression = request.condition.to_expression();
        let projection = request.projection.unwrap_or_default();
        let mut names = expression.names;
        names.extend(projection.attribute_names().clone());

        // Global indexes reject consistent reads, so only the table default applies to them.
        let consistent_read = request
            .consistent_read
            .unwrap_or(self.consistent_reads && request.index_name.is_none());

        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .set_index_name(request.index_name)
            .key_condition_expression(expression.expression)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(expression.values))
            .set_projection_expression(projection.expression().map(str::to_string))
            .scan_index_forward(request.ascending)
            .set_limit(request.limit)
            .set_exclusive_start_key(request.exclusive_start_key)
            .consistent_read(consistent_read)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(QueryOutput::new(
            output.items.unwrap_or_default(),
            output.last_evaluated_key,
        ))
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), StoreError> {
        tracing::debug!(
            table = %self.table_name,
            conditional = request.condition.is_some(),
            "put_item"
        );
        let (condition, names, values) = split_condition(request.condition);
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(request.item))
            .set_condition_expression(condition)
            .set_expression_attribute_names(non_empty(names))
            .set_expression_attribute_values(non_empty(values))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), StoreError> {
        tracing::debug!(
            table = %self.table_name,
            expression = %request.update_expression,
            "update_item"
        );
        let (condition, mut names, mut values) = split_condition(request.condition);
        names.extend(request.names);
        values.extend(request.values);
        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(request.key))
            .update_expression(request.update_expression)
            .set_condition_expression(condition)
            .set_expression_attribute_names(non_empty(names))
            .set_expression_attribute_values(non_empty(values))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_item(&self, key: WireItem) -> Result<(), StoreError> {
        tracing::debug!(table = %self.table_name, "delete_item");
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}

fn split_condition(
    condition: Option<ConditionExpression>,
) -> (Option<String>, HashMap<String, String>, WireItem) {
    match condition {
        Some(c) => (Some(c.expression), c.names, c.values),
        None => (None, HashMap::new(), WireItem::new()),
    }
}

// The service rejects empty attribute maps.
fn non_empty<K, V>(map: HashMap<K, V>) -> Option<HashMap<K, V>> {
    (!map.is_empty()).then_some(map)
}
