//! Exact-key single-row table lookup.

use serde_json::Value;
use thiserror::Error;

use crate::certify::types::EntityKind;
use crate::chain::client::SharedChainRpc;
use crate::chain::types::{ChainError, Name, TableRowsRequest};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Which row to read. Without a key the first row of the table is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableKey {
    pub code: String,
    pub table: String,
    pub scope: String,
    pub key: Option<String>,
}

impl TableKey {
    fn to_request(&self) -> TableRowsRequest {
        TableRowsRequest {
            json: true,
            code: self.code.clone(),
            scope: self.scope.clone(),
            table: self.table.clone(),
            lower_bound: self.key.clone(),
            upper_bound: self.key.clone(),
            limit: 1,
            reverse: false,
            show_payer: false,
        }
    }
}

#[derive(Clone)]
pub struct TableQuery {
    client: SharedChainRpc,
    contract: Name,
}

impl TableQuery {
    pub fn new(client: SharedChainRpc, contract: Name) -> Self {
        Self { client, contract }
    }

    /// Row 0 of the lookup, unmodified.
    pub async fn fetch_row(&self, key: &TableKey) -> Result<Value, QueryError> {
        let rows = self.client.get_table_rows(&key.to_request()).await?;
        rows.rows.into_iter().next().ok_or_else(|| {
            QueryError::NotFound(format!(
                "No index found in {} table with the key value: {}",
                key.table,
                key.key.as_deref().unwrap_or_default()
            ))
        })
    }

    /// An institution or corporate row, scoped by the contract account.
    pub async fn entity(&self, kind: EntityKind, id: u64) -> Result<Value, QueryError> {
        let contract = self.contract.to_string();
        self.fetch_row(&TableKey {
            code: contract.clone(),
            table: kind.entity_table().to_string(),
            scope: contract,
            key: Some(id.to_string()),
        })
        .await
    }

    /// A certificate row, scoped by its owner id.
    pub async fn certificate(&self, owner_id: u64, certificate_id: u64) -> Result<Value, QueryError> {
        self.fetch_row(&TableKey {
            code: self.contract.to_string(),
            table: "certificate".to_string(),
            scope: owner_id.to_string(),
            key: Some(certificate_id.to_string()),
        })
        .await
    }

    /// The certificate row with `participants` narrowed to `[participant]`.
    pub async fn participant(
        &self,
        owner_id: u64,
        certificate_id: u64,
        participant: &str,
    ) -> Result<Value, QueryError> {
        let row = self.certificate(owner_id, certificate_id).await?;
        narrow_to_participant(row, participant)
    }
}

fn narrow_to_participant(mut row: Value, participant: &str) -> Result<Value, QueryError> {
    let present = row
        .get("participants")
        .and_then(Value::as_array)
        .is_some_and(|list| list.iter().any(|p| p.as_str() == Some(participant)));
    if !present {
        return Err(QueryError::NotFound(format!(
            "No participant {} found in specified certificate.",
            participant
        )));
    }
    row["participants"] = Value::from(vec![participant]);
    Ok(row)
}
