//! Transaction model: the persisted outcome of one pay-transaction request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Final status of a recorded transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Recorded transaction. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: TransactionStatus,
    pub api_response: serde_json::Value,
    pub record_type: String,
    pub date_of_birth: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a finalized record for `request` with a fresh id.
    pub fn record(
        request: &PayTransactionRequest,
        status: TransactionStatus,
        api_response: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            status,
            api_response,
            record_type: request.record_type.clone(),
            date_of_birth: request.date_of_birth.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Structured pay-transaction command, after boundary validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayTransactionRequest {
    pub patient_id: Uuid,
    /// `DD-MM-YYYY`
    pub date_of_birth: String,
    pub record_type: String,
}
