use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;

use crate::{dtos::PayTransactionPayload, models::Transaction, AppState};

/// `POST /pay-transaction`
///
/// Field errors are reported before the workflow runs. Recorded outcomes,
/// including `failed` ones, are returned with 200.
pub async fn pay_transaction(
    State(state): State<AppState>,
    payload: Result<Json<PayTransactionPayload>, JsonRejection>,
) -> Result<Json<Transaction>, AppError> {
    let Json(payload) =
        payload.map_err(|rejection| AppError::BadRequest(anyhow::anyhow!(rejection.body_text())))?;

    let request = payload.into_request()?;

    tracing::info!(
        patient_id = %request.patient_id,
        record_type = %request.record_type,
        "Processing pay transaction"
    );

    let transaction = state.service.pay_transaction(request).await?;

    Ok(Json(transaction))
}
