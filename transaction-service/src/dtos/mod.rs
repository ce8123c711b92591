use serde::{Deserialize, Deserializer};
use service_core::error::AppError;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::PayTransactionRequest;
use crate::utils::parse_date_of_birth;

/// Raw `POST /pay-transaction` body. Missing and `null` fields become empty
/// so they surface as field errors instead of decode failures.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PayTransactionPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(
        length(min = 1, message = "This field is required"),
        custom(function = "validate_patient_id")
    )]
    pub patient_id: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(
        length(min = 1, message = "This field is required"),
        custom(function = "validate_ddmmyyyy")
    )]
    pub date_of_birth: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "This field is required"))]
    pub record_type: String,
}

impl PayTransactionPayload {
    /// Run field validation and convert into the evaluator's command.
    pub fn into_request(self) -> Result<PayTransactionRequest, AppError> {
        self.validate()?;

        let patient_id = Uuid::parse_str(&self.patient_id)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid patient_id: {}", e)))?;

        Ok(PayTransactionRequest {
            patient_id,
            date_of_birth: self.date_of_birth,
            record_type: self.record_type,
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Empty values are left to the `length` rule so each field reports one problem.

fn validate_patient_id(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Ok(());
    }
    match Uuid::parse_str(value) {
        Ok(id) if id.is_nil() => {
            let mut err = ValidationError::new("required");
            err.message = Some("This field is required".into());
            Err(err)
        }
        Ok(_) => Ok(()),
        Err(_) => {
            let mut err = ValidationError::new("uuid");
            err.message = Some("Patient ID must be a valid UUID".into());
            Err(err)
        }
    }
}

fn validate_ddmmyyyy(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || parse_date_of_birth(value).is_some() {
        return Ok(());
    }
    let mut err = ValidationError::new("ddmmyyyy");
    err.message = Some("Date must be in DD-MM-YYYY format".into());
    Err(err)
}
