//! External payment authorization.
//!
//! The workflow only needs a two-outcome answer for a patient/age/record-type
//! context. `HttpAuthorizer` asks a remote endpoint; `SimulatedAuthorizer`
//! flips a fair coin when no endpoint is configured.

use crate::config::AuthorizerConfig;
use crate::models::Patient;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Context sent to the authorizer.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationRequest {
    pub patient: Patient,
    pub age: i32,
    pub record_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Approved,
    Declined,
}

#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization>;
}

/// Uniform 50/50 stand-in for a real authorization call.
#[derive(Debug, Default, Clone)]
pub struct SimulatedAuthorizer;

#[async_trait]
impl PaymentAuthorizer for SimulatedAuthorizer {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization> {
        let approved = rand::thread_rng().gen_bool(0.5);

        tracing::debug!(
            patient_id = %request.patient.id,
            age = request.age,
            approved,
            "Simulated authorization"
        );

        Ok(if approved {
            Authorization::Approved
        } else {
            Authorization::Declined
        })
    }
}

/// Authorizer backed by a remote HTTP endpoint.
///
/// 2xx approves, 4xx declines, anything else is an error.
#[derive(Clone)]
pub struct HttpAuthorizer {
    client: Client,
    endpoint: String,
    api_key: Secret<String>,
}

impl HttpAuthorizer {
    pub fn new(endpoint: String, api_key: Secret<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn from_config(config: &AuthorizerConfig) -> Result<Option<Self>> {
        config
            .endpoint
            .as_ref()
            .map(|endpoint| {
                Self::new(
                    endpoint.clone(),
                    config.api_key.clone(),
                    Duration::from_secs(config.timeout_seconds),
                )
            })
            .transpose()
    }
}

#[async_trait]
impl PaymentAuthorizer for HttpAuthorizer {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<Authorization> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| anyhow!("authorization request failed: {}", e))?;

        let status = response.status();
        tracing::debug!(status = %status, patient_id = %request.patient.id, "Authorization response");

        if status.is_success() {
            Ok(Authorization::Approved)
        } else if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::info!(status = %status, body = %body, "Authorization declined");
            Ok(Authorization::Declined)
        } else {
            Err(anyhow!("authorizer returned {}", status))
        }
    }
}
