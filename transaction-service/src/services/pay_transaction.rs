//! Pay-transaction workflow.
//!
//! Gates run in a fixed order: patient lookup, date-of-birth parse, age,
//! record type, external authorization. A missing patient or an unparseable
//! date aborts with no record. Every other path persists exactly one
//! transaction, `failed` or `success`, and returns the stored copy.

use crate::models::{PayTransactionRequest, Transaction, TransactionStatus};
use crate::services::authorizer::{Authorization, AuthorizationRequest, PaymentAuthorizer};
use crate::services::metrics::record_transaction;
use crate::services::repository::{PatientRepository, TransactionRepository};
use crate::utils::{age_on, parse_date_of_birth};
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const MINIMUM_AGE: i32 = 18;
pub const REQUIRED_RECORD_TYPE: &str = "NEW";

#[derive(Debug, Error)]
pub enum PayTransactionError {
    #[error("patient not found")]
    PatientNotFound(Uuid),

    #[error("date of birth format must be DD-MM-YYYY")]
    InvalidDateOfBirth(String),

    #[error("authorization failed: {0}")]
    Authorization(anyhow::Error),

    /// Lookup or persistence failure; the attempted transaction is discarded.
    #[error(transparent)]
    Storage(AppError),
}

impl From<PayTransactionError> for AppError {
    fn from(err: PayTransactionError) -> Self {
        match err {
            PayTransactionError::PatientNotFound(_) => {
                AppError::NotFound(anyhow::anyhow!("patient not found"))
            }
            PayTransactionError::InvalidDateOfBirth(_) => AppError::BadRequest(anyhow::anyhow!(
                "date of birth format must be DD-MM-YYYY"
            )),
            PayTransactionError::Authorization(e) => AppError::BadGateway(e.to_string()),
            PayTransactionError::Storage(e) => e,
        }
    }
}

/// Why a transaction was recorded as `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Underage,
    RecordType,
    Declined,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::Underage => "Patient must be more than 18 years old",
            Rejection::RecordType => "Record type must be NEW",
            Rejection::Declined => "Transaction failed",
        }
    }
}

/// Outcome of the gates, before persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected(Rejection),
}

impl Decision {
    pub fn status(&self) -> TransactionStatus {
        match self {
            Decision::Approved => TransactionStatus::Success,
            Decision::Rejected(_) => TransactionStatus::Failed,
        }
    }

    /// Opaque payload stored as the transaction's `api_response`.
    pub fn api_response(&self) -> Value {
        match self {
            Decision::Approved => json!({ "message": "Transaction success" }),
            Decision::Rejected(reason) => json!({ "error": reason.message() }),
        }
    }
}

#[derive(Clone)]
pub struct PayTransactionService {
    patients: Arc<dyn PatientRepository>,
    transactions: Arc<dyn TransactionRepository>,
    authorizer: Arc<dyn PaymentAuthorizer>,
}

impl PayTransactionService {
    pub fn new(
        patients: Arc<dyn PatientRepository>,
        transactions: Arc<dyn TransactionRepository>,
        authorizer: Arc<dyn PaymentAuthorizer>,
    ) -> Self {
        Self {
            patients,
            transactions,
            authorizer,
        }
    }

    /// Evaluate `request` against today's UTC date.
    pub async fn pay_transaction(
        &self,
        request: PayTransactionRequest,
    ) -> Result<Transaction, PayTransactionError> {
        self.pay_transaction_on(request, Utc::now().date_naive())
            .await
    }

    #[instrument(skip(self, request), fields(patient_id = %request.patient_id, record_type = %request.record_type))]
    pub async fn pay_transaction_on(
        &self,
        request: PayTransactionRequest,
        today: NaiveDate,
    ) -> Result<Transaction, PayTransactionError> {
        let patient = self
            .patients
            .get_patient(request.patient_id)
            .await
            .map_err(PayTransactionError::Storage)?
            .ok_or(PayTransactionError::PatientNotFound(request.patient_id))?;

        let birth = parse_date_of_birth(&request.date_of_birth)
            .ok_or_else(|| PayTransactionError::InvalidDateOfBirth(request.date_of_birth.clone()))?;

        let age = age_on(birth, today);

        let decision = if age < MINIMUM_AGE {
            Decision::Rejected(Rejection::Underage)
        } else if request.record_type != REQUIRED_RECORD_TYPE {
            Decision::Rejected(Rejection::RecordType)
        } else {
            let authorization_request = AuthorizationRequest {
                patient,
                age,
                record_type: request.record_type.clone(),
            };
            match self
                .authorizer
                .authorize(&authorization_request)
                .await
                .map_err(PayTransactionError::Authorization)?
            {
                Authorization::Approved => Decision::Approved,
                Authorization::Declined => Decision::Rejected(Rejection::Declined),
            }
        };

        let transaction = Transaction::record(&request, decision.status(), decision.api_response());

        let stored = self
            .transactions
            .create_transaction(transaction)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to persist transaction");
                PayTransactionError::Storage(e)
            })?;

        record_transaction(stored.status);
        info!(
            transaction_id = %stored.id,
            status = %stored.status,
            age = age,
            "Transaction recorded"
        );

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;
    use crate::services::in_memory::InMemoryStore;
    use async_trait::async_trait;
    use chrono::Months;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedAuthorizer {
        outcome: Authorization,
        calls: AtomicUsize,
    }

    impl FixedAuthorizer {
        fn new(outcome: Authorization) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PaymentAuthorizer for FixedAuthorizer {
        async fn authorize(&self, request: &AuthorizationRequest) -> anyhow::Result<Authorization> {
            assert_eq!(request.record_type, REQUIRED_RECORD_TYPE);
            assert!(request.age >= MINIMUM_AGE);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome)
        }
    }

    struct UnreachableAuthorizer;

    #[async_trait]
    impl PaymentAuthorizer for UnreachableAuthorizer {
        async fn authorize(&self, _request: &AuthorizationRequest) -> anyhow::Result<Authorization> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    struct FailingTransactions {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TransactionRepository for FailingTransactions {
        async fn create_transaction(&self, _transaction: Transaction) -> Result<Transaction, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::DatabaseError(anyhow::anyhow!("transaction not created")))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn patient() -> Patient {
        Patient {
            id: Uuid::new_v4(),
            name: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            phone: "123-456-7890".to_string(),
            address: "123 Main St".to_string(),
            city: "Anytown".to_string(),
            state: "State".to_string(),
            zip: "12345".to_string(),
        }
    }

    fn request(patient_id: Uuid, date_of_birth: &str, record_type: &str) -> PayTransactionRequest {
        PayTransactionRequest {
            patient_id,
            date_of_birth: date_of_birth.to_string(),
            record_type: record_type.to_string(),
        }
    }

    async fn setup(authorizer: Arc<dyn PaymentAuthorizer>) -> (PayTransactionService, InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let patient = patient();
        let id = patient.id;
        store.insert_patient(patient).await;
        let service = PayTransactionService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            authorizer,
        );
        (service, store, id)
    }

    #[tokio::test]
    async fn missing_patient_aborts_without_storing() {
        let (service, store, _) = setup(FixedAuthorizer::new(Authorization::Approved)).await;

        let result = service
            .pay_transaction_on(request(Uuid::new_v4(), "15-03-1990", "NEW"), today())
            .await;

        assert!(matches!(result, Err(PayTransactionError::PatientNotFound(_))));
        assert!(store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn unparseable_date_aborts_without_storing() {
        let authorizer = FixedAuthorizer::new(Authorization::Approved);
        let (service, store, id) = setup(authorizer.clone()).await;

        for dob in ["1990-03-15", "15/03/1990", "", "31-02-1990"] {
            let result = service
                .pay_transaction_on(request(id, dob, "NEW"), today())
                .await;
            assert!(
                matches!(result, Err(PayTransactionError::InvalidDateOfBirth(_))),
                "accepted {:?}",
                dob
            );
        }

        assert!(store.transactions().await.is_empty());
        assert_eq!(authorizer.calls(), 0);
    }

    #[tokio::test]
    async fn underage_patient_is_recorded_as_failed() {
        let authorizer = FixedAuthorizer::new(Authorization::Approved);
        let (service, store, id) = setup(authorizer.clone()).await;

        let tx = service
            .pay_transaction_on(request(id, "18-10-2016", "NEW"), today())
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(
            tx.api_response,
            json!({"error": "Patient must be more than 18 years old"})
        );
        assert_eq!(store.transactions().await, vec![tx]);
        assert_eq!(authorizer.calls(), 0);
    }

    #[tokio::test]
    async fn age_gate_boundary_is_inclusive_of_eighteen() {
        let (service, _, id) = setup(FixedAuthorizer::new(Authorization::Approved)).await;

        let exactly_18 = service
            .pay_transaction_on(request(id, "18-10-2008", "NEW"), today())
            .await
            .unwrap();
        assert_eq!(exactly_18.status, TransactionStatus::Success);

        let one_day_short = service
            .pay_transaction_on(request(id, "19-10-2008", "NEW"), today())
            .await
            .unwrap();
        assert_eq!(one_day_short.status, TransactionStatus::Failed);
        assert_eq!(
            one_day_short.api_response["error"],
            "Patient must be more than 18 years old"
        );
    }

    #[tokio::test]
    async fn age_gate_checked_before_record_type() {
        let (service, _, id) = setup(FixedAuthorizer::new(Authorization::Approved)).await;

        let tx = service
            .pay_transaction_on(request(id, "01-01-2015", "OLD"), today())
            .await
            .unwrap();

        assert_eq!(
            tx.api_response["error"],
            "Patient must be more than 18 years old"
        );
    }

    #[tokio::test]
    async fn non_new_record_types_are_recorded_as_failed() {
        let authorizer = FixedAuthorizer::new(Authorization::Approved);
        let (service, store, id) = setup(authorizer.clone()).await;

        for record_type in ["new", "", "OLD", " NEW", "NEW ", "New"] {
            let tx = service
                .pay_transaction_on(request(id, "15-03-1990", record_type), today())
                .await
                .unwrap();
            assert_eq!(tx.status, TransactionStatus::Failed);
            assert_eq!(tx.api_response, json!({"error": "Record type must be NEW"}));
            assert_eq!(tx.record_type, record_type);
        }

        assert_eq!(store.transactions().await.len(), 6);
        assert_eq!(authorizer.calls(), 0);
    }

    #[tokio::test]
    async fn approved_authorization_records_success() {
        let authorizer = FixedAuthorizer::new(Authorization::Approved);
        let (service, store, id) = setup(authorizer.clone()).await;

        let tx = service
            .pay_transaction_on(request(id, "12-12-2000", "NEW"), today())
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Success);
        assert_eq!(tx.api_response, json!({"message": "Transaction success"}));
        assert_eq!(tx.patient_id, id);
        assert_eq!(tx.date_of_birth, "12-12-2000");
        assert_eq!(tx.record_type, "NEW");
        assert_eq!(store.transactions().await.len(), 1);
        assert_eq!(authorizer.calls(), 1);
    }

    #[tokio::test]
    async fn declined_authorization_records_failure() {
        let (service, store, id) = setup(FixedAuthorizer::new(Authorization::Declined)).await;

        let tx = service
            .pay_transaction_on(request(id, "12-12-2000", "NEW"), today())
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.api_response, json!({"error": "Transaction failed"}));
        assert_eq!(store.transactions().await.len(), 1);
    }

    #[tokio::test]
    async fn authorization_error_stores_nothing() {
        let (service, store, id) = setup(Arc::new(UnreachableAuthorizer)).await;

        let result = service
            .pay_transaction_on(request(id, "12-12-2000", "NEW"), today())
            .await;

        assert!(matches!(result, Err(PayTransactionError::Authorization(_))));
        assert!(store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_returned_for_every_branch() {
        let store = InMemoryStore::new();
        let patient = patient();
        let id = patient.id;
        store.insert_patient(patient).await;
        let failing = Arc::new(FailingTransactions {
            calls: AtomicUsize::new(0),
        });
        let service = PayTransactionService::new(
            Arc::new(store),
            failing.clone(),
            FixedAuthorizer::new(Authorization::Approved),
        );

        for (dob, record_type) in [
            ("18-10-2016", "NEW"),
            ("15-03-1990", "OLD"),
            ("15-03-1990", "NEW"),
        ] {
            let result = service
                .pay_transaction_on(request(id, dob, record_type), today())
                .await;
            match result {
                Err(PayTransactionError::Storage(AppError::DatabaseError(e))) => {
                    assert_eq!(e.to_string(), "transaction not created")
                }
                other => panic!("expected storage error, got {:?}", other),
            }
        }

        assert_eq!(failing.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn each_request_gets_a_fresh_transaction() {
        let (service, store, id) = setup(FixedAuthorizer::new(Authorization::Approved)).await;

        let first = service
            .pay_transaction_on(request(id, "12-12-2000", "NEW"), today())
            .await
            .unwrap();
        let second = service
            .pay_transaction_on(request(id, "12-12-2000", "NEW"), today())
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(store.transactions().await.len(), 2);
    }

    #[tokio::test]
    async fn pay_transaction_uses_current_date() {
        let (service, _, id) = setup(FixedAuthorizer::new(Authorization::Approved)).await;
        let ten_years_ago = Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(10 * 12))
            .unwrap()
            .format("%d-%m-%Y")
            .to_string();

        let tx = service
            .pay_transaction(request(id, &ten_years_ago, "NEW"))
            .await
            .unwrap();

        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[test]
    fn errors_map_to_http_classes() {
        assert!(matches!(
            AppError::from(PayTransactionError::PatientNotFound(Uuid::new_v4())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(PayTransactionError::InvalidDateOfBirth("x".to_string())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(PayTransactionError::Authorization(anyhow::anyhow!("down"))),
            AppError::BadGateway(_)
        ));
        assert!(matches!(
            AppError::from(PayTransactionError::Storage(AppError::DatabaseError(
                anyhow::anyhow!("transaction not created")
            ))),
            AppError::DatabaseError(_)
        ));
    }
}
