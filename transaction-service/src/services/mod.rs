pub mod authorizer;
pub mod in_memory;
pub mod metrics;
pub mod pay_transaction;
pub mod repository;

pub use authorizer::{HttpAuthorizer, PaymentAuthorizer, SimulatedAuthorizer};
pub use in_memory::InMemoryStore;
pub use self::metrics::{get_metrics, init_metrics};
pub use pay_transaction::{PayTransactionError, PayTransactionService};
pub use repository::{PatientRepository, PgStore, TransactionRepository};
