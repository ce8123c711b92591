pub mod patient;
pub mod transaction;

pub use patient::Patient;
pub use transaction::{PayTransactionRequest, Transaction, TransactionStatus};
