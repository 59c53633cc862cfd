mod account_store;
mod operation_store;
mod transaction_log;
mod unit;

pub use account_store::{AccountRow, AccountRowRef, AccountStore};
pub use operation_store::{OperationRowRef, OperationStore};
pub use transaction_log::{TransactionLog, TransactionLogError};
pub use unit::{AtomicUnit, Posting};
