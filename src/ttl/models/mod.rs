mod account;
mod account_report;
mod operation;
mod transaction;

pub use account::{Account, AccountStatus};
pub use account_report::AccountReport;
pub use operation::{Operation, OperationKind, OperationStatus, TransferTarget};
pub use transaction::{Transaction, TransactionKind};
