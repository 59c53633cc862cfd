mod account_service;
mod operation_workflow;
mod transfer_executor;

pub use account_service::TeaAccountService;
pub use operation_workflow::{ApprovalPolicy, OperationRequest, OperationWorkflow};
pub use transfer_executor::TransferExecutor;
