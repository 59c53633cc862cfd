/// Crate-wide result; typed ledger failures travel inside the `anyhow::Error`
/// and are recovered with `error::ledger_error`
pub type Result<T = ()> = anyhow::Result<T>;
