pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
mod grams;
pub mod ids;
pub mod input;
pub mod models;
mod result;
pub mod services;
pub mod store;

pub use grams::{Grams, GramsError};
pub use result::Result;

use std::sync::Arc;

pub fn build_account_service(
    gate: Arc<dyn gate::MembershipGate>,
    clock: Arc<dyn clock::Clock>,
    config: config::LedgerConfig,
) -> Result<services::TeaAccountService> {
    let service = services::TeaAccountService::new(gate, clock, config)?;

    return Ok(service);
}
