use ttl::clock::{Clock, ManualClock, SystemClock};
use ttl::config::LedgerConfig;
use ttl::gate::{Directory, MembershipGate};
use ttl::input::Command;
use ttl::models::AccountReport;
use ttl::services::TeaAccountService;
use ttl::Result;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Unknown operation reference: {0}")]
    UnknownReference(String),
}

/// Replays script commands against an in-memory ledger. Time only moves on `advance` rows.
pub struct ScriptRunner {
    directory: Arc<Directory>,
    clock: Arc<ManualClock>,
    service: TeaAccountService,
    references: HashMap<String, Uuid>,
}

impl ScriptRunner {
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let directory = Arc::new(Directory::new());
        let clock = Arc::new(ManualClock::new(SystemClock.now()));

        let gate: Arc<dyn MembershipGate> = directory.clone();
        let time: Arc<dyn Clock> = clock.clone();

        let service = ttl::build_account_service(gate, time, config)?;

        Ok(Self {
            directory,
            clock,
            service,
            references: HashMap::new(),
        })
    }

    pub fn run(&mut self, command: Command) -> Result {
        match command {
            Command::AddMember {
                team_id,
                user_id,
                core,
            } => {
                if core {
                    self.directory.add_core_member(team_id, user_id);
                } else {
                    self.directory.add_member(team_id, user_id);
                }
            }

            Command::RemoveMember { team_id, user_id } => {
                self.directory.remove_member(team_id, user_id);
            }

            Command::AddUser { user_id } => self.directory.add_user(user_id),

            Command::Reserve { team_id } => self.directory.reserve(team_id),

            Command::Submit { reference, request } => {
                let operation = self.service.submit_operation(request)?;

                log::debug!("Submitted operation: {operation:?}");

                if let Some(reference) = reference {
                    self.references.insert(reference, operation.uuid);
                }
            }

            Command::Approve {
                reference,
                approver,
            } => {
                let uuid = self.lookup(&reference)?;
                self.service.approve_operation(&uuid, approver)?;
            }

            Command::Reject {
                reference,
                approver,
                reason,
            } => {
                let uuid = self.lookup(&reference)?;
                self.service.reject_operation(&uuid, approver, reason)?;
            }

            Command::Freeze { team_id, reason } => {
                self.service.freeze_account(team_id, reason)?;
            }

            Command::Unfreeze { team_id } => {
                self.service.unfreeze_account(team_id)?;
            }

            Command::Grant {
                team_id,
                amount,
                description,
            } => {
                self.service.grant_tea(team_id, amount, description)?;
            }

            Command::Deduct {
                team_id,
                amount,
                description,
            } => {
                self.service.deduct_tea(team_id, amount, description)?;
            }

            Command::Advance { hours } => {
                self.clock.advance(Duration::hours(i64::from(hours)));
                log::debug!("Clock advanced to {}", self.clock.now());
            }
        }

        Ok(())
    }

    pub fn build_report(&self) -> Result<Vec<AccountReport>> {
        self.service.build_report()
    }

    fn lookup(&self, reference: &str) -> Result<Uuid> {
        let uuid = self
            .references
            .get(reference)
            .copied()
            .ok_or_else(|| ScriptError::UnknownReference(reference.to_string()))?;

        Ok(uuid)
    }
}
