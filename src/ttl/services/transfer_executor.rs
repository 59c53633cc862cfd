use crate::error::LedgerError;
use crate::gate::MembershipGate;
use crate::ids::{AccountOwner, TeamId};
use crate::models::{Operation, OperationKind, Transaction, TransactionKind, TransferTarget};
use crate::store::{AccountRowRef, AccountStore, AtomicUnit, Posting};
use crate::{Grams, Result};

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Turns approved operations into balance changes and ledger entries
pub struct TransferExecutor {
    accounts: Arc<AccountStore>,
    gate: Arc<dyn MembershipGate>,
}

impl TransferExecutor {
    pub fn new(accounts: Arc<AccountStore>, gate: Arc<dyn MembershipGate>) -> Self {
        return Self { accounts, gate };
    }

    /// Applies `operation` in an atomic unit of its own
    pub fn execute(&self, operation: &Operation, now: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let rows = self.prepare(operation, now)?;
        let mut unit = self.accounts.begin(&rows)?;

        self.stage(&mut unit, operation, now)?;

        let committed = unit.commit();

        log::debug!(
            "Executed operation {}: {} ledger entries",
            operation.uuid,
            committed.len()
        );

        return Ok(committed);
    }

    /// Resolves the account rows `operation` will touch, in lock order. A personal target
    /// account is created here if the user can hold one.
    pub fn prepare(
        &self,
        operation: &Operation,
        now: DateTime<Utc>,
    ) -> Result<Vec<(AccountOwner, AccountRowRef)>> {
        if let Some(TransferTarget::User(user_id)) = operation.target {
            self.gate.ensure_personal_account_exists(user_id)?;
        }

        return self.accounts.rows_for(&operation.accounts(), now);
    }

    /// Rows a pending submission has to check. A personal target account is only included when
    /// it already exists, since it is created when the transfer executes.
    pub fn prepare_pending(
        &self,
        operation: &Operation,
        now: DateTime<Utc>,
    ) -> Result<Vec<(AccountOwner, AccountRowRef)>> {
        let owners: Vec<AccountOwner> = operation
            .accounts()
            .into_iter()
            .filter(|owner| match owner {
                AccountOwner::Team(_) => true,
                AccountOwner::User(_) => self.accounts.contains(*owner),
            })
            .collect();

        return self.accounts.rows_for(&owners, now);
    }

    /// Stages the ledger entries for `operation` on a unit that already holds its rows
    pub fn stage(&self, unit: &mut AtomicUnit, operation: &Operation, now: DateTime<Utc>) -> Result {
        let team = AccountOwner::Team(operation.team_id);
        let description = describe(operation);

        match (operation.kind, operation.target) {
            (OperationKind::TransferOut, Some(target)) => {
                let counterparty = target.owner();

                // debit first so an empty source fails before the target is touched
                unit.post(
                    team,
                    TransactionKind::TransferOut,
                    operation.amount,
                    Posting {
                        operation: Some(operation.uuid),
                        description: description.clone(),
                        counterparty: Some(counterparty),
                    },
                    now,
                )?;

                unit.post(
                    counterparty,
                    TransactionKind::TransferIn,
                    operation.amount,
                    Posting {
                        operation: Some(operation.uuid),
                        description,
                        counterparty: Some(team),
                    },
                    now,
                )?;
            }

            (OperationKind::TransferOut, None) => Err(LedgerError::InvalidTarget(format!(
                "Transfer-out {} has no target",
                operation.uuid
            )))?,

            (kind, None) => {
                unit.post(
                    team,
                    kind.transaction_kind(),
                    operation.amount,
                    Posting {
                        operation: Some(operation.uuid),
                        description,
                        counterparty: None,
                    },
                    now,
                )?;
            }

            (kind, Some(_)) => Err(LedgerError::InvalidTarget(format!(
                "A {kind} operation cannot have a target"
            )))?,
        }

        return Ok(());
    }

    /// Credits or debits a team directly, outside the approval workflow
    pub fn apply_system(
        &self,
        team_id: TeamId,
        kind: TransactionKind,
        amount: Grams,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<Transaction> {
        if !matches!(
            kind,
            TransactionKind::SystemGrant | TransactionKind::SystemDeduct
        ) {
            Err(LedgerError::InvalidRequest(format!(
                "{kind} is not a system adjustment"
            )))?
        }

        if !amount.is_positive() {
            Err(LedgerError::InvalidAmount(amount.to_string()))?
        }

        let owner = AccountOwner::Team(team_id);

        if self.gate.is_reserved_no_asset_team(team_id) {
            Err(LedgerError::AccountFrozen(owner))?
        }

        let rows = self.accounts.rows_for(&[owner], now)?;
        let mut unit = self.accounts.begin(&rows)?;

        unit.post(
            owner,
            kind,
            amount,
            Posting {
                operation: None,
                description,
                counterparty: None,
            },
            now,
        )?;

        let transaction = unit.commit().into_iter().next().ok_or_else(|| {
            LedgerError::StorageFailure("System adjustment produced no entry".to_string())
        })?;

        log::info!("{kind} of {amount} on {owner}");

        return Ok(transaction);
    }
}

fn describe(operation: &Operation) -> String {
    if !operation.note.trim().is_empty() {
        return operation.note.clone();
    }

    match operation.target {
        Some(target) => format!(
            "{} of {} to {} by {}",
            operation.kind,
            operation.amount,
            target.owner(),
            operation.operator
        ),
        None => format!(
            "{} of {} by {}",
            operation.kind, operation.amount, operation.operator
        ),
    }
}
