use super::AccountRow;

use crate::error::LedgerError;
use crate::ids::AccountOwner;
use crate::models::{Account, Transaction, TransactionKind};
use crate::{Grams, Result};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

/// Everything about a ledger entry that the caller decides
#[derive(Debug, Clone, Default)]
pub struct Posting {
    pub operation: Option<Uuid>,
    pub description: String,
    pub counterparty: Option<AccountOwner>,
}

/// Exclusive hold on a set of account rows. Balance changes are staged against the held rows and
/// only become visible through `commit`, which cannot fail. Dropping an uncommitted unit discards
/// everything it staged.
pub struct AtomicUnit<'a> {
    guards: Vec<MutexGuard<'a, AccountRow>>,
    staged: Vec<Transaction>,
    next_transaction_id: &'a AtomicU64,
}

impl<'a> AtomicUnit<'a> {
    /// Locks `rows` in the order given, which must be the global lock order
    pub(super) fn lock(
        rows: &'a [(AccountOwner, Arc<Mutex<AccountRow>>)],
        timeout: Duration,
        next_transaction_id: &'a AtomicU64,
    ) -> Result<Self> {
        let mut guards = Vec::with_capacity(rows.len());

        for (owner, row) in rows {
            let guard = row.try_lock_for(timeout).ok_or_else(|| {
                LedgerError::StorageFailure(format!("Timed out waiting for the lock on {owner}"))
            })?;

            log::debug!("Locked account row for {owner}");

            guards.push(guard);
        }

        return Ok(Self {
            guards,
            staged: vec![],
            next_transaction_id,
        });
    }

    pub fn account(&self, owner: AccountOwner) -> Result<&Account> {
        let row = self
            .guards
            .iter()
            .find(|row| row.account.owner == owner)
            .ok_or_else(|| {
                LedgerError::StorageFailure(format!("{owner} is not held by this atomic unit"))
            })?;

        return Ok(&row.account);
    }

    /// Balance including anything staged so far
    pub fn balance(&self, owner: AccountOwner) -> Result<Grams> {
        let account = self.account(owner)?;

        let staged = self
            .staged
            .iter()
            .rev()
            .find(|tx| tx.owner == owner)
            .map(|tx| tx.balance_after);

        return Ok(staged.unwrap_or(account.balance));
    }

    pub fn ensure_available(&self, owner: AccountOwner, amount: Grams) -> Result {
        let available = self.balance(owner)?;

        if available < amount {
            Err(LedgerError::InsufficientBalance {
                owner,
                requested: amount,
                available,
            })?
        }

        return Ok(());
    }

    /// Stages one ledger entry moving `owner`'s balance by `amount` in the direction of `kind`
    pub fn post(
        &mut self,
        owner: AccountOwner,
        kind: TransactionKind,
        amount: Grams,
        posting: Posting,
        now: DateTime<Utc>,
    ) -> Result {
        if !amount.is_positive() {
            Err(LedgerError::InvalidAmount(format!(
                "{kind} of {amount} on {owner}"
            )))?
        }

        if self.account(owner)?.is_frozen() {
            Err(LedgerError::AccountFrozen(owner))?
        }

        if !kind.is_credit() {
            self.ensure_available(owner, amount)?;
        }

        let balance_before = self.balance(owner)?;
        let balance_after = kind.apply(balance_before, amount)?;

        log::debug!("Staging {kind} of {amount} on {owner}: {balance_before} -> {balance_after}");

        self.staged.push(Transaction {
            id: 0,
            uuid: Uuid::new_v4(),
            owner,
            operation: posting.operation,
            kind,
            amount,
            balance_before,
            balance_after,
            description: posting.description,
            counterparty: posting.counterparty,
            created_at: now,
        });

        return Ok(());
    }

    /// Applies every staged entry to its row and appends it to the row's log
    pub fn commit(mut self) -> Vec<Transaction> {
        let staged = std::mem::take(&mut self.staged);
        let mut committed = Vec::with_capacity(staged.len());

        for mut tx in staged {
            tx.id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);

            // post() resolved every staged owner against the held rows
            if let Some(row) = self
                .guards
                .iter_mut()
                .find(|row| row.account.owner == tx.owner)
            {
                row.account.balance = tx.balance_after;
                row.account.updated_at = tx.created_at;
                row.log.append(tx.clone());
            }

            committed.push(tx);
        }

        log::debug!("Committed {} ledger entries", committed.len());

        committed
    }
}
