use super::{AtomicUnit, TransactionLog};

use crate::error::LedgerError;
use crate::gate::MembershipGate;
use crate::ids::{AccountOwner, TeamId};
use crate::models::{Account, AccountReport, AccountStatus, Transaction, TransactionKind};
use crate::{Grams, Result};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

/// An account together with its log. Entries are only appended while the row is locked, so the
/// log order is the order in which balance changes were applied.
#[derive(Debug)]
pub struct AccountRow {
    pub account: Account,
    pub log: TransactionLog,
}

pub type AccountRowRef = Arc<Mutex<AccountRow>>;

/// Holds one row per account owner, created lazily
pub struct AccountStore {
    gate: Arc<dyn MembershipGate>,
    rows: RwLock<HashMap<AccountOwner, AccountRowRef>>,
    next_account_id: AtomicU64,
    next_transaction_id: AtomicU64,
    lock_timeout: Duration,
}

impl AccountStore {
    pub fn new(gate: Arc<dyn MembershipGate>, lock_timeout: Duration) -> Self {
        return Self {
            gate,
            rows: RwLock::new(HashMap::new()),
            next_account_id: AtomicU64::new(1),
            next_transaction_id: AtomicU64::new(1),
            lock_timeout,
        };
    }

    /// Returns the account, creating an empty one first if needed. The reserved no-asset team
    /// never gets a row.
    pub fn get_or_create(&self, owner: AccountOwner, now: DateTime<Utc>) -> Result<Account> {
        let row = self.row_or_create(owner, now)?;
        let row = self.lock_row(owner, &row)?;

        return Ok(row.account.clone());
    }

    pub fn find(&self, owner: AccountOwner) -> Result<Option<Account>> {
        let row = match self.row(owner) {
            Some(row) => row,
            None => return Ok(None),
        };

        let row = self.lock_row(owner, &row)?;

        return Ok(Some(row.account.clone()));
    }

    pub fn set_status(
        &self,
        team_id: TeamId,
        status: AccountStatus,
        now: DateTime<Utc>,
    ) -> Result<Account> {
        if let AccountStatus::Frozen { reason } = &status {
            if reason.trim().is_empty() {
                Err(LedgerError::InvalidRequest(
                    "A frozen account needs a reason".to_string(),
                ))?
            }
        }

        let owner = AccountOwner::Team(team_id);
        let row = self.row_or_create(owner, now)?;
        let mut row = self.lock_row(owner, &row)?;

        row.account.status = status;
        row.account.updated_at = now;

        log::info!("Account {owner} is now {}", row.account.status);

        return Ok(row.account.clone());
    }

    pub fn transactions(
        &self,
        owner: AccountOwner,
        page: usize,
        page_size: usize,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Transaction>> {
        let row = match self.row(owner) {
            Some(row) => row,
            None => return Ok(vec![]),
        };

        let row = self.lock_row(owner, &row)?;

        return Ok(row.log.page(page, page_size, kind));
    }

    /// Entries the operation wrote on `owner`'s account, oldest first
    pub fn entries_for_operation(
        &self,
        owner: AccountOwner,
        operation: &Uuid,
    ) -> Result<Vec<Transaction>> {
        let row = match self.row(owner) {
            Some(row) => row,
            None => return Ok(vec![]),
        };

        let row = self.lock_row(owner, &row)?;

        return Ok(row
            .log
            .find_for_operation(operation)
            .into_iter()
            .cloned()
            .collect());
    }

    pub fn contains(&self, owner: AccountOwner) -> bool {
        self.rows.read().contains_key(&owner)
    }

    /// Returns the stored balance next to the balance rebuilt from the account's log
    pub fn replay(&self, owner: AccountOwner) -> Result<(Grams, Grams)> {
        let row = self
            .row(owner)
            .ok_or(LedgerError::AccountNotFound(owner))?;

        let row = self.lock_row(owner, &row)?;
        let replayed = row.log.replay()?;

        return Ok((row.account.balance, replayed));
    }

    pub fn build_report(&self) -> Result<Vec<AccountReport>> {
        let mut rows: Vec<(AccountOwner, AccountRowRef)> = self
            .rows
            .read()
            .iter()
            .map(|(owner, row)| (*owner, row.clone()))
            .collect();

        rows.sort_by_key(|(owner, _)| *owner);

        return rows
            .iter()
            .map(|(owner, row)| {
                let row = self.lock_row(*owner, row)?;
                Ok(AccountReport::new(&row.account, row.log.len()))
            })
            .collect::<Result<Vec<AccountReport>>>();
    }

    /// Looks up (creating where needed) the rows for `owners`, deduplicated and sorted into lock
    /// order, ready for `begin`
    pub fn rows_for(
        &self,
        owners: &[AccountOwner],
        now: DateTime<Utc>,
    ) -> Result<Vec<(AccountOwner, AccountRowRef)>> {
        let mut owners = owners.to_vec();
        owners.sort();
        owners.dedup();

        return owners
            .into_iter()
            .map(|owner| Ok((owner, self.row_or_create(owner, now)?)))
            .collect();
    }

    pub fn begin<'a>(&'a self, rows: &'a [(AccountOwner, AccountRowRef)]) -> Result<AtomicUnit<'a>> {
        AtomicUnit::lock(rows, self.lock_timeout, &self.next_transaction_id)
    }

    fn row(&self, owner: AccountOwner) -> Option<AccountRowRef> {
        self.rows.read().get(&owner).cloned()
    }

    fn row_or_create(&self, owner: AccountOwner, now: DateTime<Utc>) -> Result<AccountRowRef> {
        if let AccountOwner::Team(team_id) = owner {
            if self.gate.is_reserved_no_asset_team(team_id) {
                Err(LedgerError::AccountNotFound(owner))?
            }
        }

        if let Some(row) = self.row(owner) {
            return Ok(row);
        }

        let row = self
            .rows
            .write()
            .entry(owner)
            .or_insert_with(|| {
                let id = self.next_account_id.fetch_add(1, Ordering::SeqCst);
                log::debug!("Creating account {id} for {owner}");

                Arc::new(Mutex::new(AccountRow {
                    account: Account::new(id, owner, now),
                    log: TransactionLog::new(),
                }))
            })
            .clone();

        return Ok(row);
    }

    fn lock_row<'a>(
        &self,
        owner: AccountOwner,
        row: &'a AccountRowRef,
    ) -> Result<MutexGuard<'a, AccountRow>> {
        let guard = row.try_lock_for(self.lock_timeout).ok_or_else(|| {
            LedgerError::StorageFailure(format!("Timed out waiting for the lock on {owner}"))
        })?;

        return Ok(guard);
    }
}
