use super::{OperationRequest, OperationWorkflow, TransferExecutor};

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::gate::MembershipGate;
use crate::ids::{AccountOwner, TeamId, UserId};
use crate::models::{
    Account, AccountReport, AccountStatus, Operation, Transaction, TransactionKind,
};
use crate::store::AccountStore;
use crate::{Grams, Result};

use std::sync::Arc;

use uuid::Uuid;

/// Entry point for everything callers do with team tea accounts
pub struct TeaAccountService {
    accounts: Arc<AccountStore>,
    executor: Arc<TransferExecutor>,
    workflow: OperationWorkflow,
    gate: Arc<dyn MembershipGate>,
    clock: Arc<dyn Clock>,
}

impl TeaAccountService {
    pub fn new(
        gate: Arc<dyn MembershipGate>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let accounts = Arc::new(AccountStore::new(gate.clone(), config.lock_timeout()));
        let executor = Arc::new(TransferExecutor::new(accounts.clone(), gate.clone()));
        let workflow = OperationWorkflow::new(
            accounts.clone(),
            executor.clone(),
            gate.clone(),
            clock.clone(),
            config,
        );

        return Ok(Self {
            accounts,
            executor,
            workflow,
            gate,
            clock,
        });
    }

    /// The team's account, created empty on first use. The reserved team always reads as a
    /// frozen, empty account that is never stored.
    pub fn get_account(&self, team_id: TeamId) -> Result<Account> {
        let now = self.clock.now();

        if self.gate.is_reserved_no_asset_team(team_id) {
            return Ok(Account::reserved(team_id, now));
        }

        return self.accounts.get_or_create(AccountOwner::Team(team_id), now);
    }

    pub fn get_personal_account(&self, user_id: UserId) -> Result<Account> {
        let owner = AccountOwner::User(user_id);

        let account = self
            .accounts
            .find(owner)?
            .ok_or(LedgerError::AccountNotFound(owner))?;

        return Ok(account);
    }

    pub fn submit_operation(&self, request: OperationRequest) -> Result<Operation> {
        self.workflow.submit(request)
    }

    pub fn approve_operation(&self, uuid: &Uuid, approver: UserId) -> Result<Operation> {
        let team_id = self.workflow.team_of(uuid)?;
        self.authorize(approver, team_id)?;

        return self.workflow.approve(uuid, approver);
    }

    pub fn reject_operation(
        &self,
        uuid: &Uuid,
        approver: UserId,
        reason: impl Into<String>,
    ) -> Result<Operation> {
        let team_id = self.workflow.team_of(uuid)?;
        self.authorize(approver, team_id)?;

        return self.workflow.reject(uuid, approver, reason.into());
    }

    pub fn get_operation(&self, uuid: &Uuid) -> Result<Operation> {
        self.workflow.get(uuid)
    }

    /// Ledger entries an approved operation wrote, source account first
    pub fn operation_entries(&self, uuid: &Uuid) -> Result<Vec<Transaction>> {
        let operation = self.workflow.get(uuid)?;
        let mut entries = vec![];

        for owner in operation.accounts() {
            entries.extend(self.accounts.entries_for_operation(owner, uuid)?);
        }

        entries.sort_by_key(|tx| tx.id);

        return Ok(entries);
    }

    pub fn list_pending_operations(
        &self,
        team_id: TeamId,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<Operation>> {
        self.workflow.list_pending(team_id, page, page_size)
    }

    /// Newest first. `page` starts at 1.
    pub fn list_transactions(
        &self,
        team_id: TeamId,
        page: usize,
        page_size: usize,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Transaction>> {
        let (page, page_size) = self.workflow.page_bounds(page, page_size)?;

        return self
            .accounts
            .transactions(AccountOwner::Team(team_id), page, page_size, kind);
    }

    pub fn freeze_account(&self, team_id: TeamId, reason: impl Into<String>) -> Result<Account> {
        if self.gate.is_reserved_no_asset_team(team_id) {
            return Ok(Account::reserved(team_id, self.clock.now()));
        }

        let status = AccountStatus::Frozen {
            reason: reason.into(),
        };

        return self.accounts.set_status(team_id, status, self.clock.now());
    }

    pub fn unfreeze_account(&self, team_id: TeamId) -> Result<Account> {
        if self.gate.is_reserved_no_asset_team(team_id) {
            Err(LedgerError::AccountFrozen(AccountOwner::Team(team_id)))?
        }

        return self
            .accounts
            .set_status(team_id, AccountStatus::Normal, self.clock.now());
    }

    pub fn grant_tea(
        &self,
        team_id: TeamId,
        amount: Grams,
        description: impl Into<String>,
    ) -> Result<Transaction> {
        self.executor.apply_system(
            team_id,
            TransactionKind::SystemGrant,
            amount,
            description.into(),
            self.clock.now(),
        )
    }

    pub fn deduct_tea(
        &self,
        team_id: TeamId,
        amount: Grams,
        description: impl Into<String>,
    ) -> Result<Transaction> {
        self.executor.apply_system(
            team_id,
            TransactionKind::SystemDeduct,
            amount,
            description.into(),
            self.clock.now(),
        )
    }

    pub fn expire_overdue(&self) -> Result<usize> {
        self.workflow.expire_overdue()
    }

    /// Rebuilds the balance from the account's log
    pub fn replay_balance(&self, owner: AccountOwner) -> Result<Grams> {
        let (_, replayed) = self.accounts.replay(owner)?;
        return Ok(replayed);
    }

    /// Whether the stored balance matches the replayed log
    pub fn verify_account(&self, owner: AccountOwner) -> Result<bool> {
        let (stored, replayed) = self.accounts.replay(owner)?;

        if stored != replayed {
            log::warn!("Account {owner} stores {stored} but its log replays to {replayed}");
        }

        return Ok(stored == replayed);
    }

    pub fn build_report(&self) -> Result<Vec<AccountReport>> {
        self.accounts.build_report()
    }

    fn authorize(&self, user_id: UserId, team_id: TeamId) -> Result {
        if !self.gate.is_core_member(user_id, team_id)? {
            Err(LedgerError::Unauthorized(user_id, team_id))?
        }

        return Ok(());
    }
}
