use super::TransferExecutor;

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::gate::MembershipGate;
use crate::ids::{AccountOwner, TeamId, UserId};
use crate::models::{Operation, OperationKind, OperationStatus, TransferTarget};
use crate::store::{AccountStore, OperationStore};
use crate::{Grams, Result};

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

/// A caller's request to move tea, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub team_id: TeamId,
    pub operator: UserId,
    pub kind: OperationKind,
    pub amount: Grams,
    pub note: String,
    pub expiry_hours: Option<u32>,
    pub target_team: Option<TeamId>,
    pub target_user: Option<UserId>,

    /// Lets a caller retry a submission without creating a second operation
    pub correlation_id: Option<Uuid>,
}

impl OperationRequest {
    pub fn new(team_id: TeamId, operator: UserId, kind: OperationKind, amount: Grams) -> Self {
        return Self {
            team_id,
            operator,
            kind,
            amount,
            note: String::new(),
            expiry_hours: None,
            target_team: None,
            target_user: None,
            correlation_id: None,
        };
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn expiring_in_hours(mut self, hours: u32) -> Self {
        self.expiry_hours = Some(hours);
        self
    }

    pub fn to_team(mut self, team_id: TeamId) -> Self {
        self.target_team = Some(team_id);
        self
    }

    pub fn to_user(mut self, user_id: UserId) -> Self {
        self.target_user = Some(user_id);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// How a submission gets resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// The only member approves their own request on submission
    AutoApprove,

    /// A core member has to approve or reject before expiry
    RequireApproval,
}

impl ApprovalPolicy {
    pub fn for_member_count(active_members: usize) -> Self {
        if active_members == 1 {
            return Self::AutoApprove;
        }

        return Self::RequireApproval;
    }
}

/// Approval state machine for team operations. Expiry is checked lazily whenever an operation is
/// looked at, so nothing has to run in the background.
///
/// The workflow does not check who approves; callers decide that before calling
/// `approve`/`reject`.
pub struct OperationWorkflow {
    accounts: Arc<AccountStore>,
    operations: OperationStore,
    executor: Arc<TransferExecutor>,
    gate: Arc<dyn MembershipGate>,
    clock: Arc<dyn Clock>,
    config: LedgerConfig,
}

impl OperationWorkflow {
    pub fn new(
        accounts: Arc<AccountStore>,
        executor: Arc<TransferExecutor>,
        gate: Arc<dyn MembershipGate>,
        clock: Arc<dyn Clock>,
        config: LedgerConfig,
    ) -> Self {
        return Self {
            accounts,
            operations: OperationStore::new(config.lock_timeout()),
            executor,
            gate,
            clock,
            config,
        };
    }

    pub fn submit(&self, request: OperationRequest) -> Result<Operation> {
        log::debug!("Submitting operation request: {request:?}");

        if !request.amount.is_positive() {
            Err(LedgerError::InvalidAmount(format!(
                "{} must be greater than zero",
                request.amount
            )))?
        }

        let target = self.resolve_target(&request)?;
        let expiry_hours = self.resolve_expiry_hours(&request)?;

        if let Some(correlation_id) = request.correlation_id {
            if let Some(existing) = self.find_resubmission(correlation_id, request.team_id)? {
                log::debug!("Operation {correlation_id} already submitted");
                return Ok(existing);
            }
        }

        let team = AccountOwner::Team(request.team_id);

        if self.gate.is_reserved_no_asset_team(request.team_id) {
            Err(LedgerError::AccountFrozen(team))?
        }

        let active_members = self.gate.active_member_count(request.team_id)?;

        if active_members == 0 {
            Err(LedgerError::AccountNotFound(team))?
        }

        if let Some(TransferTarget::Team(target_team)) = target {
            let owner = AccountOwner::Team(target_team);

            if self.gate.is_reserved_no_asset_team(target_team) {
                Err(LedgerError::AccountFrozen(owner))?
            }

            if self.gate.active_member_count(target_team)? == 0 {
                Err(LedgerError::AccountNotFound(owner))?
            }
        }

        let now = self.clock.now();

        let mut operation = Operation {
            id: self.operations.next_id(),
            uuid: request.correlation_id.unwrap_or_else(Uuid::new_v4),
            team_id: request.team_id,
            kind: request.kind,
            amount: request.amount,
            status: OperationStatus::Pending,
            operator: request.operator,
            approver: None,
            target,
            note: request.note,
            rejection_reason: None,
            created_at: now,
            expires_at: now + Duration::hours(i64::from(expiry_hours)),
            approved_at: None,
            resolved_at: None,
        };

        let policy = ApprovalPolicy::for_member_count(active_members);

        let rows = match policy {
            ApprovalPolicy::AutoApprove => self.executor.prepare(&operation, now)?,
            ApprovalPolicy::RequireApproval => self.executor.prepare_pending(&operation, now)?,
        };
        let mut unit = self.accounts.begin(&rows)?;

        for (owner, _) in &rows {
            if unit.account(*owner)?.is_frozen() {
                Err(LedgerError::AccountFrozen(*owner))?
            }
        }

        if operation.kind.debits_team() {
            unit.ensure_available(team, operation.amount)?;
        }

        if policy == ApprovalPolicy::AutoApprove {
            operation.approve(request.operator, now)?;
            self.executor.stage(&mut unit, &operation, now)?;
        }

        if !self.operations.insert_if_absent(operation.clone()) {
            drop(unit);
            return self.operations.get(&operation.uuid);
        }

        unit.commit();

        log::info!(
            "Operation {} ({} of {} on {}) submitted as {}",
            operation.uuid,
            operation.kind,
            operation.amount,
            team,
            operation.status
        );

        return Ok(operation);
    }

    pub fn approve(&self, uuid: &Uuid, approver: UserId) -> Result<Operation> {
        let row = self.operations.row(uuid)?;
        let mut operation = self.operations.lock(&row)?;

        operation.ensure_pending()?;

        let now = self.clock.now();

        if operation.is_overdue(now) {
            operation.expire(now)?;
            log::info!("Operation {uuid} expired at {}", operation.expires_at);
            Err(LedgerError::Expired(*uuid, operation.expires_at))?
        }

        let mut approved = operation.clone();
        approved.approve(approver, now)?;

        self.executor.execute(&approved, now)?;

        *operation = approved;

        log::info!("Operation {uuid} approved by {approver}");

        return Ok(operation.clone());
    }

    pub fn reject(&self, uuid: &Uuid, approver: UserId, reason: String) -> Result<Operation> {
        let row = self.operations.row(uuid)?;
        let mut operation = self.operations.lock(&row)?;

        operation.ensure_pending()?;

        let now = self.clock.now();

        if operation.is_overdue(now) {
            operation.expire(now)?;
            log::info!("Operation {uuid} expired at {}", operation.expires_at);
            Err(LedgerError::Expired(*uuid, operation.expires_at))?
        }

        operation.reject(approver, reason, now)?;

        log::info!("Operation {uuid} rejected by {approver}");

        return Ok(operation.clone());
    }

    /// The team that owns the operation. Unlike `get`, this never changes the operation.
    pub fn team_of(&self, uuid: &Uuid) -> Result<TeamId> {
        let operation = self.operations.get(uuid)?;

        return Ok(operation.team_id);
    }

    pub fn get(&self, uuid: &Uuid) -> Result<Operation> {
        let row = self.operations.row(uuid)?;
        let mut operation = self.operations.lock(&row)?;

        self.expire_if_overdue(&mut operation)?;

        return Ok(operation.clone());
    }

    /// Pending operations for a team, newest first. `page` starts at 1.
    pub fn list_pending(&self, team_id: TeamId, page: usize, page_size: usize) -> Result<Vec<Operation>> {
        let (page, page_size) = self.page_bounds(page, page_size)?;
        let mut pending = vec![];

        for row in self.operations.team_rows(team_id) {
            let mut operation = self.operations.lock(&row)?;

            self.expire_if_overdue(&mut operation)?;

            if operation.is_pending() {
                pending.push(operation.clone());
            }
        }

        return Ok(pending
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect());
    }

    /// Expires every overdue pending operation. Returns how many were expired.
    pub fn expire_overdue(&self) -> Result<usize> {
        let mut expired = 0;

        for row in self.operations.all_rows() {
            let mut operation = self.operations.lock(&row)?;

            if self.expire_if_overdue(&mut operation)? {
                expired += 1;
            }
        }

        if expired > 0 {
            log::info!("Expired {expired} overdue operations");
        }

        return Ok(expired);
    }

    pub fn page_bounds(&self, page: usize, page_size: usize) -> Result<(usize, usize)> {
        if page == 0 {
            Err(LedgerError::InvalidRequest("Pages start at 1".to_string()))?
        }

        return Ok((page, page_size.clamp(1, self.config.max_page_size)));
    }

    fn expire_if_overdue(&self, operation: &mut Operation) -> Result<bool> {
        let now = self.clock.now();

        if !operation.is_overdue(now) {
            return Ok(false);
        }

        operation.expire(now)?;

        log::info!(
            "Operation {} expired at {}",
            operation.uuid,
            operation.expires_at
        );

        return Ok(true);
    }

    fn resolve_target(&self, request: &OperationRequest) -> Result<Option<TransferTarget>> {
        let target = match (request.target_team, request.target_user) {
            (Some(_), Some(_)) => Err(LedgerError::InvalidTarget(
                "A transfer can target a team or a user, not both".to_string(),
            ))?,
            (Some(team_id), None) => Some(TransferTarget::Team(team_id)),
            (None, Some(user_id)) => Some(TransferTarget::User(user_id)),
            (None, None) => None,
        };

        match (request.kind, target) {
            (OperationKind::TransferOut, None) => Err(LedgerError::InvalidTarget(
                "A transfer-out needs a target team or user".to_string(),
            ))?,
            (OperationKind::TransferOut, Some(TransferTarget::Team(team_id)))
                if team_id == request.team_id =>
            {
                Err(LedgerError::InvalidTarget(format!(
                    "{team_id} cannot transfer to itself"
                )))?
            }
            (OperationKind::TransferOut, Some(_)) => {}
            (kind, Some(_)) => Err(LedgerError::InvalidTarget(format!(
                "A {kind} operation cannot have a target"
            )))?,
            (_, None) => {}
        }

        return Ok(target);
    }

    fn resolve_expiry_hours(&self, request: &OperationRequest) -> Result<u32> {
        let hours = request
            .expiry_hours
            .unwrap_or(self.config.default_expiry_hours);

        if hours == 0 || hours > self.config.max_expiry_hours {
            Err(LedgerError::InvalidRequest(format!(
                "Expiry must be between 1 and {} hours, got {hours}",
                self.config.max_expiry_hours
            )))?
        }

        return Ok(hours);
    }

    fn find_resubmission(&self, correlation_id: Uuid, team_id: TeamId) -> Result<Option<Operation>> {
        let row = match self.operations.row(&correlation_id) {
            Ok(row) => row,
            Err(_) => return Ok(None),
        };

        let mut operation = self.operations.lock(&row)?;

        if operation.team_id != team_id {
            Err(LedgerError::InvalidRequest(format!(
                "Operation {correlation_id} belongs to {}",
                operation.team_id
            )))?
        }

        self.expire_if_overdue(&mut operation)?;

        return Ok(Some(operation.clone()));
    }
}
