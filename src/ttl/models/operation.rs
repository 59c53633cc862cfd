use crate::error::LedgerError;
use crate::ids::{AccountOwner, TeamId, UserId};
use crate::models::TransactionKind;
use crate::{Grams, Result};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
}

impl OperationKind {
    /// Whether applying the operation takes tea out of the requesting team
    pub fn debits_team(&self) -> bool {
        matches!(self, Self::Withdraw | Self::TransferOut)
    }

    pub fn transaction_kind(&self) -> TransactionKind {
        match self {
            Self::Deposit => TransactionKind::Deposit,
            Self::Withdraw => TransactionKind::Withdraw,
            Self::TransferOut => TransactionKind::TransferOut,
            Self::TransferIn => TransactionKind::TransferIn,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.transaction_kind())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        };

        write!(f, "{status}")
    }
}

/// Counterparty of a transfer-out. Exactly one target exists per transfer, so a request naming
/// both a team and a user never makes it into an `Operation`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransferTarget {
    Team(TeamId),
    User(UserId),
}

impl TransferTarget {
    pub fn owner(&self) -> AccountOwner {
        match self {
            Self::Team(team_id) => AccountOwner::Team(*team_id),
            Self::User(user_id) => AccountOwner::User(*user_id),
        }
    }
}

/// A requested balance change moving through the approval state machine:
///
/// Pending
/// -> approve: Approved
/// -> reject: Rejected
/// -> expire: Expired
///
/// Approved, Rejected, Expired
/// -> _
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub id: u64,
    pub uuid: Uuid,
    pub team_id: TeamId,
    pub kind: OperationKind,
    pub amount: Grams,
    pub status: OperationStatus,
    pub operator: UserId,
    pub approver: Option<UserId>,
    pub target: Option<TransferTarget>,
    pub note: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Operation {
    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now > self.expires_at
    }

    /// Every account the operation touches when applied, in lock order
    pub fn accounts(&self) -> Vec<AccountOwner> {
        let mut owners = vec![AccountOwner::Team(self.team_id)];

        if let Some(target) = self.target {
            owners.push(target.owner());
        }

        owners.sort();
        owners.dedup();

        owners
    }

    pub fn approve(&mut self, approver: UserId, now: DateTime<Utc>) -> Result {
        self.ensure_pending()?;

        self.status = OperationStatus::Approved;
        self.approver = Some(approver);
        self.approved_at = Some(now);
        self.resolved_at = Some(now);

        return Ok(());
    }

    pub fn reject(&mut self, approver: UserId, reason: String, now: DateTime<Utc>) -> Result {
        self.ensure_pending()?;

        self.status = OperationStatus::Rejected;
        self.approver = Some(approver);
        self.rejection_reason = Some(reason);
        self.resolved_at = Some(now);

        return Ok(());
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> Result {
        self.ensure_pending()?;

        self.status = OperationStatus::Expired;
        self.resolved_at = Some(now);

        return Ok(());
    }

    pub fn ensure_pending(&self) -> Result {
        if !self.is_pending() {
            Err(LedgerError::InvalidState(self.uuid, self.status))?
        }

        return Ok(());
    }
}
