use crate::ids::{AccountOwner, TeamId};
use crate::Grams;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AccountStatus {
    Normal,
    Frozen { reason: String },
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Frozen { .. } => write!(f, "frozen"),
        }
    }
}

/// Balance record for one owner. The balance is a cache of the owner's transaction log and only
/// the transfer executor writes it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: u64,
    pub uuid: Uuid,
    pub owner: AccountOwner,
    pub balance: Grams,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: u64, owner: AccountOwner, now: DateTime<Utc>) -> Self {
        return Self {
            id,
            uuid: Uuid::new_v4(),
            owner,
            balance: Grams::ZERO,
            status: AccountStatus::Normal,
            created_at: now,
            updated_at: now,
        };
    }

    /// The view handed out for the reserved no-asset team. It is never stored.
    pub fn reserved(team_id: TeamId, now: DateTime<Utc>) -> Self {
        return Self {
            id: 0,
            uuid: Uuid::nil(),
            owner: AccountOwner::Team(team_id),
            balance: Grams::ZERO,
            status: AccountStatus::Frozen {
                reason: "reserved team holds no tea".to_string(),
            },
            created_at: now,
            updated_at: now,
        };
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.status, AccountStatus::Frozen { .. })
    }

    pub fn frozen_reason(&self) -> Option<&str> {
        match &self.status {
            AccountStatus::Frozen { reason } => Some(reason),
            AccountStatus::Normal => None,
        }
    }
}
