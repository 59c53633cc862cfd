use crate::ids::AccountOwner;
use crate::{Grams, Result};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    TransferOut,
    TransferIn,
    SystemGrant,
    SystemDeduct,
}

impl TransactionKind {
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit | Self::TransferIn | Self::SystemGrant)
    }

    /// Applies this kind's sign to `amount` on top of `balance`
    pub fn apply(&self, balance: Grams, amount: Grams) -> Result<Grams> {
        if self.is_credit() {
            return balance.checked_add(amount);
        }

        return balance.checked_sub(amount);
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::TransferOut => "transfer-out",
            Self::TransferIn => "transfer-in",
            Self::SystemGrant => "system-grant",
            Self::SystemDeduct => "system-deduct",
        };

        write!(f, "{kind}")
    }
}

/// Immutable ledger entry recording exactly one balance change on one account
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub id: u64,
    pub uuid: Uuid,
    pub owner: AccountOwner,
    pub operation: Option<Uuid>,
    pub kind: TransactionKind,
    pub amount: Grams,
    pub balance_before: Grams,
    pub balance_after: Grams,
    pub description: String,
    pub counterparty: Option<AccountOwner>,
    pub created_at: DateTime<Utc>,
}
