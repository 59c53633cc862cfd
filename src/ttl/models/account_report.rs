use super::Account;

use serde::{Deserialize, Serialize};

/// One CSV row per stored account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AccountReport {
    pub owner: String,
    pub balance: String,
    pub status: String,
    pub transactions: usize,
}

impl AccountReport {
    pub fn new(account: &Account, transactions: usize) -> Self {
        return Self {
            owner: account.owner.to_string(),
            balance: account.balance.to_string(),
            status: account.status.to_string(),
            transactions,
        };
    }
}
