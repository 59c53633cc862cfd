use crate::models::{Transaction, TransactionKind};
use crate::{Grams, Result};

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TransactionLogError {
    #[error("Broken ledger chain at index {0}: balance_before {1} does not follow {2}")]
    BrokenChain(usize, Grams, Grams),

    #[error("Inconsistent ledger entry at index {0}: {1} of {2} cannot move {3} to {4}")]
    InconsistentEntry(usize, TransactionKind, Grams, Grams, Grams),
}

/// Represents a WORM (Write Once, Read Many) log of one account's balance changes, in the order
/// they were applied
#[derive(Debug, Default)]
pub struct TransactionLog {
    history: Vec<Transaction>,
    lookup_map: HashMap<Uuid, Vec<usize>>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, tx: Transaction) -> usize {
        let index = self.history.len();

        if let Some(operation) = tx.operation {
            self.lookup_map.entry(operation).or_default().push(index);
        }

        self.history.push(tx);

        index
    }

    /// Returns the entries written on behalf of an operation
    pub fn find_for_operation(&self, operation: &Uuid) -> Vec<&Transaction> {
        self.lookup_map
            .get(operation)
            .map(|indicies| indicies.iter().map(|idx| &self.history[*idx]).collect())
            .unwrap_or_default()
    }

    /// Newest first. `page` starts at 1.
    pub fn page(
        &self,
        page: usize,
        page_size: usize,
        kind: Option<TransactionKind>,
    ) -> Vec<Transaction> {
        let skip = page.saturating_sub(1).saturating_mul(page_size);

        self.history
            .iter()
            .rev()
            .filter(|tx| kind.map_or(true, |kind| tx.kind == kind))
            .skip(skip)
            .take(page_size)
            .cloned()
            .collect()
    }

    /// Folds every entry from a zero balance, checking that each entry picks up where the
    /// previous one left off
    pub fn replay(&self) -> Result<Grams> {
        let mut balance = Grams::ZERO;

        for (idx, tx) in self.history.iter().enumerate() {
            if tx.balance_before != balance {
                Err(TransactionLogError::BrokenChain(
                    idx,
                    tx.balance_before,
                    balance,
                ))?;
            }

            let after = tx.kind.apply(balance, tx.amount)?;

            if after != tx.balance_after {
                Err(TransactionLogError::InconsistentEntry(
                    idx,
                    tx.kind,
                    tx.amount,
                    tx.balance_before,
                    tx.balance_after,
                ))?;
            }

            balance = after;
        }

        Ok(balance)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
