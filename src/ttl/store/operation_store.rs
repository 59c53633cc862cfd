use crate::error::LedgerError;
use crate::ids::TeamId;
use crate::models::Operation;
use crate::Result;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};
use uuid::Uuid;

pub type OperationRowRef = Arc<Mutex<Operation>>;

#[derive(Default)]
struct OperationIndex {
    by_uuid: HashMap<Uuid, OperationRowRef>,
    by_team: HashMap<TeamId, Vec<Uuid>>,
}

/// Operations keyed by correlation id. Rows are never removed.
pub struct OperationStore {
    index: RwLock<OperationIndex>,
    next_id: AtomicU64,
    lock_timeout: Duration,
}

impl OperationStore {
    pub fn new(lock_timeout: Duration) -> Self {
        return Self {
            index: RwLock::new(OperationIndex::default()),
            next_id: AtomicU64::new(1),
            lock_timeout,
        };
    }

    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Stores `operation` unless its uuid is taken. Returns whether it was stored.
    pub fn insert_if_absent(&self, operation: Operation) -> bool {
        let mut index = self.index.write();

        if index.by_uuid.contains_key(&operation.uuid) {
            return false;
        }

        log::debug!(
            "Storing operation {} ({}) as {}",
            operation.uuid,
            operation.kind,
            operation.status
        );

        index
            .by_team
            .entry(operation.team_id)
            .or_default()
            .push(operation.uuid);
        index
            .by_uuid
            .insert(operation.uuid, Arc::new(Mutex::new(operation)));

        true
    }

    pub fn row(&self, uuid: &Uuid) -> Result<OperationRowRef> {
        let row = self
            .index
            .read()
            .by_uuid
            .get(uuid)
            .cloned()
            .ok_or(LedgerError::OperationNotFound(*uuid))?;

        return Ok(row);
    }

    pub fn lock<'a>(&self, row: &'a OperationRowRef) -> Result<MutexGuard<'a, Operation>> {
        let guard = row.try_lock_for(self.lock_timeout).ok_or_else(|| {
            LedgerError::StorageFailure("Timed out waiting for an operation lock".to_string())
        })?;

        return Ok(guard);
    }

    pub fn get(&self, uuid: &Uuid) -> Result<Operation> {
        let row = self.row(uuid)?;
        let operation = self.lock(&row)?;

        return Ok(operation.clone());
    }

    /// The team's operations, newest first
    pub fn team_rows(&self, team_id: TeamId) -> Vec<OperationRowRef> {
        let index = self.index.read();

        index
            .by_team
            .get(&team_id)
            .map(|uuids| {
                uuids
                    .iter()
                    .rev()
                    .filter_map(|uuid| index.by_uuid.get(uuid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all_rows(&self) -> Vec<OperationRowRef> {
        self.index.read().by_uuid.values().cloned().collect()
    }
}
