use crate::error::LedgerError;
use crate::ids::{AccountOwner, TeamId, UserId};
use crate::Result;

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

/// What the ledger needs to know about teams and users. Membership itself lives elsewhere.
pub trait MembershipGate: Send + Sync {
    fn active_member_count(&self, team_id: TeamId) -> Result<usize>;

    fn is_core_member(&self, user_id: UserId, team_id: TeamId) -> Result<bool>;

    fn is_reserved_no_asset_team(&self, team_id: TeamId) -> bool;

    /// Fails if `user_id` cannot hold a personal account
    fn ensure_personal_account_exists(&self, user_id: UserId) -> Result;
}

#[derive(Debug, Default)]
struct Roster {
    members: HashSet<UserId>,
    core: HashSet<UserId>,
}

/// In-memory membership directory, used by the command-script binary and by tests
#[derive(Debug, Default)]
pub struct Directory {
    teams: RwLock<HashMap<TeamId, Roster>>,
    users: RwLock<HashSet<UserId>>,
    reserved: RwLock<Option<TeamId>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user_id: UserId) {
        self.users.write().insert(user_id);
    }

    pub fn add_member(&self, team_id: TeamId, user_id: UserId) {
        self.add_user(user_id);
        self.teams
            .write()
            .entry(team_id)
            .or_default()
            .members
            .insert(user_id);
    }

    pub fn add_core_member(&self, team_id: TeamId, user_id: UserId) {
        self.add_user(user_id);

        let mut teams = self.teams.write();
        let roster = teams.entry(team_id).or_default();

        roster.members.insert(user_id);
        roster.core.insert(user_id);
    }

    pub fn remove_member(&self, team_id: TeamId, user_id: UserId) {
        if let Some(roster) = self.teams.write().get_mut(&team_id) {
            roster.members.remove(&user_id);
            roster.core.remove(&user_id);
        }
    }

    pub fn reserve(&self, team_id: TeamId) {
        *self.reserved.write() = Some(team_id);
    }
}

impl MembershipGate for Directory {
    fn active_member_count(&self, team_id: TeamId) -> Result<usize> {
        let count = self
            .teams
            .read()
            .get(&team_id)
            .map(|roster| roster.members.len())
            .unwrap_or(0);

        return Ok(count);
    }

    fn is_core_member(&self, user_id: UserId, team_id: TeamId) -> Result<bool> {
        let is_core = self
            .teams
            .read()
            .get(&team_id)
            .map(|roster| roster.core.contains(&user_id))
            .unwrap_or(false);

        return Ok(is_core);
    }

    fn is_reserved_no_asset_team(&self, team_id: TeamId) -> bool {
        *self.reserved.read() == Some(team_id)
    }

    fn ensure_personal_account_exists(&self, user_id: UserId) -> Result {
        if !self.users.read().contains(&user_id) {
            Err(LedgerError::AccountNotFound(AccountOwner::User(user_id)))?
        }

        return Ok(());
    }
}
