use super::{TeamId, UserId};

use std::fmt;

use serde::{Deserialize, Serialize};

/// Holder of a balance. Team accounts are the ledger's main subject; personal accounts only
/// ever receive transfers from teams.
///
/// The derived ordering (teams before users, then by id) is the global lock order used when an
/// atomic unit spans more than one account.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountOwner {
    Team(TeamId),
    User(UserId),
}

impl fmt::Display for AccountOwner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Team(team_id) => write!(f, "{team_id}"),
            Self::User(user_id) => write!(f, "{user_id}"),
        }
    }
}
