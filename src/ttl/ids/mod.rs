mod account_owner;
mod team_id;
mod user_id;

pub use account_owner::AccountOwner;
pub use team_id::TeamId;
pub use user_id::UserId;
