use crate::ids::{TeamId, UserId};
use crate::models::OperationKind;
use crate::services::OperationRequest;
use crate::{Grams, Result};

use serde::Deserialize;
use thiserror::Error;

/// Represents one row of a command script, as a CSV record deserializes into it
#[derive(Deserialize, Debug, Clone, Default)]
pub struct InputCommand {
    #[serde(rename = "type")]
    pub typ: Option<InputCommandType>,

    pub team: Option<u64>,
    pub user: Option<u64>,
    pub amount: Option<String>,
    pub target_team: Option<u64>,
    pub target_user: Option<u64>,

    #[serde(rename = "ref")]
    pub reference: Option<String>,

    pub hours: Option<u32>,
    pub note: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputCommandType {
    Member,
    Core,
    Leave,
    User,
    Reserve,
    Deposit,
    Withdraw,
    Transfer,
    Approve,
    Reject,
    Freeze,
    Unfreeze,
    Grant,
    Deduct,
    Advance,
}

#[derive(Error, Debug)]
pub enum InputParseError {
    #[error("Error parsing input command: no command type: {0:?}")]
    NoType(InputCommand),

    #[error("Error parsing input command: {0} value missing: {1:?}")]
    Missing(&'static str, InputCommand),
}

/// Typed script command, forcing correct handling through the type-system
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddMember {
        team_id: TeamId,
        user_id: UserId,
        core: bool,
    },
    RemoveMember {
        team_id: TeamId,
        user_id: UserId,
    },
    AddUser {
        user_id: UserId,
    },
    Reserve {
        team_id: TeamId,
    },
    Submit {
        reference: Option<String>,
        request: OperationRequest,
    },
    Approve {
        reference: String,
        approver: UserId,
    },
    Reject {
        reference: String,
        approver: UserId,
        reason: String,
    },
    Freeze {
        team_id: TeamId,
        reason: String,
    },
    Unfreeze {
        team_id: TeamId,
    },
    Grant {
        team_id: TeamId,
        amount: Grams,
        description: String,
    },
    Deduct {
        team_id: TeamId,
        amount: Grams,
        description: String,
    },
    Advance {
        hours: u32,
    },
}

impl InputCommand {
    pub fn parse_command(self) -> Result<Command> {
        let typ = self
            .typ
            .ok_or_else(|| InputParseError::NoType(self.clone()))?;

        let command = match typ {
            InputCommandType::Member | InputCommandType::Core => Command::AddMember {
                team_id: self.team_id()?,
                user_id: self.user_id()?,
                core: typ == InputCommandType::Core,
            },
            InputCommandType::Leave => Command::RemoveMember {
                team_id: self.team_id()?,
                user_id: self.user_id()?,
            },
            InputCommandType::User => Command::AddUser {
                user_id: self.user_id()?,
            },
            InputCommandType::Reserve => Command::Reserve {
                team_id: self.team_id()?,
            },
            InputCommandType::Deposit => self.submit(OperationKind::Deposit)?,
            InputCommandType::Withdraw => self.submit(OperationKind::Withdraw)?,
            InputCommandType::Transfer => self.submit(OperationKind::TransferOut)?,
            InputCommandType::Approve => Command::Approve {
                reference: self.reference()?,
                approver: self.user_id()?,
            },
            InputCommandType::Reject => Command::Reject {
                reference: self.reference()?,
                approver: self.user_id()?,
                reason: self.note(),
            },
            InputCommandType::Freeze => Command::Freeze {
                team_id: self.team_id()?,
                reason: self.note(),
            },
            InputCommandType::Unfreeze => Command::Unfreeze {
                team_id: self.team_id()?,
            },
            InputCommandType::Grant => Command::Grant {
                team_id: self.team_id()?,
                amount: self.amount()?,
                description: self.note(),
            },
            InputCommandType::Deduct => Command::Deduct {
                team_id: self.team_id()?,
                amount: self.amount()?,
                description: self.note(),
            },
            InputCommandType::Advance => Command::Advance {
                hours: self
                    .hours
                    .ok_or_else(|| InputParseError::Missing("hours", self.clone()))?,
            },
        };

        Ok(command)
    }

    fn submit(&self, kind: OperationKind) -> Result<Command> {
        let mut request = OperationRequest::new(
            self.team_id()?,
            self.user_id()?,
            kind,
            self.amount()?,
        )
        .with_note(self.note());

        request.expiry_hours = self.hours;
        request.target_team = self.target_team.map(TeamId);
        request.target_user = self.target_user.map(UserId);

        Ok(Command::Submit {
            reference: self.reference.clone().filter(|r| !r.trim().is_empty()),
            request,
        })
    }

    fn team_id(&self) -> Result<TeamId> {
        let team = self
            .team
            .ok_or_else(|| InputParseError::Missing("team", self.clone()))?;

        Ok(TeamId(team))
    }

    fn user_id(&self) -> Result<UserId> {
        let user = self
            .user
            .ok_or_else(|| InputParseError::Missing("user", self.clone()))?;

        Ok(UserId(user))
    }

    fn amount(&self) -> Result<Grams> {
        let amount = self
            .amount
            .as_deref()
            .filter(|amount| !amount.trim().is_empty())
            .ok_or_else(|| InputParseError::Missing("amount", self.clone()))?;

        Grams::parse(amount)
    }

    fn reference(&self) -> Result<String> {
        let reference = self
            .reference
            .clone()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| InputParseError::Missing("ref", self.clone()))?;

        Ok(reference)
    }

    fn note(&self) -> String {
        self.note.clone().unwrap_or_default()
    }
}
