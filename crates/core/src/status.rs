//! Saga status and terminal outcomes.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::value_object::ValueObject;

/// Saga status lifecycle.
///
/// `Created` and `InProgress` are active; `Completed`, `Failed` and `Expired` are terminal.
/// Whether a requested transition is allowed depends on the current status, so the guard
/// lives in the saga engine rather than here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    Created,
    InProgress,
    Completed,
    Failed,
    Expired,
}

impl SagaStatus {
    pub const ALL: [SagaStatus; 5] = [
        SagaStatus::Created,
        SagaStatus::InProgress,
        SagaStatus::Completed,
        SagaStatus::Failed,
        SagaStatus::Expired,
    ];

    /// Canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Created => "created",
            SagaStatus::InProgress => "in_progress",
            SagaStatus::Completed => "completed",
            SagaStatus::Failed => "failed",
            SagaStatus::Expired => "expired",
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaStatus::Completed | SagaStatus::Failed | SagaStatus::Expired
        )
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl ValueObject for SagaStatus {}

impl core::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SagaStatus {
    type Err = SagaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SagaStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| SagaError::invalid_status(format!("unknown status `{s}`")))
    }
}

/// The ways a saga can end.
///
/// Closing a saga takes an outcome rather than a status, so a non-terminal close is not
/// expressible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaOutcome {
    Completed,
    Failed,
    Expired,
}

impl From<SagaOutcome> for SagaStatus {
    fn from(outcome: SagaOutcome) -> Self {
        match outcome {
            SagaOutcome::Completed => SagaStatus::Completed,
            SagaOutcome::Failed => SagaStatus::Failed,
            SagaOutcome::Expired => SagaStatus::Expired,
        }
    }
}

impl TryFrom<SagaStatus> for SagaOutcome {
    type Error = SagaError;

    fn try_from(status: SagaStatus) -> Result<Self, Self::Error> {
        match status {
            SagaStatus::Completed => Ok(SagaOutcome::Completed),
            SagaStatus::Failed => Ok(SagaOutcome::Failed),
            SagaStatus::Expired => Ok(SagaOutcome::Expired),
            other => Err(SagaError::invalid_status(format!(
                "`{other}` is not a terminal status"
            ))),
        }
    }
}
