use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{
    error::AppError,
    models::{trip::TripView, user::UserView},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

/// What a host can do with a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinRequestStatus::Pending => "pending",
            JoinRequestStatus::Accepted => "accepted",
            JoinRequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JoinRequestStatus::Pending)
    }

    /// Accepted and rejected are terminal; only pending may move.
    pub fn apply(self, decision: Decision) -> Result<Self, AppError> {
        if self.is_terminal() {
            return Err(AppError::InvalidTransition);
        }
        Ok(match decision {
            Decision::Accept => JoinRequestStatus::Accepted,
            Decision::Reject => JoinRequestStatus::Rejected,
        })
    }
}

impl fmt::Display for JoinRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JoinRequestStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(JoinRequestStatus::Pending),
            "accepted" => Ok(JoinRequestStatus::Accepted),
            "rejected" => Ok(JoinRequestStatus::Rejected),
            other => Err(AppError::bad_request(
                "InvalidStatus",
                format!("unknown join request status `{other}`"),
            )),
        }
    }
}

impl Decision {
    /// Parses the `status` a host submits; only the two terminal states are accepted.
    pub fn from_status(raw: &str) -> Result<Self, AppError> {
        match raw.parse::<JoinRequestStatus>()? {
            JoinRequestStatus::Accepted => Ok(Decision::Accept),
            JoinRequestStatus::Rejected => Ok(Decision::Reject),
            JoinRequestStatus::Pending => Err(AppError::bad_request(
                "InvalidStatus",
                "status must be `accepted` or `rejected`",
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JoinRequest {
    pub id: i64,
    pub trip_id: i64,
    pub user_id: i64,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinRequestView {
    pub id: i64,
    pub trip: TripView,
    pub user: UserView,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
}
