use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::user::UserView;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub trip_id: i64,
    pub user_id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageView {
    pub id: i64,
    pub user: UserView,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
