use chrono::Utc;
use tracing::{debug, info};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        chat::{ChatMessage, ChatMessageView},
        trip::Trip,
    },
    services::{profiles::ProfileService, trips::TripService},
};

const MESSAGE_COLUMNS: &str = "id, trip_id, user_id, message, timestamp";

/// Per-trip, append-only message log. Readers poll for the whole history.
#[derive(Clone)]
pub struct ChatService {
    db: DbPool,
    trips: TripService,
    profiles: ProfileService,
}

impl ChatService {
    pub fn new(db: DbPool, trips: TripService, profiles: ProfileService) -> Self {
        Self { db, trips, profiles }
    }

    async fn participant_trip(&self, trip_id: i64, user_id: i64) -> Result<Trip, AppError> {
        let trip = self.trips.get(trip_id).await?;
        if !self.trips.is_participant(&trip, user_id).await? {
            return Err(AppError::Forbidden);
        }
        Ok(trip)
    }

    pub async fn history(
        &self,
        trip_id: i64,
        viewer_id: i64,
    ) -> Result<Vec<ChatMessage>, AppError> {
        self.participant_trip(trip_id, viewer_id).await?;
        let messages = sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE trip_id = ?1 ORDER BY id"
        ))
        .bind(trip_id)
        .fetch_all(&self.db)
        .await?;
        debug!(trip_id, viewer_id, count = messages.len(), "chat polled");
        Ok(messages)
    }

    pub async fn post(
        &self,
        trip_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<ChatMessage, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::bad_request(
                "EmptyMessage",
                "message must not be empty",
            ));
        }
        self.participant_trip(trip_id, author_id).await?;

        // One statement, so the clamp against the trip's latest timestamp and
        // the append happen under the same write lock.
        let message = sqlx::query_as::<_, ChatMessage>(&format!(
            r#"INSERT INTO chat_messages (trip_id, user_id, message, timestamp)
               VALUES (?1, ?2, ?3, MAX(?4, COALESCE(
                   (SELECT timestamp FROM chat_messages WHERE trip_id = ?1 ORDER BY id DESC LIMIT 1),
                   ?4)))
               RETURNING {MESSAGE_COLUMNS}"#
        ))
        .bind(trip_id)
        .bind(author_id)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await?;

        info!(message_id = message.id, trip_id, author_id, "chat message posted");
        Ok(message)
    }

    pub async fn views(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<Vec<ChatMessageView>, AppError> {
        let mut author_ids: Vec<i64> = messages.iter().map(|m| m.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors = self.profiles.user_views(&author_ids).await?;

        messages
            .into_iter()
            .map(|message| -> Result<ChatMessageView, AppError> {
                let user = authors
                    .get(&message.user_id)
                    .cloned()
                    .ok_or(AppError::NotFound)?;
                Ok(ChatMessageView {
                    id: message.id,
                    user,
                    message: message.message,
                    timestamp: message.timestamp,
                })
            })
            .collect()
    }
}
