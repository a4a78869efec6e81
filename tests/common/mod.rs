#![allow(dead_code)]

use std::net::SocketAddr;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use tempfile::TempDir;
use tripmates::{
    auth::token_digest,
    config::AppConfig,
    db::{init_pool, run_migrations},
    models::trip::{ItineraryItem, NewTrip, Trip},
    state::AppState,
};

/// A migrated database in a temp dir plus the state wired on top of it.
pub struct TestApp {
    pub state: AppState,
    _root: TempDir,
}

impl TestApp {
    pub async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for test database")?;
        let db_path = root.path().join("tripmates.sqlite");
        let config = AppConfig {
            database_url: format!("sqlite://{}", db_path.to_string_lossy()),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            allowed_origins: vec!["http://localhost:3000".into()],
        };

        let db = init_pool(&config.database_url).await?;
        run_migrations(&db).await?;

        Ok(Self {
            state: AppState::new(config, db),
            _root: root,
        })
    }

    /// Inserts a user; a profile row is only written when an age is given.
    pub async fn create_user(&self, username: &str, age: Option<i32>) -> anyhow::Result<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, date_joined) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(username)
        .bind(format!("{username}@example.com"))
        .bind(Utc::now())
        .fetch_one(&self.state.db)
        .await?;

        if let Some(age) = age {
            sqlx::query("INSERT INTO profiles (user_id, name, age) VALUES (?1, ?2, ?3)")
                .bind(id)
                .bind(username)
                .bind(age)
                .execute(&self.state.db)
                .await?;
        }
        Ok(id)
    }

    /// Stands in for the external auth service that provisions tokens.
    pub async fn issue_token(&self, user_id: i64) -> anyhow::Result<String> {
        let token = format!("test-token-{user_id}");
        sqlx::query("INSERT INTO auth_tokens (key_digest, user_id, created_at) VALUES (?1, ?2, ?3)")
            .bind(token_digest(&token))
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.state.db)
            .await?;
        Ok(token)
    }

    pub async fn goa_id(&self) -> anyhow::Result<i64> {
        let id = sqlx::query_scalar("SELECT id FROM cities WHERE name = 'Goa'")
            .fetch_one(&self.state.db)
            .await?;
        Ok(id)
    }

    pub async fn create_trip(
        &self,
        host_id: i64,
        min_age: i32,
        max_age: i32,
    ) -> anyhow::Result<Trip> {
        let input = NewTrip {
            group_name: "Goa Beach Hoppers".into(),
            destination_id: self.goa_id().await?,
            start_date: NaiveDate::from_ymd_opt(2026, 12, 20).context("date")?,
            end_date: NaiveDate::from_ymd_opt(2026, 12, 27).context("date")?,
            description: "Beaches, forts and seafood".into(),
            budget: 30_000,
            min_age,
            max_age,
            required_members: 4,
            itinerary: vec![
                ItineraryItem {
                    day: 1,
                    description: "Check in at Anjuna".into(),
                },
                ItineraryItem {
                    day: 2,
                    description: "Fort Aguada".into(),
                },
            ],
        };
        Ok(self.state.trips.create(host_id, input).await?)
    }

    pub async fn join_request_count(&self, trip_id: i64, user_id: i64) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM join_requests WHERE trip_id = ?1 AND user_id = ?2",
        )
        .bind(trip_id)
        .bind(user_id)
        .fetch_one(&self.state.db)
        .await?;
        Ok(count)
    }
}
