use chrono::Utc;
use tracing::info;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{City, ItineraryItem, NewTrip, Trip, TripView, TRIP_COLUMNS},
    services::profiles::ProfileService,
};

#[derive(Clone)]
pub struct TripService {
    db: DbPool,
    profiles: ProfileService,
}

impl TripService {
    pub fn new(db: DbPool, profiles: ProfileService) -> Self {
        Self { db, profiles }
    }

    pub async fn list_cities(&self) -> Result<Vec<City>, AppError> {
        let cities = sqlx::query_as::<_, City>("SELECT id, name, image FROM cities ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(cities)
    }

    pub async fn find_city(&self, city_id: i64) -> Result<Option<City>, AppError> {
        let city = sqlx::query_as::<_, City>("SELECT id, name, image FROM cities WHERE id = ?1")
            .bind(city_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(city)
    }

    pub async fn find(&self, trip_id: i64) -> Result<Option<Trip>, AppError> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"
        ))
        .bind(trip_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(trip)
    }

    pub async fn get(&self, trip_id: i64) -> Result<Trip, AppError> {
        self.find(trip_id).await?.ok_or(AppError::NotFound)
    }

    /// Newest first, optionally restricted to one destination.
    pub async fn list(&self, destination_id: Option<i64>) -> Result<Vec<Trip>, AppError> {
        let trips = match destination_id {
            Some(city_id) => {
                sqlx::query_as::<_, Trip>(&format!(
                    "SELECT {TRIP_COLUMNS} FROM trips WHERE destination_id = ?1 \
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(city_id)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, Trip>(&format!(
                    "SELECT {TRIP_COLUMNS} FROM trips ORDER BY created_at DESC, id DESC"
                ))
                .fetch_all(&self.db)
                .await?
            }
        };
        Ok(trips)
    }

    pub async fn create(&self, host_id: i64, input: NewTrip) -> Result<Trip, AppError> {
        input.validate()?;
        if self.find_city(input.destination_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let mut tx = self.db.begin().await?;
        let trip = sqlx::query_as::<_, Trip>(&format!(
            r#"INSERT INTO trips (host_id, group_name, destination_id, start_date, end_date,
                                 description, budget, min_age, max_age, required_members, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
               RETURNING {TRIP_COLUMNS}"#
        ))
        .bind(host_id)
        .bind(input.group_name.trim())
        .bind(input.destination_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.description)
        .bind(input.budget)
        .bind(input.min_age)
        .bind(input.max_age)
        .bind(input.required_members)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for item in &input.itinerary {
            sqlx::query(
                "INSERT INTO trip_itinerary (trip_id, day, description) VALUES (?1, ?2, ?3)",
            )
            .bind(trip.id)
            .bind(item.day)
            .bind(&item.description)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(
            trip_id = trip.id,
            host_id,
            days = input.itinerary.len(),
            "trip created"
        );
        Ok(trip)
    }

    /// Only the host may delete; itinerary, members, requests and chat go with it.
    pub async fn delete(&self, trip_id: i64, actor_id: i64) -> Result<(), AppError> {
        let trip = self.get(trip_id).await?;
        if !trip.is_host(actor_id) {
            return Err(AppError::Forbidden);
        }
        sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(trip_id)
            .execute(&self.db)
            .await?;
        info!(trip_id, host_id = actor_id, "trip deleted");
        Ok(())
    }

    pub async fn member_ids(&self, trip_id: i64) -> Result<Vec<i64>, AppError> {
        let ids = sqlx::query_scalar(
            "SELECT user_id FROM trip_members WHERE trip_id = ?1 ORDER BY joined_at, user_id",
        )
        .bind(trip_id)
        .fetch_all(&self.db)
        .await?;
        Ok(ids)
    }

    pub async fn is_member(&self, trip_id: i64, user_id: i64) -> Result<bool, AppError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM trip_members WHERE trip_id = ?1 AND user_id = ?2")
                .bind(trip_id)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(found.is_some())
    }

    /// Host or current member.
    pub async fn is_participant(&self, trip: &Trip, user_id: i64) -> Result<bool, AppError> {
        if trip.is_host(user_id) {
            return Ok(true);
        }
        self.is_member(trip.id, user_id).await
    }

    pub async fn itinerary(&self, trip_id: i64) -> Result<Vec<ItineraryItem>, AppError> {
        let items = sqlx::query_as::<_, ItineraryItem>(
            "SELECT day, description FROM trip_itinerary WHERE trip_id = ?1 ORDER BY day, id",
        )
        .bind(trip_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }

    pub async fn view(&self, trip: Trip) -> Result<TripView, AppError> {
        let host = self.profiles.user_view(trip.host_id).await?;
        let destination = self
            .find_city(trip.destination_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let member_ids = self.member_ids(trip.id).await?;
        let mut by_id = self.profiles.user_views(&member_ids).await?;
        let members: Vec<_> = member_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        let itinerary_items = self.itinerary(trip.id).await?;

        Ok(TripView {
            id: trip.id,
            host,
            group_name: trip.group_name,
            destination,
            start_date: trip.start_date,
            end_date: trip.end_date,
            description: trip.description,
            budget: trip.budget,
            min_age: trip.min_age,
            max_age: trip.max_age,
            required_members: trip.required_members,
            current_members_count: members.len(),
            members,
            itinerary_items,
            created_at: trip.created_at,
        })
    }
}
