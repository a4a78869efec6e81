use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{error::AppError, models::user::UserView};

pub const TRIP_COLUMNS: &str = "id, host_id, group_name, destination_id, start_date, end_date, \
     description, budget, min_age, max_age, required_members, created_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub host_id: i64,
    pub group_name: String,
    pub destination_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub budget: i64,
    pub min_age: i32,
    pub max_age: i32,
    pub required_members: i32,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn is_host(&self, user_id: i64) -> bool {
        self.host_id == user_id
    }

    /// Both bounds are inclusive.
    pub fn admits_age(&self, age: i32) -> bool {
        (self.min_age..=self.max_age).contains(&age)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ItineraryItem {
    pub day: i32,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrip {
    pub group_name: String,
    pub destination_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub budget: i64,
    pub min_age: i32,
    pub max_age: i32,
    pub required_members: i32,
    #[serde(default)]
    pub itinerary: Vec<ItineraryItem>,
}

impl NewTrip {
    pub fn validate(&self) -> Result<(), AppError> {
        let invalid = |detail: &str| Err(AppError::bad_request("InvalidTrip", detail));

        if self.group_name.trim().is_empty() {
            return invalid("group_name must not be empty");
        }
        if self.min_age < 0 || self.min_age > self.max_age {
            return invalid("min_age must be between 0 and max_age");
        }
        if self.start_date > self.end_date {
            return invalid("start_date must not be after end_date");
        }
        if self.required_members < 1 {
            return invalid("required_members must be at least 1");
        }
        if self.budget < 0 {
            return invalid("budget must not be negative");
        }
        if self.itinerary.iter().any(|item| item.day < 1) {
            return invalid("itinerary days start at 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TripView {
    pub id: i64,
    pub host: UserView,
    pub group_name: String,
    pub destination: City,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
    pub budget: i64,
    pub min_age: i32,
    pub max_age: i32,
    pub required_members: i32,
    pub members: Vec<UserView>,
    pub itinerary_items: Vec<ItineraryItem>,
    pub current_members_count: usize,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_trip() -> NewTrip {
        NewTrip {
            group_name: "Monsoon in Goa".into(),
            destination_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 8).unwrap(),
            description: String::new(),
            budget: 25_000,
            min_age: 18,
            max_age: 35,
            required_members: 4,
            itinerary: vec![ItineraryItem {
                day: 1,
                description: "Arrive, beach walk".into(),
            }],
        }
    }

    fn trip(min_age: i32, max_age: i32) -> Trip {
        Trip {
            id: 1,
            host_id: 1,
            group_name: "t".into(),
            destination_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 7, 8).unwrap(),
            description: String::new(),
            budget: 0,
            min_age,
            max_age,
            required_members: 2,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn age_bounds_are_inclusive() {
        let trip = trip(18, 30);
        assert!(!trip.admits_age(17));
        assert!(trip.admits_age(18));
        assert!(trip.admits_age(30));
        assert!(!trip.admits_age(31));
    }

    #[test]
    fn valid_trip_passes() {
        assert!(new_trip().validate().is_ok());
    }

    #[test]
    fn inverted_age_range_is_rejected() {
        let mut input = new_trip();
        input.min_age = 40;
        let err = input.validate().unwrap_err();
        assert_eq!(err.code(), "InvalidTrip");
    }

    #[test]
    fn end_before_start_is_rejected() {
        let mut input = new_trip();
        input.end_date = NaiveDate::from_ymd_opt(2026, 6, 30).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn zero_required_members_is_rejected() {
        let mut input = new_trip();
        input.required_members = 0;
        assert!(input.validate().is_err());
    }
}
