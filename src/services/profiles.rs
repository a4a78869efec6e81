use std::collections::HashMap;

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use sqlx::{QueryBuilder, Sqlite};
use tracing::info;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{Profile, UserRow, UserView, USER_COLUMNS, USER_FROM},
};

pub const MAX_AGE: i32 = 150;

/// Partial update of the caller's profile. Absent fields are left untouched,
/// blank strings clear the stored value.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub current_location: Option<String>,
    #[serde(default)]
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profession: Option<String>,
}

impl ProfileUpdate {
    fn apply_to(self, profile: &mut Profile) -> Result<(), AppError> {
        if let Some(age) = self.age {
            if !(0..=MAX_AGE).contains(&age) {
                return Err(AppError::bad_request(
                    "InvalidProfile",
                    format!("age must be between 0 and {MAX_AGE}"),
                ));
            }
            profile.age = Some(age);
        }
        if let Some(name) = self.name {
            profile.name = normalize_optional(name);
        }
        if let Some(location) = self.current_location {
            profile.current_location = normalize_optional(location);
        }
        if let Some(gender) = self.gender {
            profile.gender = normalize_optional(gender);
        }
        if let Some(profession) = self.profession {
            profile.profession = normalize_optional(profession);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProfileService {
    db: DbPool,
}

impl ProfileService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn find_user(&self, user_id: i64) -> Result<Option<UserRow>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM {USER_FROM} WHERE u.id = ?1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    pub async fn user_view(&self, user_id: i64) -> Result<UserView, AppError> {
        self.find_user(user_id)
            .await?
            .map(UserView::from)
            .ok_or(AppError::NotFound)
    }

    /// Renders every listed user; ids without a row are silently skipped.
    pub async fn user_views(&self, ids: &[i64]) -> Result<HashMap<i64, UserView>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {USER_COLUMNS} FROM {USER_FROM} WHERE u.id IN ("
        ));
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = query.build_query_as::<UserRow>().fetch_all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.id, UserView::from(row)))
            .collect())
    }

    pub async fn age_of(&self, user_id: i64) -> Result<Option<i32>, AppError> {
        let age: Option<Option<i32>> =
            sqlx::query_scalar("SELECT age FROM profiles WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(age.flatten())
    }

    pub async fn profile(&self, user_id: i64) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT name, current_location, age, gender, profession FROM profiles WHERE user_id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(profile)
    }

    /// Merges the update into the stored profile, creating it on first write.
    pub async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<Profile, AppError> {
        if self.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        let mut profile = self.profile(user_id).await?.unwrap_or_default();
        update.apply_to(&mut profile)?;

        sqlx::query(
            r#"INSERT INTO profiles (user_id, name, current_location, age, gender, profession)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)
               ON CONFLICT(user_id) DO UPDATE SET
                   name = excluded.name,
                   current_location = excluded.current_location,
                   age = excluded.age,
                   gender = excluded.gender,
                   profession = excluded.profession"#,
        )
        .bind(user_id)
        .bind(&profile.name)
        .bind(&profile.current_location)
        .bind(profile.age)
        .bind(&profile.gender)
        .bind(&profile.profession)
        .execute(&self.db)
        .await?;

        info!(user_id, complete = profile.is_complete(), "profile updated");
        Ok(profile)
    }
}

fn normalize_optional(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_accepts_numbers_and_numeric_strings() {
        let from_number: ProfileUpdate = serde_json::from_str(r#"{"age": 21}"#).unwrap();
        let from_string: ProfileUpdate = serde_json::from_str(r#"{"age": "21"}"#).unwrap();
        let absent: ProfileUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(from_number.age, Some(21));
        assert_eq!(from_string.age, Some(21));
        assert_eq!(absent.age, None);
    }

    #[test]
    fn blank_strings_clear_and_absent_fields_are_kept() {
        let mut profile = Profile {
            name: Some("Asha".into()),
            current_location: Some("Delhi".into()),
            age: Some(30),
            gender: Some("female".into()),
            profession: Some("Chef".into()),
        };
        let update = ProfileUpdate {
            current_location: Some("   ".into()),
            profession: Some(" Pilot ".into()),
            ..Default::default()
        };
        update.apply_to(&mut profile).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Asha"));
        assert_eq!(profile.current_location, None);
        assert_eq!(profile.age, Some(30));
        assert_eq!(profile.profession.as_deref(), Some("Pilot"));
    }

    #[test]
    fn out_of_range_age_is_rejected() {
        let mut profile = Profile::default();
        let update = ProfileUpdate {
            age: Some(-1),
            ..Default::default()
        };
        let err = update.apply_to(&mut profile).unwrap_err();
        assert_eq!(err.code(), "InvalidProfile");
        assert_eq!(profile.age, None);
    }
}
