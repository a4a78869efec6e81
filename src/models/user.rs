use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const ANONYMOUS_NAME: &str = "Anonymous Traveler";
pub const DEFAULT_LOCATION: &str = "Location not set";
pub const DEFAULT_PROFESSION: &str = "Adventurer";

/// Column list shared by every query that renders users; pair with `USER_FROM`.
pub const USER_COLUMNS: &str = "u.id, u.username, u.email, u.date_joined, \
     p.id IS NOT NULL AS has_profile, p.name, p.current_location, p.age, p.gender, p.profession";
pub const USER_FROM: &str = "users u LEFT JOIN profiles p ON p.user_id = u.id";

/// A user joined with its (optional) profile.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
    pub has_profile: bool,
    pub name: Option<String>,
    pub current_location: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profession: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq, Eq)]
pub struct Profile {
    pub name: Option<String>,
    pub current_location: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profession: Option<String>,
}

impl Profile {
    pub fn is_complete(&self) -> bool {
        non_blank(&self.name).is_some()
            && non_blank(&self.current_location).is_some()
            && self.age.is_some_and(|age| age > 0)
            && non_blank(&self.gender).is_some()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProfileSummary {
    pub name: String,
    pub current_location: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub profession: String,
    pub is_profile_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub profile: ProfileSummary,
    pub date_joined: DateTime<Utc>,
}

impl UserRow {
    pub fn profile(&self) -> Option<Profile> {
        self.has_profile.then(|| Profile {
            name: self.name.clone(),
            current_location: self.current_location.clone(),
            age: self.age,
            gender: self.gender.clone(),
            profession: self.profession.clone(),
        })
    }
}

impl From<UserRow> for UserView {
    fn from(row: UserRow) -> Self {
        let profile = match row.profile() {
            Some(profile) => ProfileSummary {
                name: non_blank(&profile.name)
                    .map(str::to_string)
                    .unwrap_or_else(|| display_name_from_email(&row.email)),
                current_location: non_blank(&profile.current_location)
                    .unwrap_or(DEFAULT_LOCATION)
                    .to_string(),
                age: profile.age.filter(|age| *age > 0),
                gender: non_blank(&profile.gender).map(str::to_string),
                profession: non_blank(&profile.profession)
                    .unwrap_or(DEFAULT_PROFESSION)
                    .to_string(),
                is_profile_complete: profile.is_complete(),
            },
            None => ProfileSummary {
                name: display_name_from_email(&row.email),
                current_location: DEFAULT_LOCATION.to_string(),
                age: None,
                gender: None,
                profession: DEFAULT_PROFESSION.to_string(),
                is_profile_complete: false,
            },
        };

        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            profile,
            date_joined: row.date_joined,
        }
    }
}

/// Turns `jane.doe_92@example.com` into `Jane Doe 92`.
pub fn display_name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let name = local
        .replace(['.', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");
    if name.is_empty() {
        ANONYMOUS_NAME.to_string()
    } else {
        name
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
