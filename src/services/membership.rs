//! Join requests: who may ask to join a trip, and what happens when the host
//! answers.
//!
//! Eligibility is decided by [`check_eligibility`] from plain reads. The
//! UNIQUE (trip, user) constraint on `join_requests` is the last word on
//! duplicates, so a concurrent second insert still surfaces as
//! [`JoinRejection::DuplicateRequest`].

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    db::{is_unique_violation, DbPool},
    error::AppError,
    models::{
        join_request::{Decision, JoinRequest, JoinRequestStatus, JoinRequestView},
        trip::Trip,
    },
    services::{profiles::ProfileService, trips::TripService},
};

const JOIN_REQUEST_COLUMNS: &str = "id, trip_id, user_id, status, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinRejection {
    #[error("you are already a member of this trip")]
    AlreadyMember,
    #[error("the host cannot join their own trip")]
    HostCannotJoin,
    #[error("your age does not meet this trip's age requirements")]
    AgeRestricted,
    #[error("you have already sent a join request for this trip")]
    DuplicateRequest,
}

impl JoinRejection {
    pub fn code(&self) -> &'static str {
        match self {
            JoinRejection::AlreadyMember => "AlreadyMember",
            JoinRejection::HostCannotJoin => "HostCannotJoin",
            JoinRejection::AgeRestricted => "AgeRestricted",
            JoinRejection::DuplicateRequest => "DuplicateRequest",
        }
    }
}

/// Everything the policy needs to know about the requester.
#[derive(Debug, Clone, Copy)]
pub struct JoinCandidate {
    pub user_id: i64,
    pub age: Option<i32>,
    pub is_member: bool,
    pub has_request: bool,
}

/// Checks run in a fixed order and the first failure wins. An unknown age
/// never satisfies the trip's bounds.
pub fn check_eligibility(trip: &Trip, candidate: &JoinCandidate) -> Result<(), JoinRejection> {
    if candidate.is_member {
        return Err(JoinRejection::AlreadyMember);
    }
    if trip.is_host(candidate.user_id) {
        return Err(JoinRejection::HostCannotJoin);
    }
    if !candidate.age.is_some_and(|age| trip.admits_age(age)) {
        return Err(JoinRejection::AgeRestricted);
    }
    if candidate.has_request {
        return Err(JoinRejection::DuplicateRequest);
    }
    Ok(())
}

#[derive(Clone)]
pub struct MembershipService {
    db: DbPool,
    trips: TripService,
    profiles: ProfileService,
}

impl MembershipService {
    pub fn new(db: DbPool, trips: TripService, profiles: ProfileService) -> Self {
        Self { db, trips, profiles }
    }

    pub async fn find(&self, request_id: i64) -> Result<Option<JoinRequest>, AppError> {
        let request = sqlx::query_as::<_, JoinRequest>(&format!(
            "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests WHERE id = ?1"
        ))
        .bind(request_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(request)
    }

    pub async fn find_for(
        &self,
        trip_id: i64,
        user_id: i64,
    ) -> Result<Option<JoinRequest>, AppError> {
        let request = sqlx::query_as::<_, JoinRequest>(&format!(
            "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests WHERE trip_id = ?1 AND user_id = ?2"
        ))
        .bind(trip_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(request)
    }

    pub async fn request_to_join(
        &self,
        trip_id: i64,
        user_id: i64,
    ) -> Result<JoinRequest, AppError> {
        let trip = self.trips.get(trip_id).await?;
        let candidate = JoinCandidate {
            user_id,
            age: self.profiles.age_of(user_id).await?,
            is_member: self.trips.is_member(trip_id, user_id).await?,
            has_request: self.find_for(trip_id, user_id).await?.is_some(),
        };

        if let Err(rejection) = check_eligibility(&trip, &candidate) {
            info!(trip_id, user_id, reason = rejection.code(), "join request refused");
            return Err(rejection.into());
        }

        let inserted = sqlx::query_as::<_, JoinRequest>(&format!(
            "INSERT INTO join_requests (trip_id, user_id, status, created_at) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {JOIN_REQUEST_COLUMNS}"
        ))
        .bind(trip_id)
        .bind(user_id)
        .bind(JoinRequestStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(request) => {
                info!(request_id = request.id, trip_id, user_id, "join request created");
                Ok(request)
            }
            Err(err) if is_unique_violation(&err) => {
                warn!(trip_id, user_id, "concurrent duplicate join request");
                Err(JoinRejection::DuplicateRequest.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Host-only. Accepting also adds the requester to the trip's members in
    /// the same transaction.
    pub async fn decide(
        &self,
        request_id: i64,
        actor_id: i64,
        decision: Decision,
    ) -> Result<JoinRequest, AppError> {
        let request = self.find(request_id).await?.ok_or(AppError::NotFound)?;
        let trip = self.trips.get(request.trip_id).await?;
        if !trip.is_host(actor_id) {
            warn!(request_id, actor_id, "non-host tried to decide a join request");
            return Err(AppError::Forbidden);
        }
        let next = request.status.apply(decision)?;

        let mut tx = self.db.begin().await?;
        // Compare-and-set on pending so two racing decisions cannot both land.
        let updated =
            sqlx::query("UPDATE join_requests SET status = ?1 WHERE id = ?2 AND status = ?3")
                .bind(next)
                .bind(request_id)
                .bind(JoinRequestStatus::Pending)
                .execute(&mut *tx)
                .await?;
        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(AppError::InvalidTransition);
        }

        if next == JoinRequestStatus::Accepted {
            sqlx::query(
                "INSERT OR IGNORE INTO trip_members (trip_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            )
            .bind(trip.id)
            .bind(request.user_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(
            request_id,
            trip_id = trip.id,
            user_id = request.user_id,
            status = %next,
            "join request decided"
        );
        Ok(JoinRequest {
            status: next,
            ..request
        })
    }

    /// Every request on one trip, visible to its host only.
    pub async fn list_for_trip(
        &self,
        trip_id: i64,
        actor_id: i64,
    ) -> Result<Vec<JoinRequest>, AppError> {
        let trip = self.trips.get(trip_id).await?;
        if !trip.is_host(actor_id) {
            return Err(AppError::Forbidden);
        }
        let requests = sqlx::query_as::<_, JoinRequest>(&format!(
            "SELECT {JOIN_REQUEST_COLUMNS} FROM join_requests WHERE trip_id = ?1 ORDER BY id"
        ))
        .bind(trip_id)
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }

    /// Requests on every trip the caller hosts, newest first.
    pub async fn list_for_host(
        &self,
        host_id: i64,
        status: Option<JoinRequestStatus>,
    ) -> Result<Vec<JoinRequest>, AppError> {
        let requests = sqlx::query_as::<_, JoinRequest>(
            r#"SELECT r.id, r.trip_id, r.user_id, r.status, r.created_at
               FROM join_requests r JOIN trips t ON t.id = r.trip_id
               WHERE t.host_id = ?1 AND (?2 IS NULL OR r.status = ?2)
               ORDER BY r.id DESC"#,
        )
        .bind(host_id)
        .bind(status)
        .fetch_all(&self.db)
        .await?;
        Ok(requests)
    }

    pub async fn view(&self, request: JoinRequest) -> Result<JoinRequestView, AppError> {
        let trip = self.trips.get(request.trip_id).await?;
        Ok(JoinRequestView {
            id: request.id,
            trip: self.trips.view(trip).await?,
            user: self.profiles.user_view(request.user_id).await?,
            status: request.status,
            created_at: request.created_at,
        })
    }

    pub async fn views(
        &self,
        requests: Vec<JoinRequest>,
    ) -> Result<Vec<JoinRequestView>, AppError> {
        let mut views = Vec::with_capacity(requests.len());
        for request in requests {
            views.push(self.view(request).await?);
        }
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const HOST: i64 = 1;
    const GUEST: i64 = 2;

    fn trip() -> Trip {
        Trip {
            id: 10,
            host_id: HOST,
            group_name: "Backpacking Hampi".into(),
            destination_id: 1,
            start_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 11, 5).unwrap(),
            description: String::new(),
            budget: 12_000,
            min_age: 18,
            max_age: 30,
            required_members: 3,
            created_at: Utc::now(),
        }
    }

    fn guest(age: Option<i32>) -> JoinCandidate {
        JoinCandidate {
            user_id: GUEST,
            age,
            is_member: false,
            has_request: false,
        }
    }

    #[test]
    fn eligible_guest_is_admitted() {
        assert_eq!(check_eligibility(&trip(), &guest(Some(24))), Ok(()));
    }

    #[test]
    fn underage_guest_is_age_restricted() {
        assert_eq!(
            check_eligibility(&trip(), &guest(Some(17))),
            Err(JoinRejection::AgeRestricted)
        );
    }

    #[test]
    fn unknown_age_is_age_restricted() {
        assert_eq!(
            check_eligibility(&trip(), &guest(None)),
            Err(JoinRejection::AgeRestricted)
        );
    }

    #[test]
    fn host_cannot_join() {
        let host = JoinCandidate {
            user_id: HOST,
            ..guest(Some(25))
        };
        assert_eq!(
            check_eligibility(&trip(), &host),
            Err(JoinRejection::HostCannotJoin)
        );
    }

    #[test]
    fn existing_request_is_a_duplicate() {
        let candidate = JoinCandidate {
            has_request: true,
            ..guest(Some(25))
        };
        assert_eq!(
            check_eligibility(&trip(), &candidate),
            Err(JoinRejection::DuplicateRequest)
        );
    }

    #[test]
    fn membership_is_checked_before_everything_else() {
        let candidate = JoinCandidate {
            is_member: true,
            has_request: true,
            ..guest(Some(99))
        };
        assert_eq!(
            check_eligibility(&trip(), &candidate),
            Err(JoinRejection::AlreadyMember)
        );
    }

    #[test]
    fn age_is_checked_before_duplicates() {
        let candidate = JoinCandidate {
            has_request: true,
            ..guest(Some(40))
        };
        assert_eq!(
            check_eligibility(&trip(), &candidate),
            Err(JoinRejection::AgeRestricted)
        );
    }

    #[test]
    fn rejection_codes_are_stable() {
        let err: AppError = JoinRejection::HostCannotJoin.into();
        assert_eq!(err.code(), "HostCannotJoin");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
