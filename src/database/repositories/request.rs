//! Participation request repository implementation

use sqlx::{PgConnection, PgPool};

use crate::models::{NewParticipationRequest, ParticipationRequest, RequestStatus};
use crate::utils::errors::Result;

const REQUEST_COLUMNS: &str = "id, created, event_id, requester_id, status";

#[derive(Debug, Clone)]
pub struct RequestRepository {
    pool: PgPool,
}

impl RequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find request by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ParticipationRequest>> {
        let request = sqlx::query_as::<_, ParticipationRequest>(&format!(
            "SELECT {} FROM participation_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Find the non-canceled request of a user for an event
    pub async fn find_active(&self, requester: i64, event: i64) -> Result<Option<ParticipationRequest>> {
        let request = sqlx::query_as::<_, ParticipationRequest>(&format!(
            "SELECT {} FROM participation_requests \
             WHERE requester_id = $1 AND event_id = $2 AND status <> 'CANCELED'",
            REQUEST_COLUMNS
        ))
        .bind(requester)
        .bind(event)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Get all requests for an event
    pub async fn list_by_event(&self, event: i64) -> Result<Vec<ParticipationRequest>> {
        let requests = sqlx::query_as::<_, ParticipationRequest>(&format!(
            "SELECT {} FROM participation_requests WHERE event_id = $1 ORDER BY id ASC",
            REQUEST_COLUMNS
        ))
        .bind(event)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    /// Get all requests made by a user
    pub async fn list_by_requester(&self, requester: i64) -> Result<Vec<ParticipationRequest>> {
        let requests = sqlx::query_as::<_, ParticipationRequest>(&format!(
            "SELECT {} FROM participation_requests WHERE requester_id = $1 ORDER BY id ASC",
            REQUEST_COLUMNS
        ))
        .bind(requester)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    pub async fn insert(conn: &mut PgConnection, request: &NewParticipationRequest) -> Result<ParticipationRequest> {
        let request = sqlx::query_as::<_, ParticipationRequest>(&format!(
            r#"
            INSERT INTO participation_requests (created, event_id, requester_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.created)
        .bind(request.event)
        .bind(request.requester)
        .bind(request.status)
        .fetch_one(conn)
        .await?;

        Ok(request)
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: i64,
        status: RequestStatus,
    ) -> Result<Option<ParticipationRequest>> {
        let request = sqlx::query_as::<_, ParticipationRequest>(&format!(
            "UPDATE participation_requests SET status = $2 WHERE id = $1 RETURNING {}",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(conn)
        .await?;

        Ok(request)
    }
}
