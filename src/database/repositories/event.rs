//! Event repository implementation

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::models::{Event, EventPredicate, EventQuery, NewEventRecord, PageRequest, SortMode};
use crate::utils::errors::Result;
use crate::utils::helpers::escape_like;

const EVENT_COLUMNS: &str = "id, annotation, category_id, description, event_date, lat, lon, paid, \
     participant_limit, confirmed_requests, request_moderation, title, created_on, initiator_id, \
     published_on, state, views, version";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, record: NewEventRecord) -> Result<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (annotation, category_id, description, event_date, lat, lon, paid,
                                participant_limit, request_moderation, title, created_on, initiator_id, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(record.annotation)
        .bind(record.category)
        .bind(record.description)
        .bind(record.event_date)
        .bind(record.location.lat)
        .bind(record.location.lon)
        .bind(record.paid)
        .bind(record.participant_limit)
        .bind(record.request_moderation)
        .bind(record.title)
        .bind(record.created_on)
        .bind(record.initiator)
        .bind(record.state)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE id = $1",
            EVENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Events created by a user, in id order
    pub async fn list_by_initiator(&self, initiator: i64, page: PageRequest) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {} FROM events WHERE initiator_id = $1 ORDER BY id ASC LIMIT $2 OFFSET $3",
            EVENT_COLUMNS
        ))
        .bind(initiator)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    /// Write content fields and state if `event.version` is still current.
    ///
    /// Returns `None` when the version moved on.
    pub async fn update_versioned(&self, event: &Event) -> Result<Option<Event>> {
        let saved = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET annotation = $3,
                category_id = $4,
                description = $5,
                event_date = $6,
                lat = $7,
                lon = $8,
                paid = $9,
                participant_limit = $10,
                request_moderation = $11,
                title = $12,
                published_on = $13,
                state = $14,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event.id)
        .bind(event.version)
        .bind(&event.annotation)
        .bind(event.category)
        .bind(&event.description)
        .bind(event.event_date)
        .bind(event.location.lat)
        .bind(event.location.lon)
        .bind(event.paid)
        .bind(event.participant_limit)
        .bind(event.request_moderation)
        .bind(&event.title)
        .bind(event.published_on)
        .bind(event.state)
        .fetch_optional(&self.pool)
        .await?;

        Ok(saved)
    }

    /// Store the latest view count; the version is left alone
    pub async fn set_views(&self, id: i64, views: i64) -> Result<()> {
        sqlx::query("UPDATE events SET views = $2 WHERE id = $1")
            .bind(id)
            .bind(views)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Run a compiled search
    pub async fn search(&self, query: &EventQuery) -> Result<Vec<Event>> {
        let mut builder = search_sql(query);
        let events = builder
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await?;

        Ok(events)
    }

    /// Lock the event row for the rest of the transaction and return its version
    pub async fn lock_version(conn: &mut PgConnection, id: i64) -> Result<Option<i64>> {
        let version: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM events WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(conn)
                .await?;

        Ok(version.map(|v| v.0))
    }

    /// Compare-and-swap the confirmed counter
    pub async fn set_confirmed_requests(
        conn: &mut PgConnection,
        id: i64,
        expected_version: i64,
        confirmed_requests: i32,
    ) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET confirmed_requests = $3,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(expected_version)
        .bind(confirmed_requests)
        .fetch_optional(conn)
        .await?;

        Ok(event)
    }
}

/// Render a compiled search into SQL
pub(crate) fn search_sql(query: &EventQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM events WHERE TRUE", EVENT_COLUMNS));

    for predicate in &query.predicates {
        builder.push(" AND ");
        push_predicate(&mut builder, predicate);
    }

    builder.push(match query.sort {
        Some(SortMode::EventDate) => " ORDER BY event_date ASC, id ASC",
        Some(SortMode::Views) => " ORDER BY views ASC, id ASC",
        None => " ORDER BY id ASC",
    });
    builder.push(" LIMIT ").push_bind(query.page.size);
    builder.push(" OFFSET ").push_bind(query.page.offset());
    builder
}

fn push_predicate(builder: &mut QueryBuilder<'static, Postgres>, predicate: &EventPredicate) {
    match predicate {
        EventPredicate::Text(text) => {
            let pattern = format!("%{}%", escape_like(text));
            builder
                .push("(annotation ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        EventPredicate::Categories(ids) => {
            builder.push("category_id = ANY(").push_bind(ids.clone()).push(")");
        }
        EventPredicate::Paid(paid) => {
            builder.push("paid = ").push_bind(*paid);
        }
        EventPredicate::StartsAtOrAfter(start) => {
            builder.push("event_date >= ").push_bind(*start);
        }
        EventPredicate::StartsAtOrBefore(end) => {
            builder.push("event_date <= ").push_bind(*end);
        }
        EventPredicate::StartsAfter(moment) => {
            builder.push("event_date > ").push_bind(*moment);
        }
        EventPredicate::OnlyAvailable => {
            builder.push("(confirmed_requests <= participant_limit OR participant_limit <= 0)");
        }
        EventPredicate::States(states) => {
            let names: Vec<String> = states.iter().map(|s| s.as_str().to_string()).collect();
            builder.push("state::text = ANY(").push_bind(names).push(")");
        }
        EventPredicate::Initiators(ids) => {
            builder.push("initiator_id = ANY(").push_bind(ids.clone()).push(")");
        }
    }
}
