//! SQLite-backed event repository

use async_trait::async_trait;
use herbtrace_common::db::retry_on_lock;
use herbtrace_common::text::fold_case;
use herbtrace_common::time::{from_epoch_millis, to_epoch_millis};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::domain::{
    AiVerification, CollectionEvent, EventFilter, EventRepository, GeoVerification, GroupKey,
    GroupStats, LedgerError, LedgerResult, Location,
};

const SELECT_EVENT_COLUMNS: &str = r#"
    SELECT batch_id, farmer_name, herb_name, quantity, latitude, longitude, image_url,
           timestamp_ms, ai_confidence, ai_verified_herb,
           geo_country, geo_state, geo_within_india
    FROM collection_events
"#;

/// Persistent repository over the `collection_events` table
#[derive(Clone)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    batch_id: String,
    farmer_name: String,
    herb_name: String,
    quantity: f64,
    latitude: f64,
    longitude: f64,
    image_url: String,
    timestamp_ms: i64,
    ai_confidence: i64,
    ai_verified_herb: String,
    geo_country: String,
    geo_state: String,
    geo_within_india: bool,
}

impl TryFrom<EventRow> for CollectionEvent {
    type Error = LedgerError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let timestamp = from_epoch_millis(row.timestamp_ms).ok_or_else(|| {
            corrupt_row(&row.batch_id, format!("timestamp {}", row.timestamp_ms))
        })?;
        let confidence = u8::try_from(row.ai_confidence).map_err(|_| {
            corrupt_row(&row.batch_id, format!("confidence {}", row.ai_confidence))
        })?;

        Ok(CollectionEvent {
            batch_id: row.batch_id,
            farmer_name: row.farmer_name,
            herb_name: row.herb_name,
            quantity: row.quantity,
            location: Location {
                latitude: row.latitude,
                longitude: row.longitude,
            },
            image_url: row.image_url,
            timestamp,
            ai_verification: AiVerification {
                confidence,
                verified_herb: row.ai_verified_herb,
            },
            geo_verification: GeoVerification {
                country: row.geo_country,
                state: row.geo_state,
                is_within_india: row.geo_within_india,
            },
        })
    }
}

fn corrupt_row(batch_id: &str, detail: String) -> LedgerError {
    LedgerError::Persistence(herbtrace_common::Error::Internal(format!(
        "Stored event {} has invalid {}",
        batch_id, detail
    )))
}

#[derive(Debug, sqlx::FromRow)]
struct GroupRow {
    group_key: String,
    event_count: i64,
    total_quantity: f64,
    avg_confidence: f64,
}

/// Append `WHERE` clauses for every set filter option
fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a EventFilter) {
    builder.push(" WHERE 1 = 1");

    // Matched against the folded copies; SQLite's lower() is ASCII-only
    let text_filters = [
        ("farmer_name_folded", filter.farmer_name.as_deref()),
        ("herb_name_folded", filter.herb_name.as_deref()),
        ("geo_state_folded", filter.state.as_deref()),
    ];
    for (column, needle) in text_filters {
        if let Some(needle) = needle {
            builder
                .push(format!(" AND instr({}, ", column))
                .push_bind(fold_case(needle))
                .push(") > 0");
        }
    }

    if let Some(within) = filter.within_india {
        builder.push(" AND geo_within_india = ").push_bind(within);
    }
}

fn group_column(key: GroupKey) -> &'static str {
    match key {
        GroupKey::HerbName => "herb_name",
        GroupKey::State => "geo_state",
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn insert(&self, event: &CollectionEvent) -> LedgerResult<()> {
        let pool = &self.pool;

        let result = retry_on_lock("insert collection event", self.max_lock_wait_ms, || async move {
            sqlx::query(
                r#"
                INSERT INTO collection_events (
                    batch_id, farmer_name, herb_name, quantity, latitude, longitude,
                    image_url, timestamp_ms, ai_confidence, ai_verified_herb,
                    geo_country, geo_state, geo_within_india,
                    farmer_name_folded, herb_name_folded, geo_state_folded
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&event.batch_id)
            .bind(&event.farmer_name)
            .bind(&event.herb_name)
            .bind(event.quantity)
            .bind(event.location.latitude)
            .bind(event.location.longitude)
            .bind(&event.image_url)
            .bind(to_epoch_millis(&event.timestamp))
            .bind(i64::from(event.ai_verification.confidence))
            .bind(&event.ai_verification.verified_herb)
            .bind(&event.geo_verification.country)
            .bind(&event.geo_verification.state)
            .bind(event.geo_verification.is_within_india)
            .bind(fold_case(&event.farmer_name))
            .bind(fold_case(&event.herb_name))
            .bind(fold_case(&event.geo_verification.state))
            .execute(pool)
            .await?;
            Ok(())
        })
        .await;

        match result {
            Ok(()) => {
                debug!(batch_id = %event.batch_id, "Inserted collection event");
                Ok(())
            }
            Err(e) if e.is_unique_violation() => {
                Err(LedgerError::DuplicateBatchId(event.batch_id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_batch_id(&self, batch_id: &str) -> LedgerResult<Option<CollectionEvent>> {
        let query = format!("{} WHERE batch_id = ?", SELECT_EVENT_COLUMNS);

        let row = sqlx::query_as::<_, EventRow>(&query)
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(herbtrace_common::Error::from)?;

        row.map(CollectionEvent::try_from).transpose()
    }

    async fn count(&self, filter: &EventFilter) -> LedgerResult<u64> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM collection_events");
        push_filter(&mut builder, filter);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(herbtrace_common::Error::from)?;

        Ok(count.max(0) as u64)
    }

    async fn find(
        &self,
        filter: &EventFilter,
        skip: u64,
        limit: u64,
    ) -> LedgerResult<Vec<CollectionEvent>> {
        let mut builder = QueryBuilder::new(SELECT_EVENT_COLUMNS);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY timestamp_ms DESC, batch_id DESC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(skip).unwrap_or(i64::MAX));

        let rows: Vec<EventRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(herbtrace_common::Error::from)?;

        rows.into_iter().map(CollectionEvent::try_from).collect()
    }

    async fn group_stats(
        &self,
        key: GroupKey,
        filter: &EventFilter,
    ) -> LedgerResult<Vec<GroupStats>> {
        let column = group_column(key);

        let mut builder = QueryBuilder::new(format!(
            "SELECT {col} AS group_key, COUNT(*) AS event_count, \
             CAST(SUM(quantity) AS REAL) AS total_quantity, \
             CAST(AVG(ai_confidence) AS REAL) AS avg_confidence \
             FROM collection_events",
            col = column
        ));
        push_filter(&mut builder, filter);
        builder.push(format!(" GROUP BY {} ORDER BY event_count DESC, group_key ASC", column));

        let rows: Vec<GroupRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(herbtrace_common::Error::from)?;

        Ok(rows
            .into_iter()
            .map(|r| GroupStats {
                key: r.group_key,
                count: r.event_count.max(0) as u64,
                total_quantity: r.total_quantity,
                avg_confidence: r.avg_confidence,
            })
            .collect())
    }
}
