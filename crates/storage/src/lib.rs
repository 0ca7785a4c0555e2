use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use packwise_core::{PackingItem, Trip, TRIP_ID_TAG};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

const TRIGGER_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub data: Map<String, Value>,
    pub trigger_at: NaiveDateTime,
}

impl ScheduledNotification {
    pub fn trip_id(&self) -> Option<&str> {
        self.data.get(TRIP_ID_TAG).and_then(Value::as_str)
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("notification rejected: {0}")]
    Rejected(String),
    #[error("notification store error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("notification payload error: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("corrupt notification record `{id}`: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Device-level delivery queue. Owned outside the reminder core; other code
/// paths may schedule into it too, so callers must not cache its contents.
pub trait NotificationGateway: Send + Sync {
    async fn request_permission(&self) -> Result<bool, GatewayError>;
    async fn get_all_scheduled(&self) -> Result<Vec<ScheduledNotification>, GatewayError>;
    async fn cancel(&self, ids: &[String]) -> Result<(), GatewayError>;
    /// Scheduling an id that already exists replaces it.
    async fn schedule(
        &self,
        id: &str,
        content: NotificationContent,
        trigger_at: NaiveDateTime,
    ) -> Result<String, GatewayError>;
}

pub trait TripProvider: Send + Sync {
    async fn load_trip(&self, trip_id: &str) -> Result<Option<Trip>>;
    async fn list_trips(&self) -> Result<Vec<Trip>>;
    async fn upsert_trip(&self, trip: &Trip) -> Result<()>;
}

#[derive(Clone)]
pub struct MemoryStore {
    trips: Arc<RwLock<HashMap<String, Trip>>>,
    notifications: Arc<RwLock<BTreeMap<String, ScheduledNotification>>>,
    permission_granted: Arc<AtomicBool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            trips: Arc::default(),
            notifications: Arc::default(),
            permission_granted: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_permission(&self, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    pub fn take_due(&self, now: NaiveDateTime) -> Vec<ScheduledNotification> {
        let mut guard = self.notifications.write();
        let due_ids = guard
            .values()
            .filter(|notification| notification.trigger_at <= now)
            .map(|notification| notification.id.clone())
            .collect::<Vec<_>>();

        let mut due = due_ids
            .iter()
            .filter_map(|id| guard.remove(id))
            .collect::<Vec<_>>();
        due.sort_by(|a, b| a.trigger_at.cmp(&b.trigger_at));
        due
    }
}

impl NotificationGateway for MemoryStore {
    async fn request_permission(&self) -> Result<bool, GatewayError> {
        Ok(self.permission_granted.load(Ordering::SeqCst))
    }

    async fn get_all_scheduled(&self) -> Result<Vec<ScheduledNotification>, GatewayError> {
        Ok(self.notifications.read().values().cloned().collect())
    }

    async fn cancel(&self, ids: &[String]) -> Result<(), GatewayError> {
        let mut guard = self.notifications.write();
        for id in ids {
            guard.remove(id);
        }
        Ok(())
    }

    async fn schedule(
        &self,
        id: &str,
        content: NotificationContent,
        trigger_at: NaiveDateTime,
    ) -> Result<String, GatewayError> {
        self.notifications.write().insert(
            id.to_string(),
            ScheduledNotification {
                id: id.to_string(),
                title: content.title,
                body: content.body,
                data: content.data,
                trigger_at,
            },
        );
        Ok(id.to_string())
    }
}

impl TripProvider for MemoryStore {
    async fn load_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
        Ok(self.trips.read().get(trip_id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>> {
        let mut trips = self.trips.read().values().cloned().collect::<Vec<_>>();
        trips.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
        Ok(trips)
    }

    async fn upsert_trip(&self, trip: &Trip) -> Result<()> {
        self.trips.write().insert(trip.id.clone(), trip.clone());
        Ok(())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url {}", database_url))?
            .create_if_missing(true);

        // Every connection to `:memory:` opens its own database.
        let in_memory = database_url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trips (
              id TEXT PRIMARY KEY,
              name TEXT NOT NULL,
              destination TEXT NOT NULL,
              start_date TEXT NOT NULL,
              end_date TEXT NOT NULL,
              packing_json TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_notifications (
              id TEXT PRIMARY KEY,
              title TEXT NOT NULL,
              body TEXT NOT NULL,
              data_json TEXT NOT NULL,
              trigger_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn take_due(&self, now: NaiveDateTime) -> Result<Vec<ScheduledNotification>> {
        let cutoff = now.format(TRIGGER_FORMAT).to_string();
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, title, body, data_json, trigger_at
            FROM scheduled_notifications
            WHERE trigger_at <= ?1
            ORDER BY trigger_at, id
            "#,
        )
        .bind(&cutoff)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM scheduled_notifications WHERE trigger_at <= ?1")
            .bind(&cutoff)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let due = rows
            .into_iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(due)
    }
}

fn notification_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ScheduledNotification, GatewayError> {
    let id: String = row.get("id");
    let data_json: String = row.get("data_json");
    let trigger_raw: String = row.get("trigger_at");

    let data = serde_json::from_str(&data_json)?;
    let trigger_at = NaiveDateTime::parse_from_str(&trigger_raw, TRIGGER_FORMAT).map_err(|err| {
        GatewayError::Corrupt {
            id: id.clone(),
            reason: err.to_string(),
        }
    })?;

    Ok(ScheduledNotification {
        id,
        title: row.get("title"),
        body: row.get("body"),
        data,
        trigger_at,
    })
}

impl NotificationGateway for SqliteStore {
    async fn request_permission(&self) -> Result<bool, GatewayError> {
        Ok(true)
    }

    async fn get_all_scheduled(&self) -> Result<Vec<ScheduledNotification>, GatewayError> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, body, data_json, trigger_at
            FROM scheduled_notifications
            ORDER BY trigger_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(notification_from_row).collect()
    }

    async fn cancel(&self, ids: &[String]) -> Result<(), GatewayError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM scheduled_notifications WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn schedule(
        &self,
        id: &str,
        content: NotificationContent,
        trigger_at: NaiveDateTime,
    ) -> Result<String, GatewayError> {
        let data_json = serde_json::to_string(&content.data)?;

        sqlx::query(
            r#"
            INSERT INTO scheduled_notifications (id, title, body, data_json, trigger_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
              title=excluded.title,
              body=excluded.body,
              data_json=excluded.data_json,
              trigger_at=excluded.trigger_at
            "#,
        )
        .bind(id)
        .bind(&content.title)
        .bind(&content.body)
        .bind(data_json)
        .bind(trigger_at.format(TRIGGER_FORMAT).to_string())
        .execute(&self.pool)
        .await?;

        Ok(id.to_string())
    }
}

impl TripProvider for SqliteStore {
    async fn load_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, destination, start_date, end_date, packing_json
            FROM trips
            WHERE id = ?1
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        trip_from_row(row).map(Some)
    }

    async fn list_trips(&self) -> Result<Vec<Trip>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, destination, start_date, end_date, packing_json
            FROM trips
            ORDER BY start_date, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(trip_from_row).collect()
    }

    async fn upsert_trip(&self, trip: &Trip) -> Result<()> {
        let packing_json = serde_json::to_string(&trip.packing_list)?;

        sqlx::query(
            r#"
            INSERT INTO trips (id, name, destination, start_date, end_date, packing_json)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
              name=excluded.name,
              destination=excluded.destination,
              start_date=excluded.start_date,
              end_date=excluded.end_date,
              packing_json=excluded.packing_json
            "#,
        )
        .bind(&trip.id)
        .bind(&trip.name)
        .bind(&trip.destination)
        .bind(trip.start_date.to_string())
        .bind(trip.end_date.to_string())
        .bind(packing_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn trip_from_row(row: sqlx::sqlite::SqliteRow) -> Result<Trip> {
    let id: String = row.get("id");
    let packing_json: String = row.get("packing_json");
    let packing_list: Vec<PackingItem> = serde_json::from_str(&packing_json)
        .with_context(|| format!("corrupt packing list for trip {}", id))?;

    let start_date = row
        .get::<String, _>("start_date")
        .parse::<NaiveDate>()
        .with_context(|| format!("corrupt start date for trip {}", id))?;
    let end_date = row
        .get::<String, _>("end_date")
        .parse::<NaiveDate>()
        .with_context(|| format!("corrupt end date for trip {}", id))?;

    Ok(Trip {
        id,
        name: row.get("name"),
        destination: row.get("destination"),
        start_date,
        end_date,
        packing_list,
    })
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    /// Removes and returns every notification whose trigger time has passed.
    pub async fn take_due(&self, now: NaiveDateTime) -> Result<Vec<ScheduledNotification>> {
        match self {
            Store::Memory(store) => Ok(store.take_due(now)),
            Store::Sqlite(store) => store.take_due(now).await,
        }
    }
}

impl NotificationGateway for Store {
    async fn request_permission(&self) -> Result<bool, GatewayError> {
        match self {
            Store::Memory(store) => store.request_permission().await,
            Store::Sqlite(store) => store.request_permission().await,
        }
    }

    async fn get_all_scheduled(&self) -> Result<Vec<ScheduledNotification>, GatewayError> {
        match self {
            Store::Memory(store) => store.get_all_scheduled().await,
            Store::Sqlite(store) => store.get_all_scheduled().await,
        }
    }

    async fn cancel(&self, ids: &[String]) -> Result<(), GatewayError> {
        match self {
            Store::Memory(store) => store.cancel(ids).await,
            Store::Sqlite(store) => store.cancel(ids).await,
        }
    }

    async fn schedule(
        &self,
        id: &str,
        content: NotificationContent,
        trigger_at: NaiveDateTime,
    ) -> Result<String, GatewayError> {
        match self {
            Store::Memory(store) => store.schedule(id, content, trigger_at).await,
            Store::Sqlite(store) => store.schedule(id, content, trigger_at).await,
        }
    }
}

impl TripProvider for Store {
    async fn load_trip(&self, trip_id: &str) -> Result<Option<Trip>> {
        match self {
            Store::Memory(store) => store.load_trip(trip_id).await,
            Store::Sqlite(store) => store.load_trip(trip_id).await,
        }
    }

    async fn list_trips(&self) -> Result<Vec<Trip>> {
        match self {
            Store::Memory(store) => store.list_trips().await,
            Store::Sqlite(store) => store.list_trips().await,
        }
    }

    async fn upsert_trip(&self, trip: &Trip) -> Result<()> {
        match self {
            Store::Memory(store) => store.upsert_trip(trip).await,
            Store::Sqlite(store) => store.upsert_trip(trip).await,
        }
    }
}
