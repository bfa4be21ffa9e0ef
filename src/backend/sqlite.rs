use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
    SqlitePool,
};

use crate::backend::{iso_timestamp, normalize_timestamp, AlertSource};
use crate::error::{AppError, Result};
use crate::types::{MarketAlert, MarketSnapshot, Urgency};

/// Local alert store. Same table shape as the hosted `market_alerts`
/// collection, with `market_data` kept as JSON text.
#[derive(Clone)]
pub struct SqliteAlertStore {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: String,
    market_id: String,
    alert_type: String,
    urgency: String,
    headline: String,
    price_change: f64,
    old_price: f64,
    new_price: f64,
    reasoning: Option<String>,
    market_data: Json<MarketSnapshot>,
    created_at: String,
}

impl AlertRow {
    fn into_alert(self) -> Result<MarketAlert> {
        let urgency = Urgency::from_str(&self.urgency).map_err(AppError::InvalidData)?;
        Ok(MarketAlert {
            id: self.id,
            market_id: self.market_id,
            alert_type: self.alert_type,
            urgency,
            headline: self.headline,
            price_change: self.price_change,
            old_price: self.old_price,
            new_price: self.new_price,
            reasoning: self.reasoning,
            market_data: self.market_data.0,
            created_at: self.created_at,
        })
    }
}

impl SqliteAlertStore {
    /// Open (creating if missing) the database file and apply migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Store an alert. `created_at` is rewritten to fixed-width UTC so text
    /// comparison in `recent_alerts` stays chronological.
    pub async fn insert_alert(&self, alert: &MarketAlert) -> Result<()> {
        let created_at = normalize_timestamp(&alert.created_at)?;
        let urgency = alert.urgency.to_string();

        sqlx::query(
            r#"
            INSERT INTO market_alerts (
                id, market_id, alert_type, urgency, headline,
                price_change, old_price, new_price, reasoning, market_data, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.id)
        .bind(&alert.market_id)
        .bind(&alert.alert_type)
        .bind(urgency)
        .bind(&alert.headline)
        .bind(alert.price_change)
        .bind(alert.old_price)
        .bind(alert.new_price)
        .bind(&alert.reasoning)
        .bind(Json(&alert.market_data))
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl AlertSource for SqliteAlertStore {
    async fn recent_alerts(&self, since: DateTime<Utc>, limit: usize) -> Result<Vec<MarketAlert>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, market_id, alert_type, urgency, headline,
                   price_change, old_price, new_price, reasoning, market_data, created_at
            FROM market_alerts
            WHERE created_at >= ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(iso_timestamp(since))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AlertRow::into_alert).collect()
    }

    fn source_name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn memory_store() -> SqliteAlertStore {
        // One connection: every connection to :memory: is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteAlertStore::from_pool(pool).await.unwrap()
    }

    fn alert(id: &str, created_at: DateTime<Utc>) -> MarketAlert {
        MarketAlert {
            id: id.to_string(),
            market_id: "m-1".to_string(),
            alert_type: "price_spike".to_string(),
            urgency: Urgency::Medium,
            headline: format!("headline {id}"),
            price_change: 0.08,
            old_price: 0.40,
            new_price: 0.48,
            reasoning: Some("whale buy".to_string()),
            market_data: MarketSnapshot {
                question: "Will it happen?".to_string(),
                slug: "will-it-happen".to_string(),
                yes_price: 0.48,
            },
            created_at: iso_timestamp(created_at),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn returns_newest_first_within_window_and_limit() {
        let store = memory_store().await;
        for i in 0..15 {
            store
                .insert_alert(&alert(&format!("a{i:02}"), now() - Duration::minutes(i * 4)))
                .await
                .unwrap();
        }
        store
            .insert_alert(&alert("stale", now() - Duration::hours(3)))
            .await
            .unwrap();

        let since = now() - Duration::hours(2);
        let got = store.recent_alerts(since, 10).await.unwrap();

        let ids: Vec<&str> = got.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["a00", "a01", "a02", "a03", "a04", "a05", "a06", "a07", "a08", "a09"]
        );
        assert_eq!(got[0].market_data.slug, "will-it-happen");
        assert_eq!(got[0].reasoning.as_deref(), Some("whale buy"));
    }

    #[tokio::test]
    async fn lower_bound_is_inclusive() {
        let store = memory_store().await;
        let since = now() - Duration::hours(2);
        store.insert_alert(&alert("edge", since)).await.unwrap();
        store
            .insert_alert(&alert("just-before", since - Duration::milliseconds(1)))
            .await
            .unwrap();

        let got = store.recent_alerts(since, 10).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].id, "edge");
    }

    #[tokio::test]
    async fn offset_timestamps_are_stored_in_utc() {
        let store = memory_store().await;
        let mut a = alert("tz", now());
        a.created_at = "2026-10-18T13:30:00+02:00".to_string();
        store.insert_alert(&a).await.unwrap();

        let got = store.recent_alerts(now() - Duration::hours(2), 10).await.unwrap();
        assert_eq!(got[0].created_at, "2026-10-18T11:30:00.000Z");
    }

    #[tokio::test]
    async fn empty_table_yields_no_rows() {
        let store = memory_store().await;
        assert!(store.recent_alerts(now(), 10).await.unwrap().is_empty());
    }
}
