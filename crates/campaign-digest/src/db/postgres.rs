//! Postgres reporting table reader

use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::models::MetricRow;

use super::RowSource;

const ROWS_FOR_DATE: &str = r#"
    SELECT
        client_name,
        COALESCE(SUM(total_sent), 0)::bigint        AS sent,
        COALESCE(SUM(new_leads_reached), 0)::bigint AS leads,
        COALESCE(SUM(replies_count), 0)::bigint     AS replies,
        COALESCE(SUM(positive_reply), 0)::bigint    AS positives,
        COALESCE(SUM(bounce_count), 0)::bigint      AS bounces
    FROM public.campaign_reporting
    WHERE start_date = $1
    GROUP BY client_name
    HAVING COALESCE(SUM(total_sent), 0) > 0
    ORDER BY client_name
"#;

/// Reads per-client daily sums from `public.campaign_reporting`
pub struct PostgresRowSource {
    pool: PgPool,
}

impl PostgresRowSource {
    /// Open a single-connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await?;

        debug!("Database connection established");
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl RowSource for PostgresRowSource {
    async fn fetch_rows(&self, business_date: NaiveDate) -> Result<Vec<MetricRow>> {
        let rows = sqlx::query(ROWS_FOR_DATE)
            .bind(business_date)
            .fetch_all(&self.pool)
            .await?;

        info!(%business_date, rows = rows.len(), "Fetched campaign rows");

        rows.iter().map(metric_row).collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        debug!("Database connection closed");
    }
}

fn metric_row(row: &PgRow) -> Result<MetricRow> {
    let client_name: Option<String> = row.try_get("client_name")?;
    let client_name = client_name.unwrap_or_default();

    let count = |column: &str| -> Result<u64> {
        non_negative(&client_name, column, row.try_get(column)?)
    };

    Ok(MetricRow {
        sent: count("sent")?,
        leads: count("leads")?,
        replies: count("replies")?,
        positives: count("positives")?,
        bounces: count("bounces")?,
        client_name,
    })
}

fn non_negative(client_name: &str, column: &str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| {
        Error::validation(format!(
            "negative {column} ({value}) for client '{client_name}'"
        ))
    })
}
