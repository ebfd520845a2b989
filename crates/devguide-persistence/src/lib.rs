use anyhow::Result;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use devguide_types::{FeedbackFilter, FeedbackRecord, RecordCall, UserFeedback};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

const SELECT_CALLS: &str = r#"
    SELECT id, timestamp, operation, arguments, response_size, tokens,
           elapsed_ms, success, error, metadata
    FROM feedback_calls
    WHERE 1 = 1
"#;

/// Append-only feedback log stored in SQLite.
///
/// Every record is a single `INSERT`; rows are never updated or deleted.
/// Write failures are logged and swallowed so telemetry can never fail a
/// served call.
#[derive(Clone)]
pub struct FeedbackCollector {
    pool: SqlitePool,
}

/// Aggregated usage over a time window
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSummary {
    pub period_days: i64,
    pub total_calls: u64,
    pub successful_calls: u64,
    pub success_rate: f64,
    pub total_tokens: u64,
    pub avg_tokens_per_call: f64,
    pub tool_usage: BTreeMap<String, u64>,
    pub avg_elapsed_ms: BTreeMap<String, f64>,
}

impl FeedbackCollector {
    /// Open (creating if needed) the feedback database
    pub async fn new(database_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", database_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let collector = Self { pool };
        collector.run_migrations().await?;

        info!("Feedback collector initialized with database: {}", database_path);
        Ok(collector)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feedback_calls (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                operation TEXT NOT NULL,
                arguments TEXT NOT NULL,
                response_size INTEGER NOT NULL,
                tokens INTEGER NOT NULL,
                elapsed_ms REAL NOT NULL,
                success INTEGER NOT NULL,
                error TEXT,
                metadata TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                tool_name TEXT NOT NULL,
                rating INTEGER NOT NULL,
                comment TEXT,
                helpful INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_feedback_calls_operation ON feedback_calls(operation);
            CREATE INDEX IF NOT EXISTS idx_feedback_calls_timestamp ON feedback_calls(timestamp);
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Feedback migrations completed");
        Ok(())
    }

    /// Append one call record. Never fails.
    pub async fn record(&self, call: RecordCall) {
        let record = call.into_record();
        if let Err(e) = self.insert(&record).await {
            warn!(
                "Dropping feedback record for '{}': {}",
                record.operation, e
            );
        }
    }

    async fn insert(&self, record: &FeedbackRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO feedback_calls
                (id, timestamp, operation, arguments, response_size, tokens,
                 elapsed_ms, success, error, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(format_timestamp(&record.timestamp))
        .bind(&record.operation)
        .bind(record.arguments.to_string())
        .bind(record.response_size as i64)
        .bind(record.tokens as i64)
        .bind(record.elapsed_ms)
        .bind(record.success)
        .bind(&record.error)
        .bind(record.metadata.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a rating for a tool response. Ratings are clamped to 1..=5.
    pub async fn record_user_feedback(
        &self,
        tool_name: &str,
        rating: u8,
        comment: Option<&str>,
        helpful: Option<bool>,
    ) {
        let rating = rating.clamp(1, 5);
        let result = sqlx::query(
            r#"
            INSERT INTO user_feedback (timestamp, tool_name, rating, comment, helpful)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(format_timestamp(&Utc::now()))
        .bind(tool_name)
        .bind(i64::from(rating))
        .bind(comment)
        .bind(helpful)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            warn!("Dropping user feedback for '{}': {}", tool_name, e);
        }
    }

    /// Read call records matching all set filters, oldest first
    pub async fn query(&self, filter: &FeedbackFilter) -> Result<Vec<FeedbackRecord>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_CALLS);

        if let Some(operation) = &filter.operation {
            builder.push(" AND operation = ").push_bind(operation.clone());
        }
        if let Some(success) = filter.success {
            builder.push(" AND success = ").push_bind(success);
        }
        if let Some(since) = &filter.since {
            builder
                .push(" AND timestamp >= ")
                .push_bind(format_timestamp(since));
        }
        builder.push(" ORDER BY timestamp, rowid");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(i64::from(limit));
        }

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Read user ratings, optionally for one tool
    pub async fn user_feedback(&self, tool_name: Option<&str>) -> Result<Vec<UserFeedback>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT timestamp, tool_name, rating, comment, helpful FROM user_feedback WHERE 1 = 1",
        );
        if let Some(tool) = tool_name {
            builder.push(" AND tool_name = ").push_bind(tool.to_string());
        }
        builder.push(" ORDER BY id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                Ok(UserFeedback {
                    timestamp: parse_timestamp(&row.try_get::<String, _>("timestamp")?)?,
                    tool_name: row.try_get("tool_name")?,
                    rating: u8::try_from(row.try_get::<i64, _>("rating")?)?,
                    comment: row.try_get("comment")?,
                    helpful: row.try_get("helpful")?,
                })
            })
            .collect()
    }

    /// Usage summary over the last `days` days.
    ///
    /// Windows reaching past the epoch cover the whole log.
    pub async fn summary(&self, days: i64) -> Result<FeedbackSummary> {
        let cutoff = window_start(Utc::now(), days);
        let rows = sqlx::query(
            r#"
            SELECT operation,
                   COUNT(*) AS calls,
                   SUM(success) AS successes,
                   SUM(tokens) AS tokens,
                   AVG(elapsed_ms) AS avg_elapsed
            FROM feedback_calls
            WHERE timestamp >= ?
            GROUP BY operation
            "#,
        )
        .bind(format_timestamp(&cutoff))
        .fetch_all(&self.pool)
        .await?;

        let mut summary = FeedbackSummary {
            period_days: days,
            total_calls: 0,
            successful_calls: 0,
            success_rate: 0.0,
            total_tokens: 0,
            avg_tokens_per_call: 0.0,
            tool_usage: BTreeMap::new(),
            avg_elapsed_ms: BTreeMap::new(),
        };

        for row in &rows {
            let operation: String = row.try_get("operation")?;
            let calls = row.try_get::<i64, _>("calls")? as u64;
            summary.total_calls += calls;
            summary.successful_calls += row.try_get::<i64, _>("successes")? as u64;
            summary.total_tokens += row.try_get::<i64, _>("tokens")? as u64;
            summary
                .avg_elapsed_ms
                .insert(operation.clone(), row.try_get("avg_elapsed")?);
            summary.tool_usage.insert(operation, calls);
        }

        if summary.total_calls > 0 {
            summary.success_rate = summary.successful_calls as f64 / summary.total_calls as f64;
            summary.avg_tokens_per_call = summary.total_tokens as f64 / summary.total_calls as f64;
        }

        Ok(summary)
    }

    /// Close the pool, flushing pending writes
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Feedback collector closed");
    }
}

/// Start of a `days`-long window ending at `now`, never earlier than the epoch
fn window_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|window| now.checked_sub_signed(window))
        .map_or(DateTime::UNIX_EPOCH, |start| start.max(DateTime::UNIX_EPOCH))
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn record_from_row(row: &SqliteRow) -> Result<FeedbackRecord> {
    let arguments: String = row.try_get("arguments")?;
    let metadata: String = row.try_get("metadata")?;

    Ok(FeedbackRecord {
        id: row.try_get("id")?,
        timestamp: parse_timestamp(&row.try_get::<String, _>("timestamp")?)?,
        operation: row.try_get("operation")?,
        arguments: serde_json::from_str::<Value>(&arguments)?,
        response_size: row.try_get::<i64, _>("response_size")? as usize,
        tokens: row.try_get::<i64, _>("tokens")? as usize,
        elapsed_ms: row.try_get("elapsed_ms")?,
        success: row.try_get("success")?,
        error: row.try_get("error")?,
        metadata: serde_json::from_str::<Value>(&metadata)?,
    })
}
