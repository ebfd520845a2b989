//! Prints a JSON usage summary of the feedback log.
//!
//! Usage: devguide-feedback-report [days]

use anyhow::{Context, Result};
use devguide_logging::init_logging;
use devguide_persistence::FeedbackCollector;
use devguide_server::Config;
use serde_json::json;

const DEFAULT_DAYS: i64 = 7;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config.logging.level, config.logging.json)?;

    let days = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<i64>()
            .with_context(|| format!("Invalid number of days: {arg}"))?,
        None => DEFAULT_DAYS,
    };

    let feedback = FeedbackCollector::new(&config.feedback.database).await?;
    let summary = feedback.summary(days).await?;
    let ratings = feedback.user_feedback(None).await?;
    feedback.close().await;

    let average_rating = if ratings.is_empty() {
        None
    } else {
        Some(ratings.iter().map(|r| f64::from(r.rating)).sum::<f64>() / ratings.len() as f64)
    };

    let report = json!({
        "summary": summary,
        "ratings": {
            "count": ratings.len(),
            "average": average_rating,
            "helpful": ratings.iter().filter(|r| r.helpful == Some(true)).count(),
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
