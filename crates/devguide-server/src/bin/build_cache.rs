//! Rebuilds the on-disk cache bundle and writes a token report next to it.
//!
//! Run from a scheduler or after editing the documents; the server only
//! reads what this job writes.

use anyhow::{bail, Result};
use devguide_cache::CacheManager;
use devguide_docs::{DocumentLibrary, DocumentLoader, TokenOptimizer};
use devguide_logging::init_logging;
use devguide_server::Config;
use std::sync::Arc;
use tracing::info;

const TOKEN_REPORT_FILE: &str = "token_report.json";

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config.logging.level, config.logging.json)?;

    let Some(dir) = config.cache_dir() else {
        bail!("cache.dir is empty, nothing to build");
    };

    let loader = DocumentLoader::new(config.document_sources());
    let library = Arc::new(DocumentLibrary::load_all(&loader).await?);
    let cache =
        CacheManager::new(library.clone(), config.server.version.clone()).with_dir(dir.clone());

    let info = cache.rebuild_all().await?;
    for (name, sizes) in &info.sizes {
        let plain = sizes.get("plain").copied().unwrap_or_default();
        let best = sizes.values().min().copied().unwrap_or_default();
        let saved = if plain > 0 {
            (1.0 - best as f64 / plain as f64) * 100.0
        } else {
            0.0
        };
        info!(
            "{}: {} bytes plain, {} bytes best ({:.1}% smaller)",
            name, plain, best, saved
        );
    }

    let report = TokenOptimizer::new(config.max_response_tokens())
        .report(library.documents().map(|document| document.as_ref()));
    let report_path = dir.join(TOKEN_REPORT_FILE);
    tokio::fs::write(&report_path, serde_json::to_vec_pretty(&report)?).await?;
    info!(
        "Token report written to {} ({} estimated tokens total)",
        report_path.display(),
        report.total_estimated_tokens
    );

    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
