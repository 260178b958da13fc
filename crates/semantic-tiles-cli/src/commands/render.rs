//! Render command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use semantic_tiles_ops::{Config, Notice, RecomputeResponse};
use tracing::info;

use super::{open_context, recompute_request};
use crate::{LevelArgs, OutputFormat};

/// Lay out one level and print or write its tiles.
pub async fn execute(
    config: Config,
    level: &LevelArgs,
    format: OutputFormat,
    output: Option<&Path>,
    persist: bool,
) -> Result<()> {
    let ctx = open_context(config);
    let mut notices = ctx.subscribe();
    let mut request = recompute_request(level);
    request.persist = persist;

    let response = ctx.recompute(request).await?;
    // Positions must reach the catalog before the process exits.
    ctx.flush().await;
    while let Ok(Notice::PersistenceFailed { message, .. }) = notices.try_recv() {
        eprintln!("warning: positions were not saved: {}", message);
    }

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&response)?,
        OutputFormat::Text => format_text(&response),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Wrote frame");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn format_text(response: &RecomputeResponse) -> String {
    let level = response
        .parent
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "(top level)".to_string());
    let mut out = format!(
        "Level {}: {} tiles, strategy {}, {} iterations{}\n",
        level,
        response.tile_count(),
        response.strategy.label(),
        response.iterations,
        if response.converged { "" } else { " (not converged)" },
    );
    if response.dropped_links > 0 {
        out.push_str(&format!("Ignored {} distance entries\n", response.dropped_links));
    }
    for tile in &response.frame.tiles {
        out.push_str(&format!(
            "  {:<16} {:<24} ({:>7.1}, {:>7.1})  area {:>10.1}  docs {}\n",
            tile.id.as_str(),
            tile.name,
            tile.label.x,
            tile.label.y,
            tile.polygon.area(),
            tile.documents.len(),
        ));
    }
    out.trim_end().to_string()
}
