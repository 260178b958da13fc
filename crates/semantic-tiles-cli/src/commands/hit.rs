//! Hit command implementation.

use anyhow::Result;
use semantic_tiles_ops::{Config, HitRequest};

use super::{open_context, recompute_request};
use crate::{LevelArgs, OutputFormat};

/// Resolve a canvas point on a freshly computed level.
pub async fn execute(
    config: Config,
    level: &LevelArgs,
    x: f64,
    y: f64,
    format: OutputFormat,
) -> Result<()> {
    let ctx = open_context(config);
    let request = recompute_request(level).without_persist();
    let parent = request.parent.clone();
    ctx.recompute(request).await?;

    let response = ctx.hit_test(HitRequest::new(parent, x, y)).await?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Text => match &response.domain {
            Some(id) => println!("{}", id),
            None => println!("(none)"),
        },
    }
    Ok(())
}

