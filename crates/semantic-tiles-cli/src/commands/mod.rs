//! Command implementations.

pub mod config;
pub mod hit;
pub mod render;
pub mod serve;

use std::sync::Arc;

use semantic_tiles_core::DomainId;
use semantic_tiles_ops::{Config, JsonStore, RecomputeRequest, TilesContext};

use crate::LevelArgs;

/// Context over the JSON store at `config.store_root`.
fn open_context(config: Config) -> TilesContext {
    let store = Arc::new(JsonStore::new(&config.store_root));
    TilesContext::new(config, store)
}

fn parent_of(level: &LevelArgs) -> Option<DomainId> {
    level
        .parent
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(DomainId::from)
}

fn recompute_request(level: &LevelArgs) -> RecomputeRequest {
    RecomputeRequest {
        parent: parent_of(level),
        width: level.width,
        height: level.height,
        ..RecomputeRequest::root()
    }
}
