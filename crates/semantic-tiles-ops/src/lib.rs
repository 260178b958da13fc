//! Semantic Tiles Operations Layer
//!
//! This crate wires the layout engine and the tessellation builder to a
//! domain store. It is consumed by both the CLI and the REST API, so both
//! surfaces share one recompute pipeline.
//!
//! ## Architecture
//!
//! - **Requests**: typed input DTOs ([`RecomputeRequest`], [`HitRequest`])
//! - **Responses**: typed output DTOs with the render frame and run stats
//! - **TilesContext**: executes operations, keeps the last applied frame per
//!   level and queues position writes
//! - **DomainStore**: where sibling sets come from ([`JsonStore`], [`MemoryStore`])
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use semantic_tiles_ops::{Config, JsonStore, RecomputeRequest, TilesContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), semantic_tiles_ops::OpsError> {
//!     let config = Config::load()?;
//!     let store = Arc::new(JsonStore::new(&config.store_root));
//!     let ctx = TilesContext::new(config, store);
//!
//!     let response = ctx.recompute(RecomputeRequest::root()).await?;
//!     println!("{} tiles via {}", response.tile_count(), response.strategy.label());
//!
//!     ctx.flush().await;
//!     Ok(())
//! }
//! ```

mod config;
mod context;
mod error;
mod persistence;
mod requests;
mod responses;
mod store;

// Re-export public API
pub use config::Config;
pub use context::{compute_frame, ComputedFrame, TilesContext};
pub use error::{OpsError, OpsResult};
pub use persistence::{Notice, PersistJob};
pub use requests::*;
pub use responses::*;
pub use store::{Catalog, DomainStore, JsonStore, MemoryStore, SiblingSet, TILES_DIR};
