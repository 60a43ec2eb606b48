//! TerraTile - Incremental map tile rendering for block worlds
//!
//! This library keeps a multi-zoom tile pyramid in sync with a sparsely
//! modified, effectively infinite block world. Rather than re-rendering
//! everything, it tracks dirty regions, renders them nearest-to-origin
//! first, and folds the results up through the zoom levels.
//!
//! # High-Level API
//!
//! The [`processor`] module drives continuous background rendering:
//!
//! ```ignore
//! use terratile::config::RenderConfig;
//! use terratile::processor::RegionProcessor;
//!
//! let config = RenderConfig::new("tiles", "state");
//! let processor = RegionProcessor::new(config, world, renderers)?;
//! processor.dirty().mark_column(edited_column);
//! processor.run().await;
//! ```
//!
//! One-shot operations (full render, radius render) live in [`job`];
//! the pluggable per-column renderers in [`render`].

pub mod color;
pub mod config;
pub mod coord;
pub mod job;
pub mod logging;
pub mod processor;
pub mod render;
pub mod scan;
pub mod spiral;
pub mod state;
pub mod tile;
pub mod world;

/// Library version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
