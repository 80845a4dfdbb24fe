//! Live Map
//!
//! Keeps a 2D map layer and a player side panel in sync with periodically
//! polled entity snapshots (players, NPCs, service garages).
//!
//! ## Architecture
//!
//! ```text
//! PollScheduler  (scheduler.rs)   ← one timer per category group
//!   ├── SnapshotSource  (feed.rs) ← HTTP fetch + decode (protocol.rs)
//!   └── LiveMapService  (service.rs)
//!         ├── Reconciler × 3  (engine.rs) ← diff snapshot vs. Rendered Set
//!         │     ├── CoordinateMapper  (coords.rs)
//!         │     └── pin styles        (style.rs)
//!         ├── MapLayer / SceneLayer   (layer.rs)
//!         └── PlayerPanel             (view.rs)
//! ```
//!
//! Everything below the scheduler is synchronous and runtime-free; the
//! `server` feature adds the HTTP feed, the tokio timers and the binary.

// Core modules are always available (no server feature needed).
pub mod coords;
pub mod engine;
pub mod identity;
pub mod layer;
pub mod protocol;
pub mod service;
pub mod style;
pub mod types;
pub mod view;

// Polling requires the `server` feature.
#[cfg(feature = "server")]
pub mod feed;
#[cfg(feature = "server")]
pub mod scheduler;

// Convenience re-exports
pub use coords::{CoordinateConvention, CoordinateMapper};
pub use engine::{CategoryProfile, PassReport, Reconciler, RenderedSet};
pub use layer::{MapLayer, SceneLayer};
pub use protocol::{Snapshot, SnapshotError};
pub use service::{LiveMapService, PollOutcome};
pub use types::{
    Category, CategoryGroup, Entity, LiveMapConfig, LiveMapStats, MapPoint, WorldBounds,
    WorldPoint,
};
pub use view::{PanelRow, Summary};

#[cfg(feature = "server")]
pub use feed::{FeedError, HttpSnapshotSource, SnapshotSource};
#[cfg(feature = "server")]
pub use scheduler::PollScheduler;
