//! Zhishan Core - engine-agnostic logic for the terrain viewer
//!
//! This crate holds everything the viewer decides without touching the GPU:
//! - Site catalog and viewer configuration
//! - Geodetic projection into the local scene frame
//! - Tile lifecycle bookkeeping and scene readiness
//! - Auto-framing, the orbit rig and eased camera flights
//! - Marker styling and ray picking
//!
//! Time-dependent APIs take the elapsed time explicitly so they can be driven
//! by the render loop or by tests alike.

pub mod catalog;
pub mod choreography;
pub mod config;
pub mod framing;
pub mod geo;
pub mod markers;
pub mod orbit;
pub mod readiness;
pub mod tiles;

pub use catalog::{CatalogError, ImageDisplay, ImagePosition, Site, SiteCatalog, SiteImage};
pub use choreography::{Choreographer, FlightCompleted, FlightDestination, Phase};
pub use config::{CameraConfig, ConfigError, TileConfig, ViewerConfig};
pub use framing::{AutoFramer, Bounds};
pub use geo::{project, GeoOrigin};
pub use orbit::{CameraPose, OrbitRig, PoseController};
pub use readiness::{ReadinessOutcome, ReadinessTracker};
pub use tiles::{SkipReason, TileId, TileLedger, TileState};
