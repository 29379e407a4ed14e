//! # ConformKit Conform
//!
//! Toolpath rewriting stages for a parsed G-code [`Document`]:
//!
//! - **Subdivision**: rewrites over-long segments into bounded-length
//!   interpolated chains, so that downstream per-point transforms have
//!   enough resolution to work with.
//! - **Surface conforming**: re-projects the toolpath onto an externally
//!   supplied surface height field, rebalancing extrusion so deposition
//!   stays proportional to true 3D path length.
//!
//! Both stages take exclusive access to the document for one full pass and
//! mutate it in place; they compose freely with each other and with the
//! parser.
//!
//! [`Document`]: conformkit_core::Document

pub mod conform;
pub mod error;
pub mod splitter;
pub mod surface;

pub use conform::conform;
pub use error::{ConformError, Result};
pub use splitter::{subdivide, STOP_MARKER};
pub use surface::{SurfaceCloud, SurfacePoint};
