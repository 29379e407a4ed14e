//! # ConformKit Core
//!
//! Document model and parser for a millimeter-space 3D-printer G-code
//! dialect. Provides the ordered, stateful document the rewriting stages
//! operate on:
//!
//! - Line-oriented parser with a motion state machine resolving every move
//!   to absolute coordinates
//! - Segment classification (fly/extrude/retract/restore) and layer detection
//! - Per-layer and document-wide travel, extrudate and bounding-box metrics
//! - Serialization back to G-code text
//!
//! Inch-based input (`G20`) is unsupported and fatal; everything else is
//! parsed permissively, with problems reported through an ordered diagnostic
//! stream rather than aborting.

pub mod command;
pub mod coords;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod parser;
mod process;

pub use command::Command;
pub use coords::{format_coord, Axis, AxisMask, Coords};
pub use diagnostics::{Diagnostic, Severity};
pub use error::{ParseError, Result};
pub use model::{BoundingBox, Document, Layer, Line, MotionCode, MotionStyle, Segment};
pub use parser::{GcodeParser, ParseOutput};
