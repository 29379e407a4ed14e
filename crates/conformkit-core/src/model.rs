//! G-code document model: lines, segments, layers and the owning document.
//!
//! The document owns the ordered line sequence; layers are derived index
//! ranges into it and are rebuilt wholesale by the post-process pipeline.
//! Line order is never reordered, only inserted into (subdivision) or
//! mutated in place (conforming).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::ops::Range;

use crate::coords::{format_coord, AxisMask, Coords};

/// Motion-bearing command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionCode {
    /// `G0` rapid move; an alias of `G1` on 3D printers.
    Rapid,
    /// `G1` controlled move, the primary deposition command.
    Controlled,
    /// `G28` homing move; redefines absolute zero for the listed axes.
    Home,
    /// `G92` set position: a zero-distance anchor, not true motion.
    SetPosition,
}

impl MotionCode {
    /// The source code token.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Rapid => "G0",
            Self::Controlled => "G1",
            Self::Home => "G28",
            Self::SetPosition => "G92",
        }
    }

    /// Whether this is the `G92` logical repositioning.
    pub fn is_set_position(&self) -> bool {
        matches!(self, Self::SetPosition)
    }
}

impl fmt::Display for MotionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Derived motion style of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionStyle {
    /// Travel move, no deposition.
    #[default]
    Fly,
    /// Depositing move.
    Extrude,
    /// Extruder pullback with no horizontal motion.
    Retract,
    /// Extruder refill after a retract.
    Restore,
}

impl fmt::Display for MotionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fly => write!(f, "fly"),
            Self::Extrude => write!(f, "extrude"),
            Self::Retract => write!(f, "retract"),
            Self::Restore => write!(f, "restore"),
        }
    }
}

/// A motion command resolved to absolute coordinates, plus the style, layer
/// and metrics the post-process pipeline derives for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// The motion command this segment came from.
    pub code: MotionCode,
    /// Absolute machine-space coordinates; the offset is already applied.
    pub coords: Coords,
    /// Axes the source command named.
    pub fields: AxisMask,
    /// Derived motion style.
    pub style: MotionStyle,
    /// Derived layer index; non-decreasing across the document.
    pub layer: usize,
    /// 3D path length from the previous coordinate state.
    pub distance: f64,
    /// Positive extruded length attributed to this motion.
    pub extrudate: f64,
    /// 1-based source line number.
    pub line_no: usize,
    /// Current text of the line; rewritten by the transform stages.
    pub text: String,
}

impl Segment {
    /// Create a segment with no derived data yet.
    pub fn new(
        code: MotionCode,
        coords: Coords,
        fields: AxisMask,
        line_no: usize,
        text: String,
    ) -> Self {
        Self {
            code,
            coords,
            fields,
            style: MotionStyle::default(),
            layer: 0,
            distance: 0.0,
            extrudate: 0.0,
            line_no,
            text,
        }
    }

    /// Whether an extrusion value rides on this segment.
    pub fn carries_e(&self) -> bool {
        self.coords.e != 0.0
    }

    /// Rebuild the line text from the current coordinates, in fixed field
    /// order X, Y, Z, E, F. E is omitted when the source command named no E.
    pub fn rebuild_text(&mut self) {
        let c = &self.coords;
        self.text = if self.fields.e {
            format!(
                "{} X{} Y{} Z{} E{} F{}",
                self.code,
                format_coord(c.x),
                format_coord(c.y),
                format_coord(c.z),
                format_coord(c.e),
                format_coord(c.f),
            )
        } else {
            format!(
                "{} X{} Y{} Z{} F{}",
                self.code,
                format_coord(c.x),
                format_coord(c.y),
                format_coord(c.z),
                format_coord(c.f),
            )
        };
    }
}

/// One parsed line of G-code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Line {
    /// A comment-only or blank line.
    Comment {
        /// 1-based source line number.
        line_no: usize,
        /// Raw line text.
        text: String,
    },
    /// A recognized or unknown command with no motion content.
    NonMotion {
        /// The code token.
        code: String,
        /// 1-based source line number.
        line_no: usize,
        /// Raw line text.
        text: String,
    },
    /// A motion-bearing command.
    Motion(Segment),
}

impl Line {
    /// Current text of the line.
    pub fn text(&self) -> &str {
        match self {
            Self::Comment { text, .. } => text,
            Self::NonMotion { text, .. } => text,
            Self::Motion(seg) => &seg.text,
        }
    }

    /// 1-based source line number.
    pub fn line_no(&self) -> usize {
        match self {
            Self::Comment { line_no, .. } => *line_no,
            Self::NonMotion { line_no, .. } => *line_no,
            Self::Motion(seg) => seg.line_no,
        }
    }

    /// The segment, if this line carries motion.
    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Self::Motion(seg) => Some(seg),
            _ => None,
        }
    }

    /// Mutable access to the segment, if this line carries motion.
    pub fn as_segment_mut(&mut self) -> Option<&mut Segment> {
        match self {
            Self::Motion(seg) => Some(seg),
            _ => None,
        }
    }
}

/// A contiguous run of document lines sharing one derived layer index,
/// nominally one Z height band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Z height when the layer opened.
    pub z: f64,
    /// Coordinate state when the layer opened.
    pub start: Coords,
    /// This layer's lines in the document sequence.
    pub lines: Range<usize>,
    /// Total 3D travel within the layer.
    pub distance: f64,
    /// Total extrudate within the layer.
    pub extrudate: f64,
}

/// Axis-aligned bounds over every coordinate a document visits.
///
/// Undefined until the first coordinate is observed, thereafter only ever
/// widened.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum X.
    pub min_x: f64,
    /// Maximum X.
    pub max_x: f64,
    /// Minimum Y.
    pub min_y: f64,
    /// Maximum Y.
    pub max_y: f64,
    /// Minimum Z.
    pub min_z: f64,
    /// Maximum Z.
    pub max_z: f64,
}

impl BoundingBox {
    /// A box containing exactly one coordinate.
    pub fn new(coords: &Coords) -> Self {
        Self {
            min_x: coords.x,
            max_x: coords.x,
            min_y: coords.y,
            max_y: coords.y,
            min_z: coords.z,
            max_z: coords.z,
        }
    }

    /// Widen the box to contain the coordinate.
    pub fn extend(&mut self, coords: &Coords) {
        self.min_x = self.min_x.min(coords.x);
        self.max_x = self.max_x.max(coords.x);
        self.min_y = self.min_y.min(coords.y);
        self.max_y = self.max_y.max(coords.y);
        self.min_z = self.min_z.min(coords.z);
        self.max_z = self.max_z.max(coords.z);
    }

    /// Whether the coordinate lies within the box (inclusive).
    pub fn contains(&self, coords: &Coords) -> bool {
        coords.x >= self.min_x
            && coords.x <= self.max_x
            && coords.y >= self.min_y
            && coords.y <= self.max_y
            && coords.z >= self.min_z
            && coords.z <= self.max_z
    }

    /// X extent.
    pub fn dx(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Y extent.
    pub fn dy(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Z extent.
    pub fn dz(&self) -> f64 {
        self.max_z - self.min_z
    }

    /// X centre.
    pub fn cx(&self) -> f64 {
        (self.max_x + self.min_x) / 2.0
    }

    /// Y centre.
    pub fn cy(&self) -> f64 {
        (self.max_y + self.min_y) / 2.0
    }

    /// Z centre.
    pub fn cz(&self) -> f64 {
        (self.max_z + self.min_z) / 2.0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X: {} {}; Y: {} {}; Z: {} {}",
            self.min_x, self.max_x, self.min_y, self.max_y, self.min_z, self.max_z
        )
    }
}

/// The ordered document model and ownership root for every parsed line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Every line, in parse order.
    pub lines: Vec<Line>,
    /// Derived layers; rebuilt wholesale by [`Document::post_process`].
    pub layers: Vec<Layer>,
    /// Total 3D travel across the document.
    pub distance: f64,
    /// Total extrudate across the document.
    pub extrudate: f64,
    /// Bounds over every visited coordinate; `None` until one is seen.
    pub bbox: Option<BoundingBox>,
    /// Whether the source left the extrusion axis in relative mode (`M83`).
    pub relative_extrusion: bool,
}

impl Document {
    /// An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// All motion segments in document order.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.lines.iter().filter_map(Line::as_segment)
    }

    /// All motion segments in document order, mutably.
    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut Segment> {
        self.lines.iter_mut().filter_map(Line::as_segment_mut)
    }

    /// The lines belonging to a layer.
    pub fn layer_lines(&self, layer: &Layer) -> &[Line] {
        &self.lines[layer.lines.clone()]
    }

    /// Serialize the document back to G-code text, one line per [`Line`],
    /// in document order.
    pub fn to_gcode(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.text());
            out.push('\n');
        }
        out
    }

    /// Write the document as G-code text.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for line in &self.lines {
            writer.write_all(line.text().as_bytes())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} lines, {} layers, distance {:.4} mm, extrudate {:.4} mm",
            self.lines.len(),
            self.layers.len(),
            self.distance,
            self.extrudate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f64, y: f64, z: f64) -> Coords {
        Coords {
            x,
            y,
            z,
            ..Coords::default()
        }
    }

    #[test]
    fn test_bbox_extend_widens_only() {
        let mut bbox = BoundingBox::new(&point(1.0, 2.0, 3.0));
        bbox.extend(&point(-1.0, 5.0, 3.0));
        bbox.extend(&point(0.0, 3.0, 3.0));
        assert_eq!(bbox.min_x, -1.0);
        assert_eq!(bbox.max_x, 1.0);
        assert_eq!(bbox.max_y, 5.0);
        assert_eq!(bbox.dz(), 0.0);
        assert_eq!(bbox.cy(), 3.5);
        assert!(bbox.contains(&point(0.0, 4.0, 3.0)));
        assert!(!bbox.contains(&point(2.0, 4.0, 3.0)));
    }

    #[test]
    fn test_rebuild_text_field_order() {
        let coords = Coords {
            x: 1.0,
            y: 2.5,
            z: 0.2,
            f: 1500.0,
            e: 0.75,
        };
        let fields = AxisMask {
            x: true,
            y: true,
            z: true,
            e: true,
            f: true,
        };
        let mut seg = Segment::new(MotionCode::Controlled, coords, fields, 1, String::new());
        seg.rebuild_text();
        assert_eq!(seg.text, "G1 X1 Y2.5 Z0.2 E0.75 F1500");

        seg.fields.e = false;
        seg.rebuild_text();
        assert_eq!(seg.text, "G1 X1 Y2.5 Z0.2 F1500");
    }

    #[test]
    fn test_motion_code_tokens() {
        assert_eq!(MotionCode::Rapid.token(), "G0");
        assert_eq!(MotionCode::Controlled.to_string(), "G1");
        assert!(MotionCode::SetPosition.is_set_position());
        assert!(!MotionCode::Home.is_set_position());
    }

    #[test]
    fn test_style_display() {
        assert_eq!(MotionStyle::Fly.to_string(), "fly");
        assert_eq!(MotionStyle::Restore.to_string(), "restore");
        assert_eq!(MotionStyle::default(), MotionStyle::Fly);
    }
}
