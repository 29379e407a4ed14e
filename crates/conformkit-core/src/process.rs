//! Post-process pipeline: segment classification, layer splitting, metrics.
//!
//! All three stages are single forward passes over the document in exact
//! line order; classification and the layer cursor both read the previous
//! segment's coordinate state, so order is load-bearing.

use tracing::debug;

use crate::coords::Coords;
use crate::model::{BoundingBox, Document, Layer, MotionStyle};

impl Document {
    /// Run the full post-process pipeline: classify segments, rebuild the
    /// layer sequence wholesale, recompute metrics. Called once after
    /// parsing; safe to call again whenever the derived views must be
    /// rebuilt.
    pub fn post_process(&mut self) {
        self.classify_segments();
        self.split_layers();
        self.calc_metrics();
        debug!(
            layers = self.layers.len(),
            distance = self.distance,
            extrudate = self.extrudate,
            "post-processed document"
        );
    }

    /// Assign a motion style and layer index to every segment, comparing
    /// each to the immediately preceding coordinate state.
    fn classify_segments(&mut self) {
        let mut coords = Coords::default();
        let mut layer_idx = 0usize;
        // Z recorded at the last layer increment, not the previous segment's.
        let mut layer_z = 0.0f64;

        for line in &mut self.lines {
            let Some(seg) = line.as_segment_mut() else {
                continue;
            };
            let c = seg.coords;

            let mut style = MotionStyle::Fly;
            // No horizontal movement but extruder movement: retract/refill.
            if c.x == coords.x && c.y == coords.y && c.e != coords.e {
                style = if c.e < coords.e {
                    MotionStyle::Retract
                } else {
                    MotionStyle::Restore
                };
            }
            // Horizontal movement with positive extruder movement: extrusion.
            if c.x != coords.x || (c.y != coords.y && c.e > coords.e) {
                style = MotionStyle::Extrude;
            }
            // Positive extruder movement at a new Z signals a layer change.
            if c.e > coords.e && c.z != layer_z {
                layer_z = c.z;
                layer_idx += 1;
            }

            seg.style = style;
            seg.layer = layer_idx;
            coords = c;
        }
    }

    /// Group the ordered line sequence into per-layer buckets. Layer 0 opens
    /// at the all-zero state; a new layer opens whenever a segment's layer
    /// index differs from the open layer's, starting at the most recent
    /// motion coordinate. Non-motion lines never trigger a split and land in
    /// whichever layer is open.
    fn split_layers(&mut self) {
        let mut coords = Coords::default();
        self.layers.clear();

        let mut open = Layer {
            z: 0.0,
            start: coords,
            lines: 0..0,
            distance: 0.0,
            extrudate: 0.0,
        };
        let mut open_idx = 0usize;

        for (i, line) in self.lines.iter().enumerate() {
            if let Some(seg) = line.as_segment() {
                if seg.layer != open_idx {
                    open.lines.end = i;
                    self.layers.push(open);
                    open = Layer {
                        z: coords.z,
                        start: coords,
                        lines: i..i,
                        distance: 0.0,
                        extrudate: 0.0,
                    };
                    open_idx = seg.layer;
                }
                coords = seg.coords;
            }
        }
        open.lines.end = self.lines.len();
        self.layers.push(open);
    }

    /// Replay each layer from its start coordinate: per-segment 3D distance
    /// and extrudate, per-layer and document totals, and the bounding box
    /// over every visited coordinate including layer starts.
    fn calc_metrics(&mut self) {
        let mut total_distance = 0.0;
        let mut total_extrudate = 0.0;
        let mut bbox: Option<BoundingBox> = None;

        let extend = |bbox: &mut Option<BoundingBox>, coords: &Coords| match bbox {
            Some(b) => b.extend(coords),
            None => *bbox = Some(BoundingBox::new(coords)),
        };

        for li in 0..self.layers.len() {
            let range = self.layers[li].lines.clone();
            let mut coords = self.layers[li].start;
            let mut layer_distance = 0.0;
            let mut layer_extrudate = 0.0;

            extend(&mut bbox, &coords);

            for i in range {
                let Some(seg) = self.lines[i].as_segment_mut() else {
                    continue;
                };
                // Set-position segments are anchors, not motion.
                seg.distance = if seg.code.is_set_position() {
                    0.0
                } else {
                    seg.coords.distance_to(&coords)
                };
                seg.extrudate = if seg.style == MotionStyle::Extrude {
                    (seg.coords.e - coords.e).max(0.0)
                } else {
                    0.0
                };
                layer_distance += seg.distance;
                layer_extrudate += seg.extrudate;
                coords = seg.coords;
                extend(&mut bbox, &coords);
            }

            let layer = &mut self.layers[li];
            layer.distance = layer_distance;
            layer.extrudate = layer_extrudate;
            total_distance += layer_distance;
            total_extrudate += layer_extrudate;
        }

        self.distance = total_distance;
        self.extrudate = total_extrudate;
        self.bbox = bbox;
    }
}
