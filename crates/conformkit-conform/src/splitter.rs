//! Segment subdivision: rewrites over-long segments into bounded-length
//! interpolated chains.
//!
//! Every segment whose recorded distance exceeds the maximum is replaced by
//! an even chain of `N = ceil(distance / max)` pieces: `N - 1` interpolated
//! segments inserted before the original, which stays in place as the final
//! piece. Each piece, the retained original included, records `distance / N`
//! (an even split, not a recomputed geometric length), so one pass leaves
//! nothing over the threshold and a second pass with the same maximum is a
//! no-op.

use tracing::debug;

use conformkit_core::{AxisMask, Coords, Document, Line, Segment};

/// Marker halting all further subdivision when found at the head of a line.
pub const STOP_MARKER: &str = "EXTRUDING_STOP";

/// Number of leading characters searched for [`STOP_MARKER`].
const STOP_WINDOW: usize = 14;

/// Split every segment longer than `max_len` into even interpolated pieces.
///
/// Processing halts immediately when a line carries the stop marker; work
/// already done stands, and documents may legitimately end there.
pub fn subdivide(document: &mut Document, max_len: f64) {
    let mut inserted_total = 0usize;

    'layers: for li in 0..document.layers.len() {
        let mut i = document.layers[li].lines.start;
        while i < document.layers[li].lines.end {
            if halts(document.lines[i].text()) {
                break 'layers;
            }
            let Some(seg) = document.lines[i].as_segment() else {
                i += 1;
                continue;
            };
            if seg.distance <= max_len {
                i += 1;
                continue;
            }
            let Some(previous) = locate_previous(document, li, i) else {
                i += 1;
                continue;
            };

            let pieces = split_segment(seg, &previous, max_len, document.relative_extrusion);
            let inserted = pieces.len();
            let piece_distance = seg.distance / (inserted + 1) as f64;

            document
                .lines
                .splice(i..i, pieces.into_iter().map(Line::Motion));
            if let Some(original) = document.lines[i + inserted].as_segment_mut() {
                original.distance = piece_distance;
            }

            // Keep the derived layer ranges in step with the insertion.
            document.layers[li].lines.end += inserted;
            for later in &mut document.layers[li + 1..] {
                later.lines.start += inserted;
                later.lines.end += inserted;
            }

            inserted_total += inserted;
            // Resume scanning after the inserted run and the original.
            i += inserted + 1;
        }
    }

    debug!(inserted = inserted_total, max_len, "subdivided document");
}

fn halts(text: &str) -> bool {
    let window_end = text
        .char_indices()
        .nth(STOP_WINDOW)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..window_end].contains(STOP_MARKER)
}

/// The coordinate state the oversized segment starts from: the immediately
/// preceding line of its layer when there is one (skipping subdivision when
/// that line carries no motion), otherwise the nearest preceding segment in
/// any earlier layer. The document's very first motion entry has no
/// predecessor and is left alone.
fn locate_previous(document: &Document, layer_idx: usize, pos: usize) -> Option<Coords> {
    let layer = &document.layers[layer_idx];
    if pos > layer.lines.start {
        document.lines[pos - 1].as_segment().map(|s| s.coords)
    } else if layer_idx > 0 {
        document.lines[..layer.lines.start]
            .iter()
            .rev()
            .find_map(Line::as_segment)
            .map(|s| s.coords)
    } else {
        None
    }
}

/// Build the `N - 1` interpolated pieces preceding the original segment.
fn split_segment(
    current: &Segment,
    previous: &Coords,
    max_len: f64,
    relative_extrusion: bool,
) -> Vec<Segment> {
    let count = (current.distance / max_len).ceil() as usize;
    let to = current.coords;
    // E is omitted from the pieces when extrusion is absolute and unchanged
    // across the whole segment.
    let interpolate_e = previous.e != to.e || relative_extrusion;

    let mut pieces = Vec::with_capacity(count.saturating_sub(1));
    for k in 1..count {
        let t = k as f64 / count as f64;
        let e = if relative_extrusion {
            t * (to.e - previous.e)
        } else {
            previous.e + t * (to.e - previous.e)
        };
        let coords = Coords {
            x: round3(previous.x + t * (to.x - previous.x)),
            y: round3(previous.y + t * (to.y - previous.y)),
            z: round3(previous.z + t * (to.z - previous.z)),
            f: to.f,
            e: round3(e),
        };
        let fields = AxisMask {
            x: true,
            y: true,
            z: true,
            e: interpolate_e && current.fields.e,
            f: true,
        };
        let mut piece = Segment::new(
            current.code,
            coords,
            fields,
            current.line_no,
            String::new(),
        );
        piece.style = current.style;
        piece.layer = current.layer;
        piece.distance = current.distance / count as f64;
        piece.rebuild_text();
        pieces.push(piece);
    }
    pieces
}

// Same rounding the regenerated text uses.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halt_marker_window() {
        assert!(halts("EXTRUDING_STOP"));
        assert!(halts("EXTRUDING_STOP and more"));
        // Beyond the 14-character window the marker is not seen.
        assert!(!halts("; EXTRUDING_STOP"));
        assert!(!halts("stop"));
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(10.0), 10.0);
    }
}
