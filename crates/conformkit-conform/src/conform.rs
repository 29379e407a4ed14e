//! Surface conforming: re-projects a toolpath onto a surface height field.
//!
//! Segments are processed strictly in document order. Each one looks up the
//! surface height under its XY position and is raised above it; extruding
//! moves are rebalanced so that deposition stays proportional to the true 3D
//! path length of the now-sloped segment. The correction is carried forward
//! in a running register that shifts every downstream absolute E value; the
//! register models a firmware extrusion counter and resets with it.

use tracing::debug;

use conformkit_core::{Coords, Document, MotionCode};

use crate::surface::SurfaceCloud;

/// Fixed clearance added above a matched surface height.
const SURFACE_CLEARANCE: f64 = 0.2;

/// Marker that resets the firmware extrusion counter, and with it the carry
/// register.
const EXTRUSION_RESET_MARKER: &str = "G92 E0";

/// Conform a subdivided document to the surface samples.
///
/// `max_len` is the maximum segment length the document was subdivided
/// with; the height lookup square extends half of it to each side. Z and E
/// are mutated in place; styles, layers and line order are untouched.
pub fn conform(document: &mut Document, surface: &SurfaceCloud, max_len: f64) {
    let half_width = max_len * 0.5;
    let mut carry = 0.0f64;
    let mut previous: Option<Coords> = None;
    let mut raised = 0usize;

    for line in &mut document.lines {
        let Some(seg) = line.as_segment_mut() else {
            continue;
        };
        if seg.text.contains(EXTRUSION_RESET_MARKER) {
            carry = 0.0;
        }

        let height = surface
            .max_height_within(seg.coords.x, seg.coords.y, half_width)
            .unwrap_or(0.0);
        // A matched height of exactly zero is indistinguishable from no
        // match and leaves Z alone.
        if height != 0.0 {
            seg.coords.z += height + SURFACE_CLEARANCE;
            raised += 1;
        }

        let z_delta = previous
            .map(|p| (p.z - seg.coords.z).abs())
            .unwrap_or(0.0);
        let previous_carries_e = previous.map(|p| p.e != 0.0).unwrap_or(false);

        if seg.carries_e() && previous_carries_e && (height != 0.0 || z_delta != 0.0) {
            let prev = previous.unwrap_or_default();
            let planar = seg.coords.planar_distance_to(&prev);
            if planar > 0.0 {
                seg.coords.e += carry;
                let e_delta = (prev.e - seg.coords.e).abs();
                let factor = (planar * planar + z_delta * z_delta).sqrt() / planar;
                let new_e = prev.e + e_delta * factor;
                carry += new_e - seg.coords.e;
                seg.coords.e = new_e;
            }
            if seg.code == MotionCode::Controlled {
                seg.rebuild_text();
            }
        } else if seg.code == MotionCode::Controlled {
            if seg.carries_e() && seg.fields.e {
                seg.coords.e += carry;
            }
            seg.rebuild_text();
        }

        previous = Some(seg.coords);
    }

    debug!(raised, half_width, "conformed document to surface");
}
