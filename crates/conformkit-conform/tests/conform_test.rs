//! Integration tests for the surface conformer.

use conformkit_conform::{conform, subdivide, SurfaceCloud};
use conformkit_core::{Document, GcodeParser};

fn parse(source: &str) -> Document {
    GcodeParser::new()
        .parse_str(source)
        .expect("parse failed")
        .document
}

fn cloud(text: &str) -> SurfaceCloud {
    SurfaceCloud::parse(text).expect("bad surface sample")
}

#[test]
fn test_matched_height_raises_z_with_clearance() {
    let mut doc = parse("G90\nG1 X10 Y10 Z0 F100");
    // One sample directly under the move; the others are farther than the
    // half-width (1.0) away in X or Y.
    let surface = cloud("10 10 3\n20 10 5\n10 8 9");
    conform(&mut doc, &surface, 2.0);

    let seg = doc.segments().next().unwrap();
    assert_eq!(seg.coords.z, 3.2);
    assert_eq!(seg.text, "G1 X10 Y10 Z3.2 F100");
}

#[test]
fn test_no_match_and_zero_height_leave_z_alone() {
    let mut doc = parse("G1 X0 Y0 Z0.2 F100\nG1 X5 Y0 Z0.2 F100");
    // The first move sits over a zero-height sample, the second over none.
    let surface = cloud("0 0 0");
    conform(&mut doc, &surface, 2.0);

    let zs: Vec<_> = doc.segments().map(|s| s.coords.z).collect();
    assert_eq!(zs, vec![0.2, 0.2]);
}

#[test]
fn test_sloped_segment_gets_proportional_extrusion() {
    let src = "G92 E0\nG1 X0 Y0 Z0 E1 F100\nG1 X2 Y0 Z0 E2 F100\nG1 X4 Y0 Z1.2 E3 F100";
    let mut doc = parse(src);
    let surface = cloud("2 0 1");
    conform(&mut doc, &surface, 2.0);

    let segs: Vec<_> = doc.segments().collect();
    // Flat lead-in is untouched.
    assert_eq!(segs[1].coords.e, 1.0);

    // The matched move climbs to 0 + 1 + 0.2 and its extrusion grows by the
    // 3D/2D length ratio.
    let factor = (4.0f64 + 1.44).sqrt() / 2.0;
    assert_eq!(segs[2].coords.z, 1.2);
    assert!((segs[2].coords.e - (1.0 + factor)).abs() < 1e-9);
    assert_eq!(
        segs[2].text,
        format!("G1 X2 Y0 Z1.2 E{:.3} F100", 1.0 + factor)
    );

    // The correction carries into every later E, even where geometry is
    // flat again.
    let carry = (1.0 + factor) - 2.0;
    assert!((segs[3].coords.e - (3.0 + carry)).abs() < 1e-9);
}

#[test]
fn test_reset_marker_clears_carry_register() {
    let src = "G92 E0\nG1 X0 Y0 Z0 E1 F100\nG1 X2 Y0 Z0 E2 F100\nG1 X4 Y0 Z1.2 E3 F100\nG92 E0\nG1 X6 Y0 Z1.2 E1 F100";
    let mut doc = parse(src);
    let surface = cloud("2 0 1");
    conform(&mut doc, &surface, 2.0);

    let segs: Vec<_> = doc.segments().collect();
    // Carry is live before the reset...
    assert!(segs[3].coords.e > 3.0);
    // ...and dead after it: the counter restarted.
    let last = segs.last().unwrap();
    assert_eq!(last.coords.e, 1.0);
    assert_eq!(last.text, "G1 X6 Y0 Z1.2 E1 F100");
}

#[test]
fn test_zero_planar_distance_skips_rebalance() {
    // A pure Z hop over raised surface: no planar travel to scale by.
    let src = "G92 E0\nG1 X2 Y0 Z0 E1 F100\nG1 X2 Y0 Z0.4 E2 F100";
    let mut doc = parse(src);
    let surface = cloud("2 0 1");
    conform(&mut doc, &surface, 2.0);

    let segs: Vec<_> = doc.segments().collect();
    // Both moves are raised, but E is never rescaled.
    assert!((segs[1].coords.z - 1.2).abs() < 1e-9);
    assert!((segs[2].coords.z - 1.6).abs() < 1e-9);
    assert_eq!(segs[2].coords.e, 2.0);
}

#[test]
fn test_rapid_moves_keep_their_text() {
    let mut doc = parse("G0 X10 Y10 Z0 F3000");
    let surface = cloud("10 10 2");
    conform(&mut doc, &surface, 2.0);

    let seg = doc.segments().next().unwrap();
    // Coordinates conform, but only the controlled-move code is rewritten.
    assert_eq!(seg.coords.z, 2.2);
    assert_eq!(seg.text, "G0 X10 Y10 Z0 F3000");
}

#[test]
fn test_subdivide_then_conform_pipeline() {
    let src = "; test part\nG21\nG90\nG92 E0\nG1 X0 Y0 Z0.2 E0 F1200\nG1 X10 Y0 Z0.2 E2 F1200";
    let mut doc = parse(src);
    subdivide(&mut doc, 2.0);
    let surface = cloud("4 0 2");
    conform(&mut doc, &surface, 2.0);

    let segs: Vec<_> = doc.segments().collect();
    // G92 anchor + lead-in + 4 inserted pieces + original endpoint.
    assert_eq!(segs.len(), 7);

    // Only the piece at X4 sits over the sample.
    let raised = segs.iter().find(|s| s.coords.x == 4.0).unwrap();
    assert!((raised.coords.z - 2.4).abs() < 1e-9);

    // Climbing onto and off the bump each rescale one 0.4 extrusion step by
    // the same slope factor; everything downstream shifts by the total.
    let factor = (4.0f64 + 4.84).sqrt() / 2.0;
    let expected_final = 2.0 + 2.0 * (0.4 * factor - 0.4);
    let last = segs.last().unwrap();
    assert!((last.coords.e - expected_final).abs() < 1e-9);

    let gcode = doc.to_gcode();
    assert!(gcode.contains(&format!("G1 X4 Y0 Z2.4 E{:.3} F1200", 0.4 * factor + 0.4)));
}
