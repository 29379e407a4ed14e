//! Surface sample point cloud: the external height-field collaborator.
//!
//! The conformer only needs an unordered in-memory set of 3D points; the
//! on-disk representation is newline-delimited decimal `"X Y Z"` triples
//! with no header.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use conformkit_core::{format_coord, Document};

use crate::error::{ConformError, Result};

/// One sample point on the target surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    /// X position.
    pub x: f64,
    /// Y position.
    pub y: f64,
    /// Z height.
    pub z: f64,
}

/// An unordered set of surface sample points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurfaceCloud {
    points: Vec<SurfacePoint>,
}

impl SurfaceCloud {
    /// An empty cloud. Missing surface data is not an error; lookups over an
    /// empty cloud simply find no height.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cloud from any point source.
    pub fn from_points(points: impl IntoIterator<Item = SurfacePoint>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// Every deposition point of a processed document: each segment
    /// coordinate with positive extrusion becomes a sample, turning a
    /// printed substrate's toolpath into its surface.
    pub fn from_document(document: &Document) -> Self {
        let points = document
            .segments()
            .filter(|seg| seg.coords.e > 0.0)
            .map(|seg| SurfacePoint {
                x: seg.coords.x,
                y: seg.coords.y,
                z: seg.coords.z,
            })
            .collect();
        Self { points }
    }

    /// Parse newline-delimited `"X Y Z"` decimal triples. Blank lines are
    /// skipped; anything else malformed is an error carrying the line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut points = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let point = parse_triple(line).ok_or_else(|| ConformError::MalformedSample {
                line_no: idx + 1,
                text: raw.to_string(),
            })?;
            points.push(point);
        }
        Ok(Self { points })
    }

    /// Read a cloud from a triple-per-line source.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    /// Write the cloud in the same triple-per-line format.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for point in &self.points {
            writeln!(
                writer,
                "{} {} {}",
                format_coord(point.x),
                format_coord(point.y),
                format_coord(point.z)
            )?;
        }
        Ok(())
    }

    /// The sample points.
    pub fn points(&self) -> &[SurfacePoint] {
        &self.points
    }

    /// Number of sample points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the cloud holds no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// XY centre of the cloud's bounds, if it has any points.
    pub fn centre(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?;
        let mut min_x = first.x;
        let mut max_x = first.x;
        let mut min_y = first.y;
        let mut max_y = first.y;
        for point in &self.points[1..] {
            min_x = min_x.min(point.x);
            max_x = max_x.max(point.x);
            min_y = min_y.min(point.y);
            max_y = max_y.max(point.y);
        }
        Some(((max_x + min_x) / 2.0, (max_y + min_y) / 2.0))
    }

    /// Highest sample within the axis-aligned square of the given half-width
    /// around `(x, y)`. A square test, not a radial one.
    pub fn max_height_within(&self, x: f64, y: f64, half_width: f64) -> Option<f64> {
        self.points
            .iter()
            .filter(|p| (p.x - x).abs() < half_width && (p.y - y).abs() < half_width)
            .map(|p| p.z)
            .fold(None, |best, z| {
                Some(best.map_or(z, |b: f64| b.max(z)))
            })
    }
}

fn parse_triple(line: &str) -> Option<SurfacePoint> {
    let mut bits = line.split_whitespace();
    let x = bits.next()?.parse().ok()?;
    let y = bits.next()?.parse().ok()?;
    let z = bits.next()?.parse().ok()?;
    if bits.next().is_some() {
        return None;
    }
    Some(SurfacePoint { x, y, z })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_triples() {
        let cloud = SurfaceCloud::parse("0 0 1.5\n10.25 -3 2\n\n5 5 0\n").unwrap();
        assert_eq!(cloud.len(), 3);
        assert_eq!(
            cloud.points()[1],
            SurfacePoint {
                x: 10.25,
                y: -3.0,
                z: 2.0
            }
        );
    }

    #[test]
    fn test_parse_rejects_malformed_triple() {
        let err = SurfaceCloud::parse("0 0 1\n1.0 two 3.0").unwrap_err();
        match err {
            ConformError::MalformedSample { line_no, text } => {
                assert_eq!(line_no, 2);
                assert_eq!(text, "1.0 two 3.0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_extra_fields() {
        assert!(SurfaceCloud::parse("1 2 3 4").is_err());
        assert!(SurfaceCloud::parse("1 2").is_err());
    }

    #[test]
    fn test_write_round_trip() {
        let cloud = SurfaceCloud::from_points([
            SurfacePoint {
                x: 1.0,
                y: 2.0,
                z: 3.5,
            },
            SurfacePoint {
                x: -4.0,
                y: 0.0,
                z: 0.125,
            },
        ]);
        let mut buf = Vec::new();
        cloud.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "1 2 3.5\n-4 0 0.125\n");
        let reparsed = SurfaceCloud::parse(&text).unwrap();
        assert_eq!(reparsed.points(), cloud.points());
    }

    #[test]
    fn test_centre() {
        let cloud = SurfaceCloud::parse("0 0 1\n10 4 1\n2 2 1").unwrap();
        assert_eq!(cloud.centre(), Some((5.0, 2.0)));
        assert_eq!(SurfaceCloud::new().centre(), None);
    }

    #[test]
    fn test_max_height_square_lookup() {
        let cloud = SurfaceCloud::parse("10 10 3\n10.9 10 5\n12 10 9").unwrap();
        // Square half-width 1: the point at X12 is outside even though a
        // radial test at distance 2 would also exclude it; the corner case
        // is a point at (10.9, 10.9), inside the square but outside the
        // radius.
        assert_eq!(cloud.max_height_within(10.0, 10.0, 1.0), Some(5.0));
        assert_eq!(cloud.max_height_within(0.0, 0.0, 1.0), None);
    }
}
