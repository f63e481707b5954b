//! Polygon bounding boxes and rotation composition.
//!
//! Coordinates are never rotated. Rotation travels alongside the box as
//! metadata, accumulated additively from page down to word.

use std::fmt;

use crate::error::{Error, Result};

/// A polygon vertex in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

/// Axis-aligned bounding box, inclusive minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl BoundingBox {
    pub fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> i64 {
        self.y1 - self.y0
    }
}

/// Renders as the `x0,y0,width,height` region used in table cells.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x0, self.y0, self.width(), self.height())
    }
}

/// Parse a PAGE `points` attribute (`"x1,y1 x2,y2 ..."`).
///
/// Fractional coordinates are truncated toward zero.
pub fn parse_points(points: &str) -> Result<Vec<Point>> {
    points
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| Error::MalformedGeometry(format!("bad point {pair:?}")))?;
            Ok(Point {
                x: parse_coordinate(x)?,
                y: parse_coordinate(y)?,
            })
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn parse_coordinate(value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v.trunc() as i64),
        _ => Err(Error::MalformedGeometry(format!("bad coordinate {value:?}"))),
    }
}

/// Minimal axis-aligned box enclosing every point.
pub fn bounding_box(points: &[Point]) -> Result<BoundingBox> {
    let first = points
        .first()
        .ok_or_else(|| Error::MalformedGeometry("empty polygon".to_string()))?;

    Ok(points.iter().skip(1).fold(
        BoundingBox {
            x0: first.x,
            y0: first.y,
            x1: first.x,
            y1: first.y,
        },
        |b, p| BoundingBox {
            x0: b.x0.min(p.x),
            y0: b.y0.min(p.y),
            x1: b.x1.max(p.x),
            y1: b.y1.max(p.y),
        },
    ))
}

/// Bounding box straight from a `points` attribute.
pub fn bounding_box_from_points(points: &str) -> Result<BoundingBox> {
    bounding_box(&parse_points(points)?)
}

/// Add a level's own rotation to its parent's, normalized into `[0, 360)`.
///
/// A missing or non-finite own rotation counts as 0.
pub fn compose_rotation(parent: f64, own: Option<f64>) -> f64 {
    let own = own.filter(|r| r.is_finite()).unwrap_or(0.0);
    normalize_rotation(parent + own)
}

/// Reduce any angle into `[0, 360)`.
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let r = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// Format a rotation the way it appears in tables: `0.0`, `90.0`, `359.5`.
pub fn format_rotation(degrees: f64) -> String {
    format!("{degrees:?}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(i64, i64)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point { x, y }).collect()
    }

    #[test]
    fn parse_points_basic() {
        let points = parse_points("10,20 30,40  50,5").unwrap();
        assert_eq!(points, pts(&[(10, 20), (30, 40), (50, 5)]));
    }

    #[test]
    fn parse_points_truncates_fractions() {
        let points = parse_points("10.7,20.2 -3.9,4").unwrap();
        assert_eq!(points, pts(&[(10, 20), (-3, 4)]));
    }

    #[test]
    fn parse_points_rejects_garbage() {
        assert!(matches!(
            parse_points("10;20"),
            Err(Error::MalformedGeometry(_))
        ));
        assert!(matches!(
            parse_points("a,b"),
            Err(Error::MalformedGeometry(_))
        ));
    }

    #[test]
    fn bounding_box_encloses_all_points() {
        let points = pts(&[(5, 9), (1, 3), (8, 2), (4, 7)]);
        let bbox = bounding_box(&points).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                x0: 1,
                y0: 2,
                x1: 8,
                y1: 9
            }
        );
        assert!(points
            .iter()
            .all(|p| (bbox.x0..=bbox.x1).contains(&p.x) && (bbox.y0..=bbox.y1).contains(&p.y)));
    }

    #[test]
    fn bounding_box_ignores_point_order() {
        let mut points = pts(&[(5, 9), (1, 3), (8, 2), (4, 7), (6, 6)]);
        let expected = bounding_box(&points).unwrap();
        points.reverse();
        assert_eq!(bounding_box(&points).unwrap(), expected);
        points.rotate_left(2);
        assert_eq!(bounding_box(&points).unwrap(), expected);
    }

    #[test]
    fn bounding_box_empty_is_malformed() {
        assert!(matches!(
            bounding_box(&[]),
            Err(Error::MalformedGeometry(_))
        ));
        assert!(bounding_box_from_points("   ").is_err());
    }

    #[test]
    fn bounding_box_display_uses_width_height() {
        let bbox = bounding_box_from_points("10,20 110,20 110,70 10,70").unwrap();
        assert_eq!(bbox.to_string(), "10,20,100,50");
    }

    #[test]
    fn compose_rotation_defaults_missing_to_zero() {
        assert_eq!(compose_rotation(90.0, None), 90.0);
        assert_eq!(compose_rotation(0.0, Some(f64::NAN)), 0.0);
    }

    #[test]
    fn compose_rotation_wraps() {
        assert_eq!(compose_rotation(270.0, Some(180.0)), 90.0);
        assert_eq!(compose_rotation(0.0, Some(-90.0)), 270.0);
        assert_eq!(compose_rotation(0.0, Some(-1e-20)), 0.0);
    }

    #[test]
    fn compose_rotation_is_associative_over_levels() {
        let levels = [Some(350.0), Some(-45.0), None, Some(720.0 + 15.0)];
        let chained = levels
            .iter()
            .fold(0.0, |acc, own| compose_rotation(acc, *own));

        let upper = compose_rotation(compose_rotation(0.0, levels[0]), levels[1]);
        let lower = compose_rotation(compose_rotation(0.0, levels[2]), levels[3]);
        let grouped = compose_rotation(upper, Some(lower));

        assert_eq!(chained, grouped);
        assert!((0.0..360.0).contains(&chained));
    }

    #[test]
    fn format_rotation_keeps_decimal() {
        assert_eq!(format_rotation(0.0), "0.0");
        assert_eq!(format_rotation(90.0), "90.0");
        assert_eq!(format_rotation(359.5), "359.5");
    }
}
