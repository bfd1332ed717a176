//! Google encoded polyline decoding (precision 5).

use thiserror::Error;

use crate::store::GeoPoint;

const PRECISION: u32 = 5;

#[derive(Debug, Error, PartialEq)]
#[error("{0}")]
pub struct PolylineError(String);

/// Decodes an encoded polyline into `(lon, lat)` points, in route order.
///
/// An empty input decodes to an empty vector; callers decide whether that is
/// acceptable.
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, PolylineError> {
    let line = polyline::decode_polyline(encoded, PRECISION)
        .map_err(|e| PolylineError(e.to_string()))?;

    Ok(line.coords().map(|c| GeoPoint::new(c.x, c.y)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();

        assert_eq!(points.len(), 3);
        assert!(close(points[0].lat, 38.5) && close(points[0].lon, -120.2));
        assert!(close(points[1].lat, 40.7) && close(points[1].lon, -120.95));
        assert!(close(points[2].lat, 43.252) && close(points[2].lon, -126.453));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode("").unwrap(), vec![]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("not a polyline!").is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        // latitude without longitude
        assert!(decode("_p~iF").is_err());
        // continuation bit set on the last byte
        assert!(decode("_p~iF~ps|").is_err());
    }
}
