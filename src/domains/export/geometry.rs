use serde::{Deserialize, Serialize};

/// The two standard decimal precisions an encoded polyline may carry.
/// The encoding itself is untagged, so absent out-of-band knowledge the
/// decoder has to pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolylinePrecision {
    Five,
    Six,
}

impl PolylinePrecision {
    fn factor(self) -> f64 {
        match self {
            PolylinePrecision::Five => 1e5,
            PolylinePrecision::Six => 1e6,
        }
    }
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Decode an encoded polyline into `[lon, lat]` coordinates.
///
/// With a precision hint the string is decoded at that precision directly.
/// Without one, both candidate precisions are decoded and the one whose
/// haversine path length is greater wins: decoding at the wrong precision
/// collapses the path into near-duplicate points, while segments that leave
/// the globe entirely contribute nothing to a candidate's total. Non-finite
/// and out-of-range points are discarded after selection.
///
/// Never fails: structurally invalid input yields an empty vector. Callers
/// treat fewer than 2 surviving points as "no route".
pub fn decode_polyline(encoded: &str, hint: Option<PolylinePrecision>) -> Vec<[f64; 2]> {
    let Some(deltas) = decode_integral(encoded) else {
        return Vec::new();
    };
    if deltas.is_empty() {
        return Vec::new();
    }

    let selected = match hint {
        Some(precision) => scale(&deltas, precision.factor()),
        None => {
            let five = scale(&deltas, PolylinePrecision::Five.factor());
            let six = scale(&deltas, PolylinePrecision::Six.factor());
            // Ties prefer five, the commoner encoding.
            if path_length_m(&five) >= path_length_m(&six) {
                five
            } else {
                six
            }
        }
    };

    selected.into_iter().filter(|c| is_valid_coord(*c)).collect()
}

/// Total haversine length of a candidate path in meters. Segments touching
/// a non-finite or out-of-range endpoint are skipped, so a wrong-precision
/// decode that inflates coordinates off the globe scores zero rather than a
/// spuriously large total.
pub fn path_length_m(coords: &[[f64; 2]]) -> f64 {
    coords
        .windows(2)
        .filter(|pair| is_valid_coord(pair[0]) && is_valid_coord(pair[1]))
        .map(|pair| haversine_m(pair[0], pair[1]))
        .sum()
}

fn is_valid_coord([lon, lat]: [f64; 2]) -> bool {
    lon.is_finite() && lat.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0
}

/// Haversine distance in meters between two `[lon, lat]` points.
fn haversine_m([lon1, lat1]: [f64; 2], [lon2, lat2]: [f64; 2]) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let sin_dlat_half = (dlat / 2.0).sin();
    let sin_dlon_half = (dlon / 2.0).sin();
    let a = sin_dlat_half * sin_dlat_half
        + lat1_rad.cos() * lat2_rad.cos() * sin_dlon_half * sin_dlon_half;
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Decode the delta-encoded integer pairs without committing to a precision.
/// Returns accumulated `(lat, lon)` integers, or `None` on structural errors:
/// bytes outside the polyline alphabet, a truncated varint chunk, or a
/// dangling latitude with no longitude.
fn decode_integral(encoded: &str) -> Option<Vec<(i64, i64)>> {
    let bytes = encoded.as_bytes();
    let mut idx = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;
    let mut pairs = Vec::new();

    while idx < bytes.len() {
        let (dlat, next) = decode_value(bytes, idx)?;
        let (dlon, next) = decode_value(bytes, next)?;
        idx = next;
        lat += dlat;
        lon += dlon;
        pairs.push((lat, lon));
    }
    Some(pairs)
}

fn decode_value(bytes: &[u8], mut idx: usize) -> Option<(i64, usize)> {
    let mut result: i64 = 0;
    let mut shift = 0u32;
    loop {
        if idx >= bytes.len() || shift > 60 {
            return None;
        }
        let byte = i64::from(*bytes.get(idx)?) - 63;
        if !(0..=63).contains(&byte) {
            return None;
        }
        idx += 1;
        result |= (byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }
    let value = if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    };
    Some((value, idx))
}

fn scale(pairs: &[(i64, i64)], factor: f64) -> Vec<[f64; 2]> {
    pairs
        .iter()
        .map(|&(lat, lon)| [lon as f64 / factor, lat as f64 / factor])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of the decoder, for building fixtures at a known precision.
    fn encode(coords: &[[f64; 2]], precision: PolylinePrecision) -> String {
        let factor = precision.factor();
        let mut out = String::new();
        let mut prev_lat: i64 = 0;
        let mut prev_lon: i64 = 0;
        for &[lon, lat] in coords {
            let lat_i = (lat * factor).round() as i64;
            let lon_i = (lon * factor).round() as i64;
            encode_value(lat_i - prev_lat, &mut out);
            encode_value(lon_i - prev_lon, &mut out);
            prev_lat = lat_i;
            prev_lon = lon_i;
        }
        out
    }

    fn encode_value(value: i64, out: &mut String) {
        let mut v = if value < 0 { !(value << 1) } else { value << 1 };
        while v >= 0x20 {
            out.push(((0x20 | (v & 0x1f)) + 63) as u8 as char);
            v >>= 5;
        }
        out.push((v + 63) as u8 as char);
    }

    fn alpine_route() -> Vec<[f64; 2]> {
        vec![
            [7.6521, 45.0703],
            [7.6832, 45.0911],
            [7.7105, 45.1204],
            [7.7423, 45.1488],
        ]
    }

    #[test]
    fn test_selects_precision_five() {
        let encoded = encode(&alpine_route(), PolylinePrecision::Five);
        let decoded = decode_polyline(&encoded, None);
        assert_eq!(decoded.len(), 4);
        assert!((decoded[0][0] - 7.6521).abs() < 1e-4);
        assert!((decoded[0][1] - 45.0703).abs() < 1e-4);
    }

    #[test]
    fn test_selects_precision_six() {
        // Decoded at the wrong precision these points inflate off the globe
        // and score a zero-length path, so the six candidate wins.
        let encoded = encode(&alpine_route(), PolylinePrecision::Six);
        let decoded = decode_polyline(&encoded, None);
        assert_eq!(decoded.len(), 4);
        assert!((decoded[2][0] - 7.7105).abs() < 1e-5);
        assert!((decoded[2][1] - 45.1204).abs() < 1e-5);
    }

    #[test]
    fn test_candidate_totals_differ_by_an_order_of_magnitude() {
        let encoded = encode(&alpine_route(), PolylinePrecision::Five);
        let Some(deltas) = decode_integral(&encoded) else {
            panic!("fixture must decode")
        };
        let five = path_length_m(&scale(&deltas, 1e5));
        let six = path_length_m(&scale(&deltas, 1e6));
        assert!(five > six * 9.0);
    }

    #[test]
    fn test_hint_overrides_selection() {
        let encoded = encode(&alpine_route(), PolylinePrecision::Five);
        let decoded = decode_polyline(&encoded, Some(PolylinePrecision::Six));
        // Wrong hint collapses the path; the codec trusts the caller.
        assert_eq!(decoded.len(), 4);
        assert!(decoded[0][1] < 5.0);
    }

    #[test]
    fn test_invalid_input_yields_empty() {
        assert!(decode_polyline("", None).is_empty());
        // Byte below the polyline alphabet.
        assert!(decode_polyline("_p~iF~ps|U\u{1}", None).is_empty());
        // Truncated continuation chunk.
        assert!(decode_polyline("_p~iF~", None).is_empty());
        // Dangling latitude with no longitude.
        assert!(decode_polyline("_p~iF", None).is_empty());
    }

    #[test]
    fn test_out_of_range_points_discarded_after_selection() {
        // lat 91 is encodable but not a place on Earth.
        let coords = vec![[0.0, 91.0], [0.001, 91.001]];
        let encoded = encode(&coords, PolylinePrecision::Five);
        assert!(decode_polyline(&encoded, Some(PolylinePrecision::Five)).is_empty());
    }

    #[test]
    fn test_roundtrip_classic_vector() {
        // The classic reference vector from the polyline format description.
        let decoded = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@", Some(PolylinePrecision::Five));
        assert_eq!(decoded.len(), 3);
        assert!((decoded[0][1] - 38.5).abs() < 1e-5);
        assert!((decoded[0][0] - -120.2).abs() < 1e-5);
        assert!((decoded[2][1] - 43.252).abs() < 1e-5);
        assert!((decoded[2][0] - -126.453).abs() < 1e-5);
    }

    #[test]
    fn test_single_point_is_returned_but_short() {
        let encoded = encode(&[[7.65, 45.07]], PolylinePrecision::Five);
        let decoded = decode_polyline(&encoded, None);
        assert_eq!(decoded.len(), 1);
    }
}
