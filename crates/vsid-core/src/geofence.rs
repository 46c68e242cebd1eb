//! Point-in-polygon test for airport areas.

/// Added to the edge's latitude span so near-horizontal edges never divide by zero.
const EDGE_EPSILON: f64 = 1e-12;

/// Minimum number of vertices for a usable polygon.
pub const MIN_VERTICES: usize = 3;

/// Check if a point is inside a polygon given as `[lat, lon]` vertices.
///
/// Ray casting with the even-odd rule: a horizontal ray at the point's
/// latitude is tested against every edge, and each crossing flips the
/// result. The ring may be open or closed. Polygons with fewer than
/// [`MIN_VERTICES`] vertices contain nothing.
pub fn contains(lat: f64, lon: f64, polygon: &[[f64; 2]]) -> bool {
    let n = polygon.len();
    if n < MIN_VERTICES || !lat.is_finite() || !lon.is_finite() {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = polygon[i][0];
        let xi = polygon[i][1];
        let yj = polygon[j][0];
        let xj = polygon[j][1];

        if ((yi > lat) != (yj > lat))
            && (lon < (xj - xi) * (lat - yi) / (yj - yi + EDGE_EPSILON) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Whether a polygon has enough vertices to be tested at all.
pub fn is_usable(polygon: &[[f64; 2]]) -> bool {
    polygon.len() >= MIN_VERTICES
}
