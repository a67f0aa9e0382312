//! Polygon utilities
//!
//! Loops are plain `Vec2` slices. A loop is *closed* when its last vertex
//! repeats its first one. Winding follows the shoelace sign: a loop with a
//! positive signed area is counter-clockwise.

use crate::Vec2;

/// Numerical slack used by orientation tests
const EPSILON: f32 = 1e-6;

/// Error produced by polygon construction and decomposition
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Fewer than three distinct vertices
    TooFewVertices(usize),
    /// The loop does not end where it starts
    NotClosed,
    /// The loop is clockwise or has no area
    Winding,
    /// The loop self-intersects so no ear could be clipped
    NotSimple,
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::TooFewVertices(n) => {
                write!(f, "polygon needs at least 3 distinct vertices, got {}", n)
            }
            GeometryError::NotClosed => write!(f, "polygon loop is not closed"),
            GeometryError::Winding => write!(f, "polygon loop is not counter-clockwise"),
            GeometryError::NotSimple => write!(f, "polygon loop is not simple"),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Check whether a loop ends on its first vertex
pub fn is_closed(points: &[Vec2]) -> bool {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => points.len() > 1 && first == last,
        _ => false,
    }
}

/// Return a copy of the loop with its first vertex appended when needed
pub fn close_loop(points: &[Vec2]) -> Vec<Vec2> {
    let mut closed = points.to_vec();
    if !is_closed(points) {
        if let Some(&first) = points.first() {
            closed.push(first);
        }
    }
    closed
}

/// Signed shoelace area; open and closed loops give the same result
pub fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        sum += points[i].cross(points[(i + 1) % n]);
    }
    sum * 0.5
}

/// Absolute area of a loop
pub fn area(points: &[Vec2]) -> f32 {
    signed_area(points).abs()
}

/// Area centroid of a loop; falls back to the vertex average for degenerate loops
pub fn centroid(points: &[Vec2]) -> Vec2 {
    let n = points.len();
    if n == 0 {
        return Vec2::ZERO;
    }
    let mut acc = Vec2::ZERO;
    let mut twice_area = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = a.cross(b);
        twice_area += c;
        acc += (a + b) * c;
    }
    if twice_area.abs() <= EPSILON {
        let sum = points.iter().fold(Vec2::ZERO, |s, &p| s + p);
        return sum / n as f32;
    }
    acc / (3.0 * twice_area)
}

/// Moment of inertia of a uniform polygon of `mass` about the origin
pub fn polygon_moment(mass: f32, points: &[Vec2]) -> f32 {
    let n = points.len();
    let mut num = 0.0;
    let mut den = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = a.cross(b).abs();
        num += c * (a.dot(a) + a.dot(b) + b.dot(b));
        den += c;
    }
    if den <= EPSILON {
        return 0.0;
    }
    mass * num / (6.0 * den)
}

/// Check that an open loop is convex and counter-clockwise
pub fn is_convex(points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    (0..n).all(|i| {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        (b - a).cross(c - b) >= -EPSILON
    })
}

/// Remove repeated vertices and vertices within `tolerance` of the line through
/// their neighbours. Works on an open loop.
pub fn simplify(points: &[Vec2], tolerance: f32) -> Vec<Vec2> {
    let mut out: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().map_or(true, |&last| (p - last).length_squared() > EPSILON) {
            out.push(p);
        }
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).length_squared() <= EPSILON {
        out.pop();
    }

    let mut changed = true;
    while changed && out.len() > 3 {
        changed = false;
        let n = out.len();
        for i in 0..n {
            let prev = out[(i + n - 1) % n];
            let cur = out[i];
            let next = out[(i + 1) % n];
            let base = next - prev;
            let len = base.length();
            let deviation = if len > EPSILON {
                base.cross(cur - prev).abs() / len
            } else {
                (cur - prev).length()
            };
            if deviation <= tolerance.max(EPSILON) {
                out.remove(i);
                changed = true;
                break;
            }
        }
    }
    out
}

/// Split a closed counter-clockwise loop into convex pieces.
///
/// The loop is simplified with `tolerance`, triangulated by ear clipping,
/// then triangles are merged greedily while the union stays convex.
pub fn convex_decomposition(
    closed_loop: &[Vec2],
    tolerance: f32,
) -> Result<Vec<Vec<Vec2>>, GeometryError> {
    if !is_closed(closed_loop) {
        return Err(GeometryError::NotClosed);
    }
    let open = &closed_loop[..closed_loop.len() - 1];
    if signed_area(open) <= EPSILON {
        return Err(GeometryError::Winding);
    }

    let verts = simplify(open, tolerance);
    if verts.len() < 3 {
        return Err(GeometryError::TooFewVertices(verts.len()));
    }
    if is_convex(&verts) {
        return Ok(vec![verts]);
    }

    let triangles = ear_clip(&verts)?;
    let pieces = merge_convex(&verts, triangles);
    Ok(pieces
        .into_iter()
        .map(|piece| {
            let loop_points: Vec<Vec2> = piece.into_iter().map(|i| verts[i]).collect();
            simplify(&loop_points, 0.0)
        })
        .collect())
}

fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    let d1 = (b - a).cross(p - a);
    let d2 = (c - b).cross(p - b);
    let d3 = (a - c).cross(p - c);
    d1 >= -EPSILON && d2 >= -EPSILON && d3 >= -EPSILON
}

fn ear_clip(verts: &[Vec2]) -> Result<Vec<[usize; 3]>, GeometryError> {
    let mut remaining: Vec<usize> = (0..verts.len()).collect();
    let mut triangles = Vec::with_capacity(verts.len().saturating_sub(2));

    while remaining.len() > 3 {
        let n = remaining.len();
        let mut clipped = false;
        for i in 0..n {
            let ia = remaining[(i + n - 1) % n];
            let ib = remaining[i];
            let ic = remaining[(i + 1) % n];
            let (a, b, c) = (verts[ia], verts[ib], verts[ic]);
            if (b - a).cross(c - b) <= EPSILON {
                continue;
            }
            let blocked = remaining.iter().any(|&j| {
                j != ia && j != ib && j != ic
                    && verts[j] != a && verts[j] != b && verts[j] != c
                    && point_in_triangle(verts[j], a, b, c)
            });
            if blocked {
                continue;
            }
            triangles.push([ia, ib, ic]);
            remaining.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            return Err(GeometryError::NotSimple);
        }
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    Ok(triangles)
}

/// Find the position of directed edge `a -> b` in an index loop
fn edge_position(piece: &[usize], a: usize, b: usize) -> Option<usize> {
    let n = piece.len();
    (0..n).find(|&i| piece[i] == a && piece[(i + 1) % n] == b)
}

fn merge_convex(verts: &[Vec2], triangles: Vec<[usize; 3]>) -> Vec<Vec<usize>> {
    let mut pieces: Vec<Vec<usize>> = triangles.into_iter().map(|t| t.to_vec()).collect();

    let mut merged_any = true;
    while merged_any {
        merged_any = false;
        'search: for p in 0..pieces.len() {
            for q in (p + 1)..pieces.len() {
                let n = pieces[p].len();
                for i in 0..n {
                    let a = pieces[p][i];
                    let b = pieces[p][(i + 1) % n];
                    let Some(j) = edge_position(&pieces[q], b, a) else {
                        continue;
                    };
                    // p rotated to run b..a, q rotated to run a..b
                    let m = pieces[q].len();
                    let mut candidate: Vec<usize> =
                        (0..n).map(|k| pieces[p][(i + 1 + k) % n]).collect();
                    candidate.extend((2..m).map(|k| pieces[q][(j + k) % m]));

                    let points: Vec<Vec2> = candidate.iter().map(|&k| verts[k]).collect();
                    if is_convex(&points) {
                        pieces[p] = candidate;
                        pieces.remove(q);
                        merged_any = true;
                        break 'search;
                    }
                }
            }
        }
    }
    pieces
}
