//! Marching squares over a boolean sample lattice
//!
//! The lattice has `width × height` sample points at integer coordinates.
//! Contours run through the midpoints of lattice edges whose two samples
//! differ. Every contour is oriented so the solid side lies on its left,
//! which makes the outline of a solid region counter-clockwise.
//!
//! Work happens in doubled integer coordinates so midpoints and cell
//! centres stay exact; points are halved only on output.

use std::collections::BTreeMap;

use crate::Vec2;

type Point = (i32, i32);

/// Contour style
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarchStyle {
    /// Axis-aligned staircase through cell centres
    Hard,
    /// Straight cuts between edge midpoints (45° chamfers)
    Soft,
}

/// Trace the boundary between solid and empty samples.
///
/// Returns one polyline per contour in lattice units. Contours that close
/// repeat their first point at the end.
pub fn march<F>(width: usize, height: usize, style: MarchStyle, solid: F) -> Vec<Vec<Vec2>>
where
    F: Fn(usize, usize) -> bool,
{
    if width < 2 || height < 2 {
        return Vec::new();
    }

    let mut next: BTreeMap<Point, Point> = BTreeMap::new();
    for cy in 0..height - 1 {
        for cx in 0..width - 1 {
            let corners = [
                solid(cx, cy),
                solid(cx + 1, cy),
                solid(cx + 1, cy + 1),
                solid(cx, cy + 1),
            ];
            for (a, b, probe) in cell_cuts(cx as i32, cy as i32, corners) {
                let (a, b) = orient(a, b, probe);
                let centre = (2 * cx as i32 + 1, 2 * cy as i32 + 1);
                let bends = style == MarchStyle::Hard && a.0 != b.0 && a.1 != b.1 && !is_saddle(corners);
                if bends {
                    next.insert(a, centre);
                    next.insert(centre, b);
                } else {
                    next.insert(a, b);
                }
            }
        }
    }

    stitch(next)
        .into_iter()
        .map(|contour| {
            drop_collinear(contour)
                .into_iter()
                .map(|(x, y)| Vec2::new(x as f32 * 0.5, y as f32 * 0.5))
                .collect()
        })
        .collect()
}

fn is_saddle(c: [bool; 4]) -> bool {
    c[0] == c[2] && c[1] == c[3] && c[0] != c[1]
}

/// Cuts for one cell as `(midpoint, midpoint, solid corner)` in doubled coordinates.
/// Corners are ordered top-left, top-right, bottom-right, bottom-left.
fn cell_cuts(cx: i32, cy: i32, c: [bool; 4]) -> Vec<(Point, Point, Point)> {
    let corner = [
        (2 * cx, 2 * cy),
        (2 * cx + 2, 2 * cy),
        (2 * cx + 2, 2 * cy + 2),
        (2 * cx, 2 * cy + 2),
    ];
    // Edge k joins corner k and corner k+1
    let mid = [
        (2 * cx + 1, 2 * cy),
        (2 * cx + 2, 2 * cy + 1),
        (2 * cx + 1, 2 * cy + 2),
        (2 * cx, 2 * cy + 1),
    ];

    if is_saddle(c) {
        // Solid corners are kept apart
        return (0..4)
            .filter(|&k| c[k])
            .map(|k| (mid[(k + 3) % 4], mid[k], corner[k]))
            .collect();
    }

    let crossed: Vec<usize> = (0..4).filter(|&k| c[k] != c[(k + 1) % 4]).collect();
    if crossed.len() != 2 {
        return Vec::new();
    }
    let probe = match (0..4).find(|&k| c[k]) {
        Some(k) => corner[k],
        None => return Vec::new(),
    };
    vec![(mid[crossed[0]], mid[crossed[1]], probe)]
}

/// Order a cut so that `probe` lies on its left
fn orient(a: Point, b: Point, probe: Point) -> (Point, Point) {
    let d = (b.0 - a.0, b.1 - a.1);
    let p = (probe.0 - a.0, probe.1 - a.1);
    if d.0 * p.1 - d.1 * p.0 > 0 {
        (a, b)
    } else {
        (b, a)
    }
}

fn stitch(mut next: BTreeMap<Point, Point>) -> Vec<Vec<Point>> {
    let mut contours = Vec::new();
    while let Some((&start, _)) = next.iter().next() {
        let mut contour = vec![start];
        let mut current = start;
        while let Some(to) = next.remove(&current) {
            contour.push(to);
            if to == start {
                break;
            }
            current = to;
        }
        contours.push(contour);
    }
    contours
}

/// Drop points lying on a straight run; keeps the closing point of closed contours
fn drop_collinear(points: Vec<Point>) -> Vec<Point> {
    let closed = points.len() > 2 && points.first() == points.last();
    let mut ring: Vec<Point> = if closed {
        points[..points.len() - 1].to_vec()
    } else {
        points
    };

    let turns = |a: Point, b: Point, c: Point| (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0) != 0;

    if closed {
        let mut i = 0;
        while ring.len() > 3 && i < ring.len() {
            let n = ring.len();
            if turns(ring[(i + n - 1) % n], ring[i], ring[(i + 1) % n]) {
                i += 1;
            } else {
                ring.remove(i);
            }
        }
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
    } else {
        let mut i = 1;
        while i + 1 < ring.len() {
            if turns(ring[i - 1], ring[i], ring[i + 1]) {
                i += 1;
            } else {
                ring.remove(i);
            }
        }
    }
    ring
}
