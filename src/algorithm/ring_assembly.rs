//! Stitch an unordered, undirected set of line-string arcs into closed
//! polygon rings.
//!
//! Used for S-57-style arc networks and for building polygons out of loose
//! record parts. The algorithm is quadratic in the number of remaining arcs
//! per ring; arc counts in the target domain are modest and no spatial index
//! is kept.

use crate::datatypes::GeometryType;
use crate::error::{GeoWireError, Result};
use crate::geometry::{Coord, Envelope, Geometry};

/// The outcome of an assembly run. Rings that never closed are still part
/// of `polygon` so the caller can inspect them; `open_rings` is the failure
/// signal.
#[derive(Clone, Debug)]
pub struct RingAssembly {
    /// The assembled polygon. The ring with the largest envelope area is
    /// the exterior ring; every other ring is an interior ring. That choice
    /// is a heuristic, not a topological guarantee.
    pub polygon: Geometry,
    /// Number of rings that ended open and were not auto-closed.
    pub open_rings: usize,
}

impl RingAssembly {
    pub fn is_complete(&self) -> bool {
        self.open_rings == 0
    }
}

/// Assemble `edges` into the rings of a single polygon.
///
/// Arcs are consumed greedily: each ring starts from the first unconsumed
/// arc and repeatedly appends the unconsumed arc whose nearest endpoint is
/// closest to the ring's open end, reversed when its far end matched, until
/// the ring closes or no arc within `tolerance` remains. With `tolerance`
/// zero, comparisons are exact and the scan short-circuits on the first
/// coincidence. `auto_close` appends a synthetic closing vertex to rings
/// that end open.
///
/// Inputs that are not line strings are an error unless `best_effort` is
/// set, in which case they are skipped; arcs with fewer than 2 points are
/// discarded as degenerate.
pub fn assemble_polygon_from_edges(
    edges: &[Geometry],
    best_effort: bool,
    auto_close: bool,
    tolerance: f64,
) -> Result<RingAssembly> {
    let mut arcs: Vec<&[Coord]> = Vec::with_capacity(edges.len());
    let mut has_z = false;
    for edge in edges {
        match edge.geometry_type() {
            GeometryType::LineString | GeometryType::LinearRing => {
                if edge.coords().len() < 2 {
                    continue;
                }
                has_z |= edge.has_z();
                arcs.push(edge.coords());
            }
            other if best_effort => {
                log::debug!("skipping non-linestring edge of type {other}");
            }
            other => {
                return Err(GeoWireError::IncorrectGeometryType(format!(
                    "edge of type {other} cannot be assembled into a ring"
                )))
            }
        }
    }

    let mut consumed = vec![false; arcs.len()];
    let mut rings: Vec<Vec<Coord>> = Vec::new();
    let mut open_rings = 0usize;

    while let Some(seed) = consumed.iter().position(|&c| !c) {
        consumed[seed] = true;
        let mut ring: Vec<Coord> = arcs[seed].to_vec();

        loop {
            if ring_closed(&ring, tolerance) {
                break;
            }
            let Some((index, reversed)) = find_closest_arc(&ring, &arcs, &consumed, tolerance)
            else {
                // No arc within tolerance of the open end: leave the ring
                // open and move on.
                break;
            };
            consumed[index] = true;
            append_arc(&mut ring, arcs[index], reversed, tolerance);
        }

        if !ring_closed(&ring, tolerance) {
            if auto_close {
                let first = ring[0];
                ring.push(first);
            } else {
                log::debug!(
                    "ring of {} vertices could not be closed (tolerance {tolerance})",
                    ring.len()
                );
                open_rings += 1;
            }
        }
        rings.push(ring);
    }

    // The ring with the largest envelope area is declared the exterior;
    // everything else becomes a hole, in input order.
    let mut polygon = Geometry::empty_of_type(GeometryType::Polygon).expect("constructible type");
    if !rings.is_empty() {
        let exterior_index = rings
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| ring_envelope(a).area().total_cmp(&ring_envelope(b).area()))
            .map(|(i, _)| i)
            .expect("non-empty ring set");
        let exterior = rings.remove(exterior_index);
        polygon.push_child_unchecked(Geometry::linear_ring(exterior, has_z));
        for ring in rings {
            polygon.push_child_unchecked(Geometry::linear_ring(ring, has_z));
        }
    }

    Ok(RingAssembly {
        polygon,
        open_rings,
    })
}

fn ring_closed(ring: &[Coord], tolerance: f64) -> bool {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) => {
            if tolerance == 0.0 {
                first.same_xy(last)
            } else {
                first.distance2d(last) <= tolerance
            }
        }
        _ => false,
    }
}

fn ring_envelope(ring: &[Coord]) -> Envelope {
    let mut env = Envelope::new();
    for c in ring {
        env.merge(c);
    }
    env
}

/// Among unconsumed arcs, the one whose nearest endpoint is closest to the
/// ring's open end, and whether it needs reversing. Tolerance zero
/// short-circuits on the first exact coincidence, which is already optimal.
fn find_closest_arc(
    ring: &[Coord],
    arcs: &[&[Coord]],
    consumed: &[bool],
    tolerance: f64,
) -> Option<(usize, bool)> {
    let open_end = *ring.last()?;
    let mut best: Option<(usize, bool, f64)> = None;
    for (i, arc) in arcs.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        let first = arc[0];
        let last = arc[arc.len() - 1];
        if tolerance == 0.0 {
            if open_end.same_xy(&first) {
                return Some((i, false));
            }
            if open_end.same_xy(&last) {
                return Some((i, true));
            }
            continue;
        }
        let d_first = open_end.distance2d(&first);
        let d_last = open_end.distance2d(&last);
        let (dist, reversed) = if d_first <= d_last {
            (d_first, false)
        } else {
            (d_last, true)
        };
        if dist <= tolerance && best.map(|(_, _, b)| dist < b).unwrap_or(true) {
            best = Some((i, reversed, dist));
        }
    }
    best.map(|(i, reversed, _)| (i, reversed))
}

/// Append an arc's vertices to the ring, reversed when its far end matched,
/// skipping a leading vertex that coincides with the ring's current last
/// vertex.
fn append_arc(ring: &mut Vec<Coord>, arc: &[Coord], reversed: bool, tolerance: f64) {
    let open_end = *ring.last().expect("non-empty ring");
    let coincides = |c: &Coord| {
        if tolerance == 0.0 {
            c.same_xy(&open_end)
        } else {
            c.distance2d(&open_end) <= tolerance
        }
    };
    let append = |ring: &mut Vec<Coord>, i: usize, c: &Coord| {
        if i == 0 && coincides(c) {
            return;
        }
        ring.push(*c);
    };
    if reversed {
        for (i, c) in arc.iter().rev().enumerate() {
            append(ring, i, c);
        }
    } else {
        for (i, c) in arc.iter().enumerate() {
            append(ring, i, c);
        }
    }
}
