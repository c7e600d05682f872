//! Organize loose rings into polygons by winding and containment.
//!
//! Shapefile-convention records store exterior rings clockwise and holes
//! counter-clockwise, but give no explicit nesting. This is the compact
//! winding heuristic the record reader relies on when a multi-ring polygon
//! record arrives: clockwise rings open polygons, counter-clockwise rings
//! become holes of whichever exterior contains their first vertex.

use crate::datatypes::GeometryType;
use crate::geometry::{ring_is_clockwise, Coord, Geometry};

/// Assemble `rings` (LinearRing or LineString geometries) into a Polygon or
/// MultiPolygon. Holes that no exterior contains are promoted to exteriors
/// of their own, with a warning, rather than dropped.
pub fn organize_polygons(rings: Vec<Geometry>) -> Geometry {
    let mut exteriors: Vec<Geometry> = Vec::new();
    let mut holes: Vec<Geometry> = Vec::new();

    let multiple = rings.len() > 1;
    for ring in rings {
        if multiple && !ring_is_clockwise(ring.coords()) {
            holes.push(ring);
        } else {
            exteriors.push(new_polygon_with(ring));
        }
    }

    for hole in holes {
        let probe = hole.coords().first().copied();
        let target = probe.and_then(|p| {
            exteriors.iter().position(|poly| {
                let shell = poly.exterior_ring().expect("polygon built with a shell");
                poly.envelope().contains_point(p.x, p.y) && point_in_ring(&p, shell.coords())
            })
        });
        match target {
            Some(i) => exteriors[i].push_child_unchecked(as_ring(hole)),
            None => {
                log::warn!("ring not contained in any exterior ring, treating as an exterior");
                exteriors.push(new_polygon_with(hole));
            }
        }
    }

    match exteriors.len() {
        0 => Geometry::empty_of_type(GeometryType::Polygon).expect("constructible type"),
        1 => exteriors.into_iter().next().expect("one element"),
        _ => {
            let mut mp =
                Geometry::empty_of_type(GeometryType::MultiPolygon).expect("constructible type");
            for poly in exteriors {
                mp.push_child_unchecked(poly);
            }
            mp
        }
    }
}

fn new_polygon_with(ring: Geometry) -> Geometry {
    let mut poly = Geometry::empty_of_type(GeometryType::Polygon).expect("constructible type");
    poly.push_child_unchecked(as_ring(ring));
    poly
}

fn as_ring(geom: Geometry) -> Geometry {
    if geom.geometry_type() == GeometryType::LinearRing {
        geom
    } else {
        Geometry::linear_ring(geom.coords().to_vec(), geom.has_z())
    }
}

/// Even-odd ray cast.
fn point_in_ring(p: &Coord, ring: &[Coord]) -> bool {
    let mut inside = false;
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y)
            && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
