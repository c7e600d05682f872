//! MultiPatch part-type interpretation: reassemble tagged triangle strips,
//! fans and rings into discrete polygons.

use crate::datatypes::GeometryType;
use crate::error::Result;
use crate::geometry::{Coord, Geometry};
use crate::io::shapebin::{
    SHPP_FIRSTRING, SHPP_INNERRING, SHPP_OUTERRING, SHPP_RING, SHPP_TRIANGLES, SHPP_TRIFAN,
    SHPP_TRISTRIP,
};

/// Translate a MultiPatch part set into a MultiPolygon.
///
/// Triangle parts emit one closed 4-vertex ring per triangle. Ring parts
/// accumulate: an outer/first ring flushes any in-progress polygon and
/// starts a new one, inner/unqualified rings become its holes, and the
/// trailing in-progress polygon is flushed once all parts are consumed.
/// Unrecognized part types are logged and skipped, not a hard failure.
pub(crate) fn multipatch_to_geometry(
    part_starts: &[i32],
    part_types: &[i32],
    coords: &[Coord],
) -> Result<Geometry> {
    let mut mp = Geometry::empty_of_type(GeometryType::MultiPolygon)?;
    mp.set_3d(true);
    let mut pending: Option<Geometry> = None;

    for (i, &start) in part_starts.iter().enumerate() {
        let end = part_starts
            .get(i + 1)
            .map(|&s| s as usize)
            .unwrap_or(coords.len());
        let part = &coords[start as usize..end];
        let part_type = part_types[i] & 0xf;

        match part_type {
            SHPP_TRISTRIP => {
                flush(&mut mp, &mut pending);
                for w in part.windows(3) {
                    mp.push_child_unchecked(triangle(w[0], w[1], w[2]));
                }
            }
            SHPP_TRIFAN => {
                flush(&mut mp, &mut pending);
                // All triangles share the part's first vertex.
                for w in part.windows(3) {
                    mp.push_child_unchecked(triangle(part[0], w[1], w[2]));
                }
            }
            SHPP_TRIANGLES => {
                flush(&mut mp, &mut pending);
                let mut base = 0;
                while base + 2 < part.len() {
                    mp.push_child_unchecked(triangle(part[base], part[base + 1], part[base + 2]));
                    base += 3;
                }
            }
            SHPP_OUTERRING | SHPP_INNERRING | SHPP_FIRSTRING | SHPP_RING => {
                if pending.is_some() && matches!(part_type, SHPP_OUTERRING | SHPP_FIRSTRING) {
                    flush(&mut mp, &mut pending);
                }
                let poly = pending.get_or_insert_with(|| {
                    let mut poly = Geometry::empty_of_type(GeometryType::Polygon)
                        .expect("constructible type");
                    poly.set_3d(true);
                    poly
                });
                let mut ring = Geometry::linear_ring(part.to_vec(), true);
                ring.close_rings();
                poly.push_child_unchecked(ring);
            }
            other => {
                log::debug!("unrecognized multipatch part type {other}, skipped");
            }
        }
    }
    flush(&mut mp, &mut pending);
    Ok(mp)
}

fn flush(mp: &mut Geometry, pending: &mut Option<Geometry>) {
    if let Some(poly) = pending.take() {
        mp.push_child_unchecked(poly);
    }
}

fn triangle(a: Coord, b: Coord, c: Coord) -> Geometry {
    let mut poly = Geometry::empty_of_type(GeometryType::Polygon).expect("constructible type");
    poly.set_3d(true);
    poly.push_child_unchecked(Geometry::linear_ring(vec![a, b, c, a], true));
    poly
}
