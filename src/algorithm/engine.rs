//! Marshaling seam to an external computational-geometry engine.
//!
//! Topological predicates and set operations (intersection, union, buffer,
//! convex hull, validity) are never computed here: an engine consumes and
//! produces its own opaque geometry handles, and this module only moves
//! trees across that boundary, reusing the WKB codec as the interchange
//! encoding. Results coming back get the original spatial reference
//! re-attached and, when the inputs were curved, are re-promoted to curve
//! container types.

use std::sync::Arc;

use crate::error::Result;
use crate::geometry::{Geometry, SpatialRef};
use crate::io::wkb::{from_wkb, to_wkb, WkbWriteOptions};

/// An external engine, addressed purely through WKB bytes and the engine's
/// own opaque geometry representation.
pub trait TopologyEngine {
    /// The engine's opaque geometry handle.
    type Geom;

    fn geom_from_wkb(&self, wkb: &[u8]) -> Result<Self::Geom>;
    fn geom_to_wkb(&self, geom: &Self::Geom) -> Result<Vec<u8>>;
}

/// Hand a geometry tree to the engine. Engines are linear-only: curve
/// variants are linearized before export.
pub fn export_to_engine<E: TopologyEngine>(engine: &E, geom: &Geometry) -> Result<E::Geom> {
    let linear = if geom.has_curve_geometry() {
        geom.linearize(0.0)
    } else {
        geom.clone()
    };
    let wkb = to_wkb(&linear, &WkbWriteOptions::default())?;
    engine.geom_from_wkb(&wkb)
}

/// Bring an engine result back into the model, re-attaching the spatial
/// reference of the operation's inputs and re-promoting container types to
/// their curve counterparts when `promote_to_curves` is set (i.e. when the
/// inputs were curved).
pub fn import_from_engine<E: TopologyEngine>(
    engine: &E,
    engine_geom: &E::Geom,
    srs: Option<Arc<SpatialRef>>,
    promote_to_curves: bool,
) -> Result<Geometry> {
    let wkb = engine.geom_to_wkb(engine_geom)?;
    let mut geom = from_wkb(&wkb)?;
    if promote_to_curves {
        geom = geom.as_curve_geometry();
    }
    geom.set_spatial_ref(srs);
    Ok(geom)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datatypes::GeometryType;
    use crate::geometry::Coord;

    /// A fake engine that stores the WKB bytes it was handed.
    struct Loopback;

    impl TopologyEngine for Loopback {
        type Geom = Vec<u8>;

        fn geom_from_wkb(&self, wkb: &[u8]) -> Result<Self::Geom> {
            Ok(wkb.to_vec())
        }

        fn geom_to_wkb(&self, geom: &Self::Geom) -> Result<Vec<u8>> {
            Ok(geom.clone())
        }
    }

    #[test]
    fn round_trip_through_the_engine_boundary() {
        let engine = Loopback;
        let geom = Geometry::line_string(
            vec![Coord::new(0.0, 0.0), Coord::new(2.0, 3.0)],
            false,
        );
        let handle = export_to_engine(&engine, &geom).unwrap();
        let back = import_from_engine(&engine, &handle, None, false).unwrap();
        assert_eq!(back, geom);
    }

    #[test]
    fn curved_inputs_are_linearized_out_and_promoted_back() {
        let engine = Loopback;
        let mut cp = Geometry::empty_of_type(GeometryType::CurvePolygon).unwrap();
        cp.add_ring(Geometry::circular_string(
            vec![
                Coord::new(0.0, 0.0),
                Coord::new(1.0, 1.0),
                Coord::new(2.0, 0.0),
                Coord::new(1.0, -1.0),
                Coord::new(0.0, 0.0),
            ],
            false,
        ))
        .unwrap();
        let srs = Arc::new(SpatialRef::from_epsg(4326, true));
        let handle = export_to_engine(&engine, &cp).unwrap();
        let back =
            import_from_engine(&engine, &handle, Some(srs.clone()), cp.has_curve_geometry())
                .unwrap();
        // The engine saw a linear polygon; the result is re-promoted and
        // carries the input's reference.
        assert_eq!(back.geometry_type(), GeometryType::CurvePolygon);
        assert!(back.spatial_ref().unwrap().is_same(&srs));
    }
}
