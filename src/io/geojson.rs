//! GeoJSON geometry fragment builder (write-only).

use serde_json::{json, Value};

use crate::error::Result;
use crate::geometry::{Coord, Geometry, GeometryKind};

/// Build the GeoJSON fragment for a geometry as a [`serde_json::Value`].
///
/// GeoJSON is linear-only: arc variants are linearized first, and their
/// container types map to the corresponding Multi* names.
pub fn to_geojson(geom: &Geometry) -> Result<Value> {
    let linear;
    let geom = if geom.has_curve_geometry() {
        linear = geom.linearize(0.0);
        &linear
    } else {
        geom
    };
    Ok(build(geom))
}

fn build(geom: &Geometry) -> Value {
    let has_z = geom.has_z();
    match geom.kind() {
        GeometryKind::Point(coord) => json!({
            "type": "Point",
            "coordinates": coord.map(|c| position(&c, has_z)).unwrap_or_else(|| json!([])),
        }),
        GeometryKind::LineString(coords)
        | GeometryKind::LinearRing(coords)
        | GeometryKind::CircularString(coords) => json!({
            "type": "LineString",
            "coordinates": positions(coords, has_z),
        }),
        GeometryKind::Polygon(rings) => json!({
            "type": "Polygon",
            "coordinates": rings
                .iter()
                .map(|r| positions(r.coords(), r.has_z()))
                .collect::<Vec<_>>(),
        }),
        GeometryKind::MultiPoint(children) => json!({
            "type": "MultiPoint",
            "coordinates": children
                .iter()
                .filter_map(|p| p.point_coord().map(|c| position(c, p.has_z())))
                .collect::<Vec<_>>(),
        }),
        GeometryKind::MultiLineString(children) => json!({
            "type": "MultiLineString",
            "coordinates": children
                .iter()
                .map(|l| positions(l.coords(), l.has_z()))
                .collect::<Vec<_>>(),
        }),
        GeometryKind::MultiPolygon(children) => json!({
            "type": "MultiPolygon",
            "coordinates": children
                .iter()
                .map(|poly| {
                    poly.children()
                        .iter()
                        .map(|r| positions(r.coords(), r.has_z()))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>(),
        }),
        _ => json!({
            "type": "GeometryCollection",
            "geometries": geom.children().iter().map(build).collect::<Vec<_>>(),
        }),
    }
}

fn position(c: &Coord, has_z: bool) -> Value {
    if has_z {
        json!([c.x, c.y, c.z])
    } else {
        json!([c.x, c.y])
    }
}

fn positions(coords: &[Coord], has_z: bool) -> Value {
    Value::Array(coords.iter().map(|c| position(c, has_z)).collect())
}

impl Geometry {
    /// Build the GeoJSON fragment for this geometry.
    pub fn to_geojson(&self) -> Result<Value> {
        to_geojson(self)
    }

    /// Build the GeoJSON fragment and serialize it to text.
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_geojson()?)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::wkt::from_wkt;

    #[test]
    fn leaf_fragments() {
        assert_eq!(
            to_geojson(&Geometry::point(1.5, 2.5)).unwrap(),
            json!({"type": "Point", "coordinates": [1.5, 2.5]})
        );
        assert_eq!(
            to_geojson(&Geometry::point_z(1.0, 2.0, 3.0)).unwrap(),
            json!({"type": "Point", "coordinates": [1.0, 2.0, 3.0]})
        );
        assert_eq!(
            to_geojson(&Geometry::point_empty()).unwrap(),
            json!({"type": "Point", "coordinates": []})
        );
        let poly = from_wkt("POLYGON ((0 0,1 0,1 1,0 0))").unwrap();
        assert_eq!(
            to_geojson(&poly).unwrap(),
            json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
            })
        );
    }

    #[test]
    fn collection_fragments() {
        let gc = from_wkt("GEOMETRYCOLLECTION (POINT (1 2),LINESTRING (0 0,1 1))").unwrap();
        let value = to_geojson(&gc).unwrap();
        assert_eq!(value["type"], "GeometryCollection");
        assert_eq!(value["geometries"].as_array().unwrap().len(), 2);
        assert_eq!(value["geometries"][1]["type"], "LineString");
    }

    #[test]
    fn curve_types_map_to_linear_names() {
        let mc = from_wkt("MULTICURVE ((0 0,1 1),CIRCULARSTRING (0 0,1 1,2 0))").unwrap();
        let value = to_geojson(&mc).unwrap();
        assert_eq!(value["type"], "MultiLineString");
        assert_eq!(value["coordinates"].as_array().unwrap().len(), 2);
    }
}
