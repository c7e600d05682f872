//! KML geometry fragment builder (write-only).

use crate::error::{GeoWireError, Result};
use crate::geometry::{Coord, Geometry, GeometryKind};

/// Serialize a geometry to a KML fragment, optionally threading an
/// `<altitudeMode>` element into every leaf geometry. Arc variants are
/// linearized first.
pub fn to_kml(geom: &Geometry, altitude_mode: Option<&str>) -> Result<String> {
    let linear;
    let geom = if geom.has_curve_geometry() {
        linear = geom.linearize(0.0);
        &linear
    } else {
        geom
    };
    let mut out = String::new();
    write_geometry(&mut out, geom, altitude_mode)?;
    Ok(out)
}

fn write_geometry(out: &mut String, geom: &Geometry, altitude_mode: Option<&str>) -> Result<()> {
    match geom.kind() {
        GeometryKind::Point(coord) => {
            out.push_str("<Point>");
            push_altitude_mode(out, altitude_mode);
            out.push_str("<coordinates>");
            if let Some(c) = coord {
                push_tuple(out, c, geom.has_z());
            }
            out.push_str("</coordinates></Point>");
        }
        GeometryKind::LineString(coords) | GeometryKind::CircularString(coords) => {
            out.push_str("<LineString>");
            push_altitude_mode(out, altitude_mode);
            push_coordinates(out, coords, geom.has_z());
            out.push_str("</LineString>");
        }
        GeometryKind::Polygon(rings) => {
            out.push_str("<Polygon>");
            push_altitude_mode(out, altitude_mode);
            for (i, ring) in rings.iter().enumerate() {
                let boundary = if i == 0 {
                    "outerBoundaryIs"
                } else {
                    "innerBoundaryIs"
                };
                out.push_str(&format!("<{boundary}><LinearRing>"));
                push_coordinates(out, ring.coords(), ring.has_z());
                out.push_str(&format!("</LinearRing></{boundary}>"));
            }
            out.push_str("</Polygon>");
        }
        GeometryKind::MultiPoint(_)
        | GeometryKind::MultiLineString(_)
        | GeometryKind::MultiPolygon(_)
        | GeometryKind::GeometryCollection(_) => {
            out.push_str("<MultiGeometry>");
            for child in geom.children() {
                write_geometry(out, child, altitude_mode)?;
            }
            out.push_str("</MultiGeometry>");
        }
        _ => {
            return Err(GeoWireError::UnsupportedGeometryType(format!(
                "no KML encoding for {}",
                geom.geometry_type()
            )))
        }
    }
    Ok(())
}

fn push_altitude_mode(out: &mut String, altitude_mode: Option<&str>) {
    if let Some(mode) = altitude_mode {
        out.push_str(&format!("<altitudeMode>{mode}</altitudeMode>"));
    }
}

fn push_coordinates(out: &mut String, coords: &[Coord], has_z: bool) {
    out.push_str("<coordinates>");
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        push_tuple(out, c, has_z);
    }
    out.push_str("</coordinates>");
}

fn push_tuple(out: &mut String, c: &Coord, has_z: bool) {
    out.push_str(&format!("{},{}", c.x, c.y));
    if has_z {
        out.push_str(&format!(",{}", c.z));
    }
}

impl Geometry {
    /// Serialize to a KML fragment.
    pub fn to_kml(&self, altitude_mode: Option<&str>) -> Result<String> {
        to_kml(self, altitude_mode)
    }
}
