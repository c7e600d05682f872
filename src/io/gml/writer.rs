//! GML2/GML3 geometry fragment builders.

use crate::error::{GeoWireError, Result};
use crate::geometry::{Coord, Envelope, Geometry, GeometryKind};
use crate::io::gml::{GmlFormat, GmlOptions, SrsDimensionLocation};

/// Serialize a geometry to a GML fragment.
///
/// The `srsName` attribute is attached only at the outermost element and
/// only when the spatial reference exposes an authority/code pair. Arc
/// variants are linearized first: the emitted vocabulary is the linear one.
pub fn to_gml(geom: &Geometry, options: &GmlOptions) -> Result<String> {
    let linear;
    let geom = if geom.has_curve_geometry() {
        linear = geom.linearize(0.0);
        &linear
    } else {
        geom
    };

    let srs_attr = geom.spatial_ref().and_then(|srs| {
        let (name, code) = (srs.authority_name()?, srs.authority_code()?);
        if options.format == GmlFormat::Gml3 && options.long_srs {
            Some(format!(" srsName=\"urn:ogc:def:crs:{name}::{code}\""))
        } else {
            Some(format!(" srsName=\"{name}:{code}\""))
        }
    });
    // The long-URN convention implies authority axis order: lat/long
    // references get their axes swapped in the coordinate text, not in the
    // in-memory geometry.
    let swap = options.format == GmlFormat::Gml3
        && options.long_srs
        && geom
            .spatial_ref()
            .map(|srs| srs.lat_long_axis_order())
            .unwrap_or(false);

    let writer = GmlWriter {
        options,
        swap,
    };
    let mut out = String::new();
    writer.geometry(
        &mut out,
        geom,
        srs_attr.as_deref().unwrap_or(""),
        options.gml_id.as_deref(),
    )?;
    Ok(out)
}

/// Emit an envelope as the `gml:Box` fragment consumed by the XML-tree
/// collaborator.
pub fn envelope_to_gml_box(env: &Envelope, srs_name: Option<&str>) -> String {
    let mut out = String::new();
    match srs_name {
        Some(name) => out.push_str(&format!("<gml:Box srsName=\"{name}\">")),
        None => out.push_str("<gml:Box>"),
    }
    for (x, y) in [(env.min_x, env.min_y), (env.max_x, env.max_y)] {
        out.push_str(&format!(
            "<gml:coord><gml:X>{x}</gml:X><gml:Y>{y}</gml:Y></gml:coord>"
        ));
    }
    out.push_str("</gml:Box>");
    out
}

struct GmlWriter<'a> {
    options: &'a GmlOptions,
    swap: bool,
}

impl GmlWriter<'_> {
    fn gml3(&self) -> bool {
        self.options.format == GmlFormat::Gml3
    }

    /// Attribute text for a geometry element: srsName (outermost only),
    /// gml:id, and optionally srsDimension.
    fn element_attrs(&self, geom: &Geometry, srs_attr: &str, gml_id: Option<&str>) -> String {
        let mut attrs = String::from(srs_attr);
        if let Some(id) = gml_id {
            attrs.push_str(&format!(" gml:id=\"{id}\""));
        }
        if self.gml3()
            && geom.has_z()
            && matches!(
                self.options.srs_dimension_location,
                SrsDimensionLocation::Geometry | SrsDimensionLocation::Both
            )
        {
            attrs.push_str(" srsDimension=\"3\"");
        }
        attrs
    }

    fn pos_list_attrs(&self, geom: &Geometry) -> &'static str {
        if geom.has_z()
            && matches!(
                self.options.srs_dimension_location,
                SrsDimensionLocation::PosList | SrsDimensionLocation::Both
            )
        {
            " srsDimension=\"3\""
        } else {
            ""
        }
    }

    fn geometry(
        &self,
        out: &mut String,
        geom: &Geometry,
        srs_attr: &str,
        gml_id: Option<&str>,
    ) -> Result<()> {
        let attrs = self.element_attrs(geom, srs_attr, gml_id);
        match geom.kind() {
            GeometryKind::Point(coord) => {
                out.push_str(&format!("<gml:Point{attrs}>"));
                let coords = coord.as_slice();
                if self.gml3() {
                    out.push_str("<gml:pos>");
                    out.push_str(&self.pos_text(coords, geom.has_z()));
                    out.push_str("</gml:pos>");
                } else {
                    out.push_str("<gml:coordinates>");
                    out.push_str(&self.coordinates_text(coords, geom.has_z()));
                    out.push_str("</gml:coordinates>");
                }
                out.push_str("</gml:Point>");
            }
            GeometryKind::LineString(coords) | GeometryKind::CircularString(coords) => {
                if self.gml3() && self.options.linestring_as_curve {
                    out.push_str(&format!("<gml:Curve{attrs}><gml:segments><gml:LineStringSegment>"));
                    self.line_positions(out, geom, coords);
                    out.push_str("</gml:LineStringSegment></gml:segments></gml:Curve>");
                } else {
                    out.push_str(&format!("<gml:LineString{attrs}>"));
                    self.line_positions(out, geom, coords);
                    out.push_str("</gml:LineString>");
                }
            }
            GeometryKind::LinearRing(coords) => {
                out.push_str(&format!("<gml:LinearRing{attrs}>"));
                self.line_positions(out, geom, coords);
                out.push_str("</gml:LinearRing>");
            }
            GeometryKind::Polygon(rings) => {
                out.push_str(&format!("<gml:Polygon{attrs}>"));
                for (i, ring) in rings.iter().enumerate() {
                    let boundary = match (self.gml3(), i == 0) {
                        (false, true) => "outerBoundaryIs",
                        (false, false) => "innerBoundaryIs",
                        (true, true) => "exterior",
                        (true, false) => "interior",
                    };
                    out.push_str(&format!("<gml:{boundary}>"));
                    self.geometry(out, ring, "", None)?;
                    out.push_str(&format!("</gml:{boundary}>"));
                }
                out.push_str("</gml:Polygon>");
            }
            GeometryKind::MultiPoint(_)
            | GeometryKind::MultiLineString(_)
            | GeometryKind::MultiPolygon(_)
            | GeometryKind::GeometryCollection(_) => {
                let (container, member) = self.collection_names(geom);
                out.push_str(&format!("<gml:{container}{attrs}>"));
                for (i, child) in geom.children().iter().enumerate() {
                    let child_id = gml_id.map(|id| format!("{id}.{i}"));
                    out.push_str(&format!("<gml:{member}>"));
                    self.geometry(out, child, "", child_id.as_deref())?;
                    out.push_str(&format!("</gml:{member}>"));
                }
                out.push_str(&format!("</gml:{container}>"));
            }
            _ => {
                return Err(GeoWireError::UnsupportedGeometryType(format!(
                    "no GML encoding for {}",
                    geom.geometry_type()
                )))
            }
        }
        Ok(())
    }

    /// GML3 renames the line/polygon containers to reflect its richer type
    /// system; point containers keep their GML2 names.
    fn collection_names(&self, geom: &Geometry) -> (&'static str, &'static str) {
        match (geom.kind(), self.gml3()) {
            (GeometryKind::MultiPoint(_), _) => ("MultiPoint", "pointMember"),
            (GeometryKind::MultiLineString(_), false) => ("MultiLineString", "lineStringMember"),
            (GeometryKind::MultiLineString(_), true) => ("MultiCurve", "curveMember"),
            (GeometryKind::MultiPolygon(_), false) => ("MultiPolygon", "polygonMember"),
            (GeometryKind::MultiPolygon(_), true) => ("MultiSurface", "surfaceMember"),
            _ => ("MultiGeometry", "geometryMember"),
        }
    }

    fn line_positions(&self, out: &mut String, geom: &Geometry, coords: &[Coord]) {
        if self.gml3() {
            out.push_str(&format!("<gml:posList{}>", self.pos_list_attrs(geom)));
            out.push_str(&self.pos_text(coords, geom.has_z()));
            out.push_str("</gml:posList>");
        } else {
            out.push_str("<gml:coordinates>");
            out.push_str(&self.coordinates_text(coords, geom.has_z()));
            out.push_str("</gml:coordinates>");
        }
    }

    fn ordinates(&self, c: &Coord) -> (f64, f64) {
        if self.swap {
            (c.y, c.x)
        } else {
            (c.x, c.y)
        }
    }

    /// GML2 text: ordinates comma-separated within a tuple, tuples
    /// space-separated.
    fn coordinates_text(&self, coords: &[Coord], has_z: bool) -> String {
        let mut out = String::new();
        for (i, c) in coords.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let (first, second) = self.ordinates(c);
            out.push_str(&format!("{first},{second}"));
            if has_z {
                out.push_str(&format!(",{}", c.z));
            }
        }
        out
    }

    /// GML3 text: everything space-separated.
    fn pos_text(&self, coords: &[Coord], has_z: bool) -> String {
        let mut out = String::new();
        for (i, c) in coords.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let (first, second) = self.ordinates(c);
            out.push_str(&format!("{first} {second}"));
            if has_z {
                out.push_str(&format!(" {}", c.z));
            }
        }
        out
    }
}
