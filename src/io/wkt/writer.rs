//! WKT serialization.

use crate::datatypes::GeometryType;
use crate::geometry::{Coord, Geometry, GeometryKind};
use crate::io::wkt::WktVariant;

/// Serialize a geometry to WKT.
///
/// Doubles print through the standard formatter, which emits the shortest
/// representation that parses back to the identical value; no precision is
/// lost and no "pretty" rounding is applied.
pub fn to_wkt(geom: &Geometry, variant: WktVariant) -> String {
    let mut out = String::new();
    write_geometry(&mut out, geom, variant);
    out
}

fn write_geometry(out: &mut String, geom: &Geometry, variant: WktVariant) {
    out.push_str(geom.name());
    let z_tag = variant == WktVariant::Iso && geom.has_z();
    if z_tag {
        out.push_str(" Z");
    }
    // A geometry with no vertices anywhere prints the EMPTY form, never an
    // empty pair of parens.
    if geom.is_empty() {
        out.push_str(" EMPTY");
        return;
    }
    out.push(' ');
    write_body(out, geom, variant);
}

fn write_body(out: &mut String, geom: &Geometry, variant: WktVariant) {
    let has_z = geom.has_z();
    match geom.kind() {
        GeometryKind::Point(Some(c)) => {
            out.push('(');
            push_coord(out, c, has_z);
            out.push(')');
        }
        GeometryKind::Point(None) => unreachable!("empty handled by caller"),
        GeometryKind::LineString(coords)
        | GeometryKind::LinearRing(coords)
        | GeometryKind::CircularString(coords) => push_coord_list(out, coords, has_z),
        GeometryKind::Polygon(rings) => {
            out.push('(');
            for (i, ring) in rings.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                push_coord_list(out, ring.coords(), ring.has_z());
            }
            out.push(')');
        }
        GeometryKind::MultiPoint(children) => {
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                match (child.point_coord(), variant) {
                    (None, _) => out.push_str("EMPTY"),
                    (Some(c), WktVariant::Legacy) => push_coord(out, c, child.has_z()),
                    (Some(c), WktVariant::Iso) => {
                        out.push('(');
                        push_coord(out, c, child.has_z());
                        out.push(')');
                    }
                }
            }
            out.push(')');
        }
        GeometryKind::GeometryCollection(children) => {
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_geometry(out, child, variant);
            }
            out.push(')');
        }
        _ => {
            // Remaining containers print members with the implied type's
            // prefix stripped: a LineString inside a MULTICURVE is a bare
            // paren list, a CircularString keeps its keyword.
            out.push('(');
            for (i, child) in geom.children().iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if strips_prefix(geom.geometry_type(), child.geometry_type()) {
                    let mut child_text = String::new();
                    write_geometry(&mut child_text, child, variant);
                    out.push_str(strip_type_prefix(&child_text, child.name()));
                } else {
                    write_geometry(out, child, variant);
                }
            }
            out.push(')');
        }
    }
}

/// Whether a container implies (and therefore omits) its member's type
/// keyword.
fn strips_prefix(container: GeometryType, child: GeometryType) -> bool {
    use GeometryType::*;
    match container {
        MultiLineString => matches!(child, LineString | LinearRing),
        MultiPolygon | MultiSurface => child == Polygon,
        MultiCurve | CompoundCurve | CurvePolygon => matches!(child, LineString | LinearRing),
        _ => false,
    }
}

/// Drop a leading `TYPE ` or `TYPE Z ` from a child's WKT. A pure string
/// transform; the child is not re-parsed.
fn strip_type_prefix<'a>(wkt: &'a str, name: &str) -> &'a str {
    let rest = wkt.strip_prefix(name).unwrap_or(wkt).trim_start();
    if let Some(tagless) = rest.strip_prefix("Z ") {
        tagless.trim_start()
    } else {
        rest
    }
}

fn push_coord_list(out: &mut String, coords: &[Coord], has_z: bool) {
    out.push('(');
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_coord(out, c, has_z);
    }
    out.push(')');
}

fn push_coord(out: &mut String, c: &Coord, has_z: bool) {
    out.push_str(&format_double(c.x));
    out.push(' ');
    out.push_str(&format_double(c.y));
    if has_z {
        out.push(' ');
        out.push_str(&format_double(c.z));
    }
}

fn format_double(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datatypes::GeometryType;
    use crate::io::wkt::from_wkt;

    fn round_trip(text: &str) {
        let geom = from_wkt(text).unwrap();
        for variant in [WktVariant::Legacy, WktVariant::Iso] {
            let emitted = to_wkt(&geom, variant);
            let back = from_wkt(&emitted).unwrap();
            assert_eq!(back, geom, "via {variant:?}: {emitted}");
        }
    }

    #[test]
    fn round_trips_per_type() {
        for text in [
            "POINT (1 2)",
            "POINT Z (1 2 3)",
            "POINT EMPTY",
            "LINESTRING (0 0,1 2,3 -4.5)",
            "LINESTRING Z (0 0 1,1 2 3)",
            "LINESTRING EMPTY",
            "POLYGON ((0 0,10 0,10 10,0 10,0 0),(1 1,2 1,2 2,1 1))",
            "MULTIPOINT (1 2,3 4)",
            "MULTIPOINT EMPTY",
            "MULTILINESTRING ((0 0,1 1),(2 2,3 3))",
            "MULTIPOLYGON (((0 0,1 0,1 1,0 0)),((5 5,6 5,6 6,5 5)))",
            "GEOMETRYCOLLECTION (POINT (1 2),LINESTRING (0 0,1 1))",
            "GEOMETRYCOLLECTION EMPTY",
            "CIRCULARSTRING (0 0,1 1,2 0)",
            "COMPOUNDCURVE ((0 0,1 0),CIRCULARSTRING (1 0,2 1,3 0))",
            "CURVEPOLYGON (CIRCULARSTRING (0 0,1 1,2 0,1 -1,0 0))",
            "MULTICURVE ((0 0,1 1),CIRCULARSTRING (0 0,1 1,2 0))",
            "MULTISURFACE (((0 0,1 0,1 1,0 0)),CURVEPOLYGON (CIRCULARSTRING (0 0,1 1,2 0,1 -1,0 0)))",
        ] {
            round_trip(text);
        }
    }

    #[test]
    fn legacy_vs_iso_forms() {
        let point = Geometry::point_z(1.0, 2.0, 3.0);
        assert_eq!(to_wkt(&point, WktVariant::Legacy), "POINT (1 2 3)");
        assert_eq!(to_wkt(&point, WktVariant::Iso), "POINT Z (1 2 3)");

        let geom = from_wkt("MULTIPOINT ((1 2),(3 4))").unwrap();
        assert_eq!(to_wkt(&geom, WktVariant::Legacy), "MULTIPOINT (1 2,3 4)");
        assert_eq!(to_wkt(&geom, WktVariant::Iso), "MULTIPOINT ((1 2),(3 4))");
    }

    #[test]
    fn empty_forms() {
        let geom = from_wkt("POINT Z EMPTY").unwrap();
        assert_eq!(to_wkt(&geom, WktVariant::Legacy), "POINT EMPTY");
        assert_eq!(to_wkt(&geom, WktVariant::Iso), "POINT Z EMPTY");

        // All-children-empty collections print EMPTY rather than parens.
        let mut mp = Geometry::empty_of_type(GeometryType::MultiPolygon).unwrap();
        mp.add_child(Geometry::empty_of_type(GeometryType::Polygon).unwrap())
            .unwrap();
        assert_eq!(to_wkt(&mp, WktVariant::Legacy), "MULTIPOLYGON EMPTY");
    }

    #[test]
    fn prefix_stripping_keeps_arc_keywords() {
        let geom = from_wkt("MULTICURVE ((0 0,1 1),CIRCULARSTRING (0 0,1 1,2 0))").unwrap();
        assert_eq!(
            to_wkt(&geom, WktVariant::Legacy),
            "MULTICURVE ((0 0,1 1),CIRCULARSTRING (0 0,1 1,2 0))"
        );
    }

    #[test]
    fn doubles_print_round_trip_exact() {
        let values = [0.1, 1.0 / 3.0, -2.5e-10, 123456789.123456789];
        for v in values {
            let geom = Geometry::point(v, -v);
            let text = to_wkt(&geom, WktVariant::Legacy);
            assert_eq!(from_wkt(&text).unwrap(), geom, "{text}");
        }
    }
}
