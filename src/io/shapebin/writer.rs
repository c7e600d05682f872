//! ShapeBin record encoding.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::datatypes::GeometryType;
use crate::error::{GeoWireError, Result};
use crate::geometry::{ring_is_clockwise, Coord, Geometry, GeometryKind};
use crate::io::shapebin::*;

/// Encode a geometry as a Shapefile/FileGDB record. Null or empty input
/// produces the 4-byte null-shape record.
///
/// Polygon rings must be closed (first vertex equals last, at least 4
/// vertices); the format requires exterior rings clockwise and holes
/// counter-clockwise, so rings with the wrong detected orientation are
/// written reversed.
pub fn to_shape_bin(geom: &Geometry) -> Result<Vec<u8>> {
    if geom.is_empty() {
        let mut out = Vec::with_capacity(4);
        out.write_u32::<LittleEndian>(SHPT_NULL)?;
        return Ok(out);
    }

    let has_z = geom.has_z();
    match geom.kind() {
        GeometryKind::Point(Some(c)) => {
            let mut out = Vec::with_capacity(4 + 8 * geom.coord_dimension() as usize);
            out.write_u32::<LittleEndian>(if has_z { SHPT_POINTZ } else { SHPT_POINT })?;
            out.write_f64::<LittleEndian>(c.x)?;
            out.write_f64::<LittleEndian>(c.y)?;
            if has_z {
                out.write_f64::<LittleEndian>(c.z)?;
            }
            Ok(out)
        }
        GeometryKind::MultiPoint(children) => {
            let coords: Vec<Coord> = children
                .iter()
                .filter_map(|p| p.point_coord().copied())
                .collect();
            let code = if has_z { SHPT_MULTIPOINTZ } else { SHPT_MULTIPOINT };
            write_multipoint(geom, code, &coords, has_z)
        }
        GeometryKind::LineString(_) | GeometryKind::MultiLineString(_) => {
            let parts: Vec<&[Coord]> = match geom.kind() {
                GeometryKind::LineString(coords) => vec![coords.as_slice()],
                GeometryKind::MultiLineString(children) => children
                    .iter()
                    .filter(|c| !c.is_empty())
                    .map(|c| c.coords())
                    .collect(),
                _ => unreachable!(),
            };
            let owned: Vec<Vec<Coord>> = parts.iter().map(|p| p.to_vec()).collect();
            let code = if has_z { SHPT_ARCZ } else { SHPT_ARC };
            write_multipart(geom, code, &owned, has_z, None)
        }
        GeometryKind::Polygon(_) | GeometryKind::MultiPolygon(_) => {
            let polygons: Vec<&Geometry> = match geom.kind() {
                GeometryKind::Polygon(_) => vec![geom],
                GeometryKind::MultiPolygon(children) => {
                    children.iter().filter(|p| !p.is_empty()).collect()
                }
                _ => unreachable!(),
            };
            let mut parts: Vec<Vec<Coord>> = Vec::new();
            for poly in &polygons {
                collect_oriented_rings(poly, &mut parts)?;
            }
            let code = if has_z { SHPT_POLYGONZ } else { SHPT_POLYGON };
            write_multipart(geom, code, &parts, has_z, None)
        }
        _ => Err(GeoWireError::UnsupportedGeometryType(format!(
            "{} has no shape record encoding",
            geom.geometry_type()
        ))),
    }
}

/// Gather a polygon's rings in wire orientation: exterior clockwise, holes
/// counter-clockwise, reversing where the detected winding disagrees.
fn collect_oriented_rings(poly: &Geometry, parts: &mut Vec<Vec<Coord>>) -> Result<()> {
    for (i, ring) in poly.children().iter().enumerate() {
        let coords = ring.coords();
        if coords.len() < 4 || !ring.is_closed() {
            return Err(GeoWireError::CorruptData(format!(
                "polygon ring {i} is not closed (need >= 4 vertices with first == last)"
            )));
        }
        let want_clockwise = i == 0;
        let mut out = coords.to_vec();
        if ring_is_clockwise(coords) != want_clockwise {
            out.reverse();
        }
        parts.push(out);
    }
    Ok(())
}

fn write_xy_box(out: &mut Vec<u8>, geom: &Geometry) -> Result<()> {
    let env = geom.envelope();
    out.write_f64::<LittleEndian>(env.min_x)?;
    out.write_f64::<LittleEndian>(env.min_y)?;
    out.write_f64::<LittleEndian>(env.max_x)?;
    out.write_f64::<LittleEndian>(env.max_y)?;
    Ok(())
}

/// The Z range and Z ordinates trail all XY point data.
fn write_z_block(out: &mut Vec<u8>, geom: &Geometry, coords: &[Coord]) -> Result<()> {
    let env = geom.envelope3d();
    out.write_f64::<LittleEndian>(env.min_z)?;
    out.write_f64::<LittleEndian>(env.max_z)?;
    for c in coords {
        out.write_f64::<LittleEndian>(c.z)?;
    }
    Ok(())
}

fn write_multipoint(geom: &Geometry, code: u32, coords: &[Coord], has_z: bool) -> Result<Vec<u8>> {
    let n = coords.len();
    let mut size = 4 + 32 + 4 + 16 * n;
    if has_z {
        size += 16 + 8 * n;
    }
    let mut out = Vec::with_capacity(size);
    out.write_u32::<LittleEndian>(code)?;
    write_xy_box(&mut out, geom)?;
    out.write_u32::<LittleEndian>(n as u32)?;
    for c in coords {
        out.write_f64::<LittleEndian>(c.x)?;
        out.write_f64::<LittleEndian>(c.y)?;
    }
    if has_z {
        write_z_block(&mut out, geom, coords)?;
    }
    Ok(out)
}

fn write_multipart(
    geom: &Geometry,
    code: u32,
    parts: &[Vec<Coord>],
    has_z: bool,
    part_types: Option<&[i32]>,
) -> Result<Vec<u8>> {
    let n_points: usize = parts.iter().map(Vec::len).sum();
    let mut size = 4 + 32 + 8 + 4 * parts.len() + 16 * n_points;
    if part_types.is_some() {
        size += 4 * parts.len();
    }
    if has_z {
        size += 16 + 8 * n_points;
    }
    let mut out = Vec::with_capacity(size);
    out.write_u32::<LittleEndian>(code)?;
    write_xy_box(&mut out, geom)?;
    out.write_u32::<LittleEndian>(parts.len() as u32)?;
    out.write_u32::<LittleEndian>(n_points as u32)?;
    let mut start = 0u32;
    for part in parts {
        out.write_u32::<LittleEndian>(start)?;
        start += part.len() as u32;
    }
    if let Some(types) = part_types {
        for &t in types {
            out.write_i32::<LittleEndian>(t)?;
        }
    }
    let flat: Vec<Coord> = parts.iter().flatten().copied().collect();
    for c in &flat {
        out.write_f64::<LittleEndian>(c.x)?;
        out.write_f64::<LittleEndian>(c.y)?;
    }
    if has_z {
        write_z_block(&mut out, geom, &flat)?;
    }
    Ok(out)
}

/// Encode a polygonal geometry as a MultiPatch record.
///
/// Single-ring 4-vertex polygons become triangle parts, coalesced into
/// strips or fans when consecutive triangles share the edge the respective
/// part type implies; other polygons emit an OuterRing part followed by an
/// InnerRing part per hole. MultiPatch records always carry Z.
pub fn multipatch_to_shape_bin(geom: &Geometry) -> Result<Vec<u8>> {
    let polygons: Vec<&Geometry> = match geom.kind() {
        GeometryKind::Polygon(_) => vec![geom],
        GeometryKind::MultiPolygon(children) => {
            children.iter().filter(|p| !p.is_empty()).collect()
        }
        _ => {
            return Err(GeoWireError::UnsupportedGeometryType(format!(
                "{} cannot be written as a multipatch",
                geom.geometry_type()
            )))
        }
    };

    let mut part_starts: Vec<u32> = Vec::new();
    let mut part_types: Vec<i32> = Vec::new();
    let mut points: Vec<Coord> = Vec::new();
    let mut begin_last_part = 0usize;

    for poly in &polygons {
        let rings = poly.children();
        let shell = match rings.first() {
            Some(shell) => shell,
            None => continue,
        };
        for (i, ring) in rings.iter().enumerate() {
            if ring.coords().len() < 4 || !ring.is_closed() {
                return Err(GeoWireError::CorruptData(format!(
                    "polygon ring {i} is not closed (need >= 4 vertices with first == last)"
                )));
            }
        }

        let shell_coords = shell.coords();
        if rings.len() == 1 && shell_coords.len() == 4 {
            let tri = &shell_coords[0..3];
            let last_type = part_types.last().copied();
            let last_len = part_starts
                .last()
                .map(|&s| points.len() - s as usize)
                .unwrap_or(0);
            let continues_fan = !points.is_empty()
                && (last_type == Some(SHPP_TRIFAN)
                    || (last_type == Some(SHPP_TRIANGLES) && last_len == 3))
                && tri[0] == points[begin_last_part]
                && tri[1] == points[points.len() - 1];
            let continues_strip = !points.is_empty()
                && (last_type == Some(SHPP_TRISTRIP)
                    || (last_type == Some(SHPP_TRIANGLES) && last_len == 3))
                && tri[0] == points[points.len() - 2]
                && tri[1] == points[points.len() - 1];
            if continues_fan {
                *part_types.last_mut().expect("non-empty parts") = SHPP_TRIFAN;
                points.push(tri[2]);
            } else if continues_strip {
                *part_types.last_mut().expect("non-empty parts") = SHPP_TRISTRIP;
                points.push(tri[2]);
            } else {
                if part_types.last() != Some(&SHPP_TRIANGLES) {
                    begin_last_part = points.len();
                    part_starts.push(points.len() as u32);
                    part_types.push(SHPP_TRIANGLES);
                }
                points.extend_from_slice(tri);
            }
        } else {
            for (i, ring) in rings.iter().enumerate() {
                part_starts.push(points.len() as u32);
                part_types.push(if i == 0 { SHPP_OUTERRING } else { SHPP_INNERRING });
                points.extend_from_slice(ring.coords());
            }
        }
    }

    let size = 4 + 32 + 8 + 8 * part_starts.len() + 16 * points.len() + 16 + 8 * points.len();
    let mut out = Vec::with_capacity(size);
    out.write_u32::<LittleEndian>(SHPT_MULTIPATCH)?;
    write_xy_box(&mut out, geom)?;
    out.write_u32::<LittleEndian>(part_starts.len() as u32)?;
    out.write_u32::<LittleEndian>(points.len() as u32)?;
    for &s in &part_starts {
        out.write_u32::<LittleEndian>(s)?;
    }
    for &t in &part_types {
        out.write_i32::<LittleEndian>(t)?;
    }
    for c in &points {
        out.write_f64::<LittleEndian>(c.x)?;
        out.write_f64::<LittleEndian>(c.y)?;
    }
    write_z_block(&mut out, geom, &points)?;
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::shapebin::from_shape_bin;

    fn cw_square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::linear_ring(
            vec![
                Coord::new(x0, y0),
                Coord::new(x0, y0 + size),
                Coord::new(x0 + size, y0 + size),
                Coord::new(x0 + size, y0),
                Coord::new(x0, y0),
            ],
            false,
        )
    }

    fn ccw_square(x0: f64, y0: f64, size: f64) -> Geometry {
        Geometry::linear_ring(
            vec![
                Coord::new(x0, y0),
                Coord::new(x0 + size, y0),
                Coord::new(x0 + size, y0 + size),
                Coord::new(x0, y0 + size),
                Coord::new(x0, y0),
            ],
            false,
        )
    }

    #[test]
    fn empty_geometry_writes_the_null_record() {
        let out = to_shape_bin(&Geometry::point_empty()).unwrap();
        assert_eq!(out, vec![0, 0, 0, 0]);
        assert!(from_shape_bin(&out).unwrap().is_none());
    }

    #[test]
    fn exterior_forced_clockwise_and_holes_counter_clockwise() {
        let mut poly = Geometry::empty_of_type(GeometryType::Polygon).unwrap();
        // Exterior given counter-clockwise, hole given clockwise: both have
        // the wrong orientation for the format and must come out reversed.
        poly.add_ring(ccw_square(0.0, 0.0, 10.0)).unwrap();
        poly.add_ring(cw_square(2.0, 2.0, 2.0)).unwrap();
        let record = to_shape_bin(&poly).unwrap();

        let back = from_shape_bin(&record).unwrap().unwrap();
        assert_eq!(back.geometry_type(), GeometryType::Polygon);
        let shell = back.exterior_ring().unwrap();
        assert!(ring_is_clockwise(shell.coords()));
        assert!(!ring_is_clockwise(back.interior_ring(0).unwrap().coords()));
        assert_eq!(back.num_interior_rings(), 1);
    }

    #[test]
    fn open_ring_fails_the_writer() {
        let mut poly = Geometry::empty_of_type(GeometryType::Polygon).unwrap();
        poly.push_child_unchecked(Geometry::linear_ring(
            vec![Coord::new(0.0, 0.0), Coord::new(1.0, 0.0), Coord::new(1.0, 1.0)],
            false,
        ));
        assert!(matches!(
            to_shape_bin(&poly),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn line_strings_round_trip() {
        let ls = Geometry::line_string(
            vec![Coord::new(0.0, 0.0), Coord::new(1.0, 2.0), Coord::new(3.0, -1.0)],
            false,
        );
        let back = from_shape_bin(&to_shape_bin(&ls).unwrap()).unwrap().unwrap();
        assert_eq!(back, ls);

        let mut ml = Geometry::empty_of_type(GeometryType::MultiLineString).unwrap();
        ml.add_child(ls.clone()).unwrap();
        ml.add_child(Geometry::line_string(
            vec![Coord::new(5.0, 5.0), Coord::new(6.0, 6.0)],
            false,
        ))
        .unwrap();
        let back = from_shape_bin(&to_shape_bin(&ml).unwrap()).unwrap().unwrap();
        assert_eq!(back, ml);
    }

    #[test]
    fn z_geometries_carry_the_appended_z_blocks() {
        let ls = Geometry::line_string(
            vec![Coord::new_z(0.0, 0.0, 5.0), Coord::new_z(1.0, 1.0, 7.0)],
            true,
        );
        let record = to_shape_bin(&ls).unwrap();
        // code + box + counts + one part index + 2 xy + z box + 2 z.
        assert_eq!(record.len(), 4 + 32 + 8 + 4 + 32 + 16 + 16);
        // The Z range block sits after all XY data.
        let z_min = f64::from_le_bytes(record[80..88].try_into().unwrap());
        let z_max = f64::from_le_bytes(record[88..96].try_into().unwrap());
        assert_eq!((z_min, z_max), (5.0, 7.0));
        let back = from_shape_bin(&record).unwrap().unwrap();
        assert_eq!(back, ls);
    }

    #[test]
    fn multipoint_round_trips() {
        let mut mp = Geometry::empty_of_type(GeometryType::MultiPoint).unwrap();
        mp.add_child(Geometry::point_z(1.0, 2.0, 3.0)).unwrap();
        mp.add_child(Geometry::point_z(4.0, 5.0, 6.0)).unwrap();
        let back = from_shape_bin(&to_shape_bin(&mp).unwrap()).unwrap().unwrap();
        assert_eq!(back, mp);
    }

    #[test]
    fn unsupported_types_are_refused() {
        let cs = Geometry::circular_string(
            vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0), Coord::new(2.0, 0.0)],
            false,
        );
        assert!(matches!(
            to_shape_bin(&cs),
            Err(GeoWireError::UnsupportedGeometryType(_))
        ));
    }

    #[test]
    fn multipatch_writer_emits_ring_parts() {
        let mut mp = Geometry::empty_of_type(GeometryType::MultiPolygon).unwrap();
        let mut poly = Geometry::empty_of_type(GeometryType::Polygon).unwrap();
        poly.add_ring(cw_square(0.0, 0.0, 10.0)).unwrap();
        poly.add_ring(ccw_square(2.0, 2.0, 2.0)).unwrap();
        mp.add_child(poly).unwrap();

        let record = multipatch_to_shape_bin(&mp).unwrap();
        let back = from_shape_bin(&record).unwrap().unwrap();
        assert_eq!(back.geometry_type(), GeometryType::MultiPolygon);
        assert_eq!(back.num_children(), 1);
        assert_eq!(back.children()[0].num_interior_rings(), 1);
    }

    #[test]
    fn multipatch_writer_coalesces_triangles() {
        // Two triangles sharing an edge in strip order, as 4-point rings.
        let t = |a: (f64, f64), b: (f64, f64), c: (f64, f64)| {
            let mut poly = Geometry::empty_of_type(GeometryType::Polygon).unwrap();
            poly.push_child_unchecked(Geometry::linear_ring(
                vec![
                    Coord::new(a.0, a.1),
                    Coord::new(b.0, b.1),
                    Coord::new(c.0, c.1),
                    Coord::new(a.0, a.1),
                ],
                false,
            ));
            poly
        };
        let mut mp = Geometry::empty_of_type(GeometryType::MultiPolygon).unwrap();
        mp.add_child(t((0.0, 0.0), (1.0, 0.0), (0.0, 1.0))).unwrap();
        mp.add_child(t((1.0, 0.0), (0.0, 1.0), (1.0, 1.0))).unwrap();
        let record = multipatch_to_shape_bin(&mp).unwrap();

        // One coalesced strip part of 4 points.
        let n_parts = u32::from_le_bytes(record[36..40].try_into().unwrap());
        let n_points = u32::from_le_bytes(record[40..44].try_into().unwrap());
        assert_eq!(n_parts, 1);
        assert_eq!(n_points, 4);
        let part_type = i32::from_le_bytes(record[48..52].try_into().unwrap());
        assert_eq!(part_type, SHPP_TRISTRIP);

        let back = from_shape_bin(&record).unwrap().unwrap();
        assert_eq!(back.num_children(), 2);
    }
}
