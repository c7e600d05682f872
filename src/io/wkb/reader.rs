//! WKB deserialization.

use std::io::Cursor;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::datatypes::GeometryType;
use crate::error::{GeoWireError, Result};
use crate::geometry::{Coord, Geometry};
use crate::io::wkb::{decode_type_code, Endianness};
use crate::io::MAX_NESTING_DEPTH;

/// Deserialize a geometry from a WKB buffer, accepting all three type-code
/// dialects and both byte orders. Trailing bytes after a complete geometry
/// are ignored, as collections embed children with no length prefix and the
/// caller may be carving geometries out of a larger stream.
pub fn from_wkb(buf: &[u8]) -> Result<Geometry> {
    let mut srid = None;
    let mut cursor = Cursor::new(buf);
    read_geometry(&mut cursor, 0, &mut srid)
}

/// Deserialize EWKB: the embedded SRID, when the flag bit is set, is excised
/// from the type code and returned alongside the geometry.
pub fn from_ewkb(buf: &[u8]) -> Result<(Geometry, Option<i32>)> {
    let mut srid = None;
    let mut cursor = Cursor::new(buf);
    let geom = read_geometry(&mut cursor, 0, &mut srid)?;
    Ok((geom, srid))
}

/// Deserialize a geometry whose type is known up front; a buffer declaring
/// any other type is corrupt.
pub fn from_wkb_as(buf: &[u8], expected: GeometryType) -> Result<Geometry> {
    let geom = from_wkb(buf)?;
    if geom.geometry_type() != expected {
        return Err(GeoWireError::CorruptData(format!(
            "expected WKB for {expected}, found {}",
            geom.geometry_type()
        )));
    }
    Ok(geom)
}

fn truncated(cursor: &Cursor<&[u8]>) -> GeoWireError {
    GeoWireError::NotEnoughData(format!(
        "WKB buffer of {} bytes ends before offset {}",
        cursor.get_ref().len(),
        cursor.position()
    ))
}

fn read_u32(cursor: &mut Cursor<&[u8]>, order: Endianness) -> Result<u32> {
    match order {
        Endianness::BigEndian => cursor.read_u32::<BigEndian>(),
        Endianness::LittleEndian => cursor.read_u32::<LittleEndian>(),
    }
    .map_err(|_| truncated(cursor))
}

fn read_i32(cursor: &mut Cursor<&[u8]>, order: Endianness) -> Result<i32> {
    match order {
        Endianness::BigEndian => cursor.read_i32::<BigEndian>(),
        Endianness::LittleEndian => cursor.read_i32::<LittleEndian>(),
    }
    .map_err(|_| truncated(cursor))
}

fn read_f64(cursor: &mut Cursor<&[u8]>, order: Endianness) -> Result<f64> {
    match order {
        Endianness::BigEndian => cursor.read_f64::<BigEndian>(),
        Endianness::LittleEndian => cursor.read_f64::<LittleEndian>(),
    }
    .map_err(|_| truncated(cursor))
}

fn read_coord(cursor: &mut Cursor<&[u8]>, order: Endianness, has_z: bool) -> Result<Coord> {
    let x = read_f64(cursor, order)?;
    let y = read_f64(cursor, order)?;
    let z = if has_z { read_f64(cursor, order)? } else { 0.0 };
    Ok(Coord::new_z(x, y, z))
}

/// Read an element count and verify the remaining buffer can hold that many
/// elements of at least `min_item_size` bytes, before anything is allocated.
fn read_count(cursor: &mut Cursor<&[u8]>, order: Endianness, min_item_size: usize) -> Result<usize> {
    let count = read_u32(cursor, order)? as usize;
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    let needed = count as u64 * min_item_size as u64;
    if needed > remaining {
        return Err(GeoWireError::NotEnoughData(format!(
            "declared count {count} needs at least {needed} bytes, {remaining} remain"
        )));
    }
    Ok(count)
}

fn read_coord_sequence(
    cursor: &mut Cursor<&[u8]>,
    order: Endianness,
    has_z: bool,
) -> Result<Vec<Coord>> {
    let coord_size = if has_z { 24 } else { 16 };
    let count = read_count(cursor, order, coord_size)?;
    let mut coords = Vec::with_capacity(count);
    for _ in 0..count {
        coords.push(read_coord(cursor, order, has_z)?);
    }
    Ok(coords)
}

/// Which child types a container accepts on the wire; a mismatching child
/// code means the buffer is internally inconsistent.
fn wire_compatible(container: GeometryType, child: GeometryType) -> bool {
    use GeometryType::*;
    match container {
        CompoundCurve => matches!(child, LineString | CircularString),
        CurvePolygon => matches!(child, LineString | CircularString | CompoundCurve),
        other => Geometry::is_compatible_subtype(other, child),
    }
}

pub(crate) fn read_geometry(
    cursor: &mut Cursor<&[u8]>,
    depth: u32,
    srid_out: &mut Option<i32>,
) -> Result<Geometry> {
    let order_byte = cursor.read_u8().map_err(|_| truncated(cursor))?;
    let order = Endianness::try_from(order_byte)?;
    let raw_code = read_u32(cursor, order)?;
    let decoded = decode_type_code(raw_code)?;
    if decoded.has_srid {
        let srid = read_i32(cursor, order)?;
        if depth == 0 {
            *srid_out = Some(srid);
        }
    }
    let has_z = decoded.has_z;

    use GeometryType::*;
    match decoded.geometry_type {
        Point => {
            let c = read_coord(cursor, order, has_z)?;
            let mut geom = if c.x.is_nan() && c.y.is_nan() {
                Geometry::point_empty()
            } else if has_z {
                Geometry::point_z(c.x, c.y, c.z)
            } else {
                Geometry::point(c.x, c.y)
            };
            if has_z && geom.is_empty() {
                geom.set_3d(true);
            }
            Ok(geom)
        }
        LineString => {
            let coords = read_coord_sequence(cursor, order, has_z)?;
            Ok(Geometry::line_string(coords, has_z))
        }
        CircularString => {
            let coords = read_coord_sequence(cursor, order, has_z)?;
            Ok(Geometry::circular_string(coords, has_z))
        }
        Polygon => {
            // Rings are bare point sequences, not nested geometries.
            let ring_count = read_count(cursor, order, 4)?;
            let mut poly = Geometry::empty_of_type(Polygon).expect("constructible type");
            poly.set_3d(has_z);
            for _ in 0..ring_count {
                let coords = read_coord_sequence(cursor, order, has_z)?;
                poly.push_child_unchecked(Geometry::linear_ring(coords, has_z));
            }
            Ok(poly)
        }
        container @ (CompoundCurve | CurvePolygon | MultiPoint | MultiLineString | MultiPolygon
        | MultiCurve | MultiSurface | GeometryCollection) => {
            if depth + 1 >= MAX_NESTING_DEPTH {
                return Err(GeoWireError::CorruptData(format!(
                    "geometry containers nested {MAX_NESTING_DEPTH} levels or more"
                )));
            }
            let child_count = read_count(cursor, order, 5)?;
            let mut out = Geometry::empty_of_type(container).expect("constructible type");
            out.set_3d(has_z);
            for _ in 0..child_count {
                let child = read_geometry(cursor, depth + 1, srid_out)?;
                if !wire_compatible(container, child.geometry_type()) {
                    return Err(GeoWireError::CorruptData(format!(
                        "{} is not a valid WKB member of {container}",
                        child.geometry_type()
                    )));
                }
                out.push_child_unchecked(child);
            }
            Ok(out)
        }
        other => Err(GeoWireError::UnsupportedGeometryType(format!(
            "cannot parse WKB payload of type {other}"
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::io::wkb::{to_wkb, WkbWriteOptions};

    // 'POINT (10 -20)', little endian, from a PostGIS fixture.
    const POINT_LE: &str = "0101000000000000000000244000000000000034C0";
    // 'SRID=4326;POINT (10 -20)'
    const POINT_SRID: &str = "0101000020E6100000000000000000244000000000000034C0";

    #[test]
    fn point_from_hex_fixture() {
        let buf = hex::decode(POINT_LE).unwrap();
        let geom = from_wkb(&buf).unwrap();
        assert_eq!(geom, Geometry::point(10.0, -20.0));
    }

    #[test]
    fn ewkb_srid_is_extracted_and_excised() {
        let buf = hex::decode(POINT_SRID).unwrap();
        let (geom, srid) = from_ewkb(&buf).unwrap();
        assert_eq!(srid, Some(4326));
        assert_eq!(geom, Geometry::point(10.0, -20.0));
        // The plain entry point parses the same buffer and drops the SRID.
        assert_eq!(from_wkb(&buf).unwrap(), geom);
    }

    #[test]
    fn ewkb_xyzm_always_fails() {
        // 'POINT ZM (10 -20 100 1)'
        let buf = hex::decode(
            "01010000C0000000000000244000000000000034C00000000000005940000000000000F03F",
        )
        .unwrap();
        assert!(matches!(
            from_wkb(&buf),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn big_endian_point() {
        // 'POINT (1 2)' in XDR order.
        let mut buf = vec![0u8];
        buf.extend_from_slice(&1u32.to_be_bytes());
        buf.extend_from_slice(&1.0f64.to_be_bytes());
        buf.extend_from_slice(&2.0f64.to_be_bytes());
        assert_eq!(from_wkb(&buf).unwrap(), Geometry::point(1.0, 2.0));
    }

    #[test]
    fn truncated_buffers_never_read_past_the_end() {
        let full = to_wkb(
            &Geometry::line_string(
                vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0), Coord::new(2.0, 0.0)],
                false,
            ),
            &WkbWriteOptions::default(),
        )
        .unwrap();
        for len in 0..full.len() {
            let err = from_wkb(&full[..len]).unwrap_err();
            assert!(
                matches!(
                    err,
                    GeoWireError::NotEnoughData(_) | GeoWireError::CorruptData(_)
                ),
                "unexpected error at length {len}: {err:?}"
            );
        }
    }

    #[test]
    fn absurd_count_is_rejected_before_allocation() {
        // LINESTRING declaring u32::MAX points in a 13-byte buffer.
        let mut buf = vec![1u8];
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            from_wkb(&buf),
            Err(GeoWireError::NotEnoughData(_))
        ));
    }

    #[test]
    fn bad_byte_order_flag_is_corrupt() {
        let mut buf = vec![7u8];
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 16]);
        assert!(matches!(from_wkb(&buf), Err(GeoWireError::CorruptData(_))));
    }

    #[test]
    fn collection_child_of_wrong_type_is_corrupt() {
        // MULTIPOINT declaring one child, whose payload is a LINESTRING.
        let mut buf = vec![1u8];
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(1u8);
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(from_wkb(&buf), Err(GeoWireError::CorruptData(_))));
    }

    #[test]
    fn declared_type_mismatch_is_corrupt() {
        let buf = hex::decode(POINT_LE).unwrap();
        assert!(from_wkb_as(&buf, GeometryType::Point).is_ok());
        assert!(matches!(
            from_wkb_as(&buf, GeometryType::LineString),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    fn nested_collection(levels: u32) -> Vec<u8> {
        // `levels` GEOMETRYCOLLECTIONs around a single POINT.
        let mut buf = Vec::new();
        for _ in 0..levels {
            buf.push(1u8);
            buf.extend_from_slice(&7u32.to_le_bytes());
            buf.extend_from_slice(&1u32.to_le_bytes());
        }
        buf.push(1u8);
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&1.0f64.to_le_bytes());
        buf.extend_from_slice(&2.0f64.to_le_bytes());
        buf
    }

    #[test]
    fn recursion_guard_boundary() {
        assert!(from_wkb(&nested_collection(31)).is_ok());
        assert!(matches!(
            from_wkb(&nested_collection(32)),
            Err(GeoWireError::CorruptData(_))
        ));
    }
}
