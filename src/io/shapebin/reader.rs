//! ShapeBin record decoding.

use std::io::Read;

use byteorder::{ByteOrder as _, LittleEndian};
use flate2::read::ZlibDecoder;

use crate::algorithm::organize::organize_polygons;
use crate::datatypes::GeometryType;
use crate::error::{GeoWireError, Result};
use crate::geometry::{Coord, Geometry};
use crate::io::shapebin::multipatch::multipatch_to_geometry;
use crate::io::shapebin::*;

/// Decode one geometry record. A null shape (type 0) decodes to `None`:
/// "no geometry here", not an error.
///
/// All declared counts are validated and the exact required byte length is
/// compared against the buffer before anything is allocated or any byte
/// beyond the header is read.
pub fn from_shape_bin(buf: &[u8]) -> Result<Option<Geometry>> {
    if buf.len() < 4 {
        return Err(GeoWireError::NotEnoughData(format!(
            "shape buffer of {} bytes is too small",
            buf.len()
        )));
    }

    // Zlib-compressed shapes: magic at offset 12, little-endian
    // uncompressed/compressed sizes at offsets 4 and 8.
    if buf.len() >= 14 && buf[12] == 0x78 && buf[13] == 0xDA {
        let uncompressed_size = LittleEndian::read_i32(&buf[4..8]);
        let compressed_size = LittleEndian::read_i32(&buf[8..12]);
        if compressed_size as usize + 12 == buf.len() && uncompressed_size > 0 {
            let inflated = inflate(&buf[12..], uncompressed_size as usize)?;
            return from_shape_bin(&inflated);
        }
    }

    let raw_type = LittleEndian::read_u32(&buf[0..4]);
    if raw_type == SHPT_NULL {
        return Ok(None);
    }

    let low = raw_type & 0xFF;
    let is_extended = (SHPT_GENERALPOLYLINE..=SHPT_GENERALMULTIPATCH).contains(&low);
    let has_z = matches!(
        low,
        SHPT_POINTZ
            | SHPT_POINTZM
            | SHPT_MULTIPOINTZ
            | SHPT_MULTIPOINTZM
            | SHPT_POLYGONZ
            | SHPT_POLYGONZM
            | SHPT_ARCZ
            | SHPT_ARCZM
            | SHPT_MULTIPATCH
            | SHPT_MULTIPATCHM
    ) || (is_extended && raw_type & 0x8000_0000 != 0);
    let has_m = matches!(
        low,
        SHPT_POINTM
            | SHPT_POINTZM
            | SHPT_MULTIPOINTM
            | SHPT_MULTIPOINTZM
            | SHPT_POLYGONM
            | SHPT_POLYGONZM
            | SHPT_ARCM
            | SHPT_ARCZM
            | SHPT_MULTIPATCHM
    ) || (is_extended && raw_type & 0x4000_0000 != 0);

    // Extended "general" types map down to their base types.
    let base = match low {
        SHPT_GENERALPOLYLINE => SHPT_ARC,
        SHPT_GENERALPOLYGON => SHPT_POLYGON,
        SHPT_GENERALPOINT => SHPT_POINT,
        SHPT_GENERALMULTIPOINT => SHPT_MULTIPOINT,
        SHPT_GENERALMULTIPATCH => SHPT_MULTIPATCH,
        other => other,
    };

    match base {
        SHPT_POINT | SHPT_POINTZ | SHPT_POINTM | SHPT_POINTZM => {
            read_point(buf, has_z, has_m).map(Some)
        }
        SHPT_MULTIPOINT | SHPT_MULTIPOINTZ | SHPT_MULTIPOINTM | SHPT_MULTIPOINTZM => {
            read_multipoint(buf, has_z, has_m).map(Some)
        }
        SHPT_ARC | SHPT_ARCZ | SHPT_ARCM | SHPT_ARCZM | SHPT_POLYGON | SHPT_POLYGONZ
        | SHPT_POLYGONM | SHPT_POLYGONZM | SHPT_MULTIPATCH | SHPT_MULTIPATCHM => {
            read_multipart(buf, base, has_z, has_m).map(Some)
        }
        other => Err(GeoWireError::UnsupportedGeometryType(format!(
            "shape type {other}"
        ))),
    }
}

fn inflate(compressed: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_size);
    let mut decoder = ZlibDecoder::new(compressed).take(expected_size as u64 + 1);
    decoder.read_to_end(&mut out).map_err(|e| {
        GeoWireError::CorruptData(format!("zlib inflate of compressed shape failed: {e}"))
    })?;
    if out.len() != expected_size {
        return Err(GeoWireError::CorruptData(format!(
            "compressed shape declared {expected_size} uncompressed bytes, got {}",
            out.len()
        )));
    }
    Ok(out)
}

fn require(buf: &[u8], needed: usize, what: &str) -> Result<()> {
    if buf.len() < needed {
        return Err(GeoWireError::CorruptData(format!(
            "corrupted shape: {what} needs {needed} bytes, buffer has {}",
            buf.len()
        )));
    }
    Ok(())
}

fn read_f64_at(buf: &[u8], offset: usize) -> f64 {
    LittleEndian::read_f64(&buf[offset..offset + 8])
}

fn read_point(buf: &[u8], has_z: bool, has_m: bool) -> Result<Geometry> {
    let needed = 4 + 16 + if has_z { 8 } else { 0 } + if has_m { 8 } else { 0 };
    require(buf, needed, "point record")?;
    let x = read_f64_at(buf, 4);
    let y = read_f64_at(buf, 12);
    if has_z {
        Ok(Geometry::point_z(x, y, read_f64_at(buf, 20)))
    } else {
        // A trailing measure, when declared, is skipped: the model carries
        // no M ordinate.
        Ok(Geometry::point(x, y))
    }
}

fn read_multipoint(buf: &[u8], has_z: bool, has_m: bool) -> Result<Geometry> {
    require(buf, 40, "multipoint header")?;
    let n_points = LittleEndian::read_i32(&buf[36..40]);
    if !(0..=MAX_SHAPE_POINTS).contains(&n_points) {
        return Err(GeoWireError::CorruptData(format!(
            "corrupted shape: nPoints={n_points}"
        )));
    }
    let n = n_points as usize;
    let mut needed = 40 + 16 * n;
    if has_z {
        needed += 16 + 8 * n;
    }
    if has_m {
        needed += 16 + 8 * n;
    }
    require(buf, needed, "multipoint record")?;

    let z_offset = 40 + 16 * n + 16;
    let mut mp = Geometry::empty_of_type(GeometryType::MultiPoint)?;
    mp.set_3d(has_z);
    for i in 0..n {
        let x = read_f64_at(buf, 40 + i * 16);
        let y = read_f64_at(buf, 40 + i * 16 + 8);
        let child = if has_z {
            Geometry::point_z(x, y, read_f64_at(buf, z_offset + i * 8))
        } else {
            Geometry::point(x, y)
        };
        mp.push_child_unchecked(child);
    }
    Ok(mp)
}

/// Arc, polygon and multipatch records share one header layout: XY box,
/// part count, point count, part-start indices, (multipatch only) part
/// types, flat XY array, then appended Z box + Z array.
fn read_multipart(buf: &[u8], base: u32, has_z: bool, has_m: bool) -> Result<Geometry> {
    require(buf, 44, "multipart header")?;
    let n_parts = LittleEndian::read_i32(&buf[36..40]);
    let n_points = LittleEndian::read_i32(&buf[40..44]);
    if !(0..=MAX_SHAPE_POINTS).contains(&n_points) || !(0..=MAX_SHAPE_PARTS).contains(&n_parts) {
        return Err(GeoWireError::CorruptData(format!(
            "corrupted shape: nPoints={n_points}, nParts={n_parts}"
        )));
    }
    let (parts, points) = (n_parts as usize, n_points as usize);
    let is_multipatch = matches!(base, SHPT_MULTIPATCH | SHPT_MULTIPATCHM);

    let mut needed = 44 + 4 * parts + 16 * points;
    if has_z {
        needed += 16 + 8 * points;
    }
    if has_m {
        needed += 16 + 8 * points;
    }
    if is_multipatch {
        needed += 4 * parts;
    }
    require(buf, needed, "multipart record")?;

    let mut part_starts = Vec::with_capacity(parts);
    for i in 0..parts {
        let start = LittleEndian::read_i32(&buf[44 + 4 * i..48 + 4 * i]);
        if start < 0 || start >= n_points {
            return Err(GeoWireError::CorruptData(format!(
                "corrupted shape: part start [{i}] = {start}, nPoints = {n_points}"
            )));
        }
        if let Some(&prev) = part_starts.last() {
            if start <= prev {
                return Err(GeoWireError::CorruptData(format!(
                    "corrupted shape: part start [{i}] = {start} not after {prev}"
                )));
            }
        }
        part_starts.push(start);
    }
    let mut offset = 44 + 4 * parts;

    let mut part_types = Vec::new();
    if is_multipatch {
        for i in 0..parts {
            part_types.push(LittleEndian::read_i32(&buf[offset + 4 * i..offset + 4 * i + 4]));
        }
        offset += 4 * parts;
    }

    let mut coords = Vec::with_capacity(points);
    for i in 0..points {
        coords.push(Coord::new(
            read_f64_at(buf, offset + i * 16),
            read_f64_at(buf, offset + i * 16 + 8),
        ));
    }
    offset += 16 * points;

    if has_z {
        // Skip the Z range block, then fill the Z ordinates.
        for (i, c) in coords.iter_mut().enumerate() {
            c.z = read_f64_at(buf, offset + 16 + i * 8);
        }
    }
    // A measure block, when declared, was bounds-checked above and is
    // otherwise ignored.

    let part_slices = |starts: &[i32]| -> Vec<(usize, usize)> {
        starts
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let end = starts.get(i + 1).map(|&e| e as usize).unwrap_or(points);
                (s as usize, end)
            })
            .collect()
    };

    let geom = match base {
        SHPT_ARC => {
            if parts == 1 {
                Geometry::line_string(coords, has_z)
            } else {
                let mut ml = Geometry::empty_of_type(GeometryType::MultiLineString)?;
                ml.set_3d(has_z);
                for (start, end) in part_slices(&part_starts) {
                    ml.push_child_unchecked(Geometry::line_string(
                        coords[start..end].to_vec(),
                        has_z,
                    ));
                }
                ml
            }
        }
        SHPT_POLYGON => {
            if parts == 1 {
                let mut poly = Geometry::empty_of_type(GeometryType::Polygon)?;
                poly.set_3d(has_z);
                poly.push_child_unchecked(Geometry::linear_ring(coords, has_z));
                poly
            } else {
                // Ring order in the file is not a reliable exterior/hole
                // cue; organize by winding and containment instead.
                let rings: Vec<Geometry> = part_slices(&part_starts)
                    .into_iter()
                    .map(|(start, end)| {
                        Geometry::linear_ring(coords[start..end].to_vec(), has_z)
                    })
                    .collect();
                let mut geom = organize_polygons(rings);
                geom.set_3d(has_z);
                geom
            }
        }
        _ => multipatch_to_geometry(&part_starts, &part_types, &coords)?,
    };
    Ok(geom)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::*;
    use crate::io::shapebin::to_shape_bin;

    fn le32(v: i32) -> [u8; 4] {
        v.to_le_bytes()
    }

    fn f(v: f64) -> [u8; 8] {
        v.to_le_bytes()
    }

    #[test]
    fn null_shape_is_no_geometry() {
        assert!(from_shape_bin(&le32(0)).unwrap().is_none());
    }

    #[test]
    fn short_buffer_is_not_enough_data() {
        assert!(matches!(
            from_shape_bin(&[1, 0]),
            Err(GeoWireError::NotEnoughData(_))
        ));
    }

    #[test]
    fn point_and_point_z() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&le32(SHPT_POINT as i32));
        buf.extend_from_slice(&f(3.0));
        buf.extend_from_slice(&f(4.0));
        assert_eq!(
            from_shape_bin(&buf).unwrap().unwrap(),
            Geometry::point(3.0, 4.0)
        );

        let mut buf = Vec::new();
        buf.extend_from_slice(&le32(SHPT_POINTZ as i32));
        buf.extend_from_slice(&f(3.0));
        buf.extend_from_slice(&f(4.0));
        buf.extend_from_slice(&f(5.0));
        assert_eq!(
            from_shape_bin(&buf).unwrap().unwrap(),
            Geometry::point_z(3.0, 4.0, 5.0)
        );
    }

    /// Hand-built single-part polygon record: unit square, clockwise.
    fn square_polygon_record() -> Vec<u8> {
        let ring = [
            (0.0, 0.0),
            (0.0, 10.0),
            (10.0, 10.0),
            (10.0, 0.0),
            (0.0, 0.0),
        ];
        let mut buf = Vec::new();
        buf.extend_from_slice(&le32(SHPT_POLYGON as i32));
        for v in [0.0, 0.0, 10.0, 10.0] {
            buf.extend_from_slice(&f(v));
        }
        buf.extend_from_slice(&le32(1));
        buf.extend_from_slice(&le32(ring.len() as i32));
        buf.extend_from_slice(&le32(0));
        for (x, y) in ring {
            buf.extend_from_slice(&f(x));
            buf.extend_from_slice(&f(y));
        }
        buf
    }

    #[test]
    fn single_part_polygon() {
        let geom = from_shape_bin(&square_polygon_record()).unwrap().unwrap();
        assert_eq!(geom.geometry_type(), GeometryType::Polygon);
        assert_eq!(geom.exterior_ring().unwrap().coords().len(), 5);
    }

    #[test]
    fn compressed_record_decodes_identically() {
        let plain = square_polygon_record();
        // Level 9 produces the 0x78 0xDA stream header the detector keys on.
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&plain).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(&compressed[..2], &[0x78, 0xDA]);

        let mut wrapped = Vec::new();
        wrapped.extend_from_slice(&le32(SHPT_POLYGON as i32));
        wrapped.extend_from_slice(&le32(plain.len() as i32));
        wrapped.extend_from_slice(&le32(compressed.len() as i32));
        wrapped.extend_from_slice(&compressed);

        assert_eq!(
            from_shape_bin(&wrapped).unwrap().unwrap(),
            from_shape_bin(&plain).unwrap().unwrap()
        );
    }

    #[test]
    fn compressed_record_with_wrong_size_is_corrupt() {
        let plain = square_polygon_record();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&plain).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut wrapped = Vec::new();
        wrapped.extend_from_slice(&le32(SHPT_POLYGON as i32));
        wrapped.extend_from_slice(&le32(plain.len() as i32 + 7));
        wrapped.extend_from_slice(&le32(compressed.len() as i32));
        wrapped.extend_from_slice(&compressed);
        assert!(matches!(
            from_shape_bin(&wrapped),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn truncated_record_is_rejected_before_reading() {
        let full = square_polygon_record();
        for len in 4..full.len() {
            let res = from_shape_bin(&full[..len]);
            assert!(
                matches!(res, Err(GeoWireError::CorruptData(_))),
                "length {len}: {res:?}"
            );
        }
    }

    #[test]
    fn absurd_counts_are_rejected() {
        let mut buf = square_polygon_record();
        buf[40..44].copy_from_slice(&le32(100_000_000));
        assert!(matches!(
            from_shape_bin(&buf),
            Err(GeoWireError::CorruptData(_))
        ));
        let mut buf = square_polygon_record();
        buf[36..40].copy_from_slice(&le32(-2));
        assert!(matches!(
            from_shape_bin(&buf),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn part_starts_must_be_increasing_and_in_range() {
        // Two-part arc whose second start is not after the first.
        let mut buf = Vec::new();
        buf.extend_from_slice(&le32(SHPT_ARC as i32));
        for v in [0.0, 0.0, 1.0, 1.0] {
            buf.extend_from_slice(&f(v));
        }
        buf.extend_from_slice(&le32(2));
        buf.extend_from_slice(&le32(4));
        buf.extend_from_slice(&le32(2));
        buf.extend_from_slice(&le32(1));
        for i in 0..4 {
            buf.extend_from_slice(&f(i as f64));
            buf.extend_from_slice(&f(0.0));
        }
        assert!(matches!(
            from_shape_bin(&buf),
            Err(GeoWireError::CorruptData(_))
        ));

        buf[44..48].copy_from_slice(&le32(9));
        assert!(matches!(
            from_shape_bin(&buf),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn multipatch_outer_inner_decodes_to_polygon_with_hole() {
        let outer = [
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
        ];
        let inner = [(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0)];
        let points: Vec<(f64, f64)> = outer.iter().chain(inner.iter()).copied().collect();

        let mut buf = Vec::new();
        buf.extend_from_slice(&le32(SHPT_MULTIPATCH as i32));
        for v in [0.0, 0.0, 10.0, 10.0] {
            buf.extend_from_slice(&f(v));
        }
        buf.extend_from_slice(&le32(2)); // parts
        buf.extend_from_slice(&le32(points.len() as i32)); // points
        buf.extend_from_slice(&le32(0)); // part starts
        buf.extend_from_slice(&le32(4));
        buf.extend_from_slice(&le32(SHPP_OUTERRING));
        buf.extend_from_slice(&le32(SHPP_INNERRING));
        for (x, y) in &points {
            buf.extend_from_slice(&f(*x));
            buf.extend_from_slice(&f(*y));
        }
        // Z range + Z values.
        buf.extend_from_slice(&f(0.0));
        buf.extend_from_slice(&f(0.0));
        for _ in 0..points.len() {
            buf.extend_from_slice(&f(0.0));
        }

        let geom = from_shape_bin(&buf).unwrap().unwrap();
        assert_eq!(geom.geometry_type(), GeometryType::MultiPolygon);
        assert_eq!(geom.num_children(), 1);
        let poly = &geom.children()[0];
        assert_eq!(poly.num_interior_rings(), 1);
        // Rings were closed on decode.
        assert!(poly.exterior_ring().unwrap().is_closed());
    }

    #[test]
    fn measured_record_types_parse_with_m_discarded() {
        // PointM: x, y, m.
        let mut buf = Vec::new();
        buf.extend_from_slice(&le32(SHPT_POINTM as i32));
        buf.extend_from_slice(&f(1.0));
        buf.extend_from_slice(&f(2.0));
        buf.extend_from_slice(&f(99.0));
        assert_eq!(
            from_shape_bin(&buf).unwrap().unwrap(),
            Geometry::point(1.0, 2.0)
        );
    }

    #[test]
    fn round_trip_via_writer() {
        let mut poly = Geometry::empty_of_type(GeometryType::Polygon).unwrap();
        poly.add_ring(Geometry::linear_ring(
            vec![
                Coord::new(0.0, 0.0),
                Coord::new(0.0, 10.0),
                Coord::new(10.0, 10.0),
                Coord::new(10.0, 0.0),
                Coord::new(0.0, 0.0),
            ],
            false,
        ))
        .unwrap();
        let record = to_shape_bin(&poly).unwrap();
        let back = from_shape_bin(&record).unwrap().unwrap();
        assert_eq!(back, poly);
    }
}
