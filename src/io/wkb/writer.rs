//! WKB serialization and its byte-for-byte size accounting.

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::datatypes::GeometryType;
use crate::error::Result;
use crate::geometry::{Coord, Geometry, GeometryKind};
use crate::io::wkb::{encode_type_code, Endianness, WkbVariant};

/// Export configuration. The defaults (little endian, legacy dialect) match
/// what the widest range of consumers accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WkbWriteOptions {
    pub byte_order: Endianness,
    pub variant: WkbVariant,
}

impl Default for WkbWriteOptions {
    fn default() -> Self {
        Self {
            byte_order: Endianness::LittleEndian,
            variant: WkbVariant::OldOgc,
        }
    }
}

/// Serialize a geometry to WKB.
pub fn to_wkb(geom: &Geometry, options: &WkbWriteOptions) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(wkb_size(geom, options.variant));
    write_geometry(&mut out, geom, options, true)?;
    Ok(out)
}

/// The exact byte length [`to_wkb`] produces, computed without serializing.
/// O(n) in the total vertex count.
pub fn wkb_size(geom: &Geometry, variant: WkbVariant) -> usize {
    let srid_bytes = if wants_srid(geom, variant) { 4 } else { 0 };
    srid_bytes + geometry_size(geom)
}

fn wants_srid(geom: &Geometry, variant: WkbVariant) -> bool {
    variant == WkbVariant::PostGis
        && geom
            .spatial_ref()
            .map(|srs| srs.epsg_code().is_some())
            .unwrap_or(false)
}

fn geometry_size(geom: &Geometry) -> usize {
    let coord_bytes = geom.coord_dimension() as usize * 8;
    match geom.kind() {
        GeometryKind::Point(_) => 5 + coord_bytes,
        GeometryKind::LineString(coords)
        | GeometryKind::LinearRing(coords)
        | GeometryKind::CircularString(coords) => 5 + 4 + coords.len() * coord_bytes,
        GeometryKind::Polygon(rings) => {
            5 + 4
                + rings
                    .iter()
                    .map(|r| 4 + r.coords().len() * coord_bytes)
                    .sum::<usize>()
        }
        _ => 5 + 4 + geom.children().iter().map(geometry_size).sum::<usize>(),
    }
}

fn write_u32(out: &mut Vec<u8>, order: Endianness, value: u32) -> Result<()> {
    match order {
        Endianness::BigEndian => out.write_u32::<BigEndian>(value)?,
        Endianness::LittleEndian => out.write_u32::<LittleEndian>(value)?,
    }
    Ok(())
}

fn write_i32(out: &mut Vec<u8>, order: Endianness, value: i32) -> Result<()> {
    match order {
        Endianness::BigEndian => out.write_i32::<BigEndian>(value)?,
        Endianness::LittleEndian => out.write_i32::<LittleEndian>(value)?,
    }
    Ok(())
}

fn write_f64(out: &mut Vec<u8>, order: Endianness, value: f64) -> Result<()> {
    match order {
        Endianness::BigEndian => out.write_f64::<BigEndian>(value)?,
        Endianness::LittleEndian => out.write_f64::<LittleEndian>(value)?,
    }
    Ok(())
}

fn write_coord(out: &mut Vec<u8>, order: Endianness, coord: &Coord, has_z: bool) -> Result<()> {
    write_f64(out, order, coord.x)?;
    write_f64(out, order, coord.y)?;
    if has_z {
        write_f64(out, order, coord.z)?;
    }
    Ok(())
}

fn write_coord_sequence(
    out: &mut Vec<u8>,
    order: Endianness,
    coords: &[Coord],
    has_z: bool,
) -> Result<()> {
    write_u32(out, order, coords.len() as u32)?;
    for c in coords {
        write_coord(out, order, c, has_z)?;
    }
    Ok(())
}

fn write_geometry(
    out: &mut Vec<u8>,
    geom: &Geometry,
    options: &WkbWriteOptions,
    root: bool,
) -> Result<()> {
    let order = options.byte_order;
    let has_z = geom.has_z();
    // The SRID field appears once, on the outermost header.
    let with_srid = root && wants_srid(geom, options.variant);
    out.write_u8(order.into())?;
    let code = encode_type_code(geom.geometry_type(), has_z, options.variant, with_srid);
    write_u32(out, order, code)?;
    if with_srid {
        let srid = geom
            .spatial_ref()
            .and_then(|srs| srs.epsg_code())
            .expect("wants_srid checked the EPSG code");
        write_i32(out, order, srid)?;
    }

    match geom.kind() {
        GeometryKind::Point(coord) => {
            // The empty point is encoded as NaN ordinates.
            let c = coord.unwrap_or(Coord::new_z(f64::NAN, f64::NAN, f64::NAN));
            write_coord(out, order, &c, has_z)?;
        }
        GeometryKind::LineString(coords)
        | GeometryKind::LinearRing(coords)
        | GeometryKind::CircularString(coords) => {
            write_coord_sequence(out, order, coords, has_z)?;
        }
        GeometryKind::Polygon(rings) => {
            write_u32(out, order, rings.len() as u32)?;
            for ring in rings {
                write_coord_sequence(out, order, ring.coords(), has_z)?;
            }
        }
        _ => {
            let children = geom.children();
            write_u32(out, order, children.len() as u32)?;
            for child in children {
                write_geometry(out, child, options, false)?;
            }
        }
    }
    Ok(())
}
