//! Well-Known Binary codec.
//!
//! Three type-code dialects are understood on import: the legacy "old OGC"
//! convention (Z in the 0x80000000 high bit, no M), the ISO SQL/MM offset
//! bands (+1000 Z, +2000 M, +3000 ZM) and the PostGIS EWKB flag bits with
//! the optional embedded SRID. Export defaults to the legacy dialect for
//! backward compatibility; curve types, which have no legacy encoding, are
//! always written with their ISO codes.

use crate::datatypes::GeometryType;
use crate::error::{GeoWireError, Result};
use crate::geometry::Geometry;

pub mod reader;
pub mod writer;

pub use reader::{from_ewkb, from_wkb, from_wkb_as};
pub use writer::{to_wkb, wkb_size, WkbWriteOptions};

/// Byte order of a WKB buffer, declared per geometry header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// XDR, byte-order flag 0.
    BigEndian,
    /// NDR, byte-order flag 1.
    LittleEndian,
}

impl From<Endianness> for u8 {
    fn from(value: Endianness) -> Self {
        match value {
            Endianness::BigEndian => 0,
            Endianness::LittleEndian => 1,
        }
    }
}

impl TryFrom<u8> for Endianness {
    type Error = GeoWireError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Endianness::BigEndian),
            1 => Ok(Endianness::LittleEndian),
            other => Err(GeoWireError::CorruptData(format!(
                "invalid WKB byte-order flag 0x{other:02X}"
            ))),
        }
    }
}

/// The type-code dialect used when writing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WkbVariant {
    /// Legacy "old OGC" codes; the default for interoperability.
    #[default]
    OldOgc,
    /// ISO SQL/MM offset-band codes.
    Iso,
    /// PostGIS EWKB flag bits, with the SRID field when the geometry has an
    /// EPSG spatial reference.
    PostGis,
}

/// EWKB flag bits.
pub(crate) const EWKB_Z_FLAG: u32 = 0x8000_0000;
pub(crate) const EWKB_M_FLAG: u32 = 0x4000_0000;
pub(crate) const EWKB_SRID_FLAG: u32 = 0x2000_0000;

pub(crate) struct DecodedType {
    pub geometry_type: GeometryType,
    pub has_z: bool,
    pub has_srid: bool,
}

/// Decode a raw 4-byte type code in any of the three dialects.
///
/// Measured payloads (ISO +2000/+3000 bands, EWKB M flag) fail fast: the
/// model has no measure ordinate and silently dropping it is not an option.
pub(crate) fn decode_type_code(raw: u32) -> Result<DecodedType> {
    let has_srid = raw & EWKB_SRID_FLAG != 0;
    let mut code = raw & !EWKB_SRID_FLAG;
    if code & EWKB_M_FLAG != 0 {
        return Err(GeoWireError::CorruptData(format!(
            "measured (M) EWKB geometry is not supported (type code 0x{raw:08X})"
        )));
    }
    let mut has_z = code & EWKB_Z_FLAG != 0;
    code &= !EWKB_Z_FLAG;
    match code / 1000 {
        0 => {}
        1 => {
            has_z = true;
            code -= 1000;
        }
        2 | 3 => {
            return Err(GeoWireError::CorruptData(format!(
                "measured (M) ISO WKB geometry is not supported (type code {raw})"
            )))
        }
        _ => {
            return Err(GeoWireError::UnsupportedGeometryType(format!(
                "unrecognized WKB type code {raw}"
            )))
        }
    }
    let geometry_type = GeometryType::try_from(code).map_err(|_| {
        GeoWireError::UnsupportedGeometryType(format!("unrecognized WKB type code {raw}"))
    })?;
    if !(1..=12).contains(&code) {
        return Err(GeoWireError::UnsupportedGeometryType(format!(
            "WKB type code {raw} is not an instantiable geometry"
        )));
    }
    Ok(DecodedType {
        geometry_type,
        has_z,
        has_srid,
    })
}

/// Encode a type code for the requested dialect. LinearRings serialize under
/// the LineString code; curve types force the ISO bands even under the
/// legacy dialect, which has no codes for them.
pub(crate) fn encode_type_code(
    geometry_type: GeometryType,
    has_z: bool,
    variant: WkbVariant,
    with_srid: bool,
) -> u32 {
    let geometry_type = if geometry_type == GeometryType::LinearRing {
        GeometryType::LineString
    } else {
        geometry_type
    };
    match variant {
        WkbVariant::OldOgc => {
            if geometry_type.is_non_linear() {
                geometry_type.iso_code(has_z)
            } else {
                geometry_type.legacy_code(has_z)
            }
        }
        WkbVariant::Iso => geometry_type.iso_code(has_z),
        WkbVariant::PostGis => {
            let mut code: u32 = geometry_type.into();
            if has_z {
                code |= EWKB_Z_FLAG;
            }
            if with_srid {
                code |= EWKB_SRID_FLAG;
            }
            code
        }
    }
}

impl Geometry {
    /// Deserialize a geometry from WKB, accepting any dialect and byte
    /// order. An embedded EWKB SRID is excised and discarded; use
    /// [`Geometry::from_ewkb`] to capture it.
    pub fn from_wkb(buf: &[u8]) -> Result<Geometry> {
        from_wkb(buf)
    }

    /// Deserialize EWKB, returning the embedded SRID when present.
    pub fn from_ewkb(buf: &[u8]) -> Result<(Geometry, Option<i32>)> {
        from_ewkb(buf)
    }

    /// Serialize to WKB with the given byte order and dialect.
    pub fn to_wkb(&self, options: &WkbWriteOptions) -> Result<Vec<u8>> {
        to_wkb(self, options)
    }

    /// The exact number of bytes [`Geometry::to_wkb`] will produce for this
    /// geometry in the given dialect.
    pub fn wkb_size(&self, variant: WkbVariant) -> usize {
        wkb_size(self, variant)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_legacy_iso_and_ewkb_codes() {
        let d = decode_type_code(1).unwrap();
        assert_eq!(d.geometry_type, GeometryType::Point);
        assert!(!d.has_z && !d.has_srid);

        let d = decode_type_code(0x8000_0003).unwrap();
        assert_eq!(d.geometry_type, GeometryType::Polygon);
        assert!(d.has_z);

        let d = decode_type_code(1005).unwrap();
        assert_eq!(d.geometry_type, GeometryType::MultiLineString);
        assert!(d.has_z);

        let d = decode_type_code(0x2000_0000 | 2).unwrap();
        assert_eq!(d.geometry_type, GeometryType::LineString);
        assert!(d.has_srid);
    }

    #[test]
    fn measured_codes_fail_fast() {
        // ISO XYM and XYZM bands.
        assert!(matches!(
            decode_type_code(2001),
            Err(GeoWireError::CorruptData(_))
        ));
        assert!(matches!(
            decode_type_code(3001),
            Err(GeoWireError::CorruptData(_))
        ));
        // EWKB M flag, with and without Z.
        assert!(matches!(
            decode_type_code(EWKB_M_FLAG | 1),
            Err(GeoWireError::CorruptData(_))
        ));
        assert!(matches!(
            decode_type_code(EWKB_M_FLAG | EWKB_Z_FLAG | 1),
            Err(GeoWireError::CorruptData(_))
        ));
    }

    #[test]
    fn unknown_codes_are_unsupported() {
        assert!(matches!(
            decode_type_code(0),
            Err(GeoWireError::UnsupportedGeometryType(_))
        ));
        assert!(matches!(
            decode_type_code(42),
            Err(GeoWireError::UnsupportedGeometryType(_))
        ));
        assert!(matches!(
            decode_type_code(4001),
            Err(GeoWireError::UnsupportedGeometryType(_))
        ));
    }

    #[test]
    fn curve_types_force_iso_under_legacy() {
        assert_eq!(
            encode_type_code(GeometryType::CircularString, false, WkbVariant::OldOgc, false),
            8
        );
        assert_eq!(
            encode_type_code(GeometryType::CompoundCurve, true, WkbVariant::OldOgc, false),
            1009
        );
        assert_eq!(
            encode_type_code(GeometryType::Polygon, true, WkbVariant::OldOgc, false),
            0x8000_0003
        );
        assert_eq!(
            encode_type_code(GeometryType::Polygon, true, WkbVariant::Iso, false),
            1003
        );
        assert_eq!(
            encode_type_code(GeometryType::Point, true, WkbVariant::PostGis, true),
            EWKB_Z_FLAG | EWKB_SRID_FLAG | 1
        );
    }
}
