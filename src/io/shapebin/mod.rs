//! Codec for the Esri Shapefile/FileGDB per-record geometry layout.
//!
//! Everything is little-endian. Multi-part records carry a leading XY
//! bounding box, part/point counts and a flat vertex array; Z ranges and Z
//! ordinates are appended blocks after all XY data, a layout quirk that is
//! preserved exactly. Records may arrive wrapped in an undocumented zlib
//! envelope, which is detected and inflated transparently.

use crate::error::Result;
use crate::geometry::Geometry;

pub(crate) mod multipatch;
pub mod reader;
pub mod writer;

pub use reader::from_shape_bin;
pub use writer::{multipatch_to_shape_bin, to_shape_bin};

// Shape type codes, FileGDB numbering: the classic shapefile "Z" codes
// (11/13/15/18) are ZM there, and 9/10/19/20 are the pure-Z forms.
pub(crate) const SHPT_NULL: u32 = 0;
pub(crate) const SHPT_POINT: u32 = 1;
pub(crate) const SHPT_ARC: u32 = 3;
pub(crate) const SHPT_POLYGON: u32 = 5;
pub(crate) const SHPT_MULTIPOINT: u32 = 8;
pub(crate) const SHPT_POINTZ: u32 = 9;
pub(crate) const SHPT_ARCZ: u32 = 10;
pub(crate) const SHPT_POINTZM: u32 = 11;
pub(crate) const SHPT_ARCZM: u32 = 13;
pub(crate) const SHPT_POLYGONZM: u32 = 15;
pub(crate) const SHPT_MULTIPOINTZM: u32 = 18;
pub(crate) const SHPT_POLYGONZ: u32 = 19;
pub(crate) const SHPT_MULTIPOINTZ: u32 = 20;
pub(crate) const SHPT_POINTM: u32 = 21;
pub(crate) const SHPT_ARCM: u32 = 23;
pub(crate) const SHPT_POLYGONM: u32 = 25;
pub(crate) const SHPT_MULTIPOINTM: u32 = 28;
pub(crate) const SHPT_MULTIPATCHM: u32 = 31;
pub(crate) const SHPT_MULTIPATCH: u32 = 32;
pub(crate) const SHPT_GENERALPOLYLINE: u32 = 50;
pub(crate) const SHPT_GENERALPOLYGON: u32 = 51;
pub(crate) const SHPT_GENERALPOINT: u32 = 52;
pub(crate) const SHPT_GENERALMULTIPOINT: u32 = 53;
pub(crate) const SHPT_GENERALMULTIPATCH: u32 = 54;

// MultiPatch part types (low nibble of the per-part type word).
pub(crate) const SHPP_TRISTRIP: i32 = 0;
pub(crate) const SHPP_TRIFAN: i32 = 1;
pub(crate) const SHPP_OUTERRING: i32 = 2;
pub(crate) const SHPP_INNERRING: i32 = 3;
pub(crate) const SHPP_FIRSTRING: i32 = 4;
pub(crate) const SHPP_RING: i32 = 5;
pub(crate) const SHPP_TRIANGLES: i32 = 6;

// Sanity ceilings applied before any allocation.
pub(crate) const MAX_SHAPE_POINTS: i32 = 50_000_000;
pub(crate) const MAX_SHAPE_PARTS: i32 = 10_000_000;

impl Geometry {
    /// Decode a Shapefile/FileGDB geometry record. A null shape decodes to
    /// `None`: no geometry, not an error.
    pub fn from_shape_bin(buf: &[u8]) -> Result<Option<Geometry>> {
        from_shape_bin(buf)
    }

    /// Encode as a Shapefile/FileGDB geometry record. Null and empty
    /// geometries produce the 4-byte null-shape record.
    pub fn to_shape_bin(&self) -> Result<Vec<u8>> {
        to_shape_bin(self)
    }
}
