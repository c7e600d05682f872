//! Well-Known Text codec.
//!
//! The importer is a small token-scanning recursive-descent parser over an
//! explicit cursor position; the exporter emits either the legacy profile
//! (a bare third ordinate for 3D, no dimensionality tag) or the ISO profile
//! (`Z` tags, parenthesized MultiPoint members).

use crate::error::Result;
use crate::geometry::Geometry;

pub mod reader;
pub mod writer;

pub use reader::{from_wkt, from_wkt_cursor};
pub use writer::to_wkt;

/// The WKT profile used when writing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WktVariant {
    /// Legacy profile: 3D points print a bare third ordinate.
    #[default]
    Legacy,
    /// ISO profile: dimensionality tags (`Z`) and parenthesized MultiPoint
    /// members.
    Iso,
}

impl Geometry {
    /// Parse a geometry from WKT.
    pub fn from_wkt(input: &str) -> Result<Geometry> {
        from_wkt(input)
    }

    /// Serialize to WKT in the requested profile.
    pub fn to_wkt(&self, variant: WktVariant) -> String {
        to_wkt(self, variant)
    }
}
