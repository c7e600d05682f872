//! GML fragment emission (write-only; no markup parser lives here).

use crate::error::Result;
use crate::geometry::Geometry;

pub mod writer;

pub use writer::{envelope_to_gml_box, to_gml};

/// GML dialect to emit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GmlFormat {
    /// GML 2.1.2, the default.
    #[default]
    Gml2,
    Gml3,
}

/// Where the `srsDimension` attribute is attached (GML3 only).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SrsDimensionLocation {
    /// On the `<gml:posList>` element, the default.
    #[default]
    PosList,
    /// On the geometry element itself.
    Geometry,
    /// On both.
    Both,
}

/// GML emission options.
#[derive(Clone, Debug)]
pub struct GmlOptions {
    pub format: GmlFormat,
    /// Emit LineStrings as `<gml:Curve><gml:segments>...` (GML3 only).
    pub linestring_as_curve: bool,
    /// Use the long URN SRS naming (`urn:ogc:def:crs:EPSG::n`), which also
    /// makes lat/long-ordered references swap axes in the coordinate text
    /// (GML3 only).
    pub long_srs: bool,
    /// Thread a `gml:id` through the output for GML 3.2 compatibility;
    /// collection members get a `.N` suffix per child index.
    pub gml_id: Option<String>,
    pub srs_dimension_location: SrsDimensionLocation,
}

impl Default for GmlOptions {
    fn default() -> Self {
        Self {
            format: GmlFormat::Gml2,
            linestring_as_curve: false,
            long_srs: true,
            gml_id: None,
            srs_dimension_location: SrsDimensionLocation::PosList,
        }
    }
}

impl Geometry {
    /// Serialize to a GML fragment.
    pub fn to_gml(&self, options: &GmlOptions) -> Result<String> {
        to_gml(self, options)
    }
}
