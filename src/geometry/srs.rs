use serde::{Deserialize, Serialize};

/// Stand-in for the external coordinate-reference-system collaborator.
///
/// The model never interprets a reference beyond the authority name/code
/// lookup and the axis-order flag the markup writers need; everything else
/// about a CRS is the collaborator's business. References are shared between
/// geometries through `Arc`, which gives the assign/release semantics the
/// model requires without a deep copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialRef {
    authority_name: Option<String>,
    authority_code: Option<String>,
    /// Whether the CRS definition orders axes latitude/longitude (or
    /// northing/easting). Drives the GML3 long-URN axis swap.
    lat_long_axis_order: bool,
}

impl SpatialRef {
    pub fn new(
        authority_name: Option<&str>,
        authority_code: Option<&str>,
        lat_long_axis_order: bool,
    ) -> Self {
        Self {
            authority_name: authority_name.map(str::to_string),
            authority_code: authority_code.map(str::to_string),
            lat_long_axis_order,
        }
    }

    /// An EPSG reference in the authority's declared axis order.
    pub fn from_epsg(code: u32, lat_long_axis_order: bool) -> Self {
        Self::new(Some("EPSG"), Some(&code.to_string()), lat_long_axis_order)
    }

    pub fn authority_name(&self) -> Option<&str> {
        self.authority_name.as_deref()
    }

    pub fn authority_code(&self) -> Option<&str> {
        self.authority_code.as_deref()
    }

    /// The numeric EPSG code, when the authority is EPSG and the code
    /// parses.
    pub fn epsg_code(&self) -> Option<i32> {
        match (self.authority_name.as_deref(), self.authority_code.as_deref()) {
            (Some(name), Some(code)) if name.eq_ignore_ascii_case("EPSG") => code.parse().ok(),
            _ => None,
        }
    }

    pub fn lat_long_axis_order(&self) -> bool {
        self.lat_long_axis_order
    }

    /// Equivalence as far as the model cares: same authority pair.
    pub fn is_same(&self, other: &SpatialRef) -> bool {
        self.authority_name == other.authority_name && self.authority_code == other.authority_code
    }
}
