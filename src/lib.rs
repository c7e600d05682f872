//! A vector geometry model and its exchange-format codecs.
//!
//! The hub is [`geometry::Geometry`], a closed tagged variant over points,
//! line strings, polygons, curve variants and recursively composed
//! collections. Around it sit byte-exact, bounds-checked codecs for
//! Well-Known Binary (legacy, ISO and PostGIS EWKB dialects, both byte
//! orders), Well-Known Text, the Esri Shapefile/FileGDB record layout
//! (including zlib-compressed records and MultiPatch part assembly) and
//! write-only GML/KML/GeoJSON fragment builders, plus the arc-to-ring
//! assembly algorithm used to stitch unordered edge sets into polygons.
//!
//! ```
//! use geowire::Geometry;
//! use geowire::io::wkb::WkbWriteOptions;
//!
//! let geom = Geometry::from_wkt("POLYGON ((0 0,4 0,4 4,0 4,0 0))").unwrap();
//! let wkb = geom.to_wkb(&WkbWriteOptions::default()).unwrap();
//! assert_eq!(Geometry::from_wkb(&wkb).unwrap(), geom);
//! ```

pub mod algorithm;
pub mod datatypes;
pub mod error;
pub mod geometry;
pub mod io;

pub use datatypes::GeometryType;
pub use error::{GeoWireError, Result};
pub use geometry::{Coord, Envelope, Envelope3d, Geometry, GeometryKind, SpatialRef};
