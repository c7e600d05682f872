//! Geometry type codes and the type algebra shared by all codecs.

use std::fmt::Display;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Flat (2D) geometry type codes.
///
/// The numeric values are the standard simple-features wire codes; the Z
/// dimension is tracked separately on [`crate::geometry::Geometry`] and only
/// folded into the code when a codec asks for a dialect-specific encoding
/// via [`GeometryType::legacy_code`] or [`GeometryType::iso_code`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum GeometryType {
    /// Any geometry; the "worst case" result of [`GeometryType::merge`].
    Unknown = 0,
    Point = 1,
    LineString = 2,
    Polygon = 3,
    MultiPoint = 4,
    MultiLineString = 5,
    MultiPolygon = 6,
    GeometryCollection = 7,
    CircularString = 8,
    CompoundCurve = 9,
    CurvePolygon = 10,
    MultiCurve = 11,
    MultiSurface = 12,
    /// No geometry at all; absorbed by any other operand in a merge.
    NoGeometry = 100,
    /// A closed LineString used as a polygon boundary. Not a wire-level
    /// type: it serializes under the LineString code.
    LinearRing = 101,
}

/// High bit marking a Z ordinate in the legacy ("old OGC") type code.
pub const WKB_25D_BIT: u32 = 0x8000_0000;

impl GeometryType {
    /// The WKT keyword / display name for this type.
    pub fn name(&self) -> &'static str {
        use GeometryType::*;
        match self {
            Unknown => "GEOMETRY",
            Point => "POINT",
            LineString => "LINESTRING",
            Polygon => "POLYGON",
            MultiPoint => "MULTIPOINT",
            MultiLineString => "MULTILINESTRING",
            MultiPolygon => "MULTIPOLYGON",
            GeometryCollection => "GEOMETRYCOLLECTION",
            CircularString => "CIRCULARSTRING",
            CompoundCurve => "COMPOUNDCURVE",
            CurvePolygon => "CURVEPOLYGON",
            MultiCurve => "MULTICURVE",
            MultiSurface => "MULTISURFACE",
            NoGeometry => "NONE",
            LinearRing => "LINEARRING",
        }
    }

    /// Parse a WKT type keyword, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        use GeometryType::*;
        let t = match name.to_ascii_uppercase().as_str() {
            "GEOMETRY" => Unknown,
            "POINT" => Point,
            "LINESTRING" => LineString,
            "POLYGON" => Polygon,
            "MULTIPOINT" => MultiPoint,
            "MULTILINESTRING" => MultiLineString,
            "MULTIPOLYGON" => MultiPolygon,
            "GEOMETRYCOLLECTION" => GeometryCollection,
            "CIRCULARSTRING" => CircularString,
            "COMPOUNDCURVE" => CompoundCurve,
            "CURVEPOLYGON" => CurvePolygon,
            "MULTICURVE" => MultiCurve,
            "MULTISURFACE" => MultiSurface,
            "LINEARRING" => LinearRing,
            _ => return None,
        };
        Some(t)
    }

    /// Legacy ("old OGC") wire code: the flat code with the Z dimension in
    /// the 0x80000000 high bit. Curve types have no legacy encoding; callers
    /// fall back to [`GeometryType::iso_code`] for them.
    pub fn legacy_code(&self, has_z: bool) -> u32 {
        let base: u32 = (*self).into();
        if has_z {
            base | WKB_25D_BIT
        } else {
            base
        }
    }

    /// ISO SQL/MM wire code: Z/M presence encoded as +1000/+2000/+3000
    /// offset bands. The model never carries M, so only the +1000 band is
    /// ever produced.
    pub fn iso_code(&self, has_z: bool) -> u32 {
        let base: u32 = (*self).into();
        if has_z {
            base + 1000
        } else {
            base
        }
    }

    /// Whether the type is a curve (a one-dimensional path).
    pub fn is_curve(&self) -> bool {
        use GeometryType::*;
        matches!(self, LineString | LinearRing | CircularString | CompoundCurve)
    }

    /// Whether the type is a surface (a two-dimensional region).
    pub fn is_surface(&self) -> bool {
        use GeometryType::*;
        matches!(self, Polygon | CurvePolygon)
    }

    /// Whether the type can contain non-linear (arc) sections.
    pub fn is_non_linear(&self) -> bool {
        use GeometryType::*;
        matches!(
            self,
            CircularString | CompoundCurve | CurvePolygon | MultiCurve | MultiSurface
        )
    }

    /// Whether the type is a collection of owned child geometries.
    pub fn is_collection(&self) -> bool {
        use GeometryType::*;
        matches!(
            self,
            MultiPoint
                | MultiLineString
                | MultiPolygon
                | MultiCurve
                | MultiSurface
                | GeometryCollection
        )
    }

    /// Subclass relation over the flat type lattice. Every type is a
    /// subclass of itself and of [`GeometryType::Unknown`].
    pub fn is_subclass_of(&self, other: GeometryType) -> bool {
        use GeometryType::*;
        if *self == other || other == Unknown {
            return true;
        }
        match other {
            GeometryCollection => matches!(
                self,
                MultiPoint | MultiLineString | MultiPolygon | MultiCurve | MultiSurface
            ),
            MultiCurve => matches!(self, MultiLineString),
            MultiSurface => matches!(self, MultiPolygon),
            CompoundCurve => matches!(self, LineString | LinearRing | CircularString),
            CurvePolygon => matches!(self, Polygon),
            LineString => matches!(self, LinearRing),
            _ => false,
        }
    }

    /// The curve counterpart of a linear type, used when re-promoting
    /// results that came back from a linear-only collaborator.
    pub fn curve_type(&self) -> GeometryType {
        use GeometryType::*;
        match self {
            LineString | LinearRing => CompoundCurve,
            Polygon => CurvePolygon,
            MultiLineString => MultiCurve,
            MultiPolygon => MultiSurface,
            other => *other,
        }
    }

    /// The linear counterpart of a curve type, i.e. what
    /// [`crate::geometry::Geometry::linearize`] produces.
    pub fn linear_type(&self) -> GeometryType {
        use GeometryType::*;
        match self {
            CircularString | CompoundCurve => LineString,
            CurvePolygon => Polygon,
            MultiCurve => MultiLineString,
            MultiSurface => MultiPolygon,
            other => *other,
        }
    }

    /// Find the most specific common ancestor of two types.
    ///
    /// `NoGeometry` is absorbed by the other operand, `Unknown` dominates,
    /// identical types are preserved. With `promote_to_curves`, sibling
    /// linear/curve pairs unify to their curve parent (LineString +
    /// CircularString -> CompoundCurve, Polygon + CurvePolygon ->
    /// CurvePolygon). Two collection subtypes fall back to
    /// GeometryCollection; anything else degrades to Unknown.
    ///
    /// Dimensionality is tracked outside the flat codes and is merged by the
    /// caller (a 3D operand makes the merged result 3D).
    pub fn merge(main: GeometryType, extra: GeometryType, promote_to_curves: bool) -> GeometryType {
        use GeometryType::*;
        if main == Unknown || extra == Unknown {
            return Unknown;
        }
        if main == NoGeometry {
            return extra;
        }
        if extra == NoGeometry {
            return main;
        }
        if main == extra {
            return main;
        }
        if promote_to_curves {
            if main.is_curve() && extra.is_curve() {
                return CompoundCurve;
            }
            if main.is_subclass_of(extra) {
                return extra;
            }
            if extra.is_subclass_of(main) {
                return main;
            }
        }
        if main.is_subclass_of(GeometryCollection) && extra.is_subclass_of(GeometryCollection) {
            return GeometryCollection;
        }
        if main.is_subclass_of(extra) {
            return extra;
        }
        if extra.is_subclass_of(main) {
            return main;
        }
        Unknown
    }
}

impl Display for GeometryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use GeometryType::*;

    #[test]
    fn merge_promotes_sibling_curves() {
        assert_eq!(GeometryType::merge(LineString, CircularString, true), CompoundCurve);
        assert_eq!(GeometryType::merge(CircularString, CompoundCurve, true), CompoundCurve);
        assert_eq!(GeometryType::merge(Polygon, CurvePolygon, true), CurvePolygon);
    }

    #[test]
    fn merge_unrelated_is_unknown() {
        assert_eq!(GeometryType::merge(Point, LineString, false), Unknown);
        assert_eq!(GeometryType::merge(Point, MultiPolygon, true), Unknown);
    }

    #[test]
    fn merge_absorbs_none() {
        assert_eq!(GeometryType::merge(NoGeometry, Polygon, false), Polygon);
        assert_eq!(GeometryType::merge(Polygon, NoGeometry, true), Polygon);
        assert_eq!(GeometryType::merge(NoGeometry, NoGeometry, false), NoGeometry);
    }

    #[test]
    fn merge_unknown_dominates() {
        assert_eq!(GeometryType::merge(Unknown, Polygon, true), Unknown);
        assert_eq!(GeometryType::merge(Point, Unknown, false), Unknown);
    }

    #[test]
    fn merge_collections_fall_back() {
        assert_eq!(GeometryType::merge(MultiPoint, MultiPolygon, false), GeometryCollection);
        assert_eq!(
            GeometryType::merge(MultiLineString, GeometryCollection, false),
            GeometryCollection
        );
        // The collection fallback fires even for subclass pairs: without
        // curve promotion, any two collection subtypes collapse to
        // GeometryCollection.
        assert_eq!(
            GeometryType::merge(MultiLineString, MultiCurve, false),
            GeometryCollection
        );
        assert_eq!(GeometryType::merge(Polygon, MultiPolygon, false), Unknown);
    }

    #[test]
    fn subclass_lattice() {
        assert!(LinearRing.is_subclass_of(LineString));
        assert!(MultiPolygon.is_subclass_of(GeometryCollection));
        assert!(MultiPolygon.is_subclass_of(MultiSurface));
        assert!(Polygon.is_subclass_of(CurvePolygon));
        assert!(Polygon.is_subclass_of(Unknown));
        assert!(!Polygon.is_subclass_of(MultiPolygon));
        assert!(!GeometryCollection.is_subclass_of(MultiPoint));
    }

    #[test]
    fn dialect_codes() {
        assert_eq!(Point.legacy_code(false), 1);
        assert_eq!(Point.legacy_code(true), 0x8000_0001);
        assert_eq!(MultiPolygon.iso_code(true), 1006);
        assert_eq!(CircularString.iso_code(false), 8);
    }

    #[test]
    fn names_round_trip() {
        for t in [
            Point,
            LineString,
            Polygon,
            MultiPoint,
            MultiLineString,
            MultiPolygon,
            GeometryCollection,
            CircularString,
            CompoundCurve,
            CurvePolygon,
            MultiCurve,
            MultiSurface,
            LinearRing,
        ] {
            assert_eq!(GeometryType::from_name(t.name()), Some(t));
            assert_eq!(GeometryType::from_name(&t.name().to_lowercase()), Some(t));
        }
        assert_eq!(GeometryType::from_name("TRIANGLE"), None);
    }
}
