//! The in-memory geometry model: a closed tagged variant with recursive
//! composition, shared spatial-reference handling and the editing operations
//! the codecs are built on.

use std::sync::Arc;

use crate::datatypes::GeometryType;
use crate::error::{GeoWireError, Result};

mod coord;
mod envelope;
mod linearize;
mod srs;

pub use coord::Coord;
pub use envelope::{Envelope, Envelope3d};
pub use srs::SpatialRef;

/// A geometry: a tagged variant plus the envelope of fields every variant
/// shares (coordinate dimension and an optional shared spatial reference).
///
/// Parents own their children exclusively; `clone` deep-copies the whole
/// subtree and dropping a parent drops everything below it. The spatial
/// reference is the one shared resource: it is held by `Arc`, so assigning a
/// new one releases the old and retains the new without copying.
#[derive(Clone, Debug)]
pub struct Geometry {
    srs: Option<Arc<SpatialRef>>,
    has_z: bool,
    kind: GeometryKind,
}

/// The variant payloads.
///
/// String-like variants hold their vertices directly; containers own child
/// geometries. `Polygon` rings are `LinearRing` children with index 0 as the
/// exterior ring; `CurvePolygon` rings and `CompoundCurve` segments may be
/// any compatible curve variant.
#[derive(Clone, Debug)]
pub enum GeometryKind {
    /// `None` is the empty point.
    Point(Option<Coord>),
    LineString(Vec<Coord>),
    LinearRing(Vec<Coord>),
    /// Vertices are interpreted as consecutive three-point arcs sharing
    /// endpoints.
    CircularString(Vec<Coord>),
    CompoundCurve(Vec<Geometry>),
    Polygon(Vec<Geometry>),
    CurvePolygon(Vec<Geometry>),
    MultiPoint(Vec<Geometry>),
    MultiLineString(Vec<Geometry>),
    MultiPolygon(Vec<Geometry>),
    MultiCurve(Vec<Geometry>),
    MultiSurface(Vec<Geometry>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    fn new(kind: GeometryKind, has_z: bool) -> Self {
        Self {
            srs: None,
            has_z,
            kind,
        }
    }

    pub fn point(x: f64, y: f64) -> Self {
        Self::new(GeometryKind::Point(Some(Coord::new(x, y))), false)
    }

    pub fn point_z(x: f64, y: f64, z: f64) -> Self {
        Self::new(GeometryKind::Point(Some(Coord::new_z(x, y, z))), true)
    }

    pub fn point_empty() -> Self {
        Self::new(GeometryKind::Point(None), false)
    }

    pub fn line_string(coords: Vec<Coord>, has_z: bool) -> Self {
        Self::new(GeometryKind::LineString(coords), has_z)
    }

    pub fn linear_ring(coords: Vec<Coord>, has_z: bool) -> Self {
        Self::new(GeometryKind::LinearRing(coords), has_z)
    }

    pub fn circular_string(coords: Vec<Coord>, has_z: bool) -> Self {
        Self::new(GeometryKind::CircularString(coords), has_z)
    }

    /// Construct an empty geometry of the given type, the state `empty()`
    /// resets to. `Unknown` and `NoGeometry` cannot be instantiated.
    pub fn empty_of_type(geometry_type: GeometryType) -> Result<Self> {
        use GeometryType::*;
        let kind = match geometry_type {
            Point => GeometryKind::Point(None),
            LineString => GeometryKind::LineString(Vec::new()),
            LinearRing => GeometryKind::LinearRing(Vec::new()),
            CircularString => GeometryKind::CircularString(Vec::new()),
            CompoundCurve => GeometryKind::CompoundCurve(Vec::new()),
            Polygon => GeometryKind::Polygon(Vec::new()),
            CurvePolygon => GeometryKind::CurvePolygon(Vec::new()),
            MultiPoint => GeometryKind::MultiPoint(Vec::new()),
            MultiLineString => GeometryKind::MultiLineString(Vec::new()),
            MultiPolygon => GeometryKind::MultiPolygon(Vec::new()),
            MultiCurve => GeometryKind::MultiCurve(Vec::new()),
            MultiSurface => GeometryKind::MultiSurface(Vec::new()),
            GeometryCollection => GeometryKind::GeometryCollection(Vec::new()),
            Unknown | NoGeometry => {
                return Err(GeoWireError::IncorrectGeometryType(format!(
                    "cannot instantiate geometry of type {geometry_type}"
                )))
            }
        };
        Ok(Self::new(kind, false))
    }

    pub fn geometry_type(&self) -> GeometryType {
        use GeometryKind::*;
        match &self.kind {
            Point(_) => GeometryType::Point,
            LineString(_) => GeometryType::LineString,
            LinearRing(_) => GeometryType::LinearRing,
            CircularString(_) => GeometryType::CircularString,
            CompoundCurve(_) => GeometryType::CompoundCurve,
            Polygon(_) => GeometryType::Polygon,
            CurvePolygon(_) => GeometryType::CurvePolygon,
            MultiPoint(_) => GeometryType::MultiPoint,
            MultiLineString(_) => GeometryType::MultiLineString,
            MultiPolygon(_) => GeometryType::MultiPolygon,
            MultiCurve(_) => GeometryType::MultiCurve,
            MultiSurface(_) => GeometryType::MultiSurface,
            GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    pub fn name(&self) -> &'static str {
        self.geometry_type().name()
    }

    pub fn kind(&self) -> &GeometryKind {
        &self.kind
    }

    pub fn has_z(&self) -> bool {
        self.has_z
    }

    /// 2 or 3.
    pub fn coord_dimension(&self) -> u32 {
        if self.has_z {
            3
        } else {
            2
        }
    }

    /// Add or strip the Z dimension, recursively. Enabling Z leaves existing
    /// `z` slots at their current values (zero unless set); stripping zeroes
    /// them so equality stays well-defined.
    pub fn set_3d(&mut self, has_z: bool) {
        self.has_z = has_z;
        match &mut self.kind {
            GeometryKind::Point(c) => {
                if !has_z {
                    if let Some(c) = c {
                        c.z = 0.0;
                    }
                }
            }
            GeometryKind::LineString(coords)
            | GeometryKind::LinearRing(coords)
            | GeometryKind::CircularString(coords) => {
                if !has_z {
                    for c in coords.iter_mut() {
                        c.z = 0.0;
                    }
                }
            }
            _ => {
                for child in self.children_mut() {
                    child.set_3d(has_z);
                }
            }
        }
    }

    /// Set the coordinate dimension (2 or 3), propagating to all children.
    pub fn set_coord_dimension(&mut self, dimension: u32) -> Result<()> {
        match dimension {
            2 => self.set_3d(false),
            3 => self.set_3d(true),
            other => {
                return Err(GeoWireError::IncorrectGeometryType(format!(
                    "invalid coordinate dimension {other}"
                )))
            }
        }
        Ok(())
    }

    /// Convert to strictly 2D, zeroing and dropping every Z ordinate in the
    /// subtree.
    pub fn flatten_to_2d(&mut self) {
        self.set_3d(false);
    }

    pub fn spatial_ref(&self) -> Option<&Arc<SpatialRef>> {
        self.srs.as_ref()
    }

    /// Assign a spatial reference, releasing the previously held one.
    /// Propagates to all owned children, which share the same reference.
    pub fn set_spatial_ref(&mut self, srs: Option<Arc<SpatialRef>>) {
        for child in self.children_mut() {
            child.set_spatial_ref(srs.clone());
        }
        self.srs = srs;
    }

    /// The vertex slice of a string-like variant, empty for anything else.
    pub fn coords(&self) -> &[Coord] {
        match &self.kind {
            GeometryKind::LineString(c)
            | GeometryKind::LinearRing(c)
            | GeometryKind::CircularString(c) => c,
            _ => &[],
        }
    }

    pub(crate) fn coords_mut(&mut self) -> Option<&mut Vec<Coord>> {
        match &mut self.kind {
            GeometryKind::LineString(c)
            | GeometryKind::LinearRing(c)
            | GeometryKind::CircularString(c) => Some(c),
            _ => None,
        }
    }

    /// The point's coordinate, if this is a non-empty point.
    pub fn point_coord(&self) -> Option<&Coord> {
        match &self.kind {
            GeometryKind::Point(c) => c.as_ref(),
            _ => None,
        }
    }

    /// Owned children of containers (collection children, polygon rings,
    /// compound-curve segments); empty for leaf variants.
    pub fn children(&self) -> &[Geometry] {
        match &self.kind {
            GeometryKind::CompoundCurve(c)
            | GeometryKind::Polygon(c)
            | GeometryKind::CurvePolygon(c)
            | GeometryKind::MultiPoint(c)
            | GeometryKind::MultiLineString(c)
            | GeometryKind::MultiPolygon(c)
            | GeometryKind::MultiCurve(c)
            | GeometryKind::MultiSurface(c)
            | GeometryKind::GeometryCollection(c) => c,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> &mut [Geometry] {
        match &mut self.kind {
            GeometryKind::CompoundCurve(c)
            | GeometryKind::Polygon(c)
            | GeometryKind::CurvePolygon(c)
            | GeometryKind::MultiPoint(c)
            | GeometryKind::MultiLineString(c)
            | GeometryKind::MultiPolygon(c)
            | GeometryKind::MultiCurve(c)
            | GeometryKind::MultiSurface(c)
            | GeometryKind::GeometryCollection(c) => c,
            _ => &mut [],
        }
    }

    fn children_vec_mut(&mut self) -> Option<&mut Vec<Geometry>> {
        match &mut self.kind {
            GeometryKind::CompoundCurve(c)
            | GeometryKind::Polygon(c)
            | GeometryKind::CurvePolygon(c)
            | GeometryKind::MultiPoint(c)
            | GeometryKind::MultiLineString(c)
            | GeometryKind::MultiPolygon(c)
            | GeometryKind::MultiCurve(c)
            | GeometryKind::MultiSurface(c)
            | GeometryKind::GeometryCollection(c) => Some(c),
            _ => None,
        }
    }

    pub fn num_children(&self) -> usize {
        self.children().len()
    }

    /// Which child types a collection subtype accepts.
    pub fn is_compatible_subtype(collection: GeometryType, child: GeometryType) -> bool {
        use GeometryType::*;
        match collection {
            MultiPoint => child == Point,
            MultiLineString => matches!(child, LineString | LinearRing),
            MultiPolygon => matches!(child, Polygon | CurvePolygon),
            MultiCurve => matches!(child, LineString | LinearRing | CircularString | CompoundCurve),
            MultiSurface => matches!(child, Polygon | CurvePolygon),
            GeometryCollection => child != NoGeometry,
            _ => false,
        }
    }

    /// Append a child to a collection. Adding an incompatible child is an
    /// error, not a coercion. The child inherits the collection's spatial
    /// reference and its dimension widens the collection's.
    pub fn add_child(&mut self, child: Geometry) -> Result<()> {
        let own_type = self.geometry_type();
        if !own_type.is_collection() {
            return Err(GeoWireError::IncorrectGeometryType(format!(
                "cannot add a child geometry to {own_type}"
            )));
        }
        if !Self::is_compatible_subtype(own_type, child.geometry_type()) {
            return Err(GeoWireError::IncorrectGeometryType(format!(
                "{} is not a valid member of {own_type}",
                child.geometry_type()
            )));
        }
        self.push_child_unchecked(child);
        Ok(())
    }

    /// Append a ring to a Polygon or CurvePolygon. The first ring added is
    /// the exterior ring. Plain LineStrings are re-tagged as LinearRings on
    /// a Polygon; a CurvePolygon also accepts arc variants.
    pub fn add_ring(&mut self, ring: Geometry) -> Result<()> {
        use GeometryType::*;
        let ring = match (self.geometry_type(), ring.geometry_type()) {
            (Polygon, LinearRing) => ring,
            (Polygon, LineString) => {
                let Geometry { srs, has_z, kind } = ring;
                let coords = match kind {
                    GeometryKind::LineString(coords) => coords,
                    _ => unreachable!(),
                };
                Geometry {
                    srs,
                    has_z,
                    kind: GeometryKind::LinearRing(coords),
                }
            }
            (CurvePolygon, LineString | LinearRing | CircularString | CompoundCurve) => ring,
            (own, other) => {
                return Err(GeoWireError::IncorrectGeometryType(format!(
                    "{other} is not a valid ring for {own}"
                )))
            }
        };
        self.push_child_unchecked(ring);
        Ok(())
    }

    /// Append a curve segment to a CompoundCurve.
    pub fn add_curve_segment(&mut self, segment: Geometry) -> Result<()> {
        use GeometryType::*;
        match (self.geometry_type(), segment.geometry_type()) {
            (CompoundCurve, LineString | LinearRing | CircularString) => {
                self.push_child_unchecked(segment);
                Ok(())
            }
            (own, other) => Err(GeoWireError::IncorrectGeometryType(format!(
                "{other} is not a valid curve segment for {own}"
            ))),
        }
    }

    /// Append without the subtype check; codec internals construct children
    /// they already validated.
    pub(crate) fn push_child_unchecked(&mut self, mut child: Geometry) {
        if child.has_z {
            self.has_z = true;
        } else if self.has_z {
            child.set_3d(true);
        }
        if self.srs.is_some() {
            child.set_spatial_ref(self.srs.clone());
        }
        self.children_vec_mut()
            .expect("push_child_unchecked on a leaf variant")
            .push(child);
    }

    /// No vertices anywhere in the subtree.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            GeometryKind::Point(c) => c.is_none(),
            GeometryKind::LineString(c)
            | GeometryKind::LinearRing(c)
            | GeometryKind::CircularString(c) => c.is_empty(),
            _ => self.children().iter().all(|g| g.is_empty()),
        }
    }

    /// Reset to construction state, releasing owned children. The type and
    /// spatial reference survive.
    pub fn empty(&mut self) {
        self.has_z = false;
        match &mut self.kind {
            GeometryKind::Point(c) => *c = None,
            GeometryKind::LineString(c)
            | GeometryKind::LinearRing(c)
            | GeometryKind::CircularString(c) => c.clear(),
            _ => self
                .children_vec_mut()
                .expect("container variant")
                .clear(),
        }
    }

    /// Recursive min/max over all vertices; empty geometries contribute no
    /// bound.
    pub fn envelope(&self) -> Envelope {
        let mut env = Envelope::new();
        self.accumulate_envelope(&mut env);
        env
    }

    fn accumulate_envelope(&self, env: &mut Envelope) {
        match &self.kind {
            GeometryKind::Point(Some(c)) => env.merge(c),
            GeometryKind::Point(None) => {}
            GeometryKind::LineString(coords)
            | GeometryKind::LinearRing(coords)
            | GeometryKind::CircularString(coords) => {
                for c in coords {
                    env.merge(c);
                }
            }
            _ => {
                for child in self.children() {
                    child.accumulate_envelope(env);
                }
            }
        }
    }

    pub fn envelope3d(&self) -> Envelope3d {
        let mut env = Envelope3d::new();
        self.accumulate_envelope3d(&mut env);
        env
    }

    fn accumulate_envelope3d(&self, env: &mut Envelope3d) {
        match &self.kind {
            GeometryKind::Point(Some(c)) => env.merge(c),
            GeometryKind::Point(None) => {}
            GeometryKind::LineString(coords)
            | GeometryKind::LinearRing(coords)
            | GeometryKind::CircularString(coords) => {
                for c in coords {
                    env.merge(c);
                }
            }
            _ => {
                for child in self.children() {
                    child.accumulate_envelope3d(env);
                }
            }
        }
    }

    /// Coarse intersection test: envelope overlap. The real predicate
    /// belongs to the external computational-geometry engine; this proxy is
    /// the documented fallback when none is present.
    pub fn intersects(&self, other: &Geometry) -> bool {
        self.envelope().intersects(&other.envelope())
    }

    /// Exchange X and Y on every vertex, recursively. Used to repair
    /// axis-order mismatches.
    pub fn swap_xy(&mut self) {
        match &mut self.kind {
            GeometryKind::Point(Some(c)) => std::mem::swap(&mut c.x, &mut c.y),
            GeometryKind::Point(None) => {}
            GeometryKind::LineString(coords)
            | GeometryKind::LinearRing(coords)
            | GeometryKind::CircularString(coords) => {
                for c in coords.iter_mut() {
                    std::mem::swap(&mut c.x, &mut c.y);
                }
            }
            _ => {
                for child in self.children_mut() {
                    child.swap_xy();
                }
            }
        }
    }

    /// Subdivide every edge longer than `max_length` by inserting evenly
    /// spaced intermediate vertices (with Z left at 0), recursively. A no-op
    /// for points and arc strings, whose shape is not defined by its chords.
    pub fn segmentize(&mut self, max_length: f64) {
        if max_length <= 0.0 {
            return;
        }
        match &mut self.kind {
            GeometryKind::LineString(coords) | GeometryKind::LinearRing(coords) => {
                if coords.len() < 2 {
                    return;
                }
                let mut out: Vec<Coord> = Vec::with_capacity(coords.len());
                out.push(coords[0]);
                for pair in coords.windows(2) {
                    let (a, b) = (pair[0], pair[1]);
                    let dist = a.distance2d(&b);
                    if dist > max_length {
                        let pieces = (dist / max_length).ceil() as usize;
                        for k in 1..pieces {
                            let t = k as f64 / pieces as f64;
                            out.push(Coord::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t));
                        }
                    }
                    out.push(b);
                }
                *coords = out;
            }
            GeometryKind::Point(_) | GeometryKind::CircularString(_) => {}
            _ => {
                for child in self.children_mut() {
                    child.segmentize(max_length);
                }
            }
        }
    }

    /// Whether a string-like geometry ends where it starts (XY comparison).
    pub fn is_closed(&self) -> bool {
        let coords = self.coords();
        match (coords.first(), coords.last()) {
            (Some(first), Some(last)) => first.same_xy(last),
            _ => false,
        }
    }

    /// Append a closing vertex to every open linear ring in the subtree.
    pub fn close_rings(&mut self) {
        match &mut self.kind {
            GeometryKind::LinearRing(coords) => {
                if coords.len() >= 2 {
                    let first = coords[0];
                    if !coords.last().map(|l| first.same_xy(l)).unwrap_or(true) {
                        coords.push(first);
                    }
                }
            }
            _ => {
                for child in self.children_mut() {
                    child.close_rings();
                }
            }
        }
    }

    /// Reverse vertex order in place (string-like variants only).
    pub fn reverse(&mut self) {
        if let Some(coords) = self.coords_mut() {
            coords.reverse();
        }
    }

    /// Set the vertex at `index`, growing the sequence with zero vertices if
    /// needed. An error on non-string variants.
    pub fn set_point(&mut self, index: usize, coord: Coord) -> Result<()> {
        match self.coords_mut() {
            Some(coords) => {
                if index >= coords.len() {
                    coords.resize(index + 1, Coord::default());
                }
                coords[index] = coord;
                Ok(())
            }
            None => match (&mut self.kind, index) {
                (GeometryKind::Point(slot), 0) => {
                    *slot = Some(coord);
                    Ok(())
                }
                _ => Err(GeoWireError::IncorrectGeometryType(
                    "set_point on a geometry without a vertex sequence".to_string(),
                )),
            },
        }
    }

    /// Polygon accessors. `None` when there is no such ring.
    pub fn exterior_ring(&self) -> Option<&Geometry> {
        match &self.kind {
            GeometryKind::Polygon(rings) | GeometryKind::CurvePolygon(rings) => rings.first(),
            _ => None,
        }
    }

    pub fn num_interior_rings(&self) -> usize {
        match &self.kind {
            GeometryKind::Polygon(rings) | GeometryKind::CurvePolygon(rings) => {
                rings.len().saturating_sub(1)
            }
            _ => 0,
        }
    }

    pub fn interior_ring(&self, i: usize) -> Option<&Geometry> {
        match &self.kind {
            GeometryKind::Polygon(rings) | GeometryKind::CurvePolygon(rings) => rings.get(i + 1),
            _ => None,
        }
    }

    /// Structural equality: same variant, same dimension, same child count
    /// and same vertices, recursively. The spatial reference does not
    /// participate.
    pub fn equals(&self, other: &Geometry) -> bool {
        if self.has_z != other.has_z {
            return false;
        }
        use GeometryKind::*;
        match (&self.kind, &other.kind) {
            (Point(a), Point(b)) => a == b,
            (LineString(a), LineString(b))
            | (LinearRing(a), LinearRing(b))
            | (CircularString(a), CircularString(b)) => a == b,
            _ => {
                self.geometry_type() == other.geometry_type()
                    && self.children().len() == other.children().len()
                    && self
                        .children()
                        .iter()
                        .zip(other.children())
                        .all(|(a, b)| a.equals(b))
            }
        }
    }
}

impl PartialEq for Geometry {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

/// Twice the signed area of a closed ring (shoelace). Positive for
/// counter-clockwise winding in a Y-up plane.
pub(crate) fn signed_ring_area(coords: &[Coord]) -> f64 {
    if coords.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for pair in coords.windows(2) {
        sum += pair[0].x * pair[1].y - pair[1].x * pair[0].y;
    }
    // Close implicitly in case the caller's ring is open.
    let (first, last) = (coords[0], coords[coords.len() - 1]);
    if !first.same_xy(&last) {
        sum += last.x * first.y - first.x * last.y;
    }
    sum
}

pub(crate) fn ring_is_clockwise(coords: &[Coord]) -> bool {
    signed_ring_area(coords) < 0.0
}
