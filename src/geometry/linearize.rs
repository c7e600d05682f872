//! Curve linearization: lossy approximation of arc geometries by straight
//! segments, and the best-effort inverse.

use crate::geometry::{Coord, Geometry, GeometryKind};

/// Default subdivision step when the caller passes a non-positive one, in
/// degrees of arc.
const DEFAULT_ARC_STEP_DEG: f64 = 4.0;

impl Geometry {
    /// Whether this geometry or any owned child is a non-linear variant.
    pub fn has_curve_geometry(&self) -> bool {
        self.geometry_type().is_non_linear()
            || self.children().iter().any(|c| c.has_curve_geometry())
    }

    /// Produce the equivalent linear geometry, approximating arcs by
    /// subdivision with at most `max_angle_step_deg` degrees per segment
    /// (non-positive means the default step). Linear inputs come back as a
    /// clone; the conversion is lossy for arcs.
    pub fn linearize(&self, max_angle_step_deg: f64) -> Geometry {
        let step = if max_angle_step_deg > 0.0 {
            max_angle_step_deg
        } else {
            DEFAULT_ARC_STEP_DEG
        };
        let mut out = self.linearize_inner(step);
        out.set_spatial_ref(self.spatial_ref().cloned());
        out
    }

    fn linearize_inner(&self, step_deg: f64) -> Geometry {
        use crate::datatypes::GeometryType;
        match self.kind() {
            GeometryKind::CircularString(coords) => {
                Geometry::line_string(linearize_arc_string(coords, step_deg), self.has_z())
            }
            GeometryKind::CompoundCurve(segments) => {
                let mut coords: Vec<Coord> = Vec::new();
                for segment in segments {
                    let part = segment.linearize_inner(step_deg);
                    for c in part.coords() {
                        // Joints repeat the previous segment's end vertex.
                        if coords.last().map(|l| l.same_xy(c)) != Some(true) {
                            coords.push(*c);
                        }
                    }
                }
                Geometry::line_string(coords, self.has_z())
            }
            GeometryKind::CurvePolygon(rings) => {
                let mut poly = Geometry::empty_of_type(GeometryType::Polygon)
                    .expect("constructible type");
                for ring in rings {
                    let lin = ring.linearize_inner(step_deg);
                    let mut ring = Geometry::linear_ring(lin.coords().to_vec(), lin.has_z());
                    ring.close_rings();
                    poly.push_child_unchecked(ring);
                }
                poly
            }
            GeometryKind::MultiCurve(children) => {
                rebuild_collection(GeometryType::MultiLineString, children, step_deg)
            }
            GeometryKind::MultiSurface(children) => {
                rebuild_collection(GeometryType::MultiPolygon, children, step_deg)
            }
            GeometryKind::MultiPolygon(children) => {
                rebuild_collection(GeometryType::MultiPolygon, children, step_deg)
            }
            GeometryKind::GeometryCollection(children) => {
                rebuild_collection(GeometryType::GeometryCollection, children, step_deg)
            }
            _ => self.clone(),
        }
    }

    /// Best-effort inverse of [`Geometry::linearize`]: container variants
    /// are re-tagged as their curve counterparts, everything else is a
    /// clone. No arc structure is reconstructed from vertex patterns.
    pub fn as_curve_geometry(&self) -> Geometry {
        use crate::datatypes::GeometryType;
        match self.kind() {
            GeometryKind::Polygon(_) => {
                let mut out = Geometry::empty_of_type(GeometryType::CurvePolygon)
                    .expect("constructible type");
                out.set_spatial_ref(self.spatial_ref().cloned());
                for ring in self.children() {
                    out.push_child_unchecked(ring.clone());
                }
                out
            }
            GeometryKind::MultiLineString(children) => {
                retag_collection(GeometryType::MultiCurve, self, children)
            }
            GeometryKind::MultiPolygon(children) => {
                retag_collection(GeometryType::MultiSurface, self, children)
            }
            GeometryKind::GeometryCollection(children) => {
                retag_collection(GeometryType::GeometryCollection, self, children)
            }
            _ => self.clone(),
        }
    }
}

fn rebuild_collection(
    target: crate::datatypes::GeometryType,
    children: &[Geometry],
    step_deg: f64,
) -> Geometry {
    let mut out = Geometry::empty_of_type(target).expect("constructible type");
    for child in children {
        out.push_child_unchecked(child.linearize_inner(step_deg));
    }
    out
}

fn retag_collection(
    target: crate::datatypes::GeometryType,
    original: &Geometry,
    children: &[Geometry],
) -> Geometry {
    let mut out = Geometry::empty_of_type(target).expect("constructible type");
    out.set_spatial_ref(original.spatial_ref().cloned());
    for child in children {
        out.push_child_unchecked(child.as_curve_geometry());
    }
    out
}

/// Expand a circular string's consecutive three-point arcs into chords.
fn linearize_arc_string(coords: &[Coord], step_deg: f64) -> Vec<Coord> {
    let mut out: Vec<Coord> = Vec::new();
    if coords.is_empty() {
        return out;
    }
    out.push(coords[0]);
    let step_rad = step_deg.to_radians();
    let mut i = 0;
    while i + 2 < coords.len() {
        let (p0, p1, p2) = (coords[i], coords[i + 1], coords[i + 2]);
        linearize_single_arc(&p0, &p1, &p2, step_rad, &mut out);
        i += 2;
    }
    // A trailing unpaired vertex degrades to a straight segment.
    if i + 1 < coords.len() {
        out.push(coords[i + 1]);
    }
    out
}

/// Subdivide one arc through (p0, p1, p2), appending everything after p0.
fn linearize_single_arc(p0: &Coord, p1: &Coord, p2: &Coord, step_rad: f64, out: &mut Vec<Coord>) {
    let (center, collinear) = arc_center(p0, p1, p2);
    if collinear {
        out.push(*p1);
        out.push(*p2);
        return;
    }
    let (cx, cy) = center;
    let radius = ((p0.x - cx).powi(2) + (p0.y - cy).powi(2)).sqrt();
    let a0 = (p0.y - cy).atan2(p0.x - cx);
    let a1 = (p1.y - cy).atan2(p1.x - cx);
    let a2 = (p2.y - cy).atan2(p2.x - cx);

    const TAU: f64 = std::f64::consts::TAU;
    let ccw01 = (a1 - a0).rem_euclid(TAU);
    let mut ccw02 = (a2 - a0).rem_euclid(TAU);
    if ccw02 == 0.0 {
        // Start equals end: a full circle through p1.
        ccw02 = TAU;
    }
    // The arc runs counter-clockwise iff the intermediate point lies on the
    // counter-clockwise path from start to end.
    let sweep = if ccw01 <= ccw02 { ccw02 } else { ccw02 - TAU };

    let pieces = (sweep.abs() / step_rad).ceil().max(1.0) as usize;
    for k in 1..pieces {
        let t = k as f64 / pieces as f64;
        let angle = a0 + sweep * t;
        out.push(Coord::new_z(
            cx + radius * angle.cos(),
            cy + radius * angle.sin(),
            p0.z + (p2.z - p0.z) * t,
        ));
    }
    out.push(*p2);
}

/// Circle center through three points; `true` means the points are
/// (numerically) collinear and no circle exists.
fn arc_center(p0: &Coord, p1: &Coord, p2: &Coord) -> ((f64, f64), bool) {
    let d = 2.0 * (p0.x * (p1.y - p2.y) + p1.x * (p2.y - p0.y) + p2.x * (p0.y - p1.y));
    let scale = p0.x.abs().max(p0.y.abs()).max(p1.x.abs()).max(p1.y.abs()).max(1.0);
    if d.abs() <= 1e-12 * scale * scale {
        return ((0.0, 0.0), true);
    }
    let sq0 = p0.x * p0.x + p0.y * p0.y;
    let sq1 = p1.x * p1.x + p1.y * p1.y;
    let sq2 = p2.x * p2.x + p2.y * p2.y;
    let ux = (sq0 * (p1.y - p2.y) + sq1 * (p2.y - p0.y) + sq2 * (p0.y - p1.y)) / d;
    let uy = (sq0 * (p2.x - p1.x) + sq1 * (p0.x - p2.x) + sq2 * (p1.x - p0.x)) / d;
    ((ux, uy), false)
}
