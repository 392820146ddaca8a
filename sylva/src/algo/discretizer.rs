//! Discretizer: parametric and compound nodes to explicit models
//!
//! The discretizer is the fallback nearly every other visitor leans on: any
//! node it understands is converted into an explicit model node (point set,
//! polyline, or mesh) with a fresh identity, stored as a side-effect field
//! and retrievable via [`Discretizer::discretization`].  Explicit models
//! discretize to themselves, identity (and thus node id) preserved.
//!
//! Output is deterministic given the node's parameters and resolution
//! settings; there is no randomness anywhere.  The discretizer itself holds
//! no memoization: callers that discretize the same node more than once per
//! traversal cache the result keyed by node identity.
use crate::scene::{
    AsymmetricHull, AxisRotated, BezierCurve, BezierCurve2, BezierPatch, Box3, Cone, Cylinder,
    Disc, ElevationGrid, EulerRotated, ExtrudedHull, Extrusion, FaceSet, Frustum, Geometry,
    GeometryKind, Group, Ifs, Inline, NurbsCurve, NurbsCurve2, NurbsPatch, Oriented, Paraboloid,
    PointSet, PointSet2, Polyline, Polyline2, QuadSet, Revolution, Scaled, Sphere, Swung,
    Translated, TriangleSet,
};
use crate::visitor::Visitor;
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use std::f32::consts::{PI, TAU};

/// Converts parametric and compound geometry into explicit models
#[derive(Default)]
pub struct Discretizer {
    discretization: Option<Geometry>,
    texcoord: bool,
}

impl Discretizer {
    /// Builds a discretizer with texture coordinates disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles texture-coordinate generation for patch-like surfaces
    ///
    /// This is per-call configuration, not persistent state: callers set it
    /// immediately before each `apply`, based on whether the current
    /// appearance is textured.
    pub fn compute_tex_coord(&mut self, enable: bool) {
        self.texcoord = enable;
    }

    /// Result of the most recent successful `apply`
    pub fn discretization(&self) -> Option<&Geometry> {
        self.discretization.as_ref()
    }

    fn set(&mut self, kind: GeometryKind) -> bool {
        self.discretization = Some(Geometry::new(kind));
        true
    }

    /// Discretizes a child node, returning the resulting explicit model
    fn child(&mut self, g: &Geometry) -> Option<Geometry> {
        if g.apply(self) {
            self.discretization.clone()
        } else {
            None
        }
    }

    /// Discretizes a child and bakes an affine transform into its points
    fn transformed_child(&mut self, g: &Geometry, m: &Matrix4<f32>) -> bool {
        let Some(model) = self.child(g) else {
            log::debug!("discretization failed under transform at {}", g.id());
            return false;
        };
        match transform_explicit(&model, m) {
            Some(kind) => self.set(kind),
            None => false,
        }
    }
}

/// Applies an affine transform to an explicit model's points, producing a
/// new variant of the same topology
fn transform_explicit(model: &Geometry, m: &Matrix4<f32>) -> Option<GeometryKind> {
    let map = |pts: &[Point3<f32>]| -> Vec<Point3<f32>> {
        pts.iter().map(|p| m.transform_point(p)).collect()
    };
    match model.kind() {
        GeometryKind::TriangleSet(t) => Some(GeometryKind::TriangleSet(TriangleSet {
            points: map(&t.points),
            indices: t.indices.clone(),
            tex_coords: t.tex_coords.clone(),
        })),
        GeometryKind::QuadSet(q) => Some(GeometryKind::QuadSet(QuadSet {
            points: map(&q.points),
            indices: q.indices.clone(),
            tex_coords: q.tex_coords.clone(),
        })),
        GeometryKind::FaceSet(f) => Some(GeometryKind::FaceSet(FaceSet {
            points: map(&f.points),
            indices: f.indices.clone(),
        })),
        GeometryKind::PointSet(p) => Some(GeometryKind::PointSet(PointSet {
            points: map(&p.points),
        })),
        GeometryKind::Polyline(p) => Some(GeometryKind::Polyline(Polyline {
            points: map(&p.points),
        })),
        _ => None,
    }
}

/// Collects an explicit model's faces into a merge accumulator
///
/// Curves and point clouds cannot be merged into a face set; they make the
/// merge fail.
fn merge_into(acc: &mut FaceSet, model: &Geometry) -> bool {
    let base = acc.points.len() as u32;
    match model.kind() {
        GeometryKind::TriangleSet(t) => {
            acc.points.extend_from_slice(&t.points);
            acc.indices
                .extend(t.indices.iter().map(|f| f.iter().map(|i| i + base).collect()));
            true
        }
        GeometryKind::QuadSet(q) => {
            acc.points.extend_from_slice(&q.points);
            acc.indices
                .extend(q.indices.iter().map(|f| f.iter().map(|i| i + base).collect()));
            true
        }
        GeometryKind::FaceSet(f) => {
            acc.points.extend_from_slice(&f.points);
            acc.indices
                .extend(f.indices.iter().map(|f| f.iter().map(|i| i + base).collect()));
            true
        }
        _ => false,
    }
}

/// Evaluates a Bezier curve at `t` by de Casteljau reduction
fn de_casteljau(ctrl: &[Point3<f32>], t: f32) -> Point3<f32> {
    let mut pts: Vec<Vector3<f32>> = ctrl.iter().map(|p| p.coords).collect();
    let mut n = pts.len();
    while n > 1 {
        for i in 0..n - 1 {
            pts[i] = pts[i].lerp(&pts[i + 1], t);
        }
        n -= 1;
    }
    Point3::from(pts[0])
}

/// Evaluates a NURBS curve at `u` by de Boor recursion on homogeneous
/// coordinates
///
/// `knots` has length `ctrl.len() + degree + 1`; the valid domain is
/// `[knots[degree], knots[ctrl.len()]]`.
fn de_boor(
    ctrl: &[Point3<f32>],
    weights: &[f32],
    knots: &[f32],
    degree: usize,
    u: f32,
) -> Point3<f32> {
    let n = ctrl.len();
    // locate the knot span, clamped to the valid domain
    let mut k = degree;
    while k + 1 < n && u >= knots[k + 1] {
        k += 1;
    }
    let mut d: Vec<[f32; 4]> = (0..=degree)
        .map(|j| {
            let i = j + k - degree;
            let w = weights[i];
            let p = ctrl[i];
            [p.x * w, p.y * w, p.z * w, w]
        })
        .collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let i = j + k - degree;
            let denom = knots[i + 1 + degree - r] - knots[i];
            let alpha = if denom.abs() < f32::EPSILON {
                0.0
            } else {
                (u - knots[i]) / denom
            };
            for c in 0..4 {
                d[j][c] = (1.0 - alpha) * d[j - 1][c] + alpha * d[j][c];
            }
        }
    }
    let [x, y, z, w] = d[degree];
    let w = if w.abs() < f32::EPSILON { 1.0 } else { w };
    Point3::new(x / w, y / w, z / w)
}

/// Samples a NURBS curve across its domain at `stride + 1` points
fn sample_nurbs(
    ctrl: &[Point3<f32>],
    weights: &[f32],
    knots: &[f32],
    degree: usize,
    stride: u32,
) -> Option<Vec<Point3<f32>>> {
    if ctrl.len() <= degree
        || weights.len() != ctrl.len()
        || knots.len() != ctrl.len() + degree + 1
    {
        return None;
    }
    let lo = knots[degree];
    let hi = knots[ctrl.len()];
    let n = stride.max(1);
    Some(
        (0..=n)
            .map(|i| {
                let u = lo + (hi - lo) * i as f32 / n as f32;
                de_boor(ctrl, weights, knots, degree, u)
            })
            .collect(),
    )
}

fn lift2(points: &[Point2<f32>]) -> Vec<Point3<f32>> {
    points.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect()
}

/// Builds a quad grid over `rows` of rings, optionally wrapping each ring
fn grid_quads(rows: &[Vec<Point3<f32>>], wrap: bool) -> QuadSet {
    let cols = rows.first().map_or(0, Vec::len) as u32;
    let mut points = Vec::new();
    for row in rows {
        points.extend_from_slice(row);
    }
    let mut indices = Vec::new();
    let span = if wrap { cols } else { cols.saturating_sub(1) };
    for r in 0..rows.len().saturating_sub(1) as u32 {
        for c in 0..span {
            let c1 = (c + 1) % cols;
            indices.push([
                r * cols + c,
                r * cols + c1,
                (r + 1) * cols + c1,
                (r + 1) * cols + c,
            ]);
        }
    }
    QuadSet {
        points,
        indices,
        tex_coords: None,
    }
}

/// Triangle bands between rings plus apex fans, for closed solids of
/// revolution
struct BandBuilder {
    points: Vec<Point3<f32>>,
    indices: Vec<[u32; 3]>,
    slices: u32,
    last_ring: Option<u32>,
}

impl BandBuilder {
    fn new(slices: u32) -> Self {
        BandBuilder {
            points: Vec::new(),
            indices: Vec::new(),
            slices,
            last_ring: None,
        }
    }

    fn add_apex(&mut self, p: Point3<f32>) -> u32 {
        self.points.push(p);
        (self.points.len() - 1) as u32
    }

    /// Appends a ring; if a previous ring exists, joins them with a band of
    /// `2 * slices` triangles
    fn add_ring(&mut self, ring: impl Iterator<Item = Point3<f32>>) {
        let start = self.points.len() as u32;
        self.points.extend(ring);
        if let Some(prev) = self.last_ring {
            for j in 0..self.slices {
                let j1 = (j + 1) % self.slices;
                self.indices.push([prev + j, start + j, start + j1]);
                self.indices.push([prev + j, start + j1, prev + j1]);
            }
        }
        self.last_ring = Some(start);
    }

    /// Fans the current ring to an apex (`slices` triangles)
    fn fan(&mut self, apex: u32, apex_up: bool) {
        let ring = self.last_ring.expect("fan without a ring");
        for j in 0..self.slices {
            let j1 = (j + 1) % self.slices;
            if apex_up {
                self.indices.push([ring + j, ring + j1, apex]);
            } else {
                self.indices.push([ring + j1, ring + j, apex]);
            }
        }
    }

    fn build(self) -> TriangleSet {
        TriangleSet {
            points: self.points,
            indices: self.indices,
            tex_coords: None,
        }
    }
}

fn circle(radius: f32, z: f32, slices: u32) -> impl Iterator<Item = Point3<f32>> {
    (0..slices).map(move |j| {
        let phi = TAU * j as f32 / slices as f32;
        Point3::new(radius * phi.cos(), radius * phi.sin(), z)
    })
}

impl Visitor for Discretizer {
    fn box3(&mut self, _g: &Geometry, d: &Box3) -> bool {
        let s = d.size;
        let points = vec![
            Point3::new(-s.x, -s.y, -s.z),
            Point3::new(s.x, -s.y, -s.z),
            Point3::new(s.x, s.y, -s.z),
            Point3::new(-s.x, s.y, -s.z),
            Point3::new(-s.x, -s.y, s.z),
            Point3::new(s.x, -s.y, s.z),
            Point3::new(s.x, s.y, s.z),
            Point3::new(-s.x, s.y, s.z),
        ];
        let indices = vec![
            [0, 3, 2, 1], // bottom
            [4, 5, 6, 7], // top
            [0, 1, 5, 4], // -Y
            [2, 3, 7, 6], // +Y
            [1, 2, 6, 5], // +X
            [3, 0, 4, 7], // -X
        ];
        self.set(GeometryKind::QuadSet(QuadSet {
            points,
            indices,
            tex_coords: None,
        }))
    }

    fn sphere(&mut self, _g: &Geometry, d: &Sphere) -> bool {
        if d.radius <= 0.0 || d.slices < 3 || d.stacks < 2 {
            return false;
        }
        let mut b = BandBuilder::new(d.slices);
        let north = b.add_apex(Point3::new(0.0, 0.0, d.radius));
        let south = b.add_apex(Point3::new(0.0, 0.0, -d.radius));
        for k in 1..d.stacks {
            let theta = PI * k as f32 / d.stacks as f32;
            b.add_ring(circle(d.radius * theta.sin(), d.radius * theta.cos(), d.slices));
            if k == 1 {
                b.fan(north, true);
            }
        }
        b.fan(south, false);
        self.set(GeometryKind::TriangleSet(b.build()))
    }

    fn cone(&mut self, _g: &Geometry, d: &Cone) -> bool {
        if d.radius <= 0.0 || d.height <= 0.0 || d.slices < 3 {
            return false;
        }
        let mut b = BandBuilder::new(d.slices);
        let apex = b.add_apex(Point3::new(0.0, 0.0, d.height));
        b.add_ring(circle(d.radius, 0.0, d.slices));
        b.fan(apex, true);
        if d.solid {
            let center = b.add_apex(Point3::new(0.0, 0.0, 0.0));
            b.fan(center, false);
        }
        self.set(GeometryKind::TriangleSet(b.build()))
    }

    fn cylinder(&mut self, _g: &Geometry, d: &Cylinder) -> bool {
        self.frustum(
            _g,
            &Frustum {
                radius: d.radius,
                height: d.height,
                taper: 1.0,
                solid: d.solid,
                slices: d.slices,
            },
        )
    }

    fn frustum(&mut self, _g: &Geometry, d: &Frustum) -> bool {
        if d.radius <= 0.0 || d.height <= 0.0 || d.slices < 3 {
            return false;
        }
        let bottom: Vec<_> = circle(d.radius, 0.0, d.slices).collect();
        let top: Vec<_> = circle(d.radius * d.taper, d.height, d.slices).collect();
        if !d.solid {
            return self.set(GeometryKind::QuadSet(grid_quads(&[bottom, top], true)));
        }
        let mut fs = FaceSet {
            points: Vec::new(),
            indices: Vec::new(),
        };
        let quads = grid_quads(&[bottom, top], true);
        fs.points = quads.points;
        fs.indices = quads
            .indices
            .iter()
            .map(|f| f.to_vec())
            .collect();
        let n = d.slices;
        let bc = fs.points.len() as u32;
        fs.points.push(Point3::new(0.0, 0.0, 0.0));
        let tc = fs.points.len() as u32;
        fs.points.push(Point3::new(0.0, 0.0, d.height));
        for j in 0..n {
            let j1 = (j + 1) % n;
            fs.indices.push(vec![j1, j, bc]);
            fs.indices.push(vec![n + j, n + j1, tc]);
        }
        self.set(GeometryKind::FaceSet(fs))
    }

    fn disc(&mut self, _g: &Geometry, d: &Disc) -> bool {
        if d.radius <= 0.0 || d.slices < 3 {
            return false;
        }
        let mut b = BandBuilder::new(d.slices);
        let center = b.add_apex(Point3::new(0.0, 0.0, 0.0));
        b.add_ring(circle(d.radius, 0.0, d.slices));
        b.fan(center, true);
        self.set(GeometryKind::TriangleSet(b.build()))
    }

    fn paraboloid(&mut self, _g: &Geometry, d: &Paraboloid) -> bool {
        if d.radius <= 0.0 || d.height <= 0.0 || d.slices < 3 || d.stacks < 2 {
            return false;
        }
        let mut b = BandBuilder::new(d.slices);
        let apex = b.add_apex(Point3::new(0.0, 0.0, d.height));
        for k in 1..=d.stacks {
            let t = k as f32 / d.stacks as f32;
            let z = d.height * (1.0 - t.powf(d.shape));
            b.add_ring(circle(d.radius * t, z, d.slices));
            if k == 1 {
                b.fan(apex, true);
            }
        }
        if d.solid {
            let center = b.add_apex(Point3::new(0.0, 0.0, 0.0));
            b.fan(center, false);
        }
        self.set(GeometryKind::TriangleSet(b.build()))
    }

    fn bezier_curve(&mut self, _g: &Geometry, d: &BezierCurve) -> bool {
        if d.ctrl_points.len() < 2 {
            return false;
        }
        let n = d.stride.max(1);
        let points = (0..=n)
            .map(|i| de_casteljau(&d.ctrl_points, i as f32 / n as f32))
            .collect();
        self.set(GeometryKind::Polyline(Polyline { points }))
    }

    fn bezier_curve2(&mut self, _g: &Geometry, d: &BezierCurve2) -> bool {
        if d.ctrl_points.len() < 2 {
            return false;
        }
        let ctrl = lift2(&d.ctrl_points);
        let n = d.stride.max(1);
        let points = (0..=n)
            .map(|i| de_casteljau(&ctrl, i as f32 / n as f32))
            .collect();
        self.set(GeometryKind::Polyline(Polyline { points }))
    }

    fn bezier_patch(&mut self, _g: &Geometry, d: &BezierPatch) -> bool {
        // the control net must be a rectangular grid
        let vlen = d.ctrl_points.first().map_or(0, Vec::len);
        if d.ctrl_points.len() < 2
            || vlen < 2
            || d.ctrl_points.iter().any(|row| row.len() != vlen)
        {
            return false;
        }
        let nu = d.ustride.max(1);
        let nv = d.vstride.max(1);
        let mut rows = Vec::with_capacity(nu as usize + 1);
        for i in 0..=nu {
            let u = i as f32 / nu as f32;
            // reduce along U first, then evaluate the resulting column curve
            let column: Vec<Point3<f32>> = (0..vlen)
                .map(|vj| {
                    let strip: Vec<Point3<f32>> =
                        d.ctrl_points.iter().map(|row| row[vj]).collect();
                    de_casteljau(&strip, u)
                })
                .collect();
            rows.push(
                (0..=nv)
                    .map(|j| de_casteljau(&column, j as f32 / nv as f32))
                    .collect::<Vec<_>>(),
            );
        }
        let mut quads = grid_quads(&rows, false);
        if self.texcoord {
            quads.tex_coords = Some(uv_grid(nu, nv));
        }
        self.set(GeometryKind::QuadSet(quads))
    }

    fn nurbs_curve(&mut self, _g: &Geometry, d: &NurbsCurve) -> bool {
        match sample_nurbs(
            &d.ctrl_points,
            &d.weights,
            &d.knots,
            d.degree as usize,
            d.stride,
        ) {
            Some(points) => self.set(GeometryKind::Polyline(Polyline { points })),
            None => false,
        }
    }

    fn nurbs_curve2(&mut self, _g: &Geometry, d: &NurbsCurve2) -> bool {
        let ctrl = lift2(&d.ctrl_points);
        match sample_nurbs(&ctrl, &d.weights, &d.knots, d.degree as usize, d.stride) {
            Some(points) => self.set(GeometryKind::Polyline(Polyline { points })),
            None => false,
        }
    }

    fn nurbs_patch(&mut self, _g: &Geometry, d: &NurbsPatch) -> bool {
        let nu = d.ustride.max(1);
        let nv = d.vstride.max(1);
        let udeg = d.udegree as usize;
        let vdeg = d.vdegree as usize;
        let ucount = d.ctrl_points.len();
        let vcount = d.ctrl_points.first().map_or(0, Vec::len);
        // control net and weight grid must be rectangular and congruent
        // before any row gets indexed
        if ucount <= udeg
            || vcount == 0
            || d.ctrl_points.iter().any(|row| row.len() != vcount)
            || d.weights.len() != ucount
            || d.weights.iter().any(|row| row.len() != vcount)
            || d.uknots.len() != ucount + udeg + 1
        {
            return false;
        }
        let ulo = d.uknots[udeg];
        let uhi = d.uknots[ucount];
        let mut rows = Vec::with_capacity(nu as usize + 1);
        for i in 0..=nu {
            let u = ulo + (uhi - ulo) * i as f32 / nu as f32;
            // collapse the U direction to a single-row curve, then sample V
            let mut column = Vec::with_capacity(vcount);
            let mut wcolumn = Vec::with_capacity(vcount);
            for vj in 0..vcount {
                let strip: Vec<Point3<f32>> = d.ctrl_points.iter().map(|row| row[vj]).collect();
                let wstrip: Vec<f32> = d.weights.iter().map(|row| row[vj]).collect();
                column.push(de_boor(&strip, &wstrip, &d.uknots, udeg, u));
                wcolumn.push(1.0);
            }
            let Some(row) = sample_nurbs(&column, &wcolumn, &d.vknots, vdeg, nv) else {
                return false;
            };
            rows.push(row);
        }
        let mut quads = grid_quads(&rows, false);
        if self.texcoord {
            quads.tex_coords = Some(uv_grid(nu, nv));
        }
        self.set(GeometryKind::QuadSet(quads))
    }

    fn extrusion(&mut self, _g: &Geometry, d: &Extrusion) -> bool {
        if d.axis.len() < 2 || d.cross_section.len() < 3 {
            return false;
        }
        let rows: Vec<Vec<Point3<f32>>> = d
            .axis
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let prev = if i == 0 { i } else { i - 1 };
                let next = (i + 1).min(d.axis.len() - 1);
                let tangent = (d.axis[next] - d.axis[prev]).normalize();
                let up = if tangent.cross(&Vector3::z()).norm() < 1e-4 {
                    Vector3::x()
                } else {
                    Vector3::z()
                };
                let u = up.cross(&tangent).normalize();
                let v = tangent.cross(&u);
                d.cross_section
                    .iter()
                    .map(|c| p + u * c.x + v * c.y)
                    .collect()
            })
            .collect();
        let quads = grid_quads(&rows, true);
        if !d.solid {
            return self.set(GeometryKind::QuadSet(quads));
        }
        let mut fs = FaceSet {
            points: quads.points,
            indices: quads.indices.iter().map(|f| f.to_vec()).collect(),
        };
        // end caps as single polygons
        let n = d.cross_section.len() as u32;
        fs.indices.push((0..n).rev().collect());
        let last = (d.axis.len() as u32 - 1) * n;
        fs.indices.push((last..last + n).collect());
        self.set(GeometryKind::FaceSet(fs))
    }

    fn revolution(&mut self, _g: &Geometry, d: &Revolution) -> bool {
        if d.profile.len() < 2 || d.slices < 3 {
            return false;
        }
        let rows: Vec<Vec<Point3<f32>>> = d
            .profile
            .iter()
            .map(|p| circle(p.x, p.y, d.slices).collect())
            .collect();
        self.set(GeometryKind::QuadSet(grid_quads(&rows, true)))
    }

    fn swung(&mut self, _g: &Geometry, d: &Swung) -> bool {
        if d.profiles.len() < 2
            || d.profiles.len() != d.angles.len()
            || d.slices < 3
            || d.profiles.windows(2).any(|w| w[0].len() != w[1].len())
        {
            return false;
        }
        let rows = d.profiles[0].len();
        let mut rings: Vec<Vec<Point3<f32>>> = vec![Vec::with_capacity(d.slices as usize); rows];
        for j in 0..d.slices {
            let phi = TAU * j as f32 / d.slices as f32;
            // bracketing profiles for this azimuth, clamped at the ends
            let (lo, hi, t) = bracket(&d.angles, phi);
            for (r, ring) in rings.iter_mut().enumerate() {
                let a = d.profiles[lo][r];
                let b = d.profiles[hi][r];
                let p = a.coords.lerp(&b.coords, t);
                ring.push(Point3::new(p.x * phi.cos(), p.x * phi.sin(), p.y));
            }
        }
        self.set(GeometryKind::QuadSet(grid_quads(&rings, true)))
    }

    fn asymmetric_hull(&mut self, _g: &Geometry, d: &AsymmetricHull) -> bool {
        if d.slices == 0 || d.stacks < 2 {
            return false;
        }
        let n = d.slices * 4;
        let mut b = BandBuilder::new(n);
        let top = b.add_apex(Point3::from(d.top));
        let bottom = b.add_apex(Point3::from(d.bottom));
        // equator radius and height by quadrant-wise cos^2 interpolation
        let polar = |phi: f32| -> (f32, f32) {
            let (c, s) = (phi.cos(), phi.sin());
            let rx = if c >= 0.0 { d.pos_x_radius } else { d.neg_x_radius };
            let ry = if s >= 0.0 { d.pos_y_radius } else { d.neg_y_radius };
            let hx = if c >= 0.0 { d.pos_x_height } else { d.neg_x_height };
            let hy = if s >= 0.0 { d.pos_y_height } else { d.neg_y_height };
            let (c2, s2) = (c * c, s * s);
            (rx * c2 + ry * s2, hx * c2 + hy * s2)
        };
        // upper half, apex downwards to the equator
        for k in 1..=d.stacks {
            let t = k as f32 / d.stacks as f32;
            let f = t.powf(1.0 / d.top_shape.max(f32::EPSILON));
            b.add_ring((0..n).map(|j| {
                let phi = TAU * j as f32 / n as f32;
                let (r, h) = polar(phi);
                let center = d.top * (1.0 - t);
                Point3::new(
                    center.x + r * f * phi.cos(),
                    center.y + r * f * phi.sin(),
                    d.top.z + (h - d.top.z) * t,
                )
            }));
            if k == 1 {
                b.fan(top, true);
            }
        }
        // lower half, equator down to the nadir
        for k in 1..d.stacks {
            let t = k as f32 / d.stacks as f32;
            let f = (1.0 - t).powf(1.0 / d.bottom_shape.max(f32::EPSILON));
            b.add_ring((0..n).map(|j| {
                let phi = TAU * j as f32 / n as f32;
                let (r, h) = polar(phi);
                let center = d.bottom * t;
                Point3::new(
                    center.x + r * f * phi.cos(),
                    center.y + r * f * phi.sin(),
                    h + (d.bottom.z - h) * t,
                )
            }));
        }
        b.fan(bottom, false);
        self.set(GeometryKind::TriangleSet(b.build()))
    }

    fn extruded_hull(&mut self, _g: &Geometry, d: &ExtrudedHull) -> bool {
        if d.vertical.len() < 2 || d.horizontal.len() < 3 {
            return false;
        }
        let rows: Vec<Vec<Point3<f32>>> = d
            .vertical
            .iter()
            .map(|v| {
                d.horizontal
                    .iter()
                    .map(|h| Point3::new(h.x * v.x, h.y * v.x, v.y))
                    .collect()
            })
            .collect();
        self.set(GeometryKind::QuadSet(grid_quads(&rows, true)))
    }

    fn elevation_grid(&mut self, _g: &Geometry, d: &ElevationGrid) -> bool {
        let (xdim, ydim) = (d.xdim(), d.ydim());
        if xdim < 2 || ydim < 2 {
            return false;
        }
        let rows: Vec<Vec<Point3<f32>>> = (0..xdim)
            .map(|i| {
                (0..ydim)
                    .map(|j| {
                        Point3::new(
                            i as f32 * d.xspacing,
                            j as f32 * d.yspacing,
                            d.heights[i][j],
                        )
                    })
                    .collect()
            })
            .collect();
        let mut quads = grid_quads(&rows, false);
        if self.texcoord {
            quads.tex_coords = Some(uv_grid(xdim as u32 - 1, ydim as u32 - 1));
        }
        self.set(GeometryKind::QuadSet(quads))
    }

    // Explicit models discretize to themselves, identity preserved.

    fn triangle_set(&mut self, g: &Geometry, _d: &TriangleSet) -> bool {
        self.discretization = Some(g.clone());
        true
    }

    fn quad_set(&mut self, g: &Geometry, _d: &QuadSet) -> bool {
        self.discretization = Some(g.clone());
        true
    }

    fn face_set(&mut self, g: &Geometry, _d: &FaceSet) -> bool {
        self.discretization = Some(g.clone());
        true
    }

    fn point_set(&mut self, g: &Geometry, _d: &PointSet) -> bool {
        self.discretization = Some(g.clone());
        true
    }

    fn polyline(&mut self, g: &Geometry, _d: &Polyline) -> bool {
        self.discretization = Some(g.clone());
        true
    }

    fn point_set2(&mut self, _g: &Geometry, d: &PointSet2) -> bool {
        self.set(GeometryKind::PointSet(PointSet {
            points: lift2(&d.points),
        }))
    }

    fn polyline2(&mut self, _g: &Geometry, d: &Polyline2) -> bool {
        self.set(GeometryKind::Polyline(Polyline {
            points: lift2(&d.points),
        }))
    }

    fn translated(&mut self, _g: &Geometry, d: &Translated) -> bool {
        let m = Matrix4::new_translation(&d.translation);
        self.transformed_child(&d.geometry, &m)
    }

    fn scaled(&mut self, _g: &Geometry, d: &Scaled) -> bool {
        let m = Matrix4::new_nonuniform_scaling(&d.scale);
        self.transformed_child(&d.geometry, &m)
    }

    fn axis_rotated(&mut self, _g: &Geometry, d: &AxisRotated) -> bool {
        let axis = nalgebra::Unit::new_normalize(d.axis);
        let m = nalgebra::Rotation3::from_axis_angle(&axis, d.angle).to_homogeneous();
        self.transformed_child(&d.geometry, &m)
    }

    fn euler_rotated(&mut self, _g: &Geometry, d: &EulerRotated) -> bool {
        let m = nalgebra::Rotation3::from_euler_angles(d.roll, d.elevation, d.azimuth)
            .to_homogeneous();
        self.transformed_child(&d.geometry, &m)
    }

    fn oriented(&mut self, _g: &Geometry, d: &Oriented) -> bool {
        let m = d.basis();
        self.transformed_child(&d.geometry, &m)
    }

    fn group(&mut self, _g: &Geometry, d: &Group) -> bool {
        let mut acc = FaceSet {
            points: Vec::new(),
            indices: Vec::new(),
        };
        for child in &d.children {
            let Some(model) = self.child(child) else {
                return false;
            };
            if !merge_into(&mut acc, &model) {
                log::debug!("cannot merge {} into a face set", model.kind_name());
                return false;
            }
        }
        self.set(GeometryKind::FaceSet(acc))
    }

    fn ifs(&mut self, _g: &Geometry, d: &Ifs) -> bool {
        let Some(model) = self.child(&d.geometry) else {
            return false;
        };
        let mut acc = FaceSet {
            points: Vec::new(),
            indices: Vec::new(),
        };
        for m in d.expanded_transforms() {
            let Some(kind) = transform_explicit(&model, &m) else {
                return false;
            };
            let copy = Geometry::new(kind);
            if !merge_into(&mut acc, &copy) {
                return false;
            }
        }
        self.set(GeometryKind::FaceSet(acc))
    }

    fn inline(&mut self, _g: &Geometry, d: &Inline) -> bool {
        let mut acc = FaceSet {
            points: Vec::new(),
            indices: Vec::new(),
        };
        for shape in d.scene.shapes() {
            let Some(model) = self.child(&shape.geometry) else {
                return false;
            };
            if !merge_into(&mut acc, &model) {
                return false;
            }
        }
        if !d.is_transform_default() {
            let m = Matrix4::new_translation(&d.translation)
                * Matrix4::new_nonuniform_scaling(&d.scale);
            acc.points = acc.points.iter().map(|p| m.transform_point(p)).collect();
        }
        self.set(GeometryKind::FaceSet(acc))
    }
}

/// Per-vertex UV coordinates for an `(nu + 1) × (nv + 1)` sample grid
fn uv_grid(nu: u32, nv: u32) -> Vec<Point2<f32>> {
    let mut uv = Vec::with_capacity(((nu + 1) * (nv + 1)) as usize);
    for i in 0..=nu {
        for j in 0..=nv {
            uv.push(Point2::new(i as f32 / nu as f32, j as f32 / nv as f32));
        }
    }
    uv
}

/// Finds the profiles bracketing `phi` and the interpolation factor
fn bracket(angles: &[f32], phi: f32) -> (usize, usize, f32) {
    if phi <= angles[0] {
        return (0, 0, 0.0);
    }
    for i in 0..angles.len() - 1 {
        if phi <= angles[i + 1] {
            let span = angles[i + 1] - angles[i];
            let t = if span.abs() < f32::EPSILON {
                0.0
            } else {
                (phi - angles[i]) / span
            };
            return (i, i + 1, t);
        }
    }
    let last = angles.len() - 1;
    (last, last, 0.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn faces(d: &Discretizer) -> usize {
        match d.discretization().unwrap().kind() {
            GeometryKind::TriangleSet(t) => t.indices.len(),
            GeometryKind::QuadSet(q) => q.indices.len(),
            GeometryKind::FaceSet(f) => f.indices.len(),
            other => panic!("not a mesh: {:?}", std::mem::discriminant(other)),
        }
    }

    #[test]
    fn box_is_six_quads() {
        let mut d = Discretizer::new();
        assert!(Geometry::box3(Vector3::new(1.0, 2.0, 3.0)).apply(&mut d));
        assert_eq!(faces(&d), 6);
    }

    #[test]
    fn sphere_face_count_matches_bands() {
        let mut d = Discretizer::new();
        assert!(Geometry::sphere(2.0).apply(&mut d));
        // slices * 2 * (stacks - 1) with the 8/8 defaults
        assert_eq!(faces(&d), 8 * 2 * 7);
    }

    #[test]
    fn solid_cone_is_two_fans() {
        let mut d = Discretizer::new();
        assert!(Geometry::cone(1.0, 2.0).apply(&mut d));
        assert_eq!(faces(&d), 16);
    }

    #[test]
    fn open_cylinder_is_slice_quads() {
        let mut d = Discretizer::new();
        let g = Geometry::new(GeometryKind::Cylinder(Cylinder {
            radius: 1.0,
            height: 2.0,
            solid: false,
            slices: 12,
        }));
        assert!(g.apply(&mut d));
        assert_eq!(faces(&d), 12);
    }

    #[test]
    fn ragged_patch_grids_fail_cleanly() {
        let mut d = Discretizer::new();
        let bezier = Geometry::new(GeometryKind::BezierPatch(BezierPatch {
            ctrl_points: vec![
                vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
                vec![Point3::new(1.0, 0.0, 0.0)],
            ],
            ustride: 2,
            vstride: 2,
        }));
        assert!(!bezier.apply(&mut d));
        // congruent knots and control net, but one short weight row
        let nurbs = Geometry::new(GeometryKind::NurbsPatch(NurbsPatch {
            ctrl_points: vec![
                vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
                vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 0.0)],
            ],
            weights: vec![vec![1.0, 1.0], vec![1.0]],
            uknots: vec![0.0, 0.0, 1.0, 1.0],
            vknots: vec![0.0, 0.0, 1.0, 1.0],
            udegree: 1,
            vdegree: 1,
            ustride: 2,
            vstride: 2,
        }));
        assert!(!nurbs.apply(&mut d));
    }

    #[test]
    fn bezier_curve_sampling() {
        let mut d = Discretizer::new();
        let g = Geometry::new(GeometryKind::BezierCurve(BezierCurve {
            ctrl_points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            stride: 10,
        }));
        assert!(g.apply(&mut d));
        let GeometryKind::Polyline(p) = d.discretization().unwrap().kind() else {
            panic!("expected polyline");
        };
        assert_eq!(p.points.len(), 11);
        // quadratic Bezier midpoint
        assert_relative_eq!(p.points[5], Point3::new(1.0, 0.5, 0.0), epsilon = 1e-5);
        assert_relative_eq!(p.points[10], Point3::new(2.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn nurbs_circle_quadrant_hits_endpoints() {
        // quarter circle as a degree-2 rational curve
        let w = std::f32::consts::FRAC_1_SQRT_2;
        let g = Geometry::new(GeometryKind::NurbsCurve(NurbsCurve {
            ctrl_points: vec![
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            weights: vec![1.0, w, 1.0],
            knots: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            degree: 2,
            stride: 8,
        }));
        let mut d = Discretizer::new();
        assert!(g.apply(&mut d));
        let GeometryKind::Polyline(p) = d.discretization().unwrap().kind() else {
            panic!("expected polyline");
        };
        assert_relative_eq!(p.points[0], Point3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(p.points[8], Point3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
        for pt in &p.points {
            assert_relative_eq!(pt.coords.xy().norm(), 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn translated_bakes_transform() {
        let mut d = Discretizer::new();
        let g = Geometry::translated(Vector3::new(5.0, 0.0, 0.0), Geometry::sphere(1.0));
        assert!(g.apply(&mut d));
        let GeometryKind::TriangleSet(t) = d.discretization().unwrap().kind() else {
            panic!("expected triangles");
        };
        let cx = t.points.iter().map(|p| p.x).sum::<f32>() / t.points.len() as f32;
        assert_relative_eq!(cx, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn explicit_model_keeps_identity() {
        let g = Geometry::triangle_set(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let mut d = Discretizer::new();
        assert!(g.apply(&mut d));
        assert_eq!(d.discretization().unwrap().id(), g.id());
    }

    #[test]
    fn group_merges_children() {
        let g = Geometry::group(vec![
            Geometry::box3(Vector3::new(1.0, 1.0, 1.0)),
            Geometry::cone(1.0, 1.0),
        ]);
        let mut d = Discretizer::new();
        assert!(g.apply(&mut d));
        assert_eq!(faces(&d), 6 + 16);
    }
}
