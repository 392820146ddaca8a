//! Bounding-sphere computation
//!
//! Analytic for the simple solids, discretize-then-measure for everything
//! else.  Results are memoized per node identity for the duration of one
//! traversal, so a sub-graph shared between several parents is measured
//! once.
use super::Discretizer;
use crate::Error;
use crate::cache::Cache;
use crate::scene::{
    AsymmetricHull, AxisRotated, BezierCurve, BezierCurve2, BezierPatch, Box3, Cone, Cylinder,
    Disc, ElevationGrid, EulerRotated, ExtrudedHull, Extrusion, FaceSet, Frustum, Geometry,
    GeometryKind, Group, Ifs, Inline, NurbsCurve, NurbsCurve2, NurbsPatch, Oriented, Paraboloid,
    PointSet, PointSet2, Polyline, Polyline2, QuadSet, Revolution, Scaled, Scene, Sphere, Swung,
    Translated, TriangleSet,
};
use crate::visitor::Visitor;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Sphere enclosing a geometry
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct BoundingSphere {
    /// Center
    pub center: Point3<f32>,
    /// Radius
    pub radius: f32,
}

impl BoundingSphere {
    /// Builds a sphere from center and radius
    pub fn new(center: Point3<f32>, radius: f32) -> Self {
        BoundingSphere { center, radius }
    }

    /// Smallest sphere containing a point cloud: centroid plus maximum
    /// distance
    pub fn of_points(points: &[Point3<f32>]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let centroid =
            points.iter().map(|p| p.coords).sum::<Vector3<f32>>() / points.len() as f32;
        let center = Point3::from(centroid);
        let radius = points
            .iter()
            .map(|p| (p - center).norm())
            .fold(0.0f32, f32::max);
        Some(BoundingSphere { center, radius })
    }

    /// Grows this sphere to enclose another
    pub fn extend(&mut self, other: &BoundingSphere) {
        let d = (other.center - self.center).norm();
        if d + other.radius <= self.radius {
            return;
        }
        if d + self.radius <= other.radius {
            *self = *other;
            return;
        }
        let radius = (d + self.radius + other.radius) / 2.0;
        let dir = (other.center - self.center) / d;
        self.center += dir * (radius - self.radius);
        self.radius = radius;
    }

    /// Maps this sphere through an affine transform
    ///
    /// The radius grows by the largest column norm of the linear part, a
    /// conservative bound for anisotropic scaling.
    pub fn transform_by(&self, m: &Matrix4<f32>) -> BoundingSphere {
        let lin = m.fixed_view::<3, 3>(0, 0);
        let scale = (0..3)
            .map(|c| lin.column(c).norm())
            .fold(0.0f32, f32::max);
        BoundingSphere {
            center: m.transform_point(&self.center),
            radius: self.radius * scale,
        }
    }
}

/// Visitor computing bounding spheres with identity-keyed memoization
#[derive(Default)]
pub struct BSphereComputer {
    cache: Cache<BoundingSphere>,
    discretizer: Discretizer,
    result: Option<BoundingSphere>,
}

impl BSphereComputer {
    /// Builds a computer with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of the most recent successful `apply`
    pub fn result(&self) -> Option<&BoundingSphere> {
        self.result.as_ref()
    }

    /// Bounding sphere of a whole scene: union over its shapes
    pub fn process_scene(&mut self, scene: &Scene) -> Result<BoundingSphere, Error> {
        if scene.is_empty() {
            return Err(Error::EmptyScene);
        }
        self.begin_process();
        let mut acc: Option<BoundingSphere> = None;
        for shape in scene.shapes() {
            if !shape.geometry.apply(self) {
                return Err(Error::Unsupported(shape.geometry.kind_name()));
            }
            let bs = self
                .result
                .ok_or(Error::Unsupported(shape.geometry.kind_name()))?;
            match &mut acc {
                Some(a) => a.extend(&bs),
                None => acc = Some(bs),
            }
        }
        acc.ok_or(Error::EmptyScene)
    }

    fn hit(&mut self, g: &Geometry) -> bool {
        if let Some(bs) = self.cache.get(g.id()) {
            log::trace!("bsphere cached {}", g.id());
            self.result = Some(*bs);
            true
        } else {
            false
        }
    }

    fn done(&mut self, g: &Geometry, bs: BoundingSphere) -> bool {
        self.cache.insert(g.id(), bs);
        self.result = Some(bs);
        true
    }

    /// Fallback: discretize, then measure the explicit model's points
    fn measure(&mut self, g: &Geometry) -> bool {
        if self.hit(g) {
            return true;
        }
        if !g.apply(&mut self.discretizer) {
            return false;
        }
        let Some(model) = self.discretizer.discretization().cloned() else {
            return false;
        };
        let Some(points) = explicit_points(&model) else {
            return false;
        };
        match BoundingSphere::of_points(points) {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    /// Child sphere mapped through a transform
    fn through(&mut self, g: &Geometry, child: &Geometry, m: &Matrix4<f32>) -> bool {
        if self.hit(g) {
            return true;
        }
        if !child.apply(self) {
            return false;
        }
        let Some(bs) = self.result else { return false };
        let bs = bs.transform_by(m);
        self.done(g, bs)
    }
}

/// Point list of an explicit model, if it has one
fn explicit_points(model: &Geometry) -> Option<&[Point3<f32>]> {
    match model.kind() {
        GeometryKind::TriangleSet(t) => Some(&t.points),
        GeometryKind::QuadSet(q) => Some(&q.points),
        GeometryKind::FaceSet(f) => Some(&f.points),
        GeometryKind::PointSet(p) => Some(&p.points),
        GeometryKind::Polyline(p) => Some(&p.points),
        _ => None,
    }
}

macro_rules! bsphere_by_discretization {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, g: &Geometry, _d: &$ty) -> bool {
                self.measure(g)
            }
        )*
    };
}

impl Visitor for BSphereComputer {
    fn begin_process(&mut self) -> bool {
        self.cache.clear();
        self.result = None;
        true
    }

    fn sphere(&mut self, g: &Geometry, d: &Sphere) -> bool {
        if self.hit(g) {
            return true;
        }
        self.done(g, BoundingSphere::new(Point3::origin(), d.radius))
    }

    fn box3(&mut self, g: &Geometry, d: &Box3) -> bool {
        if self.hit(g) {
            return true;
        }
        self.done(g, BoundingSphere::new(Point3::origin(), d.size.norm()))
    }

    fn cylinder(&mut self, g: &Geometry, d: &Cylinder) -> bool {
        if self.hit(g) {
            return true;
        }
        let half = d.height / 2.0;
        let bs = BoundingSphere::new(
            Point3::new(0.0, 0.0, half),
            Vector3::new(d.radius, 0.0, half).norm(),
        );
        self.done(g, bs)
    }

    fn cone(&mut self, g: &Geometry, d: &Cone) -> bool {
        if self.hit(g) {
            return true;
        }
        let third = d.height / 3.0;
        let radius = (2.0 * third).max((third * third + d.radius * d.radius).sqrt());
        self.done(g, BoundingSphere::new(Point3::new(0.0, 0.0, third), radius))
    }

    fn disc(&mut self, g: &Geometry, d: &Disc) -> bool {
        if self.hit(g) {
            return true;
        }
        self.done(g, BoundingSphere::new(Point3::origin(), d.radius))
    }

    bsphere_by_discretization! {
        frustum: Frustum,
        paraboloid: Paraboloid,
        bezier_curve: BezierCurve,
        bezier_curve2: BezierCurve2,
        bezier_patch: BezierPatch,
        nurbs_curve: NurbsCurve,
        nurbs_curve2: NurbsCurve2,
        nurbs_patch: NurbsPatch,
        extrusion: Extrusion,
        revolution: Revolution,
        swung: Swung,
        asymmetric_hull: AsymmetricHull,
        extruded_hull: ExtrudedHull,
        elevation_grid: ElevationGrid,
        point_set2: PointSet2,
        polyline2: Polyline2,
    }

    fn triangle_set(&mut self, g: &Geometry, d: &TriangleSet) -> bool {
        if self.hit(g) {
            return true;
        }
        match BoundingSphere::of_points(&d.points) {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    fn quad_set(&mut self, g: &Geometry, d: &QuadSet) -> bool {
        if self.hit(g) {
            return true;
        }
        match BoundingSphere::of_points(&d.points) {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    fn face_set(&mut self, g: &Geometry, d: &FaceSet) -> bool {
        if self.hit(g) {
            return true;
        }
        match BoundingSphere::of_points(&d.points) {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    fn point_set(&mut self, g: &Geometry, d: &PointSet) -> bool {
        if self.hit(g) {
            return true;
        }
        match BoundingSphere::of_points(&d.points) {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    fn polyline(&mut self, g: &Geometry, d: &Polyline) -> bool {
        if self.hit(g) {
            return true;
        }
        match BoundingSphere::of_points(&d.points) {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    fn translated(&mut self, g: &Geometry, d: &Translated) -> bool {
        let m = Matrix4::new_translation(&d.translation);
        self.through(g, &d.geometry, &m)
    }

    fn scaled(&mut self, g: &Geometry, d: &Scaled) -> bool {
        let m = Matrix4::new_nonuniform_scaling(&d.scale);
        self.through(g, &d.geometry, &m)
    }

    fn axis_rotated(&mut self, g: &Geometry, d: &AxisRotated) -> bool {
        let axis = nalgebra::Unit::new_normalize(d.axis);
        let m = nalgebra::Rotation3::from_axis_angle(&axis, d.angle).to_homogeneous();
        self.through(g, &d.geometry, &m)
    }

    fn euler_rotated(&mut self, g: &Geometry, d: &EulerRotated) -> bool {
        let m = nalgebra::Rotation3::from_euler_angles(d.roll, d.elevation, d.azimuth)
            .to_homogeneous();
        self.through(g, &d.geometry, &m)
    }

    fn oriented(&mut self, g: &Geometry, d: &Oriented) -> bool {
        let m = d.basis();
        self.through(g, &d.geometry, &m)
    }

    fn group(&mut self, g: &Geometry, d: &Group) -> bool {
        if self.hit(g) {
            return true;
        }
        let mut acc: Option<BoundingSphere> = None;
        for child in &d.children {
            if !child.apply(self) {
                return false;
            }
            let Some(bs) = self.result else { return false };
            match &mut acc {
                Some(a) => a.extend(&bs),
                None => acc = Some(bs),
            }
        }
        match acc {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    fn ifs(&mut self, g: &Geometry, d: &Ifs) -> bool {
        if self.hit(g) {
            return true;
        }
        if !d.geometry.apply(self) {
            return false;
        }
        let Some(base) = self.result else { return false };
        let mut acc: Option<BoundingSphere> = None;
        for m in d.expanded_transforms() {
            let bs = base.transform_by(&m);
            match &mut acc {
                Some(a) => a.extend(&bs),
                None => acc = Some(bs),
            }
        }
        match acc {
            Some(bs) => self.done(g, bs),
            None => false,
        }
    }

    fn inline(&mut self, g: &Geometry, d: &Inline) -> bool {
        if self.hit(g) {
            return true;
        }
        let mut acc: Option<BoundingSphere> = None;
        for shape in d.scene.shapes() {
            if !shape.geometry.apply(self) {
                return false;
            }
            let Some(bs) = self.result else { return false };
            match &mut acc {
                Some(a) => a.extend(&bs),
                None => acc = Some(bs),
            }
        }
        let Some(bs) = acc else { return false };
        let m = Matrix4::new_translation(&d.translation)
            * Matrix4::new_nonuniform_scaling(&d.scale);
        let bs = bs.transform_by(&m);
        self.done(g, bs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sphere_is_exact() {
        let mut c = BSphereComputer::new();
        assert!(c.begin_process());
        assert!(Geometry::sphere(2.0).apply(&mut c));
        let bs = c.result().unwrap();
        assert_eq!(bs.center, Point3::origin());
        assert_eq!(bs.radius, 2.0);
    }

    #[test]
    fn box_radius_is_half_diagonal() {
        let mut c = BSphereComputer::new();
        assert!(c.begin_process());
        assert!(Geometry::box3(Vector3::new(1.0, 2.0, 2.0)).apply(&mut c));
        assert_relative_eq!(c.result().unwrap().radius, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn translated_sphere_moves_center() {
        let mut c = BSphereComputer::new();
        assert!(c.begin_process());
        let g = Geometry::translated(Vector3::new(0.0, 0.0, 5.0), Geometry::sphere(1.0));
        assert!(g.apply(&mut c));
        let bs = *c.result().unwrap();
        assert_relative_eq!(bs.center, Point3::new(0.0, 0.0, 5.0), epsilon = 1e-6);
        assert_relative_eq!(bs.radius, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn extend_is_enclosing() {
        let mut a = BoundingSphere::new(Point3::new(-1.0, 0.0, 0.0), 1.0);
        let b = BoundingSphere::new(Point3::new(3.0, 0.0, 0.0), 1.0);
        a.extend(&b);
        assert_relative_eq!(a.radius, 3.0, epsilon = 1e-6);
        assert_relative_eq!(a.center, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        // containment cases collapse to the larger sphere
        let mut big = BoundingSphere::new(Point3::origin(), 10.0);
        big.extend(&BoundingSphere::new(Point3::new(1.0, 0.0, 0.0), 1.0));
        assert_relative_eq!(big.radius, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn shared_subgraph_measured_once() {
        // a node shared by two parents is measured once; the second
        // visit must come from the cache
        let shared = Geometry::cone(1.0, 2.0);
        let group = Geometry::group(vec![
            Geometry::translated(Vector3::new(1.0, 0.0, 0.0), shared.clone()),
            Geometry::translated(Vector3::new(2.0, 0.0, 0.0), shared.clone()),
        ]);
        let mut c = BSphereComputer::new();
        assert!(c.begin_process());
        assert!(group.apply(&mut c));
        assert!(c.cache.contains(shared.id()));
        // the two wrapper entries plus the shared child plus the group
        assert_eq!(c.cache.len(), 4);
    }
}
