//! Surface-area computation
//!
//! Closed-form areas for the solids that have one, tessellate-and-sum for
//! the rest.  Like the bounding-sphere computer, results are memoized per
//! node identity within a traversal.
use super::Tessellator;
use crate::Error;
use crate::cache::Cache;
use crate::scene::{
    AsymmetricHull, AxisRotated, BezierPatch, Box3, Cone, Cylinder, Disc, ElevationGrid,
    EulerRotated, ExtrudedHull, Extrusion, FaceSet, Frustum, Geometry, GeometryKind, Group, Ifs,
    Inline, NurbsPatch, Oriented, Paraboloid, QuadSet, Revolution, Scaled, Scene, Sphere, Swung,
    Translated, TriangleSet,
};
use crate::visitor::Visitor;
use nalgebra::Point3;
use std::f32::consts::PI;

/// Area of one triangle
fn triangle_area(a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> f32 {
    (b - a).cross(&(c - a)).norm() / 2.0
}

fn triangle_set_area(t: &TriangleSet) -> f32 {
    t.indices
        .iter()
        .map(|[a, b, c]| {
            triangle_area(
                &t.points[*a as usize],
                &t.points[*b as usize],
                &t.points[*c as usize],
            )
        })
        .sum()
}

/// Visitor computing surface areas with identity-keyed memoization
#[derive(Default)]
pub struct SurfComputer {
    cache: Cache<f32>,
    tessellator: Tessellator,
    result: Option<f32>,
}

impl SurfComputer {
    /// Builds a computer with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of the most recent successful `apply`
    pub fn result(&self) -> Option<f32> {
        self.result
    }

    /// Total surface area of a scene, summed over its shapes
    pub fn process_scene(&mut self, scene: &Scene) -> Result<f32, Error> {
        if scene.is_empty() {
            return Err(Error::EmptyScene);
        }
        self.begin_process();
        let mut total = 0.0;
        for shape in scene.shapes() {
            if !shape.geometry.apply(self) {
                return Err(Error::Unsupported(shape.geometry.kind_name()));
            }
            total += self
                .result
                .ok_or(Error::Unsupported(shape.geometry.kind_name()))?;
        }
        Ok(total)
    }

    fn hit(&mut self, g: &Geometry) -> bool {
        if let Some(area) = self.cache.get(g.id()) {
            self.result = Some(*area);
            true
        } else {
            false
        }
    }

    fn done(&mut self, g: &Geometry, area: f32) -> bool {
        self.cache.insert(g.id(), area);
        self.result = Some(area);
        true
    }

    /// Fallback: tessellate and sum triangle areas
    fn measure(&mut self, g: &Geometry) -> bool {
        if self.hit(g) {
            return true;
        }
        if !g.apply(&mut self.tessellator) {
            return false;
        }
        let Some(model) = self.tessellator.triangulation().cloned() else {
            return false;
        };
        let GeometryKind::TriangleSet(t) = model.kind() else {
            return false;
        };
        let area = triangle_set_area(t);
        self.done(g, area)
    }

    /// Isometries preserve area
    fn through_isometry(&mut self, g: &Geometry, child: &Geometry) -> bool {
        if self.hit(g) {
            return true;
        }
        if !child.apply(self) {
            return false;
        }
        let Some(area) = self.result else { return false };
        self.done(g, area)
    }
}

macro_rules! area_by_tessellation {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, g: &Geometry, _d: &$ty) -> bool {
                self.measure(g)
            }
        )*
    };
}

impl Visitor for SurfComputer {
    fn begin_process(&mut self) -> bool {
        self.cache.clear();
        self.result = None;
        true
    }

    fn sphere(&mut self, g: &Geometry, d: &Sphere) -> bool {
        if self.hit(g) {
            return true;
        }
        self.done(g, 4.0 * PI * d.radius * d.radius)
    }

    fn box3(&mut self, g: &Geometry, d: &Box3) -> bool {
        if self.hit(g) {
            return true;
        }
        let s = d.size;
        self.done(g, 8.0 * (s.x * s.y + s.y * s.z + s.z * s.x))
    }

    fn cylinder(&mut self, g: &Geometry, d: &Cylinder) -> bool {
        if self.hit(g) {
            return true;
        }
        let mut area = 2.0 * PI * d.radius * d.height;
        if d.solid {
            area += 2.0 * PI * d.radius * d.radius;
        }
        self.done(g, area)
    }

    fn cone(&mut self, g: &Geometry, d: &Cone) -> bool {
        if self.hit(g) {
            return true;
        }
        let slant = (d.radius * d.radius + d.height * d.height).sqrt();
        let mut area = PI * d.radius * slant;
        if d.solid {
            area += PI * d.radius * d.radius;
        }
        self.done(g, area)
    }

    fn disc(&mut self, g: &Geometry, d: &Disc) -> bool {
        if self.hit(g) {
            return true;
        }
        self.done(g, PI * d.radius * d.radius)
    }

    area_by_tessellation! {
        frustum: Frustum,
        paraboloid: Paraboloid,
        bezier_patch: BezierPatch,
        nurbs_patch: NurbsPatch,
        extrusion: Extrusion,
        revolution: Revolution,
        swung: Swung,
        asymmetric_hull: AsymmetricHull,
        extruded_hull: ExtrudedHull,
        elevation_grid: ElevationGrid,
        // anisotropic scaling does not preserve area, so these bake their
        // transform through the tessellator instead of reusing the child
        scaled: Scaled,
        ifs: Ifs,
        inline: Inline,
    }

    fn triangle_set(&mut self, g: &Geometry, d: &TriangleSet) -> bool {
        if self.hit(g) {
            return true;
        }
        let area = triangle_set_area(d);
        self.done(g, area)
    }

    fn quad_set(&mut self, g: &Geometry, _d: &QuadSet) -> bool {
        self.measure(g)
    }

    fn face_set(&mut self, g: &Geometry, _d: &FaceSet) -> bool {
        self.measure(g)
    }

    fn translated(&mut self, g: &Geometry, d: &Translated) -> bool {
        self.through_isometry(g, &d.geometry)
    }

    fn axis_rotated(&mut self, g: &Geometry, d: &AxisRotated) -> bool {
        self.through_isometry(g, &d.geometry)
    }

    fn euler_rotated(&mut self, g: &Geometry, d: &EulerRotated) -> bool {
        self.through_isometry(g, &d.geometry)
    }

    fn oriented(&mut self, g: &Geometry, d: &Oriented) -> bool {
        self.through_isometry(g, &d.geometry)
    }

    fn group(&mut self, g: &Geometry, d: &Group) -> bool {
        if self.hit(g) {
            return true;
        }
        let mut total = 0.0;
        for child in &d.children {
            if !child.apply(self) {
                return false;
            }
            let Some(area) = self.result else { return false };
            total += area;
        }
        self.done(g, total)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn sphere_area_is_closed_form() {
        let mut c = SurfComputer::new();
        assert!(c.begin_process());
        assert!(Geometry::sphere(2.0).apply(&mut c));
        assert_relative_eq!(c.result().unwrap(), 16.0 * PI, epsilon = 1e-4);
    }

    #[test]
    fn unit_box_area() {
        // half-extents 0.5 on each side: a unit cube, area 6
        let mut c = SurfComputer::new();
        assert!(c.begin_process());
        assert!(Geometry::box3(Vector3::new(0.5, 0.5, 0.5)).apply(&mut c));
        assert_relative_eq!(c.result().unwrap(), 6.0, epsilon = 1e-5);
    }

    #[test]
    fn translation_preserves_area() {
        let mut c = SurfComputer::new();
        assert!(c.begin_process());
        let g = Geometry::translated(Vector3::new(3.0, 0.0, 0.0), Geometry::cylinder(1.0, 2.0));
        assert!(g.apply(&mut c));
        assert_relative_eq!(c.result().unwrap(), 2.0 * PI * 2.0 + 2.0 * PI, epsilon = 1e-4);
    }

    #[test]
    fn triangle_set_sums_face_areas() {
        let g = Geometry::triangle_set(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let mut c = SurfComputer::new();
        assert!(c.begin_process());
        assert!(g.apply(&mut c));
        assert_relative_eq!(c.result().unwrap(), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn group_sums_children() {
        let g = Geometry::group(vec![Geometry::disc(1.0), Geometry::disc(1.0)]);
        let mut c = SurfComputer::new();
        assert!(c.begin_process());
        assert!(g.apply(&mut c));
        assert_relative_eq!(c.result().unwrap(), 2.0 * PI, epsilon = 1e-5);
    }

    #[test]
    fn scene_total_fails_on_curve() {
        use crate::scene::{Polyline, Shape};
        let mut scene = Scene::new();
        scene.add(Shape::untextured(Geometry::new(GeometryKind::Polyline(
            Polyline {
                points: vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)],
            },
        ))));
        let mut c = SurfComputer::new();
        assert!(matches!(
            c.process_scene(&scene),
            Err(Error::Unsupported("Polyline"))
        ));
        assert!(matches!(
            c.process_scene(&Scene::new()),
            Err(Error::EmptyScene)
        ));
    }
}
