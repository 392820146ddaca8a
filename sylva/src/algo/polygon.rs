//! Polygon counting
//!
//! Predicts how many faces a node's discretization will contain without
//! building it, which is what makes the count useful: callers size buffers
//! or pick levels of detail before paying for tessellation.  The formulas
//! mirror the discretizer's output exactly.
//!
//! Counting is arithmetic on node parameters, so there is no cache.
use crate::Error;
use crate::scene::{
    AsymmetricHull, AxisRotated, BezierPatch, Box3, Cone, Cylinder, Disc, ElevationGrid,
    EulerRotated, ExtrudedHull, Extrusion, FaceSet, Frustum, Geometry, Group, Ifs, Inline,
    NurbsPatch, Oriented, Paraboloid, QuadSet, Revolution, Scaled, Scene, Sphere, Swung,
    Translated, TriangleSet,
};
use crate::visitor::Visitor;

/// Visitor computing the face count of a node's discretization
#[derive(Default)]
pub struct PolygonComputer {
    result: usize,
}

impl PolygonComputer {
    /// Builds a counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Count from the most recent successful `apply`
    pub fn result(&self) -> usize {
        self.result
    }

    /// Total face count of a scene, summed over its shapes
    ///
    /// Fails if any shape cannot be counted (curves and point clouds have
    /// no faces).
    pub fn process_scene(&mut self, scene: &Scene) -> Result<usize, Error> {
        let mut total = 0;
        for shape in scene.shapes() {
            if !shape.geometry.apply(self) {
                return Err(Error::Unsupported(shape.geometry.kind_name()));
            }
            total += self.result;
        }
        Ok(total)
    }

    fn done(&mut self, count: usize) -> bool {
        self.result = count;
        true
    }

    fn child(&mut self, g: &Geometry) -> bool {
        g.apply(self)
    }
}

impl Visitor for PolygonComputer {
    fn box3(&mut self, _g: &Geometry, _d: &Box3) -> bool {
        self.done(6)
    }

    fn sphere(&mut self, _g: &Geometry, d: &Sphere) -> bool {
        // same resolution floor the discretizer enforces
        if d.slices < 3 || d.stacks < 2 {
            return false;
        }
        self.done(d.slices as usize * 2 * (d.stacks as usize - 1))
    }

    fn cylinder(&mut self, _g: &Geometry, d: &Cylinder) -> bool {
        let n = d.slices as usize;
        self.done(if d.solid { 3 * n } else { n })
    }

    fn cone(&mut self, _g: &Geometry, d: &Cone) -> bool {
        let n = d.slices as usize;
        self.done(if d.solid { 2 * n } else { n })
    }

    fn frustum(&mut self, _g: &Geometry, d: &Frustum) -> bool {
        let n = d.slices as usize;
        self.done(if d.solid { 3 * n } else { n })
    }

    fn disc(&mut self, _g: &Geometry, d: &Disc) -> bool {
        self.done(d.slices as usize)
    }

    fn paraboloid(&mut self, _g: &Geometry, d: &Paraboloid) -> bool {
        if d.slices < 3 || d.stacks < 2 {
            return false;
        }
        let n = d.slices as usize * 2 * d.stacks as usize;
        self.done(if d.solid { n } else { n - d.slices as usize })
    }

    fn bezier_patch(&mut self, _g: &Geometry, d: &BezierPatch) -> bool {
        self.done(d.ustride.max(1) as usize * d.vstride.max(1) as usize)
    }

    fn nurbs_patch(&mut self, _g: &Geometry, d: &NurbsPatch) -> bool {
        self.done(d.ustride.max(1) as usize * d.vstride.max(1) as usize)
    }

    fn extrusion(&mut self, _g: &Geometry, d: &Extrusion) -> bool {
        let sides = (d.axis.len().saturating_sub(1)) * d.cross_section.len();
        self.done(if d.solid { sides + 2 } else { sides })
    }

    fn revolution(&mut self, _g: &Geometry, d: &Revolution) -> bool {
        self.done(d.profile.len().saturating_sub(1) * d.slices as usize)
    }

    fn swung(&mut self, _g: &Geometry, d: &Swung) -> bool {
        let rows = d.profiles.first().map_or(0, Vec::len);
        self.done(rows.saturating_sub(1) * d.slices as usize)
    }

    fn asymmetric_hull(&mut self, _g: &Geometry, d: &AsymmetricHull) -> bool {
        if d.slices == 0 || d.stacks < 2 {
            return false;
        }
        let n = d.slices as usize * 4;
        self.done(2 * n * (2 * d.stacks as usize - 1))
    }

    fn extruded_hull(&mut self, _g: &Geometry, d: &ExtrudedHull) -> bool {
        self.done(d.vertical.len().saturating_sub(1) * d.horizontal.len())
    }

    fn elevation_grid(&mut self, _g: &Geometry, d: &ElevationGrid) -> bool {
        self.done(d.xdim().saturating_sub(1) * d.ydim().saturating_sub(1))
    }

    fn triangle_set(&mut self, _g: &Geometry, d: &TriangleSet) -> bool {
        self.done(d.indices.len())
    }

    fn quad_set(&mut self, _g: &Geometry, d: &QuadSet) -> bool {
        self.done(d.indices.len())
    }

    fn face_set(&mut self, _g: &Geometry, d: &FaceSet) -> bool {
        self.done(d.indices.len())
    }

    // Transforms never change topology.

    fn translated(&mut self, _g: &Geometry, d: &Translated) -> bool {
        self.child(&d.geometry)
    }

    fn scaled(&mut self, _g: &Geometry, d: &Scaled) -> bool {
        self.child(&d.geometry)
    }

    fn axis_rotated(&mut self, _g: &Geometry, d: &AxisRotated) -> bool {
        self.child(&d.geometry)
    }

    fn euler_rotated(&mut self, _g: &Geometry, d: &EulerRotated) -> bool {
        self.child(&d.geometry)
    }

    fn oriented(&mut self, _g: &Geometry, d: &Oriented) -> bool {
        self.child(&d.geometry)
    }

    fn group(&mut self, _g: &Geometry, d: &Group) -> bool {
        let mut total = 0;
        for child in &d.children {
            if !self.child(child) {
                return false;
            }
            total += self.result;
        }
        self.done(total)
    }

    fn ifs(&mut self, _g: &Geometry, d: &Ifs) -> bool {
        if !self.child(&d.geometry) {
            return false;
        }
        let copies = d.transforms.len().pow(d.depth.max(1));
        self.done(self.result * copies)
    }

    fn inline(&mut self, _g: &Geometry, d: &Inline) -> bool {
        let mut total = 0;
        for shape in d.scene.shapes() {
            if !self.child(&shape.geometry) {
                return false;
            }
            total += self.result;
        }
        self.done(total)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use super::super::Discretizer;
    use crate::scene::GeometryKind;
    use nalgebra::Vector3;

    fn discretized_faces(g: &Geometry) -> usize {
        let mut d = Discretizer::new();
        assert!(g.apply(&mut d));
        match d.discretization().unwrap().kind() {
            GeometryKind::TriangleSet(t) => t.indices.len(),
            GeometryKind::QuadSet(q) => q.indices.len(),
            GeometryKind::FaceSet(f) => f.indices.len(),
            _ => panic!("not a mesh"),
        }
    }

    #[test]
    fn counts_match_discretizer() {
        let cases = [
            Geometry::box3(Vector3::new(1.0, 2.0, 3.0)),
            Geometry::sphere(1.0),
            Geometry::cylinder(1.0, 2.0),
            Geometry::cone(1.0, 2.0),
            Geometry::disc(1.0),
            Geometry::group(vec![Geometry::sphere(1.0), Geometry::cone(1.0, 1.0)]),
        ];
        for g in &cases {
            let mut c = PolygonComputer::new();
            assert!(g.apply(&mut c), "count failed for {}", g.kind_name());
            assert_eq!(
                c.result(),
                discretized_faces(g),
                "mismatch for {}",
                g.kind_name()
            );
        }
    }

    #[test]
    fn degenerate_resolutions_fail_instead_of_panicking() {
        let cases = [
            Geometry::new(GeometryKind::Sphere(Sphere {
                radius: 1.0,
                slices: 8,
                stacks: 0,
            })),
            Geometry::new(GeometryKind::Paraboloid(Paraboloid {
                radius: 1.0,
                height: 2.0,
                shape: 2.0,
                solid: false,
                slices: 8,
                stacks: 0,
            })),
            Geometry::new(GeometryKind::AsymmetricHull(AsymmetricHull {
                neg_x_radius: 1.0,
                pos_x_radius: 1.0,
                neg_y_radius: 1.0,
                pos_y_radius: 1.0,
                neg_x_height: 0.0,
                pos_x_height: 0.0,
                neg_y_height: 0.0,
                pos_y_height: 0.0,
                top: Vector3::new(0.0, 0.0, 1.0),
                bottom: Vector3::new(0.0, 0.0, -1.0),
                top_shape: 2.0,
                bottom_shape: 2.0,
                slices: 4,
                stacks: 0,
            })),
        ];
        for g in &cases {
            let mut c = PolygonComputer::new();
            assert!(!g.apply(&mut c), "{} should not count", g.kind_name());
        }
    }

    #[test]
    fn curves_have_no_faces() {
        use crate::scene::Polyline;
        let g = Geometry::new(GeometryKind::Polyline(Polyline {
            points: vec![
                nalgebra::Point3::origin(),
                nalgebra::Point3::new(1.0, 0.0, 0.0),
            ],
        }));
        let mut c = PolygonComputer::new();
        assert!(!g.apply(&mut c));
    }

    #[test]
    fn ifs_multiplies_by_copy_count() {
        use nalgebra::Matrix4;
        let ifs = Geometry::new(GeometryKind::Ifs(Ifs {
            depth: 2,
            transforms: vec![Matrix4::identity(), Matrix4::identity(), Matrix4::identity()],
            geometry: Geometry::box3(Vector3::new(1.0, 1.0, 1.0)),
        }));
        let mut c = PolygonComputer::new();
        assert!(ifs.apply(&mut c));
        assert_eq!(c.result(), 6 * 9);
    }
}
