//! Tessellator: any surface-producing node to a pure triangle mesh
//!
//! Quad and mixed-arity meshes are triangulated directly (quads split along
//! their first diagonal, larger faces fanned from their first vertex);
//! everything else routes through a [`Discretizer`] and triangulates the
//! result.  Curves and point clouds have no triangulation and fail.
//!
//! Like the discretizer, the tessellator is stateless per call aside from
//! configuration; memoization belongs to the caller.
use super::Discretizer;
use crate::Error;
use crate::scene::{FaceSet, Geometry, GeometryKind, QuadSet, TriangleSet};
use crate::visitor::Visitor;

/// Converts surface geometry into an indexed triangle mesh
#[derive(Default)]
pub struct Tessellator {
    discretizer: Discretizer,
    triangulation: Option<Geometry>,
}

impl Tessellator {
    /// Builds a tessellator with texture coordinates disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles texture-coordinate generation in the underlying discretizer
    pub fn compute_tex_coord(&mut self, enable: bool) {
        self.discretizer.compute_tex_coord(enable);
    }

    /// Result of the most recent successful `apply`
    pub fn triangulation(&self) -> Option<&Geometry> {
        self.triangulation.as_ref()
    }

    /// `Result`-returning wrapper around `apply` for non-visitor callers
    pub fn tessellate(&mut self, g: &Geometry) -> Result<Geometry, Error> {
        if g.apply(self) {
            self.triangulation
                .clone()
                .ok_or(Error::DiscretizationFailed(g.kind_name()))
        } else {
            Err(Error::DiscretizationFailed(g.kind_name()))
        }
    }

    fn set(&mut self, t: TriangleSet) -> bool {
        self.triangulation = Some(Geometry::new(GeometryKind::TriangleSet(t)));
        true
    }

    fn fallback(&mut self, g: &Geometry) -> bool {
        if !g.apply(&mut self.discretizer) {
            return false;
        }
        let Some(model) = self.discretizer.discretization().cloned() else {
            return false;
        };
        // the discretization may itself be a quad or face set
        match model.kind() {
            GeometryKind::TriangleSet(_) => {
                self.triangulation = Some(model.clone());
                true
            }
            GeometryKind::QuadSet(q) => self.set(triangulate_quads(q)),
            GeometryKind::FaceSet(f) => self.set(triangulate_faces(f)),
            other => {
                let name: &'static str = other.into();
                log::debug!("no triangulation for discretized {name}");
                false
            }
        }
    }
}

fn triangulate_quads(q: &QuadSet) -> TriangleSet {
    let mut indices = Vec::with_capacity(q.indices.len() * 2);
    for [a, b, c, d] in &q.indices {
        indices.push([*a, *b, *c]);
        indices.push([*a, *c, *d]);
    }
    TriangleSet {
        points: q.points.clone(),
        indices,
        tex_coords: q.tex_coords.clone(),
    }
}

fn triangulate_faces(f: &FaceSet) -> TriangleSet {
    let mut indices = Vec::new();
    for face in &f.indices {
        for i in 1..face.len().saturating_sub(1) {
            indices.push([face[0], face[i], face[i + 1]]);
        }
    }
    TriangleSet {
        points: f.points.clone(),
        indices,
        tex_coords: None,
    }
}

macro_rules! tessellate_via_discretizer {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, g: &Geometry, _d: &$ty) -> bool {
                self.fallback(g)
            }
        )*
    };
}

impl Visitor for Tessellator {
    fn triangle_set(&mut self, g: &Geometry, _d: &TriangleSet) -> bool {
        self.triangulation = Some(g.clone());
        true
    }

    fn quad_set(&mut self, _g: &Geometry, d: &QuadSet) -> bool {
        self.set(triangulate_quads(d))
    }

    fn face_set(&mut self, _g: &Geometry, d: &FaceSet) -> bool {
        self.set(triangulate_faces(d))
    }

    tessellate_via_discretizer! {
        box3: crate::scene::Box3,
        sphere: crate::scene::Sphere,
        cylinder: crate::scene::Cylinder,
        cone: crate::scene::Cone,
        frustum: crate::scene::Frustum,
        disc: crate::scene::Disc,
        paraboloid: crate::scene::Paraboloid,
        bezier_patch: crate::scene::BezierPatch,
        nurbs_patch: crate::scene::NurbsPatch,
        extrusion: crate::scene::Extrusion,
        revolution: crate::scene::Revolution,
        swung: crate::scene::Swung,
        asymmetric_hull: crate::scene::AsymmetricHull,
        extruded_hull: crate::scene::ExtrudedHull,
        elevation_grid: crate::scene::ElevationGrid,
        translated: crate::scene::Translated,
        scaled: crate::scene::Scaled,
        axis_rotated: crate::scene::AxisRotated,
        euler_rotated: crate::scene::EulerRotated,
        oriented: crate::scene::Oriented,
        group: crate::scene::Group,
        ifs: crate::scene::Ifs,
        inline: crate::scene::Inline,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn box_tessellates_to_twelve_triangles() {
        let mut t = Tessellator::new();
        assert!(Geometry::box3(Vector3::new(1.0, 1.0, 1.0)).apply(&mut t));
        let GeometryKind::TriangleSet(ts) = t.triangulation().unwrap().kind() else {
            panic!("expected triangles");
        };
        assert_eq!(ts.indices.len(), 12);
    }

    #[test]
    fn face_fan_triangulation() {
        let g = Geometry::new(GeometryKind::FaceSet(FaceSet {
            points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.5, 1.5, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            indices: vec![vec![0, 1, 2, 3, 4]],
        }));
        let mut t = Tessellator::new();
        assert!(g.apply(&mut t));
        let GeometryKind::TriangleSet(ts) = t.triangulation().unwrap().kind() else {
            panic!("expected triangles");
        };
        assert_eq!(ts.indices.len(), 3);
        assert_eq!(ts.indices[0], [0, 1, 2]);
        assert_eq!(ts.indices[2], [0, 3, 4]);
    }

    #[test]
    fn curves_do_not_tessellate() {
        let g = Geometry::new(GeometryKind::Polyline(crate::scene::Polyline {
            points: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
        }));
        let mut t = Tessellator::new();
        assert!(!g.apply(&mut t));
    }

    #[test]
    fn triangle_set_keeps_identity() {
        let g = Geometry::triangle_set(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let mut t = Tessellator::new();
        assert!(g.apply(&mut t));
        assert_eq!(t.triangulation().unwrap().id(), g.id());
    }
}
