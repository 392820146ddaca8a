//! Scene graph: geometry nodes, appearances, shapes, and scenes
//!
//! A [`Scene`] is an ordered sequence of [`Shape`]s, each pairing one
//! [`Geometry`] node with one [`Appearance`].  Geometry nodes form an
//! immutable DAG: handles are reference-counted and may be shared between
//! parents, which is what makes identity-keyed memoization (and mesh
//! instancing) meaningful.
mod appearance;
mod geometry;

pub use appearance::{
    Appearance, Color3, DEFAULT_AMBIENT, Material, MonoSpectral, MultiSpectral, Texture2,
    Texture2Transform,
};
pub use geometry::{
    AsymmetricHull, AxisRotated, BezierCurve, BezierCurve2, BezierPatch, Box3, Cone, Cylinder,
    DEFAULT_SLICES, DEFAULT_STACKS, DEFAULT_STRIDE, Disc, ElevationGrid, EulerRotated, ExtrudedHull,
    Extrusion, FaceSet, Frustum, Geometry, GeometryKind, Group, Ifs, Inline, NodeId, NurbsCurve,
    NurbsCurve2, NurbsPatch, Oriented, Paraboloid, PointSet, PointSet2, Polyline, Polyline2,
    QuadSet, Revolution, Scaled, Sphere, Swung, Translated, TriangleSet,
};

use crate::visitor::Visitor;

/// One renderable unit: a geometry with its appearance
#[derive(Debug, Clone)]
pub struct Shape {
    /// The geometry node (often the root of a sub-graph)
    pub geometry: Geometry,
    /// Appearance; `None` falls back to [`Material::default`]
    pub appearance: Option<Appearance>,
    /// Optional user identifier, carried through untouched
    pub id: Option<u32>,
}

impl Shape {
    /// Pairs a geometry with an appearance
    pub fn new(geometry: Geometry, appearance: Appearance) -> Self {
        Shape {
            geometry,
            appearance: Some(appearance),
            id: None,
        }
    }

    /// Builds a shape with the default material
    pub fn untextured(geometry: Geometry) -> Self {
        Shape {
            geometry,
            appearance: None,
            id: None,
        }
    }

    /// Applies a visitor to this shape, appearance first
    ///
    /// The appearance is applied before the geometry so that the visitor's
    /// "current color" is correct when the geometry emits mesh data.  A
    /// missing appearance applies the default material.
    pub fn apply(&self, v: &mut dyn Visitor) -> bool {
        let applied = match &self.appearance {
            Some(a) => a.apply(v),
            None => Appearance::default().apply(v),
        };
        if !applied {
            return false;
        }
        self.geometry.apply(v)
    }
}

/// Ordered sequence of shapes
///
/// Order is traversal order; it determines accumulation order during
/// serialization but is otherwise not semantically significant.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    shapes: Vec<Shape>,
}

impl Scene {
    /// Builds an empty scene
    pub fn new() -> Self {
        Scene::default()
    }

    /// Appends a shape
    pub fn add(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    /// Shapes in traversal order
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Number of shapes
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Checks whether the scene holds no shapes
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Runs a full traversal: `begin_process`, every shape in order, then
    /// `end_process`
    ///
    /// If any shape fails, the traversal stops and `end_process` is *not*
    /// invoked: a failed collect phase must not produce partial output.
    pub fn apply(&self, v: &mut dyn Visitor) -> bool {
        if !v.begin_process() {
            return false;
        }
        for shape in &self.shapes {
            if !shape.apply(v) {
                log::debug!(
                    "traversal aborted at node {} ({})",
                    shape.geometry.id(),
                    shape.geometry.kind_name()
                );
                return false;
            }
        }
        v.end_process()
    }
}

impl FromIterator<Shape> for Scene {
    fn from_iter<T: IntoIterator<Item = Shape>>(iter: T) -> Self {
        Scene {
            shapes: iter.into_iter().collect(),
        }
    }
}
