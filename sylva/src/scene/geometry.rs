//! Geometry node variants and the shared node handle
//!
//! A [`Geometry`] is a cheap, clonable handle to one immutable node in the
//! scene DAG.  Cloning the handle shares the node, so the same sphere can sit
//! under three different [`Translated`] wrappers without being duplicated;
//! visitors tell such shared references apart from copies by node identity
//! ([`NodeId`]), never by structural equality.
use super::Scene;
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default azimuthal resolution for solids of revolution
pub const DEFAULT_SLICES: u32 = 8;
/// Default meridional resolution for solids of revolution
pub const DEFAULT_STACKS: u32 = 8;
/// Default sampling resolution for parametric curves
pub const DEFAULT_STRIDE: u32 = 30;

/// Opaque, stable identity of one geometry node
///
/// Assigned from a process-wide counter at node construction and never
/// reused, so it is safe to use as a cache key for the node's lifetime (and
/// beyond: a stale key can only miss, never alias).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned box, described by its half-extents
#[derive(Debug, Clone)]
pub struct Box3 {
    /// Half-extent along each axis
    pub size: Vector3<f32>,
}

/// Sphere centered at the origin
#[derive(Debug, Clone)]
pub struct Sphere {
    /// Radius
    pub radius: f32,
    /// Azimuthal subdivisions
    pub slices: u32,
    /// Meridional subdivisions
    pub stacks: u32,
}

/// Cylinder along +Z with its base in the XY plane
#[derive(Debug, Clone)]
pub struct Cylinder {
    /// Base radius
    pub radius: f32,
    /// Height along +Z
    pub height: f32,
    /// Whether caps are generated
    pub solid: bool,
    /// Azimuthal subdivisions
    pub slices: u32,
}

/// Cone along +Z with its base in the XY plane and apex at `(0, 0, height)`
#[derive(Debug, Clone)]
pub struct Cone {
    /// Base radius
    pub radius: f32,
    /// Height along +Z
    pub height: f32,
    /// Whether the base disc is generated
    pub solid: bool,
    /// Azimuthal subdivisions
    pub slices: u32,
}

/// Truncated cone; the top radius is `radius * taper`
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Base radius
    pub radius: f32,
    /// Height along +Z
    pub height: f32,
    /// Top-to-base radius ratio
    pub taper: f32,
    /// Whether caps are generated
    pub solid: bool,
    /// Azimuthal subdivisions
    pub slices: u32,
}

/// Flat disc in the XY plane
#[derive(Debug, Clone)]
pub struct Disc {
    /// Radius
    pub radius: f32,
    /// Azimuthal subdivisions
    pub slices: u32,
}

/// Paraboloid of revolution along +Z
#[derive(Debug, Clone)]
pub struct Paraboloid {
    /// Base radius
    pub radius: f32,
    /// Height along +Z
    pub height: f32,
    /// Profile exponent; 2 is a true paraboloid
    pub shape: f32,
    /// Whether the base disc is generated
    pub solid: bool,
    /// Azimuthal subdivisions
    pub slices: u32,
    /// Meridional subdivisions
    pub stacks: u32,
}

/// Bezier curve of arbitrary degree in 3D
#[derive(Debug, Clone)]
pub struct BezierCurve {
    /// Control points; degree is `len() - 1`
    pub ctrl_points: Vec<Point3<f32>>,
    /// Number of sampled segments
    pub stride: u32,
}

/// Tensor-product Bezier patch
#[derive(Debug, Clone)]
pub struct BezierPatch {
    /// Control grid, `ctrl_points[u][v]`
    pub ctrl_points: Vec<Vec<Point3<f32>>>,
    /// Sampled segments along U
    pub ustride: u32,
    /// Sampled segments along V
    pub vstride: u32,
}

/// Rational B-spline curve in 3D
#[derive(Debug, Clone)]
pub struct NurbsCurve {
    /// Control points
    pub ctrl_points: Vec<Point3<f32>>,
    /// Per-control-point weights; same length as `ctrl_points`
    pub weights: Vec<f32>,
    /// Knot vector, length `ctrl_points.len() + degree + 1`
    pub knots: Vec<f32>,
    /// Curve degree
    pub degree: u32,
    /// Number of sampled segments
    pub stride: u32,
}

/// Rational B-spline surface
#[derive(Debug, Clone)]
pub struct NurbsPatch {
    /// Control grid, `ctrl_points[u][v]`
    pub ctrl_points: Vec<Vec<Point3<f32>>>,
    /// Per-control-point weights, same shape as `ctrl_points`
    pub weights: Vec<Vec<f32>>,
    /// Knot vector along U
    pub uknots: Vec<f32>,
    /// Knot vector along V
    pub vknots: Vec<f32>,
    /// Degree along U
    pub udegree: u32,
    /// Degree along V
    pub vdegree: u32,
    /// Sampled segments along U
    pub ustride: u32,
    /// Sampled segments along V
    pub vstride: u32,
}

/// Planar Bezier curve
#[derive(Debug, Clone)]
pub struct BezierCurve2 {
    /// Control points; degree is `len() - 1`
    pub ctrl_points: Vec<Point2<f32>>,
    /// Number of sampled segments
    pub stride: u32,
}

/// Planar rational B-spline curve
#[derive(Debug, Clone)]
pub struct NurbsCurve2 {
    /// Control points
    pub ctrl_points: Vec<Point2<f32>>,
    /// Per-control-point weights
    pub weights: Vec<f32>,
    /// Knot vector
    pub knots: Vec<f32>,
    /// Curve degree
    pub degree: u32,
    /// Number of sampled segments
    pub stride: u32,
}

/// Sweep of a planar cross-section along a 3D axis polyline
#[derive(Debug, Clone)]
pub struct Extrusion {
    /// Sweep axis
    pub axis: Vec<Point3<f32>>,
    /// Cross-section, closed implicitly
    pub cross_section: Vec<Point2<f32>>,
    /// Whether end caps are generated
    pub solid: bool,
}

/// Profile revolved about the Z axis
///
/// Profile points are `(radius, z)` pairs.
#[derive(Debug, Clone)]
pub struct Revolution {
    /// Profile in the XZ half-plane
    pub profile: Vec<Point2<f32>>,
    /// Azimuthal subdivisions
    pub slices: u32,
}

/// Several profiles swung about the Z axis, interpolated by azimuth
#[derive(Debug, Clone)]
pub struct Swung {
    /// Profiles, each in its own azimuthal half-plane
    pub profiles: Vec<Vec<Point2<f32>>>,
    /// Azimuth of each profile, radians, strictly increasing
    pub angles: Vec<f32>,
    /// Azimuthal subdivisions
    pub slices: u32,
}

/// Hull with independent radii and heights in each axis direction
#[derive(Debug, Clone)]
pub struct AsymmetricHull {
    /// Radius toward -X
    pub neg_x_radius: f32,
    /// Radius toward +X
    pub pos_x_radius: f32,
    /// Radius toward -Y
    pub neg_y_radius: f32,
    /// Radius toward +Y
    pub pos_y_radius: f32,
    /// Equator height at -X
    pub neg_x_height: f32,
    /// Equator height at +X
    pub pos_x_height: f32,
    /// Equator height at -Y
    pub neg_y_height: f32,
    /// Equator height at +Y
    pub pos_y_height: f32,
    /// Apex
    pub top: Vector3<f32>,
    /// Nadir
    pub bottom: Vector3<f32>,
    /// Curvature exponent of the upper half
    pub top_shape: f32,
    /// Curvature exponent of the lower half
    pub bottom_shape: f32,
    /// Azimuthal subdivisions per quadrant
    pub slices: u32,
    /// Meridional subdivisions per half
    pub stacks: u32,
}

/// Vertical silhouette extruded along a horizontal cross-section
#[derive(Debug, Clone)]
pub struct ExtrudedHull {
    /// Silhouette in the XZ plane, `(half-width scale, z)` pairs
    pub vertical: Vec<Point2<f32>>,
    /// Cross-section in the XY plane
    pub horizontal: Vec<Point2<f32>>,
}

/// Regular grid of heights over the XY plane
#[derive(Debug, Clone)]
pub struct ElevationGrid {
    /// Height samples, `heights[x][y]`
    pub heights: Vec<Vec<f32>>,
    /// Grid spacing along X
    pub xspacing: f32,
    /// Grid spacing along Y
    pub yspacing: f32,
}

impl ElevationGrid {
    /// Number of samples along X
    pub fn xdim(&self) -> usize {
        self.heights.len()
    }

    /// Number of samples along Y
    pub fn ydim(&self) -> usize {
        self.heights.first().map_or(0, Vec::len)
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone)]
pub struct TriangleSet {
    /// Vertex positions
    pub points: Vec<Point3<f32>>,
    /// Vertex index triples, counter-clockwise
    pub indices: Vec<[u32; 3]>,
    /// Optional per-vertex texture coordinates
    pub tex_coords: Option<Vec<Point2<f32>>>,
}

/// Indexed quad mesh
#[derive(Debug, Clone)]
pub struct QuadSet {
    /// Vertex positions
    pub points: Vec<Point3<f32>>,
    /// Vertex index quadruples, counter-clockwise
    pub indices: Vec<[u32; 4]>,
    /// Optional per-vertex texture coordinates
    pub tex_coords: Option<Vec<Point2<f32>>>,
}

/// Indexed mesh with faces of arbitrary arity
#[derive(Debug, Clone)]
pub struct FaceSet {
    /// Vertex positions
    pub points: Vec<Point3<f32>>,
    /// Per-face vertex indices, counter-clockwise
    pub indices: Vec<Vec<u32>>,
}

/// Unstructured 3D point cloud
#[derive(Debug, Clone)]
pub struct PointSet {
    /// Point positions
    pub points: Vec<Point3<f32>>,
}

/// Open 3D polyline
#[derive(Debug, Clone)]
pub struct Polyline {
    /// Vertices in order
    pub points: Vec<Point3<f32>>,
}

/// Unstructured 2D point cloud
#[derive(Debug, Clone)]
pub struct PointSet2 {
    /// Point positions
    pub points: Vec<Point2<f32>>,
}

/// Open 2D polyline
#[derive(Debug, Clone)]
pub struct Polyline2 {
    /// Vertices in order
    pub points: Vec<Point2<f32>>,
}

/// Child geometry displaced by a translation
#[derive(Debug, Clone)]
pub struct Translated {
    /// Translation applied to the child
    pub translation: Vector3<f32>,
    /// Wrapped geometry
    pub geometry: Geometry,
}

/// Child geometry scaled per axis
#[derive(Debug, Clone)]
pub struct Scaled {
    /// Scale factors
    pub scale: Vector3<f32>,
    /// Wrapped geometry
    pub geometry: Geometry,
}

/// Child geometry rotated about an arbitrary axis
#[derive(Debug, Clone)]
pub struct AxisRotated {
    /// Rotation axis, need not be normalized
    pub axis: Vector3<f32>,
    /// Rotation angle, radians
    pub angle: f32,
    /// Wrapped geometry
    pub geometry: Geometry,
}

/// Child geometry rotated by ZYX Euler angles
#[derive(Debug, Clone)]
pub struct EulerRotated {
    /// Rotation about Z, radians
    pub azimuth: f32,
    /// Rotation about Y, radians
    pub elevation: f32,
    /// Rotation about X, radians
    pub roll: f32,
    /// Wrapped geometry
    pub geometry: Geometry,
}

/// Child geometry re-expressed in a new orthonormal basis
#[derive(Debug, Clone)]
pub struct Oriented {
    /// New X axis
    pub primary: Vector3<f32>,
    /// New Y axis
    pub secondary: Vector3<f32>,
    /// Wrapped geometry
    pub geometry: Geometry,
}

impl Oriented {
    /// Change-of-basis matrix; the third axis is `primary × secondary`
    pub fn basis(&self) -> Matrix4<f32> {
        let z = self.primary.cross(&self.secondary);
        Matrix4::from_columns(&[
            self.primary.to_homogeneous(),
            self.secondary.to_homogeneous(),
            z.to_homogeneous(),
            nalgebra::Vector4::w(),
        ])
    }
}

/// Ordered list of child geometries
#[derive(Debug, Clone)]
pub struct Group {
    /// Children, visited in order
    pub children: Vec<Geometry>,
}

/// Iterated function system: one child replicated under a list of transforms
///
/// With `depth > 1` the transform set is composed with itself `depth` times,
/// producing `transforms.len() ^ depth` logical copies.
#[derive(Debug, Clone)]
pub struct Ifs {
    /// Iteration depth, at least 1
    pub depth: u32,
    /// Generator transforms
    pub transforms: Vec<Matrix4<f32>>,
    /// Replicated geometry
    pub geometry: Geometry,
}

impl Ifs {
    /// Expands the generator set to the composed transforms at `depth`
    pub fn expanded_transforms(&self) -> Vec<Matrix4<f32>> {
        let mut out = vec![Matrix4::identity()];
        for _ in 0..self.depth.max(1) {
            let mut next = Vec::with_capacity(out.len() * self.transforms.len());
            for m in &out {
                for t in &self.transforms {
                    next.push(m * t);
                }
            }
            out = next;
        }
        out
    }
}

/// Reference to an externally stored sub-scene
#[derive(Debug, Clone)]
pub struct Inline {
    /// The sub-scene
    pub scene: Arc<Scene>,
    /// Translation applied to the whole sub-scene
    pub translation: Vector3<f32>,
    /// Scale applied to the whole sub-scene
    pub scale: Vector3<f32>,
}

impl Inline {
    /// Whether translation and scale are both defaults (identity)
    pub fn is_transform_default(&self) -> bool {
        self.translation == Vector3::zeros() && self.scale == Vector3::new(1.0, 1.0, 1.0)
    }
}

/// Closed set of geometry node variants
#[derive(Debug, Clone, strum::IntoStaticStr)]
#[allow(missing_docs)]
pub enum GeometryKind {
    Box3(Box3),
    Sphere(Sphere),
    Cylinder(Cylinder),
    Cone(Cone),
    Frustum(Frustum),
    Disc(Disc),
    Paraboloid(Paraboloid),
    BezierCurve(BezierCurve),
    BezierPatch(BezierPatch),
    NurbsCurve(NurbsCurve),
    NurbsPatch(NurbsPatch),
    BezierCurve2(BezierCurve2),
    NurbsCurve2(NurbsCurve2),
    Extrusion(Extrusion),
    Revolution(Revolution),
    Swung(Swung),
    AsymmetricHull(AsymmetricHull),
    ExtrudedHull(ExtrudedHull),
    ElevationGrid(ElevationGrid),
    TriangleSet(TriangleSet),
    QuadSet(QuadSet),
    FaceSet(FaceSet),
    PointSet(PointSet),
    Polyline(Polyline),
    PointSet2(PointSet2),
    Polyline2(Polyline2),
    Translated(Translated),
    Scaled(Scaled),
    AxisRotated(AxisRotated),
    EulerRotated(EulerRotated),
    Oriented(Oriented),
    Group(Group),
    Ifs(Ifs),
    Inline(Inline),
}

#[derive(Debug)]
struct GeometryNode {
    id: NodeId,
    kind: GeometryKind,
}

/// Shared handle to one immutable geometry node
///
/// Cloning shares the node; the clone observes the same [`NodeId`].
#[derive(Debug, Clone)]
pub struct Geometry(Arc<GeometryNode>);

impl Geometry {
    /// Wraps a variant into a fresh node with a new identity
    pub fn new(kind: GeometryKind) -> Self {
        Geometry(Arc::new(GeometryNode {
            id: NodeId::next(),
            kind,
        }))
    }

    /// Stable identity of this node
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// The node's variant payload
    pub fn kind(&self) -> &GeometryKind {
        &self.0.kind
    }

    /// Variant name, for log messages
    pub fn kind_name(&self) -> &'static str {
        self.kind().into()
    }

    /// Builds a box from half-extents
    pub fn box3(size: Vector3<f32>) -> Self {
        Self::new(GeometryKind::Box3(Box3 { size }))
    }

    /// Builds a sphere with default resolution
    pub fn sphere(radius: f32) -> Self {
        Self::new(GeometryKind::Sphere(Sphere {
            radius,
            slices: DEFAULT_SLICES,
            stacks: DEFAULT_STACKS,
        }))
    }

    /// Builds a solid cylinder with default resolution
    pub fn cylinder(radius: f32, height: f32) -> Self {
        Self::new(GeometryKind::Cylinder(Cylinder {
            radius,
            height,
            solid: true,
            slices: DEFAULT_SLICES,
        }))
    }

    /// Builds a solid cone with default resolution
    pub fn cone(radius: f32, height: f32) -> Self {
        Self::new(GeometryKind::Cone(Cone {
            radius,
            height,
            solid: true,
            slices: DEFAULT_SLICES,
        }))
    }

    /// Builds a disc with default resolution
    pub fn disc(radius: f32) -> Self {
        Self::new(GeometryKind::Disc(Disc {
            radius,
            slices: DEFAULT_SLICES,
        }))
    }

    /// Builds a triangle set without texture coordinates
    pub fn triangle_set(points: Vec<Point3<f32>>, indices: Vec<[u32; 3]>) -> Self {
        Self::new(GeometryKind::TriangleSet(TriangleSet {
            points,
            indices,
            tex_coords: None,
        }))
    }

    /// Wraps a geometry in a translation
    pub fn translated(translation: Vector3<f32>, geometry: Geometry) -> Self {
        Self::new(GeometryKind::Translated(Translated {
            translation,
            geometry,
        }))
    }

    /// Wraps a geometry in a per-axis scaling
    pub fn scaled(scale: Vector3<f32>, geometry: Geometry) -> Self {
        Self::new(GeometryKind::Scaled(Scaled { scale, geometry }))
    }

    /// Builds an ordered group
    pub fn group(children: Vec<Geometry>) -> Self {
        Self::new(GeometryKind::Group(Group { children }))
    }
}

impl PartialEq for Geometry {
    /// Identity comparison, not structural equality
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Geometry {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn clone_shares_identity() {
        let g = Geometry::sphere(1.0);
        let h = g.clone();
        assert_eq!(g.id(), h.id());
        assert_eq!(g, h);
        let other = Geometry::sphere(1.0);
        assert_ne!(g.id(), other.id());
        assert_ne!(g, other);
    }

    #[test]
    fn ifs_depth_expansion() {
        let t = Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0));
        let ifs = Ifs {
            depth: 2,
            transforms: vec![t, Matrix4::identity()],
            geometry: Geometry::sphere(1.0),
        };
        assert_eq!(ifs.expanded_transforms().len(), 4);
    }
}
