//! Double-dispatch visitor protocol over the geometry node variants
//!
//! A [`Visitor`] exposes one method per node variant; a node's
//! [`apply`](crate::scene::Geometry::apply) knows its own variant and invokes
//! the matching method, passing both the node handle (for identity and
//! re-dispatch) and the typed payload.  Callers never match on variant tags
//! themselves.
//!
//! Every method returns a success flag.  `false` means "this visitor could
//! not produce a result for this node"; it is a value, not a panic, and
//! callers decide whether to skip, fall back (most commonly:
//! discretize-then-recurse), or abort the traversal.  The default bodies
//! return `false` for geometry variants and `true` for appearance variants,
//! so a visitor implements exactly the variants it understands.
use crate::scene::{
    Appearance, AsymmetricHull, AxisRotated, BezierCurve, BezierCurve2, BezierPatch, Box3, Cone,
    Cylinder, Disc, ElevationGrid, EulerRotated, ExtrudedHull, Extrusion, FaceSet, Frustum,
    Geometry, GeometryKind, Group, Ifs, Inline, Material, MonoSpectral, MultiSpectral, NurbsCurve,
    NurbsCurve2, NurbsPatch, Oriented, Paraboloid, PointSet, PointSet2, Polyline, Polyline2,
    QuadSet, Revolution, Scaled, Sphere, Swung, Texture2, Translated, TriangleSet,
};

macro_rules! geometry_methods {
    ($($(#[$meta:meta])* $name:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            #[allow(unused_variables)]
            fn $name(&mut self, g: &Geometry, d: &$ty) -> bool {
                false
            }
        )*
    };
}

/// Traversal visitor with one method per node variant
///
/// `begin_process` / `end_process` bracket one top-level traversal:
/// `begin_process` resets per-traversal state (caches, accumulators) and
/// `end_process` performs deferred finalization (for the serializer, the
/// merge-and-encode pass).
pub trait Visitor {
    /// Resets per-traversal state; called once before the first shape
    fn begin_process(&mut self) -> bool {
        true
    }

    /// Finalizes the traversal; not called if the collect phase failed
    fn end_process(&mut self) -> bool {
        true
    }

    geometry_methods! {
        /// Visits an axis-aligned box
        box3: Box3,
        /// Visits a sphere
        sphere: Sphere,
        /// Visits a cylinder
        cylinder: Cylinder,
        /// Visits a cone
        cone: Cone,
        /// Visits a frustum
        frustum: Frustum,
        /// Visits a disc
        disc: Disc,
        /// Visits a paraboloid
        paraboloid: Paraboloid,
        /// Visits a Bezier curve
        bezier_curve: BezierCurve,
        /// Visits a Bezier patch
        bezier_patch: BezierPatch,
        /// Visits a NURBS curve
        nurbs_curve: NurbsCurve,
        /// Visits a NURBS patch
        nurbs_patch: NurbsPatch,
        /// Visits a planar Bezier curve
        bezier_curve2: BezierCurve2,
        /// Visits a planar NURBS curve
        nurbs_curve2: NurbsCurve2,
        /// Visits an extrusion
        extrusion: Extrusion,
        /// Visits a surface of revolution
        revolution: Revolution,
        /// Visits a swung surface
        swung: Swung,
        /// Visits an asymmetric hull
        asymmetric_hull: AsymmetricHull,
        /// Visits an extruded hull
        extruded_hull: ExtrudedHull,
        /// Visits an elevation grid
        elevation_grid: ElevationGrid,
        /// Visits an indexed triangle mesh
        triangle_set: TriangleSet,
        /// Visits an indexed quad mesh
        quad_set: QuadSet,
        /// Visits an indexed mixed-arity mesh
        face_set: FaceSet,
        /// Visits a 3D point cloud
        point_set: PointSet,
        /// Visits a 3D polyline
        polyline: Polyline,
        /// Visits a 2D point cloud
        point_set2: PointSet2,
        /// Visits a 2D polyline
        polyline2: Polyline2,
        /// Visits a translation wrapper
        translated: Translated,
        /// Visits a scaling wrapper
        scaled: Scaled,
        /// Visits an axis-rotation wrapper
        axis_rotated: AxisRotated,
        /// Visits an Euler-rotation wrapper
        euler_rotated: EulerRotated,
        /// Visits a change-of-basis wrapper
        oriented: Oriented,
        /// Visits an ordered group
        group: Group,
        /// Visits an iterated function system
        ifs: Ifs,
        /// Visits an inlined sub-scene
        inline: Inline,
    }

    /// Visits a material appearance
    #[allow(unused_variables)]
    fn material(&mut self, m: &Material) -> bool {
        true
    }

    /// Visits a texture appearance
    #[allow(unused_variables)]
    fn texture2(&mut self, t: &Texture2) -> bool {
        true
    }

    /// Visits a mono-spectral appearance
    #[allow(unused_variables)]
    fn mono_spectral(&mut self, s: &MonoSpectral) -> bool {
        true
    }

    /// Visits a multi-spectral appearance
    #[allow(unused_variables)]
    fn multi_spectral(&mut self, s: &MultiSpectral) -> bool {
        true
    }
}

impl Geometry {
    /// Double dispatch: invokes the visitor method matching this node's
    /// variant
    pub fn apply(&self, v: &mut dyn Visitor) -> bool {
        match self.kind() {
            GeometryKind::Box3(d) => v.box3(self, d),
            GeometryKind::Sphere(d) => v.sphere(self, d),
            GeometryKind::Cylinder(d) => v.cylinder(self, d),
            GeometryKind::Cone(d) => v.cone(self, d),
            GeometryKind::Frustum(d) => v.frustum(self, d),
            GeometryKind::Disc(d) => v.disc(self, d),
            GeometryKind::Paraboloid(d) => v.paraboloid(self, d),
            GeometryKind::BezierCurve(d) => v.bezier_curve(self, d),
            GeometryKind::BezierPatch(d) => v.bezier_patch(self, d),
            GeometryKind::NurbsCurve(d) => v.nurbs_curve(self, d),
            GeometryKind::NurbsPatch(d) => v.nurbs_patch(self, d),
            GeometryKind::BezierCurve2(d) => v.bezier_curve2(self, d),
            GeometryKind::NurbsCurve2(d) => v.nurbs_curve2(self, d),
            GeometryKind::Extrusion(d) => v.extrusion(self, d),
            GeometryKind::Revolution(d) => v.revolution(self, d),
            GeometryKind::Swung(d) => v.swung(self, d),
            GeometryKind::AsymmetricHull(d) => v.asymmetric_hull(self, d),
            GeometryKind::ExtrudedHull(d) => v.extruded_hull(self, d),
            GeometryKind::ElevationGrid(d) => v.elevation_grid(self, d),
            GeometryKind::TriangleSet(d) => v.triangle_set(self, d),
            GeometryKind::QuadSet(d) => v.quad_set(self, d),
            GeometryKind::FaceSet(d) => v.face_set(self, d),
            GeometryKind::PointSet(d) => v.point_set(self, d),
            GeometryKind::Polyline(d) => v.polyline(self, d),
            GeometryKind::PointSet2(d) => v.point_set2(self, d),
            GeometryKind::Polyline2(d) => v.polyline2(self, d),
            GeometryKind::Translated(d) => v.translated(self, d),
            GeometryKind::Scaled(d) => v.scaled(self, d),
            GeometryKind::AxisRotated(d) => v.axis_rotated(self, d),
            GeometryKind::EulerRotated(d) => v.euler_rotated(self, d),
            GeometryKind::Oriented(d) => v.oriented(self, d),
            GeometryKind::Group(d) => v.group(self, d),
            GeometryKind::Ifs(d) => v.ifs(self, d),
            GeometryKind::Inline(d) => v.inline(self, d),
        }
    }
}

impl Appearance {
    /// Double dispatch for appearance variants
    pub fn apply(&self, v: &mut dyn Visitor) -> bool {
        match self {
            Appearance::Material(m) => v.material(m),
            Appearance::Texture2(t) => v.texture2(t),
            Appearance::MonoSpectral(s) => v.mono_spectral(s),
            Appearance::MultiSpectral(s) => v.multi_spectral(s),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::{Scene, Shape};
    use nalgebra::Vector3;

    /// Counts sphere visits; everything else takes the default `false`
    #[derive(Default)]
    struct SphereCounter {
        seen: usize,
        began: bool,
        ended: bool,
    }

    impl Visitor for SphereCounter {
        fn begin_process(&mut self) -> bool {
            self.began = true;
            true
        }
        fn end_process(&mut self) -> bool {
            self.ended = true;
            true
        }
        fn sphere(&mut self, _g: &Geometry, _d: &Sphere) -> bool {
            self.seen += 1;
            true
        }
    }

    #[test]
    fn dispatch_reaches_matching_method() {
        let mut v = SphereCounter::default();
        assert!(Geometry::sphere(1.0).apply(&mut v));
        assert!(!Geometry::box3(Vector3::new(1.0, 1.0, 1.0)).apply(&mut v));
        assert_eq!(v.seen, 1);
    }

    #[test]
    fn failed_collect_skips_end_process() {
        let mut scene = Scene::new();
        scene.add(Shape::untextured(Geometry::sphere(1.0)));
        // the box has no rule in SphereCounter, so the traversal aborts
        scene.add(Shape::untextured(Geometry::box3(Vector3::new(
            1.0, 1.0, 1.0,
        ))));
        let mut v = SphereCounter::default();
        assert!(!scene.apply(&mut v));
        assert!(v.began);
        assert!(!v.ended);
    }
}
