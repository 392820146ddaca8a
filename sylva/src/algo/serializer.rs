//! Scene serialization with mesh instancing
//!
//! The serializer walks a scene once, tessellating every surface shape and
//! bucketing the results by triangulation identity: a sub-graph shared
//! between several parents produces one bucket with several instances, each
//! remembering the cumulative transform and color under which it was
//! visited.
//!
//! Finalization partitions the buckets.  Geometry seen exactly once merges
//! into a single mesh with its transform baked into the positions;
//! geometry seen more than once encodes untransformed, once, with its
//! per-instance transforms and colors attached as metadata.  Every encoded
//! buffer is concatenated into one byte stream with an offsets table.
//!
//! Output is byte-deterministic: buckets are visited in first-visit order
//! and instances in visit order, so serializing the same scene twice yields
//! identical bytes.
use super::Tessellator;
use crate::Error;
use crate::cache::Cache;
use crate::codec::{
    AttributeKind, DataType, Encoder, MeshBuilder, MetadataValue, NORMAL_QUANTIZATION,
    POSITION_QUANTIZATION, TEXCOORD_QUANTIZATION,
};
use crate::matrix::MatrixStack;
use crate::scene::{
    Color3, DEFAULT_AMBIENT, Geometry, GeometryKind, Material, MonoSpectral, MultiSpectral, Scene,
    Texture2, TriangleSet,
};
use crate::visitor::Visitor;
use nalgebra::Matrix4;

/// Serialization options
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Speed/ratio trade-off passed to the encoder, `0..=10`
    pub speed: i32,
    /// Flatten everything into one mesh instead of instancing
    pub single_mesh: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions {
            speed: 5,
            single_mesh: false,
        }
    }
}

/// One tessellated geometry and every placement it was seen under
#[derive(Debug, Clone)]
pub struct TriangleSoup {
    /// Shared triangulation
    pub triangulation: Geometry,
    /// Cumulative transform and current color per visit
    pub instances: Vec<(Matrix4<f32>, Color3)>,
}

/// Serialized scene: concatenated encoded buffers plus their offsets
#[derive(Debug, Clone)]
pub struct SerializedScene {
    data: Vec<u8>,
    offsets: Vec<usize>,
}

impl SerializedScene {
    /// The concatenated byte stream
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte offset of each buffer within [`data`](SerializedScene::data)
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of encoded buffers
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Checks whether the stream holds no buffers
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The individual encoded buffers, in stream order
    pub fn buffers(&self) -> impl Iterator<Item = &[u8]> {
        (0..self.offsets.len()).map(|i| {
            let start = self.offsets[i];
            let end = self
                .offsets
                .get(i + 1)
                .copied()
                .unwrap_or(self.data.len());
            &self.data[start..end]
        })
    }
}

/// Name of the metadata entry carrying instance transforms and colors
pub const INSTANCES_METADATA: &str = "instances";

/// Doubles per instance in the metadata array: a column-major 4×4 matrix
/// followed by three color components
const DOUBLES_PER_INSTANCE: usize = 16 + 3;

/// Visitor serializing a scene into encoded mesh buffers
pub struct Serializer {
    options: SerializeOptions,
    matrix: MatrixStack,
    current_color: Color3,
    // the active appearance is a texture, so tessellation carries UVs
    textured: bool,
    tessellator: Tessellator,
    // node id -> its triangulation, so shared nodes tessellate once
    tessellated: Cache<Geometry>,
    // triangulation id -> soup, in first-visit order
    soups: Cache<TriangleSoup>,
    result: Option<SerializedScene>,
}

impl Serializer {
    /// Builds a serializer, validating the speed option
    pub fn new(options: SerializeOptions) -> Result<Self, Error> {
        if !(0..=10).contains(&options.speed) {
            return Err(Error::BadSpeed(options.speed));
        }
        Ok(Serializer {
            options,
            matrix: MatrixStack::new(),
            current_color: DEFAULT_AMBIENT,
            textured: false,
            tessellator: Tessellator::new(),
            tessellated: Cache::new(),
            soups: Cache::new(),
            result: None,
        })
    }

    /// Result of the most recent successful traversal
    pub fn take_result(&mut self) -> Option<SerializedScene> {
        self.result.take()
    }

    /// Tessellates a node at most once per traversal
    fn triangulation_of(&mut self, g: &Geometry) -> Option<Geometry> {
        if let Some(t) = self.tessellated.get(g.id()) {
            return Some(t.clone());
        }
        self.tessellator.compute_tex_coord(self.textured);
        if !g.apply(&mut self.tessellator) {
            return None;
        }
        let t = self.tessellator.triangulation().cloned()?;
        self.tessellated.insert(g.id(), t.clone());
        Some(t)
    }

    /// Records one placement of a surface node under the current transform
    /// and color
    fn instance(&mut self, g: &Geometry) -> bool {
        let Some(tri) = self.triangulation_of(g) else {
            log::debug!("tessellation failed for {} {}", g.kind_name(), g.id());
            return false;
        };
        let placement = (self.matrix.matrix(), self.current_color);
        let key = tri.id();
        match self.soups.get_mut(key) {
            Some(soup) => soup.instances.push(placement),
            None => self.soups.insert(
                key,
                TriangleSoup {
                    triangulation: tri,
                    instances: vec![placement],
                },
            ),
        }
        true
    }

    /// Single pairing site for the matrix stack: pushes, composes, recurses,
    /// pops
    fn with_matrix(&mut self, m: &Matrix4<f32>, child: &Geometry) -> bool {
        self.matrix.push();
        self.matrix.transform(m);
        let ok = child.apply(self);
        self.matrix.pop();
        ok
    }

    /// Encodes a mesh and appends it to the output stream
    fn emit(
        &self,
        mesh: &crate::codec::CodecMesh,
        data: &mut Vec<u8>,
        offsets: &mut Vec<usize>,
    ) -> bool {
        let mut encoder = Encoder::new();
        encoder.set_attribute_quantization(AttributeKind::Position, POSITION_QUANTIZATION);
        encoder.set_attribute_quantization(AttributeKind::TexCoord, TEXCOORD_QUANTIZATION);
        encoder.set_attribute_quantization(AttributeKind::Normal, NORMAL_QUANTIZATION);
        if encoder
            .set_speed_options(self.options.speed, self.options.speed)
            .is_err()
        {
            return false;
        }
        match encoder.encode_to_buffer(mesh) {
            Ok(buf) => {
                offsets.push(data.len());
                data.extend_from_slice(buf.data());
                true
            }
            Err(e) => {
                log::warn!("mesh encode failed: {e}");
                false
            }
        }
    }
}

/// Builds one mesh from baked placements: positions pre-transformed, one
/// color per face
fn merge_baked(parts: &[(&TriangleSet, Matrix4<f32>, Color3)]) -> Option<crate::codec::CodecMesh> {
    let total: usize = parts.iter().map(|(t, _, _)| t.indices.len()).sum();
    let mut b = MeshBuilder::start(total);
    let pos = b.add_attribute(AttributeKind::Position, 3, DataType::F32);
    let col = b.add_attribute(AttributeKind::Color, 3, DataType::U8);
    // untextured parts fall back to the builder's zero default
    let uv = parts
        .iter()
        .any(|(t, _, _)| t.tex_coords.is_some())
        .then(|| b.add_attribute(AttributeKind::TexCoord, 2, DataType::F32));
    let mut face = 0;
    for (t, m, color) in parts {
        let rgb = [f32::from(color.r), f32::from(color.g), f32::from(color.b)];
        for [i, j, k] in &t.indices {
            let mut corners = [0.0f32; 9];
            let mut uvs = [0.0f32; 6];
            for (n, idx) in [i, j, k].into_iter().enumerate() {
                let p = m.transform_point(&t.points[*idx as usize]);
                corners[n * 3..n * 3 + 3].copy_from_slice(&[p.x, p.y, p.z]);
                if let Some(tc) = t.tex_coords.as_ref().and_then(|tc| tc.get(*idx as usize)) {
                    uvs[n * 2..n * 2 + 2].copy_from_slice(&[tc.x, tc.y]);
                }
            }
            if b.set_attribute_values_for_face(pos, face, &corners).is_err()
                || b.set_per_face_attribute_value(col, face, &rgb).is_err()
            {
                return None;
            }
            if let Some(uv) = uv {
                if b.set_attribute_values_for_face(uv, face, &uvs).is_err() {
                    return None;
                }
            }
            face += 1;
        }
    }
    Some(b.finalize(true))
}

/// Builds one untransformed mesh with its placements as metadata
fn instanced_mesh(soup: &TriangleSoup) -> Option<crate::codec::CodecMesh> {
    let GeometryKind::TriangleSet(t) = soup.triangulation.kind() else {
        return None;
    };
    let mut b = MeshBuilder::start(t.indices.len());
    let pos = b.add_attribute(AttributeKind::Position, 3, DataType::F32);
    let uv = t
        .tex_coords
        .is_some()
        .then(|| b.add_attribute(AttributeKind::TexCoord, 2, DataType::F32));
    for (face, [i, j, k]) in t.indices.iter().enumerate() {
        let mut corners = [0.0f32; 9];
        let mut uvs = [0.0f32; 6];
        for (n, idx) in [i, j, k].into_iter().enumerate() {
            let p = t.points[*idx as usize];
            corners[n * 3..n * 3 + 3].copy_from_slice(&[p.x, p.y, p.z]);
            if let Some(tc) = t.tex_coords.as_ref().and_then(|tc| tc.get(*idx as usize)) {
                uvs[n * 2..n * 2 + 2].copy_from_slice(&[tc.x, tc.y]);
            }
        }
        if b.set_attribute_values_for_face(pos, face, &corners).is_err() {
            return None;
        }
        if let Some(uv) = uv {
            if b.set_attribute_values_for_face(uv, face, &uvs).is_err() {
                return None;
            }
        }
    }
    let mut mesh = b.finalize(true);
    let mut doubles = Vec::with_capacity(soup.instances.len() * DOUBLES_PER_INSTANCE);
    for (m, color) in &soup.instances {
        doubles.extend(m.as_slice().iter().map(|v| f64::from(*v)));
        doubles.push(f64::from(color.r));
        doubles.push(f64::from(color.g));
        doubles.push(f64::from(color.b));
    }
    mesh.add_metadata(INSTANCES_METADATA, MetadataValue::DoubleArray(doubles));
    Some(mesh)
}

macro_rules! serialize_as_instance {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, g: &Geometry, _d: &$ty) -> bool {
                self.instance(g)
            }
        )*
    };
}

macro_rules! serialize_skipped {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, g: &Geometry, _d: &$ty) -> bool {
                log::trace!("skipping non-surface {} {}", g.kind_name(), g.id());
                true
            }
        )*
    };
}

impl Visitor for Serializer {
    fn begin_process(&mut self) -> bool {
        self.matrix = MatrixStack::new();
        self.current_color = DEFAULT_AMBIENT;
        self.textured = false;
        self.tessellated.clear();
        self.soups.clear();
        self.result = None;
        true
    }

    fn end_process(&mut self) -> bool {
        let mut data = Vec::new();
        let mut offsets = Vec::new();
        if self.options.single_mesh {
            let mut parts = Vec::new();
            for (_, soup) in self.soups.iter() {
                let GeometryKind::TriangleSet(t) = soup.triangulation.kind() else {
                    return false;
                };
                for (m, color) in &soup.instances {
                    parts.push((t, *m, *color));
                }
            }
            let Some(mesh) = merge_baked(&parts) else {
                return false;
            };
            if !self.emit(&mesh, &mut data, &mut offsets) {
                return false;
            }
        } else {
            // singletons first, merged into one mesh with baked transforms
            let mut singles = Vec::new();
            for (_, soup) in self.soups.iter() {
                if soup.instances.len() != 1 {
                    continue;
                }
                let GeometryKind::TriangleSet(t) = soup.triangulation.kind() else {
                    return false;
                };
                let (m, color) = soup.instances[0];
                singles.push((t, m, color));
            }
            if !singles.is_empty() {
                let Some(mesh) = merge_baked(&singles) else {
                    return false;
                };
                if !self.emit(&mesh, &mut data, &mut offsets) {
                    return false;
                }
            }
            // then one buffer per instanced geometry
            for (_, soup) in self.soups.iter() {
                if soup.instances.len() < 2 {
                    continue;
                }
                let Some(mesh) = instanced_mesh(soup) else {
                    return false;
                };
                if !self.emit(&mesh, &mut data, &mut offsets) {
                    return false;
                }
            }
        }
        self.result = Some(SerializedScene { data, offsets });
        true
    }

    fn material(&mut self, m: &Material) -> bool {
        self.current_color = m.ambient;
        self.textured = false;
        true
    }

    fn texture2(&mut self, t: &Texture2) -> bool {
        self.current_color = t.base_color;
        self.textured = true;
        true
    }

    fn mono_spectral(&mut self, _s: &MonoSpectral) -> bool {
        self.textured = false;
        true
    }

    fn multi_spectral(&mut self, _s: &MultiSpectral) -> bool {
        self.textured = false;
        true
    }

    serialize_as_instance! {
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
        triangle_set: TriangleSet,
        quad_set: crate::scene::QuadSet,
        face_set: crate::scene::FaceSet,
    }

    serialize_skipped! {
        bezier_curve: crate::scene::BezierCurve,
        bezier_curve2: crate::scene::BezierCurve2,
        nurbs_curve: crate::scene::NurbsCurve,
        nurbs_curve2: crate::scene::NurbsCurve2,
        point_set: crate::scene::PointSet,
        polyline: crate::scene::Polyline,
        point_set2: crate::scene::PointSet2,
        polyline2: crate::scene::Polyline2,
    }

    fn translated(&mut self, _g: &Geometry, d: &crate::scene::Translated) -> bool {
        let m = Matrix4::new_translation(&d.translation);
        self.with_matrix(&m, &d.geometry)
    }

    fn scaled(&mut self, _g: &Geometry, d: &crate::scene::Scaled) -> bool {
        let m = Matrix4::new_nonuniform_scaling(&d.scale);
        self.with_matrix(&m, &d.geometry)
    }

    fn axis_rotated(&mut self, _g: &Geometry, d: &crate::scene::AxisRotated) -> bool {
        let axis = nalgebra::Unit::new_normalize(d.axis);
        let m = nalgebra::Rotation3::from_axis_angle(&axis, d.angle).to_homogeneous();
        self.with_matrix(&m, &d.geometry)
    }

    fn euler_rotated(&mut self, _g: &Geometry, d: &crate::scene::EulerRotated) -> bool {
        let m = nalgebra::Rotation3::from_euler_angles(d.roll, d.elevation, d.azimuth)
            .to_homogeneous();
        self.with_matrix(&m, &d.geometry)
    }

    fn oriented(&mut self, _g: &Geometry, d: &crate::scene::Oriented) -> bool {
        self.with_matrix(&d.basis(), &d.geometry)
    }

    fn group(&mut self, _g: &Geometry, d: &crate::scene::Group) -> bool {
        d.children.iter().all(|child| child.apply(self))
    }

    fn ifs(&mut self, _g: &Geometry, d: &crate::scene::Ifs) -> bool {
        d.expanded_transforms()
            .iter()
            .all(|m| self.with_matrix(m, &d.geometry))
    }

    fn inline(&mut self, _g: &Geometry, d: &crate::scene::Inline) -> bool {
        let m = Matrix4::new_translation(&d.translation)
            * Matrix4::new_nonuniform_scaling(&d.scale);
        self.matrix.push();
        self.matrix.transform(&m);
        let saved = self.current_color;
        let ok = d.scene.shapes().iter().all(|shape| shape.apply(self));
        self.current_color = saved;
        self.matrix.pop();
        ok
    }
}

/// Serializes a whole scene in one call
pub fn serialize_scene(
    scene: &Scene,
    options: &SerializeOptions,
) -> Result<SerializedScene, Error> {
    if scene.is_empty() {
        return Err(Error::EmptyScene);
    }
    let mut serializer = Serializer::new(options.clone())?;
    if !scene.apply(&mut serializer) {
        return Err(Error::SerializationFailed);
    }
    serializer.take_result().ok_or(Error::SerializationFailed)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::Decoder;
    use crate::scene::{Appearance, Shape};
    use nalgebra::Vector3;

    fn red() -> Appearance {
        Appearance::Material(Material::with_ambient(Color3::new(128, 0, 0)))
    }

    fn instance_count(scene: &SerializedScene, buffer: usize) -> usize {
        let buf = scene.buffers().nth(buffer).unwrap();
        let mesh = Decoder::new().decode_from_buffer(buf).unwrap();
        match mesh.metadata(INSTANCES_METADATA) {
            Some(MetadataValue::DoubleArray(ds)) => ds.len() / DOUBLES_PER_INSTANCE,
            _ => 0,
        }
    }

    #[test]
    fn single_box_is_one_singleton_buffer() {
        let mut scene = Scene::new();
        scene.add(Shape::new(Geometry::box3(Vector3::new(1.0, 1.0, 1.0)), red()));
        let out = serialize_scene(&scene, &SerializeOptions::default()).unwrap();
        assert_eq!(out.offsets(), &[0]);
        let mesh = Decoder::new()
            .decode_from_buffer(out.buffers().next().unwrap())
            .unwrap();
        assert_eq!(mesh.num_faces(), 12);
        assert!(mesh.metadata(INSTANCES_METADATA).is_none());
        let col = mesh.attribute_by_kind(AttributeKind::Color).unwrap();
        assert_eq!(col.values, vec![128.0, 0.0, 0.0]);
    }

    #[test]
    fn shared_geometry_is_instanced() {
        let shared = Geometry::box3(Vector3::new(1.0, 1.0, 1.0));
        let mut scene = Scene::new();
        for x in 0..3 {
            scene.add(Shape::new(
                Geometry::translated(Vector3::new(x as f32 * 5.0, 0.0, 0.0), shared.clone()),
                red(),
            ));
        }
        let out = serialize_scene(&scene, &SerializeOptions::default()).unwrap();
        // no singletons, one instanced buffer
        assert_eq!(out.len(), 1);
        assert_eq!(instance_count(&out, 0), 3);
        let mesh = Decoder::new()
            .decode_from_buffer(out.buffers().next().unwrap())
            .unwrap();
        // the mesh itself is untransformed and carried once
        assert_eq!(mesh.num_faces(), 12);
    }

    #[test]
    fn singletons_and_instances_partition() {
        let shared = Geometry::sphere(1.0);
        let mut scene = Scene::new();
        scene.add(Shape::new(Geometry::box3(Vector3::new(1.0, 1.0, 1.0)), red()));
        scene.add(Shape::new(
            Geometry::translated(Vector3::new(5.0, 0.0, 0.0), shared.clone()),
            red(),
        ));
        scene.add(Shape::new(
            Geometry::translated(Vector3::new(-5.0, 0.0, 0.0), shared.clone()),
            red(),
        ));
        let out = serialize_scene(&scene, &SerializeOptions::default()).unwrap();
        assert_eq!(out.len(), 2);
        // first buffer is the merged singleton mesh, no metadata
        assert_eq!(instance_count(&out, 0), 0);
        assert_eq!(instance_count(&out, 1), 2);
    }

    #[test]
    fn singleton_positions_are_pre_transformed() {
        let mut scene = Scene::new();
        scene.add(Shape::new(
            Geometry::translated(
                Vector3::new(100.0, 0.0, 0.0),
                Geometry::box3(Vector3::new(1.0, 1.0, 1.0)),
            ),
            red(),
        ));
        let out = serialize_scene(&scene, &SerializeOptions::default()).unwrap();
        let mesh = Decoder::new()
            .decode_from_buffer(out.buffers().next().unwrap())
            .unwrap();
        let pos = mesh.attribute_by_kind(AttributeKind::Position).unwrap();
        let mean_x: f32 = pos
            .values
            .chunks_exact(3)
            .map(|row| row[0])
            .sum::<f32>()
            / pos.unique_values() as f32;
        assert!((mean_x - 100.0).abs() < 0.5, "mean x was {mean_x}");
    }

    #[test]
    fn per_instance_color_wins() {
        let shared = Geometry::box3(Vector3::new(1.0, 1.0, 1.0));
        let mut scene = Scene::new();
        scene.add(Shape::new(
            Geometry::translated(Vector3::new(5.0, 0.0, 0.0), shared.clone()),
            Appearance::Material(Material::with_ambient(Color3::new(255, 0, 0))),
        ));
        scene.add(Shape::new(
            Geometry::translated(Vector3::new(-5.0, 0.0, 0.0), shared.clone()),
            Appearance::Material(Material::with_ambient(Color3::new(0, 0, 255))),
        ));
        let out = serialize_scene(&scene, &SerializeOptions::default()).unwrap();
        let mesh = Decoder::new()
            .decode_from_buffer(out.buffers().next().unwrap())
            .unwrap();
        let Some(MetadataValue::DoubleArray(ds)) = mesh.metadata(INSTANCES_METADATA) else {
            panic!("expected instance metadata");
        };
        let colors: Vec<&[f64]> = ds
            .chunks_exact(DOUBLES_PER_INSTANCE)
            .map(|chunk| &chunk[16..])
            .collect();
        assert_eq!(colors[0], &[255.0, 0.0, 0.0]);
        assert_eq!(colors[1], &[0.0, 0.0, 255.0]);
    }

    #[test]
    fn single_mesh_flattens_everything() {
        let shared = Geometry::box3(Vector3::new(1.0, 1.0, 1.0));
        let mut scene = Scene::new();
        scene.add(Shape::new(shared.clone(), red()));
        scene.add(Shape::new(
            Geometry::translated(Vector3::new(5.0, 0.0, 0.0), shared.clone()),
            red(),
        ));
        scene.add(Shape::new(Geometry::cone(1.0, 2.0), red()));
        let options = SerializeOptions {
            single_mesh: true,
            ..SerializeOptions::default()
        };
        let out = serialize_scene(&scene, &options).unwrap();
        assert_eq!(out.offsets(), &[0]);
        let mesh = Decoder::new()
            .decode_from_buffer(out.buffers().next().unwrap())
            .unwrap();
        assert_eq!(mesh.num_faces(), 12 + 12 + 16);
    }

    #[test]
    fn textured_patch_carries_uv_attribute() {
        use crate::scene::BezierPatch;
        use nalgebra::Point3;
        let patch = || {
            Geometry::new(GeometryKind::BezierPatch(BezierPatch {
                ctrl_points: vec![
                    vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
                    vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)],
                ],
                ustride: 2,
                vstride: 2,
            }))
        };
        let mut scene = Scene::new();
        scene.add(Shape::new(
            patch(),
            Appearance::Texture2(Texture2 {
                base_color: Color3::new(200, 200, 200),
                image: "bark.png".into(),
                transform: None,
            }),
        ));
        let out = serialize_scene(&scene, &SerializeOptions::default()).unwrap();
        let mesh = Decoder::new()
            .decode_from_buffer(out.buffers().next().unwrap())
            .unwrap();
        let uv = mesh.attribute_by_kind(AttributeKind::TexCoord).unwrap();
        assert_eq!(uv.components, 2);
        // corner UVs span the full parametric square
        let max = uv.values.iter().copied().fold(f32::MIN, f32::max);
        assert!((max - 1.0).abs() < 1e-3, "max uv was {max}");

        // the same patch under a plain material stays UV-free
        let mut plain = Scene::new();
        plain.add(Shape::new(patch(), red()));
        let out = serialize_scene(&plain, &SerializeOptions::default()).unwrap();
        let mesh = Decoder::new()
            .decode_from_buffer(out.buffers().next().unwrap())
            .unwrap();
        assert!(mesh.attribute_by_kind(AttributeKind::TexCoord).is_none());
    }

    #[test]
    fn serialization_is_byte_deterministic() {
        let shared = Geometry::sphere(1.0);
        let mut scene = Scene::new();
        scene.add(Shape::new(shared.clone(), red()));
        scene.add(Shape::new(
            Geometry::translated(Vector3::new(2.0, 0.0, 0.0), shared.clone()),
            red(),
        ));
        scene.add(Shape::new(Geometry::cylinder(0.5, 3.0), red()));
        let options = SerializeOptions::default();
        let a = serialize_scene(&scene, &options).unwrap();
        let b = serialize_scene(&scene, &options).unwrap();
        assert_eq!(a.data(), b.data());
        assert_eq!(a.offsets(), b.offsets());
    }

    #[test]
    fn curves_are_skipped_not_fatal() {
        use crate::scene::Polyline;
        let mut scene = Scene::new();
        scene.add(Shape::new(Geometry::box3(Vector3::new(1.0, 1.0, 1.0)), red()));
        scene.add(Shape::untextured(Geometry::new(GeometryKind::Polyline(
            Polyline {
                points: vec![
                    nalgebra::Point3::origin(),
                    nalgebra::Point3::new(1.0, 0.0, 0.0),
                ],
            },
        ))));
        let out = serialize_scene(&scene, &SerializeOptions::default()).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn empty_scene_and_bad_speed_are_errors() {
        assert!(matches!(
            serialize_scene(&Scene::new(), &SerializeOptions::default()),
            Err(Error::EmptyScene)
        ));
        let mut scene = Scene::new();
        scene.add(Shape::untextured(Geometry::sphere(1.0)));
        let options = SerializeOptions {
            speed: 11,
            ..SerializeOptions::default()
        };
        assert!(matches!(
            serialize_scene(&scene, &options),
            Err(Error::BadSpeed(11))
        ));
    }
}
