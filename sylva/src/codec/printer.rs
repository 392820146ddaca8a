//! Whole-scene mesh printer
//!
//! Flattens an entire scene into one encoded mesh: every shape is
//! tessellated, positions land in a quantized position attribute and the
//! shape's current color in a per-face byte attribute.  Unlike the
//! serializer this never instances shared geometry; it is the "just give me
//! one compressed mesh" path.
//!
//! Encoding happens before any file is touched, so a failed encode never
//! leaves a truncated file behind.
use super::{AttributeKind, DataType, Encoder, EncoderBuffer, MeshBuilder};
use crate::Error;
use crate::algo::Tessellator;
use crate::cache::Cache;
use crate::scene::{
    Color3, DEFAULT_AMBIENT, Geometry, GeometryKind, Material, MonoSpectral, MultiSpectral, Scene,
    Texture2,
};
use crate::visitor::Visitor;
use std::io::Write;
use std::path::Path;

/// Quantization depth for positions, bits per component
pub const POSITION_QUANTIZATION: u8 = 11;
/// Quantization depth for texture coordinates
pub const TEXCOORD_QUANTIZATION: u8 = 10;
/// Quantization depth for normals
pub const NORMAL_QUANTIZATION: u8 = 7;
/// Quantization depth for generic attributes
pub const GENERIC_QUANTIZATION: u8 = 8;

/// Visitor encoding a whole scene as one mesh
pub struct MeshPrinter {
    speed: i32,
    tessellator: Tessellator,
    cache: Cache<Geometry>,
    meshes: Vec<(Geometry, Color3)>,
    current_color: Color3,
    // the active appearance is a texture, so tessellation carries UVs
    textured: bool,
    buffer: Option<EncoderBuffer>,
}

impl MeshPrinter {
    /// Builds a printer with the given speed/ratio trade-off (`0..=10`)
    pub fn new(speed: i32) -> Result<Self, Error> {
        if !(0..=10).contains(&speed) {
            return Err(Error::BadSpeed(speed));
        }
        Ok(MeshPrinter {
            speed,
            tessellator: Tessellator::new(),
            cache: Cache::new(),
            meshes: Vec::new(),
            current_color: DEFAULT_AMBIENT,
            textured: false,
            buffer: None,
        })
    }

    /// Encodes a scene into a buffer
    pub fn print_to_buffer(&mut self, scene: &Scene) -> Result<EncoderBuffer, Error> {
        if scene.is_empty() {
            return Err(Error::EmptyScene);
        }
        if !scene.apply(self) {
            return Err(Error::SerializationFailed);
        }
        self.buffer.take().ok_or(Error::SerializationFailed)
    }

    /// Encodes a scene and writes the buffer to a file
    pub fn print_to_file<P: AsRef<Path>>(&mut self, scene: &Scene, path: P) -> Result<(), Error> {
        let buffer = self.print_to_buffer(scene)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(buffer.data())?;
        Ok(())
    }

    /// Tessellates a node (through the per-traversal cache) and queues its
    /// triangles under the current color
    fn collect(&mut self, g: &Geometry) -> bool {
        let tri = match self.cache.get(g.id()) {
            Some(t) => t.clone(),
            None => {
                self.tessellator.compute_tex_coord(self.textured);
                if !g.apply(&mut self.tessellator) {
                    return false;
                }
                let Some(t) = self.tessellator.triangulation().cloned() else {
                    return false;
                };
                self.cache.insert(g.id(), t.clone());
                t
            }
        };
        self.meshes.push((tri, self.current_color));
        true
    }
}

macro_rules! print_by_tessellation {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, g: &Geometry, _d: &$ty) -> bool {
                self.collect(g)
            }
        )*
    };
}

impl Visitor for MeshPrinter {
    fn begin_process(&mut self) -> bool {
        self.cache.clear();
        self.meshes.clear();
        self.current_color = DEFAULT_AMBIENT;
        self.textured = false;
        self.buffer = None;
        true
    }

    /// Second pass: sizes the builder from the queued triangle counts, fills
    /// positions and per-face colors, then encodes
    fn end_process(&mut self) -> bool {
        let total: usize = self.meshes.iter().map(|(t, _)| triangle_count(t)).sum();
        let mut b = MeshBuilder::start(total);
        let pos = b.add_attribute(AttributeKind::Position, 3, DataType::F32);
        let col = b.add_attribute(AttributeKind::Color, 3, DataType::U8);
        // untextured shapes fall back to the builder's zero default
        let uv = self
            .meshes
            .iter()
            .any(|(g, _)| {
                matches!(g.kind(), GeometryKind::TriangleSet(t) if t.tex_coords.is_some())
            })
            .then(|| b.add_attribute(AttributeKind::TexCoord, 2, DataType::F32));
        let mut face = 0;
        for (tri, color) in &self.meshes {
            let GeometryKind::TriangleSet(t) = tri.kind() else {
                return false;
            };
            let rgb = [f32::from(color.r), f32::from(color.g), f32::from(color.b)];
            for [i, j, k] in &t.indices {
                let mut corners = [0.0f32; 9];
                let mut uvs = [0.0f32; 6];
                for (n, idx) in [i, j, k].into_iter().enumerate() {
                    let p = t.points[*idx as usize];
                    corners[n * 3..n * 3 + 3].copy_from_slice(&[p.x, p.y, p.z]);
                    if let Some(tc) = t.tex_coords.as_ref().and_then(|tc| tc.get(*idx as usize)) {
                        uvs[n * 2..n * 2 + 2].copy_from_slice(&[tc.x, tc.y]);
                    }
                }
                if b.set_attribute_values_for_face(pos, face, &corners).is_err()
                    || b.set_per_face_attribute_value(col, face, &rgb).is_err()
                {
                    return false;
                }
                if let Some(uv) = uv {
                    if b.set_attribute_values_for_face(uv, face, &uvs).is_err() {
                        return false;
                    }
                }
                face += 1;
            }
        }
        let mesh = b.finalize(true);
        let mut encoder = Encoder::new();
        encoder.set_attribute_quantization(AttributeKind::Position, POSITION_QUANTIZATION);
        encoder.set_attribute_quantization(AttributeKind::TexCoord, TEXCOORD_QUANTIZATION);
        encoder.set_attribute_quantization(AttributeKind::Normal, NORMAL_QUANTIZATION);
        encoder.set_attribute_quantization(AttributeKind::Generic, GENERIC_QUANTIZATION);
        if encoder.set_speed_options(self.speed, self.speed).is_err() {
            return false;
        }
        match encoder.encode_to_buffer(&mesh) {
            Ok(buf) => {
                log::debug!("encoded {} faces into {} bytes", total, buf.len());
                self.buffer = Some(buf);
                true
            }
            Err(e) => {
                log::warn!("mesh encode failed: {e}");
                false
            }
        }
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

    print_by_tessellation! {
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
        triangle_set: crate::scene::TriangleSet,
        quad_set: crate::scene::QuadSet,
        face_set: crate::scene::FaceSet,
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

fn triangle_count(g: &Geometry) -> usize {
    match g.kind() {
        GeometryKind::TriangleSet(t) => t.indices.len(),
        _ => 0,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::Decoder;
    use crate::scene::{Appearance, Shape};
    use nalgebra::Vector3;

    #[test]
    fn flattens_whole_scene() {
        let mut scene = Scene::new();
        scene.add(Shape::new(
            Geometry::box3(Vector3::new(1.0, 1.0, 1.0)),
            Appearance::Material(Material::with_ambient(Color3::new(255, 0, 0))),
        ));
        scene.add(Shape::untextured(Geometry::cone(1.0, 2.0)));
        let mut p = MeshPrinter::new(5).unwrap();
        let buf = p.print_to_buffer(&scene).unwrap();
        let mesh = Decoder::new().decode_from_buffer(buf.data()).unwrap();
        // 12 box triangles + 16 cone triangles
        assert_eq!(mesh.num_faces(), 28);
        // two distinct face colors
        let col = mesh.attribute_by_kind(AttributeKind::Color).unwrap();
        assert_eq!(col.unique_values(), 2);
    }

    #[test]
    fn textured_shape_gets_uv_attribute() {
        use crate::scene::BezierPatch;
        use nalgebra::Point3;
        let mut scene = Scene::new();
        scene.add(Shape::new(
            Geometry::new(GeometryKind::BezierPatch(BezierPatch {
                ctrl_points: vec![
                    vec![Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 1.0, 0.0)],
                    vec![Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)],
                ],
                ustride: 2,
                vstride: 2,
            })),
            Appearance::Texture2(Texture2 {
                base_color: Color3::new(200, 200, 200),
                image: "bark.png".into(),
                transform: None,
            }),
        ));
        // an untextured shape in the same scene shares the attribute,
        // zero-filled
        scene.add(Shape::untextured(Geometry::box3(Vector3::new(
            1.0, 1.0, 1.0,
        ))));
        let mut p = MeshPrinter::new(5).unwrap();
        let buf = p.print_to_buffer(&scene).unwrap();
        let mesh = Decoder::new().decode_from_buffer(buf.data()).unwrap();
        let uv = mesh.attribute_by_kind(AttributeKind::TexCoord).unwrap();
        assert_eq!(uv.components, 2);
        let max = uv.values.iter().copied().fold(f32::MIN, f32::max);
        assert!((max - 1.0).abs() < 1e-3, "max uv was {max}");
    }

    #[test]
    fn empty_scene_is_an_error() {
        let mut p = MeshPrinter::new(5).unwrap();
        assert!(matches!(
            p.print_to_buffer(&Scene::new()),
            Err(Error::EmptyScene)
        ));
    }

    #[test]
    fn rejects_bad_speed() {
        assert!(matches!(MeshPrinter::new(11), Err(Error::BadSpeed(11))));
    }

    #[test]
    fn curve_shape_aborts_printing() {
        use crate::scene::Polyline;
        let mut scene = Scene::new();
        scene.add(Shape::untextured(Geometry::new(GeometryKind::Polyline(
            Polyline {
                points: vec![
                    nalgebra::Point3::origin(),
                    nalgebra::Point3::new(1.0, 0.0, 0.0),
                ],
            },
        ))));
        let mut p = MeshPrinter::new(5).unwrap();
        assert!(matches!(
            p.print_to_buffer(&scene),
            Err(Error::SerializationFailed)
        ));
    }
}
