//! Appearance variants: materials, textures, spectral descriptions
//!
//! An appearance carries the "current color" consumed by mesh-emitting
//! visitors: a material contributes its ambient color, a texture its base
//! color, and spectral appearances fall back to the default grey.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 8-bit RGB color
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color3 {
    /// Red component
    pub r: u8,
    /// Green component
    pub g: u8,
    /// Blue component
    pub b: u8,
}

impl Color3 {
    /// Builds a color from components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color3 { r, g, b }
    }
}

/// Ambient color of the default material, applied when a shape carries no
/// appearance
pub const DEFAULT_AMBIENT: Color3 = Color3::new(160, 160, 160);

/// Phong-style material
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    /// Ambient color; this is the color mesh serialization records
    pub ambient: Color3,
    /// Diffuse multiplier over ambient
    pub diffuse: f32,
    /// Specular color
    pub specular: Color3,
    /// Emissive color
    pub emission: Color3,
    /// Specular exponent, 0..=1
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            ambient: DEFAULT_AMBIENT,
            diffuse: 1.0,
            specular: Color3::new(40, 40, 40),
            emission: Color3::new(0, 0, 0),
            shininess: 1.0,
        }
    }
}

impl Material {
    /// Builds a material with the given ambient color and default remainder
    pub fn with_ambient(ambient: Color3) -> Self {
        Material {
            ambient,
            ..Material::default()
        }
    }
}

/// Affine transformation of texture coordinates
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Texture2Transform {
    /// Per-axis scaling
    pub scale: [f32; 2],
    /// Translation
    pub translation: [f32; 2],
    /// Rotation about the texture center, radians
    pub rotation: f32,
}

/// Image texture with a base color
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Texture2 {
    /// Color multiplied under the image; recorded by mesh serialization
    pub base_color: Color3,
    /// Path of the image file; loading is the renderer's concern
    pub image: PathBuf,
    /// Optional coordinate transformation
    pub transform: Option<Texture2Transform>,
}

/// Single-band spectral reflectance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonoSpectral {
    /// Reflectance, 0..=1
    pub reflectance: f32,
    /// Transmittance, 0..=1
    pub transmittance: f32,
}

/// Per-band spectral reflectance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiSpectral {
    /// Reflectance per band, 0..=1
    pub reflectance: Vec<f32>,
    /// Transmittance per band, 0..=1
    pub transmittance: Vec<f32>,
}

/// Closed set of appearance variants
#[derive(Clone, Debug, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Appearance {
    Material(Material),
    Texture2(Texture2),
    MonoSpectral(MonoSpectral),
    MultiSpectral(MultiSpectral),
}

impl Appearance {
    /// Whether this appearance samples an image texture
    pub fn is_texture(&self) -> bool {
        matches!(self, Appearance::Texture2(_))
    }

    /// The color mesh-emitting visitors record for this appearance
    pub fn current_color(&self) -> Color3 {
        match self {
            Appearance::Material(m) => m.ambient,
            Appearance::Texture2(t) => t.base_color,
            Appearance::MonoSpectral(_) | Appearance::MultiSpectral(_) => DEFAULT_AMBIENT,
        }
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Appearance::Material(Material::default())
    }
}
