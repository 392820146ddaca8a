//! Mesh encoder: quantization plus DEFLATE entropy coding
//!
//! The buffer layout is little-endian throughout: a four-byte magic, a
//! format version, the speed byte, then one DEFLATE stream holding counts,
//! metadata, attribute tables, and the corner table.  Quantized attributes
//! store per-component minima and ranges followed by fixed-width quantized
//! values; the entropy coder recovers the redundancy that fixed-width
//! storage leaves in.
use super::mesh::{CodecMesh, DataType, MetadataValue};
use crate::Error;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

pub(crate) const MAGIC: [u8; 4] = *b"SYLV";
pub(crate) const VERSION: u8 = 1;

/// Upper bound on quantization depth; quantized values travel as `u32`
pub const MAX_QUANTIZATION_BITS: u8 = 30;

static_assertions::const_assert!(MAX_QUANTIZATION_BITS < 32);

/// Owned encoded buffer
#[derive(Debug, Clone)]
pub struct EncoderBuffer {
    data: Vec<u8>,
}

impl EncoderBuffer {
    /// Encoded bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encoded size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks whether the buffer holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consumes the buffer, returning its bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

/// Configurable mesh encoder
///
/// Quantization is per attribute role and off by default (lossless `f32`).
/// The speed option trades compression ratio for time, 0 (slowest, densest)
/// to 10 (fastest).
pub struct Encoder {
    // bits per AttributeKind tag; 0 means unquantized
    quantization: [u8; 5],
    speed: u8,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder {
            quantization: [0; 5],
            speed: 5,
        }
    }
}

impl Encoder {
    /// Builds an encoder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantizes every attribute of the given role to `bits` bits per
    /// component
    ///
    /// Only `f32` attributes quantize; byte attributes always travel raw.
    pub fn set_attribute_quantization(&mut self, kind: super::AttributeKind, bits: u8) {
        self.quantization[kind.tag() as usize] = bits.min(MAX_QUANTIZATION_BITS);
    }

    /// Sets the speed/ratio trade-off; both values must lie in `0..=10`
    pub fn set_speed_options(&mut self, encode: i32, decode: i32) -> Result<(), Error> {
        if !(0..=10).contains(&encode) {
            return Err(Error::BadSpeed(encode));
        }
        if !(0..=10).contains(&decode) {
            return Err(Error::BadSpeed(decode));
        }
        self.speed = encode as u8;
        Ok(())
    }

    /// Encodes a mesh into a fresh buffer
    pub fn encode_to_buffer(&self, mesh: &CodecMesh) -> Result<EncoderBuffer, Error> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(mesh.num_faces as u32).to_le_bytes());
        payload.extend_from_slice(&(mesh.num_points as u32).to_le_bytes());

        payload.push(mesh.metadata.len() as u8);
        for (name, value) in &mesh.metadata {
            payload.push(name.len() as u8);
            payload.extend_from_slice(name.as_bytes());
            match value {
                MetadataValue::String(s) => {
                    payload.push(0);
                    payload.extend_from_slice(&(s.len() as u16).to_le_bytes());
                    payload.extend_from_slice(s.as_bytes());
                }
                MetadataValue::DoubleArray(ds) => {
                    payload.push(1);
                    payload.extend_from_slice(&(ds.len() as u32).to_le_bytes());
                    for d in ds {
                        payload.extend_from_slice(&d.to_le_bytes());
                    }
                }
            }
        }

        payload.push(mesh.attributes.len() as u8);
        for att in &mesh.attributes {
            let bits = match att.data_type {
                DataType::F32 => self.quantization[att.kind.tag() as usize],
                DataType::U8 => 0,
            };
            payload.push(att.kind.tag());
            payload.push(att.components as u8);
            payload.push(att.data_type.tag());
            payload.push(bits);
            payload.extend_from_slice(&(att.unique_values() as u32).to_le_bytes());
            if bits > 0 {
                write_quantized(&mut payload, &att.values, att.components, bits);
            } else {
                match att.data_type {
                    DataType::F32 => {
                        for v in &att.values {
                            payload.extend_from_slice(&v.to_le_bytes());
                        }
                    }
                    DataType::U8 => {
                        for v in &att.values {
                            payload.push(*v as u8);
                        }
                    }
                }
            }
            for i in &att.indices {
                payload.extend_from_slice(&i.to_le_bytes());
            }
        }

        for c in &mesh.corner_to_point {
            payload.extend_from_slice(&c.to_le_bytes());
        }

        let mut out = Vec::with_capacity(payload.len() / 2 + 6);
        out.extend_from_slice(&MAGIC);
        out.push(VERSION);
        out.push(self.speed);
        let level = Compression::new((10 - self.speed as u32).min(9));
        let mut deflate = DeflateEncoder::new(out, level);
        deflate.write_all(&payload)?;
        let data = deflate.finish()?;
        Ok(EncoderBuffer { data })
    }
}

/// Per-component uniform quantization: minima and ranges first, then every
/// value as a fixed-width `u32`
fn write_quantized(out: &mut Vec<u8>, values: &[f32], components: usize, bits: u8) {
    let steps = (1u64 << bits) as f32 - 1.0;
    let rows = values.len() / components;
    let mut mins = vec![f32::INFINITY; components];
    let mut maxs = vec![f32::NEG_INFINITY; components];
    for row in values.chunks_exact(components) {
        for (c, v) in row.iter().enumerate() {
            mins[c] = mins[c].min(*v);
            maxs[c] = maxs[c].max(*v);
        }
    }
    let ranges: Vec<f32> = (0..components)
        .map(|c| {
            let r = maxs[c] - mins[c];
            if r > 0.0 { r } else { 1.0 }
        })
        .collect();
    for c in 0..components {
        let min = if rows == 0 { 0.0 } else { mins[c] };
        out.extend_from_slice(&min.to_le_bytes());
        out.extend_from_slice(&ranges[c].to_le_bytes());
    }
    for row in values.chunks_exact(components) {
        for (c, v) in row.iter().enumerate() {
            let q = (((v - mins[c]) / ranges[c]) * steps).round() as u32;
            out.extend_from_slice(&q.to_le_bytes());
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{AttributeKind, MeshBuilder};

    fn triangle() -> CodecMesh {
        let mut b = MeshBuilder::start(1);
        let pos = b.add_attribute(AttributeKind::Position, 3, DataType::F32);
        b.set_attribute_values_for_face(
            pos,
            0,
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        )
        .unwrap();
        b.finalize(true)
    }

    #[test]
    fn rejects_out_of_range_speed() {
        let mut e = Encoder::new();
        assert!(matches!(e.set_speed_options(11, 0), Err(Error::BadSpeed(11))));
        assert!(matches!(e.set_speed_options(0, -1), Err(Error::BadSpeed(-1))));
        assert!(e.set_speed_options(0, 10).is_ok());
    }

    #[test]
    fn encoding_is_deterministic() {
        let mesh = triangle();
        let mut e = Encoder::new();
        e.set_attribute_quantization(AttributeKind::Position, 11);
        let a = e.encode_to_buffer(&mesh).unwrap();
        let b = e.encode_to_buffer(&mesh).unwrap();
        assert_eq!(a.data(), b.data());
        assert!(!a.is_empty());
    }

    #[test]
    fn buffer_starts_with_magic() {
        let buf = Encoder::new().encode_to_buffer(&triangle()).unwrap();
        assert_eq!(&buf.data()[..4], &MAGIC);
        assert_eq!(buf.data()[4], VERSION);
    }
}
