//! Mesh decoder, the inverse of [`Encoder`](super::Encoder)
//!
//! Quantized attributes come back as the centers of their quantization
//! cells, so positions round-trip within `range / (2^bits - 1)` per
//! component.
use super::mesh::{Attribute, AttributeKind, CodecMesh, DataType, MetadataValue};
use crate::Error;
use flate2::read::DeflateDecoder;
use std::io::Read;

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.pos + n > self.buf.len() {
            return Err(Error::TruncatedBuffer);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32, Error> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64, Error> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }
}

/// Decodes buffers produced by [`Encoder`](super::Encoder)
#[derive(Default)]
pub struct Decoder;

impl Decoder {
    /// Builds a decoder
    pub fn new() -> Self {
        Decoder
    }

    /// Decodes one mesh from an encoded buffer
    pub fn decode_from_buffer(&self, buf: &[u8]) -> Result<CodecMesh, Error> {
        if buf.len() < 6 {
            return Err(Error::TruncatedBuffer);
        }
        if buf[..4] != super::encode::MAGIC {
            return Err(Error::BadMagic);
        }
        if buf[4] != super::encode::VERSION {
            return Err(Error::BadVersion(buf[4]));
        }
        // buf[5] is the encoder's speed byte, informational only
        let mut payload = Vec::new();
        DeflateDecoder::new(&buf[6..]).read_to_end(&mut payload)?;
        let mut r = Reader::new(&payload);

        let num_faces = r.u32()? as usize;
        let num_points = r.u32()? as usize;

        let mut metadata = Vec::new();
        for _ in 0..r.u8()? {
            let name_len = r.u8()? as usize;
            let name = String::from_utf8(r.take(name_len)?.to_vec())
                .map_err(|_| Error::BadAttribute)?;
            let value = match r.u8()? {
                0 => {
                    let len = r.u16()? as usize;
                    let s = String::from_utf8(r.take(len)?.to_vec())
                        .map_err(|_| Error::BadAttribute)?;
                    MetadataValue::String(s)
                }
                1 => {
                    let count = r.u32()? as usize;
                    // counts come from the wire; never preallocate more
                    // than the payload can actually hold
                    let mut ds = Vec::with_capacity(count.min(r.remaining() / 8));
                    for _ in 0..count {
                        ds.push(r.f64()?);
                    }
                    MetadataValue::DoubleArray(ds)
                }
                _ => return Err(Error::BadAttribute),
            };
            metadata.push((name, value));
        }

        let mut attributes = Vec::new();
        for _ in 0..r.u8()? {
            let kind = AttributeKind::from_tag(r.u8()?)?;
            let components = r.u8()? as usize;
            let data_type = DataType::from_tag(r.u8()?)?;
            let bits = r.u8()?;
            let unique = r.u32()? as usize;
            if components == 0 {
                return Err(Error::BadAttribute);
            }
            let values = if bits > 0 {
                read_quantized(&mut r, unique, components, bits)?
            } else {
                let mut values =
                    Vec::with_capacity((unique * components).min(r.remaining() / 4));
                match data_type {
                    DataType::F32 => {
                        for _ in 0..unique * components {
                            values.push(r.f32()?);
                        }
                    }
                    DataType::U8 => {
                        for b in r.take(unique * components)? {
                            values.push(*b as f32);
                        }
                    }
                }
                values
            };
            let mut indices = Vec::with_capacity(num_points.min(r.remaining() / 4));
            for _ in 0..num_points {
                let i = r.u32()?;
                if i as usize >= unique {
                    return Err(Error::BadAttribute);
                }
                indices.push(i);
            }
            attributes.push(Attribute {
                kind,
                components,
                data_type,
                values,
                indices,
            });
        }

        let mut corner_to_point = Vec::with_capacity((num_faces * 3).min(r.remaining() / 4));
        for _ in 0..num_faces * 3 {
            let p = r.u32()?;
            if p as usize >= num_points {
                return Err(Error::BadAttribute);
            }
            corner_to_point.push(p);
        }

        Ok(CodecMesh {
            num_faces,
            num_points,
            corner_to_point,
            attributes,
            metadata,
        })
    }
}

fn read_quantized(
    r: &mut Reader,
    unique: usize,
    components: usize,
    bits: u8,
) -> Result<Vec<f32>, Error> {
    let steps = (1u64 << bits) as f32 - 1.0;
    let mut mins = Vec::with_capacity(components);
    let mut ranges = Vec::with_capacity(components);
    for _ in 0..components {
        mins.push(r.f32()?);
        ranges.push(r.f32()?);
    }
    let mut values = Vec::with_capacity((unique * components).min(r.remaining() / 4));
    for _ in 0..unique {
        for c in 0..components {
            let q = r.u32()? as f32;
            values.push(mins[c] + (q / steps) * ranges[c]);
        }
    }
    Ok(values)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{Encoder, MeshBuilder};

    fn quad() -> CodecMesh {
        let mut b = MeshBuilder::start(2);
        let pos = b.add_attribute(AttributeKind::Position, 3, DataType::F32);
        let col = b.add_attribute(AttributeKind::Color, 3, DataType::U8);
        b.set_attribute_values_for_face(
            pos,
            0,
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
        )
        .unwrap();
        b.set_attribute_values_for_face(
            pos,
            1,
            &[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
        )
        .unwrap();
        b.set_per_face_attribute_value(col, 0, &[200.0, 10.0, 0.0])
            .unwrap();
        b.set_per_face_attribute_value(col, 1, &[200.0, 10.0, 0.0])
            .unwrap();
        let mut m = b.finalize(true);
        m.add_metadata("instances", MetadataValue::DoubleArray(vec![0.5, 1.5]));
        m
    }

    #[test]
    fn round_trip_within_quantization_error() {
        let mesh = quad();
        let mut e = Encoder::new();
        e.set_attribute_quantization(AttributeKind::Position, 11);
        e.set_speed_options(3, 3).unwrap();
        let buf = e.encode_to_buffer(&mesh).unwrap();
        let out = Decoder::new().decode_from_buffer(buf.data()).unwrap();
        assert_eq!(out.num_faces(), 2);
        assert_eq!(out.num_points(), mesh.num_points());
        let orig = mesh.attribute_by_kind(AttributeKind::Position).unwrap();
        let got = out.attribute_by_kind(AttributeKind::Position).unwrap();
        let tol = 1.0 / ((1u32 << 11) as f32 - 1.0);
        for (a, b) in orig.values.iter().zip(&got.values) {
            assert!((a - b).abs() <= tol, "{a} vs {b}");
        }
        // byte attributes travel losslessly
        let col = out.attribute_by_kind(AttributeKind::Color).unwrap();
        assert_eq!(col.values, vec![200.0, 10.0, 0.0]);
        assert_eq!(
            out.metadata("instances"),
            Some(&MetadataValue::DoubleArray(vec![0.5, 1.5]))
        );
    }

    #[test]
    fn huge_wire_counts_do_not_allocate() {
        use crate::codec::encode::{MAGIC, VERSION};
        use flate2::{Compression, write::DeflateEncoder};
        use std::io::Write;
        // metadata double-array claiming u32::MAX entries with no payload
        // behind it must fail as truncated, not attempt the allocation
        let mut payload = Vec::new();
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        payload.push(1);
        payload.push(1);
        payload.push(b'm');
        payload.push(1);
        payload.extend_from_slice(&u32::MAX.to_le_bytes());
        let mut header = Vec::from(MAGIC);
        header.push(VERSION);
        header.push(5);
        let mut z = DeflateEncoder::new(header, Compression::fast());
        z.write_all(&payload).unwrap();
        let buf = z.finish().unwrap();
        assert!(matches!(
            Decoder::new().decode_from_buffer(&buf),
            Err(Error::TruncatedBuffer)
        ));
    }

    #[test]
    fn rejects_foreign_buffers() {
        let d = Decoder::new();
        assert!(matches!(d.decode_from_buffer(b"nope"), Err(Error::TruncatedBuffer)));
        assert!(matches!(
            d.decode_from_buffer(b"JUNKJUNKJUNK"),
            Err(Error::BadMagic)
        ));
        let mut buf = Encoder::new().encode_to_buffer(&quad()).unwrap().into_inner();
        buf[4] = 99;
        assert!(matches!(
            Decoder::new().decode_from_buffer(&buf),
            Err(Error::BadVersion(99))
        ));
    }
}
