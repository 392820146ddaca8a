//! Interchange output for tessellated geometry
use crate::Error;
use crate::scene::TriangleSet;
use std::io::{BufWriter, Write};

impl TriangleSet {
    /// Writes a binary STL to the given output
    pub fn write_stl<F: std::io::Write>(&self, out: &mut F) -> Result<(), Error> {
        // We're going to do many small writes and will typically be writing to
        // a file, so using a `BufWriter` saves excessive syscalls.
        let mut out = BufWriter::new(out);
        const HEADER: &[u8] = b"This is a binary STL file exported by sylva";
        static_assertions::const_assert!(HEADER.len() <= 80);
        out.write_all(HEADER)?;
        out.write_all(&[0u8; 80 - HEADER.len()])?;
        out.write_all(&(self.indices.len() as u32).to_le_bytes())?;
        for t in &self.indices {
            // Not the _best_ way to calculate a normal, but good enough
            let a = self.points[t[0] as usize];
            let b = self.points[t[1] as usize];
            let c = self.points[t[2] as usize];
            let normal = (b - a).cross(&(c - a));
            for p in &normal {
                out.write_all(&p.to_le_bytes())?;
            }
            for v in t {
                for p in &self.points[*v as usize].coords {
                    out.write_all(&p.to_le_bytes())?;
                }
            }
            out.write_all(&[0u8; std::mem::size_of::<u16>()])?; // attributes
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn stl_size_is_exact() {
        let t = TriangleSet {
            points: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            indices: vec![[0, 1, 2]],
            tex_coords: None,
        };
        let mut buf = Vec::new();
        t.write_stl(&mut buf).unwrap();
        // 80-byte header + count + one 50-byte triangle record
        assert_eq!(buf.len(), 80 + 4 + 50);
        assert_eq!(u32::from_le_bytes(buf[80..84].try_into().unwrap()), 1);
    }
}
