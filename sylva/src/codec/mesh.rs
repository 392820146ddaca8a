//! Corner-table mesh representation and its builder
//!
//! A [`CodecMesh`] stores one value table per attribute plus a per-point
//! index into it, and a corner-to-point table mapping every face corner to a
//! point.  Freshly built meshes have one point per corner; deduplication
//! collapses equal values and equal points, which is where most of the size
//! reduction before entropy coding comes from.
use crate::Error;
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// Semantic role of a mesh attribute
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Vertex position
    Position,
    /// Vertex normal
    Normal,
    /// Vertex color
    Color,
    /// Texture coordinate
    TexCoord,
    /// Application-defined payload
    Generic,
}

impl AttributeKind {
    pub(crate) fn tag(self) -> u8 {
        match self {
            AttributeKind::Position => 0,
            AttributeKind::Normal => 1,
            AttributeKind::Color => 2,
            AttributeKind::TexCoord => 3,
            AttributeKind::Generic => 4,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self, Error> {
        Ok(match tag {
            0 => AttributeKind::Position,
            1 => AttributeKind::Normal,
            2 => AttributeKind::Color,
            3 => AttributeKind::TexCoord,
            4 => AttributeKind::Generic,
            _ => return Err(Error::BadAttribute),
        })
    }
}

/// Storage type of an attribute's components
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataType {
    /// 32-bit float
    F32,
    /// Unsigned byte
    U8,
}

impl DataType {
    pub(crate) fn tag(self) -> u8 {
        match self {
            DataType::F32 => 0,
            DataType::U8 => 1,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self, Error> {
        Ok(match tag {
            0 => DataType::F32,
            1 => DataType::U8,
            _ => return Err(Error::BadAttribute),
        })
    }
}

/// Handle to an attribute registered on a [`MeshBuilder`]
#[derive(Copy, Clone, Debug)]
pub struct AttributeId(pub(crate) usize);

/// One attribute of a [`CodecMesh`]
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Semantic role
    pub kind: AttributeKind,
    /// Components per value
    pub components: usize,
    /// Storage type
    pub data_type: DataType,
    /// Value table, `components` floats per row
    ///
    /// Byte-typed attributes store their components as exact small floats.
    pub values: Vec<f32>,
    /// Per-point row index into the value table
    pub indices: Vec<u32>,
}

impl Attribute {
    /// Number of distinct rows in the value table
    pub fn unique_values(&self) -> usize {
        self.values.len() / self.components
    }

    /// Value row for a point
    pub fn value_for_point(&self, point: u32) -> &[f32] {
        let row = self.indices[point as usize] as usize;
        &self.values[row * self.components..(row + 1) * self.components]
    }
}

/// Metadata entry value
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// UTF-8 string
    String(String),
    /// Array of doubles
    DoubleArray(Vec<f64>),
}

/// Triangle mesh in codec form
#[derive(Debug, Clone, Default)]
pub struct CodecMesh {
    pub(crate) num_faces: usize,
    pub(crate) num_points: usize,
    pub(crate) corner_to_point: Vec<u32>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) metadata: Vec<(String, MetadataValue)>,
}

impl CodecMesh {
    /// Number of faces
    pub fn num_faces(&self) -> usize {
        self.num_faces
    }

    /// Number of points after deduplication
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// All attributes, in registration order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// First attribute with the given role
    pub fn attribute_by_kind(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.kind == kind)
    }

    /// Point id of a face corner; corners are numbered `face * 3 + i`
    pub fn point_for_corner(&self, corner: usize) -> u32 {
        self.corner_to_point[corner]
    }

    /// Attaches a metadata entry
    pub fn add_metadata(&mut self, name: &str, value: MetadataValue) {
        self.metadata.push((name.to_string(), value));
    }

    /// Looks up a metadata entry by name
    pub fn metadata(&self, name: &str) -> Option<&MetadataValue> {
        self.metadata
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// All metadata entries, in attachment order
    pub fn metadata_entries(&self) -> &[(String, MetadataValue)] {
        &self.metadata
    }

    /// Collapses equal rows in every attribute's value table
    ///
    /// Rows are compared bitwise through [`OrderedFloat`], so `-0.0` and
    /// `0.0` stay distinct and `NaN` rows compare equal to themselves.
    pub fn deduplicate_attribute_values(&mut self) {
        for att in &mut self.attributes {
            let mut seen: HashMap<Vec<OrderedFloat<f32>>, u32> = HashMap::new();
            let mut values = Vec::new();
            let mut remap = Vec::with_capacity(att.unique_values());
            for row in att.values.chunks_exact(att.components) {
                let key: Vec<OrderedFloat<f32>> =
                    row.iter().copied().map(OrderedFloat).collect();
                let next = (values.len() / att.components) as u32;
                let idx = *seen.entry(key).or_insert_with(|| {
                    values.extend_from_slice(row);
                    next
                });
                remap.push(idx);
            }
            att.values = values;
            for i in &mut att.indices {
                *i = remap[*i as usize];
            }
        }
    }

    /// Collapses points whose attribute index tuples are identical
    ///
    /// Meaningful after [`deduplicate_attribute_values`]: two corners of
    /// adjacent triangles that carry the same position, color, and texture
    /// coordinate become one shared point.
    ///
    /// [`deduplicate_attribute_values`]: CodecMesh::deduplicate_attribute_values
    pub fn deduplicate_point_ids(&mut self) {
        let mut seen: HashMap<Vec<u32>, u32> = HashMap::new();
        let mut remap = Vec::with_capacity(self.num_points);
        let mut kept: Vec<u32> = Vec::new();
        for p in 0..self.num_points {
            let key: Vec<u32> = self
                .attributes
                .iter()
                .map(|a| a.indices[p])
                .collect();
            let next = kept.len() as u32;
            let idx = *seen.entry(key).or_insert_with(|| {
                kept.push(p as u32);
                next
            });
            remap.push(idx);
        }
        for att in &mut self.attributes {
            att.indices = kept.iter().map(|&p| att.indices[p as usize]).collect();
        }
        for c in &mut self.corner_to_point {
            *c = remap[*c as usize];
        }
        self.num_points = kept.len();
    }
}

/// Accumulates per-corner attribute values into a [`CodecMesh`]
pub struct MeshBuilder {
    num_faces: usize,
    attributes: Vec<BuilderAttribute>,
}

struct BuilderAttribute {
    kind: AttributeKind,
    components: usize,
    data_type: DataType,
    // per-corner rows, num_faces * 3 * components
    values: Vec<f32>,
}

impl MeshBuilder {
    /// Starts a mesh with a fixed face count
    pub fn start(num_faces: usize) -> Self {
        MeshBuilder {
            num_faces,
            attributes: Vec::new(),
        }
    }

    /// Registers an attribute; values default to zero until set
    pub fn add_attribute(
        &mut self,
        kind: AttributeKind,
        components: usize,
        data_type: DataType,
    ) -> AttributeId {
        self.attributes.push(BuilderAttribute {
            kind,
            components,
            data_type,
            values: vec![0.0; self.num_faces * 3 * components],
        });
        AttributeId(self.attributes.len() - 1)
    }

    /// Sets the three corner values of one face
    ///
    /// `values` holds `3 * components` floats, corner-major.
    pub fn set_attribute_values_for_face(
        &mut self,
        att: AttributeId,
        face: usize,
        values: &[f32],
    ) -> Result<(), Error> {
        let a = &mut self.attributes[att.0];
        if face >= self.num_faces || values.len() != 3 * a.components {
            return Err(Error::BadAttribute);
        }
        let start = face * 3 * a.components;
        a.values[start..start + values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Sets one value on all three corners of a face
    pub fn set_per_face_attribute_value(
        &mut self,
        att: AttributeId,
        face: usize,
        value: &[f32],
    ) -> Result<(), Error> {
        let a = &mut self.attributes[att.0];
        if face >= self.num_faces || value.len() != a.components {
            return Err(Error::BadAttribute);
        }
        for corner in 0..3 {
            let start = (face * 3 + corner) * a.components;
            a.values[start..start + a.components].copy_from_slice(value);
        }
        Ok(())
    }

    /// Finishes the mesh; with `dedup` set, collapses equal values and
    /// points
    pub fn finalize(self, dedup: bool) -> CodecMesh {
        let corners = self.num_faces * 3;
        let attributes = self
            .attributes
            .into_iter()
            .map(|a| Attribute {
                kind: a.kind,
                components: a.components,
                data_type: a.data_type,
                values: a.values,
                indices: (0..corners as u32).collect(),
            })
            .collect();
        let mut mesh = CodecMesh {
            num_faces: self.num_faces,
            num_points: corners,
            corner_to_point: (0..corners as u32).collect(),
            attributes,
            metadata: Vec::new(),
        };
        if dedup {
            mesh.deduplicate_attribute_values();
            mesh.deduplicate_point_ids();
        }
        mesh
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Two triangles sharing an edge, constant color
    fn quad_mesh(dedup: bool) -> CodecMesh {
        let mut b = MeshBuilder::start(2);
        let pos = b.add_attribute(AttributeKind::Position, 3, DataType::F32);
        let col = b.add_attribute(AttributeKind::Color, 3, DataType::U8);
        let p = [
            [0.0, 0.0, 0.0f32],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let faces = [[0, 1, 2], [0, 2, 3]];
        for (f, [a, bb, c]) in faces.iter().enumerate() {
            let mut v = Vec::new();
            v.extend_from_slice(&p[*a]);
            v.extend_from_slice(&p[*bb]);
            v.extend_from_slice(&p[*c]);
            b.set_attribute_values_for_face(pos, f, &v).unwrap();
            b.set_per_face_attribute_value(col, f, &[128.0, 0.0, 0.0])
                .unwrap();
        }
        b.finalize(dedup)
    }

    #[test]
    fn finalize_without_dedup_keeps_one_point_per_corner() {
        let m = quad_mesh(false);
        assert_eq!(m.num_faces(), 2);
        assert_eq!(m.num_points(), 6);
    }

    #[test]
    fn dedup_collapses_shared_corners() {
        let m = quad_mesh(true);
        // four distinct positions, one color
        assert_eq!(m.num_points(), 4);
        let pos = m.attribute_by_kind(AttributeKind::Position).unwrap();
        assert_eq!(pos.unique_values(), 4);
        let col = m.attribute_by_kind(AttributeKind::Color).unwrap();
        assert_eq!(col.unique_values(), 1);
        // shared edge corners now reference the same point
        assert_eq!(m.point_for_corner(0), m.point_for_corner(3));
        assert_eq!(m.point_for_corner(2), m.point_for_corner(4));
    }

    #[test]
    fn metadata_round_trip() {
        let mut m = quad_mesh(true);
        m.add_metadata("instances", MetadataValue::DoubleArray(vec![1.0, 2.0]));
        assert_eq!(
            m.metadata("instances"),
            Some(&MetadataValue::DoubleArray(vec![1.0, 2.0]))
        );
        assert!(m.metadata("missing").is_none());
    }
}
