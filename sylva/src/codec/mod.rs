//! Mesh compression codec and interchange output
//!
//! The codec path is: accumulate per-corner attribute values with a
//! [`MeshBuilder`], deduplicate into a [`CodecMesh`], then entropy-code with
//! an [`Encoder`].  The encoded format is self-describing and carries
//! arbitrary metadata, which the serializer uses to attach instancing
//! transforms; [`Decoder`] reads it back.
//!
//! [`MeshPrinter`] is the one-shot convenience on top: a whole scene in, one
//! encoded buffer out.  Binary STL export for tessellated geometry lives
//! here as well.
mod decode;
mod encode;
mod mesh;
mod output;
mod printer;

pub use decode::Decoder;
pub use encode::{Encoder, EncoderBuffer, MAX_QUANTIZATION_BITS};
pub use mesh::{Attribute, AttributeId, AttributeKind, CodecMesh, DataType, MeshBuilder, MetadataValue};
pub use printer::{
    GENERIC_QUANTIZATION, MeshPrinter, NORMAL_QUANTIZATION, POSITION_QUANTIZATION,
    TEXCOORD_QUANTIZATION,
};
