//! Scene-graph algorithms, each packaged as a [`Visitor`](crate::visitor::Visitor)
//!
//! The [`Discretizer`] is the workhorse: it turns parametric and compound
//! nodes into explicit models, and nearly everything else (tessellation,
//! measurement, serialization) is built as a layer over it.
mod bsphere;
mod discretizer;
mod polygon;
mod serializer;
mod surface;
mod tessellator;

pub use bsphere::{BSphereComputer, BoundingSphere};
pub use discretizer::Discretizer;
pub use polygon::PolygonComputer;
pub use serializer::{
    INSTANCES_METADATA, SerializeOptions, SerializedScene, Serializer, TriangleSoup,
    serialize_scene,
};
pub use surface::SurfComputer;
pub use tessellator::Tessellator;
