//! Sylva is a library of infrastructure and algorithms for immutable
//! geometric scene graphs.
//!
//! A **scene** is an ordered list of shapes, each pairing one geometry node
//! with an appearance.  Geometry nodes form an immutable DAG: handles are
//! reference-counted, cheap to clone, and carry a stable identity
//! ([`scene::NodeId`]), so the same sub-graph can sit under many parents and
//! algorithms can tell sharing apart from copying.
//!
//! # Scene construction
//! Scenes are built from plain constructors; nothing is lazy or deferred:
//! ```
//! use sylva::scene::{Geometry, Scene, Shape};
//! use nalgebra::Vector3;
//!
//! let trunk = Geometry::cylinder(0.2, 2.0);
//! let crown = Geometry::translated(Vector3::new(0.0, 0.0, 2.0), Geometry::sphere(1.0));
//! let tree = Geometry::group(vec![trunk, crown]);
//! let mut scene = Scene::new();
//! scene.add(Shape::untextured(tree));
//! ```
//!
//! # Traversal
//! Every algorithm is a [`visitor::Visitor`]: one method per node variant,
//! dispatched by the node itself, returning a success flag that callers
//! treat as a value.  The building block is the [`algo::Discretizer`],
//! which turns parametric nodes into explicit meshes; [`algo::Tessellator`]
//! refines that to pure triangles, and the measurement visitors
//! ([`algo::BSphereComputer`], [`algo::SurfComputer`],
//! [`algo::PolygonComputer`]) combine closed-form formulas with
//! discretize-and-measure fallbacks.  Expensive per-node results are
//! memoized in an identity-keyed [`cache::Cache`].
//!
//! # Serialization
//! [`algo::serialize_scene`] tessellates a scene and encodes it with the
//! [`codec`]: geometry shared between shapes is encoded once and replicated
//! through per-instance transform metadata, unique geometry merges into a
//! single mesh with transforms baked in.  Output is byte-deterministic for
//! a given scene.
//! ```
//! use sylva::algo::{SerializeOptions, serialize_scene};
//! use sylva::scene::{Geometry, Scene, Shape};
//!
//! let mut scene = Scene::new();
//! scene.add(Shape::untextured(Geometry::sphere(1.0)));
//! let out = serialize_scene(&scene, &SerializeOptions::default())?;
//! assert!(!out.is_empty());
//! # Ok::<(), sylva::Error>(())
//! ```
#![warn(missing_docs)]

pub mod algo;
pub mod cache;
pub mod codec;
pub mod matrix;
pub mod scene;
pub mod visitor;

mod error;
pub use error::Error;
