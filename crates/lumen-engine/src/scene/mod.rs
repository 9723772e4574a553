//! Scene description consumed by the deferred renderer.
//!
//! Responsibilities:
//! - own mesh geometry (`Mesh`) and the instances that reference it
//! - hold per-instance transforms and surface parameters
//! - provide the camera that both render passes are driven from
//!
//! Scene types carry no GPU state; renderer backends upload what they need.

mod camera;
mod material;
mod mesh;
mod world;

pub use camera::Camera;
pub use material::SurfaceMaterial;
pub use mesh::{Mesh, MeshVertex};
pub use world::{MeshId, ObjectId, Scene, SceneObject};
