use glam::Mat4;

use super::{Mesh, SurfaceMaterial};

/// Handle to a mesh stored in a [`Scene`]. Stable for the scene's lifetime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub(crate) usize);

impl MeshId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle to an object instance in a [`Scene`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// One drawable instance: mesh + model transform + surface parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub mesh: MeshId,
    pub transform: Mat4,
    pub material: SurfaceMaterial,
    pub visible: bool,
}

/// Opaque scene geometry.
///
/// Meshes are immutable once added; instances can be moved and recolored
/// every frame.
#[derive(Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    /// Adds a visible instance of `mesh`.
    pub fn spawn(&mut self, mesh: MeshId, transform: Mat4, material: SurfaceMaterial) -> ObjectId {
        debug_assert!(mesh.0 < self.meshes.len(), "spawn with unknown mesh id");
        self.objects.push(SceneObject {
            mesh,
            transform,
            material,
            visible: true,
        });
        ObjectId(self.objects.len() - 1)
    }

    #[inline]
    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    #[inline]
    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    #[inline]
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    #[inline]
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0)
    }

    /// Visible objects in insertion order.
    pub fn visible_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| o.visible)
    }
}
