//! Scene graph and hierarchical scene organization.
//!
//! The castle's scene graph is a plain tree of [`SceneNode`]s. Group nodes only
//! carry transforms. Mesh nodes additionally name a [`GeometryId`], carry a
//! [`SurfaceCategory`] tag and hold the [`MaterialKey`] of their active
//! appearance.
//!
//! Every node stores `(local, world)` instance pairs. A node's world transforms
//! are the product of each parent world transform with each local one, so an
//! instanced child under a single-instance group keeps its instance count.

use log::warn;

use crate::data_structures::{
    instance::Instance,
    material::{MaterialKey, MaterialMode, SurfaceCategory},
};

/// Which shared geometry a mesh node draws. Geometry is built once per id and
/// shared by every node naming it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryId {
    Base,
    Tower,
    TowerTop,
    Crenellation,
    Wall,
    Bush,
}

impl GeometryId {
    pub const ALL: [GeometryId; 6] = [
        GeometryId::Base,
        GeometryId::Tower,
        GeometryId::TowerTop,
        GeometryId::Crenellation,
        GeometryId::Wall,
        GeometryId::Bush,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: GeometryId,
        category: SurfaceCategory,
        material: MaterialKey,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    instances: Vec<(Instance, Instance)>,
    children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: NodeKind::Group,
            instances: vec![(Instance::default(), Instance::default())],
            children: Vec::new(),
        }
    }

    /// A mesh node with one copy per entry of `instances`.
    pub fn mesh(
        name: &str,
        geometry: GeometryId,
        category: SurfaceCategory,
        mode: MaterialMode,
        instances: Vec<Instance>,
    ) -> Self {
        if instances.is_empty() {
            warn!("Scene node {} was created without instances", name);
        }
        Self {
            name: name.to_string(),
            kind: NodeKind::Mesh {
                geometry,
                category,
                material: MaterialKey::new(category, mode),
            },
            instances: instances.into_iter().map(|i| (i, i)).collect(),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    pub fn category(&self) -> Option<SurfaceCategory> {
        match self.kind {
            NodeKind::Mesh { category, .. } => Some(category),
            NodeKind::Group => None,
        }
    }

    pub fn material(&self) -> Option<MaterialKey> {
        match self.kind {
            NodeKind::Mesh { material, .. } => Some(material),
            NodeKind::Group => None,
        }
    }

    pub fn world_transforms(&self) -> impl Iterator<Item = &Instance> {
        self.instances.iter().map(|(_, world)| world)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        match self.instances.get_mut(idx) {
            Some((local, _)) => *local = instance,
            None => warn!(
                "Tried to set instance {} of {}, which only has {}",
                idx,
                self.name,
                self.instances.len()
            ),
        }
    }

    /**
     * Recomputes world transforms below this node. A single parent transform
     * applies to every instance, otherwise parent and local instances pair up
     * one to one.
     */
    pub fn update_world_transforms(&mut self, parents: &[Instance]) {
        if parents.len() != 1 && parents.len() != self.instances.len() {
            warn!(
                "You tried to transform {} with {} parent transforms, but it has {} instances.",
                self.name,
                parents.len(),
                self.instances.len()
            );
            return;
        }
        for (i, (local, world)) in self.instances.iter_mut().enumerate() {
            let parent = if parents.len() == 1 { &parents[0] } else { &parents[i] };
            *world = parent * &*local;
        }
        let worlds: Vec<Instance> = self.world_transforms().copied().collect();
        for child in self.children.iter_mut() {
            child.update_world_transforms(&worlds);
        }
    }

    /// Depth-first, parents before children.
    pub fn traverse<'a>(&'a self, f: &mut dyn FnMut(&'a SceneNode)) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    pub fn traverse_mut(&mut self, f: &mut dyn FnMut(&mut SceneNode)) {
        f(self);
        for child in self.children.iter_mut() {
            child.traverse_mut(f);
        }
    }

    /// Points every mesh node at the appearance of its own category for `mode`.
    ///
    /// Geometry, transforms and instance counts stay untouched. Applying the
    /// same mode twice changes nothing.
    pub fn apply_material_mode(&mut self, mode: MaterialMode) {
        self.traverse_mut(&mut |node| {
            if let NodeKind::Mesh {
                category, material, ..
            } = &mut node.kind
            {
                *material = MaterialKey::new(*category, mode);
            }
        });
    }

    /// Total number of mesh nodes carrying `category`.
    pub fn count_category(&self, category: SurfaceCategory) -> usize {
        let mut count = 0;
        self.traverse(&mut |node| {
            if node.category() == Some(category) {
                count += 1;
            }
        });
        count
    }
}
