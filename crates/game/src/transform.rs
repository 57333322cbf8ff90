use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::authority::EntityId;
use crate::error::{AuthorityError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// `self` applied after `child`, i.e. `child` expressed in `self`'s space.
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation * child.translation,
            rotation: (self.rotation * child.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        Transform {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    pub fn abs_diff_eq(&self, other: &Transform, max_abs_diff: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }
}

#[derive(Debug, Clone)]
struct Node {
    local: Transform,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
}

/// Parent/child transform tree. Roots store world space, children store
/// space relative to their parent.
#[derive(Debug, Default)]
pub struct TransformHierarchy {
    nodes: HashMap<EntityId, Node>,
}

impl TransformHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: EntityId, world: Transform) {
        self.nodes.insert(
            id,
            Node {
                local: world,
                parent: None,
                children: Vec::new(),
            },
        );
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Removes a node; its children become roots at their current world pose.
    pub fn remove(&mut self, id: EntityId) -> Option<Transform> {
        let world = self.world(id).ok()?;
        let children = self.nodes.get(&id)?.children.clone();
        for child in children.into_iter().chain(std::iter::once(id)) {
            if let Err(e) = self.set_parent(child, None, true) {
                log::warn!("detaching {} while removing {} failed: {}", child, id, e);
            }
        }
        self.nodes.remove(&id);
        Some(world)
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn local(&self, id: EntityId) -> Result<Transform> {
        self.node(id).map(|n| n.local)
    }

    pub fn world(&self, id: EntityId) -> Result<Transform> {
        let node = self.node(id)?;
        match node.parent {
            Some(parent) => Ok(self.world(parent)?.mul_transform(&node.local)),
            None => Ok(node.local),
        }
    }

    pub fn set_local(&mut self, id: EntityId, local: Transform) -> Result<()> {
        self.node_mut(id)?.local = local;
        Ok(())
    }

    pub fn set_world(&mut self, id: EntityId, world: Transform) -> Result<()> {
        let local = match self.node(id)?.parent {
            Some(parent) => self.world(parent)?.inverse().mul_transform(&world),
            None => world,
        };
        self.set_local(id, local)
    }

    /// Re-parents `id`. With `keep_world` the world pose is preserved,
    /// otherwise the local transform is kept as-is under the new parent.
    /// Returns `false` without changes when the move would form a cycle.
    pub fn set_parent(
        &mut self,
        id: EntityId,
        parent: Option<EntityId>,
        keep_world: bool,
    ) -> Result<bool> {
        let world = self.world(id)?;

        if let Some(new_parent) = parent {
            self.node(new_parent)?;
            if self.is_ancestor_or_self(id, new_parent) {
                log::warn!("refusing to parent {} under its descendant {}", id, new_parent);
                return Ok(false);
            }
        }

        if let Some(old_parent) = self.node(id)?.parent {
            if let Some(node) = self.nodes.get_mut(&old_parent) {
                node.children.retain(|c| *c != id);
            }
        }

        if let Some(new_parent) = parent {
            if let Some(node) = self.nodes.get_mut(&new_parent) {
                node.children.push(id);
            }
        }

        self.node_mut(id)?.parent = parent;
        if keep_world {
            self.set_world(id, world)?;
        }
        Ok(true)
    }

    fn is_ancestor_or_self(&self, ancestor: EntityId, mut id: EntityId) -> bool {
        loop {
            if id == ancestor {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn node(&self, id: EntityId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(AuthorityError::NotFound(id))
    }

    fn node_mut(&mut self, id: EntityId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(AuthorityError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARENT: EntityId = EntityId(1);
    const CHILD: EntityId = EntityId(2);

    fn rotated_parent() -> TransformHierarchy {
        let mut tree = TransformHierarchy::new();
        tree.insert(
            PARENT,
            Transform::new(Vec3::new(4.0, 0.0, -2.0), Quat::from_rotation_y(1.1)),
        );
        tree.insert(
            CHILD,
            Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_x(0.3)),
        );
        tree
    }

    #[test]
    fn inverse_roundtrip() {
        let t = Transform::new(Vec3::new(1.0, -2.0, 0.5), Quat::from_rotation_z(0.7));
        let identity = t.mul_transform(&t.inverse());
        assert!(identity.abs_diff_eq(&Transform::IDENTITY, 1e-5));
    }

    #[test]
    fn reparent_keeping_world() {
        let mut tree = rotated_parent();
        let before = tree.world(CHILD).unwrap();

        assert!(tree.set_parent(CHILD, Some(PARENT), true).unwrap());
        assert_eq!(tree.parent(CHILD), Some(PARENT));
        assert!(tree.world(CHILD).unwrap().abs_diff_eq(&before, 1e-4));

        assert!(tree.set_parent(CHILD, None, true).unwrap());
        assert!(tree.world(CHILD).unwrap().abs_diff_eq(&before, 1e-4));
        assert!(tree.children(PARENT).is_empty());
    }

    #[test]
    fn child_follows_parent() {
        let mut tree = rotated_parent();
        tree.set_parent(CHILD, Some(PARENT), false).unwrap();
        tree.set_local(CHILD, Transform::from_translation(Vec3::Z))
            .unwrap();

        tree.set_world(PARENT, Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        let world = tree.world(CHILD).unwrap();
        assert!(world.translation.abs_diff_eq(Vec3::new(10.0, 0.0, 1.0), 1e-5));
    }

    #[test]
    fn cycles_refused() {
        let mut tree = rotated_parent();
        tree.set_parent(CHILD, Some(PARENT), true).unwrap();
        assert!(!tree.set_parent(PARENT, Some(CHILD), true).unwrap());
        assert_eq!(tree.parent(PARENT), None);
    }

    #[test]
    fn removing_parent_frees_children() {
        let mut tree = rotated_parent();
        tree.set_parent(CHILD, Some(PARENT), true).unwrap();
        let before = tree.world(CHILD).unwrap();

        tree.remove(PARENT).unwrap();
        assert_eq!(tree.parent(CHILD), None);
        assert!(tree.world(CHILD).unwrap().abs_diff_eq(&before, 1e-4));
        assert!(tree.world(PARENT).is_err());
    }

    #[test]
    fn removing_child_detaches_it() {
        let mut tree = rotated_parent();
        tree.set_parent(CHILD, Some(PARENT), true).unwrap();

        assert!(tree.remove(CHILD).is_some());
        assert!(tree.children(PARENT).is_empty());
        assert!(!tree.contains(CHILD));
        assert!(tree.remove(CHILD).is_none());
    }
}
