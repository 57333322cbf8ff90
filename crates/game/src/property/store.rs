use std::collections::BTreeMap;

use crate::authority::{EntityId, EntityRegistry, NodeId};
use crate::error::{AuthorityError, Result};

use super::{PropertyKey, PropertyType, PropertyValue};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkedProperty<T> {
    committed: T,
    pending: T,
    dirty: bool,
}

impl<T: Copy> NetworkedProperty<T> {
    pub fn new(initial: T) -> Self {
        Self {
            committed: initial,
            pending: initial,
            dirty: false,
        }
    }

    pub fn committed(&self) -> T {
        self.committed
    }

    pub fn pending(&self) -> T {
        self.pending
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn stage(&mut self, value: T) {
        self.pending = value;
        self.dirty = true;
    }

    pub fn commit(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.committed = self.pending;
        self.dirty = false;
        true
    }
}

/// Networked properties of every entity.
///
/// Writes land in the pending slot and only become readable after `commit`,
/// which the tick driver calls once per tick boundary.
#[derive(Debug, Default)]
pub struct PropertyStore {
    properties: BTreeMap<(EntityId, &'static str), NetworkedProperty<PropertyValue>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare<T: PropertyType>(&mut self, entity: EntityId, key: PropertyKey<T>, initial: T) {
        self.properties.insert(
            (entity, key.name()),
            NetworkedProperty::new(initial.into_value()),
        );
    }

    pub fn contains<T>(&self, entity: EntityId, key: PropertyKey<T>) -> bool {
        self.properties.contains_key(&(entity, key.name()))
    }

    pub fn write<T: PropertyType>(
        &mut self,
        registry: &EntityRegistry,
        entity: EntityId,
        key: PropertyKey<T>,
        value: T,
        writer: NodeId,
    ) -> Result<()> {
        if registry.lookup(entity)?.state_authority != writer {
            return Err(AuthorityError::AuthorityViolation { writer, entity });
        }

        let property = self
            .properties
            .get_mut(&(entity, key.name()))
            .ok_or(AuthorityError::PropertyNotFound {
                entity,
                key: key.name(),
            })?;

        let value = value.into_value();
        if !value.same_type(&property.committed()) {
            return Err(AuthorityError::TypeMismatch { key: key.name() });
        }

        property.stage(value);
        Ok(())
    }

    /// Last committed value. Never observes a staged write.
    pub fn read<T: PropertyType>(&self, entity: EntityId, key: PropertyKey<T>) -> Result<T> {
        let property = self.get(entity, key.name())?;
        T::from_value(property.committed()).ok_or(AuthorityError::TypeMismatch { key: key.name() })
    }

    /// Staged value, for the state authority's own logic within a tick.
    pub fn pending<T: PropertyType>(&self, entity: EntityId, key: PropertyKey<T>) -> Result<T> {
        let property = self.get(entity, key.name())?;
        T::from_value(property.pending()).ok_or(AuthorityError::TypeMismatch { key: key.name() })
    }

    pub fn is_dirty<T>(&self, entity: EntityId, key: PropertyKey<T>) -> bool {
        self.properties
            .get(&(entity, key.name()))
            .is_some_and(|p| p.is_dirty())
    }

    pub fn commit<T>(&mut self, entity: EntityId, key: PropertyKey<T>) -> Result<bool> {
        self.properties
            .get_mut(&(entity, key.name()))
            .map(NetworkedProperty::commit)
            .ok_or(AuthorityError::PropertyNotFound {
                entity,
                key: key.name(),
            })
    }

    pub fn commit_dirty(&mut self) -> usize {
        self.properties
            .values_mut()
            .filter(|p| p.is_dirty())
            .map(|p| p.commit())
            .filter(|committed| *committed)
            .count()
    }

    pub fn remove_entity(&mut self, entity: EntityId) {
        self.properties.retain(|(owner, _), _| *owner != entity);
    }

    pub fn iter_committed(&self) -> impl Iterator<Item = (EntityId, &'static str, PropertyValue)> + '_ {
        self.properties
            .iter()
            .map(|((entity, name), property)| (*entity, *name, property.committed()))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn get(&self, entity: EntityId, name: &'static str) -> Result<&NetworkedProperty<PropertyValue>> {
        self.properties
            .get(&(entity, name))
            .ok_or(AuthorityError::PropertyNotFound { entity, key: name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::EntityKind;
    use crate::property::{COUNTDOWN, PAINT_INDEX};

    const HOST: NodeId = NodeId(0);
    const CLIENT: NodeId = NodeId(1);

    fn setup() -> (EntityRegistry, PropertyStore, EntityId) {
        let mut registry = EntityRegistry::new();
        let id = registry.allocate_id().unwrap();
        registry
            .register(id, EntityKind::Paintable, HOST, Some(CLIENT))
            .unwrap();
        let mut store = PropertyStore::new();
        store.declare(id, PAINT_INDEX, 0);
        (registry, store, id)
    }

    #[test]
    fn networked_property_commit() {
        let mut property = NetworkedProperty::new(1.5f32);
        assert!(!property.commit());

        property.stage(2.5);
        assert!(property.is_dirty());
        assert_eq!(property.committed(), 1.5);
        assert!(property.commit());
        assert_eq!(property.committed(), 2.5);
        assert!(!property.is_dirty());
    }

    #[test]
    fn write_is_invisible_until_commit() {
        let (registry, mut store, id) = setup();

        store.write(&registry, id, PAINT_INDEX, 3, HOST).unwrap();
        assert_eq!(store.read(id, PAINT_INDEX).unwrap(), 0);
        assert_eq!(store.pending(id, PAINT_INDEX).unwrap(), 3);

        assert!(store.commit(id, PAINT_INDEX).unwrap());
        assert_eq!(store.read(id, PAINT_INDEX).unwrap(), 3);
        assert!(!store.commit(id, PAINT_INDEX).unwrap());
    }

    #[test]
    fn non_authority_write_rejected() {
        let (registry, mut store, id) = setup();

        assert_eq!(
            store.write(&registry, id, PAINT_INDEX, 2, CLIENT),
            Err(AuthorityError::AuthorityViolation {
                writer: CLIENT,
                entity: id
            })
        );
        assert!(!store.is_dirty(id, PAINT_INDEX));
        assert_eq!(store.commit_dirty(), 0);
        assert_eq!(store.read(id, PAINT_INDEX).unwrap(), 0);
    }

    #[test]
    fn undeclared_and_mistyped() {
        let (registry, mut store, id) = setup();

        assert!(matches!(
            store.write(&registry, id, COUNTDOWN, 1.0, HOST),
            Err(AuthorityError::PropertyNotFound { .. })
        ));
        assert!(matches!(
            store.read(id, COUNTDOWN),
            Err(AuthorityError::PropertyNotFound { .. })
        ));

        let mistyped: PropertyKey<f32> = PropertyKey::new("paint_index");
        assert_eq!(
            store.write(&registry, id, mistyped, 1.0, HOST),
            Err(AuthorityError::TypeMismatch { key: "paint_index" })
        );
    }

    #[test]
    fn commit_dirty_counts() {
        let (registry, mut store, id) = setup();
        store.declare(id, COUNTDOWN, 10.0);

        store.write(&registry, id, PAINT_INDEX, 1, HOST).unwrap();
        store.write(&registry, id, COUNTDOWN, 9.0, HOST).unwrap();
        assert_eq!(store.commit_dirty(), 2);
        assert_eq!(store.commit_dirty(), 0);

        store.remove_entity(id);
        assert!(store.is_empty());
    }
}
