use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{EntityId, EntityRegistry, NodeId};

/// Which authority an issuing node must hold over the source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFilter {
    InputAuthority,
    StateAuthority,
    Any,
}

pub fn can_issue_input(registry: &EntityRegistry, node: NodeId, entity: EntityId) -> Result<bool> {
    Ok(registry.lookup(entity)?.input_authority == Some(node))
}

pub fn is_state_authority(
    registry: &EntityRegistry,
    node: NodeId,
    entity: EntityId,
) -> Result<bool> {
    Ok(registry.lookup(entity)?.state_authority == node)
}

pub fn satisfies(
    registry: &EntityRegistry,
    filter: SourceFilter,
    node: NodeId,
    entity: EntityId,
) -> Result<bool> {
    match filter {
        SourceFilter::InputAuthority => can_issue_input(registry, node, entity),
        SourceFilter::StateAuthority => is_state_authority(registry, node, entity),
        SourceFilter::Any => registry.lookup(entity).map(|_| true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::EntityKind;
    use crate::error::AuthorityError;

    #[test]
    fn predicates_follow_registry() {
        let host = NodeId(0);
        let client = NodeId(1);
        let mut registry = EntityRegistry::new();
        let player = registry.allocate_id().unwrap();
        registry
            .register(player, EntityKind::Participant, host, Some(client))
            .unwrap();

        assert!(can_issue_input(&registry, client, player).unwrap());
        assert!(!can_issue_input(&registry, host, player).unwrap());
        assert!(is_state_authority(&registry, host, player).unwrap());
        assert!(!is_state_authority(&registry, client, player).unwrap());

        assert!(satisfies(&registry, SourceFilter::Any, NodeId(7), player).unwrap());
        assert!(!satisfies(&registry, SourceFilter::StateAuthority, client, player).unwrap());
    }

    #[test]
    fn missing_entity_passes_through() {
        let registry = EntityRegistry::new();
        assert_eq!(
            can_issue_input(&registry, NodeId(0), EntityId(3)),
            Err(AuthorityError::NotFound(EntityId(3)))
        );
        assert!(satisfies(&registry, SourceFilter::Any, NodeId(0), EntityId(3)).is_err());
    }
}
