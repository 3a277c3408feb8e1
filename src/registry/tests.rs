//! Registry Module Tests
//!
//! ## Test Scopes
//! - **Identity Types**: ordering and serialization of replica ids.
//! - **Registration**: join, attribution of connections, live membership listing.
//! - **Departure**: unregistering connections, including re-joins on a new connection.

#[cfg(test)]
mod tests {
    use crate::registry::service::ReplicaRegistry;
    use crate::registry::types::ReplicaId;
    use crate::transport::{ConnectionId, LineSender};

    fn sender() -> LineSender {
        let (sender, _rx) = LineSender::channel(ConnectionId::new());
        sender
    }

    // ============================================================
    // REPLICA ID TESTS
    // ============================================================

    #[test]
    fn test_replica_id_orders_by_port() {
        let mut ids = vec![ReplicaId(9002), ReplicaId(9000), ReplicaId(9001)];
        ids.sort();

        assert_eq!(ids, vec![ReplicaId(9000), ReplicaId(9001), ReplicaId(9002)]);
    }

    #[test]
    fn test_replica_id_serializes_as_port() {
        let json = serde_json::to_string(&ReplicaId(4001)).expect("Serialization failed");
        assert_eq!(json, "4001");

        let restored: ReplicaId = serde_json::from_str(&json).expect("Deserialization failed");
        assert_eq!(restored, ReplicaId(4001));
    }

    // ============================================================
    // REGISTRATION TESTS
    // ============================================================

    #[test]
    fn test_register_maps_both_directions() {
        let registry = ReplicaRegistry::new();
        let replica = sender();
        let connection = replica.connection();

        assert!(registry.register(ReplicaId(4001), replica).is_none());

        assert!(registry.contains(ReplicaId(4001)));
        assert_eq!(registry.replica_for(connection), Some(ReplicaId(4001)));
        assert!(registry.sender_for(ReplicaId(4001)).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_connection_is_not_attributed() {
        let registry = ReplicaRegistry::new();
        registry.register(ReplicaId(4001), sender());

        assert_eq!(registry.replica_for(ConnectionId::new()), None);
    }

    #[test]
    fn test_live_replicas_are_sorted() {
        let registry = ReplicaRegistry::new();
        for port in [4003, 4001, 4002] {
            registry.register(ReplicaId(port), sender());
        }

        assert_eq!(
            registry.live_replicas(),
            vec![ReplicaId(4001), ReplicaId(4002), ReplicaId(4003)]
        );
    }

    #[test]
    fn test_rejoin_on_same_connection_with_new_port_drops_old_port() {
        let registry = ReplicaRegistry::new();
        let replica = sender();

        registry.register(ReplicaId(4001), replica.clone());
        registry.register(ReplicaId(4002), replica.clone());

        assert!(!registry.contains(ReplicaId(4001)));
        assert_eq!(registry.replica_for(replica.connection()), Some(ReplicaId(4002)));
        assert_eq!(registry.len(), 1);
    }

    // ============================================================
    // DEPARTURE TESTS
    // ============================================================

    #[test]
    fn test_unregister_removes_replica() {
        let registry = ReplicaRegistry::new();
        let replica = sender();
        let connection = replica.connection();
        registry.register(ReplicaId(4001), replica);

        assert_eq!(registry.unregister(connection), Some(ReplicaId(4001)));

        assert!(registry.is_empty());
        assert_eq!(registry.replica_for(connection), None);
    }

    #[test]
    fn test_unregister_client_connection_is_noop() {
        let registry = ReplicaRegistry::new();
        registry.register(ReplicaId(4001), sender());

        assert_eq!(registry.unregister(ConnectionId::new()), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stale_connection_does_not_evict_rejoined_replica() {
        let registry = ReplicaRegistry::new();
        let old = sender();
        let new = sender();

        registry.register(ReplicaId(4001), old.clone());
        let replaced = registry.register(ReplicaId(4001), new.clone());
        assert_eq!(replaced.map(|entry| entry.connection), Some(old.connection()));

        // The old connection closing afterwards must not remove the live entry.
        assert_eq!(registry.unregister(old.connection()), None);
        assert!(registry.contains(ReplicaId(4001)));
        assert_eq!(registry.replica_for(new.connection()), Some(ReplicaId(4001)));
    }
}
