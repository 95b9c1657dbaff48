use std::fmt;

use tokio::sync::Mutex;

use shared::domain::{ContainerId, DatabaseId, ServerId, SessionKey};

/// Target selected by the host's connect flow. Auth material is carried
/// opaquely for the driver and kept out of debug output.
#[derive(Clone)]
pub struct ConnectionDescriptor {
    pub server: ServerId,
    pub database: DatabaseId,
    pub container: ContainerId,
    pub auth_key: String,
    pub is_emulator: bool,
}

impl ConnectionDescriptor {
    pub fn session_key(&self) -> SessionKey {
        SessionKey::new(
            self.server.clone(),
            self.database.clone(),
            self.container.clone(),
        )
    }

    /// A query can only run once the descriptor names both a database and a
    /// container.
    pub fn has_resolvable_target(&self) -> bool {
        !self.database.as_str().is_empty() && !self.container.as_str().is_empty()
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("container", &self.container)
            .field("auth_key", &"<redacted>")
            .field("is_emulator", &self.is_emulator)
            .finish()
    }
}

/// Holds the target the user is currently connected to. The host's connect
/// command writes it; opening a query view reads it. Absence is a user-facing
/// condition, not a defect.
#[derive(Debug, Default)]
pub struct ConnectedTargetStore {
    current: Mutex<Option<ConnectionDescriptor>>,
}

impl ConnectedTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, connection: ConnectionDescriptor) {
        *self.current.lock().await = Some(connection);
    }

    pub async fn get(&self) -> Option<ConnectionDescriptor> {
        self.current.lock().await.clone()
    }

    pub async fn clear(&self) {
        *self.current.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectedTargetStore, ConnectionDescriptor};
    use shared::domain::{ContainerId, DatabaseId, ServerId};

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor {
            server: ServerId::new("https://acct.example.net:443/"),
            database: DatabaseId::new("orders"),
            container: ContainerId::new("items"),
            auth_key: "super-secret-master-key".to_string(),
            is_emulator: false,
        }
    }

    #[test]
    fn debug_output_never_contains_auth_material() {
        let rendered = format!("{:?}", descriptor());
        assert!(!rendered.contains("super-secret-master-key"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn target_resolution_requires_database_and_container() {
        assert!(descriptor().has_resolvable_target());

        let mut missing_database = descriptor();
        missing_database.database = DatabaseId::new("");
        assert!(!missing_database.has_resolvable_target());

        let mut missing_container = descriptor();
        missing_container.container = ContainerId::new("");
        assert!(!missing_container.has_resolvable_target());
    }

    #[tokio::test]
    async fn store_round_trips_and_clears_the_connected_target() {
        let store = ConnectedTargetStore::new();
        assert!(store.get().await.is_none());

        store.set(descriptor()).await;
        let current = store.get().await.expect("connected target");
        assert_eq!(current.session_key(), descriptor().session_key());

        store.clear().await;
        assert!(store.get().await.is_none());
    }
}
