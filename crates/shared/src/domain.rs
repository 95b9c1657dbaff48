use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_newtype!(ServerId);
name_newtype!(DatabaseId);
name_newtype!(ContainerId);

/// Identity of one live query view. Field-wise equality and hashing; no two
/// distinct (server, database, container) triples compare equal, regardless
/// of what characters the individual names contain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub server: ServerId,
    pub database: DatabaseId,
    pub container: ContainerId,
}

impl SessionKey {
    pub fn new(server: ServerId, database: DatabaseId, container: ContainerId) -> Self {
        Self {
            server,
            database,
            container,
        }
    }

    /// Human-readable form for window titles and log lines. Display only:
    /// identity stays field-wise.
    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.server, self.database, self.container)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.server, self.database, self.container)
    }
}

/// Identifier assigned to each submitted query, carried through logs and
/// cancellation diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(pub Uuid);

impl QueryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PagingMode {
    /// Each submission replaces what the view is showing.
    OneShot,
    /// Successive submissions carry a continuation token and results
    /// accumulate across fetches.
    Infinite,
}
