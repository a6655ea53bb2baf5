//! Gemeinsame Identifikationstypen fuer Rundfunk
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Resource-ID (eine logische Client-Verbindung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub Uuid);

impl ResourceId {
    /// Erstellt eine neue zufaellige ResourceId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resource:{}", self.0)
    }
}

/// Eindeutiger Broadcaster-Schluessel
///
/// Im Gegensatz zu den UUID-IDs ist der Broadcaster-Schluessel ein frei
/// waehlbarer String, da Fan-out-Gruppen ueber stabile Namen angesprochen
/// werden. Der Schluessel dient zugleich als Bus-Thema im Cluster-Betrieb.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BroadcasterId(pub String);

impl BroadcasterId {
    /// Erstellt eine BroadcasterId aus einem Namen
    pub fn neu(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Gibt den inneren Namen zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BroadcasterId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for BroadcasterId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl std::fmt::Display for BroadcasterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
