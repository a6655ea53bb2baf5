//! Fehlertypen fuer die Broadcast-Engine

use rundfunk_core::types::{BroadcasterId, ResourceId};
use thiserror::Error;

/// Fehlertyp fuer die Broadcast-Engine
///
/// Erwartete Races (Lookup-Miss beim Zustellen, tote Resource beim Ernten)
/// sind bewusst KEINE Varianten dieses Enums – sie werden als `Option`
/// bzw. `bool` an den Aufrufer gereicht und nur geloggt.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Doppelte Registrierung einer Resource-ID (Programmierfehler)
    #[error("Doppelte Resource-ID: {0}")]
    DoppelteId(ResourceId),

    /// Operation auf einem bereits zerstoerten Broadcaster (Programmierfehler)
    #[error("Broadcaster '{0}' ist bereits zerstoert")]
    Zerstoert(BroadcasterId),

    /// Ungueltiger Heartbeat-Wert bei der Aushandlung
    #[error("Ungueltiger Heartbeat-Wert: '{0}'")]
    UngueltigerHeartbeat(String),

    /// Keine Standard-Fabrik im Prozess-Kontext registriert
    #[error("Keine Standard-Fabrik registriert")]
    KeineFabrik,

    /// Bus-Fehler (Publish, Subscribe, Verbindung)
    #[error("Bus-Fehler: {0}")]
    Bus(String),

    /// Interner Fehler
    #[error("Interner Fehler: {0}")]
    Intern(String),
}

impl BroadcastError {
    /// Erstellt einen Bus-Fehler
    pub fn bus(msg: impl Into<String>) -> Self {
        Self::Bus(msg.into())
    }

    /// Erstellt einen internen Fehler
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }
}

/// Result-Typ fuer die Broadcast-Engine
pub type BroadcastResult<T> = Result<T, BroadcastError>;
