//! Fabrik-Kontext – Prozessweite Registrierung der Standard-Fabrik
//!
//! Expliziter Registrierungs-/Lookup-Dienst statt einer schwachen
//! Referenz: der Eigentuemer registriert die Fabrik beim Start und
//! meldet sie beim Shutdown wieder ab. `aktuelle` ohne registrierte
//! Fabrik ist ein harter Fehler, kein stilles Neu-Anlegen.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::{BroadcastError, BroadcastResult};
use crate::fabrik::BroadcasterFabrik;

static STANDARD_FABRIK: RwLock<Option<Arc<BroadcasterFabrik>>> = RwLock::new(None);

/// Registriert die prozessweite Standard-Fabrik
///
/// Eine bereits registrierte Fabrik wird ersetzt; der Aufrufer ist fuer
/// deren Zerstoerung verantwortlich.
pub fn registrieren(fabrik: Arc<BroadcasterFabrik>) {
    let vorherige = STANDARD_FABRIK.write().replace(fabrik);
    if vorherige.is_some() {
        tracing::warn!("Standard-Fabrik ersetzt eine bereits registrierte Instanz");
    } else {
        tracing::debug!("Standard-Fabrik registriert");
    }
}

/// Meldet die Standard-Fabrik ab (Prozess-Shutdown)
pub fn abmelden() {
    if STANDARD_FABRIK.write().take().is_some() {
        tracing::debug!("Standard-Fabrik abgemeldet");
    }
}

/// Gibt die registrierte Standard-Fabrik zurueck
pub fn aktuelle() -> BroadcastResult<Arc<BroadcasterFabrik>> {
    STANDARD_FABRIK
        .read()
        .clone()
        .ok_or(BroadcastError::KeineFabrik)
}
