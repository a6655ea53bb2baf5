//! Resource – Eine logische Client-Verbindung
//!
//! Jede akzeptierte Verbindung wird als `Resource` im Registry ihres
//! Broadcasters gefuehrt. Die Resource besitzt den Suspend/Resume-Zustand
//! und die Heartbeat-Frist; die eigentliche Socket-Verwaltung liegt beim
//! Transport-Layer hinter dem `Verbindung`-Trait.
//!
//! ## State Machine
//! ```text
//! Aktiv -> Suspendiert -> Fortgesetzt
//!                |
//!                v
//!           Geschlossen
//! ```
//! `Fortgesetzt` und `Geschlossen` sind terminal; eine neue Verbindung
//! des Clients ergibt eine neue Resource.

use parking_lot::Mutex;
use rundfunk_core::nachricht::Nachricht;
use rundfunk_core::types::{BroadcasterId, ResourceId};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::verbindung::{UebertragungsModus, Verbindung};

/// Zustand einer Resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceZustand {
    /// Angelegt, noch nicht suspendiert
    Aktiv,
    /// Verbindung wird gehalten, wartet auf Auslieferung
    Suspendiert,
    /// Regulaer fortgesetzt (terminal)
    Fortgesetzt,
    /// Geschlossen durch Ernte oder Trennung (terminal)
    Geschlossen,
}

impl ResourceZustand {
    /// Terminal-Zustaende akzeptieren keine weiteren Uebergaenge
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Fortgesetzt | Self::Geschlossen)
    }
}

/// Eine logische Client-Verbindung im Registry eines Broadcasters
///
/// Das Registry besitzt die Resource; der Broadcaster wird nur als ID
/// referenziert (Relation, kein Besitz).
pub struct Resource {
    id: ResourceId,
    broadcaster_id: BroadcasterId,
    modus: UebertragungsModus,
    verbindung: Arc<dyn Verbindung>,
    zustand: Mutex<ResourceZustand>,
    heartbeat: Duration,
    heartbeat_frist: Mutex<Instant>,
}

impl Resource {
    /// Erstellt eine neue Resource im Zustand `Aktiv`
    ///
    /// `heartbeat` ist der bereits ausgehandelte effektive Wert
    /// (siehe [`crate::konfig::HeartbeatEinstellungen::aushandeln`]).
    pub fn neu(
        id: ResourceId,
        broadcaster_id: BroadcasterId,
        verbindung: Arc<dyn Verbindung>,
        modus: UebertragungsModus,
        heartbeat: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            broadcaster_id,
            modus,
            verbindung,
            zustand: Mutex::new(ResourceZustand::Aktiv),
            heartbeat,
            heartbeat_frist: Mutex::new(Instant::now() + heartbeat),
        })
    }

    /// Gibt die Resource-ID zurueck
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Gibt die ID des besitzenden Broadcasters zurueck
    pub fn broadcaster_id(&self) -> &BroadcasterId {
        &self.broadcaster_id
    }

    /// Gibt den aktuellen Zustand zurueck
    pub fn zustand(&self) -> ResourceZustand {
        *self.zustand.lock()
    }

    /// Gibt den ausgehandelten Heartbeat zurueck
    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// Suspendiert die Verbindung (Aktiv -> Suspendiert)
    ///
    /// In Terminal-Zustaenden ein No-op. `zeitlimit` wird an den
    /// Transport durchgereicht; `None` haelt unbegrenzt.
    pub fn suspendieren(&self, zeitlimit: Option<Duration>) {
        let mut zustand = self.zustand.lock();
        if zustand.ist_terminal() {
            return;
        }
        *zustand = ResourceZustand::Suspendiert;
        drop(zustand);
        self.verbindung.suspendieren(zeitlimit);
        tracing::trace!(resource = %self.id, "Resource suspendiert");
    }

    /// Setzt die Verbindung fort (terminal)
    ///
    /// Idempotent: in Terminal-Zustaenden ein No-op.
    pub fn fortsetzen(&self) {
        {
            let mut zustand = self.zustand.lock();
            if zustand.ist_terminal() {
                return;
            }
            *zustand = ResourceZustand::Fortgesetzt;
        }
        self.verbindung.fortsetzen();
        tracing::debug!(resource = %self.id, "Resource fortgesetzt");
    }

    /// Schliesst die Resource (terminal)
    ///
    /// Wird von der Ernte und bei Client-Trennung gerufen. Der Transport
    /// erhaelt ueber `fortsetzen` die Gelegenheit, seinen Zustand
    /// freizugeben.
    pub fn schliessen(&self) {
        {
            let mut zustand = self.zustand.lock();
            if *zustand == ResourceZustand::Geschlossen {
                return;
            }
            *zustand = ResourceZustand::Geschlossen;
        }
        self.verbindung.fortsetzen();
        tracing::debug!(resource = %self.id, "Resource geschlossen");
    }

    /// Bestaetigt ein Lebenszeichen und verschiebt die Heartbeat-Frist
    pub fn lebenszeichen(&self) {
        *self.heartbeat_frist.lock() = Instant::now() + self.heartbeat;
    }

    /// Lebendigkeits-Probe
    ///
    /// Eine Resource gilt als tot sobald sie terminal ist, der Transport
    /// die Verbindung als unbrauchbar meldet oder die Heartbeat-Frist
    /// ohne Lebenszeichen verstrichen ist.
    pub fn ist_aktiv(&self) -> bool {
        if self.zustand().ist_terminal() {
            return false;
        }
        if !self.verbindung.ist_verbunden() {
            return false;
        }
        Instant::now() <= *self.heartbeat_frist.lock()
    }

    /// Liefert eine Nachricht an diese Resource aus
    ///
    /// In Terminal-Zustaenden wird nicht mehr ausgeliefert (garantiert
    /// hoechstens eine Auslieferung pro Nachricht auch wenn Ernte und
    /// Fan-out sich ueberschneiden). Im Long-Poll-Modus setzt die erste
    /// erfolgreiche Auslieferung die Verbindung fort.
    pub fn ausliefern(&self, nachricht: &Nachricht) -> bool {
        if self.zustand().ist_terminal() {
            tracing::trace!(resource = %self.id, "Auslieferung an terminale Resource verworfen");
            return false;
        }
        let erfolgreich = self.verbindung.ausliefern(nachricht);
        if erfolgreich && self.modus == UebertragungsModus::LangesPolling {
            self.fortsetzen();
        }
        erfolgreich
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("broadcaster_id", &self.broadcaster_id)
            .field("zustand", &self.zustand())
            .finish()
    }
}
