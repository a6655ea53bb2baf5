//! Filterkette – Geordnete Transformationen und Vetos vor der Auslieferung
//!
//! Filter werden in Registrierungs-Reihenfolge angewendet; `Abbruch`
//! bricht die Kette ab und unterdrueckt die Auslieferung (Dedup,
//! Autorisierungs-Vetos). Die Zerstoerung laeuft in umgekehrter
//! Reihenfolge, gespiegelt zur Registrierung.

use async_trait::async_trait;
use parking_lot::RwLock;
use rundfunk_core::nachricht::Nachricht;
use std::sync::Arc;

use crate::broadcaster::Broadcaster;
use crate::error::BroadcastResult;

/// Ergebnis eines Filter-Schritts
#[derive(Debug)]
pub enum FilterAktion {
    /// Kette fortsetzen mit der (ggf. transformierten) Nachricht
    Weiter(Nachricht),
    /// Kette abbrechen; die Nachricht wird nicht ausgeliefert
    Abbruch,
}

/// Pluggable Transformation/Veto fuer ausgehende Nachrichten
///
/// Geschlossene Menge von Varianten hinter einem Capability-Interface:
/// einfache Filter implementieren nur `filtern`, der Cluster-Filter
/// nutzt zusaetzlich `init`/`zerstoeren` fuer den Bus-Lebenszyklus.
#[async_trait]
pub trait NachrichtenFilter: Send + Sync + 'static {
    /// Lebenszyklus-Hook beim Registrieren am Broadcaster
    async fn init(&self, _broadcaster: &Broadcaster) -> BroadcastResult<()> {
        Ok(())
    }

    /// Wendet den Filter an
    ///
    /// `original` ist die unveraenderte Eingangs-Nachricht des
    /// Broadcast-Aufrufs, `bisher` das Ergebnis der vorangegangenen
    /// Filter-Schritte.
    async fn filtern(&self, original: &Nachricht, bisher: Nachricht) -> FilterAktion;

    /// Lebenszyklus-Hook bei der Broadcaster-Zerstoerung
    async fn zerstoeren(&self) {}
}

/// Geordnete Filterkette eines Broadcasters
pub struct FilterKette {
    filter: RwLock<Vec<Arc<dyn NachrichtenFilter>>>,
}

impl FilterKette {
    /// Erstellt eine leere Filterkette
    pub fn neu() -> Self {
        Self {
            filter: RwLock::new(Vec::new()),
        }
    }

    /// Haengt einen Filter ans Ende der Kette
    pub fn hinzufuegen(&self, filter: Arc<dyn NachrichtenFilter>) {
        self.filter.write().push(filter);
    }

    /// Gibt die Anzahl der registrierten Filter zurueck
    pub fn anzahl(&self) -> usize {
        self.filter.read().len()
    }

    /// Wendet die Kette in Registrierungs-Reihenfolge an
    ///
    /// `None` bedeutet: ein Filter hat mit `Abbruch` ein Veto eingelegt.
    pub async fn anwenden(&self, original: &Nachricht) -> Option<Nachricht> {
        // Schnappschuss, damit waehrend der (async) Anwendung kein Lock
        // gehalten wird
        let kette: Vec<Arc<dyn NachrichtenFilter>> = self.filter.read().clone();

        let mut aktuell = original.clone();
        for filter in kette {
            match filter.filtern(original, aktuell).await {
                FilterAktion::Weiter(nachricht) => aktuell = nachricht,
                FilterAktion::Abbruch => return None,
            }
        }
        Some(aktuell)
    }

    /// Zerstoert alle Filter in umgekehrter Registrierungs-Reihenfolge
    /// und leert die Kette
    pub async fn zerstoeren_alle(&self) {
        let kette = std::mem::take(&mut *self.filter.write());
        for filter in kette.iter().rev() {
            filter.zerstoeren().await;
        }
    }
}

impl Default for FilterKette {
    fn default() -> Self {
        Self::neu()
    }
}
