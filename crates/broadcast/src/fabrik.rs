//! Broadcaster-Fabrik – Prozessweites Verzeichnis aller Fan-out-Gruppen
//!
//! Die Fabrik bildet Broadcaster-IDs auf lebende Instanzen ab
//! (get-or-create, erster Schreiber gewinnt) und betreibt den einen
//! geteilten Ernte-Timer: ein Durchlauf erntet die Registries aller
//! Broadcaster, sodass die Ernte-Kosten unabhaengig von der Anzahl der
//! Broadcaster beschraenkt bleiben.

use dashmap::DashMap;
use rundfunk_core::types::BroadcasterId;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::broadcaster::{Broadcaster, Variante};

/// Zeitplan des geteilten Ernte-Timers
#[derive(Debug, Clone)]
pub struct ErnteKonfig {
    /// Verzoegerung bis zum ersten Durchlauf
    pub erste_verzoegerung: Duration,
    /// Fester Abstand zwischen den Durchlaeufen
    pub intervall: Duration,
}

impl Default for ErnteKonfig {
    fn default() -> Self {
        Self {
            erste_verzoegerung: Duration::from_secs(30),
            intervall: Duration::from_secs(10),
        }
    }
}

/// Prozessweite Broadcaster-Fabrik
pub struct BroadcasterFabrik {
    broadcasters: DashMap<BroadcasterId, Broadcaster>,
    ernte_konfig: ErnteKonfig,
    ernter: parking_lot::Mutex<Option<JoinHandle<()>>>,
    /// Selbst-Referenz fuer den Ernte-Task; schwach, damit der Timer
    /// eine fallengelassene Fabrik nicht am Leben haelt
    selbst: Weak<Self>,
}

impl BroadcasterFabrik {
    /// Erstellt eine Fabrik mit Standard-Erntezeitplan
    pub fn neu() -> Arc<Self> {
        Self::mit_konfig(ErnteKonfig::default())
    }

    /// Erstellt eine Fabrik mit eigenem Erntezeitplan
    pub fn mit_konfig(ernte_konfig: ErnteKonfig) -> Arc<Self> {
        Arc::new_cyclic(|selbst| Self {
            broadcasters: DashMap::new(),
            ernte_konfig,
            ernter: parking_lot::Mutex::new(None),
            selbst: selbst.clone(),
        })
    }

    /// Gibt den Broadcaster zur ID zurueck, legt ihn bei Bedarf an
    ///
    /// Atomares check-then-create ueber die Entry-API: nebenlaeufige
    /// Aufrufer mit derselben ID beobachten dieselbe Instanz, und
    /// unterlegene Aufrufer konstruieren erst gar nichts. Existiert die
    /// ID bereits, wird die vorhandene Instanz unabhaengig von der
    /// angefragten Variante zurueckgegeben (erster Schreiber gewinnt).
    pub fn holen(&self, variante: Variante, id: impl Into<BroadcasterId>) -> Broadcaster {
        let id = id.into();
        let broadcaster = self
            .broadcasters
            .entry(id.clone())
            .or_insert_with(|| Broadcaster::neu(variante, id))
            .clone();
        self.ernter_sicherstellen();
        broadcaster
    }

    /// Sucht einen Broadcaster ohne ihn anzulegen
    pub fn suchen(&self, id: &BroadcasterId) -> Option<Broadcaster> {
        self.broadcasters.get(id).map(|eintrag| eintrag.clone())
    }

    /// Gibt die Anzahl der lebenden Broadcaster zurueck
    pub fn anzahl(&self) -> usize {
        self.broadcasters.len()
    }

    /// Zerstoert einen Broadcaster und entfernt ihn aus der Fabrik
    ///
    /// Stoppt den Ernte-Timer wenn dies der letzte Broadcaster war.
    /// Gibt `false` zurueck wenn die ID unbekannt ist.
    pub async fn zerstoeren(&self, id: &BroadcasterId) -> bool {
        match self.broadcasters.remove(id) {
            Some((_, broadcaster)) => {
                broadcaster.zerstoeren().await;
                if self.broadcasters.is_empty() {
                    self.ernter_stoppen();
                }
                true
            }
            None => false,
        }
    }

    /// Zerstoert alle Broadcaster (Prozess-Shutdown)
    pub async fn alle_zerstoeren(&self) {
        let ids: Vec<BroadcasterId> = self.broadcasters.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.zerstoeren(&id).await;
        }
        // Auch ohne verbliebene Broadcaster keinen Timer zuruecklassen
        self.ernter_stoppen();
    }

    /// Startet den geteilten Ernte-Timer falls er noch nicht laeuft
    fn ernter_sicherstellen(&self) {
        let mut ernter = self.ernter.lock();
        if ernter.is_some() {
            return;
        }

        let fabrik: Weak<Self> = self.selbst.clone();
        let konfig = self.ernte_konfig.clone();

        *ernter = Some(tokio::spawn(async move {
            tokio::time::sleep(konfig.erste_verzoegerung).await;
            let mut takt = tokio::time::interval(konfig.intervall);
            loop {
                takt.tick().await;
                let Some(fabrik) = fabrik.upgrade() else { break };
                let mut entfernt = 0;
                for eintrag in fabrik.broadcasters.iter() {
                    entfernt += eintrag.value().registry().ernten();
                }
                if entfernt > 0 {
                    tracing::debug!(entfernt, "Ernte-Durchlauf abgeschlossen");
                }
            }
        }));
        tracing::debug!(
            erste_verzoegerung = ?self.ernte_konfig.erste_verzoegerung,
            intervall = ?self.ernte_konfig.intervall,
            "Ernte-Timer gestartet"
        );
    }

    fn ernter_stoppen(&self) {
        if let Some(ernter) = self.ernter.lock().take() {
            ernter.abort();
            tracing::debug!("Ernte-Timer gestoppt");
        }
    }
}

impl std::fmt::Debug for BroadcasterFabrik {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcasterFabrik")
            .field("broadcasters", &self.anzahl())
            .finish()
    }
}
