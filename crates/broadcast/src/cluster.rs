//! Cluster-Filter – Bruecke zwischen lokalem Broadcaster und Pub/Sub-Bus
//!
//! Der Filter publiziert ausgehende Broadcasts auf dem Bus-Thema des
//! Broadcasters und speist vom Bus empfangene Nachrichten wieder in den
//! lokalen Broadcaster ein. Ein beschraenkter Fingerabdruck-Speicher
//! unterdrueckt dabei beide Schleifen-Formen:
//!
//! - das Echo der eigenen Publikation (der Bus stellt dem Publisher sein
//!   eigenes Payload zu) wird verworfen statt doppelt ausgeliefert,
//! - eine wiedereingespeiste Fremd-Nachricht durchlaeuft die Filterkette
//!   ohne erneut publiziert zu werden.
//!
//! Bus-Stoerungen degradieren zu rein lokaler Auslieferung; es gibt
//! keine automatischen Publikations-Wiederholungen.

use async_trait::async_trait;
use parking_lot::Mutex;
use rundfunk_core::nachricht::Nachricht;
use rundfunk_core::types::BroadcasterId;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::broadcaster::Broadcaster;
use crate::bus::NachrichtenBus;
use crate::error::BroadcastResult;
use crate::fabrik::BroadcasterFabrik;
use crate::filter::{FilterAktion, NachrichtenFilter};

/// Obergrenze des Fingerabdruck-Speichers
///
/// Begrenzt das Wachstum falls Publikations/Empfangs-Paare nie
/// abgeschlossen werden (z.B. Bus-Trennung nach dem Publizieren).
const ECHO_KAPAZITAET: usize = 1024;

// ---------------------------------------------------------------------------
// EchoSpeicher
// ---------------------------------------------------------------------------

/// Beschraenkte FIFO-Menge von Nachrichten-Fingerabdruecken
///
/// Bewusst eine Multimenge: zwei inhaltsgleiche Nachrichten im selben
/// Fenster belegen zwei Eintraege, `entfernen` nimmt genau ein Vorkommen
/// heraus. So unterdrueckt ein Duplikat nicht faelschlich ein zweites.
struct EchoSpeicher {
    eintraege: Mutex<VecDeque<u64>>,
}

impl EchoSpeicher {
    fn neu() -> Arc<Self> {
        Arc::new(Self {
            eintraege: Mutex::new(VecDeque::new()),
        })
    }

    fn merken(&self, fingerprint: u64) {
        let mut eintraege = self.eintraege.lock();
        eintraege.push_back(fingerprint);
        if eintraege.len() > ECHO_KAPAZITAET {
            eintraege.pop_front();
            tracing::trace!("Echo-Speicher voll, aeltester Eintrag verworfen");
        }
    }

    /// Entfernt ein Vorkommen; `false` wenn der Fingerabdruck unbekannt ist
    fn entfernen(&self, fingerprint: u64) -> bool {
        let mut eintraege = self.eintraege.lock();
        match eintraege.iter().position(|f| *f == fingerprint) {
            Some(position) => {
                eintraege.remove(position);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn laenge(&self) -> usize {
        self.eintraege.lock().len()
    }
}

// ---------------------------------------------------------------------------
// ClusterFilter
// ---------------------------------------------------------------------------

/// Vom `init` gesetzter Laufzeit-Zustand der Bruecke
struct ClusterZustand {
    /// Bus-Thema (Standard: die Broadcaster-ID)
    kanal: Option<String>,
    /// ID des Broadcasters fuer die Wiedereinspeisung (Fabrik-Lookup)
    ziel: Option<BroadcasterId>,
    /// Empfangsschleife des Bus-Abonnements
    hoerer: Option<JoinHandle<()>>,
}

/// Filter, der einen Broadcaster an einen Pub/Sub-Bus anbindet
///
/// Die Bus-Verbindung gehoert exklusiv dieser Filter-Instanz; kein
/// anderer Teil der Engine publiziert oder abonniert auf ihr.
pub struct ClusterFilter {
    bus: Arc<dyn NachrichtenBus>,
    fabrik: Arc<BroadcasterFabrik>,
    kanal_ueberschreibung: Option<String>,
    gesehen: Arc<EchoSpeicher>,
    zustand: Mutex<ClusterZustand>,
}

impl ClusterFilter {
    /// Erstellt einen Cluster-Filter; das Bus-Thema ist die ID des
    /// Broadcasters, an dem der Filter registriert wird
    pub fn neu(bus: Arc<dyn NachrichtenBus>, fabrik: Arc<BroadcasterFabrik>) -> Arc<Self> {
        Self::bauen(bus, fabrik, None)
    }

    /// Erstellt einen Cluster-Filter mit explizitem Bus-Thema
    pub fn mit_kanal(
        kanal: impl Into<String>,
        bus: Arc<dyn NachrichtenBus>,
        fabrik: Arc<BroadcasterFabrik>,
    ) -> Arc<Self> {
        Self::bauen(bus, fabrik, Some(kanal.into()))
    }

    fn bauen(
        bus: Arc<dyn NachrichtenBus>,
        fabrik: Arc<BroadcasterFabrik>,
        kanal_ueberschreibung: Option<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            fabrik,
            kanal_ueberschreibung,
            gesehen: EchoSpeicher::neu(),
            zustand: Mutex::new(ClusterZustand {
                kanal: None,
                ziel: None,
                hoerer: None,
            }),
        })
    }

    fn kanal(&self) -> Option<String> {
        self.zustand.lock().kanal.clone()
    }
}

#[async_trait]
impl NachrichtenFilter for ClusterFilter {
    /// Abonniert das Bus-Thema und startet die Empfangsschleife
    async fn init(&self, broadcaster: &Broadcaster) -> BroadcastResult<()> {
        let kanal = self
            .kanal_ueberschreibung
            .clone()
            .unwrap_or_else(|| broadcaster.id().as_str().to_string());
        let ziel = broadcaster.id().clone();

        {
            let mut zustand = self.zustand.lock();
            if let Some(alter_hoerer) = zustand.hoerer.take() {
                alter_hoerer.abort();
            }
            zustand.kanal = Some(kanal.clone());
            zustand.ziel = Some(ziel.clone());
        }

        tracing::info!(kanal = %kanal, "Cluster-Bruecke wird gestartet");
        let empfaenger = self.bus.abonnieren(&kanal).await?;

        let hoerer = tokio::spawn(empfangs_schleife(
            empfaenger,
            Arc::clone(&self.gesehen),
            Arc::clone(&self.fabrik),
            ziel,
            kanal,
        ));
        self.zustand.lock().hoerer = Some(hoerer);
        Ok(())
    }

    async fn filtern(&self, original: &Nachricht, bisher: Nachricht) -> FilterAktion {
        let Some(kanal) = self.kanal() else {
            // init lief nie; rein lokale Auslieferung
            return FilterAktion::Weiter(bisher);
        };

        let fingerprint = original.fingerprint();
        if self.gesehen.entfernen(fingerprint) {
            // Wiedereinspeisung einer Bus-Nachricht: lokal ausliefern,
            // nicht erneut publizieren
            return FilterAktion::Weiter(bisher);
        }

        match serde_json::to_string(original) {
            Ok(payload) => {
                // Vor dem Publizieren merken, damit das eigene Echo auch
                // bei sehr schneller Zustellung erkannt wird
                self.gesehen.merken(fingerprint);
                if let Err(fehler) = self.bus.publizieren(&kanal, payload).await {
                    tracing::warn!(
                        kanal = %kanal,
                        fehler = %fehler,
                        "Bus-Publikation fehlgeschlagen, nur lokale Auslieferung"
                    );
                    // Kein Echo zu erwarten
                    self.gesehen.entfernen(fingerprint);
                }
            }
            Err(fehler) => {
                tracing::warn!(kanal = %kanal, fehler = %fehler, "Nachricht nicht bus-kodierbar");
            }
        }

        FilterAktion::Weiter(bisher)
    }

    /// Gibt Abonnement und Bus-Verbindung frei
    ///
    /// Laeuft auch nach teilweise fehlgeschlagenem `init` vollstaendig
    /// durch (Abbestellen und Trennen tolerieren fehlende Abos).
    async fn zerstoeren(&self) {
        let (kanal, hoerer) = {
            let mut zustand = self.zustand.lock();
            zustand.ziel = None;
            (zustand.kanal.take(), zustand.hoerer.take())
        };

        if let Some(hoerer) = hoerer {
            hoerer.abort();
        }
        if let Some(kanal) = &kanal {
            if let Err(fehler) = self.bus.abbestellen(kanal).await {
                tracing::warn!(kanal = %kanal, fehler = %fehler, "Abbestellen fehlgeschlagen");
            }
        }
        if let Err(fehler) = self.bus.trennen().await {
            tracing::warn!(fehler = %fehler, "Bus-Trennung fehlgeschlagen");
        }
        tracing::info!("Cluster-Bruecke gestoppt");
    }
}

/// Empfangsschleife des Bus-Abonnements
///
/// Loest den Ziel-Broadcaster pro Nachricht ueber die Fabrik auf, damit
/// ein zwischenzeitlich zerstoerter Broadcaster nicht ueber eine
/// veraltete Referenz beliefert wird.
async fn empfangs_schleife(
    mut empfaenger: mpsc::Receiver<String>,
    gesehen: Arc<EchoSpeicher>,
    fabrik: Arc<BroadcasterFabrik>,
    ziel: BroadcasterId,
    kanal: String,
) {
    while let Some(roh) = empfaenger.recv().await {
        let nachricht: Nachricht = match serde_json::from_str(&roh) {
            Ok(nachricht) => nachricht,
            Err(fehler) => {
                tracing::warn!(kanal = %kanal, fehler = %fehler, "Bus-Payload nicht dekodierbar");
                continue;
            }
        };

        let fingerprint = nachricht.fingerprint();
        if gesehen.entfernen(fingerprint) {
            // Unser eigenes Echo; lokal wurde bereits ausgeliefert
            tracing::trace!(kanal = %kanal, "Eigenes Echo unterdrueckt");
            continue;
        }

        // Fremd-Nachricht: merken, damit die Filterkette sie nicht
        // zurueck auf den Bus publiziert
        gesehen.merken(fingerprint);
        match fabrik.suchen(&ziel) {
            Some(broadcaster) => {
                if let Err(fehler) = broadcaster.senden(nachricht).await {
                    tracing::warn!(
                        kanal = %kanal,
                        fehler = %fehler,
                        "Lokale Auslieferung einer Bus-Nachricht fehlgeschlagen"
                    );
                }
            }
            None => {
                tracing::debug!(kanal = %kanal, "Kein lokaler Broadcaster fuer Bus-Nachricht");
            }
        }
    }
    tracing::debug!(kanal = %kanal, "Bus-Empfangsschleife beendet");
}
