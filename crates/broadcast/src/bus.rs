//! Nachrichten-Bus – Abstrakte Publish/Subscribe-Faehigkeit
//!
//! Der Cluster-Filter spricht den Bus nur ueber dieses Trait an; der
//! konkrete Transport (Redis, NATS, In-Process) ist austauschbar.
//! Verbindungsparameter (Adresse, Credential) sind Konfiguration der
//! jeweiligen Implementierung, keine Engine-Logik.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::error::BroadcastResult;

/// Groesse der Weiterleitungs-Queue pro Abonnement
const ABO_QUEUE_GROESSE: usize = 256;

/// Abstrakter Publish/Subscribe-Bus
///
/// Ein Abonnement gehoert exklusiv dem Abonnenten; das Fallenlassen des
/// Empfaengers beendet die Zustellung.
#[async_trait]
pub trait NachrichtenBus: Send + Sync + 'static {
    /// Publiziert ein Payload auf einem Kanal
    async fn publizieren(&self, kanal: &str, payload: String) -> BroadcastResult<()>;

    /// Abonniert einen Kanal und gibt die Empfangs-Queue zurueck
    async fn abonnieren(&self, kanal: &str) -> BroadcastResult<mpsc::Receiver<String>>;

    /// Beendet das Abonnement eines Kanals
    async fn abbestellen(&self, kanal: &str) -> BroadcastResult<()>;

    /// Trennt die Bus-Verbindung
    async fn trennen(&self) -> BroadcastResult<()>;
}

/// In-Process-Bus auf tokio-Kanaelen
///
/// Fuer Tests und Single-Host-Betrieb. Verhaelt sich wie ein echter
/// Pub/Sub-Bus: der Publisher empfaengt seine eigenen Publikationen
/// ueber sein Abonnement zurueck (Echo).
pub struct MemoryBus {
    themen: DashMap<String, broadcast::Sender<String>>,
}

impl MemoryBus {
    /// Erstellt einen neuen MemoryBus
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            themen: DashMap::new(),
        })
    }

    fn sender(&self, kanal: &str) -> broadcast::Sender<String> {
        self.themen
            .entry(kanal.to_string())
            .or_insert_with(|| broadcast::channel(ABO_QUEUE_GROESSE).0)
            .clone()
    }
}

#[async_trait]
impl NachrichtenBus for MemoryBus {
    async fn publizieren(&self, kanal: &str, payload: String) -> BroadcastResult<()> {
        // Keine Abonnenten ist kein Fehler; das Payload verfaellt dann
        if self.sender(kanal).send(payload).is_err() {
            tracing::trace!(kanal = kanal, "Publikation ohne Abonnenten verworfen");
        }
        Ok(())
    }

    async fn abonnieren(&self, kanal: &str) -> BroadcastResult<mpsc::Receiver<String>> {
        let mut bus_empfaenger = self.sender(kanal).subscribe();
        let (tx, rx) = mpsc::channel(ABO_QUEUE_GROESSE);
        let kanal = kanal.to_string();

        // Brueckentask: broadcast -> mpsc; endet wenn der Abonnent den
        // Empfaenger fallen laesst oder das Thema geschlossen wird
        tokio::spawn(async move {
            loop {
                match bus_empfaenger.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(verpasst)) => {
                        tracing::warn!(kanal = %kanal, verpasst, "Bus-Abonnement hinkt hinterher");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }

    async fn abbestellen(&self, _kanal: &str) -> BroadcastResult<()> {
        // Das Abonnement endet mit dem Fallenlassen des Empfaengers
        Ok(())
    }

    async fn trennen(&self) -> BroadcastResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn publizieren_erreicht_abonnenten() {
        let bus = MemoryBus::neu();
        let mut empfaenger = bus.abonnieren("kanal-a").await.unwrap();

        bus.publizieren("kanal-a", "hallo".into()).await.unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(1), empfaenger.recv())
            .await
            .expect("Zeitlimit")
            .expect("Payload erwartet");
        assert_eq!(payload, "hallo");
    }

    #[tokio::test]
    async fn kanaele_sind_getrennt() {
        let bus = MemoryBus::neu();
        let mut a = bus.abonnieren("kanal-a").await.unwrap();
        let mut b = bus.abonnieren("kanal-b").await.unwrap();

        bus.publizieren("kanal-a", "nur-a".into()).await.unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(1), a.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, "nur-a");
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn publizieren_ohne_abonnenten_ist_kein_fehler() {
        let bus = MemoryBus::neu();
        bus.publizieren("niemand", "verhallt".into()).await.unwrap();
    }

    #[tokio::test]
    async fn publisher_empfaengt_eigenes_echo() {
        let bus = MemoryBus::neu();
        let mut empfaenger = bus.abonnieren("echo").await.unwrap();

        bus.publizieren("echo", "ich selbst".into()).await.unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(1), empfaenger.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload, "ich selbst");
    }
}
