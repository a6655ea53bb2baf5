//! Broadcaster – Benannte Fan-out-Gruppe
//!
//! Ein Broadcaster besitzt exklusiv sein Resource-Registry und eine
//! geordnete Filterkette. `senden` liefert eine Nachricht nach dem
//! Filterdurchlauf genau einmal an jede registrierte Resource aus;
//! `an_resource_senden` stellt gezielt an eine einzelne Resource zu.
//!
//! Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.

use rundfunk_core::nachricht::Nachricht;
use rundfunk_core::types::{BroadcasterId, ResourceId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{BroadcastError, BroadcastResult};
use crate::filter::{FilterKette, NachrichtenFilter};
use crate::registry::ResourceRegistry;
use crate::resource::Resource;

/// Konstruktions-Variante eines Broadcasters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variante {
    /// Serialisiert Filterdurchlauf und Fan-out pro Broadcaster, sodass
    /// die Auslieferung an eine einzelne Resource der Broadcast-Reihenfolge
    /// folgt
    Standard,
    /// Direkter Fan-out ohne Sende-Schleuse; keine Ordnungs-Garantie
    /// zwischen nebenlaeufigen `senden`-Aufrufen
    Einfach,
}

/// Benannte Fan-out-Gruppe mit Registry und Filterkette
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

struct BroadcasterInner {
    id: BroadcasterId,
    variante: Variante,
    registry: ResourceRegistry,
    filter: FilterKette,
    zerstoert: AtomicBool,
    /// Sende-Schleuse: serialisiert Filterkette + Fan-out, damit die
    /// Zustellung an eine einzelne Resource der beobachteten
    /// Broadcast-Reihenfolge folgt (nur `Variante::Standard`)
    schleuse: tokio::sync::Mutex<()>,
}

impl Broadcaster {
    /// Erstellt einen neuen Broadcaster (ueber die Fabrik aufrufen)
    pub(crate) fn neu(variante: Variante, id: BroadcasterId) -> Self {
        tracing::debug!(id = %id, ?variante, "Broadcaster erstellt");
        Self {
            inner: Arc::new(BroadcasterInner {
                id,
                variante,
                registry: ResourceRegistry::neu(),
                filter: FilterKette::neu(),
                zerstoert: AtomicBool::new(false),
                schleuse: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Gibt die Broadcaster-ID zurueck
    pub fn id(&self) -> &BroadcasterId {
        &self.inner.id
    }

    /// Gibt die Konstruktions-Variante zurueck
    pub fn variante(&self) -> Variante {
        self.inner.variante
    }

    /// Gibt das Registry dieses Broadcasters zurueck
    pub fn registry(&self) -> &ResourceRegistry {
        &self.inner.registry
    }

    /// Prueft ob der Broadcaster zerstoert wurde
    pub fn ist_zerstoert(&self) -> bool {
        self.inner.zerstoert.load(Ordering::SeqCst)
    }

    fn zustand_pruefen(&self) -> BroadcastResult<()> {
        if self.ist_zerstoert() {
            return Err(BroadcastError::Zerstoert(self.inner.id.clone()));
        }
        Ok(())
    }

    /// Registriert eine Resource in diesem Broadcaster
    ///
    /// Auf einem zerstoerten Broadcaster ein harter Fehler.
    pub fn resource_registrieren(&self, resource: Arc<Resource>) -> BroadcastResult<()> {
        self.zustand_pruefen()?;
        self.inner.registry.registrieren(resource)
    }

    /// Haengt einen Filter ans Ende der Kette und initialisiert ihn
    pub async fn filter_hinzufuegen(
        &self,
        filter: Arc<dyn NachrichtenFilter>,
    ) -> BroadcastResult<()> {
        self.zustand_pruefen()?;
        if let Err(fehler) = filter.init(self).await {
            // Teilweise erworbene Ressourcen (Bus-Abo) wieder freigeben
            filter.zerstoeren().await;
            return Err(fehler);
        }
        self.inner.filter.hinzufuegen(filter);
        Ok(())
    }

    /// Sendet eine Nachricht an alle registrierten Resources
    ///
    /// Die Nachricht durchlaeuft einmal die Filterkette und wird dann an
    /// jede Resource genau einmal ausgeliefert. Ein leeres Registry ist
    /// ein No-op, kein Fehler. Gibt die Anzahl erfolgreicher
    /// Auslieferungen zurueck.
    pub async fn senden(&self, nachricht: Nachricht) -> BroadcastResult<usize> {
        self.zustand_pruefen()?;
        match self.inner.variante {
            Variante::Standard => {
                let _schleuse = self.inner.schleuse.lock().await;
                self.senden_intern(nachricht).await
            }
            Variante::Einfach => self.senden_intern(nachricht).await,
        }
    }

    async fn senden_intern(&self, nachricht: Nachricht) -> BroadcastResult<usize> {
        let gefiltert = match self.inner.filter.anwenden(&nachricht).await {
            Some(nachricht) => nachricht,
            None => {
                tracing::debug!(id = %self.inner.id, "Nachricht von der Filterkette verworfen");
                return Ok(0);
            }
        };

        let mut ausgeliefert = 0;
        for resource in self.inner.registry.alle() {
            if resource.ausliefern(&gefiltert) {
                ausgeliefert += 1;
            }
        }
        tracing::trace!(id = %self.inner.id, anzahl = ausgeliefert, "Broadcast ausgeliefert");
        Ok(ausgeliefert)
    }

    /// Stellt eine Nachricht gezielt an eine einzelne Resource zu
    ///
    /// Die Filterkette wird nicht durchlaufen: gezielte Zustellungen sind
    /// Punkt-zu-Punkt und duerfen weder auf den Bus relayed noch von
    /// Gruppen-Filtern vetiert werden. Ein Lookup-Miss ist ein erwartetes
    /// Race (Client kann zwischen Erzeugung und Zustellung getrennt haben)
    /// und liefert `false` statt eines Fehlers.
    pub fn an_resource_senden(
        &self,
        nachricht: &Nachricht,
        resource_id: &ResourceId,
    ) -> BroadcastResult<bool> {
        self.zustand_pruefen()?;
        match self.inner.registry.suchen(resource_id) {
            Some(resource) => Ok(resource.ausliefern(nachricht)),
            None => {
                tracing::debug!(
                    id = %self.inner.id,
                    resource = %resource_id,
                    "Zustellung an unbekannte Resource verworfen"
                );
                Ok(false)
            }
        }
    }

    /// Zerstoert den Broadcaster
    ///
    /// Markiert ihn als zerstoert, laesst alle Filter in umgekehrter
    /// Registrierungs-Reihenfolge aufraeumen und schliesst danach alle
    /// Resources. Idempotent. Der prozessweite Ernte-Timer wird von der
    /// Fabrik verwaltet (siehe [`crate::fabrik::BroadcasterFabrik::zerstoeren`]).
    pub async fn zerstoeren(&self) {
        if self.inner.zerstoert.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.filter.zerstoeren_alle().await;
        self.inner.registry.leeren();
        tracing::info!(id = %self.inner.id, "Broadcaster zerstoert");
    }
}

/// Identitaets-Gleichheit: zwei Handles sind gleich wenn sie denselben
/// inneren Zustand teilen
impl PartialEq for Broadcaster {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Broadcaster {}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("id", &self.inner.id)
            .field("variante", &self.inner.variante)
            .field("resources", &self.inner.registry.anzahl())
            .field("zerstoert", &self.ist_zerstoert())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterAktion;
    use crate::testhilfe::{suspendierte_resource, MerkVerbindung};
    use async_trait::async_trait;

    fn test_broadcaster(name: &str) -> Broadcaster {
        Broadcaster::neu(Variante::Standard, BroadcasterId::neu(name))
    }

    #[tokio::test]
    async fn broadcast_erreicht_jede_resource_genau_einmal() {
        let broadcaster = test_broadcaster("fanout");
        let mut verbindungen = Vec::new();
        for _ in 0..5 {
            let (resource, verbindung) = suspendierte_resource(broadcaster.id());
            broadcaster.resource_registrieren(resource).unwrap();
            verbindungen.push(verbindung);
        }

        let anzahl = broadcaster.senden(Nachricht::text("an alle")).await.unwrap();
        assert_eq!(anzahl, 5);

        for verbindung in &verbindungen {
            assert_eq!(verbindung.empfangene(), vec![Nachricht::text("an alle")]);
        }
    }

    #[tokio::test]
    async fn leeres_registry_ist_ein_noop() {
        let broadcaster = test_broadcaster("leer");
        let anzahl = broadcaster.senden(Nachricht::text("niemand")).await.unwrap();
        assert_eq!(anzahl, 0);
    }

    #[tokio::test]
    async fn veto_filter_unterdrueckt_die_auslieferung() {
        struct Veto;
        #[async_trait]
        impl NachrichtenFilter for Veto {
            async fn filtern(&self, _original: &Nachricht, _bisher: Nachricht) -> FilterAktion {
                FilterAktion::Abbruch
            }
        }

        let broadcaster = test_broadcaster("veto");
        let (resource, verbindung) = suspendierte_resource(broadcaster.id());
        broadcaster.resource_registrieren(resource).unwrap();
        broadcaster.filter_hinzufuegen(Arc::new(Veto)).await.unwrap();

        let anzahl = broadcaster.senden(Nachricht::text("nie")).await.unwrap();
        assert_eq!(anzahl, 0);
        assert!(verbindung.empfangene().is_empty());
    }

    #[tokio::test]
    async fn transformierende_filter_wirken_vor_der_auslieferung() {
        struct Gross;
        #[async_trait]
        impl NachrichtenFilter for Gross {
            async fn filtern(&self, _original: &Nachricht, bisher: Nachricht) -> FilterAktion {
                match bisher {
                    Nachricht::Text(text) => {
                        FilterAktion::Weiter(Nachricht::Text(text.to_uppercase()))
                    }
                    andere => FilterAktion::Weiter(andere),
                }
            }
        }

        let broadcaster = test_broadcaster("transform");
        let (resource, verbindung) = suspendierte_resource(broadcaster.id());
        broadcaster.resource_registrieren(resource).unwrap();
        broadcaster.filter_hinzufuegen(Arc::new(Gross)).await.unwrap();

        broadcaster.senden(Nachricht::text("leise")).await.unwrap();
        assert_eq!(verbindung.empfangene(), vec![Nachricht::text("LEISE")]);
    }

    #[tokio::test]
    async fn gezielte_zustellung_erreicht_nur_eine_resource() {
        let broadcaster = test_broadcaster("gezielt");
        let (ziel, ziel_verbindung) = suspendierte_resource(broadcaster.id());
        let (andere, andere_verbindung) = suspendierte_resource(broadcaster.id());
        let ziel_id = ziel.id();
        broadcaster.resource_registrieren(ziel).unwrap();
        broadcaster.resource_registrieren(andere).unwrap();

        let zugestellt = broadcaster
            .an_resource_senden(&Nachricht::text("nur du"), &ziel_id)
            .unwrap();
        assert!(zugestellt);
        assert_eq!(ziel_verbindung.empfangene().len(), 1);
        assert!(andere_verbindung.empfangene().is_empty());
    }

    #[tokio::test]
    async fn gezielte_zustellung_an_unbekannte_id_ist_kein_fehler() {
        let broadcaster = test_broadcaster("miss");
        let zugestellt = broadcaster
            .an_resource_senden(&Nachricht::text("weg"), &ResourceId::new())
            .unwrap();
        assert!(!zugestellt);
    }

    #[tokio::test]
    async fn zerstoerter_broadcaster_lehnt_operationen_ab() {
        let broadcaster = test_broadcaster("kaputt");
        broadcaster.zerstoeren().await;

        assert!(matches!(
            broadcaster.senden(Nachricht::text("x")).await,
            Err(BroadcastError::Zerstoert(_))
        ));
        let (resource, _verbindung) = suspendierte_resource(broadcaster.id());
        assert!(matches!(
            broadcaster.resource_registrieren(resource),
            Err(BroadcastError::Zerstoert(_))
        ));
        assert!(matches!(
            broadcaster.an_resource_senden(&Nachricht::text("x"), &ResourceId::new()),
            Err(BroadcastError::Zerstoert(_))
        ));
    }

    #[tokio::test]
    async fn zerstoerung_schliesst_resources_und_ist_idempotent() {
        let broadcaster = test_broadcaster("ende");
        let (resource, verbindung) = suspendierte_resource(broadcaster.id());
        broadcaster.resource_registrieren(resource).unwrap();

        broadcaster.zerstoeren().await;
        broadcaster.zerstoeren().await;

        assert!(broadcaster.registry().ist_leer());
        assert!(verbindung.wurde_fortgesetzt());
    }

    #[tokio::test]
    async fn tote_verbindung_zaehlt_nicht_als_auslieferung() {
        let broadcaster = test_broadcaster("halbtot");
        let (lebendig, _v1) = suspendierte_resource(broadcaster.id());
        let tote_verbindung = MerkVerbindung::neu();
        tote_verbindung.trennen();
        let tote = crate::resource::Resource::neu(
            ResourceId::new(),
            broadcaster.id().clone(),
            tote_verbindung,
            crate::verbindung::UebertragungsModus::Streaming,
            std::time::Duration::from_secs(60),
        );
        tote.suspendieren(None);
        broadcaster.resource_registrieren(lebendig).unwrap();
        broadcaster.resource_registrieren(tote).unwrap();

        let anzahl = broadcaster.senden(Nachricht::text("wer lebt")).await.unwrap();
        assert_eq!(anzahl, 1);
    }
}
