//! Resource-Registry – Broadcaster-lokale Tabelle lebender Resources
//!
//! Jeder Broadcaster besitzt genau ein Registry. Ernte, Fan-out und
//! Neuregistrierung laufen nebenlaeufig; die DashMap serialisiert nur
//! pro Shard statt ueber ein grobes globales Lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rundfunk_core::types::ResourceId;
use std::sync::Arc;

use crate::error::{BroadcastError, BroadcastResult};
use crate::resource::Resource;

/// Tabelle der lebenden Resources eines Broadcasters
pub struct ResourceRegistry {
    resources: DashMap<ResourceId, Arc<Resource>>,
}

impl ResourceRegistry {
    /// Erstellt ein neues leeres Registry
    pub fn neu() -> Self {
        Self {
            resources: DashMap::new(),
        }
    }

    /// Registriert eine Resource
    ///
    /// Schlaegt mit [`BroadcastError::DoppelteId`] fehl wenn die ID bereits
    /// vorhanden ist – doppelte Registrierung ist ein Programmierfehler,
    /// kein Laufzeit-Race.
    pub fn registrieren(&self, resource: Arc<Resource>) -> BroadcastResult<()> {
        match self.resources.entry(resource.id()) {
            Entry::Occupied(_) => Err(BroadcastError::DoppelteId(resource.id())),
            Entry::Vacant(platz) => {
                tracing::debug!(resource = %resource.id(), "Resource registriert");
                platz.insert(resource);
                Ok(())
            }
        }
    }

    /// Sucht eine Resource; `None` bei Lookup-Miss (erwartetes Race)
    pub fn suchen(&self, id: &ResourceId) -> Option<Arc<Resource>> {
        self.resources.get(id).map(|eintrag| Arc::clone(&eintrag))
    }

    /// Entfernt eine Resource; idempotent
    ///
    /// Das Entfernen einer unbekannten ID ist ein No-op.
    pub fn entfernen(&self, id: &ResourceId) -> Option<Arc<Resource>> {
        self.resources.remove(id).map(|(_, resource)| resource)
    }

    /// Entfernt alle toten Resources und schliesst sie
    ///
    /// Gibt die Anzahl der entfernten Resources zurueck. Laeuft auf dem
    /// prozessweiten Ernte-Timer der Fabrik, nebenlaeufig zu Fan-out und
    /// Registrierung.
    pub fn ernten(&self) -> usize {
        let tote: Vec<ResourceId> = self
            .resources
            .iter()
            .filter(|eintrag| !eintrag.value().ist_aktiv())
            .map(|eintrag| *eintrag.key())
            .collect();

        let mut entfernt = 0;
        for id in tote {
            if let Some((_, resource)) = self.resources.remove(&id) {
                resource.schliessen();
                entfernt += 1;
                tracing::debug!(resource = %id, "Tote Resource geerntet");
            }
        }
        entfernt
    }

    /// Schliesst und entfernt alle Resources (Broadcaster-Zerstoerung)
    pub fn leeren(&self) {
        let ids: Vec<ResourceId> = self.resources.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, resource)) = self.resources.remove(&id) {
                resource.schliessen();
            }
        }
    }

    /// Gibt alle aktuell registrierten Resources zurueck
    pub fn alle(&self) -> Vec<Arc<Resource>> {
        self.resources
            .iter()
            .map(|eintrag| Arc::clone(eintrag.value()))
            .collect()
    }

    /// Gibt die Anzahl der registrierten Resources zurueck
    pub fn anzahl(&self) -> usize {
        self.resources.len()
    }

    /// Prueft ob das Registry leer ist
    pub fn ist_leer(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testhilfe::suspendierte_resource;
    use rundfunk_core::types::BroadcasterId;

    #[test]
    fn registrieren_und_suchen() {
        let registry = ResourceRegistry::neu();
        let kanal = BroadcasterId::neu("test");
        let (resource, _verbindung) = suspendierte_resource(&kanal);
        let id = resource.id();

        registry.registrieren(resource).unwrap();
        assert!(registry.suchen(&id).is_some());
        assert_eq!(registry.anzahl(), 1);
    }

    #[test]
    fn doppelte_registrierung_schlaegt_fehl() {
        let registry = ResourceRegistry::neu();
        let kanal = BroadcasterId::neu("test");
        let (resource, _verbindung) = suspendierte_resource(&kanal);

        registry.registrieren(Arc::clone(&resource)).unwrap();
        let fehler = registry.registrieren(resource).unwrap_err();
        assert!(matches!(fehler, BroadcastError::DoppelteId(_)));
        assert_eq!(registry.anzahl(), 1);
    }

    #[test]
    fn entfernen_ist_idempotent() {
        let registry = ResourceRegistry::neu();
        let kanal = BroadcasterId::neu("test");
        let (resource, _verbindung) = suspendierte_resource(&kanal);
        let id = resource.id();
        registry.registrieren(resource).unwrap();

        assert!(registry.entfernen(&id).is_some());
        assert!(registry.entfernen(&id).is_none());
        assert!(registry.suchen(&id).is_none());
    }

    #[test]
    fn nach_entfernen_kann_neu_registriert_werden() {
        // Umzug einer Resource: explizit entfernen, dann neu registrieren
        let registry = ResourceRegistry::neu();
        let kanal = BroadcasterId::neu("test");
        let (resource, _verbindung) = suspendierte_resource(&kanal);
        let id = resource.id();

        registry.registrieren(Arc::clone(&resource)).unwrap();
        registry.entfernen(&id);
        registry.registrieren(resource).unwrap();

        assert!(registry.suchen(&id).is_some());
    }

    #[test]
    fn ernte_entfernt_nur_tote_resources() {
        let registry = ResourceRegistry::neu();
        let kanal = BroadcasterId::neu("test");

        let (lebendig, _v1) = suspendierte_resource(&kanal);
        let (tot, verbindung_tot) = suspendierte_resource(&kanal);
        let tot_id = tot.id();
        registry.registrieren(Arc::clone(&lebendig)).unwrap();
        registry.registrieren(tot).unwrap();

        // Vor der Ernte sind beide vorhanden
        assert_eq!(registry.anzahl(), 2);

        verbindung_tot.trennen();
        let entfernt = registry.ernten();

        assert_eq!(entfernt, 1);
        assert_eq!(registry.anzahl(), 1);
        assert!(registry.suchen(&tot_id).is_none());
        assert!(registry.suchen(&lebendig.id()).is_some());
    }

    #[test]
    fn ernte_schliesst_entfernte_resources() {
        let registry = ResourceRegistry::neu();
        let kanal = BroadcasterId::neu("test");
        let (resource, verbindung) = suspendierte_resource(&kanal);
        registry.registrieren(Arc::clone(&resource)).unwrap();

        verbindung.trennen();
        registry.ernten();

        // Der Transport wurde benachrichtigt (fortsetzen als Freigabe-Signal)
        assert!(verbindung.wurde_fortgesetzt());
        assert_eq!(
            resource.zustand(),
            crate::resource::ResourceZustand::Geschlossen
        );
    }

    #[test]
    fn leeren_schliesst_alle() {
        let registry = ResourceRegistry::neu();
        let kanal = BroadcasterId::neu("test");
        for _ in 0..3 {
            let (resource, _v) = suspendierte_resource(&kanal);
            registry.registrieren(resource).unwrap();
        }

        registry.leeren();
        assert!(registry.ist_leer());
    }
}
