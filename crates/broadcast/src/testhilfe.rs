//! Testhilfen – Aufzeichnende Verbindung fuer Unit-Tests

use parking_lot::Mutex;
use rundfunk_core::nachricht::Nachricht;
use rundfunk_core::types::{BroadcasterId, ResourceId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::resource::Resource;
use crate::verbindung::{UebertragungsModus, Verbindung};

/// Verbindung, die Auslieferungen aufzeichnet statt zu senden
pub(crate) struct MerkVerbindung {
    verbunden: AtomicBool,
    fortgesetzt: AtomicBool,
    empfangen: Mutex<Vec<Nachricht>>,
}

impl MerkVerbindung {
    pub(crate) fn neu() -> Arc<Self> {
        Arc::new(Self {
            verbunden: AtomicBool::new(true),
            fortgesetzt: AtomicBool::new(false),
            empfangen: Mutex::new(Vec::new()),
        })
    }

    /// Simuliert einen Transport-Abriss
    pub(crate) fn trennen(&self) {
        self.verbunden.store(false, Ordering::SeqCst);
    }

    pub(crate) fn wurde_fortgesetzt(&self) -> bool {
        self.fortgesetzt.load(Ordering::SeqCst)
    }

    pub(crate) fn empfangene(&self) -> Vec<Nachricht> {
        self.empfangen.lock().clone()
    }
}

impl Verbindung for MerkVerbindung {
    fn suspendieren(&self, _zeitlimit: Option<Duration>) {}

    fn fortsetzen(&self) {
        self.fortgesetzt.store(true, Ordering::SeqCst);
    }

    fn ist_verbunden(&self) -> bool {
        self.verbunden.load(Ordering::SeqCst)
    }

    fn ausliefern(&self, nachricht: &Nachricht) -> bool {
        if !self.ist_verbunden() {
            return false;
        }
        self.empfangen.lock().push(nachricht.clone());
        true
    }
}

/// Erstellt eine bereits suspendierte Streaming-Resource mit Merk-Transport
pub(crate) fn suspendierte_resource(
    broadcaster: &BroadcasterId,
) -> (Arc<Resource>, Arc<MerkVerbindung>) {
    let verbindung = MerkVerbindung::neu();
    let resource = Resource::neu(
        ResourceId::new(),
        broadcaster.clone(),
        verbindung.clone(),
        UebertragungsModus::Streaming,
        Duration::from_secs(60),
    );
    resource.suspendieren(None);
    (resource, verbindung)
}
