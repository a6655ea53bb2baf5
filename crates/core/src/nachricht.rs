//! Nachrichten-Typ – Opake Push-Nachricht
//!
//! Die Engine behandelt Nachrichten nach dem Dekodieren als opak: sie
//! werden gefiltert, ueber den Bus transportiert und an Verbindungen
//! ausgeliefert, aber nie inhaltlich interpretiert. Fuer die
//! Echo-Unterdrueckung im Cluster-Betrieb traegt jede Nachricht einen
//! inhaltsbasierten Fingerabdruck.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Eine Push-Nachricht
///
/// `Stapel` entsteht, wenn ein Client mehrere Post-Nachrichten in einem
/// Request uebertraegt; die Reihenfolge innerhalb des Stapels bleibt
/// erhalten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Nachricht {
    /// Unstrukturierter Text
    Text(String),
    /// Dekodiertes strukturiertes Payload
    Objekt(serde_json::Value),
    /// Geordnete Folge von Nachrichten (Batch-Auslieferung)
    Stapel(Vec<Nachricht>),
}

impl Nachricht {
    /// Erstellt eine Textnachricht
    pub fn text(inhalt: impl Into<String>) -> Self {
        Self::Text(inhalt.into())
    }

    /// Inhaltsbasierter Fingerabdruck fuer die Echo-Unterdrueckung
    ///
    /// Zwei Nachrichten mit gleichem Inhalt liefern denselben Wert. Der
    /// Fingerabdruck wird ueber die kanonische JSON-Kodierung gebildet,
    /// damit lokal erzeugte und vom Bus empfangene Exemplare derselben
    /// Nachricht uebereinstimmen.
    pub fn fingerprint(&self) -> u64 {
        let kanonisch = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = DefaultHasher::new();
        kanonisch.hash(&mut hasher);
        hasher.finish()
    }
}

impl From<&str> for Nachricht {
    fn from(inhalt: &str) -> Self {
        Self::Text(inhalt.to_string())
    }
}
