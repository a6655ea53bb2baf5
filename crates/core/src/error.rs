//! Fehlertypen fuer Rundfunk
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Rundfunk
pub type Result<T> = std::result::Result<T, RundfunkError>;

/// Alle moeglichen Fehler im Rundfunk-System
#[derive(Debug, Error)]
pub enum RundfunkError {
    // --- Verbindung & Transport ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Nachrichten ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Ressourcen ---
    #[error("Broadcaster nicht gefunden: {0}")]
    BroadcasterNichtGefunden(String),

    #[error("Resource nicht gefunden: {0}")]
    ResourceNichtGefunden(String),

    // --- Cluster-Bus ---
    #[error("Bus-Fehler: {0}")]
    Bus(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RundfunkError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Getrennt(_) | Self::Bus(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = RundfunkError::Bus("Subscribe abgelehnt".into());
        assert_eq!(e.to_string(), "Bus-Fehler: Subscribe abgelehnt");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(RundfunkError::Bus("test".into()).ist_wiederholbar());
        assert!(!RundfunkError::Konfiguration("test".into()).ist_wiederholbar());
    }
}
