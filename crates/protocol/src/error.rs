//! Fehlertypen fuer das Zeilenprotokoll

use thiserror::Error;

/// Fehlertyp fuer Protokoll und Codec
#[derive(Debug, Error)]
pub enum ProtokollError {
    /// IO-Fehler beim Lesen des Stroms
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Payload nicht dekodierbar
    #[error("Dekodierung fehlgeschlagen: {0}")]
    Dekodierung(String),

    /// Zeilenrahmen beschaedigt (z.B. Zeile zu lang)
    #[error("Zeilenrahmen-Fehler: {0}")]
    Rahmen(String),
}

/// Result-Typ fuer Protokoll und Codec
pub type ProtokollResult<T> = Result<T, ProtokollError>;
