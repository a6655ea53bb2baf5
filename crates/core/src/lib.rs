//! rundfunk-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Rundfunk-Crates gemeinsam genutzt werden: ID-Newtypes, den
//! opaken Nachrichten-Typ und den globalen Fehler-Enum.

pub mod error;
pub mod nachricht;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, RundfunkError};
pub use nachricht::Nachricht;
pub use types::{BroadcasterId, ResourceId};
