//! rundfunk-protocol – Zeilenprotokoll und Payload-Codec
//!
//! Dieser Crate uebersetzt den textuellen Ereignis-Strom einer
//! Client-Verbindung in Operationen gegen die Broadcast-Engine:
//! Post an die eigene Verbindung, Broadcast an die Gruppe, Trennung.
//! Der Payload-Codec ist als Trait austauschbar; mitgeliefert wird
//! eine JSON-Implementierung.

pub mod codec;
pub mod error;
pub mod zeilen;

// Bequeme Re-Exporte
pub use codec::{JsonCodec, NachrichtenCodec};
pub use error::{ProtokollError, ProtokollResult};
pub use zeilen::ZeilenAdapter;
