//! rundfunk-broadcast – Resource-Lebenszyklus und Fan-out-Engine
//!
//! Dieser Crate implementiert den Kern von Rundfunk: benannte
//! Fan-out-Gruppen (Broadcaster) mit je einem Registry gehaltener
//! Client-Verbindungen (Resources), eine geordnete Filterkette vor der
//! Auslieferung und die Cluster-Bruecke auf einen externen
//! Publish/Subscribe-Bus.
//!
//! ## Architektur
//!
//! ```text
//! BroadcasterFabrik (prozessweit, get-or-create, geteilter Ernte-Timer)
//!     |
//!     v
//! Broadcaster (benannte Fan-out-Gruppe)
//!     |  senden() -> FilterKette -> je Resource genau eine Auslieferung
//!     |
//!     +-- ResourceRegistry  (lebende Resources, periodische Ernte)
//!     +-- FilterKette       (Transformationen und Vetos, geordnet)
//!     |       +-- ClusterFilter (Bus-Bruecke mit Echo-Unterdrueckung)
//!     |
//!     v
//! Resource -> Verbindung (Transport-Trait: halten, fortsetzen, ausliefern)
//! ```
//!
//! Der Transport-Layer, der Sockets tatsaechlich offen haelt, und der
//! konkrete Bus-Client sind Kollaborateure hinter Traits; die Engine
//! implementiert beide nicht selbst.

pub mod broadcaster;
pub mod bus;
pub mod cluster;
pub mod error;
pub mod fabrik;
pub mod filter;
pub mod konfig;
pub mod kontext;
pub mod registry;
pub mod resource;
pub mod verbindung;

#[cfg(test)]
pub(crate) mod testhilfe;

// Bequeme Re-Exporte
pub use broadcaster::{Broadcaster, Variante};
pub use bus::{MemoryBus, NachrichtenBus};
pub use cluster::ClusterFilter;
pub use error::{BroadcastError, BroadcastResult};
pub use fabrik::{BroadcasterFabrik, ErnteKonfig};
pub use filter::{FilterAktion, FilterKette, NachrichtenFilter};
pub use konfig::RundfunkKonfig;
pub use registry::ResourceRegistry;
pub use resource::{Resource, ResourceZustand};
pub use verbindung::{UebertragungsModus, Verbindung};
