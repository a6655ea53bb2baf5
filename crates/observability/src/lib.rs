//! rundfunk-observability – Structured Logging fuer Rundfunk
//!
//! Stellt das Logging-Setup via tracing-subscriber bereit. Weitere
//! Observability-Flaechen (Metriken, Health) liegen bewusst ausserhalb
//! der Engine.

pub mod logging;

pub use logging::logging_initialisieren;
