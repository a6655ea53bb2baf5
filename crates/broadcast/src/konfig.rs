//! Engine-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass die Engine ohne Konfigurationsdatei
//! lauffaehig ist.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{BroadcastError, BroadcastResult};
use crate::fabrik::ErnteKonfig;

/// Vollstaendige Engine-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RundfunkKonfig {
    /// Heartbeat-Einstellungen
    pub heartbeat: HeartbeatEinstellungen,
    /// Ernte-Einstellungen
    pub ernte: ErnteEinstellungen,
    /// Cluster-Bus-Einstellungen
    pub bus: BusEinstellungen,
}

/// Heartbeat-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatEinstellungen {
    /// Server-seitiger Standard- und Mindestwert in Millisekunden
    pub standard_ms: u64,
}

impl Default for HeartbeatEinstellungen {
    fn default() -> Self {
        Self { standard_ms: 15_000 }
    }
}

impl HeartbeatEinstellungen {
    /// Gibt den Standard-Heartbeat als Duration zurueck
    pub fn standard(&self) -> Duration {
        Duration::from_millis(self.standard_ms)
    }

    /// Handelt den effektiven Heartbeat mit einem Client-Wunsch aus
    ///
    /// Der Server-Standard ist zugleich Untergrenze: ein kleinerer
    /// Client-Wunsch wird angehoben, ein groesserer uebernommen.
    /// Nicht-numerische oder nicht-positive Werte werden an der Grenze
    /// abgelehnt statt still auf den Standard zu fallen.
    pub fn aushandeln(&self, angefragt: Option<&str>) -> BroadcastResult<Duration> {
        let standard = self.standard();
        let Some(roh) = angefragt else {
            return Ok(standard);
        };

        let millisekunden: i64 = roh
            .trim()
            .parse()
            .map_err(|_| BroadcastError::UngueltigerHeartbeat(roh.to_string()))?;
        if millisekunden <= 0 {
            return Err(BroadcastError::UngueltigerHeartbeat(roh.to_string()));
        }

        Ok(standard.max(Duration::from_millis(millisekunden as u64)))
    }
}

/// Zeitplan des geteilten Ernte-Timers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ErnteEinstellungen {
    /// Verzoegerung bis zum ersten Durchlauf in Sekunden
    pub erste_verzoegerung_s: u64,
    /// Abstand zwischen den Durchlaeufen in Sekunden
    pub intervall_s: u64,
}

impl Default for ErnteEinstellungen {
    fn default() -> Self {
        Self {
            erste_verzoegerung_s: 30,
            intervall_s: 10,
        }
    }
}

impl ErnteEinstellungen {
    /// Uebersetzt in die Fabrik-Konfiguration
    pub fn als_konfig(&self) -> ErnteKonfig {
        ErnteKonfig {
            erste_verzoegerung: Duration::from_secs(self.erste_verzoegerung_s),
            intervall: Duration::from_secs(self.intervall_s),
        }
    }
}

/// Cluster-Bus-Einstellungen
///
/// Adresse und Credential werden unveraendert an die Bus-Implementierung
/// durchgereicht; die Engine interpretiert sie nicht.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusEinstellungen {
    /// Verbindungs-Adresse des Busses
    pub adresse: String,
    /// Bus-Thema; `None` verwendet die Broadcaster-ID
    pub kanal: Option<String>,
    /// Authentifizierungs-Credential
    pub auth: Option<String>,
}

impl Default for BusEinstellungen {
    fn default() -> Self {
        Self {
            adresse: "redis://127.0.0.1:6379".into(),
            kanal: None,
            auth: None,
        }
    }
}

impl RundfunkKonfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let konfig: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(konfig)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }
}
