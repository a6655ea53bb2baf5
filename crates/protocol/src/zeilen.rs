//! Zeilen-Adapter – Textueller Ereignis-Strom einer Client-Verbindung
//!
//! Der Strom besteht aus Paaren von Ereignis- und Datenzeile, gefolgt
//! von einer Trennzeile, bis zum Strom-Ende:
//!
//! ```text
//! Ereignis  "o" (Objekt, via Codec) | "s" (String) | "c" (Steuerung)
//! Daten     'p'<payload>  Post an die eigene Verbindung (gepuffert)
//!           'b'<payload>  Sofortiger Broadcast an die Gruppe
//!           "d"           Trennung (nur bei Ereignis "c")
//! ```
//!
//! Dekodierfehler einzelner Zeilen werden geloggt und uebersprungen;
//! der Rest des Stroms wird weiterverarbeitet. Am Strom-Ende werden
//! alle gepufferten Posts als ein Batch an die eigene Resource
//! zugestellt: eine einzelne Nachricht unverpackt, mehrere als
//! geordneter Stapel. Eine Trennungs-Anforderung wird erst danach
//! ausgefuehrt, damit gepufferte Posts die eigene Verbindung noch
//! erreichen.

use futures_util::StreamExt;
use rundfunk_broadcast::broadcaster::Broadcaster;
use rundfunk_core::nachricht::Nachricht;
use rundfunk_core::types::ResourceId;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};

use crate::codec::NachrichtenCodec;
use crate::error::{ProtokollError, ProtokollResult};

/// Uebersetzt den Zeilen-Strom eines Clients in Engine-Operationen
pub struct ZeilenAdapter<C: NachrichtenCodec> {
    broadcaster: Broadcaster,
    codec: C,
}

impl<C: NachrichtenCodec> ZeilenAdapter<C> {
    /// Erstellt einen Adapter fuer einen Broadcaster
    pub fn neu(broadcaster: Broadcaster, codec: C) -> Self {
        Self { broadcaster, codec }
    }

    /// Verarbeitet einen Ereignis-Strom bis zum Strom-Ende
    ///
    /// `resource_id` ist die eigene Verbindung des Clients; gepufferte
    /// Posts werden am Ende an sie zugestellt.
    pub async fn verarbeiten<L>(&self, leser: L, resource_id: ResourceId) -> ProtokollResult<()>
    where
        L: AsyncRead + Unpin,
    {
        let mut zeilen = FramedRead::new(leser, LinesCodec::new());
        let mut post_puffer: Vec<Nachricht> = Vec::new();
        let mut trennung_angefordert = false;

        loop {
            let Some(ereignis) = naechste_zeile(&mut zeilen).await else {
                break;
            };
            let Some(daten) = naechste_zeile(&mut zeilen).await else {
                break;
            };
            // Trennzeile; ein fehlendes Strom-Ende faellt beim naechsten
            // Ereignis auf
            let _ = naechste_zeile(&mut zeilen).await;

            tracing::trace!(
                resource = %resource_id,
                ereignis = %ereignis,
                "Zeilenpaar empfangen"
            );

            match ereignis.as_str() {
                "o" => self.daten_verarbeiten(&daten, true, &mut post_puffer).await,
                "s" => self.daten_verarbeiten(&daten, false, &mut post_puffer).await,
                "c" => {
                    if daten == "d" {
                        trennung_angefordert = true;
                    }
                }
                unbekannt => {
                    tracing::debug!(ereignis = %unbekannt, "Unbekanntes Ereignis uebersprungen");
                }
            }
        }

        if !post_puffer.is_empty() {
            let nachricht = if post_puffer.len() == 1 {
                post_puffer.remove(0)
            } else {
                Nachricht::Stapel(post_puffer)
            };
            match self.broadcaster.an_resource_senden(&nachricht, &resource_id) {
                Ok(_zugestellt) => {}
                Err(fehler) => {
                    tracing::warn!(
                        resource = %resource_id,
                        fehler = %fehler,
                        "Post-Zustellung fehlgeschlagen"
                    );
                }
            }
        }

        if trennung_angefordert {
            self.trennen(&resource_id);
        }

        Ok(())
    }

    /// Verarbeitet eine Datenzeile (`'p'`-Post oder `'b'`-Broadcast)
    async fn daten_verarbeiten(
        &self,
        daten: &str,
        mit_codec: bool,
        post_puffer: &mut Vec<Nachricht>,
    ) {
        let Some(praefix) = daten.chars().next() else {
            tracing::debug!("Leere Datenzeile uebersprungen");
            return;
        };
        let inhalt = &daten[praefix.len_utf8()..];

        match praefix {
            'p' => {
                if let Some(nachricht) = self.inhalt_dekodieren(inhalt, mit_codec) {
                    post_puffer.push(nachricht);
                }
            }
            'b' => {
                if let Some(nachricht) = self.inhalt_dekodieren(inhalt, mit_codec) {
                    if let Err(fehler) = self.broadcaster.senden(nachricht).await {
                        tracing::warn!(fehler = %fehler, "Broadcast fehlgeschlagen");
                    }
                }
            }
            unbekannt => {
                tracing::debug!(praefix = %unbekannt, "Unbekanntes Praefix uebersprungen");
            }
        }
    }

    /// Dekodiert den Inhalt hinter dem Praefix; `None` bei Codec-Fehler
    fn inhalt_dekodieren(&self, inhalt: &str, mit_codec: bool) -> Option<Nachricht> {
        if !mit_codec {
            return Some(Nachricht::Text(inhalt.to_string()));
        }
        match self.codec.dekodieren(inhalt) {
            Ok(nachricht) => Some(nachricht),
            Err(fehler) => {
                tracing::warn!(fehler = %fehler, "Payload nicht dekodierbar, Zeile uebersprungen");
                None
            }
        }
    }

    /// Trennung auf Client-Wunsch: Resource fortsetzen und austragen
    fn trennen(&self, resource_id: &ResourceId) {
        match self.broadcaster.registry().suchen(resource_id) {
            Some(resource) => {
                tracing::debug!(resource = %resource_id, "Verbindung auf Client-Wunsch fortgesetzt");
                resource.fortsetzen();
                self.broadcaster.registry().entfernen(resource_id);
            }
            None => {
                // Client kann bereits geerntet worden sein
                tracing::debug!(resource = %resource_id, "Trennung fuer unbekannte Resource");
            }
        }
    }
}

/// Liest die naechste Zeile; `None` bei Strom-Ende oder Rahmen-Fehler
///
/// Ein Rahmen-Fehler beendet den Strom, damit bereits gepufferte Posts
/// trotzdem noch zugestellt werden.
async fn naechste_zeile<L>(zeilen: &mut FramedRead<L, LinesCodec>) -> Option<String>
where
    L: AsyncRead + Unpin,
{
    match zeilen.next().await {
        None => None,
        Some(Ok(zeile)) => Some(zeile),
        Some(Err(fehler)) => {
            let fehler = ProtokollError::Rahmen(fehler.to_string());
            tracing::warn!(fehler = %fehler, "Strom wird nach Rahmen-Fehler beendet");
            None
        }
    }
}
