//! Payload-Codec – Dekodieren und Kodieren von Anwendungs-Payloads
//!
//! Die Engine behandelt Nachrichten nach dem Dekodieren als opak; der
//! Codec ist die einzige Stelle, die Roh-Payloads interpretiert.

use rundfunk_core::nachricht::Nachricht;
use serde_json::Value;

use crate::error::{ProtokollError, ProtokollResult};

/// Austauschbarer Payload-Codec
pub trait NachrichtenCodec: Send + Sync + 'static {
    /// Dekodiert ein Roh-Payload in eine Nachricht
    fn dekodieren(&self, roh: &str) -> ProtokollResult<Nachricht>;

    /// Kodiert eine Nachricht in ein Roh-Payload
    fn kodieren(&self, nachricht: &Nachricht) -> ProtokollResult<String>;
}

/// JSON-Codec auf serde_json
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Erstellt einen neuen JsonCodec
    pub fn neu() -> Self {
        Self
    }
}

impl NachrichtenCodec for JsonCodec {
    fn dekodieren(&self, roh: &str) -> ProtokollResult<Nachricht> {
        let wert: Value = serde_json::from_str(roh)
            .map_err(|fehler| ProtokollError::Dekodierung(fehler.to_string()))?;
        Ok(Nachricht::Objekt(wert))
    }

    fn kodieren(&self, nachricht: &Nachricht) -> ProtokollResult<String> {
        serde_json::to_string(&als_wert(nachricht))
            .map_err(|fehler| ProtokollError::Dekodierung(fehler.to_string()))
    }
}

/// Uebersetzt eine Nachricht in ihren JSON-Wert
///
/// Ein Stapel wird zum Array, damit Clients Batch-Zustellungen ohne
/// Engine-interne Typinformation lesen koennen.
fn als_wert(nachricht: &Nachricht) -> Value {
    match nachricht {
        Nachricht::Text(text) => Value::String(text.clone()),
        Nachricht::Objekt(wert) => wert.clone(),
        Nachricht::Stapel(teile) => Value::Array(teile.iter().map(als_wert).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dekodieren_liefert_objekt() {
        let codec = JsonCodec::neu();
        let nachricht = codec.dekodieren(r#"{"text":"hallo"}"#).unwrap();
        assert_eq!(
            nachricht,
            Nachricht::Objekt(serde_json::json!({"text": "hallo"}))
        );
    }

    #[test]
    fn defektes_payload_wird_abgelehnt() {
        let codec = JsonCodec::neu();
        assert!(matches!(
            codec.dekodieren("kein json"),
            Err(ProtokollError::Dekodierung(_))
        ));
    }

    #[test]
    fn kodieren_von_text_und_objekt() {
        let codec = JsonCodec::neu();
        assert_eq!(codec.kodieren(&Nachricht::text("hi")).unwrap(), r#""hi""#);
        assert_eq!(
            codec
                .kodieren(&Nachricht::Objekt(serde_json::json!({"n": 1})))
                .unwrap(),
            r#"{"n":1}"#
        );
    }

    #[test]
    fn stapel_wird_zum_array() {
        let codec = JsonCodec::neu();
        let stapel = Nachricht::Stapel(vec![Nachricht::text("a"), Nachricht::text("b")]);
        assert_eq!(codec.kodieren(&stapel).unwrap(), r#"["a","b"]"#);
    }
}
