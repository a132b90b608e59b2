//! Document store DTOs.
//!
//! These types map directly onto bus documents as stored. Documents are
//! hand-edited in the store's console, so every field is optional and
//! numbers or booleans may arrive as strings. Decoding here never fails on
//! a field; the pipeline decides what a missing value means.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A bus service document. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusDocument {
    /// Document id, assigned by the store.
    #[serde(deserialize_with = "lenient::string")]
    pub id: Option<String>,

    #[serde(deserialize_with = "lenient::string")]
    pub bus_number: Option<String>,

    #[serde(deserialize_with = "lenient::string")]
    pub operator: Option<String>,

    /// Service class (sleeper, seater, semi-sleeper, ...).
    #[serde(rename = "type", deserialize_with = "lenient::string")]
    pub bus_type: Option<String>,

    #[serde(deserialize_with = "lenient::number")]
    pub rating: Option<f64>,

    #[serde(deserialize_with = "lenient::number")]
    pub review_count: Option<f64>,

    #[serde(deserialize_with = "lenient::route")]
    pub route: Option<RouteDocument>,

    /// "HH:MM", local time.
    #[serde(deserialize_with = "lenient::string")]
    pub departure_time: Option<String>,

    /// "HH:MM", local time. Earlier than departure for overnight services.
    #[serde(deserialize_with = "lenient::string")]
    pub arrival_time: Option<String>,

    /// "Xh Ym".
    #[serde(deserialize_with = "lenient::string")]
    pub duration: Option<String>,

    #[serde(deserialize_with = "lenient::number")]
    pub total_seats: Option<f64>,

    #[serde(deserialize_with = "lenient::number")]
    pub booked_seats: Option<f64>,

    #[serde(deserialize_with = "lenient::number")]
    pub available_seats: Option<f64>,

    #[serde(deserialize_with = "lenient::number")]
    pub price: Option<f64>,

    #[serde(deserialize_with = "lenient::number")]
    pub discount_percent: Option<f64>,

    #[serde(deserialize_with = "lenient::boolean")]
    pub is_active: Option<bool>,

    #[serde(deserialize_with = "lenient::features")]
    pub features: Vec<String>,

    #[serde(deserialize_with = "lenient::boolean")]
    pub is_prime: Option<bool>,

    #[serde(deserialize_with = "lenient::boolean")]
    pub women_only: Option<bool>,

    /// Free-text operator status, e.g. "cancelled" or "delayed".
    #[serde(deserialize_with = "lenient::string")]
    pub status: Option<String>,

    #[serde(deserialize_with = "lenient::boolean")]
    pub is_cancelled: Option<bool>,

    #[serde(deserialize_with = "lenient::number")]
    pub delay_minutes: Option<f64>,
}

/// Route sub-document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteDocument {
    #[serde(deserialize_with = "lenient::string")]
    pub from: Option<String>,

    #[serde(deserialize_with = "lenient::string")]
    pub to: Option<String>,

    #[serde(deserialize_with = "lenient::number")]
    pub distance_km: Option<f64>,
}

/// Response body of a collection read: `{"documents": [...]}`.
#[derive(Debug, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub documents: Vec<Value>,
}

/// Decode a collection payload into bus documents.
///
/// Accepts either `{"documents": [...]}` or a bare array. Entries that are
/// not JSON objects cannot be bus documents and are skipped.
pub fn decode_documents(body: &str) -> Result<Vec<BusDocument>, serde_json::Error> {
    let value: Value = serde_json::from_str(body)?;
    let entries = match value {
        Value::Array(entries) => entries,
        other => serde_json::from_value::<DocumentList>(other)?.documents,
    };

    let mut documents = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            tracing::warn!(index, "skipping non-object entry in bus collection");
            continue;
        }
        match serde_json::from_value::<BusDocument>(entry) {
            Ok(doc) => documents.push(doc),
            Err(e) => tracing::warn!(index, error = %e, "skipping undecodable bus document"),
        }
    }
    Ok(documents)
}

/// Field decoders that accept the loose shapes found in hand-edited
/// documents and turn anything unusable into `None`.
mod lenient {
    use super::*;

    pub fn string<'de, D>(de: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn number<'de, D>(de: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        })
    }

    pub fn boolean<'de, D>(de: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::Bool(b) => Some(b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        })
    }

    /// Features come either as a list of tags or as a map of tag → enabled.
    pub fn features<'de, D>(de: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            Value::Object(map) => map
                .into_iter()
                .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
                .map(|(tag, _)| tag)
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn route<'de, D>(de: D) -> Result<Option<RouteDocument>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_full_document() {
        let json = r#"{
            "id": "b1",
            "busNumber": "RJ14 PA 1234",
            "operator": "Zing Travels",
            "type": "Volvo AC Sleeper",
            "rating": 4.5,
            "reviewCount": 120,
            "route": { "from": "Delhi", "to": "Jaipur", "distanceKm": 280 },
            "departureTime": "22:30",
            "arrivalTime": "04:15",
            "duration": "5h 45m",
            "totalSeats": 36,
            "bookedSeats": 20,
            "price": 1200,
            "discountPercent": 10,
            "isActive": true,
            "features": ["wifi", "charging"],
            "isPrime": true,
            "womenOnly": false,
            "someOtherField": { "nested": true }
        }"#;

        let doc: BusDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id.as_deref(), Some("b1"));
        assert_eq!(doc.bus_type.as_deref(), Some("Volvo AC Sleeper"));
        assert_eq!(doc.route.as_ref().unwrap().distance_km, Some(280.0));
        assert_eq!(doc.total_seats, Some(36.0));
        assert_eq!(doc.available_seats, None);
        assert_eq!(doc.is_active, Some(true));
        assert_eq!(doc.features, vec!["wifi", "charging"]);
        assert_eq!(doc.is_prime, Some(true));
    }

    #[test]
    fn decode_empty_document() {
        let doc: BusDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(doc, BusDocument::default());
    }

    #[test]
    fn decode_loose_shapes() {
        let json = r#"{
            "totalSeats": "40",
            "price": "abc",
            "isActive": "TRUE",
            "womenOnly": 1,
            "busNumber": 4521,
            "route": "Delhi to Agra",
            "features": { "wifi": true, "blanket": false }
        }"#;

        let doc: BusDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.total_seats, Some(40.0));
        assert_eq!(doc.price, None);
        assert_eq!(doc.is_active, Some(true));
        assert_eq!(doc.women_only, None);
        assert_eq!(doc.bus_number.as_deref(), Some("4521"));
        assert_eq!(doc.route, None);
        assert_eq!(doc.features, vec!["wifi"]);
    }

    #[test]
    fn decode_null_fields() {
        let json = r#"{ "rating": null, "route": null, "features": null }"#;
        let doc: BusDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.rating, None);
        assert_eq!(doc.route, None);
        assert!(doc.features.is_empty());
    }

    #[test]
    fn decode_documents_wrapped_and_bare() {
        let wrapped = r#"{ "documents": [ { "id": "a" }, { "id": "b" } ] }"#;
        let docs = decode_documents(wrapped).unwrap();
        assert_eq!(docs.len(), 2);

        let bare = r#"[ { "id": "a" } ]"#;
        let docs = decode_documents(bare).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn decode_documents_skips_non_objects() {
        let body = r#"[ { "id": "a" }, 42, "junk", null, { "id": "b" } ]"#;
        let docs = decode_documents(body).unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn decode_documents_rejects_invalid_json() {
        assert!(decode_documents("not json").is_err());
        assert!(decode_documents(r#"{ "documents": 3 }"#).is_err());
    }
}
