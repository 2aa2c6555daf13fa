/// Type definitions for the Day One JSON export format.
///
/// Only the fields the conversion needs are modelled; everything else in the
/// export is ignored by serde. A journal export looks like:
///
/// ```json
/// {
///   "metadata": { "version": "1.0" },
///   "entries": [
///     {
///       "uuid": "0A1B2C...",
///       "creationDate": "2023-05-01T10:00:00Z",
///       "timeZone": "Europe/Paris",
///       "text": "Body with ![](dayone-moment://ABC123)",
///       "starred": false,
///       "tags": ["Travel"],
///       "location": { "placeName": "...", "latitude": 48.85, "longitude": 2.35 },
///       "weather": { "conditionsDescription": "Sunny", "temperatureCelsius": 21.3, "windSpeedKPH": 9.0 },
///       "photos": [ { "md5": "...", "identifier": "ABC123", "type": "jpeg" } ]
///     }
///   ]
/// }
/// ```
///
/// Attachment binaries live next to the JSON file in `photos/`, `pdfs/`,
/// `audios/` and `videos/`, named `<md5>.<type>`.
use chrono::{DateTime, FixedOffset};
use eyre::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// One exported journal file.
#[derive(Debug, Clone, Deserialize)]
pub struct Export {
    pub entries: Vec<RawEntry>,
}

impl Export {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).wrap_err("Malformed journal export")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .wrap_err_with(|| format!("Failed to read journal: {}", path.display()))?;
        Self::from_slice(&bytes).wrap_err_with(|| format!("In {}", path.display()))
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A single journal record as exported.
///
/// `uuid`, `creationDate` and `timeZone` are required; a record without them
/// makes the whole export unreadable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    pub uuid: String,
    pub creation_date: DateTime<FixedOffset>,
    /// IANA zone name, e.g. `Europe/Paris`.
    pub time_zone: String,
    /// Entries can be blank.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Option<Location>,
    pub weather: Option<Weather>,

    pub photos: Option<Vec<Attachment>>,
    pub pdf_attachments: Option<Vec<Attachment>>,
    pub audios: Option<Vec<Attachment>>,
    pub videos: Option<Vec<Attachment>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub place_name: Option<String>,
    pub locality_name: Option<String>,
    pub administrative_area: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    /// Place components from most to least specific, skipping absent ones.
    pub fn components(&self) -> Vec<&str> {
        [
            &self.place_name,
            &self.locality_name,
            &self.administrative_area,
            &self.country,
        ]
        .into_iter()
        .filter_map(|c| c.as_deref())
        .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub conditions_description: Option<String>,
    pub temperature_celsius: Option<f64>,
    #[serde(rename = "windSpeedKPH")]
    pub wind_speed_kph: Option<f64>,
}

/// Descriptor of an attached file (photo, PDF, audio or video).
///
/// The file on disk is named after `md5`, while the entry text references
/// `identifier`. Audio descriptors carry no `type`.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub md5: String,
    pub identifier: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_entry_with_defaults() {
        let doc = json!({
            "entries": [{
                "uuid": "AAA",
                "creationDate": "2023-05-01T10:00:00Z",
                "timeZone": "Europe/Paris"
            }]
        });
        let export = Export::from_slice(doc.to_string().as_bytes()).unwrap();
        let entry = &export.entries[0];
        assert_eq!(entry.uuid, "AAA");
        assert_eq!(entry.text, "");
        assert!(!entry.starred);
        assert!(entry.tags.is_empty());
        assert!(entry.location.is_none());
        assert!(entry.photos.is_none());
    }

    #[test]
    fn missing_entries_array_is_an_error() {
        assert!(Export::from_slice(br#"{"metadata": {}}"#).is_err());
    }

    #[test]
    fn missing_time_zone_is_an_error() {
        let doc = json!({
            "entries": [{ "uuid": "AAA", "creationDate": "2023-05-01T10:00:00Z" }]
        });
        assert!(Export::from_slice(doc.to_string().as_bytes()).is_err());
    }

    #[test]
    fn location_components_skip_absent_fields() {
        let loc = Location {
            place_name: Some("Cafe".into()),
            country: Some("France".into()),
            ..Default::default()
        };
        assert_eq!(loc.components(), vec!["Cafe", "France"]);
    }

    #[test]
    fn attachment_type_is_optional() {
        let doc = json!({ "md5": "ff", "identifier": "AB" });
        let att: Attachment = serde_json::from_value(doc).unwrap();
        assert!(att.kind.is_none());
    }
}
