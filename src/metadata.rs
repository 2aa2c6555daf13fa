use crate::importer::RawEntry;
use chrono::DateTime;
use chrono_tz::Tz;
use eyre::{Result, eyre};
use std::collections::HashSet;

/// Display name used in deep links back to the journaling app.
pub const APP_NAME: &str = "DayOne";
/// URL scheme understood by the journaling app.
pub const APP_SCHEME: &str = "dayone";

/// Well-known metadata fields, in the order they are rendered.
pub const FIELD_NAMES: [&str; 9] = [
    "created", "place", "lat", "lon", "weather", "journal", "favorite", "url", "tags",
];

/// Everything the extractor needs besides the record itself.
#[derive(Debug, Clone, Default)]
pub struct MetadataOptions {
    /// Prefix for regular tags, e.g. `#on/`.
    pub tags_prefix: String,
    /// Prefix for tags listed in `status_tags`, e.g. `#status/`.
    pub status_tags_prefix: String,
    pub ignore_tags: HashSet<String>,
    pub status_tags: HashSet<String>,
    /// Appended verbatim after the rendered tags.
    pub extra_tags: Vec<String>,
    pub journal: Option<String>,
    /// Field names stripped after everything else is populated.
    pub ignore_fields: Vec<String>,
    /// Add a `#places/Country/Area/Locality` tag derived from the location.
    pub place_tags: bool,
    /// Fields set on every entry, rendered after the well-known ones.
    pub extra_fields: Vec<(String, String)>,
}

/// Normalized metadata of one entry.
///
/// The named fields cover what the extractor knows about; `extra` holds
/// caller-injected fields and is rendered after them, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub created: Option<String>,
    pub place: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub weather: Option<String>,
    pub journal: Option<String>,
    pub favorite: Option<bool>,
    pub url: Option<String>,
    pub tags: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl Metadata {
    /// Present fields as `(name, rendered value)` pairs, in render order.
    pub fn fields(&self) -> Vec<(&str, String)> {
        let mut out: Vec<(&str, String)> = Vec::new();
        if let Some(v) = &self.created {
            out.push(("created", v.clone()));
        }
        if let Some(v) = &self.place {
            out.push(("place", v.clone()));
        }
        if let Some(v) = self.lat {
            out.push(("lat", coordinate(v)));
        }
        if let Some(v) = self.lon {
            out.push(("lon", coordinate(v)));
        }
        if let Some(v) = &self.weather {
            out.push(("weather", v.clone()));
        }
        if let Some(v) = &self.journal {
            out.push(("journal", v.clone()));
        }
        if let Some(v) = self.favorite {
            out.push(("favorite", v.to_string()));
        }
        if let Some(v) = &self.url {
            out.push(("url", v.clone()));
        }
        if let Some(v) = &self.tags {
            out.push(("tags", v.clone()));
        }
        for (k, v) in &self.extra {
            out.push((k.as_str(), v.clone()));
        }
        out
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Add or replace an overflow field. Well-known names are not accepted
    /// here, they have typed setters.
    pub fn insert_extra(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        if is_builtin_field(&name) {
            return Err(eyre!("'{}' is a built-in metadata field", name));
        }
        let value = value.into();
        match self.extra.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.extra.push((name, value)),
        }
        Ok(())
    }

    /// Drop a field by name (case-insensitive). Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let name = name.to_lowercase();
        match name.as_str() {
            "created" => self.created.take().is_some(),
            "place" => self.place.take().is_some(),
            "lat" => self.lat.take().is_some(),
            "lon" => self.lon.take().is_some(),
            "weather" => self.weather.take().is_some(),
            "journal" => self.journal.take().is_some(),
            "favorite" => self.favorite.take().is_some(),
            "url" => self.url.take().is_some(),
            "tags" => self.tags.take().is_some(),
            _ => {
                let before = self.extra.len();
                self.extra.retain(|(k, _)| k.to_lowercase() != name);
                before != self.extra.len()
            }
        }
    }
}

pub fn is_builtin_field(name: &str) -> bool {
    FIELD_NAMES.iter().any(|f| f.eq_ignore_ascii_case(name))
}

/// Coordinates keep a decimal point even when integral: `48.0`, not `48`.
fn coordinate(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// The entry's creation time expressed in the zone the entry was written in.
pub fn local_date(raw: &RawEntry) -> Result<DateTime<Tz>> {
    let tz: Tz = raw.time_zone.parse().map_err(|e| {
        eyre!(
            "Entry {} has an invalid time zone {:?}: {}",
            raw.uuid,
            raw.time_zone,
            e
        )
    })?;
    Ok(raw.creation_date.with_timezone(&tz))
}

/// Build the metadata of one record.
pub fn extract(raw: &RawEntry, opts: &MetadataOptions) -> Result<Metadata> {
    let local = local_date(raw)?;
    let mut meta = Metadata {
        created: Some(local.format("%Y-%m-%dT%H:%M:%S%:z").to_string()),
        ..Default::default()
    };

    if let Some(location) = &raw.location {
        let components = location.components();
        if !components.is_empty() {
            meta.place = Some(components.join(", "));
        }
        if let (Some(lat), Some(lon)) = (location.latitude, location.longitude) {
            meta.lat = Some(lat);
            meta.lon = Some(lon);
        }
    }

    // Partial weather reports are dropped entirely
    if let Some(w) = &raw.weather
        && let (Some(desc), Some(temp), Some(wind)) = (
            &w.conditions_description,
            w.temperature_celsius,
            w.wind_speed_kph,
        )
    {
        meta.weather = Some(format!("{}, {:.1}°C, {:.1} km/h wind", desc, temp, wind));
    }

    meta.journal = opts.journal.clone();

    let tags = render_tags(raw, opts);
    if !tags.is_empty() {
        meta.tags = Some(tags.join(", "));
    }

    meta.favorite = Some(raw.starred);

    if !raw.uuid.is_empty() {
        meta.url = Some(format!(
            "[{}]({}://view?entryId={})",
            APP_NAME, APP_SCHEME, raw.uuid
        ));
    }

    for (name, value) in &opts.extra_fields {
        meta.insert_extra(name.as_str(), value.as_str())?;
    }

    for field in &opts.ignore_fields {
        meta.remove(field);
    }

    Ok(meta)
}

/// General tags, then the place tag, then status tags, then extra tags.
fn render_tags(raw: &RawEntry, opts: &MetadataOptions) -> Vec<String> {
    let mut seen = HashSet::new();
    let tags: Vec<&str> = raw
        .tags
        .iter()
        .map(String::as_str)
        .filter(|t| seen.insert(*t))
        .collect();

    let mut out: Vec<String> = tags
        .iter()
        .filter(|t| !opts.ignore_tags.contains(**t) && !opts.status_tags.contains(**t))
        .map(|t| prefixed_tag(&opts.tags_prefix, t))
        .collect();

    if opts.place_tags
        && let Some(location) = &raw.location
    {
        // Country first, down to the locality; the place name itself is too specific
        let path: Vec<String> = [
            &location.country,
            &location.administrative_area,
            &location.locality_name,
        ]
        .into_iter()
        .flatten()
        .map(|c| capitalize(c))
        .collect();
        if !path.is_empty() {
            out.push(format!("#places/{}", path.join("/")));
        }
    }

    out.extend(
        tags.iter()
            .filter(|t| opts.status_tags.contains(**t))
            .map(|t| prefixed_tag(&opts.status_tags_prefix, t)),
    );
    out.extend(opts.extra_tags.iter().cloned());
    out
}

fn prefixed_tag(prefix: &str, tag: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("#{}", capitalize(tag))
    } else {
        capitalize(&format!("{}/{}", prefix, tag))
    }
}

/// Upper-case the first letter of every word and drop the spaces between
/// words. Each `/`-separated segment is handled on its own, and leading
/// symbols such as `#` are kept: `#on/hello world` becomes `#On/HelloWorld`.
pub fn capitalize(s: &str) -> String {
    s.split('/')
        .map(|segment| segment.split(' ').map(capitalize_word).collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}

fn capitalize_word(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut done = false;
    for c in word.chars() {
        if !done && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
            done = true;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{Location, Weather};
    use chrono::{DateTime, FixedOffset};

    fn raw(tags: &[&str]) -> RawEntry {
        RawEntry {
            uuid: "ABCDEF0123".into(),
            creation_date: DateTime::<FixedOffset>::parse_from_rfc3339("2023-05-01T22:30:00Z")
                .unwrap(),
            time_zone: "Europe/Paris".into(),
            text: String::new(),
            starred: false,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            location: None,
            weather: None,
            photos: None,
            pdf_attachments: None,
            audios: None,
            videos: None,
        }
    }

    fn opts() -> MetadataOptions {
        MetadataOptions {
            tags_prefix: "#on/".into(),
            status_tags_prefix: "#status/".into(),
            ..Default::default()
        }
    }

    #[test]
    fn created_is_in_the_entry_time_zone() {
        let meta = extract(&raw(&[]), &opts()).unwrap();
        // 22:30 UTC is past midnight in Paris (UTC+2 in May)
        assert_eq!(meta.created.as_deref(), Some("2023-05-02T00:30:00+02:00"));
    }

    #[test]
    fn invalid_time_zone_fails() {
        let mut r = raw(&[]);
        r.time_zone = "Mars/Olympus".into();
        assert!(extract(&r, &opts()).is_err());
    }

    #[test]
    fn favorite_is_always_present() {
        let mut r = raw(&[]);
        assert_eq!(extract(&r, &opts()).unwrap().get("favorite").as_deref(), Some("false"));
        r.starred = true;
        assert_eq!(extract(&r, &opts()).unwrap().get("favorite").as_deref(), Some("true"));
    }

    #[test]
    fn location_joins_present_components() {
        let mut r = raw(&[]);
        r.location = Some(Location {
            place_name: Some("Louvre".into()),
            administrative_area: Some("Ile-de-France".into()),
            country: Some("France".into()),
            latitude: Some(48.86),
            longitude: None,
            ..Default::default()
        });
        let meta = extract(&r, &opts()).unwrap();
        assert_eq!(meta.place.as_deref(), Some("Louvre, Ile-de-France, France"));
        assert!(meta.lat.is_none());
        assert!(meta.lon.is_none());
    }

    #[test]
    fn weather_requires_all_three_fields() {
        let mut r = raw(&[]);
        r.weather = Some(Weather {
            conditions_description: Some("Sunny".into()),
            temperature_celsius: Some(21.34),
            wind_speed_kph: Some(9.0),
        });
        let meta = extract(&r, &opts()).unwrap();
        assert_eq!(meta.weather.as_deref(), Some("Sunny, 21.3°C, 9.0 km/h wind"));

        r.weather = Some(Weather {
            conditions_description: Some("Sunny".into()),
            temperature_celsius: Some(21.34),
            wind_speed_kph: None,
        });
        let meta = extract(&r, &opts()).unwrap();
        assert!(meta.weather.is_none());
        assert!(meta.get("weather").is_none());
    }

    #[test]
    fn tags_are_grouped_general_status_extra() {
        let r = raw(&["Travel", "to do", "private", "hello world"]);
        let mut o = opts();
        o.ignore_tags.insert("private".into());
        o.status_tags.insert("to do".into());
        o.extra_tags.push("#dayone".into());
        let meta = extract(&r, &o).unwrap();
        assert_eq!(
            meta.tags.as_deref(),
            Some("#On/Travel, #On/HelloWorld, #Status/ToDo, #dayone")
        );
    }

    #[test]
    fn no_tags_means_no_field() {
        let mut o = opts();
        o.ignore_tags.insert("Travel".into());
        let meta = extract(&raw(&["Travel"]), &o).unwrap();
        assert!(meta.tags.is_none());
    }

    #[test]
    fn place_tag_goes_from_country_down() {
        let mut r = raw(&[]);
        r.location = Some(Location {
            place_name: Some("Louvre".into()),
            locality_name: Some("paris".into()),
            country: Some("France".into()),
            ..Default::default()
        });
        let mut o = opts();
        o.place_tags = true;
        let meta = extract(&r, &o).unwrap();
        assert_eq!(meta.tags.as_deref(), Some("#places/France/Paris"));
    }

    #[test]
    fn place_tag_without_place_name_keeps_the_locality() {
        let mut r = raw(&[]);
        r.location = Some(Location {
            locality_name: Some("Lyon".into()),
            administrative_area: Some("Rhone".into()),
            country: Some("France".into()),
            ..Default::default()
        });
        let mut o = opts();
        o.place_tags = true;
        let meta = extract(&r, &o).unwrap();
        assert_eq!(meta.tags.as_deref(), Some("#places/France/Rhone/Lyon"));
    }

    #[test]
    fn integral_coordinates_keep_a_decimal() {
        let mut r = raw(&[]);
        r.location = Some(Location {
            latitude: Some(48.0),
            longitude: Some(-2.25),
            ..Default::default()
        });
        let meta = extract(&r, &opts()).unwrap();
        assert_eq!(meta.get("lat").as_deref(), Some("48.0"));
        assert_eq!(meta.get("lon").as_deref(), Some("-2.25"));
    }

    #[test]
    fn extra_fields_follow_the_known_ones() {
        let mut o = opts();
        o.extra_fields = vec![("source".into(), "export".into())];
        o.ignore_fields = vec!["url".into()];
        let meta = extract(&raw(&[]), &o).unwrap();
        let fields = meta.fields();
        assert_eq!(fields.last(), Some(&("source", "export".to_string())));

        o.ignore_fields.push("Source".into());
        assert!(extract(&raw(&[]), &o).unwrap().get("source").is_none());

        o.extra_fields = vec![("Journal".into(), "x".into())];
        assert!(extract(&raw(&[]), &o).is_err());
    }

    #[test]
    fn url_links_back_to_the_app() {
        let meta = extract(&raw(&[]), &opts()).unwrap();
        assert_eq!(
            meta.url.as_deref(),
            Some("[DayOne](dayone://view?entryId=ABCDEF0123)")
        );
    }

    #[test]
    fn ignored_fields_are_stripped_last() {
        let mut o = opts();
        o.journal = Some("Travel".into());
        o.ignore_fields = vec!["URL".into(), "favorite".into(), "journal".into()];
        let meta = extract(&raw(&[]), &o).unwrap();
        let names: Vec<&str> = meta.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["created"]);
    }

    #[test]
    fn capitalize_joins_words() {
        assert_eq!(capitalize("hello world"), "HelloWorld");
        assert_eq!(capitalize("#on/hello world"), "#On/HelloWorld");
        assert_eq!(capitalize("2023 trip"), "2023Trip");
    }

    #[test]
    fn capitalize_is_idempotent() {
        for s in ["hello world", "#on/Travel", "  spaced   out ", "ünïcode wörds", "#status/to do"] {
            let once = capitalize(s);
            assert_eq!(capitalize(&once), once);
        }
    }

    #[test]
    fn extra_fields_keep_insertion_order() {
        let mut meta = Metadata::default();
        meta.insert_extra("mood", "good").unwrap();
        meta.insert_extra("activity", "walk").unwrap();
        meta.insert_extra("mood", "great").unwrap();
        assert!(meta.insert_extra("Tags", "x").is_err());
        assert_eq!(
            meta.fields(),
            vec![("mood", "great".to_string()), ("activity", "walk".to_string())]
        );
        assert!(meta.remove("MOOD"));
        assert!(!meta.remove("mood"));
    }
}
