use crate::importer::RawEntry;
use crate::metadata::{self, Metadata};
use chrono::{DateTime, Datelike, FixedOffset};
use chrono_tz::Tz;
use eyre::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Which metadata fields go into a YAML front matter block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub enabled: bool,
    /// Lower-cased field names.
    fields: HashSet<String>,
}

impl FrontMatter {
    pub fn new<I, S>(enabled: bool, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            enabled,
            fields: fields
                .into_iter()
                .map(|f| f.as_ref().trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether `field` is rendered in the front matter rather than inline.
    pub fn holds(&self, field: &str) -> bool {
        self.enabled && self.fields.contains(&field.to_lowercase())
    }
}

/// One journal record after conversion.
#[derive(Debug, Clone)]
pub struct Entry {
    uuid: String,
    creation_date: DateTime<FixedOffset>,
    local_date: DateTime<Tz>,
    pub metadata: Metadata,
    pub text: String,
    pub front_matter: FrontMatter,
    /// Assigned by the journal processor.
    pub output_path: Option<PathBuf>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}

impl Eq for Entry {}

impl Entry {
    pub fn from_record(
        raw: &RawEntry,
        metadata: Metadata,
        text: String,
        front_matter: FrontMatter,
    ) -> Result<Self> {
        Ok(Self {
            uuid: raw.uuid.clone(),
            creation_date: raw.creation_date,
            local_date: metadata::local_date(raw)?,
            metadata,
            text,
            front_matter,
            output_path: None,
        })
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// `YYYY-MM-DD` of the local date; the file name stem before any suffix.
    pub fn date_stem(&self) -> String {
        self.local_date.format("%Y-%m-%d").to_string()
    }

    /// `<year>/<year>-<month>` from the creation date.
    pub fn relative_dir(&self) -> PathBuf {
        let year = self.creation_date.year();
        Path::new(&year.to_string()).join(format!("{}-{:02}", year, self.creation_date.month()))
    }

    /// File name of the assigned output, as used inside vault links.
    pub fn file_name(&self) -> Option<String> {
        self.output_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
    }
}
