use crate::entry::FrontMatter;
use crate::journal::JournalSummary;
use crate::metadata::{self, MetadataOptions};
use eyre::{Context, Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Marks a journal file as already converted: `_<n>_<name>.json`.
static CONSUMED_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^_\d+_").unwrap());

pub const DEFAULT_TAGS_PREFIX: &str = "#on/";
pub const DEFAULT_STATUS_TAGS_PREFIX: &str = "#status/";
pub const DEFAULT_ENTRIES_SEPARATOR: &str = "---\n---";
pub const DEFAULT_YAML_FIELDS: [&str; 5] = ["created", "place", "lat", "lon", "tags"];

/// Configuration required to run the export process.
/// This decouples the logic from how the arguments were parsed (CLI/Config file).
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Folder holding the `*.json` exports and their attachment folders.
    pub source_dir: PathBuf,
    /// Where `<journal>/` output folders are created.
    pub target_dir: PathBuf,
    pub yaml: bool,
    pub yaml_fields: Vec<String>,
    pub convert_links: bool,
    pub merge_entries: bool,
    pub entries_separator: String,
    pub tags_prefix: String,
    pub status_tags_prefix: String,
    pub ignore_tags: HashSet<String>,
    pub status_tags: HashSet<String>,
    pub extra_tags: Vec<String>,
    pub ignore_fields: Vec<String>,
    pub place_tags: bool,
    /// `(name, value)` fields added to every entry.
    pub extra_fields: Vec<(String, String)>,
    /// Existing vault to check before writing. When unset, a leftover
    /// journal output folder is deleted instead.
    pub vault: Option<PathBuf>,
    /// Write entries even if the vault already has them.
    pub force: bool,
    pub verbose: u8,
    pub quiet: bool,
}

impl ExportConfig {
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        let source_dir = source_dir.into();
        Self {
            target_dir: source_dir.clone(),
            source_dir,
            yaml: false,
            yaml_fields: DEFAULT_YAML_FIELDS.iter().map(|f| f.to_string()).collect(),
            convert_links: false,
            merge_entries: false,
            entries_separator: DEFAULT_ENTRIES_SEPARATOR.to_string(),
            tags_prefix: DEFAULT_TAGS_PREFIX.to_string(),
            status_tags_prefix: DEFAULT_STATUS_TAGS_PREFIX.to_string(),
            ignore_tags: HashSet::new(),
            status_tags: HashSet::new(),
            extra_tags: Vec::new(),
            ignore_fields: Vec::new(),
            place_tags: false,
            extra_fields: Vec::new(),
            vault: None,
            force: false,
            verbose: 0,
            quiet: false,
        }
    }

    pub fn metadata_options(&self, journal: &str) -> MetadataOptions {
        MetadataOptions {
            tags_prefix: self.tags_prefix.clone(),
            status_tags_prefix: self.status_tags_prefix.clone(),
            ignore_tags: self.ignore_tags.clone(),
            status_tags: self.status_tags.clone(),
            extra_tags: self.extra_tags.clone(),
            journal: Some(journal.to_string()),
            ignore_fields: self.ignore_fields.clone(),
            place_tags: self.place_tags,
            extra_fields: self.extra_fields.clone(),
        }
    }

    pub fn front_matter(&self) -> FrontMatter {
        FrontMatter::new(self.yaml, &self.yaml_fields)
    }
}

/// Entry progress bar shared by every journal of a run.
pub fn make_bar(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} entries ({percent}%)",
        )
        .wrap_err("Invalid progress bar template")?
        .progress_chars("=>-"),
    );
    Ok(bar)
}

pub fn report_totals(totals: &JournalSummary, journals: usize, errors: usize) {
    let mut summary = format!(
        "Done. {} journal(s), {} entries: {} written, {} merged, {} skipped, {} attachment(s) renamed.",
        journals,
        totals.entries,
        totals.written,
        totals.merged,
        totals.skipped,
        totals.renamed_attachments
    );
    if errors > 0 {
        summary.push_str(&format!(" Completed with {} error(s).", errors));
    }
    eprintln!("{}", summary);
}

/// Journal exports in `dir` that have not been converted yet, sorted by name.
pub fn discover_journals(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).wrap_err_with(|| format!("Failed to read folder: {}", dir.display()))?;
    let mut journals: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .filter(|p| !is_consumed(p))
        .collect();
    journals.sort();
    Ok(journals)
}

pub fn is_consumed(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| CONSUMED_PREFIX.is_match(&n.to_string_lossy()))
}

/// Rename a converted journal to `_<n>_<name>` with the first free `n`,
/// so the next run leaves it alone.
pub fn mark_consumed(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| eyre!("Not a file: {}", path.display()))?
        .to_string_lossy()
        .into_owned();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut n = 1usize;
    let target = loop {
        let candidate = parent.join(format!("_{}_{}", n, name));
        if !candidate.exists() {
            break candidate;
        }
        n += 1;
    };

    fs::rename(path, &target).wrap_err_with(|| {
        format!(
            "Failed to rename {} to {}",
            path.display(),
            target.display()
        )
    })?;
    Ok(target)
}

/// Read a tag list file: one tag per line, blank lines and `#` comments skipped.
pub fn read_tag_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read tag list: {}", path.display()))?;
    Ok(parse_tag_list(&content))
}

/// Parse a `name=value` field given on the command line or in the config.
pub fn parse_field(spec: &str) -> Result<(String, String)> {
    let (name, value) = spec
        .split_once('=')
        .ok_or_else(|| eyre!("Expected NAME=VALUE, got {:?}", spec))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(eyre!("Field name missing in {:?}", spec));
    }
    if metadata::is_builtin_field(name) {
        return Err(eyre!("'{}' is a built-in metadata field", name));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn parse_tag_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        // a bare `#tag` line is a tag, `# ...` is a comment
        .filter(|l| !l.is_empty() && !l.starts_with("# "))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn discovery_skips_consumed_and_non_json() {
        let tmp = tempdir().unwrap();
        for name in ["Journal.json", "_1_Old.json", "notes.txt", "Admin.json"] {
            fs::write(tmp.path().join(name), "{}").unwrap();
        }
        fs::create_dir(tmp.path().join("photos")).unwrap();

        let found = discover_journals(tmp.path()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Admin.json", "Journal.json"]);
    }

    #[test]
    fn mark_consumed_picks_next_free_prefix() {
        let tmp = tempdir().unwrap();
        let journal = tmp.path().join("Journal.json");
        fs::write(&journal, "{}").unwrap();
        fs::write(tmp.path().join("_1_Journal.json"), "{}").unwrap();

        let target = mark_consumed(&journal).unwrap();
        assert_eq!(target, tmp.path().join("_2_Journal.json"));
        assert!(!journal.exists());
        assert!(is_consumed(&target));
    }

    #[test]
    fn tag_list_skips_blanks_and_comments() {
        let tags = parse_tag_list("# ignored tags\nprivate\n\n  draft  \n#keep\n");
        assert_eq!(tags, vec!["private", "draft", "#keep"]);
    }

    #[test]
    fn fields_are_name_value_pairs() {
        assert_eq!(
            parse_field("mood = good=ish").unwrap(),
            ("mood".to_string(), "good=ish".to_string())
        );
        assert!(parse_field("mood").is_err());
        assert!(parse_field("=x").is_err());
        assert!(parse_field("Tags=x").is_err());
    }

    #[test]
    fn defaults() {
        let cfg = ExportConfig::new("/tmp/export");
        assert_eq!(cfg.target_dir, cfg.source_dir);
        assert_eq!(cfg.tags_prefix, "#on/");
        assert_eq!(cfg.entries_separator, "---\n---");
        assert!(!cfg.front_matter().enabled);
        assert!(cfg.vault.is_none());
    }
}
