use crate::entry::Entry;
use crate::exporter::{self, render_entry};
use crate::importer::Export;
use crate::links::{self, LinkIndex};
use crate::metadata;
use crate::sanitize::{self, AttachmentKind};
use crate::utils::{self, ExportConfig};
use eyre::{Context, Result, eyre};
use indexmap::IndexMap;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::fs;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

/// Counts for one converted journal (or, summed, for a whole run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JournalSummary {
    pub entries: usize,
    pub written: usize,
    pub merged: usize,
    pub skipped: usize,
    pub renamed_attachments: usize,
}

impl AddAssign for JournalSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.entries += rhs.entries;
        self.written += rhs.written;
        self.merged += rhs.merged;
        self.skipped += rhs.skipped;
        self.renamed_attachments += rhs.renamed_attachments;
    }
}

/// Output of the first pass: every entry with its final path, in source
/// order, and the UUID → file name index built along the way.
#[derive(Debug, Default)]
pub struct FirstPass {
    pub entries: IndexMap<String, Entry>,
    pub links: LinkIndex,
    pub summary: JournalSummary,
}

/// The journal name: the file stem of the export.
pub fn journal_name(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| eyre!("Cannot derive a journal name from {}", path.display()))
}

/// Convert one journal export end to end.
///
/// Any malformed entry aborts the whole journal; the export file is then
/// left under its original name. On success it is renamed so the next run
/// skips it.
pub fn process_journal(
    path: &Path,
    config: &ExportConfig,
    pb: &ProgressBar,
) -> Result<JournalSummary> {
    let name = journal_name(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let export = Export::from_path(path)?;

    if config.verbose > 0 {
        pb.println(format!(
            "{}: {} entries",
            path.display(),
            export.entries.len()
        ));
    }
    pb.inc_length(export.entries.len() as u64);

    guard_attachment_dirs(&name, base_dir, config)?;

    // Nothing on disk is removed until every entry converted cleanly
    let first = build_entries(&export, &name, base_dir, config, pb)?;
    prepare_output(&name, config, pb)?;
    let mut summary = first.summary;
    summary.written = write_entries(first.entries, &first.links, config)?;

    let consumed = utils::mark_consumed(path)?;
    if config.verbose > 0 {
        pb.println(format!("Marked as converted: {}", consumed.display()));
    }

    Ok(summary)
}

/// Refuse a journal whose output folder would be one of the attachment
/// folders of the export, e.g. `photos.json` next to `photos/`.
fn guard_attachment_dirs(name: &str, base_dir: &Path, config: &ExportConfig) -> Result<()> {
    if !same_dir(&config.target_dir, base_dir) {
        return Ok(());
    }
    match AttachmentKind::ALL
        .iter()
        .find(|kind| kind.dir().eq_ignore_ascii_case(name))
    {
        Some(kind) => Err(eyre!(
            "Journal '{}' would be written into the {} attachment folder; rename the export or use --target-dir",
            name,
            kind.dir()
        )),
        None => Ok(()),
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Without a vault to check against, a folder left by an earlier run is
/// removed so it gets rebuilt from scratch.
fn prepare_output(name: &str, config: &ExportConfig, pb: &ProgressBar) -> Result<()> {
    if config.vault.is_some() {
        return Ok(());
    }
    let journal_dir = config.target_dir.join(name);
    if journal_dir.exists() {
        if config.verbose > 0 {
            pb.println(format!("Deleting existing folder: {}", journal_dir.display()));
        }
        fs::remove_dir_all(&journal_dir)
            .wrap_err_with(|| format!("Failed to delete: {}", journal_dir.display()))?;
    }
    Ok(())
}

/// First pass: build every entry, assign output paths resolving same-day
/// collisions, and record each final file name in the link index.
pub fn build_entries(
    export: &Export,
    name: &str,
    base_dir: &Path,
    config: &ExportConfig,
    pb: &ProgressBar,
) -> Result<FirstPass> {
    let meta_opts = config.metadata_options(name);
    let front_matter = config.front_matter();

    let mut pass = FirstPass::default();
    // Stems taken by entries skipped because the vault already has them
    let mut claimed: HashSet<String> = HashSet::new();

    for raw in &export.entries {
        pass.summary.entries += 1;
        pb.inc(1);

        let meta = metadata::extract(raw, &meta_opts)?;
        let sanitized = sanitize::sanitize(raw, base_dir)
            .wrap_err_with(|| format!("Failed to process attachments of entry {}", raw.uuid))?;
        if config.verbose > 1 {
            for (from, to) in &sanitized.renamed {
                pb.println(format!("Renamed {} to {}", from.display(), to.display()));
            }
        }
        pass.summary.renamed_attachments += sanitized.renamed.len();

        let mut entry = Entry::from_record(raw, meta, sanitized.text, front_matter.clone())?;
        let date = entry.date_stem();
        let dir = PathBuf::from(name).join(entry.relative_dir());
        let mut stem = date.clone();

        if pass.entries.contains_key(&stem) || claimed.contains(&stem) {
            if config.verbose > 1 {
                pb.println(format!("Found another entry with the same date '{}'", date));
            }
            if config.merge_entries {
                if let Some(mut previous) = pass.entries.shift_remove(&stem) {
                    // The file name carries the date now; the newer entry keeps its own
                    previous.metadata.remove("created");
                    entry.text = format!(
                        "{}\n\n{}\n\n{}",
                        render_entry(&previous, false).trim_end(),
                        config.entries_separator,
                        entry.text
                    );
                    pass.summary.merged += 1;
                }
            } else {
                stem = free_stem(&date, |s| {
                    pass.entries.contains_key(s) || claimed.contains(s)
                });
            }
        }

        let relative = dir.join(format!("{}.md", stem));

        if let Some(vault) = &config.vault
            && !config.force
            && vault.join(&relative).exists()
        {
            if config.verbose > 1 {
                pb.println(format!("Already in vault, skipping: {}", relative.display()));
            }
            pass.summary.skipped += 1;
            claimed.insert(stem);
            continue;
        }

        entry.output_path = Some(config.target_dir.join(&relative));
        if let Some(file_name) = entry.file_name() {
            pass.links.insert(entry.uuid(), file_name);
        }
        pass.entries.insert(stem, entry);
    }

    Ok(pass)
}

/// First `<date><suffix>` not taken, with suffixes `a`, `b`, ... `z`, `aa`, ...
fn free_stem(date: &str, taken: impl Fn(&str) -> bool) -> String {
    (0..)
        .map(|n| format!("{}{}", date, alpha_suffix(n)))
        .find(|s| !taken(s))
        .unwrap_or_else(|| date.to_string())
}

fn alpha_suffix(mut n: usize) -> String {
    let mut out = String::new();
    loop {
        out.insert(0, char::from(b'a' + (n % 26) as u8));
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out
}

/// Second pass: rewrite cross-entry links and write every entry.
pub fn write_entries(
    entries: IndexMap<String, Entry>,
    links: &LinkIndex,
    config: &ExportConfig,
) -> Result<usize> {
    let mut written = 0;
    for (_, mut entry) in entries {
        if config.convert_links {
            entry.text = links::rewrite_links(&entry.text, links);
        }
        exporter::write_entry(&entry)?;
        written += 1;
    }
    Ok(written)
}
