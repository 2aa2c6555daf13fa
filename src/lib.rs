//! # dayone-vault-export
//!
//! Converts [Day One](https://dayoneapp.com) JSON exports into a folder of
//! per-day Markdown notes that can be opened directly as an Obsidian vault.
//!
//! ## What it does
//!
//! Every `*.json` export in the source folder is one journal. Each journal
//! becomes a `<journal>/<year>/<year>-<month>/<date>.md` tree where every
//! entry carries its metadata (date, place, weather, tags, ...) as
//! `key:: value` inline fields, optionally with a YAML front matter block.
//!
//! Attachments referenced from entry bodies are renamed on disk from their
//! content hash to their identifier and embedded as `![[identifier.ext]]`.
//! Links between entries can be turned into `[[file|text]]` vault links.
//!
//! ## Same-day entries
//!
//! Entries written on the same day either get a letter suffix
//! (`2023-05-01.md`, `2023-05-01a.md`, ...) or, with `--merge-entries`, are
//! folded into a single file separated by a configurable marker.
//!
//! ## Re-running
//!
//! A converted export is renamed to `_<n>_<name>.json` and ignored by the
//! next run. Without `--vault`, a journal's output folder is rebuilt from
//! scratch; with it, entries already present in that vault are skipped unless
//! `--force` is given.
//!
//! ## Usage
//!
//! ```sh
//! dayone-vault-export ~/Exports/dayone --yaml --convert-links
//! ```
//!
//! Preferences can be persisted in `~/.config/dayone-vault-export/config.toml`.
pub mod entry;
pub mod exporter;
pub mod importer;
pub mod journal;
pub mod links;
pub mod metadata;
pub mod parallel;
pub mod sanitize;
#[cfg(feature = "sequential")]
pub mod sequential;
pub mod utils;
