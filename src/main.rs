use clap::{ArgAction, Parser};
use dayone_vault_export::utils::{self, ExportConfig};
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Convert Day One JSON exports into a Markdown vault.
///
/// Each journal ends up in a sub-folder named after its file (e.g.
/// Travel.json -> Travel/). All JSON files in FOLDER are processed and
/// renamed afterwards so they are not converted twice.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder with the Day One exports and their attachment folders.
    #[arg(value_name = "FOLDER")]
    folder: PathBuf,

    /// Where to write the vault. Defaults to FOLDER.
    #[arg(long, value_name = "PATH")]
    target_dir: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/dayone-vault-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress standard output (progress bars).
    #[arg(short, long)]
    quiet: bool,

    /// Add a YAML front matter.
    #[arg(long)]
    yaml: bool,

    /// Comma-separated metadata fields to put in the front matter.
    #[arg(long, value_name = "FIELDS", value_delimiter = ',')]
    yaml_fields: Option<Vec<String>>,

    /// Replace Day One internal links with [[vault links]].
    #[arg(long)]
    convert_links: bool,

    /// Combine entries with the same date in a single file.
    #[arg(long)]
    merge_entries: bool,

    /// String separating merged entries. Default is a double '---'.
    #[arg(short = 's', long, value_name = "SEPARATOR")]
    entries_separator: Option<String>,

    /// Prefix of regular tags. Default is '#on/'.
    #[arg(long, value_name = "PREFIX")]
    tags_prefix: Option<String>,

    /// Prefix of status tags. Default is '#status/'.
    #[arg(long, value_name = "PREFIX")]
    status_tags_prefix: Option<String>,

    /// Comma-separated tags to leave out.
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    ignore_tags: Option<Vec<String>>,

    /// File listing tags to leave out, one per line.
    #[arg(long, value_name = "PATH")]
    ignore_tags_file: Option<PathBuf>,

    /// Comma-separated tags rendered with the status prefix.
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    status_tags: Option<Vec<String>>,

    /// Comma-separated tags added verbatim to every entry.
    #[arg(long, value_name = "TAGS", value_delimiter = ',')]
    extra_tags: Option<Vec<String>>,

    /// Comma-separated metadata fields to drop.
    #[arg(long, value_name = "FIELDS", value_delimiter = ',')]
    ignore_fields: Option<Vec<String>>,

    /// Add a #places/Country/Area/Locality tag from the entry location.
    #[arg(long)]
    place_tags: bool,

    /// Extra NAME=VALUE field added to every entry. Repeatable.
    #[arg(long = "field", value_name = "NAME=VALUE")]
    fields: Vec<String>,

    /// Existing vault; entries already there are skipped instead of
    /// rebuilding the journal folder.
    #[arg(long, value_name = "PATH")]
    vault: Option<PathBuf>,

    /// Write entries even if the vault already has them.
    #[arg(short, long)]
    force: bool,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    target_dir: Option<PathBuf>,
    yaml: Option<bool>,
    yaml_fields: Option<Vec<String>>,
    convert_links: Option<bool>,
    merge_entries: Option<bool>,
    entries_separator: Option<String>,
    tags_prefix: Option<String>,
    status_tags_prefix: Option<String>,
    ignore_tags: Option<Vec<String>>,
    ignore_tags_file: Option<PathBuf>,
    status_tags: Option<Vec<String>>,
    extra_tags: Option<Vec<String>>,
    ignore_fields: Option<Vec<String>>,
    place_tags: Option<bool>,
    fields: Option<Vec<String>>,
    vault: Option<PathBuf>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("dayone-vault-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    if !cli.folder.is_dir() {
        return Err(eyre!("Not a folder: {}", cli.folder.display()));
    }

    // 2. Resolve every option (CLI > Config > Default)
    let mut config = ExportConfig::new(&cli.folder);
    if let Some(dir) = cli.target_dir.or(file_cfg.target_dir) {
        config.target_dir = dir;
    }
    config.yaml = cli.yaml || file_cfg.yaml.unwrap_or(false);
    if let Some(fields) = cli.yaml_fields.or(file_cfg.yaml_fields) {
        config.yaml_fields = fields;
    }
    config.convert_links = cli.convert_links || file_cfg.convert_links.unwrap_or(false);
    config.merge_entries = cli.merge_entries || file_cfg.merge_entries.unwrap_or(false);
    if let Some(sep) = cli.entries_separator.or(file_cfg.entries_separator) {
        config.entries_separator = sep;
    }
    if let Some(prefix) = cli.tags_prefix.or(file_cfg.tags_prefix) {
        config.tags_prefix = prefix;
    }
    if let Some(prefix) = cli.status_tags_prefix.or(file_cfg.status_tags_prefix) {
        config.status_tags_prefix = prefix;
    }

    let mut ignore_tags: HashSet<String> = cli
        .ignore_tags
        .or(file_cfg.ignore_tags)
        .unwrap_or_default()
        .into_iter()
        .collect();
    if let Some(path) = cli.ignore_tags_file.or(file_cfg.ignore_tags_file) {
        ignore_tags.extend(utils::read_tag_file(&path)?);
    }
    config.ignore_tags = ignore_tags;

    config.status_tags = cli
        .status_tags
        .or(file_cfg.status_tags)
        .unwrap_or_default()
        .into_iter()
        .collect();
    config.extra_tags = cli.extra_tags.or(file_cfg.extra_tags).unwrap_or_default();
    config.ignore_fields = cli
        .ignore_fields
        .or(file_cfg.ignore_fields)
        .unwrap_or_default();
    config.place_tags = cli.place_tags || file_cfg.place_tags.unwrap_or(false);
    let fields = if cli.fields.is_empty() {
        file_cfg.fields.unwrap_or_default()
    } else {
        cli.fields
    };
    config.extra_fields = fields
        .iter()
        .map(|f| utils::parse_field(f))
        .collect::<Result<_>>()?;
    config.vault = cli.vault.or(file_cfg.vault);
    config.force = cli.force;
    config.verbose = cli.verbose;
    config.quiet = cli.quiet;

    if config.verbose > 0 && !config.quiet {
        eprintln!("Verbose mode enabled. Verbosity level: {}", config.verbose);
        if config.yaml {
            eprintln!(
                "Each entry will have a YAML front matter with: {}",
                config.yaml_fields.join(", ")
            );
        }
    }

    // 3. Run the Business Logic
    #[cfg(feature = "sequential")]
    return dayone_vault_export::sequential::execute(config);

    #[cfg(not(feature = "sequential"))]
    dayone_vault_export::parallel::execute(config)
}
