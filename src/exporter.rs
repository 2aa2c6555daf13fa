use crate::entry::Entry;
use eyre::{Context, Result, eyre};
use std::fs::{self, File};
use std::io::{BufWriter, Write};

/// Render an entry as Markdown.
///
/// With `with_front_matter` set and front matter enabled on the entry, the
/// fields it holds are emitted as a `---` delimited YAML block. Every other
/// field follows as a `key:: value` inline field, then a `---` rule and the
/// body.
pub fn render_entry(entry: &Entry, with_front_matter: bool) -> String {
    let fields = entry.metadata.fields();
    let in_yaml = |key: &str| with_front_matter && entry.front_matter.holds(key);
    let mut out = String::new();

    if with_front_matter && entry.front_matter.enabled {
        out.push_str("---\n");
        for (key, value) in fields.iter().filter(|(k, _)| in_yaml(*k)) {
            out.push_str(&format!("{}: {}\n", yaml_key(key), yaml_value(value)));
        }
        out.push_str("---\n");
    }

    for (key, value) in fields.iter().filter(|(k, _)| !in_yaml(*k)) {
        out.push_str(&format!("{}:: {}\n", key, value));
    }

    out.push_str("\n---\n\n");
    out.push_str(&entry.text);
    out.push('\n');
    out
}

fn yaml_key(key: &str) -> String {
    key.to_lowercase().replace(' ', "-")
}

fn yaml_value(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

pub fn write_entry_markdown<W: Write>(writer: &mut W, entry: &Entry) -> std::io::Result<()> {
    writer.write_all(render_entry(entry, true).as_bytes())
}

/// Write an entry to its assigned output path, creating parent folders.
pub fn write_entry(entry: &Entry) -> Result<()> {
    let path = entry
        .output_path
        .as_deref()
        .ok_or_else(|| eyre!("Entry {} has no output path", entry.uuid()))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file =
        File::create(path).wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_entry_markdown(&mut writer, entry)
        .wrap_err_with(|| format!("Failed to write: {}", path.display()))?;
    writer
        .flush()
        .wrap_err_with(|| format!("Failed to flush: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FrontMatter;
    use crate::importer::RawEntry;
    use crate::metadata::{self, MetadataOptions};
    use chrono::{DateTime, FixedOffset};
    use tempfile::tempdir;

    fn entry(front_matter: FrontMatter) -> Entry {
        let raw = RawEntry {
            uuid: "ABC".into(),
            creation_date: DateTime::<FixedOffset>::parse_from_rfc3339("2023-05-01T10:00:00Z")
                .unwrap(),
            time_zone: "UTC".into(),
            text: String::new(),
            starred: true,
            tags: vec!["Travel".into()],
            location: None,
            weather: None,
            photos: None,
            pdf_attachments: None,
            audios: None,
            videos: None,
        };
        let opts = MetadataOptions {
            tags_prefix: "#on/".into(),
            ignore_fields: vec!["url".into()],
            ..Default::default()
        };
        let mut meta = metadata::extract(&raw, &opts).unwrap();
        meta.place = Some("Paris, France".into());
        Entry::from_record(&raw, meta, "Hello.".into(), front_matter).unwrap()
    }

    #[test]
    fn inline_only_rendering() {
        let out = render_entry(&entry(FrontMatter::disabled()), true);
        assert_eq!(
            out,
            "created:: 2023-05-01T10:00:00+00:00\n\
             place:: Paris, France\n\
             favorite:: true\n\
             tags:: #On/Travel\n\
             \n---\n\nHello.\n"
        );
    }

    #[test]
    fn front_matter_takes_its_fields_out_of_the_inline_block() {
        let e = entry(FrontMatter::new(true, ["place", "Favorite"]));
        let out = render_entry(&e, true);
        assert_eq!(
            out,
            "---\n\
             place: \"Paris, France\"\n\
             favorite: true\n\
             ---\n\
             created:: 2023-05-01T10:00:00+00:00\n\
             tags:: #On/Travel\n\
             \n---\n\nHello.\n"
        );
        // Each field appears exactly once
        assert_eq!(out.matches("place").count(), 1);
    }

    #[test]
    fn without_front_matter_everything_is_inline() {
        let e = entry(FrontMatter::new(true, ["place"]));
        let out = render_entry(&e, false);
        assert!(out.starts_with("created:: "));
        assert!(out.contains("place:: Paris, France\n"));
    }

    #[test]
    fn rendering_is_repeatable() {
        let e = entry(FrontMatter::new(true, ["tags"]));
        assert_eq!(render_entry(&e, true), render_entry(&e, true));
    }

    #[test]
    fn write_entry_creates_parent_folders() {
        let tmp = tempdir().unwrap();
        let mut e = entry(FrontMatter::disabled());
        let path = tmp.path().join("j/2023/2023-05/2023-05-01.md");
        e.output_path = Some(path.clone());
        write_entry(&e).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), render_entry(&e, true));
    }

    #[test]
    fn write_entry_without_path_fails() {
        assert!(write_entry(&entry(FrontMatter::disabled())).is_err());
    }
}
