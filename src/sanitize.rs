use crate::importer::{Attachment, RawEntry};
use eyre::{Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

static EMPTY_CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s+```").unwrap());

static PHOTO_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\]\(dayone-moment://([A-F0-9]+)\)").unwrap());
static PDF_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\]\(dayone-moment:/pdfAttachment/([A-F0-9]+)\)").unwrap());
static AUDIO_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\]\(dayone-moment:/audio/([A-F0-9]+)\)").unwrap());
static VIDEO_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[\]\(dayone-moment:/video/([A-F0-9]+)\)").unwrap());

/// Attachment categories, each with its own folder and placeholder link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Photo,
    Pdf,
    Audio,
    Video,
}

impl AttachmentKind {
    pub const ALL: [AttachmentKind; 4] = [Self::Photo, Self::Pdf, Self::Audio, Self::Video];

    /// Folder next to the journal file holding this category's files.
    pub fn dir(self) -> &'static str {
        match self {
            Self::Photo => "photos",
            Self::Pdf => "pdfs",
            Self::Audio => "audios",
            Self::Video => "videos",
        }
    }

    /// Used when a descriptor carries no type. Audio is never typed in
    /// exports and is always AAC in an `.m4a` container.
    pub fn default_extension(self) -> &'static str {
        match self {
            Self::Photo => "jpeg",
            Self::Pdf => "pdf",
            Self::Audio => "m4a",
            Self::Video => "mov",
        }
    }

    fn placeholder(self) -> &'static Regex {
        match self {
            Self::Photo => &*PHOTO_LINK,
            Self::Pdf => &*PDF_LINK,
            Self::Audio => &*AUDIO_LINK,
            Self::Video => &*VIDEO_LINK,
        }
    }

    fn extension(self, attachment: &Attachment) -> &str {
        match (self, attachment.kind.as_deref()) {
            (Self::Audio, _) | (_, None) => self.default_extension(),
            (_, Some(ext)) => ext,
        }
    }

    /// The attachment manifest of this category on `raw`, if the export has one.
    pub fn manifest(self, raw: &RawEntry) -> Option<&[Attachment]> {
        match self {
            Self::Photo => raw.photos.as_deref(),
            Self::Pdf => raw.pdf_attachments.as_deref(),
            Self::Audio => raw.audios.as_deref(),
            Self::Video => raw.videos.as_deref(),
        }
    }
}

/// Result of sanitizing one entry body.
#[derive(Debug, Default)]
pub struct Sanitized {
    pub text: String,
    /// `(from, to)` for every file renamed on disk.
    pub renamed: Vec<(PathBuf, PathBuf)>,
}

/// Clean an entry body and rewrite its attachment placeholders.
///
/// `base_dir` is the folder holding the attachment sub-folders.
pub fn sanitize(raw: &RawEntry, base_dir: &Path) -> Result<Sanitized> {
    let mut text = clean_text(&raw.text);
    let mut renamed = Vec::new();

    for kind in AttachmentKind::ALL {
        let Some(items) = kind.manifest(raw) else {
            continue;
        };
        renamed.extend(rename_attachments(kind, items, base_dir)?);
        text = rewrite_attachment_links(&text, kind, items);
    }

    Ok(Sanitized { text, renamed })
}

/// Undo the escaping and separator characters the app puts into bodies.
pub fn clean_text(text: &str) -> String {
    let text = text
        .replace('\\', "")
        .replace('\u{2028}', "\n")
        .replace('\u{2029}', "\n\n")
        .replace('\u{200b}', "");
    // A single code block gets exported as a run of fences split across lines
    EMPTY_CODE_FENCE.replace_all(&text, "").into_owned()
}

/// Rename `<md5>.<ext>` to `<identifier>.<ext>` for each descriptor.
/// Files already renamed by an earlier run are left alone.
pub fn rename_attachments(
    kind: AttachmentKind,
    items: &[Attachment],
    base_dir: &Path,
) -> Result<Vec<(PathBuf, PathBuf)>> {
    let dir = base_dir.join(kind.dir());
    let mut renamed = Vec::new();
    for item in items {
        let ext = kind.extension(item);
        let from = dir.join(format!("{}.{}", item.md5, ext));
        let to = dir.join(format!("{}.{}", item.identifier, ext));
        match fs::rename(&from, &to) {
            Ok(()) => renamed.push((from, to)),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).wrap_err_with(|| {
                    format!("Failed to rename {} to {}", from.display(), to.display())
                });
            }
        }
    }
    Ok(renamed)
}

/// Replace this category's placeholder links with `![[identifier.ext]]` embeds.
pub fn rewrite_attachment_links(text: &str, kind: AttachmentKind, items: &[Attachment]) -> String {
    let extensions: HashMap<&str, &str> = items
        .iter()
        .map(|a| (a.identifier.as_str(), kind.extension(a)))
        .collect();

    kind.placeholder()
        .replace_all(text, |caps: &Captures| {
            let id = &caps[1];
            let ext = extensions
                .get(id)
                .copied()
                .unwrap_or_else(|| kind.default_extension());
            format!("![[{}.{}]]", id, ext)
        })
        .into_owned()
}
