use crate::metadata::APP_SCHEME;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// `[text](dayone://view?entryId=UUID)`, also matching the `dayone2` scheme.
/// A `url::` field line carried into a merged body is captured too so it
/// can be left pointing at the app.
static ENTRY_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)(^url:: )?\[([^\]]*?)\]\({}2?://[^)]*?([A-F0-9]+)\)",
        APP_SCHEME
    ))
    .unwrap()
});

/// Entry UUID to output file name, filled while paths are assigned and
/// only read once every entry of the journal has its final path.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    files: HashMap<String, String>,
}

impl LinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uuid: impl Into<String>, file_name: impl Into<String>) {
        self.files.insert(uuid.into(), file_name.into());
    }

    pub fn get(&self, uuid: &str) -> Option<&str> {
        self.files.get(uuid).map(String::as_str)
    }
}

/// Replace links to other entries with `[[file|text]]` vault links.
/// Links to entries missing from the index become a footnote saying so.
pub fn rewrite_links(text: &str, index: &LinkIndex) -> String {
    ENTRY_LINK
        .replace_all(text, |caps: &Captures| {
            if caps.get(1).is_some() {
                return caps[0].to_string();
            }
            let (label, uuid) = (&caps[2], &caps[3]);
            match index.get(uuid) {
                Some(file) => format!("[[{}|{}]]", file, label),
                None => format!("^[Linked entry with UUID `{}` not found]", uuid),
            }
        })
        .into_owned()
}
