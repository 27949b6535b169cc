//! Terraform output parsing
//!
//! `terraform apply` prints its outputs as a trailing text block:
//!
//! ```text
//! Apply complete! Resources: 12 added, 0 changed, 0 destroyed.
//!
//! Outputs:
//!
//! manager_ip = 52.66.33.249
//! block_storage = fs-0a1b2c3d
//! ```
//!
//! Streamed apply output is the only place this scraping happens; every other
//! read goes through `terraform show -json`.

use crate::error::{Result, TerraformError};
use crate::runner::OutputExtractor;
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

const OUTPUTS_MARKER: &str = "Outputs:";
const SEPARATOR: &str = " = ";

static ANSI_ESCAPE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[\x1b\x{9b}][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]").ok()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub key: String,
    pub value: String,
}

/// Ordered outputs with unique keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSet {
    entries: Vec<Output>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`, keeping its original position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|o| o.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Output { key, value }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.value.as_str())
    }

    /// Like [`get`](Self::get), but a missing key is a contract violation.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| TerraformError::MissingOutput(key.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Output> {
        self.entries
    }
}

impl FromIterator<(String, String)> for OutputSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut set = OutputSet::new();
        for (key, value) in iter {
            set.set(key, value);
        }
        set
    }
}

pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    match ANSI_ESCAPE.as_ref() {
        Some(re) => re.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}

/// Parse every `key = value` line of `text`.
pub fn parse_outputs(text: &str) -> OutputSet {
    let mut outputs = OutputSet::new();

    for line in text.lines() {
        if !line.contains(SEPARATOR) {
            continue;
        }
        let line = strip_ansi(line);
        let Some((key, value)) = line.split_once(SEPARATOR) else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        outputs.set(key, unquote(value.trim()));
    }

    outputs
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Extracts the outputs block that closes `terraform apply`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOutputs;

impl OutputExtractor for ApplyOutputs {
    fn extract(&self, stdout: &str) -> OutputSet {
        let plain = strip_ansi(stdout);
        match plain.find(OUTPUTS_MARKER) {
            Some(start) => parse_outputs(&plain[start + OUTPUTS_MARKER.len()..]),
            None => OutputSet::new(),
        }
    }
}
