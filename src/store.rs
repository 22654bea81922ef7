//! Line-oriented credential store (`KEY=value`).
//!
//! The backing file is the plain-text `.env` the generated packages carry:
//! one `KEY=value` entry per line, keys following the `LOGIN_<SITE>`,
//! `SENHA_<SITE>` and `*_CUSTOM_<n>` patterns. Values are stored as-is,
//! with no encryption and no hashing.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use fs2::FileExt;
use tracing::warn;

use crate::sites;

/// In-memory view of the credential file. Comments and blank lines are
/// preserved on rewrite.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    path: PathBuf,
    lines: Vec<Line>,
}

#[derive(Debug, Clone)]
enum Line {
    Entry { key: String, value: String },
    Raw(String),
}

/// Custom-site credentials read by positional index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCredentials {
    pub index: usize,
    pub url: String,
    pub login: Option<String>,
    pub senha: Option<String>,
}

impl CredentialStore {
    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let lines = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read credential file {}", path.display()))?;
            parse(&content)
        } else {
            Vec::new()
        };
        Ok(Self { path: path.to_path_buf(), lines })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw lookup; empty values are returned as-is.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| match line {
            Line::Entry { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Lookup treating an empty value as absent, the way the automation
    /// decides whether a login/senha should be filled at all.
    pub fn get_nonempty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Create or overwrite a key in memory, preserving line order.
    pub fn set(&mut self, key: &str, value: &str) {
        for line in &mut self.lines {
            if let Line::Entry { key: k, value: v } = line
                && k == key
            {
                *v = value.to_string();
                return;
            }
        }
        self.lines.push(Line::Entry { key: key.to_string(), value: value.to_string() });
    }

    /// Custom sites, scanned by index from 0.
    ///
    /// The scan stops at the first missing `URL_CUSTOM_<i>`: entries after
    /// a gap are unreachable, so writers must keep indices dense.
    pub fn custom_sites(&self) -> Vec<CustomCredentials> {
        let mut out = Vec::new();
        let mut index = 0;
        while let Some(url) = self.get(&sites::custom_url_key(index)) {
            out.push(CustomCredentials {
                index,
                url: url.to_string(),
                login: self.get_nonempty(&sites::custom_login_key(index)).map(str::to_string),
                senha: self.get_nonempty(&sites::custom_senha_key(index)).map(str::to_string),
            });
            index += 1;
        }
        out
    }

    /// Write the current in-memory state back to the backing file.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, self.render())
            .with_context(|| format!("failed to write credential file {}", self.path.display()))
    }

    /// Apply a batch of `(key, value)` writes, each persisted in turn.
    ///
    /// The previous file content is backed up first; if any entry fails,
    /// the backup is restored so the file ends up byte-identical to its
    /// state before the batch began. All-or-nothing at the file level.
    pub fn write_batch(&mut self, entries: &[(String, String)]) -> Result<()> {
        let backup = self.create_backup()?;

        // Exclusive lock so the configurator and a concurrent CLI write
        // cannot interleave.
        let lock_path = PathBuf::from(format!("{}.lock", self.path.display()));
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("failed to create lock file {}", lock_path.display()))?;
        lock_file.lock_exclusive().context("failed to acquire credential-store lock")?;

        for (key, value) in entries {
            let applied = validate_entry(key, value).and_then(|()| {
                self.set(key, value);
                self.save()
            });
            if let Err(e) = applied {
                self.rollback(backup.as_deref());
                return Err(e).with_context(|| format!("credential batch failed at key {key:?}"));
            }
        }

        if let Some(backup_path) = backup {
            let _ = std::fs::remove_file(backup_path);
        }
        Ok(())
    }

    fn create_backup(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup_path = PathBuf::from(format!("{}.backup", self.path.display()));
        std::fs::copy(&self.path, &backup_path)
            .with_context(|| format!("failed to back up {}", self.path.display()))?;
        Ok(Some(backup_path))
    }

    /// Restore the pre-batch file state and reload the in-memory view.
    fn rollback(&mut self, backup: Option<&Path>) {
        match backup {
            Some(backup_path) => {
                if let Err(e) = std::fs::copy(backup_path, &self.path) {
                    warn!("failed to restore credential backup: {e}");
                    return;
                }
                let _ = std::fs::remove_file(backup_path);
            }
            // No file existed before the batch: remove whatever was written.
            None => {
                let _ = std::fs::remove_file(&self.path);
            }
        }
        match Self::open(&self.path) {
            Ok(reloaded) => *self = reloaded,
            Err(e) => warn!("failed to reload credential store after rollback: {e}"),
        }
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
                Line::Raw(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }
}

fn parse(content: &str) -> Vec<Line> {
    content
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return Line::Raw(line.to_string());
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    Line::Entry { key: key.to_string(), value: value.to_string() }
                }
                None => Line::Raw(line.to_string()),
            }
        })
        .collect()
}

fn validate_entry(key: &str, value: &str) -> Result<()> {
    if key.trim().is_empty() {
        bail!("empty credential key");
    }
    if key.contains('=') || key.contains('\n') || key.contains('\r') {
        bail!("credential key {key:?} contains reserved characters");
    }
    if value.contains('\n') || value.contains('\r') {
        bail!("credential value for {key} contains a line break");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_from(content: &str) -> CredentialStore {
        CredentialStore { path: PathBuf::from("unused.env"), lines: parse(content) }
    }

    #[test]
    fn parse_and_render_round_trip() {
        let content = "# morning routine\nLOGIN_GMAIL=alice@gmail.com\n\nSENHA_GMAIL=s3cret\n";
        let store = store_from(content);
        assert_eq!(store.get("LOGIN_GMAIL"), Some("alice@gmail.com"));
        assert_eq!(store.get("SENHA_GMAIL"), Some("s3cret"));
        assert_eq!(store.render(), content);
    }

    #[test]
    fn set_overwrites_in_place_and_appends_new_keys() {
        let mut store = store_from("LOGIN_GMAIL=old\nSENHA_GMAIL=x\n");
        store.set("LOGIN_GMAIL", "new");
        store.set("URL_CUSTOM_0", "https://intranet.local");
        assert_eq!(store.render(), "LOGIN_GMAIL=new\nSENHA_GMAIL=x\nURL_CUSTOM_0=https://intranet.local\n");
    }

    #[test]
    fn value_may_contain_equals_sign() {
        let store = store_from("SENHA_GMAIL=a=b=c\n");
        assert_eq!(store.get("SENHA_GMAIL"), Some("a=b=c"));
    }

    #[test]
    fn empty_value_counts_as_absent_for_nonempty_lookup() {
        let store = store_from("LOGIN_GMAIL=\n");
        assert_eq!(store.get("LOGIN_GMAIL"), Some(""));
        assert_eq!(store.get_nonempty("LOGIN_GMAIL"), None);
    }

    #[test]
    fn custom_scan_stops_at_first_gap() {
        let store = store_from(
            "URL_CUSTOM_0=https://a.example.com\nURL_CUSTOM_2=https://c.example.com\nLOGIN_CUSTOM_0=alice\n",
        );
        let customs = store.custom_sites();
        assert_eq!(customs.len(), 1);
        assert_eq!(customs[0].url, "https://a.example.com");
        assert_eq!(customs[0].login.as_deref(), Some("alice"));
        assert_eq!(customs[0].senha, None);
    }

    #[test]
    fn custom_scan_reads_dense_indices_in_order() {
        let store = store_from(
            "URL_CUSTOM_0=https://a.example.com\nURL_CUSTOM_1=https://b.example.com\nSENHA_CUSTOM_1=pw\n",
        );
        let customs = store.custom_sites();
        assert_eq!(customs.len(), 2);
        assert_eq!(customs[1].index, 1);
        assert_eq!(customs[1].senha.as_deref(), Some("pw"));
    }

    #[test]
    fn entry_validation_rejects_reserved_characters() {
        assert!(validate_entry("LOGIN_GMAIL", "ok").is_ok());
        assert!(validate_entry("", "x").is_err());
        assert!(validate_entry("BAD=KEY", "x").is_err());
        assert!(validate_entry("LOGIN_GMAIL", "two\nlines").is_err());
    }
}
