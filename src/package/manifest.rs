//! The generated routine manifest.
//!
//! A typed record rendered by the TOML serializer instead of a templated
//! script, so site names and URLs never need hand escaping: a name
//! containing quotes stays a valid document.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sites::{self, CustomSite};

/// A preset entry in the manifest: credential key plus target URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestSite {
    pub key: String,
    pub url: String,
}

/// The routine consumed by `rotina run`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineManifest {
    #[serde(default, rename = "site")]
    pub sites: Vec<ManifestSite>,
    #[serde(default, rename = "custom_site")]
    pub custom: Vec<CustomSite>,
}

impl RoutineManifest {
    /// Build the manifest for a selection. Every selected key resolves to
    /// exactly one catalogue entry; duplicates collapse, unknown keys are
    /// skipped, and the catalogue order is kept.
    pub fn for_selection(selected: &[String], custom: &[CustomSite]) -> Self {
        let mut manifest_sites: Vec<ManifestSite> = Vec::new();
        for preset in sites::PRESET_SITES {
            if selected.iter().any(|key| key == preset.key)
                && !manifest_sites.iter().any(|s| s.key == preset.key)
            {
                manifest_sites.push(ManifestSite {
                    key: preset.key.to_string(),
                    url: preset.url.to_string(),
                });
            }
        }
        Self { sites: manifest_sites, custom: custom.to_vec() }
    }

    pub fn render(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render routine manifest")
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse routine manifest")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read routine manifest {}", path.display()))?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_renders_exact_pairs_without_duplicates() {
        let selected = vec![
            "GMAIL".to_string(),
            "SPOTIFY".to_string(),
            "GMAIL".to_string(), // duplicate selection collapses
        ];
        let manifest = RoutineManifest::for_selection(&selected, &[]);

        assert_eq!(manifest.sites.len(), 2);
        assert_eq!(manifest.sites[0].key, "GMAIL");
        assert_eq!(manifest.sites[0].url, "https://mail.google.com");
        assert_eq!(manifest.sites[1].key, "SPOTIFY");
        assert_eq!(manifest.sites[1].url, "https://open.spotify.com");

        let reparsed = RoutineManifest::parse(&manifest.render().unwrap()).unwrap();
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn unknown_keys_are_skipped() {
        let manifest = RoutineManifest::for_selection(&["NOT_A_SITE".to_string()], &[]);
        assert!(manifest.sites.is_empty());
    }

    #[test]
    fn quoted_custom_name_survives_render_and_parse() {
        let custom = vec![CustomSite {
            nome: "Sistema \"Interno\"".to_string(),
            url: "https://sistema.exemplo.com".to_string(),
            login: Some("alice".to_string()),
            senha: None,
        }];
        let manifest = RoutineManifest::for_selection(&[], &custom);

        let rendered = manifest.render().unwrap();
        let reparsed = RoutineManifest::parse(&rendered).unwrap();
        assert_eq!(reparsed.custom[0].nome, "Sistema \"Interno\"");
        assert_eq!(reparsed, manifest);
    }

    #[test]
    fn empty_document_parses_to_an_empty_manifest() {
        let manifest = RoutineManifest::parse("").unwrap();
        assert!(manifest.sites.is_empty());
        assert!(manifest.custom.is_empty());
    }
}
