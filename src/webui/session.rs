//! Server-held session state for the configurator.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sites::{self, CustomSite};

/// The configured user, persisted as `profile.json` in the user directory
/// and shipped with the package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub nome: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Follow-up note attached to an uploaded reference image.
///
/// Descriptive metadata only: it ends up in the generated instructions
/// and is never executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageAction {
    pub site: String,
    pub image: String,
    pub acao: String,
}

/// Mutable state of one configuration session.
///
/// Handlers receive this explicitly behind a mutex instead of reading
/// process-wide globals; nothing is persisted unless a handler writes it.
#[derive(Debug, Default)]
pub struct SessionState {
    pub profile: Option<UserProfile>,
    /// Selected preset keys, kept in catalogue order, no duplicates.
    pub selected: Vec<String>,
    /// Ordered custom sites; the position is the credential index.
    pub custom: Vec<CustomSite>,
    pub image_actions: Vec<ImageAction>,
    /// Per-user directory, created when the profile is set.
    pub user_dir: Option<PathBuf>,
}

impl SessionState {
    /// Set the profile and materialize the per-user directory tree
    /// (`<work_dir>/<nome>/images/` plus `profile.json`).
    pub fn set_profile(&mut self, work_dir: &Path, nome: &str, email: &str) -> Result<()> {
        let safe = sites::sanitize_name(nome);
        let safe = safe.trim();
        ensure!(!safe.is_empty(), "user name is empty after sanitization");

        let user_dir = work_dir.join(safe);
        std::fs::create_dir_all(user_dir.join("images"))
            .with_context(|| format!("failed to create user directory {}", user_dir.display()))?;

        let profile = UserProfile {
            nome: safe.to_string(),
            email: email.trim().to_string(),
            created_at: Utc::now(),
        };
        let profile_json =
            serde_json::to_string_pretty(&profile).context("failed to serialize profile")?;
        std::fs::write(user_dir.join("profile.json"), profile_json)
            .context("failed to write profile.json")?;

        self.profile = Some(profile);
        self.user_dir = Some(user_dir);
        Ok(())
    }

    pub fn images_dir(&self) -> Option<PathBuf> {
        self.user_dir.as_ref().map(|dir| dir.join("images"))
    }

    /// Replace the preset selection. Names resolve against the catalogue;
    /// an unknown name rejects the whole request.
    pub fn select_presets(&mut self, names: &[String]) -> Result<()> {
        let mut keys: Vec<String> = Vec::new();
        for name in names {
            let preset = sites::preset_by_name(name)
                .with_context(|| format!("unknown preset site {name:?}"))?;
            if !keys.iter().any(|key| key == preset.key) {
                keys.push(preset.key.to_string());
            }
        }
        self.selected = keys;
        Ok(())
    }

    /// Append a custom site; its index is the list position.
    pub fn add_custom(&mut self, mut site: CustomSite) -> Result<usize> {
        site.nome = sites::sanitize_name(&site.nome).trim().to_string();
        ensure!(!site.nome.is_empty(), "custom site name is required");
        ensure!(sites::validate_url(&site.url), "invalid URL {:?}", site.url);
        self.custom.push(site);
        Ok(self.custom.len() - 1)
    }

    /// Remove a custom site by its positional index. Later entries shift
    /// down, keeping the indices dense.
    pub fn remove_custom(&mut self, index: usize) -> Result<CustomSite> {
        ensure!(index < self.custom.len(), "no custom site at index {index}");
        Ok(self.custom.remove(index))
    }

    /// Attach (or update) the follow-up note for an uploaded image.
    pub fn record_image_action(&mut self, action: ImageAction) {
        if let Some(existing) = self
            .image_actions
            .iter_mut()
            .find(|a| a.site == action.site && a.image == action.image)
        {
            existing.acao = action.acao;
        } else {
            self.image_actions.push(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(nome: &str, url: &str) -> CustomSite {
        CustomSite { nome: nome.to_string(), url: url.to_string(), login: None, senha: None }
    }

    #[test]
    fn selection_resolves_names_and_deduplicates() {
        let mut session = SessionState::default();
        session
            .select_presets(&["GMail".to_string(), "GMAIL".to_string(), "Spotify".to_string()])
            .unwrap();
        assert_eq!(session.selected, vec!["GMAIL", "SPOTIFY"]);
    }

    #[test]
    fn unknown_preset_rejects_the_whole_selection() {
        let mut session = SessionState::default();
        session.selected = vec!["GMAIL".to_string()];
        assert!(session.select_presets(&["Altavista".to_string()]).is_err());
        // Failed request leaves the previous selection untouched.
        assert_eq!(session.selected, vec!["GMAIL"]);
    }

    #[test]
    fn add_custom_validates_and_sanitizes() {
        let mut session = SessionState::default();
        let index =
            session.add_custom(custom("Sistema|Interno", "https://sistema.exemplo.com")).unwrap();
        assert_eq!(index, 0);
        assert_eq!(session.custom[0].nome, "SistemaInterno");

        assert!(session.add_custom(custom("X", "not-a-url")).is_err());
        assert!(session.add_custom(custom("<>", "https://ok.example.com")).is_err());
    }

    #[test]
    fn remove_custom_shifts_later_indices_down() {
        let mut session = SessionState::default();
        session.add_custom(custom("A", "https://a.example.com")).unwrap();
        session.add_custom(custom("B", "https://b.example.com")).unwrap();
        session.add_custom(custom("C", "https://c.example.com")).unwrap();

        let removed = session.remove_custom(1).unwrap();
        assert_eq!(removed.nome, "B");
        assert_eq!(session.custom.len(), 2);
        assert_eq!(session.custom[1].nome, "C");
        assert!(session.remove_custom(5).is_err());
    }

    #[test]
    fn image_action_is_upserted_per_image() {
        let mut session = SessionState::default();
        session.record_image_action(ImageAction {
            site: "SEI".to_string(),
            image: "botao.png".to_string(),
            acao: "first".to_string(),
        });
        session.record_image_action(ImageAction {
            site: "SEI".to_string(),
            image: "botao.png".to_string(),
            acao: "second".to_string(),
        });
        assert_eq!(session.image_actions.len(), 1);
        assert_eq!(session.image_actions[0].acao, "second");
    }
}
