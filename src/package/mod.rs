//! Package generation: render the routine, stage the files, zip them.

pub mod archive;
pub mod manifest;
pub mod templates;

pub use manifest::{ManifestSite, RoutineManifest};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::sites;
use crate::store::CredentialStore;
use crate::webui::SessionState;

pub const MANIFEST_FILE: &str = "routine.toml";
pub const ENV_FILE: &str = ".env";
pub const IMAGES_DIR: &str = "images";
pub const INSTRUCTIONS_FILE: &str = "INSTRUCTIONS.txt";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const PROFILE_FILE: &str = "profile.json";

const STAGING_DIR: &str = ".package-staging";

/// Build the installable package for the current session and return the
/// archive path.
///
/// Everything is staged into a scratch directory first; the staging tree
/// is removed on success and on failure alike, and a half-written archive
/// is deleted with it.
pub fn build(work_dir: &Path, session: &SessionState, store: &CredentialStore) -> Result<PathBuf> {
    let profile =
        session.profile.as_ref().context("profile must be set before generating a package")?;

    let staging = work_dir.join(STAGING_DIR);
    let archive_path = work_dir.join(format!("{}_automation.zip", profile.nome));

    let result = stage_and_archive(&staging, &archive_path, session, store);

    if staging.exists() {
        let _ = std::fs::remove_dir_all(&staging);
    }
    if result.is_err() {
        let _ = std::fs::remove_file(&archive_path);
    }

    result.map(|()| archive_path)
}

fn stage_and_archive(
    staging: &Path,
    archive_path: &Path,
    session: &SessionState,
    store: &CredentialStore,
) -> Result<()> {
    if staging.exists() {
        std::fs::remove_dir_all(staging).context("failed to clear stale staging directory")?;
    }
    std::fs::create_dir_all(staging)
        .with_context(|| format!("failed to create staging directory {}", staging.display()))?;

    // The routine itself, rendered from the live selection.
    let manifest = RoutineManifest::for_selection(&session.selected, &session.custom);
    write_file(staging, MANIFEST_FILE, &manifest.render()?)?;

    // Credential lines for exactly the packaged sites.
    write_file(staging, ENV_FILE, &render_env(&manifest, store))?;

    // Fixed templates.
    write_file(staging, REQUIREMENTS_FILE, templates::REQUIREMENTS)?;
    write_file(staging, INSTRUCTIONS_FILE, &templates::render_instructions(&session.image_actions))?;
    write_script(staging, "listen.sh", templates::LISTEN_SH)?;
    write_file(staging, "listen.bat", templates::LISTEN_BAT)?;
    write_script(staging, "install.sh", templates::INSTALL_SH)?;
    write_file(staging, "install.bat", templates::INSTALL_BAT)?;

    // The profile record and the uploaded reference images.
    if let Some(profile) = &session.profile {
        let profile_json =
            serde_json::to_string_pretty(profile).context("failed to serialize profile")?;
        write_file(staging, PROFILE_FILE, &profile_json)?;
    }
    if let Some(images_dir) = session.images_dir()
        && images_dir.exists()
    {
        copy_images(&images_dir, &staging.join(IMAGES_DIR))?;
    }

    archive::zip_dir(staging, archive_path)?;
    info!(archive = %archive_path.display(), "package generated");
    Ok(())
}

/// Credential file shipped with the package: entries for the selected
/// presets and positional entries for every custom site.
fn render_env(manifest: &RoutineManifest, store: &CredentialStore) -> String {
    let mut out = String::new();
    for site in &manifest.sites {
        let login_key = sites::login_key(&site.key);
        let senha_key = sites::senha_key(&site.key);
        out.push_str(&format!("{}={}\n", login_key, store.get(&login_key).unwrap_or_default()));
        out.push_str(&format!("{}={}\n", senha_key, store.get(&senha_key).unwrap_or_default()));
    }
    for (index, custom) in manifest.custom.iter().enumerate() {
        out.push_str(&format!("{}={}\n", sites::custom_url_key(index), custom.url));
        out.push_str(&format!(
            "{}={}\n",
            sites::custom_login_key(index),
            custom.login.as_deref().unwrap_or_default()
        ));
        out.push_str(&format!(
            "{}={}\n",
            sites::custom_senha_key(index),
            custom.senha.as_deref().unwrap_or_default()
        ));
    }
    out
}

fn write_file(staging: &Path, name: &str, content: &str) -> Result<()> {
    std::fs::write(staging.join(name), content)
        .with_context(|| format!("failed to write {name}"))
}

/// Shell scripts additionally get the executable bit on unix.
fn write_script(staging: &Path, name: &str, content: &str) -> Result<()> {
    write_file(staging, name, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(staging.join(name), std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("failed to mark {name} executable"))?;
    }
    Ok(())
}

fn copy_images(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to)
        .with_context(|| format!("failed to create {}", to.display()))?;
    for entry in std::fs::read_dir(from)
        .with_context(|| format!("failed to list {}", from.display()))?
    {
        let entry = entry.with_context(|| format!("failed to list {}", from.display()))?;
        let path = entry.path();
        if path.is_file() {
            std::fs::copy(&path, to.join(entry.file_name()))
                .with_context(|| format!("failed to copy {}", path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sites::CustomSite;

    #[test]
    fn env_render_uses_positional_custom_keys() {
        let manifest = RoutineManifest {
            sites: vec![],
            custom: vec![
                CustomSite {
                    nome: "A".to_string(),
                    url: "https://a.example.com".to_string(),
                    login: Some("alice".to_string()),
                    senha: None,
                },
                CustomSite {
                    nome: "B".to_string(),
                    url: "https://b.example.com".to_string(),
                    login: None,
                    senha: Some("pw".to_string()),
                },
            ],
        };
        let store = CredentialStore::default();
        let env = render_env(&manifest, &store);
        assert!(env.contains("URL_CUSTOM_0=https://a.example.com\n"));
        assert!(env.contains("LOGIN_CUSTOM_0=alice\n"));
        assert!(env.contains("SENHA_CUSTOM_0=\n"));
        assert!(env.contains("URL_CUSTOM_1=https://b.example.com\n"));
        assert!(env.contains("SENHA_CUSTOM_1=pw\n"));
    }
}
