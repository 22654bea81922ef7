//! The site-opening routine: sequential, blocking, fixed delays.

mod input;
pub mod steps;
pub mod vision;

pub use input::InputDriver;

use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result};
use enigo::Key;
use tracing::info;

use crate::package::RoutineManifest;
use crate::sites::{self, PRESET_SITES};
use crate::store::CredentialStore;

/// Seconds to wait after opening a site before any interaction.
pub const OPEN_DELAY_SECS: u64 = 5;
/// Pause after pasting the login and pressing Tab.
const LOGIN_PAUSE_SECS: u64 = 1;
/// Pause after pasting the senha and pressing Enter.
const SENHA_PAUSE_SECS: u64 = 2;

/// Open `url` in the default browser and blindly fill login/senha.
///
/// There is no readiness detection: the routine sleeps `delay` and assumes
/// the login field has focus. A page that never loaded fails silently.
pub fn open_site(
    input: &mut InputDriver,
    url: &str,
    login: Option<&str>,
    senha: Option<&str>,
    delay: Duration,
) -> Result<()> {
    webbrowser::open(url).with_context(|| format!("failed to open {url}"))?;
    sleep(delay);
    if let Some(login) = login {
        input.copy_and_paste(login)?;
        input.press(Key::Tab)?;
        sleep(Duration::from_secs(LOGIN_PAUSE_SECS));
    }
    if let Some(senha) = senha {
        input.copy_and_paste(senha)?;
        input.press(Key::Return)?;
        sleep(Duration::from_secs(SENHA_PAUSE_SECS));
    }
    Ok(())
}

/// Run the full routine: preset sites that have a stored credential,
/// then every custom site.
///
/// With a manifest the site list comes from it (a generated package);
/// without one the whole preset catalogue is probed and custom sites come
/// from the store's indexed scan.
pub fn run_routine(store: &CredentialStore, manifest: Option<&RoutineManifest>) -> Result<()> {
    let mut input = InputDriver::new()?;
    let delay = Duration::from_secs(OPEN_DELAY_SECS);

    info!("starting routine");

    match manifest {
        Some(manifest) => {
            for site in &manifest.sites {
                open_preset(&mut input, store, &site.key, &site.url, delay)?;
            }
            for (index, custom) in manifest.custom.iter().enumerate() {
                let login = store.get_nonempty(&sites::custom_login_key(index));
                let senha = store.get_nonempty(&sites::custom_senha_key(index));
                info!(site = %custom.nome, url = %custom.url, "opening custom site");
                open_site(&mut input, &custom.url, login, senha, delay)?;
            }
        }
        None => {
            for preset in PRESET_SITES {
                open_preset(&mut input, store, preset.key, preset.url, delay)?;
            }
            for custom in store.custom_sites() {
                info!(index = custom.index, url = %custom.url, "opening custom site");
                open_site(&mut input, &custom.url, custom.login.as_deref(), custom.senha.as_deref(), delay)?;
            }
        }
    }

    info!("routine finished");
    Ok(())
}

/// Preset sites open only when a login or senha is stored for them.
fn open_preset(
    input: &mut InputDriver,
    store: &CredentialStore,
    key: &str,
    url: &str,
    delay: Duration,
) -> Result<()> {
    let login = store.get_nonempty(&sites::login_key(key));
    let senha = store.get_nonempty(&sites::senha_key(key));
    if login.is_none() && senha.is_none() {
        return Ok(());
    }
    info!(site = key, "opening site");
    open_site(input, url, login, senha, delay)
}
