//! Fixed file templates bundled into generated packages.
//!
//! The listener and install scripts take no parameters; only the
//! instructions file is extended with the image actions the user
//! configured.

use crate::webui::ImageAction;

/// Listener scripts are emitted verbatim: trigger phrase and cadence live
/// in the binary, not in the script.
pub const LISTEN_SH: &str = "#!/bin/sh
# Start the voice listener; say the trigger phrase to run the routine.
exec rotina listen
";

pub const LISTEN_BAT: &str = "@echo off\r
rem Start the voice listener; say the trigger phrase to run the routine.\r
rotina listen\r
";

/// Dependency manifest, one package per line.
pub const REQUIREMENTS: &str = "rotina
# system packages
sox
xdotool
";

pub const INSTALL_SH: &str = "#!/bin/sh
set -e
cd \"$(dirname \"$0\")\"
command -v cargo >/dev/null 2>&1 || { echo 'Install Rust first: https://rustup.rs'; exit 1; }
cargo install rotina
echo 'Installation finished. Read INSTRUCTIONS.txt for the next step.'
";

pub const INSTALL_BAT: &str = "@echo off\r
cd /d %~dp0\r
where cargo >nul 2>nul || (echo Install Rust first: https://rustup.rs & exit /b 1)\r
cargo install rotina\r
echo Installation finished. Read INSTRUCTIONS.txt for the next step.\r
pause\r
";

const INSTRUCTIONS_HEADER: &str = "# Installation and usage

1. Run the install script for your system:
   - Windows: install.bat
   - Linux/macOS: ./install.sh
2. Keep this folder together: it holds your routine (routine.toml), your
   credentials (.env) and the reference images (images/).

# Capturing reference images

For screens the routine must click (buttons, menus, download links):

1. Open the system you want to automate.
2. Capture the element with your screenshot tool (Win+Shift+S on Windows).
3. Save the capture into the 'images' folder with a descriptive name,
   e.g. login_gmail.png or baixar_doi.png.
4. Captures must be taken at the resolution the routine will run at.

# Usage

1. Start the listener:
   - Windows: listen.bat
   - Linux/macOS: ./listen.sh
2. Say \"bom dia\".
3. The routine opens each configured site, pastes the login and senha and
   presses Enter. Do not touch mouse or keyboard while it runs.

# Notes

- Keep the microphone on while the listener runs.
- Speak the trigger phrase clearly.
- Do not move windows during the routine.
";

/// Instructions file: fixed header plus the configured image actions.
pub fn render_instructions(actions: &[ImageAction]) -> String {
    let mut text = INSTRUCTIONS_HEADER.to_string();
    if !actions.is_empty() {
        text.push_str("\n# Configured image actions\n\n");
        for action in actions {
            text.push_str(&format!(
                "- {}: after clicking '{}': {}\n",
                action.site, action.image, action.acao
            ));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_without_actions_are_the_plain_header() {
        let text = render_instructions(&[]);
        assert!(text.starts_with("# Installation and usage"));
        assert!(!text.contains("Configured image actions"));
    }

    #[test]
    fn instructions_embed_image_actions() {
        let actions = vec![ImageAction {
            site: "SEI".to_string(),
            image: "botao_entrar.png".to_string(),
            acao: "aguardar o painel abrir".to_string(),
        }];
        let text = render_instructions(&actions);
        assert!(text.contains("- SEI: after clicking 'botao_entrar.png': aguardar o painel abrir"));
    }

    #[test]
    fn listener_script_is_parameterless() {
        assert!(LISTEN_SH.contains("rotina listen"));
        assert!(!LISTEN_SH.contains("{}"));
    }
}
