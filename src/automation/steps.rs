//! Scripted GUI step sequences.
//!
//! Some portals cannot be driven by URL navigation alone: the Diário
//! Oficial download, for instance, needs a new tab, a typed address, a
//! burst of Tab presses and a click on a reference image. Step scripts
//! express those flows as data instead of code.

use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use enigo::Key;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{InputDriver, vision};

/// A single scripted GUI step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Open a URL in the default browser.
    OpenUrl { url: String },
    /// Open a new browser tab.
    NewTab,
    /// Focus the browser address bar.
    FocusAddressBar,
    /// Type text with a fixed per-character interval.
    TypeText {
        text: String,
        #[serde(default)]
        char_interval_ms: u64,
    },
    /// Press a named key one or more times.
    Press {
        key: String,
        #[serde(default = "default_times")]
        times: usize,
        #[serde(default)]
        interval_ms: u64,
    },
    /// Locate a template image on screen and click it.
    ClickImage { name: String },
    /// Sleep for a fixed number of seconds.
    Wait { secs: u64 },
}

fn default_times() -> usize {
    1
}

/// A step script file: `[[step]]` entries executed in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepScript {
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl StepScript {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read step script {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse step script {}", path.display()))
    }
}

/// Execute every step in order. Image clicks resolve against `images_dir`.
pub fn run_script(script: &StepScript, images_dir: &Path) -> Result<()> {
    let mut input = InputDriver::new()?;
    for (index, step) in script.steps.iter().enumerate() {
        info!(step = index + 1, total = script.steps.len(), "running step");
        execute_step(&mut input, step, images_dir)
            .with_context(|| format!("step {} failed", index + 1))?;
    }
    Ok(())
}

fn execute_step(input: &mut InputDriver, step: &Step, images_dir: &Path) -> Result<()> {
    match step {
        Step::OpenUrl { url } => {
            webbrowser::open(url).with_context(|| format!("failed to open {url}"))?;
        }
        Step::NewTab => input.chord('t')?,
        Step::FocusAddressBar => input.chord('l')?,
        Step::TypeText { text, char_interval_ms } => {
            input.type_text(text, Duration::from_millis(*char_interval_ms))?;
        }
        Step::Press { key, times, interval_ms } => {
            let key = parse_key(key)?;
            input.press_times(key, *times, Duration::from_millis(*interval_ms))?;
        }
        Step::ClickImage { name } => {
            // Best-effort, like the collaborator it wraps: a missing
            // template skips the click instead of aborting the script.
            if !vision::locate_and_click(input, name, images_dir)? {
                warn!(template = %name, "template not found, click skipped");
            }
        }
        Step::Wait { secs } => sleep(Duration::from_secs(*secs)),
    }
    Ok(())
}

fn parse_key(name: &str) -> Result<Key> {
    let key = match name.to_ascii_lowercase().as_str() {
        "tab" => Key::Tab,
        "enter" | "return" => Key::Return,
        "space" => Key::Space,
        "escape" | "esc" => Key::Escape,
        "backspace" => Key::Backspace,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => bail!("unknown key name {name:?}"),
            }
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_script() {
        let script: StepScript = toml::from_str(
            r#"
            [[step]]
            action = "new_tab"

            [[step]]
            action = "focus_address_bar"

            [[step]]
            action = "type_text"
            text = "https://defensoria.al.def.br/diario-oficial"
            char_interval_ms = 100

            [[step]]
            action = "press"
            key = "tab"
            times = 19
            interval_ms = 100

            [[step]]
            action = "click_image"
            name = "baixar_doi"

            [[step]]
            action = "wait"
            secs = 2
            "#,
        )
        .unwrap();

        assert_eq!(script.steps.len(), 6);
        assert_eq!(script.steps[0], Step::NewTab);
        assert_eq!(
            script.steps[3],
            Step::Press { key: "tab".to_string(), times: 19, interval_ms: 100 }
        );
        assert_eq!(script.steps[5], Step::Wait { secs: 2 });
    }

    #[test]
    fn press_defaults_to_a_single_stroke() {
        let script: StepScript =
            toml::from_str("[[step]]\naction = \"press\"\nkey = \"enter\"\n").unwrap();
        assert_eq!(
            script.steps[0],
            Step::Press { key: "enter".to_string(), times: 1, interval_ms: 0 }
        );
    }

    #[test]
    fn empty_file_is_an_empty_script() {
        let script: StepScript = toml::from_str("").unwrap();
        assert!(script.steps.is_empty());
    }

    #[test]
    fn key_names_resolve() {
        assert_eq!(parse_key("Tab").unwrap(), Key::Tab);
        assert_eq!(parse_key("ENTER").unwrap(), Key::Return);
        assert_eq!(parse_key("a").unwrap(), Key::Unicode('a'));
        assert!(parse_key("hyperspace").is_err());
    }
}
