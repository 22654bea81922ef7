//! Preset site catalogue, credential-key synthesis and input validation.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A preset site eligible for one-click configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetSite {
    /// Upper-snake identifier used to synthesize credential keys.
    pub key: &'static str,
    /// Display name shown in the configurator.
    pub name: &'static str,
    pub url: &'static str,
}

/// Fixed lookup table of preset sites.
pub const PRESET_SITES: &[PresetSite] = &[
    PresetSite { key: "GMAIL", name: "GMail", url: "https://mail.google.com" },
    PresetSite { key: "SPOTIFY", name: "Spotify", url: "https://open.spotify.com" },
    PresetSite { key: "GOOGLE_AGENDA", name: "Google Agenda", url: "https://calendar.google.com" },
    PresetSite { key: "SITES_DE_NOTICIAS", name: "Sites de Notícias", url: "https://g1.globo.com" },
    PresetSite { key: "YOUTUBE", name: "YouTube", url: "https://www.youtube.com" },
    PresetSite { key: "WEBMAIL", name: "Webmail", url: "https://webmail.itec.al.gov.br" },
    PresetSite { key: "SEI", name: "SEI", url: "https://sei.al.gov.br/sip/login.php" },
    PresetSite { key: "TJ_AL", name: "TJ-AL (e-SAJ)", url: "https://www2.tjal.jus.br/sajcas/login" },
    PresetSite { key: "SOLAR", name: "SOLAR", url: "https://solar.defensoria.al.def.br/atendimento/" },
    PresetSite { key: "CHATGPT", name: "ChatGPT", url: "https://chat.openai.com" },
    PresetSite { key: "DIARIO_OFICIAL", name: "Diário Oficial", url: "https://defensoria.al.def.br/diario-oficial" },
];

/// Look up a preset by its credential-key identifier.
pub fn preset_by_key(key: &str) -> Option<&'static PresetSite> {
    PRESET_SITES.iter().find(|p| p.key == key)
}

/// Look up a preset by display name or key identifier.
pub fn preset_by_name(name: &str) -> Option<&'static PresetSite> {
    PRESET_SITES.iter().find(|p| p.name == name || p.key == name)
}

pub fn login_key(site_key: &str) -> String {
    format!("LOGIN_{site_key}")
}

pub fn senha_key(site_key: &str) -> String {
    format!("SENHA_{site_key}")
}

pub fn custom_url_key(index: usize) -> String {
    format!("URL_CUSTOM_{index}")
}

pub fn custom_login_key(index: usize) -> String {
    format!("LOGIN_CUSTOM_{index}")
}

pub fn custom_senha_key(index: usize) -> String {
    format!("SENHA_CUSTOM_{index}")
}

/// A user-defined site outside the preset catalogue.
///
/// The position inside the session list doubles as the credential index
/// (`URL_CUSTOM_<i>` and friends), so callers must keep the list dense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomSite {
    pub nome: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub senha: Option<String>,
}

/// http/https URL with a domain, `localhost` or an IPv4 address, an
/// optional port and an optional path.
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https?://(?:(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,6}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
    )
    .expect("valid URL regex")
});

pub fn validate_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// Strip characters that are invalid in file names.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect()
}
