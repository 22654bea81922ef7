//! Speech transcription collaborator.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::SpeechSettings;

/// Errors surfaced by the speech collaborator.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The service could not make out any speech in the audio.
    #[error("could not understand the audio")]
    UnknownAudio,
    /// The request to the recognition service failed.
    #[error("speech recognition request failed: {message}")]
    RequestFailure { message: String },
}

/// Converts a captured phrase into text.
pub trait Transcriber {
    /// Transcribe a wav-encoded phrase.
    fn transcribe(&self, wav: &[u8]) -> Result<String, TranscribeError>;
}

/// Response body of the recognition endpoint.
#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    transcript: String,
}

/// HTTP client for the recognition endpoint.
///
/// POSTs the wav body with a `lang` query parameter; an empty transcript
/// in the reply maps to [`TranscribeError::UnknownAudio`].
pub struct CloudTranscriber {
    endpoint: String,
    language: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

impl CloudTranscriber {
    pub fn new(endpoint: String, language: String, api_key: Option<String>) -> Self {
        Self { endpoint, language, api_key, agent: ureq::AgentBuilder::new().build() }
    }

    /// Build from the speech settings; the API key is read from the
    /// configured environment variable.
    pub fn from_config(speech: &SpeechSettings) -> Self {
        let api_key = std::env::var(&speech.api_key_env).ok().filter(|key| !key.is_empty());
        Self::new(speech.endpoint.clone(), speech.language.clone(), api_key)
    }
}

impl Transcriber for CloudTranscriber {
    fn transcribe(&self, wav: &[u8]) -> Result<String, TranscribeError> {
        let mut request = self
            .agent
            .post(&self.endpoint)
            .query("lang", &self.language)
            .set("Content-Type", "audio/wav");
        if let Some(key) = &self.api_key {
            request = request.set("Authorization", &format!("Bearer {key}"));
        }

        let response = request
            .send_bytes(wav)
            .map_err(|e| TranscribeError::RequestFailure { message: e.to_string() })?;
        let body: TranscriptResponse = response
            .into_json()
            .map_err(|e| TranscribeError::RequestFailure { message: e.to_string() })?;

        let text = body.transcript.trim().to_string();
        if text.is_empty() {
            return Err(TranscribeError::UnknownAudio);
        }
        debug!(transcript = %text, "speech recognized");
        Ok(text)
    }
}

/// Case-insensitive substring test for the trigger phrase.
pub fn matches_trigger(transcript: &str, trigger: &str) -> bool {
    transcript.to_lowercase().contains(&trigger.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_matches_anywhere_in_the_transcript() {
        assert!(matches_trigger("hoje está um bom dia", "bom dia"));
        assert!(matches_trigger("bom dia", "bom dia"));
    }

    #[test]
    fn trigger_match_is_case_insensitive() {
        assert!(matches_trigger("Bom Dia, tudo bem?", "bom dia"));
        assert!(matches_trigger("BOM DIA", "bom dia"));
    }

    #[test]
    fn unrelated_transcripts_do_not_trigger() {
        assert!(!matches_trigger("boa tarde", "bom dia"));
        assert!(!matches_trigger("bom", "bom dia"));
        assert!(!matches_trigger("", "bom dia"));
    }
}
