//! Voice trigger: microphone capture, transcription, dispatch loop.

pub mod listener;
pub mod recording;
pub mod transcribe;

pub use listener::{DispatchCommand, ListenerState, VoiceListener};
pub use transcribe::{CloudTranscriber, TranscribeError, Transcriber, matches_trigger};
