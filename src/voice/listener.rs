//! The voice trigger loop.
//!
//! Two states, forever: LISTENING records a phrase and checks the
//! transcript for the trigger; DISPATCHING runs the automation child
//! process to completion, then the loop listens again. Recognition
//! misses are logged and swallowed.
//!
//! The loop runs on a background thread but is not daemonic: it owns a
//! stop flag observed once per iteration, so `stop()` + `join()` shut it
//! down cleanly.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::transcribe::{TranscribeError, Transcriber, matches_trigger};

/// Pause between listening iterations after a miss or a dispatch.
const LOOP_PAUSE: Duration = Duration::from_secs(1);

/// What the loop is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Listening,
    Dispatching,
}

/// The child process run when the trigger phrase is heard.
#[derive(Debug, Clone)]
pub struct DispatchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl DispatchCommand {
    /// Dispatch re-invokes this binary's `run` subcommand.
    pub fn self_run(work_dir: &Path) -> Result<Self> {
        let program = std::env::current_exe().context("failed to resolve current executable")?;
        Ok(Self {
            program,
            args: vec!["--path".to_string(), work_dir.display().to_string(), "run".to_string()],
        })
    }
}

/// Background voice-trigger worker.
pub struct VoiceListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl VoiceListener {
    /// Start the listener thread.
    ///
    /// `source` yields one wav-encoded phrase per call (in production, a
    /// sox recording of fixed length).
    pub fn spawn<S, T>(source: S, transcriber: T, trigger: String, dispatch: DispatchCommand) -> Self
    where
        S: FnMut() -> Result<Vec<u8>> + Send + 'static,
        T: Transcriber + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            listen_loop(source, &transcriber, &trigger, &dispatch, &stop_flag);
        });
        Self { stop, handle: Some(handle) }
    }

    /// Ask the loop to stop after the current iteration.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Wait for the loop to exit.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn listen_loop<S>(
    mut source: S,
    transcriber: &dyn Transcriber,
    trigger: &str,
    dispatch: &DispatchCommand,
    stop: &AtomicBool,
) where
    S: FnMut() -> Result<Vec<u8>>,
{
    info!(trigger, "voice listener started");
    let mut state = ListenerState::Listening;

    while !stop.load(Ordering::SeqCst) {
        debug!(?state, "waiting for trigger phrase");

        let wav = match source() {
            Ok(wav) => wav,
            Err(e) => {
                error!("phrase capture failed: {e:#}");
                thread::sleep(LOOP_PAUSE);
                continue;
            }
        };

        match transcriber.transcribe(&wav) {
            Ok(transcript) => {
                if matches_trigger(&transcript, trigger) {
                    state = ListenerState::Dispatching;
                    info!(?state, %transcript, "trigger phrase recognized, dispatching routine");
                    dispatch_routine(dispatch);
                    state = ListenerState::Listening;
                } else {
                    debug!(%transcript, "no trigger in transcript");
                }
            }
            Err(TranscribeError::UnknownAudio) => debug!("could not understand the audio"),
            Err(e @ TranscribeError::RequestFailure { .. }) => warn!("{e}"),
        }

        // Fixed pause between iterations, matching the polling cadence of
        // the desktop assistant this replaces.
        thread::sleep(LOOP_PAUSE);
    }

    info!("voice listener stopped");
}

/// Synchronously run the automation child process to completion.
///
/// Dispatch blocks the loop. A startup-triggered routine may still be
/// running concurrently; the two are intentionally not serialized.
fn dispatch_routine(dispatch: &DispatchCommand) {
    match Command::new(&dispatch.program).args(&dispatch.args).status() {
        Ok(status) if status.success() => info!("routine dispatch finished"),
        Ok(status) => warn!("routine dispatch exited with {status}"),
        Err(e) => error!("failed to dispatch routine: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedTranscriber {
        replies: Mutex<Vec<Result<String, TranscribeError>>>,
    }

    impl Transcriber for ScriptedTranscriber {
        fn transcribe(&self, _wav: &[u8]) -> Result<String, TranscribeError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Err(TranscribeError::UnknownAudio)
            } else {
                replies.remove(0)
            }
        }
    }

    #[test]
    fn listener_stops_on_signal_and_joins() {
        let transcriber = ScriptedTranscriber { replies: Mutex::new(vec![]) };
        let listener = VoiceListener::spawn(
            || Ok(vec![0u8; 4]),
            transcriber,
            "bom dia".to_string(),
            DispatchCommand { program: PathBuf::from("true"), args: vec![] },
        );
        listener.stop();
        listener.join();
    }

    #[test]
    fn recognition_failures_keep_the_loop_alive() {
        let transcriber = ScriptedTranscriber {
            replies: Mutex::new(vec![
                Err(TranscribeError::RequestFailure { message: "timeout".to_string() }),
                Ok("boa tarde".to_string()),
            ]),
        };
        let listener = VoiceListener::spawn(
            || Ok(vec![0u8; 4]),
            transcriber,
            "bom dia".to_string(),
            DispatchCommand { program: PathBuf::from("true"), args: vec![] },
        );
        // Let a couple of iterations run, then shut down; neither the
        // failure nor the non-match may kill the thread.
        thread::sleep(Duration::from_millis(2500));
        listener.stop();
        listener.join();
    }
}
