//! Microphone capture through a sox `rec` subprocess.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Record one phrase of `secs` seconds into `out_path` and return the wav
/// bytes (16 kHz mono 16-bit, what the recognition endpoint expects).
pub fn record_phrase(out_path: &Path, secs: f32) -> Result<Vec<u8>> {
    let status = Command::new("rec")
        .args([
            "-r",
            "16000", // 16kHz sample rate
            "-c",
            "1", // Mono
            "-b",
            "16", // 16-bit
        ])
        .arg(out_path)
        .args(["trim", "0", &format!("{secs}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("failed to start `rec` (is sox installed?)")?;

    if !status.success() {
        bail!("`rec` exited with {status}");
    }

    std::fs::read(out_path)
        .with_context(|| format!("failed to read recording {}", out_path.display()))
}

/// Check that the sox `rec` binary is on the PATH.
pub fn recorder_available() -> bool {
    Command::new("rec")
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
