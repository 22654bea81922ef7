//! Clipboard and synthesized keyboard/mouse input.
//!
//! Credentials are pasted from the clipboard rather than typed, so the
//! text lands in whichever field currently has focus. The routine has no
//! way to verify focus; that is the deal the whole toolkit makes.

use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result};
use arboard::Clipboard;
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

/// Modifier for paste and browser chords (Cmd on macOS, Ctrl elsewhere).
#[cfg(target_os = "macos")]
const CHORD_MODIFIER: Key = Key::Meta;
#[cfg(not(target_os = "macos"))]
const CHORD_MODIFIER: Key = Key::Control;

/// Handle to the OS input synthesizer.
pub struct InputDriver {
    enigo: Enigo,
}

impl InputDriver {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .context("failed to initialize input synthesis")?;
        Ok(Self { enigo })
    }

    /// Copy `text` to the clipboard and synthesize the paste chord.
    pub fn copy_and_paste(&mut self, text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new().context("failed to access clipboard")?;
        clipboard.set_text(text).context("failed to copy to clipboard")?;
        // Give the clipboard a moment before pasting into the focused app.
        sleep(Duration::from_millis(50));
        self.chord('v')
    }

    /// Press modifier + `letter` (ctrl+T, ctrl+L, ctrl+V, ...).
    pub fn chord(&mut self, letter: char) -> Result<()> {
        self.enigo
            .key(CHORD_MODIFIER, Direction::Press)
            .context("failed to press chord modifier")?;
        let pressed = self.enigo.key(Key::Unicode(letter), Direction::Click);
        // Always release the modifier, even when the letter failed.
        let released = self.enigo.key(CHORD_MODIFIER, Direction::Release);
        pressed.with_context(|| format!("failed to press chord key {letter:?}"))?;
        released.context("failed to release chord modifier")?;
        Ok(())
    }

    /// Press and release a single key.
    pub fn press(&mut self, key: Key) -> Result<()> {
        self.enigo
            .key(key, Direction::Click)
            .with_context(|| format!("failed to press {key:?}"))
    }

    /// Press a key `times` times with a fixed pause between presses.
    pub fn press_times(&mut self, key: Key, times: usize, interval: Duration) -> Result<()> {
        for i in 0..times {
            self.press(key)?;
            if i + 1 < times {
                sleep(interval);
            }
        }
        Ok(())
    }

    /// Type text through the keyboard layer (used by step scripts).
    pub fn type_text(&mut self, text: &str, char_interval: Duration) -> Result<()> {
        if char_interval.is_zero() {
            return self.enigo.text(text).context("failed to type text");
        }
        for ch in text.chars() {
            self.enigo
                .key(Key::Unicode(ch), Direction::Click)
                .with_context(|| format!("failed to type {ch:?}"))?;
            sleep(char_interval);
        }
        Ok(())
    }

    /// Move the cursor to absolute screen coordinates and left-click.
    pub fn click_at(&mut self, x: i32, y: i32) -> Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .context("failed to move cursor")?;
        self.enigo
            .button(Button::Left, Direction::Click)
            .context("failed to click")?;
        Ok(())
    }
}
