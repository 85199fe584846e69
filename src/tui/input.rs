//! Input handling and keybindings.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

/// Result of decoding a key event.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Unrecognized key, ignore.
    None,
    /// Move the sorted column one left, wrapping.
    SortLeft,
    /// Move the sorted column one right, wrapping.
    SortRight,
    /// Toggle the paused flag.
    TogglePause,
    /// Clear the paused flag.
    Resume,
    /// Quit the application.
    Quit,
}

/// Maps a key event to its action. Ctrl+C quits like `q` so an interrupt
/// in raw mode still shuts down cleanly.
pub fn decode_key(key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        KeyCode::Left => KeyAction::SortLeft,
        KeyCode::Right => KeyAction::SortRight,
        KeyCode::Char('p') => KeyAction::TogglePause,
        KeyCode::Char(' ') => KeyAction::Resume,
        _ => KeyAction::None,
    }
}

/// Waits up to `timeout` for the next key press. Non-key events (resize,
/// mouse) are swallowed; the next draw picks up a new terminal size anyway.
pub fn read_key(timeout: Duration) -> io::Result<Option<KeyEvent>> {
    if event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_keys() {
        assert_eq!(decode_key(key(KeyCode::Char('q'))), KeyAction::Quit);
        assert_eq!(decode_key(key(KeyCode::Esc)), KeyAction::Quit);
        assert_eq!(
            decode_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyAction::Quit
        );
    }

    #[test]
    fn sort_keys_map_to_directions() {
        assert_eq!(decode_key(key(KeyCode::Left)), KeyAction::SortLeft);
        assert_eq!(decode_key(key(KeyCode::Right)), KeyAction::SortRight);
    }

    #[test]
    fn pause_toggles_and_space_resumes() {
        assert_eq!(decode_key(key(KeyCode::Char('p'))), KeyAction::TogglePause);
        assert_eq!(decode_key(key(KeyCode::Char(' '))), KeyAction::Resume);
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        assert_eq!(decode_key(key(KeyCode::Char('x'))), KeyAction::None);
        assert_eq!(decode_key(key(KeyCode::Up)), KeyAction::None);
        assert_eq!(decode_key(key(KeyCode::Enter)), KeyAction::None);
    }
}
