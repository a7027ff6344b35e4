//! Terminal key events to composer input.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rh_core::Input;

/// Decodes a key press. Releases, repeats and unmapped keys yield `None`.
pub fn to_input(key: KeyEvent) -> Option<Input> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let input = match key.code {
        KeyCode::Char(ch) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Input::Ctrl(ch.to_ascii_lowercase())
        }
        KeyCode::Char(ch) => Input::Char(ch),
        KeyCode::Up => Input::Up,
        KeyCode::Down => Input::Down,
        KeyCode::Left => Input::Left,
        KeyCode::Right => Input::Right,
        KeyCode::Enter => Input::Enter,
        KeyCode::Esc => Input::Esc,
        KeyCode::Tab => Input::Tab,
        KeyCode::Backspace => Input::Backspace,
        _ => return None,
    };
    Some(input)
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_and_shifted_characters() {
        assert_eq!(
            to_input(press(KeyCode::Char('j'), KeyModifiers::NONE)),
            Some(Input::Char('j'))
        );
        assert_eq!(
            to_input(press(KeyCode::Char('J'), KeyModifiers::SHIFT)),
            Some(Input::Char('J'))
        );
    }

    #[test]
    fn control_chords() {
        assert_eq!(
            to_input(press(KeyCode::Char('s'), KeyModifiers::CONTROL)),
            Some(Input::Ctrl('s'))
        );
        assert_eq!(
            to_input(press(KeyCode::Char('C'), KeyModifiers::CONTROL | KeyModifiers::SHIFT)),
            Some(Input::Ctrl('c'))
        );
    }

    #[test]
    fn releases_and_unmapped_keys_are_dropped() {
        let release = KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(to_input(release), None);
        assert_eq!(to_input(press(KeyCode::F(5), KeyModifiers::NONE)), None);
    }
}
