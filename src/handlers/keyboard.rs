use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Tab};

pub enum KeyAction {
    Continue,
    Quit,
}

pub fn handle_key_event(app: &mut App, key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }

    // Filter text entry swallows everything else
    if app.filter_input.is_active {
        handle_filter_input(app, key);
        return KeyAction::Continue;
    }

    handle_normal_mode(app, key)
}

fn handle_filter_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.filter_input.is_active = false,
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Backspace => app.pop_filter_char(),
        KeyCode::Char(c) => app.push_filter_char(c),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('q') => return KeyAction::Quit,

        KeyCode::Tab | KeyCode::Char('l') | KeyCode::Right => app.next_tab(),
        KeyCode::BackTab | KeyCode::Char('h') | KeyCode::Left => app.prev_tab(),
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            app.tab = Tab::ALL[index];
        }

        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::PageDown => app.move_selection(10),
        KeyCode::PageUp => app.move_selection(-10),

        KeyCode::Char('/') => app.start_filter(),
        KeyCode::Esc => app.clear_filter(),

        KeyCode::Char('a') => app.archive_selected(),
        KeyCode::Char('r') => app.restore_selected(),
        KeyCode::Char('d') => app.delete_selected(),
        KeyCode::Char('s') => app.sync(),
        KeyCode::Char('t') => app.toggle_dark_mode(),

        _ => {}
    }
    KeyAction::Continue
}
