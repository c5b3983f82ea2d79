use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    DismissError,
    MoveUp,
    MoveDown,
    Toggle,
    Collapse,
    Refresh,
    ReloadDetail,
    EditMask,
    OpenBrowser,
    QuickSelect(usize),
    MaskChar(char),
    MaskBackspace,
    MaskSubmit,
    MaskCancel,
    None,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub has_error: bool,
    pub is_loading: bool,
    pub editing_mask: bool,
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    if ctx.editing_mask {
        return match key.code {
            KeyCode::Enter => Action::MaskSubmit,
            KeyCode::Esc => Action::MaskCancel,
            KeyCode::Backspace => Action::MaskBackspace,
            KeyCode::Char(c) => Action::MaskChar(c),
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => {
            if ctx.has_error {
                Action::DismissError
            } else {
                Action::Quit
            }
        }
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::Right | KeyCode::Char('l' | ' ') | KeyCode::Enter => Action::Toggle,
        KeyCode::Left | KeyCode::Char('h') => Action::Collapse,
        KeyCode::Char('r') if !ctx.is_loading => Action::Refresh,
        KeyCode::Char('R') => Action::ReloadDetail,
        KeyCode::Char('m') => Action::EditMask,
        KeyCode::Char('o') => Action::OpenBrowser,
        KeyCode::Char(c) if c.is_ascii_digit() && c != '0' => {
            Action::QuickSelect((c as u8 - b'0') as usize)
        }
        _ => Action::None,
    }
}

/// Line within the list area hit by a left click, if the click landed there.
pub fn clicked_list_line(mouse: MouseEvent, list_top: u16, list_height: u16) -> Option<usize> {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return None;
    }
    let line = mouse.row.checked_sub(list_top)?;
    (line < list_height).then_some(line as usize)
}
