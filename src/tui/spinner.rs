//! Activity indicator for in-flight list and detail requests.

use crate::app::{AppState, SPINNER_FRAME_COUNT};

const FRAMES: [char; SPINNER_FRAME_COUNT] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn frame(idx: usize) -> char {
    FRAMES[idx % SPINNER_FRAME_COUNT]
}

/// Glyph for the header while anything is loading, `None` when idle.
pub fn activity(state: &AppState) -> Option<char> {
    state
        .has_pending_loads()
        .then(|| frame(state.spinner_frame))
}
