
use fixtures::*;
use expdash::app::{AppState, DetailRequest, RowKind};
use expdash::events::AppEvent;
use expdash::experiment::{DetailRegion, LoadState};
use expdash::input::{self, Action, InputContext};
use expdash::server::error::{FetchError, CONNECTIVITY_MESSAGE};
use expdash::server::loader;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

/// Runs one list request through the loader and applies the event it sends.
async fn refresh(state: &mut AppState, source: &FakeSource) {
    let request = state.begin_list_request();
    let (tx, mut rx) = mpsc::unbounded_channel();
    loader::request_experiment_list(source, request, &tx).await;
    match rx.recv().await {
        Some(AppEvent::ListResult { generation, result }) => {
            state.apply_list_result(generation, result);
        }
        other => panic!("expected ListResult, got {other:?}"),
    }
}

/// Runs one detail request through the loader and applies the event it sends.
async fn load_detail(state: &mut AppState, source: &FakeSource, request: DetailRequest) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    loader::load_experiment_detail(source, request, &tx).await;
    match rx.recv().await {
        Some(AppEvent::DetailResult { request, result }) => {
            state.apply_detail(&request, result);
        }
        other => panic!("expected DetailResult, got {other:?}"),
    }
}

// ========== Data flow tests ==========

#[tokio::test]
async fn list_response_is_displayed_last_first() {
    let source = FakeSource::with_list(vec![summary_fragment("F1"), summary_fragment("F2")]);
    let mut state = make_state();

    refresh(&mut state, &source).await;

    assert_eq!(displayed_ids(&state), vec!["F2", "F1"]);
    assert!(!state.list_loading);
    assert!(state.refreshed_at.is_some());
    assert_eq!(state.experiments[0].summary, "experiment F2");
}

#[tokio::test]
async fn refresh_replaces_prior_content_entirely() {
    let mut state = make_state_with_experiments(&["1", "2", "3"]);
    let request = state.toggle_item(0).unwrap();
    state.apply_detail(&request, Ok("<p>old</p>".to_string()));

    let source = FakeSource::with_list(vec![summary_fragment("9")]);
    refresh(&mut state, &source).await;

    assert_eq!(displayed_ids(&state), vec!["9"]);
    assert!(!state.experiments[0].is_active());
    assert_eq!(state.experiments[0].load_state(), LoadState::Unloaded);
    assert_eq!(state.rows.len(), 1);
}

#[tokio::test]
async fn server_error_empties_list_with_notice() {
    let mut state = make_state_with_experiments(&["1"]);
    let source = FakeSource::failing_list(FetchError::Server {
        status: 500,
        reason: "Internal Server Error".to_string(),
        detail: "no project selected".to_string(),
    });

    refresh(&mut state, &source).await;

    assert!(state.experiments.is_empty());
    let notice = state.list_notice.clone().unwrap();
    assert!(notice.title.contains("500"));
    assert!(notice.detail.contains("no project selected"));
    assert!(state.error_message().unwrap().contains("no project selected"));
}

#[tokio::test]
async fn connectivity_failure_uses_fixed_message() {
    let mut state = make_state();
    let source = FakeSource::failing_list(FetchError::connectivity("connection refused"));

    refresh(&mut state, &source).await;

    assert_eq!(state.list_notice.unwrap().detail, CONNECTIVITY_MESSAGE);
}

#[tokio::test]
async fn invalid_mask_falls_back_and_request_proceeds() {
    let mut state = make_state();
    let warning = state.set_mask_text("{invalid");
    assert!(warning.is_some());
    assert!(state.error_message().unwrap().starts_with("Invalid experiment filter"));

    let source = FakeSource::with_list(vec![summary_fragment("1")]);
    refresh(&mut state, &source).await;

    assert_eq!(
        source.last_list_query.lock().unwrap().clone(),
        Some(("default".to_string(), "{}".to_string()))
    );
    assert_eq!(displayed_ids(&state), vec!["1"]);
}

#[tokio::test]
async fn fragments_without_id_are_skipped() {
    let source = FakeSource::with_list(vec![
        summary_fragment("1"),
        fragment_without_id(),
        summary_fragment("2"),
    ]);
    let mut state = make_state();

    refresh(&mut state, &source).await;

    assert_eq!(displayed_ids(&state), vec!["2", "1"]);
    assert_eq!(state.notifications.len(), 1);
}

// ========== Item state machine scenarios ==========

#[tokio::test]
async fn click_loads_detail_then_second_click_collapses_without_fetch() {
    let source = FakeSource::default();
    source.set_detail("42", Ok("<p>details</p>".to_string()));
    let mut state = make_state_with_experiments(&["42"]);

    // First click: one fetch, item open.
    let request = state.toggle_item(0).expect("first click fetches");
    assert_eq!(request.xid, "42");
    assert!(state.experiments[0].is_active());
    assert!(state.experiments[0].is_loading());
    load_detail(&mut state, &source, request).await;

    let exp = &state.experiments[0];
    assert!(exp.is_active());
    assert!(exp.is_loaded());
    match exp.detail() {
        DetailRegion::Content { html, lines } => {
            assert_eq!(html, "<p>details</p>");
            assert_eq!(lines, &vec!["details".to_string()]);
        }
        other => panic!("expected content, got {other:?}"),
    }
    assert_eq!(source.detail_calls(), 1);

    // Second click: no call, closed, content kept.
    assert!(state.toggle_item(0).is_none());
    let exp = &state.experiments[0];
    assert!(!exp.is_active());
    assert!(exp.is_loaded());
    assert!(matches!(exp.detail(), DetailRegion::Content { .. }));

    // Third click: reopens from cache.
    assert!(state.toggle_item(0).is_none());
    assert!(state.experiments[0].is_active());
    assert_eq!(source.detail_calls(), 1);
}

#[tokio::test]
async fn timeout_leaves_item_open_and_retries_on_reopen() {
    let source = FakeSource::default();
    source.set_detail("7", Err(FetchError::connectivity("operation timed out")));
    let mut state = make_state_with_experiments(&["7"]);

    let request = state.toggle_item(0).unwrap();
    load_detail(&mut state, &source, request).await;

    let exp = &state.experiments[0];
    assert!(exp.is_active());
    assert!(!exp.is_loaded());
    match exp.detail() {
        DetailRegion::Notice(notice) => assert_eq!(notice.detail, CONNECTIVITY_MESSAGE),
        other => panic!("expected notice, got {other:?}"),
    }
    assert!(state.rows.iter().any(|r| r.kind == RowKind::Notice));

    // Close and reopen: a fresh fetch goes out.
    source.set_detail("7", Ok("<p>recovered</p>".to_string()));
    assert!(state.toggle_item(0).is_none());
    let retry = state.toggle_item(0).expect("reopen retries");
    load_detail(&mut state, &source, retry).await;

    assert!(state.experiments[0].is_loaded());
    assert_eq!(source.detail_calls(), 2);
}

#[test]
fn reexpanding_while_loading_issues_no_second_fetch() {
    let mut state = make_state_with_experiments(&["5"]);
    let first = state.toggle_item(0);
    assert!(first.is_some());
    assert!(state.toggle_item(0).is_none()); // collapse
    assert!(state.toggle_item(0).is_none()); // reopen while still loading
    assert!(state.experiments[0].is_loading());

    // The original response still lands in the item.
    assert!(state.apply_detail(&first.unwrap(), Ok("<p>late</p>".to_string())));
    assert!(state.experiments[0].is_loaded());
}

#[test]
fn collapsed_item_receives_result_and_shows_it_on_reopen() {
    let mut state = make_state_with_experiments(&["5"]);
    let request = state.toggle_item(0).unwrap();
    state.toggle_item(0);
    state.apply_detail(&request, Ok("<p>hidden</p>".to_string()));

    assert!(!state.experiments[0].is_active());
    assert!(state.experiments[0].is_loaded());
    assert!(state.toggle_item(0).is_none());
    assert!(state
        .rows
        .iter()
        .any(|r| matches!(r.kind, RowKind::Detail(_))));
}

#[test]
fn stale_list_response_is_ignored() {
    let mut state = make_state();
    let old = state.begin_list_request();
    let new = state.begin_list_request();

    assert!(state.apply_list(new.generation, vec![summary_fragment("new")]));
    assert!(!state.apply_list(old.generation, vec![summary_fragment("old")]));
    assert_eq!(displayed_ids(&state), vec!["new"]);
}

#[test]
fn detail_for_replaced_list_is_dropped() {
    let mut state = make_state_with_experiments(&["1"]);
    let request = state.toggle_item(0).unwrap();

    let refresh = state.begin_list_request();
    state.apply_list(refresh.generation, vec![summary_fragment("1")]);

    assert!(!state.apply_detail(&request, Ok("<p>stale</p>".to_string())));
    assert_eq!(state.experiments[0].load_state(), LoadState::Unloaded);
}

#[test]
fn force_reload_refetches_open_item() {
    let mut state = make_state_with_experiments(&["3"]);
    let request = state.toggle_item(0).unwrap();
    state.apply_detail(&request, Ok("<p>v1</p>".to_string()));

    let reload = state.reload_selected().expect("open item reloads now");
    assert_eq!(reload.xid, "3");
    assert!(state.experiments[0].is_loading());
    state.apply_detail(&reload, Ok("<p>v2</p>".to_string()));
    match state.experiments[0].detail() {
        DetailRegion::Content { html, .. } => assert_eq!(html, "<p>v2</p>"),
        other => panic!("expected content, got {other:?}"),
    }
}

// ========== Input to state ==========

#[test]
fn keyboard_toggle_and_click_route_to_same_item() {
    let mut state = make_state_with_experiments(&["a", "b"]);
    let ctx = InputContext::default();

    assert_eq!(input::map_key(press(KeyCode::Down), &ctx), Action::MoveDown);
    state.move_cursor_down();
    assert_eq!(input::map_key(press(KeyCode::Enter), &ctx), Action::Toggle);
    let request = state.toggle_selected().unwrap();
    assert_eq!(request.xid, "a");
    state.apply_detail(&request, Ok("<p>one</p><p>two</p>".to_string()));

    // Clicking the second detail line of "a" collapses "a".
    let height = 20;
    let line = state
        .rows
        .iter()
        .position(|r| r.slot == 1 && r.kind == RowKind::Detail(1))
        .unwrap();
    assert!(state.click_line(line, height).is_none());
    assert!(!state.experiments[1].is_active());
}

#[test]
fn mask_editor_flow() {
    let mut state = make_state();
    state.open_mask_editor();
    for c in r#"{"name":"x"}"#.chars() {
        state.mask_input(c);
    }
    assert!(state.submit_mask_editor());
    assert_eq!(state.mask.serialize(), r#"{"name":"x"}"#);
    assert!(state.mask_editor.is_none());
    assert_eq!(state.begin_list_request().mask, r#"{"name":"x"}"#);
}

// ========== TUI snapshot tests ==========

fn render_rows(state: &AppState, width: u16, height: u16) -> Vec<String> {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|f| {
            expdash::tui::render::render(f, state);
        })
        .unwrap();

    let buffer = terminal.backend().buffer().clone();
    (0..buffer.area.height)
        .map(|y| {
            (0..buffer.area.width)
                .map(|x| buffer.cell((x, y)).unwrap().symbol().to_string())
                .collect()
        })
        .collect()
}

#[test]
fn tui_header_contains_project() {
    let state = make_state_with_experiments(&["1"]);
    let rows = render_rows(&state, 80, 24);
    assert!(
        rows[0].contains("default"),
        "Header should contain project, got: {}",
        rows[0]
    );
    assert!(rows[0].contains("expdash"));
}

#[test]
fn tui_footer_contains_key_hints() {
    let state = make_state_with_experiments(&["1"]);
    let rows = render_rows(&state, 80, 24);
    let footer = &rows[23];
    assert!(
        footer.contains("navigate"),
        "Footer should contain 'navigate' hint, got: {footer}"
    );
}

#[test]
fn tui_list_renders_experiments_below_header() {
    let state = make_state_with_experiments(&["11", "12"]);
    let rows = render_rows(&state, 80, 24);
    assert!(rows[2].contains("12"), "got: {}", rows[2]);
    assert!(rows[2].contains("experiment 12"));
    assert!(rows[3].contains("11"), "got: {}", rows[3]);
}

#[test]
fn tui_list_notice_when_empty_after_failure() {
    let mut state = make_state();
    let request = state.begin_list_request();
    state.fail_list(request.generation, &FetchError::connectivity("refused"));
    let rows = render_rows(&state, 80, 24);
    assert!(rows[2].contains("Connection error"), "got: {}", rows[2]);
}
