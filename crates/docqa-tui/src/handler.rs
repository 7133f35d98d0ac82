use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use docqa_core::LineInput;

use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text).await,
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key).await,
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::BackTab => app.focus = app.focus.prev(),

        // Available from any pane
        KeyCode::Char('u') => app.start_upload(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.console.increase_top_k(),
        KeyCode::Char('-') => app.console.decrease_top_k(),
        KeyCode::Char('a') => {
            app.focus = FocusPane::PathInput;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('/') => {
            app.focus = FocusPane::QueryInput;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Enter | KeyCode::Char('i') if app.focus.is_text_input() => {
            app.input_mode = InputMode::Editing;
        }

        _ => match app.focus {
            FocusPane::Files => handle_files_normal(app, key),
            FocusPane::Transcript => handle_transcript_normal(app, key),
            FocusPane::PathInput | FocusPane::QueryInput => {}
        },
    }
}

fn handle_files_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.files_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.files_nav_up(),
        KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => app.remove_selected_file(),
        _ => {}
    }
}

fn handle_transcript_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.entry_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.entry_nav_up(),
        KeyCode::Char('s') | KeyCode::Enter => app.toggle_selected_sources(),
        KeyCode::PageDown => app.scroll_chat_down(app.chat_height.max(1)),
        KeyCode::PageUp => app.scroll_chat_up(app.chat_height.max(1)),
        KeyCode::Char('g') => {
            app.chat_scroll = 0;
            if !app.console.transcript().is_empty() {
                app.selected_entry = Some(0);
            }
        }
        KeyCode::Char('G') => {
            app.scroll_chat_to_bottom();
            let len = app.console.transcript().len();
            app.selected_entry = len.checked_sub(1);
        }
        _ => {}
    }
}

async fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.input_mode = InputMode::Normal;
        return;
    }

    match app.focus {
        FocusPane::PathInput => handle_path_editing(app, key).await,
        FocusPane::QueryInput => handle_query_editing(app, key),
        // editing only makes sense in a text field
        FocusPane::Files | FocusPane::Transcript => app.input_mode = InputMode::Normal,
    }
}

async fn handle_path_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.add_typed_path().await,
        code => edit_line(&mut app.path_input, code),
    }
}

fn handle_query_editing(app: &mut App, key: KeyEvent) {
    let console = &mut app.console;
    match key.code {
        KeyCode::Enter => {
            if !console.input().text().trim().is_empty() && !console.is_busy() {
                app.start_query();
                app.input_mode = InputMode::Normal;
            }
        }
        KeyCode::Up => console.increase_top_k(),
        KeyCode::Down => console.decrease_top_k(),
        code => edit_line(console.input_mut(), code),
    }
}

fn edit_line(input: &mut LineInput, code: KeyCode) {
    match code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.move_left(),
        KeyCode::Right => input.move_right(),
        KeyCode::Home => input.move_home(),
        KeyCode::End => input.move_end(),
        KeyCode::Char(c) => input.insert_char(c),
        _ => {}
    }
}

/// Pasted text goes into the field being edited; otherwise it is a file drop.
async fn handle_paste(app: &mut App, text: &str) {
    match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::QueryInput) => app.console.input_mut().insert_str(text),
        (InputMode::Editing, FocusPane::PathInput) => app.path_input.insert_str(text),
        _ => app.drop_paths(text).await,
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let (x, y) = (mouse.column, mouse.row);
    let over_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));
    let over_files = app.files_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown if over_chat => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp if over_chat => app.scroll_chat_up(3),
        MouseEventKind::ScrollDown if over_files => app.files_nav_down(),
        MouseEventKind::ScrollUp if over_files => app.files_nav_up(),
        MouseEventKind::Down(_) if over_chat => app.focus = FocusPane::Transcript,
        MouseEventKind::Down(_) if over_files => app.focus = FocusPane::Files,
        _ => {}
    }
}
