use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use docqa_core::{ChatRole, TranscriptEntry};
use crate::app::{App, FocusPane, InputMode};

/// Render `**bold**` spans. Text with an unbalanced marker is left literal.
fn styled_answer_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    if parts.len() % 2 == 0 {
        return Line::from(text.to_string());
    }

    let spans: Vec<Span<'static>> = parts
        .into_iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(part.to_string())
            }
        })
        .collect();

    Line::from(spans)
}

fn border_color(focused: bool) -> Color {
    if focused {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let [upload_area, chat_area] = Layout::horizontal([
        Constraint::Percentage(40),
        Constraint::Percentage(60),
    ])
    .areas(body_area);

    render_uploader(app, frame, upload_area);
    render_console(app, frame, chat_area);

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" docqa ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [Span::styled(key, key_style), Span::styled(label, label_style)]
    };

    let hints: Vec<Span> = match (app.input_mode, app.focus) {
        (InputMode::Editing, FocusPane::PathInput) => {
            [hint(" Enter ", " add file "), hint(" Esc ", " stop typing ")].concat()
        }
        (InputMode::Editing, _) => [
            hint(" Enter ", " send "),
            hint(" ↑/↓ ", " top-k "),
            hint(" Esc ", " stop typing "),
        ]
        .concat(),
        (InputMode::Normal, FocusPane::Files) => [
            hint(" j/k ", " nav "),
            hint(" d ", " remove "),
            hint(" a ", " add "),
            hint(" u ", " upload "),
            hint(" Tab ", " focus "),
            hint(" q ", " quit "),
        ]
        .concat(),
        (InputMode::Normal, FocusPane::Transcript) => [
            hint(" j/k ", " select "),
            hint(" s ", " sources "),
            hint(" g/G ", " top/bottom "),
            hint(" / ", " ask "),
            hint(" Tab ", " focus "),
            hint(" q ", " quit "),
        ]
        .concat(),
        (InputMode::Normal, _) => [
            hint(" i ", " edit "),
            hint(" +/- ", " top-k "),
            hint(" u ", " upload "),
            hint(" Tab ", " focus "),
            hint(" q ", " quit "),
        ]
        .concat(),
    };

    let footer_content = Line::from(
        vec![Span::styled(mode_text, mode_style), Span::styled(" ", label_style)]
            .into_iter()
            .chain(hints)
            .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_uploader(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, status_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(4),
        Constraint::Length(3),
    ])
    .areas(area);

    app.files_area = Some(list_area);

    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Files)))
        .title(format!(" Files ({}) ", app.uploader.len()));

    if app.uploader.is_empty() {
        let empty = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                format!("Drop {} files here", app.uploader.filter().describe()),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "or press 'a' to type a path",
                Style::default().fg(Color::DarkGray),
            )),
        ]))
        .block(list_block)
        .wrap(Wrap { trim: true });
        frame.render_widget(empty, list_area);
    } else {
        let items: Vec<ListItem> = app
            .uploader
            .pending()
            .iter()
            .map(|file| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!(" {} ", file.name)),
                    Span::styled(file.display_size(), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(list_block)
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");

        frame.render_stateful_widget(list, list_area, &mut app.files_state);
    }

    // Status: in-flight spinner, last outcome, ingestion summary
    let mut status_lines: Vec<Line> = Vec::new();
    if app.uploader.is_busy() {
        let uploading = app.upload_task.as_ref().map_or(0, |(batch, _)| batch.len());
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        status_lines.push(Line::from(Span::styled(
            format!("Uploading {} file(s){}", uploading, dots),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(status) = app.uploader.status() {
        let color = if status.is_error() { Color::Red } else { Color::Green };
        status_lines.push(Line::from(Span::styled(
            status.message().to_string(),
            Style::default().fg(color),
        )));
    }
    if let Some(err) = &app.path_error {
        status_lines.push(Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red))));
    }
    if let Some(summary) = &app.last_ingest {
        status_lines.push(Line::from(Span::styled(
            format!("Indexed: {}", summary),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let status = Paragraph::new(Text::from(status_lines))
        .block(Block::default().borders(Borders::ALL).title(" Status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, status_area);

    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::PathInput;
    render_line_input(
        frame,
        input_area,
        " Add file path ",
        app.path_input.text(),
        app.path_input.cursor(),
        app.focus == FocusPane::PathInput,
        editing,
    );
}

fn entry_lines(entry: &TranscriptEntry, selected: bool, sources_open: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let marker = if selected { "> " } else { "" };
    let timestamp = entry.created_at.format("%H:%M").to_string();

    let (label, color) = match entry.role {
        ChatRole::User => ("You:", Color::Cyan),
        ChatRole::Assistant => ("AI:", Color::Yellow),
    };
    lines.push(Line::from(vec![
        Span::styled(
            format!("{}{}", marker, label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {}", timestamp), Style::default().fg(Color::DarkGray)),
    ]));

    match entry.role {
        ChatRole::User => lines.extend(entry.content.lines().map(|l| Line::from(l.to_string()))),
        ChatRole::Assistant => lines.extend(entry.content.lines().map(styled_answer_line)),
    }

    if !entry.sources.is_empty() {
        let toggle = if sources_open { "▾" } else { "▸" };
        lines.push(Line::from(Span::styled(
            format!("{} {} source(s)", toggle, entry.sources.len()),
            Style::default().fg(Color::Magenta),
        )));
        if sources_open {
            for source in &entry.sources {
                lines.push(Line::from(vec![
                    Span::styled(format!("  [{}] ", source.id), Style::default().fg(Color::Magenta)),
                    Span::styled(source.text.clone(), Style::default().fg(Color::Gray)),
                ]));
            }
        }
    }

    lines.push(Line::default());
    lines
}

fn render_console(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing and scroll calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app.focus == FocusPane::Transcript)))
        .title(format!(" Chat · top-k {} ", app.console.top_k()));

    let transcript = app.console.transcript();
    let chat_text = if transcript.is_empty() && !app.console.is_busy() {
        Text::from(Span::styled(
            "Ask a question about your documents...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = transcript
            .iter()
            .enumerate()
            .flat_map(|(i, entry)| {
                entry_lines(entry, app.selected_entry == Some(i), app.console.sources_open(i))
            })
            .collect();

        if app.console.is_busy() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing && app.focus == FocusPane::QueryInput;
    let title = if app.console.is_busy() { " Ask (waiting for answer) " } else { " Ask " };
    render_line_input(
        frame,
        input_area,
        title,
        app.console.input().text(),
        app.console.input().cursor(),
        app.focus == FocusPane::QueryInput,
        editing,
    );
}

fn render_line_input(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    text: &str,
    cursor_pos: usize,
    focused: bool,
    editing: bool,
) {
    let color = if editing {
        Color::Yellow
    } else {
        border_color(focused)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title.to_string());

    // Horizontal scroll keeps the cursor visible; inner width excludes borders
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = text.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
