use crate::state::{AssistantView, ConversationView, EntryBody, Region, ToolBlock};
use crate::types::{ConversationId, ConversationSummary, Role};
use crate::ui::input_metrics::{cursor_row_col, truncate_line, wrap_input_lines, wrap_styled_line};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

const TOOL_ICON: &str = "⚙";
const TOOL_PENDING: &str = "…";
const TOOL_DONE: &str = "✓";

/// A modal dialog drawn over everything else.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modal<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub hint: &'a str,
}

fn role_style(role: Role) -> Style {
    let color = match role {
        Role::User => Color::Green,
        Role::Assistant => Color::Magenta,
        Role::Other => Color::DarkGray,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Header line plus optional pretty-printed arguments for one tool block.
pub fn tool_block_lines(block: &ToolBlock, expanded: bool) -> Vec<Line<'static>> {
    let status = if block.is_done() {
        Span::styled(TOOL_DONE, Style::default().fg(Color::Green))
    } else {
        Span::styled(TOOL_PENDING, Style::default().fg(Color::Yellow))
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("{TOOL_ICON} Calling tool: {}", block.tool),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" "),
        status,
    ])];

    if expanded {
        let args = serde_json::to_string_pretty(&block.args)
            .unwrap_or_else(|_| block.args.to_string());
        let style = Style::default().fg(Color::DarkGray);
        lines.extend(
            args.lines()
                .map(|line| Line::styled(format!("    {line}"), style)),
        );
    }
    lines
}

fn assistant_lines(assistant: &AssistantView, out: &mut Vec<Line<'static>>) {
    for region in assistant.regions() {
        match region {
            Region::Text => out.extend(assistant.text().lines.iter().cloned()),
            Region::Tool(index) => {
                if let Some(block) = assistant.tools().get(*index) {
                    out.extend(tool_block_lines(block, assistant.is_expanded(*index)));
                }
            }
        }
    }
}

/// Flattens the conversation view into display lines, one labelled block per entry.
pub fn conversation_lines(view: &ConversationView) -> Vec<Line<'static>> {
    if let Some(placeholder) = view.placeholder() {
        return vec![Line::styled(
            placeholder.message(),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )];
    }

    let mut lines = Vec::new();
    for (index, entry) in view.entries().iter().enumerate() {
        if index > 0 {
            lines.push(Line::default());
        }
        lines.push(Line::styled(entry.role.label(), role_style(entry.role)));
        match &entry.body {
            EntryBody::Rendered(text) => lines.extend(text.lines.iter().cloned()),
            EntryBody::Assistant(assistant) => assistant_lines(assistant, &mut lines),
        }
    }
    lines
}

/// First visible row when `from_bottom` rows are hidden below the viewport.
pub fn history_scroll_top(total_rows: usize, viewport_rows: usize, from_bottom: usize) -> usize {
    let max_top = total_rows.saturating_sub(viewport_rows);
    max_top.saturating_sub(from_bottom)
}

/// Rows `lines` occupy once hard-wrapped to `width` columns.
pub fn wrapped_row_count(lines: &[Line<'static>], width: usize) -> usize {
    lines
        .iter()
        .map(|line| wrap_styled_line(line, width).len())
        .sum()
}

pub fn render_history(
    frame: &mut Frame<'_>,
    area: Rect,
    lines: &[Line<'static>],
    scroll_from_bottom: usize,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let rows: Vec<Line<'static>> = lines
        .iter()
        .flat_map(|line| wrap_styled_line(line, area.width as usize))
        .collect();
    let top = history_scroll_top(rows.len(), area.height as usize, scroll_from_bottom);
    let visible: Vec<Line<'static>> = rows
        .into_iter()
        .skip(top)
        .take(area.height as usize)
        .collect();

    frame.render_widget(
        Paragraph::new(Text::from(visible)).style(Style::default().fg(Color::White)),
        area,
    );
}

pub fn render_sidebar(
    frame: &mut Frame<'_>,
    area: Rect,
    conversations: &[ConversationSummary],
    selected: Option<usize>,
    active: Option<ConversationId>,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let block = Block::default()
        .borders(Borders::RIGHT)
        .title("Conversations")
        .style(Style::default().fg(Color::Gray));
    let label_width = block.inner(area).width.saturating_sub(2).max(1) as usize;

    let items: Vec<ListItem<'_>> = conversations
        .iter()
        .map(|conversation| {
            let label = truncate_line(&conversation.title, label_width);
            let style = if Some(conversation.id) == active {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::styled(label, style))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_symbol("> ")
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

pub fn render_header(frame: &mut Frame<'_>, area: Rect, title: &str, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let title = truncate_line(title, width);
    let remaining = width.saturating_sub(title.chars().count() + 3);
    let mut spans = vec![Span::styled(
        title,
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if remaining > 0 && !status.is_empty() {
        spans.push(Span::styled(
            format!(" | {}", truncate_line(status, remaining)),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_input_lines(input, width).len().max(1)
}

/// Draws the prompt; `ready` is false while sending is disabled.
pub fn render_input(frame: &mut Frame<'_>, area: Rect, input: &str, cursor_byte: usize, ready: bool) {
    if area.height == 0 || area.width <= 2 {
        return;
    }
    let input_width = area.width.saturating_sub(2).max(1) as usize;
    let lines = wrap_input_lines(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let rendered: Vec<Line<'_>> = (0..visible_rows)
        .map(|offset| {
            let row_index = window_start + offset;
            let prefix = if row_index == 0 { "> " } else { "  " };
            let line = lines.get(row_index).cloned().unwrap_or_default();
            Line::from(format!("{prefix}{line}"))
        })
        .collect();

    let mut style = Style::default().bg(Color::Rgb(24, 24, 24));
    style = if ready {
        style.fg(Color::White)
    } else {
        style.fg(Color::Gray).add_modifier(Modifier::DIM)
    };
    frame.render_widget(Paragraph::new(rendered).style(style), area);

    let cursor_y = area
        .y
        .saturating_add(cursor_row.saturating_sub(window_start) as u16);
    let cursor_x = area
        .x
        .saturating_add(2 + cursor_col as u16)
        .min(area.x.saturating_add(area.width.saturating_sub(1)));
    frame.set_cursor_position((cursor_x, cursor_y));
}

pub fn render_modal(frame: &mut Frame<'_>, modal: Modal<'_>) {
    let size = frame.area();
    let width = size.width.clamp(20, 64).min(size.width);
    let height = size.height.clamp(5, 9).min(size.height);
    let x = size.x + (size.width.saturating_sub(width)) / 2;
    let y = size.y + (size.height.saturating_sub(height)) / 2;
    let area = Rect::new(x, y, width, height);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(modal.title)
        .style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = vec![
        Line::from(modal.body.to_string()),
        Line::from(""),
        Line::styled(
            modal.hint.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        inner,
    );
}
