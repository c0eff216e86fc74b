use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatLayout {
    pub sidebar: Option<Rect>,
    pub header: Rect,
    pub history: Rect,
    pub input: Rect,
}

/// Sidebar on the left (when shown), then header, history and prompt stacked.
pub fn split_chat_layout(area: Rect, input_rows: u16, sidebar_width: Option<u16>) -> ChatLayout {
    let (sidebar, main) = match sidebar_width {
        Some(width) if area.width > width.saturating_add(10) => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(width), Constraint::Min(1)])
                .split(area);
            (Some(columns[0]), columns[1])
        }
        _ => (None, area),
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(input_rows.max(1)),
        ])
        .split(main);

    ChatLayout {
        sidebar,
        header: rows[0],
        history: rows[1],
        input: rows[2],
    }
}
