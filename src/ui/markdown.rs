use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

/// Turns Markdown source into styled terminal text.
///
/// Output is always literal text: raw HTML in the source is shown as written,
/// never interpreted.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> Text<'static>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalMarkdown;

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, markdown: &str) -> Text<'static> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        let mut writer = Writer::new(Parser::new_ext(markdown, options));
        writer.run();
        writer.text
    }
}

/// Renders plain text with no formatting; handy where styling would get in the way.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainText;

impl MarkdownRenderer for PlainText {
    fn render(&self, markdown: &str) -> Text<'static> {
        Text::from(
            markdown
                .split('\n')
                .map(|line| Line::from(line.to_string()))
                .collect::<Vec<_>>(),
        )
    }
}

fn code_style() -> Style {
    Style::default().fg(Color::Cyan)
}

struct Writer<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    iter: I,
    text: Text<'static>,
    inline_styles: Vec<Style>,
    prefixes: Vec<String>,
    list_indices: Vec<Option<u64>>,
    pending_marker: Option<String>,
    link: Option<String>,
    needs_blank_line: bool,
    in_code_block: bool,
    code_line_done: bool,
}

impl<'a, I> Writer<'a, I>
where
    I: Iterator<Item = Event<'a>>,
{
    fn new(iter: I) -> Self {
        Self {
            iter,
            text: Text::default(),
            inline_styles: Vec::new(),
            prefixes: Vec::new(),
            list_indices: Vec::new(),
            pending_marker: None,
            link: None,
            needs_blank_line: false,
            in_code_block: false,
            code_line_done: false,
        }
    }

    fn run(&mut self) {
        while let Some(event) = self.iter.next() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: Event<'a>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(text),
            Event::Code(code) => self.push_span(Span::styled(code.into_string(), code_style())),
            Event::Html(html) | Event::InlineHtml(html) => self.text(html),
            Event::SoftBreak | Event::HardBreak => self.new_line(),
            Event::Rule => {
                self.start_block();
                self.push_span(Span::styled(
                    "─".repeat(8),
                    Style::default().add_modifier(Modifier::DIM),
                ));
                self.needs_blank_line = true;
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'a>) {
        match tag {
            Tag::Paragraph => {
                if self.pending_marker.is_none() {
                    self.start_block();
                }
            }
            Tag::Heading { level, .. } => {
                self.start_block();
                let style = match level {
                    HeadingLevel::H1 => Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::UNDERLINED),
                    HeadingLevel::H2 => Style::default().add_modifier(Modifier::BOLD),
                    _ => Style::default()
                        .add_modifier(Modifier::BOLD)
                        .add_modifier(Modifier::ITALIC),
                };
                self.push_inline_style(style);
            }
            Tag::BlockQuote => {
                self.start_block();
                self.prefixes.push("> ".to_string());
            }
            Tag::CodeBlock(_) => {
                self.start_block();
                self.in_code_block = true;
                self.prefixes.push("    ".to_string());
            }
            Tag::List(start) => {
                if self.list_indices.is_empty() {
                    self.start_block();
                }
                self.list_indices.push(start);
            }
            Tag::Item => {
                let marker = match self.list_indices.last_mut() {
                    Some(Some(index)) => {
                        let marker = format!("{index}. ");
                        *index += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                let on_empty_line = self
                    .text
                    .lines
                    .last()
                    .is_some_and(|line| line.spans.is_empty());
                if !on_empty_line {
                    self.new_line();
                }
                self.prefixes.push(" ".repeat(marker.len()));
                self.pending_marker = Some(marker);
            }
            Tag::Emphasis => self.push_inline_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_inline_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_inline_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
                self.push_inline_style(Style::default().add_modifier(Modifier::UNDERLINED));
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.needs_blank_line = true,
            TagEnd::Heading(_) => {
                self.pop_inline_style();
                self.needs_blank_line = true;
            }
            TagEnd::BlockQuote => {
                self.prefixes.pop();
                self.needs_blank_line = true;
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.code_line_done = false;
                self.prefixes.pop();
                self.needs_blank_line = true;
            }
            TagEnd::List(_) => {
                self.list_indices.pop();
                self.needs_blank_line = true;
            }
            TagEnd::Item => {
                self.prefixes.pop();
                self.pending_marker = None;
                self.needs_blank_line = false;
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_inline_style(),
            TagEnd::Link => {
                self.pop_inline_style();
                if let Some(url) = self.link.take() {
                    self.push_span(Span::styled(
                        format!(" ({url})"),
                        Style::default().add_modifier(Modifier::DIM),
                    ));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: CowStr<'a>) {
        if self.in_code_block {
            self.code_text(&text);
            return;
        }
        let style = self.inline_styles.last().copied().unwrap_or_default();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.new_line();
            }
            if !line.is_empty() {
                self.push_span(Span::styled(line.to_string(), style));
            }
        }
    }

    fn code_text(&mut self, text: &str) {
        for piece in text.split_inclusive('\n') {
            if self.code_line_done {
                self.new_line();
                self.code_line_done = false;
            }
            let content = piece.strip_suffix('\n');
            let body = content.unwrap_or(piece);
            if !body.is_empty() {
                self.push_span(Span::styled(body.to_string(), code_style()));
            }
            if content.is_some() {
                self.code_line_done = true;
            }
        }
    }

    fn start_block(&mut self) {
        if self.needs_blank_line && !self.text.lines.is_empty() {
            self.text.lines.push(Line::default());
        }
        self.needs_blank_line = false;
        self.new_line();
    }

    fn new_line(&mut self) {
        self.text.lines.push(Line::default());
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.text.lines.is_empty() {
            self.text.lines.push(Line::default());
        }
        let marker = self.pending_marker.take();
        let at_line_start = self
            .text
            .lines
            .last()
            .is_some_and(|line| line.spans.is_empty());
        let prefix = if at_line_start {
            match marker {
                Some(marker) => {
                    let outer = self.prefixes.len().saturating_sub(1);
                    Some(format!("{}{marker}", self.prefixes[..outer].concat()))
                }
                None => Some(self.prefixes.concat()),
            }
        } else {
            None
        };

        if let Some(line) = self.text.lines.last_mut() {
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                line.spans.push(Span::raw(prefix));
            }
            line.spans.push(span);
        }
    }

    fn push_inline_style(&mut self, style: Style) {
        let current = self.inline_styles.last().copied().unwrap_or_default();
        self.inline_styles.push(current.patch(style));
    }

    fn pop_inline_style(&mut self) {
        self.inline_styles.pop();
    }
}

/// Flattens styled text back to its visible characters.
pub fn plain_lines(text: &Text<'_>) -> Vec<String> {
    text.lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect()
}
