use crate::types::StreamEvent;
use crate::ui::markdown::MarkdownRenderer;
use ratatui::text::Text;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Pending,
    Done,
}

/// One tool invocation reported by the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolBlock {
    pub tool: String,
    pub args: Value,
    pub status: ToolStatus,
}

impl ToolBlock {
    fn pending(tool: &str, args: &Value) -> Self {
        Self {
            tool: tool.to_string(),
            args: args.clone(),
            status: ToolStatus::Pending,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ToolStatus::Done
    }
}

/// A slot in the visual order of an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Text,
    Tool(usize),
}

/// Visual structure of one assistant message: a single text region plus any
/// tool blocks placed around it.
#[derive(Debug, Clone)]
pub struct AssistantView {
    regions: Vec<Region>,
    text: Text<'static>,
    tools: Vec<ToolBlock>,
    expanded: Vec<bool>,
}

impl Default for AssistantView {
    fn default() -> Self {
        Self::new()
    }
}

impl AssistantView {
    pub fn new() -> Self {
        Self {
            regions: vec![Region::Text],
            text: Text::default(),
            tools: Vec::new(),
            expanded: Vec::new(),
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn text(&self) -> &Text<'static> {
        &self.text
    }

    pub fn tools(&self) -> &[ToolBlock] {
        &self.tools
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.expanded.get(index).copied().unwrap_or(false)
    }

    /// Flips argument visibility of one tool block. View-only state.
    pub fn toggle_tool_args(&mut self, index: usize) -> bool {
        match self.expanded.get_mut(index) {
            Some(flag) => {
                *flag = !*flag;
                true
            }
            None => false,
        }
    }

    /// Expands every tool block if any is collapsed, otherwise collapses all.
    pub fn toggle_all_tool_args(&mut self) {
        let expand = self.expanded.iter().any(|flag| !flag);
        for flag in &mut self.expanded {
            *flag = expand;
        }
    }

    pub(super) fn inherit_expansion(&mut self, previous: &AssistantView) {
        for (flag, old) in self.expanded.iter_mut().zip(&previous.expanded) {
            *flag = *old;
        }
    }

    fn text_position(&self) -> usize {
        self.regions
            .iter()
            .position(|region| *region == Region::Text)
            .unwrap_or(self.regions.len())
    }

    fn place_tool(&mut self, block: ToolBlock, before_text: bool) {
        let region = Region::Tool(self.tools.len());
        self.tools.push(block);
        self.expanded.push(false);

        let text_at = self.text_position();
        if before_text {
            self.regions.insert(text_at, region);
        } else {
            self.regions.push(region);
            if text_at < self.regions.len() {
                let text = self.regions.remove(text_at);
                self.regions.push(text);
            }
        }
    }

    fn mark_tool_done(&mut self, index: usize) {
        if let Some(block) = self.tools.get_mut(index) {
            block.status = ToolStatus::Done;
        }
    }

    fn set_text(&mut self, text: Text<'static>) {
        self.text = text;
    }
}

/// Per-turn state fed by decoded stream events.
///
/// Text only ever grows; tool blocks are never removed and a finished block is
/// never reopened.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    accumulated_text: String,
    tool_blocks: Vec<ToolBlock>,
    open_tool_block: Option<usize>,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accumulated_text(&self) -> &str {
        &self.accumulated_text
    }

    pub fn tool_blocks(&self) -> &[ToolBlock] {
        &self.tool_blocks
    }

    pub fn open_tool_block(&self) -> Option<&ToolBlock> {
        self.open_tool_block
            .and_then(|index| self.tool_blocks.get(index))
    }

    pub fn is_empty(&self) -> bool {
        self.accumulated_text.is_empty() && self.tool_blocks.is_empty()
    }

    pub fn apply(
        &mut self,
        event: &StreamEvent,
        view: &mut AssistantView,
        markdown: &dyn MarkdownRenderer,
    ) {
        match event {
            StreamEvent::Content { data } => {
                self.accumulated_text.push_str(data);
                view.set_text(markdown.render(&self.accumulated_text));
            }
            StreamEvent::ToolStart { tool, args } => {
                let block = ToolBlock::pending(tool, args);
                self.tool_blocks.push(block.clone());
                self.open_tool_block = Some(self.tool_blocks.len() - 1);
                // Tools seen before any answer text stack above it; later ones
                // go after existing content and the text region moves last.
                view.place_tool(block, self.accumulated_text.is_empty());
            }
            StreamEvent::ToolEnd => {
                let Some(index) = self.open_tool_block.take() else {
                    return;
                };
                if let Some(block) = self.tool_blocks.get_mut(index) {
                    block.status = ToolStatus::Done;
                }
                view.mark_tool_done(index);
            }
            StreamEvent::Error { content } => {
                self.accumulated_text
                    .push_str(&format!("\n\n**Error:** {content}"));
                view.set_text(markdown.render(&self.accumulated_text));
            }
            StreamEvent::Unknown => {}
        }
    }
}
