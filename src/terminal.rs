use anyhow::Context;
use crossterm::{
    cursor::Show,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout, Write};
use std::sync::Once;

pub type ChatTerminal = Terminal<CrosstermBackend<Stdout>>;

static RESTORE_HOOK: Once = Once::new();

/// Chains a panic hook that puts the terminal back before the panic message prints.
pub fn install_restore_hook() {
    RESTORE_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore();
            previous(info);
        }));
    });
}

/// Raw mode, alternate screen and bracketed paste; undone by [`restore`].
pub fn setup() -> anyhow::Result<ChatTerminal> {
    install_restore_hook();

    enable_raw_mode().context("failed to enable raw mode")?;
    if let Err(error) = execute!(io::stdout(), EnterAlternateScreen, EnableBracketedPaste) {
        restore();
        return Err(error).context("failed to enter the alternate screen");
    }

    let mut terminal =
        Terminal::new(CrosstermBackend::new(io::stdout())).context("failed to open terminal")?;
    terminal.clear()?;
    Ok(terminal)
}

/// Best effort; safe to call more than once and from the panic hook.
pub fn restore() {
    if let Err(error) = disable_raw_mode() {
        tracing::debug!(%error, "disable_raw_mode failed during restore");
    }
    if let Err(error) = execute!(io::stdout(), LeaveAlternateScreen, DisableBracketedPaste, Show) {
        tracing::debug!(%error, "leaving alternate screen failed during restore");
    }
}

/// OSC 9 desktop notification; terminals that do not support it ignore it.
fn osc9_sequence(title: &str, body: &str) -> String {
    let clean = |text: &str| -> String { text.chars().filter(|ch| !ch.is_control()).collect() };
    format!("\x1b]9;{}: {}\x07", clean(title), clean(body))
}

pub fn send_desktop_notification(title: &str, body: &str) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(osc9_sequence(title, body).as_bytes())
        .context("failed to write notification escape")?;
    stdout.flush()?;
    Ok(())
}
