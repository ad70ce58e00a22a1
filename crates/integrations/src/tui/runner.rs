use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use integrations_core::backend::BackendClient;
use integrations_core::config::Settings;
use integrations_core::services::credentials::CredentialService;
use integrations_core::services::loader::DataLoader;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::tui::app::{App, Focus};
use crate::tui::view::render_app;

pub async fn run(settings: Settings) -> Result<()> {
    let client = BackendClient::with_base_url(&settings.backend_url)
        .with_context(|| format!("invalid backend URL '{}'", settings.backend_url))?;
    let loader = DataLoader::new(client.clone());
    let credential_service = CredentialService::new(client);
    tracing::info!(backend = %settings.backend_url, "starting TUI");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(&mut stdout, crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(loader, credential_service, settings.identity);

    let result = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render_app(frame, app))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(app, key) == Flow::Quit {
                    break;
                }
            }
        }

        app.process_pending().await;
        app.tick();
    }
    tracing::info!("TUI closed");
    Ok(())
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn handle_key(app: &mut App, key: KeyEvent) -> Flow {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && matches!(key.code, KeyCode::Char('c')) {
        return Flow::Quit;
    }

    // The alert blocks everything else until it is dismissed.
    if app.alert().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_alert();
        }
        return Flow::Continue;
    }

    if app.show_help() {
        if matches!(key.code, KeyCode::F(1) | KeyCode::Esc) {
            app.toggle_help();
        }
        return Flow::Continue;
    }

    if app.awaiting().is_some() {
        match key.code {
            KeyCode::Enter => app.finish_connect(),
            KeyCode::Esc => app.cancel_connect(),
            _ => {}
        }
        return Flow::Continue;
    }

    match key.code {
        KeyCode::Esc => return Flow::Quit,
        KeyCode::F(1) => app.toggle_help(),
        KeyCode::Tab => app.cycle_focus(1),
        KeyCode::BackTab => app.cycle_focus(-1),
        KeyCode::PageDown => app.scroll_items(5),
        KeyCode::PageUp => app.scroll_items(-5),
        KeyCode::Char('l') if ctrl => app.start_load(),
        KeyCode::Char('k') if ctrl => {
            if app.load_available() {
                app.clear_items();
            }
        }
        KeyCode::Char('o') if ctrl => app.start_connect(),
        KeyCode::Left | KeyCode::Up if app.focus() == Focus::Integration => {
            app.cycle_integration(-1)
        }
        KeyCode::Right | KeyCode::Down if app.focus() == Focus::Integration => {
            app.cycle_integration(1)
        }
        KeyCode::Enter => match app.focus() {
            Focus::Credentials => app.submit_credentials(),
            Focus::Integration => app.start_connect(),
            Focus::User | Focus::Org => app.cycle_focus(1),
        },
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Char(ch) if !ctrl => app.push_char(ch),
        _ => {}
    }
    Flow::Continue
}
