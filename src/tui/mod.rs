//! Terminal dashboard for checks-out
//!
//! Two panels: the organization switches on the left and the repositories of
//! the selected organization on the right, with an activity log underneath.
//! Built on ratatui and crossterm.

pub mod app;
pub mod events;
pub mod widgets;

use crate::controller::SyncController;
use crate::gate::{AutoConfirm, ConfirmationGate};
use crate::navigation::SessionExit;
use crate::remote::HttpClient;
use crate::Config;
use anyhow::{anyhow, Result};
use app::App;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use events::TuiGate;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

/// Launch the dashboard, optionally opened on `route_org`
pub async fn run_tui(config: Config, route_org: Option<String>) -> Result<()> {
    LocalSet::new()
        .run_until(run_dashboard(config, route_org))
        .await
}

async fn run_dashboard(config: Config, route_org: Option<String>) -> Result<()> {
    // Load the identity BEFORE entering raw mode so failures print normally
    let client = HttpClient::new(&config.server)?;
    let mut bootstrap = client.fetch_bootstrap().await?;
    if bootstrap.docs_url.is_none() {
        bootstrap.docs_url = config.server.docs_url.clone();
    }

    let (tui_gate, confirm_rx) = TuiGate::channel();
    let gate: Box<dyn ConfirmationGate> = if config.ui.confirm_activation {
        Box::new(tui_gate)
    } else {
        Box::new(AutoConfirm)
    };
    let exit = SessionExit::new();
    let collaborators = client.collaborators(gate, Box::new(exit.clone()));

    let route_org = route_org.or_else(|| config.ui.default_org.clone());
    let controller = SyncController::bootstrap(
        bootstrap,
        route_org.as_deref(),
        collaborators,
        config.server.logout_path.clone(),
    )
    .ok_or_else(|| anyhow!("This account has been deleted"))?;

    let mut app = App::new(Rc::new(controller), confirm_rx, exit.clone());
    app.start();

    // Setup terminal (raw mode)
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(config.ui.tick_rate_ms.max(10));
    let result = run_app(&mut terminal, &mut app, tick_rate).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Some(target) = exit.target() {
        println!("Signed out. Continue at {}{}", client.base_url(), target);
    }

    result
}

/// Main application event loop
async fn run_app<B>(terminal: &mut Terminal<B>, app: &mut App, tick_rate: Duration) -> Result<()>
where
    B: ratatui::backend::Backend,
{
    loop {
        terminal.draw(|f| app.draw(f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key_event(key).await?;
                }
            }
        }

        app.update().await?;

        if app.should_exit() {
            break;
        }
    }

    Ok(())
}
