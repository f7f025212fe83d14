//! Main application state for the TUI
//!
//! The app owns the view state (focus, selections, log panel, popups) while
//! the [`SyncController`] owns the dashboard data. Intents are spawned on the
//! local task set so the draw loop keeps running while requests are in flight.

use super::events::{key_handler, AppAction, ConfirmRequest};
use super::widgets::{
    ColorScheme, ConfirmDialog, HelpDialog, LogViewer, OrgList, RepoDetails, RepoList,
    ValidationDialog,
};
use crate::controller::SyncController;
use crate::error::RemoteError;
use crate::navigation::SessionExit;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{ListState, Paragraph},
    Frame,
};
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::mpsc;

const MAX_LOGS: usize = 1000;

/// Which panel has focus
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusedPanel {
    Organizations,
    Repositories,
}

/// Application state
pub struct App {
    controller: Rc<SyncController>,
    confirm_rx: mpsc::UnboundedReceiver<ConfirmRequest>,
    pending_confirm: Option<ConfirmRequest>,
    exit: SessionExit,

    // UI state
    colors: ColorScheme,
    focused_panel: FocusedPanel,
    org_state: ListState,
    repo_state: ListState,
    logs: Vec<String>,

    // Popup state
    show_help: bool,
    delete_armed: bool,

    in_flight: Rc<Cell<usize>>,
    last_error: Option<RemoteError>,
    should_exit: bool,
}

impl App {
    pub fn new(
        controller: Rc<SyncController>,
        confirm_rx: mpsc::UnboundedReceiver<ConfirmRequest>,
        exit: SessionExit,
    ) -> Self {
        let (org_index, user_login) = {
            let state = controller.state();
            let index = state
                .orgs
                .iter()
                .position(|o| o.login == state.current_org)
                .unwrap_or(0);
            (index, state.user.login.clone())
        };

        let mut org_state = ListState::default();
        org_state.select(Some(org_index));

        let mut app = Self {
            controller,
            confirm_rx,
            pending_confirm: None,
            exit,
            colors: ColorScheme::default(),
            focused_panel: FocusedPanel::Repositories,
            org_state,
            repo_state: ListState::default(),
            logs: Vec::new(),
            show_help: false,
            delete_armed: false,
            in_flight: Rc::new(Cell::new(0)),
            last_error: None,
            should_exit: false,
        };
        app.add_log(format!("Signed in as {}", user_login));
        app
    }

    /// Check if the application should exit
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Run an intent on the local task set.
    fn spawn<F, Fut>(&self, intent: F)
    where
        F: FnOnce(Rc<SyncController>) -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        let controller = Rc::clone(&self.controller);
        let in_flight = Rc::clone(&self.in_flight);
        in_flight.set(in_flight.get() + 1);

        tokio::task::spawn_local(async move {
            intent(controller).await;
            in_flight.set(in_flight.get().saturating_sub(1));
        });
    }

    /// Start the initial load
    pub fn start(&mut self) {
        self.add_log("Loading repositories...".to_string());
        self.spawn(|c| async move { c.refresh().await });
    }

    /// Handle keyboard events
    pub async fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<()> {
        // The confirmation modal captures every key until it is answered
        if self.pending_confirm.is_some() {
            if let Some(confirmation) = key_handler::key_to_confirmation(&key_event) {
                if let Some(request) = self.pending_confirm.take() {
                    self.add_log(format!("{}: {:?}", request.prompt.title(), confirmation));
                    request.answer(confirmation);
                }
            }
            return Ok(());
        }

        let Some(action) = key_handler::key_to_app_action(&key_event) else {
            self.delete_armed = false;
            return Ok(());
        };

        if self.show_help {
            if matches!(action, AppAction::Close | AppAction::ShowHelp | AppAction::Quit) {
                self.show_help = false;
            }
            return Ok(());
        }

        if action != AppAction::DeleteAccount {
            self.delete_armed = false;
        }

        match action {
            AppAction::Quit => self.should_exit = true,
            AppAction::ShowHelp => self.show_help = true,
            AppAction::SwitchPanel => {
                self.focused_panel = match self.focused_panel {
                    FocusedPanel::Organizations => FocusedPanel::Repositories,
                    FocusedPanel::Repositories => FocusedPanel::Organizations,
                };
            }
            AppAction::Up => self.move_selection(-1),
            AppAction::Down => self.move_selection(1),
            AppAction::Toggle => self.handle_toggle(),
            AppAction::Select => self.handle_select(),
            AppAction::Validate => {
                if let Some(slug) = self.selected_repo_slug() {
                    self.add_log(format!("Validating {}...", slug));
                    self.spawn(move |c| async move { c.validate(&slug).await });
                }
            }
            AppAction::Refresh => {
                self.add_log("Refreshing...".to_string());
                self.spawn(|c| async move { c.refresh().await });
            }
            AppAction::DeleteAccount => {
                if self.delete_armed {
                    self.delete_armed = false;
                    self.add_log("WARN: Deleting account...".to_string());
                    self.spawn(|c| async move { c.delete_user().await });
                } else {
                    self.delete_armed = true;
                    self.add_log("WARN: Press D again to delete your account".to_string());
                }
            }
            AppAction::Close => self.controller.close(),
        }

        Ok(())
    }

    fn move_selection(&mut self, delta: isize) {
        let len = {
            let state = self.controller.state();
            match self.focused_panel {
                FocusedPanel::Organizations => state.orgs.len(),
                FocusedPanel::Repositories => state.repos.len(),
            }
        };
        let list = match self.focused_panel {
            FocusedPanel::Organizations => &mut self.org_state,
            FocusedPanel::Repositories => &mut self.repo_state,
        };
        if len == 0 {
            list.select(None);
            return;
        }

        let current = list.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        list.select(Some(next as usize));
    }

    fn selected_repo_slug(&self) -> Option<String> {
        let index = self.repo_state.selected()?;
        self.controller.state().repos.get(index).map(|r| r.slug.clone())
    }

    fn selected_org_login(&self) -> Option<String> {
        let index = self.org_state.selected()?;
        self.controller.state().orgs.get(index).map(|o| o.login.clone())
    }

    fn handle_toggle(&mut self) {
        // One activate-class request at a time
        if self.controller.state().saving {
            self.add_log("WARN: Still saving, try again when it finishes".to_string());
            return;
        }

        match self.focused_panel {
            FocusedPanel::Repositories => {
                let Some(slug) = self.selected_repo_slug() else {
                    return;
                };
                if let Some(activity) = self.controller.flip_repo(&slug) {
                    self.add_log(format!("{} -> {}", slug, activity.label()));
                    self.spawn(move |c| async move { c.toggle(&slug).await });
                }
            }
            FocusedPanel::Organizations => {
                let Some(login) = self.selected_org_login() else {
                    return;
                };
                if let Some(enabled) = self.controller.flip_org(&login) {
                    let verb = if enabled { "Enabling" } else { "Disabling" };
                    self.add_log(format!("{} organization {}", verb, login));
                    self.spawn(move |c| async move { c.toggle_org(&login).await });
                }
            }
        }
    }

    fn handle_select(&mut self) {
        match self.focused_panel {
            FocusedPanel::Organizations => {
                let Some(login) = self.selected_org_login() else {
                    return;
                };
                self.add_log(format!("Showing repositories of {}", login));
                self.repo_state.select(None);
                self.focused_panel = FocusedPanel::Repositories;
                self.spawn(move |c| async move {
                    c.select_org(&login).await;
                });
            }
            FocusedPanel::Repositories => {
                if let Some(slug) = self.selected_repo_slug() {
                    self.controller.edit(&slug);
                }
            }
        }
    }

    /// Add a log message
    fn add_log(&mut self, message: String) {
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();
        self.logs.push(format!("[{}] {}", timestamp, message));

        if self.logs.len() > MAX_LOGS {
            self.logs.drain(..self.logs.len() - MAX_LOGS);
        }
    }

    /// Process pending events
    pub async fn update(&mut self) -> Result<()> {
        // Let spawned intents make progress
        tokio::task::yield_now().await;

        if self.pending_confirm.is_none() {
            match self.confirm_rx.try_recv() {
                Ok(request) => {
                    self.add_log(format!("Waiting for confirmation: {}", request.prompt.title()));
                    self.pending_confirm = Some(request);
                }
                Err(mpsc::error::TryRecvError::Empty) => {}
                Err(mpsc::error::TryRecvError::Disconnected) => {}
            }
        }

        let (error, repo_count) = {
            let state = self.controller.state();
            (state.error.clone(), state.repos.len())
        };
        if error != self.last_error {
            if let Some(ref e) = error {
                self.add_log(format!("ERROR: {}", e));
            }
            self.last_error = error;
        }

        match self.repo_state.selected() {
            None if repo_count > 0 => self.repo_state.select(Some(0)),
            Some(i) if i >= repo_count => self
                .repo_state
                .select(repo_count.checked_sub(1)),
            _ => {}
        }

        if let Some(target) = self.exit.target() {
            self.add_log(format!("Session ended ({})", target));
            self.should_exit = true;
        }

        Ok(())
    }

    /// Draw the application UI
    pub fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();

        let vertical_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),    // Main content
                Constraint::Length(8), // Activity log
                Constraint::Length(1), // Status line
            ])
            .split(size);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(vertical_chunks[0]);

        let org_border = self.border_color(FocusedPanel::Organizations);
        let repo_border = self.border_color(FocusedPanel::Repositories);

        let state = self.controller.state();
        OrgList::new(&state.orgs, &state.current_org, &self.colors).render(
            frame,
            main_chunks[0],
            &mut self.org_state,
            org_border,
        );
        RepoList::new(&state.repos, &state.current_org, &self.colors).render(
            frame,
            main_chunks[1],
            &mut self.repo_state,
            repo_border,
        );
        LogViewer::new(&self.logs, &self.colors).render(frame, vertical_chunks[1]);

        let status = self.status_line(state.error.as_ref(), state.saving);
        frame.render_widget(status, vertical_chunks[2]);

        // Draw popups
        if let Some(repo) = &state.pending_repo {
            RepoDetails::new(repo, &self.colors).render(frame, size);
        }
        if let Some(info) = &state.validation_info {
            ValidationDialog::new(info, &self.colors).render(frame, size);
        }
        if self.show_help {
            HelpDialog::new(&self.colors, state.docs_url.as_deref()).render(frame, size);
        }
        if let Some(request) = &self.pending_confirm {
            ConfirmDialog::new(&request.prompt, &self.colors).render(frame, size);
        }
    }

    fn border_color(&self, panel: FocusedPanel) -> Color {
        if self.focused_panel == panel {
            self.colors.primary
        } else {
            self.colors.border
        }
    }

    fn status_line(&self, error: Option<&RemoteError>, saving: bool) -> Paragraph<'static> {
        let mut spans = Vec::new();
        if let Some(e) = error {
            spans.push(Span::styled(
                format!(" {} ", e),
                Style::default().fg(Color::Black).bg(self.colors.error),
            ));
        } else if saving || self.in_flight.get() > 0 {
            spans.push(Span::styled(
                format!(" Working ({}) ", self.in_flight.get()),
                Style::default().fg(Color::Black).bg(self.colors.warning),
            ));
        } else {
            spans.push(Span::styled(
                " Ready ",
                Style::default().fg(Color::Black).bg(self.colors.success),
            ));
        }
        spans.push(Span::styled(
            " Tab panel | Space toggle | Enter open | v validate | r refresh | ? help | q quit",
            Style::default().fg(self.colors.text),
        ));

        Paragraph::new(Line::from(spans))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Collaborators;
    use crate::gate::MockConfirmationGate;
    use crate::models::{Org, Repo, RepoActivity, User};
    use crate::navigation::MockNavigator;
    use crate::remote::{MockOrgsApi, MockReposApi, MockUserApi};
    use crate::state::Bootstrap;
    use crate::tui::events::TuiGate;

    fn app_with(repos: Vec<Repo>) -> App {
        let mut user = MockUserApi::new();
        user.expect_deleted().return_const(false);
        let controller = SyncController::bootstrap(
            Bootstrap {
                user: User::new("octo"),
                teams: vec![Org::new("acme")],
                docs_url: None,
            },
            Some("acme"),
            Collaborators {
                repos: Box::new(MockReposApi::new()),
                orgs: Box::new(MockOrgsApi::new()),
                user: Box::new(user),
                gate: Box::new(MockConfirmationGate::new()),
                navigator: Box::new(MockNavigator::new()),
            },
            "/logout",
        )
        .expect("controller");
        controller.state_mut().repos = repos;

        let (_gate, confirm_rx) = TuiGate::channel();
        let mut app = App::new(Rc::new(controller), confirm_rx, SessionExit::new());
        app.repo_state.select(Some(0));
        app
    }

    #[test]
    fn test_toggle_refused_while_saving() {
        let mut app = app_with(vec![Repo::new("acme", "web")]);
        app.controller.state_mut().saving = true;

        app.handle_toggle();

        let activity = app.controller.state().repos[0].activity;
        assert_eq!(activity, RepoActivity::Inactive);
        assert_eq!(app.in_flight.get(), 0);
        assert!(app.logs.last().unwrap().contains("Still saving"));
    }

    #[test]
    fn test_org_toggle_refused_while_saving() {
        let mut app = app_with(Vec::new());
        app.focused_panel = FocusedPanel::Organizations;
        app.controller.state_mut().saving = true;
        let before: Vec<bool> = app.controller.state().orgs.iter().map(|o| o.enabled).collect();

        app.handle_toggle();

        let after: Vec<bool> = app.controller.state().orgs.iter().map(|o| o.enabled).collect();
        assert_eq!(before, after);
        assert_eq!(app.in_flight.get(), 0);
    }

    #[tokio::test]
    async fn test_toggle_flips_switch_when_idle() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut app = app_with(vec![Repo::new("acme", "web")]);

                app.handle_toggle();

                let activity = app.controller.state().repos[0].activity;
                assert_eq!(activity, RepoActivity::Activating);
                assert_eq!(app.in_flight.get(), 1);
            })
            .await;
    }
}
