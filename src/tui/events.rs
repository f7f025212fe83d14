//! Event handling for the TUI application
//!
//! Keyboard input is mapped to [`AppAction`]s here, and the dashboard's
//! confirmation gate lives here too: the controller awaits a [`TuiGate`]
//! while the draw loop picks up the [`ConfirmRequest`] and renders it as a
//! modal until the user answers.

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::gate::{Confirmation, ConfirmPrompt, ConfirmationGate};

/// A confirmation waiting for the user's answer
#[derive(Debug)]
pub struct ConfirmRequest {
    pub prompt: ConfirmPrompt,
    reply: oneshot::Sender<Confirmation>,
}

impl ConfirmRequest {
    /// Resolve the request. Dropping it unanswered counts as a decline.
    pub fn answer(self, confirmation: Confirmation) {
        if self.reply.send(confirmation).is_err() {
            debug!("Confirmation for '{}' no longer awaited", self.prompt.title());
        }
    }
}

/// Confirmation gate backed by the dashboard's modal
pub struct TuiGate {
    sender: mpsc::UnboundedSender<ConfirmRequest>,
}

impl TuiGate {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConfirmRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait(?Send)]
impl ConfirmationGate for TuiGate {
    async fn open_confirm(&self, prompt: &ConfirmPrompt) -> Confirmation {
        let (reply, answer) = oneshot::channel();
        let request = ConfirmRequest {
            prompt: prompt.clone(),
            reply,
        };
        if self.sender.send(request).is_err() {
            return Confirmation::Declined("dashboard closed".to_string());
        }

        answer
            .await
            .unwrap_or_else(|_| Confirmation::Declined("dialog dismissed".to_string()))
    }
}

/// Helper functions for key event processing
pub mod key_handler {
    use super::*;

    /// Check if a key event matches a specific key combination
    pub fn matches_key(event: &KeyEvent, code: KeyCode, modifiers: KeyModifiers) -> bool {
        event.code == code && event.modifiers == modifiers
    }

    /// Answer for the confirmation modal, if the key is one
    pub fn key_to_confirmation(event: &KeyEvent) -> Option<Confirmation> {
        match event.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => Some(Confirmation::Accepted),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                Some(Confirmation::Declined("cancelled".to_string()))
            }
            _ => None,
        }
    }

    /// Convert key event to application action
    pub fn key_to_app_action(event: &KeyEvent) -> Option<AppAction> {
        match (event.code, event.modifiers) {
            (KeyCode::Char('q'), KeyModifiers::NONE) => Some(AppAction::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppAction::Quit),
            (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => Some(AppAction::Up),
            (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => Some(AppAction::Down),
            (KeyCode::Tab, _) | (KeyCode::BackTab, _) => Some(AppAction::SwitchPanel),
            (KeyCode::Char(' '), KeyModifiers::NONE) => Some(AppAction::Toggle),
            (KeyCode::Enter, _) => Some(AppAction::Select),
            (KeyCode::Char('v'), KeyModifiers::NONE) => Some(AppAction::Validate),
            (KeyCode::Char('r'), KeyModifiers::NONE) => Some(AppAction::Refresh),
            (KeyCode::Char('D'), _) => Some(AppAction::DeleteAccount),
            (KeyCode::Esc, _) => Some(AppAction::Close),
            (KeyCode::Char('?'), KeyModifiers::NONE) => Some(AppAction::ShowHelp),
            (KeyCode::F(1), KeyModifiers::NONE) => Some(AppAction::ShowHelp),
            _ => None,
        }
    }
}

/// High-level application actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    Up,
    Down,
    SwitchPanel,
    Toggle,
    Select,
    Validate,
    Refresh,
    DeleteAccount,
    Close,
    ShowHelp,
}
