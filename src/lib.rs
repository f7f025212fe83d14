//! checksout-console - Dashboard client for a checks-out approval service
//!
//! Lets a signed-in user enable or disable repositories and whole
//! organizations on the service, from a terminal dashboard or one-shot
//! commands.
//!
//! ## Core Features
//!
//! - **Optimistic updates**: switches flip immediately and roll back when the
//!   service refuses
//! - **Confirmation gate**: activations are confirmed before anything is sent
//! - **Partial-failure refresh**: repositories and enabled organizations load
//!   independently
//! - **Configuration validation**: per-repository validation report with the
//!   converted configuration file when an upgrade is needed
//!
//! ## Modules
//!
//! - [`controller`]: the sync controller every intent goes through
//! - [`state`]: the in-memory dashboard state
//! - [`remote`]: service facades and their HTTP implementation
//! - [`gate`]: confirmation capability
//! - [`config`]: configuration management and parsing

pub mod config;
pub mod controller;
pub mod error;
pub mod gate;
pub mod models;
pub mod navigation;
pub mod remote;
pub mod state;
pub mod tui;

pub use config::Config;
pub use controller::{Collaborators, SyncController};
pub use error::RemoteError;
pub use gate::{Confirmation, ConfirmPrompt, ConfirmationGate};
pub use models::{Org, Repo, RepoActivity, User, ValidationInfo};
pub use remote::{HttpClient, RepoScope, TeamDirectory};
pub use state::{Bootstrap, SyncState};
