//! Remote service facades
//!
//! The controller talks to the service only through these traits, so the
//! front ends can plug in the HTTP client and tests can plug in fakes.
//! All of them run on a single-threaded executor, hence `?Send`.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;
use crate::models::{EnabledOrg, Org, Repo, User, ValidationReport};

pub use http::HttpClient;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Whose repositories to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoScope {
    /// The signed-in user's own repositories.
    User,
    /// Repositories of an organization the user belongs to.
    Org(String),
}

impl RepoScope {
    /// The user selecting itself means "my repositories".
    pub fn for_selection(user_login: &str, org_login: &str) -> Self {
        if user_login == org_login {
            RepoScope::User
        } else {
            RepoScope::Org(org_login.to_string())
        }
    }
}

/// Repository operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait(?Send)]
pub trait ReposApi {
    async fn list(&self, scope: &RepoScope) -> RemoteResult<Vec<Repo>>;

    /// Activate a repository; the response carries the new id.
    async fn create(&self, owner: &str, name: &str, body: &Value) -> RemoteResult<Repo>;

    async fn delete(&self, owner: &str, name: &str) -> RemoteResult<()>;

    async fn validate(&self, owner: &str, name: &str) -> RemoteResult<ValidationReport>;
}

/// Organization-wide enablement.
#[cfg_attr(test, mockall::automock)]
#[async_trait(?Send)]
pub trait OrgsApi {
    async fn list_enabled(&self) -> RemoteResult<Vec<EnabledOrg>>;

    async fn add(&self, login: &str) -> RemoteResult<()>;

    async fn delete(&self, login: &str) -> RemoteResult<()>;
}

/// The signed-in account.
#[cfg_attr(test, mockall::automock)]
#[async_trait(?Send)]
pub trait UserApi {
    async fn current(&self) -> RemoteResult<User>;

    async fn delete(&self) -> RemoteResult<()>;

    /// Whether the account was deleted during this session.
    fn deleted(&self) -> bool;
}

/// Org memberships known at bootstrap, with the user itself in front.
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    teams: Vec<Org>,
}

impl TeamDirectory {
    pub fn new(user: &User, teams: Vec<Org>) -> Self {
        let mut all = Vec::with_capacity(teams.len() + 1);
        all.push(user.as_org());
        // The server also appends the user to its org listing
        all.extend(teams.into_iter().filter(|org| org.login != user.login));
        Self { teams: all }
    }

    pub fn list(&self) -> &[Org] {
        &self.teams
    }

    pub fn get(&self, login: &str) -> Option<&Org> {
        self.teams.iter().find(|org| org.login == login)
    }
}
