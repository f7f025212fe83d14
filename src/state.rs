//! Dashboard state
//!
//! `SyncState` is the single in-memory view the front ends render from. It is
//! built once from a [`Bootstrap`] snapshot and afterwards only changed by the
//! [`SyncController`](crate::controller::SyncController), plus the two
//! `flip_*` helpers that model the toggle control's own optimistic flip.

use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::models::{EnabledOrg, Org, Repo, RepoActivity, User, ValidationInfo};
use crate::remote::{RepoScope, TeamDirectory};

/// Identity data the dashboard starts from.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub user: User,
    /// Org memberships, without the user itself.
    pub teams: Vec<Org>,
    pub docs_url: Option<String>,
}

impl Bootstrap {
    pub fn directory(&self) -> TeamDirectory {
        TeamDirectory::new(&self.user, self.teams.clone())
    }
}

#[derive(Debug, Clone)]
pub struct SyncState {
    pub user: User,
    pub orgs: Vec<Org>,
    pub repos: Vec<Repo>,
    /// Login of the selected entry in `orgs`.
    pub current_org: String,
    pub error: Option<RemoteError>,
    /// Repository shown in the details modal.
    pub pending_repo: Option<Repo>,
    pub validation_info: Option<ValidationInfo>,
    /// An activation request is outstanding.
    pub saving: bool,
    pub docs_url: Option<String>,
}

impl SyncState {
    /// Build the initial state, selecting `route_org` when it is a known org
    pub fn new(
        user: User,
        directory: &TeamDirectory,
        route_org: Option<&str>,
        docs_url: Option<String>,
    ) -> Self {
        let current_org = match route_org {
            Some(login) if directory.get(login).is_some() => login.to_string(),
            Some(login) => {
                warn!("Unknown organization {}, showing {} instead", login, user.login);
                user.login.clone()
            }
            None => user.login.clone(),
        };

        Self {
            orgs: directory.list().to_vec(),
            user,
            repos: Vec::new(),
            current_org,
            error: None,
            pending_repo: None,
            validation_info: None,
            saving: false,
            docs_url,
        }
    }

    pub fn current_org(&self) -> Option<&Org> {
        self.org(&self.current_org)
    }

    pub fn repo_scope(&self) -> RepoScope {
        RepoScope::for_selection(&self.user.login, &self.current_org)
    }

    pub fn repo_index(&self, slug: &str) -> Option<usize> {
        self.repos.iter().position(|r| r.slug == slug)
    }

    pub fn repo(&self, slug: &str) -> Option<&Repo> {
        self.repos.iter().find(|r| r.slug == slug)
    }

    pub fn repo_mut(&mut self, slug: &str) -> Option<&mut Repo> {
        self.repos.iter_mut().find(|r| r.slug == slug)
    }

    pub fn org(&self, login: &str) -> Option<&Org> {
        self.orgs.iter().find(|o| o.login == login)
    }

    pub fn org_mut(&mut self, login: &str) -> Option<&mut Org> {
        self.orgs.iter_mut().find(|o| o.login == login)
    }

    /// Returns false when the repository is no longer listed.
    pub fn set_repo_activity(&mut self, slug: &str, activity: RepoActivity) -> bool {
        match self.repo_mut(slug) {
            Some(repo) => {
                repo.activity = activity;
                true
            }
            None => {
                debug!("Repository {} no longer listed, dropping {:?}", slug, activity);
                false
            }
        }
    }

    /// Returns false when the organization is unknown.
    pub fn set_org_enabled(&mut self, login: &str, enabled: bool) -> bool {
        match self.org_mut(login) {
            Some(org) => {
                org.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Mark every listed organization as enabled, returning how many matched.
    ///
    /// Linear scan per entry; both lists are expected to stay small.
    pub fn mark_enabled(&mut self, enabled: &[EnabledOrg]) -> usize {
        let mut matched = 0;
        for item in enabled {
            for org in self.orgs.iter_mut() {
                if org.login == item.login {
                    org.enabled = true;
                    matched += 1;
                    break;
                }
            }
        }
        matched
    }

    /// Flip a repository switch the way the toggle control does before the
    /// controller reacts. Returns the new activity.
    pub fn flip_repo(&mut self, slug: &str) -> Option<RepoActivity> {
        let repo = self.repo_mut(slug)?;
        repo.activity = if repo.activity.is_on() {
            RepoActivity::Inactive
        } else {
            RepoActivity::Activating
        };
        Some(repo.activity)
    }

    /// Flip an organization switch. Returns the new `enabled` value.
    pub fn flip_org(&mut self, login: &str) -> Option<bool> {
        let org = self.org_mut(login)?;
        org.enabled = !org.enabled;
        Some(org.enabled)
    }

    pub fn active_repo_count(&self) -> usize {
        self.repos.iter().filter(|r| r.id().is_some()).count()
    }
}
