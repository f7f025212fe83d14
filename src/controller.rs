//! Sync controller - reconciles dashboard state with the service
//!
//! Every intent the dashboard can express (toggle, delete, validate, refresh,
//! select an org...) lands here. The controller applies optimistic changes to
//! [`SyncState`], asks the [`ConfirmationGate`] before activating anything,
//! issues the remote call and then either confirms or rolls back.
//!
//! Remote failures never escape: they are logged, stored in `SyncState::error`
//! (or in the validation modal for validation requests) and the flow carries on.
//!
//! The controller is meant for a single-threaded executor. State lives in a
//! `RefCell` and no borrow is ever held across an `.await`, so continuations
//! of concurrent intents interleave safely at await points.

use serde_json::json;
use std::cell::{Ref, RefCell};
#[cfg(test)]
use std::cell::RefMut;
use tracing::{debug, info, warn};

use crate::gate::{ConfirmPrompt, Confirmation, ConfirmationGate};
use crate::models::{RepoActivity, ValidationInfo};
use crate::navigation::Navigator;
use crate::remote::{OrgsApi, ReposApi, TeamDirectory, UserApi};
use crate::state::{Bootstrap, SyncState};

/// Capabilities the controller drives.
pub struct Collaborators {
    pub repos: Box<dyn ReposApi>,
    pub orgs: Box<dyn OrgsApi>,
    pub user: Box<dyn UserApi>,
    pub gate: Box<dyn ConfirmationGate>,
    pub navigator: Box<dyn Navigator>,
}

pub struct SyncController {
    state: RefCell<SyncState>,
    directory: TeamDirectory,
    repos: Box<dyn ReposApi>,
    orgs: Box<dyn OrgsApi>,
    user: Box<dyn UserApi>,
    gate: Box<dyn ConfirmationGate>,
    navigator: Box<dyn Navigator>,
    logout_path: String,
}

impl SyncController {
    pub fn new(
        state: SyncState,
        directory: TeamDirectory,
        collaborators: Collaborators,
        logout_path: impl Into<String>,
    ) -> Self {
        let Collaborators {
            repos,
            orgs,
            user,
            gate,
            navigator,
        } = collaborators;

        Self {
            state: RefCell::new(state),
            directory,
            repos,
            orgs,
            user,
            gate,
            navigator,
            logout_path: logout_path.into(),
        }
    }

    /// Build the controller from bootstrap identity data.
    ///
    /// Returns `None` when the account was already deleted in this session;
    /// there is nothing left to show.
    pub fn bootstrap(
        bootstrap: Bootstrap,
        route_org: Option<&str>,
        collaborators: Collaborators,
        logout_path: impl Into<String>,
    ) -> Option<Self> {
        if collaborators.user.deleted() {
            info!("Account was deleted in this session, skipping initialization");
            return None;
        }

        let directory = bootstrap.directory();
        let state = SyncState::new(bootstrap.user, &directory, route_org, bootstrap.docs_url);
        Some(Self::new(state, directory, collaborators, logout_path))
    }

    /// Borrow the current state for rendering. Do not hold across an await.
    pub fn state(&self) -> Ref<'_, SyncState> {
        self.state.borrow()
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&self) -> RefMut<'_, SyncState> {
        self.state.borrow_mut()
    }

    pub fn snapshot(&self) -> SyncState {
        self.state.borrow().clone()
    }

    pub fn directory(&self) -> &TeamDirectory {
        &self.directory
    }

    /// The toggle control's own flip of a repository switch.
    pub fn flip_repo(&self, slug: &str) -> Option<RepoActivity> {
        self.state.borrow_mut().flip_repo(slug)
    }

    /// The toggle control's own flip of an organization switch.
    pub fn flip_org(&self, login: &str) -> Option<bool> {
        self.state.borrow_mut().flip_org(login)
    }

    /// Reload the repository list and the enabled organizations.
    ///
    /// Both requests are in flight together and each result is applied as
    /// soon as it arrives, so one failing never blocks the other.
    pub async fn refresh(&self) {
        let scope = self.state.borrow().repo_scope();
        debug!("Refreshing {:?}", scope);

        let repos = async {
            let result = self.repos.list(&scope).await;
            let mut state = self.state.borrow_mut();
            match result {
                Ok(repos) => {
                    debug!("Loaded {} repositories", repos.len());
                    state.repos = repos;
                    state.error = None;
                }
                Err(e) => {
                    warn!("Failed to list repositories: {}", e);
                    state.error = Some(e);
                }
            }
        };

        let orgs = async {
            let result = self.orgs.list_enabled().await;
            let mut state = self.state.borrow_mut();
            match result {
                Ok(enabled) => {
                    let matched = state.mark_enabled(&enabled);
                    debug!("{} of {} enabled organizations matched", matched, enabled.len());
                }
                Err(e) => {
                    warn!("Failed to list enabled organizations: {}", e);
                    state.error = Some(e);
                }
            }
        };

        futures::join!(repos, orgs);
    }

    /// React to a repository switch that was just flipped.
    ///
    /// Switched on: confirm, then activate. Switched off: delete straight away.
    pub async fn toggle(&self, slug: &str) {
        let switched_on = self.state.borrow().repo(slug).map(|r| r.is_on());
        let Some(switched_on) = switched_on else {
            warn!("Toggle for unknown repository {}", slug);
            return;
        };

        if !switched_on {
            self.delete(slug).await;
            return;
        }

        let prompt = ConfirmPrompt::ActivateRepo {
            slug: slug.to_string(),
        };
        match self.gate.open_confirm(&prompt).await {
            Confirmation::Accepted => self.activate(slug).await,
            Confirmation::Declined(reason) => {
                info!("Activation of {} declined: {}", slug, reason);
                let mut state = self.state.borrow_mut();
                state.set_repo_activity(slug, RepoActivity::Inactive);
                state.pending_repo = None;
            }
        }
    }

    /// Enable a repository on the service.
    pub async fn activate(&self, slug: &str) {
        let target = {
            let mut state = self.state.borrow_mut();
            match state.repo_index(slug) {
                Some(index) => {
                    state.saving = true;
                    state.repos[index].activity = RepoActivity::Activating;
                    Some((index, state.repos[index].clone()))
                }
                None => None,
            }
        };
        let Some((index, repo)) = target else {
            warn!("Activate for unknown repository {}", slug);
            return;
        };

        info!("Activating {}", slug);
        let result = self.repos.create(&repo.owner, &repo.name, &json!({})).await;

        let mut state = self.state.borrow_mut();
        state.pending_repo = None;
        match result {
            Ok(created) => {
                info!("Activated {} (id {:?})", created.slug, created.id());
                state.error = None;
                // The list may have been replaced while the request was out
                match state.repos.get_mut(index) {
                    Some(slot) => *slot = created,
                    None => warn!("Repository list changed while activating {}", slug),
                }
            }
            Err(e) => {
                warn!("Failed to activate {}: {}", slug, e);
                state.error = Some(e);
                state.set_repo_activity(slug, RepoActivity::Inactive);
            }
        }
        state.saving = false;
    }

    /// Disable a repository. The id is dropped up front and not restored if
    /// the request fails.
    pub async fn delete(&self, slug: &str) {
        let repo = {
            let mut state = self.state.borrow_mut();
            state.repo_mut(slug).map(|repo| {
                repo.activity = RepoActivity::Deactivating;
                repo.clone()
            })
        };
        let Some(repo) = repo else {
            warn!("Delete for unknown repository {}", slug);
            return;
        };

        info!("Deactivating {}", slug);
        let result = self.repos.delete(&repo.owner, &repo.name).await;

        let mut state = self.state.borrow_mut();
        // The switch may have been flipped back on while the request was out
        if let Some(repo) = state.repo_mut(slug) {
            if repo.activity == RepoActivity::Deactivating {
                repo.activity = RepoActivity::Inactive;
            }
        }
        if let Err(e) = result {
            warn!("Failed to deactivate {}: {}", slug, e);
            state.error = Some(e);
        }
    }

    /// React to an organization switch that was just flipped.
    pub async fn toggle_org(&self, login: &str) {
        let enabled = self.state.borrow().org(login).map(|o| o.enabled);
        let Some(enabled) = enabled else {
            warn!("Toggle for unknown organization {}", login);
            return;
        };

        if !enabled {
            self.delete_org(login).await;
            return;
        }

        let prompt = ConfirmPrompt::ActivateOrg {
            login: login.to_string(),
        };
        match self.gate.open_confirm(&prompt).await {
            Confirmation::Accepted => self.activate_org(login).await,
            Confirmation::Declined(reason) => {
                info!("Activation of {} declined: {}", login, reason);
                let mut state = self.state.borrow_mut();
                state.pending_repo = None;
                state.set_org_enabled(login, false);
            }
        }
    }

    /// Enable a whole organization, then reload since new repositories may
    /// have become active.
    pub async fn activate_org(&self, login: &str) {
        self.state.borrow_mut().saving = true;

        info!("Enabling organization {}", login);
        let result = self.orgs.add(login).await;

        {
            let mut state = self.state.borrow_mut();
            state.pending_repo = None;
            state.saving = false;
            if let Err(e) = result {
                warn!("Failed to enable organization {}: {}", login, e);
                state.error = Some(e);
                state.set_org_enabled(login, false);
                return;
            }
            state.error = None;
        }

        self.refresh().await;
    }

    /// Disable a whole organization, restoring the switch if the request fails.
    pub async fn delete_org(&self, login: &str) {
        self.state.borrow_mut().set_org_enabled(login, false);

        info!("Disabling organization {}", login);
        let result = self.orgs.delete(login).await;

        match result {
            Ok(()) => {
                // `error` is left for the refresh below to clear
                self.state.borrow_mut().saving = false;
                self.refresh().await;
            }
            Err(e) => {
                warn!("Failed to disable organization {}: {}", login, e);
                let mut state = self.state.borrow_mut();
                state.set_org_enabled(login, true);
                state.error = Some(e);
            }
        }
    }

    /// Validate a repository's configuration and show the outcome in the
    /// validation modal, replacing whatever it showed before.
    pub async fn validate(&self, slug: &str) {
        let repo = self.state.borrow().repo(slug).cloned();
        let Some(repo) = repo else {
            warn!("Validate for unknown repository {}", slug);
            return;
        };

        let info = match self.repos.validate(&repo.owner, &repo.name).await {
            Ok(report) => ValidationInfo::from_report(&repo.slug, report),
            Err(e) => {
                debug!("Validation of {} failed: {}", repo.slug, e);
                ValidationInfo::from_failure(&repo.slug, e.data())
            }
        };

        self.state.borrow_mut().validation_info = Some(info);
    }

    /// Delete the signed-in account and leave for the logout page.
    pub async fn delete_user(&self) {
        info!("Deleting account");
        match self.user.delete().await {
            Ok(()) => self.navigator.redirect(&self.logout_path),
            Err(e) => {
                warn!("Failed to delete account: {}", e);
                self.state.borrow_mut().error = Some(e);
            }
        }
    }

    /// Switch the dashboard to another organization (or back to the user).
    ///
    /// Returns false for logins outside the bootstrap memberships.
    pub async fn select_org(&self, login: &str) -> bool {
        if self.directory.get(login).is_none() {
            warn!("Cannot select unknown organization {}", login);
            return false;
        }

        {
            let mut state = self.state.borrow_mut();
            state.current_org = login.to_string();
            state.repos.clear();
            state.pending_repo = None;
            state.validation_info = None;
        }

        self.refresh().await;
        true
    }

    /// Open the details modal for a repository.
    pub fn edit(&self, slug: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let repo = state.repo(slug).cloned();
        let found = repo.is_some();
        state.pending_repo = repo;
        found
    }

    /// Close the modal surface.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.pending_repo = None;
        state.validation_info = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::gate::MockConfirmationGate;
    use crate::models::{EnabledOrg, Org, Repo, User, ValidationReport};
    use crate::navigation::MockNavigator;
    use crate::remote::{MockOrgsApi, MockReposApi, MockUserApi, RepoScope};
    use mockall::Sequence;

    fn bootstrap() -> Bootstrap {
        Bootstrap {
            user: User::new("octo"),
            teams: vec![Org::new("acme")],
            docs_url: None,
        }
    }

    fn controller_with(
        repos: MockReposApi,
        orgs: MockOrgsApi,
        gate: MockConfirmationGate,
        navigator: MockNavigator,
        user: MockUserApi,
    ) -> SyncController {
        let mut user = user;
        user.expect_deleted().return_const(false);
        SyncController::bootstrap(
            bootstrap(),
            None,
            Collaborators {
                repos: Box::new(repos),
                orgs: Box::new(orgs),
                user: Box::new(user),
                gate: Box::new(gate),
                navigator: Box::new(navigator),
            },
            "/logout",
        )
        .expect("controller")
    }

    fn controller(repos: MockReposApi, orgs: MockOrgsApi, gate: MockConfirmationGate) -> SyncController {
        controller_with(repos, orgs, gate, MockNavigator::new(), MockUserApi::new())
    }

    fn seed(controller: &SyncController, repos: Vec<Repo>) {
        controller.state.borrow_mut().repos = repos;
    }

    #[tokio::test]
    async fn test_toggle_without_id_skips_gate() {
        let mut repos = MockReposApi::new();
        repos
            .expect_delete()
            .withf(|owner, name| owner == "octo" && name == "api")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut gate = MockConfirmationGate::new();
        gate.expect_open_confirm().never();

        let controller = controller(repos, MockOrgsApi::new(), gate);
        seed(&controller, vec![Repo::new("octo", "api")]);

        controller.toggle("octo/api").await;

        let state = controller.state();
        assert_eq!(state.repos[0].activity, RepoActivity::Inactive);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_toggle_with_id_confirms_before_create() {
        let mut seq = Sequence::new();
        let mut gate = MockConfirmationGate::new();
        gate.expect_open_confirm()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Confirmation::Accepted);
        let mut repos = MockReposApi::new();
        repos
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|owner, name, _| Ok(Repo::new(owner, name).with_id(101)));

        let controller = controller(repos, MockOrgsApi::new(), gate);
        seed(&controller, vec![Repo::new("octo", "api")]);
        controller.flip_repo("octo/api");

        controller.toggle("octo/api").await;

        let state = controller.state();
        assert_eq!(state.repos[0].id(), Some(101));
        assert!(!state.saving);
    }

    #[tokio::test]
    async fn test_toggle_declined_rolls_back_without_error() {
        let mut gate = MockConfirmationGate::new();
        gate.expect_open_confirm()
            .times(1)
            .returning(|_| Confirmation::Declined("cancel".to_string()));
        let mut repos = MockReposApi::new();
        repos.expect_create().never();
        repos.expect_delete().never();

        let controller = controller(repos, MockOrgsApi::new(), gate);
        seed(&controller, vec![Repo::new("acme", "api").with_id(42)]);
        {
            let mut state = controller.state.borrow_mut();
            state.pending_repo = Some(Repo::new("acme", "api"));
            state.error = Some(RemoteError::status(500, "earlier failure"));
        }

        controller.toggle("acme/api").await;

        let state = controller.state();
        assert!(state.repos[0].id().is_none());
        assert!(state.pending_repo.is_none());
        assert_eq!(state.error, Some(RemoteError::status(500, "earlier failure")));
    }

    #[tokio::test]
    async fn test_activate_replaces_repo_at_original_index() {
        let mut repos = MockReposApi::new();
        repos.expect_create().returning(|owner, name, _| {
            let mut repo = Repo::new(owner, name).with_id(7);
            repo.link_url = "https://github.com/octo/web".to_string();
            Ok(repo)
        });

        let controller = controller(repos, MockOrgsApi::new(), MockConfirmationGate::new());
        seed(
            &controller,
            vec![Repo::new("octo", "api"), Repo::new("octo", "web"), Repo::new("octo", "cli")],
        );
        {
            let mut state = controller.state.borrow_mut();
            state.pending_repo = Some(Repo::new("octo", "web"));
            state.error = Some(RemoteError::transport("old"));
        }

        controller.activate("octo/web").await;

        let state = controller.state();
        assert_eq!(state.repos[1].id(), Some(7));
        assert_eq!(state.repos[1].link_url, "https://github.com/octo/web");
        assert_eq!(state.repos[0].slug, "octo/api");
        assert!(state.pending_repo.is_none());
        assert!(state.error.is_none());
        assert!(!state.saving);
    }

    #[tokio::test]
    async fn test_activate_failure_rolls_back() {
        let mut repos = MockReposApi::new();
        repos
            .expect_create()
            .returning(|_, _, _| Err(RemoteError::status(403, "not an admin")));

        let controller = controller(repos, MockOrgsApi::new(), MockConfirmationGate::new());
        seed(&controller, vec![Repo::new("octo", "api")]);
        controller.flip_repo("octo/api");

        controller.activate("octo/api").await;

        let state = controller.state();
        assert_eq!(state.repos[0].activity, RepoActivity::Inactive);
        assert_eq!(state.error.as_ref().and_then(|e| e.status_code()), Some(403));
        assert!(!state.saving);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_id_stripped() {
        let mut repos = MockReposApi::new();
        repos
            .expect_delete()
            .returning(|_, _| Err(RemoteError::status(500, "boom")));

        let controller = controller(repos, MockOrgsApi::new(), MockConfirmationGate::new());
        seed(&controller, vec![Repo::new("octo", "api").with_id(3)]);

        controller.delete("octo/api").await;

        let state = controller.state();
        assert!(state.repos[0].id().is_none());
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_toggle_org_disabled_goes_straight_to_delete() {
        let mut gate = MockConfirmationGate::new();
        gate.expect_open_confirm().never();
        let mut orgs = MockOrgsApi::new();
        orgs.expect_delete()
            .withf(|login| login == "acme")
            .times(1)
            .returning(|_| Ok(()));
        orgs.expect_list_enabled().returning(|| Ok(vec![]));
        let mut repos = MockReposApi::new();
        repos.expect_list().returning(|_| Ok(vec![]));

        let controller = controller(repos, orgs, gate);

        controller.toggle_org("acme").await;

        assert!(!controller.state().org("acme").unwrap().enabled);
    }

    #[tokio::test]
    async fn test_toggle_org_declined_disables() {
        let mut gate = MockConfirmationGate::new();
        gate.expect_open_confirm()
            .withf(|prompt| {
                *prompt
                    == ConfirmPrompt::ActivateOrg {
                        login: "acme".to_string(),
                    }
            })
            .returning(|_| Confirmation::Declined("no".to_string()));
        let mut orgs = MockOrgsApi::new();
        orgs.expect_add().never();

        let controller = controller(MockReposApi::new(), orgs, gate);
        controller.flip_org("acme");

        controller.toggle_org("acme").await;

        let state = controller.state();
        assert!(!state.org("acme").unwrap().enabled);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_activate_org_refreshes_once() {
        let mut orgs = MockOrgsApi::new();
        orgs.expect_add().times(1).returning(|_| Ok(()));
        orgs.expect_list_enabled().times(1).returning(|| {
            Ok(vec![EnabledOrg {
                login: "acme".to_string(),
            }])
        });
        let mut repos = MockReposApi::new();
        repos
            .expect_list()
            .withf(|scope| *scope == RepoScope::User)
            .times(1)
            .returning(|_| Ok(vec![Repo::new("octo", "api")]));

        let controller = controller(repos, orgs, MockConfirmationGate::new());
        controller.flip_org("acme");

        controller.activate_org("acme").await;

        let state = controller.state();
        assert!(state.org("acme").unwrap().enabled);
        assert_eq!(state.repos.len(), 1);
        assert!(!state.saving);
    }

    #[tokio::test]
    async fn test_activate_org_failure_disables_switch() {
        let mut orgs = MockOrgsApi::new();
        orgs.expect_add()
            .returning(|_| Err(RemoteError::status(403, "not an owner")));
        orgs.expect_list_enabled().never();

        let controller = controller(MockReposApi::new(), orgs, MockConfirmationGate::new());
        controller.flip_org("acme");

        controller.activate_org("acme").await;

        let state = controller.state();
        assert!(!state.org("acme").unwrap().enabled);
        assert!(state.error.is_some());
        assert!(!state.saving);
    }

    #[tokio::test]
    async fn test_validate_routes_failure_into_modal_only() {
        let mut repos = MockReposApi::new();
        repos
            .expect_validate()
            .returning(|_, _| Err(RemoteError::status(400, "MAINTAINERS file missing")));

        let controller = controller(repos, MockOrgsApi::new(), MockConfirmationGate::new());
        seed(&controller, vec![Repo::new("octo", "api")]);

        controller.validate("octo/api").await;

        let state = controller.state();
        let info = state.validation_info.as_ref().unwrap();
        assert_eq!(info.slug, "octo/api");
        assert_eq!(info.message, "MAINTAINERS file missing");
        assert!(info.file_content.is_none());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_validate_last_call_wins() {
        let mut repos = MockReposApi::new();
        repos.expect_validate().returning(|_, name| {
            Ok(ValidationReport {
                message: format!("{} ok", name),
                file: String::new(),
            })
        });

        let controller = controller(repos, MockOrgsApi::new(), MockConfirmationGate::new());
        seed(&controller, vec![Repo::new("octo", "api"), Repo::new("octo", "web")]);

        controller.validate("octo/api").await;
        controller.validate("octo/web").await;

        let state = controller.state();
        let info = state.validation_info.as_ref().unwrap();
        assert_eq!(info.slug, "octo/web");
        assert_eq!(info.message, "web ok");
    }

    #[tokio::test]
    async fn test_delete_user_redirects_to_logout() {
        let mut user = MockUserApi::new();
        user.expect_delete().times(1).returning(|| Ok(()));
        let mut navigator = MockNavigator::new();
        navigator
            .expect_redirect()
            .withf(|path| path == "/logout")
            .times(1)
            .return_const(());

        let controller = controller_with(
            MockReposApi::new(),
            MockOrgsApi::new(),
            MockConfirmationGate::new(),
            navigator,
            user,
        );

        controller.delete_user().await;

        assert!(controller.state().error.is_none());
    }

    #[tokio::test]
    async fn test_delete_user_failure_sets_error() {
        let mut user = MockUserApi::new();
        user.expect_delete()
            .returning(|| Err(RemoteError::status(500, "nope")));
        let mut navigator = MockNavigator::new();
        navigator.expect_redirect().never();

        let controller = controller_with(
            MockReposApi::new(),
            MockOrgsApi::new(),
            MockConfirmationGate::new(),
            navigator,
            user,
        );

        controller.delete_user().await;

        assert!(controller.state().error.is_some());
    }

    #[test]
    fn test_bootstrap_skipped_for_deleted_user() {
        let mut user = MockUserApi::new();
        user.expect_deleted().return_const(true);

        let controller = SyncController::bootstrap(
            bootstrap(),
            None,
            Collaborators {
                repos: Box::new(MockReposApi::new()),
                orgs: Box::new(MockOrgsApi::new()),
                user: Box::new(user),
                gate: Box::new(MockConfirmationGate::new()),
                navigator: Box::new(MockNavigator::new()),
            },
            "/logout",
        );

        assert!(controller.is_none());
    }

    #[test]
    fn test_edit_and_close() {
        let controller = controller(
            MockReposApi::new(),
            MockOrgsApi::new(),
            MockConfirmationGate::new(),
        );
        seed(&controller, vec![Repo::new("octo", "api")]);

        assert!(controller.edit("octo/api"));
        assert_eq!(controller.state().pending_repo.as_ref().unwrap().slug, "octo/api");

        controller.state.borrow_mut().validation_info =
            Some(ValidationInfo::from_failure("octo/api", "bad"));
        controller.close();

        let state = controller.state();
        assert!(state.pending_repo.is_none());
        assert!(state.validation_info.is_none());
    }
}
