//! Shared fakes for the controller integration tests
//!
//! `FakeBackend` stands in for every remote facade at once. It keeps a call
//! log shared with the fake gate, can fail chosen operations, and can hold
//! a response back until the test releases it.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tokio::sync::Notify;

use checksout_console::models::{EnabledOrg, ValidationReport};
use checksout_console::navigation::Navigator;
use checksout_console::remote::{OrgsApi, RemoteResult, ReposApi, UserApi};
use checksout_console::{
    Bootstrap, Collaborators, Confirmation, ConfirmPrompt, ConfirmationGate, Org, RemoteError,
    Repo, RepoScope, SyncController, User,
};

/// Remote operations the fake can fail or hold back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListRepos,
    ListEnabled,
    Create,
    DeleteRepo,
    Validate,
    AddOrg,
    DeleteOrg,
    DeleteUser,
}

#[derive(Default)]
struct Inner {
    repos: RefCell<Vec<Repo>>,
    enabled: RefCell<Vec<EnabledOrg>>,
    report: RefCell<Option<ValidationReport>>,
    failing: RefCell<HashMap<Op, RemoteError>>,
    held: RefCell<HashMap<Op, Rc<Notify>>>,
    calls: Rc<RefCell<Vec<String>>>,
    next_id: Cell<i64>,
    deleted: Cell<bool>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Rc<Inner>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self::default();
        backend.inner.next_id.set(100);
        backend
    }

    pub fn with_repos(self, repos: Vec<Repo>) -> Self {
        *self.inner.repos.borrow_mut() = repos;
        self
    }

    pub fn with_enabled(self, logins: &[&str]) -> Self {
        *self.inner.enabled.borrow_mut() = logins
            .iter()
            .map(|login| EnabledOrg {
                login: login.to_string(),
            })
            .collect();
        self
    }

    pub fn with_report(self, message: &str, file: &str) -> Self {
        *self.inner.report.borrow_mut() = Some(ValidationReport {
            message: message.to_string(),
            file: file.to_string(),
        });
        self
    }

    pub fn with_next_id(self, id: i64) -> Self {
        self.inner.next_id.set(id);
        self
    }

    /// Make `op` fail with a 500 carrying `body`
    pub fn failing(self, op: Op, body: &str) -> Self {
        self.fail(op, body);
        self
    }

    pub fn fail(&self, op: Op, body: &str) {
        self.inner
            .failing
            .borrow_mut()
            .insert(op, RemoteError::status(500, body));
    }

    /// Hold responses of `op` until the returned handle is notified
    pub fn hold(&self, op: Op) -> Rc<Notify> {
        let notify = Rc::new(Notify::new());
        self.inner.held.borrow_mut().insert(op, Rc::clone(&notify));
        notify
    }

    pub fn set_repos(&self, repos: Vec<Repo>) {
        *self.inner.repos.borrow_mut() = repos;
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.inner
            .calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn gate(&self, answer: Confirmation) -> FakeGate {
        FakeGate {
            answer,
            calls: Rc::clone(&self.inner.calls),
        }
    }

    /// Build a controller for `user` with memberships `teams`
    pub fn controller(
        &self,
        user: &str,
        teams: &[&str],
        route_org: Option<&str>,
        answer: Confirmation,
    ) -> (SyncController, FakeNavigator) {
        let navigator = FakeNavigator::default();
        let bootstrap = Bootstrap {
            user: User::new(user),
            teams: teams.iter().map(|login| Org::new(*login)).collect(),
            docs_url: None,
        };
        let collaborators = Collaborators {
            repos: Box::new(self.clone()),
            orgs: Box::new(self.clone()),
            user: Box::new(self.clone()),
            gate: Box::new(self.gate(answer)),
            navigator: Box::new(navigator.clone()),
        };

        let controller = SyncController::bootstrap(bootstrap, route_org, collaborators, "/logout")
            .expect("user was not deleted");
        (controller, navigator)
    }

    async fn call(&self, op: Op, label: String) -> RemoteResult<()> {
        self.inner.calls.borrow_mut().push(label);

        let held = self.inner.held.borrow().get(&op).cloned();
        if let Some(notify) = held {
            notify.notified().await;
        }

        match self.inner.failing.borrow().get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl ReposApi for FakeBackend {
    async fn list(&self, scope: &RepoScope) -> RemoteResult<Vec<Repo>> {
        let label = match scope {
            RepoScope::User => "repos.list:user".to_string(),
            RepoScope::Org(org) => format!("repos.list:{}", org),
        };
        self.call(Op::ListRepos, label).await?;
        Ok(self.inner.repos.borrow().clone())
    }

    async fn create(&self, owner: &str, name: &str, _body: &Value) -> RemoteResult<Repo> {
        self.call(Op::Create, format!("repos.create:{}/{}", owner, name))
            .await?;
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        Ok(Repo::new(owner, name).with_id(id))
    }

    async fn delete(&self, owner: &str, name: &str) -> RemoteResult<()> {
        self.call(Op::DeleteRepo, format!("repos.delete:{}/{}", owner, name))
            .await
    }

    async fn validate(&self, owner: &str, name: &str) -> RemoteResult<ValidationReport> {
        self.call(Op::Validate, format!("repos.validate:{}/{}", owner, name))
            .await?;
        Ok(self
            .inner
            .report
            .borrow()
            .clone()
            .unwrap_or_else(|| ValidationReport {
                message: "ok".to_string(),
                file: String::new(),
            }))
    }
}

#[async_trait(?Send)]
impl OrgsApi for FakeBackend {
    async fn list_enabled(&self) -> RemoteResult<Vec<EnabledOrg>> {
        self.call(Op::ListEnabled, "orgs.list_enabled".to_string())
            .await?;
        Ok(self.inner.enabled.borrow().clone())
    }

    async fn add(&self, login: &str) -> RemoteResult<()> {
        self.call(Op::AddOrg, format!("orgs.add:{}", login)).await
    }

    async fn delete(&self, login: &str) -> RemoteResult<()> {
        self.call(Op::DeleteOrg, format!("orgs.delete:{}", login))
            .await
    }
}

#[async_trait(?Send)]
impl UserApi for FakeBackend {
    async fn current(&self) -> RemoteResult<User> {
        Ok(User::new("octo"))
    }

    async fn delete(&self) -> RemoteResult<()> {
        self.call(Op::DeleteUser, "user.delete".to_string()).await?;
        self.inner.deleted.set(true);
        Ok(())
    }

    fn deleted(&self) -> bool {
        self.inner.deleted.get()
    }
}

/// Gate with a fixed answer, logging into the backend's call log
pub struct FakeGate {
    answer: Confirmation,
    calls: Rc<RefCell<Vec<String>>>,
}

#[async_trait(?Send)]
impl ConfirmationGate for FakeGate {
    async fn open_confirm(&self, prompt: &ConfirmPrompt) -> Confirmation {
        let target = match prompt {
            ConfirmPrompt::ActivateRepo { slug } => slug.clone(),
            ConfirmPrompt::ActivateOrg { login } | ConfirmPrompt::DeleteAccount { login } => {
                login.clone()
            }
        };
        self.calls.borrow_mut().push(format!("gate:{}", target));
        self.answer.clone()
    }
}

#[derive(Clone, Default)]
pub struct FakeNavigator {
    redirects: Rc<RefCell<Vec<String>>>,
}

impl FakeNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.borrow().clone()
    }
}

impl Navigator for FakeNavigator {
    fn redirect(&self, path: &str) {
        self.redirects.borrow_mut().push(path.to_string());
    }
}

/// Distinct slugs from generated names
pub fn unique_repos(owner: &str, names: &[String]) -> Vec<Repo> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| n.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|n| !n.is_empty() && seen.insert(n.clone()))
        .map(|n| Repo::new(owner, n))
        .collect()
}

pub fn accepted() -> Confirmation {
    Confirmation::Accepted
}

pub fn declined() -> Confirmation {
    Confirmation::Declined("cancelled".to_string())
}
