//! Domain types shared by the controller, the remote clients and the front ends.

use serde::{Deserialize, Serialize};

/// Activation state of a repository.
///
/// The server only tells us whether a repository carries an `id`; locally we
/// also track the in-flight transitions so every rollback path is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepoActivity {
    #[default]
    Inactive,
    /// Switched on in the UI, awaiting confirmation or the server's answer.
    Activating,
    Active(i64),
    /// Switched off, delete request in flight.
    Deactivating,
}

impl RepoActivity {
    /// Whether the toggle control reads "on".
    pub fn is_on(&self) -> bool {
        matches!(self, RepoActivity::Activating | RepoActivity::Active(_))
    }

    /// Server-issued id, only present once activation was confirmed.
    pub fn id(&self) -> Option<i64> {
        match self {
            RepoActivity::Active(id) => Some(*id),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepoActivity::Inactive => "inactive",
            RepoActivity::Activating => "activating",
            RepoActivity::Active(_) => "active",
            RepoActivity::Deactivating => "deactivating",
        }
    }
}

/// A source repository as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RepoWire", into = "RepoWire")]
pub struct Repo {
    pub owner: String,
    pub name: String,
    /// `owner/name`
    pub slug: String,
    pub activity: RepoActivity,
    pub link_url: String,
    pub private: bool,
    pub org: bool,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        let owner = owner.into();
        let name = name.into();
        let slug = format!("{}/{}", owner, name);
        Self {
            owner,
            name,
            slug,
            activity: RepoActivity::Inactive,
            link_url: String::new(),
            private: false,
            org: false,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.activity = RepoActivity::Active(id);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.activity.id()
    }

    pub fn is_on(&self) -> bool {
        self.activity.is_on()
    }
}

/// JSON shape of a repository; activity is signalled by `id` presence.
#[derive(Serialize, Deserialize)]
struct RepoWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    owner: String,
    name: String,
    #[serde(default)]
    slug: String,
    #[serde(default)]
    link_url: String,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    org: bool,
}

impl From<RepoWire> for Repo {
    fn from(wire: RepoWire) -> Self {
        let slug = if wire.slug.is_empty() {
            format!("{}/{}", wire.owner, wire.name)
        } else {
            wire.slug
        };
        Self {
            owner: wire.owner,
            name: wire.name,
            slug,
            activity: wire.id.map_or(RepoActivity::Inactive, RepoActivity::Active),
            link_url: wire.link_url,
            private: wire.private,
            org: wire.org,
        }
    }
}

impl From<Repo> for RepoWire {
    fn from(repo: Repo) -> Self {
        Self {
            id: repo.activity.id(),
            owner: repo.owner,
            name: repo.name,
            slug: repo.slug,
            link_url: repo.link_url,
            private: repo.private,
            org: repo.org,
        }
    }
}

/// An organization (or the user itself) the signed-in user can enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Org {
    pub login: String,
    #[serde(default, rename = "avatar_url", alias = "avatar")]
    pub avatar_url: String,
    #[serde(default)]
    pub enabled: bool,
}

impl Org {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            avatar_url: String::new(),
            enabled: false,
        }
    }
}

/// The signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "avatar_url", alias = "avatar")]
    pub avatar_url: String,
}

impl User {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            email: String::new(),
            avatar_url: String::new(),
        }
    }

    /// The user's own entry in the org list.
    pub fn as_org(&self) -> Org {
        Org {
            login: self.login.clone(),
            avatar_url: self.avatar_url.clone(),
            enabled: false,
        }
    }
}

/// Entry of the enabled-organizations listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnabledOrg {
    pub login: String,
}

/// Payload of the validation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub message: String,
    /// Converted configuration; empty when no conversion is needed.
    #[serde(default)]
    pub file: String,
}

/// What the validation modal shows for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationInfo {
    pub slug: String,
    pub message: String,
    pub file_content: Option<String>,
}

impl ValidationInfo {
    pub fn from_report(slug: impl Into<String>, report: ValidationReport) -> Self {
        let file_content = if report.file.is_empty() {
            None
        } else {
            Some(report.file)
        };
        Self {
            slug: slug.into(),
            message: report.message,
            file_content,
        }
    }

    pub fn from_failure(slug: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            message: data.into(),
            file_content: None,
        }
    }
}
