//! HTTP implementation of the remote facades against the checks-out API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info};

use super::{OrgsApi, RemoteResult, RepoScope, ReposApi, UserApi};
use crate::config::ServerConfig;
use crate::controller::Collaborators;
use crate::error::RemoteError;
use crate::gate::ConfirmationGate;
use crate::models::{EnabledOrg, Org, Repo, User, ValidationReport};
use crate::navigation::Navigator;
use crate::state::Bootstrap;

/// Header the server checks on every authenticated request.
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Client for the checks-out REST API.
///
/// Cheap to clone; clones share the connection pool and the in-session
/// "account deleted" flag.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
    session_cookie: Option<String>,
    deleted: Rc<Cell<bool>>,
}

impl HttpClient {
    /// Create a client for the configured server
    pub fn new(server: &ServerConfig) -> Result<Self> {
        let base_url = server.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(anyhow!(
                "No server URL configured. Set server.url in the config file or CHECKSOUT_URL"
            ));
        }

        let client = Client::builder()
            .user_agent(concat!("checksout-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            csrf_token: server.csrf_token.clone().filter(|t| !t.is_empty()),
            session_cookie: server.session_cookie.clone().filter(|c| !c.is_empty()),
            deleted: Rc::new(Cell::new(false)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wire this client in as every remote facade of a controller
    pub fn collaborators(
        &self,
        gate: Box<dyn ConfirmationGate>,
        navigator: Box<dyn Navigator>,
    ) -> Collaborators {
        Collaborators {
            repos: Box::new(self.clone()),
            orgs: Box::new(self.clone()),
            user: Box::new(self.clone()),
            gate,
            navigator,
        }
    }

    /// Load the signed-in identity and org memberships the dashboard starts from
    pub async fn fetch_bootstrap(&self) -> Result<Bootstrap> {
        let user = self
            .current()
            .await
            .context("Failed to load the signed-in user. Check server.session_cookie")?;

        let teams: Vec<Org> = self
            .get_json("/api/user/orgs")
            .await
            .with_context(|| format!("Failed to load organizations for {}", user.login))?;

        info!(
            "Signed in as {} with {} organization(s)",
            user.login,
            teams.iter().filter(|t| t.login != user.login).count()
        );

        Ok(Bootstrap {
            user,
            teams,
            docs_url: None,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(token) = &self.csrf_token {
            builder = builder.header(CSRF_HEADER, token);
        }
        if let Some(cookie) = &self.session_cookie {
            builder = builder.header(COOKIE, cookie);
        }

        builder
    }

    async fn send(builder: RequestBuilder) -> RemoteResult<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            debug!("Request failed with {}: {}", status, body);
            Err(RemoteError::status(status.as_u16(), body.trim()))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RemoteResult<T> {
        let response = Self::send(self.request(Method::GET, path)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::decode(e.to_string()))
    }

    async fn send_empty(&self, method: Method, path: &str, body: Option<&Value>) -> RemoteResult<()> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Self::send(builder).await.map(|_| ())
    }
}

#[async_trait(?Send)]
impl ReposApi for HttpClient {
    async fn list(&self, scope: &RepoScope) -> RemoteResult<Vec<Repo>> {
        match scope {
            RepoScope::User => self.get_json("/api/user/repos").await,
            RepoScope::Org(org) => self.get_json(&format!("/api/user/repos/{}", org)).await,
        }
    }

    async fn create(&self, owner: &str, name: &str, body: &Value) -> RemoteResult<Repo> {
        let path = format!("/api/repos/{}/{}", owner, name);
        let response = Self::send(self.request(Method::POST, &path).json(body)).await?;
        response
            .json::<Repo>()
            .await
            .map_err(|e| RemoteError::decode(e.to_string()))
    }

    async fn delete(&self, owner: &str, name: &str) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, &format!("/api/repos/{}/{}", owner, name), None)
            .await
    }

    async fn validate(&self, owner: &str, name: &str) -> RemoteResult<ValidationReport> {
        self.get_json(&format!("/api/repos/{}/{}/validate", owner, name))
            .await
    }
}

#[async_trait(?Send)]
impl OrgsApi for HttpClient {
    async fn list_enabled(&self) -> RemoteResult<Vec<EnabledOrg>> {
        self.get_json("/api/user/orgs/enabled").await
    }

    async fn add(&self, login: &str) -> RemoteResult<()> {
        self.send_empty(Method::POST, &format!("/api/repos/{}", login), Some(&json!({})))
            .await
    }

    async fn delete(&self, login: &str) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, &format!("/api/repos/{}", login), None)
            .await
    }
}

#[async_trait(?Send)]
impl UserApi for HttpClient {
    async fn current(&self) -> RemoteResult<User> {
        self.get_json("/api/user").await
    }

    async fn delete(&self) -> RemoteResult<()> {
        self.send_empty(Method::DELETE, "/api/user", None).await?;
        self.deleted.set(true);
        Ok(())
    }

    fn deleted(&self) -> bool {
        self.deleted.get()
    }
}
