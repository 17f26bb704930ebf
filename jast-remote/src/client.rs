//! Blocking Jamf Pro API client.
//!
//! Authenticates once with HTTP Basic credentials, then sends the returned
//! bearer token on every call. Each method is a single attempt with the
//! configured timeout; nothing is retried here.

use std::cell::RefCell;
use std::time::Duration;

use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use jast_core::{types::NO_CATEGORY, Config, LocalScript, RemoteScript, ScriptId, ScriptName};

use crate::error::RemoteError;
use crate::payload::{
    AuthToken, Category, CreatedRecord, HistoryNote, Page, ScriptPayload, NO_CATEGORY_ID,
};
use crate::store::{deactivated_name, RemoteStore};

const PAGE_SIZE: usize = 100;

/// Connection settings, usually taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
    /// Category deactivated scripts are moved to.
    pub soft_delete_category: Option<String>,
}

impl ClientOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            url: config.jamf.url.trim().to_string(),
            user: config.jamf.user.clone(),
            password: config.jamf.password.clone(),
            timeout: Duration::from_secs(config.jamf.timeout_secs),
            soft_delete_category: config.sync.soft_delete_category.clone(),
        }
    }
}

/// [`RemoteStore`] backed by a Jamf Pro server.
pub struct JamfClient {
    agent: ureq::Agent,
    base: String,
    token: String,
    soft_delete_category: Option<String>,
    categories: RefCell<Option<Vec<Category>>>,
}

impl std::fmt::Debug for JamfClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JamfClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl JamfClient {
    /// Obtain a token and return a ready client.
    pub fn connect(options: &ClientOptions) -> Result<Self, RemoteError> {
        let agent = ureq::AgentBuilder::new().timeout(options.timeout).build();
        let base = options.url.trim_end_matches('/').to_string();
        let token = request_token(&agent, &base, &options.user, &options.password)?;
        tracing::debug!(server = %base, "authenticated");
        Ok(Self {
            agent,
            base,
            token,
            soft_delete_category: options.soft_delete_category.clone(),
            categories: RefCell::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/uapi{path}", self.base)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        tracing::debug!(%url, "GET");
        let mut request = self.request("GET", url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(|e| map_ureq(url, e))?;
        response
            .into_json()
            .map_err(|e| RemoteError::decode(url, e))
    }

    fn send_json(
        &self,
        method: &str,
        url: &str,
        body: &impl Serialize,
    ) -> Result<ureq::Response, RemoteError> {
        tracing::debug!(%url, method, "send");
        let body = serde_json::to_value(body).map_err(|e| RemoteError::decode(url, e))?;
        self.request(method, url)
            .send_json(body)
            .map_err(|e| map_ureq(url, e))
    }

    /// Category id for `name`; `NONE` maps to `-1` without a lookup.
    pub fn category_id(&self, name: &str) -> Result<i64, RemoteError> {
        if name.is_empty() || name == NO_CATEGORY {
            return Ok(NO_CATEGORY_ID);
        }

        let mut cache = self.categories.borrow_mut();
        if cache.is_none() {
            *cache = Some(self.fetch_all::<Category>("/v1/categories")?);
        }
        let categories = cache.as_deref().unwrap_or_default();

        let mut matching = categories.iter().filter(|c| c.name == name);
        let Some(first) = matching.next() else {
            return Err(RemoteError::UnknownCategory(name.to_string()));
        };
        if matching.next().is_some() {
            return Err(RemoteError::AmbiguousCategory(name.to_string()));
        }
        Ok(first.id)
    }

    fn fetch_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, RemoteError> {
        let url = self.url(path);
        let mut items = Vec::new();
        let mut page = 0usize;
        loop {
            let batch: Page<T> = self.get_json(
                &url,
                &[
                    ("page", page.to_string()),
                    ("page-size", PAGE_SIZE.to_string()),
                ],
            )?;
            let received = batch.results.len();
            items.extend(batch.results);

            let exhausted = match batch.total_count {
                Some(total) => items.len() >= total,
                None => received < PAGE_SIZE,
            };
            if exhausted || received == 0 {
                return Ok(items);
            }
            page += 1;
        }
    }

    fn payload_for(&self, script: &LocalScript) -> Result<ScriptPayload, RemoteError> {
        let category_id = self.category_id(&script.metadata.category_name)?;
        Ok(ScriptPayload::from_local(script, category_id))
    }
}

impl RemoteStore for JamfClient {
    fn create(&self, script: &LocalScript) -> Result<ScriptId, RemoteError> {
        let url = self.url("/v1/scripts");
        let payload = self.payload_for(script)?;
        let created: CreatedRecord = self
            .send_json("POST", &url, &payload)?
            .into_json()
            .map_err(|e| RemoteError::decode(&url, e))?;
        tracing::info!(name = %script.name, id = %created.id, "created remote script");
        Ok(created.id)
    }

    fn update(&self, id: ScriptId, script: &LocalScript) -> Result<(), RemoteError> {
        let url = self.url(&format!("/v1/scripts/{id}"));
        let payload = self.payload_for(script)?;
        self.send_json("PUT", &url, &payload)?;
        tracing::info!(name = %script.name, %id, "updated remote script");
        Ok(())
    }

    fn delete(&self, id: ScriptId) -> Result<(), RemoteError> {
        let url = self.url(&format!("/v1/scripts/{id}"));
        tracing::debug!(%url, "DELETE");
        self.request("DELETE", &url)
            .call()
            .map_err(|e| map_ureq(&url, e))?;
        tracing::info!(%id, "deleted remote script");
        Ok(())
    }

    fn deactivate(&self, id: ScriptId) -> Result<(), RemoteError> {
        let current = self.get(id)?;
        let mut inert = current.to_local(ScriptName::from(deactivated_name(&current.name)));
        if let Some(category) = &self.soft_delete_category {
            inert.metadata.category_name = category.clone();
        }
        self.update(id, &inert)?;
        tracing::info!(%id, "deactivated remote script");
        Ok(())
    }

    fn list(&self) -> Result<Vec<RemoteScript>, RemoteError> {
        let url = self.url("/v1/scripts");
        self.fetch_all::<ScriptPayload>("/v1/scripts")?
            .into_iter()
            .map(|p| {
                p.into_remote()
                    .ok_or_else(|| RemoteError::decode(&url, "script record without id"))
            })
            .collect()
    }

    fn get(&self, id: ScriptId) -> Result<RemoteScript, RemoteError> {
        let url = self.url(&format!("/v1/scripts/{id}"));
        let payload: ScriptPayload = self.get_json(&url, &[])?;
        let mut remote = payload
            .into_remote()
            .ok_or_else(|| RemoteError::decode(&url, "script record without id"))?;
        // Some server versions omit the id on single-record reads.
        remote.id = id;
        remote.metadata.id = Some(id);
        Ok(remote)
    }

    fn append_history_note(&self, id: ScriptId, note: &str) -> Result<(), RemoteError> {
        let url = self.url(&format!("/v1/scripts/{id}/history"));
        self.send_json("POST", &url, &HistoryNote { note })?;
        tracing::debug!(%id, "appended history note");
        Ok(())
    }
}

fn request_token(
    agent: &ureq::Agent,
    base: &str,
    user: &str,
    password: &str,
) -> Result<String, RemoteError> {
    let url = format!("{base}/uapi/auth/tokens");
    let credentials = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
    let response = agent
        .post(&url)
        .set("Authorization", &format!("Basic {credentials}"))
        .set("Accept", "application/json")
        .call();

    match response {
        Ok(response) => {
            let token: AuthToken = response
                .into_json()
                .map_err(|e| RemoteError::decode(&url, e))?;
            Ok(token.token)
        }
        Err(ureq::Error::Status(status, _)) if status == 401 || status == 403 => {
            Err(RemoteError::Auth {
                user: user.to_string(),
                status,
            })
        }
        Err(err) => Err(map_ureq(&url, err)),
    }
}

fn map_ureq(url: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => RemoteError::Status {
            status,
            url: url.to_string(),
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => RemoteError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}
