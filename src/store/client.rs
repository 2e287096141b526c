//! HTTP content store client
//!
//! Pull-side client for the registry HTTP API v2: manifest and blob GETs with
//! bearer-token authentication negotiated from the registry's
//! `WWW-Authenticate` challenge. Blob content is verified against its digest
//! before it is handed to a processor.

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use url::Url;

use crate::digest::DigestUtils;
use crate::error::{ProcessorError, Result};
use crate::model::manifest::{
    MEDIA_TYPE_DOCKER_MANIFEST, MEDIA_TYPE_DOCKER_MANIFEST_LIST, MEDIA_TYPE_OCI_INDEX,
    MEDIA_TYPE_OCI_MANIFEST,
};
use crate::model::Manifest;
use crate::store::ContentStore;

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug)]
struct AuthChallenge {
    realm: String,
    service: String,
}

pub struct HttpContentStoreBuilder {
    address: String,
    username: Option<String>,
    password: Option<String>,
    skip_tls: bool,
}

impl HttpContentStoreBuilder {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: None,
            password: None,
            skip_tls: false,
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_skip_tls(mut self, skip_tls: bool) -> Self {
        self.skip_tls = skip_tls;
        self
    }

    pub fn build(self) -> Result<HttpContentStore> {
        // Validate the address up front so pull failures are never a typo
        let address = Url::parse(&self.address)?;
        let address = address.as_str().trim_end_matches('/').to_string();

        let client = if self.skip_tls {
            Client::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?
        } else {
            Client::new()
        };

        let basic = match (self.username, self.password) {
            (Some(user), Some(pass)) => Some(
                base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, pass)),
            ),
            _ => None,
        };

        Ok(HttpContentStore {
            client,
            address,
            basic,
            token: RwLock::new(None),
        })
    }
}

#[derive(Debug)]
pub struct HttpContentStore {
    client: Client,
    address: String,
    /// Pre-encoded basic credential for the token endpoint.
    basic: Option<String>,
    token: RwLock<Option<String>>,
}

impl HttpContentStore {
    pub fn builder(address: impl Into<String>) -> HttpContentStoreBuilder {
        HttpContentStoreBuilder::new(address)
    }

    /// Probe `/v2/` and, when challenged, exchange credentials for a bearer
    /// token. A registry that does not challenge needs no token.
    pub async fn authenticate(&self) -> Result<()> {
        let url = format!("{}/v2/", self.address);
        let response = self.client.get(&url).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            tracing::debug!(registry = %self.address, "registry requires no authentication");
            return Ok(());
        }

        let header = response
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ProcessorError::Store("401 response without WWW-Authenticate header".to_string())
            })?;

        let challenge = parse_bearer_challenge(&header).ok_or_else(|| {
            ProcessorError::Store(format!("unsupported auth challenge: {}", header))
        })?;

        let token = self.request_token(&challenge).await?;
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        tracing::debug!(registry = %self.address, "bearer token obtained");
        Ok(())
    }

    async fn request_token(&self, challenge: &AuthChallenge) -> Result<String> {
        let mut request = self
            .client
            .get(&challenge.realm)
            .query(&[("service", challenge.service.as_str())]);

        if let Some(basic) = &self.basic {
            request = request.header(AUTHORIZATION, format!("Basic {}", basic));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ProcessorError::Store(format!(
                "token request failed with status {}",
                response.status()
            )));
        }

        let body: TokenResponse = response.json().await?;
        body.token
            .or(body.access_token)
            .ok_or_else(|| ProcessorError::Store("token response carried no token".to_string()))
    }

    fn bearer(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn pull_manifest(&self, repository: &str, reference: &str) -> Result<Manifest> {
        let url = format!("{}/v2/{}/manifests/{}", self.address, repository, reference);
        let accept = [
            MEDIA_TYPE_OCI_MANIFEST,
            MEDIA_TYPE_OCI_INDEX,
            MEDIA_TYPE_DOCKER_MANIFEST,
            MEDIA_TYPE_DOCKER_MANIFEST_LIST,
        ]
        .join(", ");

        let mut request = self.client.get(&url).header(ACCEPT, accept);
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ProcessorError::NotFound(format!(
                    "{}@{}",
                    repository, reference
                )));
            }
            status if !status.is_success() => {
                return Err(ProcessorError::Store(format!(
                    "manifest pull for {}@{} failed with status {}",
                    repository, reference, status
                )));
            }
            _ => {}
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let payload = response.bytes().await?;

        Manifest::parse(&media_type, &payload)
    }

    async fn pull_blob(&self, repository: &str, digest: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v2/{}/blobs/{}", self.address, repository, digest);

        let mut request = self.client.get(&url);
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ProcessorError::NotFound(format!("{}@{}", repository, digest)));
            }
            status if !status.is_success() => {
                return Err(ProcessorError::Store(format!(
                    "blob pull for {}@{} failed with status {}",
                    repository, digest, status
                )));
            }
            _ => {}
        }

        let content = response.bytes().await?.to_vec();
        if !DigestUtils::verify(&content, digest) {
            return Err(ProcessorError::Store(format!(
                "blob {} failed digest verification",
                digest
            )));
        }
        Ok(content)
    }
}

/// Parse `Bearer realm="...",service="..."` into its parameters.
fn parse_bearer_challenge(header: &str) -> Option<AuthChallenge> {
    let params_str = header.strip_prefix("Bearer ")?;
    let mut params = HashMap::new();

    for param in params_str.split(',') {
        let param = param.trim();
        if let Some(eq_pos) = param.find('=') {
            let key = param[..eq_pos].trim();
            let value = param[eq_pos + 1..].trim().trim_matches('"');
            params.insert(key, value);
        }
    }

    Some(AuthChallenge {
        realm: params.get("realm")?.to_string(),
        service: params.get("service").unwrap_or(&"").to_string(),
    })
}
