//! HTTP implementation of the entity gateway.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::EntityGateway;
use super::models::{Area, Codebase, Comment, Document, Space, User, WorkItem, WorkItemType};
use crate::context::RequestContext;
use crate::{Error, Result};

/// Header used to correlate upstream calls with the inbound request.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Page size for list endpoints.
const PAGE_LIMIT: &str = "100";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway backed by the work item tracker (WIT) and auth REST APIs.
pub struct HttpGateway {
    client: Client,
    wit_url: Url,
    auth_url: Url,
    service_token: RwLock<Option<String>>,
}

/// Parse a base URL, making sure relative joins keep its path.
pub(crate) fn base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl HttpGateway {
    /// Create a gateway for the given service base URLs.
    pub fn new(wit_url: &str, auth_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Self::with_client(client, wit_url, auth_url)
    }

    /// Create a gateway sharing an existing HTTP client.
    pub fn with_client(client: Client, wit_url: &str, auth_url: &str) -> Result<Self> {
        Ok(Self {
            client,
            wit_url: base_url(wit_url)?,
            auth_url: base_url(auth_url)?,
            service_token: RwLock::new(None),
        })
    }

    /// The underlying HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Sign auth-service calls with a service account token so that private
    /// email addresses are visible.
    pub fn set_service_account_token(&self, token: impl Into<String>) {
        *self.service_token.write() = Some(token.into());
    }

    fn wit(&self, path: &str) -> Result<Url> {
        Ok(self.wit_url.join(path)?)
    }

    fn auth(&self, path: &str) -> Result<Url> {
        Ok(self.auth_url.join(path)?)
    }

    fn request(&self, ctx: &RequestContext, url: Url, signed: bool) -> RequestBuilder {
        let mut req = self.client.get(url);
        if let Some(request_id) = ctx.request_id() {
            req = req.header(REQUEST_ID_HEADER, request_id);
        }
        if signed && let Some(token) = self.service_token.read().as_deref() {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        url: Url,
        resource: &str,
        signed: bool,
    ) -> Result<T> {
        debug!(resource, url = %url, "fetching upstream resource");
        let path = url.path().to_string();
        let resp = self.request(ctx, url, signed).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::not_found(resource, path));
        }
        if status != StatusCode::OK {
            return Err(Error::upstream_status(resource, status.as_u16()));
        }
        let doc: Document<T> = resp.json().await?;
        Ok(doc.data)
    }
}

fn paged(mut url: Url) -> Url {
    url.query_pairs_mut()
        .append_pair("page[limit]", PAGE_LIMIT)
        .append_pair("page[offset]", "0");
    url
}

#[async_trait]
impl EntityGateway for HttpGateway {
    async fn get_work_item(&self, ctx: &RequestContext, id: Uuid) -> Result<WorkItem> {
        let url = self.wit(&format!("api/workitems/{id}"))?;
        self.fetch(ctx, url, "workitem", false).await
    }

    async fn get_comment(&self, ctx: &RequestContext, id: Uuid) -> Result<Comment> {
        let url = self.wit(&format!("api/comments/{id}"))?;
        self.fetch(ctx, url, "comment", false).await
    }

    async fn get_comments(&self, ctx: &RequestContext, work_item_id: Uuid) -> Result<Vec<Comment>> {
        let url = paged(self.wit(&format!("api/workitems/{work_item_id}/comments"))?);
        self.fetch(ctx, url, "comments", false).await
    }

    async fn get_area(&self, ctx: &RequestContext, id: Uuid) -> Result<Area> {
        let url = self.wit(&format!("api/areas/{id}"))?;
        self.fetch(ctx, url, "area", false).await
    }

    async fn get_space(&self, ctx: &RequestContext, id: Uuid) -> Result<Space> {
        let url = self.wit(&format!("api/spaces/{id}"))?;
        self.fetch(ctx, url, "space", false).await
    }

    async fn get_space_collaborators(
        &self,
        ctx: &RequestContext,
        space_id: Uuid,
    ) -> Result<Vec<User>> {
        let url = paged(self.auth(&format!("api/spaces/{space_id}/collaborators"))?);
        self.fetch(ctx, url, "collaborators", true).await
    }

    async fn get_work_item_type(&self, ctx: &RequestContext, id: Uuid) -> Result<WorkItemType> {
        let url = self.wit(&format!("api/workitemtypes/{id}"))?;
        self.fetch(ctx, url, "workitemtype", false).await
    }

    async fn get_user(&self, ctx: &RequestContext, id: Uuid) -> Result<User> {
        let url = self.auth(&format!("api/users/{id}"))?;
        self.fetch(ctx, url, "user", true).await
    }

    async fn get_codebases(
        &self,
        ctx: &RequestContext,
        repository_url: &str,
    ) -> Result<Vec<Codebase>> {
        let mut url = self.wit("api/search/codebases")?;
        url.query_pairs_mut().append_pair("url", repository_url);
        self.fetch(ctx, url, "codebases", false).await
    }
}
