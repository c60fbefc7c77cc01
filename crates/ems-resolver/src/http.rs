//! HTTP adapter for the console REST API
//!
//! Endpoint layout, relative to the configured base URL:
//! - `GET    {resource}?q=&page=&perPage=` search
//! - `POST   {resource}` create, `PUT {resource}/{id}` update, `DELETE {resource}/{id}` delete
//! - `GET    {resource}/export?filter=<json>` export
//! - `POST   notifications` notify
//!
//! Single records and pages are wrapped in a `{"data": ...}` envelope.

use crate::error::ResolverError;
use crate::resolver::RemoteResolver;
use crate::types::{
    ExportArtifact, ExportFilter, Mutation, MutationKind, NotificationRequest, Record, RecordId,
    SearchPage, SearchParams,
};
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 200;
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// REST resolver bound to one resource
#[derive(Debug, Clone)]
pub struct HttpResolver {
    client: Client,
    base_url: String,
    resource: String,
}

impl HttpResolver {
    /// Create resolver with its own client
    ///
    /// # Errors
    /// Returns `Transport` if the HTTP client cannot be built
    pub fn new(
        base_url: impl Into<String>,
        resource: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ResolverError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ResolverError::Transport(format!("failed to build client: {e}")))?;
        Ok(Self::with_client(client, base_url, resource))
    }

    /// Create resolver sharing an existing client
    #[must_use]
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            resource: resource.into().trim_matches('/').to_string(),
        }
    }

    /// Resolver for another resource on the same server
    #[must_use]
    pub fn for_resource(&self, resource: impl Into<String>) -> Self {
        Self::with_client(self.client.clone(), self.base_url.clone(), resource)
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.resource)
    }

    fn record_url(&self, id: &RecordId) -> String {
        format!("{}/{}/{}", self.base_url, self.resource, id)
    }

    fn export_url(&self) -> String {
        format!("{}/{}/export", self.base_url, self.resource)
    }

    fn notifications_url(&self) -> String {
        format!("{}/notifications", self.base_url)
    }
}

/// Query pairs for a search request
fn search_query(params: &SearchParams) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::with_capacity(3);
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        pairs.push(("q", q.to_string()));
    }
    if let Some(page) = params.page {
        pairs.push(("page", page.to_string()));
    }
    if let Some(per_page) = params.per_page {
        pairs.push(("perPage", per_page.to_string()));
    }
    pairs
}

/// Extract `filename` from a `Content-Disposition` header value
fn parse_file_name(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

async fn ensure_success(response: Response) -> Result<Response, ResolverError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ResolverError::Status {
        status: status.as_u16(),
        body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

#[async_trait]
impl RemoteResolver for HttpResolver {
    fn resource(&self) -> &str {
        &self.resource
    }

    async fn search(&self, params: SearchParams) -> Result<SearchPage, ResolverError> {
        tracing::debug!("GET {} q={:?}", self.collection_url(), params.q);

        let response = self
            .client
            .get(self.collection_url())
            .query(&search_query(&params))
            .send()
            .await?;
        let page = ensure_success(response).await?.json::<SearchPage>().await?;

        tracing::debug!("{} returned {} records", self.resource, page.data.len());
        Ok(page)
    }

    async fn mutate(&self, mutation: Mutation) -> Result<Option<Record>, ResolverError> {
        let request = match &mutation {
            Mutation::Create(record) => self.client.post(self.collection_url()).json(record),
            Mutation::Update(record) => self.client.put(self.record_url(&record.id)).json(record),
            Mutation::Delete(id) => self.client.delete(self.record_url(id)),
        };

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND && mutation.kind() != MutationKind::Create {
            return Err(ResolverError::NotFound(mutation.target().clone()));
        }
        let response = ensure_success(response).await?;

        match mutation {
            Mutation::Delete(_) => Ok(None),
            Mutation::Create(_) | Mutation::Update(_) => {
                let envelope = response.json::<DataEnvelope<Record>>().await?;
                Ok(Some(envelope.data))
            }
        }
    }

    async fn export(&self, filter: &ExportFilter) -> Result<ExportArtifact, ResolverError> {
        let filter_json = serde_json::to_string(filter)?;
        tracing::info!("exporting {} {} records", filter.ids.len(), self.resource);

        let response = self
            .client
            .get(self.export_url())
            .query(&[("filter", filter_json)])
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let headers = response.headers();
        let file_name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_file_name)
            .unwrap_or_else(|| format!("{}.csv", self.resource));
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok(ExportArtifact {
            file_name,
            content_type,
            bytes,
        })
    }

    async fn send_notification(&self, request: &NotificationRequest) -> Result<(), ResolverError> {
        tracing::info!(
            "sending notification '{}' over {} channel(s)",
            request.subject,
            request.channels.len()
        );

        let response = self
            .client
            .post(self.notifications_url())
            .json(request)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver() -> HttpResolver {
        HttpResolver::with_client(Client::new(), "https://ems.example/api/", "/areas/")
    }

    #[test]
    fn urls_are_normalized() {
        let r = resolver();
        assert_eq!(r.collection_url(), "https://ems.example/api/areas");
        assert_eq!(r.record_url(&"7".into()), "https://ems.example/api/areas/7");
        assert_eq!(r.export_url(), "https://ems.example/api/areas/export");
        assert_eq!(r.notifications_url(), "https://ems.example/api/notifications");
        assert_eq!(r.for_resource("agencies").collection_url(), "https://ems.example/api/agencies");
    }

    #[test]
    fn unfiltered_search_sends_no_query_text() {
        assert!(search_query(&SearchParams::first_page()).is_empty());
        assert!(search_query(&SearchParams::query("   ")).is_empty());
    }

    #[test]
    fn search_query_pairs() {
        let params = SearchParams::query(" harbor ").with_page(2).with_per_page(25);
        assert_eq!(
            search_query(&params),
            vec![
                ("q", "harbor".to_string()),
                ("page", "2".to_string()),
                ("perPage", "25".to_string()),
            ]
        );
    }

    #[test]
    fn file_name_from_disposition() {
        assert_eq!(
            parse_file_name("attachment; filename=\"events.xlsx\"").as_deref(),
            Some("events.xlsx")
        );
        assert_eq!(parse_file_name("attachment; filename=a.csv").as_deref(), Some("a.csv"));
        assert_eq!(parse_file_name("inline"), None);
        assert_eq!(parse_file_name("attachment; filename=\"\""), None);
    }

    #[test]
    fn record_envelope_decodes() {
        let envelope: DataEnvelope<Record> =
            serde_json::from_str(r#"{"data": {"id": 3, "name": "North"}}"#).unwrap();
        assert_eq!(envelope.data.id, RecordId::from("3"));
    }
}
