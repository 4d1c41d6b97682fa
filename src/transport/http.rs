//! HTTP transport speaking the remote media server's REST API.
//!
//! Endpoints used:
//! - `/library/metadata/{id}`: single item (also accepts a comma-joined id
//!   list for batch fetches)
//! - `/library/metadata/{id}/children`: direct children of an item
//! - `/library/sections/{id}/collections`: collection index of a section
//!
//! Every request carries the access token header and a 30-second timeout.
//! HTTP 401/429 map to [`TransportError::Unauthorized`]; the server answers
//! with those when the token is bad or it is under too much strain.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use reelsync_common::{ItemId, ItemKind, SectionId};

use super::{CollectionRef, MediaDocument, MediaTransport, TransportError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_HEADER: &str = "X-Api-Token";

// ---------------------------------------------------------------------------
// Wire types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ContainerResponse {
    #[serde(rename = "MediaContainer")]
    container: Container,
}

#[derive(Debug, Default, Deserialize)]
struct Container {
    #[serde(default, rename = "Metadata")]
    metadata: Vec<WireMetadata>,
    #[serde(default, rename = "Directory")]
    directories: Vec<WireDirectory>,
}

#[derive(Debug, Deserialize)]
struct WireMetadata {
    /// The server sends rating keys as strings.
    #[serde(rename = "ratingKey")]
    rating_key: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "librarySectionID")]
    library_section_id: Option<u64>,
    #[serde(default, rename = "Collection")]
    collections: Vec<WireTag>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WireTag {
    #[serde(default)]
    index: Option<u32>,
    tag: String,
}

#[derive(Debug, Deserialize)]
struct WireDirectory {
    #[serde(rename = "ratingKey")]
    rating_key: String,
    index: Option<u32>,
}

fn into_document(wire: WireMetadata) -> Result<MediaDocument, TransportError> {
    let id = wire
        .rating_key
        .parse::<u64>()
        .map(ItemId::new)
        .map_err(|_| TransportError::Malformed(format!("bad rating key: {}", wire.rating_key)))?;
    let kind = wire
        .kind
        .parse::<ItemKind>()
        .map_err(|_| TransportError::Malformed(format!("unknown item kind: {}", wire.kind)))?;
    let collection_refs = wire
        .collections
        .into_iter()
        .filter_map(|tag| {
            tag.index.map(|index| CollectionRef {
                index,
                title: tag.tag,
            })
        })
        .collect();

    Ok(MediaDocument {
        id,
        kind,
        title: wire.title,
        section_id: wire.library_section_id.map(SectionId::new),
        collection_refs,
        attributes: serde_json::Value::Object(wire.extra),
    })
}

// ---------------------------------------------------------------------------
// Transport implementation
// ---------------------------------------------------------------------------

/// Metadata transport backed by the remote media server's REST API.
///
/// # Examples
///
/// ```no_run
/// use reelsync::transport::HttpTransport;
///
/// let transport = HttpTransport::new("http://127.0.0.1:32400".into(), "token".into());
/// ```
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpTransport {
    /// Create a new transport for the server at `base_url` using `token` for
    /// authentication.
    pub fn new(base_url: String, token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Execute a GET request and decode the media container envelope.
    ///
    /// Returns `Ok(None)` on HTTP 404 so call sites can decide what absence
    /// means for them.
    async fn get_container(&self, path: &str) -> Result<Option<Container>, TransportError> {
        let url = format!("{}{}", self.base_url, path);

        let resp = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| TransportError::Http(format!("request failed: {e}")))?;

        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::TOO_MANY_REQUESTS => {
                warn!(url = %url, status = %resp.status(), "Server rejected metadata request");
                Err(TransportError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(TransportError::Http(format!(
                "unexpected status {status} for {url}"
            ))),
            _ => {
                let body: ContainerResponse = resp
                    .json()
                    .await
                    .map_err(|e| TransportError::Malformed(e.to_string()))?;
                Ok(Some(body.container))
            }
        }
    }
}

#[async_trait]
impl MediaTransport for HttpTransport {
    async fn fetch_one(&self, id: ItemId) -> Result<MediaDocument, TransportError> {
        let container = self
            .get_container(&format!("/library/metadata/{id}"))
            .await?
            .ok_or(TransportError::NotFound(id))?;

        let wire = container
            .metadata
            .into_iter()
            .next()
            .ok_or(TransportError::NotFound(id))?;
        into_document(wire)
    }

    async fn fetch_batch(
        &self,
        ids: &[ItemId],
        max_batch_size: usize,
    ) -> Result<Vec<MediaDocument>, TransportError> {
        let mut documents = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(max_batch_size.max(1)) {
            let joined = chunk
                .iter()
                .map(ItemId::to_string)
                .collect::<Vec<_>>()
                .join(",");
            debug!(count = chunk.len(), "Batch-loading metadata");

            let Some(container) = self
                .get_container(&format!("/library/metadata/{joined}"))
                .await?
            else {
                // None of the requested ids exist; the pipeline accounts for
                // each missing id individually.
                continue;
            };

            for wire in container.metadata {
                match into_document(wire) {
                    Ok(doc) => documents.push(doc),
                    Err(e) => warn!(error = %e, "Skipping undecodable batch entry"),
                }
            }
        }

        Ok(documents)
    }

    async fn fetch_children(&self, id: ItemId) -> Result<Vec<MediaDocument>, TransportError> {
        let container = self
            .get_container(&format!("/library/metadata/{id}/children"))
            .await?
            .ok_or_else(|| TransportError::Malformed(format!("no child listing for item {id}")))?;

        container.metadata.into_iter().map(into_document).collect()
    }

    async fn fetch_collection_index(
        &self,
        section_id: SectionId,
    ) -> Result<Vec<(u32, ItemId)>, TransportError> {
        let container = self
            .get_container(&format!("/library/sections/{section_id}/collections"))
            .await?
            .ok_or_else(|| {
                TransportError::Malformed(format!(
                    "no collection listing for section {section_id}"
                ))
            })?;

        Ok(container
            .directories
            .into_iter()
            .filter_map(|dir| {
                let id = dir.rating_key.parse::<u64>().ok().map(ItemId::new)?;
                Some((dir.index?, id))
            })
            .collect())
    }

    async fn fetch_collection(&self, id: ItemId) -> Result<MediaDocument, TransportError> {
        self.fetch_one(id).await.map_err(|e| match e {
            TransportError::NotFound(id) => {
                TransportError::Malformed(format!("collection {id} not found"))
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn movie_json(rating_key: &str, title: &str) -> serde_json::Value {
        json!({
            "ratingKey": rating_key,
            "type": "movie",
            "title": title,
            "librarySectionID": 1,
            "year": 2014,
            "Collection": [{"index": 4, "tag": "Space Epics"}],
        })
    }

    #[tokio::test]
    async fn fetch_one_decodes_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/metadata/10"))
            .and(header("X-Api-Token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"Metadata": [movie_json("10", "Interstellar")]}
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok".to_string());
        let doc = transport.fetch_one(ItemId::new(10)).await.unwrap();

        assert_eq!(doc.id, ItemId::new(10));
        assert_eq!(doc.kind, ItemKind::Movie);
        assert_eq!(doc.title, "Interstellar");
        assert_eq!(doc.section_id, Some(SectionId::new(1)));
        assert_eq!(doc.collection_refs.len(), 1);
        assert_eq!(doc.collection_refs[0].index, 4);
        assert_eq!(doc.attributes["year"], json!(2014));
    }

    #[tokio::test]
    async fn fetch_one_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/metadata/99"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok".to_string());
        let err = transport.fetch_one(ItemId::new(99)).await.unwrap_err();
        assert_matches!(err, TransportError::NotFound(id) if id == ItemId::new(99));
    }

    #[tokio::test]
    async fn fetch_one_maps_401_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "bad".to_string());
        let err = transport.fetch_one(ItemId::new(1)).await.unwrap_err();
        assert_matches!(err, TransportError::Unauthorized);
    }

    #[tokio::test]
    async fn fetch_batch_joins_ids_and_skips_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/metadata/10,11,12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"Metadata": [
                    movie_json("10", "First"),
                    movie_json("12", "Third"),
                ]}
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok".to_string());
        let ids = [ItemId::new(10), ItemId::new(11), ItemId::new(12)];
        let docs = transport.fetch_batch(&ids, 100).await.unwrap();

        // Id 11 is simply absent from the response.
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, ItemId::new(10));
        assert_eq!(docs[1].id, ItemId::new(12));
    }

    #[tokio::test]
    async fn fetch_children_lists_episodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/metadata/20/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"Metadata": [
                    {"ratingKey": "21", "type": "episode", "title": "Pilot"},
                    {"ratingKey": "22", "type": "episode", "title": "Two"},
                ]}
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok".to_string());
        let children = transport.fetch_children(ItemId::new(20)).await.unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(children[0].kind, ItemKind::Episode);
    }

    #[tokio::test]
    async fn fetch_children_rejects_undecodable_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/metadata/20/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"Metadata": [
                    {"ratingKey": "not-a-key", "type": "episode", "title": "Broken"},
                ]}
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok".to_string());
        let err = transport.fetch_children(ItemId::new(20)).await.unwrap_err();
        assert_matches!(err, TransportError::Malformed(_));
    }

    #[tokio::test]
    async fn fetch_collection_index_pairs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/library/sections/3/collections"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MediaContainer": {"Directory": [
                    {"ratingKey": "100", "index": 1, "title": "Trilogy"},
                    {"ratingKey": "101", "index": 2, "title": "Saga"},
                ]}
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(server.uri(), "tok".to_string());
        let index = transport
            .fetch_collection_index(SectionId::new(3))
            .await
            .unwrap();

        assert_eq!(index, vec![(1, ItemId::new(100)), (2, ItemId::new(101))]);
    }
}
