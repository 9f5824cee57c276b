//! Publication workflow layered on the storage API: create a request, approve
//! or reject it, inspect pending ones, and preview its effect.

use crate::client::{read_json, ApiClient};
use crate::error::{ApiError, ApiResult};
use chatsync_types::{
    version_group, EntityInfo, EntityKey, EntityKind, Publication, PublicationRequest,
    PublicationResource, PublicationRule, PublishAction,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// An entity referenced by a publication resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub kind: EntityKind,
    pub key: EntityKey,
}

impl ResourceRef {
    pub fn new(kind: EntityKind, key: EntityKey) -> Self {
        Self { kind, key }
    }

    /// Encoded API url of the entity.
    pub fn url(&self) -> ApiResult<String> {
        Ok(self.key.api_id(self.kind)?)
    }
}

/// A publication resource before its references are encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDraft {
    pub action: PublishAction,
    pub source: Option<ResourceRef>,
    pub target: ResourceRef,
}

impl ResourceDraft {
    pub fn add(source: ResourceRef, target: ResourceRef) -> Self {
        Self {
            action: PublishAction::Add,
            source: Some(source),
            target,
        }
    }

    pub fn add_if_absent(source: ResourceRef, target: ResourceRef) -> Self {
        Self {
            action: PublishAction::AddIfAbsent,
            source: Some(source),
            target,
        }
    }

    pub fn delete(target: ResourceRef) -> Self {
        Self {
            action: PublishAction::Delete,
            source: None,
            target,
        }
    }

    /// Encodes both references through the key codec and checks the
    /// action/source invariant.
    pub fn encode(&self) -> ApiResult<PublicationResource> {
        let resource = PublicationResource {
            action: self.action,
            source_url: self.source.as_ref().map(ResourceRef::url).transpose()?,
            target_url: self.target.url()?,
        };
        resource.validate()?;
        Ok(resource)
    }
}

#[derive(Debug, Serialize)]
struct UrlBody<'a> {
    url: &'a str,
}

#[derive(Debug, Serialize)]
struct RejectBody<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PublicationList {
    #[serde(default)]
    publications: Vec<Publication>,
}

/// Client for the publication endpoints.
#[derive(Clone)]
pub struct PublicationApi {
    client: ApiClient,
}

impl PublicationApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Validates and submits a publication request as one unit.
    ///
    /// Any invalid resource fails the whole request before a network call.
    pub async fn create_publish_request(
        &self,
        name: &str,
        target_folder: &str,
        resources: &[ResourceDraft],
        rules: Vec<PublicationRule>,
    ) -> ApiResult<Publication> {
        let resources = resources
            .iter()
            .map(ResourceDraft::encode)
            .collect::<ApiResult<Vec<_>>>()?;

        let request = PublicationRequest {
            name: name.to_string(),
            target_folder: target_folder.to_string(),
            resources,
            rules,
        };
        self.submit(&request).await
    }

    /// Submits an already-encoded request after validating it.
    pub async fn submit(&self, request: &PublicationRequest) -> ApiResult<Publication> {
        request.validate()?;

        let url = self.client.endpoint_url(&self.client.config().publication.create);
        debug!(
            "Submitting publication {:?} with {} resources",
            request.name,
            request.resources.len()
        );

        let response = self
            .client
            .send(self.client.request(Method::POST, &url).json(request))
            .await?;
        let publication: Publication = read_json(response).await?;

        info!("Created publication {}", publication.url);
        Ok(publication)
    }

    /// Approves a pending publication. A repeated approval is surfaced as
    /// the server's error (typically 404/409), not retried.
    pub async fn approve(&self, publication_url: &str) -> ApiResult<()> {
        let url = self.client.endpoint_url(&self.client.config().publication.approve);
        self.client
            .send(
                self.client
                    .request(Method::POST, &url)
                    .json(&UrlBody { url: publication_url }),
            )
            .await?;
        info!("Approved publication {}", publication_url);
        Ok(())
    }

    /// Rejects a pending publication, optionally with a comment.
    pub async fn reject(&self, publication_url: &str, comment: Option<&str>) -> ApiResult<()> {
        let url = self.client.endpoint_url(&self.client.config().publication.reject);
        self.client
            .send(self.client.request(Method::POST, &url).json(&RejectBody {
                url: publication_url,
                comment,
            }))
            .await?;
        info!("Rejected publication {}", publication_url);
        Ok(())
    }

    /// Lists publication requests of a bucket that await review.
    pub async fn list_pending(&self, bucket: &str) -> ApiResult<Vec<Publication>> {
        if bucket.is_empty() {
            return Err(ApiError::Validation("bucket is empty".to_string()));
        }
        let url = self.client.endpoint_url(&self.client.config().publication.list);
        let listing_url = format!("publications/{}/", urlencoding::encode(bucket));

        let response = self
            .client
            .send(
                self.client
                    .request(Method::POST, &url)
                    .json(&UrlBody { url: &listing_url }),
            )
            .await?;
        let list: PublicationList = read_json(response).await?;
        Ok(list.publications)
    }

    /// Fetches one publication with its resources.
    pub async fn get(&self, publication_url: &str) -> ApiResult<Publication> {
        let url = self.client.endpoint_url(&self.client.config().publication.get);
        let response = self
            .client
            .send(
                self.client
                    .request(Method::POST, &url)
                    .json(&UrlBody { url: publication_url }),
            )
            .await?;
        read_json(response).await
    }
}

// ── Diffing ──────────────────────────────────────────────────────

/// Effect a resource would have on the target namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// Target does not exist and nothing of its version group does either.
    Create,
    /// Target does not exist, but other versions of it do.
    NewVersion { existing_versions: Vec<EntityKey> },
    /// `ADD` over an existing target.
    Replace,
    /// `ADD_IF_ABSENT` over an existing target; nothing happens.
    Skip,
    /// `DELETE` of an existing target.
    Remove,
    /// `DELETE` of a target that is not there.
    RemoveMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDiff {
    pub action: PublishAction,
    pub target: ResourceRef,
    pub change: ResourceChange,
}

/// Classifies each resource against the current contents of the target
/// namespace.
pub fn diff_publication(resources: &[ResourceDraft], existing: &[EntityInfo]) -> Vec<ResourceDiff> {
    resources
        .iter()
        .map(|resource| {
            let target = &resource.target;
            let exists = existing
                .iter()
                .any(|info| info.kind == target.kind && info.key == target.key);

            let change = match (resource.action, exists) {
                (PublishAction::Delete, true) => ResourceChange::Remove,
                (PublishAction::Delete, false) => ResourceChange::RemoveMissing,
                (PublishAction::Add, true) => ResourceChange::Replace,
                (PublishAction::AddIfAbsent, true) => ResourceChange::Skip,
                (_, false) => {
                    let group = version_group(&target.key);
                    let mut existing_versions: Vec<EntityKey> = existing
                        .iter()
                        .filter(|info| info.kind == target.kind)
                        .filter(|info| version_group(&info.key) == group)
                        .map(|info| info.key.clone())
                        .collect();
                    if existing_versions.is_empty() {
                        ResourceChange::Create
                    } else {
                        existing_versions.sort();
                        ResourceChange::NewVersion { existing_versions }
                    }
                }
            };

            ResourceDiff {
                action: resource.action,
                target: target.clone(),
                change,
            }
        })
        .collect()
}
