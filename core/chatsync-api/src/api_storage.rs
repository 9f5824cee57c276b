//! HTTP implementation of [`EntityStorage`], generic over the entity kind.

use crate::client::{read_json, ApiClient};
use crate::error::{ApiError, ApiResult};
use crate::kinds::{
    ApplicationKind, ConversationKind, EntityKindSpec, PromptKind, StoredDocument,
};
use crate::storage::{EntityStorage, ListOptions};
use async_trait::async_trait;
use chatsync_types::{parse_api_id, Entity, EntityInfo, EntityKind, EntityStatus, FolderInfo};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

pub type ConversationStorage = ApiEntityStorage<ConversationKind>;
pub type PromptStorage = ApiEntityStorage<PromptKind>;
pub type ApplicationStorage = ApiEntityStorage<ApplicationKind>;

/// Node of a listing response. The root is the listed folder itself.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingNode {
    #[serde(default)]
    url: String,
    #[serde(default)]
    node_type: NodeType,
    #[serde(default)]
    updated_at: Option<i64>,
    #[serde(default)]
    items: Vec<ListingNode>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum NodeType {
    #[default]
    Item,
    Folder,
}

impl NodeType {
    fn as_filter(self) -> &'static str {
        match self {
            NodeType::Item => "ITEM",
            NodeType::Folder => "FOLDER",
        }
    }
}

/// Some deployments answer a listing with the bare item array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingBody {
    Node(ListingNode),
    Items(Vec<ListingNode>),
}

impl ListingBody {
    fn into_items(self) -> Vec<ListingNode> {
        match self {
            ListingBody::Node(root) => root.items,
            ListingBody::Items(items) => items,
        }
    }
}

/// Metadata the server may return after a PUT.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriteAck {
    #[serde(default)]
    updated_at: Option<i64>,
}

fn collect_nodes(nodes: Vec<ListingNode>, wanted: NodeType, out: &mut Vec<ListingNode>) {
    for mut node in nodes {
        let children = std::mem::take(&mut node.items);
        if node.node_type == wanted {
            out.push(node);
        }
        collect_nodes(children, wanted, out);
    }
}

/// Remote storage for one entity kind.
pub struct ApiEntityStorage<K: EntityKindSpec> {
    client: ApiClient,
    spec: K,
}

impl<K: EntityKindSpec> ApiEntityStorage<K> {
    pub fn new(client: ApiClient, spec: K) -> Self {
        Self { client, spec }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn spec(&self) -> &K {
        &self.spec
    }

    fn check_folder(&self, folder: &FolderInfo) -> ApiResult<()> {
        if folder.kind != K::KIND {
            return Err(ApiError::Validation(format!(
                "{} storage cannot list {} folder {}",
                K::KIND,
                folder.kind,
                folder.id()
            )));
        }
        Ok(())
    }

    /// One listing request. A missing folder (404) lists as empty.
    async fn fetch_listing(
        &self,
        folder: &FolderInfo,
        node_type: NodeType,
        options: ListOptions,
    ) -> ApiResult<Vec<ListingNode>> {
        self.check_folder(folder)?;
        let url = self.client.listing_url(folder);
        debug!("Listing {} ({:?}, recursive={})", url, node_type, options.recursive);

        let request = self.client.request(Method::GET, &url).query(&[
            ("filter", node_type.as_filter()),
            ("recursive", if options.recursive { "true" } else { "false" }),
        ]);

        let response = match self.client.send(request).await {
            Ok(response) => response,
            Err(e) if e.is_not_found() => {
                debug!("Folder {} does not exist yet", folder.id());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let body: ListingBody = read_json(response).await?;
        let mut nodes = Vec::new();
        collect_nodes(body.into_items(), node_type, &mut nodes);
        Ok(nodes)
    }

    fn node_to_info(&self, node: ListingNode) -> ApiResult<EntityInfo> {
        let (kind, key) = parse_api_id(&node.url)?;
        if kind != K::KIND {
            return Err(ApiError::MalformedKey(format!(
                "listing for {} returned {} item {}",
                K::KIND,
                kind,
                node.url
            )));
        }
        Ok(EntityInfo {
            kind,
            key,
            updated_at: node.updated_at,
            status: EntityStatus::Listed,
        })
    }

    /// Cleans the payload and wraps it in the stored document shape.
    pub fn document_for(
        &self,
        entity: &Entity<K::Payload>,
    ) -> ApiResult<StoredDocument<K::Payload>> {
        let info = &entity.info;
        Ok(StoredDocument {
            id: info.id()?,
            name: info.name().to_string(),
            folder_id: info.folder_id(),
            updated_at: info.updated_at,
            payload: self.spec.clean_up_entity(entity.payload.clone()),
        })
    }

    async fn put(&self, entity: &Entity<K::Payload>) -> ApiResult<EntityInfo> {
        if entity.info.kind != K::KIND {
            return Err(ApiError::Validation(format!(
                "{} storage cannot store {} entity {}",
                K::KIND,
                entity.info.kind,
                entity.info.key
            )));
        }

        let document = self.document_for(entity)?;
        let url = self.client.entity_url(&document.id);
        debug!("PUT {}", url);

        let response = self
            .client
            .send(self.client.request(Method::PUT, &url).json(&document))
            .await?;

        let text = response.text().await?;
        let ack: WriteAck = serde_json::from_str(&text).unwrap_or_default();

        Ok(EntityInfo {
            updated_at: ack.updated_at.or(entity.info.updated_at),
            ..entity.info.clone()
        })
    }
}

#[async_trait]
impl<K: EntityKindSpec> EntityStorage for ApiEntityStorage<K> {
    type Payload = K::Payload;

    fn kind(&self) -> EntityKind {
        K::KIND
    }

    async fn list(&self, folder: &FolderInfo, options: ListOptions) -> ApiResult<Vec<EntityInfo>> {
        self.fetch_listing(folder, NodeType::Item, options)
            .await?
            .into_iter()
            .map(|node| self.node_to_info(node))
            .collect()
    }

    async fn list_folders(
        &self,
        folder: &FolderInfo,
        options: ListOptions,
    ) -> ApiResult<Vec<FolderInfo>> {
        self.fetch_listing(folder, NodeType::Folder, options)
            .await?
            .into_iter()
            .map(|node| FolderInfo::from_id(&node.url).map_err(ApiError::from))
            .collect()
    }

    async fn get(&self, info: &EntityInfo) -> ApiResult<Entity<K::Payload>> {
        let url = self.client.entity_url(&info.id()?);
        debug!("GET {}", url);

        let response = self
            .client
            .send(self.client.request(Method::GET, &url))
            .await?;
        let fetched: StoredDocument<K::Payload> = read_json(response).await?;

        if !fetched.name.is_empty() && fetched.name != info.name() {
            debug!(
                "Stored name {:?} differs from listing name {:?}; keeping listing",
                fetched.name,
                info.name()
            );
        }

        Ok(self.spec.merge_get_result(info, fetched))
    }

    async fn create(&self, entity: &Entity<K::Payload>) -> ApiResult<EntityInfo> {
        let stored = self.put(entity).await?;
        info!("Created {} {}", K::KIND, stored.key);
        Ok(stored)
    }

    async fn update(&self, entity: &Entity<K::Payload>) -> ApiResult<EntityInfo> {
        let stored = self.put(entity).await?;
        info!("Updated {} {}", K::KIND, stored.key);
        Ok(stored)
    }

    async fn delete(&self, info: &EntityInfo) -> ApiResult<()> {
        let url = self.client.entity_url(&info.id()?);
        debug!("DELETE {}", url);

        match self
            .client
            .send(self.client.request(Method::DELETE, &url))
            .await
        {
            Ok(_) => {
                info!("Deleted {} {}", K::KIND, info.key);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("{} {} already absent", K::KIND, info.key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
