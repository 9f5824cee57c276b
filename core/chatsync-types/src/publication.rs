//! Publication requests: batched proposals to add or remove entities in a
//! shared namespace, subject to approval.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// What a publication does with one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishAction {
    /// Publish the source at the target, replacing whatever is there.
    Add,
    /// Publish the source only if the target does not exist yet.
    AddIfAbsent,
    /// Remove the target from the shared namespace.
    Delete,
}

impl PublishAction {
    /// Whether resources with this action must reference a source.
    pub fn requires_source(self) -> bool {
        !matches!(self, PublishAction::Delete)
    }
}

/// One resource of a publication request, with already-encoded URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationResource {
    pub action: PublishAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub target_url: String,
}

impl PublicationResource {
    /// Checks the source/action invariant.
    pub fn validate(&self) -> Result<()> {
        if self.target_url.is_empty() {
            return Err(Error::Validation(format!(
                "{:?} resource has an empty target url",
                self.action
            )));
        }
        match (self.action.requires_source(), self.source_url.as_deref()) {
            (true, None) | (true, Some("")) => Err(Error::Validation(format!(
                "{:?} resource for {} requires a source url",
                self.action, self.target_url
            ))),
            (false, Some(source)) => Err(Error::Validation(format!(
                "DELETE resource for {} must not carry a source url (got {source})",
                self.target_url
            ))),
            _ => Ok(()),
        }
    }
}

/// An access rule attached to a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRule {
    pub function: String,
    pub source: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

/// The body submitted to create a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationRequest {
    pub name: String,
    pub target_folder: String,
    pub resources: Vec<PublicationResource>,
    #[serde(default)]
    pub rules: Vec<PublicationRule>,
}

impl PublicationRequest {
    /// Validates every resource; the request is accepted or rejected as a unit.
    pub fn validate(&self) -> Result<()> {
        if self.resources.is_empty() && self.rules.is_empty() {
            return Err(Error::Validation(
                "publication request has neither resources nor rules".to_string(),
            ));
        }
        if self.target_folder.is_empty() {
            return Err(Error::Validation(
                "publication target folder is empty".to_string(),
            ));
        }
        self.resources.iter().try_for_each(PublicationResource::validate)
    }
}

/// Review state of a publication on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    Pending,
    Approved,
    Rejected,
}

/// A publication as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_folder: Option<String>,
    pub status: PublicationStatus,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub resources: Vec<PublicationResource>,
    #[serde(default)]
    pub rules: Vec<PublicationRule>,
}
