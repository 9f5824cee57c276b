//! Entity keys and the path codec.
//!
//! A key is `bucket / folder… / name`, where every segment is
//! percent-encoded on its own so that separators inside a name never split it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between encoded key segments.
pub const KEY_SEPARATOR: char = '/';

/// The kind of record stored behind a key. Each kind lives under its own
/// API path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Conversation,
    Prompt,
    Application,
    File,
}

impl EntityKind {
    /// All kinds, in API listing order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Conversation,
        EntityKind::Prompt,
        EntityKind::Application,
        EntityKind::File,
    ];

    /// The API path prefix for this kind.
    pub const fn prefix(self) -> &'static str {
        match self {
            EntityKind::Conversation => "conversations",
            EntityKind::Prompt => "prompts",
            EntityKind::Application => "applications",
            EntityKind::File => "files",
        }
    }

    /// Resolves a kind from its API path prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.prefix() == prefix)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Uniquely identifies a storable item within one [`EntityKind`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    pub bucket: String,
    pub folder_path: Vec<String>,
    pub name: String,
}

impl EntityKey {
    /// Creates a key, rejecting empty segments.
    pub fn new(
        bucket: impl Into<String>,
        folder_path: Vec<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let key = Self {
            bucket: bucket.into(),
            folder_path,
            name: name.into(),
        };
        key.validate()?;
        Ok(key)
    }

    /// Creates a key at the root of a bucket.
    pub fn root(bucket: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Self::new(bucket, Vec::new(), name)
    }

    fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(Error::MalformedKey("bucket is empty".to_string()));
        }
        if self.name.is_empty() {
            return Err(Error::MalformedKey("name is empty".to_string()));
        }
        if let Some(pos) = self.folder_path.iter().position(String::is_empty) {
            return Err(Error::MalformedKey(format!("folder segment {pos} is empty")));
        }
        Ok(())
    }

    /// Encodes the key into its path form.
    pub fn encode(&self) -> Result<String> {
        encode(&self.bucket, &self.folder_path, &self.name)
    }

    /// Returns the full API id: `{prefix}/{encoded key}`.
    pub fn api_id(&self, kind: EntityKind) -> Result<String> {
        Ok(format!("{}{KEY_SEPARATOR}{}", kind.prefix(), self.encode()?))
    }

    /// Encoded `bucket/folder…` path of the folder holding this key.
    pub fn parent_folder(&self) -> String {
        folder_path_string(&self.bucket, &self.folder_path)
    }

    /// Returns the same entity relocated into another folder of the bucket.
    pub fn with_folder(&self, folder_path: Vec<String>) -> Result<Self> {
        Self::new(self.bucket.clone(), folder_path, self.name.clone())
    }

    /// Returns the same location with another name.
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self> {
        Self::new(self.bucket.clone(), self.folder_path.clone(), name)
    }

    /// Whether this key lives in `bucket` under `folder_prefix` (at any depth).
    pub fn is_within(&self, bucket: &str, folder_prefix: &[String]) -> bool {
        self.bucket == bucket && self.folder_path.starts_with(folder_prefix)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys built through `new` always encode.
        match self.encode() {
            Ok(encoded) => f.write_str(&encoded),
            Err(_) => write!(f, "<invalid key {:?}>", self.name),
        }
    }
}

impl FromStr for EntityKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode(s)
    }
}

/// Encodes `(bucket, folder_path, name)` into a `/`-separated key.
pub fn encode<S: AsRef<str>>(bucket: &str, folder_path: &[S], name: &str) -> Result<String> {
    if bucket.is_empty() || name.is_empty() {
        return Err(Error::MalformedKey(
            "bucket and name must be non-empty".to_string(),
        ));
    }

    let mut out = encode_segment(bucket);
    for segment in folder_path {
        let segment = segment.as_ref();
        if segment.is_empty() {
            return Err(Error::MalformedKey("folder segment is empty".to_string()));
        }
        out.push(KEY_SEPARATOR);
        out.push_str(&encode_segment(segment));
    }
    out.push(KEY_SEPARATOR);
    out.push_str(&encode_segment(name));
    Ok(out)
}

/// Decodes a key produced by [`encode`].
pub fn decode(key: &str) -> Result<EntityKey> {
    let segments = key
        .split(KEY_SEPARATOR)
        .map(decode_segment)
        .collect::<Result<Vec<_>>>()?;

    if segments.len() < 2 {
        return Err(Error::MalformedKey(format!(
            "expected at least bucket and name in {key:?}"
        )));
    }

    let mut segments = segments;
    let name = segments.pop().unwrap_or_default();
    let bucket = segments.remove(0);
    EntityKey::new(bucket, segments, name).map_err(|e| match e {
        Error::MalformedKey(msg) => Error::MalformedKey(format!("{msg} in {key:?}")),
        other => other,
    })
}

/// Splits a full API id (`conversations/u1/chats/My%20Chat`) into its kind
/// and key.
pub fn parse_api_id(id: &str) -> Result<(EntityKind, EntityKey)> {
    let (prefix, rest) = id
        .split_once(KEY_SEPARATOR)
        .ok_or_else(|| Error::MalformedKey(format!("missing kind prefix in {id:?}")))?;
    let kind = EntityKind::from_prefix(prefix)
        .ok_or_else(|| Error::MalformedKey(format!("unknown kind prefix {prefix:?}")))?;
    Ok((kind, decode(rest)?))
}

pub(crate) fn folder_path_string<S: AsRef<str>>(bucket: &str, folder_path: &[S]) -> String {
    let mut out = encode_segment(bucket);
    for segment in folder_path {
        out.push(KEY_SEPARATOR);
        out.push_str(&encode_segment(segment.as_ref()));
    }
    out
}

fn encode_segment(segment: &str) -> String {
    // `.` and `..` survive percent-encoding untouched but would be collapsed by
    // URL normalisation, so spell the dots out.
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => urlencoding::encode(segment).into_owned(),
    }
}

pub(crate) fn decode_segment(segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| Error::MalformedKey(format!("invalid percent-encoding in {segment:?}: {e}")))
}
