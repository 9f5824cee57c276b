use crate::args::{Cli, Command, KindArg};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat};
use chatsync_api::{
    diff_publication, ApiClient, ApiConfig, ApiEntityStorage, ApplicationKind, ConversationKind,
    EntityKindSpec, EntityStorage, FileUploader, ListOptions, PromptKind, PublicationApi,
    ResourceChange, ResourceDraft, ResourceRef,
};
use chatsync_types::{decode, EntityInfo, EntityKey, EntityKind, FolderInfo, ProgressEvent};
use std::collections::BTreeSet;
use std::io::Write;
use tracing::debug;

/// Runs `$f(spec, args..)` with the kind spec matching `$kind`.
macro_rules! with_kind {
    ($kind:expr, $f:ident($($arg:expr),* $(,)?)) => {
        match $kind {
            KindArg::Conversation => $f(ConversationKind, $($arg),*).await,
            KindArg::Prompt => $f(PromptKind, $($arg),*).await,
            KindArg::Application => $f(ApplicationKind, $($arg),*).await,
        }
    };
}

/// Builds the client config: file (if any), then flag/env overrides.
pub fn resolve_config(cli: &Cli) -> Result<ApiConfig> {
    let mut config = match &cli.config {
        Some(path) => ApiConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ApiConfig::default(),
    };
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.bearer_token = Some(token.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Parses an encoded key such as `u1/work/My%20Chat`.
pub fn parse_key(raw: &str) -> Result<EntityKey> {
    decode(raw).with_context(|| format!("Invalid key {raw:?}"))
}

/// Executes one command, writing its output to `out`.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let config = resolve_config(&cli)?;
    debug!("Using {:?}", config);
    let client = ApiClient::new(config)?;

    match cli.cmd {
        Command::List {
            kind,
            bucket,
            folder,
            flat,
            folders,
        } => {
            let folder = FolderInfo::new(kind.into(), bucket, folder);
            let options = if flat {
                ListOptions::flat()
            } else {
                ListOptions::recursive()
            };
            let lines = if folders {
                with_kind!(kind, list_folders(client, folder, options))?
            } else {
                with_kind!(kind, list_entities(client, folder, options))?
            };
            for line in lines {
                writeln!(out, "{line}")?;
            }
        }
        Command::Get { kind, key } => {
            let json = with_kind!(kind, get_entity(client, parse_key(&key)?))?;
            writeln!(out, "{json}")?;
        }
        Command::Delete { kind, key } => {
            let key = parse_key(&key)?;
            with_kind!(kind, delete_entity(client, key.clone()))?;
            writeln!(out, "deleted {key}")?;
        }
        Command::Move { kind, key, to } => {
            let key = parse_key(&key)?;
            let moved = with_kind!(kind, move_entity(client, key.clone(), to))?;
            writeln!(out, "moved {key} -> {}", moved.key)?;
        }
        Command::Upload {
            key,
            path,
            content_type,
        } => {
            let key = parse_key(&key)?;
            let mut session = FileUploader::new(client)
                .start_path(&key, &path, content_type.as_deref())
                .await?;
            while let Some(event) = session.next_event().await {
                match event {
                    ProgressEvent::Progress { percent } => writeln!(out, "progress {percent}%")?,
                    ProgressEvent::Done { success } => {
                        writeln!(out, "done {}", if success { "ok" } else { "failed" })?
                    }
                }
            }
            let meta = session.finish().await.context("Upload failed")?;
            writeln!(out, "uploaded {}", meta.url)?;
        }
        Command::Publish {
            name,
            target_folder,
            kind,
            add,
            add_if_absent,
            delete,
            dry_run,
        } => {
            let kind: EntityKind = kind.into();
            let resources = build_resources(kind, &add, &add_if_absent, &delete)?;
            if dry_run {
                let existing = existing_targets(&client, kind, &resources).await?;
                for diff in diff_publication(&resources, &existing) {
                    writeln!(
                        out,
                        "{:?}\t{}\t{}",
                        diff.action,
                        diff.target.key,
                        describe(&diff.change)
                    )?;
                }
            } else {
                let publication = PublicationApi::new(client)
                    .create_publish_request(&name, &target_folder, &resources, Vec::new())
                    .await?;
                writeln!(out, "created {} ({:?})", publication.url, publication.status)?;
            }
        }
        Command::Approve { url } => {
            PublicationApi::new(client).approve(&url).await?;
            writeln!(out, "approved {url}")?;
        }
        Command::Reject { url, comment } => {
            PublicationApi::new(client)
                .reject(&url, comment.as_deref())
                .await?;
            writeln!(out, "rejected {url}")?;
        }
        Command::Pending { bucket } => {
            for publication in PublicationApi::new(client).list_pending(&bucket).await? {
                writeln!(
                    out,
                    "{}\t{}\t{} resources",
                    publication.url,
                    publication.name.as_deref().unwrap_or("-"),
                    publication.resources.len()
                )?;
            }
        }
    }
    Ok(())
}

async fn list_entities<K: EntityKindSpec>(
    spec: K,
    client: ApiClient,
    folder: FolderInfo,
    options: ListOptions,
) -> Result<Vec<String>> {
    let storage = ApiEntityStorage::new(client, spec);
    storage
        .list(&folder, options)
        .await?
        .iter()
        .map(|info| -> Result<String> {
            let updated = info
                .updated_at
                .and_then(DateTime::from_timestamp_millis)
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_else(|| "-".to_string());
            Ok(format!("{}\t{updated}", info.id()?))
        })
        .collect()
}

async fn list_folders<K: EntityKindSpec>(
    spec: K,
    client: ApiClient,
    folder: FolderInfo,
    options: ListOptions,
) -> Result<Vec<String>> {
    let storage = ApiEntityStorage::new(client, spec);
    Ok(storage
        .list_folders(&folder, options)
        .await?
        .iter()
        .map(|f| format!("{}/", f.id()))
        .collect())
}

async fn get_entity<K: EntityKindSpec>(spec: K, client: ApiClient, key: EntityKey) -> Result<String> {
    let storage = ApiEntityStorage::new(client, spec);
    let entity = storage.get(&EntityInfo::new(K::KIND, key)).await?;
    let document = storage.document_for(&entity)?;
    Ok(serde_json::to_string_pretty(&document)?)
}

async fn delete_entity<K: EntityKindSpec>(spec: K, client: ApiClient, key: EntityKey) -> Result<()> {
    let storage = ApiEntityStorage::new(client, spec);
    storage.delete(&EntityInfo::new(K::KIND, key)).await?;
    Ok(())
}

async fn move_entity<K: EntityKindSpec>(
    spec: K,
    client: ApiClient,
    key: EntityKey,
    to: Vec<String>,
) -> Result<EntityInfo> {
    let storage = ApiEntityStorage::new(client, spec);
    Ok(storage.move_to(&EntityInfo::new(K::KIND, key), &to).await?)
}

fn split_pair(raw: &str) -> Result<(EntityKey, EntityKey)> {
    let Some((source, target)) = raw.split_once('=') else {
        bail!("Expected SOURCE=TARGET, got {raw:?}");
    };
    Ok((parse_key(source)?, parse_key(target)?))
}

fn build_resources(
    kind: EntityKind,
    add: &[String],
    add_if_absent: &[String],
    delete: &[String],
) -> Result<Vec<ResourceDraft>> {
    let reference = |key| ResourceRef::new(kind, key);
    let mut resources = Vec::new();
    for raw in add {
        let (source, target) = split_pair(raw)?;
        resources.push(ResourceDraft::add(reference(source), reference(target)));
    }
    for raw in add_if_absent {
        let (source, target) = split_pair(raw)?;
        resources.push(ResourceDraft::add_if_absent(reference(source), reference(target)));
    }
    for raw in delete {
        resources.push(ResourceDraft::delete(reference(parse_key(raw)?)));
    }
    Ok(resources)
}

/// Lists every bucket the resources target, for diffing.
async fn existing_targets(
    client: &ApiClient,
    kind: EntityKind,
    resources: &[ResourceDraft],
) -> Result<Vec<EntityInfo>> {
    let buckets: BTreeSet<&str> = resources
        .iter()
        .map(|r| r.target.key.bucket.as_str())
        .collect();

    let kind_arg = match kind {
        EntityKind::Conversation => KindArg::Conversation,
        EntityKind::Prompt => KindArg::Prompt,
        EntityKind::Application => KindArg::Application,
        EntityKind::File => bail!("files cannot be published"),
    };

    let mut existing = Vec::new();
    for bucket in buckets {
        let folder = FolderInfo::root(kind, bucket);
        existing.extend(with_kind!(
            kind_arg,
            list_infos(client.clone(), folder, ListOptions::recursive())
        )?);
    }
    Ok(existing)
}

async fn list_infos<K: EntityKindSpec>(
    spec: K,
    client: ApiClient,
    folder: FolderInfo,
    options: ListOptions,
) -> Result<Vec<EntityInfo>> {
    Ok(ApiEntityStorage::new(client, spec).list(&folder, options).await?)
}

fn describe(change: &ResourceChange) -> String {
    match change {
        ResourceChange::Create => "create".to_string(),
        ResourceChange::NewVersion { existing_versions } => {
            let names: Vec<&str> = existing_versions.iter().map(|k| k.name.as_str()).collect();
            format!("new version (existing: {})", names.join(", "))
        }
        ResourceChange::Replace => "replace".to_string(),
        ResourceChange::Skip => "skip (already present)".to_string(),
        ResourceChange::Remove => "remove".to_string(),
        ResourceChange::RemoveMissing => "remove (not present)".to_string(),
    }
}
