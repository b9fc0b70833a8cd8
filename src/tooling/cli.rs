//! CLI Tooling
//!
//! Command-line interface for repository operations. Thin orchestration:
//! every command maps onto one folder/file manager operation or the CID
//! codec, with text and json output contracts.

use crate::cid;
use crate::config::PinboxConfig;
use crate::hierarchy::Repository;
use crate::record::{
    DownloadPolicy, FileDraft, FolderDraft, MetadataVisibility,
};
use crate::store::{DocumentStore, MemoryDocumentStore, SledDocumentStore};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Pinbox CLI - content-addressed file repository
#[derive(Parser)]
#[command(name = "pinbox")]
#[command(about = "Content-addressed file repository with a mutable folder namespace")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store directory (overrides configuration)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a folder or update an existing one
    Folder {
        /// Existing folder id to update (omit to create)
        #[arg(long)]
        id: Option<u64>,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Parent folder id (omit for the root)
        #[arg(long)]
        parent: Option<u64>,
        /// Metadata visibility (public, unlisted, private)
        #[arg(long, default_value = "public")]
        visibility: String,
        /// Download policy (allow, deny)
        #[arg(long, default_value = "allow")]
        download: String,
    },
    /// Delete a folder and everything beneath it
    RmFolder {
        id: u64,
    },
    /// Register a file or update its metadata
    File {
        /// Content identifier, in either encoding
        cid: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Parent folder id (omit for the root)
        #[arg(long)]
        parent: Option<u64>,
        #[arg(long)]
        description: Option<String>,
        /// MIME type override
        #[arg(long)]
        mime: Option<String>,
        /// Tag (repeatable)
        #[arg(long)]
        tag: Vec<String>,
        /// Metadata visibility (public, unlisted, private)
        #[arg(long, default_value = "public")]
        visibility: String,
        /// Download policy (allow, deny)
        #[arg(long, default_value = "allow")]
        download: String,
    },
    /// Remove a file record
    RmFile {
        cid: String,
    },
    /// List folder contents (the root when no id is given)
    Ls {
        id: Option<u64>,
        /// Visibility ceiling (public, unlisted, private)
        #[arg(long, default_value = "private")]
        visibility: String,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the ancestor path of a folder or file
    Path {
        /// Folder id
        #[arg(long, conflicts_with = "file")]
        folder: Option<u64>,
        /// File content identifier
        #[arg(long)]
        file: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show repository statistics
    Stat {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print both encodings of a content identifier
    Cid {
        input: String,
    },
}

/// Execution context: the repository over an opened store.
pub struct CliContext {
    repo: Repository,
}

impl CliContext {
    /// Open the configured store and build the managers over it.
    pub fn new(store_override: Option<PathBuf>, config: &PinboxConfig) -> Result<Self> {
        let path = match store_override {
            Some(path) => path,
            None => config
                .store
                .resolve_path()
                .context("resolving store path")?,
        };
        let store = SledDocumentStore::open(&path)
            .with_context(|| format!("opening store at {}", path.display()))?;
        Ok(Self::over(Arc::new(store)))
    }

    /// Context over an ephemeral in-memory store.
    pub fn in_memory() -> Self {
        Self::over(Arc::new(MemoryDocumentStore::new()))
    }

    fn over(store: Arc<dyn DocumentStore>) -> Self {
        CliContext {
            repo: Repository::new(store),
        }
    }

    /// Execute one command and render its output.
    pub fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Folder {
                id,
                name,
                parent,
                visibility,
                download,
            } => {
                let draft = FolderDraft {
                    id: *id,
                    name: name.clone(),
                    parent_id: *parent,
                    metadata_visibility: parse_visibility(visibility)?,
                    download_policy: parse_download(download)?,
                };
                let id = self.repo.folders.configure_folder(&draft)?;
                Ok(format!("folder {}", id))
            }
            Commands::RmFolder { id } => {
                self.repo.folders.delete_folder(*id)?;
                Ok(format!("deleted folder {}", id))
            }
            Commands::File {
                cid,
                name,
                parent,
                description,
                mime,
                tag,
                visibility,
                download,
            } => {
                let draft = FileDraft {
                    cid: cid.clone(),
                    name: name.clone(),
                    parent_id: *parent,
                    description: description.clone(),
                    mime_type_override: mime.clone(),
                    tags: if tag.is_empty() {
                        None
                    } else {
                        Some(tag.iter().cloned().collect())
                    },
                    metadata_visibility: parse_visibility(visibility)?,
                    download_policy: parse_download(download)?,
                };
                let pair = self.repo.files.configure_file(&draft)?;
                Ok(format!("file {}", pair.modern))
            }
            Commands::RmFile { cid } => {
                self.repo.files.delete_file(cid)?;
                Ok(format!("deleted file {}", cid))
            }
            Commands::Ls {
                id,
                visibility,
                format,
            } => self.list(*id, visibility, format),
            Commands::Path {
                folder,
                file,
                format,
            } => self.path(*folder, file.as_deref(), format),
            Commands::Stat { format } => {
                let folders = self.repo.folders.get_folder_count()?;
                let files = self.repo.files.get_file_count()?;
                if format == "json" {
                    Ok(json!({ "folders": folders, "files": files }).to_string())
                } else {
                    Ok(format!("folders: {}\nfiles: {}", folders, files))
                }
            }
            Commands::Cid { input } => {
                let pair = cid::parse(input)?;
                Ok(format!("legacy: {}\nmodern: {}", pair.legacy, pair.modern))
            }
        }
    }

    fn list(&self, id: Option<u64>, visibility: &str, format: &str) -> Result<String> {
        let ceiling = parse_visibility(visibility)?;
        let contents = match id {
            None => self.repo.folders.get_root_folder(ceiling)?,
            Some(id) => match self.repo.folders.try_get_folder_contents(id, ceiling)? {
                Some(contents) => contents,
                None => bail!("folder {} not found", id),
            },
        };
        let entries = crate::tree::entries(&contents);
        if format == "json" {
            return Ok(serde_json::to_string_pretty(&entries)?);
        }
        let mut table = Table::new();
        table.set_header(vec!["kind", "key", "name", "visibility"]);
        for entry in &entries {
            table.add_row(vec![
                if entry.is_folder() { "folder" } else { "file" }.to_string(),
                entry.key(),
                entry.name().to_string(),
                format!("{:?}", entry.visibility()).to_lowercase(),
            ]);
        }
        Ok(table.to_string())
    }

    fn path(&self, folder: Option<u64>, file: Option<&str>, format: &str) -> Result<String> {
        let chain = match (folder, file) {
            (_, Some(cid)) => self
                .repo
                .files
                .get_folder_path(cid, MetadataVisibility::Private)?,
            (id, None) => self
                .repo
                .folders
                .get_folder_path(id, MetadataVisibility::Private)?,
        };
        let Some(chain) = chain else {
            bail!("path target not found");
        };
        if format == "json" {
            let segments: Vec<_> = chain
                .iter()
                .map(|r| json!({ "id": r.id, "name": r.name }))
                .collect();
            return Ok(serde_json::to_string_pretty(&segments)?);
        }
        if chain.is_empty() {
            return Ok("/".to_string());
        }
        let names: Vec<&str> = chain.iter().map(|r| r.name.as_str()).collect();
        Ok(format!("/{}", names.join("/")))
    }
}

fn parse_visibility(value: &str) -> Result<MetadataVisibility> {
    match value {
        "public" => Ok(MetadataVisibility::Public),
        "unlisted" => Ok(MetadataVisibility::Unlisted),
        "private" => Ok(MetadataVisibility::Private),
        other => bail!(
            "invalid visibility: {} (must be 'public', 'unlisted', or 'private')",
            other
        ),
    }
}

fn parse_download(value: &str) -> Result<DownloadPolicy> {
    match value {
        "allow" => Ok(DownloadPolicy::Allow),
        "deny" => Ok(DownloadPolicy::Deny),
        other => bail!("invalid download policy: {} (must be 'allow' or 'deny')", other),
    }
}
