//! File-backed persistent store
//!
//! Three JSON documents under one data directory:
//! - `pending.json` - work queue (operators may hand-edit it, comments allowed)
//! - `finalized.json` - bounded history, newest first
//! - `scan_state.json` - last fully scanned source block
//!
//! Missing or empty documents load as their zero value. Writes go to a
//! temporary sibling, are synced, then renamed over the target.

use eyre::{Result, WrapErr};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::types::{FinalizedItem, PendingItem, ScanState};

pub const PENDING_FILE: &str = "pending.json";
pub const FINALIZED_FILE: &str = "finalized.json";
pub const SCAN_STATE_FILE: &str = "scan_state.json";

pub const DEFAULT_FINALIZED_RETENTION: usize = 50;

/// Owner of the relayer's on-disk state
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
    retention: usize,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            dir: dir.into(),
            retention,
        }
    }

    /// Create the data directory if needed
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .wrap_err_with(|| format!("Failed to create data dir {}", self.dir.display()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub async fn load_pending(&self) -> Result<Vec<PendingItem>> {
        let path = self.dir.join(PENDING_FILE);
        let Some(raw) = read_document(&path).await? else {
            return Ok(Vec::new());
        };
        let cleaned = strip_comments(&raw);
        if cleaned.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&cleaned)
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))
    }

    pub async fn save_pending(&self, items: &[PendingItem]) -> Result<()> {
        self.write_document(PENDING_FILE, items).await
    }

    pub async fn load_finalized(&self) -> Result<Vec<FinalizedItem>> {
        self.load_or_default(FINALIZED_FILE).await
    }

    /// Persist history, keeping only the newest `retention` entries
    pub async fn save_finalized(&self, items: &[FinalizedItem]) -> Result<()> {
        let bounded = &items[..items.len().min(self.retention)];
        self.write_document(FINALIZED_FILE, bounded).await
    }

    pub async fn load_scan_state(&self) -> Result<ScanState> {
        self.load_or_default(SCAN_STATE_FILE).await
    }

    pub async fn save_scan_state(&self, state: ScanState) -> Result<()> {
        self.write_document(SCAN_STATE_FILE, &state).await
    }

    async fn load_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        match read_document(&path).await? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .wrap_err_with(|| format!("Failed to parse {}", path.display())),
            _ => Ok(T::default()),
        }
    }

    async fn write_document<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let body = serde_json::to_vec_pretty(value)
            .wrap_err_with(|| format!("Failed to serialize {}", name))?;

        let tmp = self.dir.join(format!(".{}.tmp", name));
        let mut file = fs::File::create(&tmp)
            .await
            .wrap_err_with(|| format!("Failed to create {}", tmp.display()))?;
        file.write_all(&body).await?;
        file.write_all(b"\n").await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&tmp, &path)
            .await
            .wrap_err_with(|| format!("Failed to replace {}", path.display()))?;
        debug!(file = %path.display(), bytes = body.len(), "Document written");
        Ok(())
    }
}

/// Add `item` to the in-memory queue unless its hash is already pending or
/// already finalized. Returns whether it was added.
pub fn enqueue(
    pending: &mut Vec<PendingItem>,
    finalized: &[FinalizedItem],
    item: PendingItem,
) -> bool {
    let hash = item.hash.to_lowercase();
    if pending.iter().any(|p| p.hash.to_lowercase() == hash) {
        return false;
    }
    if finalized
        .iter()
        .any(|f| f.source_hash.to_lowercase() == hash)
    {
        return false;
    }
    pending.push(item);
    true
}

async fn read_document(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).wrap_err_with(|| format!("Failed to read {}", path.display())),
    }
}

/// Remove `//` line comments and `/* */` block comments outside of string
/// literals.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek().copied()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                // keep the newline so line numbers in parse errors still line up
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}
