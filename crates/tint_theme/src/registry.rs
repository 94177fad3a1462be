//! Style sink collaborator
//!
//! The engine never touches a document directly; it talks to a [`StyleSink`]
//! that knows how to upsert style text under a key and remove it again.
//! Platform backends implement the trait against a live document;
//! [`MemorySink`] is the ordered in-memory implementation used by tests and
//! server-side rendering.
//!
//! Only the engine writes to the sink: the commit-time injection effect and
//! eviction are the sole call sites.

use crate::error::{Result, StyleError};
use std::sync::Mutex;

/// Where an upserted block lands relative to existing blocks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsertionPolicy {
    /// After existing blocks
    #[default]
    Append,
    /// Before existing blocks
    Prepend,
    /// Before existing blocks, but after earlier prepends
    PrependQueue,
}

/// Options for one upsert
#[derive(Clone, Debug, Default)]
pub struct UpsertOptions {
    /// Owner marker attached to the block for selective removal
    pub mark: String,
    /// Sort priority; lower injects earlier
    pub priority: i32,
    /// Placement relative to existing blocks
    pub insertion: InsertionPolicy,
    /// Optional container the block should live in
    pub container: Option<String>,
}

/// Handle to one injected style block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleHandle {
    /// The key the block was upserted under
    pub key: String,
    /// Owner marker carried over from [`UpsertOptions::mark`]
    pub mark: String,
}

/// Upsert-style-text-under-a-key service
pub trait StyleSink: Send + Sync {
    /// Insert or replace the block stored under `key`
    fn upsert(&self, text: &str, key: &str, options: &UpsertOptions) -> Result<StyleHandle>;

    /// Remove the block a previous upsert returned a handle for
    ///
    /// Removing an already-removed block is a no-op.
    fn remove(&self, handle: &StyleHandle);
}

/// One block held by [`MemorySink`]
#[derive(Clone, Debug)]
pub struct StyleRecord {
    pub key: String,
    pub text: String,
    pub mark: String,
    pub priority: i32,
}

/// Ordered in-memory sink for tests and SSR
///
/// Upserting an existing key replaces the text in place, keeping the
/// block's position stable, which mirrors how a live document behaves.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<StyleRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every live block, in injection order
    pub fn records(&self) -> Vec<StyleRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Style text stored under `key`, if any
    pub fn get(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|record| record.key == key)
            .map(|record| record.text.clone())
    }

    /// Number of live blocks
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether the sink holds no blocks
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StyleSink for MemorySink {
    fn upsert(&self, text: &str, key: &str, options: &UpsertOptions) -> Result<StyleHandle> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|record| record.key == key) {
            record.text = text.to_string();
            record.mark = options.mark.clone();
            record.priority = options.priority;
        } else {
            let record = StyleRecord {
                key: key.to_string(),
                text: text.to_string(),
                mark: options.mark.clone(),
                priority: options.priority,
            };
            match options.insertion {
                InsertionPolicy::Append => records.push(record),
                InsertionPolicy::Prepend => records.insert(0, record),
                InsertionPolicy::PrependQueue => {
                    // Before higher-priority blocks, after earlier prepends
                    // at the same or lower priority, so acquire order holds.
                    let pos = records
                        .iter()
                        .rposition(|existing| existing.priority <= options.priority)
                        .map(|pos| pos + 1)
                        .unwrap_or(0);
                    records.insert(pos, record);
                }
            }
        }
        Ok(StyleHandle {
            key: key.to_string(),
            mark: options.mark.clone(),
        })
    }

    fn remove(&self, handle: &StyleHandle) {
        let mut records = self.records.lock().unwrap();
        records.retain(|record| !(record.key == handle.key && record.mark == handle.mark));
    }
}

/// Sink that rejects every upsert; exercises the best-effort injection path
#[derive(Debug, Default)]
pub struct FailingSink;

impl StyleSink for FailingSink {
    fn upsert(&self, _text: &str, key: &str, _options: &UpsertOptions) -> Result<StyleHandle> {
        Err(StyleError::Injection(format!(
            "document rejected style block {key:?}"
        )))
    }

    fn remove(&self, _handle: &StyleHandle) {}
}
