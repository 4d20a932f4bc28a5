//! Knowledge pipeline: folder listing → download → extraction → aggregation.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use docchat_drive::DocumentSource;
use docchat_shared::{DocChatError, ExtractedText, KnowledgeConfig, Result, SourceItem};

use crate::cache::{CacheKey, KnowledgeCache};
use crate::knowledge::{KnowledgeBuffer, aggregate};

/// Options for one pipeline pass.
#[derive(Debug, Clone)]
pub struct KnowledgeOptions {
    /// Sort listed documents by name so the buffer is stable across passes.
    pub sort_by_name: bool,
}

impl Default for KnowledgeOptions {
    fn default() -> Self {
        Self { sort_by_name: true }
    }
}

impl From<&KnowledgeConfig> for KnowledgeOptions {
    fn from(config: &KnowledgeConfig) -> Self {
        Self {
            sort_by_name: config.sort_by_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document is downloaded and extracted.
    fn document_loaded(&self, name: &str, current: usize, total: usize);
    /// Called when a document is replaced by a placeholder.
    fn document_skipped(&self, name: &str, reason: &str);
    /// Called when the buffer has been built.
    fn done(&self, buffer: &KnowledgeBuffer);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_loaded(&self, _name: &str, _current: usize, _total: usize) {}
    fn document_skipped(&self, _name: &str, _reason: &str) {}
    fn done(&self, _buffer: &KnowledgeBuffer) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Body substituted for a document whose content could not be extracted.
pub fn unreadable_placeholder(reason: &str) -> String {
    format!("[This document could not be read: {reason}]")
}

/// List the folder, download every accepted document and extract its text.
///
/// An empty listing is `NoDocumentsFound`. A download failure aborts the
/// pass with `SourceUnavailable`; an extraction failure replaces that one
/// document's body with a placeholder.
#[instrument(skip_all, fields(folder_id = %folder_id))]
pub async fn list_and_download(
    source: &dyn DocumentSource,
    folder_id: &str,
    options: &KnowledgeOptions,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ExtractedText>> {
    progress.phase("Listing documents");
    let mut items: Vec<SourceItem> = source.list(folder_id).await?;

    if items.is_empty() {
        warn!("folder has no accepted documents");
        return Err(DocChatError::NoDocumentsFound {
            folder_id: folder_id.to_string(),
        });
    }

    if options.sort_by_name {
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    }

    progress.phase("Downloading documents");
    let total = items.len();
    let mut texts = Vec::with_capacity(total);

    for (i, item) in items.iter().enumerate() {
        let raw = source.download(item).await?;

        let text = match docchat_extract::extract(item, &raw) {
            Ok(text) => text,
            Err(err) => {
                let reason = err.to_string();
                warn!(document = %item.name, error = %reason, "skipping unreadable document");
                progress.document_skipped(&item.name, &reason);
                ExtractedText::new(item.name.clone(), unreadable_placeholder(&reason))
            }
        };

        progress.document_loaded(&item.name, i + 1, total);
        texts.push(text);
    }

    Ok(texts)
}

/// Run the full pipeline and aggregate the result.
pub async fn build_knowledge(
    source: &dyn DocumentSource,
    folder_id: &str,
    options: &KnowledgeOptions,
    progress: &dyn ProgressReporter,
) -> Result<KnowledgeBuffer> {
    let start = Instant::now();
    let texts = list_and_download(source, folder_id, options, progress).await?;

    progress.phase("Building knowledge base");
    let buffer = aggregate(&texts);

    info!(
        documents = texts.len(),
        bytes = buffer.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "knowledge base built"
    );
    progress.done(&buffer);
    Ok(buffer)
}

// ---------------------------------------------------------------------------
// KnowledgeBase
// ---------------------------------------------------------------------------

/// A document source and folder bound to a shared cache.
///
/// [`KnowledgeBase::current`] is the only way sessions obtain a buffer, so
/// expiry triggers a full rebuild transparently.
#[derive(Clone)]
pub struct KnowledgeBase {
    source: Arc<dyn DocumentSource>,
    folder_id: String,
    cache: Arc<KnowledgeCache>,
    options: KnowledgeOptions,
}

impl KnowledgeBase {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        folder_id: impl Into<String>,
        cache: Arc<KnowledgeCache>,
        options: KnowledgeOptions,
    ) -> Self {
        Self {
            source,
            folder_id: folder_id.into(),
            cache,
            options,
        }
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    /// Cache key for this source and folder.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.source.identity(), self.folder_id.clone())
    }

    /// The cached buffer, rebuilt if missing or expired.
    pub async fn current(&self, progress: &dyn ProgressReporter) -> Result<Arc<KnowledgeBuffer>> {
        let key = self.key();
        self.cache
            .get_or_build(&key, || {
                build_knowledge(self.source.as_ref(), &self.folder_id, &self.options, progress)
            })
            .await
    }

    /// Build a fresh buffer and swap it in.
    ///
    /// The previous entry stays visible until the rebuild succeeds; a failed
    /// rebuild leaves it in place.
    pub async fn refresh(&self, progress: &dyn ProgressReporter) -> Result<Arc<KnowledgeBuffer>> {
        let key = self.key();
        let buffer =
            build_knowledge(self.source.as_ref(), &self.folder_id, &self.options, progress).await?;
        let buffer = Arc::new(buffer);
        self.cache.insert(key, Arc::clone(&buffer)).await;
        Ok(buffer)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use docchat_shared::ContentType;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory document source that counts network-equivalent calls.
    pub(crate) struct FakeSource {
        items: Vec<SourceItem>,
        bodies: HashMap<String, Vec<u8>>,
        fail_download: Option<String>,
        /// Listings allowed to succeed before the source goes down.
        outage_after: Option<usize>,
        pub(crate) list_calls: AtomicUsize,
        pub(crate) download_calls: AtomicUsize,
    }

    impl FakeSource {
        pub(crate) fn new() -> Self {
            Self {
                items: Vec::new(),
                bodies: HashMap::new(),
                fail_download: None,
                outage_after: None,
                list_calls: AtomicUsize::new(0),
                download_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_doc(mut self, name: &str, body: &str) -> Self {
            self.push(name, ContentType::NativeDocument, body.as_bytes().to_vec());
            self
        }

        pub(crate) fn with_raw(mut self, name: &str, content_type: ContentType, raw: &[u8]) -> Self {
            self.push(name, content_type, raw.to_vec());
            self
        }

        pub(crate) fn failing_download(mut self, name: &str) -> Self {
            self.fail_download = Some(name.to_string());
            self
        }

        pub(crate) fn outage_after(mut self, listings: usize) -> Self {
            self.outage_after = Some(listings);
            self
        }

        fn push(&mut self, name: &str, content_type: ContentType, raw: Vec<u8>) {
            let id = format!("id-{}", self.items.len());
            self.bodies.insert(id.clone(), raw);
            self.items.push(SourceItem {
                id,
                name: name.to_string(),
                content_type,
            });
        }
    }

    #[async_trait]
    impl DocumentSource for FakeSource {
        fn identity(&self) -> String {
            "fake@test".into()
        }

        async fn list(&self, _folder_id: &str) -> Result<Vec<SourceItem>> {
            let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.outage_after.is_some_and(|limit| call >= limit) {
                return Err(DocChatError::source_status("listing returned HTTP 503"));
            }
            Ok(self.items.clone())
        }

        async fn download(&self, item: &SourceItem) -> Result<Vec<u8>> {
            self.download_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_download.as_deref() == Some(item.name.as_str()) {
                return Err(DocChatError::source_status("download returned HTTP 500"));
            }
            Ok(self.bodies.get(&item.id).cloned().unwrap_or_default())
        }
    }

    /// Records skipped document names.
    struct RecordingProgress(Mutex<Vec<String>>);

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, _name: &str) {}
        fn document_loaded(&self, _name: &str, _current: usize, _total: usize) {}
        fn document_skipped(&self, name: &str, _reason: &str) {
            self.0.lock().unwrap().push(name.to_string());
        }
        fn done(&self, _buffer: &KnowledgeBuffer) {}
    }

    #[tokio::test]
    async fn empty_folder_is_no_documents_found() {
        let source = FakeSource::new();
        let err = build_knowledge(&source, "empty", &KnowledgeOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocChatError::NoDocumentsFound { ref folder_id } if folder_id == "empty"));
        assert!(err.is_fatal());
        assert_eq!(source.download_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_entry_per_listed_document() {
        let source = FakeSource::new()
            .with_doc("Handbook", "h")
            .with_doc("Policy", "p")
            .with_doc("FAQ", "f");
        let texts = list_and_download(&source, "f", &KnowledgeOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(texts.len(), 3);
    }

    #[tokio::test]
    async fn documents_are_sorted_by_name() {
        let source = FakeSource::new().with_doc("b", "2").with_doc("a", "1");
        let texts = list_and_download(&source, "f", &KnowledgeOptions::default(), &SilentProgress)
            .await
            .unwrap();
        let names: Vec<_> = texts.iter().map(|t| t.source_name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);

        let unsorted = KnowledgeOptions { sort_by_name: false };
        let texts = list_and_download(&source, "f", &unsorted, &SilentProgress)
            .await
            .unwrap();
        let names: Vec<_> = texts.iter().map(|t| t.source_name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[tokio::test]
    async fn unreadable_documents_become_placeholders() {
        let source = FakeSource::new()
            .with_doc("Good", "fine text")
            .with_raw("Broken.pdf", ContentType::PagedDocument, b"not a pdf");
        let progress = RecordingProgress(Mutex::new(Vec::new()));

        let buffer = build_knowledge(&source, "f", &KnowledgeOptions::default(), &progress)
            .await
            .expect("one bad document does not abort the pass");

        assert!(buffer.as_str().contains("fine text"));
        assert!(buffer.as_str().contains("--- Begin Document: Broken.pdf ---"));
        assert!(buffer.as_str().contains("[This document could not be read:"));
        assert_eq!(progress.0.lock().unwrap().as_slice(), ["Broken.pdf".to_string()]);
    }

    #[tokio::test]
    async fn download_failure_aborts_the_pass() {
        let source = FakeSource::new()
            .with_doc("a", "1")
            .with_doc("b", "2")
            .failing_download("b");
        let err = build_knowledge(&source, "f", &KnowledgeOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, DocChatError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn cached_knowledge_skips_network_within_ttl() {
        let source = Arc::new(FakeSource::new().with_doc("A", "x").with_doc("B", "y"));
        let cache = Arc::new(KnowledgeCache::new(Duration::from_secs(600)));
        let kb = KnowledgeBase::new(source.clone(), "folder", cache, KnowledgeOptions::default());

        let first = kb.current(&SilentProgress).await.unwrap();
        let second = kb.current(&SilentProgress).await.unwrap();

        assert_eq!(first.as_str(), second.as_str());
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.download_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expiry_reruns_the_whole_pipeline() {
        let source = Arc::new(FakeSource::new().with_doc("A", "x"));
        let cache = Arc::new(KnowledgeCache::new(Duration::ZERO));
        let kb = KnowledgeBase::new(source.clone(), "folder", cache, KnowledgeOptions::default());

        kb.current(&SilentProgress).await.unwrap();
        kb.current(&SilentProgress).await.unwrap();

        assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
        assert_eq!(source.download_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_bypasses_a_fresh_entry() {
        let source = Arc::new(FakeSource::new().with_doc("A", "x"));
        let cache = Arc::new(KnowledgeCache::new(Duration::from_secs(600)));
        let kb = KnowledgeBase::new(source.clone(), "folder", cache, KnowledgeOptions::default());

        kb.current(&SilentProgress).await.unwrap();
        kb.refresh(&SilentProgress).await.unwrap();
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_the_last_good_buffer() {
        let source = Arc::new(FakeSource::new().with_doc("A", "x").outage_after(1));
        let cache = Arc::new(KnowledgeCache::new(Duration::from_secs(600)));
        let kb = KnowledgeBase::new(source.clone(), "folder", cache.clone(), KnowledgeOptions::default());

        let built = kb.current(&SilentProgress).await.unwrap();
        let err = kb.refresh(&SilentProgress).await.unwrap_err();
        assert!(matches!(err, DocChatError::SourceUnavailable { .. }));

        let cached = cache.get(&kb.key()).await.expect("entry survives a failed refresh");
        assert_eq!(cached.as_str(), built.as_str());
        let current = kb.current(&SilentProgress).await.unwrap();
        assert!(Arc::ptr_eq(&current, &cached));
        assert_eq!(source.list_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn key_combines_identity_and_folder() {
        let kb = KnowledgeBase::new(
            Arc::new(FakeSource::new()),
            "folder-9",
            Arc::new(KnowledgeCache::new(Duration::from_secs(1))),
            KnowledgeOptions::default(),
        );
        assert_eq!(kb.key(), CacheKey::new("fake@test", "folder-9"));
    }
}
