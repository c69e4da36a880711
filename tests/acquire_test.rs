// tests/acquire_test.rs

//! Integration tests for source acquisition
//!
//! Exercise mirror fallback, cache reuse, and checksum invalidation
//! against an in-memory transport, and archive extraction against real
//! tarballs built on the fly.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossforge::hash::sha256_bytes;
use crossforge::source::{AcquireError, ComponentRequest, Fetcher, SourceCache};

/// Transport that serves canned bytes per URL and counts fetches
struct FakeFetcher {
    responses: HashMap<String, Vec<u8>>,
    fetches: Arc<AtomicUsize>,
}

impl FakeFetcher {
    fn new(responses: HashMap<String, Vec<u8>>) -> (Self, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        (
            Self {
                responses,
                fetches: fetches.clone(),
            },
            fetches,
        )
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<(), AcquireError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some(bytes) => {
                std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
                std::fs::write(dest, bytes).unwrap();
                Ok(())
            }
            None => Err(AcquireError::Download {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            }),
        }
    }
}

/// Build a gzip tarball with a single `<root>/README` entry
fn make_tarball(root: &str) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let encoder = flate2::write::GzEncoder::new(&mut out, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let payload = b"release tarball\n";
        let mut header = tar::Header::new_gnu();
        header.set_size(payload.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, format!("{root}/README"), payload.as_slice())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }
    out
}

/// A request with two mirrors and no checksum, for a fictional
/// component shipped as tar.gz
fn two_mirror_request() -> ComponentRequest {
    let mut request = ComponentRequest::binutils("9.9");
    request.name = "demo".to_string();
    request.archive = "demo-9.9.tar.gz".to_string();
    request.mirrors = vec![
        "https://primary.example.org/".to_string(),
        "https://secondary.example.org/".to_string(),
    ];
    request.mirror_subdir = None;
    request.checksum = None;
    request
}

#[test]
fn test_fallback_to_last_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let tarball = make_tarball("demo-9.9");

    // Only the second mirror has the artifact.
    let mut responses = HashMap::new();
    responses.insert(
        "https://secondary.example.org/demo-9.9.tar.gz".to_string(),
        tarball,
    );
    let (fetcher, fetches) = FakeFetcher::new(responses);

    let cache = SourceCache::with_fetcher(
        dir.path().join("sources"),
        dir.path().join("cache"),
        Box::new(fetcher),
    );

    let root = cache.acquire(&two_mirror_request()).unwrap();
    assert!(root.ends_with("demo-9.9"));
    assert!(root.join("README").exists());
    assert_eq!(fetches.load(Ordering::SeqCst), 2, "one failed, one successful fetch");
}

#[test]
fn test_second_acquire_hits_cache_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let tarball = make_tarball("demo-9.9");
    let digest = sha256_bytes(&tarball);

    let mut responses = HashMap::new();
    responses.insert(
        "https://primary.example.org/demo-9.9.tar.gz".to_string(),
        tarball,
    );
    let (fetcher, fetches) = FakeFetcher::new(responses);

    let cache = SourceCache::with_fetcher(
        dir.path().join("sources"),
        dir.path().join("cache"),
        Box::new(fetcher),
    );

    let request = two_mirror_request().with_checksum(&digest);
    cache.acquire(&request).unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    // Second run: verified cache hit, zero network I/O.
    cache.acquire(&request).unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}

#[test]
fn test_stale_cached_artifact_is_redownloaded_once() {
    let dir = tempfile::tempdir().unwrap();
    let tarball = make_tarball("demo-9.9");
    let digest = sha256_bytes(&tarball);

    let cache_dir = dir.path().join("cache");
    std::fs::create_dir_all(&cache_dir).unwrap();
    // Seed the cache with corrupt content under the expected name.
    std::fs::write(cache_dir.join("demo-9.9.tar.gz"), b"truncated garbage").unwrap();

    let mut responses = HashMap::new();
    responses.insert(
        "https://primary.example.org/demo-9.9.tar.gz".to_string(),
        tarball,
    );
    let (fetcher, fetches) = FakeFetcher::new(responses);

    let cache = SourceCache::with_fetcher(
        dir.path().join("sources"),
        &cache_dir,
        Box::new(fetcher),
    );

    let request = two_mirror_request().with_checksum(&digest);
    let root = cache.acquire(&request).unwrap();
    assert!(root.join("README").exists());
    assert_eq!(fetches.load(Ordering::SeqCst), 1, "exactly one re-download");
}

#[test]
fn test_all_mirrors_exhausted_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let (fetcher, fetches) = FakeFetcher::new(HashMap::new());

    let cache = SourceCache::with_fetcher(
        dir.path().join("sources"),
        dir.path().join("cache"),
        Box::new(fetcher),
    );

    let err = cache.acquire(&two_mirror_request()).unwrap_err();
    assert!(matches!(err, AcquireError::MirrorsExhausted { .. }));
    assert_eq!(fetches.load(Ordering::SeqCst), 2, "every mirror was tried");
}

#[test]
fn test_naming_variant_tried_before_next_mirror() {
    let dir = tempfile::tempdir().unwrap();
    // The variant archive is served under the name `demo-src-9.9.tar.gz`,
    // so its top-level directory is `demo-src-9.9` (matching the filename
    // convention the cache uses to locate the extracted source root).
    let tarball = make_tarball("demo-src-9.9");

    let mut request = two_mirror_request();
    request.alt_archive = Some("demo-src-9.9.tar.gz".to_string());

    // Primary mirror only has the variant name.
    let mut responses = HashMap::new();
    responses.insert(
        "https://primary.example.org/demo-src-9.9.tar.gz".to_string(),
        tarball,
    );
    let (fetcher, fetches) = FakeFetcher::new(responses);

    let cache = SourceCache::with_fetcher(
        dir.path().join("sources"),
        dir.path().join("cache"),
        Box::new(fetcher),
    );

    let root = cache.acquire(&request).unwrap();
    assert!(root.ends_with("demo-src-9.9"));
    // Primary name failed, variant succeeded; the second mirror was
    // never consulted.
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[test]
fn test_fresh_download_with_bad_checksum_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let tarball = make_tarball("demo-9.9");

    let mut responses = HashMap::new();
    responses.insert(
        "https://primary.example.org/demo-9.9.tar.gz".to_string(),
        tarball,
    );
    let (fetcher, _fetches) = FakeFetcher::new(responses);

    let cache = SourceCache::with_fetcher(
        dir.path().join("sources"),
        dir.path().join("cache"),
        Box::new(fetcher),
    );

    let request = two_mirror_request().with_checksum(&"0".repeat(64));
    let err = cache.acquire(&request).unwrap_err();
    assert!(matches!(err, AcquireError::ChecksumMismatch { .. }));
    // The bad artifact must not be left behind for a later run.
    assert!(!dir.path().join("cache/demo-9.9.tar.gz").exists());
}

#[test]
fn test_existing_source_tree_skips_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let tarball = make_tarball("demo-9.9");

    let source_dir = dir.path().join("sources");
    let marker = source_dir.join("demo-9.9/marker.txt");
    std::fs::create_dir_all(marker.parent().unwrap()).unwrap();
    std::fs::write(&marker, b"pre-existing tree").unwrap();

    let mut responses = HashMap::new();
    responses.insert(
        "https://primary.example.org/demo-9.9.tar.gz".to_string(),
        tarball,
    );
    let (fetcher, _fetches) = FakeFetcher::new(responses);

    let cache = SourceCache::with_fetcher(&source_dir, dir.path().join("cache"), Box::new(fetcher));
    let root = cache.acquire(&two_mirror_request()).unwrap();

    // Directory presence wins: the existing tree is returned untouched.
    assert!(root.join("marker.txt").exists());
    assert!(!root.join("README").exists());
}
