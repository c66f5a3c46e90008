//! Integration tests for the load-then-resolve flow.
//!
//! These tests exercise the complete pipeline:
//! - directory + archive enumeration with deterministic override order
//! - background loading with progress and completion callbacks
//! - snapshot publication and the resolver fallback chain
//! - untranslated export round-tripping back into a loadable source
//!
//! Run with: `cargo test --test load_and_resolve_integration`

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use translayer::loader::{
    AsyncLoader, LineTabProcessor, LoadResult, ProcessorSet, TableProcessor,
};
use translayer::service::{ServiceConfig, TranslationService};
use translayer::ArchiveOrder;

// ============================================================================
// Helper Functions
// ============================================================================

fn processors() -> ProcessorSet {
    ProcessorSet::new(vec![
        Box::new(LineTabProcessor::new()),
        Box::new(TableProcessor::new()),
    ])
}

fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Run one load pass to completion and hand back the result.
fn load(root: &Path, order: ArchiveOrder) -> LoadResult {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let mut loader = AsyncLoader::new(
        "integration",
        root,
        processors(),
        |_, _, _| {},
        move |result| {
            let _ = tx.lock().unwrap().send(result);
        },
    )
    .with_archive_order(order);
    loader.start();
    let result = rx
        .recv_timeout(Duration::from_secs(30))
        .expect("load completes");
    loader.wait();
    result
}

// ============================================================================
// Override Determinism
// ============================================================================

/// The processing order is root files, then subdirectories ordinally, so
/// the same key defined in several sources always resolves to the value
/// from the source processed last, regardless of creation order on disk.
#[test]
fn test_override_order_across_directories() {
    let dir = TempDir::new().unwrap();
    // Created deliberately out of ordinal order.
    fs::create_dir(dir.path().join("20_patch")).unwrap();
    fs::write(dir.path().join("20_patch/any.txt"), "key\tfrom patch\n").unwrap();
    fs::write(dir.path().join("00_base.txt"), "key\tfrom base\n").unwrap();
    fs::create_dir(dir.path().join("10_pack")).unwrap();
    fs::write(dir.path().join("10_pack/any.txt"), "key\tfrom pack\n").unwrap();

    let result = load(dir.path(), ArchiveOrder::Physical);
    // Root first, then 10_pack, then 20_patch: the patch wins.
    assert_eq!(result.entries["key"], "from patch");
    assert_eq!(result.total_files, 3);
}

/// An archive is one unit in the outer order, so a later loose file
/// overrides keys from an earlier archive, and vice versa.
#[test]
fn test_override_order_mixes_archives_and_files() {
    let dir = TempDir::new().unwrap();
    write_zip(
        &dir.path().join("a_pack.zip"),
        &[("inner.txt", "key\tfrom archive\n")],
    );
    fs::write(dir.path().join("z_fix.txt"), "key\tfrom fix\n").unwrap();

    let result = load(dir.path(), ArchiveOrder::Physical);
    assert_eq!(result.entries["key"], "from fix");
}

/// Within one archive the two member orders give different winners for
/// duplicate keys; both are deterministic.
#[test]
fn test_archive_member_order_is_selectable() {
    let dir = TempDir::new().unwrap();
    write_zip(
        &dir.path().join("pack.zip"),
        // Physical order: z then a. Sorted order: a then z.
        &[("z.txt", "key\tfrom z\n"), ("a.txt", "key\tfrom a\n")],
    );

    let physical = load(dir.path(), ArchiveOrder::Physical);
    assert_eq!(physical.entries["key"], "from a");

    let sorted = load(dir.path(), ArchiveOrder::SortedByName);
    assert_eq!(sorted.entries["key"], "from z");
}

// ============================================================================
// Safety
// ============================================================================

/// Hostile member paths never contribute entries and never abort the
/// pass.
#[test]
fn test_unsafe_archive_members_are_inert() {
    let dir = TempDir::new().unwrap();
    write_zip(
        &dir.path().join("evil.zip"),
        &[
            ("../../etc/passwd.txt", "evil\tpayload\n"),
            ("/etc/shadow.txt", "evil2\tpayload\n"),
            ("legit.txt", "good\tvalue\n"),
        ],
    );

    for order in [ArchiveOrder::Physical, ArchiveOrder::SortedByName] {
        let result = load(dir.path(), order);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries["good"], "value");
        assert!(!result.entries.contains_key("evil"));
        assert!(!result.entries.contains_key("evil2"));
    }
}

// ============================================================================
// Progress Reporting
// ============================================================================

#[test]
fn test_progress_fractions_are_monotonic_and_complete() {
    let dir = TempDir::new().unwrap();
    for i in 0..5 {
        fs::write(dir.path().join(format!("{i}.txt")), "k\tv\n").unwrap();
    }

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let calls = std::sync::Arc::new(Mutex::new(Vec::new()));
    let calls_sink = std::sync::Arc::clone(&calls);
    let mut loader = AsyncLoader::new(
        "progress",
        dir.path(),
        processors(),
        move |fraction, done, total| {
            calls_sink.lock().unwrap().push((fraction, done, total));
        },
        move |result| {
            let _ = tx.lock().unwrap().send(result);
        },
    );
    loader.start();
    rx.recv_timeout(Duration::from_secs(30)).unwrap();

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 5);
    for window in calls.windows(2) {
        assert!(window[0].0 <= window[1].0);
    }
    assert_eq!(calls.last().unwrap(), &(1.0, 5, 5));
}

// ============================================================================
// End-to-end Resolution
// ============================================================================

#[test]
fn test_service_resolves_through_fallback_chain() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("text.txt"),
        "exact key\t精確\n\
         STRIPPED\t正規化\n\
         $^Hi (?<name>\\w+)$\tHello ${name}\n\
         Bob\tRoberto\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("terms.csv"),
        "Term,Original,Translation\nButton/OK,OK,確定\n",
    )
    .unwrap();

    let mut service = TranslationService::new(
        ServiceConfig::new("e2e", dir.path()).with_marking(false),
        processors(),
    );
    service.start_load();
    service.wait();
    let resolver = service.resolver();

    // Exact.
    assert_eq!(resolver.resolve("exact key").as_deref(), Some("精確"));
    // Namespace-stripped: the csv term minus its prefix.
    assert_eq!(resolver.resolve("Extra/Button/OK").as_deref(), Some("確定"));
    // Normalized: whitespace and case folded away.
    assert_eq!(resolver.resolve(" stripped \n").as_deref(), Some("正規化"));
    // Regex template with recursive sub-resolution.
    assert_eq!(resolver.resolve("Hi Bob").as_deref(), Some("Hello Roberto"));
    assert_eq!(resolver.resolve("Hi Alice").as_deref(), Some("Hello Alice"));
    // Miss leaves the original alone.
    assert_eq!(resolver.resolve("nothing matches this"), None);
}

#[test]
fn test_reload_swaps_snapshot_for_live_resolver() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "key\tfirst\n").unwrap();

    let mut service = TranslationService::new(
        ServiceConfig::new("reload", dir.path()).with_marking(false),
        processors(),
    );
    service.start_load();
    service.wait();
    assert_eq!(service.resolver().resolve("key").as_deref(), Some("first"));

    fs::write(dir.path().join("a.txt"), "key\tsecond\n").unwrap();
    service.start_load();
    service.wait();
    assert_eq!(service.resolver().resolve("key").as_deref(), Some("second"));
}

// ============================================================================
// Untranslated Export
// ============================================================================

/// Misses are dumped once each, and the dump file, translation column
/// filled in, loads back as a normal source.
#[test]
fn test_export_dump_round_trips_as_source() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    fs::create_dir(&root).unwrap();
    let dump = dir.path().join("untranslated.csv");

    {
        let mut service = TranslationService::new(
            ServiceConfig::new("dump", &root).with_export(&dump, 100),
            processors(),
        );
        service.start_load();
        service.wait();

        let resolver = service.resolver();
        assert_eq!(resolver.resolve_with_sample("UI/New", Some("New")), None);
        assert_eq!(resolver.resolve_with_sample("UI/New", Some("New")), None);
        service.flush_export();
    }

    let exported = fs::read_to_string(&dump).unwrap();
    assert_eq!(exported.matches("UI/New").count(), 1, "deduplicated");

    // A translator fills in the blank column; the dump becomes a source.
    let filled = exported.replace("UI/New,New,", "UI/New,New,新しい");
    fs::write(root.join("filled.csv"), filled).unwrap();

    let result = load(&root, ArchiveOrder::Physical);
    assert_eq!(result.entries["UI/New"], "新しい");
}
