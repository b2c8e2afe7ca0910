// tests/cache_tests.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use polyblocks::cache::{fingerprint, ContentCache};
use polyblocks::handlers::{BlockHandler, HandlerError};
use polyblocks::model::Content;
use polyblocks::registry::{build_default_registry, BlockRegistry};
use polyblocks::syntax::parse_header;
use polyblocks::Parser;

static HANDLER_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct CountingHandler {
    lines: Vec<String>,
}

impl BlockHandler for CountingHandler {
    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn end(&mut self) -> Result<Content, HandlerError> {
        HANDLER_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(Content::with_text("counted", self.lines.join("\n")))
    }
}

fn counting_registry() -> BlockRegistry {
    let mut registry = BlockRegistry::new();
    registry.register("counted", "Counts handler invocations", || {
        Box::<CountingHandler>::default()
    });
    registry
}

#[test]
fn identical_blocks_invoke_the_handler_once() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let registry = counting_registry();
    let source = "@counted\n\tsame body\n";

    HANDLER_CALLS.store(0, Ordering::SeqCst);
    let first = Parser::new(&registry)
        .with_cache(&cache)
        .parse_text(source, None)
        .unwrap();
    let second = Parser::new(&registry)
        .with_cache(&cache)
        .parse_text(source, None)
        .unwrap();

    assert_eq!(HANDLER_CALLS.load(Ordering::SeqCst), 1);
    assert!(!first.blocks[0].from_cache);
    assert!(second.blocks[0].from_cache);
    assert_eq!(first.blocks[0].content, second.blocks[0].content);
}

#[test]
fn different_bodies_are_distinct_entries() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let registry = counting_registry();

    HANDLER_CALLS.store(0, Ordering::SeqCst);
    Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@counted\n\tone\n", None)
        .unwrap();
    Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@counted\n\ttwo\n", None)
        .unwrap();
    assert_eq!(HANDLER_CALLS.load(Ordering::SeqCst), 2);
}

#[test]
fn different_declaration_data_are_distinct_entries() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let registry = counting_registry();

    HANDLER_CALLS.store(0, Ordering::SeqCst);
    Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@counted one\n\tsame body\n", None)
        .unwrap();
    Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@counted two\n\tsame body\n", None)
        .unwrap();
    assert_eq!(HANDLER_CALLS.load(Ordering::SeqCst), 2);
}

#[test]
fn same_body_embed_blocks_keep_their_own_language() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let registry = build_default_registry();

    let py = Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@embed py\n\tx = 1\n", None)
        .unwrap();
    let js = Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@embed js\n\tx = 1\n", None)
        .unwrap();

    let py_content = py.blocks[0].content.as_ref().unwrap();
    assert_eq!(py_content.attribute("language"), Some("py"));
    let js_content = js.blocks[0].content.as_ref().unwrap();
    assert!(!js.blocks[0].from_cache);
    assert_eq!(js_content.attribute("language"), Some("js"));
}

#[test]
fn empty_bodies_are_never_cached() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let registry = counting_registry();

    HANDLER_CALLS.store(0, Ordering::SeqCst);
    Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@counted\n", None)
        .unwrap();
    Parser::new(&registry)
        .with_cache(&cache)
        .parse_text("@counted\n", None)
        .unwrap();
    assert_eq!(HANDLER_CALLS.load(Ordering::SeqCst), 2);
}

#[test]
fn snapshot_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let content = Content::with_text("code", "let x = 1;").attr("language", "js");
    let header = parse_header("@embed js").unwrap();
    let fp = fingerprint("embed", &header, "let x = 1;");

    assert!(!cache.has(&fp));
    cache.set(&fp, &content).unwrap();
    assert!(cache.has(&fp));
    assert_eq!(cache.get(&fp), Some(content));
}

#[test]
fn corrupted_entry_is_a_miss() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let fp = fingerprint("embed", &parse_header("@embed py").unwrap(), "body");
    std::fs::write(dir.path().join(format!("{fp}.cache")), "not json at all").unwrap();

    assert!(cache.has(&fp));
    assert_eq!(cache.get(&fp), None);
}

#[test]
fn wipe_removes_all_entries() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let header = parse_header("@text").unwrap();
    cache
        .set(&fingerprint("text", &header, "1"), &Content::node("a"))
        .unwrap();
    cache
        .set(&fingerprint("text", &header, "2"), &Content::node("b"))
        .unwrap();

    assert_eq!(cache.wipe().unwrap(), 2);
    assert!(!cache.has(&fingerprint("text", &header, "1")));
}

#[test]
fn clean_evicts_only_expired_entries() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap().with_ttl(Duration::from_nanos(1));
    let header = parse_header("@text").unwrap();
    cache
        .set(&fingerprint("text", &header, "old"), &Content::node("old"))
        .unwrap();
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(cache.clean().unwrap(), 1);

    // A generous TTL keeps fresh entries.
    let cache = ContentCache::new(dir.path()).unwrap();
    cache
        .set(&fingerprint("text", &header, "new"), &Content::node("new"))
        .unwrap();
    assert_eq!(cache.clean().unwrap(), 0);
}

#[test]
fn non_cache_files_are_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ContentCache::new(dir.path()).unwrap();
    let other = dir.path().join("README");
    std::fs::write(&other, "keep me").unwrap();

    cache.wipe().unwrap();
    assert!(other.exists());
}
