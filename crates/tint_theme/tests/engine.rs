use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tint_theme::{
    CssVarConfig, DefaultTheme, FailingSink, MemorySink, Result, StyleEngine, StyleHandle,
    StyleSink, TokenBinding, TokenMap, TokenRequest, TokenValue, UpsertOptions,
};

fn seed(color: &str) -> TokenMap {
    let mut map = TokenMap::new();
    map.insert("colorPrimary".into(), TokenValue::from(color));
    map.insert("sizeUnit".into(), TokenValue::from(4));
    map
}

fn css_var_request(color: &str, scope: &str) -> TokenRequest {
    TokenRequest {
        fragments: vec![seed(color)],
        salt: "app".into(),
        css_var: Some(CssVarConfig::new("tint", scope)),
        ..TokenRequest::default()
    }
}

/// Counts upserts so injection-exactly-once is observable even though
/// `MemorySink` upserts in place.
#[derive(Default)]
struct CountingSink {
    inner: MemorySink,
    upserts: AtomicUsize,
}

impl StyleSink for CountingSink {
    fn upsert(&self, text: &str, key: &str, options: &UpsertOptions) -> Result<StyleHandle> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert(text, key, options)
    }

    fn remove(&self, handle: &StyleHandle) {
        self.inner.remove(handle);
    }
}

#[test]
fn two_consumers_share_one_derivation_and_one_injection() {
    let sink = Arc::new(CountingSink::default());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let mut first = TokenBinding::new(Arc::clone(&engine));
    let mut second = TokenBinding::new(Arc::clone(&engine));

    let request = css_var_request("#1677ff", "scope");
    let a = first.update(&theme, &request).unwrap();
    let b = second.update(&theme, &request).unwrap();
    engine.commit();

    assert!(Arc::ptr_eq(&a, &b), "both consumers see the same token object");
    assert_eq!(a.hash_id, b.hash_id);
    assert_eq!(sink.upserts.load(Ordering::SeqCst), 1, "one injection for both");
    assert_eq!(engine.cached_entries(), 1);

    drop(first);
    drop(second);
    engine.commit();

    assert_eq!(engine.cached_entries(), 0, "entry evicted after both unmounted");
    assert!(sink.inner.is_empty(), "injected style removed exactly once");
}

#[test]
fn override_change_swaps_keys_and_cleans_the_old_entry() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let mut binding = TokenBinding::new(Arc::clone(&engine));

    let plain = TokenRequest {
        fragments: vec![seed("#1677ff")],
        salt: "app".into(),
        ..TokenRequest::default()
    };
    let before = binding.update(&theme, &plain).unwrap();
    engine.commit();
    assert_eq!(engine.cached_entries(), 1);

    let mut overridden = plain.clone();
    overridden
        .overrides
        .insert("colorPrimary".into(), TokenValue::from("#000"));
    let after = binding.update(&theme, &overridden).unwrap();
    engine.commit();

    assert_ne!(before.hash_id, after.hash_id, "distinct hash ids across renders");
    assert_eq!(after.payload["colorPrimary"], TokenValue::from("#000"));
    assert_eq!(
        engine.cached_entries(),
        1,
        "old entry cleaned once its refcount reached zero"
    );
}

#[test]
fn remount_before_commit_reuses_the_cached_value() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();
    let request = css_var_request("#1677ff", "scope");

    let mut first = TokenBinding::new(Arc::clone(&engine));
    let original = first.update(&theme, &request).unwrap();
    engine.commit();
    assert_eq!(sink.len(), 1);

    // Unmount, then remount before the next commit's sweep.
    drop(first);
    assert_eq!(engine.pending_sweeps(), 1);

    let mut second = TokenBinding::new(Arc::clone(&engine));
    let reacquired = second.update(&theme, &request).unwrap();
    engine.commit();

    assert!(
        Arc::ptr_eq(&original, &reacquired),
        "cached value reused, not recomputed"
    );
    assert_eq!(engine.pending_sweeps(), 0, "pending sweep cancelled");
    assert_eq!(sink.len(), 1, "injected style survived the remount");
}

#[test]
fn repeated_updates_with_same_inputs_do_not_double_count() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();
    let request = css_var_request("#1677ff", "scope");

    let mut binding = TokenBinding::new(Arc::clone(&engine));
    for _ in 0..3 {
        binding.update(&theme, &request).unwrap();
        engine.commit();
    }

    drop(binding);
    engine.commit();
    assert_eq!(engine.cached_entries(), 0, "one release balances every update");
    assert!(sink.is_empty());
}

#[test]
fn commit_is_idempotent_per_key() {
    let sink = Arc::new(CountingSink::default());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let mut binding = TokenBinding::new(Arc::clone(&engine));
    binding
        .update(&theme, &css_var_request("#1677ff", "scope"))
        .unwrap();

    engine.commit();
    engine.commit();
    engine.commit();
    assert_eq!(sink.upserts.load(Ordering::SeqCst), 1);
}

#[test]
fn effects_run_in_acquire_order() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let mut first = TokenBinding::new(Arc::clone(&engine));
    let mut second = TokenBinding::new(Arc::clone(&engine));
    first
        .update(&theme, &css_var_request("#1677ff", "scope-a"))
        .unwrap();
    second
        .update(&theme, &css_var_request("#000", "scope-b"))
        .unwrap();
    engine.commit();

    let keys: Vec<_> = sink.records().iter().map(|r| r.key.clone()).collect();
    assert_eq!(keys, vec!["scope-a", "scope-b"]);
}

#[test]
fn extraction_matches_injected_text_byte_for_byte() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let mut binding = TokenBinding::new(Arc::clone(&engine));
    binding
        .update(&theme, &css_var_request("#1677ff", "scope"))
        .unwrap();
    engine.commit();

    let injected = sink.get("scope").unwrap();
    assert_eq!(engine.extract(true), injected);

    let wrapped = engine.extract(false);
    assert!(wrapped.starts_with("<style data-tint-key=\"scope\""));
    assert!(wrapped.contains(&injected));
}

#[test]
fn extraction_is_empty_without_style_payloads() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let mut binding = TokenBinding::new(Arc::clone(&engine));
    binding
        .update(
            &theme,
            &TokenRequest {
                fragments: vec![seed("#1677ff")],
                salt: "app".into(),
                ..TokenRequest::default()
            },
        )
        .unwrap();
    engine.commit();

    assert_eq!(engine.extract(true), "");
}

#[test]
fn injection_failure_does_not_fail_the_render() {
    let engine = Arc::new(StyleEngine::new(Arc::new(FailingSink)));
    let theme = DefaultTheme::new();

    let mut binding = TokenBinding::new(Arc::clone(&engine));
    let tokens = binding
        .update(&theme, &css_var_request("#1677ff", "scope"))
        .unwrap();
    engine.commit();

    // The computed numbers stay valid even though no style landed.
    assert_eq!(tokens.plain["colorPrimary"], TokenValue::from("#1677ff"));
    assert_eq!(engine.cached_entries(), 1);
}

#[test]
fn derivation_failure_leaves_no_partial_state() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    // DefaultTheme rejects a numeric colorPrimary.
    let mut bad = TokenMap::new();
    bad.insert("colorPrimary".into(), TokenValue::from(7));

    let mut binding = TokenBinding::new(Arc::clone(&engine));
    let result = binding.update(&theme, &TokenRequest::new(vec![bad]));
    engine.commit();

    assert!(result.is_err());
    assert!(!binding.is_mounted(), "failed update holds nothing");
    assert_eq!(engine.cached_entries(), 0);
    assert!(sink.is_empty());
}

#[test]
fn entries_sharing_a_theme_key_share_one_style_block() {
    let sink = Arc::new(CountingSink::default());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    // Different token content, same CSS-variable scope key.
    let mut first = TokenBinding::new(Arc::clone(&engine));
    let mut second = TokenBinding::new(Arc::clone(&engine));
    first
        .update(&theme, &css_var_request("#1677ff", "shared-scope"))
        .unwrap();
    second
        .update(&theme, &css_var_request("#000", "shared-scope"))
        .unwrap();
    engine.commit();

    assert_eq!(engine.cached_entries(), 2);
    assert_eq!(sink.upserts.load(Ordering::SeqCst), 1, "one block per theme key");

    drop(first);
    engine.commit();
    assert_eq!(
        sink.inner.len(),
        1,
        "block survives while another entry shares the theme key"
    );

    drop(second);
    engine.commit();
    assert!(sink.inner.is_empty(), "last eviction removes the block");
}

#[test]
fn css_var_config_participates_in_the_cache_key() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    // Same tokens, same scope key, different variable prefix.
    let mut request = css_var_request("#1677ff", "scope");
    request.css_var = Some(CssVarConfig::new("alpha", "scope"));
    let mut first = TokenBinding::new(Arc::clone(&engine));
    let a = first.update(&theme, &request).unwrap();

    request.css_var = Some(CssVarConfig::new("beta", "scope"));
    let mut second = TokenBinding::new(Arc::clone(&engine));
    let b = second.update(&theme, &request).unwrap();

    assert_eq!(
        a.payload["colorPrimary"],
        TokenValue::from("var(--alpha-color-primary)")
    );
    assert_eq!(
        b.payload["colorPrimary"],
        TokenValue::from("var(--beta-color-primary)"),
        "a prefix change must not reuse the other prefix's entry"
    );
    assert_eq!(engine.cached_entries(), 2);

    // Marker sets participate too.
    let mut unitless = CssVarConfig::new("beta", "scope");
    unitless.unitless.insert("sizeUnit".into());
    request.css_var = Some(unitless);
    let mut third = TokenBinding::new(Arc::clone(&engine));
    third.update(&theme, &request).unwrap();
    assert_eq!(engine.cached_entries(), 3);
}

#[test]
fn format_pass_participates_in_the_cache_key() {
    fn drop_sizes(mut map: TokenMap) -> TokenMap {
        map.retain(|key, _| !key.starts_with("size"));
        map
    }

    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let plain = TokenRequest {
        fragments: vec![seed("#1677ff")],
        salt: "app".into(),
        ..TokenRequest::default()
    };
    let mut formatted = plain.clone();
    formatted.format = Some(drop_sizes);

    let mut first = TokenBinding::new(Arc::clone(&engine));
    let mut second = TokenBinding::new(Arc::clone(&engine));
    let a = first.update(&theme, &plain).unwrap();
    let b = second.update(&theme, &formatted).unwrap();

    assert_eq!(engine.cached_entries(), 2, "formatted request keys separately");
    assert!(a.payload.contains_key("sizeMD"));
    assert!(!b.payload.contains_key("sizeMD"));
}

#[test]
fn salts_with_reserved_characters_still_key_cleanly() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    let plain = css_var_request("#1677ff", "scope");
    let mut salted = plain.clone();
    salted.salt = "app%v2".into();

    let mut first = TokenBinding::new(Arc::clone(&engine));
    let mut second = TokenBinding::new(Arc::clone(&engine));
    let a = first.update(&theme, &plain).unwrap();
    let b = second.update(&theme, &salted).unwrap();
    engine.commit();

    assert_ne!(a.hash_id, b.hash_id);
    assert_eq!(engine.cached_entries(), 2);
}

#[test]
fn extraction_follows_the_injected_block_for_shared_theme_keys() {
    let sink = Arc::new(MemorySink::new());
    let engine = Arc::new(StyleEngine::new(Arc::clone(&sink) as Arc<dyn StyleSink>));
    let theme = DefaultTheme::new();

    // Two entries share one scope; the first-acquired block is the one the
    // document keeps, even though the other's text sorts first.
    let mut first = TokenBinding::new(Arc::clone(&engine));
    let mut second = TokenBinding::new(Arc::clone(&engine));
    first
        .update(&theme, &css_var_request("#1677ff", "shared-scope"))
        .unwrap();
    second
        .update(&theme, &css_var_request("#000", "shared-scope"))
        .unwrap();
    engine.commit();
    assert_eq!(engine.extract(true), sink.get("shared-scope").unwrap());

    // Before any commit, extraction already predicts what commit injects.
    let fresh_sink = Arc::new(MemorySink::new());
    let fresh = Arc::new(StyleEngine::new(
        Arc::clone(&fresh_sink) as Arc<dyn StyleSink>
    ));
    let mut a = TokenBinding::new(Arc::clone(&fresh));
    let mut b = TokenBinding::new(Arc::clone(&fresh));
    a.update(&theme, &css_var_request("#1677ff", "shared-scope"))
        .unwrap();
    b.update(&theme, &css_var_request("#000", "shared-scope"))
        .unwrap();
    let predicted = fresh.extract(true);
    fresh.commit();
    assert_eq!(predicted, fresh_sink.get("shared-scope").unwrap());
}
