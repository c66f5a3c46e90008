//! Key resolution against the published snapshot.
//!
//! A [`Resolver`] owns one atomically-swappable [`LoadResult`] snapshot
//! and answers lookups through a fixed fallback chain. Readers are never
//! blocked by a reload: they keep seeing the old snapshot until
//! [`Resolver::install`] swaps in the new one in a single atomic store.
//!
//! # Lookup chain
//!
//! 1. Pre-checks: marked text and pure `[bracket]` tags are never
//!    resolved (they are engine/host control output, not source text).
//! 2. Exact match.
//! 3. Exact match on the key after its first `/` (hosts prefix terms with
//!    a namespace the source files usually omit).
//! 4. Exact match on the normalized key (see [`crate::text::normalize`]).
//! 5. Regex rules, in registration order, raw key first then normalized;
//!    the first non-empty match expands its template and wins.
//! 6. Miss: recorded to the untranslated sink (if attached), `None`
//!    returned, caller leaves the original text alone.
//!
//! A miss is a perfectly normal outcome, not an error.

pub mod template;

use std::collections::HashSet;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::export::UntranslatedSink;
use crate::loader::{LoadResult, RegexRule};
use crate::text;

/// True for keys that are nothing but one bracketed tag, e.g. `[HF]`.
/// Those are host control sequences; resolving them would corrupt them.
fn is_bracket_tag(key: &str) -> bool {
    key.len() >= 2 && key.starts_with('[') && key.ends_with(']')
}

/// Resolution engine for one text domain.
///
/// Multiple resolvers (free text, UI terms, lyrics) coexist without any
/// shared state; host glue holds whichever instances it needs.
pub struct Resolver {
    snapshot: ArcSwap<LoadResult>,
    mark_resolved: bool,
    sink: Option<Arc<Mutex<UntranslatedSink>>>,
    /// Normalized forms of text this resolver has produced, kept so
    /// cooperating translators can ask "is this yours?". Cleared on
    /// scene/session teardown via [`Resolver::clear_session`].
    produced: Mutex<HashSet<String>>,
}

impl Resolver {
    /// Create a resolver with an empty snapshot and marking enabled.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(LoadResult::default()),
            mark_resolved: true,
            sink: None,
            produced: Mutex::new(HashSet::new()),
        }
    }

    /// Enable or disable marker tagging of resolved output.
    pub fn with_marking(mut self, mark_resolved: bool) -> Self {
        self.mark_resolved = mark_resolved;
        self
    }

    /// Attach an untranslated-export sink; every distinct missed key is
    /// recorded into it.
    pub fn with_sink(mut self, sink: Arc<Mutex<UntranslatedSink>>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Atomically publish a freshly-loaded snapshot.
    ///
    /// This is the designated completion-callback target: readers observe
    /// either the previous snapshot or this one, never anything partial.
    pub fn install(&self, result: LoadResult) {
        debug!(
            entries = result.total_entries,
            files = result.total_files,
            "installing translation snapshot"
        );
        self.snapshot.store(Arc::new(result));
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<LoadResult> {
        self.snapshot.load_full()
    }

    /// Resolve a key to its best substitute, or `None` to leave the
    /// original text untouched.
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.resolve_with_sample(key, None)
    }

    /// Like [`Resolver::resolve`], additionally passing the on-screen
    /// original text to record alongside the key if the lookup misses.
    pub fn resolve_with_sample(&self, key: &str, sample: Option<&str>) -> Option<String> {
        // Pre-checks run before any dictionary access.
        if key.is_empty() || text::contains_marker(key) || is_bracket_tag(key) {
            return None;
        }

        let snapshot = self.snapshot.load();

        if let Some(value) = snapshot.entries.get(key) {
            return Some(self.finish(value.clone()));
        }

        if let Some(slash) = key.find('/') {
            if let Some(value) = snapshot.entries.get(&key[slash + 1..]) {
                debug!(key, "resolved via namespace-stripped key");
                return Some(self.finish(value.clone()));
            }
        }

        let normalized = text::normalize(key);
        if let Some(value) = snapshot.entries.get(&normalized) {
            debug!(key, "resolved via normalized key");
            return Some(self.finish(value.clone()));
        }

        for rule in &snapshot.regex_rules {
            let expanded = expand_rule(rule, key, &snapshot)
                .or_else(|| expand_rule(rule, &normalized, &snapshot));
            if let Some(expanded) = expanded {
                debug!(key, pattern = rule.pattern.as_str(), "resolved via regex rule");
                return Some(self.finish(expanded));
            }
        }

        if let Some(sink) = &self.sink {
            sink.lock().record(key, sample);
        }
        None
    }

    /// True if the exact key is present in the published snapshot. Lets
    /// host glue hold back other translators for text this engine will
    /// handle itself.
    pub fn is_known_key(&self, key: &str) -> bool {
        self.snapshot.load().entries.contains_key(key)
    }

    /// True if `text` was produced by this resolver during the current
    /// session.
    pub fn is_resolved_text(&self, text_value: &str) -> bool {
        if text_value.trim().is_empty() {
            return false;
        }
        self.produced.lock().contains(&produced_fingerprint(text_value))
    }

    /// Forget which strings this resolver produced. Call on scene or
    /// session teardown so the set does not grow without bound.
    pub fn clear_session(&self) {
        self.produced.lock().clear();
    }

    /// Apply output marking to a successful resolution.
    fn finish(&self, value: String) -> String {
        if !self.mark_resolved {
            return value;
        }
        self.produced.lock().insert(produced_fingerprint(&value));
        text::mark(value)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Marker-free normalized form used for the produced-text session set, so
/// marked and unmarked copies of the same output compare equal.
fn produced_fingerprint(value: &str) -> String {
    text::normalize(value).replace(text::MARKER, "")
}

/// Try one rule against one haystack. A zero-length match is not a match;
/// without this, a rule like `.*` with an empty-capable pattern would
/// claim every key and expand to nothing.
fn expand_rule(rule: &RegexRule, haystack: &str, snapshot: &LoadResult) -> Option<String> {
    let captures = rule.pattern.captures(haystack)?;
    let whole = captures.get(0)?;
    if whole.as_str().is_empty() {
        return None;
    }

    Some(template::expand(&rule.template, |body| {
        let captured = match body.parse::<usize>() {
            Ok(index) => captures.get(index).map(|m| m.as_str()),
            Err(_) => None,
        }
        .or_else(|| captures.name(body).map(|m| m.as_str()))
        .unwrap_or("");

        // Captured text gets its own exact-match pass, so rule output
        // composes with plain entries.
        match snapshot.entries.get(captured) {
            Some(sub) => sub.clone(),
            None => captured.to_string(),
        }
    }))
}
