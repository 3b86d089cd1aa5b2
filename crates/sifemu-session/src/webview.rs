//! Lazily built webview header set.
//!
//! The in-game webview signs its page fetches once and then reuses the same
//! headers, token and all, until the client throws them away (typically
//! right after the announcement page on launch).

use sifemu_protocol::HeaderSet;

/// Caches the webview header set between explicit clears.
#[derive(Debug, Clone, Default)]
pub struct WebviewCache {
    headers: Option<HeaderSet>,
    builds: u64,
}

impl WebviewCache {
    /// Returns the cached headers, calling `build` only if the cache is
    /// empty.
    pub fn get_or_build<F>(&mut self, build: F) -> &HeaderSet
    where
        F: FnOnce() -> HeaderSet,
    {
        let builds = &mut self.builds;
        self.headers.get_or_insert_with(|| {
            *builds += 1;
            tracing::debug!(builds = *builds, "built webview headers");
            build()
        })
    }

    /// Drops the cached headers; the next fetch rebuilds them.
    pub fn clear(&mut self) {
        self.headers = None;
    }

    pub fn headers(&self) -> Option<&HeaderSet> {
        self.headers.as_ref()
    }

    pub fn is_cached(&self) -> bool {
        self.headers.is_some()
    }

    /// How many times the headers have been built.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn headers(tag: &str) -> HeaderSet {
        [("authorize", tag)].into_iter().collect()
    }

    #[test]
    fn test_get_or_build_builds_once_until_cleared() {
        let mut cache = WebviewCache::default();
        let calls = Cell::new(0);
        let build = || {
            calls.set(calls.get() + 1);
            headers("a")
        };

        for _ in 0..5 {
            cache.get_or_build(build);
        }

        assert_eq!(calls.get(), 1);
        assert_eq!(cache.builds(), 1);
    }

    #[test]
    fn test_get_or_build_reuses_first_headers() {
        let mut cache = WebviewCache::default();
        cache.get_or_build(|| headers("first"));

        let reused = cache.get_or_build(|| headers("second"));

        assert_eq!(reused.get("authorize"), Some("first"));
    }

    #[test]
    fn test_clear_forces_rebuild() {
        let mut cache = WebviewCache::default();
        cache.get_or_build(|| headers("first"));

        cache.clear();
        assert!(!cache.is_cached());
        let rebuilt = cache.get_or_build(|| headers("second"));

        assert_eq!(rebuilt.get("authorize"), Some("second"));
        assert_eq!(cache.builds(), 2);
    }
}
