//! Breadcrumb minting (spec §4.2). Assembling the full 5-tuple needs the
//! current cycle number, which is a C3 projection computed from this same
//! log — rather than depend back on the projections crate, `mint` takes the
//! cycle as a parameter supplied by the caller, who already has it from
//! whichever projection query it ran this turn.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use macf_types::Breadcrumb;

/// Assemble a breadcrumb from the current cycle, session id, optional
/// prompt_uuid, current time, and `git rev-parse --short=7 HEAD` (absence
/// OK — see [`macf_core::git::current_git_hash`]).
pub fn mint(cycle: u64, session_id: &str, prompt_uuid: Option<&str>, project_root: &Path) -> Breadcrumb {
    let mut breadcrumb = Breadcrumb::new(cycle, session_id).with_timestamp(now_unix());
    if let Some(p) = prompt_uuid {
        breadcrumb = breadcrumb.with_prompt(p);
    }
    if let Some(hash) = macf_core::git::current_git_hash(project_root) {
        breadcrumb = breadcrumb.with_git_hash(hash);
    }
    breadcrumb
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

const CACHE_TTL: Duration = Duration::from_secs(1);

/// Caches the last-minted breadcrumb for 1s to absorb bursty callers within
/// a single turn (spec §4.2).
pub struct BreadcrumbCache {
    inner: Mutex<Option<(Instant, Breadcrumb)>>,
}

impl Default for BreadcrumbCache {
    fn default() -> Self {
        Self { inner: Mutex::new(None) }
    }
}

impl BreadcrumbCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached breadcrumb if it's younger than 1s and matches
    /// `cycle`/`session_id`/`prompt_uuid`, otherwise mint a fresh one and
    /// cache it.
    pub fn get_or_mint(
        &self,
        cycle: u64,
        session_id: &str,
        prompt_uuid: Option<&str>,
        project_root: &Path,
    ) -> Breadcrumb {
        let mut guard = self.inner.lock().expect("breadcrumb cache mutex poisoned");
        if let Some((minted_at, cached)) = guard.as_ref() {
            if minted_at.elapsed() < CACHE_TTL
                && cached.cycle == cycle
                && cached.session_id == session_id
                && cached.prompt_uuid.as_deref() == prompt_uuid
            {
                return cached.clone();
            }
        }
        let fresh = mint(cycle, session_id, prompt_uuid, project_root);
        *guard = Some((Instant::now(), fresh.clone()));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_sets_cycle_and_session() {
        let b = mint(3, "abcdefgh", None, Path::new("/tmp"));
        assert_eq!(b.cycle, 3);
        assert_eq!(b.session_id, "abcdefgh");
        assert!(b.timestamp.is_some());
    }

    #[test]
    fn cache_returns_same_breadcrumb_within_ttl() {
        let cache = BreadcrumbCache::new();
        let a = cache.get_or_mint(1, "abcdefgh", None, Path::new("/tmp"));
        let b = cache.get_or_mint(1, "abcdefgh", None, Path::new("/tmp"));
        assert_eq!(a, b);
    }

    #[test]
    fn cache_misses_on_changed_cycle() {
        let cache = BreadcrumbCache::new();
        let a = cache.get_or_mint(1, "abcdefgh", None, Path::new("/tmp"));
        let b = cache.get_or_mint(2, "abcdefgh", None, Path::new("/tmp"));
        assert_ne!(a.cycle, b.cycle);
    }
}
