//! Trust registry: which domains the crawler may lean on, how hard it may
//! lean, and which domains are off limits.
//!
//! Read-mostly.  Admin mutations take the write lock; readers always see a
//! complete entry.  When a store is attached, mutations are mirrored into
//! the `trusted_sources` table and reloaded on top of the static seed at
//! startup (last write wins).

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use sahayak_store::SearchStore;
use sahayak_types::{QueryType, SourceType, TrustedSource};
use serde::Serialize;
use tracing::{info, warn};

mod seed;

pub use seed::{SEED_BLOCKED, seed_sources};

/// Registry-wide counters for the admin surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistryStats {
    pub total_sources: usize,
    pub official_sources: usize,
    pub aggregator_sources: usize,
    pub enabled_sources: usize,
    pub blocked_domains: usize,
}

#[derive(Default)]
struct Inner {
    sources: HashMap<String, TrustedSource>,
    blocked: HashSet<String>,
}

pub struct TrustRegistry {
    inner: RwLock<Inner>,
    store: Option<Arc<SearchStore>>,
}

/// Lowercase, trim, and strip a leading `www.` — every lookup goes
/// through this.
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    domain.strip_prefix("www.").unwrap_or(&domain).to_string()
}

fn is_auto_trusted(domain: &str) -> bool {
    domain.ends_with(".gov.in") || domain.ends_with(".nic.in")
}

/// Suffix-based priority for domains absent from the registry.
fn default_priority(domain: &str) -> u8 {
    if domain.ends_with(".gov.in") || domain.ends_with(".nic.in") {
        8
    } else if domain.ends_with(".ac.in") || domain.ends_with(".edu.in") {
        6
    } else if domain.ends_with(".org.in") {
        5
    } else {
        3
    }
}

impl TrustRegistry {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Seed plus whatever earlier admin operations persisted.
    pub fn with_store(store: Arc<SearchStore>) -> Self {
        Self::build(Some(store))
    }

    fn build(store: Option<Arc<SearchStore>>) -> Self {
        let mut inner = Inner::default();
        for source in seed_sources() {
            inner.sources.insert(source.domain.clone(), source);
        }
        for domain in SEED_BLOCKED {
            inner.blocked.insert(domain.to_string());
        }

        if let Some(ref store) = store {
            match store.load_sources() {
                Ok(persisted) => {
                    for source in persisted {
                        if source.source_type == SourceType::Blocked {
                            inner.sources.remove(&source.domain);
                            inner.blocked.insert(source.domain);
                        } else {
                            inner.sources.insert(source.domain.clone(), source);
                        }
                    }
                }
                Err(err) => warn!(error = %err, "could not load persisted sources"),
            }
        }

        info!(sources = inner.sources.len(), blocked = inner.blocked.len(), "trust registry initialised");
        Self {
            inner: RwLock::new(inner),
            store,
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────────────

    /// A domain is trusted when it is an enabled registry entry or carries
    /// an auto-trusted government suffix, and is not blocked.  Blocking
    /// always wins.
    pub fn is_trusted(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        let inner = self.inner.read().expect("registry lock poisoned");
        if inner.blocked.contains(&domain) {
            return false;
        }
        if let Some(source) = inner.sources.get(&domain) {
            return source.enabled;
        }
        is_auto_trusted(&domain)
    }

    pub fn is_blocked(&self, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.blocked.contains(&domain)
    }

    pub fn get(&self, domain: &str) -> Option<TrustedSource> {
        let domain = normalize_domain(domain);
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.sources.get(&domain).cloned()
    }

    /// Registry priority when present, suffix default otherwise.
    pub fn priority(&self, domain: &str) -> u8 {
        let domain = normalize_domain(domain);
        let inner = self.inner.read().expect("registry lock poisoned");
        match inner.sources.get(&domain) {
            Some(source) => source.priority,
            None => default_priority(&domain),
        }
    }

    /// Politeness budget in requests per second; 1.0 unless overridden.
    pub fn rate_limit(&self, domain: &str) -> f64 {
        self.get(domain).map(|s| s.rate_limit).unwrap_or(1.0)
    }

    /// Recommended domains for a query type: enabled entries whose
    /// categories intersect the type's category set, best priority first,
    /// capped at 15.
    pub fn domains_for_query_type(&self, query_type: QueryType) -> Vec<String> {
        let categories: &[&str] = match query_type {
            QueryType::Job => &["job", "result", "admit_card"],
            QueryType::Scheme => &["scheme", "government"],
            QueryType::Result => &["result", "education"],
            QueryType::AdmitCard => &["admit_card", "result"],
            QueryType::Cutoff => &["result", "job"],
            QueryType::Syllabus => &["education", "exam"],
            QueryType::General => &["government", "general"],
        };

        let inner = self.inner.read().expect("registry lock poisoned");
        let mut matches: Vec<(&String, u8)> = inner
            .sources
            .values()
            .filter(|s| s.enabled && s.categories.iter().any(|c| categories.contains(&c.as_str())))
            .map(|s| (&s.domain, s.priority))
            .collect();
        // Priority descending; domain as tiebreaker keeps the order stable.
        matches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        matches.into_iter().take(15).map(|(d, _)| d.clone()).collect()
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    /// Register (or replace) a source.  Refused for blocked domains.
    pub fn add_source(&self, mut source: TrustedSource) -> bool {
        source.domain = normalize_domain(&source.domain);
        {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            if inner.blocked.contains(&source.domain) {
                warn!(domain = %source.domain, "refusing to add blocked domain");
                return false;
            }
            inner.sources.insert(source.domain.clone(), source.clone());
        }
        self.persist(&source);
        info!(domain = %source.domain, "trusted source added");
        true
    }

    /// Block a domain, overriding any trusted entry for it.
    pub fn block_domain(&self, domain: &str, reason: &str) {
        let domain = normalize_domain(domain);
        {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            inner.sources.remove(&domain);
            inner.blocked.insert(domain.clone());
        }

        let mut marker =
            TrustedSource::new(domain.clone(), SourceType::Blocked, reason, 1, &[]);
        marker.enabled = false;
        self.persist(&marker);
        info!(domain = %domain, reason, "domain blocked");
    }

    /// Fold one crawl outcome into the domain's EWMA success rate.
    /// No-op for domains outside the registry (including auto-trusted ones).
    pub fn update_crawl_stats(&self, domain: &str, success: bool) {
        let domain = normalize_domain(domain);
        let updated = {
            let mut inner = self.inner.write().expect("registry lock poisoned");
            inner.sources.get_mut(&domain).map(|source| {
                source.last_crawled = Some(Utc::now());
                source.success_rate =
                    source.success_rate * 0.9 + if success { 0.1 } else { 0.0 };
                source.clone()
            })
        };
        if let Some(source) = updated {
            self.persist(&source);
        }
    }

    fn persist(&self, source: &TrustedSource) {
        if let Some(ref store) = self.store {
            if let Err(err) = store.put_source(source) {
                warn!(domain = %source.domain, error = %err, "failed to persist source");
            }
        }
    }

    // ── Admin surface ────────────────────────────────────────────────────────

    pub fn all_sources(&self) -> Vec<TrustedSource> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut sources: Vec<TrustedSource> = inner.sources.values().cloned().collect();
        sources.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.domain.cmp(&b.domain)));
        sources
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read().expect("registry lock poisoned");
        RegistryStats {
            total_sources: inner.sources.len(),
            official_sources: inner
                .sources
                .values()
                .filter(|s| s.source_type == SourceType::Official)
                .count(),
            aggregator_sources: inner
                .sources
                .values()
                .filter(|s| s.source_type == SourceType::Aggregator)
                .count(),
            enabled_sources: inner.sources.values().filter(|s| s.enabled).count(),
            blocked_domains: inner.blocked.len(),
        }
    }
}

impl Default for TrustRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalisation_strips_www_and_case() {
        assert_eq!(normalize_domain("WWW.SSC.NIC.IN "), "ssc.nic.in");
        assert_eq!(normalize_domain("india.gov.in"), "india.gov.in");
    }

    #[test]
    fn seeded_official_domain_is_trusted() {
        let registry = TrustRegistry::new();
        assert!(registry.is_trusted("ssc.nic.in"));
        assert!(registry.is_trusted("www.upsc.gov.in"));
    }

    #[test]
    fn gov_suffix_is_auto_trusted_without_registration() {
        let registry = TrustRegistry::new();
        assert!(registry.is_trusted("tnpsc.gov.in"));
        assert!(registry.is_trusted("some-district.nic.in"));
        assert!(!registry.is_trusted("randomjobsite.com"));
    }

    #[test]
    fn blocked_overrides_everything() {
        let registry = TrustRegistry::new();
        assert!(!registry.is_trusted("fakesite.com"));

        // Blocking a seeded official entry must override its trust.
        registry.block_domain("ssc.nic.in", "test");
        assert!(!registry.is_trusted("ssc.nic.in"));
        assert!(registry.is_blocked("ssc.nic.in"));

        // And blocked domains cannot be re-added.
        let source = TrustedSource::new("fakesite.com", SourceType::Aggregator, "Fake", 5, &[]);
        assert!(!registry.add_source(source));
    }

    #[test]
    fn priority_defaults_follow_domain_suffix() {
        let registry = TrustRegistry::new();
        assert_eq!(registry.priority("unknown-dept.gov.in"), 8);
        assert_eq!(registry.priority("district.nic.in"), 8);
        assert_eq!(registry.priority("college.ac.in"), 6);
        assert_eq!(registry.priority("school.edu.in"), 6);
        assert_eq!(registry.priority("ngo.org.in"), 5);
        assert_eq!(registry.priority("randomsite.com"), 3);
        // Registered entries report their own priority.
        assert_eq!(registry.priority("sarkariresult.com"), 5);
    }

    #[test]
    fn query_type_domains_are_priority_sorted_and_capped() {
        let registry = TrustRegistry::new();
        let domains = registry.domains_for_query_type(QueryType::Job);
        assert!(!domains.is_empty());
        assert!(domains.len() <= 15);
        assert!(domains.contains(&"ssc.nic.in".to_string()));
        // Highest priority entries come first.
        let first_priority = registry.priority(&domains[0]);
        let last_priority = registry.priority(domains.last().unwrap());
        assert!(first_priority >= last_priority);
    }

    #[test]
    fn scheme_queries_see_scheme_portals() {
        let registry = TrustRegistry::new();
        let domains = registry.domains_for_query_type(QueryType::Scheme);
        assert!(domains.contains(&"pmkisan.gov.in".to_string()));
        assert!(!domains.contains(&"sarkariresult.com".to_string()));
    }

    #[test]
    fn crawl_stats_apply_ewma() {
        let registry = TrustRegistry::new();
        registry.update_crawl_stats("ssc.nic.in", false);
        let source = registry.get("ssc.nic.in").unwrap();
        assert!((source.success_rate - 0.9).abs() < 1e-9);
        assert!(source.last_crawled.is_some());

        registry.update_crawl_stats("ssc.nic.in", true);
        let source = registry.get("ssc.nic.in").unwrap();
        assert!((source.success_rate - (0.9 * 0.9 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn stats_count_source_kinds() {
        let registry = TrustRegistry::new();
        let stats = registry.stats();
        assert!(stats.total_sources >= 30);
        assert!(stats.official_sources > stats.aggregator_sources);
        assert_eq!(stats.blocked_domains, SEED_BLOCKED.len());
    }

    #[test]
    fn admin_mutations_survive_reopen_with_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.redb");

        {
            let store = Arc::new(SearchStore::open(&path).unwrap());
            let registry = TrustRegistry::with_store(store);
            registry.add_source(TrustedSource::new(
                "newportal.org.in",
                SourceType::SemiOfficial,
                "New Portal",
                7,
                &["job"],
            ));
            registry.block_domain("badsite.com", "spam");
        }

        let store = Arc::new(SearchStore::open(&path).unwrap());
        let registry = TrustRegistry::with_store(store);
        assert!(registry.is_trusted("newportal.org.in"));
        assert_eq!(registry.priority("newportal.org.in"), 7);
        assert!(registry.is_blocked("badsite.com"));
    }
}
