//! Selection of the stored configuration that applies to a URL.
//!
//! A `url_pattern` without `*` matches every URL that contains it. A pattern
//! with `*` is a regular expression over the URL where each `*` stands for
//! any run of characters and everything else is literal. Among active
//! matches the longest pattern wins; ties go to the earliest registered.

use crate::storage::{StoreResult, TestStore};
use regex::Regex;
use sc_protocol::{TestConfiguration, TestKind};
use std::sync::Arc;
use tracing::debug;

const WILDCARD: char = '*';

/// Whether `pattern` selects `url`.
pub fn pattern_matches(pattern: &str, url: &str) -> bool {
    if !pattern.contains(WILDCARD) {
        return url.contains(pattern);
    }

    let expanded = pattern
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    match Regex::new(&expanded) {
        Ok(re) => re.is_match(url),
        Err(e) => {
            debug!(pattern, error = %e, "Unusable url pattern");
            false
        }
    }
}

/// Pick the most specific active configuration for `url`.
pub fn resolve<'a>(
    configs: &'a [TestConfiguration],
    url: &str,
    test_kind: Option<TestKind>,
) -> Option<&'a TestConfiguration> {
    let mut best: Option<&TestConfiguration> = None;
    for config in configs {
        if !config.is_active
            || test_kind.is_some_and(|kind| kind != config.test_kind)
            || !pattern_matches(&config.url_pattern, url)
        {
            continue;
        }
        // Strictly longer only, so the first registered wins a tie.
        let longer = best.map_or(true, |b| {
            config.url_pattern.chars().count() > b.url_pattern.chars().count()
        });
        if longer {
            best = Some(config);
        }
    }
    best
}

/// Resolver over the configurations of a store.
#[derive(Clone)]
pub struct ConfigResolver {
    store: Arc<dyn TestStore>,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn TestStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(
        &self,
        url: &str,
        test_kind: Option<TestKind>,
    ) -> StoreResult<Option<TestConfiguration>> {
        let configs = self.store.list_configurations().await?;
        let selected = resolve(&configs, url, test_kind).cloned();
        debug!(
            url,
            kind = ?test_kind,
            selected = selected.as_ref().map(|c| c.id.as_str()),
            "Resolved configuration"
        );
        Ok(selected)
    }
}
