// src/api/collector.rs
//! Concurrent collection of every category into a [`Harvest`].
//!
//! Each category is its own task. They share the fetcher's global request
//! bound, so the number of categories does not change how hard the server
//! is hit.

use super::categories::Category;
use super::pagination::PaginatedFetcher;
use super::types::Listing;
use crate::error::AppError;
use crate::model::Harvest;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::task::JoinSet;

/// What to do when one category fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and keep every other category.
    #[default]
    FailSoft,
    /// Abort the remaining categories and surface the partial harvest.
    FailFast,
}

pub struct BulkCollector {
    pager: PaginatedFetcher,
    categories: Vec<Category>,
    policy: FailurePolicy,
    progress: MultiProgress,
}

impl BulkCollector {
    pub fn new(pager: PaginatedFetcher, categories: Vec<Category>) -> Self {
        Self {
            pager,
            categories,
            policy: FailurePolicy::default(),
            progress: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Draws one progress line per category on stderr.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        let target = if enabled {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        self.progress = MultiProgress::with_draw_target(target);
        self
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub async fn collect(&self) -> Result<Harvest, AppError> {
        log::info!(
            "Collecting {} categories ({:?})",
            self.categories.len(),
            self.policy
        );

        let mut join_set = JoinSet::new();
        for (index, category) in self.categories.iter().cloned().enumerate() {
            let pager = self.pager.clone();
            let bar = self.progress_bar(category.name);
            join_set.spawn(async move {
                let result = pager.fetch_all(&category.query, Some(&bar)).await;
                match &result {
                    Ok(listing) => bar.finish_with_message(format!("{} records", listing.records.len())),
                    Err(_) => bar.abandon_with_message("failed"),
                }
                (index, result)
            });
        }

        // Merged in catalogue order once everything has settled
        let mut listings: Vec<Option<Listing>> = vec![None; self.categories.len()];
        let mut harvest = Harvest::new();

        while let Some(joined) = join_set.join_next().await {
            let (index, result) = joined.map_err(|e| AppError::InternalError {
                message: format!("Category task failed with join error: {}", e),
                source: Some(Box::new(e)),
            })?;
            let category = &self.categories[index];

            match result {
                Ok(listing) => {
                    log::info!(
                        "{}: {} records ({} pages)",
                        category.name,
                        listing.records.len(),
                        listing.pages_fetched
                    );
                    listings[index] = Some(listing);
                }
                Err(e) => {
                    let failure = e.in_category(category.name);
                    log::error!("{}", failure);
                    harvest.record_failure(failure.clone());

                    if self.policy == FailurePolicy::FailFast {
                        join_set.abort_all();
                        self.merge(&mut harvest, listings);
                        return Err(AppError::CollectionAborted {
                            failure,
                            partial: Box::new(harvest),
                        });
                    }
                }
            }
        }

        self.merge(&mut harvest, listings);
        if !harvest.failures().is_empty() {
            log::warn!(
                "{} of {} categories failed: {}",
                harvest.failures().len(),
                self.categories.len(),
                harvest.failed_categories().join(", ")
            );
        }
        Ok(harvest)
    }

    fn merge(&self, harvest: &mut Harvest, listings: Vec<Option<Listing>>) {
        for (category, listing) in self.categories.iter().zip(listings) {
            if let Some(listing) = listing {
                harvest.absorb(category.name, category.bucket, listing.records);
            }
        }
    }

    fn progress_bar(&self, name: &str) -> ProgressBar {
        let style = ProgressStyle::with_template("{prefix:>28} {spinner} {pos} records {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = self.progress.add(ProgressBar::new_spinner());
        bar.set_style(style);
        bar.set_prefix(name.to_string());
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::categories::catalogue;
    use crate::api::testing::StubTransport;
    use crate::api::types::PaginationOptions;
    use crate::api::{ApiFetcher, RateLimiter};
    use crate::error::FetchError;
    use crate::error_recovery::RetryPolicy;
    use crate::model::Bucket;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn collector(stub: StubTransport, names: &[&str]) -> BulkCollector {
        let fetcher = ApiFetcher::new(Arc::new(stub))
            .with_rate_limiter(Arc::new(RateLimiter::new(Duration::ZERO)))
            .with_retry_policy(RetryPolicy::default().with_max_attempts(1));
        let pager = PaginatedFetcher::new(
            Arc::new(fetcher),
            PaginationOptions {
                page_size: 10,
                batch_size: 2,
                max_pages: 100,
            },
        );
        let categories = catalogue()
            .into_iter()
            .filter(|c| names.contains(&c.name))
            .collect();
        BulkCollector::new(pager, categories)
    }

    /// One short page per listing; ids derived from the resource class.
    fn respond(request: &crate::api::ApiRequest) -> Result<serde_json::Value, FetchError> {
        let class = request
            .params()
            .iter()
            .find(|(k, _)| k == "resource_class_id")
            .map(|(_, v)| v.clone());
        match (request.endpoint(), class.as_deref()) {
            ("items", Some("58")) => Err(FetchError::from_status("items?resource_class_id=58", 500)),
            ("items", Some(class)) => Ok(json!([{"o:id": class.parse::<u64>().unwrap()}])),
            ("item_sets", _) => Ok(json!([{"o:id": 1000, "o:is_public": true}])),
            ("media", _) => Ok(json!([
                {"o:id": 2000},
                {"o:id": 2001, "o:is_public": false}
            ])),
            _ => Ok(json!([])),
        }
    }

    #[tokio::test]
    async fn test_fail_soft_keeps_other_categories() {
        let harvest = collector(
            StubTransport::new(respond),
            &["documents", "images", "issues", "item_sets", "media"],
        )
        .collect()
        .await
        .unwrap();

        assert_eq!(harvest.failed_categories(), vec!["images"]);
        assert_eq!(harvest.bucket(Bucket::Items).len(), 2);
        assert_eq!(harvest.bucket(Bucket::ItemSets).len(), 1);
        // Hidden media are filtered out
        assert_eq!(harvest.bucket(Bucket::Media).len(), 1);

        let counts: Vec<_> = harvest.category_counts().map(|(n, _, c)| (n, c)).collect();
        assert_eq!(
            counts,
            vec![("documents", 1), ("issues", 1), ("item_sets", 1), ("media", 1)]
        );
    }

    #[tokio::test]
    async fn test_fail_fast_returns_partial_harvest() {
        let err = collector(StubTransport::new(respond), &["documents", "images"])
            .with_policy(FailurePolicy::FailFast)
            .collect()
            .await
            .unwrap_err();

        match err {
            AppError::CollectionAborted { failure, partial } => {
                assert_eq!(failure.category(), Some("images"));
                assert_eq!(partial.failed_categories(), vec!["images"]);
            }
            other => panic!("expected CollectionAborted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_everything_succeeds() {
        let harvest = collector(StubTransport::new(|_| Ok(json!([]))), &["documents", "media"])
            .collect()
            .await
            .unwrap();
        assert!(harvest.failures().is_empty());
        assert!(harvest.is_empty());
    }
}
