use crate::{
    Category, CheckResult, Error, FirewallProbe, LogsProbe, PortsProbe, SshProbe, UpdatesProbe,
    UsersProbe,
};
use std::{collections::BTreeMap, sync::Arc, time::Duration};
use tokio::time::Instant;
use tracing::{debug, warn};

/// A collector for one category. Implementations block (they read files and
/// shell out), so [`ProbeSet`] always runs them on the blocking pool.
pub trait Probe: Send + Sync {
    fn category(&self) -> Category;

    fn run(&self) -> Result<CheckResult, Error>;
}

/// Built-in probe for `category`.
pub fn standard_probe(category: Category) -> Arc<dyn Probe> {
    match category {
        Category::Ports => Arc::new(PortsProbe),
        Category::Ssh => Arc::new(SshProbe::default()),
        Category::Firewall => Arc::new(FirewallProbe),
        Category::Users => Arc::new(UsersProbe::default()),
        Category::Logs => Arc::new(LogsProbe::default()),
        Category::Updates => Arc::new(UpdatesProbe),
    }
}

#[derive(Clone, Default)]
pub struct ProbeSet {
    probes: Vec<Arc<dyn Probe>>,
}

impl ProbeSet {
    pub fn new(probes: Vec<Arc<dyn Probe>>) -> Self {
        Self { probes }
    }

    /// Standard probes for the given categories, one per category.
    pub fn standard(categories: impl IntoIterator<Item = Category>) -> Self {
        let mut categories: Vec<_> = categories.into_iter().collect();
        categories.sort_unstable();
        categories.dedup();
        Self::new(categories.into_iter().map(standard_probe).collect())
    }

    pub fn categories(&self) -> Vec<Category> {
        self.probes.iter().map(|probe| probe.category()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Run every probe concurrently on the blocking pool and wait for all of
    /// them, sharing one deadline.
    ///
    /// Failures and timeouts are recorded as degraded results rather than
    /// dropped. A timed-out probe keeps running on its thread until the tool
    /// it waits on returns.
    pub async fn collect(&self, timeout: Duration) -> BTreeMap<Category, CheckResult> {
        let deadline = Instant::now() + timeout;
        let mut handles = Vec::with_capacity(self.probes.len());

        for probe in &self.probes {
            let probe = Arc::clone(probe);
            let category = probe.category();
            let handle = tokio::task::spawn_blocking(move || probe.run());
            handles.push((category, handle));
        }

        let mut results = BTreeMap::new();
        for (category, handle) in handles {
            let outcome = match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => Err(Error::from(err)),
                Err(_) => Err(Error::Timeout(timeout)),
            };

            let result = match outcome {
                Ok(result) => {
                    debug!(%category, status = %result.status, details = %result.details, "probe finished");
                    result
                }
                Err(err) => {
                    warn!(%category, %err, "probe failed");
                    CheckResult::degraded(&err)
                }
            };
            results.insert(category, result);
        }

        results
    }
}

impl std::fmt::Debug for ProbeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSet")
            .field("categories", &self.categories())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CheckStatus;
    use serde_json::json;

    struct Fixed(Category, CheckStatus);

    impl Probe for Fixed {
        fn category(&self) -> Category {
            self.0
        }

        fn run(&self) -> Result<CheckResult, Error> {
            Ok(CheckResult::new(self.1, "fixed", json!({})))
        }
    }

    struct Failing;

    impl Probe for Failing {
        fn category(&self) -> Category {
            Category::Updates
        }

        fn run(&self) -> Result<CheckResult, Error> {
            Err(Error::CommandFailed {
                program: "apt-get".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    struct Sleepy;

    impl Probe for Sleepy {
        fn category(&self) -> Category {
            Category::Logs
        }

        fn run(&self) -> Result<CheckResult, Error> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(CheckResult::new(CheckStatus::Ok, "late", json!({})))
        }
    }

    #[tokio::test]
    async fn collect_isolates_failures() {
        let set = ProbeSet::new(vec![
            Arc::new(Fixed(Category::Ports, CheckStatus::Ok)),
            Arc::new(Failing),
        ]);
        let results = set.collect(Duration::from_secs(5)).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[&Category::Ports].details, "fixed");
        assert_eq!(results[&Category::Updates].status, CheckStatus::Warn);
        assert_eq!(results[&Category::Updates].details, "probe_failed");
    }

    #[tokio::test]
    async fn collect_bounds_slow_probes() {
        let set = ProbeSet::new(vec![
            Arc::new(Sleepy),
            Arc::new(Fixed(Category::Ssh, CheckStatus::Crit)),
        ]);
        let results = set.collect(Duration::from_millis(50)).await;

        assert_eq!(results[&Category::Logs].details, "probe_timeout");
        assert_eq!(results[&Category::Ssh].status, CheckStatus::Crit);
    }

    #[test]
    fn standard_set_dedups_categories() {
        let set = ProbeSet::standard([Category::Logs, Category::Ports, Category::Logs]);
        assert_eq!(set.categories(), vec![Category::Ports, Category::Logs]);
    }
}
