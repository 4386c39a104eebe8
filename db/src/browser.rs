//! Presentation-side view over a patient store.
//!
//! Holds the transient copy of the last fetched patients and statistics that a
//! UI renders from. Searches are latest-wins: each new search cancels any
//! debounce wait or query still running for an older one, and only the newest
//! result is ever applied to the cached list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::Result;
use crate::models::{Patient, PatientStatistics};
use crate::store::PatientStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Result of [`PatientBrowser::search`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// This search was the latest; its result is now cached
    Applied(Vec<Patient>),
    /// A newer search started before this one finished
    Superseded,
}

/// Outcome of loading patients and statistics side by side
#[derive(Debug)]
pub struct Snapshot {
    pub patients: Result<Vec<Patient>>,
    pub statistics: Result<PatientStatistics>,
}

#[derive(Default)]
struct CachedView {
    patients: Vec<Patient>,
    statistics: PatientStatistics,
}

pub struct PatientBrowser {
    store: Arc<dyn PatientStore>,
    debounce: Duration,
    generation: AtomicU64,
    latest: watch::Sender<u64>,
    view: Mutex<CachedView>,
}

impl PatientBrowser {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        let (latest, _) = watch::channel(0);
        Self {
            store,
            debounce: DEFAULT_DEBOUNCE,
            generation: AtomicU64::new(0),
            latest,
            view: Mutex::new(CachedView::default()),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Patients from the last applied load or search
    pub fn patients(&self) -> Vec<Patient> {
        self.view.lock().map(|v| v.patients.clone()).unwrap_or_default()
    }

    /// Statistics from the last successful load
    pub fn statistics(&self) -> PatientStatistics {
        self.view.lock().map(|v| v.statistics).unwrap_or_default()
    }

    /// Load patients and statistics concurrently; either may fail on its own.
    ///
    /// The patient list is only cached if no search started in the meantime.
    pub async fn refresh(&self, term: &str) -> Snapshot {
        let generation = self.begin();
        let (patients, statistics) = tokio::join!(self.query(term), self.store.statistics());

        if let Ok(list) = &patients {
            self.apply(generation, list.clone());
        }
        if let Ok(stats) = &statistics {
            if let Ok(mut view) = self.view.lock() {
                view.statistics = *stats;
            }
        }

        if let Err(e) = &patients {
            tracing::error!("Error loading patients: {}", e);
        }
        if let Err(e) = &statistics {
            tracing::error!("Error loading statistics: {}", e);
        }

        Snapshot { patients, statistics }
    }

    /// Debounced search that yields to any search started after it
    pub async fn search(&self, term: &str) -> Result<SearchOutcome> {
        let mut newer = self.latest.subscribe();
        let generation = self.begin();

        let superseded = async move {
            while newer.changed().await.is_ok() {
                if *newer.borrow() > generation {
                    return;
                }
            }
            std::future::pending::<()>().await
        };

        let query = async {
            if !self.debounce.is_zero() {
                tokio::time::sleep(self.debounce).await;
            }
            self.query(term).await
        };

        tokio::select! {
            _ = superseded => {
                tracing::debug!("Search generation {} superseded", generation);
                Ok(SearchOutcome::Superseded)
            }
            result = query => Ok(self.apply(generation, result?)),
        }
    }

    /// Take the next generation and announce it to every in-flight search.
    ///
    /// The published value only moves forward, so a slow publisher can never
    /// roll back a newer generation.
    fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(generation);
        generation
    }

    fn publish(&self, generation: u64) {
        self.latest.send_modify(|latest| *latest = (*latest).max(generation));
    }

    /// Cache `patients` only if no newer search has started
    fn apply(&self, generation: u64, patients: Vec<Patient>) -> SearchOutcome {
        let mut view = match self.view.lock() {
            Ok(view) => view,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            return SearchOutcome::Superseded;
        }
        view.patients = patients.clone();
        SearchOutcome::Applied(patients)
    }

    async fn query(&self, term: &str) -> Result<Vec<Patient>> {
        let term = term.trim();
        if term.is_empty() {
            self.store.get_all().await
        } else {
            self.store.search(term).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalStoragePatientStore;

    fn browser() -> PatientBrowser {
        let store = LocalStoragePatientStore::in_memory().with_latency(Duration::ZERO);
        PatientBrowser::new(Arc::new(store)).with_debounce(Duration::ZERO)
    }

    #[test]
    fn test_late_publish_never_rolls_back_generation() {
        let browser = browser();
        let mut observer = browser.latest.subscribe();

        browser.publish(2);
        browser.publish(1);

        assert!(observer.has_changed().unwrap());
        assert_eq!(*observer.borrow_and_update(), 2);
    }

    #[test]
    fn test_generations_are_increasing() {
        let browser = browser();
        assert_eq!(browser.begin(), 1);
        assert_eq!(browser.begin(), 2);
        assert_eq!(*browser.latest.borrow(), 2);
    }

    #[test]
    fn test_stale_generation_is_not_applied() {
        let browser = browser();
        let stale = browser.begin();
        let current = browser.begin();

        let patients = tokio_test::block_on(browser.query("")).unwrap();
        assert_eq!(browser.apply(stale, patients.clone()), SearchOutcome::Superseded);
        assert!(browser.patients().is_empty());
        assert_eq!(
            browser.apply(current, patients.clone()),
            SearchOutcome::Applied(patients)
        );
        assert_eq!(browser.patients().len(), 3);
    }
}
