use std::collections::HashMap;
use std::sync::{Arc, Mutex, TryLockError};

use tracing::{debug, info};

use super::{DatasetError, DatasetKey, DatasetSource};
use crate::affordability::{City, RegionDataset, TravelDirectory};

type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

/// Fetch-once cache in front of a [`DatasetSource`].
///
/// Each key is loaded at most once while its load succeeds; failures are not cached,
/// so the next request for the same key asks the source again. Every city has its own
/// slot: concurrent requests for one city share a fetch, while a slow fetch for one city
/// never delays another.
pub struct DatasetCache {
    source: Arc<dyn DatasetSource>,
    regions: Mutex<HashMap<City, Slot<RegionDataset>>>,
    travel: Slot<TravelDirectory>,
}

impl DatasetCache {
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            regions: Mutex::new(HashMap::new()),
            travel: Arc::default(),
        }
    }

    pub fn regions(&self, city: City) -> Result<Arc<RegionDataset>, DatasetError> {
        let key = DatasetKey::Regions(city);
        let slot = self.region_slot(city)?;
        fetch_once(&slot, key, || self.source.regions(city), RegionDataset::len)
    }

    pub fn travel_directory(&self) -> Result<Arc<TravelDirectory>, DatasetError> {
        fetch_once(
            &self.travel,
            DatasetKey::TravelDirectory,
            || self.source.travel_directory(),
            TravelDirectory::len,
        )
    }

    /// `false` while a key is still being fetched.
    pub fn is_cached(&self, key: DatasetKey) -> bool {
        match key {
            DatasetKey::Regions(city) => self
                .regions
                .lock()
                .ok()
                .and_then(|slots| slots.get(&city).cloned())
                .is_some_and(|slot| slot_filled(&slot)),
            DatasetKey::TravelDirectory => slot_filled(&self.travel),
        }
    }

    fn region_slot(&self, city: City) -> Result<Slot<RegionDataset>, DatasetError> {
        let mut slots = self
            .regions
            .lock()
            .map_err(|_| poisoned(DatasetKey::Regions(city)))?;
        Ok(Arc::clone(slots.entry(city).or_default()))
    }
}

/// Holds only the key's own slot across the source read.
fn fetch_once<T>(
    slot: &Mutex<Option<Arc<T>>>,
    key: DatasetKey,
    fetch: impl FnOnce() -> Result<T, DatasetError>,
    size: impl Fn(&T) -> usize,
) -> Result<Arc<T>, DatasetError> {
    let mut cached = slot.lock().map_err(|_| poisoned(key))?;
    if let Some(dataset) = cached.as_ref() {
        debug!(%key, "dataset cache hit");
        return Ok(Arc::clone(dataset));
    }

    let dataset = Arc::new(fetch()?);
    info!(%key, entries = size(&dataset), "dataset fetched");
    *cached = Some(Arc::clone(&dataset));
    Ok(dataset)
}

fn slot_filled<T>(slot: &Mutex<Option<T>>) -> bool {
    match slot.try_lock() {
        Ok(cached) => cached.is_some(),
        Err(TryLockError::WouldBlock) | Err(TryLockError::Poisoned(_)) => false,
    }
}

fn poisoned(key: DatasetKey) -> DatasetError {
    DatasetError::Unavailable {
        key,
        reason: "dataset cache lock poisoned".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordability::Region;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct CountingSource {
        region_loads: AtomicUsize,
        travel_loads: AtomicUsize,
        fail_regions: bool,
    }

    impl DatasetSource for CountingSource {
        fn regions(&self, city: City) -> Result<RegionDataset, DatasetError> {
            self.region_loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_regions {
                return Err(DatasetError::Unavailable {
                    key: DatasetKey::Regions(city),
                    reason: "offline".to_string(),
                });
            }
            Ok(RegionDataset::new(city, vec![Region::new("0150")])?)
        }

        fn travel_directory(&self) -> Result<TravelDirectory, DatasetError> {
            self.travel_loads.fetch_add(1, Ordering::SeqCst);
            Ok(TravelDirectory::default())
        }
    }

    #[test]
    fn each_key_is_fetched_once() {
        let source = Arc::new(CountingSource::default());
        let cache = DatasetCache::new(source.clone());

        let first = cache.regions(City::Oslo).expect("loads");
        let second = cache.regions(City::Oslo).expect("cached");
        assert!(Arc::ptr_eq(&first, &second));
        cache.regions(City::Bergen).expect("separate key");
        cache.travel_directory().expect("loads");
        cache.travel_directory().expect("cached");

        assert_eq!(source.region_loads.load(Ordering::SeqCst), 2);
        assert_eq!(source.travel_loads.load(Ordering::SeqCst), 1);
        assert!(cache.is_cached(DatasetKey::Regions(City::Oslo)));
        assert!(!cache.is_cached(DatasetKey::Regions(City::Drammen)));
    }

    #[test]
    fn failed_loads_are_retried() {
        let source = Arc::new(CountingSource {
            fail_regions: true,
            ..CountingSource::default()
        });
        let cache = DatasetCache::new(source.clone());

        assert!(cache.regions(City::Oslo).is_err());
        assert!(cache.regions(City::Oslo).is_err());
        assert_eq!(source.region_loads.load(Ordering::SeqCst), 2);
        assert!(!cache.is_cached(DatasetKey::Regions(City::Oslo)));
    }

    /// Oslo reads block until the test releases them; every other city answers at once.
    struct StalledOsloSource {
        entered: Mutex<Sender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl DatasetSource for StalledOsloSource {
        fn regions(&self, city: City) -> Result<RegionDataset, DatasetError> {
            if city == City::Oslo {
                if let Ok(entered) = self.entered.lock() {
                    let _ = entered.send(());
                }
                if let Ok(release) = self.release.lock() {
                    let _ = release.recv_timeout(Duration::from_secs(5));
                }
            }
            Ok(RegionDataset::new(city, vec![Region::new("5003")])?)
        }

        fn travel_directory(&self) -> Result<TravelDirectory, DatasetError> {
            Ok(TravelDirectory::default())
        }
    }

    #[test]
    fn slow_city_does_not_block_other_cities() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let cache = Arc::new(DatasetCache::new(Arc::new(StalledOsloSource {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        })));

        let oslo_cache = Arc::clone(&cache);
        let oslo =
            thread::spawn(move || oslo_cache.regions(City::Oslo).map(|dataset| dataset.city()));
        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("oslo fetch started");
        assert!(!cache.is_cached(DatasetKey::Regions(City::Oslo)));

        let started = Instant::now();
        let bergen = cache.regions(City::Bergen).expect("bergen loads");
        assert_eq!(bergen.city(), City::Bergen);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(cache.is_cached(DatasetKey::Regions(City::Bergen)));

        release_tx.send(()).expect("oslo still waiting");
        let oslo = oslo.join().expect("oslo thread");
        assert_eq!(oslo.expect("oslo loads"), City::Oslo);
        assert!(cache.is_cached(DatasetKey::Regions(City::Oslo)));
    }
}
