use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

type Slot<T> = Mutex<Option<(u64, Shared<BoxFuture<'static, T>>)>>;

/// Deduplicating async guard: at most one execution of the guarded operation is
/// in flight, and every caller arriving while it runs awaits that same execution.
///
/// The execution empties the slot itself before its outcome is handed to anyone,
/// so a caller arriving after completion always starts a fresh one.
pub struct SingleFlight<T: Clone> {
    in_flight: Arc<Slot<T>>,
    generation: AtomicU64,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Join the in-flight execution, or start `operation` if none is running.
    pub async fn run<F, Fut>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut slot = lock(&self.in_flight);
            match slot.as_ref() {
                Some((_, existing)) => {
                    debug!("joining in-flight operation");
                    existing.clone()
                }
                None => {
                    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                    let owner = Arc::downgrade(&self.in_flight);
                    let execution = operation();
                    let started = async move {
                        let output = execution.await;
                        release(&owner, generation);
                        output
                    }
                    .boxed()
                    .shared();
                    *slot = Some((generation, started.clone()));
                    started
                }
            }
        };

        shared.await
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.in_flight).is_some()
    }
}

fn lock<T>(slot: &Slot<T>) -> MutexGuard<'_, Option<(u64, Shared<BoxFuture<'static, T>>)>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Empty the slot if it still holds execution `generation`.
fn release<T>(owner: &Weak<Slot<T>>, generation: u64) {
    if let Some(slot) = owner.upgrade() {
        let mut slot = lock(&slot);
        if slot.as_ref().is_some_and(|(current, _)| *current == generation) {
            *slot = None;
        }
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").finish_non_exhaustive()
    }
}
