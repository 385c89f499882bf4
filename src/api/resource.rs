//! Per-component fetch state with cancellation and bounded retry.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::{AbortHandle, Abortable, FutureExt, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::{debug, error, warn};

use crate::reactive::{Runtime, Signal};

use super::FetchError;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum FetchState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(FetchError),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

type Loader<T> = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<T, FetchError>>>;

struct ResourceInner<T> {
    name: String,
    spawner: Rc<dyn LocalSpawn>,
    retries: u32,
    loader: RefCell<Option<Loader<T>>>,
    inflight: RefCell<Option<AbortHandle>>,
    generation: Cell<u64>,
}

impl<T> ResourceInner<T> {
    fn abort_inflight(&self) -> bool {
        match self.inflight.borrow_mut().take() {
            Some(handle) => {
                handle.abort();
                debug!(resource = %self.name, "superseded fetch aborted");
                true
            }
            None => false,
        }
    }
}

impl<T> Drop for ResourceInner<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.inflight.get_mut().take() {
            handle.abort();
        }
    }
}

/// An async value owned by one component.
///
/// Starting a load aborts the previous one, so a slow response can never
/// overwrite a newer one. Transient failures are retried up to `retries`
/// times before the state becomes [`FetchState::Failed`]. Dropping the last
/// clone aborts whatever is in flight.
pub struct Resource<T> {
    state: Signal<FetchState<T>>,
    inner: Rc<ResourceInner<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Resource<T> {
    pub fn new(runtime: &Runtime, name: &str, spawner: Rc<dyn LocalSpawn>, retries: u32) -> Self {
        Self {
            state: runtime.signal(FetchState::Idle),
            inner: Rc::new(ResourceInner {
                name: name.to_string(),
                spawner,
                retries,
                loader: RefCell::new(None),
                inflight: RefCell::new(None),
                generation: Cell::new(0),
            }),
        }
    }

    /// Tracked read.
    pub fn state(&self) -> FetchState<T> {
        self.state.get()
    }

    pub fn signal(&self) -> &Signal<FetchState<T>> {
        &self.state
    }

    pub fn is_inflight(&self) -> bool {
        self.inner.inflight.borrow().is_some()
    }

    /// Start loading with `loader`, which is kept for [`retry`](Self::retry).
    pub fn load(&self, loader: impl Fn() -> LocalBoxFuture<'static, Result<T, FetchError>> + 'static) {
        let loader: Loader<T> = Rc::new(loader);
        *self.inner.loader.borrow_mut() = Some(loader.clone());
        self.start(loader);
    }

    /// Run the last loader again. Returns false if nothing was ever loaded.
    pub fn retry(&self) -> bool {
        let loader = self.inner.loader.borrow().clone();
        match loader {
            Some(loader) => {
                debug!(resource = %self.inner.name, "retry");
                self.start(loader);
                true
            }
            None => false,
        }
    }

    /// Abort the fetch in flight, if any. The state is left as it is.
    pub fn abort(&self) -> bool {
        self.inner.generation.set(self.inner.generation.get() + 1);
        self.inner.abort_inflight()
    }

    fn start(&self, loader: Loader<T>) {
        self.inner.abort_inflight();
        let generation = self.inner.generation.get() + 1;
        self.inner.generation.set(generation);

        let (handle, registration) = AbortHandle::new_pair();
        *self.inner.inflight.borrow_mut() = Some(handle);
        self.state.set(FetchState::Loading);

        let retries = self.inner.retries;
        let name = self.inner.name.clone();
        let attempts = async move {
            let mut attempt = 0;
            loop {
                match loader().await {
                    Err(err) if err.is_transient() && attempt < retries => {
                        attempt += 1;
                        warn!(resource = %name, attempt, %err, "fetch failed, retrying");
                    }
                    result => break result,
                }
            }
        };

        let state = self.state.clone();
        let weak = Rc::downgrade(&self.inner);
        let task = Abortable::new(attempts, registration).map(move |outcome| {
            // Aborted: a newer load owns the state now.
            let Ok(result) = outcome else {
                return;
            };
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.generation.get() != generation {
                return;
            }
            inner.inflight.borrow_mut().take();
            match result {
                Ok(value) => {
                    debug!(resource = %inner.name, "fetch complete");
                    state.set(FetchState::Ready(value));
                }
                Err(err) => {
                    error!(resource = %inner.name, %err, "fetch failed");
                    state.set(FetchState::Failed(err));
                }
            }
        });

        if let Err(err) = self.inner.spawner.spawn_local(task) {
            error!(resource = %self.inner.name, %err, "could not spawn fetch");
            self.inner.inflight.borrow_mut().take();
            self.state
                .set(FetchState::Failed(FetchError::Network(format!("executor unavailable: {err}"))));
        }
    }
}

impl<T> std::fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.inner.name)
            .field("inflight", &self.inner.inflight.borrow().is_some())
            .finish()
    }
}
