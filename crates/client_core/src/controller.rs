use std::marker::PhantomData;

use shared::protocol::Page;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::source::{DataSource, FetchError, Params};

/// Accumulated fetch state of one paged list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    /// Index of the next page to request, starting at 1.
    pub page_index: u32,
    pub page_size: u32,
    pub loading: bool,
    pub is_last_page: bool,
    pub error: Option<FetchError>,
    pub params: Params,
    /// Bumped on every reset; fetches started under an older generation are dropped.
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    Idle,
    Loading,
    Error,
    Exhausted,
}

impl<T> ListState<T> {
    fn fresh(page_size: u32, params: Params, generation: u64) -> Self {
        Self {
            items: Vec::new(),
            page_index: 1,
            page_size,
            loading: false,
            is_last_page: false,
            error: None,
            params,
            generation,
        }
    }

    pub fn phase(&self) -> ListPhase {
        if self.loading {
            ListPhase::Loading
        } else if self.error.is_some() {
            ListPhase::Error
        } else if self.is_last_page {
            ListPhase::Exhausted
        } else {
            ListPhase::Idle
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn start_fetch(&mut self) -> FetchTicket {
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            page_index: self.page_index,
            page_size: self.page_size,
            params: self.params.clone(),
        }
    }

    fn apply_page(&mut self, page: Page<T>) -> usize {
        let count = page.items.len();
        self.items.extend(page.items);
        self.is_last_page = page.is_last_page;
        self.page_index += 1;
        self.loading = false;
        self.error = None;
        count
    }

    fn apply_failure(&mut self, err: FetchError) {
        self.loading = false;
        self.error = Some(err);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    Exhausted,
    Uninitialized,
}

/// What a single fetch attempt did to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Appended { count: usize, is_last_page: bool },
    Failed(FetchError),
    Skipped(SkipReason),
    /// The fetch resolved after a reset and its result was dropped.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("list controller is already initialized; use reset to start over")]
    AlreadyInitialized,
    #[error("list controller has not been initialized")]
    NotInitialized,
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}

/// Clears `loading` if a fetch future is dropped before the source answers,
/// so the same page can be requested again.
struct InFlightGuard<'a, T> {
    state: &'a watch::Sender<Option<ListState<T>>>,
    generation: u64,
    armed: bool,
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let generation = self.generation;
        self.state.send_if_modified(|slot| match slot.as_mut() {
            Some(state) if state.generation == generation && state.loading => {
                state.loading = false;
                true
            }
            _ => false,
        });
    }
}

struct FetchTicket {
    generation: u64,
    page_index: u32,
    page_size: u32,
    params: Params,
}

/// Incrementally loads a paged resource into a [`ListState`].
///
/// At most one page request is in flight at a time. The state is published
/// through a watch channel, so the presentation layer can either poll
/// [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe) to transitions.
/// State is never locked across the fetch itself.
pub struct PaginatedListController<T, S> {
    source: S,
    label: String,
    state: watch::Sender<Option<ListState<T>>>,
    _item: PhantomData<fn() -> T>,
}

impl<T, S> PaginatedListController<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: DataSource<T>,
{
    pub fn new(source: S) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            source,
            label: "list".to_string(),
            state,
            _item: PhantomData,
        }
    }

    /// Name used in log records for this list.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Creates the list state and fetches the first page.
    pub async fn initialize(
        &self,
        page_size: u32,
        params: Params,
    ) -> Result<LoadOutcome, ControllerError> {
        if page_size == 0 {
            return Err(ControllerError::InvalidPageSize);
        }

        let mut ticket = Err(ControllerError::AlreadyInitialized);
        self.state.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            let state = slot.insert(ListState::fresh(page_size, params, 0));
            ticket = Ok(state.start_fetch());
            true
        });
        let ticket = ticket?;

        info!(list = %self.label, page_size, "initialized list");
        Ok(self.run_fetch(ticket).await)
    }

    /// Fetches the next page unless a fetch is in flight or the list is exhausted.
    pub async fn load_next(&self) -> LoadOutcome {
        let mut ticket = Err(SkipReason::Uninitialized);
        self.state.send_if_modified(|slot| {
            let Some(state) = slot.as_mut() else {
                return false;
            };
            if state.loading {
                ticket = Err(SkipReason::InFlight);
                return false;
            }
            if state.is_last_page {
                ticket = Err(SkipReason::Exhausted);
                return false;
            }
            ticket = Ok(state.start_fetch());
            true
        });

        match ticket {
            Ok(ticket) => self.run_fetch(ticket).await,
            Err(reason) => {
                debug!(list = %self.label, ?reason, "skipped page load");
                LoadOutcome::Skipped(reason)
            }
        }
    }

    /// Starts over with `params`, invalidating any fetch still in flight.
    pub async fn reset(&self, params: Params) -> Result<LoadOutcome, ControllerError> {
        let mut ticket = Err(ControllerError::NotInitialized);
        self.state.send_if_modified(|slot| {
            let Some(state) = slot.as_mut() else {
                return false;
            };
            *state = ListState::fresh(state.page_size, params, state.generation + 1);
            ticket = Ok(state.start_fetch());
            true
        });
        let ticket = ticket?;

        info!(
            list = %self.label,
            generation = ticket.generation,
            "reset list"
        );
        Ok(self.run_fetch(ticket).await)
    }

    /// Resets with the params currently in effect.
    pub async fn refresh(&self) -> Result<LoadOutcome, ControllerError> {
        let params = self
            .state
            .borrow()
            .as_ref()
            .map(|state| state.params.clone())
            .ok_or(ControllerError::NotInitialized)?;
        self.reset(params).await
    }

    /// Current state, or `None` before [`initialize`](Self::initialize).
    pub fn snapshot(&self) -> Option<ListState<T>> {
        (*self.state.borrow()).clone()
    }

    pub fn phase(&self) -> Option<ListPhase> {
        self.state.borrow().as_ref().map(ListState::phase)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ListState<T>>> {
        self.state.subscribe()
    }

    async fn run_fetch(&self, ticket: FetchTicket) -> LoadOutcome {
        debug!(
            list = %self.label,
            page_index = ticket.page_index,
            page_size = ticket.page_size,
            generation = ticket.generation,
            "fetching page"
        );
        let mut in_flight = InFlightGuard {
            state: &self.state,
            generation: ticket.generation,
            armed: true,
        };
        let result = self
            .source
            .fetch_page(ticket.page_index, ticket.page_size, &ticket.params)
            .await;
        in_flight.armed = false;

        let mut outcome = LoadOutcome::Discarded;
        self.state.send_if_modified(|slot| {
            let Some(state) = slot.as_mut() else {
                return false;
            };
            if state.generation != ticket.generation {
                return false;
            }
            match result {
                Ok(page) => {
                    let is_last_page = page.is_last_page;
                    let count = state.apply_page(page);
                    outcome = LoadOutcome::Appended {
                        count,
                        is_last_page,
                    };
                }
                Err(err) => {
                    outcome = LoadOutcome::Failed(err.clone());
                    state.apply_failure(err);
                }
            }
            true
        });

        match &outcome {
            LoadOutcome::Appended {
                count,
                is_last_page,
            } => debug!(
                list = %self.label,
                page_index = ticket.page_index,
                count,
                is_last_page,
                "appended page"
            ),
            LoadOutcome::Failed(err) => warn!(
                list = %self.label,
                page_index = ticket.page_index,
                error = %err,
                "page fetch failed"
            ),
            LoadOutcome::Discarded => debug!(
                list = %self.label,
                page_index = ticket.page_index,
                generation = ticket.generation,
                "dropped stale page"
            ),
            LoadOutcome::Skipped(_) => {}
        }
        outcome
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
