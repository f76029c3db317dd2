//! Incremental search sessions: debounce, cancellation and stale-result discard.
//!
//! A [`QuerySession`] is driven by input events in arrival order. Every input
//! bumps a generation counter and cancels the previous pending query; queries
//! are issued after a quiet period and their results are applied only when
//! they carry the current generation. Queries run on spawned tokio tasks, so a
//! session must live inside a tokio runtime.

use crate::config::SearchConfig;
use crate::format::{DisplayList, ResultRow};
use crate::search::{NormalizedQuery, QueryEngine};
use futures::{Stream, StreamExt};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a session's result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No query; the list is empty.
    Idle,
    /// A query for the current generation is waiting or running.
    Pending,
    /// The current generation's results are shown.
    Displaying,
}

/// Results of one issued query, tagged with the generation that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub generation: u64,
    pub query: String,
    pub rows: Vec<ResultRow>,
}

/// What happened when an outcome was offered to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The displayed list changed.
    Displayed,
    /// Current generation, but identical rows were already shown.
    Unchanged,
    /// Older generation or cancelled session; dropped.
    Stale,
}

/// Events from the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// The input text changed. `seq` orders events from the UI.
    Changed { text: String, seq: u64 },
    /// The input field was cleared.
    Clear,
    /// The search UI was closed.
    Close,
}

struct InFlightQuery {
    cancel: CancellationToken,
}

/// Per-search-box state owned by the incremental controller.
pub struct QuerySession {
    engine: QueryEngine,
    limit: usize,
    debounce: Duration,
    generation: u64,
    input: String,
    state: SessionState,
    displayed: DisplayList,
    in_flight: Option<InFlightQuery>,
    recent: LruCache<String, Vec<ResultRow>>,
    last_seq: Option<u64>,
    results_tx: mpsc::UnboundedSender<QueryOutcome>,
    results_rx: mpsc::UnboundedReceiver<QueryOutcome>,
}

impl std::fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySession")
            .field("generation", &self.generation)
            .field("input", &self.input)
            .field("state", &self.state)
            .field("in_flight", &self.in_flight.is_some())
            .field("recent_len", &self.recent.len())
            .finish()
    }
}

impl QuerySession {
    pub fn new(engine: QueryEngine, config: &SearchConfig) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let capacity = NonZeroUsize::new(config.result_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            engine,
            limit: config.effective_limit(None),
            debounce: config.debounce(),
            generation: 0,
            input: String::new(),
            state: SessionState::Idle,
            displayed: DisplayList::Empty,
            in_flight: None,
            recent: LruCache::new(capacity),
            last_seq: None,
            results_tx,
            results_rx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn displayed(&self) -> &DisplayList {
        &self.displayed
    }

    /// Handles an input change.
    ///
    /// Invalidates every earlier generation. Empty input returns the session to
    /// idle; anything else schedules a query after the debounce interval. The
    /// previous list stays displayed until the new results arrive.
    pub fn on_input(&mut self, text: impl Into<String>) {
        let text = text.into();
        let Some(query) = NormalizedQuery::parse(&text) else {
            self.clear();
            return;
        };

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        self.cancel_in_flight();
        self.input = text;
        self.state = SessionState::Pending;

        let query = query.as_str().to_string();
        if let Some(rows) = self.recent.get(&query) {
            tracing::trace!("Session cache hit for '{}' (generation {})", query, generation);
            let _ = self.results_tx.send(QueryOutcome {
                generation,
                query,
                rows: rows.clone(),
            });
            return;
        }

        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlightQuery {
            cancel: cancel.clone(),
        });

        let engine = self.engine.clone();
        let results_tx = self.results_tx.clone();
        let debounce = self.debounce;
        let limit = self.limit;

        tokio::spawn(async move {
            if debounce > Duration::ZERO {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = sleep(debounce) => {}
                }
            } else if cancel.is_cancelled() {
                return;
            }

            let rows: Vec<ResultRow> = engine
                .search(&query, limit)
                .into_iter()
                .map(ResultRow::from)
                .collect();

            if cancel.is_cancelled() {
                return;
            }

            let _ = results_tx.send(QueryOutcome {
                generation,
                query,
                rows,
            });
        });
    }

    /// Offers a query outcome to the session.
    ///
    /// Only the current generation is applied; anything older is discarded so
    /// out-of-order completions never overwrite newer results.
    pub fn apply(&mut self, outcome: QueryOutcome) -> Applied {
        if outcome.generation != self.generation || self.state != SessionState::Pending {
            tracing::trace!(
                "Discarding stale results for '{}' (generation {}, current {})",
                outcome.query,
                outcome.generation,
                self.generation
            );
            return Applied::Stale;
        }

        self.in_flight = None;
        self.state = SessionState::Displaying;
        self.recent.put(outcome.query.clone(), outcome.rows.clone());

        let next = DisplayList::from_rows(outcome.query, outcome.rows);
        if next == self.displayed {
            return Applied::Unchanged;
        }
        self.displayed = next;
        Applied::Displayed
    }

    /// Waits for the pending query and applies it.
    ///
    /// Returns `None` immediately when nothing is pending. Stale outcomes that
    /// arrive first are skipped.
    pub async fn next_update(&mut self) -> Option<&DisplayList> {
        while self.state == SessionState::Pending {
            let outcome = self.results_rx.recv().await?;
            if self.apply(outcome) != Applied::Stale {
                return Some(&self.displayed);
            }
        }
        None
    }

    /// Clears the input: back to idle, all outstanding generations invalid.
    pub fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.cancel_in_flight();
        self.input.clear();
        self.state = SessionState::Idle;
        self.displayed = DisplayList::Empty;
    }

    /// Closes the search UI, cancelling anything outstanding.
    pub fn close(mut self) {
        self.clear();
        tracing::trace!("Session closed at generation {}", self.generation);
    }

    /// Runs the session over a stream of input events until it closes or the
    /// stream ends, sending every changed result list to `sink`.
    ///
    /// Events are handled in arrival order; a `Changed` event whose `seq` is not
    /// newer than the last one seen is ignored.
    pub async fn drive<S>(mut self, mut events: S, sink: mpsc::UnboundedSender<DisplayList>)
    where
        S: Stream<Item = InputEvent> + Unpin,
    {
        loop {
            tokio::select! {
                event = events.next() => {
                    match event {
                        None | Some(InputEvent::Close) => break,
                        Some(InputEvent::Clear) => {
                            let was_idle = self.state == SessionState::Idle;
                            self.clear();
                            if !was_idle && sink.send(DisplayList::Empty).is_err() {
                                break;
                            }
                        }
                        Some(InputEvent::Changed { text, seq }) => {
                            if self.last_seq.is_some_and(|last| seq <= last) {
                                tracing::trace!("Ignoring out-of-order input event {}", seq);
                                continue;
                            }
                            self.last_seq = Some(seq);
                            let was_idle = self.state == SessionState::Idle;
                            self.on_input(text);
                            if self.state == SessionState::Idle
                                && !was_idle
                                && sink.send(DisplayList::Empty).is_err()
                            {
                                break;
                            }
                        }
                    }
                }
                Some(outcome) = self.results_rx.recv() => {
                    if self.apply(outcome) == Applied::Displayed
                        && sink.send(self.displayed.clone()).is_err()
                    {
                        break;
                    }
                }
            }
        }
        self.close();
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, SymbolKind};
    use crate::search::Index;
    use assert2::{check, let_assert};
    use std::sync::Arc;

    fn session(debounce_ms: u64) -> QuerySession {
        let index = Index::build(vec![
            Record::new(1, "mutex", &["pmem", "obj"], "m.html", SymbolKind::Type),
            Record::new(2, "mutex_base", &[], "mb.html", SymbolKind::Type),
            Record::new(3, "make_persistent", &["pmem", "obj"], "mp.html", SymbolKind::Function),
        ])
        .index;
        let config = SearchConfig {
            debounce_ms,
            ..SearchConfig::default()
        };
        QuerySession::new(QueryEngine::new(Arc::new(index)), &config)
    }

    fn outcome(generation: u64, query: &str) -> QueryOutcome {
        QueryOutcome {
            generation,
            query: query.to_string(),
            rows: vec![],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounced_typing_displays_last_query() {
        let mut session = session(80);
        session.on_input("m");
        session.on_input("mu");
        session.on_input("mutex");
        check!(session.state() == SessionState::Pending);
        check!(session.generation() == 3);

        let_assert!(Some(list) = session.next_update().await);
        check!(list.query() == Some("mutex"));
        check!(list.rows().len() == 2);
        check!(list.rows()[0].qualified_path == "pmem::obj::mutex");
        check!(session.state() == SessionState::Displaying);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_discarded() {
        let mut session = session(80);
        session.on_input("ma");
        session.on_input("mu");
        check!(session.generation() == 2);

        check!(session.apply(outcome(2, "mu")) == Applied::Displayed);
        check!(session.apply(outcome(1, "ma")) == Applied::Stale);
        check!(session.displayed().query() == Some("mu"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_pending_query() {
        let mut session = session(80);
        session.on_input("mutex");
        session.clear();
        check!(session.state() == SessionState::Idle);

        tokio::time::sleep(Duration::from_secs(1)).await;
        check!(session.next_update().await.is_none());
        check!(*session.displayed() == DisplayList::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_input_is_a_clear() {
        let mut session = session(0);
        session.on_input("mutex");
        let_assert!(Some(_) = session.next_update().await);
        session.on_input("   ");
        check!(session.state() == SessionState::Idle);
        check!(session.input().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_matches_is_explicit() {
        let mut session = session(0);
        session.on_input("zzz");
        let_assert!(Some(list) = session.next_update().await);
        check!(list.is_no_matches());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_query_is_served_from_cache() {
        let mut session = session(80);
        session.on_input("mutex");
        let_assert!(Some(_) = session.next_update().await);

        session.on_input("make");
        check!(session.next_update().await.is_some());

        let before = tokio::time::Instant::now();
        session.on_input("Mutex");
        let_assert!(Some(list) = session.next_update().await);
        check!(list.query() == Some("mutex"));
        check!(before.elapsed() < Duration::from_millis(80));
    }
}
