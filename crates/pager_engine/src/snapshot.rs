use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use pager_core::{
    GenerationalViewportHint, LoadParams, LoadState, LoadType, Page, PageEvent, PagingConfig,
    PagingError, PagingState, ViewportHint, WindowState,
};
use pager_logging::{pager_debug, pager_error, pager_info, pager_trace, pager_warn};
use tokio::sync::{mpsc, watch, Mutex, Notify};
use tokio_util::sync::CancellationToken;

use crate::{PageEventStream, PageKey, PageValue, PagingSource, RemoteMediatorAccessor};

const EVENT_BUFFER: usize = 64;

/// One generation of a paged window over a [`PagingSource`].
///
/// Loading starts when [`PageFetcherSnapshot::page_events`] is called.
/// Consumers steer it with
/// [`add_hint`](Self::add_hint) and [`retry`](Self::retry); an
/// [`invalidate`](Self::invalidate) ends the generation, after which the caller
/// builds a new snapshot, typically keyed from [`refresh_key`](Self::refresh_key).
pub struct PageFetcherSnapshot<K: PageKey, V: PageValue> {
    initial_key: Option<K>,
    source: Arc<dyn PagingSource<K, V>>,
    mediator: Option<RemoteMediatorAccessor<K, V>>,
    trigger_remote_refresh: bool,
    shared: Arc<Shared<K, V>>,
    collected: AtomicBool,
}

impl<K: PageKey, V: PageValue> PageFetcherSnapshot<K, V> {
    pub fn new(
        initial_key: Option<K>,
        source: Arc<dyn PagingSource<K, V>>,
        config: PagingConfig,
    ) -> Result<Self, PagingError> {
        Self::with_mediator(initial_key, source, config, None, false)
    }

    /// Snapshot backed by a remote mediator. With `trigger_remote_refresh`, a
    /// remote refresh is launched before the first local load.
    pub fn with_mediator(
        initial_key: Option<K>,
        source: Arc<dyn PagingSource<K, V>>,
        config: PagingConfig,
        mediator: Option<RemoteMediatorAccessor<K, V>>,
        trigger_remote_refresh: bool,
    ) -> Result<Self, PagingError> {
        config.validate()?;
        if config.jump_threshold.is_some() && !source.jumping_supported() {
            return Err(PagingError::JumpingUnsupported);
        }
        let shared = Arc::new(Shared::new(config, mediator.is_some()));
        Ok(Self {
            initial_key,
            source,
            mediator,
            trigger_remote_refresh,
            shared,
            collected: AtomicBool::new(false),
        })
    }

    /// Starts loading and returns the event stream. Only one stream may be
    /// collected per snapshot, and only from inside a tokio runtime.
    pub fn page_events(&self) -> Result<PageEventStream<V>, PagingError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(PagingError::NoRuntime);
        }
        if self.collected.swap(true, Ordering::SeqCst) {
            return Err(PagingError::AlreadyCollected);
        }
        let (events, receiver) = mpsc::channel(EVENT_BUFFER);
        let driver = Driver {
            shared: self.shared.clone(),
            source: self.source.clone(),
            mediator: self.mediator.clone(),
            initial_key: self.initial_key.clone(),
            events,
        };
        pager_info!(
            "starting paging snapshot with key {:?} (remote: {})",
            self.initial_key,
            self.mediator.is_some()
        );
        driver.start(self.trigger_remote_refresh);
        Ok(PageEventStream::new(
            receiver,
            self.shared.fatal.clone(),
            self.shared.cancel.clone().drop_guard(),
        ))
    }

    /// Records where the consumer last accessed the list. Never blocks.
    pub fn add_hint(&self, hint: ViewportHint) {
        *self
            .shared
            .last_hint
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hint);
        self.shared.hints.send_replace(Some(hint));
    }

    /// Retries every errored load. Repeated calls before the retry is handled
    /// collapse into one.
    pub fn retry(&self) {
        pager_info!("retry requested");
        self.shared.retry.notify_one();
    }

    /// Ends this generation; the caller is expected to build a new snapshot.
    pub fn invalidate(&self) {
        self.shared.invalidate();
    }

    pub fn is_invalidated(&self) -> bool {
        self.shared.invalidated.load(Ordering::SeqCst)
    }

    /// Stops every task of this snapshot and ends the event stream.
    pub fn close(&self) {
        pager_info!("closing paging snapshot");
        self.shared.cancel.cancel();
    }

    /// The window anchored at the last consumer hint, or `None` until the
    /// consumer has sent a hint and a page is loaded.
    pub async fn refresh_key_info(&self) -> Option<PagingState<K, V>> {
        let hint = self.shared.last_hint()?;
        let state = self.shared.state.lock().await;
        if state.page_count() == 0 {
            return None;
        }
        Some(state.current_paging_state(Some(&hint)))
    }

    /// Initial key for the snapshot that replaces this one.
    pub async fn refresh_key(&self) -> Option<K> {
        let info = self.refresh_key_info().await?;
        self.source.refresh_key(&info)
    }
}

/// State shared between the snapshot handle and its tasks.
struct Shared<K, V> {
    config: PagingConfig,
    state: Mutex<WindowState<K, V>>,
    hints: watch::Sender<Option<ViewportHint>>,
    prepend_generation: watch::Sender<u32>,
    append_generation: watch::Sender<u32>,
    retry: Notify,
    cancel: CancellationToken,
    last_hint: StdMutex<Option<ViewportHint>>,
    fatal: Arc<StdMutex<Option<PagingError>>>,
    invalidated: AtomicBool,
    hints_started: AtomicBool,
}

impl<K, V> Shared<K, V> {
    fn new(config: PagingConfig, has_remote_state: bool) -> Self {
        Self {
            config,
            state: Mutex::new(WindowState::new(config, has_remote_state)),
            hints: watch::channel(None).0,
            prepend_generation: watch::channel(0).0,
            append_generation: watch::channel(0).0,
            retry: Notify::new(),
            cancel: CancellationToken::new(),
            last_hint: StdMutex::new(None),
            fatal: Arc::new(StdMutex::new(None)),
            invalidated: AtomicBool::new(false),
            hints_started: AtomicBool::new(false),
        }
    }

    fn last_hint(&self) -> Option<ViewportHint> {
        *self.last_hint.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation_channel(&self, load_type: LoadType) -> &watch::Sender<u32> {
        match load_type {
            LoadType::Prepend => &self.prepend_generation,
            _ => &self.append_generation,
        }
    }

    /// Pushes the window's edge generations to the hint collectors.
    fn publish_generations(&self, state: &WindowState<K, V>) {
        for load_type in [LoadType::Prepend, LoadType::Append] {
            let generation = state.generation(load_type);
            self.generation_channel(load_type).send_if_modified(|current| {
                if *current == generation {
                    return false;
                }
                *current = generation;
                true
            });
        }
    }

    fn invalidate(&self) {
        if !self.invalidated.swap(true, Ordering::SeqCst) {
            pager_info!("paging snapshot invalidated");
        }
        self.cancel.cancel();
    }

    fn fail(&self, err: PagingError) {
        pager_error!("paging snapshot stopped: {}", err);
        let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if fatal.is_none() {
            *fatal = Some(err);
        }
        self.cancel.cancel();
    }
}

/// Runs the loading tasks of one collected snapshot.
struct Driver<K: PageKey, V: PageValue> {
    shared: Arc<Shared<K, V>>,
    source: Arc<dyn PagingSource<K, V>>,
    mediator: Option<RemoteMediatorAccessor<K, V>>,
    initial_key: Option<K>,
    events: mpsc::Sender<PageEvent<V>>,
}

impl<K: PageKey, V: PageValue> Clone for Driver<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            source: self.source.clone(),
            mediator: self.mediator.clone(),
            initial_key: self.initial_key.clone(),
            events: self.events.clone(),
        }
    }
}

impl<K: PageKey, V: PageValue> Driver<K, V> {
    /// Spawns `task` under the snapshot's cancellation token. An error ends the
    /// whole snapshot.
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Result<(), PagingError>> + Send + 'static,
    {
        let shared = self.shared.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shared.cancel.cancelled() => {}
                result = task => {
                    if let Err(err) = result {
                        shared.fail(err);
                    }
                }
            }
        });
    }

    fn start(self, trigger_remote_refresh: bool) {
        let driver = self.clone();
        self.spawn(async move {
            if trigger_remote_refresh && driver.mediator.is_some() {
                driver.launch_boundary_call(LoadType::Refresh);
            }
            let retries = driver.clone();
            driver.spawn(retries.consume_retries());

            if driver.initial_load().await? {
                driver.start_consuming_hints();
            }
            Ok(())
        });
    }

    async fn emit(&self, event: PageEvent<V>) {
        if self.events.send(event).await.is_err() {
            pager_debug!("page event stream dropped; closing snapshot");
            self.shared.cancel.cancel();
        }
    }

    /// Stores `state` and emits an update if the cell changed.
    async fn set_state(
        &self,
        window: &mut WindowState<K, V>,
        load_type: LoadType,
        from_mediator: bool,
        state: LoadState,
    ) {
        if window
            .load_states_mut()
            .set(load_type, from_mediator, state.clone())
        {
            self.emit(PageEvent::LoadStateUpdate {
                load_type,
                from_mediator,
                state,
            })
            .await;
        }
    }

    /// Loads the refresh page. Returns whether it was applied.
    async fn initial_load(&self) -> Result<bool, PagingError> {
        {
            let mut window = self.shared.state.lock().await;
            self.set_state(&mut window, LoadType::Refresh, false, LoadState::Loading)
                .await;
        }
        let params = LoadParams::new(
            LoadType::Refresh,
            self.initial_key.clone(),
            &self.shared.config,
        );
        pager_debug!("loading refresh page with key {:?}", params.key);

        let page = match self.source.load(params).await {
            Ok(page) => page,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                pager_warn!("refresh load failed: {}", err);
                let mut window = self.shared.state.lock().await;
                self.set_state(&mut window, LoadType::Refresh, false, LoadState::Error(err))
                    .await;
                return Ok(false);
            }
        };

        let ended_edges: Vec<LoadType> = [
            (LoadType::Prepend, page.prev_key.is_none()),
            (LoadType::Append, page.next_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(load_type, ended)| ended.then_some(load_type))
        .collect();

        {
            let mut window = self.shared.state.lock().await;
            let applied = window.insert(0, LoadType::Refresh, page)?;
            self.shared.publish_generations(&window);
            let states = window.load_states_mut();
            states.set(LoadType::Refresh, false, LoadState::INCOMPLETE);
            for load_type in &ended_edges {
                // With a mediator the edge stays open until the boundary call reports.
                let edge_state = if self.mediator.is_some() {
                    LoadState::INCOMPLETE
                } else {
                    LoadState::COMPLETE
                };
                states.set(*load_type, false, edge_state);
            }
            if applied {
                let event = window.page_event(LoadType::Refresh)?;
                self.emit(event).await;
            }
        }

        if self.mediator.is_some() {
            for load_type in ended_edges {
                self.launch_boundary_call(load_type);
            }
        }
        Ok(true)
    }

    fn start_consuming_hints(&self) {
        if self.shared.hints_started.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(threshold) = self.shared.config.jump_threshold {
            self.spawn(self.clone().watch_for_jumps(threshold));
        }
        for load_type in [LoadType::Prepend, LoadType::Append] {
            let slot = Arc::new(HintSlot::default());
            self.spawn(self.clone().collect_hints(load_type, slot.clone()));
            self.spawn(self.clone().load_hints(load_type, slot));
        }
    }

    /// Tags consumer hints with the edge generation and coalesces them into
    /// `slot`, which the edge's loader drains.
    async fn collect_hints(
        self,
        load_type: LoadType,
        slot: Arc<HintSlot>,
    ) -> Result<(), PagingError> {
        let mut generations = self.shared.generation_channel(load_type).subscribe();
        let mut hints = self.shared.hints.subscribe();
        let mut coalesced = GenerationalViewportHint::initial(load_type);

        loop {
            let generation = *generations.borrow_and_update();
            let skip_generation = {
                let mut window = self.shared.state.lock().await;
                let current = window.load_states().get(load_type, false);
                if current.is_complete() {
                    true
                } else {
                    if !current.is_error() {
                        window
                            .load_states_mut()
                            .set(load_type, false, LoadState::INCOMPLETE);
                    }
                    false
                }
            };
            if skip_generation {
                pager_debug!(
                    "{} complete; waiting for generation {}",
                    load_type,
                    generation + 1
                );
            }

            // Only generation 0 acts on the hint that was current when it started.
            let current_hint = *hints.borrow_and_update();
            if generation == 0 && !skip_generation {
                if let Some(hint) = current_hint {
                    coalesced = coalesced
                        .coalesce(GenerationalViewportHint::new(generation, hint), load_type);
                    coalesced = slot.offer(coalesced);
                }
            }

            loop {
                tokio::select! {
                    changed = generations.changed() => {
                        if changed.is_err() {
                            return Ok(());
                        }
                        break;
                    }
                    changed = hints.changed(), if !skip_generation => {
                        if changed.is_err() {
                            return Ok(());
                        }
                        let Some(hint) = *hints.borrow_and_update() else {
                            continue;
                        };
                        coalesced = coalesced
                            .coalesce(GenerationalViewportHint::new(generation, hint), load_type);
                        coalesced = slot.offer(coalesced);
                    }
                }
            }
        }
    }

    async fn load_hints(
        self,
        load_type: LoadType,
        slot: Arc<HintSlot>,
    ) -> Result<(), PagingError> {
        loop {
            let hint = slot.take().await;
            self.do_load(load_type, hint).await?;
        }
    }

    /// Loads pages toward `load_type` until the hint's prefetch window is
    /// filled, the edge ends, a load fails or a drop supersedes the generation.
    async fn do_load(
        &self,
        load_type: LoadType,
        hint: GenerationalViewportHint,
    ) -> Result<(), PagingError> {
        let mut load_key = {
            let mut window = self.shared.state.lock().await;
            let key = window.next_load_key(load_type, hint.generation, &hint.hint);
            if key.is_some() {
                self.set_state(&mut window, load_type, false, LoadState::Loading)
                    .await;
            }
            key
        };
        let mut end_of_pagination_reached = false;

        while let Some(key) = load_key {
            let params = LoadParams::new(load_type, Some(key.clone()), &self.shared.config);
            pager_debug!("loading {} page with key {:?}", load_type, key);

            let page = match self.source.load(params).await {
                Ok(page) => page,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    pager_warn!("{} load failed: {}", load_type, err);
                    self.fail_edge(load_type, hint.hint, err).await;
                    return Ok(());
                }
            };

            let continuation = edge_key(load_type, &page);
            if !self.source.key_reuse_supported() && continuation == Some(&key) {
                let err = PagingError::KeyReuse {
                    load_type,
                    key: format!("{key:?}"),
                };
                pager_warn!("{}", err);
                self.fail_edge(load_type, hint.hint, err).await;
                return Ok(());
            }
            let ends_edge = continuation.is_none();

            let mut window = self.shared.state.lock().await;
            if !window.insert(hint.generation, load_type, page)? {
                pager_debug!(
                    "dropping stale {} page from generation {}",
                    load_type,
                    hint.generation
                );
                break;
            }
            end_of_pagination_reached |= ends_edge;

            let drop_type = load_type.opposite();
            if let Some(info) = window.drop_info(drop_type, &hint.hint) {
                pager_debug!("dropping {} {} page(s)", info.page_count, drop_type);
                let event =
                    window.drop_pages(drop_type, info.page_count, info.placeholders_remaining)?;
                self.shared.publish_generations(&window);
                self.emit(event).await;
            }

            load_key = window.next_load_key(load_type, hint.generation, &hint.hint);
            if load_key.is_none() && !window.load_states().get(load_type, false).is_error() {
                window.load_states_mut().set(
                    load_type,
                    false,
                    LoadState::not_loading(end_of_pagination_reached),
                );
            }
            let event = window.page_event(load_type)?;
            self.emit(event).await;
            drop(window);

            if ends_edge && self.mediator.is_some() {
                self.launch_boundary_call(load_type);
            }
        }
        Ok(())
    }

    /// Records a failed edge load and keeps its hint for the next retry.
    async fn fail_edge(&self, load_type: LoadType, hint: ViewportHint, err: PagingError) {
        let mut window = self.shared.state.lock().await;
        window.stash_failed_hint(load_type, hint);
        self.set_state(&mut window, load_type, false, LoadState::Error(err))
            .await;
    }

    fn launch_boundary_call(&self, load_type: LoadType) {
        let driver = self.clone();
        self.spawn(async move { driver.boundary_call(load_type).await });
    }

    async fn boundary_call(&self, load_type: LoadType) -> Result<(), PagingError> {
        let Some(mediator) = &self.mediator else {
            return Ok(());
        };
        let paging_state = {
            let mut window = self.shared.state.lock().await;
            self.set_state(&mut window, load_type, true, LoadState::Loading)
                .await;
            window.current_paging_state(self.shared.last_hint().as_ref())
        };

        match mediator.load(load_type, paging_state).await {
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                let mut window = self.shared.state.lock().await;
                self.set_state(&mut window, load_type, true, LoadState::Error(err))
                    .await;
            }
            Ok(success) => {
                let mut window = self.shared.state.lock().await;
                // Remote refresh only reports completion through the next local refresh.
                let complete = success.end_of_pagination_reached && load_type != LoadType::Refresh;
                window
                    .load_states_mut()
                    .set(load_type, true, LoadState::not_loading(complete));
                if load_type != LoadType::Refresh {
                    // Zero-item page carries the new remote state through the insert path.
                    let generation = window.generation(load_type);
                    if window.insert(generation, load_type, Page::empty())? {
                        let event = window.page_event(load_type)?;
                        self.emit(event).await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn consume_retries(self) -> Result<(), PagingError> {
        loop {
            self.shared.retry.notified().await;

            let errored = {
                let window = self.shared.state.lock().await;
                window
                    .load_states()
                    .errors()
                    .into_iter()
                    .map(|(load_type, from_mediator)| {
                        (load_type, from_mediator, window.failed_hint(load_type))
                    })
                    .collect::<Vec<_>>()
            };
            if errored.is_empty() {
                pager_debug!("retry ignored; nothing has failed");
            }

            for (load_type, from_mediator, failed_hint) in errored {
                pager_info!(
                    "retrying {} ({})",
                    load_type,
                    if from_mediator { "remote" } else { "local" }
                );
                if from_mediator {
                    self.launch_boundary_call(load_type);
                    continue;
                }
                match load_type {
                    LoadType::Refresh => {
                        if self.initial_load().await? {
                            self.start_consuming_hints();
                        }
                    }
                    LoadType::Prepend | LoadType::Append => {
                        let hint =
                            failed_hint.ok_or(PagingError::MissingRetryHint(load_type))?;
                        self.shared.hints.send_replace(Some(hint));
                    }
                }
            }
        }
    }

    async fn watch_for_jumps(self, threshold: usize) -> Result<(), PagingError> {
        let mut hints = self.shared.hints.subscribe();
        loop {
            let hint = *hints.borrow_and_update();
            if let Some(hint) = hint {
                let offset = self.shared.state.lock().await.hint_offset(&hint);
                let jumped = offset.filter(|offset| offset.unsigned_abs() >= threshold as u64);
                if let Some(offset) = jumped {
                    pager_info!("hint {:?} jumped {} items past the window", hint, offset);
                    self.shared.invalidate();
                    return Ok(());
                }
            }
            if hints.changed().await.is_err() {
                return Ok(());
            }
        }
    }
}

/// Single-slot handoff from an edge's hint collector to its loader.
///
/// A retry hint stays marked as such until the loader takes it, even if newer
/// ordinary hints overwrite the slot first.
#[derive(Default)]
struct HintSlot {
    pending: StdMutex<Option<GenerationalViewportHint>>,
    ready: Notify,
}

impl HintSlot {
    /// Replaces the pending hint and returns the accumulator to keep folding
    /// into. The retry mark is handed over exactly once.
    fn offer(&self, hint: GenerationalViewportHint) -> GenerationalViewportHint {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let mut offered = hint;
        if let Some(previous) = *pending {
            if previous.hint.from_retry && previous.generation == hint.generation {
                offered.hint.from_retry = true;
            }
        }
        pager_trace!("offering hint {:?}", offered);
        *pending = Some(offered);
        drop(pending);
        self.ready.notify_one();

        let mut accumulated = hint;
        accumulated.hint.from_retry = false;
        accumulated
    }

    async fn take(&self) -> GenerationalViewportHint {
        loop {
            self.ready.notified().await;
            let taken = self
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(hint) = taken {
                return hint;
            }
        }
    }
}

fn edge_key<K, V>(load_type: LoadType, page: &Page<K, V>) -> Option<&K> {
    match load_type {
        LoadType::Prepend => page.prev_key.as_ref(),
        _ => page.next_key.as_ref(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(generation: u32, index_in_page: i32) -> GenerationalViewportHint {
        GenerationalViewportHint::new(generation, ViewportHint::new(0, index_in_page))
    }

    #[tokio::test]
    async fn retry_mark_is_handed_over_once() {
        let slot = HintSlot::default();
        let retried = GenerationalViewportHint::new(0, ViewportHint::new(0, 9).for_retry());

        let accumulated = slot.offer(retried);
        assert!(!accumulated.hint.from_retry);
        assert!(slot.take().await.hint.from_retry);

        slot.offer(accumulated);
        assert!(!slot.take().await.hint.from_retry);
    }

    #[tokio::test]
    async fn pending_retry_survives_overwrite() {
        let slot = HintSlot::default();
        slot.offer(GenerationalViewportHint::new(0, ViewportHint::new(0, 9).for_retry()));
        slot.offer(at(0, 8));

        let taken = slot.take().await;
        assert_eq!(taken.hint.index_in_page, 8);
        assert!(taken.hint.from_retry);
    }

    #[tokio::test]
    async fn newer_generation_drops_pending_retry() {
        let slot = HintSlot::default();
        slot.offer(GenerationalViewportHint::new(0, ViewportHint::new(0, 9).for_retry()));
        slot.offer(at(1, 3));

        assert_eq!(slot.take().await, at(1, 3));
    }
}
