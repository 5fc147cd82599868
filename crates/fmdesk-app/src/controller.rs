// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{
    ConsoleError, ConsoleResult, EntityId, ListPage, MutationCommand, MutationEvent,
    MutationOutcome, MutationRequest, MutationState, PageSlot, Pagination, QueryState,
    ResourceKind, SearchDebounce, SelectionSet, compute_window,
};

/// Remote side of a list screen. `fmdesk-api::Client` is the production implementation.
pub trait ResourceBackend {
    fn list(&self, kind: ResourceKind, query: &QueryState) -> ConsoleResult<ListPage<Value>>;

    fn get(&self, kind: ResourceKind, id: EntityId) -> ConsoleResult<Value>;

    fn mutate(&self, kind: ResourceKind, request: &MutationRequest)
    -> ConsoleResult<MutationOutcome>;
}

impl<B: ResourceBackend + ?Sized> ResourceBackend for &B {
    fn list(&self, kind: ResourceKind, query: &QueryState) -> ConsoleResult<ListPage<Value>> {
        (**self).list(kind, query)
    }

    fn get(&self, kind: ResourceKind, id: EntityId) -> ConsoleResult<Value> {
        (**self).get(kind, id)
    }

    fn mutate(
        &self,
        kind: ResourceKind,
        request: &MutationRequest,
    ) -> ConsoleResult<MutationOutcome> {
        (**self).mutate(kind, request)
    }
}

impl<B: ResourceBackend + ?Sized> ResourceBackend for Arc<B> {
    fn list(&self, kind: ResourceKind, query: &QueryState) -> ConsoleResult<ListPage<Value>> {
        (**self).list(kind, query)
    }

    fn get(&self, kind: ResourceKind, id: EntityId) -> ConsoleResult<Value> {
        (**self).get(kind, id)
    }

    fn mutate(
        &self,
        kind: ResourceKind,
        request: &MutationRequest,
    ) -> ConsoleResult<MutationOutcome> {
        (**self).mutate(kind, request)
    }
}

#[derive(Debug, Default)]
pub struct FetchSequence {
    issued: AtomicU64,
}

impl FetchSequence {
    fn next(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.latest() == ticket.sequence
    }
}

/// Snapshot of one fetch: which request it was and the query it ran with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub sequence: u64,
    pub kind: ResourceKind,
    pub query: QueryState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Fresh,
    Stale,
}

pub type BulkOutcome = Vec<(EntityId, ConsoleResult<MutationOutcome>)>;

pub struct ListController<B> {
    backend: B,
    kind: ResourceKind,
    query: QueryState,
    page: ListPage<Value>,
    selection: SelectionSet,
    mutation: MutationState,
    sequence: Arc<FetchSequence>,
    last_error: Option<ConsoleError>,
    search: SearchDebounce,
}

impl<B: ResourceBackend> ListController<B> {
    pub fn new(backend: B, kind: ResourceKind, query: QueryState) -> Self {
        Self {
            backend,
            kind,
            query,
            page: ListPage::default(),
            selection: SelectionSet::new(),
            mutation: MutationState::default(),
            sequence: Arc::new(FetchSequence::default()),
            last_error: None,
            search: SearchDebounce::default(),
        }
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search = SearchDebounce::new(delay);
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn page(&self) -> &ListPage<Value> {
        &self.page
    }

    pub fn items(&self) -> &[Value] {
        &self.page.items
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    pub fn mutation_state(&self) -> &MutationState {
        &self.mutation
    }

    pub fn last_error(&self) -> Option<&ConsoleError> {
        self.last_error.as_ref()
    }

    pub fn sequence(&self) -> Arc<FetchSequence> {
        Arc::clone(&self.sequence)
    }

    pub fn pagination(&self) -> Pagination {
        self.page
            .pagination_or_fallback(self.query.page, self.query.page_size)
    }

    pub fn window(&self) -> Vec<PageSlot> {
        let pagination = self.pagination();
        compute_window(
            pagination.clamp_page(self.query.page),
            pagination.total_pages,
        )
    }

    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket {
            sequence: self.sequence.next(),
            kind: self.kind,
            query: self.query.clone(),
        }
    }

    /// Applies a fetch result unless a newer fetch has been issued since.
    pub fn complete(
        &mut self,
        ticket: &FetchTicket,
        result: ConsoleResult<ListPage<Value>>,
    ) -> ConsoleResult<Applied> {
        if !self.sequence.is_current(ticket) {
            warn!(
                resource = self.kind.as_str(),
                ticket = ticket.sequence,
                latest = self.sequence.latest(),
                "discarding stale list response"
            );
            return Ok(Applied::Stale);
        }

        match result {
            Ok(page) => {
                debug!(
                    resource = self.kind.as_str(),
                    items = page.items.len(),
                    page = ticket.query.page,
                    "list refreshed"
                );
                self.page = page;
                self.last_error = None;
                Ok(Applied::Fresh)
            }
            Err(error) => {
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    pub fn refresh(&mut self) -> ConsoleResult<Applied> {
        let ticket = self.begin_fetch();
        let result = self.backend.list(self.kind, &ticket.query);
        self.complete(&ticket, result)
    }

    pub fn set_page(&mut self, page: i64) -> ConsoleResult<Applied> {
        self.query.set_page(page);
        self.refresh()
    }

    pub fn set_page_size(&mut self, page_size: i64) -> ConsoleResult<Applied> {
        self.query.set_page_size(page_size)?;
        self.refresh()
    }

    pub fn set_search(&mut self, search: &str) -> ConsoleResult<Applied> {
        self.query.set_search(search);
        self.refresh()
    }

    /// Records a keystroke-level search edit; nothing is fetched until it settles.
    pub fn type_search(&mut self, text: &str, now: Instant) {
        self.search.input(text, now);
    }

    pub fn search_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    /// Applies the typed search once its quiet period has passed.
    pub fn settle_search(&mut self, now: Instant) -> ConsoleResult<Option<Applied>> {
        match self.search.poll(now) {
            Some(text) => self.set_search(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Applies any pending search immediately.
    pub fn flush_search(&mut self) -> ConsoleResult<Option<Applied>> {
        match self.search.flush() {
            Some(text) => self.set_search(&text).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_filter(&mut self, key: &str, value: &str) -> ConsoleResult<Applied> {
        self.query.set_filter(key, value);
        self.refresh()
    }

    pub fn clear_filters(&mut self) -> ConsoleResult<Applied> {
        self.query.clear_filters();
        self.refresh()
    }

    pub fn get(&self, id: EntityId) -> ConsoleResult<Value> {
        self.backend.get(self.kind, id)
    }

    /// One request, then a refresh of the list when it succeeds.
    pub fn submit(&mut self, request: MutationRequest) -> ConsoleResult<MutationOutcome> {
        let (result, refresh) = self.mutate_once(&request)?;
        if refresh {
            self.refresh_after_mutation();
        }
        result
    }

    /// Deletes every selected id in ascending order and clears the selection.
    pub fn delete_selected(&mut self) -> ConsoleResult<BulkOutcome> {
        let ids: Vec<EntityId> = self.selection.iter().collect();
        let mut outcomes = Vec::with_capacity(ids.len());
        let mut any_succeeded = false;

        for id in ids {
            let (result, refresh) = self.mutate_once(&MutationRequest::delete(id))?;
            any_succeeded |= refresh;
            outcomes.push((id, result));
        }

        self.selection.clear();
        if any_succeeded {
            self.refresh_after_mutation();
        }
        Ok(outcomes)
    }

    fn mutate_once(
        &mut self,
        request: &MutationRequest,
    ) -> ConsoleResult<(ConsoleResult<MutationOutcome>, bool)> {
        let events = self
            .mutation
            .dispatch(MutationCommand::Submit(request.kind));
        if events.contains(&MutationEvent::Busy) {
            return Err(ConsoleError::validation(
                "another change is still being submitted -- wait for it to finish and retry",
            ));
        }

        let result = self.backend.mutate(self.kind, request);
        let resolution = result
            .as_ref()
            .map(|_| ())
            .map_err(ConsoleError::user_message);
        let events = self.mutation.dispatch(MutationCommand::Resolve(resolution));
        Ok((result, events.contains(&MutationEvent::RefreshRequested)))
    }

    fn refresh_after_mutation(&mut self) {
        if let Err(error) = self.refresh() {
            warn!(
                resource = self.kind.as_str(),
                %error,
                "refresh after mutation failed"
            );
        }
    }
}
