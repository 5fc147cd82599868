// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use fmdesk_app::{ConsoleResult, EntityId, GENERIC_FAILURE, ListPage, QueryState, ResourceKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace_span;

use crate::{Client, envelope};

impl Client {
    /// One page of `kind` for `query`. The query is only read.
    pub fn fetch<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        query: &QueryState,
    ) -> ConsoleResult<ListPage<T>> {
        let _span = trace_span!("fetch", resource = kind.as_str(), page = query.page).entered();
        let endpoint = kind.endpoint();

        let mut url = self.context.url(endpoint.collection_path)?;
        url.query_pairs_mut()
            .extend_pairs(query.to_params(&endpoint)?);

        let (_, body) = self.send(
            "GET",
            url.as_str(),
            self.http.get(url.clone()),
            GENERIC_FAILURE,
        )?;
        envelope::check_application(&body)?;
        envelope::list_page(&body, &endpoint, query.page, query.page_size)
    }

    pub fn fetch_one(&self, kind: ResourceKind, id: EntityId) -> ConsoleResult<Value> {
        let _span = trace_span!("fetch_one", resource = kind.as_str(), id = id.get()).entered();
        let endpoint = kind.endpoint();

        let url = self.context.url(&endpoint.member_path(id))?;
        let (_, body) = self.send(
            "GET",
            url.as_str(),
            self.http.get(url.clone()),
            GENERIC_FAILURE,
        )?;
        envelope::check_application(&body)?;
        envelope::extract_record(&body, endpoint.wrapper_key)
    }
}
