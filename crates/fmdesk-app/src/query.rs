// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ConsoleError, ConsoleResult};
use crate::model::EndpointDescriptor;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// View state driving one list fetch. Page numbers are taken as given; clamping
/// happens where pagination controls are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    pub page: i64,
    pub page_size: i64,
    pub search: String,
    pub filters: BTreeMap<String, String>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: String::new(),
            filters: BTreeMap::new(),
        }
    }
}

impl QueryState {
    pub fn with_page_size(page_size: i64) -> ConsoleResult<Self> {
        let mut state = Self::default();
        state.set_page_size(page_size)?;
        Ok(state)
    }

    pub fn set_page(&mut self, page: i64) {
        self.page = page;
    }

    pub fn set_page_size(&mut self, page_size: i64) -> ConsoleResult<()> {
        if page_size <= 0 {
            return Err(ConsoleError::validation(format!(
                "page size must be positive, got {page_size}"
            )));
        }
        self.page_size = page_size;
        self.reset();
        Ok(())
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.to_owned();
        self.reset();
    }

    /// An empty value clears the filter.
    pub fn set_filter(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.filters.remove(key);
        } else {
            self.filters.insert(key.to_owned(), value.to_owned());
        }
        self.reset();
    }

    pub fn clear_filter(&mut self, key: &str) {
        self.filters.remove(key);
        self.reset();
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.reset();
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Backend query parameters in request order: paging, search, then mapped filters.
    pub fn to_params(&self, endpoint: &EndpointDescriptor) -> ConsoleResult<Vec<(String, String)>> {
        let mut params = vec![
            ("page".to_owned(), self.page.to_string()),
            ("per_page".to_owned(), self.page_size.to_string()),
        ];

        let search = self.search.trim();
        if !search.is_empty() {
            let param = endpoint.search_param.ok_or_else(|| {
                ConsoleError::validation("this resource does not support search")
            })?;
            params.push((param.to_owned(), search.to_owned()));
        }

        for (key, value) in &self.filters {
            let param = endpoint.filter_param(key).ok_or_else(|| {
                let known = endpoint.filter_keys().collect::<Vec<_>>().join(", ");
                ConsoleError::validation(format!(
                    "unknown filter {key:?} -- supported filters: {known}"
                ))
            })?;
            params.push((param.to_owned(), value.clone()));
        }

        Ok(params)
    }
}
