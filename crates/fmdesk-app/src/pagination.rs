// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Up to this many pages every button is shown.
pub const FULL_WINDOW_MAX: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSlot {
    Page(i64),
    Ellipsis,
}

impl fmt::Display for PageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(page) => write!(f, "{page}"),
            Self::Ellipsis => f.write_str("…"),
        }
    }
}

/// Page-button layout: first page, a window around the current page, last page,
/// with ellipses over the gaps. Out-of-range current pages are clamped.
pub fn compute_window(current_page: i64, total_pages: i64) -> Vec<PageSlot> {
    if total_pages <= 0 {
        return Vec::new();
    }
    if total_pages <= FULL_WINDOW_MAX {
        return (1..=total_pages).map(PageSlot::Page).collect();
    }

    let last = total_pages;
    let current = current_page.clamp(1, last);
    let mut window = Window::default();

    window.page(1);

    if current <= 4 {
        for page in 2..=3.min(last - 1) {
            window.page(page);
        }
    } else {
        window.ellipsis();
    }

    if current > 3 && current < last - 2 {
        for page in current - 1..=current + 1 {
            window.page(page);
        }
    }

    if current < last - 3 {
        window.ellipsis();
    } else {
        for page in (last - 2).max(2)..last {
            window.page(page);
        }
    }

    window.page(last);
    window.slots
}

pub fn render_window(slots: &[PageSlot], current_page: i64) -> String {
    slots
        .iter()
        .map(|slot| match slot {
            PageSlot::Page(page) if *page == current_page => format!("[{page}]"),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Default)]
struct Window {
    slots: Vec<PageSlot>,
    highest: i64,
}

impl Window {
    fn page(&mut self, page: i64) {
        if page <= self.highest {
            return;
        }
        self.highest = page;
        self.slots.push(PageSlot::Page(page));
    }

    fn ellipsis(&mut self) {
        self.slots.push(PageSlot::Ellipsis);
    }
}
