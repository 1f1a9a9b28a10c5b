//! Page windowing for listing screens.
//!
//! Two policies exist side by side. Server-paginated screens track a page
//! number against a backend-reported total ([`PageState`]); infinite-scroll
//! screens hold the full result in memory and show a growing prefix of it
//! ([`InfiniteWindow`]).

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_BUTTONS: usize = 7;
const MIN_BUTTONS: usize = 5;

pub const INITIAL_DISPLAY_COUNT: usize = 10;
pub const DISPLAY_INCREMENT: usize = 5;

/// Position in a server-paginated result.
///
/// `current_page` is 1-based and `page_size` is never zero; every way of
/// building one (including deserializing) upholds both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PageStateWire")]
pub struct PageState {
    current_page: usize,
    page_size: usize,
    total_count: usize,
}

#[derive(Deserialize)]
struct PageStateWire {
    current_page: usize,
    page_size: usize,
    #[serde(default)]
    total_count: usize,
}

impl From<PageStateWire> for PageState {
    fn from(wire: PageStateWire) -> Self {
        let mut state = PageState::new(wire.page_size).starting_at(wire.current_page);
        state.set_total(wire.total_count);
        state
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PageState {
    /// Page 1 of an as-yet unknown total. A zero page size is bumped to 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            current_page: 1,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    /// Ask for `page` before the total is known; `set_total` clamps it later.
    pub fn starting_at(mut self, page: usize) -> Self {
        self.current_page = page.max(1);
        self
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn total_pages(&self) -> usize {
        self.total_count.div_ceil(self.page_size)
    }

    /// Record the backend's total, keeping the current page in range.
    pub fn set_total(&mut self, total_count: usize) {
        self.total_count = total_count;
        self.current_page = self.current_page.clamp(1, self.total_pages().max(1));
    }

    /// Jump to `page`, clamped to the known page range. Returns whether the
    /// page actually changed, i.e. whether a fetch is needed.
    pub fn go_to(&mut self, page: usize) -> bool {
        let target = page.clamp(1, self.total_pages().max(1));
        let changed = target != self.current_page;
        self.current_page = target;
        changed
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn next(&mut self) -> bool {
        self.has_next() && self.go_to(self.current_page + 1)
    }

    pub fn previous(&mut self) -> bool {
        self.has_previous() && self.go_to(self.current_page - 1)
    }

    pub fn range(&self) -> PageRange {
        if self.total_count == 0 {
            return PageRange {
                start: 0,
                end: 0,
                total: 0,
            };
        }
        let start = (self.current_page - 1) * self.page_size + 1;
        let end = (self.current_page * self.page_size).min(self.total_count);
        PageRange {
            start: start.min(end),
            end,
            total: self.total_count,
        }
    }

    /// "Showing 21–40 of 87 results".
    pub fn summary(&self) -> String {
        self.range().to_string()
    }

    pub fn buttons(&self, max_buttons: usize) -> Vec<PageButton> {
        page_buttons(self.current_page, self.total_pages(), max_buttons)
    }
}

/// 1-based inclusive item range shown on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Showing {}–{} of {} results", self.start, self.end, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    Page(usize),
    Ellipsis,
}

/// Page-number strip for `current` out of `total_pages`.
///
/// Every page is shown when they fit in `max_buttons`. Otherwise the first
/// and last page are always present, a window of pages is centered on
/// `current`, and an ellipsis marks each gap.
pub fn page_buttons(current: usize, total_pages: usize, max_buttons: usize) -> Vec<PageButton> {
    let max_buttons = max_buttons.max(MIN_BUTTONS);
    if total_pages <= max_buttons {
        return (1..=total_pages).map(PageButton::Page).collect();
    }

    let current = current.clamp(1, total_pages);
    // First, last and two ellipsis slots are reserved.
    let window = max_buttons - 4;
    let half = window / 2;

    let mut start = current.saturating_sub(half).clamp(2, total_pages - 1);
    let mut end = (start + window - 1).min(total_pages - 1);
    if end - start + 1 < window {
        start = (end + 1).saturating_sub(window).max(2);
    }

    // Absorb an ellipsis that would hide a single page.
    if start == 3 {
        start = 2;
    }
    if end == total_pages - 2 {
        end = total_pages - 1;
    }

    let mut buttons = vec![PageButton::Page(1)];
    if start > 2 {
        buttons.push(PageButton::Ellipsis);
    }
    buttons.extend((start..=end).map(PageButton::Page));
    if end < total_pages - 1 {
        buttons.push(PageButton::Ellipsis);
    }
    buttons.push(PageButton::Page(total_pages));
    buttons
}

/// Growing prefix of an in-memory result for infinite scrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfiniteWindow {
    display_count: usize,
    initial: usize,
    step: usize,
}

impl Default for InfiniteWindow {
    fn default() -> Self {
        Self::new(INITIAL_DISPLAY_COUNT, DISPLAY_INCREMENT)
    }
}

impl InfiniteWindow {
    pub fn new(initial: usize, step: usize) -> Self {
        let initial = initial.max(1);
        Self {
            display_count: initial,
            initial,
            step: step.max(1),
        }
    }

    pub fn display_count(&self) -> usize {
        self.display_count
    }

    /// Number of items actually rendered out of `len`.
    pub fn visible(&self, len: usize) -> usize {
        self.display_count.min(len)
    }

    pub fn has_more(&self, len: usize) -> bool {
        self.display_count < len
    }

    /// Show one more step, never beyond `len` and never shrinking.
    /// Returns whether anything new became visible.
    pub fn grow(&mut self, len: usize) -> bool {
        if !self.has_more(len) {
            return false;
        }
        self.display_count = (self.display_count + self.step).min(len);
        true
    }

    /// Back to the initial count; called whenever filter or sort changes.
    pub fn reset(&mut self) {
        self.display_count = self.initial;
    }

    /// Scroll handler: grow when the viewport bottom is within `threshold`
    /// of the content end.
    pub fn on_scroll(
        &mut self,
        scroll_offset: f64,
        viewport_height: f64,
        content_height: f64,
        threshold: f64,
        len: usize,
    ) -> bool {
        near_bottom(scroll_offset, viewport_height, content_height, threshold) && self.grow(len)
    }
}

pub fn near_bottom(
    scroll_offset: f64,
    viewport_height: f64,
    content_height: f64,
    threshold: f64,
) -> bool {
    scroll_offset + viewport_height >= content_height - threshold
}
