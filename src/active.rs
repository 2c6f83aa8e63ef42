/*!
 * Active-state resolution at render time.
 *
 * Everything here is a pure function of an immutable page slice and a time, so
 * many render workers can share one page sequence. Nothing here allocates.
 */

use crate::pages::{Page, Token};

/// Index of the page whose range contains `time_ms`, inclusive on both ends
///
/// Pages must be sorted and non-overlapping, as produced by the synthesizer.
/// When two pages touch, the shared instant belongs to the earlier page.
pub fn find_active_page_index(pages: &[Page], time_ms: u64) -> Option<usize> {
    let idx = pages.partition_point(|page| page.end_ms() < time_ms);
    pages
        .get(idx)
        .filter(|page| page.start_ms <= time_ms)
        .map(|_| idx)
}

/// The page active at `time_ms`, or `None` in a gap or outside all pages
pub fn find_active_page(pages: &[Page], time_ms: u64) -> Option<&Page> {
    find_active_page_index(pages, time_ms).map(|idx| &pages[idx])
}

/// Reveal progress of a token in `[0, 1]`
///
/// Zero-duration tokens jump from 0 to 1 once `time_ms` reaches their start.
pub fn token_progress(token: &Token, time_ms: u64) -> f64 {
    if time_ms < token.from_ms {
        return 0.0;
    }
    let elapsed = (time_ms - token.from_ms) as f64;
    let duration = token.duration_ms().max(1) as f64;
    (elapsed / duration).clamp(0.0, 1.0)
}

/// Convert a frame number to elapsed milliseconds; `None` for a non-positive fps
pub fn frame_to_ms(frame: u64, fps: f64) -> Option<u64> {
    if !fps.is_finite() || fps <= 0.0 {
        return None;
    }
    Some((frame as f64 / fps * 1000.0).floor() as u64)
}

/// A page split into at most two display rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLines<'a> {
    pub first: &'a [Token],
    pub second: &'a [Token],
}

impl<'a> PageLines<'a> {
    /// Non-empty rows in display order
    pub fn iter(self) -> impl Iterator<Item = &'a [Token]> {
        [self.first, self.second].into_iter().filter(|line| !line.is_empty())
    }

    pub fn len(self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(self) -> bool {
        self.first.is_empty() && self.second.is_empty()
    }
}

/// Split a page's tokens at `ceil(n / 2)` into two rows
pub fn split_into_lines(page: &Page) -> PageLines<'_> {
    let midpoint = page.tokens.len().div_ceil(2);
    let (first, second) = page.tokens.split_at(midpoint);
    PageLines { first, second }
}

/// Everything a renderer needs for one time sample
#[derive(Debug, Clone, Copy)]
pub struct ActiveFrame<'a> {
    pub page_index: usize,
    pub page: &'a Page,
    pub time_ms: u64,
    /// Token containing `time_ms`, or the last one that has started
    pub active_token: Option<usize>,
}

impl<'a> ActiveFrame<'a> {
    /// Tokens of the page paired with their reveal progress
    pub fn token_states(self) -> impl Iterator<Item = (&'a Token, f64)> {
        let time_ms = self.time_ms;
        self.page
            .tokens
            .iter()
            .map(move |token| (token, token_progress(token, time_ms)))
    }

    pub fn lines(self) -> PageLines<'a> {
        split_into_lines(self.page)
    }
}

/// Resolve the active page and token for a playback time
pub fn resolve(pages: &[Page], time_ms: u64) -> Option<ActiveFrame<'_>> {
    let page_index = find_active_page_index(pages, time_ms)?;
    let page = &pages[page_index];
    let started = page.tokens.partition_point(|token| token.from_ms <= time_ms);

    Some(ActiveFrame {
        page_index,
        page,
        time_ms,
        active_token: started.checked_sub(1),
    })
}
