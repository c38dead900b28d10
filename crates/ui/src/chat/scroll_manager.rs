use gpui::{Pixels, ScrollHandle, point, px};

/// Distance from the tail that still counts as "at the bottom".
const FOLLOW_THRESHOLD: Pixels = px(24.);
const SCROLL_DELTA_EPSILON: f32 = 1.0;

/// Keeps the transcript pinned to its newest line until the user scrolls away.
pub struct ScrollManager {
    scroll_handle: ScrollHandle,
    pending_scroll_to_bottom: bool,
    follow_bottom: bool,
    last_scroll_offset: Pixels,
    last_max_offset: Pixels,
}

impl ScrollManager {
    pub fn new() -> Self {
        Self {
            scroll_handle: ScrollHandle::new(),
            pending_scroll_to_bottom: false,
            follow_bottom: true,
            last_scroll_offset: Pixels::ZERO,
            last_max_offset: Pixels::ZERO,
        }
    }

    pub fn handle(&self) -> &ScrollHandle {
        &self.scroll_handle
    }

    pub fn is_following_bottom(&self) -> bool {
        self.follow_bottom
    }

    /// Content grew; scroll with it unless the user is reading older lines.
    pub fn follow_content(&mut self) {
        if self.follow_bottom || was_near_bottom(self.last_scroll_offset, self.last_max_offset) {
            self.pending_scroll_to_bottom = true;
        }
    }

    pub fn reset(&mut self) {
        self.last_scroll_offset = Pixels::ZERO;
        self.last_max_offset = Pixels::ZERO;
        self.follow_bottom = true;
        self.pending_scroll_to_bottom = true;
    }

    /// Called once per frame before applying any scroll.
    pub fn update_follow_state(&mut self) {
        let offset = self.scroll_handle.offset().y;
        let max_offset = self.scroll_handle.max_offset().height;
        self.follow_bottom = next_follow_state(FollowInputs {
            follow_bottom: self.follow_bottom,
            pending: self.pending_scroll_to_bottom,
            last_offset: self.last_scroll_offset,
            last_max_offset: self.last_max_offset,
            offset,
            max_offset,
        });
        self.last_scroll_offset = offset;
        self.last_max_offset = max_offset;
    }

    pub fn apply_pending_scroll(&mut self) -> bool {
        let should_scroll = self.follow_bottom || self.pending_scroll_to_bottom;

        if should_scroll {
            let max_offset = self.scroll_handle.max_offset().height;
            let current_x = self.scroll_handle.offset().x;
            let target_y = if max_offset > Pixels::ZERO {
                -max_offset
            } else {
                Pixels::ZERO
            };
            self.scroll_handle.set_offset(point(current_x, target_y));
        }

        self.pending_scroll_to_bottom = false;
        should_scroll
    }
}

impl Default for ScrollManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct FollowInputs {
    follow_bottom: bool,
    pending: bool,
    last_offset: Pixels,
    last_max_offset: Pixels,
    offset: Pixels,
    max_offset: Pixels,
}

fn next_follow_state(inputs: FollowInputs) -> bool {
    let offset_delta = f32::from(inputs.offset) - f32::from(inputs.last_offset);
    let max_delta = (f32::from(inputs.max_offset) - f32::from(inputs.last_max_offset)).abs();
    let content_size_changed = max_delta > SCROLL_DELTA_EPSILON;
    let user_scrolled_up = offset_delta > SCROLL_DELTA_EPSILON && !content_size_changed;
    let user_scrolled_down = offset_delta < -SCROLL_DELTA_EPSILON && !content_size_changed;

    if inputs.pending
        || (content_size_changed && was_near_bottom(inputs.last_offset, inputs.last_max_offset))
    {
        true
    } else if inputs.follow_bottom {
        !user_scrolled_up
    } else {
        user_scrolled_down && was_near_bottom(inputs.offset, inputs.max_offset)
    }
}

// Scrolling down makes the Y offset negative, so `offset + max` reaches 0 at the tail.
fn was_near_bottom(offset: Pixels, max_offset: Pixels) -> bool {
    if max_offset <= Pixels::ZERO {
        return true;
    }

    (offset + max_offset).abs() <= FOLLOW_THRESHOLD
}
