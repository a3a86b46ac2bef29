/// Refresh throttle - decides per frame whether a render target redraws.

/// Render once, then only after an explicit counter reset
pub const REFRESH_RATE_RENDER_ONCE: u32 = 0;
/// Render every frame
pub const REFRESH_RATE_RENDER_ON_EVERY_FRAME: u32 = 1;
/// Render every other frame
pub const REFRESH_RATE_RENDER_ON_EVERY_TWO_FRAMES: u32 = 2;

/// Frame-count throttle
///
/// `counter` is None until the first render. With a rate `R >= 1` the
/// decision is true on the first call and then every `R`th call. With rate 0
/// it is true on the first call only; the counter keeps climbing afterwards
/// and never meets the rate again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshThrottle {
    refresh_rate: u32,
    counter: Option<u32>,
}

impl RefreshThrottle {
    pub fn new(refresh_rate: u32) -> Self {
        Self {
            refresh_rate,
            counter: None,
        }
    }

    pub fn refresh_rate(&self) -> u32 {
        self.refresh_rate
    }

    /// Change the rate. Always forces the next decision to render.
    pub fn set_refresh_rate(&mut self, refresh_rate: u32) {
        self.refresh_rate = refresh_rate;
        self.reset();
    }

    /// Force the next decision to render
    pub fn reset(&mut self) {
        self.counter = None;
    }

    /// Whether the target has never rendered since the last reset
    pub fn is_pending(&self) -> bool {
        self.counter.is_none()
    }

    /// Decide for the current frame, advancing the counter
    pub fn should_render(&mut self) -> bool {
        match self.counter {
            None => {
                self.counter = Some(1);
                true
            }
            Some(counter) if counter == self.refresh_rate => {
                self.counter = Some(1);
                true
            }
            Some(counter) => {
                self.counter = Some(counter.saturating_add(1));
                false
            }
        }
    }
}

impl Default for RefreshThrottle {
    fn default() -> Self {
        Self::new(REFRESH_RATE_RENDER_ON_EVERY_FRAME)
    }
}

#[cfg(test)]
#[path = "refresh_throttle_tests.rs"]
mod tests;
