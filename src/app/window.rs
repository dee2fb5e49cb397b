//! Platform-independent window abstraction.
//!
//! The frame loop talks to the windowing system only through [`WindowHost`],
//! which keeps the library free of any particular windowing backend.

use std::time::Duration;

use super::input::Input;

/// How long the loop idles per iteration while the framebuffer is empty.
pub const MINIMIZED_IDLE: Duration = Duration::from_millis(16);

pub trait WindowHost {
    /// Whether the user asked to close the window.
    fn close_requested(&self) -> bool;

    /// Drains pending window events into `input`.
    fn poll_events(&mut self, input: &mut Input);

    /// Current framebuffer size in physical pixels. Zero while minimized.
    fn framebuffer_size(&self) -> (u32, u32);

    /// Called instead of rendering while the framebuffer is empty. Hosts
    /// that can block on their event queue should do so here.
    fn wait_while_minimized(&mut self) {
        std::thread::sleep(MINIMIZED_IDLE);
    }
}
