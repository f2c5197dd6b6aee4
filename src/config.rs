//! Engine configuration.

use crate::types::Rgba;

/// Lowest accepted frame rate.
pub const MIN_FPS: u32 = 1;
/// Highest accepted frame rate.
pub const MAX_FPS: u32 = 240;

/// Settings for an [`Engine`](crate::pipeline::Engine).
///
/// ```ignore
/// let config = EngineConfig::default()
///     .with_target_fps(30)
///     .with_mouse(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Frame rate cap for coalesced renders (default: 60).
    pub target_fps: u32,
    /// Render in the alternate screen (default: true).
    pub alternate_screen: bool,
    /// Enable SGR mouse tracking (default: true).
    pub mouse: bool,
    /// Wrap each frame in synchronized-output markers (default: true).
    pub synchronized_output: bool,
    /// Stop the engine on Ctrl+C (default: true).
    pub exit_on_ctrl_c: bool,
    /// Color the back buffer is cleared to each frame.
    pub background: Rgba,
    pub selection_bg: Rgba,
    pub selection_fg: Rgba,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            alternate_screen: true,
            mouse: true,
            synchronized_output: true,
            exit_on_ctrl_c: true,
            background: Rgba::TERMINAL_DEFAULT,
            selection_bg: Rgba::rgb(60, 90, 160),
            selection_fg: Rgba::WHITE,
        }
    }
}

impl EngineConfig {
    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = clamp_fps(fps);
        self
    }

    pub fn with_alternate_screen(mut self, enabled: bool) -> Self {
        self.alternate_screen = enabled;
        self
    }

    pub fn with_mouse(mut self, enabled: bool) -> Self {
        self.mouse = enabled;
        self
    }

    pub fn with_synchronized_output(mut self, enabled: bool) -> Self {
        self.synchronized_output = enabled;
        self
    }

    pub fn with_exit_on_ctrl_c(mut self, enabled: bool) -> Self {
        self.exit_on_ctrl_c = enabled;
        self
    }

    pub fn with_background(mut self, bg: Rgba) -> Self {
        self.background = bg;
        self
    }

    pub fn with_selection_colors(mut self, bg: Rgba, fg: Rgba) -> Self {
        self.selection_bg = bg;
        self.selection_fg = fg;
        self
    }
}

#[inline]
pub fn clamp_fps(fps: u32) -> u32 {
    fps.clamp(MIN_FPS, MAX_FPS)
}
