//! UI Theme - icons and colors used by [`Output`](super::Output)

use crossterm::style::Color;

/// Visual constants for terminal output.
#[derive(Debug, Clone, Default)]
pub struct Theme {
    /// Colors for different UI elements
    pub colors: ColorScheme,
    /// Status icons
    pub icons: Icons,
}

/// Color scheme for UI elements
#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Section headers
    pub header: Color,
    /// Verbose detail lines
    pub secondary: Color,
    /// Informational messages
    pub info: Color,
    /// Success states
    pub success: Color,
    /// Warning states
    pub warning: Color,
    /// Error states
    pub error: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::White,
            secondary: Color::DarkGrey,
            info: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

/// Status icons for different states
#[derive(Debug, Clone)]
pub struct Icons {
    /// Stage header (●)
    pub active: &'static str,
    /// Completed state transition (○)
    pub step: &'static str,
    /// Success (✓)
    pub success: &'static str,
    /// Error (✗)
    pub error: &'static str,
    /// Warning (⚠)
    pub warning: &'static str,
    /// Info (ℹ)
    pub info: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            active: "●",
            step: "○",
            success: "✓",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
        }
    }
}
