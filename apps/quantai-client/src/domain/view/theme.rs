//! Dashboard theme and trend colors.

use std::sync::Arc;

use rust_decimal::Decimal;

/// Direction of the displayed percent change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendTone {
    /// Flat or positive.
    #[default]
    Up,
    /// Negative.
    Down,
}

impl TrendTone {
    /// Tone for a percent change. Unknown counts as flat.
    #[must_use]
    pub fn from_change(change_percent: Option<Decimal>) -> Self {
        match change_percent {
            Some(change) if change < Decimal::ZERO => Self::Down,
            _ => Self::Up,
        }
    }

    /// Hex color.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Up => "#00C805",
            Self::Down => "#FF5000",
        }
    }

    /// 24-bit RGB components of [`color`](Self::color).
    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Up => (0x00, 0xC8, 0x05),
            Self::Down => (0xFF, 0x50, 0x00),
        }
    }
}

/// Page-level colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Background color.
    pub background: &'static str,
    /// Foreground color.
    pub foreground: &'static str,
}

impl Theme {
    /// Black dashboard theme.
    pub const DASHBOARD: Self = Self {
        background: "#000000",
        foreground: "#FFFFFF",
    };
}

/// Surface a theme can be applied to (document root, terminal).
pub trait ThemeSink: Send + Sync {
    /// Apply `theme`.
    fn apply(&self, theme: &Theme);

    /// Restore the surface's own colors.
    fn reset(&self);
}

/// Applies a theme for as long as it is alive.
///
/// Dropping the scope resets the sink, on every exit path.
#[must_use = "the theme is reset as soon as the scope is dropped"]
pub struct ThemeScope {
    sink: Arc<dyn ThemeSink>,
}

impl ThemeScope {
    /// Apply `theme` to `sink`.
    pub fn enter(sink: Arc<dyn ThemeSink>, theme: &Theme) -> Self {
        sink.apply(theme);
        Self { sink }
    }
}

impl std::fmt::Debug for ThemeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeScope").finish_non_exhaustive()
    }
}

impl Drop for ThemeScope {
    fn drop(&mut self) {
        self.sink.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl ThemeSink for RecordingSink {
        fn apply(&self, theme: &Theme) {
            self.calls.lock().push(format!("apply {}", theme.background));
        }

        fn reset(&self) {
            self.calls.lock().push("reset".to_string());
        }
    }

    #[test]
    fn tone_follows_sign() {
        assert_eq!(TrendTone::from_change(Some(dec!(1.2))), TrendTone::Up);
        assert_eq!(TrendTone::from_change(Some(dec!(0))), TrendTone::Up);
        assert_eq!(TrendTone::from_change(Some(dec!(-0.01))), TrendTone::Down);
        assert_eq!(TrendTone::from_change(None), TrendTone::Up);
        assert_eq!(TrendTone::Down.color(), "#FF5000");
    }

    #[test]
    fn scope_resets_on_drop() {
        let sink = Arc::new(RecordingSink::default());
        {
            let _scope = ThemeScope::enter(sink.clone(), &Theme::DASHBOARD);
            assert_eq!(*sink.calls.lock(), vec!["apply #000000"]);
        }
        assert_eq!(*sink.calls.lock(), vec!["apply #000000", "reset"]);
    }
}
