use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор элемента страницы, который может удерживать захват указателя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureTarget(pub u64);

impl CaptureTarget {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Уведомление браузера о смене элемента, удерживающего захват
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureChange {
    /// `None` - захват потерян
    pub target: Option<CaptureTarget>,
    pub timestamp: std::time::Instant,
}

impl CaptureChange {
    pub fn new(target: Option<CaptureTarget>) -> Self {
        Self {
            target,
            timestamp: std::time::Instant::now(),
        }
    }

    pub fn locked(target: CaptureTarget) -> Self {
        Self::new(Some(target))
    }

    pub fn lost() -> Self {
        Self::new(None)
    }

    pub fn is_lost(&self) -> bool {
        self.target.is_none()
    }
}

impl fmt::Display for CaptureChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "captured by {}", target),
            None => write!(f, "capture lost"),
        }
    }
}

/// Положение окна браузера на экране
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPosition {
    pub x: i32,
    pub y: i32,
}

impl ScreenPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for ScreenPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_change_kinds() {
        let target = CaptureTarget::new(3);
        let locked = CaptureChange::locked(target);
        let lost = CaptureChange::lost();

        assert_eq!(locked.target, Some(target));
        assert!(!locked.is_lost());
        assert!(lost.is_lost());
        assert_eq!(locked.to_string(), "captured by target#3");
        assert_eq!(lost.to_string(), "capture lost");
    }
}
