use serde::{Deserialize, Serialize};
use std::fmt;

/// Кнопка указателя в терминах DOM `PointerEvent.button`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerButton {
    Primary,
    Auxiliary,
    Secondary,
    Other(u16),
}

impl PointerButton {
    /// Преобразовать индекс кнопки DOM (0 - основная, 1 - колесо, 2 - вторичная)
    pub fn from_dom(button: i16) -> Self {
        match button {
            0 => PointerButton::Primary,
            1 => PointerButton::Auxiliary,
            2 => PointerButton::Secondary,
            other => PointerButton::Other(other.max(0) as u16),
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, PointerButton::Primary)
    }
}

impl fmt::Display for PointerButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerButton::Primary => write!(f, "primary"),
            PointerButton::Auxiliary => write!(f, "auxiliary"),
            PointerButton::Secondary => write!(f, "secondary"),
            PointerButton::Other(code) => write!(f, "button#{}", code),
        }
    }
}

/// Событие движения указателя на уровне страницы
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMove {
    pub movement_x: f64,
    pub movement_y: f64,
    pub timestamp: std::time::Instant,
}

impl PointerMove {
    pub fn new(movement_x: f64, movement_y: f64) -> Self {
        Self {
            movement_x,
            movement_y,
            timestamp: std::time::Instant::now(),
        }
    }

    pub fn delta(&self) -> MotionDelta {
        MotionDelta::new(self.movement_x, self.movement_y)
    }
}

impl fmt::Display for PointerMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "move({}, {}) ({}ms ago)",
            self.movement_x,
            self.movement_y,
            self.timestamp.elapsed().as_millis()
        )
    }
}

/// Событие отпускания кнопки указателя на уровне страницы
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerRelease {
    pub button: PointerButton,
    pub timestamp: std::time::Instant,
}

impl PointerRelease {
    pub fn new(button: PointerButton) -> Self {
        Self {
            button,
            timestamp: std::time::Instant::now(),
        }
    }
}

impl fmt::Display for PointerRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "release({}) ({}ms ago)",
            self.button,
            self.timestamp.elapsed().as_millis()
        )
    }
}

/// Относительное смещение, которое сессия захвата отдаёт потребителю
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionDelta {
    pub x: f64,
    pub y: f64,
}

impl MotionDelta {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl fmt::Display for MotionDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Δ({:+}, {:+})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_from_dom() {
        assert_eq!(PointerButton::from_dom(0), PointerButton::Primary);
        assert_eq!(PointerButton::from_dom(1), PointerButton::Auxiliary);
        assert_eq!(PointerButton::from_dom(2), PointerButton::Secondary);
        assert_eq!(PointerButton::from_dom(4), PointerButton::Other(4));
        assert_eq!(PointerButton::from_dom(-1), PointerButton::Other(0));
        assert!(PointerButton::from_dom(0).is_primary());
        assert!(!PointerButton::from_dom(2).is_primary());
    }

    #[test]
    fn test_move_delta() {
        let event = PointerMove::new(5.0, -3.0);
        assert_eq!(event.delta(), MotionDelta::new(5.0, -3.0));
        assert!(!event.delta().is_zero());
        assert!(MotionDelta::default().is_zero());
    }

    #[test]
    fn test_delta_display() {
        assert_eq!(MotionDelta::new(1.5, -2.0).to_string(), "Δ(+1.5, -2)");
    }
}
