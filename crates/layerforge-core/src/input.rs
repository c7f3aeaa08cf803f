//! Pointer and keyboard input as delivered by the host.

use std::time::{Duration, Instant};

use kurbo::Point;
use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers { shift: false, ctrl: false, alt: false, meta: false };
    pub const SHIFT: Modifiers = Modifiers { shift: true, ctrl: false, alt: false, meta: false };
    pub const ALT: Modifiers = Modifiers { shift: false, ctrl: false, alt: true, meta: false };
}

/// A pointer sample in viewport (screen) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub position: Point,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    pub time: Instant,
}

impl PointerInput {
    pub fn new(position: Point, button: MouseButton, modifiers: Modifiers) -> Self {
        Self { position, button, modifiers, time: Instant::now() }
    }

    /// Primary-button sample without modifiers.
    pub fn primary(position: Point) -> Self {
        Self::new(position, MouseButton::Left, Modifiers::NONE)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn at(mut self, time: Instant) -> Self {
        self.time = time;
        self
    }
}

/// Keys the interaction engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Space,
    Other(String),
}

impl Key {
    /// Map a DOM-style key name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" => Key::Escape,
            "Delete" => Key::Delete,
            "Backspace" => Key::Backspace,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            " " | "Space" => Key::Space,
            other => Key::Other(other.to_string()),
        }
    }

    /// Unit direction of an arrow key in screen axes.
    pub fn arrow_direction(&self) -> Option<(f64, f64)> {
        match self {
            Key::ArrowUp => Some((0.0, -1.0)),
            Key::ArrowDown => Some((0.0, 1.0)),
            Key::ArrowLeft => Some((-1.0, 0.0)),
            Key::ArrowRight => Some((1.0, 0.0)),
            _ => None,
        }
    }
}

/// Detects double-clicks from successive presses.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    max_interval: Duration,
    max_distance: f64,
    last: Option<(Instant, Point)>,
}

impl ClickTracker {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            max_interval: Duration::from_millis(config.double_click_ms),
            max_distance: config.double_click_distance,
            last: None,
        }
    }

    /// Register a press; returns true when it completes a double-click.
    pub fn register(&mut self, position: Point, time: Instant) -> bool {
        if let Some((last_time, last_pos)) = self.last {
            let elapsed = time.saturating_duration_since(last_time);
            if elapsed < self.max_interval && last_pos.distance(position) < self.max_distance {
                // A third press starts a new sequence.
                self.last = None;
                return true;
            }
        }
        self.last = Some((time, position));
        false
    }
}
