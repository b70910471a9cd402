use crate::core_modules::canvas::Color;
use crate::core_modules::interpreter::Presence;
use std::fmt;

/// The abstract traffic-light color.
///
/// The state is recomputed from scratch for every frame: there is no hysteresis,
/// debounce or timer, and no history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalState {
    #[default]
    Stop,
    Go,
}

impl SignalState {
    pub fn from_presence(presence: Presence) -> Self {
        if presence.is_present() {
            SignalState::Go
        } else {
            SignalState::Stop
        }
    }

    pub fn color(self) -> Color {
        match self {
            SignalState::Stop => Color::RED,
            SignalState::Go => Color::GREEN,
        }
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalState::Stop => write!(f, "STOP"),
            SignalState::Go => write!(f, "GO"),
        }
    }
}
