//! Control tokens written to the device.

use std::fmt;

use crate::types::Field;

/// A device behavior the operator can switch on and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Obstacle and rain alarms.
    Alarms,
    /// Steering towards the strongest light.
    FollowLight,
}

impl Toggle {
    /// Returns the telemetry field in which the device reports this toggle.
    #[must_use]
    pub const fn state_field(self) -> Field {
        match self {
            Self::Alarms => Field::AlarmEnabled,
            Self::FollowLight => Field::FollowLightEnabled,
        }
    }
}

/// Fixed control tokens understood by the rover firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlToken {
    AlarmsOn,
    AlarmsOff,
    FollowLightOn,
    FollowLightOff,
}

impl ControlToken {
    /// Returns the token that switches `toggle` to the requested state.
    #[must_use]
    pub const fn new(toggle: Toggle, enable: bool) -> Self {
        match (toggle, enable) {
            (Toggle::Alarms, true) => Self::AlarmsOn,
            (Toggle::Alarms, false) => Self::AlarmsOff,
            (Toggle::FollowLight, true) => Self::FollowLightOn,
            (Toggle::FollowLight, false) => Self::FollowLightOff,
        }
    }

    /// Returns the token text, without the line delimiter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlarmsOn => "alarmas_on",
            Self::AlarmsOff => "alarmas_off",
            Self::FollowLightOn => "seguir_luz",
            Self::FollowLightOff => "no_seguir",
        }
    }
}

impl fmt::Display for ControlToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens() {
        assert_eq!(ControlToken::new(Toggle::Alarms, true).as_str(), "alarmas_on");
        assert_eq!(ControlToken::new(Toggle::Alarms, false).as_str(), "alarmas_off");
        assert_eq!(ControlToken::new(Toggle::FollowLight, true).as_str(), "seguir_luz");
        assert_eq!(ControlToken::new(Toggle::FollowLight, false).as_str(), "no_seguir");
    }

    #[test]
    fn test_state_fields() {
        assert_eq!(Toggle::Alarms.state_field(), Field::AlarmEnabled);
        assert_eq!(Toggle::FollowLight.state_field(), Field::FollowLightEnabled);
    }
}
