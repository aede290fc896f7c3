//! Telemetry fields reported by the rover and the last-known-value store.
//!
//! The microcontroller prints one JSON object per line. Each object carries
//! any subset of the keys below; keys it omits say nothing about the
//! corresponding reading.
//!
//! ```text
//! {"temperature":22,"humedity":55}
//! {"distance_front":12,"distance_back":40}
//! {"light_direction":"LEFT"}
//! {"alarm_status":true,"follow_light":false}
//! ```

use std::fmt;

use serde::Deserialize;

/// Placeholder rendered for a field that has never been observed.
pub const UNKNOWN: &str = "??";

/// A telemetry field tracked by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Ambient temperature in °C.
    Temperature,
    /// Relative humidity in %.
    Humidity,
    /// Obstacle distance ahead in cm.
    DistanceFront,
    /// Obstacle distance behind in cm.
    DistanceBack,
    /// Side the strongest light comes from.
    LightDirection,
    /// Light sensor reading.
    LightIntensity,
    /// Steering position.
    Steering,
    /// Microphone level.
    SoundLevel,
    /// Rain sensor level.
    RainLevel,
    /// Last manoeuvre performed.
    LastAction,
    /// Whether the alarms are armed.
    AlarmEnabled,
    /// Whether light following is active.
    FollowLightEnabled,
}

impl Field {
    /// All fields, in summary order.
    pub const ALL: [Self; 12] = [
        Self::Temperature,
        Self::Humidity,
        Self::DistanceFront,
        Self::DistanceBack,
        Self::LightDirection,
        Self::LightIntensity,
        Self::Steering,
        Self::LastAction,
        Self::SoundLevel,
        Self::RainLevel,
        Self::AlarmEnabled,
        Self::FollowLightEnabled,
    ];

    /// Returns the JSON key the device uses for this field.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humedity",
            Self::DistanceFront => "distance_front",
            Self::DistanceBack => "distance_back",
            Self::LightDirection => "light_direction",
            Self::LightIntensity => "light_intensity",
            Self::Steering => "steering_status",
            Self::SoundLevel => "sound_level",
            Self::RainLevel => "rain_level",
            Self::LastAction => "last_action",
            Self::AlarmEnabled => "alarm_status",
            Self::FollowLightEnabled => "follow_light",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single observed value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Numeric reading, shown as the device sent it.
    Number(f64),
    /// Free-form text reading.
    Text(String),
    /// On/off state.
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// The fields carried by one telemetry line.
///
/// A key with a value of the wrong type (or `null`) is treated as absent
/// without affecting the other keys of the line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DecodedLine {
    #[serde(default, deserialize_with = "lenient::number")]
    pub temperature: Option<f64>,
    #[serde(rename = "humedity")]
    #[serde(default, deserialize_with = "lenient::number")]
    pub humidity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub distance_front: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub distance_back: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub light_direction: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub light_intensity: Option<f64>,
    #[serde(rename = "steering_status")]
    #[serde(default, deserialize_with = "lenient::text")]
    pub steering: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sound_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub rain_level: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_action: Option<String>,
    #[serde(rename = "alarm_status")]
    #[serde(default, deserialize_with = "lenient::flag")]
    pub alarm_enabled: Option<bool>,
    #[serde(rename = "follow_light")]
    #[serde(default, deserialize_with = "lenient::flag")]
    pub follow_light_enabled: Option<bool>,
}

impl DecodedLine {
    /// Returns true if the line carries no recognized field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|&field| !self.contains(field))
    }

    /// Returns true if the line carries the given field.
    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        match field {
            Field::Temperature => self.temperature.is_some(),
            Field::Humidity => self.humidity.is_some(),
            Field::DistanceFront => self.distance_front.is_some(),
            Field::DistanceBack => self.distance_back.is_some(),
            Field::LightDirection => self.light_direction.is_some(),
            Field::LightIntensity => self.light_intensity.is_some(),
            Field::Steering => self.steering.is_some(),
            Field::SoundLevel => self.sound_level.is_some(),
            Field::RainLevel => self.rain_level.is_some(),
            Field::LastAction => self.last_action.is_some(),
            Field::AlarmEnabled => self.alarm_enabled.is_some(),
            Field::FollowLightEnabled => self.follow_light_enabled.is_some(),
        }
    }

    /// Returns an on/off field carried by this line.
    #[must_use]
    pub const fn flag(&self, field: Field) -> Option<bool> {
        match field {
            Field::AlarmEnabled => self.alarm_enabled,
            Field::FollowLightEnabled => self.follow_light_enabled,
            _ => None,
        }
    }

    /// Returns the fields present in this line, in summary order.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|&field| self.contains(field))
            .collect()
    }
}

/// Last-known value of every telemetry field.
///
/// Starts empty and only ever moves forward: a merge overwrites the fields
/// present in the incoming line and leaves every other field as it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    temperature: Option<f64>,
    humidity: Option<f64>,
    distance_front: Option<f64>,
    distance_back: Option<f64>,
    light_direction: Option<String>,
    light_intensity: Option<f64>,
    steering: Option<String>,
    sound_level: Option<f64>,
    rain_level: Option<f64>,
    last_action: Option<String>,
    alarm_enabled: Option<bool>,
    follow_light_enabled: Option<bool>,
}

fn update<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl TelemetrySnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the fields carried by one decoded line.
    pub fn merge(&mut self, line: DecodedLine) {
        update(&mut self.temperature, line.temperature);
        update(&mut self.humidity, line.humidity);
        update(&mut self.distance_front, line.distance_front);
        update(&mut self.distance_back, line.distance_back);
        update(&mut self.light_direction, line.light_direction);
        update(&mut self.light_intensity, line.light_intensity);
        update(&mut self.steering, line.steering);
        update(&mut self.sound_level, line.sound_level);
        update(&mut self.rain_level, line.rain_level);
        update(&mut self.last_action, line.last_action);
        update(&mut self.alarm_enabled, line.alarm_enabled);
        update(&mut self.follow_light_enabled, line.follow_light_enabled);
    }

    /// Returns the last observed value of a field, or `None` if it was never seen.
    #[must_use]
    pub fn read(&self, field: Field) -> Option<FieldValue> {
        let number = |v: Option<f64>| v.map(FieldValue::Number);
        let text = |v: Option<&String>| v.cloned().map(FieldValue::Text);
        let flag = |v: Option<bool>| v.map(FieldValue::Flag);

        match field {
            Field::Temperature => number(self.temperature),
            Field::Humidity => number(self.humidity),
            Field::DistanceFront => number(self.distance_front),
            Field::DistanceBack => number(self.distance_back),
            Field::LightDirection => text(self.light_direction.as_ref()),
            Field::LightIntensity => number(self.light_intensity),
            Field::Steering => text(self.steering.as_ref()),
            Field::SoundLevel => number(self.sound_level),
            Field::RainLevel => number(self.rain_level),
            Field::LastAction => text(self.last_action.as_ref()),
            Field::AlarmEnabled => flag(self.alarm_enabled),
            Field::FollowLightEnabled => flag(self.follow_light_enabled),
        }
    }

    /// Returns an on/off field, or `None` if it was never seen.
    #[must_use]
    pub const fn flag(&self, field: Field) -> Option<bool> {
        match field {
            Field::AlarmEnabled => self.alarm_enabled,
            Field::FollowLightEnabled => self.follow_light_enabled,
            _ => None,
        }
    }

    /// Renders a field for display, using [`UNKNOWN`] if it was never seen.
    #[must_use]
    pub fn display(&self, field: Field) -> String {
        self.read(field)
            .map_or_else(|| UNKNOWN.to_owned(), |value| value.to_string())
    }

    /// Returns true if no field has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Formats every field into the full status report.
    #[must_use]
    pub fn summary(&self) -> String {
        let switch = |value: Option<bool>, on: &str, off: &str| match value {
            Some(true) => on.to_owned(),
            Some(false) => off.to_owned(),
            None => UNKNOWN.to_owned(),
        };

        format!(
            "📊 *ESTADO COMPLETO DEL CARRITO TECNOLÓGICO 🚗*\n\
             \n\
             🌡 *Temperatura:* {} °C\n\
             💧 *Humedad:* {} %\n\
             \n\
             📏 *Distancia Frente:* {} cm\n\
             📏 *Distancia Atrás:* {} cm\n\
             \n\
             🔦 *Dirección de Luz:* {}\n\
             💡 *Intensidad de Luz:* {}\n\
             \n\
             🛞 *Timon:* {}\n\
             🎮 *Última acción:* {}\n\
             \n\
             🔊 *Nivel de sonido:* {}\n\
             🌧 *Nivel de lluvia:* {}\n\
             \n\
             🚨 *Alarmas:* {}\n\
             🚗 *Seguir Luces:* {}",
            self.display(Field::Temperature),
            self.display(Field::Humidity),
            self.display(Field::DistanceFront),
            self.display(Field::DistanceBack),
            self.display(Field::LightDirection),
            self.display(Field::LightIntensity),
            self.display(Field::Steering),
            self.display(Field::LastAction),
            self.display(Field::SoundLevel),
            self.display(Field::RainLevel),
            switch(self.alarm_enabled, "ACTIVADAS", "DESACTIVADAS"),
            switch(self.follow_light_enabled, "ACTIVADO", "DESACTIVADO"),
        )
    }
}

/// Field deserializers that drop a mistyped value instead of failing the line.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(b) => Some(b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(json: &str) -> DecodedLine {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_empty_snapshot_reads_unknown() {
        let snapshot = TelemetrySnapshot::new();
        assert!(snapshot.is_empty());
        for field in Field::ALL {
            assert_eq!(snapshot.read(field), None);
            assert_eq!(snapshot.display(field), UNKNOWN);
        }
    }

    #[test]
    fn test_partial_merge_keeps_other_fields() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(line(r#"{"temperature":22,"humedity":55,"rain_level":3}"#));
        snapshot.merge(line(r#"{"temperature":23}"#));

        assert_eq!(snapshot.read(Field::Temperature), Some(FieldValue::Number(23.0)));
        assert_eq!(snapshot.read(Field::Humidity), Some(FieldValue::Number(55.0)));
        assert_eq!(snapshot.read(Field::RainLevel), Some(FieldValue::Number(3.0)));
        assert_eq!(snapshot.read(Field::SoundLevel), None);
    }

    #[test]
    fn test_light_fields_are_independent() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(line(r#"{"light_direction":"LEFT"}"#));
        snapshot.merge(line(r#"{"light_intensity":80}"#));

        assert_eq!(snapshot.display(Field::LightDirection), "LEFT");
        assert_eq!(snapshot.display(Field::LightIntensity), "80");

        snapshot.merge(line(r#"{"light_direction":"RIGHT"}"#));
        assert_eq!(snapshot.display(Field::LightIntensity), "80");
    }

    #[test]
    fn test_zero_is_an_observed_value() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(line(r#"{"sound_level":0,"alarm_status":false}"#));

        assert_eq!(snapshot.display(Field::SoundLevel), "0");
        assert_eq!(snapshot.flag(Field::AlarmEnabled), Some(false));
    }

    #[test]
    fn test_mistyped_key_is_dropped_alone() {
        let decoded = line(r#"{"temperature":null,"humedity":"61","steering_status":[1]}"#);
        assert_eq!(decoded.temperature, None);
        assert_eq!(decoded.humidity, Some(61.0));
        assert_eq!(decoded.steering, None);
        assert_eq!(decoded.fields(), vec![Field::Humidity]);
    }

    #[test]
    fn test_numeric_flags() {
        let decoded = line(r#"{"alarm_status":1,"follow_light":0}"#);
        assert_eq!(decoded.alarm_enabled, Some(true));
        assert_eq!(decoded.follow_light_enabled, Some(false));
    }

    #[test]
    fn test_summary_placeholders_in_order() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(line(r#"{"distance_back":40,"follow_light":true}"#));
        let summary = snapshot.summary();

        assert!(summary.contains("*Temperatura:* ?? °C"));
        assert!(summary.contains("*Distancia Atrás:* 40 cm"));
        assert!(summary.contains("*Alarmas:* ??"));
        assert!(summary.contains("*Seguir Luces:* ACTIVADO"));

        let temperature = summary.find("Temperatura").unwrap();
        let rain = summary.find("lluvia").unwrap();
        let follow = summary.find("Seguir Luces").unwrap();
        assert!(temperature < rain && rain < follow);
    }
}
