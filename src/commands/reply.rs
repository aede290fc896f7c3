//! Reply texts sent back to the operator.

use crate::commands::Query;
use crate::protocol::Toggle;
use crate::types::{Field, TelemetrySnapshot};

/// Command menu shown by `/menu` and `/help`.
pub const MENU: &str = "📌 *COMANDOS DISPONIBLES*

/temp → Temperatura & humedad
/dist → Distancias
/luz → Dirección de luz
/intensidad → Intensidad de luz
/timon → Estado del timón
/accion → Última acción
/sonido → Nivel de sonido
/lluvia → Nivel de lluvia
/alarmas on|off → Activar/desactivar alarmas
/estado_alarmas → Ver si están ON/OFF
/seguir on|off → Activar o desactivar Seguir Luces
/estado_seguir → Ver si Seguir Luces está ON/OFF
/conectar [puerto] [baudios] → Conectar al carrito

/all → Todo el estado del carrito
/menu → Lista de comandos
/help → Lista de comandos";

/// Renders one reading, or `missing` if it was never seen.
fn single(snapshot: &TelemetrySnapshot, field: Field, label: &str, missing: &str) -> String {
    snapshot
        .read(field)
        .map_or_else(|| missing.to_owned(), |value| format!("{label} {value}"))
}

/// Renders two related readings, or `None` if neither was ever seen.
fn pair(snapshot: &TelemetrySnapshot, first: Field, second: Field) -> Option<(String, String)> {
    if snapshot.read(first).is_none() && snapshot.read(second).is_none() {
        return None;
    }
    Some((snapshot.display(first), snapshot.display(second)))
}

/// Formats the reply to a read command.
#[must_use]
pub fn query(query: Query, snapshot: &TelemetrySnapshot) -> String {
    match query {
        Query::Temperature => pair(snapshot, Field::Temperature, Field::Humidity).map_or_else(
            || "⚠ No hay datos de temperatura.".to_owned(),
            |(t, h)| format!("🌡 *Temperatura:* {t} °C\n💧 *Humedad:* {h} %"),
        ),
        Query::Distances => pair(snapshot, Field::DistanceFront, Field::DistanceBack)
            .map_or_else(
                || "⚠ No hay datos de distancia.".to_owned(),
                |(front, back)| format!("📏 *Delante:* {front} cm\n📏 *Atrás:* {back} cm"),
            ),
        Query::LightDirection => single(
            snapshot,
            Field::LightDirection,
            "🔦 *Dirección de luz:*",
            "⚠ No hay datos de dirección de luz.",
        ),
        Query::LightIntensity => single(
            snapshot,
            Field::LightIntensity,
            "💡 *Intensidad de luz:*",
            "⚠ No hay intensidad registrada.",
        ),
        Query::Steering => single(
            snapshot,
            Field::Steering,
            "🛞 *Timon:*",
            "⚠ No hay datos del timón.",
        ),
        Query::LastAction => single(
            snapshot,
            Field::LastAction,
            "🎮 *Última acción:*",
            "⚠ No hay acción registrada.",
        ),
        Query::Sound => single(
            snapshot,
            Field::SoundLevel,
            "🔊 *Nivel de sonido:*",
            "⚠ No hay datos de sonido.",
        ),
        Query::Rain => single(
            snapshot,
            Field::RainLevel,
            "🌧 *Nivel de lluvia:*",
            "⚠ No hay datos de lluvia.",
        ),
        Query::AlarmState => state(Toggle::Alarms, snapshot.flag(Field::AlarmEnabled)),
        Query::FollowLightState => {
            state(Toggle::FollowLight, snapshot.flag(Field::FollowLightEnabled))
        }
        Query::Summary => snapshot.summary(),
        Query::Help => MENU.to_owned(),
    }
}

/// Formats a toggle's reported state.
#[must_use]
pub fn state(toggle: Toggle, enabled: Option<bool>) -> String {
    match (toggle, enabled) {
        (Toggle::Alarms, None) => "⚠ No hay datos del estado de alarmas.".to_owned(),
        (Toggle::Alarms, Some(true)) => "🚨 Alarmas *ACTIVADAS*".to_owned(),
        (Toggle::Alarms, Some(false)) => "🟢 Alarmas *DESACTIVADAS*".to_owned(),
        (Toggle::FollowLight, None) => "⚠ No hay datos del estado de Seguir Luces.".to_owned(),
        (Toggle::FollowLight, Some(true)) => "🚨 Seguir Luces *ACTIVADO*".to_owned(),
        (Toggle::FollowLight, Some(false)) => "🟢 Seguir Luces *DESACTIVADO*".to_owned(),
    }
}

/// Confirms a toggle request sent to the device.
#[must_use]
pub const fn toggled(toggle: Toggle, enable: bool) -> &'static str {
    match (toggle, enable) {
        (Toggle::Alarms, true) => "🚨 Alarmas activadas",
        (Toggle::Alarms, false) => "🟢 Alarmas desactivadas",
        (Toggle::FollowLight, true) => "🚨 Seguir luces Activadas, se seguirán todas las luces.",
        (Toggle::FollowLight, false) => {
            "🟢 Seguir luces desactivadas, no se seguirá ninguna luz."
        }
    }
}

/// Reports that the device did not confirm a toggle in time.
#[must_use]
pub const fn unconfirmed(toggle: Toggle) -> &'static str {
    match toggle {
        Toggle::Alarms => "⚠ El carrito no confirmó el cambio de alarmas.",
        Toggle::FollowLight => "⚠ El carrito no confirmó el cambio de Seguir Luces.",
    }
}

/// Confirms a connect request.
#[must_use]
pub fn connected(port: &str) -> String {
    format!("🔌 Conectado a *{port}* correctamente.")
}

/// Rejects a port outside the allow-list.
#[must_use]
pub fn port_not_allowed(port: &str) -> String {
    format!("⚠ Puerto no permitido: *{port}*")
}

/// Names a command the bridge does not know.
#[must_use]
pub fn unknown(name: &str) -> String {
    format!("❓ Comando desconocido: *{name}*")
}

/// Greeting sent when the messaging session opens.
pub const GREETING: &str = "🚗 Robert listo!!! 🚗";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_line;
    use crate::types::UNKNOWN;

    #[test]
    fn test_missing_readings() {
        let snapshot = TelemetrySnapshot::new();
        assert_eq!(query(Query::Temperature, &snapshot), "⚠ No hay datos de temperatura.");
        assert_eq!(query(Query::Sound, &snapshot), "⚠ No hay datos de sonido.");
        assert_eq!(
            query(Query::AlarmState, &snapshot),
            "⚠ No hay datos del estado de alarmas."
        );
    }

    #[test]
    fn test_half_known_pair_uses_placeholder() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(decode_line(r#"{"distance_front":12}"#));

        let reply = query(Query::Distances, &snapshot);
        assert!(reply.contains("*Delante:* 12 cm"));
        assert!(reply.contains(&format!("*Atrás:* {UNKNOWN} cm")));
    }

    #[test]
    fn test_flag_states() {
        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(decode_line(r#"{"alarm_status":true,"follow_light":false}"#));

        assert_eq!(query(Query::AlarmState, &snapshot), "🚨 Alarmas *ACTIVADAS*");
        assert_eq!(
            query(Query::FollowLightState, &snapshot),
            "🟢 Seguir Luces *DESACTIVADO*"
        );
    }

    #[test]
    fn test_unknown_names_command() {
        assert_eq!(unknown("xyz"), "❓ Comando desconocido: *xyz*");
    }
}
