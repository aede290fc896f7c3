//! Operator command handling.
//!
//! This module turns one chat message into at most one reply. Read commands
//! answer from the telemetry snapshot, write commands forward a control
//! token to the device, and `conectar` (re)opens the device session.

pub mod reply;

use std::time::Duration;

use crate::event::{Event, EventFilter};
use crate::protocol::{ControlToken, Toggle};
use crate::session::DeviceSessionManager;
use crate::transport::serial::{DEFAULT_BAUD_RATE, DEFAULT_CONNECTION_DELAY};
use crate::transport::{Connector, SerialConfig};
use crate::types::TelemetrySnapshot;

/// Character that may prefix a command name.
pub const COMMAND_MARKER: char = '/';

/// Port used by `conectar` when none is given.
pub const DEFAULT_PORT: &str = "COM3";

/// Default time to wait for the device to confirm a toggle.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(3);

/// A command name with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Lower-cased name without the marker.
    pub name: String,
    /// Lower-cased arguments.
    pub args: Vec<String>,
    raw_args: Vec<String>,
}

impl Command {
    /// Splits a message into a command.
    ///
    /// Returns `None` for a message with no tokens.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut tokens = text.split_whitespace();
        let first = tokens.next()?.to_lowercase();
        let name = first
            .strip_prefix(COMMAND_MARKER)
            .unwrap_or(&first)
            .to_owned();
        let raw_args: Vec<String> = tokens.map(str::to_owned).collect();
        let args = raw_args.iter().map(|arg| arg.to_lowercase()).collect();

        Some(Self {
            name,
            args,
            raw_args,
        })
    }

    /// Returns the lower-cased argument at `index`.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Returns the argument at `index` as typed, for case-sensitive values.
    #[must_use]
    pub fn raw_arg(&self, index: usize) -> Option<&str> {
        self.raw_args.get(index).map(String::as_str)
    }
}

/// Read commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Temperature,
    Distances,
    LightDirection,
    LightIntensity,
    Steering,
    LastAction,
    Sound,
    Rain,
    AlarmState,
    FollowLightState,
    Summary,
    Help,
}

/// What a command asks the bridge to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Answer from the snapshot.
    Read(Query),
    /// Switch a device behavior; `None` if the argument was not on/off.
    Write { toggle: Toggle, enable: Option<bool> },
    /// Open a device session.
    Connect {
        port: Option<String>,
        baud_rate: Option<String>,
    },
    /// Unrecognized command name.
    Unknown(String),
}

impl Action {
    /// Classifies a parsed command.
    #[must_use]
    pub fn from_command(command: &Command) -> Self {
        let switch = || match command.arg(0) {
            Some("on") => Some(true),
            Some("off") => Some(false),
            _ => None,
        };

        match command.name.as_str() {
            "temp" => Self::Read(Query::Temperature),
            "dist" => Self::Read(Query::Distances),
            "luz" => Self::Read(Query::LightDirection),
            "intensidad" => Self::Read(Query::LightIntensity),
            "timon" => Self::Read(Query::Steering),
            "accion" => Self::Read(Query::LastAction),
            "sonido" => Self::Read(Query::Sound),
            "lluvia" => Self::Read(Query::Rain),
            "estado_alarmas" => Self::Read(Query::AlarmState),
            "estado_seguir" => Self::Read(Query::FollowLightState),
            "all" => Self::Read(Query::Summary),
            "menu" | "help" => Self::Read(Query::Help),
            "alarmas" => Self::Write {
                toggle: Toggle::Alarms,
                enable: switch(),
            },
            "seguir" => Self::Write {
                toggle: Toggle::FollowLight,
                enable: switch(),
            },
            "conectar" | "connect" => Self::Connect {
                port: command.raw_arg(0).map(str::to_owned),
                baud_rate: command.arg(1).map(str::to_owned),
            },
            other => Self::Unknown(other.to_owned()),
        }
    }
}

/// Configuration for command handling.
#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Port opened by `conectar` without arguments.
    pub default_port: String,
    /// Baud rate used when none (or an invalid one) is given.
    pub default_baud_rate: u32,
    /// Ports `conectar` may open; empty allows any port.
    pub allowed_ports: Vec<String>,
    /// Delay after opening a port before it is used.
    pub connection_delay: Duration,
    /// Wait for the device to report a toggle before replying.
    pub confirm_writes: bool,
    /// How long to wait for that report.
    pub confirm_timeout: Duration,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            default_port: DEFAULT_PORT.to_owned(),
            default_baud_rate: DEFAULT_BAUD_RATE,
            allowed_ports: Vec::new(),
            connection_delay: DEFAULT_CONNECTION_DELAY,
            confirm_writes: false,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }
}

impl CommandConfig {
    /// Sets the default port.
    #[must_use]
    pub fn default_port(mut self, port: impl Into<String>) -> Self {
        self.default_port = port.into();
        self
    }

    /// Sets the default baud rate.
    #[must_use]
    pub const fn default_baud_rate(mut self, rate: u32) -> Self {
        self.default_baud_rate = rate;
        self
    }

    /// Restricts `conectar` to the given ports.
    #[must_use]
    pub fn allowed_ports(mut self, ports: Vec<String>) -> Self {
        self.allowed_ports = ports;
        self
    }

    /// Sets the connection delay.
    #[must_use]
    pub const fn connection_delay(mut self, delay: Duration) -> Self {
        self.connection_delay = delay;
        self
    }

    /// Waits up to `timeout` for the device to confirm toggles.
    #[must_use]
    pub const fn confirm_writes(mut self, timeout: Duration) -> Self {
        self.confirm_writes = true;
        self.confirm_timeout = timeout;
        self
    }

    /// Returns true if `port` may be opened.
    #[must_use]
    pub fn port_allowed(&self, port: &str) -> bool {
        self.allowed_ports.is_empty()
            || self
                .allowed_ports
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(port))
    }
}

/// Maps operator messages to replies and device writes.
#[derive(Debug, Clone, Default)]
pub struct CommandDispatcher {
    config: CommandConfig,
}

impl CommandDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new(config: CommandConfig) -> Self {
        Self { config }
    }

    /// Handles one message and returns the reply, if any.
    ///
    /// Write commands without a device session, or with an argument other
    /// than `on`/`off`, are ignored without reply.
    pub async fn dispatch<C: Connector>(
        &self,
        text: &str,
        snapshot: &TelemetrySnapshot,
        sessions: &mut DeviceSessionManager<C>,
    ) -> Option<String> {
        let Some(command) = Command::parse(text) else {
            tracing::debug!("ignoring empty message");
            return None;
        };

        tracing::debug!("command {:?} args {:?}", command.name, command.args);

        match Action::from_command(&command) {
            Action::Read(query) => Some(reply::query(query, snapshot)),
            Action::Write { toggle, enable } => self.write(toggle, enable?, sessions).await,
            Action::Connect { port, baud_rate } => {
                Some(self.connect(port, baud_rate.as_deref(), sessions).await)
            }
            Action::Unknown(name) => Some(reply::unknown(&name)),
        }
    }

    async fn write<C: Connector>(
        &self,
        toggle: Toggle,
        enable: bool,
        sessions: &mut DeviceSessionManager<C>,
    ) -> Option<String> {
        if !sessions.has_session() {
            tracing::debug!("ignoring {:?} toggle: no device session", toggle);
            return None;
        }

        let token = ControlToken::new(toggle, enable);

        if self.config.confirm_writes {
            return Some(self.write_confirmed(toggle, token, sessions).await);
        }

        if let Err(e) = sessions.send(token.as_str()).await {
            tracing::warn!("failed to send {}: {}", token, e);
        }
        Some(reply::toggled(toggle, enable).to_owned())
    }

    async fn write_confirmed<C: Connector>(
        &self,
        toggle: Toggle,
        token: ControlToken,
        sessions: &mut DeviceSessionManager<C>,
    ) -> String {
        // Subscribe before writing so a fast report is not missed
        let mut subscription = sessions.subscribe();

        if let Err(e) = sessions.send(token.as_str()).await {
            tracing::warn!("failed to send {}: {}", token, e);
            return reply::unconfirmed(toggle).to_owned();
        }

        let field = toggle.state_field();
        let filter = EventFilter::fields(vec![field]);
        match subscription
            .wait_for(&filter, self.config.confirm_timeout)
            .await
        {
            Some(Event::Line(line)) => reply::state(toggle, line.flag(field)),
            _ => {
                tracing::warn!(
                    "no {} report within {:?} after {}",
                    field,
                    self.config.confirm_timeout,
                    token
                );
                reply::unconfirmed(toggle).to_owned()
            }
        }
    }

    async fn connect<C: Connector>(
        &self,
        port: Option<String>,
        baud_rate: Option<&str>,
        sessions: &mut DeviceSessionManager<C>,
    ) -> String {
        let port = port.unwrap_or_else(|| self.config.default_port.clone());
        if !self.config.port_allowed(&port) {
            tracing::warn!("refusing to open {}: not in allowed ports", port);
            return reply::port_not_allowed(&port);
        }

        let baud_rate = baud_rate.map_or(self.config.default_baud_rate, |raw| {
            raw.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    "invalid baud rate {:?}, using {}",
                    raw,
                    self.config.default_baud_rate
                );
                self.config.default_baud_rate
            })
        });

        let config = SerialConfig::new(&port)
            .baud_rate(baud_rate)
            .connection_delay(self.config.connection_delay);

        // The operator is told the port is connected whatever the outcome
        if let Err(e) = sessions.connect(config).await {
            tracing::warn!("failed to open {}: {}", port, e);
        }

        reply::connected(&port)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::event::EventDispatcher;
    use crate::protocol::decode_line;
    use crate::transport::testing::RecordingConnector;

    fn setup(
        connector: &RecordingConnector,
    ) -> (
        DeviceSessionManager<RecordingConnector>,
        tokio::sync::mpsc::Receiver<Event>,
    ) {
        let (events, rx) = EventDispatcher::new(16);
        (DeviceSessionManager::new(connector.clone(), events), rx)
    }

    #[test]
    fn test_parse_command() {
        let command = Command::parse("  /ALARMAS On  ").unwrap();
        assert_eq!(command.name, "alarmas");
        assert_eq!(command.args, vec!["on".to_owned()]);

        let command = Command::parse("conectar /dev/ttyUSB0 115200").unwrap();
        assert_eq!(command.arg(0), Some("/dev/ttyusb0"));
        assert_eq!(command.raw_arg(0), Some("/dev/ttyUSB0"));

        assert!(Command::parse("   ").is_none());
    }

    #[test]
    fn test_classify_commands() {
        let action = |text| Action::from_command(&Command::parse(text).unwrap());

        assert_eq!(action("/temp"), Action::Read(Query::Temperature));
        assert_eq!(action("HELP"), Action::Read(Query::Help));
        assert_eq!(
            action("/seguir off"),
            Action::Write {
                toggle: Toggle::FollowLight,
                enable: Some(false)
            }
        );
        assert_eq!(
            action("alarmas maybe"),
            Action::Write {
                toggle: Toggle::Alarms,
                enable: None
            }
        );
        assert_eq!(
            action("connect COM3 9600"),
            Action::Connect {
                port: Some("COM3".into()),
                baud_rate: Some("9600".into())
            }
        );
        assert_eq!(action("xyz"), Action::Unknown("xyz".into()));
    }

    #[test]
    fn test_port_allow_list() {
        let config = CommandConfig::default();
        assert!(config.port_allowed("/dev/ttyACM0"));

        let config = config.allowed_ports(vec!["COM1".into(), "COM3".into()]);
        assert!(config.port_allowed("com3"));
        assert!(!config.port_allowed("COM7"));
    }

    #[tokio::test]
    async fn test_temperature_reply() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher = CommandDispatcher::default();

        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(decode_line(r#"{"temperature":22,"humedity":55}"#));

        let reply = dispatcher.dispatch("temp", &snapshot, &mut sessions).await.unwrap();
        assert!(reply.contains("22"));
        assert!(reply.contains("55"));
    }

    #[tokio::test]
    async fn test_light_replies_after_partial_merges() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher = CommandDispatcher::default();

        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(decode_line(r#"{"light_direction":"LEFT"}"#));
        snapshot.merge(decode_line(r#"{"light_intensity":80}"#));

        let luz = dispatcher.dispatch("luz", &snapshot, &mut sessions).await.unwrap();
        assert!(luz.contains("LEFT"));
        let intensidad = dispatcher
            .dispatch("intensidad", &snapshot, &mut sessions)
            .await
            .unwrap();
        assert!(intensidad.contains("80"));
    }

    #[tokio::test]
    async fn test_read_commands_are_idempotent() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher = CommandDispatcher::default();

        let mut snapshot = TelemetrySnapshot::new();
        snapshot.merge(decode_line(r#"{"rain_level":4,"steering_status":"IZQUIERDA"}"#));

        for text in ["/all", "/lluvia", "/timon", "/estado_seguir", "/menu"] {
            let first = dispatcher.dispatch(text, &snapshot, &mut sessions).await;
            let second = dispatcher.dispatch(text, &snapshot, &mut sessions).await;
            assert!(first.is_some());
            assert_eq!(first, second);
        }
        assert!(connector.writes().is_empty());
    }

    #[tokio::test]
    async fn test_write_requires_session() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher =
            CommandDispatcher::new(CommandConfig::default().connection_delay(Duration::ZERO));
        let snapshot = TelemetrySnapshot::new();

        assert_eq!(dispatcher.dispatch("alarmas on", &snapshot, &mut sessions).await, None);
        assert!(connector.writes().is_empty());

        let reply = dispatcher
            .dispatch("connect COM3 9600", &snapshot, &mut sessions)
            .await
            .unwrap();
        assert_eq!(reply, "🔌 Conectado a *COM3* correctamente.");

        let reply = dispatcher.dispatch("alarmas on", &snapshot, &mut sessions).await;
        assert_eq!(reply.as_deref(), Some("🚨 Alarmas activadas"));
        assert_eq!(
            connector.writes(),
            vec![("COM3".to_owned(), Bytes::from_static(b"alarmas_on\n"))]
        );
    }

    #[tokio::test]
    async fn test_write_with_bad_argument_is_ignored() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher = CommandDispatcher::default();
        let snapshot = TelemetrySnapshot::new();

        dispatcher.dispatch("/conectar", &snapshot, &mut sessions).await;
        for text in ["alarmas", "alarmas encender", "seguir 1"] {
            assert_eq!(dispatcher.dispatch(text, &snapshot, &mut sessions).await, None);
        }
        assert!(connector.writes().is_empty());
    }

    #[tokio::test]
    async fn test_connect_defaults_and_optimistic_reply() {
        let connector = RecordingConnector {
            fail_open: true,
            ..RecordingConnector::default()
        };
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher = CommandDispatcher::default();
        let snapshot = TelemetrySnapshot::new();

        let reply = dispatcher.dispatch("/conectar", &snapshot, &mut sessions).await;
        assert_eq!(reply, Some(reply::connected(DEFAULT_PORT)));

        dispatcher
            .dispatch("/conectar COM1 fast", &snapshot, &mut sessions)
            .await;
        let opened = connector.opened.lock().unwrap().clone();
        assert_eq!(opened[0].port, "COM3");
        assert_eq!(opened[0].baud_rate, 9600);
        assert_eq!(opened[1].port, "COM1");
        assert_eq!(opened[1].baud_rate, 9600);
    }

    #[tokio::test]
    async fn test_connect_rejects_port_outside_allow_list() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher =
            CommandDispatcher::new(CommandConfig::default().allowed_ports(vec!["COM3".into()]));
        let snapshot = TelemetrySnapshot::new();

        let reply = dispatcher
            .dispatch("/conectar COM9", &snapshot, &mut sessions)
            .await;
        assert_eq!(reply, Some(reply::port_not_allowed("COM9")));
        assert!(!sessions.has_session());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher = CommandDispatcher::default();

        let reply = dispatcher
            .dispatch("xyz", &TelemetrySnapshot::new(), &mut sessions)
            .await
            .unwrap();
        assert!(reply.contains("xyz"));
        assert!(reply.contains("Comando desconocido"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_write_reports_device_state() {
        let connector = RecordingConnector::default();
        let (events, _rx) = EventDispatcher::new(16);
        let mut sessions = DeviceSessionManager::new(connector.clone(), events.clone());
        let dispatcher = CommandDispatcher::new(
            CommandConfig::default().confirm_writes(Duration::from_secs(2)),
        );
        let snapshot = TelemetrySnapshot::new();
        dispatcher.dispatch("/conectar", &snapshot, &mut sessions).await;

        let device = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            events.dispatch(Event::Line(decode_line(r#"{"alarm_status":true}"#)));
        });

        let reply = dispatcher
            .dispatch("alarmas on", &snapshot, &mut sessions)
            .await;
        device.await.unwrap();
        assert_eq!(reply.as_deref(), Some("🚨 Alarmas *ACTIVADAS*"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmed_write_times_out() {
        let connector = RecordingConnector::default();
        let (mut sessions, _rx) = setup(&connector);
        let dispatcher = CommandDispatcher::new(
            CommandConfig::default().confirm_writes(Duration::from_secs(2)),
        );
        let snapshot = TelemetrySnapshot::new();
        dispatcher.dispatch("/conectar", &snapshot, &mut sessions).await;

        let reply = dispatcher.dispatch("seguir on", &snapshot, &mut sessions).await;
        assert_eq!(reply.as_deref(), Some(reply::unconfirmed(Toggle::FollowLight)));
        assert_eq!(connector.writes().len(), 1);
    }
}
