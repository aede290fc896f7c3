//! Serial/USB transport implementation.
//!
//! This module provides serial port communication for the rover's
//! microcontroller, typically an Arduino on a USB-serial adapter.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::error::{Error, Result};
use crate::event::{Event, EventDispatcher};
use crate::protocol::{LineDecoder, decode_line};
use crate::transport::{Connector, Transport};

/// Default baud rate for the rover firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default connection delay.
pub const DEFAULT_CONNECTION_DELAY: Duration = Duration::from_millis(300);

/// Configuration for serial transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Delay after opening before the port is considered ready.
    pub connection_delay: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings.
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            connection_delay: DEFAULT_CONNECTION_DELAY,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the connection delay.
    #[must_use]
    pub const fn connection_delay(mut self, delay: Duration) -> Self {
        self.connection_delay = delay;
        self
    }
}

/// Serial transport for the rover link.
///
/// The read half is moved into a background task that frames lines and
/// publishes decoded telemetry; the write half stays here for commands.
pub struct SerialTransport {
    config: SerialConfig,
    events: EventDispatcher,
    writer: Option<WriteHalf<SerialStream>>,
    read_task: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub const fn new(config: SerialConfig, events: EventDispatcher) -> Self {
        Self {
            config,
            events,
            writer: None,
            read_task: None,
        }
    }

    /// Runs the read loop, publishing every decoded telemetry line.
    ///
    /// Lines that carry no telemetry are dropped. A `Disconnected` event is
    /// published when the port closes or fails.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the connection is lost.
    pub async fn run_read_loop(
        mut reader: ReadHalf<SerialStream>,
        port: String,
        events: EventDispatcher,
    ) -> Result<()> {
        let mut decoder = LineDecoder::new();
        let mut buf = [0u8; 1024];

        let result = loop {
            let n = match reader.read(&mut buf).await {
                Ok(0) => {
                    tracing::debug!("serial port {} closed", port);
                    break Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "serial port closed",
                    )));
                }
                Ok(n) => n,
                Err(e) => break Err(Error::Io(e)),
            };

            tracing::trace!("received {} bytes", n);
            decoder.feed(&buf[..n]);

            // Process all complete lines
            loop {
                match decoder.decode() {
                    Ok(Some(line)) => {
                        let decoded = decode_line(&line);
                        if decoded.is_empty() {
                            continue;
                        }
                        tracing::trace!("decoded line with {:?}", decoded.fields());
                        if events.publish(Event::Line(decoded)).await.is_err() {
                            tracing::debug!("line receiver dropped");
                            return Ok(());
                        }
                    }
                    Ok(None) => break, // Need more data
                    Err(e) => {
                        tracing::warn!("line decode error: {}", e);
                    }
                }
            }
        };

        // The bridge may already be gone, nothing left to tell
        let _ = events.publish(Event::Disconnected { port }).await;
        result
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.writer.is_some() {
                return Ok(());
            }

            tracing::info!(
                "opening serial port {} at {} baud",
                self.config.port,
                self.config.baud_rate
            );

            let stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .open_native_async()
                .map_err(Error::Serial)?;

            // Boards that reset on open need a moment before they listen
            tokio::time::sleep(self.config.connection_delay).await;

            let (reader, writer) = tokio::io::split(stream);
            self.writer = Some(writer);

            let port = self.config.port.clone();
            let events = self.events.clone();
            self.read_task = Some(tokio::spawn(async move {
                if let Err(e) = Self::run_read_loop(reader, port, events).await {
                    tracing::error!("read loop error: {}", e);
                }
            }));

            tracing::info!("connected to serial port {}", self.config.port);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if let Some(task) = self.read_task.take() {
                task.abort();
            }
            if let Some(mut writer) = self.writer.take() {
                tracing::info!("disconnecting from serial port {}", self.config.port);
                writer.shutdown().await.map_err(Error::Io)?;
            }
            Ok(())
        })
    }

    fn send(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let writer = self.writer.as_mut().ok_or(Error::NotConnected)?;

            tracing::trace!("sending line: {} bytes", data.len());

            writer.write_all(&data).await.map_err(Error::Io)?;
            writer.flush().await.map_err(Error::Io)?;

            Ok(())
        })
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
            && self
                .read_task
                .as_ref()
                .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }
}

/// Opens real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn create(&self, config: SerialConfig, events: EventDispatcher) -> SerialTransport {
        SerialTransport::new(config, events)
    }
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("COM3");
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.connection_delay, DEFAULT_CONNECTION_DELAY);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("/dev/ttyUSB0")
            .baud_rate(115_200)
            .connection_delay(Duration::from_secs(2));
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.connection_delay, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_send_without_open_port() {
        let (events, _rx) = EventDispatcher::new(4);
        let mut transport = SerialTransport::new(SerialConfig::new("COM3"), events);

        assert!(!transport.is_connected());
        let result = transport.send(Bytes::from_static(b"alarmas_on\n")).await;
        assert!(matches!(result, Err(Error::NotConnected)));
        transport.disconnect().await.unwrap();
    }

    #[test]
    #[ignore = "Requires /sys/class/tty - not available in sandboxed builds"]
    fn test_list_ports() {
        // Just verify it doesn't panic
        let _ = list_ports();
    }
}
