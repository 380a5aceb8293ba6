//! A [`Transport`] implementation backed by the `serial2` crate.

use std::time::{Duration, Instant};

use super::Transport;
use crate::error::TransportError;

/// A serial port transport, for talking to a real instrument.
///
/// The port must already be configured for the instrument's line settings
/// (8 data bits, no parity, 1 stop bit) and the desired baud rate; this type
/// only adds the character-timeout/blocking semantics [`Transport`] requires.
pub struct SerialTransport {
	port: serial2::SerialPort,
}

impl SerialTransport {
	/// Open `path` at `baud_rate` with the given per-read character timeout.
	pub fn open(path: impl AsRef<std::path::Path>, baud_rate: u32, read_timeout: Duration) -> std::io::Result<Self> {
		let mut port = serial2::SerialPort::open(path, baud_rate)?;
		port.set_read_timeout(read_timeout)?;
		Ok(Self { port })
	}

	/// Wrap an already-open, already-configured serial port.
	pub fn new(port: serial2::SerialPort) -> Self {
		Self { port }
	}
}

impl Transport for SerialTransport {
	type Error = std::io::Error;

	fn now(&self) -> Instant {
		Instant::now()
	}

	fn sleep(&self, duration: Duration) {
		std::thread::sleep(duration);
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError<Self::Error>> {
		use std::io::Read;
		match self.port.read(buf) {
			Ok(n) => Ok(n),
			Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(TransportError::Timeout),
			Err(e) => Err(TransportError::Other(e)),
		}
	}

	fn write(&mut self, buf: &[u8]) -> Result<(), TransportError<Self::Error>> {
		use std::io::Write;
		match self.port.write_all(buf) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(TransportError::Timeout),
			Err(e) => Err(TransportError::Other(e)),
		}
	}
}
