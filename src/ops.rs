//! A small, representative set of command consumers built on [`crate::Session::converse`].
//!
//! The instrument exposes roughly a dozen feature areas (clock, schedule,
//! gating, wifi, power, ...); marshaling each one is mechanical once C7/C6
//! exist and is explicitly out of scope for this crate's core. `verify` and
//! `channels` are kept here as worked examples that exercise the core
//! end to end, alongside [`crate::Session::identify`] in `converse.rs`.

use crate::error::Error;
use crate::session::Session;
use crate::transport::Transport;

/// The result of a `verify` command: whether the instrument is logging, and any warning raised.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct VerifyResult {
	pub status: String,
	pub warning_code: Option<u16>,
}

/// The instrument's channel configuration, as reported by the `channels` command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub struct Channels {
	pub count: u32,
	pub on: u32,
	pub settling_time_ms: u32,
	pub read_time_ms: u32,
	pub min_period_ms: u32,
}

impl<T: Transport> Session<T> {
	/// Ask the instrument to verify its current logging configuration.
	pub fn verify(&mut self) -> Result<VerifyResult, Error<T::Error>> {
		let response = self.converse(format_args!("verify"))?;
		let warning_code = response.warning_code();
		let dialect = self.dialect;

		let mut status = None;
		let mut cursor = response.params(dialect);
		while let Some(param) = cursor.next_param() {
			if param.key == "status" {
				status = Some(param.value.to_string());
			}
		}

		Ok(VerifyResult { status: status.ok_or(Error::Unsupported)?, warning_code })
	}

	/// Query the instrument's channel configuration.
	pub fn channels(&mut self) -> Result<Channels, Error<T::Error>> {
		let response = self.converse(format_args!("channels"))?;
		let dialect = self.dialect;

		let mut result = Channels::default();
		let mut cursor = response.params(dialect);
		while let Some(param) = cursor.next_param() {
			match param.key {
				"count" => result.count = param.value.parse().unwrap_or_default(),
				"on" => result.on = param.value.parse().unwrap_or_default(),
				"settlingtime" => result.settling_time_ms = param.value.parse().unwrap_or_default(),
				"readtime" => result.read_time_ms = param.value.parse().unwrap_or_default(),
				"minperiod" => result.min_period_ms = param.value.parse().unwrap_or_default(),
				_ => {},
			}
		}
		Ok(result)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;
	use std::cell::RefCell;
	use std::collections::VecDeque;
	use std::time::{Duration, Instant};

	struct ScriptedTransport {
		inbound: VecDeque<u8>,
		clock: RefCell<Instant>,
	}

	impl ScriptedTransport {
		fn new(script: &[u8]) -> Self {
			Self { inbound: script.iter().copied().collect(), clock: RefCell::new(Instant::now()) }
		}
	}

	impl Transport for ScriptedTransport {
		type Error = std::convert::Infallible;

		fn now(&self) -> Instant {
			*self.clock.borrow()
		}

		fn sleep(&self, duration: Duration) {
			*self.clock.borrow_mut() += duration;
		}

		fn read(&mut self, buf: &mut [u8]) -> Result<usize, crate::error::TransportError<Self::Error>> {
			if self.inbound.is_empty() {
				return Err(crate::error::TransportError::Timeout);
			}
			let mut n = 0;
			while n < buf.len() {
				match self.inbound.pop_front() {
					Some(byte) => {
						buf[n] = byte;
						n += 1;
					},
					None => break,
				}
			}
			Ok(n)
		}

		fn write(&mut self, _buf: &[u8]) -> Result<(), crate::error::TransportError<Self::Error>> {
			Ok(())
		}
	}

	#[test]
	fn verify_reports_status_and_warning() {
		let mut session = Session::new(ScriptedTransport::new(b"verify status = logging, warning = W0401\r\n"));
		let result = session.verify().unwrap();
		assert!(result.status == "logging");
		assert!(result.warning_code == Some(401));
	}

	#[test]
	fn channels_reports_full_configuration() {
		let mut session = Session::new(ScriptedTransport::new(
			b"channels count = 2, on = 2, settlingtime = 150, readtime = 200, minperiod = 500\r\n",
		));
		let channels = session.channels().unwrap();
		assert!(
			channels
				== Channels { count: 2, on: 2, settling_time_ms: 150, read_time_ms: 200, min_period_ms: 500 }
		);
	}
}
