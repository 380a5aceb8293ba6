//! Converse loop (C7) and generation detection (C10).
//!
//! `converse` is the one place every higher-level operation in this crate
//! goes through: format a command, send it, and read responses until the one
//! that actually answers it shows up, skipping samples (handled transparently
//! by [`crate::session::Session::next_line`]) and responses belonging to some
//! other, unrelated command.

use std::fmt;

use crate::classify::{self};
use crate::error::{Error, ResponseKind};
use crate::generation::{Dialect, Generation};
use crate::params::ParamCursor;
use crate::session::{Line, SampleMode, Session};
use crate::transport::Transport;

/// A classified, parameter-ready command response.
pub struct Response {
	pub kind: ResponseKind,
	text: String,
}

impl Response {
	/// The response text C6 should parse: the command word followed by its parameters.
	pub fn text(&self) -> &str {
		&self.text
	}

	/// A parameter cursor (C6) over this response's text.
	pub fn params(&self, dialect: Dialect) -> ParamCursor<'_> {
		ParamCursor::new(dialect, &self.text)
	}

	/// The warning code, if this response carried one.
	pub fn warning_code(&self) -> Option<u16> {
		match self.kind {
			ResponseKind::Warning(code) => Some(code),
			_ => None,
		}
	}
}

/// The parsed reply to an `id` command, and the generation it implies.
#[derive(Debug, Clone)]
pub struct Identity {
	pub model: String,
	pub version: String,
	pub serial: u64,
	pub fwtype: u32,
}

impl<T: Transport> Session<T> {
	/// Send a command and read responses until the one that answers it arrives.
	///
	/// Implements the full retry contract of the converse loop: an
	/// `E0102 invalid command` whose quoted text exactly equals our command is
	/// a real user error and is surfaced; one whose quoted text merely *ends
	/// with* our command indicates serial-line garbage sat ahead of our bytes
	/// in the instrument's receive buffer, and is retried exactly once;
	/// anything else is an unrelated `E0102` and is ignored.
	pub fn converse(&mut self, args: fmt::Arguments) -> Result<Response, Error<T::Error>> {
		let start = self.now();
		let mut retried = false;

		'resend: loop {
			self.write_command(args)?;
			let our_command = self.command_text().to_string();
			let command_word = our_command.split_whitespace().next().unwrap_or("");
			let expected_tag = if command_word == self.dialect.data_request_word() {
				self.dialect.data_reply_tag().to_string()
			} else {
				command_word.to_string()
			};

			loop {
				let body = match self.next_line(start, SampleMode::KeepLooping)? {
					Line::Response(body) => body,
					Line::Sample => unreachable!("KeepLooping never surfaces Line::Sample"),
				};
				let classified = classify::classify(self.dialect, &body);

				match classified.kind {
					ResponseKind::Error(102) => match extract_quoted(classified.text) {
						Some(quoted) if quoted == our_command => {
							return Err(Error::hardware(102, classified.text.to_string()));
						},
						Some(quoted) if quoted.ends_with(our_command.as_str()) => {
							if retried {
								return Err(Error::hardware(102, classified.text.to_string()));
							}
							retried = true;
							debug!("serial-line garbage preceded our command, retrying once");
							continue 'resend;
						},
						_ => continue,
					},
					ResponseKind::Error(code) => {
						return Err(Error::hardware(code, classified.text.to_string()));
					},
					ResponseKind::Info | ResponseKind::Warning(_) => {
						let reply_word = classified.text.split_whitespace().next().unwrap_or("");
						if reply_word == expected_tag {
							if let ResponseKind::Warning(code) = classified.kind {
								warn!("command {:?} succeeded with warning W{:04}", command_word, code);
							}
							return Ok(Response { kind: classified.kind, text: classified.text.to_string() });
						}
						// Unrelated response (e.g. a warning meant for another command); keep reading.
					},
				}
			}
		}
	}

	/// Query instrument identity and resolve [`Session::generation`]/[`Session::dialect`] from it.
	pub fn identify(&mut self) -> Result<Identity, Error<T::Error>> {
		let response = self.converse(format_args!("id"))?;
		let dialect = self.dialect;

		let mut model = None;
		let mut version = None;
		let mut serial = None;
		let mut fwtype = None;
		let mut cursor = response.params(dialect);
		while let Some(param) = cursor.next_param() {
			match param.key {
				"model" => model = Some(param.value.to_string()),
				"version" => version = Some(param.value.to_string()),
				"serial" => serial = param.value.parse().ok(),
				"fwtype" => fwtype = param.value.parse().ok(),
				_ => {},
			}
		}

		let fwtype: u32 = fwtype.ok_or(Error::Unsupported)?;
		self.generation = Generation::from_firmware_type(fwtype);
		self.dialect = self.generation.dialect();
		info!("identified instrument: generation = {:?}, fwtype = {}", self.generation, fwtype);

		Ok(Identity {
			model: model.ok_or(Error::Unsupported)?,
			version: version.ok_or(Error::Unsupported)?,
			serial: serial.ok_or(Error::Unsupported)?,
			fwtype,
		})
	}
}

/// Extract the text between the first and second single quote in `message`.
fn extract_quoted(message: &str) -> Option<&str> {
	let first = message.find('\'')?;
	let rest = &message[first + 1..];
	let last = rest.find('\'')?;
	Some(&rest[..last])
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::error::Error;
	use assert2::{assert, let_assert};
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
	fn identity_l3() {
		let mut session = Session::new(ScriptedTransport::new(
			b"id model = RBRconcerto3, version = 1.105, serial = 123456, fwtype = 104\r\nReady: \r\n",
		));
		let identity = session.identify().unwrap();
		assert!(identity.model == "RBRconcerto3");
		assert!(identity.version == "1.105");
		assert!(identity.serial == 123456);
		assert!(identity.fwtype == 104);
		assert!(session.generation() == Generation::L3);
	}

	#[test]
	fn warning_parsing_hides_warning_key() {
		let mut session = Session::new(ScriptedTransport::new(b"verify status = logging, warning = W0401\r\n"));
		let response = session.converse(format_args!("verify")).unwrap();
		assert!(response.warning_code() == Some(401));
		let mut cursor = response.params(Generation::L3.dialect());
		let param = cursor.next_param().unwrap();
		assert!(param.key == "status" && param.value == "logging");
		assert!(cursor.next_param().is_none());
	}

	#[test]
	fn l2_warning_rewrite() {
		let mut session = Session::new(ScriptedTransport::new(
			b"E0410 estimated memory usage exceeds capacity, verify status = pending\r\n",
		));
		session.generation = Generation::L2;
		session.dialect = Generation::L2.dialect();
		let response = session.converse(format_args!("verify")).unwrap();
		assert!(response.warning_code() == Some(410));
		let mut cursor = response.params(Generation::L2.dialect());
		let param = cursor.next_param().unwrap();
		assert!(param.key == "status" && param.value == "pending");
	}

	#[test]
	fn invalid_command_retry_exactly_once() {
		let mut session = Session::new(ScriptedTransport::new(
			b"E0102 invalid command 'xxxid'\r\nid model = X, version = 1, serial = 1, fwtype = 104\r\n",
		));
		let identity = session.identify().unwrap();
		assert!(identity.model == "X");
	}

	#[test]
	fn invalid_command_exact_match_is_a_real_error() {
		let mut session = Session::new(ScriptedTransport::new(b"E0102 invalid command 'id'\r\n"));
		let_assert!(Err(Error::HardwareError { code, .. }) = session.identify());
		assert!(code == 102);
	}

	#[test]
	fn invalid_command_for_unrelated_command_is_ignored() {
		let mut session = Session::new(ScriptedTransport::new(
			b"E0102 invalid command 'zzz'\r\nid model = X, version = 1, serial = 1, fwtype = 104\r\n",
		));
		let identity = session.identify().unwrap();
		assert!(identity.model == "X");
	}

	#[test]
	fn sample_during_command_is_delivered_without_consuming_reply() {
		let mut session = Session::new(ScriptedTransport::new(
			b"2024-05-01 12:00:00.000, 20.1234, 35.0000\r\nchannels count = 2, on = 2, settlingtime = 150, readtime = 200, minperiod = 500\r\n",
		));
		let seen = std::rc::Rc::new(RefCell::new(0u32));
		let seen_clone = seen.clone();
		session.set_sample_sink(move |_sample| *seen_clone.borrow_mut() += 1);

		let response = session.converse(format_args!("channels")).unwrap();
		assert!(*seen.borrow() == 1);
		assert!(response.text().starts_with("channels count = 2"));
	}
}
