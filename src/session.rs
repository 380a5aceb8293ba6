//! Session manager: command framer & wake manager (C2), line reassembler (C3),
//! and the sample-recognizing read loop that sits between them and C4.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{Error, TransportError};
use crate::generation::{Dialect, Generation};
use crate::sample::{self, Sample};
use crate::transport::Transport;

/// Per-session tunables, all defaulted and overridable before a [`Session`] is built.
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Number of channels a [`Sample`] can hold; excess wire channels are dropped.
	pub channel_max: usize,
	/// Maximum length, in bytes, of a formatted command including its `\r\n` terminator.
	pub command_capacity: usize,
	/// Size, in bytes, of the response buffer backing the line reassembler.
	pub response_capacity: usize,
	/// Whole-command deadline enforced by the line reassembler.
	pub command_timeout: Duration,
	/// Idle duration after which a command is preceded by a wake pulse.
	pub wake_threshold: Duration,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			channel_max: 32,
			command_capacity: 120,
			response_capacity: 1024,
			command_timeout: Duration::from_secs(10),
			wake_threshold: Duration::from_secs(10),
		}
	}
}

/// Whether a read loop returns as soon as a sample line is recognized, or keeps
/// reading until a non-sample response arrives.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum SampleMode {
	KeepLooping,
	BreakOnSample,
}

/// The outcome of reading and classifying one line via [`Session::next_line`].
pub(crate) enum Line {
	/// A sample line was recognized and handed to the sample sink (if any).
	Sample,
	/// A non-sample response body, ready for classification (C5).
	Response(String),
}

/// One logical connection to an instrument.
///
/// Owns the response buffer, the wake/activity clock, and the generation/dialect
/// resolved by [`crate::Session::identify`]. Not `Send`/`Sync`: it holds a `&mut`-style
/// exclusive grip on its transport and buffers, so sharing one across threads
/// requires the caller's own `Mutex`, exactly as a single-threaded protocol core demands.
pub struct Session<T: Transport> {
	pub(crate) transport: T,
	pub(crate) options: SessionOptions,
	command_text: String,
	pub(crate) response_buffer: Vec<u8>,
	pub(crate) response_len: usize,
	pub(crate) last_response_length: usize,
	last_activity: Option<Instant>,
	pub(crate) generation: Generation,
	pub(crate) dialect: Dialect,
	sample_sink: Option<Box<dyn FnMut(&Sample)>>,
}

impl<T: Transport> Session<T> {
	/// Build a session with default [`SessionOptions`].
	pub fn new(transport: T) -> Self {
		Self::with_options(transport, SessionOptions::default())
	}

	/// Build a session with caller-supplied tunables.
	pub fn with_options(transport: T, options: SessionOptions) -> Self {
		let response_buffer = vec![0u8; options.response_capacity];
		Self {
			transport,
			command_text: String::with_capacity(options.command_capacity),
			response_buffer,
			response_len: 0,
			last_response_length: 0,
			last_activity: None,
			generation: Generation::Unknown,
			dialect: Generation::Unknown.dialect(),
			sample_sink: None,
			options,
		}
	}

	/// The generation resolved by [`crate::Session::identify`] (`Unknown` before it has run).
	pub fn generation(&self) -> Generation {
		self.generation
	}

	/// The dialect implied by [`Session::generation`].
	pub fn dialect(&self) -> Dialect {
		self.dialect
	}

	/// Install a callback invoked once per recognized sample line.
	pub fn set_sample_sink<F>(&mut self, sink: F)
	where
		F: FnMut(&Sample) + 'static,
	{
		self.sample_sink = Some(Box::new(sink));
	}

	/// Remove any previously installed sample sink.
	pub fn clear_sample_sink(&mut self) {
		self.sample_sink = None;
	}

	/// Block until the next sample line arrives, ignoring any stray command responses.
	///
	/// Intended for a pure streaming loop; a [`crate::converse`] round-trip
	/// uses [`SampleMode::KeepLooping`] instead so samples arriving between a
	/// command and its reply are forwarded without disturbing the pending reply.
	pub fn read_sample(&mut self) -> Result<(), Error<T::Error>> {
		let start = self.transport.now();
		loop {
			match self.next_line(start, SampleMode::BreakOnSample)? {
				Line::Sample => return Ok(()),
				Line::Response(_) => continue,
			}
		}
	}

	pub(crate) fn now(&self) -> Instant {
		self.transport.now()
	}

	/// The most recently formatted command text, without its `\r\n` terminator.
	pub(crate) fn command_text(&self) -> &str {
		&self.command_text
	}

	/// Format and send a command, waking the instrument first if it has been idle.
	pub(crate) fn write_command(&mut self, args: fmt::Arguments) -> Result<(), Error<T::Error>> {
		self.command_text.clear();
		fmt::Write::write_fmt(&mut self.command_text, args).map_err(|_| Error::BufferTooSmall)?;
		if self.command_text.len() + 2 > self.options.command_capacity {
			return Err(Error::BufferTooSmall);
		}

		self.wake_if_idle()?;

		trace!("writing command: {:?}", self.command_text);
		self.transport.write(self.command_text.as_bytes())?;
		self.transport.write(b"\r\n")?;
		self.last_activity = Some(self.transport.now());
		Ok(())
	}

	fn wake_if_idle(&mut self) -> Result<(), Error<T::Error>> {
		let now = self.transport.now();
		let idle = match self.last_activity {
			None => true,
			Some(last) => now.duration_since(last) > self.options.wake_threshold,
		};
		if idle {
			debug!("instrument idle beyond wake threshold, sending wake pulses");
			self.transport.write(b"\r\n")?;
			self.transport.sleep(Duration::from_millis(50));
			self.transport.write(b"\r\n")?;
		}
		Ok(())
	}

	/// Read and classify the next line, dispatching samples to the sample sink as they arrive.
	pub(crate) fn next_line(&mut self, start_time: Instant, mode: SampleMode) -> Result<Line, Error<T::Error>> {
		loop {
			let body = self.read_line_raw(start_time)?;
			match sample::try_parse_sample(&body, self.options.channel_max) {
				Some(sample) => {
					if let Some(sink) = self.sample_sink.as_mut() {
						sink(&sample);
					}
					if mode == SampleMode::BreakOnSample {
						return Ok(Line::Sample);
					}
				},
				None => return Ok(Line::Response(body)),
			}
		}
	}

	/// Read one `\r\n`-terminated line, with the `Ready: ` prompt prefix and
	/// leading whitespace already stripped.
	fn read_line_raw(&mut self, start_time: Instant) -> Result<String, Error<T::Error>> {
		self.evict_consumed();

		loop {
			if let Some(terminator) = find_terminator(&self.response_buffer[..self.response_len]) {
				self.last_response_length = terminator + 2;
				let body = std::str::from_utf8(&self.response_buffer[..terminator]).unwrap_or_default();
				return Ok(strip_prompt(body).to_string());
			}

			if self.transport.now().duration_since(start_time) > self.options.command_timeout {
				return Err(Error::Timeout);
			}

			if self.response_len == self.response_buffer.len() {
				warn!("response buffer full with no terminator, discarding {} bytes", self.response_len);
				self.response_len = 0;
				self.last_response_length = 0;
				continue;
			}

			match self.transport.read(&mut self.response_buffer[self.response_len..]) {
				Ok(n) => self.response_len += n,
				Err(TransportError::Timeout) => continue,
				Err(TransportError::Other(e)) => return Err(Error::CallbackError(e)),
			}
		}
	}

	/// Evict the previously consumed response from the front of the buffer.
	///
	/// Deferred to the start of the *next* read (rather than done at
	/// classification time) so that a [`crate::params::ParamCursor`] borrowing
	/// the just-classified text stays valid for the lifetime of that response.
	fn evict_consumed(&mut self) {
		if self.last_response_length > 0 {
			self.response_buffer.copy_within(self.last_response_length..self.response_len, 0);
			self.response_len -= self.last_response_length;
			self.last_response_length = 0;
		}
	}
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
	buffer.windows(2).position(|w| w == b"\r\n")
}

fn strip_prompt(mut body: &str) -> &str {
	body = body.trim_start_matches(|c: char| c.is_ascii_whitespace());
	while let Some(rest) = body.strip_prefix("Ready: ") {
		body = rest;
	}
	body
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::{assert, let_assert};
	use std::cell::RefCell;
	use std::collections::VecDeque;

	/// A trivial in-process transport for exercising the session plumbing without I/O.
	struct ScriptedTransport {
		inbound: VecDeque<u8>,
		outbound: RefCell<Vec<u8>>,
		clock: RefCell<Instant>,
	}

	impl ScriptedTransport {
		fn new(script: &[u8]) -> Self {
			Self { inbound: script.iter().copied().collect(), outbound: RefCell::new(Vec::new()), clock: RefCell::new(Instant::now()) }
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

		fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError<Self::Error>> {
			if self.inbound.is_empty() {
				return Err(TransportError::Timeout);
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

		fn write(&mut self, buf: &[u8]) -> Result<(), TransportError<Self::Error>> {
			self.outbound.borrow_mut().extend_from_slice(buf);
			Ok(())
		}
	}

	fn session_with(script: &[u8]) -> Session<ScriptedTransport> {
		Session::new(ScriptedTransport::new(script))
	}

	#[test]
	fn reads_one_line_and_strips_ready_prompt() {
		let mut session = session_with(b"Ready: id model = X\r\n");
		let start = session.now();
		let_assert!(Ok(Line::Response(body)) = session.next_line(start, SampleMode::KeepLooping));
		assert!(body == "id model = X");
	}

	#[test]
	fn skips_leading_whitespace() {
		let mut session = session_with(b"   channels count = 1\r\n");
		let start = session.now();
		let_assert!(Ok(Line::Response(body)) = session.next_line(start, SampleMode::KeepLooping));
		assert!(body == "channels count = 1");
	}

	#[test]
	fn sample_line_invokes_sink_and_keeps_looping() {
		let mut session = session_with(b"2024-05-01 12:00:00.000, 20.1234, 35.0000\r\nchannels count = 2\r\n");
		let seen = std::rc::Rc::new(RefCell::new(Vec::new()));
		let seen_clone = seen.clone();
		session.set_sample_sink(move |sample| seen_clone.borrow_mut().push(sample.clone()));

		let start = session.now();
		let_assert!(Ok(Line::Response(body)) = session.next_line(start, SampleMode::KeepLooping));
		assert!(body == "channels count = 2");
		assert!(seen.borrow().len() == 1);
		assert!(seen.borrow()[0].timestamp_ms == 1_714_564_800_000);
	}

	#[test]
	fn break_on_sample_returns_without_consuming_following_response() {
		let mut session = session_with(b"2024-05-01 12:00:00.000, 1.0\r\nchannels count = 1\r\n");
		let start = session.now();
		let_assert!(Ok(Line::Sample) = session.next_line(start, SampleMode::BreakOnSample));
		let_assert!(Ok(Line::Response(body)) = session.next_line(start, SampleMode::KeepLooping));
		assert!(body == "channels count = 1");
	}

	#[test]
	fn eviction_happens_on_next_read_not_at_classification() {
		let mut session = session_with(b"a = 1\r\nb = 2\r\n");
		let start = session.now();
		let_assert!(Ok(Line::Response(first)) = session.next_line(start, SampleMode::KeepLooping));
		assert!(first == "a = 1");
		// The second line's bytes are still sitting in the buffer, unevicted.
		assert!(session.last_response_length > 0);
		let_assert!(Ok(Line::Response(second)) = session.next_line(start, SampleMode::KeepLooping));
		assert!(second == "b = 2");
	}

	#[test]
	fn buffer_full_without_terminator_discards_once() {
		let mut options = SessionOptions::default();
		options.response_capacity = 8;
		options.command_timeout = Duration::from_secs(5);
		let mut session = Session::with_options(ScriptedTransport::new(b"XXXXXXXXa = 1\r\n"), options);
		let start = session.now();
		let_assert!(Ok(Line::Response(body)) = session.next_line(start, SampleMode::KeepLooping));
		assert!(body == "a = 1");
	}

	#[test]
	fn whole_command_timeout_elapses_without_terminator() {
		let mut options = SessionOptions::default();
		options.command_timeout = Duration::from_millis(0);
		let mut session = Session::with_options(ScriptedTransport::new(b"no terminator here"), options);
		let start = session.now();
		session.transport.sleep(Duration::from_millis(1));
		let_assert!(Err(Error::Timeout) = session.next_line(start, SampleMode::KeepLooping));
	}

	#[test]
	fn write_command_rejects_over_long_commands() {
		let mut options = SessionOptions::default();
		options.command_capacity = 8;
		let mut session = Session::with_options(ScriptedTransport::new(b""), options);
		let_assert!(Err(Error::BufferTooSmall) = session.write_command(format_args!("way too long for the buffer")));
	}

	#[test]
	fn write_command_wakes_after_idle_threshold() {
		let mut options = SessionOptions::default();
		options.wake_threshold = Duration::from_secs(1);
		let mut session = Session::with_options(ScriptedTransport::new(b""), options);
		assert!(session.write_command(format_args!("id")).is_ok());
		let first_write_len = session.transport.outbound.borrow().len();
		// id\r\n preceded by two wake pulses: \r\n \r\n id \r\n
		assert!(first_write_len == 2 + 2 + 4);
	}
}
