//! The [`Transport`] trait abstracts the byte-oriented link to the instrument.
//!
//! A [`crate::Session`] never talks to a serial port directly; it only calls
//! the four blocking operations below. This keeps the protocol core portable
//! across serial, TCP-bridge, or file-replay transports, and is what makes
//! the session manager testable against a scripted [`crate::Session`] without
//! any real hardware.

#[cfg(feature = "sync")]
pub mod serial2;

use std::time::{Duration, Instant};

use crate::error::TransportError;

/// The four blocking operations a [`crate::Session`] needs from its link to the instrument.
///
/// All four operations must block: `read`/`write` until their caller-defined
/// timeout elapses or progress is made, `sleep` for at least the requested
/// duration. None of them may spin or return spuriously early.
pub trait Transport {
	/// The error type returned when a callback fails for a reason other than a timeout.
	type Error;

	/// The current monotonic time.
	///
	/// Must never go backwards between two calls on the same transport.
	fn now(&self) -> Instant;

	/// Block the calling thread for at least `duration`.
	fn sleep(&self, duration: Duration);

	/// Fill as much of `buf` as is available, blocking until at least one byte
	/// arrives or a character timeout elapses.
	///
	/// On success, returns the number of bytes written to the front of `buf`,
	/// which may be less than `buf.len()` and is never `0` except when the
	/// transport's own partial-read timeout fires without delivering any byte
	/// (in which case [`TransportError::Timeout`] must be returned instead of `Ok(0)`).
	fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError<Self::Error>>;

	/// Write the entirety of `buf`, blocking until all bytes are sent or a
	/// caller-defined timeout elapses.
	fn write(&mut self, buf: &[u8]) -> Result<(), TransportError<Self::Error>>;
}
