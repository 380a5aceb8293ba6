use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rbrlink::error::TransportError;
use rbrlink::Transport;

/// A scripted [`Transport`] for integration tests: bytes queued up front are
/// handed back a few at a time, as a real character-timed serial link would.
#[derive(Clone)]
pub struct MockTransport {
	inbound: Arc<Mutex<VecDeque<u8>>>,
	pub written: Arc<Mutex<Vec<u8>>>,
	clock: Arc<Mutex<Instant>>,
}

impl MockTransport {
	pub fn new(script: &[u8]) -> Self {
		Self {
			inbound: Arc::new(Mutex::new(script.iter().copied().collect())),
			written: Arc::new(Mutex::new(Vec::new())),
			clock: Arc::new(Mutex::new(Instant::now())),
		}
	}
}

impl Transport for MockTransport {
	type Error = std::convert::Infallible;

	fn now(&self) -> Instant {
		*self.clock.lock().unwrap()
	}

	fn sleep(&self, duration: Duration) {
		*self.clock.lock().unwrap() += duration;
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError<Self::Error>> {
		let mut inbound = self.inbound.lock().unwrap();
		if inbound.is_empty() {
			return Err(TransportError::Timeout);
		}
		let mut n = 0;
		while n < buf.len() {
			match inbound.pop_front() {
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
		self.written.lock().unwrap().extend_from_slice(buf);
		Ok(())
	}
}
