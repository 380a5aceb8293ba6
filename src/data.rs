//! Chunked data reader (C8): paged reads of on-instrument memory with a
//! CRC-16/CCITT-verified binary trailer.

use crate::crc16;
use crate::converse::Response;
use crate::error::{Error, TransportError};
use crate::generation::Dialect;
use crate::session::Session;
use crate::transport::Transport;

/// Dataset identifiers this crate knows how to request.
///
/// The instrument's full dataset catalog (clock log, calibration, schedule,
/// ...) is an external, mechanical concern; this lists only the dataset
/// exercised by this crate's own example operations. Extend as more are identified.
pub const KNOWN_DATASETS: &[u32] = &[1];

/// A request to read a chunk of a dataset at a given offset.
#[derive(Debug, Clone, Copy)]
pub struct DataRequest {
	pub dataset: u32,
	pub requested_size: u32,
	pub offset: u64,
}

/// The instrument's authoritative account of what was actually delivered.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DataReadResult {
	pub dataset: u32,
	/// Bytes actually delivered; `<= requested_size`, may be `0` at EOF.
	pub size: u32,
	pub offset: u64,
}

impl<T: Transport> Session<T> {
	/// Read up to `request.requested_size` bytes of `request.dataset` at `request.offset`
	/// into `buffer`, verifying the CRC-16/CCITT trailer the instrument appends.
	///
	/// A download interrupted partway through resumes by calling again with
	/// `request.offset` set to the number of bytes already committed by the caller.
	pub fn read_data(&mut self, request: DataRequest, buffer: &mut [u8]) -> Result<DataReadResult, Error<T::Error>> {
		if !KNOWN_DATASETS.contains(&request.dataset) {
			return Err(Error::InvalidParameterValue);
		}
		if request.requested_size as usize > buffer.len() {
			return Err(Error::InvalidParameterValue);
		}

		let dialect = self.dialect;
		let response = if dialect.is_l2() {
			self.converse(format_args!("read data {} {} {}", request.dataset, request.requested_size, request.offset))?
		} else {
			self.converse(format_args!(
				"readdata dataset = {}, size = {}, offset = {}",
				request.dataset, request.requested_size, request.offset
			))?
		};

		let (dataset, size, offset) = parse_ack(dialect, &response)?;

		if size == 0 {
			return Ok(DataReadResult { dataset, size: 0, offset });
		}

		let payload = &mut buffer[..size as usize];
		self.drain_then_poll(payload)?;

		let mut trailer_bytes = [0u8; 2];
		self.drain_then_poll(&mut trailer_bytes)?;
		let trailer = u16::from_be_bytes(trailer_bytes);
		let computed = crc16::compute(payload);
		if computed != trailer {
			debug!("CRC mismatch on dataset {} at offset {}: computed {:04x}, trailer {:04x}", dataset, offset, computed, trailer);
			return Err(Error::ChecksumError);
		}

		Ok(DataReadResult { dataset, size, offset })
	}

	/// Fill `dest` from bytes already sitting in the response buffer past the
	/// just-consumed ack line, then poll the transport for the rest.
	fn drain_then_poll(&mut self, dest: &mut [u8]) -> Result<(), Error<T::Error>> {
		let available = self.response_len - self.last_response_length;
		let take = available.min(dest.len());
		if take > 0 {
			let start = self.last_response_length;
			dest[..take].copy_from_slice(&self.response_buffer[start..start + take]);
			self.last_response_length += take;
		}

		let mut filled = take;
		while filled < dest.len() {
			match self.transport.read(&mut dest[filled..]) {
				Ok(n) => filled += n,
				Err(TransportError::Timeout) => continue,
				Err(TransportError::Other(e)) => return Err(Error::CallbackError(e)),
			}
		}
		Ok(())
	}
}

fn parse_ack<E>(dialect: Dialect, response: &Response) -> Result<(u32, u32, u64), Error<E>> {
	if dialect.is_l2() {
		let mut parts = response.text().split_whitespace();
		parts.next(); // "data"
		let dataset = parts.next().and_then(|s| s.parse().ok()).ok_or(Error::Unsupported)?;
		let size = parts.next().and_then(|s| s.parse().ok()).ok_or(Error::Unsupported)?;
		let offset = parts.next().and_then(|s| s.parse().ok()).ok_or(Error::Unsupported)?;
		Ok((dataset, size, offset))
	} else {
		let mut dataset = None;
		let mut size = None;
		let mut offset = None;
		let mut cursor = response.params(dialect);
		while let Some(param) = cursor.next_param() {
			match param.key {
				"dataset" => dataset = param.value.parse().ok(),
				"size" => size = param.value.parse().ok(),
				"offset" => offset = param.value.parse().ok(),
				_ => {},
			}
		}
		Ok((dataset.ok_or(Error::Unsupported)?, size.ok_or(Error::Unsupported)?, offset.ok_or(Error::Unsupported)?))
	}
}
