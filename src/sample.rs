//! Sample encoding (C9) and recognition (C4).
//!
//! A reading is normally a plain `f64`. When the instrument wants to annotate
//! a reading as uncalibrated or erroring, it smuggles a 1-byte flag and a
//! 1-byte code into the payload bits of a quiet NaN, so that consumers who
//! don't know about the encoding still see arithmetic propagate a "bad"
//! value rather than a plausible-looking number. [`Reading`] is the safe,
//! tagged representation this crate hands to callers; [`Reading::to_wire`]
//! and [`Reading::from_wire`] are the only places the bit-level encoding is
//! visible, confined to the `wire` submodule below.

/// A single channel reading, decoded from the instrument's wire representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
	/// A normal finite value, or an IEEE infinity, or a plain (unannotated) NaN.
	Value(f64),
	/// The channel has not yet been calibrated (wire token `###`).
	Uncalibrated,
	/// The channel reported a hardware error with the given code (wire token `Error-NN`).
	Error(u8),
}

impl Reading {
	/// Encode this reading as the `f64` the instrument's wire protocol would carry.
	pub fn to_wire(self) -> f64 {
		match self {
			Self::Value(v) => v,
			Self::Uncalibrated => wire::set_error(wire::Flag::Uncalibrated, 0),
			Self::Error(code) => wire::set_error(wire::Flag::Error, code),
		}
	}

	/// Decode a wire `f64` into a tagged [`Reading`].
	pub fn from_wire(bits: f64) -> Self {
		if !bits.is_nan() {
			return Self::Value(bits);
		}
		match wire::get_flag(bits) {
			wire::Flag::None => Self::Value(bits),
			wire::Flag::Uncalibrated => Self::Uncalibrated,
			wire::Flag::Error => Self::Error(wire::get_error(bits)),
		}
	}
}

/// The raw NaN-payload encoding used by the instrument's wire format.
///
/// Exposed directly (rather than only through [`Reading`]) for consumers that
/// need the wire-compatible bit pattern itself, such as a future reader for
/// the instrument's binary dataset format.
pub mod wire {
	/// The annotation carried in a NaN payload alongside its 1-byte code.
	#[derive(Debug, Clone, Copy, Eq, PartialEq)]
	pub enum Flag {
		/// Not a NaN, or a NaN with no recognized annotation.
		None,
		/// The channel has not yet been calibrated.
		Uncalibrated,
		/// The channel reported a hardware error.
		Error,
	}

	// A canonical quiet NaN: all exponent bits set, quiet bit (top mantissa bit) set,
	// sign bit clear. The flag and code occupy the low 16 payload bits, as far as
	// possible from the quiet bit, so that a platform's signaling-NaN canonicalization
	// (which only ever touches the top of the payload) cannot disturb them.
	const QUIET_NAN: u64 = 0x7ff8_0000_0000_0000;
	const FLAG_SHIFT: u64 = 8;
	const CODE_MASK: u64 = 0xFF;
	const FLAG_MASK: u64 = 0xFF;

	/// Construct a quiet NaN whose payload encodes `(flag, code)`.
	pub fn set_error(flag: Flag, code: u8) -> f64 {
		let flag_bits = match flag {
			Flag::None => 0u64,
			Flag::Uncalibrated => 1,
			Flag::Error => 2,
		};
		let bits = QUIET_NAN | (flag_bits << FLAG_SHIFT) | code as u64;
		f64::from_bits(bits)
	}

	/// Extract the flag encoded in `value`'s NaN payload, or `Flag::None` if `value` is not a NaN.
	pub fn get_flag(value: f64) -> Flag {
		if !value.is_nan() {
			return Flag::None;
		}
		match (value.to_bits() >> FLAG_SHIFT) & FLAG_MASK {
			1 => Flag::Uncalibrated,
			2 => Flag::Error,
			_ => Flag::None,
		}
	}

	/// Extract the code encoded in `value`'s NaN payload, or `0` if `value` is not a NaN.
	pub fn get_error(value: f64) -> u8 {
		if !value.is_nan() {
			return 0;
		}
		(value.to_bits() & CODE_MASK) as u8
	}

	#[cfg(test)]
	mod test {
		use super::*;
		use assert2::assert;

		#[test]
		fn roundtrip_all_codes() {
			for flag in [Flag::Uncalibrated, Flag::Error] {
				for code in 0..=255u8 {
					let encoded = set_error(flag, code);
					assert!(encoded.is_nan());
					assert!(get_flag(encoded) == flag);
					assert!(get_error(encoded) == code);
				}
			}
		}

		#[test]
		fn plain_values_have_no_flag() {
			assert!(get_flag(1.0) == Flag::None);
			assert!(get_flag(f64::INFINITY) == Flag::None);
			assert!(get_flag(f64::NEG_INFINITY) == Flag::None);
			assert!(get_error(1.0) == 0);
		}

		#[test]
		fn plain_nan_decodes_to_none_flag() {
			assert!(get_flag(f64::NAN) == Flag::None);
		}
	}
}

/// A timestamped, multi-channel measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
	/// Milliseconds since the Unix epoch, UTC.
	pub timestamp_ms: i64,
	/// One reading per logged channel, in instrument channel order.
	pub readings: Vec<Reading>,
}

fn parse_reading_token(token: &str) -> Option<Reading> {
	let token = token.trim();
	if token.eq_ignore_ascii_case("nan") {
		return Some(Reading::Value(f64::NAN));
	}
	if token.eq_ignore_ascii_case("inf") {
		return Some(Reading::Value(f64::INFINITY));
	}
	if token.eq_ignore_ascii_case("-inf") {
		return Some(Reading::Value(f64::NEG_INFINITY));
	}
	if token == "###" {
		return Some(Reading::Uncalibrated);
	}
	if let Some(code) = token.strip_prefix("Error-") {
		return code.parse::<u8>().ok().map(Reading::Error);
	}
	token.parse::<f64>().ok().map(Reading::Value)
}

/// Attempt to interpret `line` (already stripped of its `\r\n` terminator) as a sample.
///
/// Returns `None` if `line` does not begin with a sample-format timestamp, or
/// if that timestamp falls outside the instrument's valid range; either way
/// the caller should then treat the line as a command response instead.
/// Up to `channel_max` readings are kept; any further comma-separated tokens
/// are silently dropped, per the instrument's own channel-count cap.
pub fn try_parse_sample(line: &str, channel_max: usize) -> Option<Sample> {
	if line.len() < 23 {
		return None;
	}
	let timestamp_ms = crate::time::parse_sample_timestamp(&line[..23])?;
	if !crate::time::in_valid_range(timestamp_ms) {
		return None;
	}
	let rest = line[23..].strip_prefix(',')?;

	let mut readings = Vec::with_capacity(channel_max.min(32));
	for token in rest.split(',') {
		if readings.len() >= channel_max {
			break;
		}
		readings.push(parse_reading_token(token)?);
	}
	Some(Sample { timestamp_ms, readings })
}
