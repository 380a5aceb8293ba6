//! Generation detection (C10) and the dialect strategy it selects.
//!
//! Rather than scattering `if generation == L2` branches through the
//! classifier, converse loop, and data reader, the L2/L3 differences are
//! grouped behind a single [`Dialect`] value, selected once by [`Generation::from_firmware_type`]
//! during [`crate::Session::identify`] and consulted everywhere else.

/// The two instrument command-dialect generations this crate understands.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Generation {
	/// Positional arguments for some commands, `, ` array separator, error-coded warnings.
	L2,
	/// Explicit `key = value` everywhere, `||`-delimited arrays, `warning = Wnnnn` suffix.
	L3,
	/// Not yet determined; the default before [`crate::Session::identify`] has run.
	Unknown,
}

impl Generation {
	/// Classify a firmware-type code as reported by the instrument's identity response.
	///
	/// Firmware type `0` or in `[100, 103]` is L2; anything else is L3.
	pub fn from_firmware_type(fwtype: u32) -> Self {
		if fwtype == 0 || (100..=103).contains(&fwtype) {
			Self::L2
		} else {
			Self::L3
		}
	}

	/// The dialect this generation implies.
	pub fn dialect(self) -> Dialect {
		Dialect { generation: self }
	}
}

/// Instrument error codes that, on L2 only, are really warnings in disguise.
///
/// The instrument reports these as `Ennnn` but the command otherwise
/// succeeded; the classifier (C5) rewrites them to [`crate::error::ResponseKind::Warning`]
/// and fast-forwards past the leading punctuation to the real response text.
/// Extend this list as more such codes are identified on real hardware.
pub const L2_WARNING_CODES: &[u16] = &[410];

/// The protocol differences between L2 and L3, grouped behind one value.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Dialect {
	pub generation: Generation,
}

impl Dialect {
	pub fn is_l2(&self) -> bool {
		matches!(self.generation, Generation::L2)
	}

	/// The separator joining items within a single list-valued parameter.
	pub fn list_item_separator(&self) -> &'static str {
		if self.is_l2() {
			", "
		} else {
			"|"
		}
	}

	/// The number of bytes to skip over an array-member separator in a response line.
	///
	/// L2 separates array members with `" | "` (3 bytes). L3 repeats the
	/// command word: `" || <cmd> "`, so the skip additionally covers the
	/// command word and its trailing space.
	pub fn array_separator_len(&self, command_word: &str) -> usize {
		if self.is_l2() {
			3
		} else {
			4 + command_word.len() + 1
		}
	}

	/// `true` if `code` is one of the L2 codes that the classifier must rewrite from error to warning.
	pub fn rewrites_error_to_warning(&self, code: u16) -> bool {
		self.is_l2() && L2_WARNING_CODES.contains(&code)
	}

	/// The dataset-read request command word (`read` on L2, `readdata` on L3).
	pub fn data_request_word(&self) -> &'static str {
		if self.is_l2() {
			"read"
		} else {
			"readdata"
		}
	}

	/// The reply tag [`crate::converse`] should expect for a dataset-read request.
	///
	/// L2's `read` request is answered by a `data` line, not an echo of `read`.
	pub fn data_reply_tag(&self) -> &'static str {
		if self.is_l2() {
			"data"
		} else {
			"readdata"
		}
	}
}
