//! Response classifier (C5).
//!
//! Classifies a completed, non-sample response line as info, warning, or
//! error, and hands back the slice of text that the parameter parser (C6)
//! should actually walk — with any warning suffix or leading error noise
//! already stripped off.

use crate::error::ResponseKind;
use crate::generation::Dialect;

const L3_WARNING_PREFIX: &str = ", warning = W";

/// The outcome of classifying a response line.
pub struct Classified<'a> {
	pub kind: ResponseKind,
	/// The text C6 should parse: the command word followed by its parameters.
	///
	/// For [`ResponseKind::Error`], this is instead the instrument's
	/// human-readable error message, which is not parameter-shaped and is
	/// not fed to C6.
	pub text: &'a str,
}

/// Classify `body`, the response text after line-termination, leading
/// whitespace, and any `"Ready: "` prompt prefix have already been stripped
/// by the line reassembler (C3).
pub fn classify<'a>(dialect: Dialect, body: &'a str) -> Classified<'a> {
	if let Some((code, message)) = error_prefix(body) {
		if dialect.rewrites_error_to_warning(code) {
			return Classified { kind: ResponseKind::Warning(code), text: rewrite_past_leading_punctuation(message) };
		}
		return Classified { kind: ResponseKind::Error(code), text: message };
	}

	if let Some((code, rest)) = l3_warning_suffix(body) {
		return Classified { kind: ResponseKind::Warning(code), text: rest };
	}

	Classified { kind: ResponseKind::Info, text: body }
}

/// `Some((code, message))` if `body` begins with `Ennnn `.
fn error_prefix(body: &str) -> Option<(u16, &str)> {
	let bytes = body.as_bytes();
	if bytes.first() != Some(&b'E') || bytes.len() < 6 {
		return None;
	}
	let digits = body.get(1..5)?;
	if !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let code: u16 = digits.parse().ok()?;
	// Byte 5 is the space after the 4-digit code; the message starts at byte 6.
	Some((code, body.get(6..).unwrap_or("")))
}

/// Skip past the first `,` or `'` in an L2 warning-rewrite message, landing on the real response text.
fn rewrite_past_leading_punctuation(message: &str) -> &str {
	match message.find([',', '\'']) {
		Some(idx) => message[idx + 1..].trim_start(),
		None => message,
	}
}

/// `Some((code, prefix))` if `body` ends with the L3 `", warning = Wnnnn"` suffix.
fn l3_warning_suffix(body: &str) -> Option<(u16, &str)> {
	let total_len = L3_WARNING_PREFIX.len() + 4;
	if body.len() < total_len {
		return None;
	}
	let start = body.len() - total_len;
	let prefix = &body[start..start + L3_WARNING_PREFIX.len()];
	if prefix != L3_WARNING_PREFIX {
		return None;
	}
	let digits = &body[start + L3_WARNING_PREFIX.len()..];
	if !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let code: u16 = digits.parse().ok()?;
	Some((code, &body[..start]))
}
