//! Parameter parser (C6).
//!
//! Walks a classified response line yielding `{indexValue?, key, value}`
//! triplets. The cursor never allocates: every key, value, and index value
//! it yields is a borrowed slice of the response text handed to [`ParamCursor::new`].

use crate::generation::Dialect;

/// One parameter yielded by a [`ParamCursor`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Param<'a> {
	/// The per-entry index, for index-prefixed parameters like `regime 1 boundary = 50`.
	pub index_value: Option<&'a str>,
	pub key: &'a str,
	pub value: &'a str,
}

/// A stateful, borrowing cursor over a response's `key = value` parameters.
pub struct ParamCursor<'a> {
	text: &'a str,
	dialect: Dialect,
	command_word: &'a str,
	pos: usize,
	exhausted: bool,
}

impl<'a> ParamCursor<'a> {
	/// Start a cursor over `text`, the response body already isolated by the classifier (C5).
	pub fn new(dialect: Dialect, text: &'a str) -> Self {
		let word_end = text.find(' ').unwrap_or(text.len());
		// If the command word is immediately followed by " = ", it doubles as the
		// first parameter's key (e.g. the L2 response `link = usb`), so parameters
		// start at the very beginning of the text instead of after the command word.
		if word_end < text.len() && text[word_end..].starts_with(" = ") {
			Self {
				text,
				dialect,
				command_word: &text[..word_end],
				pos: 0,
				exhausted: text.is_empty(),
			}
		} else {
			let params_start = (word_end + 1).min(text.len());
			Self {
				text,
				dialect,
				command_word: &text[..word_end],
				pos: params_start,
				exhausted: params_start >= text.len(),
			}
		}
	}

	/// The command word this response echoes (e.g. `channels`, `verify`, `id`).
	pub fn command_word(&self) -> &'a str {
		self.command_word
	}

	/// Yield the next parameter, or `None` once the cursor is exhausted.
	pub fn next_param(&mut self) -> Option<Param<'a>> {
		if self.exhausted {
			return None;
		}

		let key_region_start = self.pos;
		let eq1_rel = self.text[key_region_start..].find(" = ")?;
		let eq1 = key_region_start + eq1_rel;
		let key_segment = &self.text[key_region_start..eq1];
		let (index_value, key) = match key_segment.find(' ') {
			Some(sp) => (Some(&key_segment[..sp]), &key_segment[sp + 1..]),
			None => (None, key_segment),
		};

		let value_start = eq1 + 3;
		match self.text[value_start..].find(" = ") {
			Some(eq2_rel) => {
				let eq2 = value_start + eq2_rel;
				let between = &self.text[value_start..eq2];
				match rfind_separator(between, self.dialect, self.command_word) {
					Some((idx, sep_len)) => {
						self.pos = value_start + idx + sep_len;
						Some(Param { index_value, key, value: &between[..idx] })
					},
					// No recognized separator between this value and the next key's
					// " = ": conservatively treat the rest of the response as this
					// value and stop, rather than guessing a boundary.
					None => {
						self.exhausted = true;
						Some(Param { index_value, key, value: between })
					},
				}
			},
			None => {
				self.exhausted = true;
				Some(Param { index_value, key, value: &self.text[value_start..] })
			},
		}
	}
}

impl<'a> Iterator for ParamCursor<'a> {
	type Item = Param<'a>;

	fn next(&mut self) -> Option<Self::Item> {
		self.next_param()
	}
}

/// Find the rightmost occurrence of a valid parameter separator in `segment`.
///
/// Returns `(byte offset in segment, separator length)`. Checks both the
/// standard `, ` separator and the dialect's array-member separator, and
/// picks whichever occurs closer to the end of `segment` — that is the
/// boundary immediately preceding the next key.
fn rfind_separator(segment: &str, dialect: Dialect, command_word: &str) -> Option<(usize, usize)> {
	const STANDARD: &str = ", ";
	let array_separator = if dialect.is_l2() { " | ".to_string() } else { format!(" || {command_word} ") };
	let array_separator_len = dialect.array_separator_len(command_word);

	let standard = segment.rfind(STANDARD).map(|idx| (idx, STANDARD.len()));
	let array = segment.rfind(array_separator.as_str()).map(|idx| (idx, array_separator_len));

	match (standard, array) {
		(Some(s), Some(a)) => Some(if a.0 > s.0 { a } else { s }),
		(Some(s), None) => Some(s),
		(None, Some(a)) => Some(a),
		(None, None) => None,
	}
}

/// Split a list-valued parameter into its items, using the dialect's list separator
/// (`|` on L3, `, ` on L2).
///
/// The parameter parser intentionally does not do this itself (4.6): callers
/// split a value string only once they know it is list-shaped.
pub fn split_list(value: &str, dialect: Dialect) -> impl Iterator<Item = &str> {
	let separator = dialect.list_item_separator();
	value.split(separator).map(str::trim)
}
