//! The error taxonomy returned by [`crate::Session`] operations.

use core::fmt;

/// A failure reported by a [`crate::transport::Transport`] implementation.
#[derive(Debug)]
pub enum TransportError<E> {
	/// The character-level or whole-operation timeout elapsed before the operation completed.
	Timeout,
	/// The callback itself reported a failure.
	Other(E),
}

impl<E: fmt::Display> fmt::Display for TransportError<E> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Timeout => write!(f, "transport timeout"),
			Self::Other(e) => write!(f, "{e}"),
		}
	}
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TransportError<E> {}

/// The result of classifying a completed response line.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ResponseKind {
	Info,
	Warning(u16),
	Error(u16),
}

/// All errors a [`crate::Session`] operation can return.
///
/// `E` is the error type of the caller's [`crate::transport::Transport`] implementation.
#[derive(Debug)]
pub enum Error<E = std::io::Error> {
	/// An internal allocation failed. Only returned by `open` in constrained environments.
	AllocationFailure,
	/// The formatted command (plus its `\r\n` terminator) does not fit in the command buffer.
	BufferTooSmall,
	/// A required transport operation was not supplied.
	MissingCallback,
	/// A transport callback reported a failure.
	CallbackError(E),
	/// The whole-command timeout, or a transport character timeout, elapsed.
	Timeout,
	/// The instrument, or the requested command, is not supported by this library.
	Unsupported,
	/// The instrument replied with `Ennnn`.
	HardwareError {
		/// The instrument's 4-digit error code.
		code: u16,
		/// The human-readable message that followed the code.
		message: String,
	},
	/// The CRC-16/CCITT trailer of a data read did not match the payload.
	ChecksumError,
	/// A caller-supplied argument was out of range, detected before any I/O took place.
	InvalidParameterValue,
}

impl<E> Error<E> {
	pub(crate) fn hardware(code: u16, message: impl Into<String>) -> Self {
		Self::HardwareError { code, message: message.into() }
	}
}

impl<E> From<TransportError<E>> for Error<E> {
	fn from(other: TransportError<E>) -> Self {
		match other {
			TransportError::Timeout => Self::Timeout,
			TransportError::Other(e) => Self::CallbackError(e),
		}
	}
}

impl<E: fmt::Display> fmt::Display for Error<E> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::AllocationFailure => write!(f, "allocation failure"),
			Self::BufferTooSmall => write!(f, "buffer too small"),
			Self::MissingCallback => write!(f, "a required transport callback was not supplied"),
			Self::CallbackError(e) => write!(f, "transport callback failed: {e}"),
			Self::Timeout => write!(f, "timeout"),
			Self::Unsupported => write!(f, "unsupported instrument or command"),
			Self::HardwareError { code, message } => write!(f, "E{code:04} {message}"),
			Self::ChecksumError => write!(f, "checksum mismatch"),
			Self::InvalidParameterValue => write!(f, "invalid parameter value"),
		}
	}
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}
