//! Host-side protocol library for RBR "Logger2"/"Logger3" oceanographic instruments.
//!
//! A [`Session`] owns the byte-oriented link to one instrument (typically a
//! serial port, abstracted behind [`Transport`]) and speaks its line-oriented,
//! `\r\n`-terminated command protocol: [`Session::converse`] sends a command
//! and reads responses until the one that answers it arrives, skipping over
//! spontaneous sample lines (forwarded to a sample sink) and stray responses
//! belonging to some other command. [`Session::identify`] resolves which of
//! the two wire dialects (L2 or L3) the instrument speaks; everything
//! downstream consults that [`Dialect`] rather than branching on generation
//! directly. [`Session::read_data`] issues paged, CRC-16/CCITT-verified reads
//! of the instrument's on-board memory.
//!
//! `verify` and `channels` are included as small worked examples of
//! commands built on [`Session::converse`]; the instrument's full command
//! surface (clock, schedule, gating, wifi, power, ...) is a mechanical
//! exercise of the same pattern and is not this crate's concern.

#[macro_use]
mod log;

pub mod crc16;
pub mod error;
pub mod generation;
pub mod params;
pub mod sample;
pub mod time;
pub mod transport;

mod classify;
mod converse;
mod data;
mod ops;
mod session;

pub use converse::{Identity, Response};
pub use data::{DataReadResult, DataRequest, KNOWN_DATASETS};
pub use error::{Error, ResponseKind, TransportError};
pub use generation::{Dialect, Generation};
pub use ops::{Channels, VerifyResult};
pub use params::{Param, ParamCursor};
pub use sample::{Reading, Sample};
pub use session::{Session, SessionOptions};
pub use transport::Transport;
