use std::path::PathBuf;

/// Communicate with an RBR Logger2/Logger3 instrument over a serial link.
#[derive(clap::Parser)]
pub struct Options {
	/// Print more verbose messages. Can be used multiple times.
	#[clap(long, short)]
	#[clap(global = true)]
	#[clap(action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// The serial port to use.
	#[clap(long, short)]
	#[clap(global = true)]
	#[cfg_attr(target_os = "windows", clap(default_value = "COM1"))]
	#[cfg_attr(not(target_os = "windows"), clap(default_value = "/dev/ttyUSB0"))]
	pub serial_port: PathBuf,

	/// The baud rate for the serial port.
	#[clap(long, short)]
	#[clap(global = true)]
	#[clap(default_value = "9600")]
	pub baud_rate: u32,

	/// Character-read timeout, in milliseconds.
	#[clap(long)]
	#[clap(global = true)]
	#[clap(default_value = "2000")]
	pub read_timeout_ms: u64,

	#[clap(subcommand)]
	pub command: Command,
}

#[derive(clap::Parser)]
pub enum Command {
	/// Resolve the instrument's identity and wire dialect.
	Identify,

	/// Ask the instrument to verify its current logging configuration.
	Verify,

	/// Query the instrument's channel configuration.
	Channels,

	/// Print incoming samples until interrupted.
	Stream,

	/// Read a chunk of a dataset and write it to a file, or stdout if omitted.
	Download {
		/// The dataset identifier to read.
		#[clap(value_name = "DATASET")]
		dataset: u32,

		/// The number of bytes to request.
		#[clap(value_name = "SIZE")]
		size: u32,

		/// The byte offset to start reading from.
		#[clap(long, default_value = "0")]
		offset: u64,

		/// The file to write the downloaded bytes to; defaults to standard output.
		#[clap(long, short)]
		output: Option<PathBuf>,
	},

	/// Write shell completions to standard output or a file.
	ShellCompletion {
		/// The shell for which to generate completions.
		#[clap(long)]
		shell: clap_complete::Shell,

		/// The file to write the generated completion file to.
		#[clap(long, short)]
		output: Option<PathBuf>,
	},
}
