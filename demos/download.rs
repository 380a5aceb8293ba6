//! Read a chunk of a dataset and print its bytes.
//!
//! Usage: download TTY BAUD-RATE DATASET SIZE OFFSET

use rbrlink::transport::serial2::SerialTransport;
use rbrlink::{DataRequest, Session};
use std::time::Duration;

fn main() {
	if do_main().is_err() {
		std::process::exit(1);
	}
}

fn print_usage() {
	eprintln!("usage: download TTY BAUD-RATE DATASET SIZE OFFSET");
}

fn do_main() -> Result<(), ()> {
	let mut args = std::env::args();
	let _ = args.next().unwrap();

	let tty = args.next().ok_or_else(print_usage)?;
	let baud_rate = args.next().ok_or_else(print_usage)?;
	let dataset = args.next().ok_or_else(print_usage)?;
	let size = args.next().ok_or_else(print_usage)?;
	let offset = args.next().ok_or_else(print_usage)?;

	let baud_rate: u32 = baud_rate.parse().map_err(|_| eprintln!("invalid baud rate: {}", baud_rate))?;
	let dataset: u32 = dataset.parse().map_err(|_| eprintln!("invalid dataset: {}", dataset))?;
	let size: u32 = size.parse().map_err(|_| eprintln!("invalid size: {}", size))?;
	let offset: u64 = offset.parse().map_err(|_| eprintln!("invalid offset: {}", offset))?;

	let transport = SerialTransport::open(&tty, baud_rate, Duration::from_millis(2000))
		.map_err(|e| eprintln!("failed to open serial port at {}: {}", tty, e))?;

	let mut session = Session::new(transport);
	let mut buffer = vec![0u8; size as usize];
	let request = DataRequest { dataset, requested_size: size, offset };
	let result = session.read_data(request, &mut buffer).map_err(|e| eprintln!("{}", e))?;

	use std::io::Write;
	std::io::stdout()
		.lock()
		.write_all(&buffer[..result.size as usize])
		.map_err(|e| eprintln!("failed to write to stdout: {}", e))?;

	Ok(())
}
