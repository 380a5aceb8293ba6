//! Open a serial port and print incoming samples until interrupted.
//!
//! Usage: stream TTY BAUD-RATE

use rbrlink::transport::serial2::SerialTransport;
use rbrlink::Session;
use std::time::Duration;

fn main() {
	if do_main().is_err() {
		std::process::exit(1);
	}
}

fn print_usage() {
	eprintln!("usage: stream TTY BAUD-RATE");
}

fn do_main() -> Result<(), ()> {
	let mut args = std::env::args();
	let _ = args.next().unwrap();

	let tty = args.next().ok_or_else(print_usage)?;
	let baud_rate = args.next().ok_or_else(print_usage)?;
	let baud_rate: u32 = baud_rate.parse().map_err(|_| eprintln!("invalid baud rate: {}", baud_rate))?;

	let transport = SerialTransport::open(&tty, baud_rate, Duration::from_millis(2000))
		.map_err(|e| eprintln!("failed to open serial port at {}: {}", tty, e))?;

	let mut session = Session::new(transport);
	session.set_sample_sink(|sample| {
		let readings: Vec<String> = sample.readings.iter().map(|r| format!("{:?}", r)).collect();
		println!("{} {}", sample.timestamp_ms, readings.join(", "));
	});

	loop {
		session.read_sample().map_err(|e| eprintln!("{}", e))?;
	}
}
