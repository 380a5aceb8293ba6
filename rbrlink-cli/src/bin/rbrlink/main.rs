use clap::{CommandFactory, Parser};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use rbrlink::transport::serial2::SerialTransport;
use rbrlink::Session;

mod logging;
mod options;

use options::{Command, Options};

fn main() {
	let options = Options::parse();
	logging::init(env!("CARGO_CRATE_NAME"), options.verbose);
	if let Err(()) = do_main(options) {
		std::process::exit(1);
	}
}

fn do_main(options: Options) -> Result<(), ()> {
	match &options.command {
		Command::Identify => {
			let mut session = open_session(&options)?;
			let identity = session.identify().map_err(|e| log::error!("Command failed: {}", e))?;
			log::info!("Model: {}", identity.model);
			log::info!("Version: {}", identity.version);
			log::info!("Serial: {}", identity.serial);
			log::info!("Generation: {:?}", session.generation());
		},
		Command::Verify => {
			let mut session = open_session(&options)?;
			let result = session.verify().map_err(|e| log::error!("Command failed: {}", e))?;
			log::info!("Status: {}", result.status);
			if let Some(code) = result.warning_code {
				log::warn!("Warning W{:04}", code);
			}
		},
		Command::Channels => {
			let mut session = open_session(&options)?;
			let channels = session.channels().map_err(|e| log::error!("Command failed: {}", e))?;
			log::info!(
				"{} of {} channels on, settling {} ms, read {} ms, minimum period {} ms",
				channels.on,
				channels.count,
				channels.settling_time_ms,
				channels.read_time_ms,
				channels.min_period_ms,
			);
		},
		Command::Stream => {
			let mut session = open_session(&options)?;
			session.set_sample_sink(|sample| {
				let readings: Vec<String> = sample.readings.iter().map(|r| format!("{:?}", r)).collect();
				log::info!("{} {}", sample.timestamp_ms, readings.join(", "));
			});
			loop {
				session.read_sample().map_err(|e| log::error!("Command failed: {}", e))?;
			}
		},
		Command::Download { dataset, size, offset, output } => {
			let mut session = open_session(&options)?;
			let mut buffer = vec![0u8; *size as usize];
			let request = rbrlink::DataRequest { dataset: *dataset, requested_size: *size, offset: *offset };
			let result = session.read_data(request, &mut buffer).map_err(|e| log::error!("Command failed: {}", e))?;
			log::debug!("Read {} bytes of dataset {} at offset {}", result.size, result.dataset, result.offset);
			write_output(&buffer[..result.size as usize], output.as_deref())?;
		},
		Command::ShellCompletion { shell, output } => {
			write_shell_completion(*shell, output.as_deref())?;
		},
	}

	Ok(())
}

fn open_session(options: &Options) -> Result<Session<SerialTransport>, ()> {
	let transport = SerialTransport::open(
		&options.serial_port,
		options.baud_rate,
		Duration::from_millis(options.read_timeout_ms),
	)
	.map_err(|e| log::error!("Failed to open serial port: {}: {}", options.serial_port.display(), e))?;
	log::debug!(
		"Using serial port {} with baud rate {}",
		options.serial_port.display(),
		options.baud_rate
	);

	Ok(Session::new(transport))
}

fn write_output(bytes: &[u8], path: Option<&Path>) -> Result<(), ()> {
	match path {
		None => {
			std::io::stdout().lock().write_all(bytes).map_err(|e| log::error!("Failed to write to stdout: {}", e))
		},
		Some(path) => {
			let mut output = std::fs::File::create(path).map_err(|e| log::error!("Failed to create {}: {}", path.display(), e))?;
			output.write_all(bytes).map_err(|e| log::error!("Failed to write to {}: {}", path.display(), e))
		},
	}
}

fn write_shell_completion(shell: clap_complete::Shell, path: Option<&Path>) -> Result<(), ()> {
	let mut buffer = Vec::with_capacity(4 * 1024);

	clap_complete::generate(shell, &mut Options::command(), env!("CARGO_BIN_NAME"), &mut buffer);
	if !buffer.ends_with(b"\n") {
		buffer.push(b'\n');
	}

	let path = path.unwrap_or_else(|| Path::new("-"));
	if path == Path::new("-") {
		log::debug!("Writing shell completion for {} to stdout", shell);
		let stdout = std::io::stdout();
		stdout
			.lock()
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to stdout: {}", e))?;
	} else {
		log::debug!("Writing shell completion for {} to {}", shell, path.display());
		let mut output = std::fs::File::create(path).map_err(|e| log::error!("Failed to create {}: {}", path.display(), e))?;
		output
			.write_all(&buffer)
			.map_err(|e| log::error!("Failed to write to {}: {}", path.display(), e))?;
	}

	Ok(())
}
