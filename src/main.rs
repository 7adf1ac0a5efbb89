use clap::Parser;
use pico2_test_runner::config::ConfigLoader;
use pico2_test_runner::discovery;
use pico2_test_runner::runner::{self, Invocation, SystemHost};
use pico2_test_runner::{logging, StopFlag};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "run_tests",
    version,
    about = "Run the pico2-swd-riscv on-device test suite over USB serial.",
    long_about = "Connects to the Pico's serial console, sends TEST_ALL and relays the report until the device has been silent for 20 seconds. Without a port argument the first port whose description contains \"Pico\" or whose hardware id carries the Raspberry Pi vendor ID 2E8A is used."
)]
struct Args {
    /// Serial port of the device (auto-detected when omitted).
    serial_port: Option<String>,

    /// Also write the report to this file (overwritten).
    output_file: Option<PathBuf>,

    /// Configuration file to use instead of the standard locations.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More diagnostic output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List every serial port with its description and hardware id, then exit.
    #[arg(long)]
    list_ports: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let config = match ConfigLoader::load(args.config.as_deref()) {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            let err = pico2_test_runner::RunnerError::from(e);
            runner::report_error(&err, &mut stdout);
            return ExitCode::from(err.exit_code());
        }
    };

    logging::init(
        &logging::level_for(args.verbose, &config.logging),
        config.logging.format,
    );

    if args.list_ports {
        return list_ports(&mut stdout);
    }

    let stop = match StopFlag::install_ctrlc() {
        Ok(stop) => stop,
        Err(e) => {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable; interrupts will not clean up");
            StopFlag::new()
        }
    };

    let invocation = Invocation {
        port: args.serial_port,
        output: args.output_file,
    };

    let code = runner::execute(&SystemHost, &invocation, &config, stop, &mut stdout);
    let _ = stdout.flush(); // ignore transient flush errors
    ExitCode::from(code)
}

fn list_ports(out: &mut impl Write) -> ExitCode {
    match discovery::enumerate_ports() {
        Ok(ports) if ports.is_empty() => {
            let _ = writeln!(out, "No serial ports detected on this system");
            ExitCode::SUCCESS
        }
        Ok(ports) => {
            for port in &ports {
                let _ = writeln!(out, "{port}");
                let _ = writeln!(out, "    hwid: {}", port.hwid);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = writeln!(out, "ERROR: Failed to enumerate serial ports: {e}");
            ExitCode::FAILURE
        }
    }
}
