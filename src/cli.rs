//! Command surface of the `unreal-device` binary.
//!
//! Each invocation loads the registry, works on at most one persisted session
//! and writes it back. Results go to the given writer; diagnostics go through
//! the logger.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{LevelFilter, debug};

use crate::config::AppPaths;
use crate::device::document_schema;
use crate::error::DeviceError;
use crate::printer::{BoxedText, boxed};
use crate::session::{ConnectOutcome, SessionManager};
use crate::usage;

/// Mock network device serving recorded command output
#[derive(Parser, Debug)]
#[command(name = "unreal-device")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Directory holding devices_info.yaml and the session snapshot
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to a device by address or name, optionally running a test case
    Connect {
        target: String,
        testcase: Option<String>,
    },
    /// Disconnect a device
    Disconnect { target: String },
    /// Execute a command line: [<address-or-name>::]<cmdline>
    Execute {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        operands: Vec<String>,
    },
    /// Look up a configuration reference: [<address-or-name>::]<cfg_reference>
    Configure {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        operands: Vec<String>,
    },
    /// Merge device records from a YAML file into the device-info file
    Load {
        file: PathBuf,
        /// Drop all existing records first
        #[arg(long)]
        replace: bool,
    },
    /// Show the recorded data of a device
    View {
        target: String,
        /// Show only this test case's override table
        #[arg(short, long)]
        testcase: Option<String>,
    },
    /// Remove the persisted session of a device
    Reset { target: String },
    /// Show file locations and totals
    Info {
        /// Print the JSON Schema of the device-info document instead
        #[arg(long)]
        schema: bool,
    },
}

/// Parses the process arguments and runs the command. Returns the exit code.
pub fn run() -> anyhow::Result<u8> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut stdout = std::io::stdout().lock();
    execute_cli(cli, &mut stdout)
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(LevelFilter::Warn);
    }
    let _ = builder.try_init();
}

/// Runs a parsed command line, writing user-facing output to `out`.
pub fn execute_cli<W: Write>(cli: Cli, out: &mut W) -> anyhow::Result<u8> {
    if let Some(text) = usage_request(&cli.command) {
        writeln!(out, "{}", boxed(text))?;
        return Ok(0);
    }

    let paths = AppPaths::resolve(cli.home.as_deref());
    debug!("home directory: {}", paths.home.display());
    let mut manager = match SessionManager::open(paths) {
        Ok(manager) => manager,
        Err(err) => {
            writeln!(out, "{}", err.report())?;
            return Ok(1);
        }
    };
    dispatch(cli.command, &mut manager, out)
}

/// Runs one subcommand against an open manager.
pub fn dispatch<W: Write>(
    command: Commands,
    manager: &mut SessionManager,
    out: &mut W,
) -> anyhow::Result<u8> {
    let code = match command {
        Commands::Connect { target, testcase } => {
            match manager.connect(&target, testcase.as_deref()) {
                Ok(ConnectOutcome::Connected { login, .. }) => {
                    if !login.is_empty() {
                        writeln!(out, "{login}")?;
                    }
                    0
                }
                Ok(ConnectOutcome::AlreadyConnected { address }) => {
                    let notice = BoxedText::new(&format!("{address} is already connected."))
                        .footer("Use disconnect or reset for a new connection.");
                    writeln!(out, "{}", notice.render())?;
                    0
                }
                Err(err) => fail(out, &err)?,
            }
        }
        Commands::Disconnect { target } => match manager.disconnect(&target) {
            Ok(address) => {
                writeln!(out, "{address} is disconnected.")?;
                0
            }
            Err(err @ (DeviceError::NotConnected(_) | DeviceError::Unavailable(_))) => {
                writeln!(out, "CANT disconnect because {err}")?;
                1
            }
            Err(err) => fail(out, &err)?,
        },
        Commands::Execute { operands } => match manager.execute(&operands.join(" ")) {
            Ok(executed) => {
                writeln!(out, "{}", executed.output)?;
                0
            }
            Err(err) => session_failure(out, "execute cmdline", &err)?,
        },
        Commands::Configure { operands } => match manager.configure(&operands.join(" ")) {
            Ok(executed) => {
                writeln!(out, "{}", executed.output)?;
                0
            }
            Err(err) => session_failure(out, "configure", &err)?,
        },
        Commands::Load { file, replace } => match manager.load(&file, replace) {
            Ok(written) => {
                writeln!(
                    out,
                    "Successfully loaded {} device record(s): {}",
                    written.len(),
                    written.join(", ")
                )?;
                0
            }
            Err(err) => fail(out, &err)?,
        },
        Commands::View { target, testcase } => match manager.view(&target, testcase.as_deref()) {
            Ok(text) => {
                writeln!(out, "{text}")?;
                0
            }
            Err(err) => fail(out, &err)?,
        },
        Commands::Reset { target } => match manager.reset(&target) {
            Ok(true) => {
                writeln!(out, "Successfully removed serialized session of {target}.")?;
                0
            }
            Ok(false) => {
                writeln!(out, "CANT remove because there is no {target} in serialized file.")?;
                1
            }
            Err(err) => fail(out, &err)?,
        },
        Commands::Info { schema: true } => match document_schema() {
            Ok(json) => {
                writeln!(out, "{json}")?;
                0
            }
            Err(err) => fail(out, &err)?,
        },
        Commands::Info { schema: false } => match manager.info() {
            Ok(text) => {
                let header = format!("unreal-device {}", env!("CARGO_PKG_VERSION"));
                writeln!(out, "{}", BoxedText::new(&text).header(&header).render())?;
                0
            }
            Err(err) => fail(out, &err)?,
        },
    };
    Ok(code)
}

fn fail<W: Write>(out: &mut W, err: &DeviceError) -> anyhow::Result<u8> {
    writeln!(out, "{}", err.report())?;
    Ok(1)
}

/// Reports execute/configure failures. Usage mistakes and a missing or
/// offline session are not process failures.
fn session_failure<W: Write>(out: &mut W, action: &str, err: &DeviceError) -> anyhow::Result<u8> {
    match err {
        DeviceError::Usage(text) => {
            writeln!(out, "{}", boxed(text))?;
            Ok(0)
        }
        DeviceError::NotConnected(_) | DeviceError::Unavailable(_) => {
            writeln!(out, "CANT {action} because {err}")?;
            Ok(0)
        }
        DeviceError::Offline(_) => {
            writeln!(out, "{}", err.report())?;
            Ok(0)
        }
        _ => fail(out, err),
    }
}

fn usage_request(command: &Commands) -> Option<&'static str> {
    let (operands, text): (Vec<&str>, &'static str) = match command {
        Commands::Connect { target, testcase } => {
            let mut operands = vec![target.as_str()];
            operands.extend(testcase.as_deref());
            (operands, usage::CONNECT)
        }
        Commands::Disconnect { target } => (vec![target.as_str()], usage::DISCONNECT),
        Commands::Execute { operands } => {
            (operands.iter().map(String::as_str).collect(), usage::EXECUTE)
        }
        Commands::Configure { operands } => {
            (operands.iter().map(String::as_str).collect(), usage::CONFIGURE)
        }
        Commands::Load { file, .. } => (vec![file.to_str().unwrap_or_default()], usage::LOAD),
        Commands::View { target, .. } => (vec![target.as_str()], usage::VIEW),
        Commands::Reset { target } => (vec![target.as_str()], usage::RESET),
        Commands::Info { .. } => return None,
    };
    usage::is_usage_request(&operands).then_some(text)
}
