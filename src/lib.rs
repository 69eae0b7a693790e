//! # unreal-device - Mock Network Device Simulator
//!
//! `unreal-device` serves canned network-device behavior for tests: a login
//! banner on connect and recorded command-line output on execute, with named
//! test cases able to override individual commands.
//!
//! ## Features
//!
//! - **Device Registry**: YAML device-info document keyed by device address
//! - **Round-Robin Output**: Commands recorded with several outputs cycle through them
//! - **Test Cases**: Per test case override tables falling back to the defaults
//! - **File Pointers**: `filename:: <path>` values pull output from external files
//! - **Persistent Sessions**: Connection state and cursors survive between CLI runs
//!
//! ## Quick Start
//!
//! ```rust
//! use unreal_device::device::DeviceRegistry;
//! use unreal_device::session::DeviceSession;
//!
//! let mut registry = DeviceRegistry::new();
//! registry.load(r#"
//! 1.1.1.1:
//!   name: device1
//!   login: device1 login
//!   cmdlines:
//!     show version:
//!       - version is 2.0.1
//!       - version is 2.0.2
//! "#)?;
//!
//! let mut session = DeviceSession::new("1.1.1.1").with_name("device1");
//! session.connect(&registry, None)?;
//! assert_eq!(session.execute("show version")?, "version is 2.0.1");
//! assert_eq!(session.execute("show version")?, "version is 2.0.2");
//! assert_eq!(session.execute("show version")?, "version is 2.0.1");
//! # Ok::<(), unreal_device::error::DeviceError>(())
//! ```
//!
//! ## Main Components
//!
//! - [`device::DeviceRegistry`] - Address to record mapping loaded from YAML
//! - [`session::DeviceSession`] - Simulated connection with output cycling
//! - [`session::SessionManager`] - Context object driving the command surface
//! - [`error::DeviceError`] - Error types reported as `"<kind>: <message>"`

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod printer;
pub mod session;
pub mod templates;
pub mod usage;
