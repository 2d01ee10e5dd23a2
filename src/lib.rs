// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A [Modbus](https://en.wikipedia.org/wiki/Modbus) RTU/ASCII driver
//! for Fröling Lamdatronic P3200 heating controllers based on
//! [tokio](https://tokio.rs).
//!
//! Modbus is based on a [master/slave](https://en.wikipedia.org/wiki/Master/slave_(technology))
//! model. This crate implements the master, called *client*. The heating
//! controller is the *slave*.
//!
//! ## Features
//!
//! - `serial` (default): open serial ports with [tokio-serial](https://docs.rs/tokio-serial)
//! - `sync`: blocking clients
//! - `serde`: (de-)serialization of the connection configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     use lamdatronic_modbus::{device::LamdatronicP3200, Config, Mode, Slave};
//!
//!     let config = Config::new("/dev/ttyUSB0", Slave(2), Mode::Rtu);
//!     let mut device = LamdatronicP3200::connect(&config).await?;
//!     println!("Outside temperature: {}", device.get_outside_temperature().await?);
//!     device.disconnect().await?;
//!     Ok(())
//! }
//! # #[cfg(not(feature = "serial"))]
//! # fn main() {}
//! ```
//!
//! Frames are logged on level `trace`:
//! `RUST_LOG=lamdatronic_modbus=trace`

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod prelude;

pub mod client;

pub mod codec;

pub mod config;
pub use self::config::{Config, DataBits, Mode, ParseModeError, Parity, StopBits};

pub mod device;

pub mod register;

#[cfg(feature = "serial")]
pub mod serial;

mod engine;

mod error;
pub use self::error::{Error, RangeError, Result};

mod frame;
pub use self::frame::*;

mod slave;
pub use self::slave::{Slave, SlaveContext, SlaveId};
