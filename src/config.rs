// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection configuration

use std::{fmt, str::FromStr, time::Duration};

use thiserror::Error;

use crate::{Error, Result, Slave};

/// Baud rate of the heating controller.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Response timeout of the heating controller.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Quiet period that ends draining of stale bytes.
pub const DEFAULT_DRAIN_WINDOW: Duration = Duration::from_millis(100);

/// Framing of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "UPPERCASE")
)]
pub enum Mode {
    /// Binary frames protected by a CRC-16.
    Rtu,
    /// Hex encoded frames protected by an LRC, delimited by `:` and CR LF.
    Ascii,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rtu => f.write_str("RTU"),
            Self::Ascii => f.write_str("ASCII"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown framing mode: {0:?}")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rtu") {
            Ok(Self::Rtu)
        } else if s.eq_ignore_ascii_case("ascii") {
            Ok(Self::Ascii)
        } else {
            Err(ParseModeError(s.to_owned()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Settings of a single serial connection.
///
/// A configuration is built once and never changed afterwards. The
/// `with_*` methods consume the value and return a modified copy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    port: String,
    slave: Slave,
    mode: Mode,
    baud_rate: u32,
    parity: Parity,
    stop_bits: StopBits,
    data_bits: DataBits,
    timeout: Duration,
    drain_window: Duration,
}

impl Config {
    /// Settings of the heating controller: 57600 baud, 8N1, 1 s timeout.
    #[must_use]
    pub fn new(port: impl Into<String>, slave: Slave, mode: Mode) -> Self {
        Self {
            port: port.into(),
            slave,
            mode,
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            stop_bits: StopBits::One,
            data_bits: DataBits::Eight,
            timeout: DEFAULT_TIMEOUT,
            drain_window: DEFAULT_DRAIN_WINDOW,
        }
    }

    #[must_use]
    pub fn with_baud_rate(self, baud_rate: u32) -> Self {
        Self { baud_rate, ..self }
    }

    #[must_use]
    pub fn with_parity(self, parity: Parity) -> Self {
        Self { parity, ..self }
    }

    #[must_use]
    pub fn with_stop_bits(self, stop_bits: StopBits) -> Self {
        Self { stop_bits, ..self }
    }

    #[must_use]
    pub fn with_data_bits(self, data_bits: DataBits) -> Self {
        Self { data_bits, ..self }
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    #[must_use]
    pub fn with_drain_window(self, drain_window: Duration) -> Self {
        Self {
            drain_window,
            ..self
        }
    }

    #[must_use]
    pub fn port(&self) -> &str {
        &self.port
    }

    #[must_use]
    pub const fn slave(&self) -> Slave {
        self.slave
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    #[must_use]
    pub const fn parity(&self) -> Parity {
        self.parity
    }

    #[must_use]
    pub const fn stop_bits(&self) -> StopBits {
        self.stop_bits
    }

    #[must_use]
    pub const fn data_bits(&self) -> DataBits {
        self.data_bits
    }

    /// Maximum time to wait for a response.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The line counts as quiet after this period without any byte.
    #[must_use]
    pub const fn drain_window(&self) -> Duration {
        self.drain_window
    }

    /// Checks the settings before a connection is established.
    pub fn validate(&self) -> Result<()> {
        if self.port.is_empty() {
            return Err(self.invalid("missing port identifier"));
        }
        if !self.slave.is_single_device() {
            return Err(self.invalid(format!(
                "slave id {} is not within {}..={}",
                self.slave.0,
                Slave::min_device().0,
                Slave::max_device().0
            )));
        }
        if self.baud_rate == 0 {
            return Err(self.invalid("baud rate must not be zero"));
        }
        if self.timeout.is_zero() {
            return Err(self.invalid("timeout must not be zero"));
        }
        if self.mode == Mode::Rtu && self.data_bits != DataBits::Eight {
            return Err(self.invalid("RTU framing requires eight data bits"));
        }
        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::Connection {
            port: self.port.clone(),
            message: message.into(),
        }
    }
}
