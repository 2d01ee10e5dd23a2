// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use std::{io, time::Duration};

use thiserror::Error;

use crate::{
    frame::{ExceptionResponse, FunctionCode, Quantity},
    Slave,
};

/// Error type of all driver operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The serial port could not be opened or configured.
    #[error("connection to {port} failed: {message}")]
    Connection { port: String, message: String },

    /// Reading from or writing to the transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The slave did not respond in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The received bytes do not form a valid frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The CRC (RTU) or LRC (ASCII) of the received frame is wrong.
    #[error("checksum mismatch: expected 0x{expected:04X}, actual 0x{actual:04X}")]
    Checksum { expected: u16, actual: u16 },

    /// The response was sent by another slave.
    #[error("slave mismatch: expected {expected}, actual {actual}")]
    SlaveMismatch { expected: Slave, actual: Slave },

    /// A complete and valid response frame with content that doesn't
    /// match the request, e.g. a wrong echo or register count.
    ///
    /// The frame has been consumed entirely, so the line stays clean.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The response doesn't answer the request.
    #[error("function code mismatch: request = {request}, response = {response}")]
    FunctionCodeMismatch {
        request: FunctionCode,
        response: FunctionCode,
    },

    /// The slave responded with a _Modbus_ exception.
    #[error("exception: {0}")]
    Exception(ExceptionResponse),

    /// A value or parameter is out of range. Raised before any I/O.
    #[error(transparent)]
    Range(#[from] RangeError),
}

impl Error {
    /// Repeating the whole transaction is safe after this error.
    ///
    /// The client drains the line before it sends the next request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Timeout(_))
    }

    /// Stale bytes of the failed transaction might still be in flight.
    ///
    /// The client drains the line on its own before the next request.
    #[must_use]
    pub fn requires_drain(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Timeout(_)
                | Self::MalformedFrame(_)
                | Self::Checksum { .. }
                | Self::SlaveMismatch { .. }
                | Self::FunctionCodeMismatch { .. }
        )
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame(message.into())
    }

    pub(crate) fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse(message.into())
    }
}

/// Rejected parameters and values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    /// The scaled value does not fit into a 16-bit register.
    #[error("scaled register value {value} is not within {min}..={max}")]
    Register { value: f64, min: i32, max: i32 },

    /// No such heating circuit.
    #[error("heating circuit {circuit} is not within 1..={max}")]
    Circuit { circuit: u8, max: u8 },

    /// The temperature violates the limits given by the caller.
    #[error("temperature {temp} is not within {min}..={max}")]
    Temperature { temp: f64, min: f64, max: f64 },

    /// Invalid number of registers for a single read request.
    #[error("register quantity {quantity} is not within 1..={max}")]
    Quantity { quantity: Quantity, max: Quantity },
}

/// Result type of all driver operations.
pub type Result<T> = std::result::Result<T, Error>;
