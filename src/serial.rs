// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial port transport

use std::{
    collections::HashSet,
    io,
    pin::Pin,
    sync::{Mutex, OnceLock, PoisonError},
    task::{Context, Poll},
};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_serial::SerialStream;

use crate::{
    config::{Config, DataBits, Parity, StopBits},
    Error, Result,
};

impl From<Parity> for tokio_serial::Parity {
    fn from(from: Parity) -> Self {
        match from {
            Parity::None => Self::None,
            Parity::Even => Self::Even,
            Parity::Odd => Self::Odd,
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(from: StopBits) -> Self {
        match from {
            StopBits::One => Self::One,
            StopBits::Two => Self::Two,
        }
    }
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(from: DataBits) -> Self {
        match from {
            DataBits::Seven => Self::Seven,
            DataBits::Eight => Self::Eight,
        }
    }
}

fn open_ports() -> &'static Mutex<HashSet<String>> {
    static OPEN_PORTS: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    OPEN_PORTS.get_or_init(Default::default)
}

/// Exclusive claim on a port within this process.
///
/// The claim is released on drop.
#[derive(Debug)]
struct PortLease {
    port: String,
}

impl PortLease {
    fn acquire(port: &str) -> Result<Self> {
        let mut ports = open_ports()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !ports.insert(port.to_owned()) {
            return Err(Error::Connection {
                port: port.to_owned(),
                message: "port is already in use".to_owned(),
            });
        }
        Ok(Self {
            port: port.to_owned(),
        })
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        open_ports()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.port);
        log::debug!("Released serial port {}", self.port);
    }
}

/// An opened serial port.
///
/// Holds the port exclusively until it is dropped.
#[derive(Debug)]
pub struct SerialTransport {
    stream: SerialStream,
    _lease: PortLease,
}

/// Opens and configures the serial port of `config`.
///
/// Must be called within a tokio runtime with enabled I/O driver.
pub fn open(config: &Config) -> Result<SerialTransport> {
    config.validate()?;
    let port = config.port();
    let lease = PortLease::acquire(port)?;
    let connection_error = |err: tokio_serial::Error| Error::Connection {
        port: port.to_owned(),
        message: err.to_string(),
    };

    let builder = tokio_serial::new(port, config.baud_rate())
        .parity(config.parity().into())
        .stop_bits(config.stop_bits().into())
        .data_bits(config.data_bits().into())
        .timeout(config.timeout());
    #[allow(unused_mut)]
    let mut stream = SerialStream::open(&builder).map_err(connection_error)?;
    #[cfg(unix)]
    stream.set_exclusive(true).map_err(connection_error)?;

    log::info!(
        "Opened serial port {port} @{} baud ({})",
        config.baud_rate(),
        config.mode()
    );
    Ok(SerialTransport {
        stream,
        _lease: lease,
    })
}

impl AsyncRead for SerialTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for SerialTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().stream).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stream).poll_shutdown(cx)
    }
}
