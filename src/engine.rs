// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response transactions on a half-duplex serial line

use std::{fmt, io, time::Duration};

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::{
    io::{AsyncRead, AsyncReadExt as _, AsyncWrite, AsyncWriteExt as _},
    time::{self, Instant},
};
use tokio_util::codec::{Decoder as _, Encoder as _};

use crate::{
    codec::ClientCodec,
    config::Config,
    frame::{
        serial::{RequestAdu, ResponseAdu},
        Request, Response,
    },
    slave::{Slave, SlaveContext},
    Error, Result,
};

/// Executes one transaction after the other on a transport.
///
/// A transaction writes a single request frame and then waits for the
/// matching response frame. The line is considered dirty from the moment
/// the request has been written until a complete, valid response frame
/// has been received. Bytes arriving on a dirty line are stale and get
/// discarded before the next request is written.
pub(crate) struct Engine<T> {
    transport: T,
    codec: ClientCodec,
    read_buf: BytesMut,
    write_buf: BytesMut,
    slave: Slave,
    timeout: Duration,
    drain_window: Duration,
    dirty: bool,
}

impl<T> fmt::Debug for Engine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("codec", &self.codec)
            .field("slave", &self.slave)
            .field("timeout", &self.timeout)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<T> Engine<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(transport: T, config: &Config) -> Self {
        Self {
            transport,
            codec: ClientCodec::new(config.mode()),
            read_buf: BytesMut::with_capacity(256),
            write_buf: BytesMut::with_capacity(32),
            slave: config.slave(),
            timeout: config.timeout(),
            drain_window: config.drain_window(),
            dirty: false,
        }
    }

    pub(crate) async fn call(&mut self, request: Request) -> Result<Response> {
        if self.dirty {
            self.drain().await?;
        }

        let request_adu = RequestAdu::new(self.slave, request);
        let request_context = request_adu.context();
        self.write_buf.clear();
        self.codec.encode(request_adu, &mut self.write_buf)?;

        log::debug!("Sending {request:?} to slave {}", self.slave);
        log::trace!("-> {}", hex::encode_upper(&self.write_buf));

        self.read_buf.clear();
        self.dirty = true;
        let response_adu = match time::timeout(self.timeout, self.transact()).await {
            Ok(Ok(response_adu)) => response_adu,
            Ok(Err(err)) => {
                log::warn!("Transaction with slave {} failed: {err}", self.slave);
                return Err(err);
            }
            Err(_elapsed) => {
                log::warn!(
                    "No response from slave {} within {:?}",
                    self.slave,
                    self.timeout
                );
                return Err(Error::Timeout(self.timeout));
            }
        };

        let result = response_adu.try_into_response(request_context);
        match &result {
            Ok(_) | Err(Error::Exception(_)) => {
                // Trailing bytes have to be drained before the next request.
                self.dirty = !self.read_buf.is_empty();
            }
            Err(err) => {
                log::warn!("Rejected response: {err}");
            }
        }
        result
    }

    /// Writes the encoded request and reads the response.
    ///
    /// A stalled write counts against the response timeout.
    async fn transact(&mut self) -> Result<ResponseAdu> {
        self.transport.write_all(&self.write_buf).await?;
        self.transport.flush().await?;
        self.recv_response_adu().await
    }

    async fn recv_response_adu(&mut self) -> Result<ResponseAdu> {
        loop {
            if let Some(response_adu) = self.codec.decode(&mut self.read_buf)? {
                return Ok(response_adu);
            }
            let offset = self.read_buf.len();
            let count = self.transport.read_buf(&mut self.read_buf).await?;
            if count == 0 {
                return Err(io::Error::from(io::ErrorKind::BrokenPipe).into());
            }
            log::trace!("<- {}", hex::encode_upper(&self.read_buf[offset..]));
        }
    }

    /// Discards bytes until the line stays quiet for the drain window.
    ///
    /// Draining never takes longer than the response timeout.
    async fn drain(&mut self) -> Result<()> {
        self.read_buf.clear();
        let deadline = Instant::now() + self.timeout;
        let mut discarded = 0;
        loop {
            let window = self
                .drain_window
                .min(deadline.saturating_duration_since(Instant::now()));
            if window.is_zero() {
                break;
            }
            match time::timeout(window, self.transport.read_buf(&mut self.read_buf)).await {
                // quiet
                Err(_elapsed) => break,
                Ok(Ok(0)) => return Err(io::Error::from(io::ErrorKind::BrokenPipe).into()),
                Ok(Ok(count)) => {
                    log::trace!("<- {} (stale)", hex::encode_upper(&self.read_buf));
                    discarded += count;
                    self.read_buf.clear();
                }
                Ok(Err(err)) => return Err(err.into()),
            }
        }
        if discarded > 0 {
            log::warn!("Discarded {discarded} stale byte(s) from slave {}", self.slave);
        }
        self.dirty = false;
        Ok(())
    }

    pub(crate) async fn disconnect(&mut self) -> io::Result<()> {
        self.transport.shutdown().await
    }
}

impl<T> SlaveContext for Engine<T> {
    fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }
}

#[async_trait]
impl<T> crate::client::Client for Engine<T>
where
    T: AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn call(&mut self, request: Request) -> Result<Response> {
        self.call(request).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.disconnect().await
    }
}
