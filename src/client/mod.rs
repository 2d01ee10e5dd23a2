// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus clients

use std::{fmt::Debug, io, sync::Arc};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Mutex,
};

use crate::{
    config::Config,
    engine::Engine,
    frame::*,
    register::{self, RegisterFormat},
    slave::*,
    Error, Result,
};

pub mod retry;

#[cfg(feature = "sync")]
pub mod sync;

/// Transport independent asynchronous client trait
#[async_trait]
pub trait Client: SlaveContext + Send + Debug {
    /// Executes a single _Modbus_ transaction.
    async fn call(&mut self, request: Request) -> Result<Response>;

    /// Disconnects the client.
    ///
    /// Shuts down the underlying transport. Dropping the client without
    /// disconnecting it first also releases all resources.
    async fn disconnect(&mut self) -> io::Result<()>;
}

/// Asynchronous _Modbus_ reader
#[async_trait]
pub trait Reader: Client {
    /// Read multiple input registers (0x04)
    async fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        let response = self.call(Request::ReadInputRegisters(addr, cnt)).await?;
        input_registers(response, cnt)
    }

    /// Read a single input register (0x04) and convert its value
    async fn read_input_register_value(
        &mut self,
        addr: Address,
        format: RegisterFormat,
    ) -> Result<f64> {
        let words = self.read_input_registers(addr, 1).await?;
        let word = words
            .first()
            .copied()
            .ok_or_else(|| Error::unexpected("missing register value"))?;
        Ok(register::decode(word, format))
    }
}

/// Asynchronous _Modbus_ writer
#[async_trait]
pub trait Writer: Client {
    /// Write a single register (0x06)
    async fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()> {
        let response = self.call(Request::WriteSingleRegister(addr, word)).await?;
        register_echo(response, addr, word)
    }

    /// Convert a value and write it into a single register (0x06)
    ///
    /// Values that don't fit into the register are rejected without
    /// sending a request.
    async fn write_register_value(
        &mut self,
        addr: Address,
        value: f64,
        format: RegisterFormat,
    ) -> Result<()> {
        let word = register::encode(value, format)?;
        self.write_single_register(addr, word).await
    }
}

impl<C> Reader for C where C: Client {}

impl<C> Writer for C where C: Client {}

pub(crate) fn input_registers(response: Response, cnt: Quantity) -> Result<Vec<Word>> {
    match response {
        Response::ReadInputRegisters(words) if words.len() == usize::from(cnt) => Ok(words),
        Response::ReadInputRegisters(words) => Err(Error::unexpected(format!(
            "expected {cnt} register(s), received {}",
            words.len()
        ))),
        response => Err(Error::FunctionCodeMismatch {
            request: FunctionCode::ReadInputRegisters,
            response: response.function_code(),
        }),
    }
}

pub(crate) fn register_echo(response: Response, addr: Address, word: Word) -> Result<()> {
    match response {
        Response::WriteSingleRegister(rsp_addr, rsp_word) if rsp_addr == addr && rsp_word == word => {
            Ok(())
        }
        Response::WriteSingleRegister(rsp_addr, rsp_word) => Err(Error::unexpected(format!(
            "expected echo of {word} at {addr}, received {rsp_word} at {rsp_addr}"
        ))),
        response => Err(Error::FunctionCodeMismatch {
            request: FunctionCode::WriteSingleRegister,
            response: response.function_code(),
        }),
    }
}

/// Asynchronous Modbus client context
#[derive(Debug)]
pub struct Context {
    client: Box<dyn Client>,
}

impl From<Box<dyn Client>> for Context {
    fn from(client: Box<dyn Client>) -> Self {
        Self { client }
    }
}

impl From<Context> for Box<dyn Client> {
    fn from(val: Context) -> Self {
        val.client
    }
}

#[async_trait]
impl Client for Context {
    async fn call(&mut self, request: Request) -> Result<Response> {
        self.client.call(request).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.client.disconnect().await
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.client.set_slave(slave);
    }
}

/// A context that can be cloned and used by concurrent tasks.
///
/// All clones execute their transactions one after the other on the
/// same connection. Waiting callers are served in FIFO order. Every
/// clone addresses its own slave.
#[derive(Debug, Clone)]
pub struct SharedContext {
    context: Arc<Mutex<Context>>,
    slave: Slave,
}

impl SharedContext {
    /// Shares `context` and addresses `slave` with this handle.
    #[must_use]
    pub fn new(context: Context, slave: Slave) -> Self {
        Self {
            context: Arc::new(Mutex::new(context)),
            slave,
        }
    }
}

#[async_trait]
impl Client for SharedContext {
    async fn call(&mut self, request: Request) -> Result<Response> {
        let mut context = self.context.lock().await;
        context.set_slave(self.slave);
        context.call(request).await
    }

    async fn disconnect(&mut self) -> io::Result<()> {
        self.context.lock().await.disconnect().await
    }
}

impl SlaveContext for SharedContext {
    fn set_slave(&mut self, slave: Slave) {
        self.slave = slave;
    }
}

/// Creates a client context on top of an already opened transport.
///
/// The configuration is validated first. Only the protocol related
/// settings are used, i.e. framing mode, slave, and timeouts.
pub fn attach<T>(transport: T, config: &Config) -> Result<Context>
where
    T: AsyncRead + AsyncWrite + Debug + Send + Unpin + 'static,
{
    config.validate()?;
    log::debug!(
        "Attaching {} client for slave {} on {}",
        config.mode(),
        config.slave(),
        config.port()
    );
    let client: Box<dyn Client> = Box::new(Engine::new(transport, config));
    Ok(Context::from(client))
}

/// Opens the configured serial port and creates a client context.
#[cfg(feature = "serial")]
pub async fn connect(config: &Config) -> Result<Context> {
    let transport = crate::serial::open(config)?;
    attach(transport, config)
}
