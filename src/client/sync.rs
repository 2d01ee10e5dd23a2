// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous Modbus context access

use std::{fmt::Debug, io};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    runtime::Runtime,
};

use super::{
    input_registers, register_echo, Client as AsyncClient, Context as AsyncContext,
};
use crate::{
    config::Config,
    frame::*,
    register::{self, RegisterFormat},
    slave::*,
    Error, Result,
};

fn new_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Into::into)
}

/// Creates a synchronous client context on top of an already opened
/// transport.
pub fn attach<T>(transport: T, config: &Config) -> Result<Context>
where
    T: AsyncRead + AsyncWrite + Debug + Send + Unpin + 'static,
{
    let runtime = new_runtime()?;
    let async_ctx = super::attach(transport, config)?;
    Ok(Context { runtime, async_ctx })
}

/// Opens the configured serial port and creates a synchronous client
/// context.
#[cfg(feature = "serial")]
pub fn connect(config: &Config) -> Result<Context> {
    let runtime = new_runtime()?;
    // The serial stream registers itself with the reactor of the runtime.
    let async_ctx = runtime.block_on(super::connect(config))?;
    Ok(Context { runtime, async_ctx })
}

/// A transport independent synchronous client trait.
pub trait Client: SlaveContext {
    fn call(&mut self, request: Request) -> Result<Response>;

    fn disconnect(&mut self) -> io::Result<()>;
}

/// A transport independent synchronous reader trait.
pub trait Reader: Client {
    fn read_input_registers(&mut self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        let response = self.call(Request::ReadInputRegisters(addr, cnt))?;
        input_registers(response, cnt)
    }

    fn read_input_register_value(&mut self, addr: Address, format: RegisterFormat) -> Result<f64> {
        let words = self.read_input_registers(addr, 1)?;
        let word = words
            .first()
            .copied()
            .ok_or_else(|| Error::unexpected("missing register value"))?;
        Ok(register::decode(word, format))
    }
}

/// A transport independent synchronous writer trait.
pub trait Writer: Client {
    fn write_single_register(&mut self, addr: Address, word: Word) -> Result<()> {
        let response = self.call(Request::WriteSingleRegister(addr, word))?;
        register_echo(response, addr, word)
    }

    fn write_register_value(
        &mut self,
        addr: Address,
        value: f64,
        format: RegisterFormat,
    ) -> Result<()> {
        let word = register::encode(value, format)?;
        self.write_single_register(addr, word)
    }
}

impl<C> Reader for C where C: Client {}

impl<C> Writer for C where C: Client {}

/// A synchronous Modbus client context.
///
/// Drives an asynchronous context on a private single threaded runtime.
/// Must not be used from within an asynchronous context.
#[derive(Debug)]
pub struct Context {
    runtime: Runtime,
    async_ctx: AsyncContext,
}

impl Client for Context {
    fn call(&mut self, request: Request) -> Result<Response> {
        let Self { runtime, async_ctx } = self;
        runtime.block_on(async_ctx.call(request))
    }

    fn disconnect(&mut self) -> io::Result<()> {
        let Self { runtime, async_ctx } = self;
        runtime.block_on(async_ctx.disconnect())
    }
}

impl SlaveContext for Context {
    fn set_slave(&mut self, slave: Slave) {
        self.async_ctx.set_slave(slave);
    }
}
