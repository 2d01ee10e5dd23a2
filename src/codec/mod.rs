// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire codecs for the Modbus serial line
//!
//! Both framings implement the [`Encoder`] and [`Decoder`] traits of
//! `tokio-util`. The framing is picked once from the configured [`Mode`].

use std::{convert::TryFrom, io::Cursor};

use byteorder::{BigEndian, ReadBytesExt as _};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    config::Mode,
    error::RangeError,
    frame::{
        serial::{verify_response_header, Header, RequestAdu, ResponseAdu},
        ExceptionCode, ExceptionResponse, FunctionCode, Request, Response, ResponsePdu,
        MAX_READ_REGISTERS,
    },
    Error, Result, Slave,
};

pub(crate) mod ascii;
pub(crate) mod rtu;

pub use self::{ascii::calc_lrc, rtu::calc_crc};

/// Maximum request/response PDU size.
///
/// As defined by the protocol for the serial line.
const MAX_PDU_SIZE: usize = 253;

fn check_request(request: &Request) -> Result<()> {
    match *request {
        Request::ReadInputRegisters(_, quantity) => {
            if quantity == 0 || quantity > MAX_READ_REGISTERS {
                return Err(RangeError::Quantity {
                    quantity,
                    max: MAX_READ_REGISTERS,
                }
                .into());
            }
        }
        Request::WriteSingleRegister(_, _) => {}
    }
    Ok(())
}

fn encode_request_pdu(request: &Request) -> Result<Bytes> {
    check_request(request)?;
    let mut buf = BytesMut::with_capacity(5);
    buf.put_u8(request.function_code().value());
    match *request {
        Request::ReadInputRegisters(address, quantity) => {
            buf.put_u16(address);
            buf.put_u16(quantity);
        }
        Request::WriteSingleRegister(address, word) => {
            buf.put_u16(address);
            buf.put_u16(word);
        }
    }
    Ok(buf.freeze())
}

fn read_u8(rdr: &mut Cursor<&Bytes>) -> Result<u8> {
    rdr.read_u8()
        .map_err(|_| Error::malformed("unexpected end of data"))
}

fn read_u16_be(rdr: &mut Cursor<&Bytes>) -> Result<u16> {
    rdr.read_u16::<BigEndian>()
        .map_err(|_| Error::malformed("unexpected end of data"))
}

impl TryFrom<Bytes> for Response {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self> {
        if bytes.len() > MAX_PDU_SIZE {
            return Err(Error::malformed("response PDU size exceeded"));
        }
        let rdr = &mut Cursor::new(&bytes);
        let fn_code = read_u8(rdr)?;
        let rsp = match fn_code {
            0x04 => {
                let byte_count = read_u8(rdr)?;
                if byte_count % 2 != 0 {
                    return Err(Error::malformed("invalid quantity"));
                }
                let quantity = byte_count / 2;
                let mut data = Vec::with_capacity(quantity.into());
                for _ in 0..quantity {
                    data.push(read_u16_be(rdr)?);
                }
                Response::ReadInputRegisters(data)
            }
            0x06 => Response::WriteSingleRegister(read_u16_be(rdr)?, read_u16_be(rdr)?),
            fn_code => {
                return Err(Error::malformed(format!(
                    "unsupported function code: 0x{fn_code:02X}"
                )));
            }
        };
        // Verify that all data has been consumed and decoded.
        if rdr.has_remaining() {
            return Err(Error::malformed("undecoded response data"));
        }
        Ok(rsp)
    }
}

impl TryFrom<Bytes> for ExceptionResponse {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self> {
        let rdr = &mut Cursor::new(&bytes);
        let fn_err_code = read_u8(rdr)?;
        if fn_err_code < 0x80 {
            return Err(Error::malformed("invalid exception function code"));
        }
        let function = FunctionCode::new(fn_err_code - 0x80);
        let exception = ExceptionCode::new(read_u8(rdr)?);
        if rdr.has_remaining() {
            return Err(Error::malformed("undecoded exception data"));
        }
        Ok(ExceptionResponse {
            function,
            exception,
        })
    }
}

impl TryFrom<Bytes> for ResponsePdu {
    type Error = Error;

    fn try_from(bytes: Bytes) -> Result<Self> {
        let fn_code = bytes
            .first()
            .copied()
            .ok_or_else(|| Error::malformed("empty PDU"))?;
        let pdu = if fn_code < 0x80 {
            Response::try_from(bytes)?.into()
        } else {
            ExceptionResponse::try_from(bytes)?.into()
        };
        Ok(pdu)
    }
}

/// Client side codec of the configured framing.
#[derive(Debug)]
pub(crate) enum ClientCodec {
    Rtu(rtu::ClientCodec),
    Ascii(ascii::ClientCodec),
}

impl ClientCodec {
    pub(crate) fn new(mode: Mode) -> Self {
        match mode {
            Mode::Rtu => Self::Rtu(rtu::ClientCodec),
            Mode::Ascii => Self::Ascii(ascii::ClientCodec),
        }
    }
}

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        match self {
            Self::Rtu(codec) => codec.decode(buf),
            Self::Ascii(codec) => codec.decode(buf),
        }
    }
}

impl Encoder<RequestAdu> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu, buf: &mut BytesMut) -> Result<()> {
        match self {
            Self::Rtu(codec) => codec.encode(adu, buf),
            Self::Ascii(codec) => codec.encode(adu, buf),
        }
    }
}

/// Encodes a complete request frame including its checksum.
pub fn encode_request(mode: Mode, slave: Slave, request: Request) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    ClientCodec::new(mode).encode(RequestAdu::new(slave, request), &mut buf)?;
    Ok(buf.freeze())
}

/// Decodes a complete response frame that is expected from `slave`.
///
/// The checks are applied in the following order and the first one that
/// fails determines the error: frame structure, checksum, slave id.
pub fn decode_response(mode: Mode, frame: &[u8], slave: Slave) -> Result<ResponseAdu> {
    let mut buf = BytesMut::from(frame);
    let adu = ClientCodec::new(mode)
        .decode(&mut buf)?
        .ok_or_else(|| Error::malformed("incomplete frame"))?;
    if !buf.is_empty() {
        return Err(Error::malformed(format!(
            "{} trailing bytes after frame",
            buf.len()
        )));
    }
    verify_response_header(&Header { slave }, &adu.hdr)?;
    Ok(adu)
}
