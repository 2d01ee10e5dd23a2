// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt as _};
use bytes::{BufMut as _, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::encode_request_pdu;
use crate::{
    frame::{
        serial::{Header, RequestAdu, ResponseAdu},
        ResponsePdu,
    },
    Error, Result, Slave,
};

// addr + function + crc
const MIN_ADU_LEN: usize = 1 + 1 + 2;

/// RTU framing: binary PDU followed by a little-endian CRC-16.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientCodec;

fn get_response_payload_len(buf: &BytesMut) -> Result<Option<usize>> {
    if buf.len() < 2 {
        // incomplete frame
        return Ok(None);
    }
    let len = match buf[1] {
        0x04 => {
            if buf.len() > 2 {
                Some(1 + usize::from(buf[2]))
            } else {
                // incomplete frame
                None
            }
        }
        0x06 => Some(4),
        0x80..=0xFF => Some(1),
        fn_code => {
            return Err(Error::malformed(format!(
                "unexpected function code: 0x{fn_code:02X}"
            )));
        }
    };
    Ok(len)
}

/// CRC-16/MODBUS (reflected polynomial 0xA001, initial value 0xFFFF).
///
/// The checksum is transmitted in little-endian byte order.
#[must_use]
pub fn calc_crc(data: &[u8]) -> u16 {
    let mut crc = 0xFFFF;
    for x in data {
        crc ^= u16::from(*x);
        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc >>= 1;
                crc ^= 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        let Some(payload_len) = get_response_payload_len(buf)? else {
            return Ok(None);
        };
        let adu_len = MIN_ADU_LEN + payload_len;
        if buf.len() < adu_len {
            // incomplete frame
            return Ok(None);
        }

        let mut adu = buf.split_to(adu_len);
        let crc = adu.split_off(adu_len - 2);
        let actual = Cursor::new(&crc).read_u16::<LittleEndian>()?;
        let expected = calc_crc(&adu);
        if expected != actual {
            return Err(Error::Checksum { expected, actual });
        }

        let slave = Slave(adu[0]);
        let pdu = ResponsePdu::try_from(adu.split_off(1).freeze())?;
        Ok(Some(ResponseAdu {
            hdr: Header { slave },
            pdu,
        }))
    }
}

impl Encoder<RequestAdu> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, adu: RequestAdu, buf: &mut BytesMut) -> Result<()> {
        let RequestAdu { hdr, pdu } = adu;
        let pdu = encode_request_pdu(&pdu.0)?;
        let start = buf.len();
        buf.reserve(pdu.len() + 3);
        buf.put_u8(hdr.slave.into());
        buf.put_slice(&pdu);
        let crc = calc_crc(&buf[start..]);
        buf.put_u16_le(crc);
        Ok(())
    }
}
