// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::encode_request_pdu;
use crate::{
    frame::{
        serial::{Header, RequestAdu, ResponseAdu},
        ResponsePdu,
    },
    Error, Result, Slave,
};

const START: u8 = b':';

const END: &[u8] = b"\r\n";

// start + 2 hex digits per byte of (addr + PDU + lrc) + end
const MAX_FRAME_LEN: usize = 1 + 2 * (1 + 253 + 1) + 2;

// addr + function + lrc
const MIN_DATA_LEN: usize = 3;

/// ASCII framing: `:` + upper case hex digits + LRC + CR LF.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClientCodec;

/// Longitudinal redundancy check.
///
/// Two's complement of the sum of all bytes, modulo 256.
#[must_use]
pub fn calc_lrc(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |lrc, x| lrc.wrapping_add(*x))
        .wrapping_neg()
}

impl Decoder for ClientCodec {
    type Item = ResponseAdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponseAdu>> {
        // Line noise before the start delimiter is skipped
        let Some(start) = buf.iter().position(|&b| b == START) else {
            if !buf.is_empty() {
                log::warn!("Dropped {} byte(s) without start delimiter", buf.len());
                buf.clear();
            }
            return Ok(None);
        };
        if start > 0 {
            log::warn!(
                "Dropped {start} byte(s) before start delimiter: {}",
                hex::encode_upper(&buf[..start])
            );
            buf.advance(start);
        }
        let Some(end) = buf.windows(END.len()).position(|w| w == END) else {
            if buf.len() >= MAX_FRAME_LEN {
                return Err(Error::malformed("missing end delimiter"));
            }
            // incomplete frame
            return Ok(None);
        };

        let frame = buf.split_to(end + END.len());
        let digits = &frame[1..end];
        if digits.len() % 2 != 0 {
            return Err(Error::malformed("odd number of hex digits"));
        }
        if digits.len() < 2 * MIN_DATA_LEN {
            return Err(Error::malformed("frame too short"));
        }
        let data = hex::decode(digits)
            .map_err(|err| Error::malformed(format!("invalid hex digits: {err}")))?;

        let (&actual, adu) = data
            .split_last()
            .ok_or_else(|| Error::malformed("frame too short"))?;
        let expected = calc_lrc(adu);
        if expected != actual {
            return Err(Error::Checksum {
                expected: expected.into(),
                actual: actual.into(),
            });
        }

        let slave = Slave(adu[0]);
        let pdu = ResponsePdu::try_from(Bytes::copy_from_slice(&adu[1..]))?;
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
        let mut data = Vec::with_capacity(pdu.len() + 2);
        data.push(hdr.slave.into());
        data.extend_from_slice(&pdu);
        data.push(calc_lrc(&data));

        let digits = hex::encode_upper(&data);
        buf.reserve(digits.len() + 1 + END.len());
        buf.put_u8(START);
        buf.put_slice(digits.as_bytes());
        buf.put_slice(END);
        Ok(())
    }
}
