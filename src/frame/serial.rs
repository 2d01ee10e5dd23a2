// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application data units of the Modbus serial line (RTU and ASCII)

use super::*;

use crate::{Error, Result, Slave};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Header {
    pub(crate) slave: Slave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RequestContext {
    pub(crate) function_code: FunctionCode,
    pub(crate) header: Header,
}

#[derive(Debug, Clone)]
pub(crate) struct RequestAdu {
    pub(crate) hdr: Header,
    pub(crate) pdu: RequestPdu,
}

impl RequestAdu {
    pub(crate) fn new(slave: Slave, request: Request) -> Self {
        Self {
            hdr: Header { slave },
            pdu: request.into(),
        }
    }

    pub(crate) fn context(&self) -> RequestContext {
        RequestContext {
            function_code: self.pdu.0.function_code(),
            header: self.hdr,
        }
    }
}

/// A response frame that passed the structural and checksum checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAdu {
    pub(crate) hdr: Header,
    pub(crate) pdu: ResponsePdu,
}

impl ResponseAdu {
    /// The slave that sent the response.
    #[must_use]
    pub fn slave(&self) -> Slave {
        self.hdr.slave
    }

    /// The function code found in the response frame.
    ///
    /// Exception responses report the function code of the failed
    /// request, i.e. without the exception bit.
    #[must_use]
    pub fn function_code(&self) -> FunctionCode {
        match &self.pdu.0 {
            Ok(response) => response.function_code(),
            Err(ExceptionResponse { function, .. }) => *function,
        }
    }

    /// Consumes the frame and returns its payload.
    pub fn into_result(self) -> std::result::Result<Response, ExceptionResponse> {
        self.pdu.0
    }

    /// Matches the response against the request it answers.
    ///
    /// The slave id is verified before the function code.
    pub(crate) fn try_into_response(self, request_context: RequestContext) -> Result<Response> {
        let RequestContext {
            function_code: req_function_code,
            header: req_hdr,
        } = request_context;

        verify_response_header(&req_hdr, &self.hdr)?;

        let rsp_function_code = self.function_code();
        if req_function_code != rsp_function_code {
            return Err(Error::FunctionCodeMismatch {
                request: req_function_code,
                response: rsp_function_code,
            });
        }

        self.into_result().map_err(Error::Exception)
    }
}

pub(crate) fn verify_response_header(req_hdr: &Header, rsp_hdr: &Header) -> Result<()> {
    if req_hdr != rsp_hdr {
        return Err(Error::SlaveMismatch {
            expected: req_hdr.slave,
            actual: rsp_hdr.slave,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_context(slave: u8, request: Request) -> RequestContext {
        RequestAdu::new(Slave(slave), request).context()
    }

    #[test]
    fn validate_same_headers() {
        // Given
        let req_hdr = Header { slave: Slave(2) };
        let rsp_hdr = Header { slave: Slave(2) };

        // When
        let result = verify_response_header(&req_hdr, &rsp_hdr);

        // Then
        assert!(result.is_ok());
    }

    #[test]
    fn invalid_validate_not_same_slave_id() {
        // Given
        let req_hdr = Header { slave: Slave(2) };
        let rsp_hdr = Header { slave: Slave(5) };

        // When
        let result = verify_response_header(&req_hdr, &rsp_hdr);

        // Then
        assert!(matches!(
            result,
            Err(Error::SlaveMismatch { expected: Slave(2), actual: Slave(5) })
        ));
    }

    #[test]
    fn slave_mismatch_wins_over_function_code_mismatch() {
        let context = request_context(2, Request::ReadInputRegisters(1000, 1));
        let adu = ResponseAdu {
            hdr: Header { slave: Slave(3) },
            pdu: Response::WriteSingleRegister(1000, 1).into(),
        };

        let err = adu.try_into_response(context).unwrap_err();

        assert!(matches!(err, Error::SlaveMismatch { .. }));
    }

    #[test]
    fn function_code_mismatch() {
        let context = request_context(2, Request::ReadInputRegisters(1000, 1));
        let adu = ResponseAdu {
            hdr: Header { slave: Slave(2) },
            pdu: Response::WriteSingleRegister(1000, 1).into(),
        };

        let err = adu.try_into_response(context).unwrap_err();

        assert!(matches!(
            err,
            Error::FunctionCodeMismatch {
                request: FunctionCode::ReadInputRegisters,
                response: FunctionCode::WriteSingleRegister,
            }
        ));
    }

    #[test]
    fn exception_response_becomes_error() {
        let context = request_context(2, Request::ReadInputRegisters(9999, 1));
        let exception = ExceptionResponse {
            function: FunctionCode::ReadInputRegisters,
            exception: ExceptionCode::IllegalDataAddress,
        };
        let adu = ResponseAdu {
            hdr: Header { slave: Slave(2) },
            pdu: exception.into(),
        };

        let err = adu.try_into_response(context).unwrap_err();

        assert!(matches!(err, Error::Exception(rsp) if rsp == exception));
    }

    #[test]
    fn matching_response() {
        let context = request_context(2, Request::ReadInputRegisters(1000, 1));
        let adu = ResponseAdu {
            hdr: Header { slave: Slave(2) },
            pdu: Response::ReadInputRegisters(vec![84]).into(),
        };

        let rsp = adu.try_into_response(context).unwrap();

        assert_eq!(rsp, Response::ReadInputRegisters(vec![84]));
    }
}
