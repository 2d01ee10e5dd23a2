// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Simulated heating controller at the far end of an in-memory serial line

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

use lamdatronic_modbus::{
    codec::{calc_crc, calc_lrc},
    Config, Mode, Slave,
};
use tokio::{
    io::{duplex, AsyncBufReadExt as _, AsyncReadExt as _, AsyncWriteExt as _, BufReader, DuplexStream},
    task::JoinHandle,
    time,
};

pub const SLAVE: Slave = Slave(2);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config(mode: Mode) -> Config {
    Config::new("/dev/ttySIM0", SLAVE, mode)
}

/// How the controller answers a single request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Respond,
    /// Respond with a wrong checksum.
    CorruptChecksum,
    /// Swallow the request.
    Silent,
    /// Respond after the given delay.
    Delay(Duration),
    /// Respond with the given exception code.
    Exception(u8),
    /// Respond as if sent by another slave.
    ForeignSlave(u8),
}

#[derive(Debug)]
pub struct HeatingController {
    mode: Mode,
    slave: Slave,
    input_registers: HashMap<u16, u16>,
    pub holding_registers: HashMap<u16, u16>,
    behaviors: VecDeque<Behavior>,
    /// Slave id and PDU of every received request.
    pub requests: Vec<Vec<u8>>,
}

impl HeatingController {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            slave: SLAVE,
            input_registers: HashMap::new(),
            holding_registers: HashMap::new(),
            behaviors: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_input_register(mut self, addr: u16, word: u16) -> Self {
        self.input_registers.insert(addr, word);
        self
    }

    /// Answers the next pending request as given.
    ///
    /// Requests without an explicit behavior are answered regularly.
    #[must_use]
    pub fn then(mut self, behavior: Behavior) -> Self {
        self.behaviors.push_back(behavior);
        self
    }

    /// Starts serving requests until the client hangs up.
    pub fn spawn(self) -> (DuplexStream, JoinHandle<Self>) {
        let (client, device) = duplex(1024);
        (client, tokio::spawn(self.serve(device)))
    }

    async fn serve(mut self, device: DuplexStream) -> Self {
        let mut device = BufReader::new(device);
        while let Some(request) = self.recv(&mut device).await {
            self.requests.push(request.clone());
            let behavior = self.behaviors.pop_front().unwrap_or(Behavior::Respond);
            let response = match behavior {
                Behavior::Silent => continue,
                Behavior::Exception(code) => vec![request[0], request[1] | 0x80, code],
                Behavior::ForeignSlave(slave) => {
                    let mut response = self.process(&request);
                    response[0] = slave;
                    response
                }
                _ => self.process(&request),
            };
            if let Behavior::Delay(delay) = behavior {
                time::sleep(delay).await;
            }
            let frame = self.frame(&response, behavior == Behavior::CorruptChecksum);
            if device.write_all(&frame).await.is_err() {
                break;
            }
        }
        self
    }

    async fn recv(&self, device: &mut BufReader<DuplexStream>) -> Option<Vec<u8>> {
        match self.mode {
            Mode::Rtu => {
                // Both supported requests have the same size
                let mut frame = [0; 8];
                device.read_exact(&mut frame).await.ok()?;
                let crc = u16::from_le_bytes([frame[6], frame[7]]);
                assert_eq!(calc_crc(&frame[..6]), crc, "request CRC");
                Some(frame[..6].to_vec())
            }
            Mode::Ascii => {
                let mut line = Vec::new();
                if device.read_until(b'\n', &mut line).await.ok()? == 0 {
                    return None;
                }
                assert_eq!(line.first(), Some(&b':'));
                assert!(line.ends_with(b"\r\n"));
                let digits = &line[1..line.len() - 2];
                assert!(
                    digits.iter().all(|d| !d.is_ascii_lowercase()),
                    "request digits must be upper case"
                );
                let mut data = hex::decode(digits).ok()?;
                let lrc = data.pop()?;
                assert_eq!(calc_lrc(&data), lrc, "request LRC");
                Some(data)
            }
        }
    }

    fn process(&mut self, request: &[u8]) -> Vec<u8> {
        let (slave, function) = (request[0], request[1]);
        assert_eq!(slave, self.slave.0, "request slave id");
        let addr = u16::from_be_bytes([request[2], request[3]]);
        let value = u16::from_be_bytes([request[4], request[5]]);
        match function {
            0x04 => {
                let mut response = vec![slave, function, (value * 2) as u8];
                for addr in addr..addr + value {
                    let Some(word) = self.input_registers.get(&addr) else {
                        // Illegal data address
                        return vec![slave, function | 0x80, 0x02];
                    };
                    response.extend_from_slice(&word.to_be_bytes());
                }
                response
            }
            0x06 => {
                self.holding_registers.insert(addr, value);
                request.to_vec()
            }
            // Illegal function
            _ => vec![slave, function | 0x80, 0x01],
        }
    }

    fn frame(&self, adu: &[u8], corrupt: bool) -> Vec<u8> {
        match self.mode {
            Mode::Rtu => {
                let mut crc = calc_crc(adu);
                if corrupt {
                    crc ^= 0x0100;
                }
                let mut frame = adu.to_vec();
                frame.extend_from_slice(&crc.to_le_bytes());
                frame
            }
            Mode::Ascii => {
                let mut lrc = calc_lrc(adu);
                if corrupt {
                    lrc = lrc.wrapping_add(1);
                }
                let mut data = adu.to_vec();
                data.push(lrc);
                format!(":{}\r\n", hex::encode_upper(data)).into_bytes()
            }
        }
    }
}
