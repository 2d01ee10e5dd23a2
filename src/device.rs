// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fröling Lamdatronic P3200 heating controller
//!
//! Temperatures are transferred in steps of 0.5 °C, i.e. the registers
//! hold twice the temperature in °C.
//!
//! All parameters are validated before a request is sent. Invalid
//! parameters never reach the wire.

use std::io;

use crate::{
    client::{Client, Reader as _, Writer as _},
    error::RangeError,
    frame::{Address, Word},
    register::{self, RegisterFormat},
    Result,
};

/// Number of heating circuits.
pub const HEATING_CIRCUITS: u8 = 18;

/// Input register of the outside temperature.
pub const OUTSIDE_TEMPERATURE_REGISTER: Address = 1000;

const PREFLOW_TEMPERATURE_CURRENT_BASE: Address = 1000;

const PREFLOW_TEMPERATURE_SET_BASE: Address = 1001;

// Distance between the input registers of two heating circuits
const CIRCUIT_STRIDE: Address = 30;

const PREFLOW_TEMPERATURE_SETPOINT_BASE: Address = 8000;

const RELEASE_BASE: Address = 8028;

const TEMPERATURE_SCALE: f64 = 2.0;

/// Number of a heating circuit, 1 to 18.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeatingCircuit(u8);

impl HeatingCircuit {
    pub fn new(circuit: u8) -> std::result::Result<Self, RangeError> {
        if (1..=HEATING_CIRCUITS).contains(&circuit) {
            Ok(Self(circuit))
        } else {
            Err(RangeError::Circuit {
                circuit,
                max: HEATING_CIRCUITS,
            })
        }
    }

    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }

    /// Input register of the current preflow temperature.
    #[must_use]
    pub const fn preflow_temperature_current_register(self) -> Address {
        PREFLOW_TEMPERATURE_CURRENT_BASE + self.0 as Address * CIRCUIT_STRIDE
    }

    /// Input register of the preflow temperature setpoint.
    #[must_use]
    pub const fn preflow_temperature_set_register(self) -> Address {
        PREFLOW_TEMPERATURE_SET_BASE + self.0 as Address * CIRCUIT_STRIDE
    }

    /// Holding register for overriding the preflow temperature.
    #[must_use]
    pub const fn preflow_temperature_setpoint_register(self) -> Address {
        PREFLOW_TEMPERATURE_SETPOINT_BASE + (self.0 - 1) as Address
    }

    /// Holding register that switches the pump of the circuit.
    #[must_use]
    pub const fn release_register(self) -> Address {
        RELEASE_BASE + (self.0 - 1) as Address
    }
}

impl TryFrom<u8> for HeatingCircuit {
    type Error = RangeError;

    fn try_from(circuit: u8) -> std::result::Result<Self, Self::Error> {
        Self::new(circuit)
    }
}

impl From<HeatingCircuit> for u8 {
    fn from(from: HeatingCircuit) -> Self {
        from.0
    }
}

fn temperature(value: f64) -> f64 {
    value / TEMPERATURE_SCALE
}

/// Register word of a preflow temperature setpoint.
fn setpoint_word(temp: f64, t_max: f64, t_min: f64) -> std::result::Result<Word, RangeError> {
    if !(t_min..=t_max).contains(&temp) {
        return Err(RangeError::Temperature {
            temp,
            min: t_min,
            max: t_max,
        });
    }
    register::encode(temp * TEMPERATURE_SCALE, RegisterFormat::UNSIGNED)
}

const fn release_word(release: bool) -> Word {
    if release {
        1
    } else {
        0
    }
}

/// Asynchronous access to a Lamdatronic P3200.
#[derive(Debug)]
pub struct LamdatronicP3200<C> {
    client: C,
}

#[cfg(feature = "serial")]
impl LamdatronicP3200<crate::client::Context> {
    /// Opens the serial port and connects to the controller.
    pub async fn connect(config: &crate::config::Config) -> Result<Self> {
        let context = crate::client::connect(config).await?;
        Ok(Self::new(context))
    }
}

impl<C> LamdatronicP3200<C>
where
    C: Client,
{
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Outside temperature in °C.
    pub async fn get_outside_temperature(&mut self) -> Result<f64> {
        self.client
            .read_input_register_value(OUTSIDE_TEMPERATURE_REGISTER, RegisterFormat::SIGNED)
            .await
            .map(temperature)
    }

    /// Current preflow temperature of a heating circuit in °C.
    pub async fn get_preflow_temperature_current(&mut self, circuit: u8) -> Result<f64> {
        let circuit = HeatingCircuit::new(circuit)?;
        self.client
            .read_input_register_value(
                circuit.preflow_temperature_current_register(),
                RegisterFormat::UNSIGNED,
            )
            .await
            .map(temperature)
    }

    /// Preflow temperature setpoint of a heating circuit in °C.
    pub async fn get_preflow_temperature_set(&mut self, circuit: u8) -> Result<f64> {
        let circuit = HeatingCircuit::new(circuit)?;
        self.client
            .read_input_register_value(
                circuit.preflow_temperature_set_register(),
                RegisterFormat::UNSIGNED,
            )
            .await
            .map(temperature)
    }

    /// Overrides the preflow temperature of a heating circuit.
    ///
    /// `temp` must be within `t_min..=t_max`. The controller returns to its
    /// internal heating curve after two minutes without any further
    /// _Modbus_ request.
    pub async fn set_preflow_temperature(
        &mut self,
        circuit: u8,
        temp: f64,
        t_max: f64,
        t_min: f64,
    ) -> Result<()> {
        let circuit = HeatingCircuit::new(circuit)?;
        let word = setpoint_word(temp, t_max, t_min)?;
        log::debug!(
            "Setting preflow temperature of heating circuit {} to {temp} °C",
            circuit.number()
        );
        self.client
            .write_single_register(circuit.preflow_temperature_setpoint_register(), word)
            .await
    }

    /// Switches the pump of a heating circuit on or off.
    pub async fn release_heating_circuit(&mut self, circuit: u8, release: bool) -> Result<()> {
        let circuit = HeatingCircuit::new(circuit)?;
        self.client
            .write_single_register(circuit.release_register(), release_word(release))
            .await
    }

    pub async fn disconnect(&mut self) -> io::Result<()> {
        self.client.disconnect().await
    }
}

/// Blocking access to a Lamdatronic P3200
#[cfg(feature = "sync")]
pub mod sync {
    use std::io;

    use super::{release_word, setpoint_word, temperature, HeatingCircuit};
    use crate::{
        client::sync::{Client, Reader as _, Writer as _},
        register::RegisterFormat,
        Result,
    };

    #[derive(Debug)]
    pub struct LamdatronicP3200<C> {
        client: C,
    }

    #[cfg(feature = "serial")]
    impl LamdatronicP3200<crate::client::sync::Context> {
        pub fn connect(config: &crate::config::Config) -> Result<Self> {
            crate::client::sync::connect(config).map(Self::new)
        }
    }

    impl<C> LamdatronicP3200<C>
    where
        C: Client,
    {
        pub const fn new(client: C) -> Self {
            Self { client }
        }

        pub fn into_inner(self) -> C {
            self.client
        }

        pub fn get_outside_temperature(&mut self) -> Result<f64> {
            self.client
                .read_input_register_value(
                    super::OUTSIDE_TEMPERATURE_REGISTER,
                    RegisterFormat::SIGNED,
                )
                .map(temperature)
        }

        pub fn get_preflow_temperature_current(&mut self, circuit: u8) -> Result<f64> {
            let circuit = HeatingCircuit::new(circuit)?;
            self.client
                .read_input_register_value(
                    circuit.preflow_temperature_current_register(),
                    RegisterFormat::UNSIGNED,
                )
                .map(temperature)
        }

        pub fn get_preflow_temperature_set(&mut self, circuit: u8) -> Result<f64> {
            let circuit = HeatingCircuit::new(circuit)?;
            self.client
                .read_input_register_value(
                    circuit.preflow_temperature_set_register(),
                    RegisterFormat::UNSIGNED,
                )
                .map(temperature)
        }

        pub fn set_preflow_temperature(
            &mut self,
            circuit: u8,
            temp: f64,
            t_max: f64,
            t_min: f64,
        ) -> Result<()> {
            let circuit = HeatingCircuit::new(circuit)?;
            let word = setpoint_word(temp, t_max, t_min)?;
            self.client
                .write_single_register(circuit.preflow_temperature_setpoint_register(), word)
        }

        pub fn release_heating_circuit(&mut self, circuit: u8, release: bool) -> Result<()> {
            let circuit = HeatingCircuit::new(circuit)?;
            self.client
                .write_single_register(circuit.release_register(), release_word(release))
        }

        pub fn disconnect(&mut self) -> io::Result<()> {
            self.client.disconnect()
        }
    }
}
