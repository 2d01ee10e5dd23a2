// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

mod slave;

use std::time::Duration;

use lamdatronic_modbus::{
    client::{self, retry, Client as _, Reader as _},
    Error, Mode, Request, Response,
};
use tokio::time::Instant;

use crate::slave::{config, init_logger, Behavior, HeatingController};

#[tokio::test(start_paused = true)]
async fn discard_late_response_after_timeout() -> anyhow::Result<()> {
    init_logger();
    let (transport, device) = HeatingController::new(Mode::Rtu)
        .with_input_register(1000, 84)
        .with_input_register(1030, 90)
        .then(Behavior::Delay(Duration::from_millis(1050)))
        .spawn();
    let mut ctx = client::attach(transport, &config(Mode::Rtu))?;

    let started = Instant::now();
    let err = ctx.read_input_registers(1000, 1).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(timeout) if timeout == Duration::from_secs(1)));
    assert!(err.is_retryable());
    assert!(started.elapsed() >= Duration::from_secs(1));

    // The late response to the first request must not be mistaken
    // for the response to the second one.
    assert_eq!(ctx.read_input_registers(1030, 1).await?, vec![90]);

    ctx.disconnect().await?;
    let device = device.await?;
    assert_eq!(device.requests.len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn time_out_without_response() -> anyhow::Result<()> {
    init_logger();
    let (transport, device) = HeatingController::new(Mode::Rtu)
        .with_input_register(1000, 84)
        .then(Behavior::Silent)
        .spawn();
    let config = config(Mode::Rtu).with_timeout(Duration::from_millis(250));
    let mut ctx = client::attach(transport, &config)?;

    assert!(matches!(
        ctx.read_input_registers(1000, 1).await,
        Err(Error::Timeout(_))
    ));
    assert_eq!(ctx.read_input_registers(1000, 1).await?, vec![84]);

    ctx.disconnect().await?;
    device.await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn retry_after_timeout() -> anyhow::Result<()> {
    init_logger();
    let (transport, device) = HeatingController::new(Mode::Rtu)
        .with_input_register(1000, 84)
        .then(Behavior::Silent)
        .then(Behavior::Delay(Duration::from_millis(1050)))
        .spawn();
    let mut ctx = client::attach(transport, &config(Mode::Rtu))?;

    let response = retry::call_with_retry(
        &mut ctx,
        Request::ReadInputRegisters(1000, 1),
        retry::RetryPolicy::default(),
    )
    .await?;
    assert_eq!(response, Response::ReadInputRegisters(vec![84]));

    ctx.disconnect().await?;
    assert_eq!(device.await?.requests.len(), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn never_retry_corrupted_responses() -> anyhow::Result<()> {
    init_logger();
    let (transport, device) = HeatingController::new(Mode::Rtu)
        .with_input_register(1000, 84)
        .then(Behavior::CorruptChecksum)
        .spawn();
    let mut ctx = client::attach(transport, &config(Mode::Rtu))?;

    let err = retry::call_with_retry(
        &mut ctx,
        Request::ReadInputRegisters(1000, 1),
        retry::RetryPolicy::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Checksum { .. }));

    ctx.disconnect().await?;
    assert_eq!(device.await?.requests.len(), 1);
    Ok(())
}
