use crate::output::SampleWriter;
use anyhow::Context;
use goio_device::{Sdk, SensorInfo, Session};
use std::io::Write;
use std::thread::sleep;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub dwell: Duration,
    pub samples: u32,
    /// Stop after reporting the device, without streaming
    pub probe_only: bool,
}

/// Finds the first known GoIO device, then streams `plan.samples` readings into `out`.
///
/// An empty bus is not an error, there is just nothing to report. The sensor and
/// the SDK are shut down on every return path.
pub fn run<S: Sdk, W: Write>(
    sdk: &S,
    plan: &Plan,
    out: &mut SampleWriter<W>,
) -> anyhow::Result<()> {
    let session = Session::init(sdk).context("Error while initialising the GoIO SDK")?;

    let Some(locator) = session
        .find_device()
        .context("Error while looking for GoIO devices")?
    else {
        tracing::debug!("no GoIO devices found");
        return Ok(());
    };

    let mut sensor = session.open(&locator)?;

    // the DDS identity is informational, a sensor without one still streams
    let info = sensor.info().unwrap_or_else(|e| {
        tracing::warn!("Couldn't read the sensor identity: {e}");
        SensorInfo {
            sensor_number: 0,
            long_name: String::new(),
        }
    });
    tracing::info!(
        "found {} device = {}, sensor = {} ({})",
        locator.product.description(),
        locator.name,
        info.sensor_number,
        info.long_name
    );

    if plan.probe_only {
        return Ok(());
    }

    tracing::debug!(
        "getting {} samples, one every {} ms",
        plan.samples,
        plan.dwell.as_millis()
    );

    let period = sensor
        .configure(plan.dwell)
        .context("Error while setting the measurement period")?;
    sensor
        .start_measurements()
        .context("Error while starting measurements")?;

    for idx in 0..plan.samples {
        sleep(period);
        let reading = sensor
            .read()
            .with_context(|| format!("Error while reading sample {idx}"))?;
        // `configure` keeps the period within u32 milliseconds, so this can't overflow
        out.write(period * idx, &reading)
            .context("Error while writing a sample")?;
    }

    Ok(())
}
