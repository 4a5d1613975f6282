use crate::sdk::{CalibrationPage, Sdk, CMD_ID_START_MEASUREMENTS, DEFAULT_TIMEOUT_MS};
use crate::{DeviceLocator, Error};
use std::time::Duration;

/// Identity stored in the sensor's DDS memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorInfo {
    pub sensor_number: u8,
    pub long_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub raw: i32,
    pub volts: f64,
    /// Calibrated value, in `page.units`
    pub value: f64,
    pub equation: i8,
    pub page: CalibrationPage,
}

/// An open sensor. The handle is closed on drop.
pub struct Sensor<'s, S: Sdk> {
    sdk: &'s S,
    handle: S::Handle,
    locator: DeviceLocator,
}

impl<'s, S: Sdk> Sensor<'s, S> {
    pub(crate) fn new(sdk: &'s S, handle: S::Handle, locator: DeviceLocator) -> Self {
        Self {
            sdk,
            handle,
            locator,
        }
    }

    pub fn info(&self) -> Result<SensorInfo, Error> {
        Ok(SensorInfo {
            sensor_number: self.sdk.sensor_number(self.handle)?,
            long_name: self.sdk.long_name(self.handle)?,
        })
    }

    /// Requests a measurement period and returns the one the device actually settled on
    pub fn configure(&mut self, period: Duration) -> Result<Duration, Error> {
        self.sdk
            .set_measurement_period(self.handle, period.as_secs_f64(), DEFAULT_TIMEOUT_MS)?;
        let secs = self.sdk.measurement_period(self.handle, DEFAULT_TIMEOUT_MS);

        // Whole milliseconds, capped at u32::MAX so that `period * sample index` can't
        // overflow a Duration. A negative or NaN readback means the query itself failed.
        let millis = secs * 1000.0;
        if !(0.0..=f64::from(u32::MAX)).contains(&millis) {
            return Err(Error::Sdk {
                operation: "reading back the measurement period",
                status: -1,
            });
        }
        let actual = Duration::from_millis(millis as u64);
        if actual != period {
            tracing::debug!("requested a {period:?} period, device uses {actual:?}");
        }

        Ok(actual)
    }

    pub fn start_measurements(&mut self) -> Result<(), Error> {
        self.sdk
            .send_command(self.handle, CMD_ID_START_MEASUREMENTS, DEFAULT_TIMEOUT_MS)
    }

    /// Takes the latest sample and runs it through the sensor's calibration.
    ///
    /// The calibration page is looked up on every read since the active page,
    /// and with it the units, may change while streaming.
    pub fn read(&mut self) -> Result<Reading, Error> {
        let raw = self.sdk.latest_raw_measurement(self.handle);
        let volts = self.sdk.convert_to_voltage(self.handle, raw);
        let value = self.sdk.calibrate_data(self.handle, volts);

        let equation = self.sdk.calibration_equation(self.handle)?;
        let active_page = self.sdk.active_calibration_page(self.handle)?;
        let page = self.sdk.calibration_page(self.handle, active_page)?;
        tracing::trace!(
            raw,
            volts,
            equation,
            active_page,
            a = page.a,
            b = page.b,
            c = page.c,
            "sample"
        );

        Ok(Reading {
            raw,
            volts,
            value,
            equation,
            page,
        })
    }
}

impl<S: Sdk> Drop for Sensor<'_, S> {
    fn drop(&mut self) {
        tracing::debug!("closing {}", self.locator.name);
        self.sdk.close(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Call, MockSdk};
    use crate::{Product, Session};
    use std::time::Duration;

    #[test]
    fn read_runs_the_calibration_chain() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        sdk.push_raw(2048);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        let reading = sensor.read().unwrap();
        assert_eq!(reading.raw, 2048);
        assert_eq!(reading.volts, MockSdk::volts_for(2048));
        assert_eq!(reading.value, MockSdk::calibrated_for(MockSdk::volts_for(2048)));
        assert_eq!(reading.page.units, "deg C");
        assert_eq!(reading.equation, 1);
    }

    #[test]
    fn units_follow_the_active_page() {
        let sdk = MockSdk::with_devices(&[Product::GoLink]);
        sdk.set_active_page(1);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        assert_eq!(sensor.read().unwrap().page.units, "deg F");
        sdk.set_active_page(0);
        assert_eq!(sensor.read().unwrap().page.units, "deg C");
    }

    #[test]
    fn configure_returns_the_period_read_back() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        sdk.set_actual_period(0.05);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        let actual = sensor.configure(Duration::from_millis(40)).unwrap();
        assert_eq!(actual, Duration::from_millis(50));
        assert!(sdk.calls().contains(&Call::SetMeasurementPeriod(0.04)));
    }

    #[test]
    fn configure_rejects_a_negative_readback() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        sdk.set_actual_period(-1.0);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        assert!(sensor.configure(Duration::from_millis(40)).is_err());
    }

    #[test]
    fn configure_truncates_the_readback_to_whole_milliseconds() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        sdk.set_actual_period(0.0405);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        let actual = sensor.configure(Duration::from_millis(40)).unwrap();
        assert_eq!(actual, Duration::from_millis(40));
    }

    #[test]
    fn configure_rejects_an_oversized_readback() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        // ~58 days, past what fits in u32 milliseconds
        sdk.set_actual_period(5.0e6);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        assert!(matches!(
            sensor.configure(Duration::from_millis(40)),
            Err(crate::Error::Sdk { .. })
        ));
    }

    #[test]
    fn configure_rejects_a_nan_readback() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        sdk.set_actual_period(f64::NAN);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        assert!(sensor.configure(Duration::from_millis(40)).is_err());
    }

    #[test]
    fn start_sends_the_start_command() {
        let sdk = MockSdk::with_devices(&[Product::MiniGc]);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let mut sensor = session.open(&locator).unwrap();

        sensor.start_measurements().unwrap();
        assert!(sdk.calls().contains(&Call::SendCommand(0x18)));
    }

    #[test]
    fn info_reports_dds_identity() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        let sensor = session.open(&locator).unwrap();

        let info = sensor.info().unwrap();
        assert_eq!(info.sensor_number, 60);
        assert_eq!(info.long_name, "Temperature");
    }
}
