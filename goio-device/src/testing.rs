//! An in-memory [`Sdk`] for tests, enabled with the `testing` feature.

use crate::sdk::{CalibrationPage, Sdk};
use crate::{Error, Product};
use std::cell::RefCell;
use std::collections::VecDeque;

/// SDK calls as seen by [`MockSdk`], in the order they were made
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init,
    Uninit,
    UpdateAvailableDevices(u16),
    DeviceName(u16),
    Open(String),
    Close,
    SetMeasurementPeriod(f64),
    SendCommand(u8),
    LatestRawMeasurement,
}

const DEFAULT_RAW: i32 = 2048;
const PAGE_UNITS: [&str; 3] = ["deg C", "deg F", "K"];

#[derive(Default)]
struct State {
    devices: Vec<Product>,
    calls: Vec<Call>,
    raw: VecDeque<i32>,
    active_page: u8,
    period: f64,
    actual_period: Option<f64>,
    init_fails: bool,
    open_fails: bool,
}

/// Pretends to be a GoIO SDK with the given products attached.
///
/// Readings use a 12-bit 0-5 V conversion and a linear temperature calibration
/// so tests can predict every value.
#[derive(Default)]
pub struct MockSdk {
    state: RefCell<State>,
}

impl MockSdk {
    pub fn with_devices(devices: &[Product]) -> Self {
        let sdk = Self::default();
        sdk.state.borrow_mut().devices = devices.to_vec();
        sdk
    }

    pub fn device_name(product: Product) -> String {
        format!("/dev/goio-mock-{:04x}", product.id())
    }

    pub fn volts_for(raw: i32) -> f64 {
        f64::from(raw) * 5.0 / 4096.0
    }

    pub fn calibrated_for(volts: f64) -> f64 {
        volts * 100.0 - 50.0
    }

    /// Queues a raw value; once the queue runs dry every read returns 2048
    pub fn push_raw(&self, raw: i32) {
        self.state.borrow_mut().raw.push_back(raw);
    }

    pub fn set_active_page(&self, page: u8) {
        self.state.borrow_mut().active_page = page;
    }

    /// Makes the device report a period other than the one requested
    pub fn set_actual_period(&self, secs: f64) {
        self.state.borrow_mut().actual_period = Some(secs);
    }

    pub fn fail_init(&self) {
        self.state.borrow_mut().init_fails = true;
    }

    pub fn fail_open(&self) {
        self.state.borrow_mut().open_fails = true;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Sdk for MockSdk {
    type Handle = u32;

    fn init(&self) -> Result<(), Error> {
        self.record(Call::Init);
        if self.state.borrow().init_fails {
            return Err(Error::Sdk {
                operation: "initialising the SDK",
                status: -1,
            });
        }
        Ok(())
    }

    fn uninit(&self) {
        self.record(Call::Uninit);
    }

    fn update_available_devices(&self, _vendor_id: u16, product_id: u16) -> usize {
        self.record(Call::UpdateAvailableDevices(product_id));
        self.state
            .borrow()
            .devices
            .iter()
            .filter(|p| p.id() == product_id)
            .count()
    }

    fn nth_available_device_name(
        &self,
        _vendor_id: u16,
        product_id: u16,
        n: usize,
    ) -> Result<String, Error> {
        self.record(Call::DeviceName(product_id));
        let product = Product::from_id(product_id)?;
        let attached = self
            .state
            .borrow()
            .devices
            .iter()
            .filter(|p| **p == product)
            .count();
        if n >= attached {
            return Err(Error::Sdk {
                operation: "getting a device name",
                status: -1,
            });
        }
        Ok(Self::device_name(product))
    }

    fn open(&self, device_name: &str, _vendor_id: u16, _product_id: u16) -> Option<u32> {
        self.record(Call::Open(device_name.to_owned()));
        (!self.state.borrow().open_fails).then_some(1)
    }

    fn close(&self, _handle: u32) {
        self.record(Call::Close);
    }

    fn sensor_number(&self, _handle: u32) -> Result<u8, Error> {
        Ok(60)
    }

    fn long_name(&self, _handle: u32) -> Result<String, Error> {
        Ok("Temperature".to_owned())
    }

    fn set_measurement_period(
        &self,
        _handle: u32,
        period_secs: f64,
        _timeout_ms: i32,
    ) -> Result<(), Error> {
        self.record(Call::SetMeasurementPeriod(period_secs));
        self.state.borrow_mut().period = period_secs;
        Ok(())
    }

    fn measurement_period(&self, _handle: u32, _timeout_ms: i32) -> f64 {
        let state = self.state.borrow();
        state.actual_period.unwrap_or(state.period)
    }

    fn send_command(&self, _handle: u32, command: u8, _timeout_ms: i32) -> Result<(), Error> {
        self.record(Call::SendCommand(command));
        Ok(())
    }

    fn latest_raw_measurement(&self, _handle: u32) -> i32 {
        self.record(Call::LatestRawMeasurement);
        self.state.borrow_mut().raw.pop_front().unwrap_or(DEFAULT_RAW)
    }

    fn convert_to_voltage(&self, _handle: u32, raw: i32) -> f64 {
        Self::volts_for(raw)
    }

    fn calibrate_data(&self, _handle: u32, volts: f64) -> f64 {
        Self::calibrated_for(volts)
    }

    fn calibration_equation(&self, _handle: u32) -> Result<i8, Error> {
        // linear
        Ok(1)
    }

    fn active_calibration_page(&self, _handle: u32) -> Result<u8, Error> {
        Ok(self.state.borrow().active_page)
    }

    fn calibration_page(&self, _handle: u32, page: u8) -> Result<CalibrationPage, Error> {
        let units = PAGE_UNITS.get(usize::from(page)).ok_or(Error::Sdk {
            operation: "reading a calibration page",
            status: -1,
        })?;
        Ok(CalibrationPage {
            a: -50.0,
            b: 100.0,
            c: 0.0,
            units: (*units).to_owned(),
        })
    }
}
