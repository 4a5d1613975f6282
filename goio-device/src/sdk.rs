pub mod library;

use crate::Error;

pub use library::GoIoLibrary;

// Values from the SDK headers (GoIO_DLL_interface.h, GSkipCommExt.h)
pub const DEFAULT_TIMEOUT_MS: i32 = 1000;
pub const CMD_ID_START_MEASUREMENTS: u8 = 0x18;
pub const MAX_SIZE_DEVICE_NAME: usize = 260;
pub const MAX_SIZE_LONG_NAME: usize = 80;
pub const MAX_SIZE_UNITS: usize = 20;

/// One calibration page from the sensor's DDS memory
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationPage {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub units: String,
}

/// The subset of the GoIO SDK this crate calls into.
///
/// Methods mirror the SDK's C functions one to one, minus the out-parameters:
/// status codes become `Result`s and C string buffers become `String`s. All the
/// heavy lifting (USB transport, calibration math) happens on the other side.
pub trait Sdk {
    /// Opaque per-sensor handle, owned by the SDK between `open` and `close`
    type Handle: Copy;

    fn init(&self) -> Result<(), Error>;
    fn uninit(&self);

    /// Rescans the bus for one vendor/product pair and returns how many were found
    fn update_available_devices(&self, vendor_id: u16, product_id: u16) -> usize;
    fn nth_available_device_name(
        &self,
        vendor_id: u16,
        product_id: u16,
        n: usize,
    ) -> Result<String, Error>;

    /// `None` when the SDK hands back a null handle
    fn open(&self, device_name: &str, vendor_id: u16, product_id: u16) -> Option<Self::Handle>;
    fn close(&self, handle: Self::Handle);

    fn sensor_number(&self, handle: Self::Handle) -> Result<u8, Error>;
    fn long_name(&self, handle: Self::Handle) -> Result<String, Error>;

    fn set_measurement_period(
        &self,
        handle: Self::Handle,
        period_secs: f64,
        timeout_ms: i32,
    ) -> Result<(), Error>;
    fn measurement_period(&self, handle: Self::Handle, timeout_ms: i32) -> f64;
    fn send_command(&self, handle: Self::Handle, command: u8, timeout_ms: i32) -> Result<(), Error>;

    fn latest_raw_measurement(&self, handle: Self::Handle) -> i32;
    fn convert_to_voltage(&self, handle: Self::Handle, raw: i32) -> f64;
    fn calibrate_data(&self, handle: Self::Handle, volts: f64) -> f64;

    fn calibration_equation(&self, handle: Self::Handle) -> Result<i8, Error>;
    fn active_calibration_page(&self, handle: Self::Handle) -> Result<u8, Error>;
    fn calibration_page(&self, handle: Self::Handle, page: u8) -> Result<CalibrationPage, Error>;
}

/// Maps an SDK status code (0 is success) to a `Result`
pub(crate) fn check(operation: &'static str, status: i32) -> Result<(), Error> {
    if status == 0 {
        Ok(())
    } else {
        Err(Error::Sdk { operation, status })
    }
}
