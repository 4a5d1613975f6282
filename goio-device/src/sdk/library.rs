use super::{check, CalibrationPage, Sdk, MAX_SIZE_DEVICE_NAME, MAX_SIZE_LONG_NAME, MAX_SIZE_UNITS};
use crate::Error;
use libloading::Library;
use std::ffi::{c_char, c_double, c_float, c_int, c_uchar, c_ushort, c_void, CStr, CString};
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};

/// A sensor handle as returned by `GoIO_Sensor_Open`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorHandle(NonNull<c_void>);

type InitFn = unsafe extern "C" fn() -> c_int;
type DllVersionFn = unsafe extern "C" fn(*mut c_ushort, *mut c_ushort) -> c_int;
type UpdateListFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type NthDeviceNameFn = unsafe extern "C" fn(*mut c_char, c_int, c_int, c_int, c_int) -> c_int;
type OpenFn = unsafe extern "C" fn(*const c_char, c_int, c_int, c_int) -> *mut c_void;
type CloseFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type SensorNumberFn = unsafe extern "C" fn(*mut c_void, *mut c_uchar, c_int, c_int) -> c_int;
type LongNameFn = unsafe extern "C" fn(*mut c_void, *mut c_char, c_ushort) -> c_int;
type SetPeriodFn = unsafe extern "C" fn(*mut c_void, c_double, c_int) -> c_int;
type GetPeriodFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_double;
type SendCmdFn = unsafe extern "C" fn(
    *mut c_void,
    c_uchar,
    *const c_void,
    c_int,
    *mut c_void,
    *mut c_int,
    c_int,
) -> c_int;
type RawMeasurementFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type ToVoltageFn = unsafe extern "C" fn(*mut c_void, c_int) -> c_double;
type CalibrateFn = unsafe extern "C" fn(*mut c_void, c_double) -> c_double;
type EquationFn = unsafe extern "C" fn(*mut c_void, *mut c_char) -> c_int;
type ActivePageFn = unsafe extern "C" fn(*mut c_void, *mut c_uchar) -> c_int;
type CalPageFn = unsafe extern "C" fn(
    *mut c_void,
    c_uchar,
    *mut c_float,
    *mut c_float,
    *mut c_float,
    *mut c_char,
    c_ushort,
) -> c_int;

struct Symbols {
    init: InitFn,
    uninit: InitFn,
    dll_version: DllVersionFn,
    update_list: UpdateListFn,
    nth_device_name: NthDeviceNameFn,
    open: OpenFn,
    close: CloseFn,
    sensor_number: SensorNumberFn,
    long_name: LongNameFn,
    set_period: SetPeriodFn,
    get_period: GetPeriodFn,
    send_cmd: SendCmdFn,
    raw_measurement: RawMeasurementFn,
    to_voltage: ToVoltageFn,
    calibrate: CalibrateFn,
    equation: EquationFn,
    active_page: ActivePageFn,
    cal_page: CalPageFn,
}

/// Looks up one symbol and copies the function pointer out of it.
///
/// # Safety
///
/// `T` must match the C signature of `name`, and the pointer must not outlive `library`.
unsafe fn resolve<T: Copy>(library: &Library, name: &'static str) -> Result<T, Error> {
    library
        .get::<T>(name.as_bytes())
        .map(|symbol| *symbol)
        .map_err(|e| Error::MissingSymbol(name, e))
}

impl Symbols {
    unsafe fn resolve_all(library: &Library) -> Result<Self, Error> {
        Ok(Self {
            init: resolve(library, "GoIO_Init")?,
            uninit: resolve(library, "GoIO_Uninit")?,
            dll_version: resolve(library, "GoIO_GetDLLVersion")?,
            update_list: resolve(library, "GoIO_UpdateListOfAvailableDevices")?,
            nth_device_name: resolve(library, "GoIO_GetNthAvailableDeviceName")?,
            open: resolve(library, "GoIO_Sensor_Open")?,
            close: resolve(library, "GoIO_Sensor_Close")?,
            sensor_number: resolve(library, "GoIO_Sensor_DDSMem_GetSensorNumber")?,
            long_name: resolve(library, "GoIO_Sensor_DDSMem_GetLongName")?,
            set_period: resolve(library, "GoIO_Sensor_SetMeasurementPeriod")?,
            get_period: resolve(library, "GoIO_Sensor_GetMeasurementPeriod")?,
            send_cmd: resolve(library, "GoIO_Sensor_SendCmdAndGetResponse")?,
            raw_measurement: resolve(library, "GoIO_Sensor_GetLatestRawMeasurement")?,
            to_voltage: resolve(library, "GoIO_Sensor_ConvertToVoltage")?,
            calibrate: resolve(library, "GoIO_Sensor_CalibrateData")?,
            equation: resolve(library, "GoIO_Sensor_DDSMem_GetCalibrationEquation")?,
            active_page: resolve(library, "GoIO_Sensor_DDSMem_GetActiveCalPage")?,
            cal_page: resolve(library, "GoIO_Sensor_DDSMem_GetCalPage")?,
        })
    }
}

/// The vendor GoIO SDK (`libGoIO`), opened at runtime rather than linked.
pub struct GoIoLibrary {
    symbols: Symbols,
    // must outlive every pointer in `symbols`
    _library: Library,
}

impl GoIoLibrary {
    pub fn default_path() -> PathBuf {
        if cfg!(windows) {
            PathBuf::from("GoIO_DLL.dll")
        } else {
            PathBuf::from(libloading::library_filename("GoIO"))
        }
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        // SAFETY: the SDK does no work on load, everything starts at GoIO_Init
        let library = unsafe { Library::new(path) }.map_err(|source| Error::LibraryLoad {
            path: path.to_owned(),
            source,
        })?;
        // SAFETY: the signatures above follow GoIO_DLL_interface.h, and `library` is kept
        // alongside the pointers
        let symbols = unsafe { Symbols::resolve_all(&library)? };

        let sdk = Self {
            symbols,
            _library: library,
        };

        let (mut major, mut minor): (c_ushort, c_ushort) = (0, 0);
        // SAFETY: both out-pointers are valid for the duration of the call
        if unsafe { (sdk.symbols.dll_version)(&mut major, &mut minor) } == 0 {
            tracing::debug!("loaded GoIO SDK {major}.{minor:02} from {}", path.display());
        }

        Ok(sdk)
    }
}

pub(crate) fn string_from_buffer(buffer: &[u8]) -> String {
    match CStr::from_bytes_until_nul(buffer) {
        Ok(s) => s.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(buffer).into_owned(),
    }
}

// Buffer sizes are all small constants, so the narrowing casts below can't truncate
impl Sdk for GoIoLibrary {
    type Handle = SensorHandle;

    fn init(&self) -> Result<(), Error> {
        check("initialising the SDK", unsafe { (self.symbols.init)() })
    }

    fn uninit(&self) {
        let status = unsafe { (self.symbols.uninit)() };
        if status != 0 {
            tracing::warn!("GoIO_Uninit returned {status}");
        }
    }

    fn update_available_devices(&self, vendor_id: u16, product_id: u16) -> usize {
        let n = unsafe { (self.symbols.update_list)(vendor_id.into(), product_id.into()) };
        usize::try_from(n).unwrap_or(0)
    }

    fn nth_available_device_name(
        &self,
        vendor_id: u16,
        product_id: u16,
        n: usize,
    ) -> Result<String, Error> {
        let mut buffer = [0u8; MAX_SIZE_DEVICE_NAME];
        let n = c_int::try_from(n).map_err(|_| Error::Sdk {
            operation: "getting a device name",
            status: -1,
        })?;
        let status = unsafe {
            (self.symbols.nth_device_name)(
                buffer.as_mut_ptr().cast(),
                buffer.len() as c_int,
                vendor_id.into(),
                product_id.into(),
                n,
            )
        };
        check("getting a device name", status)?;
        Ok(string_from_buffer(&buffer))
    }

    fn open(&self, device_name: &str, vendor_id: u16, product_id: u16) -> Option<SensorHandle> {
        let device_name = CString::new(device_name).ok()?;
        // strict DDS validation off, same as the SDK samples
        let handle = unsafe {
            (self.symbols.open)(device_name.as_ptr(), vendor_id.into(), product_id.into(), 0)
        };
        NonNull::new(handle).map(SensorHandle)
    }

    fn close(&self, handle: SensorHandle) {
        let status = unsafe { (self.symbols.close)(handle.0.as_ptr()) };
        if status != 0 {
            tracing::warn!("GoIO_Sensor_Close returned {status}");
        }
    }

    fn sensor_number(&self, handle: SensorHandle) -> Result<u8, Error> {
        let mut number: c_uchar = 0;
        // cached value only, no query to the hardware
        let status = unsafe { (self.symbols.sensor_number)(handle.0.as_ptr(), &mut number, 0, 0) };
        check("reading the sensor number", status)?;
        Ok(number)
    }

    fn long_name(&self, handle: SensorHandle) -> Result<String, Error> {
        let mut buffer = [0u8; MAX_SIZE_LONG_NAME];
        let status = unsafe {
            (self.symbols.long_name)(
                handle.0.as_ptr(),
                buffer.as_mut_ptr().cast(),
                buffer.len() as c_ushort,
            )
        };
        check("reading the sensor name", status)?;
        Ok(string_from_buffer(&buffer))
    }

    fn set_measurement_period(
        &self,
        handle: SensorHandle,
        period_secs: f64,
        timeout_ms: i32,
    ) -> Result<(), Error> {
        let status =
            unsafe { (self.symbols.set_period)(handle.0.as_ptr(), period_secs, timeout_ms) };
        check("setting the measurement period", status)
    }

    fn measurement_period(&self, handle: SensorHandle, timeout_ms: i32) -> f64 {
        unsafe { (self.symbols.get_period)(handle.0.as_ptr(), timeout_ms) }
    }

    fn send_command(
        &self,
        handle: SensorHandle,
        command: u8,
        timeout_ms: i32,
    ) -> Result<(), Error> {
        let status = unsafe {
            (self.symbols.send_cmd)(
                handle.0.as_ptr(),
                command,
                ptr::null(),
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                timeout_ms,
            )
        };
        check("sending a command", status)
    }

    fn latest_raw_measurement(&self, handle: SensorHandle) -> i32 {
        unsafe { (self.symbols.raw_measurement)(handle.0.as_ptr()) }
    }

    fn convert_to_voltage(&self, handle: SensorHandle, raw: i32) -> f64 {
        unsafe { (self.symbols.to_voltage)(handle.0.as_ptr(), raw) }
    }

    fn calibrate_data(&self, handle: SensorHandle, volts: f64) -> f64 {
        unsafe { (self.symbols.calibrate)(handle.0.as_ptr(), volts) }
    }

    fn calibration_equation(&self, handle: SensorHandle) -> Result<i8, Error> {
        let mut equation: c_char = 0;
        let status = unsafe { (self.symbols.equation)(handle.0.as_ptr(), &mut equation) };
        check("reading the calibration equation", status)?;
        Ok(equation as i8)
    }

    fn active_calibration_page(&self, handle: SensorHandle) -> Result<u8, Error> {
        let mut page: c_uchar = 0;
        let status = unsafe { (self.symbols.active_page)(handle.0.as_ptr(), &mut page) };
        check("reading the active calibration page", status)?;
        Ok(page)
    }

    fn calibration_page(&self, handle: SensorHandle, page: u8) -> Result<CalibrationPage, Error> {
        let (mut a, mut b, mut c): (c_float, c_float, c_float) = (0.0, 0.0, 0.0);
        let mut units = [0u8; MAX_SIZE_UNITS];
        let status = unsafe {
            (self.symbols.cal_page)(
                handle.0.as_ptr(),
                page,
                &mut a,
                &mut b,
                &mut c,
                units.as_mut_ptr().cast(),
                units.len() as c_ushort,
            )
        };
        check("reading a calibration page", status)?;
        Ok(CalibrationPage {
            a,
            b,
            c,
            units: string_from_buffer(&units),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_cut_at_the_first_nul() {
        assert_eq!(string_from_buffer(b"deg C\0\0garbage"), "deg C");
        assert_eq!(string_from_buffer(b"\0V"), "");
    }

    #[test]
    fn unterminated_buffers_are_taken_whole() {
        assert_eq!(string_from_buffer(b"m/s"), "m/s");
    }

    #[test]
    fn loading_a_missing_library_names_the_path() {
        let path = Path::new("/nonexistent/libGoIO-missing.so");
        let err = GoIoLibrary::load(path).err().expect("load must fail");
        assert!(matches!(err, Error::LibraryLoad { .. }));
        assert!(err.to_string().contains("/nonexistent/libGoIO-missing.so"));
    }

    #[test]
    fn default_path_names_the_goio_library() {
        let path = GoIoLibrary::default_path();
        assert!(path.to_string_lossy().contains("GoIO"));
    }
}
