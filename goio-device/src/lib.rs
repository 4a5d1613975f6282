//! Vernier GoIO sensor interfaces, driven through the vendor's GoIO SDK.
//!
//! The SDK owns all USB communication and calibration math; this crate finds a
//! known interface, ties the SDK's init/open/close calls to Rust lifetimes, and
//! turns samples into [`Reading`]s.

mod products;
pub mod sdk;
mod sensor;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::products::{device_description, Product, VERNIER_VENDOR_ID};
pub use crate::sdk::{CalibrationPage, GoIoLibrary, Sdk};
pub use crate::sensor::{Reading, Sensor, SensorInfo};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to load the GoIO SDK from \"{}\"", .path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("The GoIO SDK library has no {0} symbol")]
    MissingSymbol(&'static str, #[source] libloading::Error),
    #[error("GoIO SDK error while {operation} (status {status})")]
    Sdk {
        operation: &'static str,
        status: i32,
    },
    #[error("Failed to open GoIO device {0}")]
    OpenFailed(String),
    #[error("Unsupported GoIO product ID {0:#06x}")]
    UnknownProduct(u16),
}

/// Where an attached interface can be opened from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLocator {
    /// Device path as reported by the SDK
    pub name: String,
    pub product: Product,
}

/// Keeps the SDK initialised for as long as it lives.
pub struct Session<'a, S: Sdk> {
    sdk: &'a S,
}

impl<'a, S: Sdk> Session<'a, S> {
    pub fn init(sdk: &'a S) -> Result<Self, Error> {
        sdk.init()?;
        Ok(Self { sdk })
    }

    /// Finds the first attached interface, going through the known products in
    /// [`Product::DISCOVERY_ORDER`].
    pub fn find_device(&self) -> Result<Option<DeviceLocator>, Error> {
        // every product gets rescanned, not just up to the first hit
        let counts = Product::DISCOVERY_ORDER
            .map(|p| (p, self.sdk.update_available_devices(VERNIER_VENDOR_ID, p.id())));

        for (product, n) in &counts {
            tracing::trace!("{n} {} device(s) attached", product.description());
        }

        let Some(&(product, n)) = counts.iter().find(|(_, n)| *n > 0) else {
            return Ok(None);
        };

        let name = self
            .sdk
            .nth_available_device_name(VERNIER_VENDOR_ID, product.id(), 0)?;

        let total: usize = counts.iter().map(|(_, n)| n).sum();
        if total > 1 {
            tracing::info!(
                "More than one GoIO device detected ({total}), using {} at {name}",
                product.description()
            );
        } else if n > 1 {
            tracing::debug!("{n} {} devices attached", product.description());
        }

        Ok(Some(DeviceLocator { name, product }))
    }

    pub fn open(&self, locator: &DeviceLocator) -> Result<Sensor<'_, S>, Error> {
        let handle = self
            .sdk
            .open(&locator.name, VERNIER_VENDOR_ID, locator.product.id())
            .ok_or_else(|| Error::OpenFailed(locator.name.clone()))?;

        Ok(Sensor::new(self.sdk, handle, locator.clone()))
    }
}

impl<S: Sdk> Drop for Session<'_, S> {
    fn drop(&mut self) {
        self.sdk.uninit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockSdk};

    #[test]
    fn finds_nothing_when_no_device_is_attached() {
        let sdk = MockSdk::with_devices(&[]);
        let session = Session::init(&sdk).unwrap();
        assert_eq!(session.find_device().unwrap(), None);
    }

    #[test]
    fn every_product_is_rescanned_before_choosing() {
        let sdk = MockSdk::with_devices(&[Product::GoLink]);
        let session = Session::init(&sdk).unwrap();
        session.find_device().unwrap();

        let scanned = sdk
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpdateAvailableDevices(id) => Some(id),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(scanned, vec![0x0003, 0x0002, 0x0004, 0x0007]);
    }

    #[test]
    fn go_link_wins_over_other_products() {
        let sdk = MockSdk::with_devices(&[Product::MiniGc, Product::GoTemp, Product::GoLink]);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        assert_eq!(locator.product, Product::GoLink);
        assert_eq!(locator.name, MockSdk::device_name(Product::GoLink));
    }

    #[test]
    fn go_temp_wins_over_motion_and_mini_gc() {
        let sdk = MockSdk::with_devices(&[Product::MiniGc, Product::GoMotion, Product::GoTemp]);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        assert_eq!(locator.product, Product::GoTemp);
    }

    #[test]
    fn mini_gc_is_found_last() {
        let sdk = MockSdk::with_devices(&[Product::MiniGc]);
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        assert_eq!(locator.product, Product::MiniGc);
    }

    #[test]
    fn failed_init_is_an_error_and_skips_uninit() {
        let sdk = MockSdk::with_devices(&[]);
        sdk.fail_init();
        assert!(matches!(
            Session::init(&sdk),
            Err(Error::Sdk { status: -1, .. })
        ));
        assert!(!sdk.calls().contains(&Call::Uninit));
    }

    #[test]
    fn null_handle_is_an_open_failure() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        sdk.fail_open();
        let session = Session::init(&sdk).unwrap();
        let locator = session.find_device().unwrap().unwrap();
        assert!(matches!(session.open(&locator), Err(Error::OpenFailed(_))));
    }

    #[test]
    fn sensor_closes_before_the_sdk_uninitialises() {
        let sdk = MockSdk::with_devices(&[Product::GoTemp]);
        {
            let session = Session::init(&sdk).unwrap();
            let locator = session.find_device().unwrap().unwrap();
            let _sensor = session.open(&locator).unwrap();
        }

        let calls = sdk.calls();
        let close = calls.iter().position(|c| *c == Call::Close).unwrap();
        let uninit = calls.iter().position(|c| *c == Call::Uninit).unwrap();
        assert!(close < uninit);
        assert_eq!(calls.last(), Some(&Call::Uninit));
    }
}
