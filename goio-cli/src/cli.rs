use crate::acquisition::Plan;
use std::path::PathBuf;
use std::time::Duration;

// 40ms is the fastest a GoIO interface can sample
pub const MIN_DWELL_MS: u64 = 40;
pub const MAX_DWELL_MS: u64 = 10_000;
pub const MAX_SAMPLES: i64 = 1_000_000;

#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity, may be repeated (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only test whether a GoIO device is present, don't take any samples
    #[arg(short = 't', long = "test")]
    pub probe: bool,

    /// Dwell time between measurements, in ms
    #[arg(
        short,
        long,
        default_value_t = MIN_DWELL_MS,
        value_parser = clap::value_parser!(u64).range(MIN_DWELL_MS..=MAX_DWELL_MS)
    )]
    pub dwell: u64,

    /// Number of samples to take
    #[arg(
        short = 'n',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(0..=MAX_SAMPLES)
    )]
    pub samples: u32,

    /// Output file, created or emptied before anything else happens. Defaults to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to the GoIO SDK shared library, if it isn't on the loader's search path
    #[arg(long, env = "GOIO_SDK_LIBRARY")]
    pub sdk_library: Option<PathBuf>,
}

impl Cli {
    /// Probing always reports the device it finds, so it implies at least -v
    pub fn verbosity(&self) -> u8 {
        if self.probe {
            self.verbose.max(1)
        } else {
            self.verbose
        }
    }

    pub fn plan(&self) -> Plan {
        Plan {
            dwell: Duration::from_millis(self.dwell),
            samples: self.samples,
            probe_only: self.probe,
        }
    }
}
