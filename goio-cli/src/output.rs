use anyhow::Context;
use goio_device::Reading;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Opens the data sink: stdout, or `path` created/truncated right away
pub fn open(path: Option<&Path>) -> anyhow::Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(io::stdout()));
    };

    let file = File::create(path)
        .with_context(|| format!("Unable to create file \"{}\"", path.display()))?;
    tracing::debug!("file {} created/emptied", path.display());

    Ok(Box::new(LineWriter::new(file)))
}

/// Writes one `<timestamp> <value> <units>` line per reading
pub struct SampleWriter<W> {
    inner: W,
}

impl<W: Write> SampleWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write(&mut self, timestamp: Duration, reading: &Reading) -> io::Result<()> {
        writeln!(
            self.inner,
            "\t{:8.3}\t{:8.3} {}",
            timestamp.as_secs_f64(),
            reading.value,
            reading.page.units
        )?;
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
