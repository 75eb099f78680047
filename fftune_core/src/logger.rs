//! CSV sample tables, one file per finished test phase.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fftune_traits::{BoxError, LogSink, Sample};

/// Header shared with `fftune_config::load_samples_csv`.
pub const CSV_HEADER: [&str; 3] = ["time", "position", "power"];

/// Write `samples` as a `time,position,power` table.
pub fn write_samples_csv<W: Write>(out: W, samples: &[Sample]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(CSV_HEADER)?;
    for s in samples {
        wtr.write_record([
            s.elapsed_time.to_string(),
            s.position.to_string(),
            s.applied_power.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Log sink writing each table to `<dir>/<filename>`, creating `dir` on demand.
#[derive(Debug, Clone)]
pub struct CsvLogSink {
    dir: PathBuf,
}

impl CsvLogSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LogSink for CsvLogSink {
    fn write(&mut self, samples: &[Sample], filename: &str) -> Result<(), BoxError> {
        if filename.contains(['/', '\\']) {
            return Err(Box::new(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("log filename must not contain a path separator: {filename}"),
            )));
        }
        fs::create_dir_all(&self.dir)?;
        let file = File::create(self.dir.join(filename))?;
        write_samples_csv(io::BufWriter::new(file), samples)?;
        Ok(())
    }
}
