use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::config::CsvWriterConfig;
use crate::error::RecordsError;
use crate::record::{BusinessRecord, BUSINESS_HEADERS};

/// Writes the public business table, header first and without any BOM.
pub struct BusinessWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl BusinessWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P, conf: &CsvWriterConfig) -> Result<Self, RecordsError> {
        let file = File::create(path)?;
        Self::new(file, conf)
    }
}

impl<W: Write> BusinessWriter<W> {
    pub fn new(wtr: W, conf: &CsvWriterConfig) -> Result<Self, RecordsError> {
        if !conf.delimiter.is_ascii() {
            return Err(RecordsError::Delimiter(conf.delimiter));
        }
        let mut inner = csv::WriterBuilder::from(conf).from_writer(wtr);
        inner.write_record(BUSINESS_HEADERS)?;
        Ok(Self { inner })
    }

    pub fn write(&mut self, record: &BusinessRecord) -> Result<(), RecordsError> {
        self.inner.serialize(record)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), RecordsError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, RecordsError> {
        self.inner
            .into_inner()
            .map_err(|e| RecordsError::Io(e.into_error()))
    }
}
