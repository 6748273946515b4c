use std::io::{Read, Write};
use std::path::Path;

use crate::config::RecordsConfig;
use crate::error::RecordsError;
use crate::filter::{RecordFilter, Verdict};
use crate::normalize::normalize_record;
use crate::reader::RecordReader;
use crate::writer::BusinessWriter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordsSummary {
    pub read: usize,
    pub kept: usize,
    pub dropped: usize,
    /// Kept records whose blocklisted website was emptied
    pub cleared: usize,
}

/// Reads, normalizes, filters and writes every record, in input order.
pub fn run_pipeline<R: Read, W: Write>(
    conf: &RecordsConfig,
    input: R,
    output: W,
) -> Result<(RecordsSummary, W), RecordsError> {
    let mut rdr = RecordReader::new(input, conf.input_delimiter, &conf.columns)?;
    let mut wtr = BusinessWriter::new(output, &conf.output)?;
    let summary = process(conf, &mut rdr, &mut wtr)?;
    Ok((summary, wtr.into_inner()?))
}

pub fn run_files<P: AsRef<Path>, Q: AsRef<Path>>(
    conf: &RecordsConfig,
    input: P,
    output: Q,
) -> Result<RecordsSummary, RecordsError> {
    let mut rdr = RecordReader::open(input, conf.input_delimiter, &conf.columns)?;
    let mut wtr = BusinessWriter::create(output, &conf.output)?;
    process(conf, &mut rdr, &mut wtr)
}

fn process<R: Read, W: Write>(
    conf: &RecordsConfig,
    rdr: &mut RecordReader<R>,
    wtr: &mut BusinessWriter<W>,
) -> Result<RecordsSummary, RecordsError> {
    let filter = RecordFilter::new(conf.filter_mode, &conf.blocklist);
    let mut summary = RecordsSummary::default();

    for record in rdr.records() {
        let record = normalize_record(record?, &conf.categories);
        summary.read += 1;
        let verdict = filter.judge(&record);
        match filter.apply(record) {
            Some(record) => {
                if verdict == Verdict::Cleared {
                    summary.cleared += 1;
                }
                summary.kept += 1;
                wtr.write(&record)?;
            }
            None => {
                log::debug!("Dropped record {}", summary.read);
                summary.dropped += 1;
            }
        }
    }

    wtr.flush()?;
    log::info!(
        "Records read: {}, kept: {} ({:?} mode)",
        summary.read,
        summary.kept,
        filter.mode()
    );
    Ok(summary)
}
