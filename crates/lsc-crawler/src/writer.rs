use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use lsc_extract::OutboundLink;

use crate::sitemap::SitemapEntry;

/// Spreadsheet applications need the BOM to detect UTF-8
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const CRAWL_HEADERS: [&str; 7] = [
    "url",
    "lastmod",
    "type",
    "derivedName",
    "outboundLabel",
    "outboundUrl",
    "outboundSource",
];

/// One row of the crawl table, built once per sitemap entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub url: String,
    pub lastmod: String,
    pub kind: String,
    pub derived_name: String,
    pub outbound: OutboundLink,
}

impl OutputRow {
    pub fn new(entry: &SitemapEntry, kind: String, derived_name: String, outbound: OutboundLink) -> Self {
        Self {
            url: entry.location.clone(),
            lastmod: entry.last_modified.clone().unwrap_or_default(),
            kind,
            derived_name,
            outbound,
        }
    }

    fn fields(&self) -> [&str; 7] {
        [
            &self.url,
            &self.lastmod,
            &self.kind,
            &self.derived_name,
            &self.outbound.label,
            &self.outbound.url,
            self.outbound.source.as_str(),
        ]
    }
}

pub struct CrawlWriter<W: Write> {
    wtr: csv::Writer<W>,
}

impl CrawlWriter<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> csv::Result<Self> {
        Self::new(File::create(path)?)
    }
}

impl<W: Write> CrawlWriter<W> {
    /// Writes the BOM and the header line.
    pub fn new(mut inner: W) -> csv::Result<Self> {
        inner.write_all(UTF8_BOM)?;
        let mut wtr = csv::WriterBuilder::new().delimiter(b',').from_writer(inner);
        wtr.write_record(CRAWL_HEADERS)?;
        Ok(Self { wtr })
    }

    pub fn write_row(&mut self, row: &OutputRow) -> csv::Result<()> {
        self.wtr.write_record(row.fields())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.wtr.into_inner().map_err(|e| e.into_error())
    }
}
