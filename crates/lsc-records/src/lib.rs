mod config;
mod error;
mod filter;
mod normalize;
mod pipeline;
mod reader;
mod record;
mod writer;

pub use config::{ColumnAliases, CsvTerminator, CsvWriterConfig, RecordsConfig};
pub use error::RecordsError;
pub use filter::{default_blocklist, FilterMode, RecordFilter, Verdict};
pub use normalize::{clean_url, normalize_record, CategoryMapping, CategoryRule};
pub use pipeline::{run_files, run_pipeline, RecordsSummary};
pub use reader::{ColumnMap, RecordReader};
pub use record::{BusinessRecord, BUSINESS_HEADERS};
pub use writer::BusinessWriter;
