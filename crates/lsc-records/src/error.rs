use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("cannot open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("unreadable input at line {line}: {source}")]
    Read { line: u64, source: csv::Error },

    #[error("invalid delimiter {0:?}, expected a single byte character")]
    Delimiter(char),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
