use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::config::ColumnAliases;
use crate::error::RecordsError;
use crate::record::BusinessRecord;

/// Column positions of each business field in the input header, `None` when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub place: Option<usize>,
    pub website: Option<usize>,
    pub category: Option<usize>,
}

impl ColumnMap {
    pub fn resolve(headers: &StringRecord, aliases: &ColumnAliases) -> Self {
        let headers = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect::<Vec<_>>();
        let find = |names: &[String]| {
            names
                .iter()
                .find_map(|n| headers.iter().position(|h| *h == n.to_lowercase()))
        };
        Self {
            name: find(&aliases.name),
            place: find(&aliases.place),
            website: find(&aliases.website),
            category: find(&aliases.category),
        }
    }

    fn missing(&self) -> Vec<&'static str> {
        [
            ("name", self.name),
            ("place", self.place),
            ("website", self.website),
            ("category", self.category),
        ]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn project(&self, row: &StringRecord) -> BusinessRecord {
        let get = |idx: Option<usize>| {
            idx.and_then(|i| row.get(i))
                .unwrap_or_default()
                .to_string()
        };
        BusinessRecord {
            name: get(self.name),
            place: get(self.place),
            website: get(self.website),
            category: get(self.category),
        }
    }
}

pub struct RecordReader<R> {
    inner: csv::Reader<R>,
    columns: ColumnMap,
}

impl RecordReader<File> {
    pub fn open<P: AsRef<Path>>(
        path: P,
        delimiter: char,
        aliases: &ColumnAliases,
    ) -> Result<Self, RecordsError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RecordsError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(file, delimiter, aliases)
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(rdr: R, delimiter: char, aliases: &ColumnAliases) -> Result<Self, RecordsError> {
        if !delimiter.is_ascii() {
            return Err(RecordsError::Delimiter(delimiter));
        }
        let mut inner = csv::ReaderBuilder::new()
            .delimiter(delimiter as u8)
            .flexible(true)
            .from_reader(rdr);
        let columns = ColumnMap::resolve(inner.headers()?, aliases);
        let missing = columns.missing();
        if !missing.is_empty() {
            log::warn!("Input has no column for {}, read as empty", missing.join(", "));
        }
        Ok(Self { inner, columns })
    }

    pub fn columns(&self) -> ColumnMap {
        self.columns
    }

    pub fn records(&mut self) -> impl Iterator<Item = Result<BusinessRecord, RecordsError>> + '_ {
        let columns = self.columns;
        self.inner.records().map(move |row| {
            row.map(|row| columns.project(&row)).map_err(|source| {
                let line = source.position().map(|p| p.line()).unwrap_or_default();
                RecordsError::Read { line, source }
            })
        })
    }
}
