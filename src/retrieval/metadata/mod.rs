
use serde::{Deserialize, Serialize};

use super::error::{Result, RetrievalError};

/// Description of one database column, paired positionally with one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Natural-language description that was embedded
    pub doc: String,
    /// Source table
    #[serde(alias = "TABLE_NAME", alias = "table")]
    pub table_name: String,
    /// Source column
    #[serde(alias = "COLUMN_NAME", alias = "column")]
    pub column_name: String,
}

impl MetadataRecord {
    #[inline]
    pub fn new(
        doc: impl Into<String>,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Self {
        Self {
            doc: doc.into(),
            table_name: table_name.into(),
            column_name: column_name.into(),
        }
    }
}

/// Ordered, read-only rows. Row `i` describes vector `i` of the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataTable {
    rows: Vec<MetadataRecord>,
}

impl MetadataTable {
    #[inline]
    pub fn new(rows: Vec<MetadataRecord>) -> Self {
        Self { rows }
    }

    /// Reassemble a table from parallel columns; all three must be the same length.
    #[inline]
    pub fn from_columns(
        docs: Vec<String>,
        tables: Vec<String>,
        columns: Vec<String>,
    ) -> Result<Self, String> {
        if docs.len() != tables.len() || docs.len() != columns.len() {
            return Err(format!(
                "metadata columns differ in length: doc={}, table={}, column={}",
                docs.len(),
                tables.len(),
                columns.len()
            ));
        }

        let rows = docs
            .into_iter()
            .zip(tables)
            .zip(columns)
            .map(|((doc, table_name), column_name)| MetadataRecord {
                doc,
                table_name,
                column_name,
            })
            .collect();
        Ok(Self { rows })
    }

    #[inline]
    pub fn row(&self, position: usize) -> Result<&MetadataRecord> {
        self.rows.get(position).ok_or(RetrievalError::OutOfRange {
            position,
            len: self.rows.len(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, MetadataRecord> {
        self.rows.iter()
    }

    #[inline]
    pub fn docs(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.doc.as_str())
    }

    #[inline]
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.table_name.as_str())
    }

    #[inline]
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.column_name.as_str())
    }
}

impl<'a> IntoIterator for &'a MetadataTable {
    type Item = &'a MetadataRecord;
    type IntoIter = std::slice::Iter<'a, MetadataRecord>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<MetadataRecord> for MetadataTable {
    #[inline]
    fn from_iter<I: IntoIterator<Item = MetadataRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
