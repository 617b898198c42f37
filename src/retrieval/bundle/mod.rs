//! On-disk bundle holding a [`FlatIndex`] and its [`MetadataTable`] as one unit.
//!
//! Layout (little-endian):
//!
//! ```text
//! magic      4 bytes   "MDRB"
//! version    u16
//! metric     u8        0 = squared_euclidean, 1 = cosine
//! reserved   u8
//! dimension  u32
//! count      u64
//! vectors    count * dimension f32, row-major
//! meta_len   u64
//! metadata   JSON {"doc": [..], "table": [..], "column": [..]}
//! checksum   u64       xxh3-64 of every preceding byte
//! ```


use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use xxhash_rust::xxh3::xxh3_64;

use super::distance::DistanceMetric;
use super::error::{Result, RetrievalError};
use super::index::FlatIndex;
use super::metadata::MetadataTable;

const MAGIC: [u8; 4] = *b"MDRB";
pub const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 20;
const CHECKSUM_LEN: usize = 8;

/// Header fields of a bundle, readable without decoding the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleInfo {
    pub version: u16,
    pub metric: DistanceMetric,
    pub dimension: usize,
    pub count: usize,
}

#[derive(Serialize)]
struct ColumnsRef<'a> {
    doc: Vec<&'a str>,
    table: Vec<&'a str>,
    column: Vec<&'a str>,
}

#[derive(Deserialize)]
struct Columns {
    doc: Vec<String>,
    table: Vec<String>,
    column: Vec<String>,
}

/// Write `index` and `table` to `destination` as a single bundle.
///
/// The bytes go to a temporary file next to the destination which is then
/// renamed over it, so readers see either the previous bundle or the new one.
#[inline]
pub fn save(index: &FlatIndex, table: &MetadataTable, destination: &Path) -> Result<()> {
    if index.len() != table.len() {
        return Err(RetrievalError::Alignment {
            vectors: index.len(),
            rows: table.len(),
        });
    }

    let columns = ColumnsRef {
        doc: table.docs().collect(),
        table: table.tables().collect(),
        column: table.columns().collect(),
    };
    let bytes = encode_parts(index.metric(), index.dimension(), index.as_slice(), &columns)?;

    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;
    file.persist(destination).map_err(|e| e.error)?;

    info!(
        "Saved bundle with {} vectors ({} bytes) to {}",
        index.len(),
        bytes.len(),
        destination.display()
    );
    Ok(())
}

/// Read a bundle back into an index and its metadata table.
#[inline]
pub fn load(source: &Path) -> Result<(FlatIndex, MetadataTable)> {
    let bytes = match fs::read(source) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RetrievalError::BundleNotFound {
                path: source.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let (index, table) = decode(&bytes).map_err(|reason| RetrievalError::corrupt(source, reason))?;
    info!(
        "Loaded bundle with {} vectors ({} dimensions) from {}",
        index.len(),
        index.dimension(),
        source.display()
    );
    Ok((index, table))
}

/// Read and validate only the header of a bundle.
#[inline]
pub fn inspect(source: &Path) -> Result<BundleInfo> {
    let mut file = match File::open(source) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RetrievalError::BundleNotFound {
                path: source.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mut header = [0u8; HEADER_LEN];
    match file.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(RetrievalError::corrupt(source, "file is shorter than the header"));
        }
        Err(e) => return Err(e.into()),
    }

    parse_header(&mut Reader::new(&header)).map_err(|reason| RetrievalError::corrupt(source, reason))
}

fn encode_parts(
    metric: DistanceMetric,
    dimension: usize,
    vectors: &[f32],
    columns: &ColumnsRef<'_>,
) -> Result<Vec<u8>> {
    let dimension_field = u32::try_from(dimension).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("dimension {} exceeds the bundle format limit", dimension),
        )
    })?;
    let count = if dimension == 0 { 0 } else { vectors.len() / dimension };
    let metadata = serde_json::to_vec(columns).map_err(io::Error::from)?;

    let mut buf = Vec::with_capacity(
        HEADER_LEN + vectors.len() * 4 + 8 + metadata.len() + CHECKSUM_LEN,
    );
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.push(metric.code());
    buf.push(0);
    buf.extend_from_slice(&dimension_field.to_le_bytes());
    buf.extend_from_slice(&(count as u64).to_le_bytes());
    for value in vectors {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf.extend_from_slice(&(metadata.len() as u64).to_le_bytes());
    buf.extend_from_slice(&metadata);

    let checksum = xxh3_64(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());

    debug!("Encoded bundle: {} vectors, {} bytes", count, buf.len());
    Ok(buf)
}

fn decode(bytes: &[u8]) -> Result<(FlatIndex, MetadataTable), String> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(format!("file is too short ({} bytes)", bytes.len()));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let mut reader = Reader::new(body);
    let info = parse_header(&mut reader)?;

    let mut stored = [0u8; CHECKSUM_LEN];
    stored.copy_from_slice(trailer);
    let stored = u64::from_le_bytes(stored);
    let computed = xxh3_64(body);
    if stored != computed {
        return Err(format!(
            "checksum mismatch: stored {:016x}, computed {:016x}",
            stored, computed
        ));
    }

    let floats = info
        .count
        .checked_mul(info.dimension)
        .ok_or("vector block size overflows")?;
    let block = reader.take(floats.checked_mul(4).ok_or("vector block size overflows")?)?;
    let data: Vec<f32> = block
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    if let Some(offset) = data.iter().position(|x| !x.is_finite()) {
        return Err(format!(
            "non-finite component in vector {}",
            offset / info.dimension
        ));
    }

    let meta_len = usize::try_from(reader.u64()?).map_err(|_| "metadata length overflows")?;
    let metadata = reader.take(meta_len)?;
    if reader.remaining() != 0 {
        return Err(format!("{} unexpected trailing bytes", reader.remaining()));
    }

    let columns: Columns =
        serde_json::from_slice(metadata).map_err(|e| format!("invalid metadata block: {}", e))?;
    let table = MetadataTable::from_columns(columns.doc, columns.table, columns.column)?;

    if table.len() != info.count {
        return Err(format!(
            "vector count {} does not match metadata row count {}",
            info.count,
            table.len()
        ));
    }

    let index = FlatIndex::from_raw(info.dimension, info.metric, data);
    Ok((index, table))
}

fn parse_header(reader: &mut Reader<'_>) -> Result<BundleInfo, String> {
    if reader.take(MAGIC.len())? != MAGIC {
        return Err("not a metadata bundle (bad magic)".to_string());
    }

    let version = reader.u16()?;
    if version != FORMAT_VERSION {
        return Err(format!(
            "unsupported format version {} (expected {})",
            version, FORMAT_VERSION
        ));
    }

    let code = reader.u8()?;
    let metric =
        DistanceMetric::from_code(code).ok_or_else(|| format!("unknown metric code {}", code))?;
    let _reserved = reader.u8()?;

    let dimension = reader.u32()? as usize;
    if dimension == 0 {
        return Err("dimension is zero".to_string());
    }
    let count = usize::try_from(reader.u64()?).map_err(|_| "vector count overflows")?;

    Ok(BundleInfo {
        version,
        metric,
        dimension,
        count,
    })
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], String> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| format!("truncated: needed {} bytes at offset {}", n, self.pos))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn u8(&mut self) -> Result<u8, String> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, String> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, String> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, String> {
        let mut out = [0u8; 8];
        out.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(out))
    }
}
