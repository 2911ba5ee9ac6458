//! Forward-only cursor over a table file.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{PipelineError, PipelineResult};
use crate::row::UserRow;
use crate::source::table::{MAX_RECORD_LEN, TABLE_MAGIC};
use crate::source::RowCursor;

/// Cursor over the records of one table file.
///
/// Holds the file handle open for the whole pass and releases it on
/// [`close`](RowCursor::close) or drop. Reads one record at a time; memory
/// use is one record regardless of table size.
pub struct TableCursor {
    path: PathBuf,
    reader: Option<BufReader<File>>,
}

impl TableCursor {
    /// Open a cursor positioned at the first record.
    pub fn open(path: &Path) -> PipelineResult<Self> {
        let file = File::open(path).map_err(|e| PipelineError::Connection {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; TABLE_MAGIC.len()];
        reader
            .read_exact(&mut magic)
            .map_err(|e| PipelineError::Connection {
                path: path.to_path_buf(),
                reason: format!("cannot read table header: {}", e),
            })?;
        if magic != *TABLE_MAGIC {
            return Err(PipelineError::Connection {
                path: path.to_path_buf(),
                reason: "not a rowpipe table file".to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader: Some(reader),
        })
    }

    /// Read the length prefix of the next record, or `None` at end of table.
    fn next_record_len(reader: &mut BufReader<File>) -> PipelineResult<Option<usize>> {
        if reader.fill_buf()?.is_empty() {
            return Ok(None);
        }
        let len = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| PipelineError::Data("truncated record length".to_string()))?
            as usize;
        if len > MAX_RECORD_LEN {
            return Err(PipelineError::Data(format!(
                "record length {} exceeds maximum {}",
                len, MAX_RECORD_LEN
            )));
        }
        Ok(Some(len))
    }

    /// Skip the next record without decoding it. Returns `false` at end of
    /// table. Used by page fetches to honor an offset cheaply.
    pub(crate) fn skip_row(&mut self) -> PipelineResult<bool> {
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return Ok(false),
        };
        match Self::next_record_len(reader)? {
            Some(len) => {
                reader.seek_relative(len as i64)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl RowCursor for TableCursor {
    fn next_row(&mut self) -> PipelineResult<Option<UserRow>> {
        let reader = match self.reader.as_mut() {
            Some(r) => r,
            None => return Ok(None),
        };
        let len = match Self::next_record_len(reader)? {
            Some(len) => len,
            None => return Ok(None),
        };

        let mut buf = vec![0u8; len];
        reader
            .read_exact(&mut buf)
            .map_err(|_| PipelineError::Data("truncated record body".to_string()))?;
        let row: UserRow = bincode::deserialize(&buf)
            .map_err(|e| PipelineError::Data(format!("cannot decode record: {}", e)))?;
        Ok(Some(row))
    }

    fn close(&mut self) -> PipelineResult<()> {
        if self.reader.take().is_some() {
            log::debug!("closed cursor on {:?}", self.path);
        }
        Ok(())
    }
}

impl Drop for TableCursor {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let result = TableCursor::open(&dir.path().join("missing.tbl"));
        assert!(matches!(
            result,
            Err(PipelineError::Connection { .. })
        ));
    }

    #[test]
    fn test_open_bad_magic() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.tbl");
        std::fs::write(&path, b"definitely not a table")?;

        let result = TableCursor::open(&path);
        assert!(matches!(result, Err(PipelineError::Connection { .. })));
        Ok(())
    }

    #[test]
    fn test_truncated_record_is_data_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("trunc.tbl");
        let mut file = std::fs::File::create(&path)?;
        file.write_all(TABLE_MAGIC)?;
        // Length prefix promises 100 bytes, body delivers 3.
        file.write_all(&100u32.to_le_bytes())?;
        file.write_all(&[1, 2, 3])?;
        drop(file);

        let mut cursor = TableCursor::open(&path)?;
        let result = cursor.next_row();
        assert!(matches!(result, Err(PipelineError::Data(_))));
        Ok(())
    }

    #[test]
    fn test_close_is_idempotent() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.tbl");
        std::fs::write(&path, TABLE_MAGIC)?;

        let mut cursor = TableCursor::open(&path)?;
        cursor.close()?;
        cursor.close()?;
        assert!(cursor.next_row()?.is_none());
        Ok(())
    }
}
