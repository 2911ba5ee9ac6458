//! File-backed `user_data` table.
//!
//! The table is a single append-only file: an 8-byte magic header followed by
//! records, each a little-endian `u32` length prefix and a bincode-encoded
//! [`UserRow`]. Appends go through a key index that skips rows whose
//! `user_id` or `email` is already present, so bulk loads are idempotent.
//!
//! The key index lives only for the duration of one load; readers stream the
//! file record by record and never build it.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, WriteBytesExt};
use rand::Rng;

use crate::error::{PipelineError, PipelineResult};
use crate::row::UserRow;
use crate::source::cursor::TableCursor;
use crate::source::{RowCursor, RowSource, SourceConfig};

/// Magic bytes at the start of every table file.
pub(crate) const TABLE_MAGIC: &[u8; 8] = b"rowpipe1";

/// Upper bound on one encoded record. Anything larger is a corrupt file.
pub(crate) const MAX_RECORD_LEN: usize = 1 << 20;

/// Counts reported by a bulk load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows appended to the table.
    pub inserted: usize,
    /// Rows skipped because their `user_id` or `email` already exists.
    pub duplicates: usize,
    /// Rows skipped because they were malformed (missing or non-numeric age).
    pub invalid: usize,
}

/// Handle to one `user_data` table file.
pub struct UserTable {
    path: PathBuf,
}

impl UserTable {
    /// Open the table, creating an empty one if it does not exist yet.
    /// Creating is idempotent; an existing table is left untouched.
    pub fn create(config: &SourceConfig) -> PipelineResult<Self> {
        let path = config.table_path();
        std::fs::create_dir_all(config.data_dir())?;
        if !path.exists() {
            let mut file = File::create(&path)?;
            file.write_all(TABLE_MAGIC)?;
            file.sync_all()?;
            log::info!("created table {:?}", path);
        } else {
            // Validate the header of the existing file.
            TableCursor::open(&path)?;
        }
        Ok(Self { path })
    }

    /// Open an existing table. Fails with a connection error if the file is
    /// missing or not a table file.
    pub fn open(config: &SourceConfig) -> PipelineResult<Self> {
        let path = config.table_path();
        TableCursor::open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append rows, skipping duplicates. Rows with an empty `user_id` get a
    /// generated one.
    pub fn insert_many<I>(&self, rows: I) -> PipelineResult<LoadReport>
    where
        I: IntoIterator<Item = UserRow>,
    {
        let mut appender = Appender::open(&self.path)?;
        let mut report = LoadReport::default();
        let mut rng = rand::thread_rng();

        for mut row in rows {
            if row.user_id.is_empty() {
                row.user_id = generate_user_id(&mut rng);
            }
            if appender.append_unique(&row)? {
                report.inserted += 1;
            } else {
                report.duplicates += 1;
            }
        }

        appender.finish()?;
        Ok(report)
    }

    /// Bulk load rows from a CSV file.
    ///
    /// The first line is a header naming at least `name`, `email` and `age`;
    /// a `user_id` column is optional and generated when absent. Rows with a
    /// missing or non-numeric age are skipped with a diagnostic, and rows
    /// whose `user_id` or `email` already exists are skipped silently, so
    /// loading the same file twice inserts nothing the second time.
    pub fn load_csv(&self, csv_path: &Path) -> PipelineResult<LoadReport> {
        let file = File::open(csv_path).map_err(|e| {
            PipelineError::InvalidArgument(format!("cannot read CSV {:?}: {}", csv_path, e))
        })?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => CsvHeader::parse(&line?)?,
            None => return Ok(LoadReport::default()),
        };

        let mut appender = Appender::open(&self.path)?;
        let mut report = LoadReport::default();
        let mut rng = rand::thread_rng();

        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = parse_csv_line(&line);

            let age_raw = header.field(&fields, header.age).trim().to_string();
            let age = match parse_age(&age_raw) {
                Some(age) => age,
                None => {
                    log::warn!("skipping CSV row with bad age {:?}: {}", age_raw, line);
                    report.invalid += 1;
                    continue;
                }
            };

            let user_id = match header.user_id {
                Some(idx) if !header.field(&fields, idx).trim().is_empty() => {
                    header.field(&fields, idx).trim().to_string()
                }
                _ => generate_user_id(&mut rng),
            };
            let row = UserRow::new(
                user_id,
                header.field(&fields, header.name).trim(),
                header.field(&fields, header.email).trim(),
                age,
            );

            if appender.append_unique(&row)? {
                report.inserted += 1;
            } else {
                report.duplicates += 1;
            }
        }

        appender.finish()?;
        log::info!(
            "loaded {:?}: {} inserted, {} duplicates, {} invalid",
            csv_path,
            report.inserted,
            report.duplicates,
            report.invalid
        );
        Ok(report)
    }

    /// Number of rows currently in the table. Streams the file; does not
    /// decode records.
    pub fn row_count(&self) -> PipelineResult<usize> {
        let mut cursor = TableCursor::open(&self.path)?;
        let mut count = 0;
        while cursor.skip_row()? {
            count += 1;
        }
        Ok(count)
    }
}

impl RowSource for UserTable {
    fn open(&self) -> PipelineResult<Box<dyn RowCursor>> {
        Ok(Box::new(TableCursor::open(&self.path)?))
    }

    fn fetch_page(&self, page_size: usize, offset: usize) -> PipelineResult<Vec<UserRow>> {
        if page_size == 0 {
            return Err(PipelineError::InvalidArgument(
                "page_size must be at least 1".to_string(),
            ));
        }

        let mut cursor = TableCursor::open(&self.path)?;
        for _ in 0..offset {
            if !cursor.skip_row()? {
                return Ok(Vec::new());
            }
        }

        let mut rows = Vec::new();
        while rows.len() < page_size {
            match cursor.next_row()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        cursor.close()?;
        Ok(rows)
    }
}

/// Append handle with the duplicate-key index for one load.
struct Appender {
    writer: BufWriter<File>,
    ids: HashSet<String>,
    emails: HashSet<String>,
}

impl Appender {
    /// Open the table for appending, indexing existing keys first.
    fn open(path: &Path) -> PipelineResult<Self> {
        let mut ids = HashSet::new();
        let mut emails = HashSet::new();
        let mut cursor = TableCursor::open(path)?;
        while let Some(row) = cursor.next_row()? {
            ids.insert(row.user_id);
            emails.insert(row.email);
        }
        cursor.close()?;

        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            ids,
            emails,
        })
    }

    /// Append `row` unless its `user_id` or `email` is already present.
    /// Returns whether the row was written.
    fn append_unique(&mut self, row: &UserRow) -> PipelineResult<bool> {
        if self.ids.contains(&row.user_id) || self.emails.contains(&row.email) {
            return Ok(false);
        }

        let encoded = bincode::serialize(row)
            .map_err(|e| PipelineError::Data(format!("cannot encode record: {}", e)))?;
        self.writer.write_u32::<LittleEndian>(encoded.len() as u32)?;
        self.writer.write_all(&encoded)?;

        self.ids.insert(row.user_id.clone());
        self.emails.insert(row.email.clone());
        Ok(true)
    }

    fn finish(mut self) -> PipelineResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Column positions resolved from a CSV header line.
struct CsvHeader {
    user_id: Option<usize>,
    name: usize,
    email: usize,
    age: usize,
}

impl CsvHeader {
    fn parse(line: &str) -> PipelineResult<Self> {
        let columns = parse_csv_line(line);
        let find = |name: &str| {
            columns
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                PipelineError::Data(format!("CSV header is missing column {:?}", name))
            })
        };
        Ok(Self {
            user_id: find("user_id"),
            name: require("name")?,
            email: require("email")?,
            age: require("age")?,
        })
    }

    fn field<'a>(&self, fields: &'a [String], idx: usize) -> &'a str {
        fields.get(idx).map(String::as_str).unwrap_or("")
    }
}

/// Split one CSV line into fields, honoring double-quoted fields with `""`
/// escapes. Enough for the seed files this crate loads; not a general CSV
/// reader.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Ages arrive as decimal text (`"28"`, `"28.0"`); anything else is invalid.
fn parse_age(raw: &str) -> Option<u32> {
    if raw.is_empty() {
        return None;
    }
    let value = raw.parse::<f64>().ok()?;
    if !(0.0..=99_999.0).contains(&value) {
        return None;
    }
    Some(value as u32)
}

/// Random identifier in the canonical 8-4-4-4-12 hex layout.
fn generate_user_id<R: Rng>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.gen();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_rows() -> Vec<UserRow> {
        vec![
            UserRow::new("u1", "Alice Johnson", "alice@example.com", 28),
            UserRow::new("u2", "Bob Smith", "bob@example.com", 34),
            UserRow::new("u3", "Charlie Brown", "charlie@example.com", 22),
            UserRow::new("u4", "Diana Prince", "diana@example.com", 30),
        ]
    }

    #[test]
    fn test_create_is_idempotent() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = SourceConfig::new(dir.path());

        let table = UserTable::create(&config)?;
        table.insert_many(sample_rows())?;

        // Second create must not clobber existing data.
        let table = UserTable::create(&config)?;
        assert_eq!(table.row_count()?, 4);
        Ok(())
    }

    #[test]
    fn test_open_missing_table() {
        let config = SourceConfig::new("/nonexistent/rowpipe-test");
        let result = UserTable::open(&config);
        assert!(matches!(result, Err(PipelineError::Connection { .. })));
    }

    #[test]
    fn test_insert_many_skips_duplicates() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let table = UserTable::create(&SourceConfig::new(dir.path()))?;

        let report = table.insert_many(sample_rows())?;
        assert_eq!(report.inserted, 4);
        assert_eq!(report.duplicates, 0);

        // Same id, and a fresh id reusing an existing email.
        let report = table.insert_many(vec![
            UserRow::new("u1", "Alice Again", "alice2@example.com", 29),
            UserRow::new("u9", "Bob Clone", "bob@example.com", 40),
            UserRow::new("u5", "Eve Wilson", "eve@example.com", 19),
        ])?;
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 2);
        assert_eq!(table.row_count()?, 5);
        Ok(())
    }

    #[test]
    fn test_load_csv_twice_inserts_once() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let csv_path = dir.path().join("users.csv");
        std::fs::write(
            &csv_path,
            "user_id,name,email,age\n\
             u1,Alice Johnson,alice@example.com,28\n\
             u2,Bob Smith,bob@example.com,34\n\
             u3,Charlie Brown,charlie@example.com,22\n",
        )?;

        let table = UserTable::create(&SourceConfig::new(dir.path()))?;
        let first = table.load_csv(&csv_path)?;
        assert_eq!(first.inserted, 3);

        let second = table.load_csv(&csv_path)?;
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 3);
        assert_eq!(table.row_count()?, 3);
        Ok(())
    }

    #[test]
    fn test_load_csv_skips_bad_ages() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let csv_path = dir.path().join("users.csv");
        std::fs::write(
            &csv_path,
            "name,email,age\n\
             Alice,alice@example.com,28\n\
             NoAge,noage@example.com,\n\
             BadAge,badage@example.com,abc\n\
             Bob,bob@example.com,34.0\n",
        )?;

        let table = UserTable::create(&SourceConfig::new(dir.path()))?;
        let report = table.load_csv(&csv_path)?;
        assert_eq!(report.inserted, 2);
        assert_eq!(report.invalid, 2);

        // Generated ids must still be unique and non-empty.
        let mut cursor = TableCursor::open(table.path())?;
        let a = cursor.next_row()?.unwrap();
        let b = cursor.next_row()?.unwrap();
        assert!(!a.user_id.is_empty());
        assert_ne!(a.user_id, b.user_id);
        assert_eq!(b.age, 34);
        Ok(())
    }

    #[test]
    fn test_fetch_page_bounds() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let table = UserTable::create(&SourceConfig::new(dir.path()))?;
        table.insert_many(sample_rows())?;

        let page = table.fetch_page(3, 0)?;
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].user_id, "u1");

        let page = table.fetch_page(3, 3)?;
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].user_id, "u4");

        // Offset past the end is an empty page, not an error.
        assert!(table.fetch_page(3, 6)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_fetch_page_zero_size() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let table = UserTable::create(&SourceConfig::new(dir.path()))?;
        let result = table.fetch_page(0, 0);
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn test_parse_csv_line_quoting() {
        assert_eq!(parse_csv_line("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(
            parse_csv_line(r#"u1,"Smith, Bob",bob@example.com,34"#),
            vec!["u1", "Smith, Bob", "bob@example.com", "34"]
        );
        assert_eq!(parse_csv_line(r#""say ""hi""",x"#), vec![r#"say "hi""#, "x"]);
    }

    #[test]
    fn test_parse_age() {
        assert_eq!(parse_age("28"), Some(28));
        assert_eq!(parse_age("28.0"), Some(28));
        assert_eq!(parse_age(""), None);
        assert_eq!(parse_age("abc"), None);
        assert_eq!(parse_age("-3"), None);
    }
}
