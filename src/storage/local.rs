use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};
use serde::Serialize;

use crate::error::{LedgerError, Result};
use crate::schema::{validate_month, PeriodKey, StoredBatch, Transaction};
use crate::storage::{StorageBackend, BATCH_FILE, RAW_DOCUMENT_FILE};
use crate::utils::{
    month_segment, parse_month_segment, parse_year_segment, sort_by_date, validate_bank_name,
};

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Directory-tree storage rooted at a single path:
///
/// ```text
/// <root>/<bank_name>/<year>/<month:02>/statement.pdf
/// <root>/<bank_name>/<year>/<month:02>/transactions.json
/// ```
///
/// Bank directories are matched case-insensitively. New buckets go into an
/// existing spelling of the bank when there is one, and reads cover every
/// spelling found under the root (`barclays/` and `Barclays/` are one bank). Files are replaced by write-then-rename, so a
/// reader sees either the previous or the new content. Two writers racing on
/// the same key are not serialized: the last rename wins.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

#[derive(Serialize)]
struct BatchRef<'a> {
    transactions: &'a [Transaction],
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every root directory naming `bank_name`, compared case-insensitively.
    /// The exact spelling comes first, the rest follow in name order.
    fn find_bank_dirs(&self, bank_name: &str) -> Result<Vec<PathBuf>> {
        let wanted = bank_name.to_lowercase();
        let mut matches: Vec<(String, PathBuf)> = list_dirs(&self.root)?
            .into_iter()
            .filter(|(name, _)| name.to_lowercase() == wanted)
            .collect();
        matches.sort_by_key(|(name, _)| name != bank_name);
        Ok(matches.into_iter().map(|(_, path)| path).collect())
    }

    /// Reads `file_name` from the first spelling of the bank that holds the bucket.
    fn read_bucket_file<T>(
        &self,
        key: &PeriodKey,
        file_name: &str,
        read: impl Fn(&Path) -> Result<T>,
    ) -> Result<T> {
        for bank_dir in self.find_bank_dirs(key.bank_name())? {
            let path = bank_dir
                .join(key.year().to_string())
                .join(key.month_segment())
                .join(file_name);
            match read(&path) {
                Err(LedgerError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(LedgerError::NotFound(format!("{}/{}", key, file_name)))
    }

    fn bucket_dir_for_write(&self, key: &PeriodKey) -> Result<PathBuf> {
        let bank_dir = match self.find_bank_dirs(key.bank_name())?.into_iter().next() {
            Some(dir) => dir,
            None => self.root.join(key.bank_name()),
        };
        let dir = bank_dir
            .join(key.year().to_string())
            .join(key.month_segment());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn read_batch_file(&self, path: &Path) -> Result<Vec<Transaction>> {
        let bytes = read_file(path)?;
        let batch: StoredBatch =
            serde_json::from_slice(&bytes).map_err(|e| LedgerError::Corrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(batch.transactions)
    }

    /// Appends one month bucket. A bucket holding only a raw statement adds nothing.
    fn collect_bucket(&self, month_dir: &Path, out: &mut Vec<Transaction>) -> Result<()> {
        match self.read_batch_file(&month_dir.join(BATCH_FILE)) {
            Ok(transactions) => out.extend(transactions),
            Err(LedgerError::NotFound(_)) => {
                debug!("No stored batch in {}, skipping", month_dir.display());
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn collect_buckets(
        &self,
        buckets: Vec<(i32, u32, PathBuf)>,
        out: &mut Vec<Transaction>,
    ) -> Result<()> {
        for (_, _, path) in buckets {
            self.collect_bucket(&path, out)?;
        }
        Ok(())
    }
}

/// Month buckets of one year directory.
fn month_dirs(year: i32, year_dir: &Path) -> Result<Vec<(i32, u32, PathBuf)>> {
    let mut buckets = Vec::new();
    for (name, path) in list_dirs(year_dir)? {
        match parse_month_segment(&name) {
            Some(month) => buckets.push((year, month, path)),
            None => debug!("Ignoring non-month directory {}", path.display()),
        }
    }
    Ok(buckets)
}

/// Month buckets of every year under one bank directory.
fn bank_buckets(bank_dir: &Path) -> Result<Vec<(i32, u32, PathBuf)>> {
    let mut buckets = Vec::new();
    for (name, path) in list_dirs(bank_dir)? {
        match parse_year_segment(&name) {
            Some(year) => buckets.extend(month_dirs(year, &path)?),
            None => debug!("Ignoring non-year directory {}", path.display()),
        }
    }
    buckets.sort_by_key(|(year, month, _)| (*year, *month));
    Ok(buckets)
}

impl StorageBackend for LocalStorage {
    fn store_raw_document(&self, key: &PeriodKey, bytes: &[u8]) -> Result<()> {
        let dir = self.bucket_dir_for_write(key)?;
        write_atomic(&dir.join(RAW_DOCUMENT_FILE), bytes)?;
        info!("Stored raw statement for {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    fn get_raw_document(&self, key: &PeriodKey) -> Result<Vec<u8>> {
        self.read_bucket_file(key, RAW_DOCUMENT_FILE, read_file)
    }

    fn store_batch(&self, key: &PeriodKey, transactions: &[Transaction]) -> Result<()> {
        let dir = self.bucket_dir_for_write(key)?;
        let json = serde_json::to_vec_pretty(&BatchRef { transactions })?;
        write_atomic(&dir.join(BATCH_FILE), &json)?;
        info!("Stored {} transactions for {}", transactions.len(), key);
        Ok(())
    }

    fn get_batch(&self, key: &PeriodKey) -> Result<Vec<Transaction>> {
        self.read_bucket_file(key, BATCH_FILE, |path| self.read_batch_file(path))
    }

    fn get_batches_for_bank(&self, bank_name: &str) -> Result<Vec<Transaction>> {
        validate_bank_name(bank_name)?;
        let bank_dirs = self.find_bank_dirs(bank_name)?;
        if bank_dirs.is_empty() {
            return Err(LedgerError::NotFound(format!(
                "no statements for bank {}",
                bank_name
            )));
        }

        let mut buckets = Vec::new();
        for bank_dir in &bank_dirs {
            buckets.extend(bank_buckets(bank_dir)?);
        }
        buckets.sort_by_key(|(year, month, _)| (*year, *month));

        let mut transactions = Vec::new();
        self.collect_buckets(buckets, &mut transactions)?;
        sort_by_date(&mut transactions);
        Ok(transactions)
    }

    fn get_batches_for_date(&self, year: i32, month: u32) -> Result<Vec<Transaction>> {
        validate_month(month)?;
        let year_segment = year.to_string();
        let month_segment = month_segment(month);

        let mut transactions = Vec::new();
        for (_, bank_dir) in list_dirs(&self.root)? {
            let month_dir = bank_dir.join(&year_segment).join(&month_segment);
            self.collect_bucket(&month_dir, &mut transactions)?;
        }
        sort_by_date(&mut transactions);
        Ok(transactions)
    }

    fn get_batches_for_bank_for_year(
        &self,
        bank_name: &str,
        year: i32,
    ) -> Result<Vec<Transaction>> {
        validate_bank_name(bank_name)?;
        let mut buckets = Vec::new();
        for bank_dir in self.find_bank_dirs(bank_name)? {
            buckets.extend(month_dirs(year, &bank_dir.join(year.to_string()))?);
        }
        buckets.sort_by_key(|(_, month, _)| *month);

        let mut transactions = Vec::new();
        self.collect_buckets(buckets, &mut transactions)?;
        sort_by_date(&mut transactions);
        Ok(transactions)
    }

    fn get_batches_for_year(&self, year: i32) -> Result<Vec<Transaction>> {
        let year_segment = year.to_string();
        let mut transactions = Vec::new();
        for (_, bank_dir) in list_dirs(&self.root)? {
            let buckets = month_dirs(year, &bank_dir.join(&year_segment))?;
            self.collect_buckets(buckets, &mut transactions)?;
        }
        sort_by_date(&mut transactions);
        Ok(transactions)
    }

    fn get_all_batches(&self) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();
        for (_, bank_dir) in list_dirs(&self.root)? {
            self.collect_buckets(bank_buckets(&bank_dir)?, &mut transactions)?;
        }
        sort_by_date(&mut transactions);
        Ok(transactions)
    }
}

/// Subdirectories of `dir` sorted by name. A missing `dir` has none.
fn list_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            dirs.push((name.to_string(), path.clone()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LedgerError::NotFound(path.display().to_string()),
        _ => LedgerError::IoError(e),
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TEMP_FILE_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let written = File::create(&temp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|_| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}
