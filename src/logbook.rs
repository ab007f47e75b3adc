//! The log store: date-rotated, append-only event logs on a [`FileStore`].
//!
//! Every event becomes one line in `log-<YYYY-MM-DD>.txt`, or in
//! `log-unknown.txt` while the clock is unavailable. Files are opened,
//! appended and closed per event; no handle outlives a call. Bulk removal
//! tolerates partial failure and reports each failed file.

use heapless::Vec;

use crate::clock::{Resolved, UNKNOWN_KEY};
use crate::event::Event;
use crate::storage::{FileName, FileStore, OpenMode, StoreFile};

/// Prefix shared by every log file.
pub const LOG_PREFIX: &str = "log-";
/// Extension of every log file.
pub const LOG_SUFFIX: &str = ".txt";

/// Name of a log file, e.g. `log-2024-01-01.txt`.
pub type LogFileName = FileName;

/// Most failed deletions [`LogStore::remove_all`] keeps track of.
pub const MAX_CLEAR_FAILURES: usize = 8;

const CLEAR_BATCH: usize = 16;

/// Log store failures. None of them stop the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    /// The store was never mounted, or mounting failed.
    NotMounted,
    /// The requested log file does not exist.
    NotFound,
    /// The file could not be opened or created.
    Open,
    /// The line could not be formatted or written.
    Write,
    /// The file or the listing could not be read.
    Read,
    /// The file could not be deleted.
    Remove,
}

impl core::fmt::Display for LogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            LogError::NotMounted => "store not mounted",
            LogError::NotFound => "log file not found",
            LogError::Open => "log open failed",
            LogError::Write => "log write failed",
            LogError::Read => "log read failed",
            LogError::Remove => "log delete failed",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for LogError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            LogError::NotMounted => defmt::write!(f, "NotMounted"),
            LogError::NotFound => defmt::write!(f, "NotFound"),
            LogError::Open => defmt::write!(f, "Open"),
            LogError::Write => defmt::write!(f, "Write"),
            LogError::Read => defmt::write!(f, "Read"),
            LogError::Remove => defmt::write!(f, "Remove"),
        }
    }
}

/// File name for a rotation key.
pub fn path_for(key: &str) -> Result<LogFileName, LogError> {
    let mut name = LogFileName::new();
    name.push_str(LOG_PREFIX)
        .and_then(|_| name.push_str(key))
        .and_then(|_| name.push_str(LOG_SUFFIX))
        .map_err(|_| LogError::Open)?;
    Ok(name)
}

/// `true` for `log-unknown.txt` and `log-YYYY-MM-DD.txt` with a plausible
/// month and day.
pub fn is_log_file_name(name: &str) -> bool {
    match name
        .strip_prefix(LOG_PREFIX)
        .and_then(|rest| rest.strip_suffix(LOG_SUFFIX))
    {
        Some(key) => key == UNKNOWN_KEY || is_date_key(key),
        None => false,
    }
}

fn is_date_key(key: &str) -> bool {
    let b = key.as_bytes();
    if b.len() != 10 || b[4] != b'-' || b[7] != b'-' {
        return false;
    }
    let digits = |range: core::ops::Range<usize>| -> Option<u32> {
        b[range].iter().try_fold(0u32, |acc, &c| {
            c.is_ascii_digit().then(|| acc * 10 + u32::from(c - b'0'))
        })
    };
    match (digits(0..4), digits(5..7), digits(8..10)) {
        (Some(_), Some(month), Some(day)) => (1..=12).contains(&month) && (1..=31).contains(&day),
        _ => false,
    }
}

/// Outcome of [`LogStore::remove_all`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClearReport {
    /// Files deleted.
    pub removed: usize,
    /// Files that could not be deleted, up to [`MAX_CLEAR_FAILURES`].
    pub failed: Vec<LogFileName, MAX_CLEAR_FAILURES>,
    /// More files failed than `failed` can hold. Every file was still
    /// attempted, but not every failure is named.
    pub incomplete: bool,
}

impl ClearReport {
    /// Every log file was deleted.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.incomplete
    }
}

/// Owns the log-file namespace of a [`FileStore`].
#[derive(Debug)]
pub struct LogStore<S> {
    store: S,
    mounted: bool,
}

impl<S> LogStore<S> {
    /// Wrap an unmounted store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            mounted: false,
        }
    }

    /// Whether [`mount`](Self::mount) succeeded.
    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// The wrapped store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn ensure_mounted(&self) -> Result<(), LogError> {
        if self.mounted {
            Ok(())
        } else {
            Err(LogError::NotMounted)
        }
    }
}

impl<S: FileStore> LogStore<S> {

    /// Mount the underlying store. Until this succeeds every other
    /// operation fails with [`LogError::NotMounted`].
    pub fn mount(&mut self) -> Result<(), LogError> {
        match self.store.mount() {
            Ok(()) => {
                self.mounted = true;
                Ok(())
            }
            Err(_) => {
                error!("store mount failed");
                self.mounted = false;
                Err(LogError::NotMounted)
            }
        }
    }

    /// Append `line` to the file selected by `time`.
    ///
    /// The rotation key is taken from `time` here, at the moment of the
    /// write. Returns the name of the file written.
    pub fn append(&mut self, time: &Resolved, line: &str) -> Result<LogFileName, LogError> {
        self.ensure_mounted()?;
        let name = path_for(&time.rotation_key())?;
        let mut file = self
            .store
            .open(&name, OpenMode::Append)
            .map_err(|_| LogError::Open)?;
        let written = file.append(line.as_bytes());
        // Close even after a failed write so the handle is released.
        let closed = file.close();
        written.and(closed).map_err(|_| LogError::Write)?;
        Ok(name)
    }

    /// Format `event` and append it.
    pub fn record(&mut self, event: &Event) -> Result<LogFileName, LogError> {
        let line = event.line().map_err(|_| LogError::Write)?;
        self.append(&event.occurred_at, &line)
    }

    /// Call `visit` with the name of every log file.
    pub fn list_log_files(&mut self, mut visit: impl FnMut(&str)) -> Result<(), LogError> {
        self.ensure_mounted()?;
        self.store
            .list(LOG_PREFIX, &mut |name: &str| {
                if is_log_file_name(name) {
                    visit(name);
                }
            })
            .map_err(|_| LogError::Read)
    }

    /// Names of up to `N` log files.
    pub fn log_file_names<const N: usize>(&mut self) -> Result<Vec<LogFileName, N>, LogError> {
        let mut names = Vec::new();
        self.list_log_files(|name: &str| {
            if let Ok(name) = LogFileName::try_from(name) {
                let _ = names.push(name);
            }
        })?;
        Ok(names)
    }

    /// Number of log files.
    pub fn count(&mut self) -> Result<usize, LogError> {
        let mut count = 0;
        self.list_log_files(|_| count += 1)?;
        Ok(count)
    }

    /// Whether `name` is an existing log file.
    pub fn exists(&mut self, name: &str) -> bool {
        self.mounted && is_log_file_name(name) && self.store.exists(name)
    }

    /// Open a log file for reading.
    pub fn open(&mut self, name: &str) -> Result<S::File<'_>, LogError> {
        self.ensure_mounted()?;
        if !is_log_file_name(name) || !self.store.exists(name) {
            return Err(LogError::NotFound);
        }
        self.store
            .open(name, OpenMode::Read)
            .map_err(|_| LogError::Open)
    }

    /// Delete one log file.
    pub fn remove(&mut self, name: &str) -> Result<(), LogError> {
        self.ensure_mounted()?;
        if !is_log_file_name(name) || !self.store.exists(name) {
            return Err(LogError::NotFound);
        }
        self.store.remove(name).map_err(|_| LogError::Remove)
    }

    /// Delete every log file.
    ///
    /// Files are visited once each, in name order, so a failed deletion
    /// neither aborts the clear nor gets retried. Failures are logged and
    /// recorded in the report. Running this on an empty store succeeds with
    /// nothing removed.
    pub fn remove_all(&mut self) -> Result<ClearReport, LogError> {
        let mut report = ClearReport::default();
        let mut cursor: Option<LogFileName> = None;
        loop {
            let batch = self.batch_after(cursor.as_deref())?;
            let Some(last) = batch.last() else {
                break;
            };
            cursor = Some(last.clone());

            for name in batch {
                match self.store.remove(&name) {
                    Ok(()) => report.removed += 1,
                    Err(_) => {
                        warn!("could not delete {}", name.as_str());
                        if report.failed.push(name).is_err() {
                            report.incomplete = true;
                        }
                    }
                }
            }
        }
        info!("cleared {} log files", report.removed);
        Ok(report)
    }

    /// The first [`CLEAR_BATCH`] log file names sorting after `after`.
    fn batch_after(
        &mut self,
        after: Option<&str>,
    ) -> Result<Vec<LogFileName, CLEAR_BATCH>, LogError> {
        let mut batch: Vec<LogFileName, CLEAR_BATCH> = Vec::new();
        self.list_log_files(|name: &str| {
            if after.is_some_and(|a| name <= a) {
                return;
            }
            let Ok(name) = LogFileName::try_from(name) else {
                return;
            };
            let at = batch
                .iter()
                .position(|b| name.as_str() < b.as_str())
                .unwrap_or(batch.len());
            if batch.is_full() {
                if at == batch.len() {
                    return;
                }
                batch.pop();
            }
            let _ = batch.insert(at, name);
        })?;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::error::Error as StoreError;
    use crate::storage::{MemFile, MemStore};
    use chrono::NaiveDate;

    type Store = MemStore<8, 256>;

    fn day(d: u32) -> Resolved {
        Resolved::Valid(
            NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        )
    }

    fn mounted() -> LogStore<Store> {
        let mut log = LogStore::new(Store::new());
        log.mount().unwrap();
        log
    }

    #[test]
    fn test_names() {
        assert_eq!(path_for("2024-01-01").unwrap().as_str(), "log-2024-01-01.txt");
        assert!(is_log_file_name("log-2024-01-01.txt"));
        assert!(is_log_file_name("log-unknown.txt"));
        assert!(!is_log_file_name("log-2024-13-01.txt"));
        assert!(!is_log_file_name("log-2024-1-01.txt"));
        assert!(!is_log_file_name("log-abcd-01-01.txt"));
        assert!(!is_log_file_name("config.json"));
        assert!(!is_log_file_name("log-2024-01-01.csv"));
    }

    #[test]
    fn test_append_rotates_by_date() {
        let mut log = mounted();
        let a = log.record(&Event::press("Blue").at(day(1))).unwrap();
        let b = log.record(&Event::press("Yellow").at(day(2))).unwrap();
        let c = log.record(&Event::press("Blue").at(day(2))).unwrap();

        assert_eq!(a.as_str(), "log-2024-01-01.txt");
        assert_eq!(b, c);
        assert_eq!(
            log.store().contents("log-2024-01-02.txt"),
            Some(&b"2024-01-02 09:30:00 Yellow\n2024-01-02 09:30:00 Blue\n"[..])
        );

        let names: Vec<LogFileName, 4> = log.log_file_names().unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n == &a));
    }

    #[test]
    fn test_unavailable_clock_goes_to_unknown_file() {
        let mut log = mounted();
        log.record(&Event::press("Blue")).unwrap();
        log.record(&Event::press("Yellow")).unwrap();
        assert_eq!(
            log.store().contents("log-unknown.txt"),
            Some(&b"unknown-time Blue\nunknown-time Yellow\n"[..])
        );
    }

    #[test]
    fn test_unmounted_store_reports_instead_of_panicking() {
        let mut log = LogStore::new(Store::new());
        assert_eq!(log.record(&Event::press("Blue")), Err(LogError::NotMounted));
        assert_eq!(log.count(), Err(LogError::NotMounted));
        assert!(!log.exists("log-unknown.txt"));
    }

    #[test]
    fn test_full_store_reports_open_failure() {
        let mut log = LogStore::new(MemStore::<1, 64>::new());
        log.mount().unwrap();
        log.record(&Event::press("Blue").at(day(1))).unwrap();
        assert_eq!(
            log.record(&Event::press("Blue").at(day(2))),
            Err(LogError::Open)
        );
    }

    #[test]
    fn test_remove_all_is_idempotent() {
        let mut log = mounted();
        for d in 1..=5 {
            log.record(&Event::press("Blue").at(day(d))).unwrap();
        }
        log.record(&Event::press("Blue")).unwrap();

        let report = log.remove_all().unwrap();
        assert_eq!(report.removed, 6);
        assert!(report.is_clean());
        assert_eq!(log.count().unwrap(), 0);

        let again = log.remove_all().unwrap();
        assert_eq!(again, ClearReport::default());
    }

    /// Refuses to delete the files of the first `stuck_days` days.
    struct Stubborn {
        inner: MemStore<24, 64>,
        stuck_days: u32,
    }

    impl FileStore for Stubborn {
        type Error = StoreError;
        type File<'a> = MemFile<'a, 64>;

        fn open(&mut self, name: &str, mode: OpenMode) -> Result<Self::File<'_>, Self::Error> {
            self.inner.open(name, mode)
        }

        fn exists(&mut self, name: &str) -> bool {
            self.inner.exists(name)
        }

        fn remove(&mut self, name: &str) -> Result<(), Self::Error> {
            let day = name.get(12..14).and_then(|d| d.parse::<u32>().ok());
            if day.is_some_and(|d| d <= self.stuck_days) {
                return Err(StoreError::RemoveError);
            }
            self.inner.remove(name)
        }

        fn list(&mut self, prefix: &str, visit: &mut dyn FnMut(&str)) -> Result<(), Self::Error> {
            self.inner.list(prefix, visit)
        }
    }

    fn stubborn(files: u32, stuck_days: u32) -> LogStore<Stubborn> {
        let mut log = LogStore::new(Stubborn {
            inner: MemStore::new(),
            stuck_days,
        });
        log.mount().unwrap();
        for d in 1..=files {
            log.record(&Event::press("Blue").at(day(d))).unwrap();
        }
        log
    }

    #[test]
    fn test_remove_all_reports_failures_and_continues() {
        let mut log = stubborn(5, 2);

        let report = log.remove_all().unwrap();
        assert_eq!(report.removed, 3);
        let failed: std::vec::Vec<&str> = report.failed.iter().map(|n| n.as_str()).collect();
        assert_eq!(failed, ["log-2024-01-01.txt", "log-2024-01-02.txt"]);
        assert!(!report.incomplete);
        assert!(!report.is_clean());
        assert_eq!(log.count().unwrap(), 2);

        // Leftovers are attempted again by the next clear.
        let again = log.remove_all().unwrap();
        assert_eq!(again.removed, 0);
        assert_eq!(again.failed.len(), 2);
    }

    #[test]
    fn test_remove_all_attempts_every_file_past_failure_cap() {
        let mut log = stubborn(20, 10);

        let report = log.remove_all().unwrap();
        assert_eq!(report.removed, 10);
        assert_eq!(report.failed.len(), MAX_CLEAR_FAILURES);
        assert_eq!(report.failed[0].as_str(), "log-2024-01-01.txt");
        assert_eq!(report.failed[7].as_str(), "log-2024-01-08.txt");
        assert!(report.incomplete);

        assert_eq!(log.count().unwrap(), 10);
        assert!(log.exists("log-2024-01-10.txt"));
        assert!(!log.exists("log-2024-01-11.txt"));
        assert!(!log.exists("log-2024-01-20.txt"));
    }

    #[test]
    fn test_open_and_remove_single_file() {
        let mut log = mounted();
        log.record(&Event::press("Blue").at(day(1))).unwrap();

        let mut file = log.open("log-2024-01-01.txt").unwrap();
        let mut buf = [0u8; 64];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"2024-01-01 09:30:00 Blue\n");

        assert_eq!(log.open("log-2024-01-02.txt").err(), Some(LogError::NotFound));
        assert_eq!(log.open("config.json").err(), Some(LogError::NotFound));

        log.remove("log-2024-01-01.txt").unwrap();
        assert_eq!(log.remove("log-2024-01-01.txt"), Err(LogError::NotFound));
    }
}
