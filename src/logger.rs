use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn open_log_file() -> Option<File> {
    let path = exe_dir().join("log.txt");
    let mut f = OpenOptions::new().create(true).append(true).open(path).ok()?;
    let _ = writeln!(f, "===== cliptrans start =====");
    Some(f)
}

/// Installs the global subscriber. Logs go to `log.txt` next to the
/// executable; stderr is used when that file can't be opened.
pub fn init() {
    let builder = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .with_ansi(false);

    let result = match open_log_file() {
        Some(file) => builder.with_writer(Mutex::new(file)).try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    if result.is_err() {
        // Already installed (tests, or init called twice).
        tracing::debug!("logger already initialised");
    }
}
