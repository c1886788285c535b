//! Bar loading for the runner.
//!
//! Bars come from CSV files with a `time` column and either full OHLCV
//! columns or a single `price` column. Columns are located by header name,
//! so extra columns (such as a leading index) are ignored.
//!
//! Synthetic data is a developer-only debug mode: a deterministic random walk
//! tagged so results produced on it are never mistaken for real data.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use scalplab_core::domain::Bar;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{}' has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    #[error("line {line}: time {time} is not after the previous bar ({previous})")]
    Unsorted {
        line: u64,
        time: NaiveDateTime,
        previous: NaiveDateTime,
    },
}

/// Where a bar series came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Csv(PathBuf),
    /// Generated random walk, keyed by label.
    Synthetic(String),
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Csv(path) => write!(f, "{}", path.display()),
            DataSource::Synthetic(label) => write!(f, "synthetic:{label}"),
        }
    }
}

/// A loaded bar series with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over all bar data.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn is_synthetic(&self) -> bool {
        matches!(self.source, DataSource::Synthetic(_))
    }
}

/// Load a CSV file and tag it with its path and hash.
pub fn load_data(path: &Path) -> Result<LoadedData, LoadError> {
    let bars = load_bars_csv(path)?;
    let dataset_hash = dataset_hash(&bars);
    Ok(LoadedData {
        bars,
        source: DataSource::Csv(path.to_path_buf()),
        dataset_hash,
    })
}

/// Build a tagged synthetic dataset.
pub fn synthetic_data(label: &str, start: NaiveDateTime, count: usize) -> LoadedData {
    warn!(label, "generating synthetic data; results will be tagged as synthetic");
    let bars = generate_synthetic_bars(label, start, count);
    let dataset_hash = dataset_hash(&bars);
    LoadedData {
        bars,
        source: DataSource::Synthetic(label.to_string()),
        dataset_hash,
    }
}

/// Column layout detected from the header row.
#[derive(Clone, Copy)]
enum Layout {
    Ohlcv {
        open: usize,
        high: usize,
        low: usize,
        close: usize,
        volume: Option<usize>,
    },
    /// Price-only series: open = high = low = close = price, volume 0.
    PriceOnly { price: usize },
}

/// Load bars from a CSV file.
///
/// Requires a `time` column plus either `open,high,low,close` (with optional
/// `volume`) or `price`. Rows must be strictly increasing in time.
pub fn load_bars_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let headers = reader.headers().map_err(csv_err)?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let missing = |column: &str| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    };

    let time_col = find("time").ok_or_else(|| missing("time"))?;
    let layout = match (find("open"), find("high"), find("low"), find("close")) {
        (Some(open), Some(high), Some(low), Some(close)) => Layout::Ohlcv {
            open,
            high,
            low,
            close,
            volume: find("volume"),
        },
        _ => match find("price") {
            Some(price) => Layout::PriceOnly { price },
            None => return Err(missing("close")),
        },
    };

    let mut bars: Vec<Bar> = Vec::new();
    let mut insane = 0usize;
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let field = |idx: usize, column: &str| {
            record.get(idx).ok_or_else(|| LoadError::InvalidRow {
                line,
                reason: format!("missing '{column}' field"),
            })
        };
        let number = |idx: usize, column: &str| -> Result<f64, LoadError> {
            let raw = field(idx, column)?;
            let value: f64 = raw.parse().map_err(|_| LoadError::InvalidRow {
                line,
                reason: format!("'{column}' is not a number: '{raw}'"),
            })?;
            if !value.is_finite() {
                return Err(LoadError::InvalidRow {
                    line,
                    reason: format!("'{column}' is not finite"),
                });
            }
            Ok(value)
        };

        let raw_time = field(time_col, "time")?;
        let time = parse_time(raw_time).ok_or_else(|| LoadError::InvalidRow {
            line,
            reason: format!("unrecognised time '{raw_time}'"),
        })?;

        let bar = match layout {
            Layout::Ohlcv {
                open,
                high,
                low,
                close,
                volume,
            } => Bar {
                time,
                open: number(open, "open")?,
                high: number(high, "high")?,
                low: number(low, "low")?,
                close: number(close, "close")?,
                volume: match volume {
                    Some(idx) => number(idx, "volume")?,
                    None => 0.0,
                },
            },
            Layout::PriceOnly { price } => {
                let p = number(price, "price")?;
                Bar {
                    time,
                    open: p,
                    high: p,
                    low: p,
                    close: p,
                    volume: 0.0,
                }
            }
        };

        if let Some(prev) = bars.last() {
            if bar.time <= prev.time {
                return Err(LoadError::Unsorted {
                    line,
                    time: bar.time,
                    previous: prev.time,
                });
            }
        }
        if !bar.is_sane() {
            insane += 1;
        }
        bars.push(bar);
    }

    if insane > 0 {
        warn!(
            path = %path.display(),
            insane,
            "bars whose high/low do not bracket open/close"
        );
    }
    debug!(path = %path.display(), bars = bars.len(), "loaded bars");
    Ok(bars)
}

/// Parse a bar timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f][+HH:MM]`,
/// `YYYY-MM-DDTHH:MM:SS[.f]`, `YYYY-MM-DD`, and integer unix epochs
/// (seconds, or milliseconds when 13+ digits). Offsets are normalised to UTC.
pub fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(epoch) = s.parse::<i64>() {
        let dt = if s.trim_start_matches('-').len() >= 13 {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        };
        return dt.map(|d| d.naive_utc());
    }
    None
}

/// CSV files in `dir` whose names start with `prefix`, sorted by name.
pub fn list_data_files(dir: &Path, prefix: Option<&str>) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(dir.to_path_buf())
        } else {
            LoadError::Io {
                path: dir.to_path_buf(),
                source,
            }
        }
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let name_matches = match (prefix, path.file_name().and_then(|n| n.to_str())) {
            (None, Some(_)) => true,
            (Some(p), Some(name)) => name.starts_with(p),
            (_, None) => false,
        };
        if path.is_file() && is_csv && name_matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Compute a deterministic BLAKE3 hash over all bar data.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.time.and_utc().timestamp().to_le_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate `count` one-minute synthetic bars starting at `start`.
///
/// A random walk from 100.0 seeded from the label, so the same label always
/// produces the same series.
pub fn generate_synthetic_bars(label: &str, start: NaiveDateTime, count: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(label.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut price = 100.0_f64;
    (0..count)
        .map(|i| {
            let step: f64 = rng.gen_range(-0.004..0.004);
            let open = price;
            let close = price * (1.0 + step);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
            let volume = rng.gen_range(10.0..1_000.0);
            price = close;
            Bar {
                time: start + Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                volume,
            }
        })
        .collect()
}
