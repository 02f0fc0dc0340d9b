use csv::{QuoteStyle, ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use registry_client::{Installation, InstallationDraft, WeatherSnapshot};

/// Name offered for downloaded exports.
pub const EXPORT_FILE_NAME: &str = "installations.csv";

#[derive(thiserror::Error, Debug)]
pub enum TransferError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv writer error: {0}")]
    Flush(String),
    #[error("export is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes records as header-less `location,capacity,weather` lines.
///
/// Fields are quoted only when they contain a delimiter, quote or newline, so
/// plain values come out exactly as a naive comma join would write them.
/// Lines are joined with `\n` and there is no trailing newline.
pub fn export_csv(records: &[Installation]) -> Result<String, TransferError> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for r in records {
        let capacity = r.capacity.map(|c| c.to_string()).unwrap_or_default();
        wtr.write_record([r.location.as_str(), capacity.as_str(), r.weather.as_str()])?;
    }

    let bytes = wtr.into_inner().map_err(|e| TransferError::Flush(e.to_string()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Parses CSV text into drafts, one per non-blank line.
///
/// Rows are not validated: a missing location becomes empty, capacity is the
/// leading integer of its field (`None` when there is none), a missing
/// weather field becomes `"N/A"`, and extra fields are ignored.
pub fn import_csv(text: &str) -> Result<Vec<InstallationDraft>, TransferError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut drafts = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        drafts.push(draft_from_record(&record));
    }

    tracing::debug!(rows = drafts.len(), "parsed installation csv");
    Ok(drafts)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

fn draft_from_record(record: &StringRecord) -> InstallationDraft {
    let location = record.get(0).unwrap_or_default().to_string();
    let capacity = record.get(1).and_then(parse_capacity);
    let weather = record
        .get(2)
        .map(WeatherSnapshot::from)
        .unwrap_or(WeatherSnapshot::Unavailable);

    if capacity.is_none() {
        metrics::counter!("installation_csv_bad_capacity_total").increment(1);
    }

    InstallationDraft {
        location,
        capacity,
        weather,
    }
}

/// Leading signed integer of `s` after whitespace: `"12kW"` is 12, `"-5"` is
/// -5, `"kW"` is `None`.
fn parse_capacity(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let digits_start = usize::from(s.starts_with(['+', '-']));
    let digits_len = s[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    s[..digits_start + digits_len].parse().ok()
}
