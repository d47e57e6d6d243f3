use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Ratios below this are reported as zero: the column is not dominated by
/// any recognizable format.
pub const ACCURACY_THRESHOLD: f64 = 0.5;

/// Value formats the profiler counts matches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyKind {
    Address,
    BankCardNumber,
    ChineseName,
    Date,
    Email,
    IdNumber,
    IpAddress,
    Phone,
    PostCode,
    Url,
}

impl AccuracyKind {
    pub const ALL: [AccuracyKind; 10] = [
        AccuracyKind::Address,
        AccuracyKind::BankCardNumber,
        AccuracyKind::ChineseName,
        AccuracyKind::Date,
        AccuracyKind::Email,
        AccuracyKind::IdNumber,
        AccuracyKind::IpAddress,
        AccuracyKind::Phone,
        AccuracyKind::PostCode,
        AccuracyKind::Url,
    ];

    /// Key of the match count in a column profile.
    pub fn metric_name(&self) -> &'static str {
        match self {
            AccuracyKind::Address => "accuracyAddressCount",
            AccuracyKind::BankCardNumber => "accuracyBankCardNumberCount",
            AccuracyKind::ChineseName => "accuracyChineseNameCount",
            AccuracyKind::Date => "accuracyDateCount",
            AccuracyKind::Email => "accuracyEmailCount",
            AccuracyKind::IdNumber => "accuracyIdNumberCount",
            AccuracyKind::IpAddress => "accuracyIpAddressCount",
            AccuracyKind::Phone => "accuracyPhoneCount",
            AccuracyKind::PostCode => "accuracyPostCodeCount",
            AccuracyKind::Url => "accuracyUrlCount",
        }
    }
}

/// Integer metric from profiler output. Accepts numbers and numeric strings;
/// missing or null is 0, anything else is logged and treated as 0.
pub fn lenient_int(key: &str, value: Option<&Value>) -> i64 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) => f as i64,
            Err(_) => {
                warn!("Cannot convert {} = {:?} to an integer, using 0", key, s);
                0
            }
        },
        Some(other) => {
            warn!("Cannot convert {} = {} to an integer, using 0", key, other);
            0
        }
    }
}

/// Highest match count over all formats, with the format that produced it.
fn dominant_match(column: &Value) -> (Option<AccuracyKind>, i64) {
    let mut best: Option<(AccuracyKind, i64)> = None;
    for kind in AccuracyKind::ALL {
        let count = lenient_int(kind.metric_name(), column.get(kind.metric_name()));
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((kind, count));
        }
    }
    (best.map(|(kind, _)| kind), best.map_or(0, |(_, c)| c))
}

/// Unthresholded `max / valuesCount` for one column, `0.0` without a positive
/// values count. This is the figure the table accuracy proportion averages.
pub fn raw_accuracy_ratio(column: &Value) -> f64 {
    let total = lenient_int("valuesCount", column.get("valuesCount"));
    if total <= 0 {
        return 0.0;
    }
    dominant_match(column).1 as f64 / total as f64
}

/// Accuracy of one column profile: the highest match count over all formats
/// divided by the column's values count.
///
/// Returns the dominant format (if any count is positive) and the ratio,
/// which is `None` without a positive values count and `0.0` when under
/// [`ACCURACY_THRESHOLD`].
pub fn column_accuracy_ratio(column: &Value) -> (Option<AccuracyKind>, Option<f64>) {
    let total = lenient_int("valuesCount", column.get("valuesCount"));
    let (kind, count) = dominant_match(column);
    if total <= 0 {
        return (kind, None);
    }

    let ratio = count as f64 / total as f64;
    if ratio >= ACCURACY_THRESHOLD {
        (kind, Some(ratio))
    } else {
        (kind, Some(0.0))
    }
}
