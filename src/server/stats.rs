//! The `/stats/report` endpoint: staff moderation statistics ingestion.
//!
//! The addon ships several generations of reporters, so this endpoint is
//! deliberately tolerant about transport and field naming:
//!
//! - the payload may arrive as a JSON body or as a multipart upload whose
//!   file part is a `statistics.json`
//! - the record may be the payload itself or nested under `current`
//! - field names may be English (`date`, `bans`, `mutes`, `total`) or
//!   Russian (`Дата`, `Банов`, `Мутов`, `Всего`)
//! - counts may be JSON numbers or numeric strings
//!
//! Unusable payloads are acknowledged with an `ignored` status rather than an
//! HTTP error; reporters in the field do not retry and an error would only
//! surface as addon-side noise. Accepted reports upsert one row keyed on
//! `(staff, date)`.

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::server::handlers::AppState;

/// Maximum accepted report body, in bytes.
const MAX_REPORT_BYTES: usize = 1024 * 1024;

/// Response body for `POST /stats/report`. Always delivered with HTTP 200.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl StatsResponse {
    fn ok() -> Self {
        Self {
            status: "ok",
            reason: None,
        }
    }

    fn ignored(reason: &'static str) -> Self {
        Self {
            status: "ignored",
            reason: Some(reason),
        }
    }

    fn error() -> Self {
        Self {
            status: "error",
            reason: None,
        }
    }
}

/// A fully parsed statistics report, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsReport {
    pub staff: String,
    pub date: String,
    pub bans: i64,
    pub mutes: i64,
    pub total: i64,
}

/// Why a payload was not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    InvalidNumbers,
    NoDate,
}

impl IgnoreReason {
    fn as_str(self) -> &'static str {
        match self {
            IgnoreReason::InvalidNumbers => "invalid numbers",
            IgnoreReason::NoDate => "no date",
        }
    }
}

/// Handler for `POST /stats/report`.
pub async fn report_stats_handler(State(state): State<AppState>, req: Request) -> Json<StatsResponse> {
    let payload = extract_payload(req).await;

    let report = match parse_stats_report(&payload) {
        Ok(report) => report,
        Err(reason) => {
            debug!("Stats report ignored: {}", reason.as_str());
            return Json(StatsResponse::ignored(reason.as_str()));
        }
    };

    match state
        .db
        .upsert_staff_stats(
            &report.staff,
            &report.date,
            report.bans,
            report.mutes,
            report.total,
        )
        .await
    {
        Ok(()) => {
            debug!(
                "Stats saved: staff={} date={} bans={} mutes={} total={}",
                report.staff, report.date, report.bans, report.mutes, report.total
            );
            Json(StatsResponse::ok())
        }
        Err(e) => {
            warn!("Failed to save stats report: {e}");
            Json(StatsResponse::error())
        }
    }
}

/// Pull a JSON value out of the request, whatever the transport.
///
/// Multipart uploads win their payload from the first file part that parses
/// as JSON; plain text parts are collected as string fields alongside it.
/// Anything else is treated as a raw JSON body. Unparseable input degrades to
/// `Value::Null`, which the parser then ignores for lack of a date.
async fn extract_payload(req: Request) -> Value {
    let is_multipart = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let Ok(multipart) = Multipart::from_request(req, &()).await else {
            return Value::Null;
        };
        return extract_multipart_payload(multipart).await;
    }

    let Ok(bytes) = axum::body::to_bytes(req.into_body(), MAX_REPORT_BYTES).await else {
        return Value::Null;
    };

    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

async fn extract_multipart_payload(mut multipart: Multipart) -> Value {
    let mut file_json: Option<Value> = None;
    let mut fields = Map::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_string);
        let is_file = field.file_name().is_some();

        let Ok(bytes) = field.bytes().await else {
            continue;
        };

        if is_file {
            if file_json.is_none() {
                if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
                    file_json = Some(value);
                }
            }
        } else if let (Some(name), Ok(text)) = (name, String::from_utf8(bytes.to_vec())) {
            fields.insert(name, Value::String(text));
        }
    }

    match file_json {
        // Text fields (e.g. a staff nickname sent alongside the upload)
        // supplement the file payload without overriding it.
        Some(Value::Object(mut obj)) => {
            for (name, value) in fields {
                obj.entry(name).or_insert(value);
            }
            Value::Object(obj)
        }
        Some(other) => other,
        None if !fields.is_empty() => Value::Object(fields),
        None => Value::Null,
    }
}

/// Interpret a tolerant payload into a concrete report.
///
/// Check order matches the reporter contract: unparseable counts are reported
/// as `invalid numbers` even when the date is also missing.
pub fn parse_stats_report(data: &Value) -> Result<StatsReport, IgnoreReason> {
    let staff = ["staff", "staffNickname", "nickname", "player"]
        .iter()
        .find_map(|k| data.get(*k).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .unwrap_or("UNKNOWN")
        .to_string();

    // Whole statistics.json uploads nest the day's record under `current`.
    let current = match data.get("current") {
        Some(nested) if nested.is_object() => nested,
        _ => data,
    };

    let bans = lenient_count(field(current, "bans", "Банов"))
        .map_err(|_| IgnoreReason::InvalidNumbers)?
        .unwrap_or(0);
    let mutes = lenient_count(field(current, "mutes", "Мутов"))
        .map_err(|_| IgnoreReason::InvalidNumbers)?
        .unwrap_or(0);
    let total = lenient_count(field(current, "total", "Всего"))
        .map_err(|_| IgnoreReason::InvalidNumbers)?
        .unwrap_or(bans + mutes);

    let date = field(current, "date", "Дата")
        .and_then(date_string)
        .ok_or(IgnoreReason::NoDate)?;

    Ok(StatsReport {
        staff,
        date,
        bans,
        mutes,
        total,
    })
}

/// Look up a field by its English name, falling back to the Russian alias.
fn field<'a>(record: &'a Value, en: &str, ru: &str) -> Option<&'a Value> {
    record.get(en).or_else(|| record.get(ru))
}

/// A date is any non-empty string, or a bare number rendered as one.
fn date_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Lenient count parsing: absent, null, and empty-string values are "no
/// value"; numbers are truncated to integers; numeric strings parse; anything
/// else is a reporter bug worth rejecting.
fn lenient_count(value: Option<&Value>) -> Result<Option<i64>, ()> {
    let Some(value) = value else {
        return Ok(None);
    };

    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or(()),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => s.parse::<i64>().map(Some).map_err(|_| ()),
        Value::Bool(b) => Ok(Some(i64::from(*b))),
        _ => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_flat_english_report() {
        let report = parse_stats_report(&json!({
            "staff": "alice",
            "date": "2024-11-02",
            "bans": 3,
            "mutes": 2
        }))
        .unwrap();

        assert_eq!(report.staff, "alice");
        assert_eq!(report.date, "2024-11-02");
        assert_eq!(report.bans, 3);
        assert_eq!(report.mutes, 2);
        assert_eq!(report.total, 5);
    }

    #[test]
    fn parses_russian_field_names() {
        let report = parse_stats_report(&json!({
            "staffNickname": "boris",
            "Дата": "02.11.2024",
            "Банов": "4",
            "Мутов": "1",
            "Всего": "5"
        }))
        .unwrap();

        assert_eq!(report.staff, "boris");
        assert_eq!(report.date, "02.11.2024");
        assert_eq!(report.bans, 4);
        assert_eq!(report.mutes, 1);
        assert_eq!(report.total, 5);
    }

    #[test]
    fn unwraps_current_record() {
        let report = parse_stats_report(&json!({
            "player": "carol",
            "current": {
                "date": "2024-11-03",
                "bans": 7
            },
            "history": []
        }))
        .unwrap();

        assert_eq!(report.staff, "carol");
        assert_eq!(report.date, "2024-11-03");
        assert_eq!(report.bans, 7);
        assert_eq!(report.total, 7);
    }

    #[test]
    fn missing_staff_falls_back_to_unknown() {
        let report = parse_stats_report(&json!({
            "date": "2024-11-04",
            "bans": 1,
            "mutes": 0
        }))
        .unwrap();

        assert_eq!(report.staff, "UNKNOWN");
    }

    #[test]
    fn total_defaults_to_bans_plus_mutes() {
        let report = parse_stats_report(&json!({
            "staff": "dave",
            "date": "2024-11-05",
            "bans": "2",
            "mutes": 3,
            "total": null
        }))
        .unwrap();

        assert_eq!(report.total, 5);
    }

    #[test]
    fn missing_date_is_ignored() {
        let err = parse_stats_report(&json!({
            "staff": "erin",
            "bans": 2
        }))
        .unwrap_err();

        assert_eq!(err, IgnoreReason::NoDate);
    }

    #[test]
    fn empty_date_is_ignored() {
        let err = parse_stats_report(&json!({
            "staff": "erin",
            "date": "",
            "bans": 2
        }))
        .unwrap_err();

        assert_eq!(err, IgnoreReason::NoDate);
    }

    #[test]
    fn unparseable_counts_are_ignored() {
        let err = parse_stats_report(&json!({
            "staff": "frank",
            "date": "2024-11-06",
            "bans": "many"
        }))
        .unwrap_err();

        assert_eq!(err, IgnoreReason::InvalidNumbers);
    }

    #[test]
    fn invalid_numbers_reported_before_missing_date() {
        let err = parse_stats_report(&json!({
            "bans": "many"
        }))
        .unwrap_err();

        assert_eq!(err, IgnoreReason::InvalidNumbers);
    }

    #[test]
    fn null_payload_is_ignored_for_lack_of_date() {
        let err = parse_stats_report(&Value::Null).unwrap_err();
        assert_eq!(err, IgnoreReason::NoDate);
    }

    #[test]
    fn empty_string_counts_read_as_zero() {
        let report = parse_stats_report(&json!({
            "staff": "gina",
            "date": "2024-11-07",
            "bans": "",
            "mutes": ""
        }))
        .unwrap();

        assert_eq!(report.bans, 0);
        assert_eq!(report.mutes, 0);
        assert_eq!(report.total, 0);
    }

    #[test]
    fn float_counts_truncate() {
        let report = parse_stats_report(&json!({
            "staff": "hugo",
            "date": "2024-11-08",
            "bans": 3.9
        }))
        .unwrap();

        assert_eq!(report.bans, 3);
    }

    #[test]
    fn numeric_date_is_rendered_as_string() {
        let report = parse_stats_report(&json!({
            "staff": "ivan",
            "date": 20241109,
            "bans": 1
        }))
        .unwrap();

        assert_eq!(report.date, "20241109");
    }

    #[test]
    fn stats_response_serialization() {
        assert_eq!(
            serde_json::to_string(&StatsResponse::ok()).unwrap(),
            r#"{"status":"ok"}"#
        );
        assert_eq!(
            serde_json::to_string(&StatsResponse::ignored("no date")).unwrap(),
            r#"{"status":"ignored","reason":"no date"}"#
        );
        assert_eq!(
            serde_json::to_string(&StatsResponse::error()).unwrap(),
            r#"{"status":"error"}"#
        );
    }
}
