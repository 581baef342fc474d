//! Helpers available to every template.
//!
//! - `formatDate value [fmt]` → `03/05/2024`; `fmt` is a chrono pattern given
//!   positionally or as `fmt="%Y"`
//! - `yn value` → `Yes` / `No`
//! - `isYes value` → boolean, for `{{#if (isYes x)}}`
//! - `currency value` → `$1,234.50`, blank when not a number
//! - `join value... [sep=", "]` → every value flattened, blanks dropped
//!
//! Helpers check their arguments: an extra positional value or an unknown
//! hash key is a render error, never silently ignored.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use handlebars::{
    Context, Handlebars, Helper, HelperDef, RenderContext, RenderError, RenderErrorReason,
    ScopedJson,
};
use serde_json::Value;
use std::fmt::Write;

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";
pub const DEFAULT_JOIN_SEPARATOR: &str = ", ";

const AFFIRMATIVE: [&str; 6] = ["yes", "y", "true", "1", "on", "checked"];

pub fn register(registry: &mut Handlebars<'_>) {
    registry.register_helper("formatDate", Box::new(FormatDateHelper));
    registry.register_helper("join", Box::new(JoinHelper));
    registry.register_helper(
        "yn",
        Box::new(UnaryHelper {
            name: "yn",
            apply: |v| Value::from(if is_yes(v) { "Yes" } else { "No" }),
        }),
    );
    registry.register_helper(
        "isYes",
        Box::new(UnaryHelper {
            name: "isYes",
            apply: |v| Value::Bool(is_yes(v)),
        }),
    );
    registry.register_helper(
        "currency",
        Box::new(UnaryHelper {
            name: "currency",
            apply: |v| Value::String(currency(v)),
        }),
    );
}

/// Positional values of `h`, checked against `min..=max` and with every hash
/// key in `hash_keys`.
fn checked_params<'a>(
    h: &'a Helper<'_>,
    name: &'static str,
    (min, max): (usize, usize),
    hash_keys: &[&str],
) -> Result<Vec<&'a Value>, RenderError> {
    let count = h.params().len();
    if count < min {
        return Err(RenderErrorReason::ParamNotFoundForIndex(name, count).into());
    }
    if count > max {
        return Err(RenderErrorReason::Other(format!(
            "helper {name} takes at most {max} argument(s), got {count}"
        ))
        .into());
    }
    if let Some(key) = h.hash().keys().find(|k| !hash_keys.contains(k)) {
        return Err(RenderErrorReason::Other(format!(
            "helper {name} has no option '{key}'"
        ))
        .into());
    }
    Ok(h.params().iter().map(|p| p.value()).collect())
}

fn str_option<'a>(
    name: &'static str,
    key: &str,
    value: &'a Value,
) -> Result<&'a str, RenderError> {
    value.as_str().ok_or_else(|| {
        RenderErrorReason::HashTypeMismatchForName(name, key.to_string(), "str".to_string()).into()
    })
}

/// A helper over exactly one value.
struct UnaryHelper {
    name: &'static str,
    apply: fn(&Value) -> Value,
}

impl HelperDef for UnaryHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let params = checked_params(h, self.name, (1, 1), &[])?;
        Ok(ScopedJson::Derived((self.apply)(params[0])))
    }
}

struct FormatDateHelper;

impl HelperDef for FormatDateHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let params = checked_params(h, "formatDate", (1, 2), &["fmt"])?;
        let hashed = h.hash_get("fmt").map(|p| p.value());
        let fmt = match (params.get(1).copied(), hashed) {
            (Some(_), Some(_)) => {
                return Err(RenderErrorReason::Other(
                    "helper formatDate got fmt both positionally and as fmt=".to_string(),
                )
                .into())
            }
            (Some(fmt), None) | (None, Some(fmt)) => str_option("formatDate", "fmt", fmt)?,
            (None, None) => DEFAULT_DATE_FORMAT,
        };
        Ok(ScopedJson::Derived(Value::String(format_date(params[0], fmt))))
    }
}

struct JoinHelper;

impl HelperDef for JoinHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let params = checked_params(h, "join", (1, usize::MAX), &["sep"])?;
        let sep = match h.hash_get("sep") {
            Some(sep) => str_option("join", "sep", sep.value())?,
            None => DEFAULT_JOIN_SEPARATOR,
        };
        Ok(ScopedJson::Derived(Value::String(join_all(&params, sep))))
    }
}

/// Affirmative answers: `yes`, `y`, `true`, `1`, `on`, `checked` in any case,
/// boolean `true` and the number `1`. Anything else is a no.
pub fn is_yes(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => {
            let s = s.trim();
            AFFIRMATIVE.iter().any(|token| s.eq_ignore_ascii_case(token))
        }
        _ => false,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Format a date-ish value. Numbers are epoch milliseconds. Values that do
/// not parse are printed as given, blanks stay blank.
pub fn format_date(value: &Value, fmt: &str) -> String {
    let (raw, parsed) = match value {
        Value::String(s) if s.trim().is_empty() => return String::new(),
        Value::String(s) => (s.clone(), parse_date(s.trim())),
        Value::Number(n) => (
            n.to_string(),
            n.as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| dt.naive_utc()),
        ),
        _ => return String::new(),
    };

    let Some(parsed) = parsed else { return raw };
    let mut out = String::new();
    // chrono reports unknown specifiers through fmt::Error
    if write!(out, "{}", parsed.format(fmt)).is_err() {
        return raw;
    }
    out
}

fn parse_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    amount.filter(|n| n.is_finite())
}

/// `$1,234.50`; negative amounts keep their sign in front of the `$`.
pub fn currency(value: &Value) -> String {
    let Some(amount) = parse_amount(value) else {
        return String::new();
    };

    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}

fn flatten_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_into(item, out)),
        Value::String(s) if s.trim().is_empty() => {}
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Null | Value::Object(_) => {}
    }
}

pub fn join(value: &Value, sep: &str) -> String {
    join_all(&[value], sep)
}

/// Every value flattened into one list, blanks dropped.
pub fn join_all(values: &[&Value], sep: &str) -> String {
    let mut parts = Vec::new();
    for value in values {
        flatten_into(value, &mut parts);
    }
    parts.join(sep)
}
