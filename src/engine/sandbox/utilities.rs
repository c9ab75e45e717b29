//! Pure helper capabilities: `random`, `data` and `time`.

use std::{cmp::Ordering, fmt::Write as _};

use chrono::{
    DateTime, Duration as ChronoDuration, NaiveDate, NaiveDateTime, SecondsFormat, Utc,
    format::{Item, StrftimeItems},
};
use rand::{Rng, distributions::Alphanumeric, seq::SliceRandom};
use rhai::{Array, Dynamic, Engine, ImmutableString, Map};

use super::capabilities::RhaiResult;
use crate::engine::rhai::conversions::{display_dynamic, dynamic_to_f64};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Upper bound on `random.string` lengths.
const MAX_RANDOM_STRING: usize = 1_048_576;

/// Script-facing `random` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomApi;

// Native functions must not panic: an unwinding panic inside a method call
// aborts the process.
fn random_number(min: f64, max: f64) -> RhaiResult<f64> {
    if !min.is_finite() || !max.is_finite() {
        return Err(format!("random.number: bounds must be finite, got {min} and {max}").into());
    }
    if min > max {
        return Err(format!("random.number: min {min} is greater than max {max}").into());
    }
    if min == max {
        return Ok(min);
    }
    Ok(rand::thread_rng().gen_range(min..max))
}

fn random_integer(min: i64, max: i64) -> RhaiResult<i64> {
    if min > max {
        return Err(format!("random.integer: min {min} is greater than max {max}").into());
    }
    Ok(rand::thread_rng().gen_range(min..=max))
}

fn random_string(length: i64) -> RhaiResult<String> {
    let length = usize::try_from(length)
        .ok()
        .filter(|length| *length <= MAX_RANDOM_STRING)
        .ok_or_else(|| format!("random.string: invalid length {length}"))?;
    Ok(rand::thread_rng().sample_iter(&Alphanumeric).take(length).map(char::from).collect())
}

/// A timestamp within the last year, as an RFC 3339 string.
fn random_date() -> String {
    let offset = rand::thread_rng().gen_range(0..365 * MILLIS_PER_DAY);
    (Utc::now() - ChronoDuration::milliseconds(offset)).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn register_random(engine: &mut Engine) {
    engine
        .register_type_with_name::<RandomApi>("Random")
        .register_fn("number", |_: RandomApi| rand::thread_rng().r#gen::<f64>())
        .register_fn("number", |_: RandomApi, min: Dynamic, max: Dynamic| {
            random_number(dynamic_to_f64(&min)?, dynamic_to_f64(&max)?)
        })
        .register_fn("integer", |_: RandomApi, min: i64, max: i64| random_integer(min, max))
        .register_fn("string", |_: RandomApi, length: i64| random_string(length))
        .register_fn("boolean", |_: RandomApi| rand::thread_rng().gen_bool(0.5))
        .register_fn("date", |_: RandomApi| random_date())
        .register_fn("pick", |_: RandomApi, items: Array| {
            items.choose(&mut rand::thread_rng()).cloned().unwrap_or(Dynamic::UNIT)
        });
}

/// Script-facing `data` object.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataApi;

fn key_list(keys: &Array) -> Vec<String> {
    keys.iter().map(display_dynamic).collect()
}

fn pick(source: Map, keys: Array) -> Map {
    let mut picked = Map::new();
    for key in key_list(&keys) {
        if let Some(value) = source.get(key.as_str()) {
            picked.insert(key.as_str().into(), value.clone());
        }
    }
    picked
}

fn omit(mut source: Map, keys: Array) -> Map {
    for key in key_list(&keys) {
        source.remove(key.as_str());
    }
    source
}

fn field_of(item: &Dynamic, key: &str) -> Option<Dynamic> {
    item.read_lock::<Map>().and_then(|map| map.get(key).cloned())
}

fn group_by(items: Array, key: &str) -> Map {
    let mut groups = Map::new();
    for item in items {
        let group = field_of(&item, key)
            .map(|value| display_dynamic(&value))
            .unwrap_or_else(|| "undefined".to_string());
        let entry = groups.entry(group.into()).or_insert_with(|| Dynamic::from_array(Array::new()));
        if let Some(mut bucket) = entry.write_lock::<Array>() {
            bucket.push(item);
        }
    }
    groups
}

/// Orders unit < booleans < numbers < strings < everything else.
fn rank(value: &Dynamic) -> u8 {
    if value.is_unit() {
        0
    } else if value.is_bool() {
        1
    } else if value.is_int() || value.is_float() {
        2
    } else if value.is_string() {
        3
    } else {
        4
    }
}

fn compare_dynamic(a: &Dynamic, b: &Dynamic) -> Ordering {
    match (rank(a), rank(b)) {
        (1, 1) => a.as_bool().unwrap_or(false).cmp(&b.as_bool().unwrap_or(false)),
        (2, 2) => {
            let (x, y) = (dynamic_to_f64(a).unwrap_or(0.0), dynamic_to_f64(b).unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (3, 3) => display_dynamic(a).cmp(&display_dynamic(b)),
        (x, y) => x.cmp(&y),
    }
}

fn sort_by(mut items: Array, key: &str, descending: bool) -> Array {
    items.sort_by(|a, b| {
        let (fa, fb) =
            (field_of(a, key).unwrap_or(Dynamic::UNIT), field_of(b, key).unwrap_or(Dynamic::UNIT));
        let ordering = compare_dynamic(&fa, &fb);
        if descending { ordering.reverse() } else { ordering }
    });
    items
}

pub(crate) fn register_data(engine: &mut Engine) {
    engine
        .register_type_with_name::<DataApi>("Data")
        .register_fn("clone", |_: DataApi, value: Dynamic| value.flatten_clone())
        .register_fn("pick", |_: DataApi, source: Map, keys: Array| pick(source, keys))
        .register_fn("omit", |_: DataApi, source: Map, keys: Array| omit(source, keys))
        .register_fn("group_by", |_: DataApi, items: Array, key: ImmutableString| {
            group_by(items, &key)
        })
        .register_fn("sort_by", |_: DataApi, items: Array, key: ImmutableString| {
            sort_by(items, &key, false)
        })
        .register_fn(
            "sort_by",
            |_: DataApi, items: Array, key: ImmutableString, descending: bool| {
                sort_by(items, &key, descending)
            },
        );
}

/// Script-facing `time` object. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeApi;

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reads a timestamp given as epoch milliseconds or a date string.
fn to_datetime(value: &Dynamic) -> RhaiResult<DateTime<Utc>> {
    let parsed = if value.is_string() {
        parse_text(&display_dynamic(value))
    } else {
        DateTime::from_timestamp_millis(dynamic_to_f64(value)? as i64)
    };
    parsed.ok_or_else(|| format!("Invalid date value: {}", display_dynamic(value)).into())
}

fn format_time(value: &Dynamic, pattern: &str) -> RhaiResult<String> {
    let datetime = to_datetime(value)?;
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(format!("Invalid time format '{pattern}'").into());
    }
    let mut out = String::new();
    write!(out, "{}", datetime.format(pattern))
        .map_err(|_| format!("Invalid time format '{pattern}'"))?;
    Ok(out)
}

fn add_days(value: &Dynamic, days: i64) -> RhaiResult<i64> {
    let datetime = to_datetime(value)?;
    let shifted = ChronoDuration::try_days(days)
        .and_then(|delta| datetime.checked_add_signed(delta))
        .ok_or_else(|| format!("Date out of range after adding {days} days"))?;
    Ok(shifted.timestamp_millis())
}

fn diff_days(from: &Dynamic, to: &Dynamic) -> RhaiResult<i64> {
    Ok((to_datetime(to)? - to_datetime(from)?).num_days())
}

pub(crate) fn register_time(engine: &mut Engine) {
    engine
        .register_type_with_name::<TimeApi>("Time")
        .register_fn("now", |_: TimeApi| Utc::now().timestamp_millis())
        .register_fn("parse", |_: TimeApi, text: ImmutableString| -> RhaiResult<i64> {
            parse_text(&text)
                .map(|datetime| datetime.timestamp_millis())
                .ok_or_else(|| format!("Invalid date value: {text}").into())
        })
        .register_fn("format", |_: TimeApi, value: Dynamic| -> RhaiResult<String> {
            Ok(to_datetime(&value)?.to_rfc3339_opts(SecondsFormat::Millis, true))
        })
        .register_fn("format", |_: TimeApi, value: Dynamic, pattern: ImmutableString| {
            format_time(&value, &pattern)
        })
        .register_fn("add_days", |_: TimeApi, value: Dynamic, days: i64| add_days(&value, days))
        .register_fn("diff_days", |_: TimeApi, from: Dynamic, to: Dynamic| diff_days(&from, &to));
}
