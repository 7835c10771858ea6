use std::{fmt::Debug, time::Duration};

use lazy_static::lazy_static;
use log::trace;
use regex::Regex;
use thiserror::Error;

/// Log if `Result` is an error
pub trait Logged {
    fn log(self) -> Self;
}

impl<T, E> Logged for Result<T, E>
where
    E: Debug,
{
    fn log(self) -> Self {
        if let Err(e) = &self {
            trace!("---TraceError--- {:#?}", e)
        }
        self
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0} is not a valid duration value")]
pub struct DurationError(pub String);

lazy_static! {
    static ref DURATION_RE: Regex = Regex::new(r"^([0-9]+)([a-z]*)$").unwrap();
}

/**
 * Parse duration strings like `5s`, `100ms` or `2m`, bare numbers are milliseconds
 */
pub fn str_to_dur(s: &str) -> Result<Duration, DurationError> {
    let caps = DURATION_RE
        .captures(s.trim())
        .ok_or_else(|| DurationError(s.to_owned()))?;
    let num: u64 = caps
        .get(1)
        .ok_or_else(|| DurationError(s.to_owned()))?
        .as_str()
        .parse()
        .map_err(|_| DurationError(s.to_owned()))?;
    let unit = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let secs = |factor: u64| {
        num.checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| DurationError(s.to_owned()))
    };
    match unit {
        "" | "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(num))
        }
        "s" | "sec" | "second" | "seconds" => secs(1),
        "m" | "min" | "minute" | "minutes" => secs(60),
        "h" | "hour" | "hours" => secs(3600),
        _ => Err(DurationError(s.to_owned())),
    }
}

/**
 * Format a duration with the largest unit that represents it exactly
 */
pub fn dur_to_string(d: Duration) -> String {
    let millis = d.as_millis();
    if millis == 0 {
        "0ms".to_string()
    } else if millis % 1000 != 0 {
        format!("{}ms", millis)
    } else if d.as_secs() % 60 != 0 {
        format!("{}s", d.as_secs())
    } else if d.as_secs() % 3600 != 0 {
        format!("{}m", d.as_secs() / 60)
    } else {
        format!("{}h", d.as_secs() / 3600)
    }
}

static LOGGER: std::sync::Once = std::sync::Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        dotenv::dotenv().ok();
        let modules = [
            "common_utils",
            "featureform_provider",
            "featureform_runner",
            "featureform_worker",
        ];
        let module_logs = modules
            .into_iter()
            .map(|m| format!("{}=debug", m))
            .collect::<Vec<_>>()
            .join(",");
        let rust_log = format!("info,{}", module_logs);
        if std::env::var_os("RUST_LOG").is_none() {
            std::env::set_var("RUST_LOG", &rust_log);
        }
        tracing_subscriber::fmt::init();
    });
}
