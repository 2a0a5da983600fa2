use crate::foundation::error::{VeilError, VeilResult};

/// Format seconds as `MM:SS.cc` (centiseconds truncated).
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    let centis = ((seconds % 1.0) * 100.0).floor() as u64;
    format!("{mins:02}:{secs:02}.{centis:02}")
}

/// Parse `MM:SS` or `MM:SS.cc` into seconds. A bare number is read as seconds.
pub fn parse_time(s: &str) -> VeilResult<f64> {
    let s = s.trim();
    let Some((mins, rest)) = s.split_once(':') else {
        return s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| VeilError::validation(format!("invalid time \"{s}\"")));
    };

    let bad = || VeilError::validation(format!("invalid time \"{s}\" (expected MM:SS.cc)"));
    let mins = mins.parse::<u64>().map_err(|_| bad())?;
    let (secs, centis) = match rest.split_once('.') {
        Some((secs, centis)) => (secs, Some(centis)),
        None => (rest, None),
    };
    let secs = secs.parse::<u64>().map_err(|_| bad())?;
    if secs >= 60 {
        return Err(bad());
    }
    let centis = match centis {
        Some(c) if !c.is_empty() && c.len() <= 2 => c.parse::<u64>().map_err(|_| bad())?,
        Some(_) => return Err(bad()),
        None => 0,
    };

    Ok((mins * 60 + secs) as f64 + centis as f64 / 100.0)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/timecode.rs"]
mod tests;
