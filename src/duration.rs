//! Parsing and formatting of countdown lengths entered by the operator

use crate::error::CountdownError;

const FORMAT_HINT: &str = "use a number of seconds or forms like 25m, 30s, 1m30s";

/// Parse a countdown length into whole seconds.
///
/// A bare number is taken as seconds. Otherwise the input is a sequence of
/// `<number>m` / `<number>s` parts, e.g. `1m30s`.
pub fn parse_duration(input: &str) -> Result<u64, CountdownError> {
    let trimmed = input.trim().to_lowercase();
    let invalid = |reason| CountdownError::invalid_duration(input.trim(), reason);

    if trimmed.is_empty() {
        return Err(invalid(FORMAT_HINT));
    }

    if let Ok(seconds) = trimmed.parse::<u64>() {
        if seconds == 0 {
            return Err(invalid("duration must be greater than 0"));
        }
        return Ok(seconds);
    }

    let mut total_seconds = 0u64;
    let mut current_number = String::new();

    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            current_number.push(ch);
        } else if ch == 'm' || ch == 's' {
            if current_number.is_empty() {
                return Err(invalid(FORMAT_HINT));
            }
            let number: u64 = current_number
                .parse()
                .map_err(|_| invalid("number in duration is too large"))?;
            let seconds = match ch {
                'm' => number.checked_mul(60),
                _ => Some(number),
            };
            total_seconds = seconds
                .and_then(|s| total_seconds.checked_add(s))
                .ok_or_else(|| invalid("duration is too large"))?;
            current_number.clear();
        } else if !ch.is_whitespace() {
            return Err(invalid(FORMAT_HINT));
        }
    }

    if !current_number.is_empty() {
        return Err(invalid("duration must end with 'm' (minutes) or 's' (seconds)"));
    }

    if total_seconds == 0 {
        return Err(invalid("duration must be greater than 0"));
    }

    Ok(total_seconds)
}

pub fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let remaining_seconds = seconds % 60;
    let plural = |n: u64| if n == 1 { "" } else { "s" };

    if minutes > 0 && remaining_seconds > 0 {
        format!(
            "{} minute{} {} second{}",
            minutes,
            plural(minutes),
            remaining_seconds,
            plural(remaining_seconds)
        )
    } else if minutes > 0 {
        format!("{} minute{}", minutes, plural(minutes))
    } else {
        format!("{} second{}", remaining_seconds, plural(remaining_seconds))
    }
}
