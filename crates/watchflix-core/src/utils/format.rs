/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(d) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        d.format("%b %d, %Y").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Runtime in minutes as "2h 16m"
pub fn format_duration(minutes: Option<i32>) -> String {
    match minutes {
        Some(m) if m > 0 => {
            let (h, m) = (m / 60, m % 60);
            match (h, m) {
                (0, m) => format!("{}m", m),
                (h, 0) => format!("{}h", h),
                (h, m) => format!("{}h {}m", h, m),
            }
        }
        _ => "-".to_string(),
    }
}

/// Star rating out of 5, or "unrated"
pub fn format_rating(rating: Option<f64>) -> String {
    match rating {
        Some(r) => format!("{:.1}/5", r),
        None => "unrated".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Amélie Poulain", 9), "Amélie...");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-11-02T10:00:00Z"), "Nov 02, 2024");
        assert_eq!(format_date("1999-03-31"), "Mar 31, 1999");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(136)), "2h 16m");
        assert_eq!(format_duration(Some(120)), "2h");
        assert_eq!(format_duration(Some(45)), "45m");
        assert_eq!(format_duration(None), "-");
    }

    #[test]
    fn test_format_rating() {
        assert_eq!(format_rating(Some(4.27)), "4.3/5");
        assert_eq!(format_rating(Some(3.0)), "3.0/5");
        assert_eq!(format_rating(None), "unrated");
    }
}
