//! Duration formatting for log output.

/// Render a duration in seconds as compound units, e.g. `2d 3h 0m 5s`.
///
/// Leading zero units are omitted; once a unit is printed every smaller unit
/// follows so that values line up when scanning logs.
pub fn format_duration(secs: u64) -> String {
    const UNITS: [(u64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

    let mut rest = secs;
    let mut parts = Vec::new();
    for (size, suffix) in UNITS {
        let count = rest / size;
        rest %= size;
        if count > 0 || !parts.is_empty() || size == 1 {
            parts.push(format!("{count}{suffix}"));
        }
    }
    parts.join(" ")
}
