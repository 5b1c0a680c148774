//! Typed reads of `PHARMASYNC_*` settings.

/// Read `var` as a `T`, falling back to `default`.
///
/// An unset variable is the normal case and stays quiet. A value that does
/// not parse is logged at warn level so a typo in deployment config is visible.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    let Ok(raw) = std::env::var(var) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(var, value = %raw, default = %default, "Ignoring unparsable setting");
        default
    })
}
