/// Matches a request origin against the configured allow-list.
///
/// Entries are exact origins, `*` (any origin, including none), or
/// `*.suffix`, which admits any origin ending in `suffix`.
pub fn is_origin_allowed(origin: Option<&str>, allowed: &[String]) -> bool {
    if allowed.iter().any(|entry| entry == "*") {
        return true;
    }

    let Some(origin) = origin else {
        return false;
    };

    allowed.iter().any(|entry| match entry.strip_prefix("*.") {
        Some(suffix) => origin.ends_with(suffix),
        None => entry == origin,
    })
}
