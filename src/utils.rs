//! Small string helpers shared by the registry, settings store and dispatcher.
//!
//! Config names, variant filenames, bang names and settings keys all compare
//! case-insensitively, and config names always use `\` as their separator no
//! matter which platform the skin tree lives on.

use camino::{Utf8Path, Utf8PathBuf};

/// Separator used inside config names (`Vendor\Clock`).
pub const NAME_SEPARATOR: char = '\\';

/// Case-insensitive string equality (full Unicode lowercase mapping).
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive prefix test.
pub fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    let mut hay = haystack.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| hay.next() == Some(p))
}

/// Normalize both separator styles to `/` for path-string comparisons.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Join a config name (`Vendor\Clock`) onto a filesystem root.
pub fn config_dir(root: &Utf8Path, config_name: &str) -> Utf8PathBuf {
    let mut dir = root.to_path_buf();
    for part in config_name.split(NAME_SEPARATOR).filter(|p| !p.is_empty()) {
        dir.push(part);
    }
    dir
}

/// Expand `%NAME%` references from the process environment.
///
/// Unknown variables are left untouched, including their percent signs.
pub fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Format a number the way computed settings values are written: five
/// decimals, then trailing zeros (and a dangling point) trimmed.
pub fn format_trimmed(value: f64) -> String {
    let mut text = format!("{value:.5}");
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_ignore_case() {
        assert!(eq_ignore_case("Vendor\\Clock", "vendor\\CLOCK"));
        assert!(eq_ignore_case("Ärger", "ärger"));
        assert!(!eq_ignore_case("Clock", "Clocks"));
    }

    #[test]
    fn test_starts_with_ignore_case() {
        assert!(starts_with_ignore_case("MeasuresTab", "measures"));
        assert!(!starts_with_ignore_case("Meas", "Measures"));
        assert!(starts_with_ignore_case("anything", ""));
    }

    #[test]
    fn test_config_dir_splits_name() {
        let dir = config_dir(Utf8Path::new("/skins"), "Vendor\\Clock");
        assert_eq!(dir, Utf8PathBuf::from("/skins/Vendor/Clock"));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test-only environment mutation with a unique name
        unsafe { std::env::set_var("SKINHOST_TEST_EXPAND", "C:/Users/me") };
        assert_eq!(
            expand_env_vars("%SKINHOST_TEST_EXPAND%/Skins"),
            "C:/Users/me/Skins"
        );
        assert_eq!(
            expand_env_vars("%SKINHOST_SURELY_UNSET%/x"),
            "%SKINHOST_SURELY_UNSET%/x"
        );
        assert_eq!(expand_env_vars("100%"), "100%");
    }

    #[test]
    fn test_format_trimmed() {
        assert_eq!(format_trimmed(42.0), "42");
        assert_eq!(format_trimmed(0.5), "0.5");
        assert_eq!(format_trimmed(1.234567), "1.23457");
        assert_eq!(format_trimmed(-0.000001), "0");
    }
}
