//! Unique stored-filename generation.

use chrono::Utc;

use super::sanitize::SafeName;

/// Build `base_<millis>_<hex>.ext` from a sanitized name.
///
/// Uniqueness is probabilistic; the writer refuses to overwrite an existing
/// file and asks for a fresh name instead.
pub fn unique_name(name: &SafeName) -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::random();

    match &name.extension {
        Some(ext) => format!("{}_{}_{:08x}.{}", name.base, millis, suffix, ext),
        None => format!("{}_{}_{:08x}", name.base, millis, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn safe(base: &str, ext: Option<&str>) -> SafeName {
        SafeName {
            base: base.to_string(),
            extension: ext.map(str::to_string),
        }
    }

    #[test]
    fn test_unique_name_format() {
        let name = unique_name(&safe("report", Some("pdf")));

        let stem = name.strip_suffix(".pdf").unwrap();
        let mut parts = stem.rsplitn(3, '_');
        let hex = parts.next().unwrap();
        let millis = parts.next().unwrap();
        let base = parts.next().unwrap();

        assert_eq!(base, "report");
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(hex.len(), 8);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_unique_name_without_extension() {
        let name = unique_name(&safe("notes", None));
        assert!(name.starts_with("notes_"));
        assert!(!name.contains('.'));
    }

    #[test]
    fn test_unique_name_differs_in_rapid_succession() {
        let name = safe("report", Some("pdf"));
        let first = unique_name(&name);
        let second = unique_name(&name);

        assert_ne!(first, second);
    }
}
