use regex_lite::Regex;
use std::sync::OnceLock;

/// Lowercase a room name into a URL-safe slug: strip everything outside
/// word characters, spaces and hyphens, then collapse runs of either to
/// a single hyphen.
pub fn slugify(name: &str) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    static COLLAPSE: OnceLock<Regex> = OnceLock::new();

    let strip = STRIP.get_or_init(|| Regex::new(r"[^\w\s-]").unwrap());
    let collapse = COLLAPSE.get_or_init(|| Regex::new(r"[-\s]+").unwrap());

    let lower = name.trim().to_lowercase();
    let stripped = strip.replace_all(&lower, "");
    let slug = collapse
        .replace_all(&stripped, "-")
        .trim_matches('-')
        .to_string();

    if slug.is_empty() {
        "room".to_string()
    } else {
        slug
    }
}

/// Find a slug not yet taken by appending an incrementing numeric suffix.
pub async fn unique_slug(db: &sqlx::SqlitePool, name: &str) -> Result<String, sqlx::Error> {
    let base = slugify(name);
    let mut slug = base.clone();
    let mut counter = 1;

    loop {
        let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rooms WHERE slug = ?")
            .bind(&slug)
            .fetch_one(db)
            .await?;
        if taken == 0 {
            return Ok(slug);
        }
        slug = format!("{}-{}", base, counter);
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("General Chat"), "general-chat");
        assert_eq!(slugify("  Rust   Lounge  "), "rust-lounge");
    }

    #[test]
    fn strips_punctuation() {
        assert_eq!(slugify("Let's talk! (now)"), "lets-talk-now");
    }

    #[test]
    fn empty_result_falls_back() {
        assert_eq!(slugify("!!!"), "room");
    }
}
