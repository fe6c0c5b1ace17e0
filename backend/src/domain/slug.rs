//! Slug generation for projects, roles and statuses.

/// Lowercase, ASCII-transliterated, hyphen-joined form of `text`.
///
/// # Examples
/// ```
/// use tracker_backend::domain::slugify;
///
/// assert_eq!(slugify("test-漢字"), "test-han-zi");
/// assert_eq!(slugify("  Ready for Test "), "ready-for-test");
/// ```
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// Candidate slugs for `base`: `base`, then `base-1`, `base-2`, ...
///
/// Callers take the first candidate that is not in use.
pub fn slug_candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_owned()).chain((1_u32..).map(move |n| format!("{base}-{n}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("test-漢字", "test-han-zi")]
    #[case("Ada Lovelace's Project", "ada-lovelace-s-project")]
    #[case("already-a-slug", "already-a-slug")]
    fn slugify_transliterates_and_joins(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[rstest]
    fn candidates_append_increasing_suffixes() {
        let first: Vec<_> = slug_candidates("demo").take(3).collect();
        assert_eq!(first, ["demo", "demo-1", "demo-2"]);
    }
}
