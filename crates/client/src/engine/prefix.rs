//! Longest-prefix matching over fallback namespaces.

/// Longest candidate that `path` starts with.
///
/// Among candidates of equal length the first one yielded wins; callers that
/// need a different tie-break compare lengths themselves.
pub fn longest_prefix<'a, I>(path: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut best: Option<&'a str> = None;
    for candidate in candidates {
        if !path.starts_with(candidate.as_str()) {
            continue;
        }
        if best.is_none_or(|b| candidate.len() > b.len()) {
            best = Some(candidate.as_str());
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_longest_wins() {
        let keys = set(&["/a", "/ab", "/abc/x"]);
        assert_eq!(longest_prefix("/abcdef", &keys), Some("/ab"));
    }

    #[test]
    fn test_no_match() {
        let keys = set(&["/img/", "/css/"]);
        assert_eq!(longest_prefix("/js/app.js", &keys), None);
        assert_eq!(longest_prefix("/img", &keys), None);
    }

    #[test]
    fn test_empty_candidates() {
        let keys = set(&[]);
        assert_eq!(longest_prefix("/anything", &keys), None);
    }

    #[test]
    fn test_exact_match_counts_as_prefix() {
        let keys = set(&["/img/", "/img/photo.jpg"]);
        assert_eq!(longest_prefix("/img/photo.jpg", &keys), Some("/img/photo.jpg"));
    }

    #[test]
    fn test_empty_prefix_matches_everything() {
        let keys = set(&[""]);
        assert_eq!(longest_prefix("/x", &keys), Some(""));
    }

    #[test]
    fn test_result_is_longest_member_prefix() {
        let keys = set(&["https://app.test/", "https://app.test/img/", "https://app.test/img/a", "https://cdn.test/"]);
        let paths = [
            "https://app.test/img/a/b.png",
            "https://app.test/img/b.png",
            "https://app.test/index.html",
            "https://cdn.test/x",
            "https://other.test/",
        ];
        for path in paths {
            let got = longest_prefix(path, &keys);
            let expected = keys
                .iter()
                .filter(|k| path.starts_with(k.as_str()))
                .map(|k| k.len())
                .max();
            assert_eq!(got.map(str::len), expected, "path {path}");
            if let Some(key) = got {
                assert!(keys.contains(key));
                assert!(path.starts_with(key));
            }
        }
    }
}
