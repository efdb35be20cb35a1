//! `like` pattern matching.

/// Match `text` against a SQL-style pattern where `%` stands for any run of
/// characters. Every other character matches itself. The whole text must
/// match.
#[must_use]
pub fn like_matches(pattern: &str, text: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        let pattern: Vec<char> = pattern.to_lowercase().chars().collect();
        let text: Vec<char> = text.to_lowercase().chars().collect();

        wildcard_match(&pattern, &text)
    } else {
        let pattern: Vec<char> = pattern.chars().collect();
        let text: Vec<char> = text.chars().collect();

        wildcard_match(&pattern, &text)
    }
}

/// Greedy matcher with single-point backtracking to the last `%`.
fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(expected) if text.get(t) == Some(expected) => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, consumed)) => {
                    p = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }

    pattern.get(p..).is_some_and(|rest| rest.iter().all(|c| *c == '%'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_matches_any_run() {
        assert!(like_matches("%barba%", "corte e barba", false));
        assert!(like_matches("corte%", "corte", false));
        assert!(like_matches("%", "", false));
        assert!(like_matches("c%e%a", "corte e barba", false));
    }

    #[test]
    fn pattern_is_anchored() {
        assert!(!like_matches("barba", "corte e barba", false));
        assert!(!like_matches("corte", "corte e barba", false));
    }

    #[test]
    fn underscore_is_literal() {
        assert!(like_matches("a_b", "a_b", false));
        assert!(!like_matches("a_b", "axb", false));
    }

    #[test]
    fn case_folding_only_for_ilike() {
        assert!(!like_matches("CORTE%", "corte", false));
        assert!(like_matches("CORTE%", "corte", true));
    }
}
