/// Next coarser scope of `candidate`, or `None` when it is already a bare path.
///
/// Drops the last `&`-suffix first; once no `&` is left, drops everything
/// from the first `?`. The result is always strictly shorter than the input.
pub fn narrow(candidate: &str) -> Option<&str> {
    if let Some(idx) = candidate.rfind('&') {
        Some(&candidate[..idx])
    } else {
        candidate.find('?').map(|idx| &candidate[..idx])
    }
}

/// Walks an identifier from most to least specific scope.
///
/// ```
/// use warden::authz::hierarchy::ScopeWalk;
///
/// let scopes: Vec<&str> = ScopeWalk::new("/reports?dept=eng&year=2024").collect();
/// assert_eq!(scopes, ["/reports?dept=eng&year=2024", "/reports?dept=eng", "/reports"]);
/// ```
#[derive(Debug, Clone)]
pub struct ScopeWalk<'a> {
    next: Option<&'a str>,
}

impl<'a> ScopeWalk<'a> {
    pub fn new(identifier: &'a str) -> Self {
        Self {
            next: Some(identifier),
        }
    }
}

impl<'a> Iterator for ScopeWalk<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = narrow(current);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            // every step removes at least one byte
            Some(s) => (1, Some(s.len() + 1)),
            None => (0, Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_drops_last_ampersand_suffix() {
        assert_eq!(narrow("/a?x=1&y=2&z=3"), Some("/a?x=1&y=2"));
        assert_eq!(narrow("/a?x=1&y=2"), Some("/a?x=1"));
    }

    #[test]
    fn test_narrow_drops_query_once_no_ampersand() {
        assert_eq!(narrow("/a?x=1"), Some("/a"));
    }

    #[test]
    fn test_narrow_bare_path_has_no_parent() {
        assert_eq!(narrow("/a/b"), None);
        assert_eq!(narrow(""), None);
    }

    #[test]
    fn test_narrow_uses_first_question_mark() {
        assert_eq!(narrow("/a?x=what?"), Some("/a"));
    }

    #[test]
    fn test_walk_order() {
        let scopes: Vec<&str> = ScopeWalk::new("/reports?dept=eng&year=2024").collect();
        assert_eq!(
            scopes,
            vec!["/reports?dept=eng&year=2024", "/reports?dept=eng", "/reports"]
        );
    }

    #[test]
    fn test_walk_bare_path_single_step() {
        let scopes: Vec<&str> = ScopeWalk::new("/reports").collect();
        assert_eq!(scopes, vec!["/reports"]);
    }

    #[test]
    fn test_walk_terminates_within_length_bound() {
        let inputs = [
            "",
            "&&&&",
            "????",
            "a?&?&?&",
            "/x?a=1&b=2&c=3&d=4&e=5",
            "&?&?",
        ];
        for input in inputs {
            let steps = ScopeWalk::new(input).count();
            assert!(steps <= input.len() + 1, "{input:?} took {steps} steps");
        }
    }

    #[test]
    fn test_walk_strictly_shrinks() {
        let scopes: Vec<&str> = ScopeWalk::new("/p?a=1&b=2&&c=3").collect();
        for pair in scopes.windows(2) {
            assert!(pair[1].len() < pair[0].len());
        }
    }
}
