//! Page range expressions
//!
//! Parses strings such as `"1-3,5,7-9"` into a sorted list of 1-based page
//! numbers, validated against the document's page count.

use std::collections::BTreeSet;

use thiserror::Error;

/// Why a page range expression was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// A bound is not an integer
    #[error("'{token}' is not a page number (document has {max_pages} pages)")]
    NotANumber { token: String, max_pages: u32 },

    /// A bound is below 1
    #[error("page {page} violates the lower bound: pages start at 1 (document has {max_pages} pages)")]
    BelowLowerBound { page: i64, max_pages: u32 },

    /// A bound is past the last page
    #[error("page {page} violates the upper bound: the document has only {max_pages} pages")]
    AboveUpperBound { page: i64, max_pages: u32 },
}

/// Parse a page range expression into ascending, unique page numbers.
///
/// Whitespace is ignored and empty tokens are skipped, so `" 1, 3 ,"` is
/// accepted. Reversed ranges like `"5-2"` are swapped. The literal `all` is
/// not handled here; see [`select_pages`].
///
/// # Example
///
/// ```
/// use pdf_studio::pages::parse_page_ranges;
///
/// let pages = parse_page_ranges("1-3,5,7-9", 10).unwrap();
/// assert_eq!(pages, vec![1, 2, 3, 5, 7, 8, 9]);
/// ```
pub fn parse_page_ranges(spec: &str, max_pages: u32) -> Result<Vec<u32>, RangeError> {
    let compact: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
    let mut pages = BTreeSet::new();

    for token in compact.split(',').filter(|t| !t.is_empty()) {
        match token.split_once('-') {
            Some((start, end)) => {
                let mut a = parse_bound(start, max_pages)?;
                let mut b = parse_bound(end, max_pages)?;
                if a > b {
                    std::mem::swap(&mut a, &mut b);
                }
                check_bounds(a, b, max_pages)?;
                // Both bounds are within 1..=max_pages here
                pages.extend(a as u32..=b as u32);
            }
            None => {
                let p = parse_bound(token, max_pages)?;
                check_bounds(p, p, max_pages)?;
                pages.insert(p as u32);
            }
        }
    }

    Ok(pages.into_iter().collect())
}

/// Resolve a page selection, treating `all` (any case) as every page.
pub fn select_pages(spec: &str, max_pages: u32) -> Result<Vec<u32>, RangeError> {
    if is_all(spec) {
        return Ok((1..=max_pages).collect());
    }
    parse_page_ranges(spec, max_pages)
}

/// Whether the expression is the literal `all`
pub fn is_all(spec: &str) -> bool {
    spec.trim().eq_ignore_ascii_case("all")
}

fn parse_bound(token: &str, max_pages: u32) -> Result<i64, RangeError> {
    token.parse::<i64>().map_err(|_| RangeError::NotANumber {
        token: token.to_string(),
        max_pages,
    })
}

fn check_bounds(low: i64, high: i64, max_pages: u32) -> Result<(), RangeError> {
    if low < 1 {
        return Err(RangeError::BelowLowerBound { page: low, max_pages });
    }
    if high > i64::from(max_pages) {
        return Err(RangeError::AboveUpperBound { page: high, max_pages });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mixed_ranges() {
        assert_eq!(parse_page_ranges("1-3,5,7-9", 10).unwrap(), vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_reversed_range_is_swapped() {
        assert_eq!(parse_page_ranges("5-2", 10).unwrap(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_whitespace_and_empty_tokens() {
        assert_eq!(parse_page_ranges(" ,1 , 3- 4,,", 5).unwrap(), vec![1, 3, 4]);
        assert!(parse_page_ranges("", 5).unwrap().is_empty());
        assert!(parse_page_ranges(" , ", 5).unwrap().is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        assert_eq!(parse_page_ranges("3,1-3,2", 5).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_upper_bound_names_max() {
        let err = parse_page_ranges("11", 10).unwrap_err();
        assert_eq!(err, RangeError::AboveUpperBound { page: 11, max_pages: 10 });
        let msg = err.to_string();
        assert!(msg.contains("upper bound"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn test_lower_bound() {
        let err = parse_page_ranges("0", 10).unwrap_err();
        assert!(matches!(err, RangeError::BelowLowerBound { page: 0, .. }));
        assert!(err.to_string().contains("lower bound"));
    }

    #[test]
    fn test_range_crossing_upper_bound() {
        assert!(matches!(
            parse_page_ranges("8-12", 10),
            Err(RangeError::AboveUpperBound { page: 12, max_pages: 10 })
        ));
    }

    #[test]
    fn test_not_a_number() {
        assert!(matches!(parse_page_ranges("a", 10), Err(RangeError::NotANumber { .. })));
        assert!(matches!(parse_page_ranges("1-2-3", 10), Err(RangeError::NotANumber { .. })));
        assert!(matches!(parse_page_ranges("-3", 10), Err(RangeError::NotANumber { .. })));
        assert!(matches!(parse_page_ranges("all", 10), Err(RangeError::NotANumber { .. })));
    }

    #[test]
    fn test_select_all() {
        assert_eq!(select_pages("all", 3).unwrap(), vec![1, 2, 3]);
        assert_eq!(select_pages(" ALL ", 2).unwrap(), vec![1, 2]);
        assert_eq!(select_pages("2", 3).unwrap(), vec![2]);
    }

    proptest! {
        #[test]
        fn prop_output_is_strictly_ascending_and_in_bounds(
            max_pages in 1u32..60,
            tokens in prop::collection::vec((1u32..60, 1u32..60, any::<bool>()), 0..8),
        ) {
            let spec = tokens
                .iter()
                .map(|(a, b, range)| {
                    let a = (a - 1) % max_pages + 1;
                    let b = (b - 1) % max_pages + 1;
                    if *range { format!("{a}-{b}") } else { a.to_string() }
                })
                .collect::<Vec<_>>()
                .join(",");

            let pages = parse_page_ranges(&spec, max_pages).unwrap();
            prop_assert!(pages.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(pages.iter().all(|p| (1..=max_pages).contains(p)));
            prop_assert_eq!(pages.is_empty(), tokens.is_empty());
        }

        #[test]
        fn prop_past_the_end_is_rejected(max_pages in 1u32..500, extra in 1u32..100) {
            let spec = (max_pages + extra).to_string();
            let is_upper_bound_error = matches!(
                parse_page_ranges(&spec, max_pages),
                Err(RangeError::AboveUpperBound { .. })
            );
            prop_assert!(is_upper_bound_error);
        }
    }
}
