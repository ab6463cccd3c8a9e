//! Page-range spec parsing.

/// Resolve a free-form page-range spec (e.g. `"1-3,5,8"`) into an ordered,
/// deduplicated, ascending set of 1-based page numbers.
///
/// Rules:
/// - chunks are comma-separated; each is a single integer or a
///   `start-end` pair (normalized if reversed, so `"3-1"` means `1-3`)
/// - invalid tokens are silently skipped
/// - values outside `[1, total_pages]` are dropped when the total is known
/// - a blank spec resolves to an empty set, which callers interpret as
///   "all pages"
///
/// Resolution is idempotent: the same spec against the same total always
/// yields the same sequence.
pub fn parse_page_range(spec: &str, total_pages: Option<u32>) -> Vec<u32> {
    let mut pages: Vec<u32> = Vec::new();

    for chunk in spec.split(',') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }

        if let Some((start, end)) = chunk.split_once('-') {
            let (Ok(a), Ok(b)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>()) else {
                continue;
            };
            let (mut lo, mut hi) = if a <= b { (a, b) } else { (b, a) };
            lo = lo.max(1);
            if let Some(total) = total_pages {
                hi = hi.min(total);
            }
            for page in lo..=hi {
                pages.push(page);
            }
        } else if let Ok(page) = chunk.parse::<u32>() {
            pages.push(page);
        }
    }

    pages.retain(|&p| p >= 1 && total_pages.map_or(true, |total| p <= total));
    pages.sort_unstable();
    pages.dedup();
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_spec_is_empty() {
        assert!(parse_page_range("", Some(10)).is_empty());
        assert!(parse_page_range("   ", Some(10)).is_empty());
        assert!(parse_page_range(",,,", Some(10)).is_empty());
    }

    #[test]
    fn single_pages_and_ranges() {
        assert_eq!(parse_page_range("1-3,5,8", Some(10)), vec![1, 2, 3, 5, 8]);
        assert_eq!(parse_page_range("4", Some(10)), vec![4]);
    }

    #[test]
    fn reversed_range_duplicates_and_order() {
        // Reversed range normalized, duplicates collapsed, output sorted.
        assert_eq!(parse_page_range("3-1,5,5,2", Some(10)), vec![1, 2, 3, 5]);
    }

    #[test]
    fn out_of_bounds_values_are_dropped() {
        assert_eq!(parse_page_range("8-12", Some(10)), vec![8, 9, 10]);
        assert!(parse_page_range("20-30", Some(10)).is_empty());
        assert_eq!(parse_page_range("0,1", Some(10)), vec![1]);
    }

    #[test]
    fn invalid_tokens_are_skipped() {
        assert_eq!(parse_page_range("abc,4,x-y,2-", Some(10)), vec![4]);
        assert_eq!(parse_page_range("-3,7", Some(10)), vec![7]);
        assert!(parse_page_range("1.5", Some(10)).is_empty());
    }

    #[test]
    fn unknown_total_keeps_values() {
        assert_eq!(parse_page_range("5,900", None), vec![5, 900]);
    }

    #[test]
    fn whitespace_around_tokens_is_tolerated() {
        assert_eq!(parse_page_range(" 1 - 3 , 5 ", Some(10)), vec![1, 2, 3, 5]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let first = parse_page_range("9-2,4,4,1", Some(6));
        let second = parse_page_range("9-2,4,4,1", Some(6));
        assert_eq!(first, second);
        assert_eq!(first, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn output_is_strictly_ascending_in_bounds() {
        let pages = parse_page_range("7,3-5,2,10-8,3", Some(9));
        assert!(pages.windows(2).all(|w| w[0] < w[1]));
        assert!(pages.iter().all(|&p| (1..=9).contains(&p)));
    }
}
