/// Median of a set of counts; the slice is reordered in place.
pub fn median(values: &mut [u32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) as f64 / 2.0)
    } else {
        Some(values[mid] as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_empty() {
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_median_odd_count() {
        assert_eq!(median(&mut [3, 1, 4]), Some(3.0));
    }

    #[test]
    fn test_median_even_count() {
        assert_eq!(median(&mut [4, 1, 2, 3]), Some(2.5));
    }

    #[test]
    fn test_median_with_duplicates() {
        assert_eq!(median(&mut [2, 2, 2, 7]), Some(2.0));
    }
}
