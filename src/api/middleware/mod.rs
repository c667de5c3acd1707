pub mod admin;
pub mod identity;

/// Byte-wise comparison that does not short-circuit on the first mismatch,
/// so token checks don't leak prefix length through timing.
pub(crate) fn constant_time_cmp(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::constant_time_cmp;

    #[test]
    fn compares_equal_and_unequal_tokens() {
        assert!(constant_time_cmp("sekrit", "sekrit"));
        assert!(!constant_time_cmp("sekrit", "sekrat"));
        assert!(!constant_time_cmp("sekrit", "sekrit0"));
        assert!(!constant_time_cmp("", "x"));
    }
}
