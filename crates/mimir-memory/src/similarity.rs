//! Sparse cosine similarity over named dimensions.

use mimir_types::SparseVector;

/// Cosine similarity restricted to the intersection of the two key sets.
///
/// Disjoint key sets score exactly 0.0 — an empty result, not an error.
/// The denominator carries a small epsilon so a zero-magnitude overlap
/// cannot divide by zero; existing snapshots were scored with this exact
/// formula, so it stays.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    let shared: Vec<&String> = a.keys().filter(|k| b.contains_key(*k)).collect();
    if shared.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for key in shared {
        let wa = a[key];
        let wb = b[key];
        dot += wa * wb;
        norm_a += wa * wa;
        norm_b += wb * wb;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt() + 1e-9)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse(pairs: &[(&str, f32)]) -> SparseVector {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_cosine_disjoint_is_zero() {
        let a = sparse(&[("E", 1.0)]);
        let b = sparse(&[("T", 1.0)]);
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_identical_near_one() {
        let a = sparse(&[("E", 1.0), ("T", 0.5)]);
        let sim = cosine(&a, &a);
        assert!((sim - 1.0).abs() < 1e-6, "sim was {sim}");
    }

    #[test]
    fn test_cosine_symmetric() {
        let a = sparse(&[("E", 0.9), ("T", 0.3), ("C", 0.1)]);
        let b = sparse(&[("E", 0.2), ("T", 0.8)]);
        assert!((cosine(&a, &b) - cosine(&b, &a)).abs() < 1e-7);
    }

    #[test]
    fn test_cosine_bounds_for_nonnegative_weights() {
        let a = sparse(&[("E", 0.4), ("T", 0.7)]);
        let b = sparse(&[("E", 1.0), ("C", 0.2)]);
        let sim = cosine(&a, &b);
        assert!((0.0..=1.0).contains(&sim), "sim was {sim}");
    }

    #[test]
    fn test_cosine_partial_overlap_uses_shared_keys_only() {
        // Only "E" is shared, so both vectors collapse to a single dimension
        // and the similarity approaches 1.0 regardless of the other keys.
        let a = sparse(&[("E", 0.5), ("T", 9.0)]);
        let b = sparse(&[("E", 2.0), ("C", 4.0)]);
        let sim = cosine(&a, &b);
        assert!((sim - 1.0).abs() < 1e-6, "sim was {sim}");
    }

    #[test]
    fn test_cosine_empty_inputs() {
        let a = sparse(&[]);
        let b = sparse(&[("E", 1.0)]);
        assert_eq!(cosine(&a, &b), 0.0);
        assert_eq!(cosine(&a, &a), 0.0);
    }
}
