//! Similarity estimators: exact Jaccard over fingerprint hash sets and the
//! MinHash collision-rate approximation.

use std::collections::HashSet;

use crate::winnow::Fingerprint;

/// Exact Jaccard similarity over the *hash* sets of two fingerprint
/// sequences. Positions are ignored; 0 when either side is empty.
pub fn jaccard(a: &[Fingerprint], b: &[Fingerprint]) -> f64 {
    let set_a: HashSet<u64> = a.iter().map(|f| f.hash).collect();
    let set_b: HashSet<u64> = b.iter().map(|f| f.hash).collect();
    jaccard_hashes(&set_a, &set_b)
}

/// Exact Jaccard similarity over two hash sets.
pub fn jaccard_hashes(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// MinHash similarity estimate: the fraction of matching slots over the
/// shorter of the two signatures. 0 when either signature is empty.
pub fn minhash_estimate(a: &[u64], b: &[u64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let matching = a.iter().zip(b.iter()).filter(|(x, y)| x == y).count();
    matching as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minhash::signature;
    use crate::winnow::winnow;

    fn fp(hashes: &[u64]) -> Vec<Fingerprint> {
        hashes
            .iter()
            .enumerate()
            .map(|(i, &hash)| Fingerprint {
                hash,
                pos: i as u32,
            })
            .collect()
    }

    #[test]
    fn jaccard_identical_sets_is_one() {
        let a = fp(&[1, 2, 3, 4]);
        assert_eq!(jaccard(&a, &a), 1.0);
    }

    #[test]
    fn jaccard_disjoint_sets_is_zero() {
        assert_eq!(jaccard(&fp(&[1, 2]), &fp(&[3, 4])), 0.0);
    }

    #[test]
    fn jaccard_empty_side_is_zero() {
        assert_eq!(jaccard(&fp(&[1]), &[]), 0.0);
        assert_eq!(jaccard(&[], &[]), 0.0);
    }

    #[test]
    fn jaccard_partial_overlap() {
        // {1,2,3} vs {2,3,4}: 2 shared over 4 total.
        let sim = jaccard(&fp(&[1, 2, 3]), &fp(&[2, 3, 4]));
        assert!((sim - 0.5).abs() < 1e-12);
    }

    #[test]
    fn jaccard_ignores_positions_and_duplicates() {
        let a = fp(&[7, 7, 9]);
        let b = fp(&[9, 7]);
        assert_eq!(jaccard(&a, &b), 1.0);
    }

    #[test]
    fn estimate_identical_signatures_is_one() {
        let sig = signature("a text with enough grams to sign", 5, 100);
        assert_eq!(minhash_estimate(&sig, &sig), 1.0);
    }

    #[test]
    fn estimate_empty_signature_is_zero() {
        let sig = signature("a text with enough grams to sign", 5, 100);
        assert_eq!(minhash_estimate(&sig, &[]), 0.0);
        assert_eq!(minhash_estimate(&[], &[]), 0.0);
    }

    #[test]
    fn estimate_uses_shorter_length() {
        let a = vec![1, 2, 3, 4];
        let b = vec![1, 2];
        assert!((minhash_estimate(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn estimate_in_unit_interval() {
        let a = signature("alpha beta gamma delta epsilon", 4, 100);
        let b = signature("zeta eta theta iota kappa", 4, 100);
        let est = minhash_estimate(&a, &b);
        assert!((0.0..=1.0).contains(&est));
    }

    #[test]
    fn winnowed_self_similarity_is_one() {
        let fp = winnow("a document compared against itself", 5, 4);
        assert!(!fp.is_empty());
        assert_eq!(jaccard(&fp, &fp), 1.0);
    }
}
