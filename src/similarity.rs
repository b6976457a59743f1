/// Cosine similarity between two embeddings.
///
/// Returns `None` when the vectors have different lengths or are empty.
/// A zero-norm vector has similarity 0 with everything.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(0.0);
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[test]
fn test_cosine_similarity_basic() {
    {
        let got = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((got - 1.0).abs() < 1e-12);
    }

    {
        let got = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(got.abs() < 1e-12);
    }

    {
        let got = cosine_similarity(&[1.0, 2.0, 3.0], &[-1.0, -2.0, -3.0]).unwrap();
        assert!((got + 1.0).abs() < 1e-12);
    }

    // scale invariant
    {
        let got = cosine_similarity(&[3.0, 4.0], &[30.0, 40.0]).unwrap();
        assert!((got - 1.0).abs() < 1e-12);
    }

    {
        let got = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]).unwrap();
        assert!((got - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
    }
}

#[test]
fn test_cosine_similarity_degenerate_inputs() {
    assert_eq!(cosine_similarity(&[], &[]), None);
    assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), None);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), Some(0.0));
    assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), Some(0.0));
}
