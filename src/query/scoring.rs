//! BM25 scoring
//!
//! ElasticSearch-compatible formulas:
//! - idf = ln(1 + (doc_count - doc_freq + 0.5) / (doc_freq + 0.5))
//! - tf_norm = (freq * (k1 + 1)) / (freq + k1 * (1 - b + b * field_len / avg_field_len))

/// Term frequency saturation
pub const BM25_K1: f64 = 1.2;

/// Length normalization strength
pub const BM25_B: f64 = 0.75;

#[inline]
pub fn idf(doc_count: usize, doc_freq: usize) -> f64 {
    let doc_count = doc_count as f64;
    let doc_freq = doc_freq as f64;
    (1.0 + (doc_count - doc_freq + 0.5) / (doc_freq + 0.5)).ln()
}

#[inline]
pub fn tf_norm(freq: u32, field_length: u32, avg_field_length: f64) -> f64 {
    let freq = freq as f64;
    let length_norm = 1.0 - BM25_B + BM25_B * field_length as f64 / avg_field_length;
    (freq * (BM25_K1 + 1.0)) / (freq + BM25_K1 * length_norm)
}

/// BM25 bound to one index's average document length
#[derive(Debug, Clone, Copy)]
pub struct Bm25Similarity {
    avg_field_length: f64,
}

impl Bm25Similarity {
    pub fn new(avg_field_length: f64) -> Self {
        Self { avg_field_length }
    }

    pub fn avg_field_length(&self) -> f64 {
        self.avg_field_length
    }

    #[inline]
    pub fn idf(&self, doc_count: usize, doc_freq: usize) -> f64 {
        idf(doc_count, doc_freq)
    }

    #[inline]
    pub fn tf_norm(&self, freq: u32, field_length: u32) -> f64 {
        tf_norm(freq, field_length, self.avg_field_length)
    }

    /// Score of one term in one document
    #[inline]
    pub fn score(&self, idf: f64, freq: u32, field_length: u32) -> f64 {
        idf * self.tf_norm(freq, field_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_idf_reference_values() {
        assert!(approx(idf(1, 1), 0.288));
        assert!(approx(idf(3, 1), 0.981));
        // Rarer terms weigh more
        assert!(idf(100, 1) > idf(100, 50));
    }

    #[test]
    fn test_tf_norm_reference_values() {
        assert!(approx(tf_norm(1, 3, 3.0), 1.0));

        let sim = Bm25Similarity::new(3.0);
        assert!(approx(sim.tf_norm(1, 3), 1.0));
        // Shorter documents score higher at equal frequency
        assert!(sim.tf_norm(1, 1) > sim.tf_norm(1, 10));
        // Saturates below k1 + 1
        assert!(sim.tf_norm(1000, 3) < BM25_K1 + 1.0);
    }

    #[test]
    fn test_score_combines_idf_and_tf_norm() {
        let sim = Bm25Similarity::new(3.0);
        let w = sim.idf(3, 1);
        assert!(approx(sim.score(w, 1, 3), 0.981));
    }
}
