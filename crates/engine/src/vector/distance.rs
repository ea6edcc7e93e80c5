//! Distance functions.
//!
//! All distances are "smaller is closer". Vectors are used as stored; there
//! is no implicit normalization.

use luxdb_core::Metric;

/// Distance between two vectors of equal length
pub fn distance(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dimension mismatch in distance");

    match metric {
        Metric::L2 => squared_l2(a, b),
        Metric::Ip => 1.0 - dot_product(a, b),
        Metric::Cosine => cosine_distance(a, b),
    }
}

/// Squared Euclidean distance
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Dot product (inner product)
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// `1 - cos(a, b)`; a zero vector is at distance 1 from everything
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        1.0 - dot_product(a, b) / (norm_a * norm_b)
    }
}
