/// Element-wise mean of two embeddings
///
/// The shorter vector bounds the result, matching a zip over both.
#[inline]
pub fn average_embeddings(a: &[f32], b: &[f32]) -> Vec<f32> {
    a.iter().zip(b.iter()).map(|(x, y)| (x + y) / 2.0).collect()
}

/// Convert a cosine distance from the vector store into a similarity
#[inline]
pub fn similarity_from_distance(distance: f64) -> f64 {
    1.0 - distance
}
