//! Entropy and compressibility metrics over the soup.
//!
//! Higher Order Entropy (Shannon entropy minus a compression-based
//! complexity estimate) is the population-level signal used to detect
//! emergent structure: random soup sits near zero, a soup dominated by
//! repeated replicators has high Shannon entropy but compresses well,
//! pushing HOE up.

use brotli::enc::BrotliEncoderParams;

/// Zero-order byte entropy in bits per byte. Empty input is 0.0.
pub fn shannon_entropy(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for &b in bytes {
        counts[b as usize] += 1;
    }
    let len = bytes.len() as f64;
    let mut entropy = 0.0;
    for &count in &counts {
        if count > 0 {
            let p = count as f64 / len;
            entropy -= p * p.log2();
        }
    }
    entropy
}

/// Compression-based complexity estimate in bits per byte.
///
/// 8.0 means incompressible; 0.0 means fully compressible. Delegates to
/// Brotli at its default quality; a compressor failure is reported as
/// maximum complexity.
pub fn complexity_estimate(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let mut compressed = Vec::new();
    let params = BrotliEncoderParams::default();
    match brotli::BrotliCompress(&mut std::io::Cursor::new(bytes), &mut compressed, &params) {
        Ok(_) => (compressed.len() as f64 / bytes.len() as f64) * 8.0,
        Err(_) => 8.0,
    }
}

/// Shannon entropy minus the complexity estimate.
pub fn higher_order_entropy(bytes: &[u8]) -> f64 {
    shannon_entropy(bytes) - complexity_estimate(bytes)
}

/// Fraction of bytes that are recognized instructions. Random soup sits
/// near 10/256; replicator-dominated soup climbs well above it.
pub fn instruction_fraction(bytes: &[u8]) -> f64 {
    if bytes.is_empty() {
        return 0.0;
    }
    let count = bytes.iter().filter(|&&b| crate::emulator::is_instruction(b)).count();
    count as f64 / bytes.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn entropy_of_all_byte_values_is_exactly_eight() {
        let bytes: Vec<u8> = (0..=255).collect();
        assert_eq!(shannon_entropy(&bytes), 8.0);
    }

    #[test]
    fn entropy_of_constant_buffer_is_zero() {
        assert_eq!(shannon_entropy(&[7u8; 1024]), 0.0);
    }

    #[test]
    fn empty_input_is_defined() {
        assert_eq!(shannon_entropy(&[]), 0.0);
        assert_eq!(complexity_estimate(&[]), 0.0);
        assert_eq!(higher_order_entropy(&[]), 0.0);
    }

    #[test]
    fn repetitive_structure_has_high_hoe() {
        // Full byte alphabet (Shannon = 8.0) repeated: compresses heavily.
        let pattern: Vec<u8> = (0..=255).collect();
        let mut bytes = Vec::new();
        for _ in 0..16 {
            bytes.extend_from_slice(&pattern);
        }
        assert_eq!(shannon_entropy(&bytes), 8.0);
        assert!(complexity_estimate(&bytes) < 4.0);
        assert!(higher_order_entropy(&bytes) > 4.0);
    }

    #[test]
    fn instruction_fraction_counts_the_ten_opcodes() {
        assert_eq!(instruction_fraction(b"<>{}-+.,[]"), 1.0);
        assert_eq!(instruction_fraction(b"abcd"), 0.0);
        assert_eq!(instruction_fraction(b"+a"), 0.5);
        assert_eq!(instruction_fraction(&[]), 0.0);
    }

    #[test]
    fn random_soup_has_hoe_near_or_below_zero() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        let bytes: Vec<u8> = (0..4096).map(|_| rng.random()).collect();
        assert!(higher_order_entropy(&bytes) < 0.5);
    }
}
