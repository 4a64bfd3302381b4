//! Merge strategies for combining values from several script fonts

use crate::{MergeError, Result};

/// Bitwise OR of fixed-size bit fields, such as OS/2 Unicode ranges
pub fn union_bits<const N: usize>(values: &[[u32; N]]) -> Result<[u32; N]> {
    let (first, rest) = values.split_first().ok_or(MergeError::NoFonts)?;
    Ok(rest.iter().fold(*first, |mut acc, bits| {
        for (a, b) in acc.iter_mut().zip(bits) {
            *a |= b;
        }
        acc
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_bits_needs_values() {
        assert!(matches!(union_bits::<2>(&[]), Err(MergeError::NoFonts)));
    }

    #[test]
    fn test_union_bits() {
        let ranges = [[0b0001, 0, 0, 0], [0b0100, 1, 0, 0], [0, 0, 0, 1 << 31]];
        assert_eq!(union_bits(&ranges).unwrap(), [0b0101, 1, 0, 1 << 31]);
    }
}
