//! Conversion between prefix length and dotted-decimal netmask

use super::error::{NetworkError, NetworkResult};
use std::net::Ipv4Addr;

const MAX_PREFIX: u8 = 32;

/// Convert a prefix length (0..=32) to a dotted-decimal mask
pub fn prefix_to_mask(prefix: u8) -> NetworkResult<Ipv4Addr> {
    if prefix > MAX_PREFIX {
        return Err(NetworkError::InvalidInput(format!(
            "invalid prefix length: {prefix}"
        )));
    }

    let bits = match prefix {
        0 => 0,
        p => u32::MAX << (MAX_PREFIX - p),
    };

    Ok(Ipv4Addr::from(bits))
}

/// Convert a dotted-decimal mask to its prefix length
///
/// The result is the index of the first zero bit. Non-contiguous masks such as
/// `255.0.255.0` are not rejected: they yield the count of leading ones (8).
pub fn mask_to_prefix(mask: &str) -> NetworkResult<u8> {
    let mask: Ipv4Addr = mask
        .trim()
        .parse()
        .map_err(|_| NetworkError::InvalidInput(format!("invalid netmask: {mask}")))?;

    Ok(u32::from(mask).leading_ones() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_round_trips_through_mask() {
        for prefix in 0..=32u8 {
            let mask = prefix_to_mask(prefix).unwrap();
            assert_eq!(mask_to_prefix(&mask.to_string()).unwrap(), prefix);
        }
    }

    #[test]
    fn well_known_masks() {
        assert_eq!(prefix_to_mask(0).unwrap(), Ipv4Addr::new(0, 0, 0, 0));
        assert_eq!(prefix_to_mask(24).unwrap(), Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(
            prefix_to_mask(20).unwrap(),
            Ipv4Addr::new(255, 255, 240, 0)
        );
        assert_eq!(
            prefix_to_mask(32).unwrap(),
            Ipv4Addr::new(255, 255, 255, 255)
        );
    }

    #[test]
    fn prefix_out_of_range_is_invalid_input() {
        assert!(matches!(
            prefix_to_mask(33),
            Err(NetworkError::InvalidInput(_))
        ));
    }

    #[test]
    fn malformed_mask_is_invalid_input() {
        assert!(matches!(
            mask_to_prefix("255.255.0"),
            Err(NetworkError::InvalidInput(_))
        ));
        assert!(matches!(
            mask_to_prefix(""),
            Err(NetworkError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_contiguous_mask_counts_leading_ones() {
        assert_eq!(mask_to_prefix("255.0.255.0").unwrap(), 8);
        assert_eq!(mask_to_prefix("0.255.255.255").unwrap(), 0);
    }
}
