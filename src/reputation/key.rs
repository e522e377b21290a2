//! Address normalization.
//!
//! Addresses are parsed strictly as dotted-decimal IPv4 and zero-extended to
//! a 128-bit key, which is the only form the data structures ever see.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::Serialize;

use crate::reputation::error::{ReputationError, ReputationResult};

/// A normalized address key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IpKey(u128);

impl IpKey {
    /// The key for an IPv4 address.
    pub fn from_ipv4(addr: Ipv4Addr) -> Self {
        Self(u128::from(u32::from(addr)))
    }

    /// The raw 128-bit value.
    pub fn as_u128(self) -> u128 {
        self.0
    }

    /// The address this key was built from, if it fits in 32 bits.
    pub fn to_ipv4(self) -> Option<Ipv4Addr> {
        u32::try_from(self.0).ok().map(Ipv4Addr::from)
    }
}

impl From<Ipv4Addr> for IpKey {
    fn from(addr: Ipv4Addr) -> Self {
        Self::from_ipv4(addr)
    }
}

impl From<IpKey> for u128 {
    fn from(key: IpKey) -> Self {
        key.0
    }
}

impl fmt::Display for IpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_ipv4() {
            Some(addr) => write!(f, "{addr}"),
            None => write!(f, "{:#034x}", self.0),
        }
    }
}

impl FromStr for IpKey {
    type Err = ReputationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

/// Parse a dotted-decimal IPv4 address into its key.
///
/// Exactly four dot-separated decimal octets in `[0, 255]` are accepted.
/// Surrounding whitespace, leading zeros, signs, empty octets and anything
/// that is not IPv4 are rejected.
///
/// # Errors
///
/// [`ReputationError::InvalidFormat`] carrying the rejected input.
///
/// # Examples
///
/// ```
/// use kiai_lib::reputation::normalize;
///
/// let key = normalize("10.0.0.1").unwrap();
/// assert_eq!(key.as_u128(), 0x0a00_0001);
/// assert!(normalize("10.0.0.256").is_err());
/// ```
pub fn normalize(address: &str) -> ReputationResult<IpKey> {
    address
        .parse::<Ipv4Addr>()
        .map(IpKey::from_ipv4)
        .map_err(|_| ReputationError::InvalidFormat(address.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("0.0.0.0", 0 ; "all zeros")]
    #[test_case("10.0.0.1", 0x0a00_0001 ; "private")]
    #[test_case("192.168.1.254", 0xc0a8_01fe ; "class c")]
    #[test_case("255.255.255.255", 0xffff_ffff ; "broadcast")]
    fn test_valid_addresses(input: &str, expected: u128) {
        assert_eq!(normalize(input).unwrap().as_u128(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("10.0.0" ; "three octets")]
    #[test_case("10.0.0.1.5" ; "five octets")]
    #[test_case("10.0.0.256" ; "octet out of range")]
    #[test_case("10..0.1" ; "empty octet")]
    #[test_case("-1.0.0.1" ; "negative")]
    #[test_case("10.0.0.a" ; "non numeric")]
    #[test_case(" 10.0.0.1" ; "leading whitespace")]
    #[test_case("10.0.0.1\n" ; "trailing newline")]
    #[test_case("010.0.0.1" ; "leading zero")]
    #[test_case("::1" ; "ipv6")]
    fn test_invalid_addresses(input: &str) {
        assert_eq!(
            normalize(input),
            Err(ReputationError::InvalidFormat(input.to_string()))
        );
    }

    #[test]
    fn test_display_and_parse() {
        let key: IpKey = "172.16.5.4".parse().unwrap();
        assert_eq!(key.to_string(), "172.16.5.4");
        assert_eq!(key.to_ipv4(), Some(Ipv4Addr::new(172, 16, 5, 4)));
    }

    proptest! {
        #[test]
        fn prop_round_trip(octets in any::<[u8; 4]>()) {
            let addr = Ipv4Addr::from(octets);
            let key = normalize(&addr.to_string()).unwrap();
            prop_assert_eq!(key.to_ipv4(), Some(addr));
            prop_assert!(key.as_u128() <= u128::from(u32::MAX));
        }

        #[test]
        fn prop_distinct_addresses_distinct_keys(a in any::<u32>(), b in any::<u32>()) {
            prop_assume!(a != b);
            let ka = IpKey::from(Ipv4Addr::from(a));
            let kb = IpKey::from(Ipv4Addr::from(b));
            prop_assert_ne!(ka, kb);
        }

        #[test]
        fn prop_out_of_range_octet_rejected(octet in 256u32..100_000) {
            let input = format!("10.0.{octet}.1");
            prop_assert!(normalize(&input).is_err());
        }
    }
}
