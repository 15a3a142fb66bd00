//! Opaque, hex-encoded entity ids.
//!
//! IDs are plain random byte strings rather than UUIDs/ULIDs: the engine
//! never needs creation-time ordering baked into the id itself (every entity
//! already carries its own timestamp fields), so a dependency-free hex
//! encoding of CSPRNG output is the simplest thing that works.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::rng::{random_hex_id, Crng};

/// Declares a newtype wrapping an opaque hex-string id, with the
/// constructors / trait impls every id in this crate needs.
macro_rules! id_type {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(
            Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, random id.
            pub fn generate(rng: &mut impl Crng) -> Self {
                Self(random_hex_id(rng, 12))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_owned()))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(UserId, "A user's opaque id (customer, rider, or admin).");
id_type!(OrderId, "An order's opaque id.");
id_type!(ReferralId, "A referral record's opaque id.");
id_type!(TransactionId, "A wallet transaction's opaque id.");
id_type!(PayoutId, "A rider payout document's opaque id.");

#[cfg(test)]
mod test {
    use super::*;
    use crate::rng::SysRng;

    #[test]
    fn generate_then_parse_roundtrips() {
        let mut rng = SysRng::new();
        let id = UserId::generate(&mut rng);
        let s = id.to_string();
        let parsed: UserId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_ids_dont_collide() {
        let mut rng = SysRng::new();
        let a = OrderId::generate(&mut rng);
        let b = OrderId::generate(&mut rng);
        assert_ne!(a, b);
    }
}
