use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Hard forks with a distinct storage-metering rule set.
#[repr(u8)]
#[derive(
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    Hash,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Fork {
    Frontier = 0,
    Homestead = 1,
    Tangerine = 2,
    SpuriousDragon = 3,
    Byzantium = 4,
    Constantinople = 5,
    Petersburg = 6,
    #[default]
    Istanbul = 7,
}

impl Fork {
    /// Net gas metering for SSTORE (EIP-1283, later EIP-2200).
    pub const fn has_net_gas_metering(self) -> bool {
        matches!(self, Fork::Constantinople | Fork::Istanbul)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Fork::from_str("petersburg"), Ok(Fork::Petersburg));
        assert_eq!(Fork::from_str("ISTANBUL"), Ok(Fork::Istanbul));
        assert!(Fork::from_str("london").is_err());
    }

    #[test]
    fn net_metering_was_reverted_in_petersburg() {
        let metered: Vec<Fork> = Fork::iter().filter(|f| f.has_net_gas_metering()).collect();
        assert_eq!(metered, vec![Fork::Constantinople, Fork::Istanbul]);
    }
}
