//! Fork-aware storage metering schedules.
//!
//! Only the parameters consumed by the host's storage-write callback live
//! here; the rest of the gas table belongs to the interpreter.
//!
//! # Fork History (storage-relevant changes)
//!
//! - **Frontier..Byzantium**: flat SSTORE pricing, single clearing refund
//! - **Constantinople (EIP-1283)**: net gas metering, `SLOAD_GAS = 200`
//! - **Petersburg**: EIP-1283 removed again
//! - **Istanbul (EIP-2200)**: net gas metering back, `SLOAD_GAS = 800`

use super::Fork;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSchedule {
    /// Net gas metering for SSTORE. When off, every write is metered as if
    /// it were the first write to the slot in the transaction.
    pub eip1283_mode: bool,

    /// SSTORE costs of the fork. The interpreter charges them; the host
    /// only reads the refunds below, which are defined relative to them.
    pub sstore_set_gas: u64,
    pub sstore_reset_gas: u64,
    pub sstore_unchanged_gas: u64,

    /// Flat refund for clearing a slot.
    pub sstore_refund_gas: i64,
    /// Refund for restoring a dirty slot to its original non-zero value.
    pub sstore_refund_nonzero_gas: i64,

    /// Refunds are capped at `gas_used / max_refund_quotient`.
    pub max_refund_quotient: u64,
}

impl HostSchedule {
    /// Get the schedule for a specific fork.
    pub const fn for_fork(fork: Fork) -> &'static HostSchedule {
        match fork {
            Fork::Frontier
            | Fork::Homestead
            | Fork::Tangerine
            | Fork::SpuriousDragon
            | Fork::Byzantium
            | Fork::Petersburg => &LEGACY_SCHEDULE,
            Fork::Constantinople => &CONSTANTINOPLE_SCHEDULE,
            Fork::Istanbul => &ISTANBUL_SCHEDULE,
        }
    }
}

impl Default for HostSchedule {
    fn default() -> Self {
        *HostSchedule::for_fork(Fork::default())
    }
}

/// Frontier through Byzantium, and Petersburg.
pub const LEGACY_SCHEDULE: HostSchedule = HostSchedule {
    eip1283_mode: false,
    sstore_set_gas: 20000,
    sstore_reset_gas: 5000,
    sstore_unchanged_gas: 200,
    sstore_refund_gas: 15000,
    sstore_refund_nonzero_gas: 4800,
    max_refund_quotient: 2,
};

/// Constantinople (EIP-1283)
pub const CONSTANTINOPLE_SCHEDULE: HostSchedule = HostSchedule {
    eip1283_mode: true,
    sstore_set_gas: 20000,
    sstore_reset_gas: 5000,
    sstore_unchanged_gas: 200,
    sstore_refund_gas: 15000,
    sstore_refund_nonzero_gas: 4800,
    max_refund_quotient: 2,
};

/// Istanbul (EIP-2200)
pub const ISTANBUL_SCHEDULE: HostSchedule = HostSchedule {
    eip1283_mode: true,
    sstore_set_gas: 20000,
    sstore_reset_gas: 5000,
    sstore_unchanged_gas: 800,
    sstore_refund_gas: 15000,
    sstore_refund_nonzero_gas: 4200,
    max_refund_quotient: 2,
};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    #[allow(clippy::as_conversions)]
    fn restore_refunds_match_net_metering_costs() {
        for schedule in [&CONSTANTINOPLE_SCHEDULE, &ISTANBUL_SCHEDULE] {
            let unchanged = schedule.sstore_unchanged_gas as i64;
            assert_eq!(
                schedule.sstore_refund_nonzero_gas,
                schedule.sstore_reset_gas as i64 - unchanged
            );
            assert_eq!(
                schedule.sstore_refund_gas + schedule.sstore_refund_nonzero_gas,
                schedule.sstore_set_gas as i64 - unchanged
            );
        }
    }

    #[test]
    fn presets_follow_the_fork_gas_table() {
        for fork in Fork::iter() {
            let schedule = HostSchedule::for_fork(fork);
            assert_eq!(schedule.sstore_set_gas, 20000, "{fork}");
            assert_eq!(schedule.sstore_reset_gas, 5000, "{fork}");
            assert_eq!(schedule.eip1283_mode, fork.has_net_gas_metering(), "{fork}");
        }
        // SLOAD_GAS, charged for no-op writes under net metering.
        assert_eq!(HostSchedule::for_fork(Fork::Constantinople).sstore_unchanged_gas, 200);
        assert_eq!(HostSchedule::for_fork(Fork::Istanbul).sstore_unchanged_gas, 800);
    }

    #[test]
    fn petersburg_disables_net_metering() {
        assert!(!HostSchedule::for_fork(Fork::Petersburg).eip1283_mode);
        assert!(HostSchedule::for_fork(Fork::Constantinople).eip1283_mode);
    }
}
