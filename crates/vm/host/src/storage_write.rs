//! SSTORE classification and refund metering.
//!
//! Under net gas metering (EIP-1283 / EIP-2200) the refund a write earns
//! depends on three values of the slot: the value it held when the
//! transaction started (`original`), the value it holds now (`current`) and
//! the value being written (`new`). Without net metering every write is
//! treated as the first write to the slot.
//!
//! Refund deltas are signed. A later write may take back a refund granted by
//! an earlier one, so the running counter can dip below zero mid-transaction;
//! flooring it is left to whoever settles the transaction.

use crate::abi::StorageStatus;
use extvm_common::{U256, types::HostSchedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageWrite {
    pub status: StorageStatus,
    pub refund_delta: i64,
}

/// Classifies a write of `new_value` to a slot currently holding
/// `current_value` whose pre-transaction value is `original_value`.
pub fn classify(
    new_value: U256,
    current_value: U256,
    original_value: U256,
    schedule: &HostSchedule,
) -> StorageWrite {
    if new_value == current_value {
        return StorageWrite {
            status: StorageStatus::Unchanged,
            refund_delta: 0,
        };
    }

    let mut refund_delta: i64 = 0;
    let status;

    if original_value == current_value || !schedule.eip1283_mode {
        status = if current_value.is_zero() {
            StorageStatus::Added
        } else if new_value.is_zero() {
            refund_delta += schedule.sstore_refund_gas;
            StorageStatus::Deleted
        } else {
            StorageStatus::Modified
        };
    } else {
        status = StorageStatus::ModifiedAgain;
        if !original_value.is_zero() {
            if current_value.is_zero() {
                // Takes back the refund of an earlier clear. Can go negative.
                refund_delta -= schedule.sstore_refund_gas;
            }
            if new_value.is_zero() {
                refund_delta += schedule.sstore_refund_gas;
            }
        }
        if original_value == new_value {
            refund_delta += if original_value.is_zero() {
                schedule.sstore_refund_gas + schedule.sstore_refund_nonzero_gas
            } else {
                schedule.sstore_refund_nonzero_gas
            };
        }
    }

    StorageWrite {
        status,
        refund_delta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extvm_common::types::{CONSTANTINOPLE_SCHEDULE, ISTANBUL_SCHEDULE, LEGACY_SCHEDULE};

    const R: i64 = CONSTANTINOPLE_SCHEDULE.sstore_refund_gas;
    const RN: i64 = CONSTANTINOPLE_SCHEDULE.sstore_refund_nonzero_gas;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    fn write(new: u64, current: u64, original: u64) -> StorageWrite {
        classify(u(new), u(current), u(original), &CONSTANTINOPLE_SCHEDULE)
    }

    #[test]
    fn same_value_is_unchanged_under_every_schedule() {
        for schedule in [&LEGACY_SCHEDULE, &CONSTANTINOPLE_SCHEDULE, &ISTANBUL_SCHEDULE] {
            for (value, original) in [(0, 0), (5, 0), (5, 5), (0, 7), (7, 3)] {
                let outcome = classify(u(value), u(value), u(original), schedule);
                assert_eq!(outcome.status, StorageStatus::Unchanged);
                assert_eq!(outcome.refund_delta, 0);
            }
        }
    }

    #[test]
    fn first_touch_statuses() {
        assert_eq!(
            write(1, 0, 0),
            StorageWrite {
                status: StorageStatus::Added,
                refund_delta: 0
            }
        );
        assert_eq!(
            write(0, 1, 1),
            StorageWrite {
                status: StorageStatus::Deleted,
                refund_delta: R
            }
        );
        assert_eq!(
            write(2, 1, 1),
            StorageWrite {
                status: StorageStatus::Modified,
                refund_delta: 0
            }
        );
    }

    #[test]
    fn legacy_schedule_ignores_original_value() {
        // current=5, new=0 is a plain delete whatever the original was.
        for original in [0, 5, 9] {
            let outcome = classify(u(0), u(5), u(original), &LEGACY_SCHEDULE);
            assert_eq!(outcome.status, StorageStatus::Deleted);
            assert_eq!(outcome.refund_delta, LEGACY_SCHEDULE.sstore_refund_gas);
        }
        let outcome = classify(u(3), u(0), u(7), &LEGACY_SCHEDULE);
        assert_eq!(outcome.status, StorageStatus::Added);
    }

    #[test]
    fn restoring_an_empty_slot() {
        // original=0, set to 5 earlier in the transaction, now back to 0.
        let outcome = write(0, 5, 0);
        assert_eq!(outcome.status, StorageStatus::ModifiedAgain);
        assert_eq!(outcome.refund_delta, R + RN);
    }

    #[test]
    fn restoring_a_non_empty_slot() {
        let outcome = write(3, 4, 3);
        assert_eq!(outcome.status, StorageStatus::ModifiedAgain);
        assert_eq!(outcome.refund_delta, RN);
    }

    #[test]
    fn un_clearing_takes_the_refund_back() {
        // original=3, cleared earlier, now set to 4.
        let outcome = write(4, 0, 3);
        assert_eq!(outcome.status, StorageStatus::ModifiedAgain);
        assert_eq!(outcome.refund_delta, -R);

        // Cleared earlier, now restored: take back the clear, grant the restore.
        let outcome = write(3, 0, 3);
        assert_eq!(outcome.refund_delta, -R + RN);
    }

    #[test]
    fn clearing_a_dirty_slot() {
        let outcome = write(0, 4, 3);
        assert_eq!(outcome.status, StorageStatus::ModifiedAgain);
        assert_eq!(outcome.refund_delta, R);
    }

    /// Applies a sequence of writes to one slot and returns the summed deltas.
    fn replay(original: u64, writes: &[u64], schedule: &HostSchedule) -> i64 {
        let mut current = original;
        let mut total = 0;
        for &new in writes {
            total += classify(u(new), u(current), u(original), schedule).refund_delta;
            current = new;
        }
        total
    }

    #[test]
    fn refunds_net_to_the_first_and_last_values() {
        // Sequences that do not end on the original value: the summed deltas
        // equal the delta of a single write from original to last.
        let sequences: &[(u64, &[u64])] = &[
            (3, &[0, 4, 0]),
            (3, &[4, 0, 4, 0]),
            (3, &[4, 0]),
            (3, &[3, 0]),
            (3, &[0, 4, 0, 5]),
            (7, &[8, 0, 9, 0]),
            (0, &[5, 6]),
        ];
        for schedule in [&CONSTANTINOPLE_SCHEDULE, &ISTANBUL_SCHEDULE] {
            for (original, writes) in sequences {
                let last = *writes.last().unwrap_or(original);
                let net = replay(*original, &[last], schedule);
                assert_eq!(
                    replay(*original, writes, schedule),
                    net,
                    "original={original} writes={writes:?}"
                );
            }
        }
    }

    #[test]
    fn un_clearing_can_drive_the_running_total_negative() {
        let schedule = &ISTANBUL_SCHEDULE;
        // Cleared, then set again: the clear's refund is fully taken back.
        assert_eq!(replay(3, &[0, 4], schedule), 0);
        // Observed in isolation the second write is a bare debit.
        assert!(classify(u(4), u(0), u(3), schedule).refund_delta < 0);
    }
}
