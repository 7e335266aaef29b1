// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Bus credit accounting.
//!
//! The chip advertises, in the software header of every frame it sends, how
//! far ahead the host may run with its transmit sequence numbers. The
//! dispatcher consults this state before every transmission; nothing else
//! touches it, so no locking is involved.

use core::cell::Cell;

use crate::sdpcm::SdpcmHeader;
use crate::utils::{CHANNEL_MASK, CREDIT_CHANNEL_COUNT, CREDIT_DELTA_BOUND};

pub struct CreditFlow {
    transmit_sequence: Cell<u8>,
    granted_credit: Cell<u8>,
    anomaly_high_water: Cell<u8>,
}

impl CreditFlow {
    pub fn new() -> CreditFlow {
        CreditFlow {
            transmit_sequence: Cell::new(0),
            granted_credit: Cell::new(1),
            anomaly_high_water: Cell::new(0),
        }
    }

    /// Consume the credit update carried in a received software header, and
    /// report whether the header asserts wireless flow control (the caller
    /// forwards that bit to the bus unconditionally).
    ///
    /// Credit only rides on the three payload channels; the glom/test
    /// channel values never update it. A jump larger than the sanity bound
    /// is treated as reordering noise: the committed credit is left alone
    /// and only the diagnostic high-water mark moves.
    pub fn apply(&self, header: &SdpcmHeader) -> bool {
        if header.channel_and_flags & CHANNEL_MASK < CREDIT_CHANNEL_COUNT {
            let delta = header.bus_data_credit.wrapping_sub(self.granted_credit.get());
            if delta <= CREDIT_DELTA_BOUND {
                self.granted_credit.set(header.bus_data_credit);
            } else if delta > self.anomaly_high_water.get() {
                self.anomaly_high_water.set(delta);
            }
        }
        header.wireless_flow_control != 0
    }

    /// Whether another frame may be placed on the bus.
    pub fn has_credit(&self) -> bool {
        self.transmit_sequence.get() != self.granted_credit.get()
    }

    /// Hand out the next transmit sequence number.
    pub fn next_sequence(&self) -> u8 {
        let sequence = self.transmit_sequence.get();
        self.transmit_sequence.set(sequence.wrapping_add(1));
        sequence
    }

    /// Reset to a fresh state. Required after a deep-sleep resume, where the
    /// chip's own counters restart.
    pub fn reinitialize(&self) {
        self.transmit_sequence.set(0);
        self.granted_credit.set(1);
    }

    /// Largest credit jump ever refused, for diagnostics.
    pub fn anomaly_high_water(&self) -> u8 {
        self.anomaly_high_water.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdpcm::ChannelType;

    fn header_with(channel: u8, credit: u8, flow_control: u8) -> SdpcmHeader {
        SdpcmHeader {
            len: 12,
            len_inv: !12,
            sequence: 0,
            channel_and_flags: channel,
            next_length: 0,
            header_length: 12,
            wireless_flow_control: flow_control,
            bus_data_credit: credit,
            reserved: [0; 2],
        }
    }

    #[test]
    fn credit_gates_transmission() {
        let flow = CreditFlow::new();
        // Fresh state: one frame of credit.
        assert!(flow.has_credit());
        assert_eq!(flow.next_sequence(), 0);
        assert!(!flow.has_credit());

        flow.apply(&header_with(ChannelType::Control as u8, 4, 0));
        assert!(flow.has_credit());
        assert_eq!(flow.next_sequence(), 1);
        assert_eq!(flow.next_sequence(), 2);
        assert_eq!(flow.next_sequence(), 3);
        assert!(!flow.has_credit());
    }

    #[test]
    fn credit_applies_on_all_payload_channels() {
        for channel in [
            ChannelType::Control as u8,
            ChannelType::Event as u8,
            ChannelType::Data as u8,
        ] {
            let flow = CreditFlow::new();
            flow.apply(&header_with(channel, 9, 0));
            let _ = flow.next_sequence();
            assert!(flow.has_credit());
        }
        // Channel values past the payload range carry no credit.
        let flow = CreditFlow::new();
        flow.apply(&header_with(3, 9, 0));
        let _ = flow.next_sequence();
        assert!(!flow.has_credit());
    }

    #[test]
    fn anomalous_jumps_are_recorded_not_applied() {
        let flow = CreditFlow::new();
        flow.apply(&header_with(0, 1u8.wrapping_add(0x41), 0));
        // Committed credit unchanged.
        let _ = flow.next_sequence();
        assert!(!flow.has_credit());
        assert_eq!(flow.anomaly_high_water(), 0x41);
        // A smaller anomaly does not lower the mark.
        flow.apply(&header_with(0, 1u8.wrapping_add(0x50), 0));
        assert_eq!(flow.anomaly_high_water(), 0x50);
    }

    #[test]
    fn wrapping_credit_delta() {
        let flow = CreditFlow::new();
        // Walk credit near the wrap point within the sanity bound.
        for credit in [0x40u8, 0x80, 0xc0, 0xff, 0x3e] {
            flow.apply(&header_with(0, credit, 0));
        }
        // granted == 0x3e now; sequence can run to meet it.
        let mut granted = 0;
        while flow.has_credit() {
            let _ = flow.next_sequence();
            granted += 1;
        }
        assert_eq!(granted, 0x3e);
    }

    #[test]
    fn flow_control_bit_is_reported() {
        let flow = CreditFlow::new();
        assert!(flow.apply(&header_with(0, 1, 1)));
        assert!(!flow.apply(&header_with(0, 1, 0)));
        // Reported even on channels that carry no credit.
        assert!(flow.apply(&header_with(3, 1, 2)));
    }

    #[test]
    fn reinitialize_restores_fresh_state() {
        let flow = CreditFlow::new();
        flow.apply(&header_with(0, 30, 0));
        for _ in 0..5 {
            let _ = flow.next_sequence();
        }
        flow.reinitialize();
        assert!(flow.has_credit());
        assert_eq!(flow.next_sequence(), 0);
        assert!(!flow.has_credit());
    }
}
