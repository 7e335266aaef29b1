// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! The outbound frame queue.
//!
//! Producers (Ethernet senders, the request engine) enqueue fully-framed
//! packets here; only the dispatcher pops them, so the wire sees frames in
//! strict FIFO order. Sequence numbers are stamped at pop time, which keeps
//! them monotonic in transmission order no matter when each frame was
//! built. The chip's credit accounting depends on that.

use crate::flow::CreditFlow;
use crate::pool::{Packet, PacketFifo};
use crate::sdpcm::{self, ChannelType, SEQUENCE_OFFSET};

use wlan_hil::ErrorCode;

/// Outcome of asking the queue for the next frame to put on the bus.
pub enum TxDequeue {
    /// A frame, sequence stamped, ready for the bus.
    Frame(Packet),
    /// Nothing queued.
    Empty,
    /// The bus transport reports flow control; try again later.
    FlowControlled,
    /// The chip has not granted credit for another frame.
    NoCredit,
}

pub struct SendQueue {
    fifo: PacketFifo,
}

impl SendQueue {
    pub fn new() -> SendQueue {
        SendQueue {
            fifo: PacketFifo::new(),
        }
    }

    /// Frame `packet` for `channel` and append it. On failure the packet
    /// comes back to the caller untouched by the queue (a full queue is the
    /// bounded analogue of losing the frame to contention; callers release
    /// or retry).
    pub fn enqueue(
        &self,
        mut packet: Packet,
        channel: ChannelType,
    ) -> Result<(), (ErrorCode, Packet)> {
        if let Err(err) = sdpcm::encode(&mut packet, channel) {
            return Err((err, packet));
        }
        self.fifo.push_back(packet)
    }

    /// Pop the next frame for transmission, subject to bus flow control and
    /// chip credit. The live sequence number is stamped into the frame here.
    pub fn dequeue_for_transmit(&self, flow: &CreditFlow, bus_flow_controlled: bool) -> TxDequeue {
        if bus_flow_controlled {
            return TxDequeue::FlowControlled;
        }
        if !flow.has_credit() {
            return TxDequeue::NoCredit;
        }
        match self.fifo.pop_front() {
            Some(mut packet) => {
                packet.data_mut()[SEQUENCE_OFFSET] = flow.next_sequence();
                TxDequeue::Frame(packet)
            }
            None => TxDequeue::Empty,
        }
    }

    /// Pull remaining frames out for release at shutdown.
    pub fn drain_next(&self) -> Option<Packet> {
        self.fifo.pop_front()
    }

    pub fn len(&self) -> usize {
        self.fifo.len()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use crate::pool::{BufferPool, Direction};
    use crate::sdpcm::{BdcHeader, SdpcmHeader, DATA_HEADROOM};
    use std::boxed::Box;

    fn grant_credit(flow: &CreditFlow, credit: u8) {
        let header = SdpcmHeader {
            len: 12,
            len_inv: !12,
            sequence: 0,
            channel_and_flags: 0,
            next_length: 0,
            header_length: 12,
            wireless_flow_control: 0,
            bus_data_credit: credit,
            reserved: [0; 2],
        };
        flow.apply(&header);
    }

    fn pool() -> &'static BufferPool<'static> {
        let pool = Box::leak(Box::new(BufferPool::new()));
        for _ in 0..8 {
            pool.give_tx_buffer(std::vec![0u8; 256].leak()).unwrap();
        }
        pool
    }

    fn data_packet(pool: &'static BufferPool<'static>, tag: u8) -> Packet {
        let mut packet = pool.allocate(Direction::Tx, DATA_HEADROOM + 8, 0).unwrap();
        packet.adjust_front(DATA_HEADROOM as isize).unwrap();
        packet.data_mut()[0] = tag;
        // The send path puts the BDC header on before enqueueing.
        packet.adjust_front(-(BdcHeader::SIZE as isize)).unwrap();
        let bdc = BdcHeader {
            flags: 0x20,
            priority: 0,
            flags2: 0,
            data_offset: 0,
        };
        packet.data_mut()[..BdcHeader::SIZE].copy_from_slice(&bdc.into_bytes());
        packet
    }

    #[test]
    fn fifo_order_and_monotonic_sequences() {
        let pool = pool();
        let queue = SendQueue::new();
        let flow = CreditFlow::new();
        grant_credit(&flow, 10);

        for tag in 0..3 {
            queue.enqueue(data_packet(pool, tag), ChannelType::Data).unwrap();
        }
        for expected in 0..3u8 {
            match queue.dequeue_for_transmit(&flow, false) {
                TxDequeue::Frame(packet) => {
                    let header = SdpcmHeader::from_bytes(packet.data());
                    assert_eq!(header.sequence, expected);
                    // FIFO order: the payload tag matches the sequence.
                    assert_eq!(packet.data()[DATA_HEADROOM], expected);
                    pool.release(packet);
                }
                _ => panic!("expected a frame"),
            }
        }
        assert!(matches!(
            queue.dequeue_for_transmit(&flow, false),
            TxDequeue::Empty
        ));
    }

    #[test]
    fn dequeue_respects_flow_control_and_credit() {
        let pool = pool();
        let queue = SendQueue::new();
        let flow = CreditFlow::new();
        queue.enqueue(data_packet(pool, 0), ChannelType::Data).unwrap();

        assert!(matches!(
            queue.dequeue_for_transmit(&flow, true),
            TxDequeue::FlowControlled
        ));
        // Fresh flow state carries exactly one frame of credit.
        match queue.dequeue_for_transmit(&flow, false) {
            TxDequeue::Frame(packet) => pool.release(packet),
            _ => panic!("expected a frame"),
        }
        queue.enqueue(data_packet(pool, 1), ChannelType::Data).unwrap();
        assert!(matches!(
            queue.dequeue_for_transmit(&flow, false),
            TxDequeue::NoCredit
        ));
        grant_credit(&flow, 5);
        match queue.dequeue_for_transmit(&flow, false) {
            TxDequeue::Frame(packet) => pool.release(packet),
            _ => panic!("expected a frame"),
        }
    }

    #[test]
    fn enqueue_without_headroom_returns_packet() {
        let pool = pool();
        let queue = SendQueue::new();
        let packet = pool.allocate(Direction::Tx, 8, 0).unwrap();
        let (err, packet) = queue.enqueue(packet, ChannelType::Data).unwrap_err();
        assert_eq!(err, ErrorCode::SIZE);
        pool.release(packet);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn drain_returns_everything_queued() {
        let pool = pool();
        let queue = SendQueue::new();
        for tag in 0..4 {
            queue.enqueue(data_packet(pool, tag), ChannelType::Data).unwrap();
        }
        let mut drained = 0;
        while let Some(packet) = queue.drain_next() {
            pool.release(packet);
            drained += 1;
        }
        assert_eq!(drained, 4);
        assert_eq!(pool.outstanding(), 0);
    }
}
