// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Fixed network buffer pools and the owned packet handle built on them.
//!
//! A [`Packet`] is a move-only handle: every function that takes over a
//! packet consumes it by value and every borrower takes a reference, so a
//! buffer can neither be released twice nor used after release. Leaks are
//! tracked instead by the pool's outstanding count.

use core::cell::Cell;

use wlan_cells::numeric_cell_ext::NumericCellExt;
use wlan_cells::optional_cell::OptionalCell;
use wlan_cells::take_cell::TakeCell;
use wlan_hil::ErrorCode;

/// Buffers are tagged with the direction they serve; the pools are kept
/// separate so a receive burst cannot starve transmission or vice versa.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// Where a packet's memory came from, so `release` can return it there.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    Slot(usize),
    Overflow,
}

/// Slots per direction in the generic pool.
pub const POOL_SLOTS: usize = 8;

/// Capacity of a [`PacketFifo`].
pub const FIFO_DEPTH: usize = 8;

/// An application-supplied overflow pool, consulted when the generic pool
/// for a direction is exhausted.
pub trait BufferSource {
    fn allocate(&self, direction: Direction, size: usize) -> Option<&'static mut [u8]>;
    fn release(&self, direction: Direction, mem: &'static mut [u8]);
}

/// An owned, direction-tagged network buffer with an adjustable front
/// offset. The usable region is `data()`; headroom in front of it is
/// reserved or consumed with [`Packet::adjust_front`].
#[derive(Debug)]
pub struct Packet {
    mem: &'static mut [u8],
    front: usize,
    len: usize,
    direction: Direction,
    origin: Origin,
}

impl Packet {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current length of the usable data region.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Shrink or grow the data region in place. The region may not extend
    /// past the end of the underlying memory.
    pub fn set_len(&mut self, len: usize) -> Result<(), ErrorCode> {
        if len > self.mem.len() - self.front {
            return Err(ErrorCode::SIZE);
        }
        self.len = len;
        Ok(())
    }

    /// Move the start of the data region. A negative delta moves it backward
    /// into the headroom (reserving room for a header about to be written);
    /// a positive delta moves it forward (consuming a header already
    /// processed). Fails without side effects if the contiguous room is not
    /// there.
    pub fn adjust_front(&mut self, delta: isize) -> Result<(), ErrorCode> {
        if delta >= 0 {
            let delta = delta as usize;
            if delta > self.len {
                return Err(ErrorCode::SIZE);
            }
            self.front += delta;
            self.len -= delta;
        } else {
            let delta = delta.unsigned_abs();
            if delta > self.front {
                return Err(ErrorCode::SIZE);
            }
            self.front -= delta;
            self.len += delta;
        }
        Ok(())
    }

    /// Bytes of headroom in front of the data region.
    pub fn headroom(&self) -> usize {
        self.front
    }

    pub fn data(&self) -> &[u8] {
        &self.mem[self.front..self.front + self.len]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.mem[self.front..self.front + self.len]
    }

    /// Chaining is not used on this bus; every packet is a single piece.
    pub fn next_chained_piece(&self) -> Option<&Packet> {
        None
    }
}

/// Fixed per-direction buffer pools. Board integration seeds the slots with
/// static buffers once at construction time; an optional [`BufferSource`]
/// serves as overflow.
pub struct BufferPool<'a> {
    rx_slots: [TakeCell<'static, [u8]>; POOL_SLOTS],
    tx_slots: [TakeCell<'static, [u8]>; POOL_SLOTS],
    overflow: OptionalCell<&'a dyn BufferSource>,
    allocations: Cell<usize>,
    failures: Cell<usize>,
    outstanding: Cell<usize>,
    orphaned: Cell<usize>,
}

impl<'a> BufferPool<'a> {
    pub fn new() -> BufferPool<'a> {
        const EMPTY: TakeCell<'static, [u8]> = TakeCell::empty();
        BufferPool {
            rx_slots: [EMPTY; POOL_SLOTS],
            tx_slots: [EMPTY; POOL_SLOTS],
            overflow: OptionalCell::empty(),
            allocations: Cell::new(0),
            failures: Cell::new(0),
            outstanding: Cell::new(0),
            orphaned: Cell::new(0),
        }
    }

    /// Seed the receive pool with a buffer.
    pub fn give_rx_buffer(
        &self,
        mem: &'static mut [u8],
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        Self::seed(&self.rx_slots, mem)
    }

    /// Seed the transmit pool with a buffer.
    pub fn give_tx_buffer(
        &self,
        mem: &'static mut [u8],
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        Self::seed(&self.tx_slots, mem)
    }

    /// Register the application-supplied overflow pool.
    pub fn set_overflow_source(&self, source: &'a dyn BufferSource) {
        self.overflow.set(source);
    }

    fn seed(
        slots: &[TakeCell<'static, [u8]>; POOL_SLOTS],
        mem: &'static mut [u8],
    ) -> Result<(), (ErrorCode, &'static mut [u8])> {
        for slot in slots.iter() {
            if slot.is_none() {
                slot.put(Some(mem));
                return Ok(());
            }
        }
        Err((ErrorCode::NOMEM, mem))
    }

    fn slots(&self, direction: Direction) -> &[TakeCell<'static, [u8]>; POOL_SLOTS] {
        match direction {
            Direction::Rx => &self.rx_slots,
            Direction::Tx => &self.tx_slots,
        }
    }

    /// Allocate a packet of `size` bytes, trying the generic pool for the
    /// direction first and the overflow source second. `wait_budget` extra
    /// attempts are made before giving up; with a single owner draining the
    /// pools there is nothing to sleep on between attempts, so the budget
    /// only bounds retries.
    pub fn allocate(
        &self,
        direction: Direction,
        size: usize,
        wait_budget: usize,
    ) -> Result<Packet, ErrorCode> {
        let mut budget = wait_budget;
        loop {
            if let Some(packet) = self.try_allocate(direction, size) {
                self.allocations.increment();
                self.outstanding.increment();
                return Ok(packet);
            }
            if budget == 0 {
                self.failures.increment();
                return Err(ErrorCode::NOMEM);
            }
            budget -= 1;
        }
    }

    fn try_allocate(&self, direction: Direction, size: usize) -> Option<Packet> {
        for (index, slot) in self.slots(direction).iter().enumerate() {
            if let Some(mem) = slot.take() {
                if mem.len() >= size {
                    return Some(Packet {
                        mem,
                        front: 0,
                        len: size,
                        direction,
                        origin: Origin::Slot(index),
                    });
                }
                slot.put(Some(mem));
            }
        }
        self.overflow.get().and_then(|source| {
            source.allocate(direction, size).map(|mem| Packet {
                mem,
                front: 0,
                len: size,
                direction,
                origin: Origin::Overflow,
            })
        })
    }

    /// Return a packet's memory to the pool it came from.
    pub fn release(&self, packet: Packet) {
        self.outstanding.decrement();
        let Packet {
            mem,
            direction,
            origin,
            ..
        } = packet;
        match origin {
            Origin::Slot(index) => self.slots(direction)[index].put(Some(mem)),
            Origin::Overflow => match self.overflow.get() {
                Some(source) => source.release(direction, mem),
                // The source went away while its buffer was in flight; all
                // we can do is count the loss.
                None => self.orphaned.increment(),
            },
        }
    }

    /// Whether the pool for `direction` is exhausted right now, probed by an
    /// actual 1-byte no-wait allocation rather than a counter read.
    pub fn pool_is_full(&self, direction: Direction) -> bool {
        match self.allocate(direction, 1, 0) {
            Ok(packet) => {
                self.release(packet);
                false
            }
            Err(_) => true,
        }
    }

    /// Packets currently out of the pool.
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    pub fn allocation_count(&self) -> usize {
        self.allocations.get()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.get()
    }
}

/// A bounded FIFO of owned packets.
pub struct PacketFifo {
    slots: [Cell<Option<Packet>>; FIFO_DEPTH],
    head: Cell<usize>,
    tail: Cell<usize>,
}

impl PacketFifo {
    pub fn new() -> PacketFifo {
        const EMPTY: Cell<Option<Packet>> = Cell::new(None);
        PacketFifo {
            slots: [EMPTY; FIFO_DEPTH],
            head: Cell::new(0),
            tail: Cell::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.get() == self.tail.get()
    }

    pub fn is_full(&self) -> bool {
        (self.tail.get() + 1) % FIFO_DEPTH == self.head.get()
    }

    pub fn len(&self) -> usize {
        let head = self.head.get();
        let tail = self.tail.get();
        if tail >= head {
            tail - head
        } else {
            FIFO_DEPTH - head + tail
        }
    }

    /// Append a packet, or hand it back if the FIFO is full.
    pub fn push_back(&self, packet: Packet) -> Result<(), (ErrorCode, Packet)> {
        if self.is_full() {
            return Err((ErrorCode::NOMEM, packet));
        }
        let tail = self.tail.get();
        self.slots[tail].set(Some(packet));
        self.tail.set((tail + 1) % FIFO_DEPTH);
        Ok(())
    }

    pub fn pop_front(&self) -> Option<Packet> {
        if self.is_empty() {
            return None;
        }
        let head = self.head.get();
        let packet = self.slots[head].take();
        self.head.set((head + 1) % FIFO_DEPTH);
        packet
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::boxed::Box;

    fn pool_with_buffers(rx: usize, tx: usize, size: usize) -> &'static BufferPool<'static> {
        let pool = Box::leak(Box::new(BufferPool::new()));
        for _ in 0..rx {
            let mem = std::vec![0u8; size].leak();
            pool.give_rx_buffer(mem).unwrap();
        }
        for _ in 0..tx {
            let mem = std::vec![0u8; size].leak();
            pool.give_tx_buffer(mem).unwrap();
        }
        pool
    }

    #[test]
    fn allocate_and_release_accounting() {
        let pool = pool_with_buffers(2, 2, 128);
        let a = pool.allocate(Direction::Rx, 64, 0).unwrap();
        let b = pool.allocate(Direction::Rx, 64, 0).unwrap();
        assert_eq!(pool.outstanding(), 2);
        assert_eq!(pool.allocation_count(), 2);
        // Third RX allocation fails even with a retry budget; the TX pool is
        // untouched by RX exhaustion.
        assert_eq!(
            pool.allocate(Direction::Rx, 64, 3).unwrap_err(),
            ErrorCode::NOMEM
        );
        assert_eq!(pool.failure_count(), 1);
        assert!(pool.allocate(Direction::Tx, 64, 0).is_ok());
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.outstanding(), 1);
        assert!(pool.allocate(Direction::Rx, 64, 0).is_ok());
    }

    #[test]
    fn allocation_skips_undersized_slots() {
        let pool = Box::leak(Box::new(BufferPool::new()));
        pool.give_rx_buffer(std::vec![0u8; 32].leak()).unwrap();
        pool.give_rx_buffer(std::vec![0u8; 256].leak()).unwrap();
        let packet = pool.allocate(Direction::Rx, 100, 0).unwrap();
        assert_eq!(packet.len(), 100);
        // The 32-byte buffer is still there for a small request.
        let small = pool.allocate(Direction::Rx, 16, 0).unwrap();
        assert_eq!(small.len(), 16);
        pool.release(packet);
        pool.release(small);
    }

    #[test]
    fn overflow_source_serves_exhausted_pool() {
        struct Spare {
            mem: TakeCell<'static, [u8]>,
            releases: Cell<usize>,
        }
        impl BufferSource for Spare {
            fn allocate(&self, _direction: Direction, size: usize) -> Option<&'static mut [u8]> {
                self.mem.take().filter(|mem| mem.len() >= size)
            }
            fn release(&self, _direction: Direction, mem: &'static mut [u8]) {
                self.releases.increment();
                self.mem.put(Some(mem));
            }
        }

        let pool = pool_with_buffers(0, 0, 0);
        let source = Box::leak(Box::new(Spare {
            mem: TakeCell::new(std::vec![0u8; 64].leak()),
            releases: Cell::new(0),
        }));
        pool.set_overflow_source(source);
        let packet = pool.allocate(Direction::Tx, 48, 0).unwrap();
        pool.release(packet);
        assert_eq!(source.releases.get(), 1);
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn pool_is_full_is_an_active_probe() {
        let pool = pool_with_buffers(1, 0, 16);
        assert!(!pool.pool_is_full(Direction::Rx));
        assert!(pool.pool_is_full(Direction::Tx));
        let held = pool.allocate(Direction::Rx, 1, 0).unwrap();
        assert!(pool.pool_is_full(Direction::Rx));
        pool.release(held);
        assert!(!pool.pool_is_full(Direction::Rx));
        // The probe itself leaks nothing.
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn adjust_front_moves_within_bounds() {
        let pool = pool_with_buffers(1, 0, 64);
        let mut packet = pool.allocate(Direction::Rx, 64, 0).unwrap();
        assert_eq!(packet.headroom(), 0);
        // No headroom to move back into.
        assert_eq!(packet.adjust_front(-1).unwrap_err(), ErrorCode::SIZE);
        packet.adjust_front(20).unwrap();
        assert_eq!(packet.headroom(), 20);
        assert_eq!(packet.len(), 44);
        packet.data_mut()[0] = 0xab;
        packet.adjust_front(-8).unwrap();
        assert_eq!(packet.headroom(), 12);
        assert_eq!(packet.data()[8], 0xab);
        // Cannot consume more than the data region holds.
        assert_eq!(packet.adjust_front(64).unwrap_err(), ErrorCode::SIZE);
        pool.release(packet);
    }

    #[test]
    fn set_len_bounded_by_capacity() {
        let pool = pool_with_buffers(1, 0, 64);
        let mut packet = pool.allocate(Direction::Rx, 16, 0).unwrap();
        packet.set_len(64).unwrap();
        assert_eq!(packet.set_len(65).unwrap_err(), ErrorCode::SIZE);
        packet.adjust_front(32).unwrap();
        assert_eq!(packet.set_len(33).unwrap_err(), ErrorCode::SIZE);
        pool.release(packet);
    }

    #[test]
    fn fifo_preserves_order_and_bounds() {
        let pool = pool_with_buffers(0, POOL_SLOTS, 16);
        let fifo = PacketFifo::new();
        assert!(fifo.pop_front().is_none());
        for i in 0..FIFO_DEPTH - 1 {
            let mut packet = pool.allocate(Direction::Tx, 4, 0).unwrap();
            packet.data_mut()[0] = i as u8;
            fifo.push_back(packet).unwrap();
        }
        assert!(fifo.is_full());
        let extra = pool.allocate(Direction::Tx, 4, 0).unwrap();
        let (err, extra) = fifo.push_back(extra).unwrap_err();
        assert_eq!(err, ErrorCode::NOMEM);
        pool.release(extra);
        for i in 0..FIFO_DEPTH - 1 {
            let packet = fifo.pop_front().unwrap();
            assert_eq!(packet.data()[0], i as u8);
            pool.release(packet);
        }
        assert!(fifo.is_empty());
        assert_eq!(pool.outstanding(), 0);
    }
}
