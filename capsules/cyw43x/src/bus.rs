// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Seams to the driver's external collaborators: the physical bus transport
//! below it and the network stack above it.
//!
//! The bus side owns byte-level transfer, chip power/clock sequencing and
//! firmware download; this driver never touches those. All calls into
//! [`WlanBus`] are made from the dispatcher only.

use crate::pool::Packet;
use crate::sdpcm::Interface;

use wlan_hil::ErrorCode;

/// The SDIO/gSPI transport under the driver.
pub trait WlanBus<'a> {
    /// Put one fully-framed packet on the bus. Ownership transfers on
    /// success; on failure the packet comes back for the caller to release
    /// or retry.
    fn send_frame(&self, frame: Packet) -> Result<(), (ErrorCode, Packet)>;

    /// Pull the next available frame off the bus, in arrival order. The bus
    /// allocates the packet from the shared pool and ownership transfers to
    /// the caller.
    fn read_frame(&self) -> Option<Packet>;

    /// Whether a frame is waiting to be read.
    fn packet_available(&self) -> bool;

    /// Mirror the wireless-flow-control bit from received software headers
    /// into the transport.
    fn set_flow_control(&self, engaged: bool);

    /// Whether the transport itself is currently asserting backpressure.
    fn is_flow_controlled(&self) -> bool;

    /// Whether the chip needs a wake handshake before the next transfer.
    fn is_asleep(&self) -> bool;

    /// Perform the deep-sleep wake handshake.
    fn resume_from_deep_sleep(&self) -> Result<(), ErrorCode>;

    /// Buses without a usable interrupt line report frame arrival purely by
    /// polling; the dispatcher then checks for receivable frames on every
    /// wake instead of waiting for `bus_interrupt`.
    fn uses_polling(&self) -> bool;

    fn set_client(&self, client: &'a dyn WlanBusClient);
}

/// How the bus wakes the dispatcher.
pub trait WlanBusClient {
    /// A bus interrupt fired. Safe to call from interrupt context; the
    /// driver only latches a flag and defers the drain.
    fn bus_interrupt(&self);
}

/// The network stack's ingestion point for received Ethernet frames.
/// Ownership of the frame transfers in; the client releases it back to the
/// pool when done.
pub trait NetworkClient {
    fn deliver_ethernet_frame(&self, frame: Packet, interface: Interface);
}

/// Consumer of undecoded frames while raw-capture mode is active. Ownership
/// transfers in.
pub trait RawFrameClient {
    fn raw_frame(&self, frame: Packet);
}
