// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! CYW43x WLAN host transport driver.
//!
//! Datasheet: <https://www.mouser.com/datasheet/2/196/Infineon_CYW43439_DataSheet_v03_00_EN-3074791.pdf>
//!
//! Host side of the SDPCM link to an SDIO/gSPI-attached CYW43-family WLAN
//! chip. The framing protocol multiplexes three kinds of traffic over the
//! one bus — configuration requests (IOCTL/IOVAR), Ethernet data, and
//! asynchronous radio events — under a credit scheme the chip uses to pace
//! the host. This crate turns that protocol into three host-visible
//! operations: send an Ethernet frame, issue a configuration request, and
//! deliver a radio event to a subscriber.
//!
//! The physical bus (byte transfer, chip power sequencing, firmware
//! download) and the network stack above are external collaborators reached
//! through the traits in [`bus`].

#![no_std]
#![forbid(unsafe_code)]

pub mod bus;

mod component;
mod driver;
mod events;
mod flow;
mod ioctl;
mod pool;
mod queue;
mod sdpcm;
mod utils;

pub use component::Cyw43xComponent;
pub use driver::Cyw43x;
pub use events::{EventClient, EVENT_TABLE_SLOTS};
pub use ioctl::IoctlClient;
pub use pool::{BufferPool, BufferSource, Direction, Packet, PacketFifo, FIFO_DEPTH, POOL_SLOTS};
pub use sdpcm::{
    ChannelType, Event, EventMessage, Interface, IoctlCommand, IoctlType, CONTROL_HEADROOM,
    DATA_HEADROOM, INTERFACE_COUNT, LINK_MTU,
};
