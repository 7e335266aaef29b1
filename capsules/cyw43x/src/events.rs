// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! The asynchronous event subscription table.
//!
//! A bounded array of slots, each holding a static list of event codes and
//! the handler interested in them. Event lists are identified by pointer, so
//! re-subscribing the same list updates the existing slot in place and a
//! `None` handler deletes it. The union of all subscribed codes is what the
//! driver pushes to the chip as its event mask, so the chip only emits
//! events somebody is listening for.

use core::cell::Cell;

use crate::sdpcm::{Event, EventMessage};

use wlan_hil::ErrorCode;

/// Slots in the table. Exceeding this is a reported error, never a silent
/// drop of the subscriber set.
pub const EVENT_TABLE_SLOTS: usize = 5;

/// Length of the classic compact event mask (one bit per code below 128).
pub(crate) const EVENT_MASK_LEGACY_LEN: usize = 16;

/// Largest mask the extended IOVAR form can carry here (codes below 256).
pub(crate) const EVENT_MASK_EXT_MAX: usize = 32;

/// `event_msgs_ext` payload version understood by the firmware.
pub(crate) const EVENT_MSGS_EXT_VERSION: u8 = 1;

/// `event_msgs_ext` command selector: replace the mask.
pub(crate) const EVENTMSGS_SET_MASK: u8 = 1;

/// Receives events matching a subscription. The payload borrow ends when the
/// callback returns; the dispatcher releases the frame afterward.
pub trait EventClient {
    fn event(&self, message: &EventMessage, payload: &[u8]);
}

#[derive(Clone, Copy)]
struct Subscription<'a> {
    events: &'static [Event],
    client: &'a dyn EventClient,
}

pub struct EventTable<'a> {
    slots: [Cell<Option<Subscription<'a>>>; EVENT_TABLE_SLOTS],
}

fn same_client(a: &dyn EventClient, b: &dyn EventClient) -> bool {
    let a = a as *const dyn EventClient as *const ();
    let b = b as *const dyn EventClient as *const ();
    core::ptr::eq(a, b)
}

impl<'a> EventTable<'a> {
    pub fn new() -> EventTable<'a> {
        EventTable {
            slots: core::array::from_fn(|_| Cell::new(None)),
        }
    }

    /// Subscribe `client` to the codes in `events`, update an existing
    /// subscription for the same list, or delete it when `client` is `None`.
    /// Returns `ErrorCode::NOMEM` when all slots are taken.
    pub fn subscribe(
        &self,
        events: &'static [Event],
        client: Option<&'a dyn EventClient>,
    ) -> Result<(), ErrorCode> {
        // An existing slot for this exact list wins over a free one.
        for slot in self.slots.iter() {
            if let Some(existing) = slot.get() {
                if core::ptr::eq(existing.events, events) {
                    match client {
                        None => slot.set(None),
                        Some(client) => {
                            if !same_client(existing.client, client) {
                                slot.set(Some(Subscription { events, client }));
                            }
                            // Identical handler: already subscribed.
                        }
                    }
                    return Ok(());
                }
            }
        }
        let Some(client) = client else {
            // Deleting something that was never subscribed.
            return Ok(());
        };
        for slot in self.slots.iter() {
            if slot.get().is_none() {
                slot.set(Some(Subscription { events, client }));
                return Ok(());
            }
        }
        Err(ErrorCode::NOMEM)
    }

    /// Fan an event out to its subscriber. Slots are scanned in index order
    /// and event lists in declaration order; the first match fires and the
    /// scan stops, so each event reaches at most one handler. Returns
    /// whether a handler ran.
    pub fn dispatch(&self, message: &EventMessage, payload: &[u8]) -> bool {
        for slot in self.slots.iter() {
            if let Some(subscription) = slot.get() {
                for event in subscription.events.iter() {
                    if *event as u32 == message.event_type {
                        subscription.client.event(message, payload);
                        return true;
                    }
                }
            }
        }
        false
    }

    /// OR every subscribed code into `mask` and return the highest code
    /// seen, or `None` when nothing is subscribed.
    pub fn union_mask(&self, mask: &mut [u8; EVENT_MASK_EXT_MAX]) -> Option<u32> {
        let mut highest = None;
        for slot in self.slots.iter() {
            if let Some(subscription) = slot.get() {
                for event in subscription.events.iter() {
                    let code = *event as u32;
                    mask[(code / 8) as usize] |= 1 << (code % 8);
                    if highest.map_or(true, |h| code > h) {
                        highest = Some(code);
                    }
                }
            }
        }
        highest
    }

    pub fn subscription_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }
}
