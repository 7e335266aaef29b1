// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! The configuration request engine.
//!
//! IOCTL/IOVAR requests are strictly serialized: at most one is outstanding
//! per driver instance, enforced by the pending slot (`ErrorCode::BUSY`
//! while occupied). Each request carries a fresh correlation id in its
//! control sub-header; a reply only completes the request whose id it
//! echoes, so a stale or duplicate reply can never satisfy a later wait.
//! Requests end in exactly one of: matched reply, timeout, shutdown.

use core::cell::Cell;

use crate::pool::Packet;
use crate::sdpcm::{CdcHeader, Interface, IoctlType};

use wlan_cells::numeric_cell_ext::NumericCellExt;
use wlan_cells::optional_cell::OptionalCell;
use wlan_hil::ErrorCode;

/// Set/Get action bit in `CdcHeader::flags`.
pub(crate) const CDC_FLAG_SET: u32 = 0x02;
/// Target interface index, bits 12..16 of `CdcHeader::flags`.
pub(crate) const CDC_IFACE_SHIFT: u32 = 12;
/// Correlation id, bits 16..32 of `CdcHeader::flags`.
pub(crate) const CDC_ID_SHIFT: u32 = 16;

/// Reply deadline. Sized to tolerate the chip waking from deep sleep before
/// it can answer.
pub(crate) const IOCTL_TIMEOUT_MS: u32 = 400;

/// Largest request payload actually placed on the wire. Oversized requests
/// (manufacturing and diagnostic paths) are truncated on the wire while the
/// control sub-header keeps the true logical length.
pub(crate) const IOVAR_WIRE_LIMIT: usize = 1536;

/// Alignment padding reserved in front of an IOVAR's variable name while
/// the request is built; stripped before the frame is queued.
pub(crate) const IOVAR_ALIGN_PAD: usize = 4;

/// Completion callback for requests. Runs with the pending slot already
/// free, so it may immediately issue the next request.
pub trait IoctlClient {
    /// `Ok(Some(reply))` carries the raw reply with its headers stripped
    /// (only when the request asked for it; the packet is owned by the
    /// callee). `Ok(None)` is a successful completion without a reply
    /// payload. `Err(NOACK)` is a timeout, `Err(FAIL)` a firmware error
    /// status, `Err(CANCEL)` a shutdown.
    fn ioctl_done(&self, result: Result<Option<Packet>, ErrorCode>);
}

#[derive(Clone, Copy)]
pub(crate) struct PendingRequest {
    pub id: u16,
    pub want_response: bool,
    /// Driver-originated housekeeping request (e.g. the event mask push):
    /// its completion is swallowed instead of reaching the client.
    pub internal: bool,
}

pub(crate) enum ReplyMatch {
    /// The reply correlates with the outstanding request, which is now
    /// cleared.
    Deliver(PendingRequest),
    /// Wrong id; release the reply and keep waiting.
    Stale,
}

pub struct RequestEngine<'a> {
    pending: Cell<Option<PendingRequest>>,
    next_id: Cell<u16>,
    stale_replies: Cell<usize>,
    client: OptionalCell<&'a dyn IoctlClient>,
}

impl<'a> RequestEngine<'a> {
    pub fn new() -> RequestEngine<'a> {
        RequestEngine {
            pending: Cell::new(None),
            next_id: Cell::new(0),
            stale_replies: Cell::new(0),
            client: OptionalCell::empty(),
        }
    }

    pub fn set_client(&self, client: &'a dyn IoctlClient) {
        self.client.set(client);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Claim the single request slot and write the control sub-header over
    /// `packet`'s headroom. `logical_len` is the payload length reported to
    /// the firmware, which exceeds `packet.len()` when the wire copy was
    /// truncated.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn begin(
        &self,
        kind: IoctlType,
        cmd: u32,
        interface: Interface,
        packet: &mut Packet,
        logical_len: usize,
        want_response: bool,
        internal: bool,
    ) -> Result<(), ErrorCode> {
        if self.pending.get().is_some() {
            return Err(ErrorCode::BUSY);
        }
        let id = self.next_id.get().wrapping_add(1);
        self.next_id.set(id);

        packet.adjust_front(-(CdcHeader::SIZE as isize))?;
        let action = match kind {
            IoctlType::Get => 0,
            IoctlType::Set => CDC_FLAG_SET,
        };
        let header = CdcHeader {
            cmd,
            len: logical_len as u32,
            flags: action
                | ((interface.index() as u32) << CDC_IFACE_SHIFT)
                | ((id as u32) << CDC_ID_SHIFT),
            status: 0,
        };
        packet.data_mut()[..CdcHeader::SIZE].copy_from_slice(&header.into_bytes());

        self.pending.set(Some(PendingRequest {
            id,
            want_response,
            internal,
        }));
        Ok(())
    }

    /// Release the pending slot without completing it (the request never
    /// made it onto the queue).
    pub(crate) fn abandon(&self) {
        self.pending.set(None);
    }

    /// Correlate a received control reply with the outstanding request. On a
    /// match the pending slot is cleared before returning, so the completion
    /// callback can start the next request.
    pub(crate) fn match_reply(&self, id: u16) -> ReplyMatch {
        match self.pending.get() {
            Some(request) if request.id == id => {
                self.pending.set(None);
                ReplyMatch::Deliver(request)
            }
            _ => {
                self.stale_replies.increment();
                ReplyMatch::Stale
            }
        }
    }

    /// Give up on the outstanding request (reply deadline passed). Returns
    /// the request that timed out, with the slot already free.
    pub(crate) fn take_timeout(&self) -> Option<PendingRequest> {
        self.pending.take()
    }

    pub(crate) fn notify(&self, result: Result<Option<Packet>, ErrorCode>) {
        match self.client.get() {
            Some(client) => client.ioctl_done(result),
            None => {
                // No client: a reply packet has nowhere to go. The caller
                // only passes owned packets here when a client exists.
            }
        }
    }

    /// Replies discarded because their id did not match the outstanding
    /// request.
    pub fn stale_reply_count(&self) -> usize {
        self.stale_replies.get()
    }
}
