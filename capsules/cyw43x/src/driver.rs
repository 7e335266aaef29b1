// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! The dispatcher: single owner of all bus traffic.
//!
//! Producers only ever touch the send queue, the request engine and the
//! subscription table; the dispatcher alone moves frames across the bus, in
//! both directions, so bus access itself needs no lock. It runs as an
//! explicit state machine driven by three wake causes: a bus interrupt, a
//! notify from a producer that just queued a frame, and a stop request.
//! On every wake it performs the deep-sleep handshake if the chip needs
//! one, fully drains receivable frames, then drains the send queue as far
//! as credit and flow control allow. RX strictly precedes TX so that credit
//! granted in incoming headers is applied before more frames go out.

use core::cell::Cell;
use core::ffi::CStr;

use crate::bus::{NetworkClient, RawFrameClient, WlanBus, WlanBusClient};
use crate::events::{
    EventClient, EventTable, EVENTMSGS_SET_MASK, EVENT_MASK_EXT_MAX, EVENT_MASK_LEGACY_LEN,
    EVENT_MSGS_EXT_VERSION,
};
use crate::flow::CreditFlow;
use crate::ioctl::{
    IoctlClient, ReplyMatch, RequestEngine, CDC_ID_SHIFT, IOCTL_TIMEOUT_MS, IOVAR_ALIGN_PAD,
    IOVAR_WIRE_LIMIT,
};
use crate::pool::{BufferPool, Direction, Packet};
use crate::queue::{SendQueue, TxDequeue};
use crate::sdpcm::{
    self, BdcHeader, CdcHeader, ChannelType, Event, EventMask, EventMaskExtHeader, Interface,
    IoctlCommand, IoctlType, SdpcmHeader, CONTROL_HEADROOM,
};
use crate::utils::{BDC_VERSION, BDC_VERSION_SHIFT, CHANNEL_MASK};

use enum_primitive::cast::FromPrimitive;

use wlan_cells::numeric_cell_ext::NumericCellExt;
use wlan_cells::optional_cell::OptionalCell;
use wlan_hil::time::{Alarm, AlarmClient, Frequency, Time};
use wlan_hil::ErrorCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DispatcherState {
    Idle,
    DrainingRx,
    DrainingTx,
    ShutDown,
}

pub struct Cyw43x<'a, A: Alarm<'a>, B: WlanBus<'a>> {
    bus: &'a B,
    alarm: &'a A,
    pool: &'a BufferPool<'a>,
    queue: SendQueue,
    flow: CreditFlow,
    engine: RequestEngine<'a>,
    events: EventTable<'a>,

    state: Cell<DispatcherState>,
    /// Latched by `bus_interrupt`, consumed by `service`.
    irq_pending: Cell<bool>,
    /// A wake arrived while a drain cycle was running.
    wake_pending: Cell<bool>,

    net_client: OptionalCell<&'a dyn NetworkClient>,
    raw_client: OptionalCell<&'a dyn RawFrameClient>,
    raw_capture: Cell<bool>,

    /// Priority remap advertised by the associated AP, applied on the
    /// station interface on top of the DSCP-derived priority.
    ap_priority_map: Cell<[u8; 8]>,

    dropped_frames: Cell<usize>,
}

impl<'a, A: Alarm<'a>, B: WlanBus<'a>> Cyw43x<'a, A, B> {
    pub fn new(bus: &'a B, alarm: &'a A, pool: &'a BufferPool<'a>) -> Cyw43x<'a, A, B> {
        Cyw43x {
            bus,
            alarm,
            pool,
            queue: SendQueue::new(),
            flow: CreditFlow::new(),
            engine: RequestEngine::new(),
            events: EventTable::new(),
            state: Cell::new(DispatcherState::Idle),
            irq_pending: Cell::new(false),
            wake_pending: Cell::new(false),
            net_client: OptionalCell::empty(),
            raw_client: OptionalCell::empty(),
            raw_capture: Cell::new(false),
            ap_priority_map: Cell::new([0, 1, 2, 3, 4, 5, 6, 7]),
            dropped_frames: Cell::new(0),
        }
    }

    pub fn set_network_client(&self, client: &'a dyn NetworkClient) {
        self.net_client.set(client);
    }

    pub fn set_ioctl_client(&self, client: &'a dyn IoctlClient) {
        self.engine.set_client(client);
    }

    pub fn register_raw_frame_processor(&self, client: &'a dyn RawFrameClient) {
        self.raw_client.set(client);
    }

    pub fn set_raw_capture(&self, active: bool) {
        self.raw_capture.set(active);
    }

    /// Install the allowed-priority remap learned from the AP.
    pub fn set_allowed_priority_map(&self, map: [u8; 8]) {
        self.ap_priority_map.set(map);
    }

    pub fn buffer_pool(&self) -> &'a BufferPool<'a> {
        self.pool
    }

    /// Queue an Ethernet frame for transmission. The frame must carry
    /// [`sdpcm::DATA_HEADROOM`] bytes of headroom in front of its payload.
    /// Ownership transfers on success; on failure the frame comes back for
    /// the caller to release or retry.
    pub fn send_ethernet_frame(
        &self,
        mut frame: Packet,
        interface: Interface,
    ) -> Result<(), (ErrorCode, Packet)> {
        if let DispatcherState::ShutDown = self.state.get() {
            return Err((ErrorCode::OFF, frame));
        }
        let mut priority = sdpcm::frame_priority(frame.data());
        if let Interface::Station = interface {
            priority = self.ap_priority_map.get()[(priority & 0x7) as usize];
        }
        if let Err(err) = frame.adjust_front(-(BdcHeader::SIZE as isize)) {
            return Err((err, frame));
        }
        let bdc = BdcHeader {
            flags: BDC_VERSION << BDC_VERSION_SHIFT,
            priority,
            flags2: interface.index() as u8,
            data_offset: 0,
        };
        frame.data_mut()[..BdcHeader::SIZE].copy_from_slice(&bdc.into_bytes());
        match self.queue.enqueue(frame, ChannelType::Data) {
            Ok(()) => {
                self.service();
                Ok(())
            }
            Err((err, mut frame)) => {
                let _ = frame.adjust_front(BdcHeader::SIZE as isize);
                Err((err, frame))
            }
        }
    }

    /// Issue a configuration request. `packet` holds the request payload and
    /// must carry [`CONTROL_HEADROOM`] bytes of headroom. Completion is
    /// delivered through the registered [`IoctlClient`]; at most one request
    /// is outstanding at a time (`ErrorCode::BUSY` otherwise).
    pub fn send_ioctl(
        &self,
        kind: IoctlType,
        cmd: IoctlCommand,
        interface: Interface,
        mut packet: Packet,
        want_response: bool,
    ) -> Result<(), (ErrorCode, Packet)> {
        if let DispatcherState::ShutDown = self.state.get() {
            return Err((ErrorCode::OFF, packet));
        }
        let logical_len = packet.len();
        if let Err(err) = self.engine.begin(
            kind,
            cmd as u32,
            interface,
            &mut packet,
            logical_len,
            want_response,
            false,
        ) {
            return Err((err, packet));
        }
        match self.queue.enqueue(packet, ChannelType::Control) {
            Ok(()) => {
                self.arm_request_timeout();
                self.service();
                Ok(())
            }
            Err((err, mut packet)) => {
                self.engine.abandon();
                let _ = packet.adjust_front(CdcHeader::SIZE as isize);
                Err((err, packet))
            }
        }
    }

    /// Issue a named-variable request. The variable name (with its NUL) is
    /// placed in front of `payload`; requests larger than the wire limit are
    /// truncated on the wire while the control sub-header reports the true
    /// logical length.
    pub fn send_iovar(
        &self,
        kind: IoctlType,
        name: &CStr,
        payload: &[u8],
        interface: Interface,
        want_response: bool,
    ) -> Result<(), ErrorCode> {
        self.send_iovar_raw(kind, name, payload, interface, want_response, false)
    }

    fn send_iovar_raw(
        &self,
        kind: IoctlType,
        name: &CStr,
        payload: &[u8],
        interface: Interface,
        want_response: bool,
        internal: bool,
    ) -> Result<(), ErrorCode> {
        if let DispatcherState::ShutDown = self.state.get() {
            return Err(ErrorCode::OFF);
        }
        if self.engine.is_pending() {
            return Err(ErrorCode::BUSY);
        }
        let name_bytes = name.to_bytes_with_nul();
        let logical_len = name_bytes.len() + payload.len();
        let wire_len = logical_len.min(IOVAR_WIRE_LIMIT);

        let mut packet = self.pool.allocate(
            Direction::Tx,
            CONTROL_HEADROOM + IOVAR_ALIGN_PAD + wire_len,
            0,
        )?;
        if let Err(err) = self.build_iovar(&mut packet, name_bytes, payload, wire_len) {
            self.pool.release(packet);
            return Err(err);
        }
        let cmd = match kind {
            IoctlType::Get => IoctlCommand::GetVar,
            IoctlType::Set => IoctlCommand::SetVar,
        };
        if let Err(err) = self.engine.begin(
            kind,
            cmd as u32,
            interface,
            &mut packet,
            logical_len,
            want_response,
            internal,
        ) {
            self.pool.release(packet);
            return Err(err);
        }
        match self.queue.enqueue(packet, ChannelType::Control) {
            Ok(()) => {
                self.arm_request_timeout();
                self.service();
                Ok(())
            }
            Err((err, packet)) => {
                self.engine.abandon();
                self.pool.release(packet);
                Err(err)
            }
        }
    }

    fn build_iovar(
        &self,
        packet: &mut Packet,
        name_bytes: &[u8],
        payload: &[u8],
        wire_len: usize,
    ) -> Result<(), ErrorCode> {
        packet.adjust_front(CONTROL_HEADROOM as isize)?;
        let data = packet.data_mut();
        data[..IOVAR_ALIGN_PAD].fill(0);
        let body = &mut data[IOVAR_ALIGN_PAD..];
        let name_len = name_bytes.len().min(wire_len);
        body[..name_len].copy_from_slice(&name_bytes[..name_len]);
        let payload_len = wire_len - name_len;
        body[name_len..name_len + payload_len].copy_from_slice(&payload[..payload_len]);
        // Strip the alignment padding; the name must be the first thing the
        // firmware sees after the control sub-header.
        packet.adjust_front(IOVAR_ALIGN_PAD as isize)
    }

    /// Subscribe without updating the chip-side mask.
    pub fn set_event_handler(
        &self,
        events: &'static [Event],
        client: Option<&'a dyn EventClient>,
    ) -> Result<(), ErrorCode> {
        self.events.subscribe(events, client)
    }

    /// Subscribe and push the resulting union mask to the chip so it only
    /// emits events somebody is listening for.
    pub fn register_event_handler(
        &self,
        events: &'static [Event],
        client: Option<&'a dyn EventClient>,
        interface: Interface,
    ) -> Result<(), ErrorCode> {
        self.events.subscribe(events, client)?;
        self.push_subscription_mask(interface)
    }

    /// Push the union of all subscribed event codes to the chip. The mask is
    /// collected from the table first and only then issued through the
    /// request engine; dispatching never runs concurrently with the
    /// collection, which is what keeps this ordering safe.
    pub fn push_subscription_mask(&self, interface: Interface) -> Result<(), ErrorCode> {
        let mut mask = [0u8; EVENT_MASK_EXT_MAX];
        let highest = self.events.union_mask(&mut mask);
        if self.bus.is_asleep() {
            // The mask IOVAR must reach the chip awake.
            self.bus.resume_from_deep_sleep()?;
        }
        match highest {
            Some(code) if code as usize >= EVENT_MASK_LEGACY_LEN * 8 => {
                let mask_len = (code as usize / 8) + 1;
                let header = EventMaskExtHeader {
                    version: EVENT_MSGS_EXT_VERSION,
                    command: EVENTMSGS_SET_MASK,
                    length: mask_len as u8,
                    max_get_size: mask_len as u8,
                };
                let mut payload = [0u8; EventMaskExtHeader::SIZE + EVENT_MASK_EXT_MAX];
                payload[..EventMaskExtHeader::SIZE].copy_from_slice(&header.into_bytes());
                payload[EventMaskExtHeader::SIZE..][..mask_len].copy_from_slice(&mask[..mask_len]);
                self.send_iovar_raw(
                    IoctlType::Set,
                    c"event_msgs_ext",
                    &payload[..EventMaskExtHeader::SIZE + mask_len],
                    interface,
                    false,
                    true,
                )
            }
            _ => {
                let mut legacy = EventMask {
                    iface: interface.index() as u32,
                    events: [0; EVENT_MASK_LEGACY_LEN],
                };
                legacy.events.copy_from_slice(&mask[..EVENT_MASK_LEGACY_LEN]);
                self.send_iovar_raw(
                    IoctlType::Set,
                    c"bsscfg:event_msgs",
                    &legacy.into_bytes(),
                    interface,
                    false,
                    true,
                )
            }
        }
    }

    /// Reset credit accounting after the chip resumed from deep sleep (its
    /// counters restart) and run a drain cycle.
    pub fn resume(&self) {
        self.flow.reinitialize();
        self.service();
    }

    /// Stop the dispatcher: no frame queued for transmission is transmitted,
    /// but every one of them is released. An outstanding request completes
    /// with `Err(CANCEL)`.
    pub fn stop(&self) {
        if let DispatcherState::ShutDown = self.state.get() {
            return;
        }
        self.state.set(DispatcherState::ShutDown);
        let _ = self.alarm.disable();
        if let Some(request) = self.engine.take_timeout() {
            if !request.internal {
                self.engine.notify(Err(ErrorCode::CANCEL));
            }
        }
        while let Some(packet) = self.queue.drain_next() {
            self.pool.release(packet);
        }
    }

    /// The dispatcher main loop. Runs to completion on the caller's context;
    /// wakes arriving while a cycle is in progress are latched and handled
    /// before returning to idle.
    pub fn service(&self) {
        match self.state.get() {
            DispatcherState::Idle => {}
            DispatcherState::ShutDown => return,
            DispatcherState::DrainingRx | DispatcherState::DrainingTx => {
                self.wake_pending.set(true);
                return;
            }
        }
        loop {
            if self.bus.is_asleep() && self.bus.resume_from_deep_sleep().is_err() {
                break;
            }
            if self.irq_pending.take() || self.bus.uses_polling() {
                self.state.set(DispatcherState::DrainingRx);
                while self.bus.packet_available() {
                    match self.bus.read_frame() {
                        Some(packet) => self.process_frame(packet),
                        None => break,
                    }
                    if let DispatcherState::ShutDown = self.state.get() {
                        return;
                    }
                }
            }
            if let DispatcherState::ShutDown = self.state.get() {
                return;
            }
            self.state.set(DispatcherState::DrainingTx);
            loop {
                match self
                    .queue
                    .dequeue_for_transmit(&self.flow, self.bus.is_flow_controlled())
                {
                    TxDequeue::Frame(packet) => {
                        if let Err((_, packet)) = self.bus.send_frame(packet) {
                            self.pool.release(packet);
                            break;
                        }
                    }
                    TxDequeue::Empty | TxDequeue::FlowControlled | TxDequeue::NoCredit => break,
                }
                if let DispatcherState::ShutDown = self.state.get() {
                    return;
                }
            }
            if let DispatcherState::ShutDown = self.state.get() {
                return;
            }
            self.state.set(DispatcherState::Idle);
            if !self.wake_pending.take() && !self.irq_pending.get() {
                break;
            }
        }
    }

    fn arm_request_timeout(&self) {
        let tics = (A::Frequency::frequency() / 1000).saturating_mul(IOCTL_TIMEOUT_MS);
        self.alarm.set_alarm(self.alarm.now().wrapping_add(tics));
    }

    fn drop_frame(&self, packet: Packet) {
        self.dropped_frames.increment();
        self.pool.release(packet);
    }

    /// Classify one received frame and fan it out.
    fn process_frame(&self, packet: Packet) {
        let header = match sdpcm::decode_header(packet.data()) {
            Some(header) => header,
            None => return self.drop_frame(packet),
        };
        let flow_control = self.flow.apply(&header);
        self.bus.set_flow_control(flow_control);
        if header.len as usize == SdpcmHeader::SIZE {
            // Header-only frame: a pure credit update, consumed above.
            return self.pool.release(packet);
        }
        match ChannelType::from_u8(header.channel_and_flags & CHANNEL_MASK) {
            Some(ChannelType::Control) => self.process_control(&header, packet),
            Some(ChannelType::Data) => self.process_data(&header, packet),
            Some(ChannelType::Event) => self.process_event(&header, packet),
            None => self.drop_frame(packet),
        }
    }

    fn process_control(&self, header: &SdpcmHeader, packet: Packet) {
        let offset = header.header_length as usize;
        let frame_len = header.len as usize;
        if frame_len < offset + CdcHeader::SIZE {
            return self.drop_frame(packet);
        }
        let cdc = CdcHeader::from_bytes(&packet.data()[offset..]);
        let id = (cdc.flags >> CDC_ID_SHIFT) as u16;
        match self.engine.match_reply(id) {
            ReplyMatch::Stale => self.pool.release(packet),
            ReplyMatch::Deliver(request) => {
                let _ = self.alarm.disable();
                if cdc.status != 0 {
                    self.pool.release(packet);
                    if !request.internal {
                        self.engine.notify(Err(ErrorCode::FAIL));
                    }
                } else if request.want_response {
                    let mut reply = packet;
                    let reply_len = frame_len - offset - CdcHeader::SIZE;
                    if reply.adjust_front((offset + CdcHeader::SIZE) as isize).is_ok()
                        && reply.set_len(reply_len).is_ok()
                    {
                        self.engine.notify(Ok(Some(reply)));
                    } else {
                        self.pool.release(reply);
                        self.engine.notify(Err(ErrorCode::FAIL));
                    }
                } else {
                    self.pool.release(packet);
                    if !request.internal {
                        self.engine.notify(Ok(None));
                    }
                }
            }
        }
    }

    fn process_data(&self, header: &SdpcmHeader, packet: Packet) {
        let offset = header.header_length as usize;
        let frame_len = header.len as usize;
        if frame_len < offset + BdcHeader::SIZE {
            return self.drop_frame(packet);
        }
        if self.raw_capture.get() {
            // Raw capture sees everything past the bus framing, secondary
            // header included.
            let mut raw = packet;
            if raw.adjust_front(offset as isize).is_ok() {
                match self.raw_client.get() {
                    Some(client) => client.raw_frame(raw),
                    None => self.pool.release(raw),
                }
            } else {
                self.drop_frame(raw);
            }
            return;
        }
        let bdc = BdcHeader::from_bytes(&packet.data()[offset..]);
        let payload_offset = offset + BdcHeader::SIZE + (bdc.data_offset as usize) * 4;
        if frame_len < payload_offset {
            return self.drop_frame(packet);
        }
        let payload_len = frame_len - payload_offset;
        let interface = Interface::from_index_bits(bdc.flags2);
        match self.net_client.get() {
            Some(client) => {
                let mut frame = packet;
                if frame.adjust_front(payload_offset as isize).is_ok()
                    && frame.set_len(payload_len).is_ok()
                {
                    client.deliver_ethernet_frame(frame, interface);
                } else {
                    self.drop_frame(frame);
                }
            }
            None => self.pool.release(packet),
        }
    }

    fn process_event(&self, header: &SdpcmHeader, packet: Packet) {
        let offset = header.header_length as usize;
        let frame_len = header.len as usize;
        if frame_len < offset + BdcHeader::SIZE {
            return self.drop_frame(packet);
        }
        {
            let data = packet.data();
            let bdc = BdcHeader::from_bytes(&data[offset..]);
            let event_offset = offset + BdcHeader::SIZE + (bdc.data_offset as usize) * 4;
            if frame_len < event_offset {
                self.dropped_frames.increment();
            } else {
                match sdpcm::decode_event(&data[event_offset..frame_len]) {
                    Some(event) => {
                        let start = event_offset + event.payload_offset;
                        let payload = &data[start..start + event.payload_len];
                        self.events.dispatch(&event.message, payload);
                    }
                    None => self.dropped_frames.increment(),
                }
            }
        }
        self.pool.release(packet);
    }

    /// Frames discarded without reaching any consumer.
    pub fn dropped_frame_count(&self) -> usize {
        self.dropped_frames.get()
    }

    pub fn stale_reply_count(&self) -> usize {
        self.engine.stale_reply_count()
    }

    pub fn credit_anomaly_high_water(&self) -> u8 {
        self.flow.anomaly_high_water()
    }
}

impl<'a, A: Alarm<'a>, B: WlanBus<'a>> WlanBusClient for Cyw43x<'a, A, B> {
    fn bus_interrupt(&self) {
        self.irq_pending.set(true);
        self.service();
    }
}

impl<'a, A: Alarm<'a>, B: WlanBus<'a>> AlarmClient for Cyw43x<'a, A, B> {
    fn fired(&self) {
        // The only armed alarm is the request deadline. The slot is freed
        // before the client hears about the timeout, so the callback can
        // start the next request; no reply buffer exists to clean up.
        if let Some(request) = self.engine.take_timeout() {
            if !request.internal {
                self.engine.notify(Err(ErrorCode::NOACK));
            }
        }
    }
}
