// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Board wiring for the WLAN transport driver: allocates the buffer pool,
//! seeds it with static buffers, and connects the driver to its bus and
//! alarm.

use crate::bus::WlanBus;
use crate::driver::Cyw43x;
use crate::pool::{BufferPool, POOL_SLOTS};
use crate::sdpcm::LINK_MTU;

use core::mem::MaybeUninit;

use wlan_hil::component::Component;
use wlan_hil::time::Alarm;

// Setup static space for the objects.
#[macro_export]
macro_rules! cyw43x_component_static {
    ($A:ty, $B:ty $(,)?) => {{
        let pool = wlan_hil::static_buf!($crate::BufferPool<'static>);
        let rx_buffers =
            wlan_hil::static_buf!([[u8; $crate::LINK_MTU]; $crate::POOL_SLOTS]);
        let tx_buffers =
            wlan_hil::static_buf!([[u8; $crate::LINK_MTU]; $crate::POOL_SLOTS]);
        let driver = wlan_hil::static_buf!($crate::Cyw43x<'static, $A, $B>);

        (pool, rx_buffers, tx_buffers, driver)
    }};
}

pub struct Cyw43xComponent<A: 'static + Alarm<'static>, B: 'static + WlanBus<'static>> {
    alarm: &'static A,
    bus: &'static B,
}

impl<A: 'static + Alarm<'static>, B: 'static + WlanBus<'static>> Cyw43xComponent<A, B> {
    pub fn new(alarm: &'static A, bus: &'static B) -> Self {
        Self { alarm, bus }
    }
}

impl<A: 'static + Alarm<'static>, B: 'static + WlanBus<'static>> Component
    for Cyw43xComponent<A, B>
{
    type StaticInput = (
        &'static mut MaybeUninit<BufferPool<'static>>,
        &'static mut MaybeUninit<[[u8; LINK_MTU]; POOL_SLOTS]>,
        &'static mut MaybeUninit<[[u8; LINK_MTU]; POOL_SLOTS]>,
        &'static mut MaybeUninit<Cyw43x<'static, A, B>>,
    );
    type Output = &'static Cyw43x<'static, A, B>;

    fn finalize(self, static_memory: Self::StaticInput) -> Self::Output {
        let pool = static_memory.0.write(BufferPool::new());
        let rx_buffers: &'static mut [[u8; LINK_MTU]] =
            static_memory.1.write([[0; LINK_MTU]; POOL_SLOTS]);
        for buffer in rx_buffers {
            let _ = pool.give_rx_buffer(buffer);
        }
        let tx_buffers: &'static mut [[u8; LINK_MTU]] =
            static_memory.2.write([[0; LINK_MTU]; POOL_SLOTS]);
        for buffer in tx_buffers {
            let _ = pool.give_tx_buffer(buffer);
        }

        let driver = static_memory
            .3
            .write(Cyw43x::new(self.bus, self.alarm, pool));
        self.alarm.set_client(driver);
        self.bus.set_client(driver);
        driver
    }
}
