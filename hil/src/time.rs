// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Hardware-agnostic interfaces for counter-like resources.

use crate::ErrorCode;

pub trait Time {
    type Frequency: Frequency;

    /// Returns the current time in hardware clock units.
    fn now(&self) -> u32;

    /// Returns the wrap-around value of the clock.
    ///
    /// The maximum value of the clock, at which `now` will wrap around:
    /// `u32::MAX` on a 32-bit clock, `1 << 24` for a 24-bit clock.
    fn max_tics(&self) -> u32;
}

/// Trait to represent clock frequency in Hz.
///
/// Used as an associated type for `Alarm` so clients can portably convert
/// native cycles to real-time values.
pub trait Frequency {
    /// Returns frequency in Hz.
    fn frequency() -> u32;
}

/// 16MHz `Frequency`
#[derive(Debug)]
pub struct Freq16MHz;
impl Frequency for Freq16MHz {
    fn frequency() -> u32 {
        16000000
    }
}

/// 32KHz `Frequency`
#[derive(Debug)]
pub struct Freq32KHz;
impl Frequency for Freq32KHz {
    fn frequency() -> u32 {
        32768
    }
}

/// 1KHz `Frequency`
#[derive(Debug)]
pub struct Freq1KHz;
impl Frequency for Freq1KHz {
    fn frequency() -> u32 {
        1000
    }
}

/// The `Alarm` trait models a wrapping counter capable of notifying when the
/// counter reaches a certain value.
///
/// Implementers signal the registered [`AlarmClient`] when the counter
/// reaches the value set in [`Alarm::set_alarm`].
pub trait Alarm<'a>: Time {
    /// Sets a one-shot alarm to fire when the clock reaches `tics`.
    ///
    /// [`AlarmClient::fired`] is signaled when `tics` is reached.
    fn set_alarm(&self, tics: u32);

    /// Returns the value set in [`Alarm::set_alarm`].
    fn get_alarm(&self) -> u32;

    /// Set the client for interrupt events.
    fn set_client(&self, client: &'a dyn AlarmClient);

    /// Returns whether this alarm is currently active (will eventually
    /// trigger a callback if there is a client).
    fn is_enabled(&self) -> bool;

    /// Disables the alarm.
    ///
    /// The implementation will always disable the alarm, but the alarm may
    /// have already expired with the event not yet delivered to the client.
    /// In that case the implementation must return `Err(ErrorCode::FAIL)`,
    /// letting the caller know an event for the alarm will still arrive.
    fn disable(&self) -> Result<(), ErrorCode>;
}

/// A client of an implementer of the [`Alarm`] trait.
pub trait AlarmClient {
    /// Callback signaled when the alarm's clock reaches the value set in
    /// [`Alarm::set_alarm`].
    fn fired(&self);
}
