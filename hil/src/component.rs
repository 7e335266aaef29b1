// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Components encapsulate peripheral-specific and capsule-specific
//! initialization behind a simple factory method interface.

/// A component encapsulates all of the initialization and configuration of a
/// driver inside the `finalize()` function call. The `Output` type defines
/// what type this component generates. Note that instantiating a component
/// does not instantiate the underlying `Output` type; instead, the memory is
/// statically allocated and provided as an argument to the `finalize()`
/// method, which correctly initializes the memory to instantiate the
/// `Output` object. If instantiating and initializing the `Output` type
/// requires parameters, these should be passed in the component's `new()`
/// function.
///
/// Using a component:
///
/// ```rust,ignore
/// let driver = DriverComponent::new(config, required_hw)
///     .finalize(driver_component_static!());
/// ```
pub trait Component {
    /// The board- or chip-specific static memory this component needs to set
    /// up its output object(s); created by the component's
    /// `[name]_component_static!()` macro and passed to `finalize()`.
    type StaticInput;

    /// The type (e.g., capsule, peripheral) that this implementation of
    /// Component produces via `finalize()`. Typically a static reference
    /// (`&'static`).
    type Output;

    /// A factory method that returns an instance of the Output type of this
    /// Component implementation. May only be called once per component
    /// instance. All statically allocated memory MUST be passed in via the
    /// `static_memory` argument; `finalize()` must not allocate its own, so
    /// that memory is not aliased if the component is used multiple times.
    fn finalize(self, static_memory: Self::StaticInput) -> Self::Output;
}
