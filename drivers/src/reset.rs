/*++

Licensed under the Apache-2.0 license.

File Name:

    reset.rs

Abstract:

    File contains API for resetting the chip.

--*/

/// Chip reset control
pub trait ResetCtrl {
    /// Reset the chip. Does not return on hardware; host doubles record the
    /// request and return so the caller can observe it.
    fn reset_chip(&mut self);
}
