/*++

Licensed under the Apache-2.0 license.

File Name:

    slot.rs

Abstract:

    File contains the A/B slot failover state machine kept in the persistent
    boot register.

--*/

use bdb_drivers::{cprintln, PersistentFlags};
use bdb_error::BootResult;

use crate::BootEnv;

/// Firmware slot
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Slot {
    Primary,
    Secondary,
}

impl Slot {
    fn selected(flags: PersistentFlags) -> Self {
        if flags.contains(PersistentFlags::TRY_SECONDARY_BDB) {
            Slot::Secondary
        } else {
            Slot::Primary
        }
    }

    pub fn other(self) -> Self {
        match self {
            Slot::Primary => Slot::Secondary,
            Slot::Secondary => Slot::Primary,
        }
    }

    /// Sticky bit recording an unfinished attempt on this slot
    pub fn failed_flag(self) -> PersistentFlags {
        match self {
            Slot::Primary => PersistentFlags::FAILED_RW_PRIMARY,
            Slot::Secondary => PersistentFlags::FAILED_RW_SECONDARY,
        }
    }
}

impl ufmt::uDisplay for Slot {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        match self {
            Slot::Primary => f.write_str("A"),
            Slot::Secondary => f.write_str("B"),
        }
    }
}

/// Outcome of `init_boot_attempt`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotDecision {
    /// Boot this slot
    Proceed(Slot),

    /// A reset into the other slot was requested
    RebootToOther(Slot),

    /// Both slots failed; a reset into recovery was requested
    RebootToRecovery,
}

fn read_flags(env: &mut impl BootEnv) -> BootResult<(u32, PersistentFlags)> {
    let raw = env.vboot_register()?;
    Ok((raw, PersistentFlags::from_bits_truncate(raw)))
}

/// Write `flags` back, preserving register bits this module does not own
fn write_flags(env: &mut impl BootEnv, raw: u32, flags: PersistentFlags) -> BootResult<()> {
    env.set_vboot_register((raw & !PersistentFlags::all().bits()) | flags.bits())
}

/// Pick the slot to boot. The selected slot is marked failed up front so an
/// unexpected reset during this attempt is remembered by the next one.
pub fn init_boot_attempt(env: &mut impl BootEnv) -> BootResult<SlotDecision> {
    let (raw, mut flags) = read_flags(env)?;
    let slot = Slot::selected(flags);

    if !flags.contains(slot.failed_flag()) {
        flags.insert(slot.failed_flag());
        write_flags(env, raw, flags)?;
        cprintln!("[slot] Trying slot {}", slot);
        return Ok(SlotDecision::Proceed(slot));
    }

    let other = slot.other();
    if !flags.contains(other.failed_flag()) {
        flags.toggle(PersistentFlags::TRY_SECONDARY_BDB);
        write_flags(env, raw, flags)?;
        cprintln!("[slot] Slot {} failed, rebooting to slot {}", slot, other);
        env.reset_chip();
        return Ok(SlotDecision::RebootToOther(other));
    }

    flags.insert(PersistentFlags::RECOVERY_REQUEST);
    write_flags(env, raw, flags)?;
    cprintln!("[slot] Both slots failed, rebooting to recovery");
    env.reset_chip();
    Ok(SlotDecision::RebootToRecovery)
}

/// Mark the selected slot's attempt as completed
pub fn finalize_boot_attempt(env: &mut impl BootEnv) -> BootResult<Slot> {
    let (raw, mut flags) = read_flags(env)?;
    let slot = Slot::selected(flags);
    flags.remove(slot.failed_flag());
    write_flags(env, raw, flags)?;
    Ok(slot)
}

/// Abandon this attempt. The failed bit set by `init_boot_attempt` steers the
/// next boot.
pub fn fail_boot_attempt(env: &mut impl BootEnv) {
    cprintln!("[slot] Boot attempt failed, resetting");
    env.reset_chip();
}
