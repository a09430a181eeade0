//! Firmware library of the simmer networked cooker.
#![no_std]
#![warn(missing_docs)]

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use simmer_control::{ControlState, Program, TuningField};
use simmer_protocol::StatusRecord;

pub mod buzzer;
pub mod comm;
pub mod cook;
pub mod display;
pub mod eeprom;
pub mod heat;
pub mod power;

/// Melodies the buzzer task can play.
#[derive(Debug, Clone, Copy, defmt::Format)]
pub enum Melody {
    /// The cooking program ran to completion.
    Finish,
    /// A hold elapsed.
    Notify,
    /// The controller is powering down.
    Shutdown,
}

/// Control state shared between the foreground and the heat executor.
///
/// The heat executor preempts everything else, so all access goes through
/// a critical section; snapshots are taken inside the lock and used outside.
pub static CONTROL_MUTEX: Mutex<CriticalSectionRawMutex, RefCell<ControlState>> =
    Mutex::new(RefCell::new(ControlState::new()));

/// The wire-visible status record. The publisher copies all 8 bytes under
/// the lock; the sequencer, sampler and heat executor write individual
/// fields.
pub static STATUS_MUTEX: Mutex<CriticalSectionRawMutex, RefCell<StatusRecord>> =
    Mutex::new(RefCell::new(StatusRecord::new()));

/// The cooking program, mutated by the protocol engine and walked by the
/// sequencer.
pub static PROGRAM_MUTEX: Mutex<CriticalSectionRawMutex, RefCell<Program>> =
    Mutex::new(RefCell::new(Program::new()));

/// Requests a melody from the buzzer task.
pub static MELODY_SIG: Signal<CriticalSectionRawMutex, Melody> = Signal::new();

/// Requests persistence of one tuning constant.
pub static STORE_TUNING_SIG: Signal<CriticalSectionRawMutex, (TuningField, f32)> = Signal::new();
