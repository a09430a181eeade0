//! The fixed-capacity cooking program.
//!
//! Thirty-two inline slots and two cursors that live in the wire-visible
//! status record: `cmdid` walks the program, `cmdnum` tracks uploads. No
//! heap, no growth; a rejected store leaves everything untouched.

use simmer_protocol::{CommandRecord, StatusRecord};

/// Number of program slots.
pub const PROGRAM_CAPACITY: usize = 32;
/// Index byte requesting an append at the upload cursor.
pub const INDEX_APPEND: u8 = 0x80;
/// Index byte addressing the currently executing slot.
pub const INDEX_CURRENT: u8 = 0x81;

/// A command addressed a slot the program cannot hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotOverflow;

/// The program array. Slots start out as NOP.
pub struct Program {
    /// The inline slot storage.
    slots: [CommandRecord; PROGRAM_CAPACITY],
}

impl Program {
    /// An empty program.
    pub const fn new() -> Self {
        Self {
            slots: [CommandRecord::empty(); PROGRAM_CAPACITY],
        }
    }

    /// Read a slot by execution index. Out-of-range indices read as NOP, so
    /// the sequencer can never execute beyond the array.
    pub fn slot(&self, index: u8) -> CommandRecord {
        self.slots
            .get(index as usize)
            .copied()
            .unwrap_or(CommandRecord::empty())
    }

    /// Store a decoded command, resolving its slot address.
    ///
    /// On success the slot index is returned and, for appends, `cmdnum`
    /// advances. On overflow nothing changes (the append cursor stops at
    /// the capacity).
    pub fn store(
        &mut self,
        record: CommandRecord,
        status: &mut StatusRecord,
    ) -> Result<u8, SlotOverflow> {
        let slot = match record.index {
            INDEX_APPEND => {
                if status.cmdnum as usize >= PROGRAM_CAPACITY {
                    return Err(SlotOverflow);
                }
                let at = status.cmdnum;
                status.cmdnum += 1;
                at
            }
            INDEX_CURRENT => status.cmdid,
            absolute => absolute,
        };

        if slot as usize >= PROGRAM_CAPACITY {
            return Err(SlotOverflow);
        }
        self.slots[slot as usize] = record;
        Ok(slot)
    }

    /// FINISH semantics: rewind both cursors and clear slot 0.
    pub fn reset(&mut self, status: &mut StatusRecord) {
        self.slots[0] = CommandRecord::empty();
        status.cmdid = 0;
        status.cmdnum = 0;
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simmer_protocol::Opcode;

    fn hold(index: u8, minutes: u16) -> CommandRecord {
        let mut params = [0u8; 6];
        params[..2].copy_from_slice(&minutes.to_le_bytes());
        CommandRecord::new(Opcode::Hold, index, params)
    }

    #[test]
    fn absolute_store_lands_in_the_addressed_slot() {
        let mut program = Program::new();
        let mut status = StatusRecord::new();
        assert_eq!(program.store(hold(5, 10), &mut status), Ok(5));
        assert_eq!(program.slot(5).param_u16(0), 10);
        // Absolute stores do not move the upload cursor.
        assert_eq!(status.cmdnum, 0);
    }

    #[test]
    fn append_walks_the_upload_cursor() {
        let mut program = Program::new();
        let mut status = StatusRecord::new();
        for expected in 0..3 {
            assert_eq!(
                program.store(hold(INDEX_APPEND, expected as u16), &mut status),
                Ok(expected)
            );
        }
        assert_eq!(status.cmdnum, 3);
    }

    #[test]
    fn append_beyond_capacity_overflows_and_cursor_stops() {
        let mut program = Program::new();
        let mut status = StatusRecord::new();
        for _ in 0..PROGRAM_CAPACITY {
            program.store(hold(INDEX_APPEND, 1), &mut status).unwrap();
        }
        // The 33rd upload is refused and cmdnum stays put.
        assert_eq!(
            program.store(hold(INDEX_APPEND, 1), &mut status),
            Err(SlotOverflow)
        );
        assert_eq!(status.cmdnum, PROGRAM_CAPACITY as u8);
    }

    #[test]
    fn overwrite_of_the_executing_slot() {
        let mut program = Program::new();
        let mut status = StatusRecord::new();
        status.cmdid = 4;
        assert_eq!(program.store(hold(INDEX_CURRENT, 99), &mut status), Ok(4));
        assert_eq!(program.slot(4).param_u16(0), 99);
    }

    #[test]
    fn out_of_range_absolute_indices_overflow() {
        let mut program = Program::new();
        let mut status = StatusRecord::new();
        assert_eq!(program.store(hold(32, 1), &mut status), Err(SlotOverflow));
        assert_eq!(program.store(hold(0x7F, 1), &mut status), Err(SlotOverflow));
        // Slot 31 is the last valid one.
        assert_eq!(program.store(hold(31, 1), &mut status), Ok(31));
    }

    #[test]
    fn reads_past_the_array_are_nop() {
        let program = Program::new();
        assert_eq!(program.slot(200).opcode(), Some(Opcode::Nop));
    }

    #[test]
    fn reset_clears_slot_zero_and_cursors() {
        let mut program = Program::new();
        let mut status = StatusRecord::new();
        program.store(hold(0, 7), &mut status).unwrap();
        status.cmdid = 1;
        status.cmdnum = 2;
        program.reset(&mut status);
        assert_eq!(status.cmdid, 0);
        assert_eq!(status.cmdnum, 0);
        assert_eq!(program.slot(0).opcode(), Some(Opcode::Nop));
    }
}
