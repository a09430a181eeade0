//! The 8-byte records exchanged with the peer.
//!
//! Multi-byte fields are little-endian on the wire, matching the packed
//! struct layout of the original controller board.

/// Status codes reported in the first byte of every status frame.
///
/// Negative values are faults. A fault, once latched, survives until an
/// explicit reset at boot; see [`StatusRecord::latch_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(i8)]
pub enum StatusCode {
    /// Catch-all fault.
    Unknown = -64,
    /// A frame carried an opcode the sequencer does not know.
    InvalidCommand = -63,
    /// A frame was malformed (bad hex, length or terminator).
    InvalidArgument = -62,
    /// A command addressed a slot beyond the program capacity.
    CommandOverflow = -61,
    /// The vessel exceeded the temperature ceiling.
    TemperatureOverlimit = -60,
    /// The thermistor reading left the plausibility window.
    TemperatureFeedbackFailed = -59,
    /// The wireless module stopped responding, even to a reboot.
    BtDeviceError = -58,
    /// No program running.
    Standby = 0,
    /// A program slot is executing.
    Cooking = 1,
}

impl StatusCode {
    /// True for the negative (fault) half of the code space.
    pub fn is_fault(self) -> bool {
        (self as i8) < 0
    }

    /// Decode a raw wire byte.
    pub fn from_raw(raw: i8) -> Option<Self> {
        Some(match raw {
            -64 => Self::Unknown,
            -63 => Self::InvalidCommand,
            -62 => Self::InvalidArgument,
            -61 => Self::CommandOverflow,
            -60 => Self::TemperatureOverlimit,
            -59 => Self::TemperatureFeedbackFailed,
            -58 => Self::BtDeviceError,
            0 => Self::Standby,
            1 => Self::Cooking,
            _ => return None,
        })
    }
}

/// Encode a remaining hold duration for the wire.
///
/// Durations up to one hour travel as plain seconds; anything longer is
/// expressed in minutes with bit 15 set, so the peer can show coarse
/// progress on long holds without widening the field.
pub fn encode_remaining(seconds: u32) -> u16 {
    if seconds <= 3600 {
        seconds as u16
    } else {
        (seconds / 60).min(0x7FFF) as u16 | 0x8000
    }
}

/// The status report, published periodically and shown on the local display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusRecord {
    /// Status or fault code.
    pub code: StatusCode,
    /// Index of the slot the sequencer is executing.
    pub cmdid: u8,
    /// Next free slot during program upload.
    pub cmdnum: u8,
    /// Last commanded power rate, 0..100.
    pub power: u8,
    /// Current temperature as Q8.8 signed fixed-point (°C × 256).
    pub temperature: i16,
    /// Remaining hold time, encoded by [`encode_remaining`].
    pub remain_time: u16,
}

impl StatusRecord {
    /// Size of the record on the wire.
    pub const WIRE_SIZE: usize = 8;

    /// A fresh record: standby, cursors at zero.
    pub const fn new() -> Self {
        Self {
            code: StatusCode::Standby,
            cmdid: 0,
            cmdnum: 0,
            power: 0,
            temperature: 0,
            remain_time: 0,
        }
    }

    /// Write the status code through the fault latch.
    ///
    /// Non-negative codes only toggle between standby and cooking; once a
    /// fault is latched the code is immutable until [`Self::reset`].
    pub fn latch_code(&mut self, code: StatusCode) {
        if !self.code.is_fault() {
            self.code = code;
        }
    }

    /// Explicit reset of the fault latch. Only the boot path calls this.
    pub fn reset(&mut self) {
        self.code = StatusCode::Standby;
    }

    /// Serialize in declaration order.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let t = self.temperature.to_le_bytes();
        let r = self.remain_time.to_le_bytes();
        [
            self.code as i8 as u8,
            self.cmdid,
            self.cmdnum,
            self.power,
            t[0],
            t[1],
            r[0],
            r[1],
        ]
    }

    /// Deserialize; `None` when the code byte is not a known status code.
    pub fn from_bytes(bytes: &[u8; Self::WIRE_SIZE]) -> Option<Self> {
        Some(Self {
            code: StatusCode::from_raw(bytes[0] as i8)?,
            cmdid: bytes[1],
            cmdnum: bytes[2],
            power: bytes[3],
            temperature: i16::from_le_bytes([bytes[4], bytes[5]]),
            remain_time: u16::from_le_bytes([bytes[6], bytes[7]]),
        })
    }
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Program opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Do nothing; the sequencer idles on this slot.
    Nop = 0,
    /// End of program: reset cursors, clear targets, play the finish melody.
    Finish = 1,
    /// Set the temperature target and dwell on it.
    TargetTemperature = 2,
    /// Hold the current target for a duration given in minutes.
    Hold = 3,
    /// Persist a new proportional gain.
    SetKp = 4,
    /// Persist a new integral leak rate.
    SetTi = 5,
    /// Set the gate lead compensation in µs.
    SetPhaseDelay = 6,
    /// Persist a new derivative gain.
    SetTd = 7,
    /// Install a manual power-rate override (percent).
    SetPower = 8,
}

impl Opcode {
    /// Decode a raw opcode byte.
    pub fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Nop,
            1 => Self::Finish,
            2 => Self::TargetTemperature,
            3 => Self::Hold,
            4 => Self::SetKp,
            5 => Self::SetTi,
            6 => Self::SetPhaseDelay,
            7 => Self::SetTd,
            8 => Self::SetPower,
            _ => return None,
        })
    }
}

/// One 8-byte program slot as it travels on the wire.
///
/// The opcode is kept raw so a decoded record always round-trips; callers
/// go through [`Self::opcode`] before acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandRecord {
    /// Raw opcode byte.
    pub op: u8,
    /// Slot address byte (absolute, or the append/current markers).
    pub index: u8,
    /// Opcode-specific parameters.
    pub params: [u8; 6],
}

impl CommandRecord {
    /// Size of the record on the wire.
    pub const WIRE_SIZE: usize = 8;

    /// An empty (NOP) slot.
    pub const fn empty() -> Self {
        Self {
            op: Opcode::Nop as u8,
            index: 0,
            params: [0; 6],
        }
    }

    /// Build a record from a typed opcode.
    pub const fn new(op: Opcode, index: u8, params: [u8; 6]) -> Self {
        Self {
            op: op as u8,
            index,
            params,
        }
    }

    /// The typed opcode, if the raw byte is known.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_raw(self.op)
    }

    /// Little-endian u16 from two parameter bytes.
    pub fn param_u16(&self, at: usize) -> u16 {
        u16::from_le_bytes([self.params[at], self.params[at + 1]])
    }

    /// Little-endian f32 from four parameter bytes.
    pub fn param_f32(&self, at: usize) -> f32 {
        f32::from_le_bytes([
            self.params[at],
            self.params[at + 1],
            self.params[at + 2],
            self.params[at + 3],
        ])
    }

    /// Serialize in declaration order.
    pub fn to_bytes(&self) -> [u8; Self::WIRE_SIZE] {
        let mut bytes = [0u8; Self::WIRE_SIZE];
        bytes[0] = self.op;
        bytes[1] = self.index;
        bytes[2..].copy_from_slice(&self.params);
        bytes
    }

    /// Deserialize. Never fails; opcode validity is checked separately.
    pub fn from_bytes(bytes: &[u8; Self::WIRE_SIZE]) -> Self {
        let mut params = [0u8; 6];
        params.copy_from_slice(&bytes[2..]);
        Self {
            op: bytes[0],
            index: bytes[1],
            params,
        }
    }
}

impl Default for CommandRecord {
    fn default() -> Self {
        Self::empty()
    }
}
