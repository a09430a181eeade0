//! Link supervision: paced status notifications with retry and escalation.
//!
//! The supervisor is a sans-io state machine. The UART task feeds it the
//! current time and any parsed replies; it answers with the next action to
//! perform on the wire. Keeping the clock outside makes the whole
//! retry/reboot ladder testable on the host.

use crate::frame::Response;

/// Time between status notifications.
pub const STATUS_PERIOD_MS: u64 = 2000;
/// How long to wait for the peer's `AOK`.
pub const ACK_TIMEOUT_MS: u64 = 1000;
/// Notification retries after the first send, before escalating to a
/// module reboot.
pub const STATUS_RETRIES: u8 = 3;
/// How long to wait for `CMD` after `R,1`.
pub const REBOOT_TIMEOUT_MS: u64 = 1000;
/// Reboot attempts before latching the device fault.
pub const REBOOT_ATTEMPTS: u8 = 3;

/// What the UART task should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkAction {
    /// Snapshot the status record and send an `SHW` notification.
    SendStatus,
    /// Send `R,1` to reboot the wireless module.
    SendReboot,
    /// All reboot attempts failed: latch the device fault.
    Fault,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle { next_status_at: u64 },
    AwaitAck { attempt: u8, deadline: u64 },
    AwaitCmd { attempt: u8, deadline: u64 },
}

/// Drives the notify → ack → retry → reboot ladder.
///
/// After the fault is reported the supervisor falls back to the idle cadence
/// and keeps publishing, so the peer still sees diagnostic frames once the
/// module recovers on its own.
pub struct LinkSupervisor {
    state: State,
}

impl LinkSupervisor {
    /// Start the cadence; the first notification is due one period from `now_ms`.
    pub fn new(now_ms: u64) -> Self {
        Self {
            state: State::Idle {
                next_status_at: now_ms + STATUS_PERIOD_MS,
            },
        }
    }

    /// Advance the clock; returns an action once a deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> Option<LinkAction> {
        match self.state {
            State::Idle { next_status_at } if now_ms >= next_status_at => {
                self.state = State::AwaitAck {
                    attempt: 1,
                    deadline: now_ms + ACK_TIMEOUT_MS,
                };
                Some(LinkAction::SendStatus)
            }
            State::AwaitAck { attempt, deadline } if now_ms >= deadline => {
                Some(self.fail_notification(attempt, now_ms))
            }
            State::AwaitCmd { attempt, deadline } if now_ms >= deadline => {
                if attempt < REBOOT_ATTEMPTS {
                    self.state = State::AwaitCmd {
                        attempt: attempt + 1,
                        deadline: now_ms + REBOOT_TIMEOUT_MS,
                    };
                    Some(LinkAction::SendReboot)
                } else {
                    self.state = State::Idle {
                        next_status_at: now_ms + STATUS_PERIOD_MS,
                    };
                    Some(LinkAction::Fault)
                }
            }
            _ => None,
        }
    }

    /// Feed a parsed reply; may trigger an immediate retry.
    pub fn on_response(&mut self, response: Response, now_ms: u64) -> Option<LinkAction> {
        match (self.state, response) {
            (State::AwaitAck { .. }, Response::Aok) | (State::AwaitCmd { .. }, Response::Cmd) => {
                self.state = State::Idle {
                    next_status_at: now_ms + STATUS_PERIOD_MS,
                };
                None
            }
            (State::AwaitAck { attempt, .. }, Response::Err) => {
                Some(self.fail_notification(attempt, now_ms))
            }
            _ => None,
        }
    }

    fn fail_notification(&mut self, attempt: u8, now_ms: u64) -> LinkAction {
        if attempt < 1 + STATUS_RETRIES {
            self.state = State::AwaitAck {
                attempt: attempt + 1,
                deadline: now_ms + ACK_TIMEOUT_MS,
            };
            LinkAction::SendStatus
        } else {
            self.state = State::AwaitCmd {
                attempt: 1,
                deadline: now_ms + REBOOT_TIMEOUT_MS,
            };
            LinkAction::SendReboot
        }
    }
}
