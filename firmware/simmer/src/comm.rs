//! The wireless serial link.
//!
//! The module speaks 2400-baud ASCII lines. Inbound traffic is command
//! frames and the module's own three-letter replies; outbound traffic is
//! the periodic status notification, paced by the [`LinkSupervisor`].

use defmt::{info, warn};
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{Uart, UartTx};
use embassy_time::{with_timeout, Duration, Instant};
use simmer_protocol::{
    encode_status_line, parse_command_line, parse_response, FrameError, LineBuffer, LinkAction,
    LinkSupervisor, StatusCode,
};

use crate::{PROGRAM_MUTEX, STATUS_MUTEX};

/// How long one RX drain may block before the supervisor is polled again.
const RX_POLL_MS: u64 = 100;

/// Drive the wireless link: ingest commands, publish status, babysit the
/// module.
#[embassy_executor::task]
pub async fn comm_task(uart: Uart<'static, Async>) {
    let (mut tx, mut rx) = uart.split();
    let mut lines = LineBuffer::new();
    let mut supervisor = LinkSupervisor::new(Instant::now().as_millis());
    let mut rx_buf = [0u8; 64];

    loop {
        if let Some(action) = supervisor.poll(Instant::now().as_millis()) {
            perform(action, &mut tx).await;
        }

        let read = with_timeout(
            Duration::from_millis(RX_POLL_MS),
            rx.read_until_idle(&mut rx_buf),
        )
        .await;
        let Ok(Ok(count)) = read else { continue };

        for &byte in &rx_buf[..count] {
            if !lines.push(byte) {
                continue;
            }
            let action = handle_line(lines.line(), &mut supervisor);
            lines.clear();
            if let Some(action) = action {
                perform(action, &mut tx).await;
            }
        }
    }
}

/// Route one complete line to the command parser or the response parser.
fn handle_line(line: &str, supervisor: &mut LinkSupervisor) -> Option<LinkAction> {
    if line.starts_with("WV,") {
        ingest_command(line);
        return None;
    }

    let response = parse_response(line)?;
    supervisor.on_response(response, Instant::now().as_millis())
}

/// Decode and store a command frame; rejected frames only latch a code.
fn ingest_command(line: &str) {
    match parse_command_line(line) {
        Ok(record) => {
            let stored = STATUS_MUTEX.lock(|status| {
                PROGRAM_MUTEX.lock(|program| {
                    program
                        .borrow_mut()
                        .store(record, &mut status.borrow_mut())
                })
            });
            match stored {
                Ok(slot) => info!("command op {} stored in slot {}", record.op, slot),
                Err(_) => {
                    warn!("program overflow, command dropped");
                    STATUS_MUTEX
                        .lock(|status| status.borrow_mut().latch_code(StatusCode::CommandOverflow));
                }
            }
        }
        Err(FrameError::InvalidCommand) => {
            warn!("unserviceable command frame");
            STATUS_MUTEX.lock(|status| status.borrow_mut().latch_code(StatusCode::InvalidCommand));
        }
        Err(FrameError::InvalidArgument) => {
            warn!("malformed command frame");
            STATUS_MUTEX.lock(|status| status.borrow_mut().latch_code(StatusCode::InvalidArgument));
        }
    }
}

/// Carry out one supervisor action on the wire.
async fn perform(action: LinkAction, tx: &mut UartTx<'static, Async>) {
    match action {
        LinkAction::SendStatus => {
            // 8-byte snapshot inside the critical section, encode outside.
            let status = STATUS_MUTEX.lock(|status| *status.borrow());
            let line = encode_status_line(&status);
            let _ = tx.write(line.as_bytes()).await;
        }
        LinkAction::SendReboot => {
            info!("rebooting the wireless module");
            let _ = tx.write(b"R,1\n").await;
        }
        LinkAction::Fault => {
            warn!("wireless module unresponsive, latching fault");
            STATUS_MUTEX.lock(|status| status.borrow_mut().latch_code(StatusCode::BtDeviceError));
        }
    }
}
