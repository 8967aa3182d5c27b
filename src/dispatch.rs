//! The blocking receive loop: waits for the transport to become readable,
//! parses a frame, and routes it to the matching handler slot, per
//! spec.md §4.5.

use std::time::Duration;

use crate::client::Client;
use crate::error::StompError;
use crate::parser;
use crate::response::FrameKind;
use crate::transport::Transport;

impl<T: Transport> Client<T> {
    /// Runs the receive loop. If `looping` is `false`, returns after the
    /// first dispatched non-heartbeat frame (bare heartbeats are consumed
    /// silently and the loop keeps waiting for a "real" frame — see
    /// DESIGN.md for why this differs slightly from the reference
    /// client's `continue`-based behavior).
    pub fn wait_for_messages(&mut self, looping: bool) -> Result<(), StompError> {
        loop {
            // A broker that pipelines frames (or a single large `read`
            // that pulled in more than one frame's worth of bytes) can
            // leave a complete frame sitting in `recv_buf` even once the
            // transport itself has nothing left to offer. Checking the
            // transport alone would then spuriously fire the missed-
            // heartbeat path, or block forever waiting on a socket that
            // has no more bytes coming.
            let readable = if self.recv_buf.has_buffered() {
                true
            } else {
                let select_timeout = self.select_timeout();
                self.transport.wait_readable(select_timeout)?
            };

            if !readable {
                self.fire_missed_heartbeat()?;
                if looping {
                    continue;
                }
                return Ok(());
            }

            let resp = parser::read_response(self)?;
            match &resp.kind {
                FrameKind::Heartbeat => {
                    self.fire_heartbeat();
                    continue;
                }
                FrameKind::Receipt => self.fire_receipt(&resp),
                FrameKind::Message => self.fire_message(&resp),
                FrameKind::Error => match self.handlers.on_error.take() {
                    Some(mut handler) => {
                        handler(self, &resp);
                        self.handlers.on_error = Some(handler);
                    }
                    None => self.default_error_handler(&resp)?,
                },
                FrameKind::Connected => {
                    log::debug!("ignoring unexpected CONNECTED frame outside handshake");
                }
                FrameKind::Other(verb) => {
                    log::debug!("dropping unrecognized frame kind {verb}");
                }
            }

            if !looping {
                return Ok(());
            }
        }
    }

    fn select_timeout(&self) -> Option<Duration> {
        let secs = self.heartbeat_interval_secs();
        if secs > 0 {
            Some(Duration::from_millis((secs as u64 + 1) * 1000))
        } else {
            None
        }
    }

    fn fire_missed_heartbeat(&mut self) -> Result<(), StompError> {
        match self.handlers.on_missed_heartbeat.take() {
            Some(mut handler) => {
                handler(self);
                self.handlers.on_missed_heartbeat = Some(handler);
                Ok(())
            }
            None => Err(self.default_missed_heartbeat_handler()),
        }
    }

    fn fire_heartbeat(&mut self) {
        if let Some(mut handler) = self.handlers.on_heartbeat.take() {
            handler(self);
            self.handlers.on_heartbeat = Some(handler);
        }
    }

    fn fire_receipt(&mut self, resp: &crate::response::Response) {
        if let Some(mut handler) = self.handlers.on_receipt.take() {
            handler(self, resp);
            self.handlers.on_receipt = Some(handler);
        }
    }

    fn fire_message(&mut self, resp: &crate::response::Response) {
        if let Some(mut handler) = self.handlers.on_message.take() {
            handler(self, resp);
            self.handlers.on_message = Some(handler);
        }
    }
}
