// PixelGL
// copyright zipxing@hotmail.com 2022~2024

//! Cross-thread request bridge.
//!
//! Surface-altering calls are only legal on the rendering thread. Worker
//! threads serialize them into a [`Request`] and block on a one-shot reply
//! channel until the rendering thread has executed the whole destroy /
//! reconfigure / rebuild sequence. There is no timeout: a stalled rendering
//! thread stalls the requester, and the rendering thread is expected to
//! always make progress.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::error::GfxError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestOp {
    SetFsaa(u32),
    SetFullScreen(bool),
    SetScreenSize(u32, u32),
}

pub(crate) struct Request {
    pub op: RequestOp,
    pub reply: Sender<Result<bool, GfxError>>,
}

/// Sender half, lives in the shared state and is cloned into every handle.
#[derive(Clone)]
pub(crate) struct RequestBridge {
    tx: Sender<Request>,
}

impl RequestBridge {
    pub fn new() -> (Self, Receiver<Request>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    /// Send the request and block until the rendering thread replies.
    pub fn dispatch_and_wait(&self, op: RequestOp) -> Result<bool, GfxError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(Request { op, reply: reply_tx })
            .map_err(|_| GfxError::BridgeClosed)?;
        reply_rx.recv().map_err(|_| GfxError::BridgeClosed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_dispatch_blocks_until_reply() {
        let (bridge, rx) = RequestBridge::new();
        let worker = thread::spawn(move || bridge.dispatch_and_wait(RequestOp::SetFsaa(4)));

        let req = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(req.op, RequestOp::SetFsaa(4));
        req.reply.send(Ok(true)).unwrap();

        assert!(worker.join().unwrap().unwrap());
    }

    #[test]
    fn test_dispatch_fails_when_receiver_gone() {
        let (bridge, rx) = RequestBridge::new();
        drop(rx);
        let err = bridge
            .dispatch_and_wait(RequestOp::SetScreenSize(640, 480))
            .unwrap_err();
        assert!(matches!(err, GfxError::BridgeClosed));
    }

    #[test]
    fn test_reply_dropped_without_answer() {
        let (bridge, rx) = RequestBridge::new();
        let worker = thread::spawn(move || bridge.dispatch_and_wait(RequestOp::SetFullScreen(true)));
        let req = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        drop(req.reply);
        assert!(matches!(worker.join().unwrap(), Err(GfxError::BridgeClosed)));
    }
}
