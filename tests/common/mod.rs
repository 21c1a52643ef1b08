//! In-memory transport that records every call.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use uhid_gamepad::{DeviceConfig, Gamepad, GamepadError, Transport, REPORT_LEN};

#[derive(Default)]
pub struct TransportLog {
    pub created: Vec<DeviceConfig>,
    pub descriptors: Vec<&'static [u8]>,
    pub sent: Vec<[u8; REPORT_LEN]>,
    pub destroyed: usize,
    pub auto_ready: bool,
    pub fail_create: bool,
    pub fail_send: bool,
    pub fail_destroy: bool,
    pending_ready: Vec<oneshot::Sender<()>>,
}

#[derive(Clone, Default)]
pub struct RecordingTransport {
    pub log: Arc<Mutex<TransportLog>>,
}

pub struct RecordingHandle {
    ready: Option<oneshot::Receiver<()>>,
}

impl RecordingTransport {
    /// Transport whose devices start as soon as they are created.
    pub fn auto_ready() -> Self {
        let transport = Self::default();
        transport.log.lock().unwrap().auto_ready = true;
        transport
    }

    /// Transport whose devices wait for [`signal_ready`](Self::signal_ready).
    pub fn manual_ready() -> Self {
        Self::default()
    }

    pub fn signal_ready(&self) {
        for tx in self.log.lock().unwrap().pending_ready.drain(..) {
            let _ = tx.send(());
        }
    }

    /// Simulates a transport that loses the ability to signal readiness.
    pub fn drop_ready(&self) {
        self.log.lock().unwrap().pending_ready.clear();
    }

    pub fn sent(&self) -> Vec<[u8; REPORT_LEN]> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn created(&self) -> usize {
        self.log.lock().unwrap().created.len()
    }

    pub fn destroyed(&self) -> usize {
        self.log.lock().unwrap().destroyed
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.log.lock().unwrap().fail_send = fail;
    }
}

impl Transport for RecordingTransport {
    type Handle = RecordingHandle;

    fn create(
        &mut self,
        config: &DeviceConfig,
        descriptor: &'static [u8],
    ) -> Result<RecordingHandle, GamepadError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_create {
            return Err(GamepadError::DeviceCreationError("refused".to_string()));
        }
        log.created.push(config.clone());
        log.descriptors.push(descriptor);

        let (tx, rx) = oneshot::channel();
        if log.auto_ready {
            let _ = tx.send(());
        } else {
            log.pending_ready.push(tx);
        }
        Ok(RecordingHandle { ready: Some(rx) })
    }

    async fn await_ready(&mut self, handle: &mut RecordingHandle) -> Result<(), GamepadError> {
        let ready = handle
            .ready
            .as_mut()
            .ok_or_else(|| GamepadError::TransportError("already consumed".to_string()))?;
        let result = ready.await;
        handle.ready = None;
        result.map_err(|_| GamepadError::TransportError("readiness sender dropped".to_string()))
    }

    fn send(
        &mut self,
        _handle: &mut RecordingHandle,
        report: &[u8; REPORT_LEN],
    ) -> Result<(), GamepadError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_send {
            return Err(GamepadError::TransportError("send refused".to_string()));
        }
        log.sent.push(*report);
        Ok(())
    }

    fn destroy(&mut self, _handle: RecordingHandle) -> Result<(), GamepadError> {
        let mut log = self.log.lock().unwrap();
        log.destroyed += 1;
        if log.fail_destroy {
            return Err(GamepadError::TransportError("destroy refused".to_string()));
        }
        Ok(())
    }
}

/// Gamepad that has completed the readiness handshake.
pub async fn started_gamepad() -> Gamepad<RecordingTransport> {
    let mut gamepad = Gamepad::new(DeviceConfig::default(), RecordingTransport::auto_ready());
    gamepad.open().await.expect("open with auto-ready transport");
    gamepad
}
