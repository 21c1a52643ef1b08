//! Linux `/dev/uhid` transport
//!
//! Each created device gets its own file descriptor, registered non-blocking
//! with tokio's reactor, and a reader task that drains kernel events. The
//! first `UHID_START` fires the readiness channel awaited by
//! [`Transport::await_ready`].
//!
//! ```text
//! create() ──► UHID_CREATE2 ──► kernel
//!                                 │
//! reader task ◄── UHID_START ◄────┘
//!      │
//!      └─► oneshot ──► await_ready()
//! ```

use super::uhid_event::{UhidEvent, UhidRequest, UHID_EVENT_SIZE};
use super::Transport;
use crate::config::DeviceConfig;
use crate::error::GamepadError;
use crate::report::REPORT_LEN;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::unix::AsyncFd;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Default uhid character device
pub const UHID_PATH: &str = "/dev/uhid";

// Reply code for report requests the gamepad cannot serve.
const EIO: u16 = libc::EIO as u16;

/// Transport backed by the kernel's user-space HID driver.
#[derive(Clone, Debug)]
pub struct UhidTransport {
    path: PathBuf,
}

impl Default for UhidTransport {
    fn default() -> Self {
        Self::new(UHID_PATH)
    }
}

impl UhidTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// One registered uhid device.
///
/// Dropping the handle stops the reader task; closing the last descriptor
/// makes the kernel remove the device.
pub struct UhidHandle {
    fd: Arc<AsyncFd<File>>,
    ready: Option<oneshot::Receiver<()>>,
    cancel: CancellationToken,
}

impl UhidHandle {
    // Starts the event reader on a descriptor that is already registered with the kernel.
    fn attach(fd: Arc<AsyncFd<File>>, runtime: &tokio::runtime::Handle) -> Self {
        let (ready_tx, ready_rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        runtime.spawn(read_events(fd.clone(), ready_tx, cancel.clone()));
        debug!("Spawned uhid event reader");

        Self {
            fd,
            ready: Some(ready_rx),
            cancel,
        }
    }
}

impl Drop for UhidHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Transport for UhidTransport {
    type Handle = UhidHandle;

    fn create(
        &mut self,
        config: &DeviceConfig,
        descriptor: &'static [u8],
    ) -> Result<UhidHandle, GamepadError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            GamepadError::DeviceCreationError(format!("No tokio runtime available: {}", e))
        })?;

        debug!("Opening {}", self.path.display());
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK | libc::O_CLOEXEC)
            .open(&self.path)
            .map_err(|e| {
                GamepadError::DeviceCreationError(format!(
                    "Failed to open {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        // AsyncFd registers with the reactor of the current runtime.
        let _guard = runtime.enter();
        let fd = Arc::new(register(file).map_err(|e| {
            GamepadError::DeviceCreationError(format!("Failed to register uhid descriptor: {}", e))
        })?);

        write_request(
            &fd,
            &UhidRequest::Create2 {
                config,
                descriptor,
            },
        )
        .map_err(|e| GamepadError::DeviceCreationError(format!("UHID_CREATE2 failed: {}", e)))?;
        info!(
            "Registered uhid device '{}' with {}-byte descriptor",
            config.device_name,
            descriptor.len()
        );

        Ok(UhidHandle::attach(fd, &runtime))
    }

    async fn await_ready(&mut self, handle: &mut UhidHandle) -> Result<(), GamepadError> {
        let ready = handle.ready.as_mut().ok_or_else(|| {
            GamepadError::TransportError("Readiness was already consumed".to_string())
        })?;

        let result = ready.await;
        handle.ready = None;
        result.map_err(|_| {
            GamepadError::TransportError(
                "uhid event reader stopped before UHID_START".to_string(),
            )
        })
    }

    fn send(
        &mut self,
        handle: &mut UhidHandle,
        report: &[u8; REPORT_LEN],
    ) -> Result<(), GamepadError> {
        write_request(&handle.fd, &UhidRequest::Input2 { data: report })
            .map_err(|e| GamepadError::TransportError(format!("UHID_INPUT2 failed: {}", e)))
    }

    fn destroy(&mut self, handle: UhidHandle) -> Result<(), GamepadError> {
        let result = write_request(&handle.fd, &UhidRequest::Destroy)
            .map_err(|e| GamepadError::TransportError(format!("UHID_DESTROY failed: {}", e)));
        drop(handle);
        debug!("uhid device destroyed");
        result
    }
}

fn register(file: File) -> io::Result<AsyncFd<File>> {
    // SAFETY: the `File` owns its descriptor and keeps it open until the AsyncFd drops it.
    let fd = unsafe { AsyncFd::register(file) }?;
    Ok(fd)
}

fn write_request(fd: &AsyncFd<File>, request: &UhidRequest<'_>) -> io::Result<()> {
    let bytes = request.encode();
    let mut file: &File = fd.get_ref();
    let written = file.write(&bytes)?;
    if written != bytes.len() {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short uhid write: {} of {} bytes", written, bytes.len()),
        ));
    }
    trace!("Wrote {:?} ({} bytes)", request, bytes.len());
    Ok(())
}

async fn read_event(fd: &AsyncFd<File>, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        let mut guard = fd.readable().await?;
        match guard.try_io(|inner| {
            let mut file: &File = inner.get_ref();
            file.read(buf)
        }) {
            Ok(result) => return result,
            Err(_would_block) => continue,
        }
    }
}

// Runs until cancelled or the descriptor fails.
async fn read_events(
    fd: Arc<AsyncFd<File>>,
    ready_tx: oneshot::Sender<()>,
    cancel: CancellationToken,
) {
    let mut ready_tx = Some(ready_tx);
    let mut buf = vec![0u8; UHID_EVENT_SIZE];
    info!("uhid event reader started");

    loop {
        let len = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("uhid event reader cancelled");
                return;
            }
            result = read_event(&fd, &mut buf) => match result {
                Ok(0) => {
                    warn!("uhid descriptor reached end of file");
                    return;
                }
                Ok(len) => len,
                Err(e) => {
                    error!("Failed to read uhid event: {}", e);
                    return;
                }
            }
        };

        let Some(event) = UhidEvent::parse(&buf[..len]) else {
            warn!("Ignoring truncated uhid event ({} bytes)", len);
            continue;
        };

        match event {
            UhidEvent::Start { dev_flags } => {
                info!("Host started device (flags {:#x})", dev_flags);
                if let Some(tx) = ready_tx.take() {
                    // Fails only once the handle, and the receiver with it, has been dropped.
                    if tx.send(()).is_err() {
                        debug!("Nobody is waiting for readiness");
                    }
                }
            }
            UhidEvent::Stop => warn!("Host stopped device"),
            UhidEvent::Open => debug!("Host opened device"),
            UhidEvent::Close => debug!("Host closed device"),
            UhidEvent::Output { rtype, size } => {
                debug!("Ignoring output report (type {}, {} bytes)", rtype, size);
            }
            UhidEvent::GetReport { id, rnum, rtype } => {
                debug!("Rejecting GET_REPORT {} (report {}, type {})", id, rnum, rtype);
                if let Err(e) = write_request(&fd, &UhidRequest::GetReportReply { id, err: EIO }) {
                    error!("Failed to answer GET_REPORT: {}", e);
                }
            }
            UhidEvent::SetReport { id, rnum, rtype } => {
                debug!("Rejecting SET_REPORT {} (report {}, type {})", id, rnum, rtype);
                if let Err(e) = write_request(&fd, &UhidRequest::SetReportReply { id, err: EIO }) {
                    error!("Failed to answer SET_REPORT: {}", e);
                }
            }
            UhidEvent::Unknown(raw) => trace!("Ignoring uhid event type {}", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::FromRawFd;
    use std::time::Duration;

    const PATIENCE: Duration = Duration::from_secs(2);

    // Stands in for the kernel side of /dev/uhid. Seqpacket keeps record
    // boundaries and reports EOF once the peer closes.
    fn socket_pair() -> (File, File) {
        let mut fds = [0; 2];
        let flags = libc::SOCK_SEQPACKET | libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC;
        let rc = unsafe { libc::socketpair(libc::AF_UNIX, flags, 0, fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "socketpair: {}", io::Error::last_os_error());
        unsafe { (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])) }
    }

    struct Kernel {
        fd: AsyncFd<File>,
    }

    impl Kernel {
        fn emit(&self, kind: u32, body: &[(usize, &[u8])]) {
            let mut record = vec![0u8; UHID_EVENT_SIZE];
            record[..4].copy_from_slice(&kind.to_ne_bytes());
            for (offset, bytes) in body {
                record[*offset..*offset + bytes.len()].copy_from_slice(bytes);
            }
            let mut file: &File = self.fd.get_ref();
            assert_eq!(file.write(&record).unwrap(), UHID_EVENT_SIZE);
        }

        fn start(&self) {
            self.emit(2, &[(4, &0u64.to_ne_bytes()[..])]);
        }

        fn report_request(&self, kind: u32, id: u32) {
            self.emit(kind, &[(4, &id.to_ne_bytes()[..]), (8, &[1u8][..]), (9, &[0u8][..])]);
        }

        async fn next(&self) -> Vec<u8> {
            let mut buf = vec![0u8; UHID_EVENT_SIZE];
            let len = tokio::time::timeout(PATIENCE, read_event(&self.fd, &mut buf))
                .await
                .expect("no record from the device side")
                .unwrap();
            buf.truncate(len);
            buf
        }
    }

    fn attached() -> (UhidHandle, Kernel) {
        let (device, kernel) = socket_pair();
        let runtime = tokio::runtime::Handle::current();
        let handle = UhidHandle::attach(Arc::new(register(device).unwrap()), &runtime);
        let kernel = Kernel {
            fd: register(kernel).unwrap(),
        };
        (handle, kernel)
    }

    fn u32_at(record: &[u8], offset: usize) -> u32 {
        u32::from_ne_bytes(record[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(record: &[u8], offset: usize) -> u16 {
        u16::from_ne_bytes(record[offset..offset + 2].try_into().unwrap())
    }

    #[tokio::test]
    async fn start_event_completes_readiness() {
        let (mut handle, kernel) = attached();
        let mut transport = UhidTransport::default();

        let pending = tokio::time::timeout(
            Duration::from_millis(20),
            transport.await_ready(&mut handle),
        )
        .await;
        assert!(pending.is_err(), "ready before UHID_START");

        kernel.start();
        tokio::time::timeout(PATIENCE, transport.await_ready(&mut handle))
            .await
            .unwrap()
            .unwrap();

        let again = transport.await_ready(&mut handle).await.unwrap_err();
        assert!(matches!(again, GamepadError::TransportError(_)));
    }

    #[tokio::test]
    async fn repeated_start_keeps_the_reader_running() {
        let (mut handle, kernel) = attached();
        let mut transport = UhidTransport::default();

        kernel.start();
        kernel.start();
        kernel.report_request(9, 41);
        transport.await_ready(&mut handle).await.unwrap();

        let reply = kernel.next().await;
        assert_eq!(u32_at(&reply, 0), 10);
        assert_eq!(u32_at(&reply, 4), 41);
    }

    #[tokio::test]
    async fn report_requests_are_rejected_with_eio() {
        let (_handle, kernel) = attached();

        kernel.report_request(9, 7);
        let reply = kernel.next().await;
        assert_eq!(reply.len(), 12);
        assert_eq!(u32_at(&reply, 0), 10);
        assert_eq!(u32_at(&reply, 4), 7);
        assert_eq!(u16_at(&reply, 8), libc::EIO as u16);

        kernel.report_request(13, 8);
        let reply = kernel.next().await;
        assert_eq!(u32_at(&reply, 0), 14);
        assert_eq!(u32_at(&reply, 4), 8);
        assert_eq!(u16_at(&reply, 8), libc::EIO as u16);
    }

    #[tokio::test]
    async fn other_events_get_no_reply() {
        let (_handle, kernel) = attached();

        for kind in [3, 4, 5, 6, 99] {
            kernel.emit(kind, &[]);
        }
        kernel.report_request(13, 1);

        // the first reply is the one to the set-report request
        let reply = kernel.next().await;
        assert_eq!(u32_at(&reply, 0), 14);
        assert_eq!(u32_at(&reply, 4), 1);
    }

    #[tokio::test]
    async fn reader_stopping_before_start_fails_readiness() {
        let (mut handle, kernel) = attached();
        let mut transport = UhidTransport::default();

        drop(kernel);

        let err = tokio::time::timeout(PATIENCE, transport.await_ready(&mut handle))
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, GamepadError::TransportError(_)));
    }

    #[tokio::test]
    async fn send_writes_input2_record() {
        let (mut handle, kernel) = attached();
        let mut transport = UhidTransport::default();
        let report = [0x11, 0, 0, 0, 100, 0, 0xCE, 0xFF, 0, 0, 0, 0];

        transport.send(&mut handle, &report).unwrap();

        let record = kernel.next().await;
        assert_eq!(record.len(), 6 + REPORT_LEN);
        assert_eq!(u32_at(&record, 0), 12);
        assert_eq!(u16_at(&record, 4), REPORT_LEN as u16);
        assert_eq!(&record[6..], &report);
    }

    #[tokio::test]
    async fn destroy_writes_destroy_and_releases_descriptor() {
        let (handle, kernel) = attached();
        let mut transport = UhidTransport::default();

        transport.destroy(handle).unwrap();

        let record = kernel.next().await;
        assert_eq!(record.len(), 4);
        assert_eq!(u32_at(&record, 0), 1);

        // reader task gone, descriptor closed
        assert!(kernel.next().await.is_empty());
    }
}
