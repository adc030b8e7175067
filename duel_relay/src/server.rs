// TCP server and coordinator loop for the snapshot relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts connections
//   and sends `InternalEvent::NewConnection` to the coordinator.
// - **Reader threads** (one per active slot): call `framing::read_message()`
//   in a loop and forward each raw frame as `InternalEvent::Frame`. On EOF or
//   any framing error they send `InternalEvent::Disconnected` and exit.
// - **Coordinator thread**: owns the `Session`, the only writer to client
//   sockets. It admits connections, opens the start barrier, and answers each
//   snapshot with the peer's latest one.
//
// Reader threads are spawned only when the barrier opens, so nothing is read
// from a client before it has been told to start. A client that goes silent
// blocks only its own reader; the coordinator keeps answering the other slot
// from the stored snapshot.
//
// Shutdown: the coordinator checks a `keep_running` flag (cleared by
// `RelayHandle::stop`) between events.

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use duel_protocol::framing::{FrameError, read_message};
use duel_protocol::types::{SLOT_COUNT, SlotId};
use tracing::{debug, info, warn};

use crate::session::{Admission, Session};

/// How often the coordinator wakes to check the shutdown flag when idle.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Pause between accept attempts when nothing is pending or accept failed.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Events sent from listener/reader threads to the coordinator.
enum InternalEvent {
    NewConnection { stream: TcpStream, addr: SocketAddr },
    Frame { slot: SlotId, payload: Vec<u8> },
    Disconnected { slot: SlotId },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5555,
        }
    }
}

/// Start the relay on background threads. Returns a handle for stopping it
/// and the actual bound address (useful when port 0 is used to let the OS
/// pick a free port).
pub fn start_relay(config: RelayConfig) -> io::Result<(RelayHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_relay(listener, keep_running_clone);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Coordinator loop. Runs until `keep_running` is cleared.
fn run_relay(listener: TcpListener, keep_running: Arc<AtomicBool>) {
    let mut session = Session::new();
    let mut pending_readers: [Option<TcpStream>; SLOT_COUNT] = [None, None];

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Non-blocking so the accept thread can check keep_running periodically.
    if let Err(e) = listener.set_nonblocking(true) {
        warn!("listener stays blocking: {e}");
    }

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        accept_loop(|| listener.accept(), &keep_running_listener, &tx_listener);
    });

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(IDLE_POLL) {
            Ok(event) => {
                handle_event(&mut session, &mut pending_readers, event, &tx);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
    session.close_all();
    debug!("relay coordinator stopped");
}

/// Accept loop for the listener thread. Accept errors are logged and retried.
fn accept_loop<F>(mut accept: F, keep_running: &AtomicBool, tx: &Sender<InternalEvent>)
where
    F: FnMut() -> io::Result<(TcpStream, SocketAddr)>,
{
    while keep_running.load(Ordering::SeqCst) {
        match accept() {
            Ok((stream, addr)) => {
                stream.set_nonblocking(false).ok();
                stream.set_nodelay(true).ok();
                if tx.send(InternalEvent::NewConnection { stream, addr }).is_err() {
                    break; // Coordinator is gone
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => {
                warn!("accept failed: {e}");
                thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

/// Dispatch a single event to the session.
fn handle_event(
    session: &mut Session,
    pending_readers: &mut [Option<TcpStream>; SLOT_COUNT],
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
) {
    match event {
        InternalEvent::NewConnection { stream, addr } => {
            info!(%addr, "incoming connection");
            handle_new_connection(session, pending_readers, stream, tx);
        }
        InternalEvent::Frame { slot, payload } => {
            session.handle_frame(slot, payload);
        }
        InternalEvent::Disconnected { slot } => {
            session.handle_disconnect(slot);
        }
    }
}

/// Admit (or reject) a connection, and open the barrier once both slots are
/// registered.
fn handle_new_connection(
    session: &mut Session,
    pending_readers: &mut [Option<TcpStream>; SLOT_COUNT],
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
) {
    let read_half = match stream.try_clone() {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to clone client stream: {e}");
            return;
        }
    };

    let Admission::Admitted(slot) = session.admit(stream) else {
        return;
    };
    pending_readers[slot.index()] = Some(read_half);

    for slot in session.release_barrier() {
        if let Some(stream) = pending_readers[slot.index()].take() {
            let tx_reader = tx.clone();
            thread::spawn(move || {
                reader_loop(BufReader::new(stream), slot, tx_reader);
            });
        }
    }
}

/// Reader loop for a single slot. Runs in its own thread and never writes.
fn reader_loop(mut reader: BufReader<TcpStream>, slot: SlotId, tx: Sender<InternalEvent>) {
    loop {
        match read_message(&mut reader) {
            Ok(payload) => {
                if tx.send(InternalEvent::Frame { slot, payload }).is_err() {
                    break; // Coordinator is gone
                }
            }
            Err(e) => {
                match &e {
                    FrameError::Disconnected => debug!(%slot, "end of stream"),
                    other => warn!(%slot, "receiving error: {other}"),
                }
                let _ = tx.send(InternalEvent::Disconnected { slot });
                break;
            }
        }
    }
}
