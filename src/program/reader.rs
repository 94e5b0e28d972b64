//! Background stdin reader.
//!
//! The render and parse paths never block; the only blocking read lives on
//! this thread, which forwards raw chunks over a channel. The driver drains
//! the channel from [`crate::program::Program::poll`].

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::debug;

/// Message from the reader thread.
#[derive(Debug)]
pub enum InputChunk {
    Data(Vec<u8>),
    /// EOF or a read error; no more data will arrive.
    Closed,
}

/// Handle to the reader thread.
pub struct InputReader {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl InputReader {
    /// Spawn a reader over any byte source.
    pub fn spawn<R: Read + Send + 'static>(source: R) -> io::Result<(Self, Receiver<InputChunk>)> {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("spark-term-input".to_string())
            .spawn(move || read_loop(source, flag, tx))?;

        Ok((Self { handle: Some(handle), running }, rx))
    }

    /// Spawn a reader over the process's stdin.
    pub fn stdin() -> io::Result<(Self, Receiver<InputChunk>)> {
        Self::spawn(io::stdin())
    }

    /// Ask the thread to stop after its current read returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // A thread blocked in read() cannot be interrupted portably; it is
        // detached and exits with the process or when input closes.
        self.handle.take();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_loop<R: Read>(mut source: R, running: Arc<AtomicBool>, tx: Sender<InputChunk>) {
    let mut buf = [0u8; 1024];
    while running.load(Ordering::SeqCst) {
        match source.read(&mut buf) {
            Ok(0) => {
                let _ = tx.send(InputChunk::Closed);
                break;
            }
            Ok(n) => {
                if tx.send(InputChunk::Data(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "input read failed");
                let _ = tx.send(InputChunk::Closed);
                break;
            }
        }
    }
    running.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn forwards_chunks_then_closes() {
        let (_reader, rx) = InputReader::spawn(io::Cursor::new(b"abc".to_vec())).unwrap();
        let mut data = Vec::new();
        loop {
            match rx.recv_timeout(Duration::from_secs(2)).unwrap() {
                InputChunk::Data(d) => data.extend(d),
                InputChunk::Closed => break,
            }
        }
        assert_eq!(data, b"abc");
    }
}
