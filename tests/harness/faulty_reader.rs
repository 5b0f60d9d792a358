#![allow(dead_code)]

use std::io::{Read, Result};

pub struct FaultyReader<R: Read> {
    inner: R,
    mode: FaultMode,
    counter: usize,
}

pub enum FaultMode {
    OneByteChunks,
    /// Reads of at most the given sizes, cycling through the list.
    Chunks(Vec<usize>),
    InterruptedEvery(usize),
    PrematureEofAt(usize),
    FailAt(usize),
}

impl<R: Read> FaultyReader<R> {
    pub fn new(inner: R, mode: FaultMode) -> Self {
        Self {
            inner,
            mode,
            counter: 0,
        }
    }
}

impl<R: Read> Read for FaultyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.counter += 1;
        match &self.mode {
            FaultMode::OneByteChunks => {
                let len = buf.len().min(1);
                self.inner.read(&mut buf[..len])
            }
            FaultMode::Chunks(sizes) if !sizes.is_empty() => {
                let size = sizes[(self.counter - 1) % sizes.len()].max(1);
                let len = buf.len().min(size);
                self.inner.read(&mut buf[..len])
            }
            FaultMode::InterruptedEvery(n) if *n != 0 && self.counter % *n == 0 => {
                Err(std::io::Error::from(std::io::ErrorKind::Interrupted))
            }
            FaultMode::PrematureEofAt(n) if self.counter >= *n => Ok(0),
            FaultMode::FailAt(n) if self.counter >= *n => Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "simulated reset",
            )),
            _ => self.inner.read(buf),
        }
    }
}
