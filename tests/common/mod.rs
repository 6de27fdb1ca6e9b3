#![allow(dead_code)]

pub mod strategies;

use std::sync::atomic::{AtomicUsize, Ordering};

use batcher_core::BatchOperator;
use parking_lot::Mutex;

/// Error returned by injected chunk failures
#[derive(Debug, thiserror::Error)]
#[error("injected failure on call {call}")]
pub struct InjectedFailure {
    pub call: usize,
}

/// How a [`RecordingOperator`] misbehaves, keyed by 1-based dispatch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    None,
    FailOnCall(usize),
    PanicOnCall(usize),
    /// Fail every chunk whose first element is a multiple of the value
    FailWhereFirstIsMultipleOf(u32),
}

/// List operator that records every `process` invocation.
///
/// Returns the chunk length as its success count, so a clean run totals the
/// input size.
pub struct RecordingOperator {
    data: Vec<u32>,
    injection: Injection,
    calls: AtomicUsize,
    chunk_sizes: Mutex<Vec<usize>>,
    first_elements: Mutex<Vec<u32>>,
}

impl RecordingOperator {
    pub fn new(size: usize) -> Self {
        Self::with_injection(size, Injection::None)
    }

    pub fn with_injection(size: usize, injection: Injection) -> Self {
        let size = u32::try_from(size).expect("test sizes fit in u32");
        Self {
            data: (0..size).collect(),
            injection,
            calls: AtomicUsize::new(0),
            chunk_sizes: Mutex::new(Vec::new()),
            first_elements: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Chunk sizes in the order `process` saw them
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunk_sizes.lock().clone()
    }

    /// First element of every processed chunk, sorted
    pub fn sorted_chunk_starts(&self) -> Vec<u32> {
        let mut starts = self.first_elements.lock().clone();
        starts.sort_unstable();
        starts
    }
}

impl BatchOperator for RecordingOperator {
    type Data = Vec<u32>;
    type Error = InjectedFailure;

    fn original_data(&self) -> &Vec<u32> {
        &self.data
    }

    fn size(&self, data: &Vec<u32>) -> usize {
        data.len()
    }

    fn slice(&self, start: usize, length: usize) -> Vec<u32> {
        let end = (start + length).min(self.data.len());
        self.data[start.min(end)..end].to_vec()
    }

    fn process(&self, data: &Vec<u32>) -> Result<u64, InjectedFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.chunk_sizes.lock().push(data.len());
        if let Some(first) = data.first() {
            self.first_elements.lock().push(*first);
        }

        match self.injection {
            Injection::FailOnCall(target) if target == call => Err(InjectedFailure { call }),
            Injection::PanicOnCall(target) if target == call => {
                panic!("injected panic on call {call}")
            }
            Injection::FailWhereFirstIsMultipleOf(step)
                if data.first().is_some_and(|first| first % step == 0) =>
            {
                Err(InjectedFailure { call })
            }
            _ => Ok(data.len() as u64),
        }
    }
}
