// ChunkPool - lock-free capture chunk pool with dual SPSC queues
//
// Capture audio arrives in small callback-sized slices. The writer side
// copies them into fixed-interval chunks (100 ms by default) that were
// allocated up front, so the capture callback never touches the heap.
//
// Architecture:
// - DATA_QUEUE: capture side pushes filled chunks, collector consumes
// - POOL_QUEUE: collector returns emptied chunks, capture side recycles
//
// Chunk flow:
// 1. ChunkWriter pops an empty chunk from POOL_QUEUE
// 2. ChunkWriter fills it from callback slices
// 3. ChunkWriter pushes the full chunk to DATA_QUEUE
// 4. ChunkCollector pops it, appends the samples to the recording
// 5. ChunkCollector pushes the emptied chunk back to POOL_QUEUE
//
// If the collector falls behind and the pool runs dry, incoming samples are
// counted as dropped instead of allocating a new chunk.

use rtrb::{Consumer, Producer};

/// Pre-allocated chunk of interleaved samples
#[derive(Debug)]
pub struct CaptureChunk {
    samples: Vec<f32>,
    filled: usize,
}

impl CaptureChunk {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            filled: 0,
        }
    }

    /// Copy as much of `input` as fits; returns the number of samples taken
    fn fill_from(&mut self, input: &[f32]) -> usize {
        let take = input.len().min(self.samples.len() - self.filled);
        self.samples[self.filled..self.filled + take].copy_from_slice(&input[..take]);
        self.filled += take;
        take
    }

    fn is_full(&self) -> bool {
        self.filled == self.samples.len()
    }

    /// Filled portion of the chunk
    pub fn samples(&self) -> &[f32] {
        &self.samples[..self.filled]
    }

    fn reset(&mut self) {
        self.filled = 0;
    }
}

/// Samples per chunk for a capture interval
pub fn chunk_len_for_interval(sample_rate: u32, channels: u16, interval_ms: u32) -> usize {
    let frames = (u64::from(sample_rate) * u64::from(interval_ms) / 1000).max(1);
    frames as usize * usize::from(channels.max(1))
}

/// Lock-free chunk pool using dual SPSC ring buffers
pub struct ChunkPool;

impl ChunkPool {
    /// Create the writer/collector pair with `chunk_count` chunks of `chunk_len` samples
    ///
    /// Zero counts or lengths are raised to one.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(chunk_count: usize, chunk_len: usize) -> (ChunkWriter, ChunkCollector) {
        let chunk_count = chunk_count.max(1);
        let chunk_len = chunk_len.max(1);

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(chunk_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(chunk_count);

        // The only place chunks are allocated
        for _ in 0..chunk_count {
            if pool_producer
                .push(CaptureChunk::with_capacity(chunk_len))
                .is_err()
            {
                break;
            }
        }

        let writer = ChunkWriter {
            pool_consumer,
            data_producer,
            current: None,
            dropped_samples: 0,
        };
        let collector = ChunkCollector {
            data_consumer,
            pool_producer,
            recorded: Vec::new(),
        };
        (writer, collector)
    }
}

/// Capture-side half of the pool; safe to use inside an audio callback
pub struct ChunkWriter {
    pool_consumer: Consumer<CaptureChunk>,
    data_producer: Producer<CaptureChunk>,
    current: Option<CaptureChunk>,
    dropped_samples: usize,
}

impl ChunkWriter {
    /// Buffer a slice of interleaved samples
    pub fn write(&mut self, mut input: &[f32]) {
        while !input.is_empty() {
            if self.current.is_none() {
                match self.pool_consumer.pop() {
                    Ok(chunk) => self.current = Some(chunk),
                    Err(_) => {
                        self.dropped_samples += input.len();
                        return;
                    }
                }
            }

            let Some(chunk) = self.current.as_mut() else {
                return;
            };
            let taken = chunk.fill_from(input);
            input = &input[taken..];

            if chunk.is_full() {
                self.push_current();
            }
        }
    }

    /// Hand over the partially filled chunk, if any
    pub fn flush(&mut self) {
        if self
            .current
            .as_ref()
            .is_some_and(|chunk| chunk.filled > 0)
        {
            self.push_current();
        }
    }

    /// Samples discarded because the pool was exhausted
    pub fn dropped_samples(&self) -> usize {
        self.dropped_samples
    }

    fn push_current(&mut self) {
        if let Some(chunk) = self.current.take() {
            if let Err(rtrb::PushError::Full(chunk)) = self.data_producer.push(chunk) {
                // Data queue holds at most every chunk in the pool, so this
                // only happens if the pool was built inconsistently
                self.dropped_samples += chunk.filled;
            }
        }
    }
}

/// Collector-side half of the pool; accumulates the recording
pub struct ChunkCollector {
    data_consumer: Consumer<CaptureChunk>,
    pool_producer: Producer<CaptureChunk>,
    recorded: Vec<f32>,
}

impl ChunkCollector {
    /// Move every filled chunk into the recording; returns chunks drained
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(mut chunk) = self.data_consumer.pop() {
            self.recorded.extend_from_slice(chunk.samples());
            chunk.reset();
            // Pool capacity equals the chunk count, so a returned chunk always fits
            let _ = self.pool_producer.push(chunk);
            drained += 1;
        }
        drained
    }

    /// Samples collected so far
    pub fn recorded_len(&self) -> usize {
        self.recorded.len()
    }

    /// Take the concatenated recording, leaving the collector empty
    pub fn take_recording(&mut self) -> Vec<f32> {
        self.drain();
        std::mem::take(&mut self.recorded)
    }
}
