// BufferPool - lock-free frame pool with dual SPSC queues
//
// The capture callback must not allocate, so every frame is allocated up
// front and circulates between two rtrb ring buffers:
//
// - DATA queue: capture thread pushes filled frames, sampler consumes
// - POOL queue: sampler returns drained frames, capture thread recycles
//
// When the sampler falls behind the pool runs dry and the capture callback
// drops audio instead of blocking.

use rtrb::{Consumer, Producer};

/// Configuration constants for the frame pool
pub const DEFAULT_FRAME_COUNT: usize = 16;
pub const DEFAULT_FRAME_SIZE: usize = 512;

/// Mono audio frame - pre-allocated vector of f32 samples
pub type AudioFrame = Vec<f32>;

/// Both ends of both queues, as returned by [`BufferPool::new`]
pub struct BufferPoolChannels {
    /// Producer for sending filled frames to the sampler
    pub data_producer: Producer<AudioFrame>,
    /// Consumer for receiving filled frames in the sampler
    pub data_consumer: Consumer<AudioFrame>,
    /// Producer for returning drained frames from the sampler
    pub pool_producer: Producer<AudioFrame>,
    /// Consumer for retrieving empty frames in the capture callback
    pub pool_consumer: Consumer<AudioFrame>,
}

/// Queue ends owned by the capture callback
pub struct CaptureSide {
    pub data_producer: Producer<AudioFrame>,
    pub pool_consumer: Consumer<AudioFrame>,
}

/// Queue ends owned by the sampler
pub struct SamplerSide {
    pub data_consumer: Consumer<AudioFrame>,
    pub pool_producer: Producer<AudioFrame>,
}

impl BufferPoolChannels {
    /// Split into the halves handed to the capture and sampler threads
    pub fn split_for_threads(self) -> (CaptureSide, SamplerSide) {
        (
            CaptureSide {
                data_producer: self.data_producer,
                pool_consumer: self.pool_consumer,
            },
            SamplerSide {
                data_consumer: self.data_consumer,
                pool_producer: self.pool_producer,
            },
        )
    }
}

impl CaptureSide {
    /// Copy the first channel of interleaved `data` into pooled frames.
    ///
    /// Returns the number of mono samples that could not be queued because
    /// the pool was empty.
    pub fn push_interleaved<T, F>(&mut self, data: &[T], channels: usize, convert: F) -> usize
    where
        T: Copy,
        F: Fn(T) -> f32,
    {
        let channels = channels.max(1);
        let mut mono = data.iter().step_by(channels).copied().map(&convert).peekable();
        let mut dropped = 0;

        while mono.peek().is_some() {
            match self.pool_consumer.pop() {
                Ok(mut frame) => {
                    let capacity = frame.capacity().max(1);
                    frame.clear();
                    frame.extend(mono.by_ref().take(capacity));
                    if let Err(rtrb::PushError::Full(frame)) = self.data_producer.push(frame) {
                        dropped += frame.len();
                    }
                }
                Err(_) => {
                    dropped += mono.count();
                    break;
                }
            }
        }

        dropped
    }
}

impl SamplerSide {
    /// Move every queued sample into `sink`, recycling the frames
    pub fn drain_into<F: FnMut(&[f32])>(&mut self, mut sink: F) -> usize {
        let mut drained = 0;
        while let Ok(frame) = self.data_consumer.pop() {
            drained += frame.len();
            sink(&frame);
            if self.pool_producer.push(frame).is_err() {
                log::warn!("[BufferPool] Pool queue full, dropping frame");
            }
        }
        drained
    }
}

/// Lock-free frame pool using dual SPSC ring buffers
///
/// # Example
/// ```ignore
/// let (mut capture, mut sampler) = BufferPool::new(16, 512).split_for_threads();
///
/// // In the capture callback:
/// capture.push_interleaved(data, channels, |s: f32| s);
///
/// // In the sampler:
/// sampler.drain_into(|samples| window.extend_from_slice(samples));
/// ```
pub struct BufferPool;

impl BufferPool {
    /// Create a pool of `frame_count` frames holding `frame_size` samples each
    ///
    /// # Panics
    /// Panics if frame_count is 0 or frame_size is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(frame_count: usize, frame_size: usize) -> BufferPoolChannels {
        assert!(frame_count > 0, "frame_count must be greater than 0");
        assert!(frame_size > 0, "frame_size must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(frame_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(frame_count);

        for _ in 0..frame_count {
            let frame: AudioFrame = Vec::with_capacity(frame_size);
            if pool_producer.push(frame).is_err() {
                unreachable!("pool queue sized for every frame");
            }
        }

        BufferPoolChannels {
            data_producer,
            data_consumer,
            pool_producer,
            pool_consumer,
        }
    }
}
