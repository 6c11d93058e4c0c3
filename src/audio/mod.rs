// Audio module - microphone capture and the lock-free frame pool feeding
// the pitch sampler

pub mod backend;
pub mod buffer_pool;
pub mod cpal_input;
pub mod signal;

// Re-export commonly used types for convenience
pub use backend::{CaptureStream, InputBackend};
pub use buffer_pool::{
    AudioFrame, BufferPool, BufferPoolChannels, CaptureSide, SamplerSide, DEFAULT_FRAME_COUNT,
    DEFAULT_FRAME_SIZE,
};
pub use cpal_input::CpalBackend;
pub use signal::SignalBackend;
