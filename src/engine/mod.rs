//! Real-time pitch sampling engine.

pub mod sampler;

pub use sampler::{
    spawn_sampler, PitchSampler, SamplerContext, SamplerStats, SamplerTask, StopToken, TickOutcome,
};
