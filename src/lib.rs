// Vocal Range Tester Core
// Real-time pitch tracking of a singer's range with song suggestions

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod notes;
pub mod pitch;
pub mod session;
pub mod songs;
pub mod tracker;

// Re-exports for convenience
pub use analysis::{analyze_samples, analyze_wav, AnalysisReport};
pub use audio::{CpalBackend, InputBackend, SignalBackend};
pub use config::AppConfig;
pub use error::{AudioError, CatalogError, ErrorCode};
pub use notes::{frequency_to_midi, frequency_to_note, midi_note_to_name};
pub use pitch::{McLeodDetector, PitchDetector, PitchEstimate};
pub use session::RecordingSession;
pub use songs::{match_songs, Song, SongCatalog};
pub use tracker::{RangeEvent, RangeSnapshot, RangeTracker, SampleGate};
