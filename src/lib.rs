pub mod audio;
pub mod config;
pub mod error;
pub mod interactive;
pub mod pipeline;
pub mod subtitle;
pub mod transcribe;

pub use config::Config;
pub use error::{Result, TranscriberError};
pub use pipeline::{
    derive_output_path, print_summary, transcribe_file, PipelineConfig, PipelineResult,
    PipelineStats,
};
