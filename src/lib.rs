pub mod alignment;
pub mod confidence;
pub mod config;
pub mod error;
pub mod highlight;
pub mod pipeline;
pub mod replay;
pub mod session;
pub mod types;

pub use config::EngineConfig;
pub use error::FollowError;
pub use pipeline::builder::FollowEngineBuilder;
pub use pipeline::runtime::FollowEngine;
pub use pipeline::traits::{ConfidenceSmoother, Tokenizer, WordScorer};
pub use session::{RecoveryAction, SessionSupervisor};
pub use types::{
    EngineEvent, HighlightCommand, Progress, RecognitionEvent, RecognitionMode, StatusUpdate,
    Token, TokenKind, TokenizedText, WordState,
};
