use crate::config::EngineConfig;
use crate::confidence::smoother_from_config;
use crate::error::FollowError;
use crate::pipeline::defaults::{HybridWordScorer, ScriptTokenizer};
use crate::pipeline::runtime::{FollowEngine, FollowEngineParts};
use crate::pipeline::traits::{ConfidenceSmoother, Tokenizer, WordScorer};

pub struct FollowEngineBuilder {
    config: EngineConfig,
    tokenizer: Option<Box<dyn Tokenizer>>,
    scorer: Option<Box<dyn WordScorer>>,
    smoother: Option<Box<dyn ConfidenceSmoother>>,
}

impl FollowEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            tokenizer: None,
            scorer: None,
            smoother: None,
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn with_scorer(mut self, scorer: Box<dyn WordScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_smoother(mut self, smoother: Box<dyn ConfidenceSmoother>) -> Self {
        self.smoother = Some(smoother);
        self
    }

    pub fn build(self) -> Result<FollowEngine, FollowError> {
        self.config.validate()?;

        let tokenizer = self
            .tokenizer
            .unwrap_or_else(|| Box::new(ScriptTokenizer::new(self.config.normalization)));
        let scorer = self.scorer.unwrap_or_else(|| Box::new(HybridWordScorer));
        let smoother = self
            .smoother
            .unwrap_or_else(|| smoother_from_config(&self.config.confidence));

        Ok(FollowEngine::from_parts(FollowEngineParts {
            config: self.config,
            tokenizer,
            scorer,
            smoother,
        }))
    }
}
