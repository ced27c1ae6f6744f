mod activation;
mod decay;
mod hybrid;
mod pagerank;
mod relevance;

pub use activation::{spread, ActivationConfig};
pub use decay::{boosted, decay_from, exponential, linear, step};
pub use hybrid::{HybridScore, HybridScorer, HybridWeights};
pub use pagerank::{page_rank, PageRankConfig};
pub use relevance::{KindBoost, RelevanceScorer, RelevanceWeights};
