pub mod aggregation_service;
pub mod aligner;
pub mod stats;
pub mod token_cache;

pub use aggregation_service::{
    AggregationService, AverageResult, CorrelationResult, TickerListResult, TickerStats,
};
pub use aligner::{align, AlignedPair, MinuteBucket};
pub use token_cache::TokenCache;
