pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod table;

pub use config::{AppConfig, SeriesSpec};
pub use error::{Diagnostic, FetchError, NormalizeError, PipelineError};
pub use fetch::{FetchCache, FetchOutcome, Fetcher};
pub use normalize::{normalize, NormalizedSeries};
pub use pipeline::{IndicatorReport, Pipeline};
pub use table::RawTable;
