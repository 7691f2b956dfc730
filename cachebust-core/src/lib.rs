//! Cachebust Core - Static Asset Fingerprinting
//!
//! # The Pipeline
//! 1. Collect manageable static files from the project
//! 2. Hash each file's bytes (SHA-256, base-36 encoded)
//! 3. Copy each file to `{stem},{hash}.{ext}` under the output directory
//! 4. Rewrite references inside copied stylesheets and scripts
//! 5. Delete outputs that no longer belong to any source
//! 6. Publish the original → hashed mapping

pub mod collector;
pub mod config;
pub mod encoding;
pub mod filter;
pub mod hashing;
pub mod log;
pub mod mapping;
pub mod naming;
pub mod paths;
pub mod pipeline;
pub mod resource;
pub mod rewrite;

pub use collector::{discover_files, ResourceCollector};
pub use config::{CopyMode, PipelineConfig};
pub use encoding::{encode_base36, DigestEncoder};
pub use filter::{FilterDecision, ResourceFilter};
pub use hashing::{sha256_digest, sha256_file, ContentDigest};
pub use log::{ConsoleLogger, Importance, Logger, NullLogger, TracingLogger};
pub use mapping::{JsonMappingWriter, MappingEntry, MappingSink};
pub use pipeline::{FingerprintPipeline, PipelineError, RunReport};
pub use resource::{Resource, ResourceCollection};
pub use rewrite::{ReferenceRewriter, TextAssetPolicy};
