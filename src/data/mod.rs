//! Data layer: records, raw export parsing, scatter removal, the cache
//! artifact, ingestion and range cutting.
//!
//! Architecture:
//! ```text
//!   *.csv exports ──┐      rename.json
//!                   ▼          │
//!             ┌──────────┐     │
//!             │  loader   │  header → samples → EEM per sample
//!             └──────────┘     │
//!                   │          ▼
//!             ┌──────────┐ ┌───────┐
//!             │ scatter   │ │ alias │   (corrected mode only)
//!             └──────────┘ └───────┘
//!                   │          │
//!                   ▼          ▼
//!             ┌────────────────────┐        ┌────────────┐
//!             │      ingest        │ ─────▶ │   cache    │  parquet artifact
//!             └────────────────────┘        └────────────┘
//!                   │
//!                   ▼
//!             ┌────────────┐   ┌──────────┐
//!             │  filter    │──▶│ range_cut │  selection → window → views
//!             └────────────┘   └──────────┘
//! ```

pub mod alias;
pub mod cache;
pub mod filter;
pub mod ingest;
pub mod interpolate;
pub mod loader;
pub mod model;
pub mod range_cut;
pub mod scatter;
