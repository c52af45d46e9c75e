//! Currency detection: ONNX adapter, model registry, cross-stage ensemble
//! and the two-stage orchestrator.
//!
//! | Stage | Model | Threshold |
//! |-------|-------|-----------|
//! | Binary | `binary` (note / coin) | 0.35 |
//! | Specific | `banknote` or `coin` | 0.45 |
//! | Final | best detection | 0.40 |

pub mod ensemble;
pub mod model;
pub mod object_detector;
pub mod orchestrator;
pub mod registry;

pub use ensemble::reconcile;
pub use model::CurrencyModel;
pub use object_detector::OnnxDetector;
pub use orchestrator::{CurrencyDetector, DetectOptions};
pub use registry::ModelRegistry;
