// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the other layers:
//
//   settings.rs    — YAML config file → typed Settings,
//                    validated once after CLI overrides
//
//   checkpoint.rs  — The {model, optimizer, best_acc, epoch}
//                    record and its save/load via Burn's
//                    named MessagePack recorder
//
//   metrics.rs     — BatchMeter: running last/mean of the
//                    per-batch loss
//
//   logger.rs      — TracingLogger: durable tracing lines
//                    plus an indicatif bar per epoch

/// YAML settings and eager validation
pub mod settings;

/// Checkpoint record saving and loading
pub mod checkpoint;

/// Running loss tracker
pub mod metrics;

/// Production TrainingLogger
pub mod logger;
