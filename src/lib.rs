//! keepgraph - Reachability analysis for Android bytecode optimizers
//!
//! Decides which classes, methods and fields of a whole program must survive
//! optimization, and records why each one is kept.
//!
//! # Architecture
//!
//! The computation consists of:
//! 1. **Program loading** - Build the entity graph from a JSON dump
//! 2. **Resource discovery** - Find the manifest, layouts and native libraries of an unpacked apk
//! 3. **Root oracles** - Mark entities kept by annotations, keep lists, the manifest,
//!    layouts, native libraries, reflection and serialization
//! 4. **Recomputation** - Refresh code-derived and layout-derived marks between passes
//! 5. **Reporting** - Explain why each entity is kept
//!
//! ```no_run
//! use keepgraph::{Config, Program, ReachabilityEngine};
//!
//! # fn main() -> miette::Result<()> {
//! let program = Program::from_json_file("program.json".as_ref())?;
//! let engine = ReachabilityEngine::new(&program, Config::default());
//! engine.init_reachable_classes().map_err(|e| miette::miette!("{e}"))?;
//!
//! for cls in program.classes().filter(|c| c.rstate.can_delete()) {
//!     println!("removable: {}", cls);
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod discovery;
pub mod graph;
pub mod parser;
pub mod report;
pub mod resources;
pub mod watch;

pub use analysis::{ReachabilityEngine, ReachabilityError};
pub use config::Config;
pub use discovery::FileFinder;
pub use graph::{KeepReason, KeepReasonKind, Program, ProgramBuilder, ReachabilityState};
pub use report::{KeepReport, ReportFormat, Reporter};
pub use resources::{ApkDirectory, InMemoryResources, ResourceError, ResourceSource};
