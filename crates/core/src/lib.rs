//! branchwatch-core: branch registry, threshold policies and the
//! reconciliation engine.
//!
//! Everything in this crate is synchronous and free of I/O apart from the
//! registry loader. Source adapters (`branchwatch-ingest`) produce
//! [`BranchRecord`]s; [`reconcile()`] turns them into a
//! [`ClassificationResult`] against a [`ThresholdPolicy`] and the
//! [`BranchRegistry`].

pub mod branch;
pub mod clock;
pub mod policy;
pub mod reconcile;
pub mod registry;

pub use branch::{
    BranchId, BranchRecord, ConnectivityOutcome, ObservationKind, ObservedValue, SizeBytes,
};
pub use clock::{AmbiguityPolicy, BusinessClock, LocalizeError};
pub use policy::{format_elapsed, Comparator, Deviation, Limit, PolicyError, ThresholdPolicy};
pub use reconcile::{reconcile, AssessedRecord, ClassificationResult, Overdue, ReconcileError};
pub use registry::{
    BranchRegistry, BranchRegistryEntry, JsonRegistryLoader, RegistryError, RegistryLoader,
    SharedRegistry,
};
