//! Client code for swcache.
//!
//! This crate provides the network fetch pipeline and the offline worker
//! that routes intercepted requests between the network and the cache
//! stores. The server drives it; tests drive it with a scripted network.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use worker::{
    ActivateReport, Classifier, Decision, Event, EventOutcome, Exclusion, FetchOutcome, InstallReport, Message,
    MessageReport, OfflineWorker, Registration, ResponseSource, Strategy, UpdateCheck, WorkerConfig, WorkerState,
};
