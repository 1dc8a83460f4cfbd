//! # hn-remote
//!
//! Read access to the Hacker News Firebase tree.
//!
//! The [`RemoteSource`] trait is the only way the sync engine talks to
//! upstream: one-shot reads of a path and change subscriptions on a path.
//! [`FirebaseClient`] implements it over HTTP; [`MockRemote`] implements it
//! in memory for tests.

pub mod error;
pub mod firebase;
pub mod mock;
pub mod path;
pub mod source;

pub use error::RemoteError;
pub use firebase::{FirebaseClient, FirebaseConfig};
pub use mock::MockRemote;
pub use path::RemotePath;
pub use source::{RemoteEvent, RemoteSource, Subscription};
