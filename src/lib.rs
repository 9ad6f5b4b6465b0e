//! Write batches for Cloud Firestore.
//!
//! A [`WriteBatch`](firestore::WriteBatch) collects `create`, `set`,
//! `update` and `delete` operations against documents of one database,
//! validates each one as it is appended, and commits them atomically over
//! the Firestore REST API.
//!
//! ```no_run
//! use std::collections::BTreeMap;
//!
//! use firestore_write_pipeline::firestore::{Firestore, FirestoreSettings, FirestoreValue};
//!
//! # async fn run() -> firestore_write_pipeline::firestore::FirestoreResult<()> {
//! let firestore = Firestore::with_http_transport(FirestoreSettings::from_env("my-project")?)?;
//! let city = firestore.doc("cities/sf")?;
//!
//! let mut data = BTreeMap::new();
//! data.insert("name".to_string(), FirestoreValue::from_string("San Francisco"));
//! data.insert("updated".to_string(), FirestoreValue::server_timestamp());
//!
//! let mut batch = firestore.batch();
//! batch.set(&city, data, None)?;
//! let results = batch.commit().await?;
//! println!("written at {}", results[0].write_time().to_rfc3339());
//! # Ok(())
//! # }
//! ```

pub mod firestore;
pub mod logger;
pub mod platform;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
