//! Response body materialization.
//!
//! A body is drained exactly once into a [`ByteSource`]: small bodies with a
//! declared length stay in memory, everything else is spooled to a uniquely
//! named temp file that is deleted when the last handle drops.
//!
//! # Example
//!
//! ```no_run
//! use response_mapper::body::{BodyStream, materialize};
//! use response_mapper::MapperConfig;
//!
//! # async fn example(body: &mut dyn BodyStream) -> Result<(), Box<dyn std::error::Error>> {
//! let source = materialize(None, body, &MapperConfig::default()).await?;
//! let bytes = source.read_all().await?;
//! println!("{} bytes at {:?}", bytes.len(), source.spool_path());
//! # Ok(())
//! # }
//! ```

mod materializer;
mod registry;
mod source;

pub use materializer::{BodyStream, materialize};
pub use registry::{is_registered, purge_spooled_files};
pub use source::{ByteSource, SpooledFile};
