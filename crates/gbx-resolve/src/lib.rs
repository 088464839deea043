//! External node resolution for GBX files.
//!
//! A GBX file's reference table points at other GBX files. This crate loads
//! those files recursively and moves their nodes into one globally indexed
//! pool. It also checks that a resolved graph survives an encode/decode round
//! trip.
//!
//! # Example
//!
//! ```no_run
//! use gbx_resolve::{build_and_check, LoadOptions, Loader};
//!
//! let mut file = Loader::new(LoadOptions::default()).load("Items/Cactus.Item.Gbx")?;
//! println!("{} nodes after resolution", file.nb_nodes());
//!
//! file.merge_external_nodes();
//! let report = build_and_check(&file)?;
//! std::fs::write("Cactus.merged.Item.Gbx", &report.bytes)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod folders;
mod loader;
mod material;
mod verify;

pub use error::{Error, Result};
pub use folders::resolve_folders;
pub use loader::{load, LoadOptions, Loader};
pub use material::{build_material, material_base_name, MaterialVariant, MATERIAL_SUFFIX};
pub use verify::{build_and_check, normalize_compression, CheckReport, UnreferencedNode};
