//! # droidlens-core
//!
//! Core library for inspecting the UI hierarchy of a connected Android
//! device over adb.
//!
//! This crate captures a screenshot together with a structured
//! accessibility tree, resolves screen coordinates to tree nodes, and
//! generates AutoJs6 script fragments (selectors and actions) from a
//! selected node.
//!
//! ## Modules
//!
//! - [`adb`] - Subprocess transport around the `adb` executable
//! - [`session`] - Device presence, ABI detection, helper-binary staging
//! - [`capture`] - Snapshot pipelines (native `uiautomator dump` and scripted AutoJs extraction)
//! - [`node`] - The canonical UI node tree and bounds grammar
//! - [`uixml`] - Decoder for the uiautomator XML dump format
//! - [`autojs`] - Decoder for the AutoJs JSON tree format
//! - [`inspect`] - Point-to-node hit testing and node path resolution
//! - [`codegen`] - AutoJs6 selector and action-script generation
//! - [`config`] - Persistent user configuration
//!
//! ## External Dependencies
//!
//! The `adb` executable from Android platform-tools must be on `PATH`
//! (or its location recorded in the config). The scripted capture
//! strategy additionally requires AutoJs6 installed on the device with
//! accessibility enabled.
//!
//! ## Example
//!
//! ```no_run
//! use droidlens_core::capture::CaptureConfig;
//! use droidlens_core::inspect::find_node_at;
//! use droidlens_core::node::parse_tree_file;
//! use droidlens_core::session::DeviceSession;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = DeviceSession::with_defaults();
//! let snapshot = session.capture_snapshot(&CaptureConfig::default()).await?;
//!
//! let tree = parse_tree_file(&snapshot.tree_source, snapshot.tree_format())?;
//! if let Some(node) = find_node_at(&tree, 540, 960) {
//!     println!("{}", node.display_label());
//! }
//! # Ok(())
//! # }
//! ```

pub mod adb;
pub mod autojs;
pub mod capture;
pub mod codegen;
pub mod config;
pub mod inspect;
pub mod node;
pub mod session;
pub mod uixml;
