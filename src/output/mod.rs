//! Output formatters for scan results.
//!
//! - [`TextOutput`] for people at a terminal
//! - [`JsonOutput`] for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use hashmatch::duplicates::DigestFinder;
//! use hashmatch::error::ExitCode;
//! use hashmatch::output::JsonOutput;
//! use std::path::PathBuf;
//!
//! let finder = DigestFinder::with_defaults();
//! let result = finder.find(vec![PathBuf::from("a.bin")]).unwrap();
//!
//! let output = JsonOutput::new(&result, ExitCode::from_result(&result));
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
