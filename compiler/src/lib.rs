//! Symbol table and signature pickles for a Scala-style compiler front end
//!
//! `symtab` holds symbols, types, scopes and the lazy completion engine.
//! `pickle` reads and writes the signature format that stores a class and
//! its companion module.

pub mod config;
pub mod dump;
pub mod error_codes;
pub mod logging;
pub mod pickle;
pub mod symtab;
