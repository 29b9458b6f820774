//! Signature pickles: reading and writing the symbols of a class and its
//! companion module
//!
//! `unpickle` enters every symbol definition of a pickle into the symbol
//! table at once and attaches lazy infos that decode their types on first
//! use. `pickle` writes the reverse direction.

pub mod buffer;
mod decode;
pub mod error;
pub mod format;
mod lazy_ref;
pub mod pickler;
mod unpickler;

pub use buffer::PickleBuffer;
pub use error::{DecodeError, PickleError};
pub use pickler::{pickle, Pickler};

use crate::error_codes;
use crate::symtab::{Flags, SymbolError, SymbolId, SymbolTable};
use diagnostics::symtab::SymtabDiagnostics;
use diagnostics::Position;
use unpickler::Unpickler;

/// Read the pickle in `bytes[offset..]` into `class_root` and `module_root`.
///
/// Both roots must already exist: `class_root` a class, `module_root` a
/// module. Their flags, infos and members come from the pickle; all other
/// definitions are created under their pickled owners.
///
/// Failures are reported and returned as one `PickleError::Signature`
/// naming `filename`, except for uses of missing dependencies, which come
/// back as `PickleError::Missing`.
pub fn unpickle(
    table: &mut SymbolTable,
    bytes: &[u8],
    offset: usize,
    class_root: SymbolId,
    module_root: SymbolId,
    filename: &str,
) -> Result<(), PickleError> {
    if !table.is_class(class_root) {
        return Err(PickleError::Precondition(format!("class root {} is not a class", class_root)));
    }
    if !table.is_module(module_root) {
        return Err(PickleError::Precondition(format!("module root {} is not a module", module_root)));
    }
    if offset > bytes.len() {
        return Err(PickleError::Precondition(format!(
            "offset {} is past the end of {} bytes",
            offset,
            bytes.len()
        )));
    }

    let span = tracing::debug_span!("unpickle", file = filename);
    let _entered = span.enter();
    log::debug!(
        "unpickling {} ({} bytes) into {}",
        filename,
        bytes.len() - offset,
        table.full_name(class_root)
    );

    let result = Unpickler::new(table, bytes, offset, class_root, module_root, filename).and_then(|unpickler| {
        unpickler.run(table)?;
        log::debug!("{}: read {} entries", filename, unpickler.entry_count());
        Ok(())
    });

    result.map_err(|err| {
        let err = PickleError::from_decode(err, filename);
        if let PickleError::Signature { code, message, .. } = &err {
            log::warn!("error reading Scala signature of {}: {}", filename, message);
            let code = error_codes::format_error_code(*code);
            table.report(SymtabDiagnostics::bad_signature(filename, &code, message));
        }
        err
    })
}

/// Enter a fresh class and companion module for the dotted `full_name`,
/// creating missing packages on the way. A name without dots lands in the
/// empty package. Returns `(class_root, module_root)`.
pub fn enter_roots(table: &mut SymbolTable, full_name: &str) -> Result<(SymbolId, SymbolId), PickleError> {
    let bad_name = || PickleError::Precondition(format!("bad root name `{}`", full_name));
    let mut segments: Vec<&str> = full_name.split('.').collect();
    let simple = segments.pop().filter(|s| !s.is_empty()).ok_or_else(bad_name)?;

    let mut owner = if segments.is_empty() {
        table.empty_package_class()
    } else {
        table.root_class()
    };
    for segment in segments {
        if segment.is_empty() {
            return Err(bad_name());
        }
        let name = table.names.term_name(segment);
        let existing = table.decl(owner, name).map_err(|err| match err {
            SymbolError::MissingRequirement { .. } => PickleError::Missing(err),
            other => PickleError::Symbol(other),
        })?;
        let package = if existing.exists() && table.is_package(existing) {
            existing
        } else {
            table.new_package(owner, name)
        };
        owner = table.module_class(package);
    }

    let class_name = table.names.type_name(simple);
    let class = table.new_class_symbol(owner, class_name, Position::NONE, Flags::NONE);
    let module_class = table.new_module_class(owner, class_name, Position::NONE, Flags::NONE);
    let module = table.new_linked_module(owner, module_class, Flags::NONE);
    table.enter_in_owner_scope(owner, class);
    table.enter_in_owner_scope(owner, module);
    Ok((class, module))
}
