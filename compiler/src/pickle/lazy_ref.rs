//! Lazy infos pointing back into a pickle

use super::error::DecodeResult;
use super::unpickler::Unpickler;
use crate::symtab::{LazyType, RunId, SymbolId, SymbolResult, SymbolTable};
use std::rc::Rc;

/// The info of an unpickled symbol: type entry `index`, plus the entry of
/// the symbol it aliases when the pickle carries one
pub(crate) struct LazyTypeRef {
    unpickler: Rc<Unpickler>,
    index: usize,
    alias: Option<usize>,
    defined_in_run: RunId,
}

impl LazyTypeRef {
    pub(crate) fn new(unpickler: Rc<Unpickler>, index: usize, alias: Option<usize>) -> Self {
        let defined_in_run = unpickler.run_id;
        Self {
            unpickler,
            index,
            alias,
            defined_in_run,
        }
    }

    fn read(&self, table: &mut SymbolTable, sym: SymbolId) -> DecodeResult<()> {
        let tp = self.unpickler.type_at(table, self.index)?;
        let tp = if table.run_id() != self.defined_in_run {
            table.adapt_to_new_run(tp)
        } else {
            tp
        };
        table.set_info(sym, tp);
        if let Some(alias) = self.alias {
            let target = self.unpickler.symbol_at(table, alias)?;
            table.set_referenced(sym, target)?;
        }
        Ok(())
    }
}

impl LazyType for LazyTypeRef {
    fn complete(&self, table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<()> {
        let saved = self.unpickler.completing.replace(sym);
        let result = self.read(table, sym);
        self.unpickler.completing.set(saved);
        result.map_err(|err| {
            let err = err.into_symbol_error(&self.unpickler.file);
            if !err.is_missing_requirement() {
                log::warn!("completing {} failed: {}", table.show(sym), err);
            }
            err
        })
    }

    fn describe(&self) -> String {
        format!("<lazy type ref {} of {}>", self.index, self.unpickler.file)
    }
}
