//! Serializable views of unpickled roots, used by `sigtab dump`

use crate::symtab::{SymbolId, SymbolResult, SymbolTable};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MemberDump {
    pub name: String,
    pub kind: String,
    pub flags: Vec<String>,
    pub info: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerDump {
    pub name: String,
    pub kind: String,
    pub flags: Vec<String>,
    pub info: String,
    pub members: Vec<MemberDump>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignatureDump {
    pub file: String,
    pub class: OwnerDump,
    pub module: OwnerDump,
    /// Size of the pickle written back from the loaded roots, when that
    /// succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repickled_bytes: Option<usize>,
}

impl SignatureDump {
    /// Force the infos of both roots and their members and render them
    pub fn collect(
        table: &mut SymbolTable,
        file: &str,
        class_root: SymbolId,
        module_root: SymbolId,
    ) -> SymbolResult<Self> {
        let class = dump_owner(table, class_root)?;
        let module_class = table.module_class(module_root);
        let module = dump_owner(table, module_class)?;
        Ok(Self {
            file: file.to_string(),
            class,
            module,
            repickled_bytes: None,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("{}\n", self.file);
        for owner in [&self.class, &self.module] {
            out.push_str(&format!("{} {} [{}]\n", owner.kind, owner.name, owner.flags.join(" ")));
            out.push_str(&format!("  info: {}\n", owner.info));
            for m in &owner.members {
                out.push_str(&format!("  {} {}: {}", m.kind, m.name, m.info));
                if !m.flags.is_empty() {
                    out.push_str(&format!("  [{}]", m.flags.join(" ")));
                }
                out.push('\n');
            }
        }
        if let Some(n) = self.repickled_bytes {
            out.push_str(&format!("repickled: {} bytes\n", n));
        }
        out
    }
}

fn dump_owner(table: &mut SymbolTable, owner: SymbolId) -> SymbolResult<OwnerDump> {
    let info = table.info(owner)?;
    let mut members = Vec::new();
    for sym in table.decls(owner)? {
        members.push(dump_member(table, sym)?);
    }
    Ok(OwnerDump {
        name: table.full_name(owner),
        kind: table.kind_string(owner).to_string(),
        flags: flag_names(table, owner),
        info: table.show_type(info),
        members,
    })
}

fn dump_member(table: &mut SymbolTable, sym: SymbolId) -> SymbolResult<MemberDump> {
    let info = table.info(sym)?;
    Ok(MemberDump {
        name: table.decoded_name(sym).to_string(),
        kind: table.kind_string(sym).to_string(),
        flags: flag_names(table, sym),
        info: table.show_type(info),
    })
}

fn flag_names(table: &SymbolTable, sym: SymbolId) -> Vec<String> {
    table.flags(sym).names().into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pickle::{enter_roots, pickle, unpickle};
    use crate::symtab::{Flags, ScopeKind, TypeTable};
    use diagnostics::Position;

    #[test]
    fn test_dump_after_round_trip() {
        let mut source = SymbolTable::new();
        let (class, module) = enter_roots(&mut source, "demo.Box").unwrap();
        let decls = source.scopes.create(ScopeKind::Class, class);
        let info = source.types.class_info(Vec::new(), decls, class);
        source.set_info(class, info);
        let size = source.names.term_name("size");
        let method = source.new_method_symbol(class, size, Position::NONE, Flags::METHOD);
        let int_class = source.types.type_ref(TypeTable::NO_PREFIX, class, []);
        let nullary = source.types.nullary_method_type(int_class);
        source.set_info(method, nullary);
        source.scopes.get_mut(decls).enter(size, method);

        let module_class = source.module_class(module);
        let mdecls = source.scopes.create(ScopeKind::Class, module_class);
        let minfo = source.types.class_info(Vec::new(), mdecls, module_class);
        source.set_info(module_class, minfo);
        let mtpe = source.types.type_ref(TypeTable::NO_PREFIX, module_class, []);
        source.set_info(module, mtpe);
        let bytes = pickle(&mut source, class, module).unwrap();

        let mut target = SymbolTable::new();
        let (class, module) = enter_roots(&mut target, "demo.Box").unwrap();
        unpickle(&mut target, &bytes, 0, class, module, "Box.sig").unwrap();
        let dump = SignatureDump::collect(&mut target, "Box.sig", class, module).unwrap();

        assert_eq!(dump.class.name, "demo.Box");
        assert_eq!(dump.class.members.len(), 1);
        assert_eq!(dump.class.members[0].name, "size");
        assert_eq!(dump.class.members[0].kind, "method");
        assert_eq!(dump.class.members[0].info, "=> demo.Box");
        assert!(dump.module.members.is_empty());

        let json = dump.to_json().unwrap();
        assert!(json.contains("\"size\""));
        assert!(!json.contains("repickled_bytes"));
        assert!(dump.render_text().contains("method size: => demo.Box"));
    }
}
