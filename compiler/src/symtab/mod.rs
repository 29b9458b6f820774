pub mod id_types;
pub mod names;
pub mod flags;
pub mod phase;
pub mod types;
pub mod annotations;
pub mod trees;
pub mod scopes;
pub mod errors;
pub mod symbols;
pub mod history;
pub mod completion;
pub mod table;
pub mod owners;
pub mod missing;
pub mod typeops;
pub mod hierarchy;

pub use annotations::*;
pub use completion::{FixedLazyType, LazyType, LockToken};
pub use errors::*;
pub use flags::*;
pub use history::{Info, InfoTransform, InfoTransformer, InfoTransformers, TypeHistory};
pub use id_types::*;
pub use missing::{AdviceEntry, MissingHook, ModuleAdvice};
pub use names::*;
pub use phase::*;
pub use scopes::*;
pub use symbols::*;
pub use table::{Settings, SymbolTable};
pub use trees::*;
pub use types::*;
