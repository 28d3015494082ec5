//! Script record storage and resolution.
//!
//! Every decoded output script lives in exactly one [`ScriptStore`], picked by
//! its [`ScriptType`](crate::types::ScriptType). [`ScriptAccess`] bundles one
//! store per type and resolves an [`Address`](crate::address::Address) into an
//! [`AnyScript`] view over the concrete record.

mod access;
mod records;
mod store;

pub use access::ScriptAccess;
pub use records::{
    AnyScript, MultisigData, NonstandardData, NullData, PubkeyData, ScriptHashData, ScriptRecord,
};
pub use store::ScriptStore;
