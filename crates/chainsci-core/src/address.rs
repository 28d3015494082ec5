//! The `Address` handle and nested-script visitation.
//!
//! An address is only a coordinate into `ScriptAccess`: the script type picks
//! the store and `index` picks the record. Two addresses of different types
//! may share an index.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scripts::{AnyScript, ScriptAccess};
use crate::types::ScriptType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub index: u32,
    pub script_type: ScriptType,
}

impl Address {
    pub fn new(index: u32, script_type: ScriptType) -> Self {
        Self { index, script_type }
    }

    /// `OP_RETURN` outputs can never be spent; every other type can.
    pub fn is_spendable(&self) -> bool {
        self.script_type != ScriptType::NullData
    }

    pub fn resolve<'a>(&self, scripts: &'a ScriptAccess) -> Result<AnyScript<'a>, CoreError> {
        scripts.resolve(*self)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.script_type, self.index)
    }
}

/// Parses the `Display` form, e.g. `multisig #12`.
impl std::str::FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ty, index) = s
            .split_once(" #")
            .ok_or_else(|| format!("expected `<type> #<index>`, got `{s}`"))?;
        let index = index
            .parse::<u32>()
            .map_err(|e| format!("invalid address index `{index}`: {e}"))?;
        Ok(Self::new(index, ty.parse()?))
    }
}

// ==============================================================================
// Visitation
// ==============================================================================

/// Walk `address` and every address it transitively wraps, depth first.
///
/// Every address reached is resolved before `visit_fn` sees it, so an address
/// past the end of its store fails the walk with `OutOfRange`. Returning
/// `false` prunes the walk below that address (siblings are still visited).
/// `ScriptAccess` refuses wrapping cycles, so the walk is finite.
pub fn visit<F>(address: Address, scripts: &ScriptAccess, mut visit_fn: F) -> Result<(), CoreError>
where
    F: FnMut(Address) -> bool,
{
    try_visit(address, scripts, |a| Ok(visit_fn(a)))
}

/// Fallible form of [`visit`]: an error from `visit_fn` aborts the walk.
pub fn try_visit<F>(address: Address, scripts: &ScriptAccess, mut visit_fn: F) -> Result<(), CoreError>
where
    F: FnMut(Address) -> Result<bool, CoreError>,
{
    let mut stack = vec![address];
    while let Some(current) = stack.pop() {
        let script = current.resolve(scripts)?;
        if !visit_fn(current)? || !current.script_type.is_wrapper() {
            continue;
        }
        // Reverse so children are visited in declaration order.
        stack.extend(script.nested_addresses().iter().rev().copied());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn spendability_depends_only_on_type() {
        for ty in ScriptType::ALL {
            let address = Address::new(0, ty);
            assert_eq!(address.is_spendable(), ty != ScriptType::NullData);
        }
    }

    #[test]
    fn same_index_different_type_are_distinct() {
        let a = Address::new(3, ScriptType::Pubkey);
        let b = Address::new(3, ScriptType::ScriptHash);
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "pubkey #3");
        assert_eq!("scripthash #3".parse::<Address>(), Ok(b));
        assert!("pubkey 3".parse::<Address>().is_err());
        assert!("bogus #3".parse::<Address>().is_err());
    }

    #[test]
    fn visit_descends_into_revealed_script_hash_and_multisig() {
        let mut scripts = ScriptAccess::new();
        let k1 = scripts.add_pubkey(pubkey_hash(1), None).unwrap();
        let k2 = scripts.add_pubkey(pubkey_hash(2), None).unwrap();
        let ms = scripts.add_multisig(2, vec![k1, k2]).unwrap();
        let p2sh = scripts.add_script_hash(script_hash(1)).unwrap();
        scripts.reveal(p2sh, 4, ms).unwrap();

        let mut seen = Vec::new();
        visit(p2sh, &scripts, |a| {
            seen.push(a);
            true
        })
        .unwrap();
        assert_eq!(seen, vec![p2sh, ms, k1, k2]);
    }

    #[test]
    fn visit_stops_when_callback_declines() {
        let mut scripts = ScriptAccess::new();
        let k1 = scripts.add_pubkey(pubkey_hash(1), None).unwrap();
        let p2sh = scripts.add_script_hash(script_hash(1)).unwrap();
        scripts.reveal(p2sh, 4, k1).unwrap();

        let mut seen = Vec::new();
        visit(p2sh, &scripts, |a| {
            seen.push(a);
            false
        })
        .unwrap();
        assert_eq!(seen, vec![p2sh]);
    }

    #[test]
    fn unrevealed_script_hash_is_a_leaf() {
        let mut scripts = ScriptAccess::new();
        let p2sh = scripts.add_script_hash(script_hash(1)).unwrap();

        let mut count = 0;
        visit(p2sh, &scripts, |_| {
            count += 1;
            true
        })
        .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn visit_resolves_leaf_addresses_too() {
        let mut scripts = ScriptAccess::new();
        scripts.add_pubkey(pubkey_hash(1), None).unwrap();

        let mut seen = Vec::new();
        let err = visit(Address::new(42, ScriptType::Pubkey), &scripts, |a| {
            seen.push(a);
            true
        })
        .unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { index: 42, len: 1, .. }));
        assert!(seen.is_empty());
    }

    #[test]
    fn visit_reports_out_of_range_address() {
        let scripts = ScriptAccess::new();
        let err = visit(Address::new(0, ScriptType::Multisig), &scripts, |_| true).unwrap_err();
        assert!(matches!(err, CoreError::OutOfRange { .. }));
    }
}
