//! Human-readable address strings.
//!
//! Pubkey and script-hash records encode as base58 P2PKH / P2SH strings via
//! the `bitcoin` crate. Types with no standard string form fall back to the
//! `Address` display form (`multisig #12`), which parses back as well.

use bitcoin::address::NetworkUnchecked;
use bitcoin::Network;

use crate::address::Address;
use crate::error::CoreError;
use crate::scripts::{AnyScript, ScriptAccess};

pub fn address_to_string(
    address: Address,
    scripts: &ScriptAccess,
    network: Network,
) -> Result<String, CoreError> {
    Ok(match address.resolve(scripts)? {
        AnyScript::Pubkey(data) => bitcoin::Address::p2pkh(data.pubkey_hash, network).to_string(),
        AnyScript::ScriptHash(data) => {
            bitcoin::Address::p2sh_from_hash(data.hash, network).to_string()
        }
        AnyScript::Multisig(_) | AnyScript::NullData(_) | AnyScript::Nonstandard(_) => {
            address.to_string()
        }
    })
}

/// Map an address string back to the handle of an indexed script. Returns
/// `None` for malformed strings, strings for another network, and hashes the
/// script registry has never seen.
pub fn address_from_string(text: &str, scripts: &ScriptAccess, network: Network) -> Option<Address> {
    let text = text.trim();
    if let Ok(parsed) = text.parse::<bitcoin::Address<NetworkUnchecked>>() {
        let checked = parsed.require_network(network).ok()?;
        if let Some(hash) = checked.pubkey_hash() {
            return scripts.find_pubkey_hash(&hash);
        }
        if let Some(hash) = checked.script_hash() {
            return scripts.find_script_hash(&hash);
        }
        return None;
    }

    let address: Address = text.parse().ok()?;
    (address.index < scripts.size(address.script_type)).then_some(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::*;

    #[test]
    fn p2pkh_and_p2sh_round_trip() {
        let mut scripts = ScriptAccess::new();
        let pk = scripts.add_pubkey(pubkey_hash(9), None).unwrap();
        let sh = scripts.add_script_hash(script_hash(9)).unwrap();

        for address in [pk, sh] {
            let text = address_to_string(address, &scripts, Network::Bitcoin).unwrap();
            assert_eq!(
                address_from_string(&text, &scripts, Network::Bitcoin),
                Some(address),
                "{text}"
            );
        }
        let pk_text = address_to_string(pk, &scripts, Network::Bitcoin).unwrap();
        assert!(pk_text.starts_with('1'), "{pk_text}");
    }

    #[test]
    fn wrong_network_and_unknown_hash_yield_none() {
        let mut scripts = ScriptAccess::new();
        let pk = scripts.add_pubkey(pubkey_hash(9), None).unwrap();
        let text = address_to_string(pk, &scripts, Network::Bitcoin).unwrap();
        assert_eq!(address_from_string(&text, &scripts, Network::Testnet), None);

        let other = ScriptAccess::new();
        assert_eq!(address_from_string(&text, &other, Network::Bitcoin), None);
        assert_eq!(address_from_string("not an address", &scripts, Network::Bitcoin), None);
    }

    #[test]
    fn multisig_uses_display_form() {
        let mut scripts = ScriptAccess::new();
        let pk = scripts.add_pubkey(pubkey_hash(1), None).unwrap();
        let ms = scripts.add_multisig(1, vec![pk]).unwrap();

        let text = address_to_string(ms, &scripts, Network::Regtest).unwrap();
        assert_eq!(text, "multisig #0");
        assert_eq!(address_from_string(&text, &scripts, Network::Regtest), Some(ms));
        assert_eq!(address_from_string("multisig #1", &scripts, Network::Regtest), None);
    }
}
