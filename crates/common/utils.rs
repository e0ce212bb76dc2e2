use crate::constants::CREATE2_PREFIX;
use alloy_rlp::{Encodable, Header};
use ethereum_types::{Address, H256};
use sha3::{Digest, Keccak256};

pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256(Keccak256::digest(data.as_ref()).into())
}

/// Address of a contract deployed with CREATE: `keccak256(rlp([sender, nonce]))[12..]`.
pub fn calculate_create_address(sender: Address, nonce: u64) -> Address {
    let mut payload = Vec::with_capacity(32);
    sender.as_bytes().encode(&mut payload);
    nonce.encode(&mut payload);

    let mut encoded = Vec::with_capacity(payload.len() + 1);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut encoded);
    encoded.extend_from_slice(&payload);

    Address::from_slice(&keccak(encoded).as_bytes()[12..])
}

/// Address of a contract deployed with CREATE2:
/// `keccak256(0xff ++ sender ++ salt ++ keccak256(init_code))[12..]`.
pub fn calculate_create2_address(sender: Address, init_code: &[u8], salt: H256) -> Address {
    let init_code_hash = keccak(init_code);
    let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
    preimage.push(CREATE2_PREFIX);
    preimage.extend_from_slice(sender.as_bytes());
    preimage.extend_from_slice(salt.as_bytes());
    preimage.extend_from_slice(init_code_hash.as_bytes());

    Address::from_slice(&keccak(preimage).as_bytes()[12..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EMPTY_KECCACK_HASH;
    use hex_literal::hex;

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(keccak(b""), EMPTY_KECCACK_HASH);
    }

    #[test]
    fn create_address_vectors() {
        let sender = Address::from(hex!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0"));
        assert_eq!(
            calculate_create_address(sender, 0),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            calculate_create_address(sender, 1),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
    }

    // https://eips.ethereum.org/EIPS/eip-1014 example 0
    #[test]
    fn create2_address_vector() {
        let sender = Address::zero();
        let salt = H256::zero();
        assert_eq!(
            calculate_create2_address(sender, &[0x00], salt),
            Address::from(hex!("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38"))
        );
    }

    #[test]
    fn create2_address_vector_with_salt() {
        let sender = Address::from(hex!("deadbeef00000000000000000000000000000000"));
        let salt = H256(hex!(
            "000000000000000000000000feed000000000000000000000000000000000000"
        ));
        assert_eq!(
            calculate_create2_address(sender, &[0x00], salt),
            Address::from(hex!("d04116cdd17bebe565eb2422f2497e06cc1c9833"))
        );
    }
}
