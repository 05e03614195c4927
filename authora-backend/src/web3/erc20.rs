//! ERC-20 call encoding and result decoding

use ethers::abi::{self, Token};
use ethers::types::{Address, U256};
use ethers::utils::id;

fn selector(signature: &str) -> [u8; 4] {
    id(signature)
}

pub fn balance_of_calldata(owner: Address) -> Vec<u8> {
    let mut data = selector("balanceOf(address)").to_vec();
    data.extend(abi::encode(&[Token::Address(owner)]));
    data
}

pub fn decimals_calldata() -> Vec<u8> {
    selector("decimals()").to_vec()
}

pub fn transfer_calldata(to: Address, amount: U256) -> Vec<u8> {
    let mut data = selector("transfer(address,uint256)").to_vec();
    data.extend(abi::encode(&[Token::Address(to), Token::Uint(amount)]));
    data
}

/// First 32-byte word of a call result as an unsigned integer
pub fn decode_uint(data: &[u8]) -> Result<U256, String> {
    if data.len() < 32 {
        return Err(format!("Expected a 32-byte word, got {} bytes", data.len()));
    }
    Ok(U256::from_big_endian(&data[..32]))
}
