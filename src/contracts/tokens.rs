use ethers::abi::token::{LenientTokenizer, Tokenizer};
use ethers::abi::{Param, ParamType, Token};
use ethers::types::{Address, I256, U256};
use ethers::utils::{hex, to_checksum};

/// Convert textual arguments into ABI tokens for the given parameters.
///
/// Integers accept decimal or `0x` hex, arrays use `[a,b]` and strings are
/// taken verbatim.
pub fn tokenize_args(params: &[Param], args: &[String]) -> Result<Vec<Token>, String> {
    if params.len() != args.len() {
        return Err(format!(
            "expected {} argument(s), got {}",
            params.len(),
            args.len()
        ));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            tokenize(&param.kind, arg).map_err(|e| {
                let name = if param.name.is_empty() { "_" } else { param.name.as_str() };
                format!("argument {} ({}): {}", name, param.kind, e)
            })
        })
        .collect()
}

fn tokenize(kind: &ParamType, value: &str) -> Result<Token, String> {
    match kind {
        // Short hex for fixed bytes is left-aligned and zero padded, as
        // Solidity does for `bytesN` literals.
        ParamType::FixedBytes(size) => {
            let bytes = hex::decode(value.trim_start_matches("0x")).map_err(|e| e.to_string())?;
            if bytes.len() > *size {
                return Err(format!("{} bytes do not fit in bytes{}", bytes.len(), size));
            }
            let mut padded = bytes;
            padded.resize(*size, 0);
            Ok(Token::FixedBytes(padded))
        }
        ParamType::Address => crate::contracts::parse_address(value)
            .map(Token::Address)
            .map_err(|e| e.to_string()),
        _ => LenientTokenizer::tokenize(kind, value).map_err(|e| e.to_string()),
    }
}

/// Render decoded return values the way an operator wants to read them.
pub fn format_tokens(tokens: &[Token]) -> String {
    match tokens {
        [] => "()".to_string(),
        [single] => format_token(single),
        many => format!("({})", join(many)),
    }
}

pub fn format_token(token: &Token) -> String {
    match token {
        Token::Address(address) => format_address(*address),
        Token::FixedBytes(bytes) | Token::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        Token::Int(value) => I256::from_raw(*value).to_string(),
        Token::Uint(value) => value.to_string(),
        Token::Bool(value) => value.to_string(),
        Token::String(value) => format!("{:?}", value),
        Token::FixedArray(items) | Token::Array(items) => format!("[{}]", join(items)),
        Token::Tuple(items) => format!("({})", join(items)),
    }
}

pub fn format_address(address: Address) -> String {
    to_checksum(&address, None)
}

fn join(tokens: &[Token]) -> String {
    tokens.iter().map(format_token).collect::<Vec<_>>().join(", ")
}

/// Numeric result of a single-value call, e.g. a counter getter.
pub fn as_uint(tokens: &[Token]) -> Option<U256> {
    match tokens {
        [Token::Uint(value)] => Some(*value),
        _ => None,
    }
}
