//! Function, event and custom-error descriptors.

use nftvote_crypto::{event_topic, function_selector};
use nftvote_types::{Address, Log};

use crate::codec::{decode, encode};
use crate::{AbiError, ParamType, Token};

fn signature(name: &str, params: &[ParamType]) -> String {
    let joined: Vec<String> = params.iter().map(ToString::to_string).collect();
    format!("{name}({})", joined.join(","))
}

fn check_args(params: &[ParamType], args: &[Token]) -> Result<(), AbiError> {
    if params.len() != args.len() {
        return Err(AbiError::ArgumentCount {
            expected: params.len(),
            actual: args.len(),
        });
    }
    for (ty, arg) in params.iter().zip(args) {
        if !ty.matches(arg) {
            return Err(AbiError::TypeMismatch {
                expected: ty.to_string(),
            });
        }
    }
    Ok(())
}

/// A contract function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: &'static str,
    pub inputs: Vec<ParamType>,
    pub outputs: Vec<ParamType>,
}

impl Function {
    pub fn new(name: &'static str, inputs: Vec<ParamType>, outputs: Vec<ParamType>) -> Self {
        Self { name, inputs, outputs }
    }

    pub fn signature(&self) -> String {
        signature(self.name, &self.inputs)
    }

    pub fn selector(&self) -> [u8; 4] {
        function_selector(&self.signature())
    }

    /// Calldata: selector followed by the encoded arguments.
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        check_args(&self.inputs, args)?;
        let mut data = self.selector().to_vec();
        data.extend(encode(args));
        Ok(data)
    }

    /// Decode calldata produced by [`Function::encode_call`].
    pub fn decode_call(&self, calldata: &[u8]) -> Result<Vec<Token>, AbiError> {
        let selector = self.selector();
        match calldata.get(..4) {
            Some(actual) if actual == &selector[..] => decode(&self.inputs, &calldata[4..]),
            actual => Err(AbiError::SelectorMismatch {
                expected: hex::encode(selector),
                actual: hex::encode(actual.unwrap_or_default()),
            }),
        }
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        decode(&self.outputs, data)
    }

    pub fn encode_output(&self, values: &[Token]) -> Result<Vec<u8>, AbiError> {
        check_args(&self.outputs, values)?;
        Ok(encode(values))
    }

    /// Whether `calldata` targets this function.
    pub fn is_call(&self, calldata: &[u8]) -> bool {
        calldata.get(..4) == Some(&self.selector()[..])
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventParam {
    pub kind: ParamType,
    pub indexed: bool,
}

impl EventParam {
    pub fn indexed(kind: ParamType) -> Self {
        Self { kind, indexed: true }
    }

    pub fn data(kind: ParamType) -> Self {
        Self { kind, indexed: false }
    }
}

/// A non-anonymous event.
///
/// Indexed parameters live in topics 1.., the rest are ABI-encoded in the
/// log data. An indexed dynamic value is only present as its hash and decodes
/// to a `bytes32` token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: &'static str,
    pub params: Vec<EventParam>,
}

impl Event {
    pub fn new(name: &'static str, params: Vec<EventParam>) -> Self {
        Self { name, params }
    }

    pub fn signature(&self) -> String {
        let kinds: Vec<ParamType> = self.params.iter().map(|p| p.kind.clone()).collect();
        signature(self.name, &kinds)
    }

    pub fn topic(&self) -> [u8; 32] {
        event_topic(&self.signature())
    }

    /// Decode a log into parameter values in declaration order.
    pub fn decode_log(&self, log: &Log) -> Result<Vec<Token>, AbiError> {
        let indexed_count = self.params.iter().filter(|p| p.indexed).count();
        if log.topics.first() != Some(&self.topic()) || log.topics.len() != indexed_count + 1 {
            return Err(AbiError::TopicMismatch(self.name.to_string()));
        }

        let data_types: Vec<ParamType> = self
            .params
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind.clone())
            .collect();
        let mut data_values = decode(&data_types, &log.data)?.into_iter();
        let mut topics = log.topics[1..].iter();

        let mut out = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let token = if param.indexed {
                let topic = topics
                    .next()
                    .ok_or_else(|| AbiError::TopicMismatch(self.name.to_string()))?;
                if param.kind.is_dynamic() {
                    Token::word(*topic)
                } else {
                    decode(std::slice::from_ref(&param.kind), topic)?
                        .pop()
                        .ok_or_else(|| AbiError::TopicMismatch(self.name.to_string()))?
                }
            } else {
                data_values
                    .next()
                    .ok_or_else(|| AbiError::TopicMismatch(self.name.to_string()))?
            };
            out.push(token);
        }
        Ok(out)
    }

    /// Build the log a contract would emit for these values. Indexed values
    /// must be static.
    pub fn encode_log(&self, emitter: Address, values: &[Token]) -> Result<Log, AbiError> {
        let kinds: Vec<ParamType> = self.params.iter().map(|p| p.kind.clone()).collect();
        check_args(&kinds, values)?;

        let mut topics = vec![self.topic()];
        let mut data_tokens = Vec::new();
        for (param, value) in self.params.iter().zip(values) {
            if param.indexed {
                if param.kind.is_dynamic() {
                    return Err(AbiError::Other(format!(
                        "indexed dynamic parameter in {} is not supported",
                        self.name
                    )));
                }
                let word = encode(std::slice::from_ref(value));
                let mut topic = [0u8; 32];
                topic.copy_from_slice(&word[..32]);
                topics.push(topic);
            } else {
                data_tokens.push(value.clone());
            }
        }
        Ok(Log {
            address: emitter,
            topics,
            data: encode(&data_tokens),
        })
    }
}

/// A Solidity custom error, e.g. `error AlreadyVoted();`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractError {
    pub name: &'static str,
    pub inputs: Vec<ParamType>,
}

impl ContractError {
    pub fn new(name: &'static str, inputs: Vec<ParamType>) -> Self {
        Self { name, inputs }
    }

    pub fn selector(&self) -> [u8; 4] {
        function_selector(&signature(self.name, &self.inputs))
    }

    pub fn encode(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        check_args(&self.inputs, args)?;
        let mut data = self.selector().to_vec();
        data.extend(encode(args));
        Ok(data)
    }
}

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

/// Turn revert data into reason text.
///
/// `Error(string)` yields its message, `Panic(uint256)` its code, and a known
/// custom error its name. Returns `None` for empty or unrecognised data.
pub fn decode_revert(data: &[u8], known: &[ContractError]) -> Option<String> {
    let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
    let body = &data[4..];
    if selector == ERROR_STRING_SELECTOR {
        return decode(&[ParamType::String], body)
            .ok()?
            .pop()?
            .into_string()
            .ok();
    }
    if selector == PANIC_SELECTOR {
        let code = decode(&[ParamType::uint256()], body).ok()?.pop()?.into_uint().ok()?;
        return Some(format!("panic code 0x{code:02x}"));
    }
    known
        .iter()
        .find(|e| e.selector() == selector)
        .map(|e| e.name.to_string())
}
