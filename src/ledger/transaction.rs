//! Programmable transaction assembly and `TransactionData` encoding.
//!
//! A [`ProgrammableTransaction`] collects inputs and commands the way the
//! Sui transaction builder does; [`TransactionData`] wraps it with sender
//! and gas data. Every type here derives `Serialize` in Sui's BCS field
//! and variant order, so `bcs::to_bytes` yields the bytes that get signed.

use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::types::SwapError;

pub use sui_sdk_types::TypeTag;

/// 32-byte account address or object id.
pub type Address = [u8; 32];

/// Parse `0x`-prefixed (or bare) hex, left-padding short forms like `0x2`.
pub fn parse_address(s: &str) -> Result<Address, SwapError> {
    let hex_part = s.trim().strip_prefix("0x").unwrap_or(s.trim());
    if hex_part.is_empty() || hex_part.len() > 64 {
        return Err(SwapError::Config(format!("Invalid address: '{s}'")));
    }
    let padded = format!("{hex_part:0>64}");
    let bytes = hex::decode(&padded)
        .map_err(|e| SwapError::Config(format!("Invalid address '{s}': {e}")))?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Canonical `0x` + 64 hex form.
pub fn format_address(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr))
}

/// Parse a Move type such as `0x2::coin::Coin<0x2::sui::SUI>`.
pub fn parse_type_tag(s: &str) -> Result<TypeTag, SwapError> {
    s.trim()
        .parse::<TypeTag>()
        .map_err(|_| SwapError::PoolCall(format!("Invalid type '{s}'")))
}

/// Whether two type strings name the same Move type, in any address form.
pub fn same_type(a: &str, b: &str) -> bool {
    match (parse_type_tag(a), parse_type_tag(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Object references
// ---------------------------------------------------------------------------

/// (id, version, digest) of an owned object at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectRef {
    pub object_id: Address,
    pub version: u64,
    /// Digests are length-prefixed on the wire, unlike addresses.
    #[serde(serialize_with = "length_prefixed")]
    pub digest: [u8; 32],
}

impl ObjectRef {
    /// Build from the RPC representation (hex id, base58 digest).
    pub fn from_rpc(object_id: &str, version: u64, digest: &str) -> Result<Self, SwapError> {
        let raw = bs58::decode(digest)
            .into_vec()
            .map_err(|e| SwapError::Infrastructure(format!("Bad object digest '{digest}': {e}")))?;
        let digest = <[u8; 32]>::try_from(raw.as_slice()).map_err(|_| {
            SwapError::Infrastructure(format!("Object digest '{digest}' is not 32 bytes"))
        })?;
        Ok(Self {
            object_id: parse_address(object_id)?,
            version,
            digest,
        })
    }
}

fn length_prefixed<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
    bytes.as_slice().serialize(serializer)
}

fn resolved_version<S: Serializer>(version: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match version {
        Some(v) => serializer.serialize_u64(*v),
        None => Err(S::Error::custom("shared object version not resolved")),
    }
}

// ---------------------------------------------------------------------------
// Inputs, arguments, commands
// ---------------------------------------------------------------------------

/// Reference to a value inside a programmable transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ObjectInput {
    Owned(ObjectRef),
    /// `initial_shared_version` is filled in just before signing.
    Shared {
        id: Address,
        #[serde(serialize_with = "resolved_version")]
        initial_shared_version: Option<u64>,
        mutable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CallArg {
    /// BCS bytes of the value.
    Pure(Vec<u8>),
    Object(ObjectInput),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveCall {
    pub package: Address,
    pub module: String,
    pub function: String,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Command {
    MoveCall(Box<MoveCall>),
    TransferObjects(Vec<Argument>, Argument),
    SplitCoins(Argument, Vec<Argument>),
    MergeCoins(Argument, Vec<Argument>),
}

/// Handle to the results of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResult(u16);

impl CommandResult {
    /// The `i`-th value returned by the command.
    pub fn nested(&self, i: u16) -> Argument {
        Argument::NestedResult(self.0, i)
    }
}

fn index(position: usize, what: &str) -> Result<u16, SwapError> {
    u16::try_from(position)
        .map_err(|_| SwapError::PoolCall(format!("Too many {what} in transaction ({position})")))
}

// ---------------------------------------------------------------------------
// Programmable transaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

impl ProgrammableTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_input(&mut self, arg: CallArg) -> Result<Argument, SwapError> {
        let i = index(self.inputs.len(), "inputs")?;
        self.inputs.push(arg);
        Ok(Argument::Input(i))
    }

    fn push_command(&mut self, cmd: Command) -> Result<CommandResult, SwapError> {
        let i = index(self.commands.len(), "commands")?;
        self.commands.push(cmd);
        Ok(CommandResult(i))
    }

    pub fn gas(&self) -> Argument {
        Argument::GasCoin
    }

    /// Pure input holding the BCS encoding of `value`.
    pub fn pure<T: Serialize>(&mut self, value: &T) -> Result<Argument, SwapError> {
        let bytes = bcs::to_bytes(value)
            .map_err(|e| SwapError::PoolCall(format!("Cannot encode pure argument: {e}")))?;
        self.push_input(CallArg::Pure(bytes))
    }

    pub fn pure_bool(&mut self, v: bool) -> Result<Argument, SwapError> {
        self.pure(&v)
    }

    pub fn pure_u64(&mut self, v: u64) -> Result<Argument, SwapError> {
        self.pure(&v)
    }

    pub fn pure_u128(&mut self, v: u128) -> Result<Argument, SwapError> {
        self.pure(&v)
    }

    pub fn pure_address(&mut self, addr: &str) -> Result<Argument, SwapError> {
        let bytes = parse_address(addr)?;
        self.pure(&bytes)
    }

    /// Owned object input; the same object is only added once.
    pub fn owned_object(&mut self, obj: ObjectRef) -> Result<Argument, SwapError> {
        let existing = self.inputs.iter().position(|input| {
            matches!(input, CallArg::Object(ObjectInput::Owned(r)) if r.object_id == obj.object_id)
        });
        match existing {
            Some(i) => Ok(Argument::Input(index(i, "inputs")?)),
            None => self.push_input(CallArg::Object(ObjectInput::Owned(obj))),
        }
    }

    /// Shared object input. Repeated references are merged, mutable wins.
    pub fn shared_object(&mut self, id: &str, mutable: bool) -> Result<Argument, SwapError> {
        let id = parse_address(id)?;
        for (i, input) in self.inputs.iter_mut().enumerate() {
            if let CallArg::Object(ObjectInput::Shared {
                id: existing,
                mutable: m,
                ..
            }) = input
            {
                if *existing == id {
                    *m |= mutable;
                    return Ok(Argument::Input(index(i, "inputs")?));
                }
            }
        }
        self.push_input(CallArg::Object(ObjectInput::Shared {
            id,
            initial_shared_version: None,
            mutable,
        }))
    }

    pub fn merge_coins(&mut self, destination: Argument, sources: Vec<Argument>) -> Result<(), SwapError> {
        self.push_command(Command::MergeCoins(destination, sources))?;
        Ok(())
    }

    /// Split a single new coin of `amount` off `coin`.
    pub fn split_coin(&mut self, coin: Argument, amount: u64) -> Result<Argument, SwapError> {
        let amount = self.pure_u64(amount)?;
        Ok(self.push_command(Command::SplitCoins(coin, vec![amount]))?.nested(0))
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: &str) -> Result<(), SwapError> {
        let recipient = self.pure_address(recipient)?;
        self.push_command(Command::TransferObjects(objects, recipient))?;
        Ok(())
    }

    /// `target` is `package::module::function`.
    pub fn move_call(
        &mut self,
        target: &str,
        type_arguments: &[&str],
        arguments: Vec<Argument>,
    ) -> Result<CommandResult, SwapError> {
        let mut parts = target.split("::");
        let (package, module, function) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(m), Some(f), None) if !m.is_empty() && !f.is_empty() => (p, m, f),
            _ => return Err(SwapError::PoolCall(format!("Invalid move call target '{target}'"))),
        };
        let package = parse_address(package)
            .map_err(|e| SwapError::PoolCall(format!("Invalid package in '{target}': {e}")))?;
        let type_arguments = type_arguments
            .iter()
            .map(|t| parse_type_tag(t))
            .collect::<Result<Vec<_>, _>>()?;

        self.push_command(Command::MoveCall(Box::new(MoveCall {
            package,
            module: module.to_string(),
            function: function.to_string(),
            type_arguments,
            arguments,
        })))
    }

    /// Ids of shared inputs still missing their initial version.
    pub fn unresolved_shared(&self) -> Vec<Address> {
        self.inputs
            .iter()
            .filter_map(|input| match input {
                CallArg::Object(ObjectInput::Shared {
                    id,
                    initial_shared_version: None,
                    ..
                }) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn resolve_shared(&mut self, object_id: &Address, version: u64) {
        for input in &mut self.inputs {
            if let CallArg::Object(ObjectInput::Shared {
                id,
                initial_shared_version,
                ..
            }) = input
            {
                if id == object_id {
                    *initial_shared_version = Some(version);
                }
            }
        }
    }

    /// Ids of owned objects used as inputs.
    pub fn owned_inputs(&self) -> Vec<Address> {
        self.inputs
            .iter()
            .filter_map(|input| match input {
                CallArg::Object(ObjectInput::Owned(r)) => Some(r.object_id),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Transaction data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GasData {
    pub payment: Vec<ObjectRef>,
    pub owner: Address,
    pub price: u64,
    pub budget: u64,
}

/// Everything that gets signed: `TransactionData::V1`, no expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    pub sender: Address,
    pub kind: ProgrammableTransaction,
    pub gas: GasData,
}

#[derive(Serialize)]
enum VersionedData<'a> {
    V1(DataV1<'a>),
}

#[derive(Serialize)]
struct DataV1<'a> {
    kind: TransactionKind<'a>,
    sender: &'a Address,
    gas_data: &'a GasData,
    expiration: Expiration,
}

#[derive(Serialize)]
enum TransactionKind<'a> {
    ProgrammableTransaction(&'a ProgrammableTransaction),
}

#[derive(Serialize)]
enum Expiration {
    None,
}

impl TransactionData {
    /// BCS bytes ready for signing.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SwapError> {
        if let Some(id) = self.kind.unresolved_shared().first() {
            return Err(SwapError::Infrastructure(format!(
                "Shared object {} has no resolved version",
                format_address(id)
            )));
        }
        if self.gas.payment.is_empty() {
            return Err(SwapError::Infrastructure("No gas payment coins".into()));
        }

        let data = VersionedData::V1(DataV1 {
            kind: TransactionKind::ProgrammableTransaction(&self.kind),
            sender: &self.sender,
            gas_data: &self.gas,
            expiration: Expiration::None,
        });
        bcs::to_bytes(&data)
            .map_err(|e| SwapError::Infrastructure(format!("Cannot serialize transaction: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
