//! Raw transaction codec.
//!
//! Layout (all integers little-endian):
//! `version:u32 | varint n_in | inputs | varint n_out | outputs | lock_time:u32`
//! where an input is `prev_txid:[u8;32] | prev_index:u32 | varint len | script | sequence:u32`
//! and an output is `satoshis:u64 | varint len | script`.

use overlay_types::{Outpoint, TxId};
use serde::{Deserialize, Serialize};

use crate::error::TransactionError;
use crate::merkle::sha256d;

/// Smallest possible encoded input (32 + 4 + 1 + 4).
const MIN_INPUT_SIZE: usize = 41;
/// Smallest possible encoded output (8 + 1).
const MIN_OUTPUT_SIZE: usize = 9;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub previous_output: Outpoint,
    pub unlocking_script: Vec<u8>,
    pub sequence: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub satoshis: u64,
    pub locking_script: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// Parse a raw transaction. The whole slice must be consumed.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = Reader::new(raw);
        let version = reader.u32("version")?;

        let input_count = reader.count("input count", MIN_INPUT_SIZE)?;
        if input_count == 0 {
            return Err(TransactionError::NoInputs);
        }
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let txid: [u8; 32] = reader.array("previous txid")?;
            let index = reader.u32("previous output index")?;
            let script_len = reader.count("unlocking script length", 1)?;
            let unlocking_script = reader.bytes(script_len, "unlocking script")?.to_vec();
            let sequence = reader.u32("sequence")?;
            inputs.push(TxInput {
                previous_output: Outpoint::new(TxId::new(txid), index),
                unlocking_script,
                sequence,
            });
        }

        let output_count = reader.count("output count", MIN_OUTPUT_SIZE)?;
        if output_count == 0 {
            return Err(TransactionError::NoOutputs);
        }
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let satoshis = reader.u64("satoshis")?;
            let script_len = reader.count("locking script length", 1)?;
            let locking_script = reader.bytes(script_len, "locking script")?.to_vec();
            outputs.push(TxOutput {
                satoshis,
                locking_script,
            });
        }

        let lock_time = reader.u32("lock time")?;
        if reader.remaining() > 0 {
            return Err(TransactionError::TrailingBytes(reader.remaining()));
        }

        Ok(Self {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        write_varint(&mut out, self.inputs.len() as u64);
        for input in &self.inputs {
            out.extend_from_slice(input.previous_output.txid.as_bytes());
            out.extend_from_slice(&input.previous_output.output_index.to_le_bytes());
            write_varint(&mut out, input.unlocking_script.len() as u64);
            out.extend_from_slice(&input.unlocking_script);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_varint(&mut out, self.outputs.len() as u64);
        for output in &self.outputs {
            out.extend_from_slice(&output.satoshis.to_le_bytes());
            write_varint(&mut out, output.locking_script.len() as u64);
            out.extend_from_slice(&output.locking_script);
        }
        out.extend_from_slice(&self.lock_time.to_le_bytes());
        out
    }

    pub fn txid(&self) -> TxId {
        TxId::new(sha256d(&self.to_bytes()))
    }

    /// Outpoint of output `index`, checked against the output count.
    pub fn outpoint(&self, index: u32) -> Result<Outpoint, TransactionError> {
        if index as usize >= self.outputs.len() {
            return Err(TransactionError::OutputIndexOutOfRange {
                index,
                count: self.outputs.len(),
            });
        }
        Ok(Outpoint::new(self.txid(), index))
    }

    /// Whether any input of this transaction consumes `outpoint`.
    pub fn spends(&self, outpoint: &Outpoint) -> bool {
        self.inputs.iter().any(|i| &i.previous_output == outpoint)
    }
}

/// Id of a raw transaction without parsing it.
pub fn txid_of(raw: &[u8]) -> TxId {
    TxId::new(sha256d(raw))
}

fn write_varint(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn bytes(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], TransactionError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or(TransactionError::Truncated { what })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], TransactionError> {
        let mut arr = [0u8; N];
        arr.copy_from_slice(self.bytes(N, what)?);
        Ok(arr)
    }

    fn u32(&mut self, what: &'static str) -> Result<u32, TransactionError> {
        Ok(u32::from_le_bytes(self.array(what)?))
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, TransactionError> {
        Ok(u64::from_le_bytes(self.array(what)?))
    }

    /// Only the shortest encoding of a value is accepted, so every parsed
    /// transaction re-serializes to exactly the bytes it was read from.
    fn varint(&mut self, what: &'static str) -> Result<u64, TransactionError> {
        let [tag] = self.array::<1>(what)?;
        let (value, min) = match tag {
            0xfd => (u16::from_le_bytes(self.array(what)?) as u64, 0xfd),
            0xfe => (u32::from_le_bytes(self.array(what)?) as u64, 0x1_0000),
            0xff => (u64::from_le_bytes(self.array(what)?), 0x1_0000_0000),
            n => return Ok(n as u64),
        };
        if value < min {
            return Err(TransactionError::NonCanonicalVarint { what });
        }
        Ok(value)
    }

    /// Read a length prefix and reject counts that cannot fit in what is left,
    /// so a hostile prefix cannot trigger a huge allocation.
    fn count(&mut self, what: &'static str, min_item_size: usize) -> Result<usize, TransactionError> {
        let n = self.varint(what)?;
        let max = (self.remaining() / min_item_size.max(1)) as u64;
        if n > max {
            return Err(TransactionError::Truncated { what });
        }
        Ok(n as usize)
    }
}
