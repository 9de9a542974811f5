//! String and blob records.

use super::{ArgumentMap, IndexArgument, IndexType};
use crate::error::{IndexError, Result};
use crate::node::NodeType;
use crate::node::layout::{data, node};
use crate::storage::{CHUNK_SIZE, Database};
use serde::Serialize;
use symdex_api::{RecordId, ResolutionFailure};

/// Longest payload a string or blob record can carry.
pub const MAX_DATA_LEN: usize = CHUNK_SIZE - 16;

fn check_len(len: usize) -> Result<()> {
    if len > MAX_DATA_LEN {
        return Err(ResolutionFailure::PayloadTooLarge(len).into());
    }
    Ok(())
}

/// Fail the way a later write of `value` would, before anything is allocated.
pub fn check_encoded<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    check_len(rmp_serde::to_vec(value)?.len())
}

fn write_data(db: &Database, tag: NodeType, parent: RecordId, bytes: &[u8]) -> Result<RecordId> {
    check_len(bytes.len())?;
    let rec = db.malloc(data::BYTES as usize + bytes.len())?;
    db.put_u16(rec.at(node::TYPE), tag as u16)?;
    db.put_rec(rec.at(node::PARENT), parent)?;
    db.put_u16(rec.at(data::LEN), bytes.len() as u16)?;
    db.put_bytes(rec.at(data::BYTES), bytes)?;
    Ok(rec)
}

fn read_data(db: &Database, rec: RecordId, expected: NodeType) -> Result<Vec<u8>> {
    let tag = db.get_u16(rec.at(node::TYPE))?;
    if tag != expected as u16 {
        return Err(IndexError::corrupt(format!(
            "{} has tag {} where a {} was expected",
            rec, tag, expected
        )));
    }
    let len = db.get_u16(rec.at(data::LEN))? as usize;
    db.get_bytes(rec.at(data::BYTES), len)
}

pub fn write_string(db: &Database, parent: RecordId, text: &[u8]) -> Result<RecordId> {
    write_data(db, NodeType::String, parent, text)
}

pub fn read_string(db: &Database, rec: RecordId) -> Result<Vec<u8>> {
    if rec.is_null() {
        return Ok(Vec::new());
    }
    read_data(db, rec, NodeType::String)
}

pub fn read_str(db: &Database, rec: RecordId) -> Result<String> {
    Ok(String::from_utf8_lossy(&read_string(db, rec)?).into_owned())
}

pub fn write_blob(db: &Database, parent: RecordId, bytes: &[u8]) -> Result<RecordId> {
    write_data(db, NodeType::Blob, parent, bytes)
}

pub fn read_blob(db: &Database, rec: RecordId) -> Result<Vec<u8>> {
    read_data(db, rec, NodeType::Blob)
}

/// Free a string or blob record; null is a no-op.
pub fn free_data(db: &Database, rec: RecordId) -> Result<()> {
    if rec.is_null() {
        return Ok(());
    }
    db.free(rec)
}

pub fn write_type(db: &Database, parent: RecordId, ty: &IndexType) -> Result<RecordId> {
    write_blob(db, parent, &rmp_serde::to_vec(ty)?)
}

pub fn read_type(db: &Database, rec: RecordId) -> Result<Option<IndexType>> {
    if rec.is_null() {
        return Ok(None);
    }
    Ok(Some(rmp_serde::from_slice(&read_blob(db, rec)?)?))
}

pub fn write_argument(db: &Database, parent: RecordId, arg: &IndexArgument) -> Result<RecordId> {
    write_blob(db, parent, &rmp_serde::to_vec(arg)?)
}

pub fn read_argument(db: &Database, rec: RecordId) -> Result<Option<IndexArgument>> {
    if rec.is_null() {
        return Ok(None);
    }
    Ok(Some(rmp_serde::from_slice(&read_blob(db, rec)?)?))
}

pub fn write_arguments(db: &Database, parent: RecordId, args: &[IndexArgument]) -> Result<RecordId> {
    write_blob(db, parent, &rmp_serde::to_vec(args)?)
}

pub fn read_arguments(db: &Database, rec: RecordId) -> Result<Vec<IndexArgument>> {
    if rec.is_null() {
        return Ok(Vec::new());
    }
    Ok(rmp_serde::from_slice(&read_blob(db, rec)?)?)
}

pub fn write_argument_map(db: &Database, parent: RecordId, map: &ArgumentMap) -> Result<RecordId> {
    write_blob(db, parent, &rmp_serde::to_vec(map)?)
}

pub fn read_argument_map(db: &Database, rec: RecordId) -> Result<ArgumentMap> {
    if rec.is_null() {
        return Ok(Vec::new());
    }
    Ok(rmp_serde::from_slice(&read_blob(db, rec)?)?)
}
