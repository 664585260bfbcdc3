//! Conversions between native types and the DALC wire format.
//!
//! Wire -> native conversion is fallible (remote peers can send anything);
//! native -> wire is total.  Round-tripping a block through the wire form
//! must be the identity.

use thiserror::Error;

use velum_primitives::buf::{Buf20, Buf32, Buf64};
use velum_state::block::{Block, BlockData, BlockHeader, Commit};

use crate::proto;
use crate::types::{AvailabilityResult, RetrieveResult, SubmitResult};

#[derive(Debug, Error)]
pub enum ConvError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("bad length for field `{0}`")]
    BadLength(&'static str),
}

fn buf20(bytes: &[u8], field: &'static str) -> Result<Buf20, ConvError> {
    let arr: [u8; 20] = bytes.try_into().map_err(|_| ConvError::BadLength(field))?;
    Ok(Buf20::from(arr))
}

fn buf32(bytes: &[u8], field: &'static str) -> Result<Buf32, ConvError> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| ConvError::BadLength(field))?;
    Ok(Buf32::from(arr))
}

fn buf64(bytes: &[u8], field: &'static str) -> Result<Buf64, ConvError> {
    let arr: [u8; 64] = bytes.try_into().map_err(|_| ConvError::BadLength(field))?;
    Ok(Buf64::from(arr))
}

pub fn block_to_wire(block: &Block) -> proto::Block {
    let header = block.header();
    proto::Block {
        header: Some(proto::Header {
            height: header.height(),
            timestamp: header.timestamp(),
            prev_block_hash: header.prev_block_hash().as_slice().to_vec(),
            data_hash: header.data_hash().as_slice().to_vec(),
            state_root: header.state_root().as_slice().to_vec(),
            proposer_address: header.proposer_address().as_slice().to_vec(),
        }),
        data: Some(proto::Data {
            txs: block.data().txs().to_vec(),
        }),
        commit: Some(proto::Commit {
            height: block.commit().height(),
            header_hash: block.commit().header_hash().as_slice().to_vec(),
            signature: block.commit().signature().as_slice().to_vec(),
        }),
    }
}

pub fn block_from_wire(wire: proto::Block) -> Result<Block, ConvError> {
    let header = wire.header.ok_or(ConvError::MissingField("header"))?;
    let commit = wire.commit.ok_or(ConvError::MissingField("commit"))?;
    let data = wire.data.unwrap_or_default();

    let header = BlockHeader::new(
        header.height,
        header.timestamp,
        buf32(&header.prev_block_hash, "prev_block_hash")?,
        buf32(&header.data_hash, "data_hash")?,
        buf32(&header.state_root, "state_root")?,
        buf20(&header.proposer_address, "proposer_address")?,
    );

    let commit = Commit::new(
        commit.height,
        buf32(&commit.header_hash, "header_hash")?,
        buf64(&commit.signature, "signature")?,
    );

    Ok(Block::new(header, BlockData::new(data.txs), commit))
}

pub fn submit_to_wire(res: SubmitResult) -> proto::DaResponse {
    match res {
        SubmitResult::Success { da_height } => proto::DaResponse {
            code: proto::StatusCode::Success as i32,
            message: String::new(),
            da_height,
        },
        SubmitResult::Error(message) => proto::DaResponse {
            code: proto::StatusCode::Error as i32,
            message,
            da_height: 0,
        },
    }
}

pub fn submit_from_wire(resp: proto::SubmitBlockResponse) -> SubmitResult {
    let Some(result) = resp.result else {
        return SubmitResult::Error("missing result".to_owned());
    };
    match result.code() {
        proto::StatusCode::Success => SubmitResult::Success {
            da_height: result.da_height,
        },
        _ => SubmitResult::Error(result.message),
    }
}

pub fn availability_to_wire(res: AvailabilityResult) -> proto::CheckBlockAvailabilityResponse {
    let (code, message, data_available) = match res {
        AvailabilityResult::Available => (proto::StatusCode::Success, String::new(), true),
        AvailabilityResult::Unavailable => (proto::StatusCode::Success, String::new(), false),
        AvailabilityResult::Error(message) => (proto::StatusCode::Error, message, false),
    };
    proto::CheckBlockAvailabilityResponse {
        result: Some(proto::DaResponse {
            code: code as i32,
            message,
            da_height: 0,
        }),
        data_available,
    }
}

pub fn availability_from_wire(resp: proto::CheckBlockAvailabilityResponse) -> AvailabilityResult {
    let Some(result) = resp.result else {
        return AvailabilityResult::Error("missing result".to_owned());
    };
    match result.code() {
        proto::StatusCode::Success if resp.data_available => AvailabilityResult::Available,
        proto::StatusCode::Success => AvailabilityResult::Unavailable,
        _ => AvailabilityResult::Error(result.message),
    }
}

pub fn retrieve_to_wire(res: RetrieveResult) -> proto::RetrieveBlocksResponse {
    match res {
        RetrieveResult::Success(blocks) => proto::RetrieveBlocksResponse {
            result: Some(proto::DaResponse {
                code: proto::StatusCode::Success as i32,
                message: String::new(),
                da_height: 0,
            }),
            blocks: blocks.iter().map(block_to_wire).collect(),
        },
        RetrieveResult::NotFound => proto::RetrieveBlocksResponse {
            result: Some(proto::DaResponse {
                code: proto::StatusCode::NotFound as i32,
                message: String::new(),
                da_height: 0,
            }),
            blocks: Vec::new(),
        },
        RetrieveResult::Error(message) => proto::RetrieveBlocksResponse {
            result: Some(proto::DaResponse {
                code: proto::StatusCode::Error as i32,
                message,
                da_height: 0,
            }),
            blocks: Vec::new(),
        },
    }
}

pub fn retrieve_from_wire(resp: proto::RetrieveBlocksResponse) -> RetrieveResult {
    let Some(result) = resp.result else {
        return RetrieveResult::Error("missing result".to_owned());
    };
    match result.code() {
        proto::StatusCode::Success => {
            let blocks: Result<Vec<_>, _> =
                resp.blocks.into_iter().map(block_from_wire).collect();
            match blocks {
                Ok(blocks) => RetrieveResult::Success(blocks),
                Err(e) => RetrieveResult::Error(format!("malformed block: {e}")),
            }
        }
        proto::StatusCode::NotFound => RetrieveResult::NotFound,
        _ => RetrieveResult::Error(result.message),
    }
}

#[cfg(test)]
mod tests {
    use velum_test_utils::ArbitraryGenerator;

    use super::*;

    #[test]
    fn test_block_wire_roundtrip() {
        let block: Block = ArbitraryGenerator::new().generate();
        let decoded = block_from_wire(block_to_wire(&block)).unwrap();
        assert_eq!(block, decoded);
    }

    #[test]
    fn test_block_from_wire_missing_header() {
        let block: Block = ArbitraryGenerator::new().generate();
        let mut wire = block_to_wire(&block);
        wire.header = None;
        assert!(block_from_wire(wire).is_err());
    }

    #[test]
    fn test_block_from_wire_bad_hash_len() {
        let block: Block = ArbitraryGenerator::new().generate();
        let mut wire = block_to_wire(&block);
        wire.header.as_mut().unwrap().prev_block_hash = vec![0; 31];
        assert!(block_from_wire(wire).is_err());
    }

    #[test]
    fn test_submit_result_wire_roundtrip() {
        let ok = SubmitResult::Success { da_height: 42 };
        let resp = proto::SubmitBlockResponse {
            result: Some(submit_to_wire(ok.clone())),
        };
        assert_eq!(submit_from_wire(resp), ok);

        let err = SubmitResult::Error("da down".to_owned());
        let resp = proto::SubmitBlockResponse {
            result: Some(submit_to_wire(err.clone())),
        };
        assert_eq!(submit_from_wire(resp), err);
    }

    #[test]
    fn test_availability_wire_roundtrip() {
        for res in [
            AvailabilityResult::Available,
            AvailabilityResult::Unavailable,
            AvailabilityResult::Error("boom".to_owned()),
        ] {
            assert_eq!(availability_from_wire(availability_to_wire(res.clone())), res);
        }
    }

    #[test]
    fn test_retrieve_wire_roundtrip() {
        let block: Block = ArbitraryGenerator::new().generate();
        for res in [
            RetrieveResult::Success(vec![block]),
            RetrieveResult::NotFound,
            RetrieveResult::Error("boom".to_owned()),
        ] {
            assert_eq!(retrieve_from_wire(retrieve_to_wire(res.clone())), res);
        }
    }
}
