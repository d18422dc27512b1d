//! JSON wire codec for the worker/controller dialog.
//!
//! Every packet is a self-describing JSON object with a mandatory `type`
//! field. Unknown fields are ignored on decode; unknown `type` values fail.
//! Grid replies come in two shapes on the wire (a typed envelope and a bare
//! `{"nodes": [...]}` object); both decode through [`decode_grid_reply`], and
//! this crate emits the bare form.

use serde::{Deserialize, Serialize};

use crate::error::ExchangeResult;

/// Dipole moment orientation, present on atom objects only in dipole runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dipole {
    pub mux: f64,
    pub muy: f64,
    pub muz: f64,
}

/// Snapshot of one locally owned, in-group particle.
///
/// Velocities and current forces are read-only context for the controller;
/// only force deltas ever travel back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub fx: f64,
    pub fy: f64,
    pub fz: f64,
    #[serde(flatten)]
    pub mu: Option<Dipole>,
}

/// Per-particle force delta, returned in request order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceDelta {
    pub dfx: f64,
    pub dfy: f64,
    pub dfz: f64,
}

/// One force-field lattice node with its delta contribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDelta {
    #[serde(rename = "xIndex")]
    pub x_index: u64,
    #[serde(rename = "yIndex")]
    pub y_index: u64,
    #[serde(rename = "zIndex")]
    pub z_index: u64,
    pub dfx: f64,
    pub dfy: f64,
    pub dfz: f64,
}

/// Controller reply to a grid request. `every`, when present, retunes the
/// worker's refresh interval in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridReply {
    pub nodes: Vec<NodeDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    Register,
    Ack,
    Deregister,
    #[serde(rename_all = "camelCase")]
    Request {
        /// The sender's response budget in milliseconds. Carried for forward
        /// compatibility; the supplied runtimes ignore it.
        expect_response: f64,
        atoms: Vec<AtomState>,
    },
    Waiting,
    Response {
        atoms: Vec<ForceDelta>,
    },
    #[serde(rename_all = "camelCase")]
    GridRequest {
        offset: [f64; 3],
        spacing: [f64; 3],
        node_counts: [u64; 3],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        atoms: Option<Vec<AtomState>>,
    },
}

impl Message {
    /// Wire name of the `type` field, for error strings.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Register => "register",
            Message::Ack => "ack",
            Message::Deregister => "deregister",
            Message::Request { .. } => "request",
            Message::Waiting => "waiting",
            Message::Response { .. } => "response",
            Message::GridRequest { .. } => "gridRequest",
        }
    }
}

pub fn encode(message: &Message) -> ExchangeResult<Vec<u8>> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode(bytes: &[u8]) -> ExchangeResult<Message> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode_grid_reply(reply: &GridReply) -> ExchangeResult<Vec<u8>> {
    Ok(serde_json::to_vec(reply)?)
}

/// Accepts both the bare `{"nodes": [...]}` form and a typed envelope; any
/// `type` field is simply ignored.
pub fn decode_grid_reply(bytes: &[u8]) -> ExchangeResult<GridReply> {
    Ok(serde_json::from_slice(bytes)?)
}
