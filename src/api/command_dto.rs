use serde::{Deserialize, Serialize};

use crate::api::reservation_dto::ReservationViewDto;
use crate::api::topology_dto::LinkDto;

/// One request line on the command socket.
///
/// The vocabulary mirrors the commands the controller always understood:
/// flow allocation and deletion, the reservation-table dump, and the inbound
/// topology/learning/session feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandDto {
    AllocateFlow { src: String, dst: String, bandwidth: u64 },
    DeleteFlow { src: String, dst: String },
    ShowReservation,
    TopologyUpdate {
        nodes: Vec<u64>,
        links: Vec<LinkDto>,
    },
    HostSeen {
        host: String,
        switch: u64,
        port: u32,
        #[serde(default)]
        ip: Option<String>,
    },
    SwitchUp {
        switch: u64,
    },
    SwitchDown {
        switch: u64,
    },
}

/// One response line on the command socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseDto {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<Vec<u64>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Vec<ReservationViewDto>>,
    },
    Error {
        reason: String,
    },
}

impl ResponseDto {
    pub fn ok() -> Self {
        ResponseDto::Success { path: None, result: None }
    }

    pub fn ok_with_path(path: Vec<u64>) -> Self {
        ResponseDto::Success { path: Some(path), result: None }
    }

    pub fn ok_with_reservations(result: Vec<ReservationViewDto>) -> Self {
        ResponseDto::Success { path: None, result: Some(result) }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        ResponseDto::Error { reason: reason.into() }
    }
}
