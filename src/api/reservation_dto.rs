use serde::{Deserialize, Serialize};

use crate::domain::reservation::Reservation;

/// One row of the reservation table as handed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationViewDto {
    pub src: String,
    pub dst: String,
    /// Switch path, src side first.
    pub path: Vec<u64>,
    pub bandwidth: u64,
    pub remaining_ttl: i64,
}

impl ReservationViewDto {
    pub fn from_reservation(reservation: &Reservation, now: i64) -> Self {
        Self {
            src: reservation.src.0.clone(),
            dst: reservation.dst.0.clone(),
            path: reservation.path.iter().map(|s| s.0).collect(),
            bandwidth: reservation.bandwidth,
            remaining_ttl: reservation.remaining_ttl(now),
        }
    }
}
