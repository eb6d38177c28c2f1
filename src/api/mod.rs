pub mod command_dto;
pub mod reservation_dto;
pub mod topology_dto;
