use std::sync::Arc;

use crate::api::topology_dto::ProvisioningDto;
use crate::domain::admission::{AdmissionConfig, AdmissionController};
use crate::domain::clock::Clock;
use crate::domain::forwarding::ForwardingPlane;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;
pub mod transport;

/// Builds an AdmissionController pre-loaded from a static provisioning file
/// (topology plus any statically known host bindings).
pub fn engine_from_provisioning(
    file_path: &str,
    clock: Arc<dyn Clock>,
    plane: Arc<dyn ForwardingPlane>,
    config: AdmissionConfig,
) -> Result<Arc<AdmissionController>> {
    let provisioning: ProvisioningDto = parse_json_file::<ProvisioningDto>(file_path)?;
    log::info!("Provisioning file parsed successfully.");

    let controller = Arc::new(AdmissionController::new(clock, plane, config));
    controller.load_provisioning(&provisioning);

    Ok(controller)
}
