// Domain layer: CMS/CKAN records and the ports to the external services.

pub mod model;
pub mod ports;
