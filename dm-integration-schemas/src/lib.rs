pub mod cli_models;
pub mod fabric_models;
pub mod neutron_models;
pub mod topology_yaml;
pub mod settings;
pub mod handlers;

pub const DM_SETTINGS_FOLDER: &str = "/etc/dm-integration/";
