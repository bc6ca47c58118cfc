pub mod config;
pub mod logging;
pub mod types;

pub use config::{
    AccountConfig, Config, DefaultsConfig, EndpointsConfig, HttpConfig, LoggingConfig, ServerConfig,
};
pub use types::{
    group_name, Grant, GroupDescriptor, GroupKey, GroupList, GroupPermissions, PermissionDescriptor,
    Role, Tenant, TenantList, UnknownRole,
};
