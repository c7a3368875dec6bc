pub mod config;
pub mod error;
pub mod http;
pub mod repository;
pub mod types;
pub mod xml;

pub use config::{Credentials, DeployConfig};
pub use error::{ClientError, ClientResult};
pub use http::HttpDeployClient;
pub use repository::DeployApi;
pub use types::{
    short_name, ConfigurationItem, DeployedApplication, DeployedApplicationRef,
    UDM_DEPLOYED_APPLICATION, UDM_ENVIRONMENT,
};

pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::http::*;
    pub use crate::repository::*;
    pub use crate::types::*;
}
