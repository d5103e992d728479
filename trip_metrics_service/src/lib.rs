use std::fmt;

pub mod gpx_util;
mod tracking_service;

pub use tracking_service::*;

#[derive(Debug)]
pub enum ServiceError {
    ChannelClosed(String),
    Navigation(String),
    InvalidConfig(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::ChannelClosed(reason) => write!(f, "Tracking service is gone: {}", reason),
            ServiceError::Navigation(reason) => write!(f, "Navigation error: {}", reason),
            ServiceError::InvalidConfig(reason) => write!(f, "Invalid service configuration: {}", reason),
        }
    }
}

impl std::error::Error for ServiceError {}
