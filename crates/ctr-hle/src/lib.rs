//! # ctr-hle
//!
//! High-level emulation of a handful of handheld-console system services.
//!
//! This crate provides:
//! - A table-driven service framework and dispatcher
//! - A service manager with per-service session quotas
//! - `http:C`: HTTP contexts driven by guest commands, with streamed responses
//! - `mic:u`: microphone configuration state (no capture)
//! - `pxi:dev`: an endpoint with no emulated commands
//! - TOML configuration for the HTTP client and the set of installed services
//!
//! ## Example
//!
//! ```no_run
//! use ctr_hle::{install_interfaces, HleConfig, ServiceManager};
//! use ctr_ipc::{GuestMemory, HandleTable, HleRequestContext, MessageBuilder};
//!
//! let mut services = ServiceManager::new();
//! install_interfaces(&mut services, &HleConfig::default())?;
//!
//! let session = services.connect_to_service("http:C")?;
//! let command = MessageBuilder::new(ctr_hle::http::BEGIN_REQUEST)
//!     .push_u32(1)
//!     .build()
//!     .encode();
//!
//! let mut memory = GuestMemory::new();
//! let mut handles = HandleTable::new();
//! let mut ctx = HleRequestContext::new(command, &mut memory, &mut handles)?;
//! services.send_sync_request(session, &mut ctx)?;
//!
//! let reply = ctx.take_response().map(|message| message.encode());
//! println!("{:08X?}", reply);
//! # Ok::<(), ctr_hle::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod framework;
pub mod http;
pub mod mic;
pub mod pxi;
mod shared_memory;
pub mod sm;

pub use config::{HleConfig, HttpConfig, ServicesConfig};
pub use error::{Error, Result};
pub use framework::{FunctionInfo, Handler, HleService, ServiceFramework};
pub use http::HttpC;
pub use mic::MicU;
pub use pxi::PxiDev;
pub use shared_memory::SharedMemoryLatch;
pub use sm::{ServiceManager, Session};

/// Register every service enabled in `config`.
pub fn install_interfaces(service_manager: &mut ServiceManager, config: &HleConfig) -> Result<()> {
    if config.services.http_c {
        service_manager.register_service(Box::new(HttpC::from_config(&config.http)?))?;
    }
    if config.services.mic_u {
        service_manager.register_service(Box::new(MicU::new()))?;
    }
    if config.services.pxi_dev {
        service_manager.register_service(Box::new(PxiDev::new()))?;
    }
    Ok(())
}
