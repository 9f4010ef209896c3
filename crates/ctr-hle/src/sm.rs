use crate::framework::HleService;
use crate::{Error, Result};
use ctr_ipc::HleRequestContext;
use std::collections::HashMap;

/// An open connection to a registered service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Session(u32);

impl Session {
    /// Raw session number.
    pub fn id(self) -> u32 {
        self.0
    }
}

struct Registration {
    service: Box<dyn HleService>,
    open_sessions: u32,
}

/// Registry of named services and the sessions open against them.
pub struct ServiceManager {
    services: HashMap<&'static str, Registration>,
    sessions: HashMap<Session, &'static str>,
    next_session: u32,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    /// Manager with no services registered.
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            sessions: HashMap::new(),
            next_session: 1,
        }
    }

    /// Register `service` under its own name.
    pub fn register_service(&mut self, service: Box<dyn HleService>) -> Result<()> {
        let name = service.name();
        if self.services.contains_key(name) {
            return Err(Error::AlreadyRegistered(name.to_string()));
        }
        tracing::debug!(
            "registered {} (max {} sessions)",
            name,
            service.max_sessions()
        );
        self.services.insert(
            name,
            Registration {
                service,
                open_sessions: 0,
            },
        );
        Ok(())
    }

    /// Open a session to `name`, honoring the service's session quota.
    pub fn connect_to_service(&mut self, name: &str) -> Result<Session> {
        let (&name, registration) = self
            .services
            .iter_mut()
            .find(|(registered, _)| **registered == name)
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))?;

        let max_sessions = registration.service.max_sessions();
        if registration.open_sessions >= max_sessions {
            tracing::warn!("{} refused a session: {} already open", name, max_sessions);
            return Err(Error::SessionLimitReached {
                name: name.to_string(),
                max_sessions,
            });
        }
        registration.open_sessions += 1;

        let session = Session(self.next_session);
        self.next_session += 1;
        self.sessions.insert(session, name);
        Ok(session)
    }

    /// Close `session`, returning its slot to the service's quota.
    pub fn close_session(&mut self, session: Session) -> Result<()> {
        let name = self
            .sessions
            .remove(&session)
            .ok_or(Error::InvalidSession(session.0))?;
        if let Some(registration) = self.services.get_mut(name) {
            registration.open_sessions = registration.open_sessions.saturating_sub(1);
        }
        Ok(())
    }

    /// Deliver one request to the service behind `session`.
    pub fn send_sync_request(
        &mut self,
        session: Session,
        ctx: &mut HleRequestContext<'_>,
    ) -> Result<()> {
        let name = self
            .sessions
            .get(&session)
            .ok_or(Error::InvalidSession(session.0))?;
        let registration = self
            .services
            .get_mut(name)
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))?;
        registration.service.handle_sync_request(ctx);
        Ok(())
    }

    /// Whether a service is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Sessions currently open against `name`.
    pub fn open_sessions(&self, name: &str) -> Option<u32> {
        self.services
            .get(name)
            .map(|registration| registration.open_sessions)
    }
}
