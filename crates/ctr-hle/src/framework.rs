use crate::Result;
use ctr_ipc::{Header, HleRequestContext, MessageBuilder, ResultCode};

/// Handler bound to one command code.
pub type Handler<S> = fn(&mut S, &mut HleRequestContext<'_>) -> Result<()>;

/// One row of a service's command table.
pub struct FunctionInfo<S> {
    /// Full header word the command is registered under.
    pub code: u32,
    /// `None` for commands that are known but not emulated.
    pub handler: Option<Handler<S>>,
    pub name: &'static str,
}

impl<S> FunctionInfo<S> {
    /// Row bound to `handler` under `header`'s full code.
    pub const fn new(header: Header, handler: Handler<S>, name: &'static str) -> Self {
        Self {
            code: header.raw(),
            handler: Some(handler),
            name,
        }
    }

    /// Row for a known command that is not emulated.
    pub const fn unimplemented(code: u32, name: &'static str) -> Self {
        Self {
            code,
            handler: None,
            name,
        }
    }
}

/// A service described by a static command table.
pub trait ServiceFramework: Sized + Send + 'static {
    /// Port name the service registers under.
    const NAME: &'static str;
    /// Maximum number of simultaneously open sessions.
    const MAX_SESSIONS: u32;

    fn functions() -> &'static [FunctionInfo<Self>];
}

/// Object-safe view of a registered service.
pub trait HleService: Send {
    /// Port name the service registers under.
    fn name(&self) -> &'static str;
    /// Maximum number of simultaneously open sessions.
    fn max_sessions(&self) -> u32;

    /// Handle one request, leaving exactly one reply in `ctx`.
    fn handle_sync_request(&mut self, ctx: &mut HleRequestContext<'_>);
}

impl<T: ServiceFramework> HleService for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn max_sessions(&self) -> u32 {
        T::MAX_SESSIONS
    }

    fn handle_sync_request(&mut self, ctx: &mut HleRequestContext<'_>) {
        dispatch(self, ctx)
    }
}

/// Reply frame carrying only a result word.
pub(crate) fn result_only(command_id: u16, result: ResultCode) -> ctr_ipc::Message {
    MessageBuilder::new(Header::new(command_id, 1, 0))
        .push_result(result)
        .build()
}

fn dispatch<S: ServiceFramework>(service: &mut S, ctx: &mut HleRequestContext<'_>) {
    let header = ctx.header();
    let code = header.raw();
    let info = S::functions().iter().find(|info| info.code == code);

    let (name, handler) = match info {
        Some(FunctionInfo {
            name,
            handler: Some(handler),
            ..
        }) => (*name, *handler),
        Some(FunctionInfo { name, .. }) => {
            tracing::warn!(
                "unimplemented function '{}' on {}: 0x{:08X}",
                name,
                S::NAME,
                code
            );
            ctx.reply(result_only(header.command_id, ResultCode::SUCCESS));
            return;
        }
        None => {
            tracing::warn!("unknown function on {}: 0x{:08X}", S::NAME, code);
            ctx.reply(result_only(header.command_id, ResultCode::SUCCESS));
            return;
        }
    };

    match handler(service, ctx) {
        Ok(()) => {
            if ctx.response().is_none() {
                tracing::error!("{}::{} returned without a reply", S::NAME, name);
                ctx.reply(result_only(header.command_id, ResultCode::SUCCESS));
            }
        }
        Err(err) => {
            let result = err.result_code();
            if result.is_success() {
                tracing::warn!("{}::{} failed, reporting success: {}", S::NAME, name, err);
            } else {
                tracing::error!("{}::{} failed with {:?}: {}", S::NAME, name, result, err);
            }
            ctx.reply(result_only(header.command_id, result));
        }
    }
}
