//! The `http:C` service.
//!
//! Guest software drives one [`Context`] per request through a fixed command
//! sequence:
//!
//! ```text
//!   Initialize
//!       │
//!   CreateContext ──▶ handle
//!       │
//!   AddRequestHeader / SetProxyDefault / SetSSLOpt / SetKeepAlive /
//!   InitializeConnectionSession          (any order, any number of times)
//!       │
//!   BeginRequest                         (blocks on the transport)
//!       │
//!   ReceiveData[Timeout] ...             (DOWNLOAD_PENDING until drained)
//!       │
//!   CloseContext
//! ```

mod context;
mod transport;

pub use context::{Context, ContextStore, HeaderList, HttpResponse, RequestMethod};
pub use transport::{HttpRequest, HttpTransport, ReqwestTransport};

use crate::config::HttpConfig;
use crate::framework::{FunctionInfo, ServiceFramework};
use crate::shared_memory::SharedMemoryLatch;
use crate::Result;
use ctr_ipc::{
    Header, HleRequestContext, MappedBuffer, MessageBuilder, RequestParser, ResultCode,
    SharedMemory,
};
use std::sync::Arc;
use std::time::Duration;

/// Returned for any command naming a context that does not exist.
pub const ERROR_CONTEXT_ERROR: ResultCode = ResultCode(0xD8A0A066);
/// Returned by the receive commands while body bytes remain.
pub const RESULT_DOWNLOAD_PENDING: ResultCode = ResultCode(0xD840A02B);

pub const INITIALIZE: Header = Header::new(0x1, 1, 4);
pub const CREATE_CONTEXT: Header = Header::new(0x2, 2, 2);
pub const CLOSE_CONTEXT: Header = Header::new(0x3, 1, 0);
pub const GET_DOWNLOAD_SIZE_STATE: Header = Header::new(0x6, 1, 0);
pub const INITIALIZE_CONNECTION_SESSION: Header = Header::new(0x8, 1, 2);
pub const BEGIN_REQUEST: Header = Header::new(0x9, 1, 0);
pub const RECEIVE_DATA: Header = Header::new(0xB, 2, 2);
pub const RECEIVE_DATA_TIMEOUT: Header = Header::new(0xC, 4, 2);
pub const SET_PROXY_DEFAULT: Header = Header::new(0xE, 1, 0);
pub const ADD_REQUEST_HEADER: Header = Header::new(0x11, 3, 4);
pub const GET_RESPONSE_STATUS_CODE: Header = Header::new(0x22, 1, 0);
pub const GET_RESPONSE_STATUS_CODE_TIMEOUT: Header = Header::new(0x23, 3, 0);
pub const SET_SSL_OPT: Header = Header::new(0x2B, 2, 0);
pub const SET_KEEP_ALIVE: Header = Header::new(0x37, 2, 0);

const SHARED_MEMORY_NAME: &str = "HTTP_C:shared_memory";

/// HLE implementation of the `http:C` service.
pub struct HttpC {
    contexts: ContextStore,
    shared_memory: SharedMemoryLatch,
    transport: Box<dyn HttpTransport>,
    config: HttpConfig,
}

impl HttpC {
    /// Service issuing its requests through `transport`.
    pub fn new(transport: Box<dyn HttpTransport>, config: HttpConfig) -> Self {
        Self {
            contexts: ContextStore::new(),
            shared_memory: SharedMemoryLatch::new(),
            transport,
            config,
        }
    }

    /// Service backed by a real HTTP client built from `config`.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Box::new(transport), config.clone()))
    }

    /// Live contexts, keyed by handle.
    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    /// Shared memory block latched by `Initialize`, if any.
    pub fn shared_memory(&self) -> Option<&Arc<SharedMemory>> {
        self.shared_memory.get()
    }

    fn initialize(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, INITIALIZE)?;
        let shmem_size = rp.pop_u32()?;
        rp.pop_pid()?;
        let block = rp.pop_object::<SharedMemory>()?;

        self.shared_memory.latch(block, SHARED_MEMORY_NAME);
        ctx.reply(success(INITIALIZE));

        tracing::debug!("called, shmem_size={}", shmem_size);
        Ok(())
    }

    fn create_context(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, CREATE_CONTEXT)?;
        let url_size = rp.pop_u32()?;
        let method = rp.pop_enum::<RequestMethod>("RequestMethod")?;
        let buffer = rp.pop_mapped_buffer()?;
        let url = until_nul(buffer.read(ctx.memory(), 0, url_size as usize)?);

        let context = Context::new(url, method);
        tracing::debug!(
            "called, url_size={}, url={}, method={}",
            url_size,
            context.url_lossy(),
            method.as_str()
        );
        let handle = self.contexts.create(context);

        ctx.reply(
            MessageBuilder::new(Header::new(CREATE_CONTEXT.command_id, 2, 0))
                .push_result(ResultCode::SUCCESS)
                .push_u32(handle)
                .build(),
        );
        Ok(())
    }

    fn close_context(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, CLOSE_CONTEXT)?;
        let handle = rp.pop_u32()?;

        self.contexts.erase(handle)?;
        ctx.reply(success(CLOSE_CONTEXT));

        tracing::debug!("called, context_id={}", handle);
        Ok(())
    }

    fn get_download_size_state(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, GET_DOWNLOAD_SIZE_STATE)?;
        let handle = rp.pop_u32()?;

        let context = self.contexts.get(handle)?;
        let current = context.current_offset();
        let total = context.response.content_length();
        ctx.reply(
            MessageBuilder::new(Header::new(GET_DOWNLOAD_SIZE_STATE.command_id, 3, 0))
                .push_result(ResultCode::SUCCESS)
                .push_u32(current)
                .push_u32(total)
                .build(),
        );

        tracing::debug!("called, context_id={}, {}/{}", handle, current, total);
        Ok(())
    }

    fn initialize_connection_session(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, INITIALIZE_CONNECTION_SESSION)?;
        let handle = rp.pop_u32()?;
        rp.pop_pid()?;

        self.contexts.get_mut(handle)?.initialized = true;
        ctx.reply(success(INITIALIZE_CONNECTION_SESSION));

        tracing::debug!("called, context_id={}", handle);
        Ok(())
    }

    fn begin_request(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, BEGIN_REQUEST)?;
        let handle = rp.pop_u32()?;

        let context = self.contexts.get_mut(handle)?;
        context.set_response(HttpResponse::default());

        if context.method != RequestMethod::Get {
            tracing::warn!(
                "(STUBBED) called, context_id={}, method={} not sent",
                handle,
                context.method.as_str()
            );
            ctx.reply(success(BEGIN_REQUEST));
            return Ok(());
        }

        let timeout = (self.config.enforce_timeouts && context.timeout != 0)
            .then(|| Duration::from_nanos(context.timeout));
        let request = HttpRequest {
            method: context.method,
            url: context.url_lossy(),
            headers: context.request_headers.clone(),
            timeout,
        };
        tracing::debug!("called, context_id={}, url={}", handle, request.url);

        let response = self.transport.execute(&request)?;
        context.set_response(response);
        ctx.reply(success(BEGIN_REQUEST));
        Ok(())
    }

    fn receive_data(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, RECEIVE_DATA)?;
        let handle = rp.pop_u32()?;
        let buffer_size = rp.pop_u32()?;
        let buffer = rp.pop_mapped_buffer()?;

        self.stream_body(ctx, RECEIVE_DATA, handle, buffer_size, buffer, None)
    }

    fn receive_data_timeout(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, RECEIVE_DATA_TIMEOUT)?;
        let handle = rp.pop_u32()?;
        let buffer_size = rp.pop_u32()?;
        let timeout = rp.pop_u64()?;
        let buffer = rp.pop_mapped_buffer()?;

        self.stream_body(
            ctx,
            RECEIVE_DATA_TIMEOUT,
            handle,
            buffer_size,
            buffer,
            Some(timeout),
        )
    }

    /// Copy the next chunk of the response body into `buffer`.
    ///
    /// A chunk never exceeds the guest's length word or the mapped buffer.
    /// The cursor and the recorded timeout only change once the guest write
    /// has succeeded.
    fn stream_body(
        &mut self,
        ctx: &mut HleRequestContext<'_>,
        header: Header,
        handle: u32,
        buffer_size: u32,
        buffer: MappedBuffer,
        timeout: Option<u64>,
    ) -> Result<()> {
        let context = self.contexts.get_mut(handle)?;
        let chunk = context.peek_chunk(buffer_size.min(buffer.size() as u32));
        let written = chunk.len() as u32;
        if !chunk.is_empty() {
            buffer.write(ctx.memory_mut(), chunk, 0)?;
        }

        if let Some(timeout) = timeout {
            context.timeout = timeout;
        }
        context.advance(written);

        let result = if context.download_pending() {
            RESULT_DOWNLOAD_PENDING
        } else {
            ResultCode::SUCCESS
        };
        ctx.reply(
            MessageBuilder::new(Header::new(header.command_id, 1, 0))
                .push_result(result)
                .build(),
        );

        tracing::debug!(
            "called, context_id={}, wrote {} bytes, offset={}/{}",
            handle,
            written,
            context.current_offset(),
            context.body_len()
        );
        Ok(())
    }

    fn set_proxy_default(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_PROXY_DEFAULT)?;
        let handle = rp.pop_u32()?;

        self.contexts.get_mut(handle)?.proxy_default = true;
        ctx.reply(success(SET_PROXY_DEFAULT));

        tracing::debug!("called, context_id={}", handle);
        Ok(())
    }

    fn add_request_header(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, ADD_REQUEST_HEADER)?;
        let handle = rp.pop_u32()?;
        let _name_size = rp.pop_u32()?;
        let value_size = rp.pop_u32()?;
        let name = rp.pop_static_buffer()?;
        let value_buffer = rp.pop_mapped_buffer()?;

        let context = self.contexts.get_mut(handle)?;
        let value = value_buffer.read(ctx.memory(), 0, value_size as usize)?;
        let name = String::from_utf8_lossy(&until_nul(name)).into_owned();
        let value = String::from_utf8_lossy(&until_nul(value)).into_owned();

        tracing::debug!("called, context_id={}, {}: {}", handle, name, value);
        context.request_headers.set(name, value);
        ctx.reply(success(ADD_REQUEST_HEADER));
        Ok(())
    }

    fn get_response_status_code(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, GET_RESPONSE_STATUS_CODE)?;
        let handle = rp.pop_u32()?;

        let status = self.contexts.get(handle)?.response.status_code;
        ctx.reply(status_reply(GET_RESPONSE_STATUS_CODE, status));

        tracing::debug!("called, context_id={}, status={}", handle, status);
        Ok(())
    }

    fn get_response_status_code_timeout(
        &mut self,
        ctx: &mut HleRequestContext<'_>,
    ) -> Result<()> {
        let mut rp = RequestParser::new(ctx, GET_RESPONSE_STATUS_CODE_TIMEOUT)?;
        let handle = rp.pop_u32()?;
        let timeout = rp.pop_u64()?;

        let context = self.contexts.get_mut(handle)?;
        context.timeout = timeout;
        let status = context.response.status_code;
        ctx.reply(status_reply(GET_RESPONSE_STATUS_CODE_TIMEOUT, status));

        tracing::debug!(
            "called, context_id={}, timeout={}ns, status={}",
            handle,
            timeout,
            status
        );
        Ok(())
    }

    fn set_ssl_opt(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_SSL_OPT)?;
        let handle = rp.pop_u32()?;
        let ssl_options = rp.pop_u32()?;

        self.contexts.get_mut(handle)?.ssl_options = ssl_options;
        ctx.reply(success(SET_SSL_OPT));

        tracing::debug!("called, context_id={}, ssl_options=0x{:X}", handle, ssl_options);
        Ok(())
    }

    fn set_keep_alive(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_KEEP_ALIVE)?;
        let handle = rp.pop_u32()?;
        let keep_alive = rp.pop_bool()?;

        self.contexts.get_mut(handle)?.keep_alive = keep_alive;
        ctx.reply(success(SET_KEEP_ALIVE));

        tracing::debug!("called, context_id={}, keep_alive={}", handle, keep_alive);
        Ok(())
    }
}

fn success(request: Header) -> ctr_ipc::Message {
    crate::framework::result_only(request.command_id, ResultCode::SUCCESS)
}

fn status_reply(request: Header, status: u32) -> ctr_ipc::Message {
    MessageBuilder::new(Header::new(request.command_id, 2, 0))
        .push_result(ResultCode::SUCCESS)
        .push_u32(status)
        .build()
}

/// Guest strings end at the first NUL, if any.
fn until_nul(mut bytes: Vec<u8>) -> Vec<u8> {
    if let Some(end) = bytes.iter().position(|&byte| byte == 0) {
        bytes.truncate(end);
    }
    bytes
}

const FUNCTIONS: &[FunctionInfo<HttpC>] = &[
    FunctionInfo::new(INITIALIZE, HttpC::initialize, "Initialize"),
    FunctionInfo::new(CREATE_CONTEXT, HttpC::create_context, "CreateContext"),
    FunctionInfo::new(CLOSE_CONTEXT, HttpC::close_context, "CloseContext"),
    FunctionInfo::unimplemented(0x00040040, "CancelConnection"),
    FunctionInfo::unimplemented(0x00050040, "GetRequestState"),
    FunctionInfo::new(
        GET_DOWNLOAD_SIZE_STATE,
        HttpC::get_download_size_state,
        "GetDownloadSizeState",
    ),
    FunctionInfo::unimplemented(0x00070040, "GetRequestError"),
    FunctionInfo::new(
        INITIALIZE_CONNECTION_SESSION,
        HttpC::initialize_connection_session,
        "InitializeConnectionSession",
    ),
    FunctionInfo::new(BEGIN_REQUEST, HttpC::begin_request, "BeginRequest"),
    FunctionInfo::unimplemented(0x000A0040, "BeginRequestAsync"),
    FunctionInfo::new(RECEIVE_DATA, HttpC::receive_data, "ReceiveData"),
    FunctionInfo::new(
        RECEIVE_DATA_TIMEOUT,
        HttpC::receive_data_timeout,
        "ReceiveDataTimeout",
    ),
    FunctionInfo::unimplemented(0x000D0146, "SetProxy"),
    FunctionInfo::new(SET_PROXY_DEFAULT, HttpC::set_proxy_default, "SetProxyDefault"),
    FunctionInfo::unimplemented(0x000F00C4, "SetBasicAuthorization"),
    FunctionInfo::unimplemented(0x00100080, "SetSocketBufferSize"),
    FunctionInfo::new(ADD_REQUEST_HEADER, HttpC::add_request_header, "AddRequestHeader"),
    FunctionInfo::unimplemented(0x001200C4, "AddPostDataAscii"),
    FunctionInfo::unimplemented(0x001300C4, "AddPostDataBinary"),
    FunctionInfo::unimplemented(0x00140082, "AddPostDataRaw"),
    FunctionInfo::unimplemented(0x00150080, "SetPostDataType"),
    FunctionInfo::unimplemented(0x001600C4, "SendPostDataAscii"),
    FunctionInfo::unimplemented(0x00170144, "SendPostDataAsciiTimeout"),
    FunctionInfo::unimplemented(0x001800C4, "SendPostDataBinary"),
    FunctionInfo::unimplemented(0x00190144, "SendPostDataBinaryTimeout"),
    FunctionInfo::unimplemented(0x001A0082, "SendPostDataRaw"),
    FunctionInfo::unimplemented(0x001B0102, "SendPOSTDataRawTimeout"),
    FunctionInfo::unimplemented(0x001C0080, "SetPostDataEncoding"),
    FunctionInfo::unimplemented(0x001D0040, "NotifyFinishSendPostData"),
    FunctionInfo::unimplemented(0x001E00C4, "GetResponseHeader"),
    FunctionInfo::unimplemented(0x001F0144, "GetResponseHeaderTimeout"),
    FunctionInfo::unimplemented(0x00200082, "GetResponseData"),
    FunctionInfo::unimplemented(0x00210102, "GetResponseDataTimeout"),
    FunctionInfo::new(
        GET_RESPONSE_STATUS_CODE,
        HttpC::get_response_status_code,
        "GetResponseStatusCode",
    ),
    FunctionInfo::new(
        GET_RESPONSE_STATUS_CODE_TIMEOUT,
        HttpC::get_response_status_code_timeout,
        "GetResponseStatusCodeTimeout",
    ),
    FunctionInfo::unimplemented(0x00240082, "AddTrustedRootCA"),
    FunctionInfo::unimplemented(0x00250080, "AddDefaultCert"),
    FunctionInfo::unimplemented(0x00260080, "SelectRootCertChain"),
    FunctionInfo::unimplemented(0x002700C4, "SetClientCert"),
    FunctionInfo::new(SET_SSL_OPT, HttpC::set_ssl_opt, "SetSSLOpt"),
    FunctionInfo::unimplemented(0x002C0080, "SetSSLClearOpt"),
    FunctionInfo::unimplemented(0x002D0000, "CreateRootCertChain"),
    FunctionInfo::unimplemented(0x002E0040, "DestroyRootCertChain"),
    FunctionInfo::unimplemented(0x002F0082, "RootCertChainAddCert"),
    FunctionInfo::unimplemented(0x00300080, "RootCertChainAddDefaultCert"),
    FunctionInfo::unimplemented(0x00310080, "RootCertChainRemoveCert"),
    FunctionInfo::unimplemented(0x00320084, "OpenClientCertContext"),
    FunctionInfo::unimplemented(0x00330040, "OpenDefaultClientCertContext"),
    FunctionInfo::unimplemented(0x00340040, "CloseClientCertContext"),
    FunctionInfo::unimplemented(0x00350186, "SetDefaultProxy"),
    FunctionInfo::unimplemented(0x00360000, "ClearDNSCache"),
    FunctionInfo::new(SET_KEEP_ALIVE, HttpC::set_keep_alive, "SetKeepAlive"),
    FunctionInfo::unimplemented(0x003800C0, "SetPostDataTypeSize"),
    FunctionInfo::unimplemented(0x00390000, "Finalize"),
];

impl ServiceFramework for HttpC {
    const NAME: &'static str = "http:C";
    const MAX_SESSIONS: u32 = 14;

    fn functions() -> &'static [FunctionInfo<Self>] {
        FUNCTIONS
    }
}
