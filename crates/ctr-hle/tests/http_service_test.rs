use ctr_hle::http::{self, HeaderList, HttpRequest, HttpResponse, HttpTransport, RequestMethod};
use ctr_hle::{Error, HleService, HttpC, HttpConfig};
use ctr_ipc::{
    GuestMemory, HandleTable, HleRequestContext, MappedBufferPermissions, MessageBuilder,
    SharedMemory, VAddr,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SUCCESS: u32 = 0;
const CONTEXT_ABSENT: u32 = 0xD8A0A066;
const DOWNLOAD_PENDING: u32 = 0xD840A02B;

/// Records every request and answers with a fixed response, or fails when
/// none is set.
#[derive(Clone, Default)]
struct RecordingTransport {
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    response: Arc<Mutex<Option<HttpResponse>>>,
}

impl RecordingTransport {
    fn answering(status_code: u32, body: &[u8]) -> Self {
        let transport = Self::default();
        transport.respond(status_code, body);
        transport
    }

    fn respond(&self, status_code: u32, body: &[u8]) {
        let headers: HeaderList = [("Content-Length", body.len().to_string())]
            .into_iter()
            .collect();
        *self.response.lock().unwrap() = Some(HttpResponse {
            status_code,
            headers,
            body: body.to_vec(),
        });
    }

    /// Answer with `body` and no `Content-Length` header.
    fn respond_without_length(&self, status_code: u32, body: &[u8]) {
        *self.response.lock().unwrap() = Some(HttpResponse {
            status_code,
            headers: HeaderList::new(),
            body: body.to_vec(),
        });
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for RecordingTransport {
    fn execute(&self, request: &HttpRequest) -> ctr_hle::Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Http("connection refused".to_string()))
    }
}

/// A guest process talking to one `http:C` instance.
struct Guest {
    memory: GuestMemory,
    handles: HandleTable,
    service: HttpC,
    next_address: VAddr,
}

impl Guest {
    fn new(transport: RecordingTransport) -> Self {
        Self::with_config(transport, HttpConfig::default())
    }

    fn with_config(transport: RecordingTransport, config: HttpConfig) -> Self {
        Self {
            memory: GuestMemory::new(),
            handles: HandleTable::new(),
            service: HttpC::new(Box::new(transport), config),
            next_address: 0x0010_0000,
        }
    }

    fn put(&mut self, bytes: &[u8]) -> VAddr {
        let address = self.next_address;
        self.memory.map(address, bytes.to_vec()).unwrap();
        self.next_address += 0x1000;
        address
    }

    fn read(&self, address: VAddr, len: usize) -> Vec<u8> {
        self.memory.read(address, len).unwrap()
    }

    fn call(&mut self, command: Vec<u32>) -> Vec<u32> {
        let mut ctx =
            HleRequestContext::new(command, &mut self.memory, &mut self.handles).unwrap();
        self.service.handle_sync_request(&mut ctx);
        ctx.take_response().unwrap().encode()
    }

    fn initialize(&mut self, block: Arc<SharedMemory>) -> Vec<u32> {
        let handle = self.handles.create(block);
        self.call(
            MessageBuilder::new(http::INITIALIZE)
                .push_u32(0x1000)
                .push_calling_pid(0)
                .push_copy_handles(&[handle])
                .build()
                .encode(),
        )
    }

    fn create_context_with(&mut self, url: &[u8], method: RequestMethod) -> Vec<u32> {
        let address = self.put(url);
        self.call(
            MessageBuilder::new(http::CREATE_CONTEXT)
                .push_u32(url.len() as u32)
                .push_u32(method as u32)
                .push_mapped_buffer(MappedBufferPermissions::Read, url.len() as u32, address)
                .build()
                .encode(),
        )
    }

    fn create_context(&mut self, url: &str) -> u32 {
        let reply = self.create_context_with(url.as_bytes(), RequestMethod::Get);
        assert_eq!(reply[..2], [0x00020080, SUCCESS]);
        reply[2]
    }

    fn simple(&mut self, header: ctr_ipc::Header, args: &[u32]) -> Vec<u32> {
        let builder = args
            .iter()
            .fold(MessageBuilder::new(header), |builder, &arg| builder.push_u32(arg));
        self.call(builder.build().encode())
    }

    fn add_request_header(&mut self, handle: u32, name: &str, value: &str) -> Vec<u32> {
        let name = format!("{}\0", name);
        let value = format!("{}\0", value);
        let name_address = self.put(name.as_bytes());
        let value_address = self.put(value.as_bytes());
        self.call(
            MessageBuilder::new(http::ADD_REQUEST_HEADER)
                .push_u32(handle)
                .push_u32(name.len() as u32)
                .push_u32(value.len() as u32)
                .push_static_buffer(3, name.len() as u32, name_address)
                .push_mapped_buffer(
                    MappedBufferPermissions::Read,
                    value.len() as u32,
                    value_address,
                )
                .build()
                .encode(),
        )
    }

    /// Returns the reply and the guest buffer's contents afterwards.
    fn receive_data(&mut self, handle: u32, size: u32) -> (Vec<u32>, Vec<u8>) {
        let address = self.put(&vec![0xAA; size as usize]);
        let reply = self.call(
            MessageBuilder::new(http::RECEIVE_DATA)
                .push_u32(handle)
                .push_u32(size)
                .push_mapped_buffer(MappedBufferPermissions::Write, size, address)
                .build()
                .encode(),
        );
        (reply, self.read(address, size as usize))
    }

    fn receive_data_timeout(&mut self, handle: u32, size: u32, timeout: u64) -> Vec<u32> {
        let address = self.put(&vec![0; size as usize]);
        self.call(
            MessageBuilder::new(http::RECEIVE_DATA_TIMEOUT)
                .push_u32(handle)
                .push_u32(size)
                .push_u64(timeout)
                .push_mapped_buffer(MappedBufferPermissions::Write, size, address)
                .build()
                .encode(),
        )
    }
}

#[test]
fn initialize_create_and_close() {
    let mut guest = Guest::new(RecordingTransport::default());
    let block = Arc::new(SharedMemory::new(0x1000, "guest block"));

    assert_eq!(guest.initialize(Arc::clone(&block)), vec![0x00010040, SUCCESS]);
    assert_eq!(block.name(), "HTTP_C:shared_memory");
    assert!(Arc::ptr_eq(guest.service.shared_memory().unwrap(), &block));

    assert_eq!(
        guest.create_context_with(b"example.com", RequestMethod::Get),
        vec![0x00020080, SUCCESS, 1]
    );
    assert_eq!(guest.simple(http::CLOSE_CONTEXT, &[1]), vec![0x00030040, SUCCESS]);
    assert_eq!(
        guest.simple(http::CLOSE_CONTEXT, &[1]),
        vec![0x00030040, CONTEXT_ABSENT]
    );
}

#[test]
fn body_streams_in_guest_sized_chunks() {
    let transport = RecordingTransport::answering(200, b"HELLO");
    let mut guest = Guest::new(transport);
    let handle = guest.create_context("http://example.com/hello");

    assert_eq!(guest.simple(http::BEGIN_REQUEST, &[handle]), vec![0x00090040, SUCCESS]);

    let (reply, bytes) = guest.receive_data(handle, 3);
    assert_eq!(reply, vec![0x000B0040, DOWNLOAD_PENDING]);
    assert_eq!(bytes, b"HEL");

    let (reply, bytes) = guest.receive_data(handle, 3);
    assert_eq!(reply, vec![0x000B0040, SUCCESS]);
    assert_eq!(bytes, [b'L', b'O', 0xAA]);

    assert_eq!(
        guest.simple(http::GET_DOWNLOAD_SIZE_STATE, &[handle]),
        vec![0x000600C0, SUCCESS, 5, 5]
    );
}

#[test]
fn receive_into_short_buffer_streams_partially() {
    let transport = RecordingTransport::answering(200, b"HELLO");
    let mut guest = Guest::new(transport);
    let handle = guest.create_context("http://example.com/hello");
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    // Length word says 8, but only 3 bytes are mapped.
    let address = guest.put(&[0xAA; 3]);
    let reply = guest.call(
        MessageBuilder::new(http::RECEIVE_DATA)
            .push_u32(handle)
            .push_u32(8)
            .push_mapped_buffer(MappedBufferPermissions::Write, 3, address)
            .build()
            .encode(),
    );
    assert_eq!(reply, vec![0x000B0040, DOWNLOAD_PENDING]);
    assert_eq!(guest.read(address, 3), b"HEL");
    assert_eq!(guest.service.contexts().get(handle).unwrap().current_offset(), 3);

    let (reply, bytes) = guest.receive_data(handle, 3);
    assert_eq!(reply, vec![0x000B0040, SUCCESS]);
    assert_eq!(bytes, [b'L', b'O', 0xAA]);
}

#[test]
fn size_state_without_content_length_reports_zero_total() {
    let transport = RecordingTransport::default();
    transport.respond_without_length(200, b"abcdef");
    let mut guest = Guest::new(transport);
    let handle = guest.create_context("http://example.com/chunked");
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    let (reply, bytes) = guest.receive_data(handle, 2);
    assert_eq!(reply, vec![0x000B0040, DOWNLOAD_PENDING]);
    assert_eq!(bytes, b"ab");
    assert_eq!(
        guest.simple(http::GET_DOWNLOAD_SIZE_STATE, &[handle]),
        vec![0x000600C0, SUCCESS, 2, 0]
    );
}

#[test]
fn failed_write_leaves_cursor_and_timeout_alone() {
    let transport = RecordingTransport::answering(200, b"abcdef");
    let mut guest = Guest::new(transport);
    let handle = guest.create_context("http://example.com/");
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    let address = guest.put(&[0x55; 4]);
    let reply = guest.call(
        MessageBuilder::new(http::RECEIVE_DATA_TIMEOUT)
            .push_u32(handle)
            .push_u32(4)
            .push_u64(1_000)
            .push_mapped_buffer(MappedBufferPermissions::Read, 4, address)
            .build()
            .encode(),
    );
    assert_eq!(reply, vec![0x000C0040, SUCCESS]);
    assert_eq!(guest.read(address, 4), vec![0x55; 4]);

    let context = guest.service.contexts().get(handle).unwrap();
    assert_eq!(context.current_offset(), 0);
    assert_eq!(context.timeout, 0);
}

#[test]
fn repeated_header_names_keep_the_last_value() {
    let transport = RecordingTransport::answering(200, b"");
    let mut guest = Guest::new(transport.clone());
    let handle = guest.create_context("http://example.com/");

    assert_eq!(
        guest.add_request_header(handle, "User-Agent", "A"),
        vec![0x00110040, SUCCESS]
    );
    guest.add_request_header(handle, "User-Agent", "B");
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let user_agents: Vec<_> = requests[0]
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("User-Agent"))
        .collect();
    assert_eq!(user_agents, vec![("User-Agent", "B")]);
}

#[test]
fn header_names_compare_case_insensitively() {
    let transport = RecordingTransport::answering(200, b"");
    let mut guest = Guest::new(transport.clone());
    let handle = guest.create_context("http://example.com/");

    guest.add_request_header(handle, "Accept", "text/html");
    guest.add_request_header(handle, "X-Token", "1");
    guest.add_request_header(handle, "accept", "*/*");
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    let request = &transport.requests()[0];
    let headers: Vec<_> = request.headers.iter().collect();
    assert_eq!(headers, vec![("accept", "*/*"), ("X-Token", "1")]);
}

#[test]
fn handles_are_never_reused() {
    let mut guest = Guest::new(RecordingTransport::default());
    assert_eq!(guest.create_context("a"), 1);
    assert_eq!(guest.create_context("b"), 2);
    guest.simple(http::CLOSE_CONTEXT, &[1]);
    assert_eq!(guest.create_context("c"), 3);
    assert_eq!(guest.service.contexts().len(), 2);
}

#[test]
fn receive_on_unknown_handle_leaves_buffer_untouched() {
    let mut guest = Guest::new(RecordingTransport::default());
    let (reply, bytes) = guest.receive_data(999, 16);
    assert_eq!(reply, vec![0x000B0040, CONTEXT_ABSENT]);
    assert_eq!(bytes, vec![0xAA; 16]);
    assert!(guest.service.contexts().is_empty());
}

#[test]
fn not_found_with_empty_body() {
    let transport = RecordingTransport::answering(404, b"");
    let mut guest = Guest::new(transport);
    let handle = guest.create_context("http://example.com/missing");

    guest.simple(http::BEGIN_REQUEST, &[handle]);
    assert_eq!(
        guest.simple(http::GET_RESPONSE_STATUS_CODE, &[handle]),
        vec![0x00220080, SUCCESS, 404]
    );

    let (reply, bytes) = guest.receive_data(handle, 100);
    assert_eq!(reply, vec![0x000B0040, SUCCESS]);
    assert_eq!(bytes, vec![0xAA; 100]);
}

#[test]
fn chunk_partitions_reassemble_the_body() {
    let body = b"streaming body!";
    let transport = RecordingTransport::answering(200, body);
    let mut guest = Guest::new(transport);
    let handle = guest.create_context("http://example.com/stream");
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    let sizes = [1u32, 4, 2, 10];
    let mut received = Vec::new();
    for (i, &size) in sizes.iter().enumerate() {
        let (reply, bytes) = guest.receive_data(handle, size);
        let expected = if i + 1 == sizes.len() {
            SUCCESS
        } else {
            DOWNLOAD_PENDING
        };
        assert_eq!(reply[1], expected, "chunk {}", i);

        let remaining = body.len() - received.len();
        received.extend_from_slice(&bytes[..(size as usize).min(remaining)]);
        let context = guest.service.contexts().get(handle).unwrap();
        assert!(context.current_offset() <= context.body_len());
    }
    assert_eq!(received, body);
}

#[test]
fn receive_before_begin_reads_nothing() {
    let mut guest = Guest::new(RecordingTransport::default());
    let handle = guest.create_context("http://example.com/");

    let (reply, bytes) = guest.receive_data(handle, 8);
    assert_eq!(reply, vec![0x000B0040, SUCCESS]);
    assert_eq!(bytes, vec![0xAA; 8]);
    assert_eq!(
        guest.simple(http::GET_DOWNLOAD_SIZE_STATE, &[handle]),
        vec![0x000600C0, SUCCESS, 0, 0]
    );
}

#[test]
fn setters_record_their_fields() {
    let mut guest = Guest::new(RecordingTransport::default());
    let handle = guest.create_context("http://example.com/");

    let initialize_session = MessageBuilder::new(http::INITIALIZE_CONNECTION_SESSION)
        .push_u32(handle)
        .push_calling_pid(0)
        .build()
        .encode();
    assert_eq!(guest.call(initialize_session), vec![0x00080040, SUCCESS]);
    assert_eq!(
        guest.simple(http::SET_PROXY_DEFAULT, &[handle]),
        vec![0x000E0040, SUCCESS]
    );
    assert_eq!(
        guest.simple(http::SET_SSL_OPT, &[handle, 0x200]),
        vec![0x002B0040, SUCCESS]
    );
    assert_eq!(
        guest.simple(http::SET_KEEP_ALIVE, &[handle, 1]),
        vec![0x00370040, SUCCESS]
    );
    // Repeating a setter with the same value changes nothing.
    guest.simple(http::SET_SSL_OPT, &[handle, 0x200]);

    let context = guest.service.contexts().get(handle).unwrap();
    assert!(context.initialized);
    assert!(context.proxy_default);
    assert!(context.keep_alive);
    assert_eq!(context.ssl_options, 0x200);
}

#[test]
fn every_context_command_rejects_unknown_handles() {
    let mut guest = Guest::new(RecordingTransport::answering(200, b"x"));
    let handle = guest.create_context("http://example.com/");
    guest.simple(http::CLOSE_CONTEXT, &[handle]);

    let cases = [
        (http::GET_DOWNLOAD_SIZE_STATE, vec![handle]),
        (http::BEGIN_REQUEST, vec![handle]),
        (http::SET_PROXY_DEFAULT, vec![handle]),
        (http::GET_RESPONSE_STATUS_CODE, vec![handle]),
        (http::GET_RESPONSE_STATUS_CODE_TIMEOUT, vec![handle, 1, 0]),
        (http::SET_SSL_OPT, vec![handle, 1]),
        (http::SET_KEEP_ALIVE, vec![handle, 1]),
    ];
    for (header, args) in cases {
        let reply = guest.simple(header, &args);
        assert_eq!(
            reply,
            vec![(u32::from(header.command_id) << 16) | 0x40, CONTEXT_ABSENT]
        );
    }

    assert_eq!(
        guest.add_request_header(handle, "Accept", "*/*"),
        vec![0x00110040, CONTEXT_ABSENT]
    );
    assert_eq!(
        guest.receive_data_timeout(handle, 4, 1),
        vec![0x000C0040, CONTEXT_ABSENT]
    );
    let initialize_session = MessageBuilder::new(http::INITIALIZE_CONNECTION_SESSION)
        .push_u32(handle)
        .push_calling_pid(0)
        .build()
        .encode();
    assert_eq!(guest.call(initialize_session), vec![0x00080040, CONTEXT_ABSENT]);
    assert!(guest.service.contexts().is_empty());
}

#[test]
fn unknown_handles_leave_live_contexts_untouched() {
    let mut guest = Guest::new(RecordingTransport::answering(200, b"payload"));
    let closed = guest.create_context("http://example.com/closed");
    let sibling = guest.create_context("http://example.com/sibling");
    guest.add_request_header(sibling, "Accept", "*/*");
    guest.simple(http::SET_SSL_OPT, &[sibling, 0x200]);
    guest.simple(http::BEGIN_REQUEST, &[sibling]);
    guest.receive_data(sibling, 2);
    guest.simple(http::CLOSE_CONTEXT, &[closed]);
    let snapshot = guest.service.contexts().get(sibling).unwrap().clone();

    for (header, args) in [
        (http::CLOSE_CONTEXT, vec![closed]),
        (http::GET_DOWNLOAD_SIZE_STATE, vec![closed]),
        (http::BEGIN_REQUEST, vec![closed]),
        (http::SET_PROXY_DEFAULT, vec![closed]),
        (http::GET_RESPONSE_STATUS_CODE, vec![closed]),
        (http::GET_RESPONSE_STATUS_CODE_TIMEOUT, vec![closed, 5, 0]),
        (http::SET_SSL_OPT, vec![closed, 1]),
        (http::SET_KEEP_ALIVE, vec![closed, 1]),
    ] {
        assert_eq!(guest.simple(header, &args)[1], CONTEXT_ABSENT);
    }
    guest.add_request_header(closed, "Accept", "text/html");
    guest.receive_data(closed, 4);
    guest.receive_data_timeout(closed, 4, 9);
    guest.call(
        MessageBuilder::new(http::INITIALIZE_CONNECTION_SESSION)
            .push_u32(closed)
            .push_calling_pid(0)
            .build()
            .encode(),
    );

    assert_eq!(guest.service.contexts().len(), 1);
    assert_eq!(guest.service.contexts().get(sibling).unwrap(), &snapshot);
}

#[test]
fn timeout_commands_record_the_latest_value() {
    let transport = RecordingTransport::answering(200, b"abcdef");
    let mut guest = Guest::new(transport);
    let handle = guest.create_context("http://example.com/");
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    assert_eq!(
        guest.receive_data_timeout(handle, 4, 1_000),
        vec![0x000C0040, DOWNLOAD_PENDING]
    );
    assert_eq!(guest.service.contexts().get(handle).unwrap().timeout, 1_000);

    let reply = guest.call(
        MessageBuilder::new(http::GET_RESPONSE_STATUS_CODE_TIMEOUT)
            .push_u32(handle)
            .push_u64(0x0000_0002_0000_0000)
            .build()
            .encode(),
    );
    assert_eq!(reply, vec![0x00230080, SUCCESS, 200]);
    assert_eq!(
        guest.service.contexts().get(handle).unwrap().timeout,
        0x0000_0002_0000_0000
    );
}

#[test]
fn timeouts_bound_requests_only_when_enforced() {
    let transport = RecordingTransport::answering(200, b"");
    let config = HttpConfig {
        enforce_timeouts: true,
        ..HttpConfig::default()
    };
    let mut guest = Guest::with_config(transport.clone(), config);
    let handle = guest.create_context("http://example.com/");
    guest.simple(http::BEGIN_REQUEST, &[handle]);
    guest.call(
        MessageBuilder::new(http::GET_RESPONSE_STATUS_CODE_TIMEOUT)
            .push_u32(handle)
            .push_u64(5_000_000_000)
            .build()
            .encode(),
    );
    guest.simple(http::BEGIN_REQUEST, &[handle]);

    let timeouts: Vec<_> = transport.requests().iter().map(|r| r.timeout).collect();
    assert_eq!(timeouts, vec![None, Some(Duration::from_secs(5))]);

    let transport = RecordingTransport::answering(200, b"");
    let mut guest = Guest::new(transport.clone());
    let handle = guest.create_context("http://example.com/");
    guest.receive_data_timeout(handle, 4, 5_000_000_000);
    guest.simple(http::BEGIN_REQUEST, &[handle]);
    assert_eq!(transport.requests()[0].timeout, None);
}

#[test]
fn transport_failure_is_masked_and_leaves_no_response() {
    let transport = RecordingTransport::answering(200, b"old body");
    let mut guest = Guest::new(transport.clone());
    let handle = guest.create_context("http://example.com/");
    guest.simple(http::BEGIN_REQUEST, &[handle]);
    guest.receive_data(handle, 3);

    *transport.response.lock().unwrap() = None;
    assert_eq!(guest.simple(http::BEGIN_REQUEST, &[handle]), vec![0x00090040, SUCCESS]);

    let context = guest.service.contexts().get(handle).unwrap();
    assert_eq!(context.response, HttpResponse::default());
    assert_eq!(context.current_offset(), 0);
    assert_eq!(
        guest.simple(http::GET_RESPONSE_STATUS_CODE, &[handle]),
        vec![0x00220080, SUCCESS, 0]
    );
}

#[test]
fn begin_request_restarts_the_stream() {
    let transport = RecordingTransport::answering(200, b"first");
    let mut guest = Guest::new(transport.clone());
    let handle = guest.create_context("http://example.com/");
    guest.simple(http::BEGIN_REQUEST, &[handle]);
    guest.receive_data(handle, 5);

    transport.respond(200, b"second!");
    guest.simple(http::BEGIN_REQUEST, &[handle]);
    let (reply, bytes) = guest.receive_data(handle, 7);
    assert_eq!(reply, vec![0x000B0040, SUCCESS]);
    assert_eq!(bytes, b"second!");
}

#[test]
fn only_get_reaches_the_transport() {
    let transport = RecordingTransport::answering(200, b"body");
    let mut guest = Guest::new(transport.clone());
    let reply = guest.create_context_with(b"http://example.com/form", RequestMethod::Post);
    let handle = reply[2];

    assert_eq!(guest.simple(http::BEGIN_REQUEST, &[handle]), vec![0x00090040, SUCCESS]);
    assert!(transport.requests().is_empty());
    let (reply, _) = guest.receive_data(handle, 4);
    assert_eq!(reply, vec![0x000B0040, SUCCESS]);
}

#[test]
fn url_stops_at_the_first_nul() {
    let transport = RecordingTransport::answering(200, b"");
    let mut guest = Guest::new(transport.clone());
    let reply = guest.create_context_with(b"http://example.com/\0\0junk", RequestMethod::Get);
    guest.simple(http::BEGIN_REQUEST, &[reply[2]]);
    assert_eq!(transport.requests()[0].url, "http://example.com/");
    assert_eq!(transport.requests()[0].method, RequestMethod::Get);
}

#[test]
fn invalid_method_is_masked_without_creating_a_context() {
    let mut guest = Guest::new(RecordingTransport::default());
    let address = guest.put(b"http://example.com/");
    let reply = guest.call(
        MessageBuilder::new(http::CREATE_CONTEXT)
            .push_u32(19)
            .push_u32(9)
            .push_mapped_buffer(MappedBufferPermissions::Read, 19, address)
            .build()
            .encode(),
    );
    assert_eq!(reply, vec![0x00020040, SUCCESS]);
    assert!(guest.service.contexts().is_empty());
    assert_eq!(guest.create_context("http://example.com/"), 1);
}

#[test]
fn reserved_commands_reply_success() {
    let mut guest = Guest::new(RecordingTransport::default());
    // CancelConnection and Finalize.
    assert_eq!(guest.call(vec![0x00040040, 1]), vec![0x00040040, SUCCESS]);
    assert_eq!(guest.call(vec![0x00390000]), vec![0x00390040, SUCCESS]);
    // Unlisted code.
    assert_eq!(guest.call(vec![0x00FF0000]), vec![0x00FF0040, SUCCESS]);
}
