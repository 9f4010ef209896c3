//! The `mic:u` service.
//!
//! No audio is captured; the service records what the guest configures and
//! reports it back.

use crate::framework::{result_only, FunctionInfo, ServiceFramework};
use crate::shared_memory::SharedMemoryLatch;
use crate::Result;
use ctr_ipc::{
    Event, Header, HleRequestContext, MessageBuilder, RequestParser, ResetType, ResultCode,
    SharedMemory,
};
use std::sync::Arc;

pub const MAP_SHARED_MEM: Header = Header::new(0x1, 1, 2);
pub const UNMAP_SHARED_MEM: Header = Header::new(0x2, 0, 0);
pub const START_SAMPLING: Header = Header::new(0x3, 5, 0);
pub const ADJUST_SAMPLING: Header = Header::new(0x4, 1, 0);
pub const STOP_SAMPLING: Header = Header::new(0x5, 0, 0);
pub const IS_SAMPLING: Header = Header::new(0x6, 0, 0);
pub const GET_BUFFER_FULL_EVENT: Header = Header::new(0x7, 0, 0);
pub const SET_GAIN: Header = Header::new(0x8, 1, 0);
pub const GET_GAIN: Header = Header::new(0x9, 0, 0);
pub const SET_POWER: Header = Header::new(0xA, 1, 0);
pub const GET_POWER: Header = Header::new(0xB, 0, 0);
pub const SET_IIR_FILTER_MIC: Header = Header::new(0xC, 1, 2);
pub const SET_CLAMP: Header = Header::new(0xD, 1, 0);
pub const GET_CLAMP: Header = Header::new(0xE, 0, 0);
pub const SET_ALLOW_SHELL_CLOSED: Header = Header::new(0xF, 1, 0);
pub const SET_CLIENT_VERSION: Header = Header::new(0x10, 1, 0);

const SHARED_MEMORY_NAME: &str = "MIC_U:shared_memory";

/// Sample format written into the shared buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Pcm8 = 0,
    Pcm16 = 1,
    Pcm8Signed = 2,
    Pcm16Signed = 3,
}

impl TryFrom<u8> for Encoding {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(Encoding::Pcm8),
            1 => Ok(Encoding::Pcm16),
            2 => Ok(Encoding::Pcm8Signed),
            3 => Ok(Encoding::Pcm16Signed),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRate {
    #[default]
    Rate32730 = 0,
    Rate16360 = 1,
    Rate10910 = 2,
    Rate8180 = 3,
}

impl SampleRate {
    /// Rate in samples per second.
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Rate32730 => 32730,
            SampleRate::Rate16360 => 16360,
            SampleRate::Rate10910 => 10910,
            SampleRate::Rate8180 => 8180,
        }
    }
}

impl TryFrom<u8> for SampleRate {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(SampleRate::Rate32730),
            1 => Ok(SampleRate::Rate16360),
            2 => Ok(SampleRate::Rate10910),
            3 => Ok(SampleRate::Rate8180),
            other => Err(other),
        }
    }
}

/// Parameters of the most recent `StartSampling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplingParams {
    pub encoding: Encoding,
    pub sample_rate: SampleRate,
    /// Offset of the audio data inside shared memory.
    pub buffer_offset: i32,
    pub buffer_size: u32,
    pub buffer_loop: bool,
}

/// HLE implementation of the `mic:u` service.
pub struct MicU {
    shared_memory: SharedMemoryLatch,
    buffer_full_event: Arc<Event>,
    sampling: SamplingParams,
    is_sampling: bool,
    gain: u8,
    power: bool,
    clamp: bool,
    allow_shell_closed: bool,
    client_version: u32,
}

impl Default for MicU {
    fn default() -> Self {
        Self::new()
    }
}

impl MicU {
    /// Service with sampling stopped, gain 0 and power off.
    pub fn new() -> Self {
        Self {
            shared_memory: SharedMemoryLatch::new(),
            buffer_full_event: Arc::new(Event::new(
                ResetType::OneShot,
                "MIC_U::buffer_full_event",
            )),
            sampling: SamplingParams::default(),
            is_sampling: false,
            gain: 0,
            power: false,
            clamp: false,
            allow_shell_closed: false,
            client_version: 0,
        }
    }

    /// Shared memory block latched by `MapSharedMem`, if any.
    pub fn shared_memory(&self) -> Option<&Arc<SharedMemory>> {
        self.shared_memory.get()
    }

    /// Event handed out by `GetBufferFullEvent`.
    pub fn buffer_full_event(&self) -> &Arc<Event> {
        &self.buffer_full_event
    }

    /// Parameters recorded by the last `StartSampling`.
    pub fn sampling(&self) -> SamplingParams {
        self.sampling
    }

    /// Whether sampling is running.
    pub fn is_sampling(&self) -> bool {
        self.is_sampling
    }

    /// Gain set by `SetGain`.
    pub fn gain(&self) -> u8 {
        self.gain
    }

    /// Power flag set by `SetPower`.
    pub fn power(&self) -> bool {
        self.power
    }

    /// Clamp flag set by `SetClamp`.
    pub fn clamp(&self) -> bool {
        self.clamp
    }

    /// Whether sampling may continue with the shell closed.
    pub fn allow_shell_closed(&self) -> bool {
        self.allow_shell_closed
    }

    /// SDK version reported by `SetClientVersion`.
    pub fn client_version(&self) -> u32 {
        self.client_version
    }

    fn map_shared_mem(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, MAP_SHARED_MEM)?;
        let size = rp.pop_u32()?;
        let block = rp.pop_object::<SharedMemory>()?;

        if block.is_none() {
            tracing::warn!("called with an invalid shared memory handle");
        }
        self.shared_memory.latch(block, SHARED_MEMORY_NAME);
        ctx.reply(result_only(MAP_SHARED_MEM.command_id, ResultCode::SUCCESS));

        tracing::debug!("called, size=0x{:X}", size);
        Ok(())
    }

    fn unmap_shared_mem(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        RequestParser::new(ctx, UNMAP_SHARED_MEM)?;
        self.shared_memory.release();
        ctx.reply(result_only(UNMAP_SHARED_MEM.command_id, ResultCode::SUCCESS));

        tracing::debug!("called");
        Ok(())
    }

    fn start_sampling(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, START_SAMPLING)?;
        let params = SamplingParams {
            encoding: rp.pop_enum_u8("Encoding")?,
            sample_rate: rp.pop_enum_u8("SampleRate")?,
            buffer_offset: rp.pop_u32()? as i32,
            buffer_size: rp.pop_u32()?,
            buffer_loop: rp.pop_bool()?,
        };

        self.sampling = params;
        self.is_sampling = true;
        ctx.reply(result_only(START_SAMPLING.command_id, ResultCode::SUCCESS));

        tracing::warn!(
            "(STUBBED) called, encoding={:?}, sample_rate={}, buffer_offset={}, buffer_size={}, buffer_loop={}",
            params.encoding,
            params.sample_rate.hz(),
            params.buffer_offset,
            params.buffer_size,
            params.buffer_loop
        );
        Ok(())
    }

    fn adjust_sampling(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, ADJUST_SAMPLING)?;
        let sample_rate: SampleRate = rp.pop_enum_u8("SampleRate")?;

        self.sampling.sample_rate = sample_rate;
        ctx.reply(result_only(ADJUST_SAMPLING.command_id, ResultCode::SUCCESS));

        tracing::warn!("(STUBBED) called, sample_rate={}", sample_rate.hz());
        Ok(())
    }

    fn stop_sampling(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        RequestParser::new(ctx, STOP_SAMPLING)?;
        self.is_sampling = false;
        ctx.reply(result_only(STOP_SAMPLING.command_id, ResultCode::SUCCESS));

        tracing::warn!("(STUBBED) called");
        Ok(())
    }

    fn is_sampling_cmd(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        RequestParser::new(ctx, IS_SAMPLING)?;
        ctx.reply(value_reply(IS_SAMPLING, u32::from(self.is_sampling)));

        tracing::warn!("(STUBBED) called");
        Ok(())
    }

    fn get_buffer_full_event(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        RequestParser::new(ctx, GET_BUFFER_FULL_EVENT)?;
        let handle = ctx
            .handles_mut()
            .create(Arc::clone(&self.buffer_full_event));
        ctx.reply(
            MessageBuilder::new(Header::new(GET_BUFFER_FULL_EVENT.command_id, 1, 2))
                .push_result(ResultCode::SUCCESS)
                .push_copy_handles(&[handle])
                .build(),
        );

        tracing::warn!("(STUBBED) called, handle=0x{:08X}", handle.0);
        Ok(())
    }

    fn set_gain(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_GAIN)?;
        self.gain = rp.pop_u8()?;
        ctx.reply(result_only(SET_GAIN.command_id, ResultCode::SUCCESS));

        tracing::warn!("(STUBBED) called, gain={}", self.gain);
        Ok(())
    }

    fn get_gain(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        RequestParser::new(ctx, GET_GAIN)?;
        ctx.reply(value_reply(GET_GAIN, u32::from(self.gain)));

        tracing::warn!("(STUBBED) called");
        Ok(())
    }

    fn set_power(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_POWER)?;
        self.power = rp.pop_bool()?;
        ctx.reply(result_only(SET_POWER.command_id, ResultCode::SUCCESS));

        tracing::warn!("(STUBBED) called, power={}", self.power);
        Ok(())
    }

    fn get_power(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        RequestParser::new(ctx, GET_POWER)?;
        ctx.reply(value_reply(GET_POWER, u32::from(self.power)));

        tracing::warn!("(STUBBED) called");
        Ok(())
    }

    fn set_iir_filter_mic(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_IIR_FILTER_MIC)?;
        let size = rp.pop_u32()?;
        let buffer = rp.pop_mapped_buffer()?;
        ctx.reply(result_only(SET_IIR_FILTER_MIC.command_id, ResultCode::SUCCESS));

        tracing::warn!(
            "(STUBBED) called, size=0x{:X}, buffer=0x{:08X}",
            size,
            buffer.address()
        );
        Ok(())
    }

    fn set_clamp(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_CLAMP)?;
        self.clamp = rp.pop_bool()?;
        ctx.reply(result_only(SET_CLAMP.command_id, ResultCode::SUCCESS));

        tracing::warn!("(STUBBED) called, clamp={}", self.clamp);
        Ok(())
    }

    fn get_clamp(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        RequestParser::new(ctx, GET_CLAMP)?;
        ctx.reply(value_reply(GET_CLAMP, u32::from(self.clamp)));

        tracing::warn!("(STUBBED) called");
        Ok(())
    }

    fn set_allow_shell_closed(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_ALLOW_SHELL_CLOSED)?;
        self.allow_shell_closed = rp.pop_bool()?;
        ctx.reply(result_only(
            SET_ALLOW_SHELL_CLOSED.command_id,
            ResultCode::SUCCESS,
        ));

        tracing::warn!(
            "(STUBBED) called, allow_shell_closed={}",
            self.allow_shell_closed
        );
        Ok(())
    }

    fn set_client_version(&mut self, ctx: &mut HleRequestContext<'_>) -> Result<()> {
        let mut rp = RequestParser::new(ctx, SET_CLIENT_VERSION)?;
        self.client_version = rp.pop_u32()?;
        ctx.reply(result_only(SET_CLIENT_VERSION.command_id, ResultCode::SUCCESS));

        tracing::warn!("(STUBBED) called, version: 0x{:08X}", self.client_version);
        Ok(())
    }
}

fn value_reply(request: Header, value: u32) -> ctr_ipc::Message {
    MessageBuilder::new(Header::new(request.command_id, 2, 0))
        .push_result(ResultCode::SUCCESS)
        .push_u32(value)
        .build()
}

const FUNCTIONS: &[FunctionInfo<MicU>] = &[
    FunctionInfo::new(MAP_SHARED_MEM, MicU::map_shared_mem, "MapSharedMem"),
    FunctionInfo::new(UNMAP_SHARED_MEM, MicU::unmap_shared_mem, "UnmapSharedMem"),
    FunctionInfo::new(START_SAMPLING, MicU::start_sampling, "StartSampling"),
    FunctionInfo::new(ADJUST_SAMPLING, MicU::adjust_sampling, "AdjustSampling"),
    FunctionInfo::new(STOP_SAMPLING, MicU::stop_sampling, "StopSampling"),
    FunctionInfo::new(IS_SAMPLING, MicU::is_sampling_cmd, "IsSampling"),
    FunctionInfo::new(
        GET_BUFFER_FULL_EVENT,
        MicU::get_buffer_full_event,
        "GetBufferFullEvent",
    ),
    FunctionInfo::new(SET_GAIN, MicU::set_gain, "SetGain"),
    FunctionInfo::new(GET_GAIN, MicU::get_gain, "GetGain"),
    FunctionInfo::new(SET_POWER, MicU::set_power, "SetPower"),
    FunctionInfo::new(GET_POWER, MicU::get_power, "GetPower"),
    FunctionInfo::new(SET_IIR_FILTER_MIC, MicU::set_iir_filter_mic, "SetIirFilterMic"),
    FunctionInfo::new(SET_CLAMP, MicU::set_clamp, "SetClamp"),
    FunctionInfo::new(GET_CLAMP, MicU::get_clamp, "GetClamp"),
    FunctionInfo::new(
        SET_ALLOW_SHELL_CLOSED,
        MicU::set_allow_shell_closed,
        "SetAllowShellClosed",
    ),
    FunctionInfo::new(SET_CLIENT_VERSION, MicU::set_client_version, "SetClientVersion"),
];

impl ServiceFramework for MicU {
    const NAME: &'static str = "mic:u";
    const MAX_SESSIONS: u32 = 1;

    fn functions() -> &'static [FunctionInfo<Self>] {
        FUNCTIONS
    }
}
