pub mod dsp; // Allocation-free primitives (warp, timing, band-limiting, mixing)
pub mod engine; // Four-channel module: ports, settings, control messages
pub mod outer; // Outer channel function generator / slew limiter
pub mod preview; // Lock-free timing preview for display consumers

pub use engine::ports::{FrameOutputs, InputId, LightId, OutputId, ParamId, PortFrame};
pub use engine::settings::EngineSettings;
pub use engine::FluxEngine;
pub use outer::{OuterPhase, GATE_HIGH_V, V_MAX, V_MIN};
