//! Typed panel identifiers and the per-frame port snapshot.
//!
//! The host fills a [`PortFrame`] every sample (knob positions, input
//! voltages and which jacks are patched) and reads back a [`FrameOutputs`].

/// Knobs and buttons. Knob values are normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Atten1,
    Atten2,
    Atten3,
    Atten4,
    Cycle1,
    Cycle4,
    Rise1,
    Rise4,
    Fall1,
    Fall4,
    Shape1,
    Shape4,
}

impl ParamId {
    pub const COUNT: usize = 12;
    pub const ALL: [ParamId; Self::COUNT] = [
        ParamId::Atten1,
        ParamId::Atten2,
        ParamId::Atten3,
        ParamId::Atten4,
        ParamId::Cycle1,
        ParamId::Cycle4,
        ParamId::Rise1,
        ParamId::Rise4,
        ParamId::Fall1,
        ParamId::Fall4,
        ParamId::Shape1,
        ParamId::Shape4,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Panel default.
    pub const fn default_value(self) -> f32 {
        match self {
            ParamId::Atten1 | ParamId::Atten2 | ParamId::Atten3 | ParamId::Atten4 => 0.5,
            _ => 0.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ParamId::Atten1 => "CH1 attenuverter",
            ParamId::Atten2 => "CH2 attenuverter",
            ParamId::Atten3 => "CH3 attenuverter",
            ParamId::Atten4 => "CH4 attenuverter",
            ParamId::Cycle1 => "CH1 cycle",
            ParamId::Cycle4 => "CH4 cycle",
            ParamId::Rise1 => "CH1 rise",
            ParamId::Rise4 => "CH4 rise",
            ParamId::Fall1 => "CH1 fall",
            ParamId::Fall4 => "CH4 fall",
            ParamId::Shape1 => "CH1 shape",
            ParamId::Shape4 => "CH4 shape",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputId {
    Signal1,
    Signal2,
    Signal3,
    Signal4,
    Trigger1,
    Trigger4,
    RiseCv1,
    RiseCv4,
    FallCv1,
    FallCv4,
    BothCv1,
    BothCv4,
    CycleCv1,
    CycleCv4,
}

impl InputId {
    pub const COUNT: usize = 14;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputId {
    /// Variable (attenuverted) outputs; unpatched ones feed the bus.
    Out1,
    Out2,
    Out3,
    Out4,
    /// Channel 1 end of rise.
    Eor1,
    /// Channel 4 end of cycle.
    Eoc4,
    Unity1,
    Unity4,
    Or,
    Sum,
    Inv,
}

impl OutputId {
    pub const COUNT: usize = 11;
    pub const VARIABLE: [OutputId; 4] = [
        OutputId::Out1,
        OutputId::Out2,
        OutputId::Out3,
        OutputId::Out4,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightId {
    Cycle1,
    Cycle4,
    Eor1,
    Eoc4,
    Unity1,
    Unity4,
    Or,
    Inv,
}

impl LightId {
    pub const COUNT: usize = 8;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Voltage on an input jack plus whether anything is patched into it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputPort {
    pub voltage: f32,
    pub connected: bool,
}

/// Everything the host supplies for one sample.
#[derive(Debug, Clone)]
pub struct PortFrame {
    params: [f32; ParamId::COUNT],
    inputs: [InputPort; InputId::COUNT],
    output_connected: [bool; OutputId::COUNT],
}

impl PortFrame {
    /// Panel defaults, nothing patched.
    pub fn new() -> Self {
        let mut params = [0.0; ParamId::COUNT];
        for id in ParamId::ALL {
            params[id.index()] = id.default_value();
        }
        Self {
            params,
            inputs: [InputPort::default(); InputId::COUNT],
            output_connected: [false; OutputId::COUNT],
        }
    }

    #[inline]
    pub fn param(&self, id: ParamId) -> f32 {
        self.params[id.index()]
    }

    pub fn set_param(&mut self, id: ParamId, value: f32) {
        self.params[id.index()] = value;
    }

    /// Input voltage, 0 V when unpatched.
    #[inline]
    pub fn voltage(&self, id: InputId) -> f32 {
        let port = self.inputs[id.index()];
        if port.connected {
            port.voltage
        } else {
            0.0
        }
    }

    /// Input voltage, or `None` when unpatched.
    #[inline]
    pub fn signal(&self, id: InputId) -> Option<f32> {
        let port = self.inputs[id.index()];
        port.connected.then_some(port.voltage)
    }

    #[inline]
    pub fn is_connected(&self, id: InputId) -> bool {
        self.inputs[id.index()].connected
    }

    /// Patch `id` and set its voltage.
    pub fn patch(&mut self, id: InputId, voltage: f32) {
        self.inputs[id.index()] = InputPort {
            voltage,
            connected: true,
        };
    }

    pub fn unpatch(&mut self, id: InputId) {
        self.inputs[id.index()] = InputPort::default();
    }

    #[inline]
    pub fn is_output_connected(&self, id: OutputId) -> bool {
        self.output_connected[id.index()]
    }

    pub fn set_output_connected(&mut self, id: OutputId, connected: bool) {
        self.output_connected[id.index()] = connected;
    }
}

impl Default for PortFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Output voltages and light brightness for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutputs {
    pub voltages: [f32; OutputId::COUNT],
    /// Brightness in [0, 1], refreshed at the light rate.
    pub lights: [f32; LightId::COUNT],
}

impl FrameOutputs {
    #[inline]
    pub fn get(&self, id: OutputId) -> f32 {
        self.voltages[id.index()]
    }

    #[inline]
    pub fn set(&mut self, id: OutputId, volts: f32) {
        self.voltages[id.index()] = volts;
    }

    #[inline]
    pub fn light(&self, id: LightId) -> f32 {
        self.lights[id.index()]
    }
}

impl Default for FrameOutputs {
    fn default() -> Self {
        Self {
            voltages: [0.0; OutputId::COUNT],
            lights: [0.0; LightId::COUNT],
        }
    }
}
