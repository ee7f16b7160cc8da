#[cfg(feature = "rtrb")]
use rtrb::{Consumer, Producer};

use crate::dsp::MixNonIdealCal;
use crate::outer::OuterChannelId;

use super::ports::{InputId, OutputId, ParamId, PortFrame};

/// Control change sent from a UI thread to the audio thread.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ControlMessage {
    SetParam { id: ParamId, value: f32 },
    Patch { id: InputId, voltage: f32 },
    Unpatch { id: InputId },
    SetOutputConnected { id: OutputId, connected: bool },

    SetCycleLatched { channel: OuterChannelId, latched: bool },
    SetMixNonIdeal(bool),
    SetMixCal(MixNonIdealCal),
    SetBandlimitedGates(bool),
    SetBandlimitedSignals(bool),
    SetTimingInterpolate(bool),
    SetTimingUpdateDiv(u32),
    Reset,
}

impl ControlMessage {
    /// Apply port-level messages to `frame`. Returns false for messages the
    /// engine itself handles.
    pub fn apply_to_frame(&self, frame: &mut PortFrame) -> bool {
        match *self {
            ControlMessage::SetParam { id, value } => frame.set_param(id, value),
            ControlMessage::Patch { id, voltage } => frame.patch(id, voltage),
            ControlMessage::Unpatch { id } => frame.unpatch(id),
            ControlMessage::SetOutputConnected { id, connected } => {
                frame.set_output_connected(id, connected)
            }
            _ => return false,
        }
        true
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}

/// UI-side end of the control queue.
#[cfg(feature = "rtrb")]
pub struct ControlSender {
    producer: Producer<ControlMessage>,
}

#[cfg(feature = "rtrb")]
impl ControlSender {
    /// Create a sender/receiver pair with room for `capacity` messages.
    pub fn channel(capacity: usize) -> (ControlSender, Consumer<ControlMessage>) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity);
        (ControlSender { producer }, consumer)
    }

    /// Queue a message. A full queue drops it and returns false.
    pub fn send(&mut self, msg: ControlMessage) -> bool {
        let msg = match msg {
            ControlMessage::SetTimingUpdateDiv(0) => {
                tracing::warn!("timing update divider 0 requested, sending 1");
                ControlMessage::SetTimingUpdateDiv(1)
            }
            other => other,
        };
        match self.producer.push(msg) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(?err, "control queue full, message dropped");
                false
            }
        }
    }
}
