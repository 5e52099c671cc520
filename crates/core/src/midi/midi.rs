/// MIDI channel messages the controller produces or consumes.
///
/// Channels are 0-based (0-15) everywhere inside the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    PolyAftertouch { channel: u8, note: u8, value: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelAftertouch { channel: u8, value: u8 },
    /// Signed pitch bend, -8192..=8191
    PitchBend { channel: u8, value: i16 },
    Clock,
    SysEx(Vec<u8>),
}

impl MidiMessage {
    /// Parse raw bytes as delivered by a midir input callback.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        if status == 0xF8 {
            return Some(MidiMessage::Clock);
        }
        if status == 0xF0 {
            return Some(MidiMessage::SysEx(bytes.to_vec()));
        }

        let channel = status & 0x0F;
        let data1 = bytes.get(1).copied();
        let data2 = bytes.get(2).copied();

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff {
                channel,
                note: data1?,
                velocity: data2?,
            }),
            0x90 => {
                let (note, velocity) = (data1?, data2?);
                // Running-status note off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff {
                        channel,
                        note,
                        velocity: 0,
                    })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            0xA0 => Some(MidiMessage::PolyAftertouch {
                channel,
                note: data1?,
                value: data2?,
            }),
            0xB0 => Some(MidiMessage::ControlChange {
                channel,
                controller: data1?,
                value: data2?,
            }),
            0xC0 => Some(MidiMessage::ProgramChange {
                channel,
                program: data1?,
            }),
            0xD0 => Some(MidiMessage::ChannelAftertouch {
                channel,
                value: data1?,
            }),
            0xE0 => {
                let raw = (data1? as i16) | ((data2? as i16) << 7);
                Some(MidiMessage::PitchBend {
                    channel,
                    value: raw - 8192,
                })
            }
            _ => None,
        }
    }

    /// Encode to wire bytes. Data bytes are masked to 7 bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::PolyAftertouch {
                channel,
                note,
                value,
            } => vec![0xA0 | (channel & 0x0F), note & 0x7F, value & 0x7F],
            MidiMessage::ControlChange {
                channel,
                controller,
                value,
            } => vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
            MidiMessage::ProgramChange { channel, program } => {
                vec![0xC0 | (channel & 0x0F), program & 0x7F]
            }
            MidiMessage::ChannelAftertouch { channel, value } => {
                vec![0xD0 | (channel & 0x0F), value & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let raw = (*value).clamp(-8192, 8191) + 8192;
                vec![
                    0xE0 | (channel & 0x0F),
                    (raw & 0x7F) as u8,
                    ((raw >> 7) & 0x7F) as u8,
                ]
            }
            MidiMessage::Clock => vec![0xF8],
            MidiMessage::SysEx(bytes) => bytes.clone(),
        }
    }

    /// Channel of a channel-voice message, `None` for system messages.
    pub fn channel(&self) -> Option<u8> {
        match self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::PolyAftertouch { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelAftertouch { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => Some(*channel),
            MidiMessage::Clock | MidiMessage::SysEx(_) => None,
        }
    }

    /// Copy of the message moved to another channel. System messages are returned unchanged.
    pub fn with_channel(&self, new_channel: u8) -> Self {
        let mut msg = self.clone();
        match &mut msg {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::PolyAftertouch { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelAftertouch { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => *channel = new_channel & 0x0F,
            MidiMessage::Clock | MidiMessage::SysEx(_) => {}
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_on_zero_velocity_is_note_off() {
        let msg = MidiMessage::from_bytes(&[0x93, 60, 0]);
        assert_eq!(
            msg,
            Some(MidiMessage::NoteOff {
                channel: 3,
                note: 60,
                velocity: 0
            })
        );
    }

    #[test]
    fn test_pitch_bend_center() {
        let msg = MidiMessage::PitchBend {
            channel: 0,
            value: 0,
        };
        assert_eq!(msg.to_bytes(), vec![0xE0, 0x00, 0x40]);
        assert_eq!(MidiMessage::from_bytes(&[0xE0, 0x00, 0x40]), Some(msg));
    }

    #[test]
    fn test_with_channel_keeps_payload() {
        let msg = MidiMessage::ControlChange {
            channel: 0,
            controller: 7,
            value: 100,
        };
        assert_eq!(msg.with_channel(15).to_bytes(), vec![0xBF, 7, 100]);
        assert_eq!(MidiMessage::Clock.with_channel(4), MidiMessage::Clock);
    }

    #[test]
    fn test_truncated_message_is_rejected() {
        assert_eq!(MidiMessage::from_bytes(&[0x90, 60]), None);
        assert_eq!(MidiMessage::from_bytes(&[]), None);
    }
}
