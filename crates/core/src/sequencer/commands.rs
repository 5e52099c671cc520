use rosc::{OscMessage, OscPacket, OscType};

/// Requests the clip sequencer answers with a state reply.
pub const TRANSPORT_STATE_REQUEST: &str = "/state/transport";
pub const TRACKS_STATE_REQUEST: &str = "/state/tracks";

/// Address every state reply is sent to.
pub const STATE_REPLY_ADDRESS: &str = "/stateFromShepherd";

/// One-way commands for the clip sequencer. None is acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerCommand {
    SelectTrack(i32),
    PlayStopClip { track: i32, clip: i32 },
    ClearClip { track: i32, clip: i32 },
    DoubleClip { track: i32, clip: i32 },
    PlayScene(i32),
    DuplicateScene(i32),
    ToggleGlobalPlay,
    ToggleGlobalRecord,
    ToggleMetronome,
    SetBpm(f32),
}

impl SequencerCommand {
    pub fn address(&self) -> &'static str {
        match self {
            SequencerCommand::SelectTrack(_) => "/track/select",
            SequencerCommand::PlayStopClip { .. } => "/clip/playStop",
            SequencerCommand::ClearClip { .. } => "/clip/clear",
            SequencerCommand::DoubleClip { .. } => "/clip/double",
            SequencerCommand::PlayScene(_) => "/scene/play",
            SequencerCommand::DuplicateScene(_) => "/scene/duplicate",
            SequencerCommand::ToggleGlobalPlay => "/transport/playStop",
            SequencerCommand::ToggleGlobalRecord => "/transport/recordOnOff",
            SequencerCommand::ToggleMetronome => "/metronome/onOff",
            SequencerCommand::SetBpm(_) => "/transport/setBpm",
        }
    }

    pub fn args(&self) -> Vec<OscType> {
        match *self {
            SequencerCommand::SelectTrack(track) => vec![OscType::Int(track)],
            SequencerCommand::PlayStopClip { track, clip }
            | SequencerCommand::ClearClip { track, clip }
            | SequencerCommand::DoubleClip { track, clip } => {
                vec![OscType::Int(track), OscType::Int(clip)]
            }
            SequencerCommand::PlayScene(scene) | SequencerCommand::DuplicateScene(scene) => {
                vec![OscType::Int(scene)]
            }
            SequencerCommand::ToggleGlobalPlay
            | SequencerCommand::ToggleGlobalRecord
            | SequencerCommand::ToggleMetronome => Vec::new(),
            SequencerCommand::SetBpm(bpm) => vec![OscType::Float(bpm)],
        }
    }

    pub fn to_packet(&self) -> OscPacket {
        message(self.address(), self.args())
    }
}

pub(crate) fn message(address: &str, args: Vec<OscType>) -> OscPacket {
    OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args,
    })
}

/// First string argument of every state reply found in `packet`.
///
/// Bundles are searched recursively; other addresses are skipped.
pub fn state_payloads(packet: OscPacket) -> Vec<String> {
    let mut payloads = Vec::new();
    collect_payloads(packet, &mut payloads);
    payloads
}

fn collect_payloads(packet: OscPacket, payloads: &mut Vec<String>) {
    match packet {
        OscPacket::Message(msg) => {
            if msg.addr != STATE_REPLY_ADDRESS {
                return;
            }
            let payload = msg.args.into_iter().find_map(|arg| match arg {
                OscType::String(s) => Some(s),
                _ => None,
            });
            match payload {
                Some(payload) => payloads.push(payload),
                None => log::debug!("State reply without a string argument"),
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                collect_payloads(inner, payloads);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rosc::{OscBundle, OscTime};

    use super::*;

    #[test]
    fn test_clip_command_args() {
        let cmd = SequencerCommand::PlayStopClip { track: 2, clip: 5 };
        assert_eq!(cmd.address(), "/clip/playStop");
        assert_eq!(cmd.args(), vec![OscType::Int(2), OscType::Int(5)]);
    }

    #[test]
    fn test_toggle_commands_have_no_args() {
        assert!(SequencerCommand::ToggleMetronome.args().is_empty());
        assert_eq!(
            SequencerCommand::SetBpm(121.5).args(),
            vec![OscType::Float(121.5)]
        );
    }

    #[test]
    fn test_payloads_from_nested_bundle() {
        let reply = |payload: &str| {
            message(
                STATE_REPLY_ADDRESS,
                vec![OscType::String(payload.to_string())],
            )
        };
        let packet = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![
                reply("transport,p,120,0,n,0,0"),
                message("/other", vec![OscType::String("ignored".to_string())]),
                OscPacket::Bundle(OscBundle {
                    timetag: OscTime::from((0, 1)),
                    content: vec![reply("tracks,t,1,E")],
                }),
                message(STATE_REPLY_ADDRESS, vec![OscType::Int(1)]),
            ],
        });

        assert_eq!(
            state_payloads(packet),
            vec![
                "transport,p,120,0,n,0,0".to_string(),
                "tracks,t,1,E".to_string()
            ]
        );
    }
}
