/*!
Capture ingestion: turns an ordered sequence of capture frames, each
carrying zero or more dissected BMP messages, into classified messages with
global sequence numbers assigned across the whole capture.
*/
use crate::error::{LocatedError, ReplayError};
use crate::fields::FieldSource;
use crate::models::{ClassifiedMessage, MessageLocation};
use log::debug;

/// One capture frame: the dissected BMP messages it carries, in intra-frame
/// order. A TCP segment routinely carries several BMP messages.
pub type Frame = Vec<Box<dyn FieldSource>>;

/// Classify every message in every frame, assigning the global sequence,
/// frame index, intra-frame index and intra-frame count.
///
/// Classification failures surface with the exact capture position of the
/// offending message.
pub fn ingest_frames<I>(frames: I) -> Result<Vec<ClassifiedMessage>, LocatedError>
where
    I: IntoIterator<Item = Frame>,
{
    let mut messages = Vec::new();
    let mut sequence: u64 = 0;

    for (frame, contents) in frames.into_iter().enumerate() {
        let frame_count = contents.len() as u32;
        for (frame_index, fields) in contents.into_iter().enumerate() {
            let location = MessageLocation {
                sequence,
                frame: frame as u32,
                frame_index: frame_index as u32,
                frame_count,
            };
            let msg = ClassifiedMessage::classify(fields, location)
                .map_err(|error| error.at(location))?;
            messages.push(msg);
            sequence += 1;
        }
    }

    debug!("ingested {} BMP messages", messages.len());
    Ok(messages)
}

/// Enforce the sequencing law: global sequence numbers must be strictly
/// monotonic and contiguous from 0 ({0, 1, ..., N-1}, no repeats).
///
/// [ingest_frames] satisfies this by construction; replays assembled by
/// other means are validated here before analysis. A violation is fatal
/// for the whole analysis.
pub fn validate_sequencing(messages: &[ClassifiedMessage]) -> Result<(), ReplayError> {
    for (expected, msg) in messages.iter().enumerate() {
        let found = msg.sequence();
        if found != expected as u64 {
            return Err(ReplayError::SequenceViolation {
                expected: expected as u64,
                found,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{names, FieldMap};

    fn msg_fields(type_value: &str) -> Box<dyn FieldSource> {
        Box::new(FieldMap::new().with(names::MESSAGE_TYPE, type_value))
    }

    #[test]
    fn test_sequence_assignment_across_frames() {
        let frames: Vec<Frame> = vec![
            vec![msg_fields("4"), msg_fields("3")],
            vec![],
            vec![msg_fields("0")],
        ];
        let messages = ingest_frames(frames).unwrap();

        let sequences: Vec<u64> = messages.iter().map(|m| m.sequence()).collect();
        assert_eq!(sequences, vec![0, 1, 2]);

        assert_eq!(messages[1].location.frame, 0);
        assert_eq!(messages[1].location.frame_index, 1);
        assert_eq!(messages[1].location.frame_count, 2);
        // empty frame skipped, third message lands in frame 2
        assert_eq!(messages[2].location.frame, 2);
        assert_eq!(messages[2].location.frame_count, 1);

        validate_sequencing(&messages).unwrap();
    }

    #[test]
    fn test_classification_error_carries_location() {
        let frames: Vec<Frame> = vec![vec![msg_fields("4")], vec![msg_fields("9")]];
        let err = ingest_frames(frames).unwrap_err();
        assert_eq!(err.location.sequence, 1);
        assert_eq!(err.location.frame, 1);
        assert_eq!(
            err.error,
            ReplayError::UnrecognizedEnumVariant {
                type_name: "MessageType",
                value: 9
            }
        );
    }

    #[test]
    fn test_sequencing_law_rejects_gaps() {
        let frames: Vec<Frame> = vec![vec![msg_fields("4"), msg_fields("5")]];
        let mut messages = ingest_frames(frames).unwrap();
        messages.remove(0);

        assert_eq!(
            validate_sequencing(&messages).unwrap_err(),
            ReplayError::SequenceViolation {
                expected: 0,
                found: 1
            }
        );
    }
}
