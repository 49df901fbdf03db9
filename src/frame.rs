//! Frame parser
//!
//! Decodes one raw transport line into typed events. A line is a bundle,
//! not a single event: each recognized key yields one event, and defects
//! are contained to the key they occur on.

use crate::error::{FrameWarning, ParseError};
use crate::types::{Event, WorkoutTime};
use serde_json::Value;

/// Result of decoding one frame: the events it carried plus any per-key
/// warnings. Warnings never abort the rest of the line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    pub events: Vec<Event>,
    pub warnings: Vec<FrameWarning>,
}

/// Decode one raw line of transport text into a [`ParsedFrame`].
///
/// The line is trimmed first. Lines not delimited by `{`/`}` are rejected
/// with [`ParseError::NotAnObject`]; lines that are not valid JSON are
/// rejected with [`ParseError::InvalidEncoding`]. Range validation is out
/// of scope here: physically implausible readings pass through and are a
/// collaborator-level concern.
pub fn parse(raw_line: &str) -> Result<ParsedFrame, ParseError> {
    let trimmed = raw_line.trim();

    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Err(ParseError::NotAnObject);
    }

    let object: serde_json::Map<String, Value> = serde_json::from_str(trimmed)?;

    let mut events = Vec::new();
    let mut warnings = Vec::new();
    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;

    for (key, value) in &object {
        match key.as_str() {
            "Weight" => push_numeric(key, value, Event::Weight, &mut events, &mut warnings),
            "Distance" => push_numeric(key, value, Event::Distance, &mut events, &mut warnings),
            "Oxygen" => push_numeric(key, value, Event::Oxygen, &mut events, &mut warnings),
            "Temperature" => {
                push_numeric(key, value, Event::Temperature, &mut events, &mut warnings)
            }
            "Heartbeat" => match integer(value) {
                Some(bpm) => events.push(Event::Heartbeat(bpm)),
                None => warnings.push(malformed(key, "expected an integer")),
            },
            "WorkoutTime" => match parse_workout_time(value) {
                Ok(wt) => events.push(Event::WorkoutTime(wt)),
                Err(reason) => warnings.push(malformed(key, reason)),
            },
            "latitude" => match value.as_f64() {
                Some(lat) => latitude = Some(lat),
                None => warnings.push(malformed(key, "expected a number")),
            },
            "longitude" => match value.as_f64() {
                Some(lon) => longitude = Some(lon),
                None => warnings.push(malformed(key, "expected a number")),
            },
            "Emergency" => {
                if is_truthy(value) {
                    events.push(Event::Emergency);
                } else {
                    warnings.push(malformed(key, "marker is not truthy"));
                }
            }
            _ => warnings.push(FrameWarning::UnknownKey(key.clone())),
        }
    }

    // A position fix needs both halves; a lone half is a per-key defect
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => events.push(Event::Location {
            latitude,
            longitude,
        }),
        (Some(_), None) => warnings.push(malformed("latitude", "missing longitude")),
        (None, Some(_)) => warnings.push(malformed("longitude", "missing latitude")),
        (None, None) => {}
    }

    Ok(ParsedFrame { events, warnings })
}

fn push_numeric(
    key: &str,
    value: &Value,
    make: fn(f64) -> Event,
    events: &mut Vec<Event>,
    warnings: &mut Vec<FrameWarning>,
) {
    match value.as_f64() {
        Some(v) => events.push(make(v)),
        None => warnings.push(malformed(key, "expected a number")),
    }
}

// Accepts float-typed whole numbers (72.0) but not fractional ones (72.6)
fn integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn parse_workout_time(value: &Value) -> Result<WorkoutTime, &'static str> {
    let object = value.as_object().ok_or("expected an object")?;
    let hours = object
        .get("hours")
        .and_then(Value::as_i64)
        .ok_or("missing integer field: hours")?;
    let minutes = object
        .get("minutes")
        .and_then(Value::as_i64)
        .ok_or("missing integer field: minutes")?;
    Ok(WorkoutTime::new(hours, minutes))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn malformed(key: &str, reason: impl Into<String>) -> FrameWarning {
    FrameWarning::MalformedField {
        key: key.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_metric_frame() {
        let frame = parse(r#"{"Weight":70.2}"#).unwrap();
        assert_eq!(frame.events, vec![Event::Weight(70.2)]);
        assert!(frame.warnings.is_empty());
    }

    #[test]
    fn test_bundle_frame_yields_multiple_events() {
        let frame = parse(r#"{"Heartbeat":72,"Oxygen":97.5,"Temperature":36.6}"#).unwrap();
        assert_eq!(frame.events.len(), 3);
        assert!(frame.events.contains(&Event::Heartbeat(72)));
        assert!(frame.events.contains(&Event::Oxygen(97.5)));
        assert!(frame.events.contains(&Event::Temperature(36.6)));
    }

    #[test]
    fn test_location_pair() {
        let frame = parse(r#"{"latitude":37.5,"longitude":127.0}"#).unwrap();
        assert_eq!(
            frame.events,
            vec![Event::Location {
                latitude: 37.5,
                longitude: 127.0
            }]
        );
    }

    #[test]
    fn test_lone_latitude_is_a_warning_not_an_event() {
        let frame = parse(r#"{"latitude":37.5}"#).unwrap();
        assert!(frame.events.is_empty());
        assert_eq!(frame.warnings.len(), 1);
    }

    #[test]
    fn test_workout_time() {
        let frame = parse(r#"{"WorkoutTime":{"hours":1,"minutes":25}}"#).unwrap();
        assert_eq!(
            frame.events,
            vec![Event::WorkoutTime(WorkoutTime::new(1, 25))]
        );
    }

    #[test]
    fn test_workout_time_missing_minutes_contained_to_key() {
        let frame = parse(r#"{"WorkoutTime":{"hours":1},"Weight":70.0}"#).unwrap();
        // The defective key is dropped; the rest of the line still decodes
        assert_eq!(frame.events, vec![Event::Weight(70.0)]);
        assert_eq!(
            frame.warnings,
            vec![FrameWarning::MalformedField {
                key: "WorkoutTime".to_string(),
                reason: "missing integer field: minutes".to_string(),
            }]
        );
    }

    #[test]
    fn test_emergency_truthy_marker() {
        let frame = parse(r#"{"Emergency":true}"#).unwrap();
        assert_eq!(frame.events, vec![Event::Emergency]);

        let frame = parse(r#"{"Emergency":1}"#).unwrap();
        assert_eq!(frame.events, vec![Event::Emergency]);

        let frame = parse(r#"{"Emergency":false}"#).unwrap();
        assert!(frame.events.is_empty());
        assert_eq!(frame.warnings.len(), 1);
    }

    #[test]
    fn test_heartbeat_must_be_integral() {
        // Float-typed whole numbers are fine
        let frame = parse(r#"{"Heartbeat":72.0}"#).unwrap();
        assert_eq!(frame.events, vec![Event::Heartbeat(72)]);

        // Fractional bpm is a shape mismatch, contained to the key
        let frame = parse(r#"{"Heartbeat":72.6,"Weight":70.0}"#).unwrap();
        assert_eq!(frame.events, vec![Event::Weight(70.0)]);
        assert_eq!(
            frame.warnings,
            vec![FrameWarning::MalformedField {
                key: "Heartbeat".to_string(),
                reason: "expected an integer".to_string(),
            }]
        );
    }

    #[test]
    fn test_unknown_key_is_a_warning() {
        let frame = parse(r#"{"Steps":4200,"Weight":70.0}"#).unwrap();
        assert_eq!(frame.events, vec![Event::Weight(70.0)]);
        assert_eq!(
            frame.warnings,
            vec![FrameWarning::UnknownKey("Steps".to_string())]
        );
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(parse("Weight 70.2"), Err(ParseError::NotAnObject)));
        assert!(matches!(parse(""), Err(ParseError::NotAnObject)));
        assert!(matches!(
            parse(r#"["Weight",70.2]"#),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn test_invalid_encoding() {
        assert!(matches!(
            parse(r#"{"Weight":70.2"#),
            Err(ParseError::NotAnObject)
        ));
        assert!(matches!(
            parse(r#"{"Weight":}"#),
            Err(ParseError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_out_of_range_values_pass_through() {
        // Range validation is a collaborator-level concern
        let frame = parse(r#"{"Oxygen":120.0,"Distance":-3.0}"#).unwrap();
        assert!(frame.events.contains(&Event::Oxygen(120.0)));
        assert!(frame.events.contains(&Event::Distance(-3.0)));
        assert!(frame.warnings.is_empty());
    }

    #[test]
    fn test_whitespace_trimmed() {
        let frame = parse("  {\"Weight\":70.2}\r\n").unwrap();
        assert_eq!(frame.events, vec![Event::Weight(70.2)]);
    }
}
