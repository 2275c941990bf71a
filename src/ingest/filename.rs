//! Recording filename grammars.
//!
//! Two delimiter grammars are live. The five-part recording grammar is
//! authoritative and drives the mapping sweep; the six-part bracketed
//! export grammar is deprecated but still exercised by the single-file
//! transcription path.

use std::path::Path;

use crate::error::PipelineError;

/// Parsed `timestamp_callerId_type_targetName_targetNumber` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingName {
    pub timestamp: i64,
    pub caller_id: String,
    pub record_type: String,
    pub target_name: String,
    pub target_number: String,
}

/// Parsed `timestamp_userId_type_[contactName]_[contactPhone]_date`
/// descriptor (deprecated export grammar).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportName {
    pub timestamp: String,
    pub user_id: String,
    pub record_type: String,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub date: String,
}

/// Strip the extension and return the base name for parsing.
fn base_name(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Parse the authoritative five-part recording grammar.
///
/// Too few parts or a non-numeric leading timestamp is a recoverable parse
/// error; the caller decides to skip and continue.
pub fn parse_recording_name(path: &Path) -> Result<RecordingName, PipelineError> {
    let name = base_name(path);
    let parts: Vec<&str> = name.split('_').collect();

    if parts.len() < 5 {
        return Err(PipelineError::Parse(format!(
            "{}: expected timestamp_callerId_type_targetName_targetNumber",
            name
        )));
    }

    let timestamp: i64 = parts[0]
        .parse()
        .map_err(|_| PipelineError::Parse(format!("{}: non-numeric timestamp", name)))?;

    Ok(RecordingName {
        timestamp,
        caller_id: parts[1].to_string(),
        record_type: parts[2].to_string(),
        target_name: parts[3].to_string(),
        target_number: parts[4].to_string(),
    })
}

/// Parse the deprecated six-part export grammar, stripping brackets from
/// the contact fields.
pub fn parse_export_name(path: &Path) -> Result<ExportName, PipelineError> {
    let name = base_name(path);
    let parts: Vec<&str> = name.split('_').collect();

    if parts.len() < 6 {
        return Err(PipelineError::Parse(format!(
            "{}: expected timestamp_userId_type_[contactName]_[contactPhone]_date",
            name
        )));
    }

    let strip = |s: &str| -> Option<String> {
        let cleaned: String = s.chars().filter(|c| *c != '[' && *c != ']').collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    };

    Ok(ExportName {
        timestamp: parts[0].to_string(),
        user_id: parts[1].to_string(),
        record_type: parts[2].to_string(),
        contact_name: strip(parts[3]),
        contact_phone: strip(parts[4]),
        date: parts[5].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recording_name() {
        let parsed =
            parse_recording_name(Path::new("1700000000_DEV1_sale_John_5551234.wav")).unwrap();

        assert_eq!(parsed.timestamp, 1_700_000_000);
        assert_eq!(parsed.caller_id, "DEV1");
        assert_eq!(parsed.record_type, "sale");
        assert_eq!(parsed.target_name, "John");
        assert_eq!(parsed.target_number, "5551234");
    }

    #[test]
    fn test_recording_name_too_few_parts() {
        let err = parse_recording_name(Path::new("1700000000_DEV1_sale.wav")).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_recording_name_non_numeric_timestamp() {
        let err =
            parse_recording_name(Path::new("yesterday_DEV1_sale_John_5551234.wav")).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_extension_is_stripped_before_split() {
        // The trailing part must not keep the extension
        let parsed =
            parse_recording_name(Path::new("/records/1700000000_DEV1_sale_John_5551234.mp3"))
                .unwrap();
        assert_eq!(parsed.target_number, "5551234");
    }

    #[test]
    fn test_parse_export_name_strips_brackets() {
        let parsed = parse_export_name(Path::new(
            "1700000000_user42_sale_[Maria]_[5559876]_20231114.m4a",
        ))
        .unwrap();

        assert_eq!(parsed.user_id, "user42");
        assert_eq!(parsed.contact_name.as_deref(), Some("Maria"));
        assert_eq!(parsed.contact_phone.as_deref(), Some("5559876"));
        assert_eq!(parsed.date, "20231114");
    }

    #[test]
    fn test_export_name_empty_bracket_field() {
        let parsed =
            parse_export_name(Path::new("1700000000_user42_sale_[]_[5559876]_20231114.m4a"))
                .unwrap();
        assert_eq!(parsed.contact_name, None);
    }

    #[test]
    fn test_export_name_requires_six_parts() {
        let err = parse_export_name(Path::new("1700000000_DEV1_sale_John_5551234.wav")).unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }
}
