use crate::error::{Error, Result};
use std::collections::BTreeMap;

// Parameter names of the inbound create-dump mapping.
pub const PARAM_DUMP_TYPE: &str = "DumpType";
pub const PARAM_ERROR_LOG_ID: &str = "ErrorLogId";
pub const PARAM_FAILING_UNIT_ID: &str = "FailingUnitId";

// Argument names reported back through InvalidArgument faults.
const ARG_DUMP_TYPE: &str = "DUMP_TYPE";
const ARG_ERROR_LOG_ID: &str = "ERROR_LOG_ID";
const ARG_FAILING_UNIT_ID: &str = "FAILING_UNIT_ID";
const VALUE_MISSING: &str = "MISSING";
const VALUE_INVALID: &str = "INVALID INPUT";

/// Largest error-log id the platform can reference.
pub const MAX_ERROR_LOG_ID: u64 = 0xFFFF_FFFF;
/// Maximum 32 processors are possible in a system.
pub const MAX_FAILING_UNIT: u64 = 0x20;
/// Sentinel passed to the collector when no failing unit applies.
pub const INVALID_FAILING_UNIT: u8 = 0xFF;

/// A single untyped parameter value of the inbound mapping: the caller
/// supplies either a string token or an unsigned 64-bit integer.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    U64(u64),
    Str(String),
}

/// The untyped create-dump parameter mapping, consumed once by validation.
pub type DumpCreateParams = BTreeMap<String, ParamValue>;

/// The kinds of host dumps this manager orchestrates. Each carries the
/// numeric wire code understood by the collector and the SBE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DumpType {
    Hardware,
    Hostboot,
    Sbe,
}

impl DumpType {
    /// The caller-facing string token naming this dump type.
    pub fn token(&self) -> &'static str {
        match self {
            DumpType::Hardware => "com.ibm.Dump.Create.DumpType.Hardware",
            DumpType::Hostboot => "com.ibm.Dump.Create.DumpType.Hostboot",
            DumpType::Sbe => "com.ibm.Dump.Create.DumpType.SBE",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "com.ibm.Dump.Create.DumpType.Hardware" => Some(DumpType::Hardware),
            "com.ibm.Dump.Create.DumpType.Hostboot" => Some(DumpType::Hostboot),
            "com.ibm.Dump.Create.DumpType.SBE" => Some(DumpType::Sbe),
            _ => None,
        }
    }

    /// Numeric code of this dump type on the collector command line.
    pub fn code(&self) -> u8 {
        match self {
            DumpType::Hardware => 0x1,
            DumpType::Hostboot => 0x5,
            DumpType::Sbe => 0xA,
        }
    }

    /// Short name used in collection-root overrides and logs.
    pub fn slug(&self) -> &'static str {
        match self {
            DumpType::Hardware => "hardware",
            DumpType::Hostboot => "hostboot",
            DumpType::Sbe => "sbe",
        }
    }

    /// Whether requests of this type implicate a specific hardware unit.
    pub fn requires_failing_unit(&self) -> bool {
        matches!(self, DumpType::Hardware | DumpType::Sbe)
    }
}

/// Per-type path roots. Initialized once, never mutated.
pub struct TypeInfo {
    /// Object-path root under which the capture service creates entries.
    pub entry_root: &'static str,
    /// Filesystem root under which collected artifacts are staged.
    pub collection_root: &'static str,
}

pub fn type_info(dump_type: DumpType) -> &'static TypeInfo {
    match dump_type {
        DumpType::Hardware => &TypeInfo {
            entry_root: "/xyz/openbmc_project/dump/hardware",
            collection_root: "/var/lib/openpower-dump/hardware",
        },
        DumpType::Hostboot => &TypeInfo {
            entry_root: "/xyz/openbmc_project/dump/hostboot",
            collection_root: "/var/lib/openpower-dump/hostboot",
        },
        DumpType::Sbe => &TypeInfo {
            entry_root: "/xyz/openbmc_project/dump/sbe",
            collection_root: "/var/lib/openpower-dump/sbe",
        },
    }
}

/// A validated, immutable dump request descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRequest {
    pub dump_type: DumpType,
    /// Error-log id, normalized to 8 zero-padded lowercase hex characters.
    pub elog_id: String,
    /// Populated iff `dump_type.requires_failing_unit()`.
    pub failing_unit: Option<u64>,
}

impl DumpRequest {
    /// Validate the untyped parameter mapping into a descriptor, or fail
    /// with an InvalidArgument fault naming the offending parameter.
    /// Validation has no side effects.
    pub fn validate(params: DumpCreateParams) -> Result<DumpRequest> {
        let dump_type = match params.get(PARAM_DUMP_TYPE) {
            None => {
                tracing::error!("required argument dump type is not passed");
                return Err(invalid(ARG_DUMP_TYPE, VALUE_MISSING));
            }
            Some(ParamValue::U64(_)) => {
                tracing::error!("dump type is not a string token");
                return Err(invalid(ARG_DUMP_TYPE, VALUE_INVALID));
            }
            Some(ParamValue::Str(token)) => match DumpType::from_token(token) {
                Some(dump_type) => dump_type,
                None => {
                    tracing::error!(%token, "invalid dump type passed");
                    return Err(invalid(ARG_DUMP_TYPE, token));
                }
            },
        };

        let error_id = match params.get(PARAM_ERROR_LOG_ID) {
            None => {
                tracing::error!("required argument error log id is not passed");
                return Err(invalid(ARG_ERROR_LOG_ID, VALUE_MISSING));
            }
            Some(ParamValue::U64(id)) if *id > MAX_ERROR_LOG_ID => {
                // An over-large id degrades to zero rather than failing
                // the whole request.
                tracing::error!(
                    error_id = *id,
                    max = MAX_ERROR_LOG_ID,
                    "error log id exceeds maximum, setting as 0"
                );
                0
            }
            Some(ParamValue::U64(id)) => *id,
            Some(ParamValue::Str(value)) => {
                // A non-integer id likewise degrades to zero.
                tracing::error!(%value, "an invalid error log id is passed, setting as 0");
                0
            }
        };
        let elog_id = format!("{error_id:08x}");

        let failing_unit = if dump_type.requires_failing_unit() {
            match params.get(PARAM_FAILING_UNIT_ID) {
                None => {
                    tracing::error!("required argument failing unit id is not passed");
                    return Err(invalid(ARG_FAILING_UNIT_ID, VALUE_MISSING));
                }
                Some(ParamValue::Str(value)) => {
                    // Unlike the error-log id, a malformed unit id cannot
                    // be defaulted safely and fails the request.
                    tracing::error!(%value, "an invalid failing unit id is passed");
                    return Err(invalid(ARG_FAILING_UNIT_ID, VALUE_INVALID));
                }
                Some(ParamValue::U64(unit)) if *unit > MAX_FAILING_UNIT => {
                    tracing::error!(
                        unit = *unit,
                        max = MAX_FAILING_UNIT,
                        "failing unit id exceeds maximum"
                    );
                    return Err(invalid(ARG_FAILING_UNIT_ID, &unit.to_string()));
                }
                Some(ParamValue::U64(unit)) => Some(*unit),
            }
        } else {
            None
        };

        Ok(DumpRequest {
            dump_type,
            elog_id,
            failing_unit,
        })
    }

    /// The `--failingunit` value passed to the collector.
    pub fn failing_unit_arg(&self) -> u8 {
        match self.failing_unit {
            Some(unit) => unit as u8,
            None => INVALID_FAILING_UNIT,
        }
    }
}

fn invalid(name: &'static str, value: &str) -> Error {
    Error::InvalidArgument {
        name,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(entries: &[(&str, ParamValue)]) -> DumpCreateParams {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    fn str_param(value: &str) -> ParamValue {
        ParamValue::Str(value.to_string())
    }

    #[test]
    fn test_hardware_request_round_trip() {
        let request = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param(DumpType::Hardware.token())),
            (PARAM_ERROR_LOG_ID, ParamValue::U64(4660)),
            (PARAM_FAILING_UNIT_ID, ParamValue::U64(3)),
        ]))
        .unwrap();

        insta::assert_debug_snapshot!(request, @r###"
        DumpRequest {
            dump_type: Hardware,
            elog_id: "00001234",
            failing_unit: Some(
                3,
            ),
        }
        "###);
        assert_eq!(request.failing_unit_arg(), 3);
    }

    #[test]
    fn test_missing_dump_type() {
        let err = DumpRequest::validate(params(&[(
            PARAM_ERROR_LOG_ID,
            ParamValue::U64(1),
        )]))
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidArgument { name: "DUMP_TYPE", ref value } if value == "MISSING")
        );
    }

    #[test]
    fn test_unrecognized_dump_type() {
        let err = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param("com.ibm.Dump.Create.DumpType.Bogus")),
            (PARAM_ERROR_LOG_ID, ParamValue::U64(1)),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidArgument { name: "DUMP_TYPE", ref value }
                if value == "com.ibm.Dump.Create.DumpType.Bogus")
        );
    }

    #[test]
    fn test_missing_error_log_id() {
        let err = DumpRequest::validate(params(&[(
            PARAM_DUMP_TYPE,
            str_param(DumpType::Hostboot.token()),
        )]))
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidArgument { name: "ERROR_LOG_ID", ref value } if value == "MISSING")
        );
    }

    #[test]
    fn test_non_integer_error_log_id_degrades_to_zero() {
        let request = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param(DumpType::Hostboot.token())),
            (PARAM_ERROR_LOG_ID, str_param("not-a-number")),
        ]))
        .unwrap();
        assert_eq!(request.elog_id, "00000000");
    }

    #[test]
    fn test_oversized_error_log_id_degrades_to_zero() {
        let request = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param(DumpType::Hostboot.token())),
            (PARAM_ERROR_LOG_ID, ParamValue::U64(MAX_ERROR_LOG_ID + 1)),
        ]))
        .unwrap();
        assert_eq!(request.elog_id, "00000000");
    }

    #[test]
    fn test_missing_failing_unit_for_sbe() {
        let err = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param(DumpType::Sbe.token())),
            (PARAM_ERROR_LOG_ID, ParamValue::U64(1)),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidArgument { name: "FAILING_UNIT_ID", ref value } if value == "MISSING")
        );
    }

    #[test]
    fn test_non_integer_failing_unit_is_fatal() {
        let err = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param(DumpType::Hardware.token())),
            (PARAM_ERROR_LOG_ID, ParamValue::U64(1)),
            (PARAM_FAILING_UNIT_ID, str_param("three")),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidArgument { name: "FAILING_UNIT_ID", ref value } if value == "INVALID INPUT")
        );
    }

    #[test]
    fn test_out_of_range_failing_unit() {
        let err = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param(DumpType::Hardware.token())),
            (PARAM_ERROR_LOG_ID, ParamValue::U64(1)),
            (PARAM_FAILING_UNIT_ID, ParamValue::U64(MAX_FAILING_UNIT + 1)),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, Error::InvalidArgument { name: "FAILING_UNIT_ID", ref value } if value == "33")
        );
    }

    #[test]
    fn test_hostboot_ignores_failing_unit() {
        let request = DumpRequest::validate(params(&[
            (PARAM_DUMP_TYPE, str_param(DumpType::Hostboot.token())),
            (PARAM_ERROR_LOG_ID, ParamValue::U64(0xdead)),
            // Present but neither required nor validated for Hostboot.
            (PARAM_FAILING_UNIT_ID, str_param("garbage")),
        ]))
        .unwrap();
        assert_eq!(request.failing_unit, None);
        assert_eq!(request.failing_unit_arg(), INVALID_FAILING_UNIT);
    }
}
