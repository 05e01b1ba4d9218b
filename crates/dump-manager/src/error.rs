/// Error is the fault vocabulary of the dump manager. Every failure a
/// caller of the create-dump surface can observe is one of these variants,
/// and each carries the stable wire code external observers match on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument {name}: {value}")]
    InvalidArgument { name: &'static str, value: String },
    #[error("dump creation is disabled")]
    Disabled,
    #[error("dump quota exceeded: {reason}")]
    QuotaExceeded { reason: String },
    #[error("dump creation is not allowed: {reason}")]
    NotAllowed { reason: String },
    #[error("internal failure: {0:#}")]
    Internal(anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub const ERROR_INVALID_ARGUMENT: &str =
    "xyz.openbmc_project.Common.Error.InvalidArgument";
pub const ERROR_DUMP_DISABLED: &str =
    "xyz.openbmc_project.Dump.Create.Error.Disabled";
pub const ERROR_DUMP_QUOTA_EXCEEDED: &str =
    "xyz.openbmc_project.Dump.Create.Error.QuotaExceeded";
pub const ERROR_DUMP_NOT_ALLOWED: &str =
    "xyz.openbmc_project.Common.Error.NotAllowed";
pub const ERROR_INTERNAL_FAILURE: &str =
    "xyz.openbmc_project.Common.Error.InternalFailure";

impl Error {
    /// The stable, caller-visible code of this fault.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidArgument { .. } => ERROR_INVALID_ARGUMENT,
            Error::Disabled => ERROR_DUMP_DISABLED,
            Error::QuotaExceeded { .. } => ERROR_DUMP_QUOTA_EXCEEDED,
            Error::NotAllowed { .. } => ERROR_DUMP_NOT_ALLOWED,
            Error::Internal(_) => ERROR_INTERNAL_FAILURE,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Error;

    #[test]
    fn test_fault_codes_are_stable() {
        let faults = [
            Error::InvalidArgument {
                name: "DUMP_TYPE",
                value: "MISSING".to_string(),
            },
            Error::Disabled,
            Error::QuotaExceeded {
                reason: "too many dumps".to_string(),
            },
            Error::NotAllowed {
                reason: "host is up".to_string(),
            },
            Error::Internal(anyhow::anyhow!("spawn failed")),
        ];
        insta::assert_debug_snapshot!(
            faults.iter().map(Error::code).collect::<Vec<_>>(),
            @r###"
        [
            "xyz.openbmc_project.Common.Error.InvalidArgument",
            "xyz.openbmc_project.Dump.Create.Error.Disabled",
            "xyz.openbmc_project.Dump.Create.Error.QuotaExceeded",
            "xyz.openbmc_project.Common.Error.NotAllowed",
            "xyz.openbmc_project.Common.Error.InternalFailure",
        ]
        "###
        );
    }
}
